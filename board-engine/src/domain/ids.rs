//! Identifier newtypes for reference and realtime entities.
//!
//! Every id arriving from a feed is an opaque string. Wrapping each kind in
//! its own type keeps a stop id from being passed where a trip id is
//! expected; the only validation is that the string is non-empty.

use std::borrow::Borrow;
use std::fmt;

/// Error returned when constructing an id from an invalid string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} id: {reason}")]
pub struct InvalidId {
    kind: &'static str,
    reason: &'static str,
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create an id from a string.
            ///
            /// Returns an error if the string is empty.
            pub fn new(s: impl Into<String>) -> Result<Self, InvalidId> {
                let s = s.into();
                if s.is_empty() {
                    return Err(InvalidId {
                        kind: $kind,
                        reason: "cannot be empty",
                    });
                }
                Ok(Self(s))
            }

            /// Returns the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the id and returns the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = InvalidId;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

define_id!(
    /// A stop, station, entrance or other node in the stop hierarchy.
    StopId,
    "stop"
);
define_id!(
    /// A route, e.g. `Red` or `39`.
    RouteId,
    "route"
);
define_id!(
    /// A line grouping several routes, e.g. `line-Green`.
    LineId,
    "line"
);
define_id!(
    /// A route pattern (one stop sequence variant of a route).
    RoutePatternId,
    "route pattern"
);
define_id!(TripId, "trip");
define_id!(ShapeId, "shape");
define_id!(VehicleId, "vehicle");
define_id!(AlertId, "alert");

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn new_valid_id() {
        assert!(StopId::new("place-pktrm").is_ok());
        assert!(RouteId::new("Red").is_ok());
        assert!(TripId::new("60392455").is_ok());
    }

    #[test]
    fn reject_empty() {
        let err = StopId::new("").unwrap_err();
        assert_eq!(err.to_string(), "invalid stop id: cannot be empty");

        let err = RoutePatternId::new(String::new()).unwrap_err();
        assert_eq!(err.to_string(), "invalid route pattern id: cannot be empty");
    }

    #[test]
    fn display_and_debug() {
        let id = RouteId::new("Orange").unwrap();
        assert_eq!(id.to_string(), "Orange");
        assert_eq!(format!("{:?}", id), "RouteId(Orange)");
    }

    #[test]
    fn into_inner() {
        let id = AlertId::new("601").unwrap();
        assert_eq!(id.into_inner(), "601".to_string());
    }

    #[test]
    fn lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(StopId::new("70061").unwrap(), 1);
        assert_eq!(map.get("70061"), Some(&1));
        assert_eq!(map.get("70062"), None);
    }

    #[test]
    fn serde_as_plain_string() {
        let id = TripId::new("trip-1").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"trip-1\"");

        let back: TripId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        assert!(serde_json::from_str::<TripId>("\"\"").is_err());
    }

    #[test]
    fn serde_as_map_key() {
        let json = r#"{"place-a": 1, "place-b": 2}"#;
        let map: HashMap<StopId, u32> = serde_json::from_str(json).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("place-b"), Some(&2));
    }
}
