//! Domain error types.
//!
//! These errors represent validation failures and data inconsistencies
//! caught at construction boundaries. The board pipeline itself never
//! fails on imprecise feed data; it degrades into defined display states.

use super::StopId;

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// A stop names a parent station that is not in the snapshot
    #[error("stop {stop} references missing parent station {parent}")]
    DanglingParent { stop: StopId, parent: StopId },

    /// A stop lists a child that does not point back at it
    #[error("stop {child} is listed as a child of {parent} but names a different parent")]
    MismatchedChild { parent: StopId, child: StopId },

    /// A leaf was built with trips but no route patterns to explain them
    #[error("leaf at {stop} direction {direction_id} has trips but no route patterns")]
    LeafWithoutPatterns { stop: StopId, direction_id: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let stop = StopId::new("70075").unwrap();
        let parent = StopId::new("place-pktrm").unwrap();

        let err = DomainError::DanglingParent {
            stop: stop.clone(),
            parent: parent.clone(),
        };
        assert_eq!(
            err.to_string(),
            "stop 70075 references missing parent station place-pktrm"
        );

        let err = DomainError::MismatchedChild {
            parent,
            child: stop.clone(),
        };
        assert_eq!(
            err.to_string(),
            "stop 70075 is listed as a child of place-pktrm but names a different parent"
        );

        let err = DomainError::LeafWithoutPatterns {
            stop,
            direction_id: 1,
        };
        assert_eq!(
            err.to_string(),
            "leaf at 70075 direction 1 has trips but no route patterns"
        );
    }
}
