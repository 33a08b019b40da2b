//! Temporary terminals: detecting when a disruption moves a rail route's
//! effective terminus and reshaping the patterns shown at a stop to match.

mod filter;
pub(crate) mod patterns;
mod rewriter;

pub use filter::TemporaryTerminalFilter;
pub use patterns::{PatternGrouping, RouteActivity, StopPatterns, contains_subsequence};
pub use rewriter::{TemporaryTerminalRewriter, Truncations};
