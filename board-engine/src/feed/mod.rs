//! Latest feed snapshots, shared between the HTTP layer and board passes.
//!
//! Each feed is replaced wholesale when a new snapshot arrives. Readers take
//! a [`FeedSet`] snapshot and build boards from it without holding a lock.

mod error;
mod store;

pub use error::FeedError;
pub use store::{FeedKind, FeedSet, FeedStore, load_global};
