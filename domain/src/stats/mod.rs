//! Run statistics.
//!
//! A single generic store of string-keyed counters and gauges. New
//! categories need no schema change: add a [`StatKey`] variant or use
//! [`StatKey::Custom`].

pub mod key;
pub mod store;

pub use key::{ParseCategory, StatKey};
pub use store::StatStore;
