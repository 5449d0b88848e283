//! Signal admission filter.
//!
//! A [`Tumbler`] is a named whitelist of signal codes a node is willing to
//! admit. It is independent of handler registration: a node can handle a
//! signal and still refuse it at the door, and the refusal is counted.

pub mod stats;
pub mod tumbler;

pub use stats::TumblerStats;
pub use tumbler::Tumbler;
