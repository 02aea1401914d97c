//! Request handlers.

pub mod lists;
pub mod stats;
pub mod sync;
