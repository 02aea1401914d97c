//! Background tasks: cache pre-warming and peer replication.

pub mod bootstrap;
pub mod sync;
