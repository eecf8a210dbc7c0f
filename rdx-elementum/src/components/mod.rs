//! Components that react to the hub and drive a run.

pub mod core_loop;
pub mod pause;
pub mod persistence;
