//! Shared helpers.

pub mod fs;
pub mod pidfile;

pub use pidfile::PidFileGuard;
