//! Core domain types
//!
//! These types describe one job from the moment its request has been
//! validated until its response is produced. They are shared between the
//! runner (which executes jobs) and the adapters (server, CLI).

pub mod job;
pub mod metrics;
