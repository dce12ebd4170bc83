//! Ferry Server
//!
//! HTTP front end for the job runner. Each request runs one job to
//! completion and answers with its outcome.

pub mod api;
pub mod config;
