//! Data Transfer Objects
//!
//! Wire representations of the trigger request and the response envelope.

pub mod job;
pub mod response;
