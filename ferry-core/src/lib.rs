//! Ferry Core
//!
//! Core types shared by every Ferry component.
//!
//! This crate contains:
//! - Domain types: the validated job request, file references and the metrics record
//! - DTOs: the trigger request as it arrives on the wire and the response envelope

pub mod domain;
pub mod dto;
