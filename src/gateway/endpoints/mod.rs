//! Gateway endpoint handlers.
//!
//! Each handler maps to exactly one backend endpoint and owns the generic
//! message returned when forwarding fails.

pub mod auth;
pub mod chat;
pub mod health;
pub mod leads;
pub mod organizations;
pub mod speech;
