//! Core types for Celesta.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;

pub use email::{Email, EmailError, INSTITUTE_DOMAIN};
pub use id::*;
pub use price::Price;
