//! Celesta Core - domain logic for the festival site.
//!
//! This crate provides the state machines and types used across all Celesta components:
//! - `storefront` - Public festival site (store, registration, sponsors)
//! - `cli` - Operator command-line tools
//!
//! # Architecture
//!
//! The core crate contains only types, state machines and pure functions - no I/O,
//! no HTTP clients, no clocks. Callers pass the current time and a random number
//! generator in explicitly, which keeps every transition deterministic under test.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices and emails
//! - [`cart`] - Cart store with derived count and total
//! - [`catalog`] - Product records offered by the store
//! - [`countdown`] - One-second countdown used by the resend control
//! - [`timer`] - Cancellation tokens for restartable timers
//! - [`otp`] - One-time code generation and challenges
//! - [`registration`] - Registration form validation and workflow states
//! - [`carousel`] - Sponsor carousel paging and gesture detection
//! - [`sponsors`] - Static sponsor list
//! - [`arcade`] - Space shooter simulation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod arcade;
pub mod carousel;
pub mod cart;
pub mod catalog;
pub mod countdown;
pub mod otp;
pub mod registration;
pub mod sponsors;
pub mod timer;
pub mod types;

pub use types::*;
