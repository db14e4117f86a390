//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `identity` - Identity provider accounts and tokens
//! - `backend` - Festival backend (profiles, products, QR, checkout)
//! - `mailer` - Verification code dispatch
//! - `auth` - Sign-in and the registration workflow
//! - `ticker` - Live resend countdowns
//! - `catalog` - Product catalog poller
//! - `arcade` - Arcade frame loop
//! - `qr` - Entry pass rendering
//! - `contact` - Contact form relay

pub mod arcade;
pub mod auth;
pub mod backend;
pub mod catalog;
pub mod contact;
pub mod identity;
pub mod mailer;
pub mod qr;
pub mod ticker;
