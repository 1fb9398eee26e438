//! # Vinyl Common Library
//!
//! Shared code for the Vinyl Stack services:
//! - Error types
//! - Wire protocol for the realtime control channel (inbound commands,
//!   outbound status messages)
//! - Event bus used to fan status messages out to subscribers
//! - Bootstrap configuration loading and data folder resolution

pub mod config;
pub mod error;
pub mod events;
pub mod protocol;

pub use error::{Error, Result};
