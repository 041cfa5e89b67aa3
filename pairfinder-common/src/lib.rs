//! Pairfinder Common - Shared types and utilities for the futures pair finder.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Configuration validation
//! - Error types with HTTP status mapping
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

pub use config::{
    Config, ExchangeEndpointConfig, ExchangesConfig, ObservabilityConfig, ScreenerConfig,
    ServiceConfig,
};
pub use error::Error;
pub use validation::{Validate, ValidationError, ValidationResult};
