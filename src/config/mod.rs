//! Monitor Configuration Module
//!
//! Per-deployment configuration loaded from TOML, with SMTP credentials and
//! bus identity overridable from the environment.
//!
//! ## Loading Order
//!
//! 1. Explicit path (`--config`) or the `CROWDWATCH_CONFIG` environment variable
//! 2. `crowdwatch.toml` in the current working directory
//! 3. Built-in defaults
//!
//! Environment overrides are applied on top of whichever source won, then the
//! result is validated. A config that fails validation is a fatal startup
//! error: the pipeline never starts without a complete SMTP setup.

mod monitor_config;
pub mod defaults;
pub mod validation;

pub use monitor_config::*;
