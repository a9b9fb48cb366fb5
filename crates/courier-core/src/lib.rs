//! # courier-core
//!
//! Configuration types shared by the Courier crates.

pub mod config;

pub use config::{
    ConfigError, CourierConfig, McpConfig, RetryConfig, SlackConfig, StoreConfig,
};
