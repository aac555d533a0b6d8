//! Shared utilities for the routing gateway

pub mod error;

pub use error::{Result, RouterError};
