//! # TPS Common Library
//!
//! Shared code for the training placement school services:
//! - Error and result types
//! - Bootstrap configuration and root folder resolution
//! - Database schema creation and row models

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
