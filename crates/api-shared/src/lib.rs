//! # API Shared
//!
//! Wire types and shared services for the BannerShare HTTP API.
//!
//! Contains:
//! - Request and response bodies (`dto` module), serialized in camelCase
//! - `HealthService`
//!
//! Used by `api-rest` on the server side and by the CLI's HTTP client, so both ends agree
//! on field names.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
