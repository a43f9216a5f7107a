//! HTTP inbound adapter exposing REST endpoints.

pub mod cache_control;
pub mod error;
pub mod health;
pub mod places;
pub mod state;

pub use error::ApiResult;
