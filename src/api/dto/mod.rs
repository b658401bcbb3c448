//! Data Transfer Objects for REST request/response serialization.
//!
//! Field names follow the public camelCase contract of the HTTP surface.

pub mod auth_dto;
pub mod earthquake_dto;
pub mod stats_dto;

pub use auth_dto::*;
pub use earthquake_dto::*;
pub use stats_dto::*;
