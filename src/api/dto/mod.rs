//! Data Transfer Objects for REST request/response serialization.
//!
//! Records are returned as stored (camelCase); request bodies carry only
//! the fields a caller may set.

pub mod common_dto;
pub mod expense_dto;
pub mod group_dto;
pub mod settlement_dto;
pub mod sync_dto;

pub use common_dto::*;
pub use expense_dto::*;
pub use group_dto::*;
pub use settlement_dto::*;
pub use sync_dto::*;
