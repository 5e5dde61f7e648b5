//! Core types, validation, and rebate calculation for broker promotions.

pub mod analytics;
pub mod calculator;
pub mod error;
pub mod limits;
pub mod promotion;
pub mod query;
pub mod request;

pub use analytics::*;
pub use calculator::*;
pub use error::{Error, PromotionErrorCode, RequestErrorCode, Result};
pub use promotion::*;
pub use query::*;
pub use request::*;
