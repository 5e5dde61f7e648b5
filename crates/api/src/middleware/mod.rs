//! Cross-cutting request concerns.

pub mod cors;
pub mod rate_limit;
