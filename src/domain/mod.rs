//! Domain layer types and invariants.

pub mod entities;
pub mod error;
pub mod geo;
pub mod price;
pub mod ranking;
pub mod reviews;
pub mod search;
