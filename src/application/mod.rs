//! Application services layer.

pub mod error;
pub mod listings;
pub mod mirror;
pub mod payments;
pub mod ranking;
pub mod repos;
pub mod reviews;
pub mod seed;
