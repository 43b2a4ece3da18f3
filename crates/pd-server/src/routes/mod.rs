//! Route handlers grouped by resource.

pub mod health;
pub mod images;
pub mod upload;
