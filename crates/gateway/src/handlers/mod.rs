//! API handlers module

pub mod crawls;
pub mod health;
pub mod jobs;
pub mod papers;
