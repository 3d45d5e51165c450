//! API Routes

pub mod deprecated;
pub mod follow;
pub mod health;
pub mod posts;
pub mod token;
