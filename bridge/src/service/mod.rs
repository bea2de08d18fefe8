//! Service layer

pub mod bridge;
pub mod delivery;
pub mod modules;
