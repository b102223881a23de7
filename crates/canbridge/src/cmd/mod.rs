//! Command implementations for the canbridge CLI

pub mod decode;
pub mod schema;
pub mod serve;
