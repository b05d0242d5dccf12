//! Domain layer: entities, ports and shared error types.

pub mod errors;
pub mod ids;
pub mod models;
pub mod ports;
