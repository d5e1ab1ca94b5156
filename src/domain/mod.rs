//! Domain types and ports

pub mod model;
pub mod ports;

pub use model::*;
pub use ports::*;
