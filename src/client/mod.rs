//! Array transport
//!
//! [`RestClient`] implements the [`crate::domain::ports::ArrayApi`] and
//! [`crate::domain::ports::QuotaManager`] ports over the array's REST
//! management API.

pub mod rest;

pub use rest::RestClient;
