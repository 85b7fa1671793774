//! Port traits decoupling the domain from concrete data and config sources.

pub mod config_port;
pub mod data_port;
