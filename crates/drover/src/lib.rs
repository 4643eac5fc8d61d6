pub mod client;
pub mod common;
pub mod master;
pub mod rm;
pub mod worker;

#[cfg(test)]
pub(crate) mod tests;

pub type Error = crate::common::error::DroverError;
pub type Result<T> = std::result::Result<T, Error>;

pub type Map<K, V> = std::collections::HashMap<K, V>;

pub const DROVER_VERSION: &str = env!("CARGO_PKG_VERSION");
