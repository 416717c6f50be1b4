// Library exports for tests and binaries
pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod games;
pub mod i18n;
pub mod progress;
pub mod store;

pub use error::{Error, Result};
