//! Gateway request handlers

pub mod proxy;
pub mod service;

pub use proxy::*;
pub use service::*;
