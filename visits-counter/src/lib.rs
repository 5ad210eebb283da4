pub use crate::{
    service::CounterService,
    error::CounterError,
};

pub mod config;
pub mod dynamodb;
pub mod error;
pub mod lambda;
pub mod logs;
pub mod metrics;
pub mod server;
pub mod service;
pub mod store;
