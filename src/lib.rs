#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub mod config;
mod core;
pub mod engine;
mod error;
mod exporter;
pub mod fetchers;
pub mod generators;
pub mod rpc;
pub mod server;
#[cfg(test)]
mod testing;
mod utils;

pub use crate::config::Config;
pub use crate::core::{Dynamic, FetcherName, METRICS_PREFIX};
pub use crate::engine::{
    Collected, Controller, Dependencies, FetchContext, Fetcher, QueryInfo, Snapshot, TypedFetcher,
};
pub use crate::error::*;
pub use crate::exporter::Exporter;
#[cfg(feature = "logging")]
pub use crate::utils::init_logging;
