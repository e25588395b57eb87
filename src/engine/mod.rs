//! The data collection engine.
//!
//! Every data source is modelled as a [`Fetcher`]: a named unit of work that
//! declares which other fetchers it depends on. The [`Controller`] arranges
//! the fetchers into a Directed Acyclic Graph, runs it level by level, and
//! publishes the outputs into a [`Snapshot`] that generators query by
//! [`FetcherName`](crate::FetcherName) and expected type.
//!
//! ## Type erasure
//!
//! Outputs differ per fetcher, so the graph stores them all as
//! `Arc<dyn Any + Send + Sync>`. Concrete fetchers implement
//! [`TypedFetcher`] with a real output type, and a blanket implementation
//! turns them into the object-safe [`Fetcher`] the controller holds. Reading
//! goes the other way: [`Snapshot::get`] and [`Dependencies::get`] downcast
//! to the requested type, and treat a mismatch as a missing value.
//!
//! ## Partial failure
//!
//! Fetchers report every remote call as a [`QueryInfo`] next to their
//! output. A failed call only removes its own data point, it never fails the
//! fetcher, and a failed fetcher never fails the collection.

mod controller;
mod harvest;
mod queries;
mod snapshot;
mod task;

pub use crate::engine::controller::{Collected, Controller, FetcherExecution};
pub use crate::engine::harvest::Harvest;
pub use crate::engine::queries::QueryInfo;
pub(crate) use crate::engine::queries::QueryLog;
pub use crate::engine::snapshot::Snapshot;
pub use crate::engine::task::{Dependencies, FetchContext, Fetcher, TypedFetcher};
