use std::sync::{Mutex, PoisonError};

use crate::engine::QueryInfo;
use crate::error::RpcError;

/// Accumulates the results of a fetcher's concurrent sub-queries.
///
/// A fetcher launches one future per remote target (chain, validator, ...)
/// and every one of them reports back through [`Harvest::record`]. The query
/// record and the successful value are stored under a single lock, owned by
/// that one fetcher execution. Failed results only leave their query record
/// behind, the data point itself is omitted.
pub struct Harvest<T> {
    inner: Mutex<Inner<T>>,
}

struct Inner<T> {
    data: T,
    queries: Vec<QueryInfo>,
}

impl<T> Harvest<T> {
    pub fn new(data: T) -> Self {
        Self {
            inner: Mutex::new(Inner {
                data,
                queries: Vec::new(),
            }),
        }
    }

    pub fn record<V>(
        &self,
        query: Option<QueryInfo>,
        result: Result<V, RpcError>,
        merge: impl FnOnce(&mut T, V),
    ) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.queries.extend(query);

        if let Ok(value) = result {
            merge(&mut inner.data, value);
        }
    }

    pub fn finish(self) -> (T, Vec<QueryInfo>) {
        let inner = self.inner.into_inner().unwrap_or_else(PoisonError::into_inner);
        (inner.data, inner.queries)
    }
}

impl<T: Default> Default for Harvest<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
