use std::any::type_name;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::{Dynamic, FetcherName};
use crate::engine::QueryInfo;
use crate::error::DependencyError;

/// The cancellable context shared by one collection run.
///
/// A single token flows from the request into every fetcher and every remote
/// call. Once it is cancelled, remote calls stop being issued and fetchers
/// return whatever they managed to collect.
#[derive(Debug, Clone, Default)]
pub struct FetchContext {
    token: CancellationToken,
}

impl FetchContext {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the context is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// The completed outputs of a fetcher's declared dependencies.
pub struct Dependencies {
    outputs: HashMap<FetcherName, Dynamic>,
}

impl Dependencies {
    pub(crate) fn new(outputs: HashMap<FetcherName, Dynamic>) -> Self {
        Self { outputs }
    }

    pub fn empty() -> Self {
        Self {
            outputs: HashMap::new(),
        }
    }

    /// Looks up the output of a declared dependency.
    ///
    /// Asking for an undeclared dependency, or for the wrong type, is a
    /// programming error in the fetcher and is reported as such.
    pub fn get<T>(&self, name: FetcherName) -> Result<&T, DependencyError>
    where
        T: Send + Sync + 'static,
    {
        self.outputs
            .get(&name)
            .ok_or(DependencyError::Undeclared(name))?
            .downcast_ref::<T>()
            .ok_or(DependencyError::WrongType {
                name,
                expected: type_name::<T>(),
            })
    }
}

/// A fetcher with a concrete output type.
///
/// This is the trait concrete data sources implement. Its `fetch` typically
/// fans out into one concurrent remote call per chain or per validator and
/// merges them through a [`Harvest`](crate::engine::Harvest). A failure of a
/// single call must not fail the fetcher, only an unusable dependency should.
#[async_trait]
pub trait TypedFetcher: Send + Sync {
    type Output: Send + Sync + 'static;

    fn name(&self) -> FetcherName;

    fn dependencies(&self) -> Vec<FetcherName> {
        Vec::new()
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        dependencies: &Dependencies,
    ) -> anyhow::Result<(Self::Output, Vec<QueryInfo>)>;
}

/// The type-erased fetcher the controller drives.
///
/// Implemented for every [`TypedFetcher`], which allows the controller to
/// hold fetchers with different output types side by side.
#[async_trait]
pub trait Fetcher: Send + Sync {
    fn name(&self) -> FetcherName;

    fn output_type_name(&self) -> &'static str;

    fn dependencies(&self) -> Vec<FetcherName>;

    async fn fetch(
        &self,
        context: &FetchContext,
        dependencies: &Dependencies,
    ) -> anyhow::Result<(Dynamic, Vec<QueryInfo>)>;
}

// A blanket implementation to automatically bridge the two. This is where the
// type erasure actually happens.
#[async_trait]
impl<T> Fetcher for T
where
    T: TypedFetcher + 'static,
{
    fn name(&self) -> FetcherName {
        T::name(self)
    }

    fn output_type_name(&self) -> &'static str {
        type_name::<T::Output>()
    }

    fn dependencies(&self) -> Vec<FetcherName> {
        T::dependencies(self)
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        dependencies: &Dependencies,
    ) -> anyhow::Result<(Dynamic, Vec<QueryInfo>)> {
        let (output, queries) = T::fetch(self, context, dependencies).await?;
        Ok((Arc::new(output), queries))
    }
}
