use async_trait::async_trait;

use crate::core::FetcherName;
use crate::engine::{Dependencies, FetchContext, QueryInfo, TypedFetcher};
use crate::fetchers::{ByChain, all_chains, per_chain, providers};
use crate::rpc::Clients;
use crate::rpc::types::{SlashingParams, StakingParams};

/// Slashing parameters of every provider and consumer chain.
pub struct SlashingParamsFetcher {
    clients: Clients,
}

impl SlashingParamsFetcher {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedFetcher for SlashingParamsFetcher {
    type Output = ByChain<SlashingParams>;

    fn name(&self) -> FetcherName {
        FetcherName::SlashingParams
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        _: &Dependencies,
    ) -> anyhow::Result<(Self::Output, Vec<QueryInfo>)> {
        Ok(per_chain(all_chains(&self.clients), |rpc| rpc.slashing_params(context)).await)
    }
}

/// Staking parameters of every provider chain.
///
/// Consumer chains share the staking module of their provider, so they get a
/// copy of the provider's parameters without a query of their own.
pub struct StakingParamsFetcher {
    clients: Clients,
}

impl StakingParamsFetcher {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedFetcher for StakingParamsFetcher {
    type Output = ByChain<StakingParams>;

    fn name(&self) -> FetcherName {
        FetcherName::StakingParams
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        _: &Dependencies,
    ) -> anyhow::Result<(Self::Output, Vec<QueryInfo>)> {
        let (mut params, queries) =
            per_chain(providers(&self.clients), |rpc| rpc.staking_params(context)).await;

        for client in self.clients.iter() {
            let Some(provider) = params.get(&client.chain.name).cloned() else {
                continue;
            };

            for consumer in &client.consumers {
                params.insert(consumer.chain.name.clone(), provider.clone());
            }
        }

        Ok((params, queries))
    }
}
