use async_trait::async_trait;

use crate::core::FetcherName;
use crate::engine::{Dependencies, FetchContext, QueryInfo, TypedFetcher};
use crate::fetchers::{ByChain, all_chains, per_chain, providers};
use crate::rpc::Clients;
use crate::rpc::types::{Coin, NodeInfo};

/// Node and application version of every provider and consumer chain.
pub struct NodeInfoFetcher {
    clients: Clients,
}

impl NodeInfoFetcher {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedFetcher for NodeInfoFetcher {
    type Output = ByChain<NodeInfo>;

    fn name(&self) -> FetcherName {
        FetcherName::NodeInfo
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        _: &Dependencies,
    ) -> anyhow::Result<(Self::Output, Vec<QueryInfo>)> {
        Ok(per_chain(all_chains(&self.clients), |rpc| rpc.node_info(context)).await)
    }
}

pub struct InflationFetcher {
    clients: Clients,
}

impl InflationFetcher {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedFetcher for InflationFetcher {
    type Output = ByChain<f64>;

    fn name(&self) -> FetcherName {
        FetcherName::Inflation
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        _: &Dependencies,
    ) -> anyhow::Result<(Self::Output, Vec<QueryInfo>)> {
        Ok(per_chain(providers(&self.clients), |rpc| rpc.inflation(context)).await)
    }
}

/// Total supply of every provider chain, restricted to the configured denoms.
pub struct SupplyFetcher {
    clients: Clients,
}

impl SupplyFetcher {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedFetcher for SupplyFetcher {
    type Output = ByChain<Vec<Coin>>;

    fn name(&self) -> FetcherName {
        FetcherName::Supply
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        _: &Dependencies,
    ) -> anyhow::Result<(Self::Output, Vec<QueryInfo>)> {
        let (mut supply, queries) =
            per_chain(providers(&self.clients), |rpc| rpc.supply(context)).await;

        for client in self.clients.iter() {
            if let Some(coins) = supply.get_mut(&client.chain.name) {
                coins.retain(|coin| client.chain.find_denom(&coin.denom).is_some());
            }
        }

        Ok((supply, queries))
    }
}
