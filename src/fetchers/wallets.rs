use std::future::Future;

use async_trait::async_trait;
use futures::future::join_all;

use crate::core::FetcherName;
use crate::engine::{Dependencies, FetchContext, Harvest, QueryInfo, TypedFetcher};
use crate::fetchers::{ByValidator, insert, lookup, per_validator, validators};
use crate::rpc::types::Coin;
use crate::rpc::{ChainClient, Clients, Query};

/// Account address of every configured validator's operator.
pub struct WalletsFetcher {
    clients: Clients,
}

impl WalletsFetcher {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedFetcher for WalletsFetcher {
    type Output = ByValidator<String>;

    fn name(&self) -> FetcherName {
        FetcherName::Wallets
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        _: &Dependencies,
    ) -> anyhow::Result<(Self::Output, Vec<QueryInfo>)> {
        Ok(per_validator(&self.clients, |client, validator| {
            client.rpc.validator_wallet(&validator.address, context)
        })
        .await)
    }
}

/// Runs `query` for every configured validator whose wallet is known.
async fn per_wallet<'a, V, F, Fut>(
    clients: &'a [ChainClient],
    wallets: &'a ByValidator<String>,
    query: F,
) -> (ByValidator<V>, Vec<QueryInfo>)
where
    F: Fn(&'a ChainClient, &'a str, &'a str) -> Fut,
    Fut: Future<Output = Query<V>>,
{
    let harvest = Harvest::<ByValidator<V>>::default();

    let units = validators(clients).filter_map(|(client, validator)| {
        let wallet = lookup(wallets, &client.chain.name, &validator.address)?;
        let harvest = &harvest;
        let call = query(client, &validator.address, wallet);
        Some(async move {
            let (info, result) = call.await;
            harvest.record(info, result, |data, value| {
                insert(data, &client.chain.name, &validator.address, value);
            });
        })
    });

    join_all(units).await;
    harvest.finish()
}

/// Stake every configured validator delegated to itself.
pub struct SelfDelegationsFetcher {
    clients: Clients,
}

impl SelfDelegationsFetcher {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedFetcher for SelfDelegationsFetcher {
    type Output = ByValidator<Coin>;

    fn name(&self) -> FetcherName {
        FetcherName::SelfDelegations
    }

    fn dependencies(&self) -> Vec<FetcherName> {
        vec![FetcherName::Wallets]
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        dependencies: &Dependencies,
    ) -> anyhow::Result<(Self::Output, Vec<QueryInfo>)> {
        let wallets = dependencies.get::<ByValidator<String>>(FetcherName::Wallets)?;

        Ok(per_wallet(&self.clients, wallets, |client, validator, wallet| {
            client.rpc.self_delegation(validator, wallet, context)
        })
        .await)
    }
}

/// Balance of every configured validator's wallet.
pub struct BalancesFetcher {
    clients: Clients,
}

impl BalancesFetcher {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedFetcher for BalancesFetcher {
    type Output = ByValidator<Vec<Coin>>;

    fn name(&self) -> FetcherName {
        FetcherName::Balances
    }

    fn dependencies(&self) -> Vec<FetcherName> {
        vec![FetcherName::Wallets]
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        dependencies: &Dependencies,
    ) -> anyhow::Result<(Self::Output, Vec<QueryInfo>)> {
        let wallets = dependencies.get::<ByValidator<String>>(FetcherName::Wallets)?;

        Ok(per_wallet(&self.clients, wallets, |client, _, wallet| {
            client.rpc.balance(wallet, context)
        })
        .await)
    }
}

/// Unclaimed self-delegation rewards of every configured validator.
pub struct RewardsFetcher {
    clients: Clients,
}

impl RewardsFetcher {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedFetcher for RewardsFetcher {
    type Output = ByValidator<Vec<Coin>>;

    fn name(&self) -> FetcherName {
        FetcherName::Rewards
    }

    fn dependencies(&self) -> Vec<FetcherName> {
        vec![FetcherName::Wallets]
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        dependencies: &Dependencies,
    ) -> anyhow::Result<(Self::Output, Vec<QueryInfo>)> {
        let wallets = dependencies.get::<ByValidator<String>>(FetcherName::Wallets)?;

        Ok(per_wallet(&self.clients, wallets, |client, validator, wallet| {
            client.rpc.rewards(wallet, validator, context)
        })
        .await)
    }
}
