//! Concrete data sources.
//!
//! Every fetcher fans out into one remote call per chain or per validator
//! and merges the answers into a map. A map only gets an entry once data
//! for it actually arrived.
mod chain;
mod consumers;
mod params;
mod price;
mod validators;
mod wallets;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;

pub use crate::fetchers::chain::{InflationFetcher, NodeInfoFetcher, SupplyFetcher};
pub use crate::fetchers::consumers::{
    ConsumerCommissionFetcher, ConsumerInfoFetcher, ConsumerValidatorsFetcher,
    ValidatorConsumersFetcher,
};
pub use crate::fetchers::params::{SlashingParamsFetcher, StakingParamsFetcher};
pub use crate::fetchers::price::{BASE_CURRENCY, PriceData, PriceFetcher};
pub use crate::fetchers::validators::{
    CommissionFetcher, DelegationsFetcher, SigningInfosFetcher, UnbondsFetcher, ValidatorsFetcher,
};
pub use crate::fetchers::wallets::{
    BalancesFetcher, RewardsFetcher, SelfDelegationsFetcher, WalletsFetcher,
};

use crate::config::Validator;
use crate::engine::{Fetcher, Harvest, QueryInfo};
use crate::rpc::{ChainClient, Clients, Query, Rpc};

/// Values keyed by chain name.
pub type ByChain<T> = BTreeMap<String, T>;

/// Values keyed by chain name, then by validator operator address.
pub type ByValidator<T> = BTreeMap<String, BTreeMap<String, T>>;

/// Every fetcher the exporter runs.
pub fn registry(clients: &Clients, coingecko: Rpc) -> Vec<Arc<dyn Fetcher>> {
    vec![
        Arc::new(SlashingParamsFetcher::new(clients.clone())),
        Arc::new(StakingParamsFetcher::new(clients.clone())),
        Arc::new(ValidatorsFetcher::new(clients.clone())),
        Arc::new(UnbondsFetcher::new(clients.clone())),
        Arc::new(DelegationsFetcher::new(clients.clone())),
        Arc::new(CommissionFetcher::new(clients.clone())),
        Arc::new(WalletsFetcher::new(clients.clone())),
        Arc::new(SelfDelegationsFetcher::new(clients.clone())),
        Arc::new(BalancesFetcher::new(clients.clone())),
        Arc::new(RewardsFetcher::new(clients.clone())),
        Arc::new(SigningInfosFetcher::new(clients.clone())),
        Arc::new(NodeInfoFetcher::new(clients.clone())),
        Arc::new(InflationFetcher::new(clients.clone())),
        Arc::new(SupplyFetcher::new(clients.clone())),
        Arc::new(PriceFetcher::new(clients.clone(), coingecko)),
        Arc::new(ConsumerInfoFetcher::new(clients.clone())),
        Arc::new(ConsumerValidatorsFetcher::new(clients.clone())),
        Arc::new(ValidatorConsumersFetcher::new(clients.clone())),
        Arc::new(ConsumerCommissionFetcher::new(clients.clone())),
    ]
}

/// Provider chain clients.
fn providers(clients: &[ChainClient]) -> impl Iterator<Item = &Rpc> {
    clients.iter().map(|client| &client.rpc)
}

/// Provider and consumer chain clients.
fn all_chains(clients: &[ChainClient]) -> impl Iterator<Item = &Rpc> {
    clients.iter().flat_map(|client| {
        std::iter::once(&client.rpc).chain(client.consumers.iter().map(|consumer| &consumer.rpc))
    })
}

/// Runs `query` once for every given chain.
async fn per_chain<'a, V, F, Fut>(
    rpcs: impl IntoIterator<Item = &'a Rpc>,
    query: F,
) -> (ByChain<V>, Vec<QueryInfo>)
where
    F: Fn(&'a Rpc) -> Fut,
    Fut: Future<Output = Query<V>>,
{
    let harvest = Harvest::<ByChain<V>>::default();

    let units = rpcs.into_iter().map(|rpc| {
        let harvest = &harvest;
        let call = query(rpc);
        async move {
            let (info, result) = call.await;
            harvest.record(info, result, |data, value| {
                data.insert(rpc.chain().to_string(), value);
            });
        }
    });

    join_all(units).await;
    harvest.finish()
}

/// Runs `query` once for every configured validator of every provider chain.
async fn per_validator<'a, V, F, Fut>(
    clients: &'a [ChainClient],
    query: F,
) -> (ByValidator<V>, Vec<QueryInfo>)
where
    F: Fn(&'a ChainClient, &'a Validator) -> Fut,
    Fut: Future<Output = Query<V>>,
{
    let harvest = Harvest::<ByValidator<V>>::default();

    let units = validators(clients).map(|(client, validator)| {
        let harvest = &harvest;
        let call = query(client, validator);
        async move {
            let (info, result) = call.await;
            harvest.record(info, result, |data, value| {
                insert(data, &client.chain.name, &validator.address, value);
            });
        }
    });

    join_all(units).await;
    harvest.finish()
}

fn validators(clients: &[ChainClient]) -> impl Iterator<Item = (&ChainClient, &Validator)> {
    clients.iter().flat_map(|client| {
        client
            .chain
            .validators
            .iter()
            .map(move |validator| (client, validator))
    })
}

pub(crate) fn insert<V>(data: &mut ByValidator<V>, chain: &str, validator: &str, value: V) {
    data.entry(chain.to_string())
        .or_default()
        .insert(validator.to_string(), value);
}

/// Looks up a per-validator value.
pub fn lookup<'a, V>(data: &'a ByValidator<V>, chain: &str, validator: &str) -> Option<&'a V> {
    data.get(chain)?.get(validator)
}

#[cfg(test)]
mod tests {
    use crate::engine::Controller;
    use crate::rpc::build_clients;

    use super::*;

    #[test]
    fn test_registry_graph() {
        let config = crate::testing::config("http://localhost:1317");
        let clients = build_clients(&config, &reqwest::Client::new());
        let coingecko = Rpc::new("coingecko", "http://localhost", reqwest::Client::new());

        let controller = Controller::new(registry(&clients, coingecko)).unwrap();
        let levels = controller.levels();

        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].len(), 15);
        assert_eq!(levels[1].len(), 4);
    }

    #[test]
    fn test_all_chains() {
        let config = crate::testing::config("http://localhost:1317");
        let clients = build_clients(&config, &reqwest::Client::new());

        let names: Vec<_> = all_chains(&clients).map(Rpc::chain).collect();
        assert_eq!(names, ["cosmos", "neutron"]);
        assert_eq!(providers(&clients).count(), 1);
    }
}
