//! Replicated security: consumer chains as seen from their provider.
//!
//! Every query here goes to the provider chain, so its records carry the
//! provider's name. Outputs are keyed by the configured consumer chain name.
//! Consumer chains without a `consumer-id` are left out.
use async_trait::async_trait;
use futures::future::join_all;

use crate::core::FetcherName;
use crate::engine::{Dependencies, FetchContext, Harvest, QueryInfo, TypedFetcher};
use crate::fetchers::{ByChain, ByValidator, insert, validators};
use crate::rpc::types::{ConsumerChainInfo, ConsumerValidator};
use crate::rpc::{ChainClient, Clients, ConsumerClient};

/// Every consumer chain with a known consumer id, along with its provider.
fn consumers(
    clients: &[ChainClient],
) -> impl Iterator<Item = (&ChainClient, &ConsumerClient, &str)> {
    clients.iter().flat_map(|client| {
        client.consumers.iter().filter_map(move |consumer| {
            let id = consumer.chain.consumer_id.as_deref()?;
            Some((client, consumer, id))
        })
    })
}

fn has_consumers(client: &ChainClient) -> bool {
    client
        .consumers
        .iter()
        .any(|consumer| consumer.chain.consumer_id.is_some())
}

/// Provider-side parameters of every consumer chain.
pub struct ConsumerInfoFetcher {
    clients: Clients,
}

impl ConsumerInfoFetcher {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedFetcher for ConsumerInfoFetcher {
    type Output = ByChain<ConsumerChainInfo>;

    fn name(&self) -> FetcherName {
        FetcherName::ConsumerInfo
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        _: &Dependencies,
    ) -> anyhow::Result<(Self::Output, Vec<QueryInfo>)> {
        let harvest = Harvest::<Self::Output>::default();

        let units = self.clients.iter().filter(|c| has_consumers(c)).map(|client| {
            let harvest = &harvest;
            async move {
                let (info, result) = client.rpc.consumer_chains(context).await;
                harvest.record(info, result, |data, chains| {
                    for consumer in &client.consumers {
                        let Some(id) = consumer.chain.consumer_id.as_deref() else {
                            continue;
                        };

                        match chains.iter().find(|chain| chain.consumer_id == id) {
                            Some(chain) => {
                                data.insert(consumer.chain.name.clone(), chain.clone());
                            }
                            None => tracing::warn!(
                                chain = %consumer.chain.name,
                                consumer_id = %id,
                                "consumer chain is not launched on its provider"
                            ),
                        }
                    }
                });
            }
        });

        join_all(units).await;
        Ok(harvest.finish())
    }
}

/// Validator set of every consumer chain.
pub struct ConsumerValidatorsFetcher {
    clients: Clients,
}

impl ConsumerValidatorsFetcher {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedFetcher for ConsumerValidatorsFetcher {
    type Output = ByChain<Vec<ConsumerValidator>>;

    fn name(&self) -> FetcherName {
        FetcherName::ConsumerValidators
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        _: &Dependencies,
    ) -> anyhow::Result<(Self::Output, Vec<QueryInfo>)> {
        let harvest = Harvest::<Self::Output>::default();

        let units = consumers(&self.clients).map(|(provider, consumer, id)| {
            let harvest = &harvest;
            async move {
                let (info, result) = provider.rpc.consumer_validators(id, context).await;
                harvest.record(info, result, |data, validators| {
                    data.insert(consumer.chain.name.clone(), validators);
                });
            }
        });

        join_all(units).await;
        Ok(harvest.finish())
    }
}

/// Names of the consumer chains every configured validator has to validate,
/// either opted in or as part of the top N.
pub struct ValidatorConsumersFetcher {
    clients: Clients,
}

impl ValidatorConsumersFetcher {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedFetcher for ValidatorConsumersFetcher {
    type Output = ByValidator<Vec<String>>;

    fn name(&self) -> FetcherName {
        FetcherName::ValidatorConsumers
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        _: &Dependencies,
    ) -> anyhow::Result<(Self::Output, Vec<QueryInfo>)> {
        let harvest = Harvest::<Self::Output>::default();

        let units = validators(&self.clients)
            .filter(|(client, _)| has_consumers(client))
            .filter_map(|(client, validator)| {
                let address = validator.consensus_address.as_deref()?;
                let harvest = &harvest;
                Some(async move {
                    let (info, result) = client.rpc.validator_consumers(address, context).await;
                    harvest.record(info, result, |data, ids| {
                        // Consumer chains which aren't configured are dropped.
                        let names = client
                            .consumers
                            .iter()
                            .filter(|consumer| {
                                let id = consumer.chain.consumer_id.as_ref();
                                id.is_some_and(|id| ids.contains(id))
                            })
                            .map(|consumer| consumer.chain.name.clone())
                            .collect();
                        insert(data, &client.chain.name, &validator.address, names);
                    });
                })
            });

        join_all(units).await;
        Ok(harvest.finish())
    }
}

/// Commission rate of every configured validator on every consumer chain it
/// validates. Keyed by consumer chain name, then by operator address.
pub struct ConsumerCommissionFetcher {
    clients: Clients,
}

impl ConsumerCommissionFetcher {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedFetcher for ConsumerCommissionFetcher {
    type Output = ByValidator<f64>;

    fn name(&self) -> FetcherName {
        FetcherName::ConsumerCommission
    }

    fn dependencies(&self) -> Vec<FetcherName> {
        vec![FetcherName::ValidatorConsumers]
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        dependencies: &Dependencies,
    ) -> anyhow::Result<(Self::Output, Vec<QueryInfo>)> {
        let validated =
            dependencies.get::<ByValidator<Vec<String>>>(FetcherName::ValidatorConsumers)?;
        let harvest = Harvest::<Self::Output>::default();

        let units = consumers(&self.clients).flat_map(|(provider, consumer, id)| {
            let harvest = &harvest;
            provider
                .chain
                .validators
                .iter()
                .filter(move |validator| {
                    validated
                        .get(&provider.chain.name)
                        .and_then(|chains| chains.get(&validator.address))
                        .is_some_and(|chains| chains.contains(&consumer.chain.name))
                })
                .filter_map(move |validator| {
                    let address = validator.consensus_address.as_deref()?;
                    Some(async move {
                        let (info, result) =
                            provider.rpc.consumer_commission(id, address, context).await;
                        harvest.record(info, result, |data, rate| {
                            insert(data, &consumer.chain.name, &validator.address, rate);
                        });
                    })
                })
        });

        join_all(units).await;
        Ok(harvest.finish())
    }
}
