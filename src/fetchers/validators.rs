use async_trait::async_trait;
use futures::future::join_all;

use crate::core::FetcherName;
use crate::engine::{Dependencies, FetchContext, Harvest, QueryInfo, TypedFetcher};
use crate::fetchers::{ByChain, ByValidator, insert, per_chain, per_validator, providers, validators};
use crate::rpc::Clients;
use crate::rpc::types::{Coin, SigningInfo, Validator};

/// The whole validator set of every provider chain.
pub struct ValidatorsFetcher {
    clients: Clients,
}

impl ValidatorsFetcher {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedFetcher for ValidatorsFetcher {
    type Output = ByChain<Vec<Validator>>;

    fn name(&self) -> FetcherName {
        FetcherName::Validators
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        _: &Dependencies,
    ) -> anyhow::Result<(Self::Output, Vec<QueryInfo>)> {
        Ok(per_chain(providers(&self.clients), |rpc| rpc.validators(context)).await)
    }
}

/// Number of unbonding delegations of every configured validator.
pub struct UnbondsFetcher {
    clients: Clients,
}

impl UnbondsFetcher {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedFetcher for UnbondsFetcher {
    type Output = ByValidator<u64>;

    fn name(&self) -> FetcherName {
        FetcherName::Unbonds
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        _: &Dependencies,
    ) -> anyhow::Result<(Self::Output, Vec<QueryInfo>)> {
        Ok(per_validator(&self.clients, |client, validator| {
            client.rpc.unbonds_count(&validator.address, context)
        })
        .await)
    }
}

/// Number of delegators of every configured validator.
pub struct DelegationsFetcher {
    clients: Clients,
}

impl DelegationsFetcher {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedFetcher for DelegationsFetcher {
    type Output = ByValidator<u64>;

    fn name(&self) -> FetcherName {
        FetcherName::Delegations
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        _: &Dependencies,
    ) -> anyhow::Result<(Self::Output, Vec<QueryInfo>)> {
        Ok(per_validator(&self.clients, |client, validator| {
            client.rpc.delegations_count(&validator.address, context)
        })
        .await)
    }
}

/// Unclaimed commission of every configured validator.
pub struct CommissionFetcher {
    clients: Clients,
}

impl CommissionFetcher {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedFetcher for CommissionFetcher {
    type Output = ByValidator<Vec<Coin>>;

    fn name(&self) -> FetcherName {
        FetcherName::Commission
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        _: &Dependencies,
    ) -> anyhow::Result<(Self::Output, Vec<QueryInfo>)> {
        Ok(per_validator(&self.clients, |client, validator| {
            client.rpc.commission(&validator.address, context)
        })
        .await)
    }
}

/// Signing info of every configured validator with a consensus address.
pub struct SigningInfosFetcher {
    clients: Clients,
}

impl SigningInfosFetcher {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl TypedFetcher for SigningInfosFetcher {
    type Output = ByValidator<SigningInfo>;

    fn name(&self) -> FetcherName {
        FetcherName::SigningInfos
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        _: &Dependencies,
    ) -> anyhow::Result<(Self::Output, Vec<QueryInfo>)> {
        let harvest = Harvest::<Self::Output>::default();

        let units = validators(&self.clients).filter_map(|(client, validator)| {
            let address = validator.consensus_address.as_deref()?;
            let harvest = &harvest;
            Some(async move {
                let (info, result) = client.rpc.signing_info(address, context).await;
                harvest.record(info, result, |data, value| {
                    insert(data, &client.chain.name, &validator.address, value);
                });
            })
        });

        join_all(units).await;
        Ok(harvest.finish())
    }
}
