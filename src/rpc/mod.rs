//! Remote-call clients.
//!
//! Every query returns a [`Query`]: the record of the call (absent if the
//! call was never issued because the context got cancelled) together with
//! its typed result.
pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;

use crate::config::{Chain, Config, ConsumerChain};
use crate::engine::{FetchContext, QueryInfo};
use crate::error::RpcError;
use crate::rpc::types::*;

pub type Query<T> = (Option<QueryInfo>, Result<T, RpcError>);

/// HTTP client bound to a single host.
#[derive(Debug, Clone)]
pub struct Rpc {
    chain: String,
    host: String,
    client: reqwest::Client,
}

impl Rpc {
    pub fn new(chain: impl Into<String>, host: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            chain: chain.into(),
            host: host.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    /// Issues a GET request against `path` and decodes the JSON body.
    pub async fn get<T>(&self, path: &str, context: &FetchContext) -> Query<T>
    where
        T: DeserializeOwned,
    {
        if context.is_cancelled() {
            return (None, Err(RpcError::Cancelled));
        }

        let url = format!("{}{}", self.host, path);
        let start = Instant::now();

        let result = tokio::select! {
            _ = context.cancelled() => return (None, Err(RpcError::Cancelled)),
            result = self.request::<T>(&url) => result,
        };

        let duration = start.elapsed();

        if let Err(err) = &result {
            tracing::error!(chain = %self.chain, %url, "query failed: {err}");
        } else {
            tracing::trace!(chain = %self.chain, %url, ?duration, "query succeeded");
        }

        let info = QueryInfo {
            chain: self.chain.clone(),
            url,
            duration,
            error: result.as_ref().err().map(ToString::to_string),
        };

        (Some(info), result)
    }

    async fn request<T>(&self, url: &str) -> Result<T, RpcError>
    where
        T: DeserializeOwned,
    {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes).chars().take(200).collect();
            return Err(RpcError::Status { status, body });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn query<R, T>(
        &self,
        path: &str,
        context: &FetchContext,
        map: impl FnOnce(R) -> T,
    ) -> Query<T>
    where
        R: DeserializeOwned,
    {
        let (info, result) = self.get::<R>(path, context).await;
        (info, result.map(map))
    }

    pub async fn staking_params(&self, context: &FetchContext) -> Query<StakingParams> {
        self.query(
            "/cosmos/staking/v1beta1/params",
            context,
            |r: StakingParamsResponse| r.params,
        )
        .await
    }

    pub async fn slashing_params(&self, context: &FetchContext) -> Query<SlashingParams> {
        self.query(
            "/cosmos/slashing/v1beta1/params",
            context,
            |r: SlashingParamsResponse| r.params,
        )
        .await
    }

    pub async fn validators(&self, context: &FetchContext) -> Query<Vec<Validator>> {
        self.query(
            "/cosmos/staking/v1beta1/validators?pagination.limit=1000",
            context,
            |r: ValidatorsResponse| r.validators,
        )
        .await
    }

    pub async fn unbonds_count(&self, validator: &str, context: &FetchContext) -> Query<u64> {
        let path = format!(
            "/cosmos/staking/v1beta1/validators/{validator}/unbonding_delegations?pagination.count_total=true&pagination.limit=1"
        );
        self.query(&path, context, |r: PaginatedResponse| r.pagination.total)
            .await
    }

    pub async fn delegations_count(&self, validator: &str, context: &FetchContext) -> Query<u64> {
        let path = format!(
            "/cosmos/staking/v1beta1/validators/{validator}/delegations?pagination.count_total=true&pagination.limit=1"
        );
        self.query(&path, context, |r: PaginatedResponse| r.pagination.total)
            .await
    }

    pub async fn commission(&self, validator: &str, context: &FetchContext) -> Query<Vec<Coin>> {
        let path = format!("/cosmos/distribution/v1beta1/validators/{validator}/commission");
        self.query(&path, context, |r: CommissionResponse| r.commission.commission)
            .await
    }

    /// Account address of the validator operator.
    pub async fn validator_wallet(&self, validator: &str, context: &FetchContext) -> Query<String> {
        let path = format!("/cosmos/distribution/v1beta1/validators/{validator}");
        self.query(&path, context, |r: ValidatorDistributionResponse| {
            r.operator_address
        })
        .await
    }

    pub async fn self_delegation(
        &self,
        validator: &str,
        wallet: &str,
        context: &FetchContext,
    ) -> Query<Coin> {
        let path = format!("/cosmos/staking/v1beta1/validators/{validator}/delegations/{wallet}");
        self.query(&path, context, |r: DelegationResponse| {
            r.delegation_response.balance
        })
        .await
    }

    pub async fn balance(&self, wallet: &str, context: &FetchContext) -> Query<Vec<Coin>> {
        let path = format!("/cosmos/bank/v1beta1/balances/{wallet}");
        self.query(&path, context, |r: BalancesResponse| r.balances)
            .await
    }

    pub async fn rewards(
        &self,
        wallet: &str,
        validator: &str,
        context: &FetchContext,
    ) -> Query<Vec<Coin>> {
        let path = format!("/cosmos/distribution/v1beta1/delegators/{wallet}/rewards/{validator}");
        self.query(&path, context, |r: RewardsResponse| r.rewards)
            .await
    }

    pub async fn signing_info(&self, address: &str, context: &FetchContext) -> Query<SigningInfo> {
        let path = format!("/cosmos/slashing/v1beta1/signing_infos/{address}");
        self.query(&path, context, |r: SigningInfoResponse| r.val_signing_info)
            .await
    }

    pub async fn node_info(&self, context: &FetchContext) -> Query<NodeInfo> {
        self.query(
            "/cosmos/base/tendermint/v1beta1/node_info",
            context,
            |r: NodeInfo| r,
        )
        .await
    }

    pub async fn inflation(&self, context: &FetchContext) -> Query<f64> {
        self.query(
            "/cosmos/mint/v1beta1/inflation",
            context,
            |r: InflationResponse| r.inflation,
        )
        .await
    }

    pub async fn supply(&self, context: &FetchContext) -> Query<Vec<Coin>> {
        self.query(
            "/cosmos/bank/v1beta1/supply?pagination.limit=10000",
            context,
            |r: SupplyResponse| r.supply,
        )
        .await
    }

    /// Launched consumer chains of a provider.
    pub async fn consumer_chains(&self, context: &FetchContext) -> Query<Vec<ConsumerChainInfo>> {
        self.query(
            "/interchain_security/ccv/provider/consumer_chains/3?pagination.limit=1000",
            context,
            |r: ConsumerChainsResponse| r.chains,
        )
        .await
    }

    pub async fn consumer_validators(
        &self,
        consumer_id: &str,
        context: &FetchContext,
    ) -> Query<Vec<ConsumerValidator>> {
        let path = format!("/interchain_security/ccv/provider/consumer_validators/{consumer_id}");
        self.query(&path, context, |r: ConsumerValidatorsResponse| r.validators)
            .await
    }

    /// Consumer ids of the chains a validator has to validate, given its
    /// provider consensus address.
    pub async fn validator_consumers(
        &self,
        address: &str,
        context: &FetchContext,
    ) -> Query<Vec<String>> {
        let path =
            format!("/interchain_security/ccv/provider/consumer_chains_per_validator/{address}");
        self.query(&path, context, |r: ValidatorConsumersResponse| {
            r.consumer_ids
        })
        .await
    }

    pub async fn consumer_commission(
        &self,
        consumer_id: &str,
        address: &str,
        context: &FetchContext,
    ) -> Query<f64> {
        let path = format!(
            "/interchain_security/ccv/provider/consumer_commission_rate/{consumer_id}/{address}"
        );
        self.query(&path, context, |r: ConsumerCommissionResponse| r.rate)
            .await
    }

    /// Prices of the given Coingecko currencies, in `base_currency`.
    pub(crate) async fn coingecko_prices(
        &self,
        currencies: &[&str],
        base_currency: &str,
        context: &FetchContext,
    ) -> Query<CoingeckoResponse> {
        let path = format!(
            "/simple/price?ids={}&vs_currencies={base_currency}",
            currencies.join(",")
        );
        self.get(&path, context).await
    }
}

/// A configured provider chain together with its clients.
#[derive(Debug)]
pub struct ChainClient {
    pub chain: Chain,
    pub rpc: Rpc,
    pub consumers: Vec<ConsumerClient>,
}

#[derive(Debug)]
pub struct ConsumerClient {
    pub chain: ConsumerChain,
    pub rpc: Rpc,
}

/// Every chain client, shared by all fetchers.
pub type Clients = Arc<[ChainClient]>;

pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("cosmos-validators-exporter/", env!("CARGO_PKG_VERSION")))
        .build()
}

pub fn build_clients(config: &Config, client: &reqwest::Client) -> Clients {
    config
        .chains
        .iter()
        .map(|chain| ChainClient {
            chain: chain.clone(),
            rpc: Rpc::new(&chain.name, &chain.lcd_endpoint, client.clone()),
            consumers: chain
                .consumer_chains
                .iter()
                .map(|consumer| ConsumerClient {
                    chain: consumer.clone(),
                    rpc: Rpc::new(&consumer.name, &consumer.lcd_endpoint, client.clone()),
                })
                .collect(),
        })
        .collect()
}
