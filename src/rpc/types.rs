//! Response shapes of the Cosmos LCD REST API.
//!
//! Cosmos encodes 64-bit integers and decimals as JSON strings, those fields
//! go through [`from_str`].
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

/// Deserializes a value from its string representation.
pub(crate) fn from_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let text = String::deserialize(deserializer)?;
    text.parse().map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde(deserialize_with = "from_str")]
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Pagination {
    #[serde(deserialize_with = "from_str")]
    pub total: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaginatedResponse {
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StakingParamsResponse {
    pub params: StakingParams,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StakingParams {
    pub unbonding_time: String,
    pub max_validators: u32,
    pub max_entries: u32,
    pub bond_denom: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SlashingParamsResponse {
    pub params: SlashingParams,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SlashingParams {
    #[serde(deserialize_with = "from_str")]
    pub signed_blocks_window: u64,
    #[serde(deserialize_with = "from_str")]
    pub min_signed_per_window: f64,
    pub downtime_jail_duration: String,
    #[serde(deserialize_with = "from_str")]
    pub slash_fraction_double_sign: f64,
    #[serde(deserialize_with = "from_str")]
    pub slash_fraction_downtime: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ValidatorsResponse {
    pub validators: Vec<Validator>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Validator {
    pub operator_address: String,
    pub jailed: bool,
    pub status: String,
    #[serde(deserialize_with = "from_str")]
    pub tokens: f64,
    pub description: ValidatorDescription,
    pub commission: ValidatorCommission,
}

impl Validator {
    pub fn is_bonded(&self) -> bool {
        self.status == "BOND_STATUS_BONDED"
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ValidatorDescription {
    pub moniker: String,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub security_contact: String,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ValidatorCommission {
    pub commission_rates: CommissionRates,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommissionRates {
    #[serde(deserialize_with = "from_str")]
    pub rate: f64,
    #[serde(deserialize_with = "from_str")]
    pub max_rate: f64,
    #[serde(deserialize_with = "from_str")]
    pub max_change_rate: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommissionResponse {
    pub commission: CommissionCoins,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommissionCoins {
    pub commission: Vec<Coin>,
}

/// Distribution info of a validator. Its `operator_address` is the account
/// address of the operator, not the `valoper` one.
#[derive(Debug, Deserialize)]
pub(crate) struct ValidatorDistributionResponse {
    pub operator_address: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DelegationResponse {
    pub delegation_response: DelegationBalance,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DelegationBalance {
    pub balance: Coin,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BalancesResponse {
    pub balances: Vec<Coin>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RewardsResponse {
    pub rewards: Vec<Coin>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SigningInfoResponse {
    pub val_signing_info: SigningInfo,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SigningInfo {
    pub address: String,
    #[serde(deserialize_with = "from_str")]
    pub start_height: u64,
    #[serde(deserialize_with = "from_str")]
    pub index_offset: u64,
    pub tombstoned: bool,
    #[serde(deserialize_with = "from_str")]
    pub missed_blocks_counter: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeInfo {
    pub default_node_info: DefaultNodeInfo,
    pub application_version: ApplicationVersion,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DefaultNodeInfo {
    pub network: String,
    pub version: String,
    pub moniker: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApplicationVersion {
    pub name: String,
    pub app_name: String,
    pub version: String,
    pub git_commit: String,
    pub go_version: String,
    pub cosmos_sdk_version: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InflationResponse {
    #[serde(deserialize_with = "from_str")]
    pub inflation: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SupplyResponse {
    pub supply: Vec<Coin>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConsumerChainsResponse {
    pub chains: Vec<ConsumerChainInfo>,
}

/// A consumer chain as seen by its provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConsumerChainInfo {
    pub chain_id: String,
    pub consumer_id: String,
    /// Share of the provider voting power, in percent, which is required to
    /// validate the chain. 0 for opt-in chains.
    #[serde(rename = "top_N")]
    pub top_n: u32,
    /// Voting power of the weakest validator of the top N, -1 if unknown.
    #[serde(rename = "min_power_in_top_N", deserialize_with = "from_str")]
    pub min_power_in_top_n: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConsumerValidatorsResponse {
    pub validators: Vec<ConsumerValidator>,
}

/// A member of a consumer chain's validator set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConsumerValidator {
    /// Consensus (`valcons`) address of the validator on the provider.
    pub provider_address: String,
    #[serde(alias = "power", deserialize_with = "from_str")]
    pub consumer_power: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ValidatorConsumersResponse {
    #[serde(alias = "consumer_chain_ids")]
    pub consumer_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConsumerCommissionResponse {
    #[serde(deserialize_with = "from_str")]
    pub rate: f64,
}

/// Coingecko `/simple/price`: currency id -> base currency -> price.
pub(crate) type CoingeckoResponse = HashMap<String, HashMap<String, f64>>;
