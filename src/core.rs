use std::any::Any;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// A type-erased, thread-safe container for the output of a fetcher.
pub type Dynamic = Arc<dyn Any + Send + Sync>;

/// Prefix shared by every exported metric.
pub const METRICS_PREFIX: &str = "cosmos_validators_exporter_";

/// Identity of a fetcher.
///
/// Every registered fetcher owns exactly one name. The name is the vertex of
/// the dependency graph and the key under which the fetcher's output is
/// stored in the [`Snapshot`](crate::engine::Snapshot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FetcherName {
    SlashingParams,
    StakingParams,
    Validators,
    Unbonds,
    Delegations,
    Commission,
    Wallets,
    SelfDelegations,
    Balances,
    Rewards,
    SigningInfos,
    NodeInfo,
    Inflation,
    Supply,
    Price,
    ConsumerInfo,
    ConsumerValidators,
    ValidatorConsumers,
    ConsumerCommission,
}

impl FetcherName {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetcherName::SlashingParams => "slashing-params",
            FetcherName::StakingParams => "staking-params",
            FetcherName::Validators => "validators",
            FetcherName::Unbonds => "unbonds",
            FetcherName::Delegations => "delegations",
            FetcherName::Commission => "commission",
            FetcherName::Wallets => "wallets",
            FetcherName::SelfDelegations => "self-delegations",
            FetcherName::Balances => "balances",
            FetcherName::Rewards => "rewards",
            FetcherName::SigningInfos => "signing-infos",
            FetcherName::NodeInfo => "node-info",
            FetcherName::Inflation => "inflation",
            FetcherName::Supply => "supply",
            FetcherName::Price => "price",
            FetcherName::ConsumerInfo => "consumer-info",
            FetcherName::ConsumerValidators => "consumer-validators",
            FetcherName::ValidatorConsumers => "validator-consumers",
            FetcherName::ConsumerCommission => "consumer-commission",
        }
    }
}

impl Display for FetcherName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
