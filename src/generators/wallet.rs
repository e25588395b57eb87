use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::GaugeVec;

use crate::config::{Amount, Config};
use crate::core::FetcherName;
use crate::engine::Snapshot;
use crate::fetchers::ByValidator;
use crate::generators::{Generator, find_chain, gauge};
use crate::rpc::types::Coin;

/// Exports a per-validator counter, such as the number of delegators.
pub struct CountGenerator {
    fetcher: FetcherName,
    name: &'static str,
    help: &'static str,
}

impl CountGenerator {
    pub fn new(fetcher: FetcherName, name: &'static str, help: &'static str) -> Self {
        Self {
            fetcher,
            name,
            help,
        }
    }
}

impl Generator for CountGenerator {
    fn generate(&self, snapshot: &Snapshot) -> Vec<Box<dyn Collector>> {
        let Some(counts) = snapshot.get::<ByValidator<u64>>(self.fetcher) else {
            return Vec::new();
        };

        let gauge = gauge(self.name, self.help, &["chain", "address"]);

        for (chain, validators) in counts.iter() {
            for (address, count) in validators {
                gauge
                    .with_label_values(&[chain.as_str(), address.as_str()])
                    .set(*count as f64);
            }
        }

        vec![Box::new(gauge)]
    }
}

/// Sets one sample per coin, converted to the chain's display denom.
fn set_coins<'a>(
    gauge: &GaugeVec,
    config: &Config,
    chain: &str,
    address: &str,
    coins: impl IntoIterator<Item = &'a Coin>,
) {
    let chain_config = find_chain(config, chain);

    for coin in coins {
        let amount = match chain_config {
            Some(chain_config) => chain_config.display_amount(&coin.denom, coin.amount),
            None => Amount {
                denom: coin.denom.clone(),
                amount: coin.amount,
            },
        };

        gauge
            .with_label_values(&[chain, address, amount.denom.as_str()])
            .set(amount.amount);
    }
}

/// Exports per-validator coin lists, such as wallet balances.
pub struct CoinsGenerator {
    config: Arc<Config>,
    fetcher: FetcherName,
    name: &'static str,
    help: &'static str,
}

impl CoinsGenerator {
    pub fn new(
        config: Arc<Config>,
        fetcher: FetcherName,
        name: &'static str,
        help: &'static str,
    ) -> Self {
        Self {
            config,
            fetcher,
            name,
            help,
        }
    }
}

impl Generator for CoinsGenerator {
    fn generate(&self, snapshot: &Snapshot) -> Vec<Box<dyn Collector>> {
        let Some(coins) = snapshot.get::<ByValidator<Vec<Coin>>>(self.fetcher) else {
            return Vec::new();
        };

        let gauge = gauge(self.name, self.help, &["chain", "address", "denom"]);

        for (chain, validators) in coins.iter() {
            for (address, coins) in validators {
                set_coins(&gauge, &self.config, chain, address, coins);
            }
        }

        vec![Box::new(gauge)]
    }
}

pub struct SelfDelegationGenerator {
    config: Arc<Config>,
}

impl SelfDelegationGenerator {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

impl Generator for SelfDelegationGenerator {
    fn generate(&self, snapshot: &Snapshot) -> Vec<Box<dyn Collector>> {
        let Some(delegations) = snapshot.get::<ByValidator<Coin>>(FetcherName::SelfDelegations)
        else {
            return Vec::new();
        };

        let gauge = gauge(
            "self_delegated",
            "Stake the validator delegated to itself, in display denom",
            &["chain", "address", "denom"],
        );

        for (chain, validators) in delegations.iter() {
            for (address, coin) in validators {
                set_coins(&gauge, &self.config, chain, address, [coin]);
            }
        }

        vec![Box::new(gauge)]
    }
}
