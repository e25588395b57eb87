use std::sync::Arc;

use prometheus::core::Collector;

use crate::config::Config;
use crate::core::FetcherName;
use crate::engine::Snapshot;
use crate::fetchers::{ByChain, PriceData};
use crate::generators::{Generator, find_chain, gauge};
use crate::rpc::types::{Coin, NodeInfo};

pub struct NodeInfoGenerator;

impl Generator for NodeInfoGenerator {
    fn generate(&self, snapshot: &Snapshot) -> Vec<Box<dyn Collector>> {
        let Some(infos) = snapshot.get::<ByChain<NodeInfo>>(FetcherName::NodeInfo) else {
            return Vec::new();
        };

        let gauge = gauge(
            "node_info",
            "Versions of the node the exporter talks to, always 1",
            &[
                "chain",
                "chain_id",
                "app_name",
                "app_version",
                "git_commit",
                "go_version",
                "cosmos_sdk_version",
                "tendermint_version",
            ],
        );

        for (chain, info) in infos.iter() {
            let app = &info.application_version;
            gauge
                .with_label_values(&[
                    chain.as_str(),
                    info.default_node_info.network.as_str(),
                    app.app_name.as_str(),
                    app.version.as_str(),
                    app.git_commit.as_str(),
                    app.go_version.as_str(),
                    app.cosmos_sdk_version.as_str(),
                    info.default_node_info.version.as_str(),
                ])
                .set(1.0);
        }

        vec![Box::new(gauge)]
    }
}

pub struct InflationGenerator;

impl Generator for InflationGenerator {
    fn generate(&self, snapshot: &Snapshot) -> Vec<Box<dyn Collector>> {
        let Some(inflation) = snapshot.get::<ByChain<f64>>(FetcherName::Inflation) else {
            return Vec::new();
        };

        let gauge = gauge("inflation", "Current inflation rate", &["chain"]);
        for (chain, value) in inflation.iter() {
            gauge.with_label_values(&[chain.as_str()]).set(*value);
        }

        vec![Box::new(gauge)]
    }
}

pub struct SupplyGenerator {
    config: Arc<Config>,
}

impl SupplyGenerator {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

impl Generator for SupplyGenerator {
    fn generate(&self, snapshot: &Snapshot) -> Vec<Box<dyn Collector>> {
        let Some(supply) = snapshot.get::<ByChain<Vec<Coin>>>(FetcherName::Supply) else {
            return Vec::new();
        };

        let gauge = gauge(
            "supply",
            "Total supply of the token, in display denom",
            &["chain", "denom"],
        );

        for (chain, coins) in supply.iter() {
            let Some(chain_config) = find_chain(&self.config, chain) else {
                continue;
            };

            for coin in coins {
                let amount = chain_config.display_amount(&coin.denom, coin.amount);
                gauge
                    .with_label_values(&[chain.as_str(), amount.denom.as_str()])
                    .set(amount.amount);
            }
        }

        vec![Box::new(gauge)]
    }
}

pub struct PriceGenerator;

impl Generator for PriceGenerator {
    fn generate(&self, snapshot: &Snapshot) -> Vec<Box<dyn Collector>> {
        let Some(prices) = snapshot.get::<PriceData>(FetcherName::Price) else {
            return Vec::new();
        };

        let gauge = gauge(
            "price",
            "Price of 1 token in display denom",
            &["chain", "denom", "source", "base_currency"],
        );

        for (chain, denoms) in prices.iter() {
            for (denom, price) in denoms {
                gauge
                    .with_label_values(&[
                        chain.as_str(),
                        denom.as_str(),
                        "coingecko",
                        crate::fetchers::BASE_CURRENCY,
                    ])
                    .set(*price);
            }
        }

        vec![Box::new(gauge)]
    }
}
