//! Projections of the collected snapshot into Prometheus metrics.
//!
//! A generator reads the outputs it cares about from the snapshot and turns
//! them into gauges. Missing outputs are not an error, the corresponding
//! metrics are simply left out of the scrape.
mod chain;
mod consumer;
mod params;
mod queries;
mod validator;
mod wallet;

use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::{GaugeVec, Opts};

pub use crate::generators::chain::{
    InflationGenerator, NodeInfoGenerator, PriceGenerator, SupplyGenerator,
};
pub use crate::generators::consumer::{
    ConsumerCommissionGenerator, ConsumerInfoGenerator, ConsumerNeedsToSignGenerator,
    IsConsumerGenerator,
};
pub use crate::generators::params::{SlashingParamsGenerator, StakingParamsGenerator};
pub use crate::generators::queries::QueriesGenerator;
pub use crate::generators::validator::{
    ActiveSetTokensGenerator, SigningInfoGenerator, UptimeGenerator, ValidatorGenerator,
    ValidatorsInfoGenerator,
};
pub use crate::generators::wallet::{CoinsGenerator, CountGenerator, SelfDelegationGenerator};

use crate::config::{Chain, Config};
use crate::core::{FetcherName, METRICS_PREFIX};
use crate::engine::Snapshot;

pub trait Generator: Send + Sync {
    fn generate(&self, snapshot: &Snapshot) -> Vec<Box<dyn Collector>>;
}

/// Every generator the exporter renders.
pub fn registry(config: &Arc<Config>) -> Vec<Box<dyn Generator>> {
    vec![
        Box::new(SlashingParamsGenerator),
        Box::new(StakingParamsGenerator),
        Box::new(ValidatorsInfoGenerator),
        Box::new(ValidatorGenerator::new(config.clone())),
        Box::new(ActiveSetTokensGenerator),
        Box::new(SigningInfoGenerator),
        Box::new(UptimeGenerator),
        Box::new(CountGenerator::new(
            FetcherName::Delegations,
            "delegations_count",
            "Number of delegators of the validator",
        )),
        Box::new(CountGenerator::new(
            FetcherName::Unbonds,
            "unbonds_count",
            "Number of unbonding delegations of the validator",
        )),
        Box::new(CoinsGenerator::new(
            config.clone(),
            FetcherName::Commission,
            "commission",
            "Unclaimed commission of the validator, in display denom",
        )),
        Box::new(CoinsGenerator::new(
            config.clone(),
            FetcherName::Balances,
            "wallet_balance",
            "Balance of the validator wallet, in display denom",
        )),
        Box::new(CoinsGenerator::new(
            config.clone(),
            FetcherName::Rewards,
            "self_delegation_rewards",
            "Unclaimed self-delegation rewards of the validator, in display denom",
        )),
        Box::new(SelfDelegationGenerator::new(config.clone())),
        Box::new(NodeInfoGenerator),
        Box::new(InflationGenerator),
        Box::new(SupplyGenerator::new(config.clone())),
        Box::new(PriceGenerator),
        Box::new(IsConsumerGenerator::new(config.clone())),
        Box::new(ConsumerInfoGenerator::new(config.clone())),
        Box::new(ConsumerNeedsToSignGenerator::new(config.clone())),
        Box::new(ConsumerCommissionGenerator),
    ]
}

/// Builds a gauge family named `cosmos_validators_exporter_<name>`.
///
/// Every family is defined from static names and labels, an invalid one is a
/// programming error.
pub(crate) fn gauge(name: &str, help: &str, labels: &[&str]) -> GaugeVec {
    GaugeVec::new(Opts::new(format!("{METRICS_PREFIX}{name}"), help), labels)
        .expect("invalid metric definition")
}

pub(crate) fn find_chain<'a>(config: &'a Config, name: &str) -> Option<&'a Chain> {
    config.chains.iter().find(|chain| chain.name == name)
}

pub(crate) fn bool_value(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

#[cfg(test)]
pub(crate) mod tests {
    use prometheus::proto::MetricFamily;

    use super::*;

    /// Collects every non-empty family produced by `collectors`.
    pub fn families(collectors: Vec<Box<dyn Collector>>) -> Vec<MetricFamily> {
        collectors
            .iter()
            .flat_map(|collector| collector.collect())
            .filter(|family| !family.get_metric().is_empty())
            .collect()
    }

    /// Value of the gauge `name` (without prefix) matching every given label.
    pub fn value(families: &[MetricFamily], name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        let name = format!("{METRICS_PREFIX}{name}");

        families
            .iter()
            .filter(|family| family.get_name() == name)
            .flat_map(|family| family.get_metric())
            .find(|metric| {
                labels.iter().all(|(key, expected)| {
                    metric
                        .get_label()
                        .iter()
                        .any(|pair| pair.get_name() == *key && pair.get_value() == *expected)
                })
            })
            .map(|metric| metric.get_gauge().get_value())
    }

    #[test]
    fn test_empty_snapshot_yields_config_metrics_only() {
        let config = Arc::new(crate::testing::config("http://localhost:1317"));
        let snapshot = Snapshot::new();

        let names: Vec<_> = registry(&config)
            .iter()
            .flat_map(|generator| families(generator.generate(&snapshot)))
            .map(|family| family.get_name().to_string())
            .collect();

        assert_eq!(names, [format!("{METRICS_PREFIX}is_consumer")]);
    }

    #[test]
    fn test_gauge_prefixed() {
        let gauge = gauge("inflation", "help", &["chain"]);
        gauge.with_label_values(&["cosmos"]).set(0.1);

        let metrics = families(vec![Box::new(gauge)]);
        assert_eq!(value(&metrics, "inflation", &[("chain", "cosmos")]), Some(0.1));
    }
}
