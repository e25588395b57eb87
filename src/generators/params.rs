use prometheus::core::Collector;

use crate::core::FetcherName;
use crate::engine::Snapshot;
use crate::fetchers::ByChain;
use crate::generators::{Generator, gauge};
use crate::rpc::types::{SlashingParams, StakingParams};
use crate::utils::parse_seconds;

pub struct SlashingParamsGenerator;

impl Generator for SlashingParamsGenerator {
    fn generate(&self, snapshot: &Snapshot) -> Vec<Box<dyn Collector>> {
        let Some(params) = snapshot.get::<ByChain<SlashingParams>>(FetcherName::SlashingParams)
        else {
            return Vec::new();
        };

        let window = gauge(
            "signed_blocks_window",
            "Number of blocks in the uptime window",
            &["chain"],
        );
        let min_signed = gauge(
            "min_signed_per_window",
            "Share of blocks a validator has to sign within the window",
            &["chain"],
        );
        let jail_duration = gauge(
            "downtime_jail_duration",
            "Jail duration for downtime, in seconds",
            &["chain"],
        );
        let double_sign = gauge(
            "slash_fraction_double_sign",
            "Share of stake slashed for double signing",
            &["chain"],
        );
        let downtime = gauge(
            "slash_fraction_downtime",
            "Share of stake slashed for downtime",
            &["chain"],
        );

        for (chain, params) in params.iter() {
            let labels = &[chain.as_str()];
            window
                .with_label_values(labels)
                .set(params.signed_blocks_window as f64);
            min_signed
                .with_label_values(labels)
                .set(params.min_signed_per_window);
            double_sign
                .with_label_values(labels)
                .set(params.slash_fraction_double_sign);
            downtime
                .with_label_values(labels)
                .set(params.slash_fraction_downtime);

            if let Some(seconds) = parse_seconds(&params.downtime_jail_duration) {
                jail_duration.with_label_values(labels).set(seconds);
            }
        }

        vec![
            Box::new(window),
            Box::new(min_signed),
            Box::new(jail_duration),
            Box::new(double_sign),
            Box::new(downtime),
        ]
    }
}

pub struct StakingParamsGenerator;

impl Generator for StakingParamsGenerator {
    fn generate(&self, snapshot: &Snapshot) -> Vec<Box<dyn Collector>> {
        let Some(params) = snapshot.get::<ByChain<StakingParams>>(FetcherName::StakingParams)
        else {
            return Vec::new();
        };

        let max_validators = gauge(
            "max_validators",
            "Size of the active validator set",
            &["chain"],
        );
        let max_entries = gauge(
            "max_entries",
            "Maximum number of unbonding entries per delegator and validator",
            &["chain"],
        );
        let unbonding_time = gauge(
            "unbonding_time",
            "Unbonding period, in seconds",
            &["chain"],
        );

        for (chain, params) in params.iter() {
            let labels = &[chain.as_str()];
            max_validators
                .with_label_values(labels)
                .set(params.max_validators as f64);
            max_entries
                .with_label_values(labels)
                .set(params.max_entries as f64);

            if let Some(seconds) = parse_seconds(&params.unbonding_time) {
                unbonding_time.with_label_values(labels).set(seconds);
            }
        }

        vec![
            Box::new(max_validators),
            Box::new(max_entries),
            Box::new(unbonding_time),
        ]
    }
}
