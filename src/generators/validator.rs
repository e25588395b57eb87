use std::sync::Arc;

use prometheus::core::Collector;

use crate::config::Config;
use crate::core::FetcherName;
use crate::engine::Snapshot;
use crate::fetchers::{ByChain, ByValidator};
use crate::generators::{Generator, bool_value, gauge};
use crate::rpc::types::{SigningInfo, SlashingParams, StakingParams, Validator};

/// Numeric value of a bond status, as in the staking module's enum.
fn status_value(status: &str) -> f64 {
    match status {
        "BOND_STATUS_UNBONDED" => 1.0,
        "BOND_STATUS_UNBONDING" => 2.0,
        "BOND_STATUS_BONDED" => 3.0,
        _ => 0.0,
    }
}

/// Bonded validators sorted by tokens, highest first.
pub(super) fn bonded_by_tokens(validators: &[Validator]) -> Vec<&Validator> {
    let mut bonded: Vec<_> = validators.iter().filter(|v| v.is_bonded()).collect();
    bonded.sort_by(|a, b| b.tokens.total_cmp(&a.tokens));
    bonded
}

/// Size and stake of the whole validator set of a chain.
pub struct ValidatorsInfoGenerator;

impl Generator for ValidatorsInfoGenerator {
    fn generate(&self, snapshot: &Snapshot) -> Vec<Box<dyn Collector>> {
        let Some(validators) = snapshot.get::<ByChain<Vec<Validator>>>(FetcherName::Validators)
        else {
            return Vec::new();
        };

        let count = gauge(
            "validators_count",
            "Number of validators on the chain, bonded or not",
            &["chain"],
        );
        let bonded = gauge(
            "bonded_validators_count",
            "Number of bonded validators on the chain",
            &["chain"],
        );
        let total_bonded = gauge(
            "total_bonded_tokens",
            "Tokens bonded to the active set, in base denom",
            &["chain"],
        );

        for (chain, validators) in validators.iter() {
            let labels = &[chain.as_str()];
            let active = bonded_by_tokens(validators);

            count.with_label_values(labels).set(validators.len() as f64);
            bonded.with_label_values(labels).set(active.len() as f64);
            total_bonded
                .with_label_values(labels)
                .set(active.iter().map(|v| v.tokens).sum());
        }

        vec![Box::new(count), Box::new(bonded), Box::new(total_bonded)]
    }
}

/// Details of every configured validator, looked up in its chain's
/// validator set.
pub struct ValidatorGenerator {
    config: Arc<Config>,
}

impl ValidatorGenerator {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

impl Generator for ValidatorGenerator {
    fn generate(&self, snapshot: &Snapshot) -> Vec<Box<dyn Collector>> {
        let Some(validators) = snapshot.get::<ByChain<Vec<Validator>>>(FetcherName::Validators)
        else {
            return Vec::new();
        };

        let info = gauge(
            "validator_info",
            "Validator description, always 1",
            &[
                "chain",
                "address",
                "moniker",
                "identity",
                "website",
                "security_contact",
                "details",
            ],
        );
        let tokens = gauge(
            "validator_tokens",
            "Tokens delegated to the validator, in base denom",
            &["chain", "address"],
        );
        let jailed = gauge(
            "validator_jailed",
            "Whether the validator is jailed",
            &["chain", "address"],
        );
        let status = gauge(
            "validator_status",
            "Bond status: 0 unspecified, 1 unbonded, 2 unbonding, 3 bonded",
            &["chain", "address"],
        );
        let active = gauge(
            "validator_active",
            "Whether the validator is in the active set",
            &["chain", "address"],
        );
        let rank = gauge(
            "validator_rank",
            "Position of the validator in the active set, by tokens",
            &["chain", "address"],
        );
        let rate = gauge(
            "validator_commission_rate",
            "Current commission rate",
            &["chain", "address"],
        );
        let max_rate = gauge(
            "validator_commission_max_rate",
            "Maximum commission rate",
            &["chain", "address"],
        );
        let max_change_rate = gauge(
            "validator_commission_max_change_rate",
            "Maximum daily commission rate change",
            &["chain", "address"],
        );

        for chain in &self.config.chains {
            let Some(set) = validators.get(&chain.name) else {
                continue;
            };

            let ranked = bonded_by_tokens(set);

            for configured in &chain.validators {
                let Some(validator) = set
                    .iter()
                    .find(|v| v.operator_address == configured.address)
                else {
                    tracing::warn!(
                        chain = %chain.name,
                        address = %configured.address,
                        "validator not found in the validator set"
                    );
                    continue;
                };

                let labels = &[chain.name.as_str(), validator.operator_address.as_str()];
                let description = &validator.description;
                let rates = &validator.commission.commission_rates;

                info.with_label_values(&[
                    chain.name.as_str(),
                    validator.operator_address.as_str(),
                    description.moniker.as_str(),
                    description.identity.as_str(),
                    description.website.as_str(),
                    description.security_contact.as_str(),
                    description.details.as_str(),
                ])
                .set(1.0);

                tokens.with_label_values(labels).set(validator.tokens);
                jailed
                    .with_label_values(labels)
                    .set(bool_value(validator.jailed));
                status
                    .with_label_values(labels)
                    .set(status_value(&validator.status));
                active
                    .with_label_values(labels)
                    .set(bool_value(validator.is_bonded()));
                rate.with_label_values(labels).set(rates.rate);
                max_rate.with_label_values(labels).set(rates.max_rate);
                max_change_rate
                    .with_label_values(labels)
                    .set(rates.max_change_rate);

                let position = ranked
                    .iter()
                    .position(|v| v.operator_address == validator.operator_address);
                if let Some(position) = position {
                    rank.with_label_values(labels).set((position + 1) as f64);
                }
            }
        }

        vec![
            Box::new(info),
            Box::new(tokens),
            Box::new(jailed),
            Box::new(status),
            Box::new(active),
            Box::new(rank),
            Box::new(rate),
            Box::new(max_rate),
            Box::new(max_change_rate),
        ]
    }
}

/// Tokens of the weakest validator still in the active set, that is the
/// stake needed to enter it. Joins the validator set with the staking
/// params.
pub struct ActiveSetTokensGenerator;

impl Generator for ActiveSetTokensGenerator {
    fn generate(&self, snapshot: &Snapshot) -> Vec<Box<dyn Collector>> {
        let validators = snapshot.get::<ByChain<Vec<Validator>>>(FetcherName::Validators);
        let params = snapshot.get::<ByChain<StakingParams>>(FetcherName::StakingParams);

        let (Some(validators), Some(params)) = (validators, params) else {
            return Vec::new();
        };

        let tokens = gauge(
            "active_set_tokens",
            "Tokens of the last validator in the active set, in base denom",
            &["chain"],
        );

        for (chain, set) in validators.iter() {
            let Some(params) = params.get(chain) else {
                continue;
            };

            let mut all: Vec<f64> = set.iter().map(|v| v.tokens).collect();
            all.sort_by(|a, b| b.total_cmp(a));

            let size = all.len().min(params.max_validators as usize);
            if let Some(last) = size.checked_sub(1).map(|index| all[index]) {
                tokens.with_label_values(&[chain.as_str()]).set(last);
            }
        }

        vec![Box::new(tokens)]
    }
}

pub struct SigningInfoGenerator;

impl Generator for SigningInfoGenerator {
    fn generate(&self, snapshot: &Snapshot) -> Vec<Box<dyn Collector>> {
        let Some(infos) = snapshot.get::<ByValidator<SigningInfo>>(FetcherName::SigningInfos)
        else {
            return Vec::new();
        };

        let missed = gauge(
            "missed_blocks",
            "Blocks missed by the validator within the current window",
            &["chain", "address"],
        );
        let tombstoned = gauge(
            "tombstoned",
            "Whether the validator is tombstoned",
            &["chain", "address"],
        );
        let start_height = gauge(
            "start_height",
            "Height the validator started signing at",
            &["chain", "address"],
        );
        let index_offset = gauge(
            "index_offset",
            "Signing info index offset",
            &["chain", "address"],
        );

        for (chain, validators) in infos.iter() {
            for (address, info) in validators {
                let labels = &[chain.as_str(), address.as_str()];
                missed
                    .with_label_values(labels)
                    .set(info.missed_blocks_counter as f64);
                tombstoned
                    .with_label_values(labels)
                    .set(bool_value(info.tombstoned));
                start_height
                    .with_label_values(labels)
                    .set(info.start_height as f64);
                index_offset
                    .with_label_values(labels)
                    .set(info.index_offset as f64);
            }
        }

        vec![
            Box::new(missed),
            Box::new(tombstoned),
            Box::new(start_height),
            Box::new(index_offset),
        ]
    }
}

/// Share of the blocks of the current window the validator signed. Joins
/// the signing infos with the slashing params.
pub struct UptimeGenerator;

impl Generator for UptimeGenerator {
    fn generate(&self, snapshot: &Snapshot) -> Vec<Box<dyn Collector>> {
        let infos = snapshot.get::<ByValidator<SigningInfo>>(FetcherName::SigningInfos);
        let params = snapshot.get::<ByChain<SlashingParams>>(FetcherName::SlashingParams);

        let (Some(infos), Some(params)) = (infos, params) else {
            return Vec::new();
        };

        let uptime = gauge(
            "uptime",
            "Share of blocks signed within the current window",
            &["chain", "address"],
        );

        for (chain, validators) in infos.iter() {
            let Some(window) = params
                .get(chain)
                .map(|p| p.signed_blocks_window)
                .filter(|window| *window > 0)
            else {
                continue;
            };

            for (address, info) in validators {
                let missed = info.missed_blocks_counter.min(window) as f64;
                uptime
                    .with_label_values(&[chain.as_str(), address.as_str()])
                    .set(1.0 - missed / window as f64);
            }
        }

        vec![Box::new(uptime)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetchers::insert;
    use crate::generators::tests::{families, value};
    use crate::rpc::types::{CommissionRates, ValidatorCommission, ValidatorDescription};

    fn validator(address: &str, tokens: f64, bonded: bool) -> Validator {
        Validator {
            operator_address: address.to_string(),
            jailed: !bonded,
            status: if bonded {
                "BOND_STATUS_BONDED"
            } else {
                "BOND_STATUS_UNBONDED"
            }
            .to_string(),
            tokens,
            description: ValidatorDescription {
                moniker: format!("{address}-moniker"),
                identity: String::new(),
                website: String::new(),
                security_contact: String::new(),
                details: String::new(),
            },
            commission: ValidatorCommission {
                commission_rates: CommissionRates {
                    rate: 0.05,
                    max_rate: 0.2,
                    max_change_rate: 0.01,
                },
            },
        }
    }

    fn snapshot(max_validators: u32) -> Snapshot {
        let validators: ByChain<Vec<Validator>> = [(
            "cosmos".to_string(),
            vec![
                validator("cosmosvaloper1xyz", 300.0, true),
                validator("cosmosvaloper1abc", 200.0, true),
                validator("cosmosvaloper1def", 50.0, false),
                validator("cosmosvaloper1ghi", 100.0, true),
            ],
        )]
        .into();

        let params: ByChain<StakingParams> = [(
            "cosmos".to_string(),
            StakingParams {
                unbonding_time: "1814400s".into(),
                max_validators,
                max_entries: 7,
                bond_denom: "uatom".into(),
            },
        )]
        .into();

        let snapshot = Snapshot::new();
        snapshot.insert(FetcherName::Validators, Arc::new(validators));
        snapshot.insert(FetcherName::StakingParams, Arc::new(params));
        snapshot
    }

    #[test]
    fn test_active_set_tokens() {
        let metrics = families(ActiveSetTokensGenerator.generate(&snapshot(2)));
        assert_eq!(
            value(&metrics, "active_set_tokens", &[("chain", "cosmos")]),
            Some(200.0)
        );

        // Fewer validators than slots: the weakest one is in.
        let metrics = families(ActiveSetTokensGenerator.generate(&snapshot(100)));
        assert_eq!(
            value(&metrics, "active_set_tokens", &[("chain", "cosmos")]),
            Some(50.0)
        );
    }

    #[test]
    fn test_active_set_tokens_needs_params() {
        let snapshot = Snapshot::new();
        snapshot.insert(
            FetcherName::Validators,
            Arc::new(ByChain::<Vec<Validator>>::new()),
        );

        assert!(ActiveSetTokensGenerator.generate(&snapshot).is_empty());
    }

    #[test]
    fn test_validator_rank_and_status() {
        let config = Arc::new(crate::testing::config("http://localhost:1317"));
        let metrics = families(ValidatorGenerator::new(config).generate(&snapshot(180)));

        let abc = &[("chain", "cosmos"), ("address", "cosmosvaloper1abc")];
        let def = &[("chain", "cosmos"), ("address", "cosmosvaloper1def")];

        assert_eq!(value(&metrics, "validator_rank", abc), Some(2.0));
        assert_eq!(value(&metrics, "validator_rank", def), None);
        assert_eq!(value(&metrics, "validator_active", def), Some(0.0));
        assert_eq!(value(&metrics, "validator_jailed", def), Some(1.0));
        assert_eq!(value(&metrics, "validator_status", abc), Some(3.0));
        assert_eq!(value(&metrics, "validator_commission_rate", abc), Some(0.05));
        assert_eq!(
            value(
                &metrics,
                "validator_info",
                &[("address", "cosmosvaloper1abc"), ("moniker", "cosmosvaloper1abc-moniker")]
            ),
            Some(1.0)
        );
    }

    fn signing_info(missed: u64) -> SigningInfo {
        SigningInfo {
            address: "cosmosvalcons1abc".into(),
            start_height: 1,
            index_offset: 100,
            tombstoned: false,
            missed_blocks_counter: missed,
        }
    }

    fn slashing_params(window: u64) -> SlashingParams {
        SlashingParams {
            signed_blocks_window: window,
            min_signed_per_window: 0.05,
            downtime_jail_duration: "600s".into(),
            slash_fraction_double_sign: 0.05,
            slash_fraction_downtime: 0.0001,
        }
    }

    #[test]
    fn test_uptime() {
        let mut infos = ByValidator::<SigningInfo>::new();
        insert(&mut infos, "cosmos", "cosmosvaloper1abc", signing_info(2500));
        insert(&mut infos, "neutron", "cosmosvaloper1abc", signing_info(1));
        let params: ByChain<SlashingParams> = [
            ("cosmos".to_string(), slashing_params(10000)),
            ("neutron".to_string(), slashing_params(0)),
        ]
        .into();

        let snapshot = Snapshot::new();
        snapshot.insert(FetcherName::SigningInfos, Arc::new(infos));
        snapshot.insert(FetcherName::SlashingParams, Arc::new(params));

        let metrics = families(UptimeGenerator.generate(&snapshot));
        assert_eq!(
            value(&metrics, "uptime", &[("chain", "cosmos"), ("address", "cosmosvaloper1abc")]),
            Some(0.75)
        );
        // An empty window says nothing about uptime.
        assert_eq!(value(&metrics, "uptime", &[("chain", "neutron")]), None);
    }

    #[test]
    fn test_uptime_needs_slashing_params() {
        let snapshot = Snapshot::new();
        snapshot.insert(
            FetcherName::SigningInfos,
            Arc::new(ByValidator::<SigningInfo>::new()),
        );

        assert!(UptimeGenerator.generate(&snapshot).is_empty());
    }

    #[test]
    fn test_validators_info() {
        let metrics = families(ValidatorsInfoGenerator.generate(&snapshot(180)));
        let chain = &[("chain", "cosmos")];

        assert_eq!(value(&metrics, "validators_count", chain), Some(4.0));
        assert_eq!(value(&metrics, "bonded_validators_count", chain), Some(3.0));
        assert_eq!(value(&metrics, "total_bonded_tokens", chain), Some(600.0));
    }
}
