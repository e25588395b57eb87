use std::sync::Arc;

use prometheus::core::Collector;

use crate::config::{Chain, Config, ConsumerChain};
use crate::core::FetcherName;
use crate::engine::Snapshot;
use crate::fetchers::{ByChain, ByValidator, lookup};
use crate::generators::validator::bonded_by_tokens;
use crate::generators::{Generator, bool_value, gauge};
use crate::rpc::types::{ConsumerChainInfo, ConsumerValidator, Validator};

/// Every configured consumer chain, along with its provider.
fn consumers(config: &Config) -> impl Iterator<Item = (&Chain, &ConsumerChain)> {
    config.chains.iter().flat_map(|chain| {
        chain
            .consumer_chains
            .iter()
            .map(move |consumer| (chain, consumer))
    })
}

/// Operator addresses of the smallest set of bonded validators holding at
/// least `percent` of the bonded tokens, strongest first.
fn top_n(validators: &[Validator], percent: u32) -> Vec<&str> {
    let bonded = bonded_by_tokens(validators);
    let total: f64 = bonded.iter().map(|v| v.tokens).sum();
    let threshold = total * f64::from(percent) / 100.0;

    let mut power = 0.0;
    bonded
        .into_iter()
        .take_while(|validator| {
            let inside = power < threshold;
            power += validator.tokens;
            inside
        })
        .map(|validator| validator.operator_address.as_str())
        .collect()
}

/// Whether a chain is a consumer chain. Known from the config alone.
pub struct IsConsumerGenerator {
    config: Arc<Config>,
}

impl IsConsumerGenerator {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

impl Generator for IsConsumerGenerator {
    fn generate(&self, _: &Snapshot) -> Vec<Box<dyn Collector>> {
        let is_consumer = gauge(
            "is_consumer",
            "Whether the chain is a consumer chain",
            &["chain"],
        );

        for chain in &self.config.chains {
            is_consumer
                .with_label_values(&[chain.name.as_str()])
                .set(0.0);

            for consumer in &chain.consumer_chains {
                is_consumer
                    .with_label_values(&[consumer.name.as_str()])
                    .set(1.0);
            }
        }

        vec![Box::new(is_consumer)]
    }
}

/// Provider-side parameters of every consumer chain, and the place of the
/// configured validators in its validator set.
pub struct ConsumerInfoGenerator {
    config: Arc<Config>,
}

impl ConsumerInfoGenerator {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

impl Generator for ConsumerInfoGenerator {
    fn generate(&self, snapshot: &Snapshot) -> Vec<Box<dyn Collector>> {
        let infos = snapshot.get::<ByChain<ConsumerChainInfo>>(FetcherName::ConsumerInfo);
        let sets = snapshot.get::<ByChain<Vec<ConsumerValidator>>>(FetcherName::ConsumerValidators);

        if infos.is_none() && sets.is_none() {
            return Vec::new();
        }

        let info = gauge(
            "consumer_info",
            "Consumer chain info, always 1",
            &["chain", "provider", "chain_id", "consumer_id"],
        );
        let top_n = gauge(
            "consumer_top_n",
            "Share of the provider voting power required to validate the chain, in percent",
            &["chain"],
        );
        let min_power = gauge(
            "consumer_min_power_in_top_n",
            "Voting power of the weakest validator required to validate the chain",
            &["chain"],
        );
        let count = gauge(
            "consumer_validators_count",
            "Number of validators in the consumer chain validator set",
            &["chain"],
        );
        let active = gauge(
            "consumer_validator_active",
            "Whether the validator is in the consumer chain validator set",
            &["chain", "address"],
        );
        let power = gauge(
            "consumer_validator_power",
            "Voting power of the validator on the consumer chain",
            &["chain", "address"],
        );

        for (provider, consumer) in consumers(&self.config) {
            let name = consumer.name.as_str();

            if let Some(chain) = infos.as_ref().and_then(|infos| infos.get(name)) {
                info.with_label_values(&[
                    name,
                    provider.name.as_str(),
                    chain.chain_id.as_str(),
                    chain.consumer_id.as_str(),
                ])
                .set(1.0);
                top_n.with_label_values(&[name]).set(f64::from(chain.top_n));

                if chain.min_power_in_top_n >= 0 {
                    min_power
                        .with_label_values(&[name])
                        .set(chain.min_power_in_top_n as f64);
                }
            }

            let Some(set) = sets.as_ref().and_then(|sets| sets.get(name)) else {
                continue;
            };

            count.with_label_values(&[name]).set(set.len() as f64);

            for validator in &provider.validators {
                let Some(address) = validator.consensus_address.as_deref() else {
                    continue;
                };

                let member = set.iter().find(|v| v.provider_address == address);
                let labels = &[name, validator.address.as_str()];

                active.with_label_values(labels).set(bool_value(member.is_some()));
                if let Some(member) = member {
                    power
                        .with_label_values(labels)
                        .set(member.consumer_power as f64);
                }
            }
        }

        vec![
            Box::new(info),
            Box::new(top_n),
            Box::new(min_power),
            Box::new(count),
            Box::new(active),
            Box::new(power),
        ]
    }
}

/// Whether every configured validator has to sign blocks on a consumer
/// chain: it either validates the chain according to its provider, or it is
/// part of the chain's top N.
pub struct ConsumerNeedsToSignGenerator {
    config: Arc<Config>,
}

impl ConsumerNeedsToSignGenerator {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

impl Generator for ConsumerNeedsToSignGenerator {
    fn generate(&self, snapshot: &Snapshot) -> Vec<Box<dyn Collector>> {
        let infos = snapshot.get::<ByChain<ConsumerChainInfo>>(FetcherName::ConsumerInfo);
        let validators = snapshot.get::<ByChain<Vec<Validator>>>(FetcherName::Validators);
        let validated =
            snapshot.get::<ByValidator<Vec<String>>>(FetcherName::ValidatorConsumers);

        let (Some(infos), Some(validators)) = (infos, validators) else {
            return Vec::new();
        };

        let needs_to_sign = gauge(
            "consumer_needs_to_sign",
            "Whether the validator has to sign blocks on the consumer chain",
            &["chain", "address"],
        );

        for (provider, consumer) in consumers(&self.config) {
            let (Some(info), Some(set)) = (infos.get(&consumer.name), validators.get(&provider.name))
            else {
                continue;
            };

            let required = top_n(set, info.top_n);

            for validator in &provider.validators {
                let in_top_n = required.contains(&validator.address.as_str());
                let opted_in = validated
                    .as_ref()
                    .and_then(|validated| lookup(validated, &provider.name, &validator.address))
                    .is_some_and(|chains| chains.contains(&consumer.name));

                needs_to_sign
                    .with_label_values(&[consumer.name.as_str(), validator.address.as_str()])
                    .set(bool_value(in_top_n || opted_in));
            }
        }

        vec![Box::new(needs_to_sign)]
    }
}

/// Commission rate of every configured validator on the consumer chains it
/// validates.
pub struct ConsumerCommissionGenerator;

impl Generator for ConsumerCommissionGenerator {
    fn generate(&self, snapshot: &Snapshot) -> Vec<Box<dyn Collector>> {
        let Some(rates) = snapshot.get::<ByValidator<f64>>(FetcherName::ConsumerCommission) else {
            return Vec::new();
        };

        let rate = gauge(
            "consumer_commission_rate",
            "Commission rate of the validator on the consumer chain",
            &["chain", "address"],
        );

        for (chain, validators) in rates.iter() {
            for (address, value) in validators {
                rate.with_label_values(&[chain.as_str(), address.as_str()])
                    .set(*value);
            }
        }

        vec![Box::new(rate)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetchers::insert;
    use crate::generators::tests::{families, value};
    use crate::rpc::types::{CommissionRates, ValidatorCommission, ValidatorDescription};

    fn validator(address: &str, tokens: f64) -> Validator {
        Validator {
            operator_address: address.to_string(),
            jailed: false,
            status: "BOND_STATUS_BONDED".to_string(),
            tokens,
            description: ValidatorDescription {
                moniker: address.to_string(),
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

    fn consumer_info(top_n: u32) -> ConsumerChainInfo {
        ConsumerChainInfo {
            chain_id: "neutron-1".into(),
            consumer_id: "1".into(),
            top_n,
            min_power_in_top_n: if top_n > 0 { 200 } else { -1 },
        }
    }

    fn config() -> Arc<Config> {
        Arc::new(crate::testing::config("http://localhost:1317"))
    }

    /// `cosmosvaloper1abc` holds 20% of the bonded tokens, behind
    /// `cosmosvaloper1xyz` with 70%.
    fn snapshot(top_n: u32) -> Snapshot {
        let validators: ByChain<Vec<Validator>> = [(
            "cosmos".to_string(),
            vec![
                validator("cosmosvaloper1def", 100.0),
                validator("cosmosvaloper1xyz", 700.0),
                validator("cosmosvaloper1abc", 200.0),
            ],
        )]
        .into();
        let infos: ByChain<ConsumerChainInfo> =
            [("neutron".to_string(), consumer_info(top_n))].into();

        let snapshot = Snapshot::new();
        snapshot.insert(FetcherName::Validators, Arc::new(validators));
        snapshot.insert(FetcherName::ConsumerInfo, Arc::new(infos));
        snapshot
    }

    #[test]
    fn test_top_n() {
        let set = [
            validator("a", 500.0),
            validator("b", 300.0),
            validator("c", 200.0),
        ];

        assert_eq!(top_n(&set, 0), Vec::<&str>::new());
        assert_eq!(top_n(&set, 50), ["a"]);
        assert_eq!(top_n(&set, 51), ["a", "b"]);
        assert_eq!(top_n(&set, 100), ["a", "b", "c"]);
    }

    #[test]
    fn test_is_consumer() {
        let metrics = families(IsConsumerGenerator::new(config()).generate(&Snapshot::new()));

        assert_eq!(value(&metrics, "is_consumer", &[("chain", "cosmos")]), Some(0.0));
        assert_eq!(value(&metrics, "is_consumer", &[("chain", "neutron")]), Some(1.0));
    }

    #[test]
    fn test_needs_to_sign_top_n() {
        let generator = ConsumerNeedsToSignGenerator::new(config());
        let abc = &[("chain", "neutron"), ("address", "cosmosvaloper1abc")];
        let def = &[("chain", "neutron"), ("address", "cosmosvaloper1def")];

        let metrics = families(generator.generate(&snapshot(80)));
        assert_eq!(value(&metrics, "consumer_needs_to_sign", abc), Some(1.0));
        assert_eq!(value(&metrics, "consumer_needs_to_sign", def), Some(0.0));

        let metrics = families(generator.generate(&snapshot(0)));
        assert_eq!(value(&metrics, "consumer_needs_to_sign", abc), Some(0.0));
    }

    #[test]
    fn test_needs_to_sign_opted_in() {
        let mut validated = ByValidator::<Vec<String>>::new();
        insert(&mut validated, "cosmos", "cosmosvaloper1def", vec!["neutron".to_string()]);

        let snapshot = snapshot(0);
        snapshot.insert(FetcherName::ValidatorConsumers, Arc::new(validated));

        let metrics = families(ConsumerNeedsToSignGenerator::new(config()).generate(&snapshot));
        assert_eq!(
            value(
                &metrics,
                "consumer_needs_to_sign",
                &[("chain", "neutron"), ("address", "cosmosvaloper1def")]
            ),
            Some(1.0)
        );
    }

    #[test]
    fn test_consumer_info_and_validators() {
        let sets: ByChain<Vec<ConsumerValidator>> = [(
            "neutron".to_string(),
            vec![ConsumerValidator {
                provider_address: "cosmosvalcons1abc".into(),
                consumer_power: 42,
            }],
        )]
        .into();

        let snapshot = snapshot(95);
        snapshot.insert(FetcherName::ConsumerValidators, Arc::new(sets));

        let metrics = families(ConsumerInfoGenerator::new(config()).generate(&snapshot));
        let chain = &[("chain", "neutron")];
        let abc = &[("chain", "neutron"), ("address", "cosmosvaloper1abc")];

        assert_eq!(
            value(
                &metrics,
                "consumer_info",
                &[("provider", "cosmos"), ("chain_id", "neutron-1"), ("consumer_id", "1")]
            ),
            Some(1.0)
        );
        assert_eq!(value(&metrics, "consumer_top_n", chain), Some(95.0));
        assert_eq!(value(&metrics, "consumer_min_power_in_top_n", chain), Some(200.0));
        assert_eq!(value(&metrics, "consumer_validators_count", chain), Some(1.0));
        assert_eq!(value(&metrics, "consumer_validator_active", abc), Some(1.0));
        assert_eq!(value(&metrics, "consumer_validator_power", abc), Some(42.0));
    }

    #[test]
    fn test_consumer_commission() {
        let mut rates = ByValidator::<f64>::new();
        insert(&mut rates, "neutron", "cosmosvaloper1abc", 0.075);

        let snapshot = Snapshot::new();
        snapshot.insert(FetcherName::ConsumerCommission, Arc::new(rates));

        let metrics = families(ConsumerCommissionGenerator.generate(&snapshot));
        assert_eq!(
            value(
                &metrics,
                "consumer_commission_rate",
                &[("chain", "neutron"), ("address", "cosmosvaloper1abc")]
            ),
            Some(0.075)
        );
    }
}
