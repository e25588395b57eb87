use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::core::FetcherName;
use crate::engine::{Dependencies, FetchContext, Harvest, QueryInfo, TypedFetcher};
use crate::fetchers::ByChain;
use crate::rpc::{Clients, Rpc};

pub const BASE_CURRENCY: &str = "usd";

/// Prices keyed by chain, then by display denom.
pub type PriceData = ByChain<BTreeMap<String, f64>>;

/// Coingecko prices of every configured denom with a `coingecko-currency`.
///
/// All currencies are requested in a single call.
pub struct PriceFetcher {
    clients: Clients,
    coingecko: Rpc,
}

impl PriceFetcher {
    pub fn new(clients: Clients, coingecko: Rpc) -> Self {
        Self { clients, coingecko }
    }
}

#[async_trait]
impl TypedFetcher for PriceFetcher {
    type Output = PriceData;

    fn name(&self) -> FetcherName {
        FetcherName::Price
    }

    async fn fetch(
        &self,
        context: &FetchContext,
        _: &Dependencies,
    ) -> anyhow::Result<(Self::Output, Vec<QueryInfo>)> {
        let mut currencies: Vec<&str> = self
            .clients
            .iter()
            .flat_map(|client| &client.chain.denoms)
            .filter_map(|denom| denom.coingecko_currency.as_deref())
            .collect();
        currencies.sort_unstable();
        currencies.dedup();

        if currencies.is_empty() {
            return Ok(Default::default());
        }

        let harvest = Harvest::<PriceData>::default();
        let (info, result) = self
            .coingecko
            .coingecko_prices(&currencies, BASE_CURRENCY, context)
            .await;

        harvest.record(info, result, |data, response| {
            for client in self.clients.iter() {
                for denom in &client.chain.denoms {
                    let Some(currency) = &denom.coingecko_currency else {
                        continue;
                    };

                    let price = response
                        .get(currency)
                        .and_then(|prices| prices.get(BASE_CURRENCY));

                    match price {
                        Some(price) => {
                            data.entry(client.chain.name.clone())
                                .or_default()
                                .insert(denom.display_denom.clone(), *price);
                        }
                        None => tracing::warn!(
                            chain = %client.chain.name,
                            currency = %currency,
                            "Coingecko returned no price"
                        ),
                    }
                }
            }
        });

        Ok(harvest.finish())
    }
}
