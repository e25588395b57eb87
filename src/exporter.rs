use std::sync::Arc;

use prometheus::{Encoder, Registry, TextEncoder};

use crate::config::Config;
use crate::engine::{Collected, Controller, FetchContext};
use crate::error::ExporterError;
use crate::fetchers;
use crate::generators::{self, Generator, QueriesGenerator};
use crate::rpc::{Rpc, build_clients, build_http_client};

/// Everything needed to answer a scrape: the fetcher graph and the
/// generators projecting its outputs.
pub struct Exporter {
    config: Arc<Config>,
    controller: Controller,
    generators: Vec<Box<dyn Generator>>,
    queries: QueriesGenerator,
}

impl Exporter {
    pub fn new(config: Config) -> Result<Self, ExporterError> {
        let config = Arc::new(config);
        let client = build_http_client(config.timeout())?;
        let clients = build_clients(&config, &client);
        let coingecko = Rpc::new("coingecko", &config.price.coingecko_url, client);

        let controller = Controller::new(fetchers::registry(&clients, coingecko))?;

        Ok(Self {
            generators: generators::registry(&config),
            queries: QueriesGenerator::new(&config),
            controller,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Runs every fetcher once.
    pub async fn collect(&self, context: &FetchContext) -> Collected {
        self.controller.fetch(context).await
    }

    /// Renders a collection run in the Prometheus text format.
    ///
    /// Every call uses a fresh registry, so nothing leaks from one scrape
    /// into the next.
    pub fn render(&self, collected: &Collected) -> Result<String, ExporterError> {
        let registry = Registry::new();

        let collectors = self
            .generators
            .iter()
            .flat_map(|generator| generator.generate(&collected.snapshot))
            .chain(
                self.queries
                    .generate(&collected.queries, &collected.executions),
            );

        for collector in collectors {
            registry.register(collector)?;
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }
}
