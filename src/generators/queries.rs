use std::collections::HashMap;

use prometheus::core::Collector;

use crate::config::Config;
use crate::core::FetcherName;
use crate::engine::{FetcherExecution, QueryInfo};
use crate::generators::gauge;

/// Renders the diagnostics of a collection run: how many remote calls were
/// issued per chain, how they went, and when every fetcher started and how
/// long it took.
pub struct QueriesGenerator {
    chains: Vec<String>,
}

impl QueriesGenerator {
    pub fn new(config: &Config) -> Self {
        let chains = config
            .chains
            .iter()
            .flat_map(|chain| {
                std::iter::once(chain.name.clone())
                    .chain(chain.consumer_chains.iter().map(|c| c.name.clone()))
            })
            .collect();

        Self { chains }
    }

    pub fn generate(
        &self,
        queries: &[QueryInfo],
        executions: &HashMap<FetcherName, FetcherExecution>,
    ) -> Vec<Box<dyn Collector>> {
        let total = gauge("query_total", "Remote calls issued", &["chain"]);
        let success = gauge("query_success", "Remote calls which succeeded", &["chain"]);
        let error = gauge("query_error", "Remote calls which failed", &["chain"]);
        let timings = gauge(
            "query_timings",
            "Duration of a remote call, in seconds",
            &["chain", "url"],
        );
        let durations = gauge(
            "fetcher_duration_seconds",
            "Duration of a fetcher, in seconds",
            &["fetcher"],
        );
        let offsets = gauge(
            "fetcher_start_offset_seconds",
            "Time between the start of the first fetcher and the start of this one, in seconds",
            &["fetcher"],
        );

        // Every configured chain is reported, even without any query.
        for chain in &self.chains {
            for gauge in [&total, &success, &error] {
                gauge.with_label_values(&[chain.as_str()]).set(0.0);
            }
        }

        for query in queries {
            let labels = &[query.chain.as_str()];
            total.with_label_values(labels).inc();

            if query.success() {
                success.with_label_values(labels).inc();
            } else {
                error.with_label_values(labels).inc();
            }

            timings
                .with_label_values(&[query.chain.as_str(), query.url.as_str()])
                .set(query.duration.as_secs_f64());
        }

        let first = executions.values().map(|execution| execution.start).min();

        for (name, execution) in executions {
            let labels = &[name.as_str()];
            durations
                .with_label_values(labels)
                .set(execution.duration.as_secs_f64());

            if let Some(first) = first {
                offsets
                    .with_label_values(labels)
                    .set(execution.start.duration_since(first).as_secs_f64());
            }
        }

        vec![
            Box::new(total),
            Box::new(success),
            Box::new(error),
            Box::new(timings),
            Box::new(durations),
            Box::new(offsets),
        ]
    }
}
