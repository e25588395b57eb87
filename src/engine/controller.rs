use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use indicatif::ProgressStyle;
use petgraph::Direction;
use petgraph::Graph;
use petgraph::algo::toposort;
use petgraph::graph::NodeIndex;
use tracing::{Instrument, Level};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::core::FetcherName;
use crate::engine::{Dependencies, FetchContext, Fetcher, QueryInfo, QueryLog, Snapshot};
use crate::error::ControllerError;

#[derive(Debug, Clone, Copy)]
pub struct FetcherExecution {
    pub start: Instant,
    pub duration: Duration,
}

/// Everything a single collection run produced.
#[derive(Debug)]
pub struct Collected {
    /// Outputs of every fetcher that completed.
    pub snapshot: Snapshot,
    /// Query records of every fetcher, in no meaningful order.
    pub queries: Vec<QueryInfo>,
    /// Timing of every fetcher that ran to completion.
    pub executions: HashMap<FetcherName, FetcherExecution>,
}

/// Drives the registered fetchers through their dependency graph.
///
/// The graph is validated once, on construction: every dependency has to be
/// registered and the graph has to be acyclic. Fetchers are then partitioned
/// into levels by dependency depth. Level 0 holds fetchers without any
/// dependencies, level `k` holds fetchers whose dependencies all live in
/// levels below `k`.
///
/// During [`Controller::fetch`] the levels run one after another. Every
/// fetcher within a level runs concurrently on its own tokio task, and the
/// next level only starts once the whole previous one has finished.
pub struct Controller {
    fetchers: Vec<Arc<dyn Fetcher>>,
    graph: Graph<FetcherName, ()>,
    levels: Vec<Vec<NodeIndex>>,
    style_root: ProgressStyle,
    style_task: ProgressStyle,
}

impl Controller {
    pub fn new(fetchers: Vec<Arc<dyn Fetcher>>) -> Result<Self, ControllerError> {
        let mut graph = Graph::new();
        let mut indices = HashMap::new();

        // Node indices follow insertion order, so they double as indices into
        // the fetcher list.
        for fetcher in &fetchers {
            let name = fetcher.name();
            let index = graph.add_node(name);
            if indices.insert(name, index).is_some() {
                return Err(ControllerError::Duplicate(name));
            }
        }

        for fetcher in &fetchers {
            let index = indices[&fetcher.name()];
            for dependency in fetcher.dependencies() {
                let source = indices.get(&dependency).copied().ok_or(
                    ControllerError::UnknownDependency {
                        fetcher: fetcher.name(),
                        dependency,
                    },
                )?;
                graph.add_edge(source, index, ());
            }
        }

        let order = toposort(&graph, None)
            .map_err(|cycle| ControllerError::Cycle(graph[cycle.node_id()]))?;

        let levels = partition_levels(&graph, &order);

        Ok(Self {
            fetchers,
            graph,
            levels,
            style_root: crate::utils::get_style_root()?,
            style_task: crate::utils::get_style_task()?,
        })
    }

    /// Names of the fetchers in every level, in execution order.
    pub fn levels(&self) -> Vec<Vec<FetcherName>> {
        self.levels
            .iter()
            .map(|level| level.iter().map(|&index| self.graph[index]).collect())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fetchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }

    /// Runs every registered fetcher once.
    ///
    /// This never fails. Fetchers which fail, panic, or are skipped simply
    /// leave no entry in the returned snapshot. If the context is cancelled,
    /// fetchers still in flight drain whatever they have already collected
    /// and the levels which haven't started yet are skipped.
    pub async fn fetch(&self, context: &FetchContext) -> Collected {
        let snapshot = Snapshot::new();
        let queries = QueryLog::default();
        let mut executions = HashMap::new();

        let root_span = tracing::span!(Level::INFO, "collecting");
        root_span.pb_set_length(self.fetchers.len() as u64);
        root_span.pb_set_style(&self.style_root);
        root_span.pb_set_message("Collecting data...");

        for (depth, level) in self.levels.iter().enumerate() {
            if context.is_cancelled() {
                let skipped: usize = self.levels[depth..].iter().map(Vec::len).sum();
                tracing::warn!(skipped, "collection cancelled, skipping remaining fetchers");
                break;
            }

            tracing::debug!(parent: &root_span, depth, fetchers = level.len(), "running level");

            let handles = level
                .iter()
                .filter_map(|&index| {
                    let fetcher = self.fetchers[index.index()].clone();
                    let name = fetcher.name();

                    let Some(dependencies) = self.resolve(index, &snapshot) else {
                        tracing::warn!(
                            fetcher = %name,
                            "dependency output missing, skipping fetcher"
                        );
                        root_span.pb_inc(1);
                        return None;
                    };

                    let span = tracing::span!(parent: &root_span, Level::INFO, "fetcher", name = %name);
                    span.pb_set_style(&self.style_task);
                    span.pb_set_message(&format!("Fetching {name}"));

                    let context = context.clone();
                    let snapshot = snapshot.clone();
                    let queries = queries.clone();

                    let handle = tokio::spawn(
                        async move {
                            let start = Instant::now();
                            let result = fetcher.fetch(&context, &dependencies).await;
                            let duration = start.elapsed();

                            match result {
                                Ok((output, records)) => {
                                    snapshot.insert(name, output);
                                    queries.extend(records);
                                    tracing::debug!(?duration, "fetcher finished");
                                }
                                Err(err) => {
                                    tracing::error!(fetcher = %name, "fetcher failed: {err:#}");
                                }
                            }

                            FetcherExecution { start, duration }
                        }
                        .instrument(span),
                    );

                    Some((name, handle))
                })
                .collect::<Vec<_>>();

            let (names, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();

            for (name, result) in names.into_iter().zip(join_all(handles).await) {
                root_span.pb_inc(1);

                match result {
                    Ok(execution) => {
                        executions.insert(name, execution);
                    }
                    Err(err) if err.is_panic() => {
                        let panic = err.into_panic();
                        let msg = if let Some(s) = panic.downcast_ref::<&str>() {
                            format!("Fetcher panicked: {s}")
                        } else if let Some(s) = panic.downcast_ref::<String>() {
                            format!("Fetcher panicked: {s}")
                        } else {
                            String::from("Fetcher panicked with unknown payload")
                        };

                        tracing::error!(fetcher = %name, "{msg}");
                    }
                    Err(err) => {
                        tracing::error!(fetcher = %name, "fetcher task aborted: {err}");
                    }
                }
            }
        }

        Collected {
            snapshot,
            queries: queries.take(),
            executions,
        }
    }

    /// Collects the outputs of the declared dependencies of a node. Returns
    /// `None` if any of them is missing.
    fn resolve(&self, index: NodeIndex, snapshot: &Snapshot) -> Option<Dependencies> {
        let mut outputs = HashMap::new();

        for dependency in self.graph.neighbors_directed(index, Direction::Incoming) {
            let name = self.graph[dependency];
            outputs.insert(name, snapshot.get_dynamic(name)?);
        }

        Some(Dependencies::new(outputs))
    }
}

/// Assigns every node the length of the longest dependency chain leading to
/// it, and groups nodes by that depth. `order` has to be topological.
fn partition_levels(graph: &Graph<FetcherName, ()>, order: &[NodeIndex]) -> Vec<Vec<NodeIndex>> {
    let mut depths: HashMap<NodeIndex, usize> = HashMap::new();
    let mut levels: Vec<Vec<NodeIndex>> = Vec::new();

    for &index in order {
        let depth = graph
            .neighbors_directed(index, Direction::Incoming)
            .map(|dependency| depths[&dependency] + 1)
            .max()
            .unwrap_or(0);

        depths.insert(index, depth);

        if levels.len() <= depth {
            levels.resize_with(depth + 1, Vec::new);
        }
        levels[depth].push(index);
    }

    for level in &mut levels {
        level.sort();
    }

    levels
}

/// Renders the fetcher graph as a Mermaid diagram.
impl Display for Controller {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "graph LR")?;

        for index in self.graph.node_indices() {
            writeln!(f, "    {:?}[\"{}\"]", index.index(), self.graph[index])?;
        }

        for edge in self.graph.edge_indices() {
            let Some((source, target)) = self.graph.edge_endpoints(edge) else {
                continue;
            };

            let type_name = self.fetchers[source.index()]
                .output_type_name()
                .replace('<', "&lt;")
                .replace('>', "&gt;");

            writeln!(
                f,
                "    {:?} -- \"{}\" --> {:?}",
                source.index(),
                type_name,
                target.index()
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::engine::TypedFetcher;

    type Journal = Arc<Mutex<Vec<(FetcherName, &'static str)>>>;

    /// Test fetcher that computes its output from its dependencies after an
    /// optional delay, journaling when it starts and ends.
    struct Probe<T> {
        name: FetcherName,
        dependencies: Vec<FetcherName>,
        delay: Duration,
        journal: Journal,
        compute: fn(&Dependencies) -> anyhow::Result<T>,
    }

    impl<T> Probe<T> {
        fn new(
            name: FetcherName,
            dependencies: &[FetcherName],
            journal: &Journal,
            compute: fn(&Dependencies) -> anyhow::Result<T>,
        ) -> Self {
            Self {
                name,
                dependencies: dependencies.to_vec(),
                delay: Duration::ZERO,
                journal: journal.clone(),
                compute,
            }
        }

        fn delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl<T: Send + Sync + 'static> TypedFetcher for Probe<T> {
        type Output = T;

        fn name(&self) -> FetcherName {
            self.name
        }

        fn dependencies(&self) -> Vec<FetcherName> {
            self.dependencies.clone()
        }

        async fn fetch(
            &self,
            _: &FetchContext,
            dependencies: &Dependencies,
        ) -> anyhow::Result<(T, Vec<QueryInfo>)> {
            self.journal.lock().unwrap().push((self.name, "start"));
            tokio::time::sleep(self.delay).await;
            let output = (self.compute)(dependencies)?;
            self.journal.lock().unwrap().push((self.name, "end"));
            Ok((output, vec![]))
        }
    }

    fn unit(_: &Dependencies) -> anyhow::Result<()> {
        Ok(())
    }

    fn position(journal: &Journal, name: FetcherName, event: &str) -> usize {
        journal
            .lock()
            .unwrap()
            .iter()
            .position(|&(n, e)| n == name && e == event)
            .unwrap()
    }

    fn boxed(fetcher: impl Fetcher + 'static) -> Arc<dyn Fetcher> {
        Arc::new(fetcher)
    }

    fn probe(name: FetcherName, dependencies: &[FetcherName], journal: &Journal) -> Arc<dyn Fetcher> {
        boxed(Probe::new(name, dependencies, journal, unit))
    }

    #[test]
    fn test_levels() {
        use FetcherName::*;
        let journal = Journal::default();

        let controller = Controller::new(vec![
            probe(Balances, &[Wallets], &journal),
            probe(Wallets, &[], &journal),
            probe(Validators, &[], &journal),
            probe(Price, &[Balances, Validators], &journal),
        ])
        .unwrap();

        assert_eq!(
            controller.levels(),
            vec![vec![Wallets, Validators], vec![Balances], vec![Price]]
        );
    }

    #[test]
    fn test_cycle_rejected() {
        use FetcherName::*;
        let journal = Journal::default();

        let result = Controller::new(vec![
            probe(Wallets, &[Rewards], &journal),
            probe(Rewards, &[Balances], &journal),
            probe(Balances, &[Wallets], &journal),
        ]);

        assert!(matches!(result, Err(ControllerError::Cycle(_))));
    }

    #[test]
    fn test_self_dependency_rejected() {
        let journal = Journal::default();
        let result = Controller::new(vec![probe(
            FetcherName::Supply,
            &[FetcherName::Supply],
            &journal,
        )]);

        assert!(matches!(
            result,
            Err(ControllerError::Cycle(FetcherName::Supply))
        ));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let journal = Journal::default();
        let result = Controller::new(vec![probe(
            FetcherName::Balances,
            &[FetcherName::Wallets],
            &journal,
        )]);

        assert!(matches!(
            result,
            Err(ControllerError::UnknownDependency {
                fetcher: FetcherName::Balances,
                dependency: FetcherName::Wallets,
            })
        ));
    }

    #[test]
    fn test_duplicate_rejected() {
        let journal = Journal::default();
        let result = Controller::new(vec![
            probe(FetcherName::Supply, &[], &journal),
            probe(FetcherName::Supply, &[], &journal),
        ]);

        assert!(matches!(
            result,
            Err(ControllerError::Duplicate(FetcherName::Supply))
        ));
    }

    #[tokio::test]
    async fn test_dependencies_finish_first() {
        use FetcherName::*;
        let journal = Journal::default();

        let controller = Controller::new(vec![
            probe(Rewards, &[Wallets, Validators], &journal),
            boxed(Probe::new(Wallets, &[], &journal, unit).delay(Duration::from_millis(30))),
            probe(Validators, &[], &journal),
            probe(Price, &[Rewards], &journal),
        ])
        .unwrap();

        let collected = controller.fetch(&FetchContext::default()).await;
        assert_eq!(collected.snapshot.len(), 4);
        assert_eq!(collected.executions.len(), 4);

        for (task, dependency) in [(Rewards, Wallets), (Rewards, Validators), (Price, Rewards)] {
            assert!(position(&journal, dependency, "end") < position(&journal, task, "start"));
        }
    }

    #[tokio::test]
    async fn test_independent_fetchers_share_a_level() {
        use FetcherName::*;
        let journal = Journal::default();

        let controller = Controller::new(vec![
            boxed(Probe::new(Inflation, &[], &journal, unit).delay(Duration::from_millis(50))),
            boxed(Probe::new(Supply, &[], &journal, unit).delay(Duration::from_millis(10))),
            probe(Price, &[Supply], &journal),
        ])
        .unwrap();

        let collected = controller.fetch(&FetchContext::default()).await;

        assert!(collected.snapshot.contains(Inflation));
        assert!(collected.snapshot.contains(Supply));
        // Both level 0 fetchers started before either finished.
        assert!(position(&journal, Supply, "start") < position(&journal, Inflation, "end"));
        assert!(position(&journal, Inflation, "start") < position(&journal, Supply, "end"));
        // The slow one still gates the next level.
        assert!(position(&journal, Inflation, "end") < position(&journal, Price, "start"));
    }

    #[tokio::test]
    async fn test_dependency_output_is_passed_through() {
        use FetcherName::*;
        let journal = Journal::default();

        fn produce(_: &Dependencies) -> anyhow::Result<BTreeMap<String, u64>> {
            Ok([("chainA".to_string(), 5)].into())
        }

        fn consume(dependencies: &Dependencies) -> anyhow::Result<BTreeMap<String, u64>> {
            let input = dependencies.get::<BTreeMap<String, u64>>(Validators)?;
            Ok(input.iter().map(|(k, v)| (k.clone(), v * 10)).collect())
        }

        let controller = Controller::new(vec![
            boxed(Probe::new(Validators, &[], &journal, produce)),
            boxed(Probe::new(Unbonds, &[Validators], &journal, consume)),
        ])
        .unwrap();

        let collected = controller.fetch(&FetchContext::default()).await;
        let output = collected
            .snapshot
            .get::<BTreeMap<String, u64>>(Unbonds)
            .unwrap();

        assert_eq!(output.get("chainA"), Some(&50));
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_siblings() {
        use FetcherName::*;
        let journal = Journal::default();

        fn fail(_: &Dependencies) -> anyhow::Result<u64> {
            anyhow::bail!("misconfigured")
        }

        fn panics(_: &Dependencies) -> anyhow::Result<u64> {
            panic!("boom")
        }

        let controller = Controller::new(vec![
            boxed(Probe::new(Wallets, &[], &journal, fail)),
            boxed(Probe::new(NodeInfo, &[], &journal, panics)),
            probe(Supply, &[], &journal),
            probe(Balances, &[Wallets], &journal),
        ])
        .unwrap();

        let collected = controller.fetch(&FetchContext::default()).await;

        assert!(collected.snapshot.contains(Supply));
        assert!(!collected.snapshot.contains(Wallets));
        assert!(!collected.snapshot.contains(NodeInfo));
        // Skipped, its dependency produced nothing.
        assert!(!collected.snapshot.contains(Balances));
        assert!(!journal.lock().unwrap().iter().any(|(n, _)| *n == Balances));
    }

    /// Issues one query, then waits on a second one that only ends when the
    /// context gets cancelled.
    struct Stubborn;

    #[async_trait]
    impl TypedFetcher for Stubborn {
        type Output = Vec<u32>;

        fn name(&self) -> FetcherName {
            FetcherName::Validators
        }

        async fn fetch(
            &self,
            context: &FetchContext,
            _: &Dependencies,
        ) -> anyhow::Result<(Vec<u32>, Vec<QueryInfo>)> {
            let first = QueryInfo {
                chain: "cosmos".into(),
                url: "http://localhost/1".into(),
                duration: Duration::from_millis(1),
                error: None,
            };

            tokio::select! {
                _ = context.cancelled() => Ok((vec![1], vec![first])),
                _ = tokio::time::sleep(Duration::from_secs(60)) => Ok((vec![1, 2], vec![first.clone(), first])),
            }
        }
    }

    #[tokio::test]
    async fn test_cancellation_drains_promptly() {
        let journal = Journal::default();
        let controller = Controller::new(vec![
            boxed(Stubborn),
            probe(FetcherName::Unbonds, &[FetcherName::Validators], &journal),
        ])
        .unwrap();

        let token = CancellationToken::new();
        let context = FetchContext::new(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        let collected = tokio::time::timeout(Duration::from_secs(5), controller.fetch(&context))
            .await
            .expect("collection should return after cancellation");
        canceller.await.unwrap();

        let partial = collected
            .snapshot
            .get::<Vec<u32>>(FetcherName::Validators)
            .unwrap();
        assert_eq!(*partial, vec![1]);
        assert_eq!(collected.queries.len(), 1);
        assert!(!collected.snapshot.contains(FetcherName::Unbonds));
    }

    #[test]
    fn test_render_graph() {
        use FetcherName::*;
        let journal = Journal::default();

        let controller = Controller::new(vec![
            probe(Wallets, &[], &journal),
            probe(Balances, &[Wallets], &journal),
        ])
        .unwrap();

        let rendered = controller.to_string();
        assert!(rendered.starts_with("graph LR"));
        assert!(rendered.contains("0[\"wallets\"]"));
        assert!(rendered.contains("1[\"balances\"]"));
        assert!(rendered.contains("0 -- \"()\" --> 1"));
    }
}
