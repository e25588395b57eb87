use std::io::Write;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use cosmos_validators_exporter::{Config, Exporter, FetchContext, init_logging, server};

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
struct Args {
    #[arg(value_enum, index = 1, default_value = "serve")]
    mode: Mode,

    /// Path to the TOML config file.
    #[arg(long, default_value = "config.toml")]
    config: Utf8PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Mode {
    /// Serve metrics over HTTP.
    Serve,
    /// Collect once and print the metrics.
    Once,
    /// Print the fetcher dependency graph as a Mermaid diagram.
    Graph,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(&args.config)?;

    init_logging(&config.log, matches!(args.mode, Mode::Once))?;

    for warning in config.warnings() {
        tracing::warn!(chain = %warning.chain, "{}", warning.message);
    }

    let exporter = Exporter::new(config)?;

    match args.mode {
        Mode::Serve => server::serve(Arc::new(exporter)).await?,
        Mode::Once => {
            let collected = exporter.collect(&FetchContext::default()).await;
            let text = exporter.render(&collected)?;
            std::io::stdout().write_all(text.as_bytes())?;
        }
        Mode::Graph => println!("{}", exporter.controller()),
    }

    Ok(())
}
