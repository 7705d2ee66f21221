//! Command-line interface.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use pastesalvo::client::{next_salvo_no, SalvoClient, DEFAULT_SALVO_SIZE};
use pastesalvo::config::StoreBackend;
use pastesalvo::{open_store, server, Settings, StatsAggregator};

/// Fire salvos of paste fetches and report per-salvo statistics.
///
/// Examples:
///   pastesalvo serve --port 8000
///   pastesalvo salvo --count 7 --server http://127.0.0.1:8000
///   pastesalvo stats --salvo 3
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory holding the SQLite database
    #[arg(long, global = true, value_name = "DIR", env = "PASTESALVO_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Fire one salvo of concurrent fetches at a running server
    Salvo {
        /// Number of requests in the salvo
        #[arg(short, long, default_value_t = DEFAULT_SALVO_SIZE, value_name = "N")]
        count: usize,

        /// Base URL of the server
        #[arg(long, value_name = "URL", env = "PASTESALVO_SERVER")]
        server: Option<String>,

        /// Give up on a single request after this many seconds
        /// (default: wait for the server's own retry limit)
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// Compute stats for a salvo from the local database
    Stats {
        #[arg(long, value_name = "N")]
        salvo: i64,
    },
}

pub async fn run(cli: Cli, mut settings: Settings) -> Result<()> {
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| settings.host.clone());
            let port = port.unwrap_or(settings.port);
            server::serve(&settings, &host, port).await
        }
        Commands::Salvo {
            count,
            server,
            timeout,
        } => {
            if settings.store_backend == StoreBackend::Memory {
                bail!("the salvo command reads the shared database; the memory backend has none");
            }
            let store = open_store(&settings)
                .await
                .context("failed to open store")?;
            let salvo_no = next_salvo_no(store.as_ref()).await?;

            let base_url = server
                .unwrap_or_else(|| format!("http://{}:{}", settings.host, settings.port));
            let report = SalvoClient::new(&base_url, timeout.map(Duration::from_secs))?
                .run(salvo_no, count)
                .await?;
            info!(
                "Salvo {} finished: {} succeeded, {} failed",
                report.salvo_no, report.succeeded, report.failed
            );
            println!("{}", serde_json::to_string_pretty(&report.stats)?);
            Ok(())
        }
        Commands::Stats { salvo } => {
            let store = open_store(&settings)
                .await
                .context("failed to open store")?;
            let stats = StatsAggregator::new(store).compute(salvo).await?;
            println!("{}", serde_json::to_string_pretty(&stats.to_labelled())?);
            Ok(())
        }
    }
}
