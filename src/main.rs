use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use uuid::Uuid;

use netmap::autosave::SaveError;
use netmap::clock::{Clock, SystemClock};
use netmap::config::{AutoSaveConfig, LayoutConfig};
use netmap::model::TreeNode;
use netmap::parse::parse;
use netmap::persist::{self, PersistError};
use netmap::state::{AppState, StateError};
use netmap::store::{FileLayoutStore, LayoutStore, MemoryLayoutStore, NetworkId};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read report {path}: {source}")]
    ReadReport { path: PathBuf, source: std::io::Error },
    #[error("missing layout store; pass --store or set NETMAP_STORE_DIR")]
    MissingStore,
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "netmap", about = "Scanner report parser and topology layout")]
struct Cli {
    /// Directory holding one saved layout per network.
    #[arg(long, env = "NETMAP_STORE_DIR", global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the parsed report as JSON.
    Parse { report: PathBuf },
    /// Parse a report, lay it out, and print the saved-layout document.
    Layout {
        report: PathBuf,
        /// Network id to save under; a new one is generated when omitted.
        #[arg(long)]
        network: Option<Uuid>,
    },
    /// List device positions of a saved network.
    Show {
        #[arg(long)]
        network: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Parse { report } => run_parse(&report).await,
        Command::Layout { report, network } => run_layout(&report, network, cli.store.as_deref()).await,
        Command::Show { network } => run_show(network, cli.store.as_deref()).await,
    }
}

async fn read_report(path: &Path) -> Result<String, CliError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::ReadReport { path: path.to_path_buf(), source })
}

async fn run_parse(report: &Path) -> Result<(), CliError> {
    let raw = read_report(report).await?;
    let parsed = parse(&raw, SystemClock.now());
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}

async fn run_layout(report: &Path, network: Option<NetworkId>, store_dir: Option<&Path>) -> Result<(), CliError> {
    let raw = read_report(report).await?;
    let network_id = network.unwrap_or_else(Uuid::new_v4);
    let store: Arc<dyn LayoutStore> = match store_dir {
        Some(dir) => Arc::new(FileLayoutStore::new(dir)),
        None => Arc::new(MemoryLayoutStore::new()),
    };
    let state = AppState::new(store, Arc::new(SystemClock), LayoutConfig::from_env());

    let devices = state.open_report(network_id, &raw).await;
    let layout = state.with_session(network_id, |session| Ok(session.auto_layout())).await?;
    info!(%network_id, devices, max_depth = layout.max_depth, "report laid out");

    if store_dir.is_some() {
        let saver = state.autosaver(network_id, AutoSaveConfig::from_env(), None);
        let outcome = saver.save_now(state.snapshot(network_id).await?).await?;
        info!(%network_id, ?outcome, "layout stored");
    }

    let saved = state.with_session(network_id, |session| Ok(session.export_layout())).await?;
    println!("{}", persist::to_json(&saved)?);
    Ok(())
}

async fn run_show(network_id: NetworkId, store_dir: Option<&Path>) -> Result<(), CliError> {
    let dir = store_dir.ok_or(CliError::MissingStore)?;
    let state = AppState::new(Arc::new(FileLayoutStore::new(dir)), Arc::new(SystemClock), LayoutConfig::from_env());
    state.load_network(network_id).await?;

    let rows = state
        .with_session(network_id, |session| Ok(session.devices().into_iter().map(format_row).collect::<Vec<_>>()))
        .await?;
    for row in rows {
        println!("{row}");
    }
    Ok(())
}

fn format_row(node: &TreeNode) -> String {
    let position = match (node.fx, node.fy) {
        (Some(x), Some(y)) => format!("({x:.0}, {y:.0})"),
        _ => "unplaced".to_owned(),
    };
    format!("{:<16} {:<24} {:<15} {position}", node.ip.as_deref().unwrap_or("-"), node.name, node.role.as_str())
}
