use clap::Parser;
use escrow_engine::application::engine::EscrowStateMachine;
use escrow_engine::application::script::ScriptRunner;
use escrow_engine::config::DeploymentConfig;
use escrow_engine::infrastructure::in_memory::{
    InMemoryAssetLedger, InMemoryEscrowStore, InMemoryEventLog,
};
use escrow_engine::interfaces::csv::command_reader::CommandReader;
use escrow_engine::interfaces::csv::event_writer::EventWriter;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Command stream CSV file (`caller, action, arg`)
    input: PathBuf,

    /// Deployment file (JSON) describing the escrow and initial balances
    #[arg(long)]
    deployment: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

async fn in_memory_runner(config: &DeploymentConfig) -> escrow_engine::error::Result<ScriptRunner> {
    let ledger = InMemoryAssetLedger::new(config.asset.clone());
    let machine = EscrowStateMachine::deploy(
        config.deployment(),
        Box::new(ledger.clone()),
        Box::new(InMemoryEscrowStore::new()),
        Box::new(InMemoryEventLog::new()),
    )
    .await?;
    for (account, amount) in &config.balances {
        ledger.mint(account, *amount).await?;
    }
    Ok(ScriptRunner::new(machine, Box::new(ledger)))
}

#[cfg(feature = "storage-rocksdb")]
async fn persistent_runner(
    db_path: &std::path::Path,
    config: &DeploymentConfig,
) -> escrow_engine::error::Result<ScriptRunner> {
    use escrow_engine::domain::ports::EscrowStore;
    use escrow_engine::infrastructure::rocksdb::RocksDBStore;

    let store = RocksDBStore::open(db_path, config.asset.clone())?;
    let machine = if store.load().await?.is_some() {
        tracing::info!(db_path = %db_path.display(), "resuming persisted escrow");
        let machine = EscrowStateMachine::open(
            Box::new(store.clone()),
            Box::new(store.clone()),
            Box::new(store.clone()),
        )
        .await?;
        config.check_matches(&machine.snapshot().await)?;
        machine
    } else {
        let machine = EscrowStateMachine::deploy(
            config.deployment(),
            Box::new(store.clone()),
            Box::new(store.clone()),
            Box::new(store.clone()),
        )
        .await?;
        for (account, amount) in &config.balances {
            store.mint(account, *amount).await?;
        }
        machine
    };
    Ok(ScriptRunner::new(machine, Box::new(store)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr)
        .init();

    let config = DeploymentConfig::load(&cli.deployment).into_diagnostic()?;

    let runner = match cli.db_path.as_deref() {
        #[cfg(feature = "storage-rocksdb")]
        Some(db_path) => persistent_runner(db_path, &config).await,
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            tracing::warn!(
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            in_memory_runner(&config).await
        }
        None => in_memory_runner(&config).await,
    }
    .into_diagnostic()?;

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    let stdout = io::stdout();
    let mut writer = EventWriter::new(stdout.lock()).into_diagnostic()?;

    for instruction in reader.instructions() {
        match instruction {
            Ok(instruction) => {
                match runner.apply(&instruction.caller, instruction.command).await {
                    Ok(Some(event)) => writer.write_event(&event).into_diagnostic()?,
                    Ok(None) => {}
                    Err(e) => tracing::warn!(
                        caller = %instruction.caller,
                        command = ?instruction.command,
                        "Error processing command: {e}"
                    ),
                }
            }
            Err(e) => tracing::warn!("Error reading command: {e}"),
        }
    }
    writer.flush().into_diagnostic()?;

    let snapshot = runner.machine().snapshot().await;
    let custody = runner.balance_of(&snapshot.custody).await.into_diagnostic()?;
    let seller = runner.balance_of(&snapshot.seller).await.into_diagnostic()?;
    let buyer = runner.balance_of(&snapshot.buyer).await.into_diagnostic()?;
    tracing::info!(
        status = %snapshot.status,
        code = snapshot.status.code(),
        custody,
        seller,
        buyer,
        "final escrow state"
    );

    Ok(())
}
