mod cli;
mod error;

use crate::cli::{Cli, Command, Keep};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::{OptionExt, ResultExt};
use scribe_cache::{Database, Repository};
use scribe_config::Config;
use scribe_metrics::Metrics;
use scribe_remote::{Content, DocumentId, HttpRemote, summary_or_message};
use scribe_sync::{AutosaveOptions, LoadOutcome, NoIndex, Opened, Session, Snapshot};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use time::UtcOffset;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Must be read before any other thread exists.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let cli = Cli::parse();
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: could not start the async runtime: {err}");
            return ExitCode::FAILURE;
        },
    };
    match runtime.block_on(run(cli, offset)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli, offset: UtcOffset) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    init_tracing(&config);
    match cli.command {
        Command::Open { id, keep } => open(&config, DocumentId::new(id), keep).await,
        Command::Push { id, content, keep } => push(&config, DocumentId::new(id), &content, keep, offset).await,
        Command::Stats { file } => {
            let text = read(&file).await?;
            for line in Metrics::compute(&text).dashboard() {
                println!("{line}");
            }
            Ok(())
        },
        Command::Summarise { file } => {
            let text = read(&file).await?;
            let remote = remote(&config)?;
            println!("{}", summary_or_message(remote.summarise(&text).await));
            Ok(())
        },
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn remote(config: &Config) -> Result<HttpRemote> {
    HttpRemote::new(&config.remote.name, &config.remote.base_url, config.remote.timeout()).or_raise(|| ErrorKind::Remote)
}

async fn session(config: &Config) -> Result<(Session, Database)> {
    let path = config.cache_path().or_raise(|| ErrorKind::Config)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Cache)?;
    }
    let db = Database::connect(&path).await.or_raise(|| ErrorKind::Cache)?;
    let options = AutosaveOptions {
        debounce: config.autosave.debounce(),
    };
    let session = Session::new(Arc::new(remote(config)?), Arc::new(Repository::from(&db)), Arc::new(NoIndex), options);
    Ok((session, db))
}

/// Open a document and settle any conflict, the way the editor would
/// before letting the user type.
async fn load(session: &Session, id: DocumentId, keep: Option<Keep>) -> Result<LoadOutcome> {
    let outcome = match session.open(id.clone()).await {
        Opened::Ready(outcome) => outcome,
        Opened::Superseded => exn::bail!(ErrorKind::Sync),
    };
    if !outcome.conflict.is_pending() {
        return Ok(outcome);
    }
    match keep {
        Some(Keep::Local) => session.keep_local().await.or_raise(|| ErrorKind::Sync)?,
        Some(Keep::Cloud) => session.keep_cloud().await.or_raise(|| ErrorKind::Sync)?,
        None => exn::bail!(ErrorKind::Conflict(id.to_string())),
    };
    session.current().await.ok_or_raise(|| ErrorKind::Sync)
}

async fn open(config: &Config, id: DocumentId, keep: Option<Keep>) -> Result<()> {
    let (session, db) = session(config).await?;
    let result = load(&session, id, keep).await;
    session.close().await;
    db.close().await;
    let outcome = result?;
    tracing::info!(document = %outcome.id, origin = %outcome.origin, "document ready");
    println!("{}", outcome.working.to_serialized());
    for line in Metrics::compute(&outcome.working.plain_text()).dashboard() {
        eprintln!("{line}");
    }
    Ok(())
}

async fn push(config: &Config, id: DocumentId, file: &Path, keep: Option<Keep>, offset: UtcOffset) -> Result<()> {
    let serialized = read(file).await?;
    let content = Content::from_serialized(&serialized).or_raise(|| ErrorKind::InvalidContent(file.to_path_buf()))?;
    let (session, db) = session(config).await?;
    let result = async {
        load(&session, id, keep).await?;
        session.store_local(&content).await.or_raise(|| ErrorKind::Sync)?;
        session
            .update(Snapshot::new(content.plain_text(), content))
            .await
            .or_raise(|| ErrorKind::Sync)?;
        session.flush().await.or_raise(|| ErrorKind::Sync)
    }
    .await;
    let state = session.status().borrow().clone();
    session.close().await;
    db.close().await;
    result?;
    match state.last_saved_label(offset) {
        Some(at) => println!("{} ({at})", state.label()),
        None => println!("{}", state.label()),
    }
    Ok(())
}

async fn read(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.or_raise(|| ErrorKind::Read(path.to_path_buf()))
}
