use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use keeper_ledger::SqliteLedger;
use keeper_scan::Scanner;
use keeper_sdk::{CanonicalPath, Vault, VersionId, VersionView};
use keeper_server::{AppState, KeeperServer};
use keeper_source::{LocalDirSource, ObjectSource};

use crate::cli::*;
use crate::config::{Config, SourceConfig};
use crate::output;

/// Column width of each side in `diff --split`.
const SPLIT_WIDTH: usize = 60;

/// Handles opened from the configuration.
struct Handles {
    config: Config,
    ledger: Arc<SqliteLedger>,
    source: Arc<dyn ObjectSource>,
    vault: Vault,
}

impl Handles {
    fn open(config: Config) -> anyhow::Result<Self> {
        let ledger = Arc::new(SqliteLedger::open(&config.database.path).with_context(|| {
            format!("failed to open ledger at {}", config.database.path.display())
        })?);
        let source: Arc<dyn ObjectSource> = match &config.source {
            SourceConfig::Local { root } => Arc::new(LocalDirSource::new(root)),
        };
        let vault = Vault::new(ledger.clone(), source.clone());
        Ok(Self {
            config,
            ledger,
            source,
            vault,
        })
    }

    fn scanner(&self) -> anyhow::Result<Scanner> {
        Ok(Scanner::new(
            self.source.clone(),
            self.ledger.clone(),
            self.config.storage_scopes()?,
            self.config.scan_config(),
        )?)
    }
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(&cli.config)?;
    let ctx = Handles::open(config)?;
    let format = cli.format;
    match cli.command {
        Command::Serve(args) => cmd_serve(ctx, args).await,
        Command::Scan => cmd_scan(&ctx, format).await,
        Command::Files => cmd_files(&ctx, format),
        Command::Log(args) => cmd_log(&ctx, args, format),
        Command::Show(args) => cmd_show(&ctx, args, format),
        Command::Diff(args) => cmd_diff(&ctx, args, format),
        Command::Restore(args) => cmd_restore(&ctx, args, format).await,
        Command::Verify => cmd_verify(&ctx, format),
    }
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce(&T) -> String) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => print!("{}", text(value)),
    }
    Ok(())
}

fn canonical_path(raw: &str) -> anyhow::Result<CanonicalPath> {
    CanonicalPath::parse(raw).with_context(|| format!("invalid path {raw:?}"))
}

fn version_id(raw: &str) -> anyhow::Result<VersionId> {
    raw.parse().with_context(|| format!("invalid version id {raw:?}"))
}

async fn cmd_serve(ctx: Handles, args: ServeArgs) -> anyhow::Result<()> {
    let mut server_config = ctx.config.server.clone();
    if let Some(bind) = &args.bind {
        server_config.bind_addr = bind
            .parse()
            .with_context(|| format!("invalid bind address {bind:?}"))?;
    }

    let scanner = Arc::new(ctx.scanner()?);
    let state = AppState::new(ctx.vault.clone()).with_scanner(scanner.clone());
    let (stop_tx, stop_rx) = watch::channel(false);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown requested"),
            Err(e) => {
                warn!(error = %e, "cannot listen for Ctrl-C; stop the process externally");
                std::future::pending::<()>().await;
            }
        }
        let _ = stop_tx.send(true);
    });

    let scan_loop = (!args.no_scan).then(|| {
        let mut stop = stop_rx.clone();
        tokio::spawn(async move {
            scanner
                .run_until(async move {
                    let _ = stop.changed().await;
                })
                .await
        })
    });

    let mut stop = stop_rx;
    KeeperServer::new(server_config, state)
        .serve(async move {
            let _ = stop.changed().await;
        })
        .await?;

    if let Some(handle) = scan_loop {
        handle.await.context("scanner task failed")?;
    }
    info!("keeper stopped");
    Ok(())
}

async fn cmd_scan(ctx: &Handles, format: OutputFormat) -> anyhow::Result<()> {
    let report = ctx.scanner()?.run_cycle().await?;
    emit(format, &report, output::cycle_report)
}

fn cmd_files(ctx: &Handles, format: OutputFormat) -> anyhow::Result<()> {
    let files = ctx.vault.list_tracked_files()?;
    emit(format, &files, |f| output::files(f))
}

fn cmd_log(ctx: &Handles, args: LogArgs, format: OutputFormat) -> anyhow::Result<()> {
    let path = canonical_path(&args.path)?;
    let mut versions = ctx.vault.list_versions(&path)?;
    if let Some(limit) = args.limit {
        versions.truncate(limit);
    }
    match format {
        OutputFormat::Json => {
            let views: Vec<VersionView> = versions.into_iter().map(VersionView::summary).collect();
            emit(format, &views, |_| String::new())
        }
        OutputFormat::Text => emit(format, &versions, |v| output::log(v)),
    }
}

fn cmd_show(ctx: &Handles, args: ShowArgs, format: OutputFormat) -> anyhow::Result<()> {
    let version = ctx.vault.get_version(version_id(&args.version)?)?;
    match format {
        OutputFormat::Json if args.no_content => emit(format, &VersionView::summary(version), |_| String::new()),
        OutputFormat::Json => emit(format, &VersionView::full(version), |_| String::new()),
        OutputFormat::Text => emit(format, &version, |v| output::version(v, !args.no_content)),
    }
}

fn cmd_diff(ctx: &Handles, args: DiffArgs, format: OutputFormat) -> anyhow::Result<()> {
    let diff = ctx
        .vault
        .compute_diff(version_id(&args.old)?, version_id(&args.new)?)?;
    emit(format, &diff, |d| {
        if args.split {
            output::split(d, SPLIT_WIDTH)
        } else {
            output::unified(d, args.context)
        }
    })
}

async fn cmd_restore(ctx: &Handles, args: RestoreArgs, format: OutputFormat) -> anyhow::Result<()> {
    let path = canonical_path(&args.path)?;
    let receipt = ctx.vault.restore(&path, version_id(&args.version)?).await?;
    emit(format, &receipt, |r| {
        format!(
            "{} restored {} to v{} ({} bytes)\n  the next scan cycle records it as a new version\n",
            "✓".green().bold(),
            r.path.to_string().bold(),
            r.version,
            r.bytes
        )
    })
}

fn cmd_verify(ctx: &Handles, format: OutputFormat) -> anyhow::Result<()> {
    let report = ctx.vault.verify_integrity()?;
    emit(format, &report, output::integrity)?;
    if !report.is_valid() {
        bail!("ledger integrity check failed");
    }
    Ok(())
}
