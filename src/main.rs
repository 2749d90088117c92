use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use retro_glitch::config::Configuration;
use retro_glitch::events::{Rendered, SettingsChanged};
use retro_glitch::loader;
use retro_glitch::pipeline::Pipeline;
use retro_glitch::settings::Preset;
use retro_glitch::tasks;

#[derive(Debug, Parser)]
#[command(
    name = "retro-glitch",
    version,
    about = "Apply retro and glitch effects to an image"
)]
struct Args {
    /// Source image (png, jpeg, webp, gif or bmp)
    #[arg(value_name = "INPUT")]
    input: PathBuf,
    /// Where to write the rendered image; the format follows the extension
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,
    /// YAML settings file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Start from a built-in preset; effects in the settings file still override it
    #[arg(long, value_name = "NAME")]
    preset: Option<Preset>,
    /// Deterministic seed for the random stages
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
    /// Keep running and re-render whenever the settings file changes
    #[arg(long, requires = "config")]
    watch: bool,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("retro_glitch={level},warn"))),
        )
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        input,
        output,
        config,
        preset,
        seed,
        watch,
        verbose,
    } = Args::parse();
    init_tracing(verbose);

    let mut cfg = match &config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    };
    if preset.is_some() {
        cfg.preset = preset;
    }
    if seed.is_some() {
        cfg.pipeline.seed = seed;
    }
    let cfg = cfg.validated().context("invalid configuration values")?;
    tracing::debug!("effective configuration:\n{cfg:#?}");

    let source = {
        let path = input.clone();
        tokio::task::spawn_blocking(move || loader::load_source(&path))
            .await
            .context("source loader panicked")?
            .with_context(|| format!("failed to load {}", input.display()))?
    };
    tracing::info!(
        path = %input.display(),
        width = source.width(),
        height = source.height(),
        "loaded source image"
    );
    let source = Arc::new(source);

    let (settings_tx, settings_rx) = mpsc::channel::<SettingsChanged>(16); // Watcher -> Debounce
    let (rendered_tx, rendered_rx) = mpsc::channel::<Rendered>(4); // Debounce -> Export

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();

    // Debounce controller
    tasks.spawn({
        let pipeline = Pipeline::new(cfg.pipeline.clone(), cancel.clone());
        let source = Arc::clone(&source);
        let cancel = cancel.clone();
        let quiet_period = cfg.debounce.quiet_period;
        async move {
            tasks::debounce::run(
                source,
                pipeline,
                settings_rx,
                rendered_tx,
                cancel,
                quiet_period,
            )
            .await
            .context("debounce task failed")
        }
    });

    // Settings watcher
    if let (true, Some(path)) = (watch, config) {
        tasks.spawn({
            let to_debounce = settings_tx.clone();
            let cancel = cancel.clone();
            async move {
                tasks::watch::run(path, preset, to_debounce, cancel)
                    .await
                    .context("settings watcher failed")
            }
        });
    }

    let export = tokio::spawn({
        let cancel = cancel.clone();
        let output = output.clone();
        async move { tasks::export::run(rendered_rx, output, cancel).await }
    });

    settings_tx
        .send(SettingsChanged(cfg.effect_settings()))
        .await
        .context("debounce controller exited before the first render")?;
    // One-shot mode: closing the channel lets the controller drain and exit.
    drop(settings_tx);

    let summary = export.await.context("export task panicked")?;
    cancel.cancel();

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    let summary = summary.context("export task failed")?;
    tracing::info!(
        written = summary.written,
        failed = summary.failed,
        output = %output.display(),
        "done"
    );
    if summary.written == 0 {
        bail!("no image was written to {}", output.display());
    }
    Ok(())
}
