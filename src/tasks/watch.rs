use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{recommended_watcher, Event, EventKind, RecursiveMode, Watcher};
use tokio::select;
use tokio::sync::mpsc::{self, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::Configuration;
use crate::events::SettingsChanged;
use crate::settings::{EffectSettings, Preset};

/// Re-reads the settings file whenever it changes and forwards the resulting
/// settings record.
///
/// The parent directory is watched rather than the file itself so editors that
/// save by rename keep working. Edits that fail to parse or validate are
/// logged and otherwise ignored.
#[instrument(skip(preset_override, to_debounce, cancel), fields(path = %path.display()))]
pub async fn run(
    path: PathBuf,
    preset_override: Option<Preset>,
    to_debounce: Sender<SettingsChanged>,
    cancel: CancellationToken,
) -> Result<()> {
    let file_name = path
        .file_name()
        .map(OsString::from)
        .with_context(|| format!("{} does not name a file", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Result<Event>>(64);
    let mut watcher = recommended_watcher(move |res| {
        let _ = watch_tx.blocking_send(res);
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    info!(watching = %dir.display(), "settings watcher initialized");

    let mut last_sent: Option<EffectSettings> = None;
    loop {
        select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting settings watcher");
                break;
            }

            Some(res) = watch_rx.recv() => match res {
                Ok(event) => {
                    if !is_relevant(&event, &file_name) {
                        continue;
                    }
                    debug!(kind = ?event.kind, "settings file touched");
                    let Some(settings) = reload(&path, preset_override) else {
                        continue;
                    };
                    if last_sent == Some(settings) {
                        debug!("settings unchanged; not forwarding");
                        continue;
                    }
                    last_sent = Some(settings);
                    if to_debounce.send(SettingsChanged(settings)).await.is_err() {
                        debug!("debounce controller closed");
                        break;
                    }
                }
                Err(err) => error!("watch error: {err}"),
            }
        }
    }
    Ok(())
}

fn is_relevant(event: &Event, file_name: &OsString) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

/// Load the effect settings from `path`, or `None` when the file is invalid.
pub fn reload(path: &Path, preset_override: Option<Preset>) -> Option<EffectSettings> {
    let loaded = Configuration::from_yaml_file(path).and_then(Configuration::validated);
    match loaded {
        Ok(mut cfg) => {
            if preset_override.is_some() {
                cfg.preset = preset_override;
            }
            Some(cfg.effect_settings())
        }
        Err(err) => {
            warn!(path = %path.display(), "ignoring invalid settings edit: {err:#}");
            None
        }
    }
}
