use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use image::RgbaImage;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::Error;
use crate::events::{Rendered, SettingsChanged};
use crate::pipeline::Pipeline;
use crate::settings::EffectSettings;

/// Monotonic token identifying the newest settings change.
#[derive(Debug, Default, Clone, Copy)]
pub struct Generation {
    latest: u64,
}

impl Generation {
    /// Issue a fresh token; every earlier token becomes stale.
    pub fn issue(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    #[must_use]
    pub fn latest(&self) -> u64 {
        self.latest
    }

    #[must_use]
    pub fn is_current(&self, token: u64) -> bool {
        token == self.latest
    }
}

/// Coalesces settings changes into pipeline runs.
///
/// Rules:
/// - Every change issues a new generation and restarts the quiet period.
/// - A run starts once the quiet period elapses and no other run is executing.
/// - A run in progress is never interrupted; if it finishes after a newer
///   change arrived its result is dropped and the newer settings run next.
/// - When the settings channel closes, any pending run is still executed
///   before the task exits.
#[instrument(skip_all, fields(quiet_ms = quiet_period.as_millis() as u64))]
pub async fn run(
    source: Arc<RgbaImage>,
    pipeline: Pipeline,
    mut settings_rx: Receiver<SettingsChanged>,
    to_host: Sender<Rendered>,
    cancel: CancellationToken,
    quiet_period: Duration,
) -> Result<()> {
    let mut generation = Generation::default();
    let mut pending: Option<(u64, EffectSettings)> = None;
    let mut in_flight: Option<(u64, EffectSettings)> = None;
    let mut deadline = Instant::now();
    let mut inputs_open = true;
    let mut running: JoinSet<Rendered> = JoinSet::new();

    loop {
        if !inputs_open && pending.is_none() && running.is_empty() {
            debug!("settings closed and nothing left to render");
            break;
        }

        select! {
            _ = cancel.cancelled() => {
                running.abort_all();
                break;
            }

            maybe_changed = settings_rx.recv(), if inputs_open => match maybe_changed {
                Some(SettingsChanged(settings)) => {
                    let token = generation.issue();
                    if let Some((superseded, _)) = pending.replace((token, settings)) {
                        debug!(superseded, generation = token, "pending render rescheduled");
                    }
                    if let Some((executing, _)) = in_flight {
                        debug!(executing, generation = token, "run in progress is now stale");
                    }
                    deadline = Instant::now() + quiet_period;
                }
                None => {
                    debug!("settings channel closed");
                    inputs_open = false;
                }
            },

            _ = sleep_until(deadline), if pending.is_some() && running.is_empty() => {
                if let Some((token, settings)) = pending.take() {
                    debug!(generation = token, "quiet period elapsed; starting run");
                    in_flight = Some((token, settings));
                    let pipeline = pipeline.clone();
                    let source = Arc::clone(&source);
                    running.spawn(async move {
                        let result = pipeline.run(&source, &settings).await;
                        Rendered { generation: token, settings, result }
                    });
                }
            }

            Some(joined) = running.join_next() => {
                let started = in_flight.take();
                let rendered = match joined {
                    Ok(rendered) => rendered,
                    Err(err) if err.is_cancelled() => continue,
                    Err(err) => {
                        let Some((token, settings)) = started else {
                            warn!("render task failed without a recorded run: {err}");
                            continue;
                        };
                        Rendered {
                            generation: token,
                            settings,
                            result: Err(Error::Worker(err.to_string())),
                        }
                    }
                };

                if !generation.is_current(rendered.generation) {
                    debug!(
                        generation = rendered.generation,
                        latest = generation.latest(),
                        "discarding stale render"
                    );
                    continue;
                }
                if let Err(err) = &rendered.result {
                    warn!(generation = rendered.generation, "render failed: {err}");
                }
                if to_host.send(rendered).await.is_err() {
                    warn!("render consumer closed");
                    break;
                }
            }
        }
    }

    Ok(())
}
