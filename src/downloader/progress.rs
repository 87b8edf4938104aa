//! Engine progress to registry/event translation.

use crate::engine::{ProgressEvent, ProgressListener};
use crate::registry::JobRegistry;
use crate::types::{Event, JobId, JobUpdate, Status};
use tokio::sync::broadcast;

/// Progress listener that writes into the registry and the event bus
///
/// The engine may call this from any task; both the registry and the
/// broadcast sender are safe to use concurrently.
pub(crate) struct RegistryProgress {
    id: JobId,
    registry: JobRegistry,
    event_tx: broadcast::Sender<Event>,
}

impl RegistryProgress {
    pub(crate) fn new(id: JobId, registry: JobRegistry, event_tx: broadcast::Sender<Event>) -> Self {
        Self {
            id,
            registry,
            event_tx,
        }
    }
}

impl ProgressListener for RegistryProgress {
    fn on_progress(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Downloading {
                percent,
                speed,
                eta,
            } => {
                self.registry.update(
                    self.id,
                    JobUpdate {
                        status: Some(Status::Downloading),
                        percent: Some(percent),
                        speed: speed.clone(),
                        eta: eta.clone(),
                        ..Default::default()
                    },
                );

                // report what the registry accepted, not the raw engine value
                let state = self.registry.get(self.id);
                if state.status == Status::Downloading {
                    self.event_tx
                        .send(Event::Progress {
                            id: self.id,
                            percent: state.percent.unwrap_or(percent),
                            speed,
                            eta,
                        })
                        .ok();
                }
            }
            ProgressEvent::Finished => {
                let before = self.registry.get(self.id).status;
                self.registry.update(
                    self.id,
                    JobUpdate {
                        status: Some(Status::Processing),
                        percent: Some(100.0),
                        ..Default::default()
                    },
                );
                if before != Status::Processing && !before.is_terminal() {
                    tracing::debug!(download_id = %self.id, "transfer finished, post-processing");
                    self.event_tx.send(Event::Processing { id: self.id }).ok();
                }
            }
        }
    }
}
