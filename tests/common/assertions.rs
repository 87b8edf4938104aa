//! Waiting helpers built on the event stream and progress endpoint

use media_dl::{Event, JobId, MediaDownloader, Status};
use std::time::Duration;

/// Terminal outcome observed for a job
#[derive(Debug, PartialEq)]
pub enum WaitResult {
    /// Job completed with this filename
    Completed(String),
    /// Job failed with this error
    Failed(String),
    /// Timeout waiting for a terminal event
    Timeout,
    /// Event channel closed unexpectedly
    ChannelClosed,
}

/// Wait for the next job to start and return its id
pub async fn wait_for_started(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    timeout: Duration,
) -> Option<JobId> {
    tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::Started { id, .. }) => return Some(id),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}

/// Wait for `id` to reach Completed or Failed
pub async fn wait_for_terminal(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    id: JobId,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::Completed {
                    id: event_id,
                    filename,
                    ..
                }) if event_id == id => return WaitResult::Completed(filename),
                Ok(Event::Failed {
                    id: event_id,
                    error,
                }) if event_id == id => return WaitResult::Failed(error),
                Ok(_) => continue,
                Err(_) => return WaitResult::ChannelClosed,
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}

/// Poll the registry until `id` reaches `status`
pub async fn wait_for_status(
    downloader: &MediaDownloader,
    id: JobId,
    status: Status,
    timeout: Duration,
) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if downloader.progress(&id.to_string()).status == status {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
