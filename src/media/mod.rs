//! Media backend - carries out playback commands
//!
//! A `Load` starts a buffering task that GETs the content locator and pulls
//! bytes until `buffer_bytes` are held. The task reports back through the
//! completion channel as a [`RuntimeEvent::Media`] tagged with a load id.
//! `Unload` aborts the task and forgets the id, so an outcome that was already
//! queued when the item was unloaded is recognised as stale. `Play`/`Pause`
//! move the single output slot.

use crate::events::{MediaOutcome, RuntimeEvent};
use crate::feed::{FailureReason, MediaCommand, SessionContext};
use anyhow::{Context, Result};
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, RANGE};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Executes [`MediaCommand`]s against some playback surface
pub trait MediaBackend: Send {
    /// Carry out one command; completions go to `completions`
    fn execute(&mut self, command: MediaCommand, completions: &mpsc::Sender<RuntimeEvent>);

    /// Credentials for subsequent loads
    fn set_session(&mut self, session: SessionContext);

    /// Whether `load` is still the live load for `index`
    fn is_current(&self, index: usize, load: u64) -> bool;

    /// Item currently holding the output, if any
    fn output(&self) -> Option<usize>;
}

struct Load {
    id: u64,
    handle: JoinHandle<()>,
}

/// HTTP buffering backend
pub struct HttpMediaBackend {
    client: reqwest::Client,
    buffer_bytes: usize,
    session: SessionContext,
    next_load: u64,
    loads: HashMap<usize, Load>,
    output: Option<usize>,
}

impl HttpMediaBackend {
    pub fn new(buffer_bytes: usize, timeout: Duration, session: SessionContext) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create media HTTP client")?;
        Ok(Self {
            client,
            buffer_bytes: buffer_bytes.max(1),
            session,
            next_load: 0,
            loads: HashMap::new(),
            output: None,
        })
    }

    /// Items with a live load (buffering or buffered)
    #[cfg(test)]
    pub fn loaded(&self) -> usize {
        self.loads.len()
    }

    fn load(&mut self, index: usize, uri: String, completions: &mpsc::Sender<RuntimeEvent>) {
        // A repeated load for the same item replaces the earlier task
        if let Some(previous) = self.loads.remove(&index) {
            previous.handle.abort();
        }

        self.next_load += 1;
        let load = self.next_load;
        let client = self.client.clone();
        let token = self.session.token().map(str::to_string);
        let limit = self.buffer_bytes;
        let tx = completions.clone();

        tracing::debug!(index, uri = %uri, "Buffering media");
        let handle = tokio::spawn(async move {
            let outcome = match buffer(&client, &uri, token.as_deref(), limit).await {
                Ok(buffered_bytes) => MediaOutcome::Ready { buffered_bytes },
                Err(reason) => {
                    tracing::warn!(index, uri = %uri, "Media failed: {}", reason);
                    MediaOutcome::Failed(reason)
                }
            };
            let _ = tx
                .send(RuntimeEvent::Media {
                    index,
                    load,
                    outcome,
                })
                .await;
        });
        self.loads.insert(index, Load { id: load, handle });
    }

    fn unload(&mut self, index: usize) {
        if let Some(load) = self.loads.remove(&index) {
            load.handle.abort();
        }
        if self.output == Some(index) {
            self.output = None;
        }
    }
}

impl MediaBackend for HttpMediaBackend {
    fn execute(&mut self, command: MediaCommand, completions: &mpsc::Sender<RuntimeEvent>) {
        match command {
            MediaCommand::Load { index, uri } => self.load(index, uri, completions),
            MediaCommand::Play { index } => {
                tracing::debug!(index, "Output -> play");
                self.output = Some(index);
            }
            MediaCommand::Pause { index } => {
                if self.output == Some(index) {
                    self.output = None;
                }
            }
            MediaCommand::Unload { index } => self.unload(index),
        }
    }

    fn set_session(&mut self, session: SessionContext) {
        self.session = session;
    }

    fn is_current(&self, index: usize, load: u64) -> bool {
        self.loads.get(&index).is_some_and(|live| live.id == load)
    }

    fn output(&self) -> Option<usize> {
        self.output
    }
}

impl Drop for HttpMediaBackend {
    fn drop(&mut self) {
        for (_, load) in self.loads.drain() {
            load.handle.abort();
        }
    }
}

/// Content types the player accepts
pub fn is_playable(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("video/")
        || essence == "application/vnd.apple.mpegurl"
        || essence == "application/x-mpegurl"
}

/// Pull up to `limit` bytes, mapping every failure to a reason
async fn buffer(
    client: &reqwest::Client,
    uri: &str,
    token: Option<&str>,
    limit: usize,
) -> Result<usize, FailureReason> {
    let mut request = client
        .get(uri)
        .header(RANGE, format!("bytes=0-{}", limit.saturating_sub(1)));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await.map_err(|e| {
        tracing::debug!("Media request error: {}", e);
        FailureReason::Network
    })?;
    if !response.status().is_success() {
        tracing::debug!(status = response.status().as_u16(), "Media request rejected");
        return Err(FailureReason::Network);
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !is_playable(&content_type) {
        return Err(FailureReason::UnsupportedFormat);
    }

    let mut stream = response.bytes_stream();
    let mut buffered = 0usize;
    while let Some(chunk) = stream.next().await {
        let chunk: Bytes = chunk.map_err(|e| {
            tracing::debug!("Media stream interrupted: {}", e);
            FailureReason::Aborted
        })?;
        buffered += chunk.len();
        if buffered >= limit {
            break;
        }
    }

    if buffered == 0 {
        return Err(FailureReason::Decode);
    }
    Ok(buffered)
}
