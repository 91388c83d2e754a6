use crate::dataset::Dataset;
use crate::dataset::SourceTag;
use crate::orchestrator::Orchestrator;
use crate::sources::FetchError;
use crate::sources::RemoteDatabaseAdapter;
use crate::sources::remote::redacted;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Running push subscription; stops when dropped.
#[derive(Debug)]
pub struct RemoteSubscription {
    handle: JoinHandle<()>,
}

impl RemoteSubscription {
    /// Wait for the server to end the stream. Not to be awaited again once
    /// it has returned.
    pub async fn ended(&mut self) {
        let _ = (&mut self.handle).await;
    }
}

impl Drop for RemoteSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Debug, Deserialize)]
struct StreamPayload {
    path: String,
    #[serde(default)]
    data: Value,
}

enum Control {
    Continue,
    Stop,
}

impl RemoteDatabaseAdapter {
    /// Follow the node's event stream and hand every change to `orchestrator`.
    pub fn subscribe(self: &Arc<Self>, orchestrator: Arc<Orchestrator>) -> RemoteSubscription {
        let adapter = Arc::clone(self);
        let handle = tokio::spawn(async move {
            match adapter.follow(&orchestrator).await {
                Ok(()) => info!("remote subscription ended"),
                Err(err) => warn!(error = %err, "remote subscription failed"),
            }
        });
        RemoteSubscription { handle }
    }

    async fn follow(&self, orchestrator: &Orchestrator) -> Result<(), FetchError> {
        let url = self.endpoint(None)?;
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: redacted(&url),
                status: status.as_u16(),
            });
        }
        info!(url = %redacted(&url), "remote subscription open");

        let mut events = response.bytes_stream().eventsource();
        while let Some(event) = events.next().await {
            let event = event.map_err(|err| FetchError::Stream(err.to_string()))?;
            match self.handle_event(&event.event, &event.data, orchestrator).await {
                Ok(Control::Continue) => {}
                Ok(Control::Stop) => return Ok(()),
                Err(err) => warn!(event = %event.event, error = %err, "ignoring stream event"),
            }
        }
        Ok(())
    }

    async fn handle_event(
        &self,
        kind: &str,
        data: &str,
        orchestrator: &Orchestrator,
    ) -> Result<Control, FetchError> {
        match kind {
            "put" | "patch" => {
                let payload: StreamPayload = serde_json::from_str(data)?;
                let dataset = if kind == "put" && payload.path == "/" {
                    if payload.data.is_null() {
                        return Err(FetchError::Missing("remote node".to_string()));
                    }
                    serde_json::from_value::<Dataset>(payload.data)?
                } else {
                    debug!(path = %payload.path, "partial update, refetching node");
                    self.fetch_full().await?
                };
                orchestrator
                    .apply_push(dataset.tagged(SourceTag::RemoteDbSubscription))
                    .await?;
                Ok(Control::Continue)
            }
            "keep-alive" => Ok(Control::Continue),
            "cancel" | "auth_revoked" => {
                info!(reason = kind, "server closed remote subscription");
                Ok(Control::Stop)
            }
            other => {
                debug!(event = other, "unhandled stream event");
                Ok(Control::Continue)
            }
        }
    }
}
