use crate::dataset::Dataset;
use async_channel::Receiver;
use async_channel::Sender;
use async_channel::TryRecvError;
use async_channel::TrySendError;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use tracing::debug;

/// What consumers are told after each resolution.
#[derive(Debug, Clone)]
pub enum ResolutionEvent {
    Resolved(Arc<Dataset>),
    Failed { message: String, attempts: u32 },
}

impl ResolutionEvent {
    pub fn dataset(&self) -> Option<&Arc<Dataset>> {
        match self {
            ResolutionEvent::Resolved(dataset) => Some(dataset),
            ResolutionEvent::Failed { .. } => None,
        }
    }
}

/// Receiving half handed out by [`super::Orchestrator::subscribe`].
#[derive(Debug)]
pub struct DatasetSubscriber {
    rx: Receiver<ResolutionEvent>,
}

impl DatasetSubscriber {
    /// `None` once the orchestrator is gone and the buffer is drained.
    pub async fn next(&self) -> Option<ResolutionEvent> {
        self.rx.recv().await.ok()
    }

    pub fn try_next(&self) -> Option<ResolutionEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Closed) => None,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Broadcaster {
    subscribers: Mutex<Vec<Sender<ResolutionEvent>>>,
}

impl Broadcaster {
    pub(crate) fn subscribe(&self) -> DatasetSubscriber {
        let (tx, rx) = async_channel::unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        DatasetSubscriber { rx }
    }

    /// Deliver to every live subscriber. Only subscribers whose receiver is
    /// gone are pruned; a slow reader keeps its backlog.
    pub(crate) fn publish(&self, event: ResolutionEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Closed(_)) => {
                debug!("dropping dataset subscriber");
                false
            }
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
