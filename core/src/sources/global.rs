use crate::dataset::Dataset;
use crate::dataset::SourceTag;
use crate::sources::FetchContext;
use crate::sources::FetchError;
use crate::sources::SourceAdapter;
use crate::validate;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use tracing::debug;
use tracing::warn;

/// Process-wide slot an embedding host (or a prior loader) can fill.
#[derive(Debug, Clone, Default)]
pub struct GlobalSlot {
    inner: Arc<RwLock<Option<Dataset>>>,
}

impl GlobalSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, dataset: Dataset) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(dataset);
    }

    pub fn get(&self) -> Option<Dataset> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Fill the slot from another source. Returns whether the slot was filled.
    pub async fn prime(&self, source: &dyn SourceAdapter, ctx: &FetchContext) -> bool {
        match source.fetch(ctx).await {
            Ok(dataset) => {
                debug!(from = %source.source(), records = dataset.len(), "primed global slot");
                self.set(dataset);
                true
            }
            Err(err) => {
                warn!(from = %source.source(), error = %err, "could not prime global slot");
                false
            }
        }
    }
}

pub struct GlobalVariableAdapter {
    slot: GlobalSlot,
}

impl GlobalVariableAdapter {
    pub fn new(slot: GlobalSlot) -> Self {
        Self { slot }
    }
}

#[async_trait]
impl SourceAdapter for GlobalVariableAdapter {
    fn source(&self) -> SourceTag {
        SourceTag::GlobalVariable
    }

    async fn fetch(&self, _ctx: &FetchContext) -> Result<Dataset, FetchError> {
        let dataset = self
            .slot
            .get()
            .ok_or_else(|| FetchError::Missing("global dataset slot".to_string()))?
            .tagged(SourceTag::GlobalVariable);
        validate::check(&dataset)?;
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SampleDataAdapter;
    use assert_matches::assert_matches;
    use chrono::Local;

    #[tokio::test]
    async fn empty_slot_is_missing() {
        let adapter = GlobalVariableAdapter::new(GlobalSlot::new());
        let ctx = FetchContext::new(Local::now().fixed_offset(), false);
        assert_matches!(adapter.fetch(&ctx).await, Err(FetchError::Missing(_)));
    }

    #[tokio::test]
    async fn primed_slot_is_served_under_its_own_tag() {
        let slot = GlobalSlot::new();
        let ctx = FetchContext::new(Local::now().fixed_offset(), false);
        assert!(slot.prime(&SampleDataAdapter, &ctx).await);

        let dataset = GlobalVariableAdapter::new(slot.clone())
            .fetch(&ctx)
            .await
            .expect("fetch");
        assert_eq!(dataset.source, Some(SourceTag::GlobalVariable));
        assert!(!dataset.is_sample);
        assert_eq!(dataset.len(), 2);

        slot.clear();
        assert!(slot.get().is_none());
    }
}
