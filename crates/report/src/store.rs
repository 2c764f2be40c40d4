//! Context store — one [`Context`] per conversation.
//!
//! Contexts live in memory behind a single `RwLock`. Callers get clones, so
//! a context obtained from [`ContextStore::get`] is a snapshot; changes go
//! back through [`initialize`](ContextStore::initialize) or
//! [`update`](ContextStore::update), which apply a [`StatePatch`] atomically
//! under the write lock and compact the context once its serialized size
//! crosses the configured ceiling.
//!
//! Eviction scans for idle ids under the read lock, then removes each one
//! under the write lock only if it is still idle, so a context updated
//! between the scan and the removal survives.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use folio_config::StoreConfig;
use folio_core::{
    CacheFill, Context, ContextError, Enhancement, Result, StateDefaults, StatePatch,
};
use tracing::{debug, info};

/// What [`ContextStore::compress`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionOutcome {
    /// The context was within the size ceiling.
    Noop,
    Compacted {
        enhancements_dropped: usize,
        prices_dropped: usize,
    },
}

pub struct ContextStore {
    contexts: RwLock<HashMap<String, Context>>,
    config: StoreConfig,
    defaults: StateDefaults,
}

impl ContextStore {
    pub fn new(config: StoreConfig, defaults: StateDefaults) -> Self {
        Self {
            contexts: RwLock::new(HashMap::new()),
            config,
            defaults,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Context>> {
        self.contexts.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Context>> {
        self.contexts.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Create an unclassified context at version 1.
    pub fn create(
        &self,
        conversation_id: &str,
        base_query: &str,
    ) -> std::result::Result<Context, ContextError> {
        let mut contexts = self.write();
        if contexts.contains_key(conversation_id) {
            return Err(ContextError::AlreadyExists(conversation_id.to_string()));
        }
        let context = Context::new(conversation_id, base_query, &self.defaults);
        contexts.insert(conversation_id.to_string(), context.clone());
        info!(conversation = conversation_id, context = %context.id, "Created report context");
        Ok(context)
    }

    pub fn get(&self, conversation_id: &str) -> Option<Context> {
        self.read().get(conversation_id).cloned()
    }

    pub fn contains(&self, conversation_id: &str) -> bool {
        self.read().contains_key(conversation_id)
    }

    /// Apply the first report to an unclassified context.
    ///
    /// The version stays at 1. Returns `None` if the context is missing or
    /// already initialized.
    pub fn initialize(
        &self,
        conversation_id: &str,
        enhancement: Enhancement,
        patch: StatePatch,
    ) -> Option<Context> {
        let mut contexts = self.write();
        let context = contexts.get_mut(conversation_id)?;
        if context.is_initialized() {
            debug!(conversation = conversation_id, "Context already initialized");
            return None;
        }
        self.apply(context, enhancement, patch);
        Some(context.clone())
    }

    /// Merge cache entries without touching the version.
    pub fn prime_cache(&self, conversation_id: &str, fill: CacheFill) -> bool {
        if fill.is_empty() {
            return self.contains(conversation_id);
        }
        let mut contexts = self.write();
        let Some(context) = contexts.get_mut(conversation_id) else {
            return false;
        };
        context.data_cache.merge(fill);
        true
    }

    /// Apply a patch, log the enhancement and bump the version.
    ///
    /// Returns `None` for an unknown conversation.
    pub fn update(
        &self,
        conversation_id: &str,
        enhancement: Enhancement,
        patch: StatePatch,
    ) -> Option<Context> {
        let mut contexts = self.write();
        let context = contexts.get_mut(conversation_id)?;
        context.metadata.version += 1;
        self.apply(context, enhancement, patch);
        Some(context.clone())
    }

    fn apply(&self, context: &mut Context, enhancement: Enhancement, patch: StatePatch) {
        let patch_name = patch.name();
        patch.apply(&mut context.state);
        context.metadata.total_tokens_consumed += enhancement.estimated_token_cost;
        context.metadata.last_update = Utc::now();
        context.enhancements.push(enhancement);

        let outcome = self.compress(context);
        debug!(
            conversation = %context.conversation_id,
            version = context.metadata.version,
            patch = patch_name,
            ?outcome,
            "Applied state patch"
        );
    }

    /// Compact a context that has outgrown the size ceiling: keep the most
    /// recent enhancements and drop cached prices for symbols no longer in
    /// the report.
    pub fn compress(&self, context: &mut Context) -> CompressionOutcome {
        if context.serialized_size() <= self.config.size_ceiling {
            return CompressionOutcome::Noop;
        }

        let keep = self.config.retention;
        let enhancements_dropped = context.enhancements.len().saturating_sub(keep);
        context.enhancements.drain(..enhancements_dropped);

        let assets = &context.state.assets;
        let before = context.data_cache.prices.len();
        context
            .data_cache
            .prices
            .retain(|symbol, _| assets.contains(symbol));
        let prices_dropped = before - context.data_cache.prices.len();

        context.metadata.compressed = true;
        info!(
            conversation = %context.conversation_id,
            enhancements_dropped,
            prices_dropped,
            "Compacted report context"
        );
        CompressionOutcome::Compacted {
            enhancements_dropped,
            prices_dropped,
        }
    }

    pub fn record_document_size(&self, conversation_id: &str, size: usize) -> bool {
        let mut contexts = self.write();
        match contexts.get_mut(conversation_id) {
            Some(context) => {
                context.metadata.document_size = size;
                true
            }
            None => false,
        }
    }

    // ── Eviction ──────────────────────────────────────────────────────────

    /// Remove contexts idle for longer than `max_age`. Returns removed ids.
    pub fn evict(&self, max_age: Duration) -> Vec<String> {
        self.evict_with(max_age, |_| true)
    }

    /// Like [`evict`](Self::evict), but `may_evict` is asked about each idle
    /// id right before removal and can veto it.
    pub fn evict_with<F>(&self, max_age: Duration, may_evict: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        let cutoff = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age));
        match cutoff {
            Some(cutoff) => self.evict_idle_since_with(cutoff, may_evict),
            None => Vec::new(),
        }
    }

    /// Remove contexts whose last update is before `cutoff`.
    pub fn evict_idle_since(&self, cutoff: DateTime<Utc>) -> Vec<String> {
        self.evict_idle_since_with(cutoff, |_| true)
    }

    fn evict_idle_since_with<F>(&self, cutoff: DateTime<Utc>, mut may_evict: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        let candidates = self.idle_candidates(cutoff);
        let evicted: Vec<String> = candidates
            .into_iter()
            .filter(|id| may_evict(id.as_str()) && self.remove_if_idle(id, cutoff))
            .collect();
        if !evicted.is_empty() {
            info!(count = evicted.len(), "Evicted idle report contexts");
        }
        evicted
    }

    fn idle_candidates(&self, cutoff: DateTime<Utc>) -> Vec<String> {
        self.read()
            .iter()
            .filter(|(_, ctx)| ctx.metadata.last_update < cutoff)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Re-check idleness under the write lock before removing.
    fn remove_if_idle(&self, conversation_id: &str, cutoff: DateTime<Utc>) -> bool {
        let mut contexts = self.write();
        let still_idle = contexts
            .get(conversation_id)
            .is_some_and(|ctx| ctx.metadata.last_update < cutoff);
        if still_idle {
            contexts.remove(conversation_id);
        }
        still_idle
    }

    pub fn remove(&self, conversation_id: &str) -> Option<Context> {
        self.write().remove(conversation_id)
    }

    // ── Export / import ───────────────────────────────────────────────────

    pub fn export(&self, conversation_id: &str) -> Result<String> {
        let context = self
            .get(conversation_id)
            .ok_or_else(|| ContextError::NotFound(conversation_id.to_string()))?;
        Ok(serde_json::to_string(&context)?)
    }

    /// Install a serialized context, replacing any context for the same
    /// conversation.
    pub fn import(&self, serialized: &str) -> Result<Context> {
        let context: Context = serde_json::from_str(serialized)
            .map_err(|e| ContextError::Import(e.to_string()))?;
        if context.conversation_id.trim().is_empty() {
            return Err(ContextError::Import("conversationId is empty".into()).into());
        }
        if context.metadata.version == 0 {
            return Err(ContextError::Import("version must be at least 1".into()).into());
        }

        let replaced = self
            .write()
            .insert(context.conversation_id.clone(), context.clone())
            .is_some();
        info!(
            conversation = %context.conversation_id,
            version = context.metadata.version,
            replaced,
            "Imported report context"
        );
        Ok(context)
    }

    // ── Introspection ─────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Conversation ids, sorted.
    pub fn conversation_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
