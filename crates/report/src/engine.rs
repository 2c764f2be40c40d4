//! The report engine — one prompt in, one updated document out.
//!
//! ```text
//! prompt ─► classify ─► synthesize ─► prime cache ─► initialize / update ─► assemble
//! ```
//!
//! The engine holds no per-conversation locks. Callers that may issue
//! concurrent requests for one conversation serialize them (the gateway
//! keeps a lock per conversation); the store itself stays consistent either
//! way.

use std::sync::Arc;

use folio_config::{AppConfig, ReportConfig};
use folio_core::{
    Context, ContextError, Enhancement, Intent, ReferenceData, Result, SectionOperation,
    StaticReferenceData,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::assembler::{DocumentAssembler, strip_live_regions};
use crate::classifier::{IntentClassifier, extract_timeframe};
use crate::prompt::{build_prompt, parse_enhancement_blocks};
use crate::store::ContextStore;
use crate::synthesizer::{SectionSynthesizer, Synthesis, SynthesisInput};
use crate::token::{estimate_enhancement_cost, estimate_tokens};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceRequest {
    pub conversation_id: String,
    pub prompt: String,
    /// The document the caller currently shows; compared against the stored
    /// render for drift diagnostics only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_document: Option<String>,
    /// Visible position for newly added sections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_at: Option<usize>,
}

impl EnhanceRequest {
    pub fn new(conversation_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            prompt: prompt.into(),
            current_document: None,
            insert_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceResponse {
    pub document: String,
    pub context: Context,
    pub estimated_tokens: usize,
    pub operations: Vec<SectionOperation>,
}

/// Outcome of applying externally generated output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedOutcome {
    #[serde(flatten)]
    pub response: EnhanceResponse,
    pub skipped_blocks: usize,
}

pub struct ReportEngine {
    store: Arc<ContextStore>,
    classifier: IntentClassifier,
    synthesizer: SectionSynthesizer,
    assembler: DocumentAssembler,
}

impl ReportEngine {
    pub fn new(
        store: Arc<ContextStore>,
        reference: Arc<dyn ReferenceData>,
        report: &ReportConfig,
    ) -> Self {
        Self {
            store,
            classifier: IntentClassifier::new(reference.as_ref(), report.default_symbol.clone()),
            synthesizer: SectionSynthesizer::new(reference),
            assembler: DocumentAssembler::new(),
        }
    }

    /// Engine over the bundled reference snapshot.
    pub fn from_config(config: &AppConfig) -> Self {
        let store = Arc::new(ContextStore::new(
            config.store.clone(),
            config.report.state_defaults(),
        ));
        Self::new(
            store,
            Arc::new(StaticReferenceData::builtin()),
            &config.report,
        )
    }

    pub fn store(&self) -> &Arc<ContextStore> {
        &self.store
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    /// Get the conversation's context, creating it on first use.
    fn context_for(&self, conversation_id: &str, prompt: &str) -> Result<Context> {
        if let Some(context) = self.store.get(conversation_id) {
            return Ok(context);
        }
        match self.store.create(conversation_id, prompt) {
            Ok(context) => Ok(context),
            // Lost a creation race; use the winner's context.
            Err(ContextError::AlreadyExists(_)) => self
                .store
                .get(conversation_id)
                .ok_or_else(|| ContextError::NotFound(conversation_id.to_string()).into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Classify the prompt, synthesize the change, persist it and render.
    pub fn enhance(&self, request: EnhanceRequest) -> Result<EnhanceResponse> {
        let EnhanceRequest {
            conversation_id,
            prompt,
            current_document,
            insert_at,
        } = request;

        let context = self.context_for(&conversation_id, &prompt)?;
        let has_existing = context.is_initialized();

        if let Some(shown) = current_document.as_deref() {
            self.check_drift(&context, shown);
        }

        let classification = self.classifier.analyze(&prompt, has_existing);
        let seq = if has_existing {
            context.metadata.version + 1
        } else {
            context.metadata.version
        };

        let input = SynthesisInput {
            prompt: &prompt,
            intent: classification.intent,
            assets: classification.assets,
            timeframe: extract_timeframe(&prompt),
            seq,
            insert_at,
        };
        let synthesis = self.synthesizer.synthesize(&context, &input);

        info!(
            conversation = %conversation_id,
            intent = %classification.intent,
            operations = synthesis.operations.len(),
            "Enhancing report"
        );

        let operations = synthesis.operations.clone();
        let updated = self.persist(&conversation_id, &prompt, seq, synthesis, has_existing)?;
        Ok(self.respond(&conversation_id, updated, operations))
    }

    /// Apply externally generated output for a conversation.
    ///
    /// Blocks that fail to parse are skipped and counted. With no usable
    /// operations the current document is returned unchanged.
    pub fn apply_generated(
        &self,
        conversation_id: &str,
        prompt: &str,
        output: &str,
    ) -> Result<GeneratedOutcome> {
        let context = self
            .store
            .get(conversation_id)
            .ok_or_else(|| ContextError::NotFound(conversation_id.to_string()))?;

        let extraction = parse_enhancement_blocks(output);
        let seq = context.metadata.version + 1;
        let synthesis = self
            .synthesizer
            .merge_operations(&context, extraction.operations, seq);

        if synthesis.operations.is_empty() {
            debug!(
                conversation = conversation_id,
                skipped = extraction.skipped,
                "Generated output carried no applicable operations"
            );
            return Ok(GeneratedOutcome {
                response: self.respond(conversation_id, context, Vec::new()),
                skipped_blocks: extraction.skipped,
            });
        }

        info!(
            conversation = conversation_id,
            operations = synthesis.operations.len(),
            skipped = extraction.skipped,
            "Applying generated enhancement"
        );
        let operations = synthesis.operations.clone();
        let updated = self.persist(conversation_id, prompt, seq, synthesis, true)?;
        Ok(GeneratedOutcome {
            response: self.respond(conversation_id, updated, operations),
            skipped_blocks: extraction.skipped,
        })
    }

    /// Prompt for an external generator, built from the stored context.
    pub fn build_prompt(&self, conversation_id: &str, new_prompt: &str) -> Result<String> {
        let context = self
            .store
            .get(conversation_id)
            .ok_or_else(|| ContextError::NotFound(conversation_id.to_string()))?;
        Ok(build_prompt(&context, new_prompt))
    }

    /// Render the stored document without changing anything.
    pub fn render(&self, conversation_id: &str) -> Result<String> {
        let context = self
            .store
            .get(conversation_id)
            .ok_or_else(|| ContextError::NotFound(conversation_id.to_string()))?;
        Ok(self.assembler.assemble(&context, &[]))
    }

    fn persist(
        &self,
        conversation_id: &str,
        prompt: &str,
        seq: u64,
        synthesis: Synthesis,
        has_existing: bool,
    ) -> Result<Context> {
        let enhancement = Enhancement::new(format!("enh-{seq}"), prompt)
            .with_token_cost(estimate_enhancement_cost(prompt, &synthesis.operations))
            .touching(synthesis.touched_section_ids())
            .with_changes(synthesis.changes);

        self.store.prime_cache(conversation_id, synthesis.cache);
        let updated = if has_existing {
            self.store.update(conversation_id, enhancement, synthesis.patch)
        } else {
            self.store
                .initialize(conversation_id, enhancement, synthesis.patch)
        };
        updated.ok_or_else(|| ContextError::NotFound(conversation_id.to_string()).into())
    }

    fn respond(
        &self,
        conversation_id: &str,
        mut context: Context,
        operations: Vec<SectionOperation>,
    ) -> EnhanceResponse {
        let document = self.assembler.assemble(&context, &operations);
        self.store.record_document_size(conversation_id, document.len());
        context.metadata.document_size = document.len();
        EnhanceResponse {
            estimated_tokens: estimate_tokens(&document),
            document,
            context,
            operations,
        }
    }

    fn check_drift(&self, context: &Context, shown: &str) {
        if !context.is_initialized() {
            return;
        }
        let stored = self.assembler.assemble(context, &[]);
        if strip_live_regions(&stored) != strip_live_regions(shown) {
            debug!(
                conversation = %context.conversation_id,
                version = context.metadata.version,
                "Caller's document differs from the stored render"
            );
        }
    }

    /// The classification a prompt would receive right now.
    pub fn preview_intent(&self, conversation_id: &str, prompt: &str) -> Intent {
        let has_existing = self
            .store
            .get(conversation_id)
            .is_some_and(|c| c.is_initialized());
        self.classifier.classify(prompt, has_existing)
    }
}
