//! # Folio Report
//!
//! The incremental report engine. A conversation's first prompt produces a
//! full report; every later prompt is classified into an enhancement that
//! adds, refreshes or hides individual sections, so the document is never
//! regenerated from scratch.
//!
//! - [`classifier`] — prompt → [`Intent`](folio_core::Intent), assets, timeframe
//! - [`synthesizer`] — intent → section operations + typed state patch
//! - [`store`] — per-conversation contexts with compaction and eviction
//! - [`assembler`] — context + operations → HTML document
//! - [`prompt`] — prompts for external generation and parsing of the reply
//! - [`engine`] — the orchestration of all of the above

pub mod assembler;
pub mod classifier;
pub mod engine;
pub mod prompt;
pub mod store;
pub mod synthesizer;
pub mod token;

pub use assembler::{DocumentAssembler, strip_live_regions};
pub use classifier::{Classification, IntentClassifier, classify, extract_timeframe};
pub use engine::{EnhanceRequest, EnhanceResponse, GeneratedOutcome, ReportEngine};
pub use prompt::{BlockExtraction, build_prompt, parse_enhancement_blocks};
pub use store::{CompressionOutcome, ContextStore};
pub use synthesizer::{SectionSynthesizer, Synthesis, SynthesisInput};
pub use token::estimate_tokens;
