//! # Folio Core
//!
//! Domain types and error definitions for the Folio report engine.
//! This crate has **zero framework dependencies** — it defines the domain
//! model that the engine, gateway and CLI crates build on.
//!
//! ## Model
//!
//! - [`Context`] — per-conversation report state plus enhancement history
//! - [`Section`] / [`SectionOperation`] — addressable document fragments and
//!   the transient instructions that change them
//! - [`StatePatch`] — one named variant per kind of state change
//! - [`ReferenceData`] — read-only instrument metrics the sections are built from

pub mod assets;
pub mod context;
pub mod error;
pub mod intent;
pub mod patch;
pub mod reference;
pub mod section;

// Re-export key types at crate root for ergonomics
pub use assets::AssetList;
pub use context::{
    CacheFill, Context, ContextMetadata, DataCache, Enhancement, ReportState, StateDefaults,
};
pub use error::{BlockError, ContextError, Error, Result};
pub use intent::{EnhancementKind, Intent, ReportType};
pub use patch::StatePatch;
pub use reference::{Instrument, ReferenceData, StaticReferenceData};
pub use section::{Section, SectionAction, SectionKind, SectionOperation};
