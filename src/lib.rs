//! hiero-chart: the hypothesis core of a hierarchical phrase-based chart
//! decoder.
//!
//! This crate provides:
//! - Derivation nodes built from rule applications over source spans
//! - Bounded boundary phrases used as n-gram context
//! - Incremental language model scoring with an estimate/real split
//! - Recombination of equivalent hypotheses and n-best arc pruning
//! - Per-sentence decoding contexts over a generational arena
//! - Katz back-off language models read from ARPA files
//!
//! The outer search (span enumeration, cube pruning, n-best extraction)
//! drives these operations; it lives outside this crate.

pub mod arena;
pub mod cell;
pub mod config;
pub mod context;
pub mod derivation;
pub mod features;
pub mod lm;
pub mod phrase;
pub mod recombine;
pub mod rule;
pub mod scoring;
pub mod vocab;

#[cfg(test)]
mod test_utils;

// Re-exports for convenience
pub use arena::{AllocPolicy, Arena, ArenaStats, Key};
pub use cell::{CellInsert, Chart, ChartCell};
pub use config::{ConfigError, DecoderConfig, DecoderConfigBuilder};
pub use context::{DecodeContext, DecodeStats, TranslationSystem};
pub use derivation::{DerivationError, DerivationNode, NodeDisplay, NodeId, NodeRef};
pub use features::{FeatureId, FeatureRegistry, FeatureScoreVector};
pub use lm::{ArpaError, BackoffModel, LanguageModel, LanguageModelSet, PhraseScore};
pub use phrase::BoundaryPhrase;
pub use rule::{RuleApplication, RuleParseError, SourceSpan, TargetPhrase, TargetSymbol};
pub use vocab::{Vocab, WordId};
