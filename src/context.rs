//! Shared models and the per-sentence decoding context.
//!
//! A `TranslationSystem` holds everything that is read-only while decoding
//! (vocabulary, feature weights, language models) and can be shared by
//! reference between threads. A `DecodeContext` is created per sentence
//! and owns that sentence's hypotheses, its id counter, and statistics;
//! dropping it releases every hypothesis at once.

use crate::arena::Arena;
use crate::config::DecoderConfig;
use crate::derivation::{DerivationNode, NodeRef};
use crate::features::FeatureRegistry;
use crate::lm::LanguageModelSet;
use crate::vocab::Vocab;

/// Read-only models used to decode.
#[derive(Debug, Default)]
pub struct TranslationSystem {
    pub vocab: Vocab,
    pub features: FeatureRegistry,
    pub lms: LanguageModelSet,
}

impl TranslationSystem {
    pub fn new(vocab: Vocab, features: FeatureRegistry, lms: LanguageModelSet) -> Self {
        TranslationSystem {
            vocab,
            features,
            lms,
        }
    }

    /// Capacity of every boundary phrase.
    pub fn boundary_size(&self) -> usize {
        self.lms.max_order() - 1
    }
}

/// Counters for one sentence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub created: usize,
    pub scored: usize,
    pub recombined: usize,
    pub arcs_pruned: usize,
    pub released: usize,
}

/// Per-sentence decoding state.
pub struct DecodeContext<'a> {
    pub(crate) system: &'a TranslationSystem,
    pub(crate) config: &'a DecoderConfig,
    pub(crate) source_len: usize,
    pub(crate) nodes: Arena<DerivationNode>,
    pub(crate) next_id: u32,
    pub(crate) stats: DecodeStats,
}

impl<'a> DecodeContext<'a> {
    /// Start decoding a sentence of `source_len` words.
    pub fn new(system: &'a TranslationSystem, config: &'a DecoderConfig, source_len: usize) -> Self {
        DecodeContext {
            system,
            config,
            source_len,
            nodes: Arena::new(config.hypothesis_pool),
            next_id: 0,
            stats: DecodeStats::default(),
        }
    }

    pub fn system(&self) -> &'a TranslationSystem {
        self.system
    }

    pub fn config(&self) -> &'a DecoderConfig {
        self.config
    }

    pub fn source_len(&self) -> usize {
        self.source_len
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// Number of hypotheses currently alive.
    pub fn live_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// True if `node` has not been released.
    pub fn contains(&self, node: NodeRef) -> bool {
        self.nodes.contains(node)
    }

    /// Borrow a hypothesis. Panics on a released handle.
    pub fn node(&self, node: NodeRef) -> &DerivationNode {
        &self.nodes[node]
    }

    /// Finish the sentence, releasing every hypothesis.
    pub fn finish(self) -> DecodeStats {
        self.stats
    }
}

impl Drop for DecodeContext<'_> {
    fn drop(&mut self) {
        let arena = self.nodes.stats();
        tracing::debug!(
            created = self.stats.created,
            scored = self.stats.scored,
            recombined = self.stats.recombined,
            arcs_pruned = self.stats.arcs_pruned,
            released = self.stats.released,
            live = arena.live,
            slots = arena.slots,
            recycled = arena.recycled,
            "sentence finished"
        );
    }
}

impl std::fmt::Debug for DecodeContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeContext")
            .field("source_len", &self.source_len)
            .field("live_nodes", &self.nodes.len())
            .field("stats", &self.stats)
            .finish()
    }
}
