//! Language model interface and the list of models used for decoding.
//!
//! Scores are log10 probabilities. A phrase is scored word by word with
//! whatever left context the phrase itself provides; words that see fewer
//! than `order - 1` words of history are only *estimated* and get rescored
//! once the hypothesis is embedded in a larger one.

pub mod backoff;

pub use backoff::{ArpaError, BackoffModel};

use crate::features::{FeatureId, FeatureRegistry, FeatureScoreVector};
use crate::vocab::WordId;

/// Score of a phrase under one language model.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PhraseScore {
    /// Sum over every word of the phrase.
    pub full: f64,
    /// Sum over the words with a full `order - 1` word history.
    pub ngram: f64,
}

impl PhraseScore {
    /// The part of `full` contributed by words lacking full history.
    pub fn estimate(&self) -> f64 {
        self.full - self.ngram
    }
}

/// An n-gram language model.
pub trait LanguageModel: Send + Sync {
    /// The n-gram order.
    fn order(&self) -> usize;

    /// Log10 probability of `word` given `context` (most recent word last).
    ///
    /// `context` never holds more than `order - 1` words.
    fn log_prob(&self, context: &[WordId], word: WordId) -> f64;

    /// Score every word of `phrase` using the history inside the phrase.
    fn score_phrase(&self, phrase: &[WordId]) -> PhraseScore {
        self.score_split(phrase, self.order().saturating_sub(1))
    }

    /// Like [`LanguageModel::score_phrase`], but only the words from
    /// index `boundary` on count towards `ngram`.
    ///
    /// A set of models of mixed order splits every phrase at the same
    /// boundary, so a word is never counted twice by a lower-order model.
    fn score_split(&self, phrase: &[WordId], boundary: usize) -> PhraseScore {
        let history = self.order().saturating_sub(1);
        let mut score = PhraseScore::default();
        for (i, &word) in phrase.iter().enumerate() {
            let context = &phrase[i.saturating_sub(history)..i];
            let p = self.log_prob(context, word);
            score.full += p;
            if i >= boundary {
                score.ngram += p;
            }
        }
        score
    }
}

struct RegisteredModel {
    model: Box<dyn LanguageModel>,
    feature: FeatureId,
    estimate_feature: FeatureId,
}

/// The set of language models used by a translation system.
///
/// Each model owns two features: the real score over fully contexted
/// n-grams, and `<name>_estimate` for the provisional prefix score.
#[derive(Default)]
pub struct LanguageModelSet {
    models: Vec<RegisteredModel>,
}

impl LanguageModelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model under `name` with the given feature weight.
    ///
    /// The estimate feature shares the weight so that the total score of
    /// a hypothesis counts every word exactly once.
    pub fn add(
        &mut self,
        registry: &mut FeatureRegistry,
        name: &str,
        weight: f64,
        model: Box<dyn LanguageModel>,
    ) -> FeatureId {
        let feature = registry.register(name, weight);
        let estimate_feature = registry.register(&format!("{}_estimate", name), weight);
        self.models.push(RegisteredModel {
            model,
            feature,
            estimate_feature,
        });
        feature
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Highest order over all models; 1 when there are none.
    pub fn max_order(&self) -> usize {
        self.models
            .iter()
            .map(|m| m.model.order())
            .max()
            .unwrap_or(1)
            .max(1)
    }

    /// Real and estimate feature of every model.
    pub fn lm_feature_ids(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.models
            .iter()
            .flat_map(|m| [m.feature, m.estimate_feature])
    }

    /// Score `phrase` with every model.
    ///
    /// Fully contexted scores are added into `ngram`. If `estimate` is
    /// given, the prefix-only part is assigned to it (overwriting).
    pub fn calc_scores(
        &self,
        phrase: &[WordId],
        ngram: &mut FeatureScoreVector,
        mut estimate: Option<&mut FeatureScoreVector>,
    ) {
        let boundary = self.max_order() - 1;
        for m in &self.models {
            let score = m.model.score_split(phrase, boundary);
            if let Some(est) = estimate.as_deref_mut() {
                est.assign(m.estimate_feature, score.estimate());
            }
            ngram.add_score(m.feature, score.ngram);
        }
    }

    /// Reset every LM feature of `scores` to zero.
    pub fn zero_all(&self, scores: &mut FeatureScoreVector) {
        scores.zero(self.lm_feature_ids());
    }

    /// Add the LM features of `source` into `target`.
    pub fn plus_equals_all(&self, target: &mut FeatureScoreVector, source: &FeatureScoreVector) {
        for id in self.lm_feature_ids() {
            let s = source.get(id);
            if s != 0.0 {
                target.add_score(id, s);
            }
        }
    }

    /// Score a complete string end to end, with the same estimate/real
    /// split the incremental scorer produces.
    pub fn score_sentence(&self, words: &[WordId]) -> FeatureScoreVector {
        let mut ngram = FeatureScoreVector::new();
        let mut estimate = FeatureScoreVector::new();
        self.calc_scores(words, &mut ngram, Some(&mut estimate));
        ngram += &estimate;
        ngram
    }
}

impl std::fmt::Debug for LanguageModelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageModelSet")
            .field("len", &self.models.len())
            .field("max_order", &self.max_order())
            .finish()
    }
}
