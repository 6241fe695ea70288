//! Feature identifiers, weights, and sparse feature score vectors.
//!
//! A hypothesis carries a `FeatureScoreVector` that is summed bottom-up
//! through the derivation. The scalar score used for ranking is the dot
//! product of that vector with the fixed weights held by a
//! `FeatureRegistry`.

use rustc_hash::FxHashMap;
use std::fmt;
use std::ops::{Add, AddAssign};

/// Dense identifier of a registered feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(u32);

impl FeatureId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Registry of named features and their (fixed) weights.
#[derive(Debug, Default, Clone)]
pub struct FeatureRegistry {
    names: Vec<Box<str>>,
    weights: Vec<f64>,
    by_name: FxHashMap<Box<str>, FeatureId>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feature, or update the weight of an existing one.
    pub fn register(&mut self, name: &str, weight: f64) -> FeatureId {
        if let Some(&id) = self.by_name.get(name) {
            self.weights[id.index()] = weight;
            return id;
        }

        let id = FeatureId(self.names.len() as u32);
        self.names.push(name.into());
        self.weights.push(weight);
        self.by_name.insert(name.into(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<FeatureId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: FeatureId) -> &str {
        &self.names[id.index()]
    }

    pub fn weight(&self, id: FeatureId) -> f64 {
        self.weights[id.index()]
    }

    pub fn set_weight(&mut self, id: FeatureId, weight: f64) {
        self.weights[id.index()] = weight;
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Sparse mapping from feature to (unweighted) score.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureScoreVector {
    scores: FxHashMap<FeatureId, f64>,
}

impl FeatureScoreVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a vector from `(feature, score)` pairs, summing duplicates.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (FeatureId, f64)>) -> Self {
        let mut v = Self::new();
        for (id, score) in pairs {
            v.add_score(id, score);
        }
        v
    }

    /// Score for a feature; absent features score zero.
    pub fn get(&self, id: FeatureId) -> f64 {
        self.scores.get(&id).copied().unwrap_or(0.0)
    }

    /// Overwrite the score of one feature.
    pub fn assign(&mut self, id: FeatureId, score: f64) {
        self.scores.insert(id, score);
    }

    /// Add to the score of one feature.
    pub fn add_score(&mut self, id: FeatureId, score: f64) {
        *self.scores.entry(id).or_insert(0.0) += score;
    }

    /// Component-wise addition.
    pub fn plus_equals(&mut self, other: &FeatureScoreVector) {
        for (&id, &score) in &other.scores {
            self.add_score(id, score);
        }
    }

    /// Reset the given features to zero.
    pub fn zero(&mut self, ids: impl IntoIterator<Item = FeatureId>) {
        for id in ids {
            self.scores.remove(&id);
        }
    }

    /// True if every component is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.scores.values().all(|&s| s == 0.0)
    }

    pub fn clear(&mut self) {
        self.scores.clear();
    }

    /// Dot product with the registry's weights.
    pub fn weighted_score(&self, registry: &FeatureRegistry) -> f64 {
        self.iter_sorted()
            .map(|(id, score)| score * registry.weight(id))
            .sum()
    }

    /// Components in ascending feature order.
    pub fn iter_sorted(&self) -> impl Iterator<Item = (FeatureId, f64)> {
        let mut pairs: Vec<(FeatureId, f64)> = self.scores.iter().map(|(&id, &s)| (id, s)).collect();
        pairs.sort_by_key(|&(id, _)| id);
        pairs.into_iter()
    }

    /// Number of stored components.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Render as `name=value` pairs in registration order.
    pub fn display<'a>(&'a self, registry: &'a FeatureRegistry) -> ScoreDisplay<'a> {
        ScoreDisplay {
            scores: self,
            registry,
        }
    }
}

impl AddAssign<&FeatureScoreVector> for FeatureScoreVector {
    fn add_assign(&mut self, other: &FeatureScoreVector) {
        self.plus_equals(other);
    }
}

impl Add for FeatureScoreVector {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self.plus_equals(&other);
        self
    }
}

/// Display adapter returned by [`FeatureScoreVector::display`].
pub struct ScoreDisplay<'a> {
    scores: &'a FeatureScoreVector,
    registry: &'a FeatureRegistry,
}

impl fmt::Display for ScoreDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<<")?;
        for (i, (id, score)) in self.scores.iter_sorted().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", self.registry.name(id), score)?;
        }
        write!(f, ">>")
    }
}
