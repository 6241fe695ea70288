//! Incremental scoring of hypotheses.
//!
//! A node's language model score is built from its children's without
//! materializing their yields: n-grams fully inside a child that is at
//! least `order - 1` words long were already scored and are reused, and
//! only n-grams crossing a child boundary are scored here. The words in a
//! node's boundary prefix still lack left context and are kept under the
//! estimate features until an enclosing node scores them for real.

use crate::context::DecodeContext;
use crate::derivation::NodeRef;
use crate::features::FeatureScoreVector;
use crate::rule::TargetSymbol;
use crate::vocab::WordId;

/// Scratch state threaded through one LM walk.
struct LmWalk {
    phrase: Vec<WordId>,
    estimate: FeatureScoreVector,
    ngram: FeatureScoreVector,
    estimated: bool,
}

impl LmWalk {
    fn new() -> Self {
        LmWalk {
            phrase: Vec::new(),
            estimate: FeatureScoreVector::new(),
            ngram: FeatureScoreVector::new(),
            estimated: false,
        }
    }
}

impl DecodeContext<'_> {
    /// Score `node`: children's vectors, the rule's own features, and the
    /// incremental LM score, reduced to a total with the feature weights.
    ///
    /// Every child must already be scored and the node must not be.
    pub fn compute_score(&mut self, node: NodeRef) {
        let (scores, estimate, ngram) = {
            let n = &self.nodes[node];
            assert!(
                !n.scored && n.lm_ngram.is_zero() && n.lm_estimate.is_zero(),
                "LM accumulator of hypothesis {} is not zero at scoring entry",
                n.id
            );

            let mut scores = FeatureScoreVector::new();
            for &child in &n.children {
                let child = &self.nodes[child];
                assert!(child.scored, "child {} of {} is not scored", child.id, n.id);
                scores += &child.scores;
            }
            scores += n.rule.target().scores();

            let (estimate, ngram) = self.compute_lm_score(node);
            let lms = &self.system.lms;
            lms.zero_all(&mut scores);
            lms.plus_equals_all(&mut scores, &estimate);
            lms.plus_equals_all(&mut scores, &ngram);
            (scores, estimate, ngram)
        };

        let total = scores.weighted_score(&self.system.features);
        let n = &mut self.nodes[node];
        n.scores = scores;
        n.lm_estimate = estimate;
        n.lm_ngram = ngram;
        n.total_score = total;
        n.scored = true;
        self.stats.scored += 1;

        tracing::trace!(id = n.id.as_u32(), total, "scored hypothesis");
    }

    /// The estimate and fully contexted LM scores of `node`.
    fn compute_lm_score(&self, node: NodeRef) -> (FeatureScoreVector, FeatureScoreVector) {
        let n = &self.nodes[node];
        let history = self.system.boundary_size();
        let mut walk = LmWalk::new();

        for (pos, symbol) in n.rule.target().symbols().iter().enumerate() {
            match *symbol {
                TargetSymbol::Word(word) => walk.phrase.push(word),
                TargetSymbol::NonTerminal(_) => {
                    let child = &self.nodes[n.children[n.rule.child_slot(pos)]];
                    if child.terminal_count < history {
                        walk.phrase.extend_from_slice(child.prefix.words());
                    } else if pos == 0 {
                        // Same prefix as the child, so the same estimate.
                        walk.estimate = child.lm_estimate.clone();
                        walk.ngram = child.lm_ngram.clone();
                        walk.estimated = true;
                        walk.phrase.extend_from_slice(child.suffix.words());
                    } else {
                        walk.ngram += &child.lm_ngram;
                        walk.phrase.extend_from_slice(child.prefix.words());
                        self.flush(&mut walk);
                        walk.phrase.clear();
                        walk.phrase.extend_from_slice(child.suffix.words());
                    }
                }
            }
        }
        self.flush(&mut walk);

        (walk.estimate, walk.ngram)
    }

    fn flush(&self, walk: &mut LmWalk) {
        let lms = &self.system.lms;
        if walk.estimated {
            lms.calc_scores(&walk.phrase, &mut walk.ngram, None);
        } else {
            lms.calc_scores(&walk.phrase, &mut walk.ngram, Some(&mut walk.estimate));
            walk.estimated = true;
        }
    }
}
