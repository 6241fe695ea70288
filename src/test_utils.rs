//! Shared fixtures for unit tests.

use crate::context::{DecodeContext, TranslationSystem};
use crate::derivation::NodeRef;
use crate::features::{FeatureId, FeatureRegistry, FeatureScoreVector};
use crate::lm::{BackoffModel, LanguageModelSet};
use crate::rule::{RuleApplication, SourceSpan};
use crate::vocab::{Vocab, WordId};
use std::sync::Arc;

const WORDS: &str = "the black cat sat on a mat dog big red .";

pub(crate) struct Fixture {
    pub system: TranslationSystem,
    pub tm: FeatureId,
    pub word_penalty: FeatureId,
    /// Real and estimate feature of the first model.
    pub lm: FeatureId,
    pub lm_estimate: FeatureId,
}

impl Fixture {
    /// A rule over `span` scoring `tm` plus a word penalty of one per
    /// target word. Every word must already be in the fixture vocabulary.
    pub fn rule(&self, text: &str, span: SourceSpan, tm: f64) -> Arc<RuleApplication> {
        let mut vocab = self.system.vocab.clone();
        let terminals = text
            .split_whitespace()
            .filter(|w| !w.starts_with('['))
            .count();
        let scores =
            FeatureScoreVector::from_pairs([(self.tm, tm), (self.word_penalty, -(terminals as f64))]);
        let rule = RuleApplication::parse(&mut vocab, text, scores, span).unwrap();
        assert_eq!(vocab.len(), self.system.vocab.len(), "unknown word in {:?}", text);
        Arc::new(rule)
    }
}

/// One back-off model of the given order, or none for order 0.
pub(crate) fn fixture(order: usize) -> Fixture {
    if order == 0 {
        fixture_with_orders(&[])
    } else {
        fixture_with_orders(&[order])
    }
}

/// One back-off model per entry of `orders`, named `lm`, `lm2`, ...
pub(crate) fn fixture_with_orders(orders: &[usize]) -> Fixture {
    let mut vocab = Vocab::new();
    let words = vocab.intern_all(WORDS);
    vocab.intern("X");

    let mut features = FeatureRegistry::new();
    let tm = features.register("tm", 1.0);
    let word_penalty = features.register("word_penalty", 1.0);

    let mut lms = LanguageModelSet::new();
    for (i, &order) in orders.iter().enumerate() {
        let name = if i == 0 { "lm".to_string() } else { format!("lm{}", i + 1) };
        lms.add(&mut features, &name, 1.0, Box::new(synthetic_model(order, &words)));
    }
    let lm = features.register("lm", 1.0);
    let lm_estimate = features.register("lm_estimate", 1.0);

    Fixture {
        system: TranslationSystem::new(vocab, features, lms),
        tm,
        word_penalty,
        lm,
        lm_estimate,
    }
}

/// A model with every unigram and a deterministic scatter of higher
/// order n-grams, so that lookups mix hits and back-offs.
fn synthetic_model(order: usize, words: &[WordId]) -> BackoffModel {
    let mut model = BackoffModel::new(order);
    let n = words.len();

    for i in 0..n {
        model.insert(&[words[i]], -(1.0 + 0.13 * i as f64), -0.05 * (i % 4) as f64);
    }
    if order >= 2 {
        for i in 0..n {
            for j in 0..n {
                if (i * 3 + j) % 4 == 0 {
                    let p = -(0.3 + 0.07 * ((i + j) % 5) as f64);
                    let bo = -0.1 * ((i * j) % 3) as f64;
                    model.insert(&[words[i], words[j]], p, bo);
                }
            }
        }
    }
    if order >= 3 {
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    if (i + 2 * j + 3 * k) % 7 == 0 {
                        let p = -(0.2 + 0.05 * ((i + k) % 3) as f64);
                        let bo = -0.15 * ((j + k) % 2) as f64;
                        model.insert(&[words[i], words[j], words[k]], p, bo);
                    }
                }
            }
        }
    }
    if order >= 4 {
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    for l in 0..n {
                        if (i + j + k + l) % 9 == 0 && (i * l) % 2 == 0 {
                            let p = -(0.1 + 0.04 * ((j + l) % 4) as f64);
                            model.insert(&[words[i], words[j], words[k], words[l]], p, 0.0);
                        }
                    }
                }
            }
        }
    }
    model
}

pub(crate) fn words(fx: &Fixture, text: &str) -> Vec<WordId> {
    text.split_whitespace()
        .map(|w| fx.system.vocab.get(w).unwrap())
        .collect()
}

/// An unscored hypothesis without children.
pub(crate) fn leaf(ctx: &mut DecodeContext<'_>, fx: &Fixture, text: &str, span: SourceSpan) -> NodeRef {
    ctx.create_node(fx.rule(text, span, -1.0), Vec::new()).unwrap()
}

pub(crate) fn scored_leaf(
    ctx: &mut DecodeContext<'_>,
    fx: &Fixture,
    text: &str,
    span: SourceSpan,
) -> NodeRef {
    let node = leaf(ctx, fx, text, span);
    ctx.compute_score(node);
    node
}

pub(crate) fn assert_close(actual: f64, expected: f64) {
    let tolerance = 1e-9 * expected.abs().max(actual.abs()).max(1.0);
    assert!(
        (actual - expected).abs() <= tolerance,
        "{} differs from {}",
        actual,
        expected
    );
}

/// Check a scored node against its materialized output: terminal count,
/// boundary phrases, and every LM feature scored end to end.
pub(crate) fn check_node(ctx: &DecodeContext<'_>, fx: &Fixture, node: NodeRef) {
    let output = ctx.materialize_output(node);
    let n = ctx.node(node);

    let own = n.rule().target().num_terminals();
    let from_children: usize = n
        .children()
        .iter()
        .map(|&c| ctx.node(c).terminal_count())
        .sum();
    assert_eq!(n.terminal_count(), own + from_children);
    assert_eq!(n.terminal_count(), output.len());

    let k = fx.system.boundary_size().min(output.len());
    assert_eq!(n.boundary_prefix().words(), &output[..k]);
    assert_eq!(n.boundary_suffix().words(), &output[output.len() - k..]);

    let expected = fx.system.lms.score_sentence(&output);
    for id in fx.system.lms.lm_feature_ids() {
        assert_close(n.score_vector().get(id), expected.get(id));
    }
}

const LEAVES: [&str; 6] = ["", "a", "dog", "the big", "black cat sat", "on a red mat ."];

const TEMPLATES: [&str; 7] = [
    "[X,1]",
    "the [X,1]",
    "[X,1] sat",
    "[X,1] [X,2]",
    "[X,2] on [X,1]",
    "a [X,1] big [X,2] .",
    "[X,1] [X,3] red [X,2]",
];

/// Build and score nested derivations up to `max_depth` levels deep.
///
/// Every level applies each template twice; the first child always comes
/// from the previous level and the others from anything built so far.
pub(crate) fn generate_derivations(
    ctx: &mut DecodeContext<'_>,
    fx: &Fixture,
    max_depth: usize,
) -> Vec<NodeRef> {
    let span = SourceSpan::new(0, ctx.source_len());
    let mut all: Vec<NodeRef> = LEAVES
        .iter()
        .map(|text| scored_leaf(ctx, fx, text, span))
        .collect();
    let mut frontier = all.clone();

    for depth in 2..=max_depth {
        let mut next = Vec::new();
        for (t, template) in TEMPLATES.iter().enumerate() {
            for variant in 0..2 {
                let rule = fx.rule(template, span, -0.5);
                let children = (0..rule.arity())
                    .map(|slot| {
                        if slot == 0 {
                            frontier[(t + variant) % frontier.len()]
                        } else {
                            all[(t * 5 + slot * 3 + variant * 7 + depth) % all.len()]
                        }
                    })
                    .collect();
                let node = ctx.create_node(rule, children).unwrap();
                ctx.compute_score(node);
                assert_eq!(ctx.node(node).depth(), depth);
                next.push(node);
            }
        }
        all.extend_from_slice(&next);
        frontier = next;
    }
    all
}
