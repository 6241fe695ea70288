//! Benchmarks for building and scoring hypotheses.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hiero_chart::{
    BackoffModel, DecodeContext, DecoderConfig, FeatureRegistry, FeatureScoreVector, LanguageModelSet,
    RuleApplication, SourceSpan, TranslationSystem, Vocab,
};
use std::sync::Arc;

const ARPA: &str = "
\\data\\
ngram 1=8
ngram 2=6
ngram 3=3

\\1-grams:
-1.2 the -0.4
-1.9 black -0.3
-2.1 cat -0.2
-2.0 sat -0.3
-1.5 on -0.3
-1.3 a -0.4
-2.4 mat -0.1
-3.0 <unk>

\\2-grams:
-0.4 the black -0.2
-0.6 black cat -0.1
-0.5 cat sat -0.2
-0.3 sat on -0.1
-0.4 on a -0.2
-0.9 a mat

\\3-grams:
-0.2 the black cat
-0.3 cat sat on
-0.1 on a mat

\\end\\
";

struct Grammar {
    system: TranslationSystem,
    leaf: Arc<RuleApplication>,
    unary: Arc<RuleApplication>,
    binary: Arc<RuleApplication>,
}

fn grammar() -> Grammar {
    let mut vocab = Vocab::new();
    let mut features = FeatureRegistry::new();
    let tm = features.register("tm", 0.3);
    let mut lms = LanguageModelSet::new();
    let model = BackoffModel::from_arpa_str(ARPA, &mut vocab).unwrap();
    lms.add(&mut features, "lm", 0.5, Box::new(model));

    let span = SourceSpan::new(0, 1);
    let scores = FeatureScoreVector::from_pairs([(tm, -1.0)]);
    let leaf = RuleApplication::parse(&mut vocab, "the black cat", scores.clone(), span).unwrap();
    let unary = RuleApplication::parse(&mut vocab, "a [X,1] sat", scores.clone(), span).unwrap();
    let binary = RuleApplication::parse(&mut vocab, "[X,2] on a [X,1] mat", scores, span).unwrap();

    Grammar {
        system: TranslationSystem::new(vocab, features, lms),
        leaf: Arc::new(leaf),
        unary: Arc::new(unary),
        binary: Arc::new(binary),
    }
}

fn bench_create_and_score(c: &mut Criterion) {
    let g = grammar();
    let config = DecoderConfig::default();

    c.bench_function("create_score_leaf", |b| {
        let mut ctx = DecodeContext::new(&g.system, &config, 1);
        b.iter(|| {
            let node = ctx.create_node(g.leaf.clone(), Vec::new()).unwrap();
            ctx.compute_score(node);
            ctx.release(black_box(node));
        })
    });

    c.bench_function("create_score_binary", |b| {
        let mut ctx = DecodeContext::new(&g.system, &config, 1);
        let left = ctx.create_node(g.leaf.clone(), Vec::new()).unwrap();
        ctx.compute_score(left);
        let right = ctx.create_node(g.unary.clone(), vec![left]).unwrap();
        ctx.compute_score(right);
        b.iter(|| {
            let node = ctx.create_node(g.binary.clone(), vec![left, right]).unwrap();
            ctx.compute_score(node);
            ctx.release(black_box(node));
        })
    });
}

fn bench_deep_chain(c: &mut Criterion) {
    let g = grammar();
    let config = DecoderConfig::default();

    c.bench_function("score_chain_64", |b| {
        b.iter(|| {
            let mut ctx = DecodeContext::new(&g.system, &config, 1);
            let mut node = ctx.create_node(g.leaf.clone(), Vec::new()).unwrap();
            ctx.compute_score(node);
            for _ in 0..63 {
                node = ctx.create_node(g.unary.clone(), vec![node]).unwrap();
                ctx.compute_score(node);
            }
            black_box(ctx.total_score(node))
        })
    });

    c.bench_function("materialize_chain_64", |b| {
        let mut ctx = DecodeContext::new(&g.system, &config, 1);
        let mut node = ctx.create_node(g.leaf.clone(), Vec::new()).unwrap();
        ctx.compute_score(node);
        for _ in 0..63 {
            node = ctx.create_node(g.unary.clone(), vec![node]).unwrap();
            ctx.compute_score(node);
        }
        b.iter(|| ctx.materialize_output(black_box(node)))
    });
}

criterion_group!(benches, bench_create_and_score, bench_deep_chain);
criterion_main!(benches);
