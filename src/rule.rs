//! Rule applications: the target side of a grammar rule bound to a span.
//!
//! A rule's target side is a sequence of words and non-terminal slots,
//! for example `the [X,1] cat`. Each non-terminal position is aligned to
//! the index of the child hypothesis that fills it.

use crate::features::FeatureScoreVector;
use crate::vocab::{Vocab, WordId};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Alignment value stored at terminal positions.
pub const NOT_ALIGNED: usize = usize::MAX;

/// Errors from parsing target-side rule text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleParseError {
    #[error("malformed non-terminal slot: {0}")]
    MalformedSlot(String),
    #[error("non-terminal index must be 1-based, found {0}")]
    ZeroIndex(String),
    #[error("non-terminal index {0} used more than once")]
    DuplicateIndex(usize),
    #[error("non-terminal indices must be 1..={expected}, found {found}")]
    IndexGap { expected: usize, found: usize },
}

/// Half-open range of source positions `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end, "span start {} after end {}", start, end);
        SourceSpan { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn touches_sentence_start(&self) -> bool {
        self.start == 0
    }

    pub fn touches_sentence_end(&self, sentence_len: usize) -> bool {
        self.end >= sentence_len
    }

    /// True if `other` lies inside this span.
    pub fn contains(&self, other: &SourceSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{})", self.start, self.end)
    }
}

/// One position of a rule's target side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetSymbol {
    Word(WordId),
    /// Slot filled by a child hypothesis; carries the non-terminal label.
    NonTerminal(WordId),
}

impl TargetSymbol {
    pub fn is_non_terminal(&self) -> bool {
        matches!(self, TargetSymbol::NonTerminal(_))
    }
}

/// Target side of a rule together with its base feature scores
/// (translation model, word penalty, ...).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TargetPhrase {
    symbols: Vec<TargetSymbol>,
    scores: FeatureScoreVector,
}

impl TargetPhrase {
    pub fn new(symbols: Vec<TargetSymbol>, scores: FeatureScoreVector) -> Self {
        TargetPhrase { symbols, scores }
    }

    /// Parse `the [X,1] cat`-style text.
    ///
    /// Returns the phrase and the alignment from target position to child
    /// index (`[X,k]` binds the k-th child, 1-based).
    pub fn parse(
        vocab: &mut Vocab,
        text: &str,
        scores: FeatureScoreVector,
    ) -> Result<(TargetPhrase, Vec<usize>), RuleParseError> {
        let mut symbols = Vec::new();
        let mut alignment = Vec::new();
        let mut seen: Vec<usize> = Vec::new();

        for token in text.split_whitespace() {
            if token.starts_with('[') && token.len() > 1 {
                let (label, index) = parse_slot(token)?;
                if seen.contains(&index) {
                    return Err(RuleParseError::DuplicateIndex(index + 1));
                }
                seen.push(index);
                symbols.push(TargetSymbol::NonTerminal(vocab.intern(label)));
                alignment.push(index);
            } else {
                symbols.push(TargetSymbol::Word(vocab.intern(token)));
                alignment.push(NOT_ALIGNED);
            }
        }

        seen.sort_unstable();
        for (expected, &found) in seen.iter().enumerate() {
            if expected != found {
                return Err(RuleParseError::IndexGap {
                    expected: seen.len(),
                    found: found + 1,
                });
            }
        }

        Ok((TargetPhrase::new(symbols, scores), alignment))
    }

    pub fn symbols(&self) -> &[TargetSymbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn scores(&self) -> &FeatureScoreVector {
        &self.scores
    }

    pub fn num_terminals(&self) -> usize {
        self.symbols.iter().filter(|s| !s.is_non_terminal()).count()
    }

    pub fn num_non_terminals(&self) -> usize {
        self.symbols.iter().filter(|s| s.is_non_terminal()).count()
    }

    pub fn display<'a>(&'a self, vocab: &'a Vocab) -> impl fmt::Display + 'a {
        TargetPhraseDisplay { phrase: self, vocab }
    }
}

fn parse_slot(token: &str) -> Result<(&str, usize), RuleParseError> {
    let inner = token
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(|| RuleParseError::MalformedSlot(token.to_string()))?;
    let (label, index) = inner
        .split_once(',')
        .ok_or_else(|| RuleParseError::MalformedSlot(token.to_string()))?;
    if label.is_empty() {
        return Err(RuleParseError::MalformedSlot(token.to_string()));
    }
    let index: usize = index
        .trim()
        .parse()
        .map_err(|_| RuleParseError::MalformedSlot(token.to_string()))?;
    if index == 0 {
        return Err(RuleParseError::ZeroIndex(token.to_string()));
    }
    Ok((label, index - 1))
}

struct TargetPhraseDisplay<'a> {
    phrase: &'a TargetPhrase,
    vocab: &'a Vocab,
}

impl fmt::Display for TargetPhraseDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, symbol) in self.phrase.symbols.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match symbol {
                TargetSymbol::Word(w) => write!(f, "{}", self.vocab.resolve(*w))?,
                TargetSymbol::NonTerminal(label) => write!(f, "[{}]", self.vocab.resolve(*label))?,
            }
        }
        Ok(())
    }
}

/// A grammar rule instantiated over a source span.
#[derive(Clone, Debug)]
pub struct RuleApplication {
    target: Arc<TargetPhrase>,
    alignment: Vec<usize>,
    span: SourceSpan,
}

impl RuleApplication {
    /// Bind non-terminal slots to children in left-to-right target order.
    pub fn new(target: Arc<TargetPhrase>, span: SourceSpan) -> Self {
        let mut next = 0;
        let alignment = target
            .symbols()
            .iter()
            .map(|s| {
                if s.is_non_terminal() {
                    next += 1;
                    next - 1
                } else {
                    NOT_ALIGNED
                }
            })
            .collect();
        Self::with_alignment(target, alignment, span)
    }

    /// Use an explicit alignment from target position to child index.
    ///
    /// Panics if the alignment does not cover every target position or
    /// the non-terminal entries are not a permutation of the child slots.
    pub fn with_alignment(target: Arc<TargetPhrase>, alignment: Vec<usize>, span: SourceSpan) -> Self {
        assert_eq!(
            target.len(),
            alignment.len(),
            "target phrase length must equal alignment length"
        );

        let arity = target.num_non_terminals();
        let mut used = vec![false; arity];
        for (symbol, &slot) in target.symbols().iter().zip(&alignment) {
            if symbol.is_non_terminal() {
                assert!(slot < arity, "non-terminal aligned to child {} of {}", slot, arity);
                assert!(!used[slot], "child {} aligned twice", slot);
                used[slot] = true;
            }
        }

        RuleApplication {
            target,
            alignment,
            span,
        }
    }

    /// Parse target text and bind it over `span`.
    pub fn parse(
        vocab: &mut Vocab,
        text: &str,
        scores: FeatureScoreVector,
        span: SourceSpan,
    ) -> Result<Self, RuleParseError> {
        let (phrase, alignment) = TargetPhrase::parse(vocab, text, scores)?;
        Ok(Self::with_alignment(Arc::new(phrase), alignment, span))
    }

    pub fn target(&self) -> &TargetPhrase {
        &self.target
    }

    pub fn alignment(&self) -> &[usize] {
        &self.alignment
    }

    /// Child index for the non-terminal at target position `pos`.
    pub fn child_slot(&self, pos: usize) -> usize {
        self.alignment[pos]
    }

    pub fn span(&self) -> SourceSpan {
        self.span
    }

    pub fn arity(&self) -> usize {
        self.target.num_non_terminals()
    }
}
