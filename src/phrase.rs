//! Bounded boundary phrases used as n-gram context.

use crate::vocab::{Vocab, WordId};
use std::cmp::Ordering;
use std::fmt;

/// The leading or trailing words of a hypothesis' target yield.
///
/// Holds at most `capacity` words (`max_order - 1` for the language
/// models in use). Filled once when the hypothesis is built.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BoundaryPhrase {
    words: Vec<WordId>,
    capacity: usize,
}

impl BoundaryPhrase {
    /// Create an empty phrase that can hold up to `capacity` words.
    pub fn with_capacity(capacity: usize) -> Self {
        BoundaryPhrase {
            words: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Build a phrase directly from words.
    pub fn from_words(words: &[WordId], capacity: usize) -> Self {
        assert!(
            words.len() <= capacity,
            "boundary phrase of {} words exceeds capacity {}",
            words.len(),
            capacity
        );
        BoundaryPhrase {
            words: words.to_vec(),
            capacity,
        }
    }

    pub fn words(&self) -> &[WordId] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn push_back(&mut self, word: WordId) {
        debug_assert!(self.words.len() < self.capacity);
        self.words.push(word);
    }

    pub(crate) fn push_front(&mut self, word: WordId) {
        debug_assert!(self.words.len() < self.capacity);
        self.words.insert(0, word);
    }

    /// Drop the words; the node will never be compared again.
    pub(crate) fn clear(&mut self) {
        self.words = Vec::new();
    }

    /// Lexicographic comparison over word identity.
    pub fn compare(&self, other: &BoundaryPhrase) -> Ordering {
        for (a, b) in self.words.iter().zip(&other.words) {
            match a.cmp(b) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        self.words.len().cmp(&other.words.len())
    }

    pub fn display<'a>(&'a self, vocab: &'a Vocab) -> impl fmt::Display + 'a {
        PhraseDisplay {
            words: &self.words,
            vocab,
        }
    }
}

pub(crate) struct PhraseDisplay<'a> {
    pub(crate) words: &'a [WordId],
    pub(crate) vocab: &'a Vocab,
}

impl fmt::Display for PhraseDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.vocab.render(self.words))
    }
}
