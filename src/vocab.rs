//! Word interning for target-side vocabulary.
//!
//! Every target word and non-terminal label is mapped to a dense `WordId`
//! so boundary phrases compare by integer, not by string.

use rustc_hash::FxHashMap;
use std::fmt;

/// Interned word ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WordId(u32);

impl WordId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for WordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Symbol table mapping words to IDs and back.
///
/// A vocabulary is built up front (rule table, language model) and then
/// shared read-only by every sentence being decoded.
#[derive(Debug, Default, Clone)]
pub struct Vocab {
    str_to_id: FxHashMap<Box<str>, WordId>,
    id_to_str: Vec<Box<str>>,
}

impl Vocab {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a word, returning its id.
    pub fn intern(&mut self, word: &str) -> WordId {
        if let Some(&id) = self.str_to_id.get(word) {
            return id;
        }

        let id = WordId(self.id_to_str.len() as u32);
        let boxed: Box<str> = word.into();
        self.str_to_id.insert(boxed.clone(), id);
        self.id_to_str.push(boxed);
        id
    }

    /// Intern every whitespace-separated word of `text`.
    pub fn intern_all(&mut self, text: &str) -> Vec<WordId> {
        text.split_whitespace().map(|w| self.intern(w)).collect()
    }

    /// Look up a word without interning it.
    pub fn get(&self, word: &str) -> Option<WordId> {
        self.str_to_id.get(word).copied()
    }

    /// The word for an id. Panics on an id from another vocabulary.
    pub fn resolve(&self, id: WordId) -> &str {
        &self.id_to_str[id.0 as usize]
    }

    /// Render a word sequence as a space-separated string.
    pub fn render(&self, words: &[WordId]) -> String {
        let mut out = String::new();
        for (i, &w) in words.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(self.resolve(w));
        }
        out
    }

    /// Number of interned words.
    pub fn len(&self) -> usize {
        self.id_to_str.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_str.is_empty()
    }
}
