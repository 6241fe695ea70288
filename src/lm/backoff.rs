//! Back-off n-gram model in the ARPA format.
//!
//! ```text
//! \data\
//! ngram 1=3
//! ngram 2=1
//!
//! \1-grams:
//! -1.0 the -0.3
//! -1.2 black -0.2
//! -1.5 cat
//!
//! \2-grams:
//! -0.4 the black
//!
//! \end\
//! ```

use super::LanguageModel;
use crate::vocab::{Vocab, WordId};
use rustc_hash::FxHashMap;
use std::io::BufRead;
use thiserror::Error;

/// Score of a word the model has never seen, when it has no `<unk>`.
pub const UNKNOWN_WORD_LOG_PROB: f64 = -100.0;

/// Errors from reading an ARPA file.
#[derive(Error, Debug)]
pub enum ArpaError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no \\data\\ header found")]
    MissingData,
    #[error("line {line}: malformed n-gram count: {text}")]
    BadCount { line: usize, text: String },
    #[error("line {line}: malformed {order}-gram entry: {text}")]
    BadEntry { line: usize, order: usize, text: String },
    #[error("line {line}: unexpected section header: {text}")]
    UnexpectedSection { line: usize, text: String },
    #[error("expected {expected} {order}-grams, found {found}")]
    CountMismatch { order: usize, expected: usize, found: usize },
    #[error("missing \\end\\ marker")]
    MissingEnd,
}

/// Result type for ARPA loading.
pub type ArpaResult<T> = Result<T, ArpaError>;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Entry {
    log_prob: f64,
    backoff: f64,
}

/// Katz back-off language model over interned words.
#[derive(Debug, Clone)]
pub struct BackoffModel {
    order: usize,
    ngrams: FxHashMap<Box<[WordId]>, Entry>,
    unk: Option<WordId>,
}

#[derive(Debug, PartialEq)]
enum Section {
    Preamble,
    Counts,
    Grams(usize),
    End,
}

impl BackoffModel {
    /// Create an empty model of the given order.
    pub fn new(order: usize) -> Self {
        assert!(order >= 1, "n-gram order must be at least 1");
        BackoffModel {
            order,
            ngrams: FxHashMap::default(),
            unk: None,
        }
    }

    /// Add or replace an n-gram entry.
    pub fn insert(&mut self, ngram: &[WordId], log_prob: f64, backoff: f64) {
        assert!(
            !ngram.is_empty() && ngram.len() <= self.order,
            "{}-gram does not fit an order {} model",
            ngram.len(),
            self.order
        );
        self.ngrams.insert(ngram.into(), Entry { log_prob, backoff });
    }

    /// Use `word` as the unknown-word token.
    pub fn set_unknown(&mut self, word: WordId) {
        self.unk = Some(word);
    }

    /// Number of stored n-grams of every order.
    pub fn len(&self) -> usize {
        self.ngrams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ngrams.is_empty()
    }

    /// Parse an ARPA model, interning its words into `vocab`.
    pub fn from_arpa_str(text: &str, vocab: &mut Vocab) -> ArpaResult<Self> {
        Self::from_reader(text.as_bytes(), vocab)
    }

    /// Read an ARPA model from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R, vocab: &mut Vocab) -> ArpaResult<Self> {
        let mut section = Section::Preamble;
        let mut expected: Vec<usize> = Vec::new();
        let mut found: Vec<usize> = Vec::new();
        let mut model: Option<BackoffModel> = None;
        let mut words: Vec<WordId> = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            if text == "\\data\\" {
                if section != Section::Preamble {
                    return Err(ArpaError::UnexpectedSection {
                        line: line_no,
                        text: text.to_string(),
                    });
                }
                section = Section::Counts;
                continue;
            }

            if text == "\\end\\" {
                if section == Section::Preamble {
                    return Err(ArpaError::MissingData);
                }
                section = Section::End;
                break;
            }

            if let Some(order) = parse_section_header(text) {
                let valid = matches!(section, Section::Counts | Section::Grams(_))
                    && order >= 1
                    && order <= expected.len();
                if !valid {
                    return Err(ArpaError::UnexpectedSection {
                        line: line_no,
                        text: text.to_string(),
                    });
                }
                if model.is_none() {
                    model = Some(BackoffModel::new(expected.len()));
                }
                section = Section::Grams(order);
                continue;
            }

            match section {
                Section::Preamble => {}
                Section::Counts => {
                    let (order, count) = parse_count(text).ok_or_else(|| ArpaError::BadCount {
                        line: line_no,
                        text: text.to_string(),
                    })?;
                    if order != expected.len() + 1 {
                        return Err(ArpaError::BadCount {
                            line: line_no,
                            text: text.to_string(),
                        });
                    }
                    expected.push(count);
                    found.push(0);
                }
                Section::Grams(order) => {
                    let bad_entry = || ArpaError::BadEntry {
                        line: line_no,
                        order,
                        text: text.to_string(),
                    };
                    let mut fields = text.split_whitespace();
                    let log_prob: f64 = fields
                        .next()
                        .and_then(|f| f.parse().ok())
                        .ok_or_else(bad_entry)?;

                    words.clear();
                    for _ in 0..order {
                        let word = fields.next().ok_or_else(bad_entry)?;
                        words.push(vocab.intern(word));
                    }
                    let backoff: f64 = match fields.next() {
                        Some(f) => f.parse().map_err(|_| bad_entry())?,
                        None => 0.0,
                    };
                    if fields.next().is_some() {
                        return Err(bad_entry());
                    }

                    if let Some(m) = model.as_mut() {
                        m.insert(&words, log_prob, backoff);
                    }
                    found[order - 1] += 1;
                }
                Section::End => unreachable!(),
            }
        }

        if section == Section::Preamble {
            return Err(ArpaError::MissingData);
        }
        if section != Section::End {
            return Err(ArpaError::MissingEnd);
        }
        for (i, (&e, &f)) in expected.iter().zip(&found).enumerate() {
            if e != f {
                return Err(ArpaError::CountMismatch {
                    order: i + 1,
                    expected: e,
                    found: f,
                });
            }
        }

        let mut model = model.unwrap_or_else(|| BackoffModel::new(expected.len().max(1)));
        if let Some(unk) = vocab.get("<unk>") {
            if model.ngrams.contains_key(&[unk][..]) {
                model.unk = Some(unk);
            }
        }
        tracing::debug!(order = model.order, ngrams = model.len(), "loaded ARPA model");
        Ok(model)
    }

    fn unknown_log_prob(&self) -> f64 {
        self.unk
            .and_then(|unk| self.ngrams.get(&[unk][..]))
            .map_or(UNKNOWN_WORD_LOG_PROB, |e| e.log_prob)
    }
}

fn parse_section_header(text: &str) -> Option<usize> {
    text.strip_prefix('\\')?
        .strip_suffix("-grams:")?
        .parse()
        .ok()
}

fn parse_count(text: &str) -> Option<(usize, usize)> {
    let rest = text.strip_prefix("ngram")?.trim_start();
    let (order, count) = rest.split_once('=')?;
    Some((order.trim().parse().ok()?, count.trim().parse().ok()?))
}

impl LanguageModel for BackoffModel {
    fn order(&self) -> usize {
        self.order
    }

    fn log_prob(&self, context: &[WordId], word: WordId) -> f64 {
        if !self.ngrams.contains_key(&[word][..]) {
            return self.unknown_log_prob();
        }

        let context = &context[context.len().saturating_sub(self.order - 1)..];
        let mut key: Vec<WordId> = Vec::with_capacity(context.len() + 1);
        let mut backoff = 0.0;

        for start in 0..=context.len() {
            key.clear();
            key.extend_from_slice(&context[start..]);
            key.push(word);
            if let Some(entry) = self.ngrams.get(key.as_slice()) {
                return backoff + entry.log_prob;
            }
            if let Some(ctx) = self.ngrams.get(&context[start..]) {
                backoff += ctx.backoff;
            }
        }

        // Unreachable in practice: the unigram lookup above succeeded.
        backoff + self.unknown_log_prob()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARPA: &str = "
\\data\\
ngram 1=4
ngram 2=2
ngram 3=1

\\1-grams:
-1.0 the -0.5
-1.5 black -0.25
-2.0 cat
-3.0 <unk>

\\2-grams:
-0.5 the black -0.125
-0.75 black cat

\\3-grams:
-0.1 the black cat

\\end\\
";

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_load() {
        let mut vocab = Vocab::new();
        let model = BackoffModel::from_arpa_str(ARPA, &mut vocab).unwrap();

        assert_eq!(model.order(), 3);
        assert_eq!(model.len(), 7);
        assert_eq!(model.unk, vocab.get("<unk>"));
    }

    #[test]
    fn test_exact_and_backoff() {
        let mut vocab = Vocab::new();
        let model = BackoffModel::from_arpa_str(ARPA, &mut vocab).unwrap();
        let [the, black, cat] = [vocab.intern("the"), vocab.intern("black"), vocab.intern("cat")];

        assert!(approx(model.log_prob(&[the, black], cat), -0.1));
        assert!(approx(model.log_prob(&[black], cat), -0.75));
        // p(the | black) = bo(black) + p(the)
        assert!(approx(model.log_prob(&[black], the), -0.25 + -1.0));
        // p(cat | cat black) = bo(cat black) [absent] + p(cat | black)
        assert!(approx(model.log_prob(&[cat, black], cat), -0.75));
        // p(the | the black) = bo(the black) + bo(black) + p(the)
        assert!(approx(model.log_prob(&[the, black], the), -0.125 + -0.25 + -1.0));
    }

    #[test]
    fn test_unknown_word() {
        let mut vocab = Vocab::new();
        let model = BackoffModel::from_arpa_str(ARPA, &mut vocab).unwrap();
        let dog = vocab.intern("dog");

        assert!(approx(model.log_prob(&[], dog), -3.0));

        let mut bare = BackoffModel::new(2);
        bare.insert(&[vocab.intern("the")], -1.0, 0.0);
        assert!(approx(bare.log_prob(&[], dog), UNKNOWN_WORD_LOG_PROB));
    }

    #[test]
    fn test_score_phrase() {
        let mut vocab = Vocab::new();
        let model = BackoffModel::from_arpa_str(ARPA, &mut vocab).unwrap();
        let words = vocab.intern_all("the black cat");
        let score = model.score_phrase(&words);

        assert!(approx(score.full, -1.0 + -0.5 + -0.1));
        assert!(approx(score.ngram, -0.1));
    }

    #[test]
    fn test_missing_data() {
        let mut vocab = Vocab::new();
        assert!(matches!(
            BackoffModel::from_arpa_str("hello\n\\end\\\n", &mut vocab),
            Err(ArpaError::MissingData)
        ));
    }

    #[test]
    fn test_count_mismatch() {
        let mut vocab = Vocab::new();
        let text = "\\data\\\nngram 1=2\n\\1-grams:\n-1.0 a\n\\end\\\n";
        assert!(matches!(
            BackoffModel::from_arpa_str(text, &mut vocab),
            Err(ArpaError::CountMismatch {
                order: 1,
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_bad_entry_reports_line() {
        let mut vocab = Vocab::new();
        let text = "\\data\\\nngram 1=1\n\\1-grams:\nxyz a\n\\end\\\n";
        match BackoffModel::from_arpa_str(text, &mut vocab) {
            Err(ArpaError::BadEntry { line, order, .. }) => {
                assert_eq!(line, 4);
                assert_eq!(order, 1);
            }
            other => panic!("expected BadEntry, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_end() {
        let mut vocab = Vocab::new();
        let text = "\\data\\\nngram 1=1\n\\1-grams:\n-1.0 a\n";
        assert!(matches!(
            BackoffModel::from_arpa_str(text, &mut vocab),
            Err(ArpaError::MissingEnd)
        ));
    }

    #[test]
    fn test_section_beyond_counts() {
        let mut vocab = Vocab::new();
        let text = "\\data\\\nngram 1=1\n\\2-grams:\n\\end\\\n";
        assert!(matches!(
            BackoffModel::from_arpa_str(text, &mut vocab),
            Err(ArpaError::UnexpectedSection { line: 3, .. })
        ));
    }
}
