//! WordPiece tokenization for BERT-family sentence encoders.
//!
//! Reads the model's `vocab.txt` (one token per line, id = line number).
//! Text is lowercased, split on whitespace and punctuation, then each word
//! is cut greedily into the longest vocabulary pieces, continuations
//! prefixed with `##`.

use crate::error::StartupDataError;
use std::collections::HashMap;
use std::path::Path;

const UNK: &str = "[UNK]";
const CLS: &str = "[CLS]";
const SEP: &str = "[SEP]";

/// Words longer than this become a single `[UNK]`
const MAX_WORD_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct WordPiece {
    vocab: HashMap<String, i64>,
    unk: i64,
    cls: i64,
    sep: i64,
}

impl WordPiece {
    /// Build from vocabulary tokens in id order. `None` when a special
    /// token is missing.
    pub fn from_vocab<I, S>(tokens: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let vocab: HashMap<String, i64> = tokens
            .into_iter()
            .enumerate()
            .map(|(id, tok)| (tok.into(), id as i64))
            .collect();
        Some(Self {
            unk: *vocab.get(UNK)?,
            cls: *vocab.get(CLS)?,
            sep: *vocab.get(SEP)?,
            vocab,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, StartupDataError> {
        let content = std::fs::read_to_string(path).map_err(|source| StartupDataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_vocab(content.lines().map(str::trim_end)).ok_or_else(|| {
            StartupDataError::Model {
                path: path.to_path_buf(),
                reason: format!("vocabulary lacks {}, {} or {}", UNK, CLS, SEP),
            }
        })
    }

    pub fn len(&self) -> usize {
        self.vocab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocab.is_empty()
    }

    /// Token ids framed by `[CLS]` and `[SEP]`, at most `max_tokens` long.
    pub fn encode(&self, text: &str, max_tokens: usize) -> Vec<i64> {
        let budget = max_tokens.max(2) - 2;
        let mut ids = vec![self.cls];
        for word in basic_split(&text.to_lowercase()) {
            if ids.len() > budget {
                break;
            }
            self.push_pieces(word, &mut ids);
        }
        ids.truncate(budget + 1);
        ids.push(self.sep);
        ids
    }

    fn push_pieces(&self, word: &str, ids: &mut Vec<i64>) {
        let chars: Vec<char> = word.chars().collect();
        if chars.len() > MAX_WORD_CHARS {
            ids.push(self.unk);
            return;
        }

        let mut pieces = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let mut end = chars.len();
            let mut found = None;
            while start < end {
                let mut piece: String = chars[start..end].iter().collect();
                if start > 0 {
                    piece.insert_str(0, "##");
                }
                if let Some(&id) = self.vocab.get(&piece) {
                    found = Some(id);
                    break;
                }
                end -= 1;
            }
            match found {
                Some(id) => {
                    pieces.push(id);
                    start = end;
                }
                None => {
                    ids.push(self.unk);
                    return;
                }
            }
        }
        ids.extend(pieces);
    }
}

/// Whitespace split with every punctuation character as its own word.
fn basic_split(text: &str) -> Vec<&str> {
    let mut words = Vec::new();
    for chunk in text.split_whitespace() {
        let mut start = 0;
        for (i, c) in chunk.char_indices() {
            if c.is_alphanumeric() {
                continue;
            }
            if start < i {
                words.push(&chunk[start..i]);
            }
            words.push(&chunk[i..i + c.len_utf8()]);
            start = i + c.len_utf8();
        }
        if start < chunk.len() {
            words.push(&chunk[start..]);
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> WordPiece {
        WordPiece::from_vocab([
            "[PAD]", "[UNK]", "[CLS]", "[SEP]", "high", "blood", "sugar", "dia", "##bet", "##es",
            "-", "?",
        ])
        .unwrap()
    }

    #[test]
    fn test_whole_words_and_punctuation() {
        let wp = vocab();
        assert_eq!(wp.encode("High blood-sugar?", 32), vec![2, 4, 5, 10, 6, 11, 3]);
    }

    #[test]
    fn test_subword_pieces() {
        assert_eq!(vocab().encode("Diabetes", 32), vec![2, 7, 8, 9, 3]);
    }

    #[test]
    fn test_unknown_word_is_single_unk() {
        // "diabetic" has no "##ic" piece, so the whole word is unknown
        assert_eq!(vocab().encode("diabetic sugar", 32), vec![2, 1, 6, 3]);
        assert_eq!(vocab().encode("", 32), vec![2, 3]);
    }

    #[test]
    fn test_truncates_to_max_tokens() {
        let ids = vocab().encode("high blood sugar diabetes", 4);
        assert_eq!(ids, vec![2, 4, 5, 3]);
        assert_eq!(vocab().encode("diabetes", 3), vec![2, 7, 3]);
    }

    #[test]
    fn test_missing_special_tokens() {
        assert!(WordPiece::from_vocab(["[PAD]", "[CLS]", "[SEP]", "fever"]).is_none());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.txt");
        std::fs::write(&path, "[PAD]\n[UNK]\n[CLS]\n[SEP]\nfever\n").unwrap();
        let wp = WordPiece::from_file(&path).unwrap();
        assert_eq!(wp.len(), 5);
        assert_eq!(wp.encode("fever", 16), vec![2, 4, 3]);

        std::fs::write(&path, "fever\n").unwrap();
        assert_eq!(WordPiece::from_file(&path).unwrap_err().kind(), "model");
        let missing = dir.path().join("missing.txt");
        assert_eq!(WordPiece::from_file(&missing).unwrap_err().kind(), "io");
    }
}
