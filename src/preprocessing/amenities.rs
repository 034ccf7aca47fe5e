//! Amenity token parsing and vocabulary extraction

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Strip list punctuation from a raw amenity field.
///
/// `["Wifi", "Kitchen"]` becomes `Wifi, Kitchen`.
pub fn strip_list_punctuation(raw: &str) -> String {
    raw.chars().filter(|c| !matches!(c, '[' | ']' | '"')).collect()
}

/// Split a raw amenity field into tokens
pub fn parse_amenities(raw: &str, delimiter: &str) -> Vec<String> {
    strip_list_punctuation(raw)
        .split(delimiter)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// The most frequent amenity tokens of one cleaned dataset.
///
/// Ordered by descending frequency. Equal counts keep the order in which the
/// tokens were first seen while scanning rows top to bottom, each row left to
/// right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmenityVocabulary {
    tokens: Vec<String>,
    counts: Vec<usize>,
}

impl AmenityVocabulary {
    /// Count tokens over all rows and keep the top `size`
    pub fn extract<R, T>(rows: R, size: usize) -> Self
    where
        R: IntoIterator<Item = T>,
        T: AsRef<[String]>,
    {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut frequencies: Vec<(String, usize)> = Vec::new();

        for row in rows {
            for token in row.as_ref() {
                match index.get(token) {
                    Some(&i) => frequencies[i].1 += 1,
                    None => {
                        index.insert(token.clone(), frequencies.len());
                        frequencies.push((token.clone(), 1));
                    }
                }
            }
        }

        // stable: ties stay in first-seen order
        frequencies.sort_by(|a, b| b.1.cmp(&a.1));
        frequencies.truncate(size);

        let (tokens, counts) = frequencies.into_iter().unzip();
        Self { tokens, counts }
    }

    /// Build a vocabulary from an explicit token list (e.g. a persisted schema)
    pub fn from_tokens(tokens: Vec<String>) -> Self {
        let counts = vec![0; tokens.len()];
        Self { tokens, counts }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Occurrence count of each token, parallel to [`tokens`](Self::tokens)
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Number of distinct tokens in `amenities` that belong to the vocabulary
    pub fn count_matches<'a, I>(&self, amenities: I) -> usize
    where
        I: IntoIterator<Item = &'a String>,
    {
        let distinct: HashSet<&str> = amenities.into_iter().map(String::as_str).collect();
        distinct.into_iter().filter(|a| self.contains(a)).count()
    }
}
