// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2026 sbmod contributors

//! General-purpose counting capabilities.

use counter::Counter;
use itertools::Itertools;

/// A key and the number of times it was seen.
pub type Count = (String, usize);

/// Counts occurrences of strings, such as comments per subreddit or
/// comments per author.
///
/// Unlike a bare [`Counter`], a tally remembers the order in which keys were
/// first seen, so that keys with equal counts are always reported in a
/// predictable order.
#[derive(Debug, Default)]
pub struct Tally {
    counts: Counter<String>,
    order: Vec<(String, String)>,
    ignore_case: bool,
}

impl Tally {
    /// Creates an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty tally that treats keys differing only in ASCII case
    /// as the same key, reported with the spelling seen first.
    pub fn ignoring_case() -> Self {
        Self {
            ignore_case: true,
            ..Self::default()
        }
    }

    fn normalize(&self, key: &str) -> String {
        if self.ignore_case {
            key.to_ascii_lowercase()
        } else {
            key.to_string()
        }
    }

    /// Counts one more occurrence of `key`.
    pub fn add(&mut self, key: &str) {
        let normalized = self.normalize(key);
        match self.counts.get_mut(&normalized) {
            Some(count) => *count += 1,
            None => {
                self.order.push((normalized.clone(), key.to_string()));
                self.counts.insert(normalized, 1);
            }
        }
    }

    /// How many times `key` was seen.
    pub fn get(&self, key: &str) -> usize {
        self.counts.get(&self.normalize(key)).copied().unwrap_or(0)
    }

    /// The number of distinct keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if nothing has been counted.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Every key with its count, most common first.
    ///
    /// Keys with the same count appear in the order they were first seen.
    ///
    /// # Examples
    ///
    /// ```
    /// use sbmod::count::Tally;
    /// let tally: Tally = ["rust", "SantaBarbara", "rust", "food"].into_iter().collect();
    /// assert_eq!(
    ///     tally.most_common(),
    ///     vec![
    ///         ("rust".to_string(), 2),
    ///         ("SantaBarbara".to_string(), 1),
    ///         ("food".to_string(), 1),
    ///     ]
    /// );
    /// ```
    pub fn most_common(&self) -> Vec<Count> {
        self.order
            .iter()
            .map(|(key, spelling)| {
                let count = self.counts.get(key).copied().unwrap_or(0);
                (spelling.clone(), count)
            })
            .sorted_by(|(_, lhs), (_, rhs)| rhs.cmp(lhs))
            .collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for Tally {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tally = Tally::new();
        for key in iter {
            tally.add(key.as_ref());
        }
        tally
    }
}
