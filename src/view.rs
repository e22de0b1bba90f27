// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2026 sbmod contributors

//! Formats results for display in a terminal.

use crate::count::Tally;
use itertools::Itertools;

/// Marks an item that can be converted into a string for display on a terminal.
pub trait Viewable {
    /// Converts the item into a string for display on a terminal.
    fn view(&self) -> String;
}

impl Viewable for Tally {
    /// One `name: count` line per key, most common first.
    fn view(&self) -> String {
        self.most_common()
            .iter()
            .map(|(name, count)| format!("{name}: {count}"))
            .join("\n")
    }
}

impl Viewable for [String] {
    fn view(&self) -> String {
        self.join("\n")
    }
}
