// This file is part of numdiff, a numerically-tolerant text differ.
// Copyright 2024 numdiff developers
//
// SPDX-License-Identifier: GPL-3.0-or-later
//
// numdiff is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published
// by the Free Software Foundation, either version 3 of the License,
// or (at your option) any later version.
//
// numdiff is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See
// the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with numdiff.  If not, see <http://www.gnu.org/licenses/>.

//! Comparison-wide knobs, the `option()` call of §6.
//!
//! No configuration-file format is read here — options arrive from the CLI
//! or direct API calls only, per the Non-goals in §1.

use crate::error::{Error, Result};

/// Comparison-wide knobs (`blank`/`check`/`max_diffs` of §3).
#[derive(Clone, PartialEq, Debug)]
pub struct Options {
    /// Collapse whitespace-only discrepancies during scanning.
    pub blank: bool,
    /// Run the redundant `get_at` lookup to check `get_inc` for consistency.
    pub check: bool,
    /// Diagnostics are suppressed once `cnt_i` exceeds this cap; the
    /// comparison itself continues regardless.
    pub max_diffs: u32,
    /// Punctuation bytes that `is_separator`/`is_number_start` should treat
    /// as identifier characters rather than separators, e.g. `_` in a
    /// test-name token that happens to contain digits.
    pub keep_chars: Vec<u8>,
}

impl Default for Options {
    fn default() -> Self {
        Self { blank: false, check: false, max_diffs: u32::MAX, keep_chars: Vec::new() }
    }
}

impl Options {
    /// Validates and returns `self`, per §7's "invalid option values".
    pub fn validated(self) -> Result<Self> {
        if self.max_diffs == 0 {
            return Err(Error::InvalidOption("max_diffs must be positive"));
        }
        Ok(self)
    }
}
