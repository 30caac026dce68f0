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

//! The fatal half of §7's error taxonomy. Surfaced differences are never
//! represented here — they accumulate in [`crate::rule::AxisMask`] and the
//! diff count instead; only conditions that abort the comparison are `Err`.

use thiserror::Error;

/// Fatal errors the engine or CLI can report.
#[derive(Error, Debug)]
pub enum Error {
    /// Opening or reading one of the two input files failed.
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A [`Context`](crate::context::Context) returned no rule for a known
    /// `(row, col)` — the "invalid context" fatal condition of §7.
    #[error("no rule available at line {row}, column {col}")]
    NoRule { row: u32, col: u32 },

    /// `check` mode found that `get_inc` and `get_at` disagree at the same
    /// `(row, col)` — a dual-lookup invariant violation.
    #[error("dual lookup mismatch at line {row}, column {col}: rule #{inc_idx:?} vs #{at_idx:?}")]
    DualLookupMismatch {
        row: u32,
        col: u32,
        inc_idx: Option<usize>,
        at_idx: Option<usize>,
    },

    /// An option value outside its valid domain, e.g. `max_diffs == 0`.
    #[error("invalid option: {0}")]
    InvalidOption(&'static str),

    /// A rule's `on_fail` hook elected to escalate a surfaced difference.
    #[error("on_fail escalation at line {row}: {reason}")]
    OnFailEscalation { row: u32, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
