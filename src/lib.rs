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

//! A numerically-tolerant text differ: compares two text streams line by
//! line, treating embedded numerals as numbers rather than byte sequences
//! and judging them within caller-specified tolerances instead of requiring
//! exact matches.
//!
//! The crate is organized around four collaborating pieces:
//!
//! - [`engine`] drives the comparison itself: [`engine::DiffState`] owns the
//!   two input streams and scratch buffers, and its `next_num`/`test_num`/
//!   `goto_line`/`goto_num`/`run` methods are the actual algorithm.
//! - [`rule`] describes what a comparison should tolerate: [`rule::Rule`],
//!   its [`rule::RuleCommand`] flags, and the [`rule::Epsilons`] tolerance
//!   bounds.
//! - [`context`] supplies rules to the engine by position; [`context::Context`]
//!   is the seam a caller implements to go beyond one uniform rule for an
//!   entire comparison.
//! - [`number`] and [`registers`] are the two pieces of mechanism the engine
//!   itself is built from: numeral lexing and the cross-rule scratch
//!   register file.

pub mod context;
pub mod engine;
pub mod error;
pub mod number;
pub mod options;
pub mod registers;
pub mod rule;

pub use context::{Context, TableContext, UniformContext};
pub use engine::{DiffInfo, DiffState, RunOutcome};
pub use error::{Error, Result};
pub use options::Options;
pub use registers::{RegOp, RegOpKind, RegisterFile};
pub use rule::{AxisMask, ColumnRange, Epsilons, Indirect, Rule, RuleCommand};
