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

//! The tolerance rule: a compiled constraint consumed by the engine but
//! never owned or parsed by it (§6). Nothing here reads a rule-file
//! grammar — rules are built programmatically, by the CLI or by tests.

use crate::registers::RegOp;

bitflags::bitflags! {
    /// Command bits of an active rule, see §6.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct RuleCommand: u32 {
        /// Skip this line entirely on both sides.
        const SKIP    = 1 << 0;
        /// Seek forward to a line containing the rule's tag.
        const GOTO    = 1 << 1;
        /// Seek forward to a numeric occurrence of the rule's tag.
        const GONUM   = 1 << 2;
        /// Require byte-identical numeral representation.
        const EQU     = 1 << 3;
        /// Ignore a missing-number mismatch instead of reporting it.
        const IGN     = 1 << 4;
        /// Enable the absolute-error axis.
        const ABS     = 1 << 5;
        /// Enable the relative-error axis.
        const REL     = 1 << 6;
        /// Enable the significant-digit axis.
        const DIG     = 1 << 7;
        /// Collapse a multi-axis failure to success if not all enabled axes failed.
        const ANY     = 1 << 8;
        /// Treat a text mismatch preceded by the tag as a non-error omission.
        const OMIT    = 1 << 9;
        /// Numbers-in-strings mode: search each side independently for digits.
        const ISTR    = 1 << 10;
        /// Use the rule's inline `eps.lhs` value instead of the parsed literal.
        const LHS     = 1 << 11;
        /// Use the rule's inline `eps.rhs` value instead of the parsed literal.
        const RHS     = 1 << 12;
        /// Swap lhs/rhs before error computation (set internally by `goto_num`).
        const SWAP    = 1 << 13;
        /// Always write post-test registers, even when the comparison passes
        /// without them (registers are otherwise written only on success).
        const SAVE    = 1 << 14;
        /// Suppress diagnostic reporting for this rule, but still count it.
        const NOFAIL  = 1 << 15;
        /// Notify the context's `on_fail` hook when this rule's check fails.
        const ONFAIL  = 1 << 16;
        /// Raise the log level for the duration of this rule's evaluation.
        const TRACE   = 1 << 17;
        /// Like `TRACE`, and additionally snapshot registers before/after
        /// the rule's op program runs.
        const TRACE_R = 1 << 18;
        /// State-generating: re-enter the driver loop with a newly active rule.
        const SGG     = 1 << 19;

        /// Composite of the three numeric-tolerance axes.
        const DRA = Self::DIG.bits() | Self::REL.bits() | Self::ABS.bits();
    }
}

bitflags::bitflags! {
    /// Axes violated by a [`test_num`](crate::engine::evaluator::test_num) call.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct AxisMask: u32 {
        const EQU = 1 << 0;
        const IGN = 1 << 1;
        const ABS = 1 << 2;
        const REL = 1 << 3;
        const DIG = 1 << 4;
    }
}

/// A 1-based numeric-column bound. `None` means unbounded on that side.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ColumnRange {
    pub lo: Option<u32>,
    pub hi: Option<u32>,
}

impl ColumnRange {
    /// The unbounded range, matching every column.
    pub const FULL: Self = Self { lo: None, hi: None };

    pub fn contains(&self, col: u32) -> bool {
        self.lo.map_or(true, |lo| col >= lo) && self.hi.map_or(true, |hi| col <= hi)
    }

    pub fn is_full(&self) -> bool {
        self.lo.is_none() && self.hi.is_none()
    }
}

/// A direct value or a register-indirected one — each epsilon field in the
/// original C rule carries both an inline literal and an optional register
/// index; the register, when present, always wins.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Indirect {
    pub value:    f64,
    pub register: Option<usize>,
}

impl Indirect {
    pub const fn literal(value: f64) -> Self {
        Self { value, register: None }
    }

    pub const fn reg(register: usize) -> Self {
        Self { value: 0.0, register: Some(register) }
    }

    /// Resolves through `regs`, falling back to the inline literal.
    pub fn resolve(&self, regs: &crate::registers::RegisterFile) -> f64 {
        match self.register {
            Some(r) => regs.get(r, self.value),
            None    => self.value,
        }
    }
}

/// The epsilon block: tolerance bounds and inline lhs/rhs overrides.
///
/// A lower bound left `None` defaults to the negation of the upper bound,
/// per §4.5 step 9.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Epsilons {
    pub lhs: Indirect,
    pub rhs: Indirect,
    pub scl: Indirect,
    pub off: Indirect,
    pub abs: Indirect,
    pub abs_lo: Option<Indirect>,
    pub rel: Indirect,
    pub rel_lo: Option<Indirect>,
    pub dig: Indirect,
    pub dig_lo: Option<Indirect>,
}

impl Epsilons {
    /// Scale defaults to 1, matching "no scaling" when unset.
    pub fn with_scale(mut self, scl: f64) -> Self {
        self.scl = Indirect::literal(scl);
        self
    }
}

impl Default for Epsilons {
    fn default() -> Self {
        Self {
            lhs:    Indirect::default(),
            rhs:    Indirect::default(),
            scl:    Indirect::literal(1.0),
            off:    Indirect::literal(0.0),
            abs:    Indirect::default(),
            abs_lo: None,
            rel:    Indirect::default(),
            rel_lo: None,
            dig:    Indirect::default(),
            dig_lo: None,
        }
    }
}

/// An immutable tolerance rule, compiled elsewhere and consumed by the
/// engine through a [`Context`](crate::context::Context) (§6).
#[derive(Clone, PartialEq, Debug)]
pub struct Rule {
    pub command: RuleCommand,
    pub columns: ColumnRange,
    pub tag:     String,
    pub eps:     Epsilons,
    pub ops:     Vec<RegOp>,
    /// For a `GONUM` rule only: when set, the search tag is formatted from
    /// this register's value (shortest round-trip decimal) instead of
    /// `tag` at the moment the rule runs.
    pub goto_reg: Option<usize>,
}

impl Rule {
    /// A rule that does nothing: no axis enabled, full column range, no tag.
    pub fn passthrough() -> Self {
        Self {
            command:  RuleCommand::empty(),
            columns:  ColumnRange::FULL,
            tag:      String::new(),
            eps:      Epsilons::default(),
            ops:      Vec::new(),
            goto_reg: None,
        }
    }

    pub fn with_goto_reg(mut self, reg: usize) -> Self {
        self.goto_reg = Some(reg);
        self
    }

    pub fn with_command(mut self, command: RuleCommand) -> Self {
        self.command = command;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_eps(mut self, eps: Epsilons) -> Self {
        self.eps = eps;
        self
    }

    pub fn with_columns(mut self, columns: ColumnRange) -> Self {
        self.columns = columns;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dra_is_union_of_axes() {
        let dra = RuleCommand::DRA;
        assert!(dra.contains(RuleCommand::DIG));
        assert!(dra.contains(RuleCommand::REL));
        assert!(dra.contains(RuleCommand::ABS));
        assert!(!dra.contains(RuleCommand::EQU));
    }

    #[test]
    fn column_range_full_contains_everything() {
        assert!(ColumnRange::FULL.contains(1));
        assert!(ColumnRange::FULL.contains(9999));
        assert!(ColumnRange::FULL.is_full());
    }

    #[test]
    fn column_range_bounds() {
        let r = ColumnRange { lo: Some(2), hi: Some(4) };
        assert!(!r.contains(1));
        assert!(r.contains(2));
        assert!(r.contains(4));
        assert!(!r.contains(5));
    }

    #[test]
    fn indirect_prefers_register() {
        let mut regs = crate::registers::RegisterFile::new(99);
        regs.set(5, 2.5);
        let ind = Indirect::reg(5);
        assert_eq!(ind.resolve(&regs), 2.5);

        let lit = Indirect::literal(9.0);
        assert_eq!(lit.resolve(&regs), 9.0);
    }
}
