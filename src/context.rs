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

//! The rule context: the collaborator the engine consults by `(row, col)`
//! but never parses or compiles itself (§6). A full rule-file grammar is
//! explicitly out of scope; [`UniformContext`] and [`TableContext`] are the
//! minimal concrete shapes needed to drive the engine without one.

use std::io::{self, Write};

use crate::error::Result;
use crate::rule::Rule;

/// Rule lookup table consumed by the engine.
///
/// `get_inc` and `get_at` may legitimately return the same rule for every
/// call (as [`UniformContext`] does); the engine distinguishes them only to
/// support the `check` option's redundant dual lookup (§4.7 step 2).
pub trait Context {
    /// Rule active *entering* `(row, col)`.
    fn get_inc(&self, row: u32, col: u32) -> Option<&Rule>;

    /// Rule active *at* `(row, col)`, used only to cross-check `get_inc`
    /// under the `check` option. Implementations that have no independent
    /// second lookup path may simply delegate to `get_inc`.
    fn get_at(&self, row: u32, col: u32) -> Option<&Rule> {
        self.get_inc(row, col)
    }

    /// Index of `rule` among this context's known rules, for diagnostics.
    fn find_idx(&self, rule: &Rule) -> Option<usize>;

    /// Source line of `rule`'s definition, for diagnostics.
    fn find_line(&self, rule: &Rule) -> Option<u32>;

    /// Called when a rule with `ONFAIL` set reports a violation. May mutate
    /// the context's own state (e.g. activate a fallback rule for the next
    /// lookup), or escalate by returning a fatal [`Error`](crate::error::Error),
    /// which the driver loop propagates and aborts the comparison on; must
    /// never re-enter the engine.
    fn on_fail(&mut self, _rule: &Rule) -> Result<()> {
        Ok(())
    }

    /// Writes a human-readable listing of this context's rules, the `print`
    /// of §6, used in `check`-mode fatal diagnostics.
    fn fmt_rules(&self, w: &mut dyn Write) -> io::Result<()>;
}

/// A context that applies one [`Rule`] to every row and column.
///
/// This is the context the CLI builds from its tolerance flags: it has no
/// notion of per-line overrides, only a single constraint applied uniformly.
#[derive(Clone, Debug)]
pub struct UniformContext {
    rule: Rule,
}

impl UniformContext {
    pub fn new(rule: Rule) -> Self {
        Self { rule }
    }
}

impl Context for UniformContext {
    fn get_inc(&self, _row: u32, _col: u32) -> Option<&Rule> {
        Some(&self.rule)
    }

    fn find_idx(&self, rule: &Rule) -> Option<usize> {
        std::ptr::eq(rule, &self.rule).then_some(0)
    }

    fn find_line(&self, _rule: &Rule) -> Option<u32> {
        None
    }

    fn fmt_rules(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "[0] {:?}", self.rule.command)
    }
}

/// A context keyed by 1-based row number, falling back to a default rule
/// for rows with no explicit override. Column ranges within a row's rule
/// (`Rule::columns`) are consulted by the engine itself, not by the lookup.
#[derive(Clone, Debug)]
pub struct TableContext {
    default: Rule,
    rows:    Vec<(u32, Rule)>,
}

impl TableContext {
    pub fn new(default: Rule) -> Self {
        Self { default, rows: Vec::new() }
    }

    /// Registers `rule` as active starting at `row` (and every row after,
    /// until a later override), mirroring a compiled rule file's "this rule
    /// governs from line N onward" semantics.
    pub fn set_row(mut self, row: u32, rule: Rule) -> Self {
        self.rows.push((row, rule));
        self.rows.sort_by_key(|(r, _)| *r);
        self
    }

    fn rule_for_row(&self, row: u32) -> &Rule {
        self.rows
            .iter()
            .rev()
            .find(|(r, _)| *r <= row)
            .map(|(_, rule)| rule)
            .unwrap_or(&self.default)
    }
}

impl Context for TableContext {
    fn get_inc(&self, row: u32, col: u32) -> Option<&Rule> {
        let rule = self.rule_for_row(row);
        if rule.columns.contains(col.max(1)) || col == 0 {
            Some(rule)
        } else {
            Some(&self.default)
        }
    }

    fn find_idx(&self, rule: &Rule) -> Option<usize> {
        self.rows
            .iter()
            .position(|(_, r)| std::ptr::eq(r, rule))
            .map(|i| i + 1)
            .or_else(|| std::ptr::eq(rule, &self.default).then_some(0))
    }

    fn find_line(&self, rule: &Rule) -> Option<u32> {
        self.rows
            .iter()
            .find(|(_, r)| std::ptr::eq(r, rule))
            .map(|(row, _)| *row)
    }

    fn fmt_rules(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "[0] default: {:?}", self.default.command)?;
        for (row, rule) in &self.rows {
            writeln!(w, "[{row}] {:?}", rule.command)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleCommand;

    #[test]
    fn uniform_context_returns_same_rule_everywhere() {
        let ctx = UniformContext::new(Rule::passthrough().with_command(RuleCommand::ABS));
        let a = ctx.get_inc(1, 1).unwrap();
        let b = ctx.get_inc(500, 3).unwrap();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn table_context_falls_back_to_default_before_any_row() {
        let ctx = TableContext::new(Rule::passthrough())
            .set_row(10, Rule::passthrough().with_command(RuleCommand::EQU));
        let rule = ctx.get_inc(1, 1).unwrap();
        assert_eq!(rule.command, RuleCommand::empty());
    }

    #[test]
    fn table_context_picks_latest_applicable_row() {
        let ctx = TableContext::new(Rule::passthrough())
            .set_row(10, Rule::passthrough().with_command(RuleCommand::EQU))
            .set_row(20, Rule::passthrough().with_command(RuleCommand::ABS));
        assert_eq!(ctx.get_inc(15, 1).unwrap().command, RuleCommand::EQU);
        assert_eq!(ctx.get_inc(25, 1).unwrap().command, RuleCommand::ABS);
    }
}
