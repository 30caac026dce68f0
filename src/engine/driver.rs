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

//! The driver loop tying the other primitives together, row by row, the
//! `run` of §6 (named to avoid shadowing the `loop` keyword).

use std::io::Write;

use super::DiffState;
use crate::error::{Error, Result};
use crate::rule::{Rule, RuleCommand};

/// Summary returned by [`DiffState::run`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct RunOutcome {
    /// Number of rows at which at least one enabled axis failed.
    pub diff_lines: u32,
}

impl<'ctx> DiffState<'ctx> {
    /// Drives the comparison to completion, writing lines that passed every
    /// active rule to `lhs_out`/`rhs_out` when given.
    ///
    /// Returns [`Error::NoRule`] if the context has no rule for a reached
    /// `(row, col)`, or [`Error::DualLookupMismatch`] under `check` mode
    /// when `get_inc` and `get_at` disagree.
    pub fn run(
        &mut self,
        mut lhs_out: Option<&mut dyn Write>,
        mut rhs_out: Option<&mut dyn Write>,
    ) -> Result<RunOutcome> {
        let mut diff_lines = 0u32;

        while !self.is_eof(false) {
            let lookup_row = self.row_i + 1;
            let mut rule = self.lookup_rule(lookup_row, 0)?;
            let mut row_failed = false;
            let mut trace_guard = TraceGuard::for_rule(&rule);

            if rule.command.contains(RuleCommand::SKIP) {
                self.skip_line()?;
                continue;
            }

            if rule.command.contains(RuleCommand::TRACE) && rule.command.contains(RuleCommand::SGG) {
                self.trace_active_rule(&rule);
            }

            let mut have_line = true;
            if rule.command.contains(RuleCommand::GOTO) {
                self.goto_line(&rule);
            } else if rule.command.contains(RuleCommand::GONUM) {
                self.goto_num(&rule)?;
            } else {
                self.read_line()?;
                have_line = !self.is_empty();
            }

            if have_line {
                loop {
                    let col = self.next_num(&rule)?;
                    if col == 0 {
                        break;
                    }

                    let fresh = self.lookup_rule(self.row_i, col)?;
                    if fresh.command.contains(RuleCommand::SGG) {
                        break;
                    }
                    rule = fresh;

                    if trace_guard.is_none() {
                        trace_guard = TraceGuard::for_rule(&rule);
                    }

                    if rule.command.contains(RuleCommand::TRACE) {
                        self.trace_active_rule(&rule);
                    }

                    if !self.test_num(&rule)?.is_empty() {
                        row_failed = true;
                    }
                }
            }

            drop(trace_guard);

            if row_failed {
                diff_lines += 1;
            } else {
                self.out_line(lhs_out.as_deref_mut(), rhs_out.as_deref_mut())?;
            }
        }

        Ok(RunOutcome { diff_lines })
    }

    fn lookup_rule(&mut self, row: u32, col: u32) -> Result<Rule> {
        let inc = self.ctx.get_inc(row, col).ok_or(Error::NoRule { row, col })?;

        if self.options.check {
            let at = self.ctx.get_at(row, col);
            let agrees = matches!(at, Some(at_rule) if std::ptr::eq(inc, at_rule));
            if !agrees {
                let inc_idx = self.ctx.find_idx(inc);
                let at_idx = at.and_then(|r| self.ctx.find_idx(r));
                return Err(Error::DualLookupMismatch { row, col, inc_idx, at_idx });
            }
        }

        Ok(inc.clone())
    }

    fn trace_active_rule(&self, rule: &Rule) {
        tracing::trace!(
            rule = ?self.ctx.find_idx(rule),
            defined_at_line = ?self.ctx.find_line(rule),
            command = ?rule.command,
            "rule activated"
        );
    }
}

/// Raises the effective `tracing` level to `TRACE` for the scope of one
/// driver-loop row, when the active rule carries `TRACE`/`TRACE_R`.
/// Restores the previous subscriber on drop.
struct TraceGuard {
    _guard: tracing::subscriber::DefaultGuard,
}

impl TraceGuard {
    fn for_rule(rule: &Rule) -> Option<Self> {
        if !rule.command.intersects(RuleCommand::TRACE | RuleCommand::TRACE_R) {
            return None;
        }
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_target(false)
            .without_time()
            .finish();
        Some(Self { _guard: tracing::subscriber::set_default(subscriber) })
    }
}
