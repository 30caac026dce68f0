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

//! The number scanner: walks both lines in lockstep looking for the next
//! pair of aligned numeric literals, the `next_num` of §4.4.

use super::DiffState;
use crate::error::Result;
use crate::number;
use crate::rule::{Rule, RuleCommand};

impl<'ctx> DiffState<'ctx> {
    /// Advances both cursors to the next pair of aligned numeric literals.
    ///
    /// Returns the 1-based number-column reached, or `0` once both lines
    /// are exhausted or a non-numeric text mismatch ends the line early.
    /// Either way `col_i` is reset to `0` on a `0` return, matching the
    /// per-line column count restarting on the next `read_line`.
    ///
    /// Unlike the original this function, on encountering a text mismatch
    /// or reaching end-of-line, leaves the cursors exactly at the position
    /// reached rather than one byte past it — the offset is discarded by
    /// the next line load regardless, so there is nothing for the extra
    /// step to preserve.
    ///
    /// Errs if a text mismatch's rule's `ONFAIL` hook escalates, via
    /// [`Context::on_fail`](crate::context::Context::on_fail).
    pub fn next_num(&mut self, rule: &Rule) -> Result<u32> {
        tracing::trace!(
            row = self.row_i, col = self.col_i, lhs_i = self.lhs_i, rhs_i = self.rhs_i,
            "entering next_num"
        );

        if self.is_empty() {
            self.col_i = 0;
            return Ok(0);
        }

        let mut lhs_p = self.lhs_i;
        let mut rhs_p = self.rhs_i;
        let keep = self.options.keep_chars.clone();
        let istr = rule.command.contains(RuleCommand::ISTR);

        loop {
            if istr {
                while lhs_p < self.lhs_buf.len() && !self.lhs_buf[lhs_p].is_ascii_digit() {
                    lhs_p += 1;
                }
                while rhs_p < self.rhs_buf.len() && !self.rhs_buf[rhs_p].is_ascii_digit() {
                    rhs_p += 1;
                }
            } else {
                while lhs_p < self.lhs_buf.len()
                    && rhs_p < self.rhs_buf.len()
                    && self.lhs_buf[lhs_p] == self.rhs_buf[rhs_p]
                    && !self.lhs_buf[lhs_p].is_ascii_digit()
                {
                    lhs_p += 1;
                    rhs_p += 1;
                }

                let lhs_blank = matches!(self.lhs_buf.get(lhs_p), Some(b' ' | b'\t'));
                let rhs_blank = matches!(self.rhs_buf.get(rhs_p), Some(b' ' | b'\t'));
                if self.options.blank && (lhs_blank || rhs_blank) {
                    while matches!(self.lhs_buf.get(lhs_p), Some(b' ' | b'\t')) {
                        lhs_p += 1;
                    }
                    while matches!(self.rhs_buf.get(rhs_p), Some(b' ' | b'\t')) {
                        rhs_p += 1;
                    }
                    continue;
                }
            }

            let lhs_end = lhs_p >= self.lhs_buf.len();
            let rhs_end = rhs_p >= self.rhs_buf.len();

            if lhs_end && rhs_end {
                self.lhs_i = lhs_p;
                self.rhs_i = rhs_p;
                self.col_i = 0;
                return Ok(0);
            }

            let lhs_byte = self.lhs_buf.get(lhs_p).copied();
            let rhs_byte = self.rhs_buf.get(rhs_p).copied();

            let both_numeric = number::is_number_shape(&self.lhs_buf[lhs_p..])
                && number::is_number_shape(&self.rhs_buf[rhs_p..]);

            if lhs_byte != rhs_byte && !both_numeric {
                self.lhs_i = lhs_p + 1;
                self.rhs_i = rhs_p + 1;
                self.report_text_mismatch(rule, lhs_p, rhs_p)?;
                self.col_i = 0;
                return Ok(0);
            }

            lhs_p = number::backtrack_number(&self.lhs_buf, lhs_p, 0);
            rhs_p = number::backtrack_number(&self.rhs_buf, rhs_p, 0);

            tracing::trace!(lhs_p, rhs_p, "backtracked to candidate number start");

            let lhs_start = number::is_number_start(&self.lhs_buf, lhs_p, 0, &keep);
            let rhs_start = number::is_number_start(&self.rhs_buf, rhs_p, 0, &keep);

            if !lhs_start || !rhs_start {
                if istr {
                    if !lhs_start {
                        lhs_p = skip_to_separator(&self.lhs_buf, lhs_p, &keep);
                    }
                    if !rhs_start {
                        rhs_p = skip_to_separator(&self.rhs_buf, rhs_p, &keep);
                    }
                } else {
                    let strict = !rule.command.contains(RuleCommand::OMIT)
                        || !DiffState::is_valid_omit(&self.lhs_buf, &self.rhs_buf, lhs_p, rhs_p, &rule.tag);

                    if strict {
                        while lhs_p < self.lhs_buf.len()
                            && rhs_p < self.rhs_buf.len()
                            && self.lhs_buf[lhs_p] == self.rhs_buf[rhs_p]
                            && !number::is_separator(Some(self.lhs_buf[lhs_p]), &keep)
                        {
                            lhs_p += 1;
                            rhs_p += 1;
                        }
                    } else {
                        lhs_p = skip_to_separator(&self.lhs_buf, lhs_p, &keep);
                        rhs_p = skip_to_separator(&self.rhs_buf, rhs_p, &keep);
                    }
                }
                continue;
            }

            self.lhs_i = lhs_p;
            self.rhs_i = rhs_p;
            self.num_i += 1;
            self.col_i += 1;

            tracing::trace!(row = self.row_i, col = self.col_i, "leaving next_num");
            return Ok(self.col_i);
        }
    }

    fn report_text_mismatch(&mut self, rule: &Rule, lhs_p: usize, rhs_p: usize) -> Result<()> {
        if !rule.command.contains(RuleCommand::NOFAIL) {
            self.cnt_i += 1;
            if self.cnt_i <= self.options.max_diffs {
                self.report_header_once();
                let lhs_show = String::from_utf8_lossy(&self.lhs_buf[lhs_p..]);
                let rhs_show = String::from_utf8_lossy(&self.rhs_buf[rhs_p..]);
                tracing::warn!(
                    "({}) files differ at line {} and char-columns {}|{}",
                    self.cnt_i, self.row_i, self.lhs_i, self.rhs_i
                );
                tracing::warn!("({}) strings: '{:.25}'|'{:.25}'", self.cnt_i, lhs_show, rhs_show);
            }
        }
        if rule.command.contains(RuleCommand::ONFAIL) {
            self.ctx.on_fail(rule)?;
        }
        Ok(())
    }
}

/// Advances `pos` to the next separator, the loose half of `skip_identifier`.
fn skip_to_separator(buf: &[u8], mut pos: usize, keep: &[u8]) -> usize {
    while pos < buf.len() && !number::is_separator(Some(buf[pos]), keep) {
        pos += 1;
    }
    pos
}
