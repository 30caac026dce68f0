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

//! Forward seeking: `goto_line` and `goto_num`, the two ways a rule can
//! skip past lines that carry no comparable content (§4.6).

use super::DiffState;
use crate::error::Result;
use crate::number;
use crate::rule::{Rule, RuleCommand};

impl<'ctx> DiffState<'ctx> {
    /// Seeks each side, independently, to the next line containing `rule`'s
    /// tag, then advances `row_i` by the smaller of the two line counts
    /// consumed. Returns `true` if either side hit end of file first.
    pub fn goto_line(&mut self, rule: &Rule) -> bool {
        tracing::trace!(row = self.row_i, "entering goto_line");

        let tag = rule.tag.as_bytes();
        let (lhs_eof, i1) = self.seek_side_to_tag(Side::Lhs, tag);
        let (rhs_eof, i2) = self.seek_side_to_tag(Side::Rhs, tag);

        self.col_i = 0;
        self.row_i += i1.min(i2);
        self.lhs_eof = lhs_eof;
        self.rhs_eof = rhs_eof;
        self.sync_capacity();

        tracing::trace!(row = self.row_i, advanced = (i1, i2), "leaving goto_line");
        lhs_eof || rhs_eof
    }

    fn seek_side_to_tag(&mut self, side: Side, tag: &[u8]) -> (bool, u32) {
        let mut eof = false;
        let mut count = 0u32;
        loop {
            match side {
                Side::Lhs => {
                    self.lhs_buf.clear();
                    self.lhs_i = 0;
                }
                Side::Rhs => {
                    self.rhs_buf.clear();
                    self.rhs_i = 0;
                }
            }
            if eof {
                break;
            }
            eof = match side {
                Side::Lhs => Self::read_one_line(&mut *self.lhs, &mut self.lhs_buf).unwrap_or(true),
                Side::Rhs => Self::read_one_line(&mut *self.rhs, &mut self.rhs_buf).unwrap_or(true),
            };
            count += 1;
            let line = match side {
                Side::Lhs => &self.lhs_buf,
                Side::Rhs => &self.rhs_buf,
            };
            if contains_bytes(line, tag) {
                break;
            }
        }
        (eof, count)
    }

    /// Seeks each side, independently, to the next line whose number at a
    /// rule-eligible column matches the rule's tag (formatted from
    /// `goto_reg` when set), reusing [`Self::next_num`]/[`Self::test_num`]
    /// with one side's buffer temporarily repurposed to hold the tag text.
    /// Delegates to [`Self::goto_line`] when the rule requires byte-exact
    /// matching over an unrestricted column range, where a plain text
    /// search is equivalent and cheaper.
    ///
    /// Errs if a rule-driven mismatch along the way escalates through
    /// [`Context::on_fail`](crate::context::Context::on_fail).
    pub fn goto_num(&mut self, rule: &Rule) -> Result<bool> {
        tracing::trace!(row = self.row_i, "entering goto_num");

        let tag_text = match rule.goto_reg {
            Some(r) => format!("{}", self.regs.get(r, 0.0)),
            None => rule.tag.clone(),
        };

        if rule.command.contains(RuleCommand::EQU) && rule.columns.is_full() {
            let mut probe = rule.clone();
            probe.tag = tag_text;
            return Ok(self.goto_line(&probe));
        }

        let mut probe = rule.clone();
        probe.tag = tag_text.clone();

        let saved_rhs = std::mem::replace(&mut self.rhs_buf, tag_text.clone().into_bytes());
        let (lhs_eof, i1) = self.seek_num_match(Side::Lhs, &probe)?;

        let last_lhs_line = std::mem::replace(&mut self.lhs_buf, tag_text.into_bytes());
        let mut probe_swapped = probe.clone();
        probe_swapped.command |= RuleCommand::SWAP;
        let (rhs_eof, i2) = self.seek_num_match(Side::Rhs, &probe_swapped)?;

        self.lhs_buf = last_lhs_line;
        self.rhs_buf = saved_rhs;
        self.lhs_i = 0;
        self.rhs_i = 0;
        self.col_i = 0;
        self.row_i += i1.min(i2);
        self.lhs_eof = lhs_eof;
        self.rhs_eof = rhs_eof;
        self.sync_capacity();

        tracing::trace!(row = self.row_i, advanced = (i1, i2), "leaving goto_num");
        Ok(lhs_eof || rhs_eof)
    }

    /// Reads lines on `search_side` until a number at an eligible column
    /// tests equal to the probe rule's (fixed) counterpart, or EOF.
    fn seek_num_match(&mut self, search_side: Side, probe: &Rule) -> Result<(bool, u32)> {
        let mut eof = false;
        let mut count = 0u32;
        let mut found = false;

        loop {
            match search_side {
                Side::Lhs => {
                    self.lhs_buf.clear();
                    self.lhs_i = 0;
                }
                Side::Rhs => {
                    self.rhs_buf.clear();
                    self.rhs_i = 0;
                }
            }
            if eof {
                break;
            }
            eof = match search_side {
                Side::Lhs => Self::read_one_line(&mut *self.lhs, &mut self.lhs_buf).unwrap_or(true),
                Side::Rhs => Self::read_one_line(&mut *self.rhs, &mut self.rhs_buf).unwrap_or(true),
            };
            count += 1;

            match search_side {
                Side::Lhs => self.rhs_i = 0,
                Side::Rhs => self.lhs_i = 0,
            }

            loop {
                let col = self.next_num(probe)?;
                if col == 0 {
                    break;
                }
                if probe.columns.contains(col) {
                    if self.test_num(probe)?.is_empty() {
                        found = true;
                        break;
                    }
                } else {
                    match search_side {
                        Side::Lhs => {
                            let p = self.lhs_i;
                            let lit = number::parse_number(&mut self.lhs_buf[p..]);
                            self.lhs_i = p + lit.len.max(1);
                        }
                        Side::Rhs => {
                            let p = self.rhs_i;
                            let lit = number::parse_number(&mut self.rhs_buf[p..]);
                            self.rhs_i = p + lit.len.max(1);
                        }
                    }
                }
                match search_side {
                    Side::Lhs => self.rhs_i = 0,
                    Side::Rhs => self.lhs_i = 0,
                }
            }
            if found {
                break;
            }
        }
        Ok((eof, count))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Side {
    Lhs,
    Rhs,
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    if needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}
