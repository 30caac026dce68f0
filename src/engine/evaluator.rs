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

//! The tolerance evaluator: parses the numeral pair at the current cursors
//! and judges it against a rule's enabled axes, the `test_num` of §4.5.

use super::DiffState;
use crate::error::Result;
use crate::number;
use crate::registers::RegisterFile;
use crate::rule::{AxisMask, Indirect, Rule, RuleCommand};

impl<'ctx> DiffState<'ctx> {
    /// Parses and judges the numeral pair at the current cursors, then
    /// advances both cursors past them.
    ///
    /// Returns the axes that failed; empty means the pair passed, was
    /// ignored (`IGN`), or was excused (`OMIT`). Registers 1-9 are
    /// refreshed whenever the pair passes or `SAVE` is set, matching §4.5
    /// step 11; a rule's op program runs under the same condition.
    ///
    /// Errs if the rule's `ONFAIL` hook escalates the failure through
    /// [`Context::on_fail`](crate::context::Context::on_fail).
    pub fn test_num(&mut self, rule: &Rule) -> Result<AxisMask> {
        tracing::trace!(row = self.row_i, col = self.col_i, "entering test_num");

        let lhs_p = self.lhs_i;
        let rhs_p = self.rhs_i;

        let lit1 = number::parse_number(&mut self.lhs_buf[lhs_p..]);
        let lit2 = number::parse_number(&mut self.rhs_buf[rhs_p..]);
        let l1 = lit1.len;
        let l2 = lit2.len;
        let max_digits = lit1.digits.max(lit2.digits);

        let mut ret = AxisMask::empty();
        let mut lhs_d = 0.0f64;
        let mut rhs_d = 0.0f64;
        let mut dif_d = 0.0f64;
        let mut err_d = 0.0f64;
        let mut abs_err = 0.0f64;
        let mut rel_err = 0.0f64;
        let mut dig_err = 0.0f64;
        let mut min_d = 0.0f64;
        let mut pow_d = 0.0f64;
        let mut abs_lo = 0.0f64;
        let mut abs_hi = 0.0f64;
        let mut rel_lo = 0.0f64;
        let mut rel_hi = 0.0f64;
        let mut dig_lo = 0.0f64;
        let mut dig_hi = 0.0f64;
        let mut parsed_lhs = 0.0f64;
        let mut parsed_rhs = 0.0f64;

        if l1 == 0 || l2 == 0 {
            let missing_is_ignorable = rule.command.contains(RuleCommand::IGN | RuleCommand::ISTR);
            if !missing_is_ignorable {
                ret |= AxisMask::IGN;
            }
        } else {
            parsed_lhs = parse_literal_value(&self.lhs_buf[lhs_p..lhs_p + l1]);
            parsed_rhs = parse_literal_value(&self.rhs_buf[rhs_p..rhs_p + l2]);

            lhs_d = resolve_operand(&rule.eps.lhs, rule.command.contains(RuleCommand::LHS), &self.regs, parsed_lhs);
            rhs_d = resolve_operand(&rule.eps.rhs, rule.command.contains(RuleCommand::RHS), &self.regs, parsed_rhs);

            let scl_d = rule.eps.scl.resolve(&self.regs);
            let off_d = rule.eps.off.resolve(&self.regs);

            min_d = lhs_d.abs().min(rhs_d.abs());
            if !(min_d > 0.0) {
                min_d = 1.0;
            }
            pow_d = 10f64.powi(-(max_digits as i32));

            if rule.command.contains(RuleCommand::SWAP) {
                std::mem::swap(&mut lhs_d, &mut rhs_d);
            }

            dif_d = lhs_d - rhs_d;
            err_d = scl_d * dif_d;
            abs_err = err_d + off_d;
            rel_err = abs_err / min_d;
            dig_err = abs_err / (min_d * pow_d);

            tracing::trace!(abs_err, rel_err, ndig = max_digits, "test_num computed errors");

            if rule.command.contains(RuleCommand::IGN) {
                // unconditionally ignored, ret stays empty
            } else if rule.command.contains(RuleCommand::OMIT)
                && DiffState::is_valid_omit(&self.lhs_buf, &self.rhs_buf, lhs_p, rhs_p, &rule.tag)
            {
                // excused by the tag preceding both sides, ret stays empty
            } else if rule.command.contains(RuleCommand::EQU) {
                if l1 != l2 || self.lhs_buf[lhs_p..lhs_p + l1] != self.rhs_buf[rhs_p..rhs_p + l2] {
                    ret |= AxisMask::EQU;
                }
            } else {
                if rule.command.contains(RuleCommand::ABS) {
                    abs_hi = rule.eps.abs.resolve(&self.regs);
                    abs_lo = resolve_lower(&rule.eps.abs_lo, &self.regs, abs_hi);
                    if abs_err > abs_hi || abs_err < abs_lo {
                        ret |= AxisMask::ABS;
                    }
                }
                if rule.command.contains(RuleCommand::REL) {
                    rel_hi = rule.eps.rel.resolve(&self.regs);
                    rel_lo = resolve_lower(&rule.eps.rel_lo, &self.regs, rel_hi);
                    if rel_err > rel_hi || rel_err < rel_lo {
                        ret |= AxisMask::REL;
                    }
                }
                if rule.command.contains(RuleCommand::DIG) && (lit1.is_real || lit2.is_real) {
                    dig_hi = rule.eps.dig.resolve(&self.regs);
                    dig_lo = resolve_lower(&rule.eps.dig_lo, &self.regs, dig_hi);
                    if dig_err > dig_hi || dig_err < dig_lo {
                        ret |= AxisMask::DIG;
                    }
                }

                if rule.command.contains(RuleCommand::ANY) {
                    let enabled = enabled_axes(rule.command);
                    if (ret.bits() & enabled.bits()) != enabled.bits() {
                        ret = AxisMask::empty();
                    }
                }
            }
        }

        if !ret.is_empty() {
            self.report_num_mismatch(
                rule, lhs_p, rhs_p, l1, l2, ret,
                abs_lo, abs_hi, rel_lo, rel_hi, dig_lo, dig_hi,
                abs_err, rel_err, max_digits, pow_d,
            );
            if rule.command.contains(RuleCommand::ONFAIL) {
                self.ctx.on_fail(rule)?;
            }
        }

        if ret.is_empty() || rule.command.contains(RuleCommand::SAVE) {
            // Registers 1/2 always hold the as-written textual numbers,
            // independent of any LHS/RHS inline override used for the
            // comparison itself; SWAP reorders which physical side maps to
            // which register without re-applying the arithmetic swap above.
            let (save_lhs, save_rhs) = if rule.command.contains(RuleCommand::SWAP) {
                (parsed_rhs, parsed_lhs)
            } else {
                (parsed_lhs, parsed_rhs)
            };
            self.regs.save_post_test(save_lhs, save_rhs, dif_d, err_d, abs_err, rel_err, dig_err, min_d, pow_d);

            if rule.command.contains(RuleCommand::TRACE_R) {
                tracing::trace!(
                    abs_hi, abs_lo, rel_hi, rel_lo, dig_hi, dig_lo,
                    "post-test register snapshot before op program"
                );
            }
            for op in &rule.ops {
                self.regs.eval(*op);
            }
        }

        self.lhs_i = lhs_p + l1;
        self.rhs_i = rhs_p + l2;

        tracing::trace!(row = self.row_i, col = self.col_i, "leaving test_num");
        Ok(ret)
    }

    #[allow(clippy::too_many_arguments)]
    fn report_num_mismatch(
        &mut self,
        rule: &Rule,
        lhs_p: usize,
        rhs_p: usize,
        l1: usize,
        l2: usize,
        ret: AxisMask,
        abs_lo: f64,
        abs_hi: f64,
        rel_lo: f64,
        rel_hi: f64,
        dig_lo: f64,
        dig_hi: f64,
        abs_err: f64,
        rel_err: f64,
        max_digits: u32,
        pow_d: f64,
    ) {
        if rule.command.contains(RuleCommand::NOFAIL) {
            return;
        }
        self.cnt_i += 1;
        if self.cnt_i > self.options.max_diffs {
            return;
        }
        self.report_header_once();

        let lhs_num = String::from_utf8_lossy(&self.lhs_buf[lhs_p..lhs_p + l1]).into_owned();
        let rhs_num = String::from_utf8_lossy(&self.rhs_buf[rhs_p..rhs_p + l2]).into_owned();

        tracing::warn!(
            "({}) files differ at line {} column {} between char-columns {}|{} and {}|{}",
            self.cnt_i, self.row_i, self.col_i, lhs_p + 1, rhs_p + 1, lhs_p + 1 + l1, rhs_p + 1 + l2
        );
        tracing::warn!("({}) numbers: '{}'|'{}'", self.cnt_i, lhs_num, rhs_num);

        if ret.contains(AxisMask::IGN) {
            tracing::warn!("({}) one number is missing (column count can be wrong)", self.cnt_i);
        }
        if ret.contains(AxisMask::EQU) {
            tracing::warn!("({}) numbers strict representation differ", self.cnt_i);
        }

        let idx = self.ctx.find_idx(rule);
        let line = self.ctx.find_line(rule);

        if ret.contains(AxisMask::ABS) {
            tracing::warn!(
                "({}) absolute error (rule #{:?}, line {:?}: {:.2e}<=abs<={:.2e}) abs={:.2e}, rel={:.2e}, ndig={}",
                self.cnt_i, idx, line, abs_lo, abs_hi, abs_err, rel_err, max_digits
            );
        }
        if ret.contains(AxisMask::REL) {
            tracing::warn!(
                "({}) relative error (rule #{:?}, line {:?}: {:.2e}<=rel<={:.2e}) abs={:.2e}, rel={:.2e}, ndig={}",
                self.cnt_i, idx, line, rel_lo, rel_hi, abs_err, rel_err, max_digits
            );
        }
        if ret.contains(AxisMask::DIG) {
            tracing::warn!(
                "({}) numdigit error (rule #{:?}, line {:?}: {:.2e}<=rel<={:.2e}) abs={:.2e}, rel={:.2e}, ndig={}",
                self.cnt_i, idx, line, dig_lo * pow_d, dig_hi * pow_d, abs_err, rel_err, max_digits
            );
        }
    }
}

fn parse_literal_value(bytes: &[u8]) -> f64 {
    let s = std::str::from_utf8(bytes).unwrap_or_default();
    let value = s.parse().unwrap_or(0.0);

    // std's float parser only succeeds by consuming the whole string, so a
    // failed parse here means the lexer reported a span the parser doesn't
    // actually agree spans one complete numeral.
    #[cfg(debug_assertions)]
    {
        let parsed_len = s.parse::<f64>().map(|_| s.len()).unwrap_or(0);
        debug_assert_eq!(parsed_len, bytes.len(), "lexer/parser length mismatch on {s:?}");
    }

    value
}

/// `reg_getval`: a register, if bound, always wins; otherwise `override_literal`
/// selects between the rule's inline value and the text actually parsed.
fn resolve_operand(ind: &Indirect, override_literal: bool, regs: &RegisterFile, parsed: f64) -> f64 {
    let fallback = if override_literal { ind.value } else { parsed };
    match ind.register {
        Some(r) => regs.get(r, fallback),
        None => fallback,
    }
}

/// A lower bound left unset (`None`) defaults to the negation of the upper
/// bound, per the rule's documented invariant.
fn resolve_lower(lo: &Option<Indirect>, regs: &RegisterFile, hi: f64) -> f64 {
    lo.as_ref().map(|ind| ind.resolve(regs)).unwrap_or(-hi)
}

fn enabled_axes(command: RuleCommand) -> AxisMask {
    let mut m = AxisMask::empty();
    if command.contains(RuleCommand::ABS) {
        m |= AxisMask::ABS;
    }
    if command.contains(RuleCommand::REL) {
        m |= AxisMask::REL;
    }
    if command.contains(RuleCommand::DIG) {
        m |= AxisMask::DIG;
    }
    m
}
