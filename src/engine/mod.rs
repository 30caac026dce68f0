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

//! The comparison engine: [`DiffState`] and the buffer-pair / line-reader
//! primitives of §4.3. The harder primitives — the number scanner, the
//! tolerance evaluator, and the navigator — live in the sibling modules
//! and are implemented as further `impl DiffState` blocks.

mod driver;
mod evaluator;
mod navigator;
mod scanner;

pub use driver::RunOutcome;

use std::io::{self, BufRead, Write};

use crate::context::Context;
use crate::error::Result;
use crate::options::Options;
use crate::registers::RegisterFile;

/// Minimum initial buffer capacity, matching the C original's `min_alloc`.
const MIN_BUF: usize = 64 * 1024;

/// Snapshot of a [`DiffState`]'s position, the `getInfo` of §6.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DiffInfo {
    pub row: u32,
    pub col: u32,
    pub cnt: u32,
    pub num: u64,
}

/// A numerically-tolerant comparison in progress.
///
/// Owns its two input streams and its scratch buffers/registers exclusively;
/// borrows the [`Context`] mutably for its whole lifetime, since a rule's
/// `on_fail` hook may need to mutate context state mid-comparison.
pub struct DiffState<'ctx> {
    lhs: Box<dyn BufRead>,
    rhs: Box<dyn BufRead>,

    lhs_buf: Vec<u8>,
    rhs_buf: Vec<u8>,
    lhs_i:   usize,
    rhs_i:   usize,

    row_i: u32,
    col_i: u32,
    num_i: u64,
    cnt_i: u32,

    options: Options,
    regs:    RegisterFile,
    ctx:     &'ctx mut dyn Context,

    lhs_label: String,
    rhs_label: String,
    test_label: Option<String>,

    lhs_eof: bool,
    rhs_eof: bool,

    target_cap: usize,
}

impl<'ctx> DiffState<'ctx> {
    /// Creates a comparison over `lhs`/`rhs`, consulting `ctx` for rules.
    /// `lhs_label`/`rhs_label` name the two sides for diagnostics (typically
    /// file paths); `buf_hint`/`reg_hint` seed initial capacity.
    pub fn new(
        lhs: impl BufRead + 'static,
        rhs: impl BufRead + 'static,
        ctx: &'ctx mut dyn Context,
        lhs_label: impl Into<String>,
        rhs_label: impl Into<String>,
        buf_hint: usize,
        reg_hint: usize,
    ) -> Self {
        let target_cap = buf_hint.max(MIN_BUF);
        Self {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            lhs_buf: Vec::with_capacity(target_cap),
            rhs_buf: Vec::with_capacity(target_cap),
            lhs_i: 0,
            rhs_i: 0,
            row_i: 0,
            col_i: 0,
            num_i: 0,
            cnt_i: 0,
            options: Options::default(),
            regs: RegisterFile::new(reg_hint),
            ctx,
            lhs_label: lhs_label.into(),
            rhs_label: rhs_label.into(),
            test_label: None,
            lhs_eof: false,
            rhs_eof: false,
            target_cap,
        }
    }

    /// Sets the `--test <label>` annotation used in the header diagnostic.
    pub fn with_test_label(mut self, label: impl Into<String>) -> Self {
        self.test_label = Some(label.into());
        self
    }

    /// Applies comparison-wide knobs, validating them first (§6 `option`).
    pub fn set_options(&mut self, options: Options) -> Result<()> {
        self.options = options.validated()?;
        Ok(())
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Current position snapshot (`getInfo`).
    pub fn info(&self) -> DiffInfo {
        DiffInfo { row: self.row_i, col: self.col_i, cnt: self.cnt_i, num: self.num_i }
    }

    /// True iff either side (or, if `require_both`, both sides) has reached
    /// end of input.
    pub fn is_eof(&self, require_both: bool) -> bool {
        if require_both {
            self.lhs_eof && self.rhs_eof
        } else {
            self.lhs_eof || self.rhs_eof
        }
    }

    /// True iff both cursors sit at end-of-line in the current buffers.
    pub fn is_empty(&self) -> bool {
        self.lhs_i >= self.lhs_buf.len() && self.rhs_i >= self.rhs_buf.len()
    }

    /// Resets all comparison state (buffers, cursors, counters, registers)
    /// except the streams, context reference, and options.
    pub fn clear(&mut self) {
        self.lhs_buf.clear();
        self.rhs_buf.clear();
        self.lhs_buf.shrink_to_fit();
        self.rhs_buf.shrink_to_fit();
        self.lhs_i = 0;
        self.rhs_i = 0;
        self.row_i = 0;
        self.col_i = 0;
        self.num_i = 0;
        self.cnt_i = 0;
        self.lhs_eof = false;
        self.rhs_eof = false;
        self.regs.reset();
        self.target_cap = MIN_BUF;
    }

    fn reset_buf(&mut self) {
        self.lhs_buf.clear();
        self.rhs_buf.clear();
        self.lhs_i = 0;
        self.rhs_i = 0;
    }

    /// Keeps both buffers' reserved capacity at `target_cap`, doubling it
    /// first if either side's content already exceeds it (§3 invariant 5).
    fn sync_capacity(&mut self) {
        let needed = self.lhs_buf.len().max(self.rhs_buf.len());
        while self.target_cap < needed {
            self.target_cap *= 2;
        }
        self.lhs_buf.reserve(self.target_cap.saturating_sub(self.lhs_buf.capacity()));
        self.rhs_buf.reserve(self.target_cap.saturating_sub(self.rhs_buf.capacity()));
    }

    /// Reads one line (sans terminator) from `r` into `buf`, appending.
    /// Returns `true` at end of file with nothing read.
    fn read_one_line(r: &mut dyn BufRead, buf: &mut Vec<u8>) -> io::Result<bool> {
        let start = buf.len();
        let n = r.read_until(b'\n', buf)?;
        if n == 0 {
            return Ok(true);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        let _ = start;
        Ok(false)
    }

    /// Fills both buffers from the input streams with one line each.
    /// Returns `true` at end of file on either side (with nothing read on
    /// that side).
    pub fn read_line(&mut self) -> Result<bool> {
        tracing::trace!(row = self.row_i + 1, "reading line");

        self.reset_buf();

        let lhs_eof = Self::read_one_line(&mut *self.lhs, &mut self.lhs_buf)
            .map_err(|e| crate::error::Error::Io { path: self.lhs_label.clone(), source: e })?;
        let rhs_eof = Self::read_one_line(&mut *self.rhs, &mut self.rhs_buf)
            .map_err(|e| crate::error::Error::Io { path: self.rhs_label.clone(), source: e })?;

        self.lhs_eof = lhs_eof;
        self.rhs_eof = rhs_eof;
        self.sync_capacity();

        self.col_i = 0;
        self.row_i += 1;

        tracing::trace!(
            lhs = %String::from_utf8_lossy(&self.lhs_buf),
            rhs = %String::from_utf8_lossy(&self.rhs_buf),
            "line buffers"
        );

        Ok(lhs_eof || rhs_eof)
    }

    /// Consumes one line on each side, discarding content (no copy into the
    /// buffers). Used for rules whose command is `SKIP`.
    pub fn skip_line(&mut self) -> Result<bool> {
        self.reset_buf();

        let mut scratch = Vec::new();
        let lhs_eof = Self::read_one_line(&mut *self.lhs, &mut scratch)
            .map_err(|e| crate::error::Error::Io { path: self.lhs_label.clone(), source: e })?;
        scratch.clear();
        let rhs_eof = Self::read_one_line(&mut *self.rhs, &mut scratch)
            .map_err(|e| crate::error::Error::Io { path: self.rhs_label.clone(), source: e })?;

        self.lhs_eof = lhs_eof;
        self.rhs_eof = rhs_eof;
        self.col_i = 0;
        self.row_i += 1;

        Ok(lhs_eof || rhs_eof)
    }

    /// Loads `lhs_text`/`rhs_text` directly into the buffers, bypassing the
    /// streams. Used by tests and by replay paths; never fails.
    pub fn fill_line(&mut self, lhs_text: &str, rhs_text: &str) {
        self.reset_buf();
        self.lhs_buf.extend_from_slice(lhs_text.as_bytes());
        self.rhs_buf.extend_from_slice(rhs_text.as_bytes());
        self.sync_capacity();

        self.col_i = 0;
        self.row_i += 1;
    }

    /// Writes the current buffers, one line each, to the optional output
    /// streams — lines accepted as equal are echoed through (§6 `outLine`).
    pub fn out_line(&self, lhs_out: Option<&mut dyn Write>, rhs_out: Option<&mut dyn Write>) -> io::Result<()> {
        if let Some(w) = lhs_out {
            w.write_all(&self.lhs_buf)?;
            w.write_all(b"\n")?;
        }
        if let Some(w) = rhs_out {
            w.write_all(&self.rhs_buf)?;
            w.write_all(b"\n")?;
        }
        Ok(())
    }

    /// True iff the `tag` bytes immediately precede both cursor positions,
    /// i.e. the mismatch both sides are facing is one this rule's `OMIT`
    /// flag should excuse. An empty tag always qualifies.
    pub(crate) fn is_valid_omit(lhs: &[u8], rhs: &[u8], lhs_pos: usize, rhs_pos: usize, tag: &str) -> bool {
        let tag = tag.as_bytes();
        if tag.is_empty() {
            return true;
        }
        let mut lp = lhs_pos;
        let mut rp = rhs_pos;
        for &t in tag.iter().rev() {
            if lp == 0 || rp == 0 {
                return false;
            }
            lp -= 1;
            rp -= 1;
            if t != lhs[lp] || t != rhs[rp] {
                return false;
            }
        }
        true
    }

    pub(crate) fn report_header_once(&mut self) {
        if self.cnt_i == 1 {
            match &self.test_label {
                Some(t) => tracing::warn!(
                    "(*) files '{}'|'{}' from '{}' differ",
                    self.lhs_label, self.rhs_label, t
                ),
                None => tracing::warn!(
                    "(*) files '{}'|'{}' differ",
                    self.lhs_label, self.rhs_label
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::UniformContext;
    use crate::rule::Rule;
    use std::io::Cursor;

    fn state<'a>(ctx: &'a mut UniformContext, lhs: &str, rhs: &str) -> DiffState<'a> {
        DiffState::new(
            Cursor::new(lhs.as_bytes().to_vec()),
            Cursor::new(rhs.as_bytes().to_vec()),
            ctx,
            "lhs",
            "rhs",
            0,
            0,
        )
    }

    #[test]
    fn read_line_strips_terminator() {
        let mut ctx = UniformContext::new(Rule::passthrough());
        let mut dif = state(&mut ctx, "a\n", "b\n");
        let eof = dif.read_line().unwrap();
        assert!(!eof);
        assert_eq!(dif.lhs_buf, b"a");
        assert_eq!(dif.rhs_buf, b"b");
        assert_eq!(dif.info().row, 1);
    }

    #[test]
    fn read_line_strips_crlf() {
        let mut ctx = UniformContext::new(Rule::passthrough());
        let mut dif = state(&mut ctx, "a\r\n", "b\r\n");
        dif.read_line().unwrap();
        assert_eq!(dif.lhs_buf, b"a");
        assert_eq!(dif.rhs_buf, b"b");
    }

    #[test]
    fn read_line_reports_eof_when_either_side_empty() {
        let mut ctx = UniformContext::new(Rule::passthrough());
        let mut dif = state(&mut ctx, "only one line\n", "");
        let eof = dif.read_line().unwrap();
        assert!(eof);
    }

    #[test]
    fn fill_line_never_fails_and_resets_cursors() {
        let mut ctx = UniformContext::new(Rule::passthrough());
        let mut dif = state(&mut ctx, "", "");
        dif.fill_line("hello", "world");
        assert_eq!(dif.lhs_i, 0);
        assert_eq!(dif.rhs_i, 0);
        assert_eq!(dif.lhs_buf, b"hello");
    }

    #[test]
    fn skip_line_advances_row_without_loading_content() {
        let mut ctx = UniformContext::new(Rule::passthrough());
        let mut dif = state(&mut ctx, "first\nsecond\n", "first\nsecond\n");
        dif.skip_line().unwrap();
        assert_eq!(dif.info().row, 1);
        assert!(dif.lhs_buf.is_empty());
        dif.read_line().unwrap();
        assert_eq!(dif.lhs_buf, b"second");
    }

    #[test]
    fn is_empty_true_only_at_line_end() {
        let mut ctx = UniformContext::new(Rule::passthrough());
        let mut dif = state(&mut ctx, "x\n", "x\n");
        dif.read_line().unwrap();
        assert!(!dif.is_empty());
        dif.lhs_i = dif.lhs_buf.len();
        dif.rhs_i = dif.rhs_buf.len();
        assert!(dif.is_empty());
    }

    #[test]
    fn clear_resets_counters_but_not_labels() {
        let mut ctx = UniformContext::new(Rule::passthrough());
        let mut dif = state(&mut ctx, "x\n", "y\n");
        dif.read_line().unwrap();
        dif.cnt_i = 3;
        dif.clear();
        assert_eq!(dif.info(), DiffInfo { row: 0, col: 0, cnt: 0, num: 0 });
        assert_eq!(dif.lhs_label, "lhs");
    }
}
