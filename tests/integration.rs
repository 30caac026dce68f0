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

//! End-to-end scenarios driven entirely through the public API, as a
//! caller embedding the crate would use it: build a context, construct a
//! `DiffState` over two in-memory streams, run it to completion.

use std::io::Cursor;

use numdiff::{
    AxisMask, ColumnRange, Context, DiffState, Epsilons, Error, Indirect, Options, Rule,
    RuleCommand, TableContext, UniformContext,
};

fn compare(lhs: &str, rhs: &str, ctx: &mut dyn Context) -> (u32, Vec<u8>, Vec<u8>) {
    let mut dif = DiffState::new(
        Cursor::new(lhs.as_bytes().to_vec()),
        Cursor::new(rhs.as_bytes().to_vec()),
        ctx,
        "lhs.txt",
        "rhs.txt",
        0,
        0,
    );
    let mut lhs_out = Vec::new();
    let mut rhs_out = Vec::new();
    let outcome = dif.run(Some(&mut lhs_out), Some(&mut rhs_out)).unwrap();
    (outcome.diff_lines, lhs_out, rhs_out)
}

#[test]
fn scientific_report_within_tolerance_is_clean() {
    let rule = Rule::passthrough()
        .with_command(RuleCommand::ABS | RuleCommand::REL)
        .with_eps(Epsilons {
            abs: Indirect::literal(1e-6),
            rel: Indirect::literal(1e-3),
            ..Default::default()
        });
    let mut ctx = UniformContext::new(rule);

    let lhs = "step 1: energy = 12.34500 J\nstep 2: energy = 12.34600 J\n";
    let rhs = "step 1: energy = 12.34501 J\nstep 2: energy = 12.34599 J\n";
    let (diffs, ..) = compare(lhs, rhs, &mut ctx);
    assert_eq!(diffs, 0);
}

#[test]
fn drift_outside_tolerance_is_reported_and_withheld() {
    let rule = Rule::passthrough()
        .with_command(RuleCommand::ABS)
        .with_eps(Epsilons { abs: Indirect::literal(1e-6), ..Default::default() });
    let mut ctx = UniformContext::new(rule);

    let lhs = "value = 100.0\nvalue = 200.0\n";
    let rhs = "value = 100.0\nvalue = 205.0\n";
    let (diffs, lhs_out, _) = compare(lhs, rhs, &mut ctx);
    assert_eq!(diffs, 1);
    assert_eq!(lhs_out, b"value = 100.0\n\n");
}

#[test]
fn text_outside_numbers_must_match_exactly_regardless_of_tolerance() {
    let rule = Rule::passthrough()
        .with_command(RuleCommand::ABS)
        .with_eps(Epsilons { abs: Indirect::literal(1000.0), ..Default::default() });
    let mut ctx = UniformContext::new(rule);

    let (diffs, ..) = compare("left: 1\n", "right: 1\n", &mut ctx);
    assert_eq!(diffs, 1);
}

#[test]
fn equ_axis_catches_representation_drift_tolerance_would_not() {
    let rule = Rule::passthrough().with_command(RuleCommand::EQU);
    let mut ctx = UniformContext::new(rule);

    let (diffs, ..) = compare("x = 1.50\n", "x = 1.5\n", &mut ctx);
    assert_eq!(diffs, 1);
}

#[test]
fn ignore_missing_trailing_column_with_ign() {
    let rule = Rule::passthrough().with_command(RuleCommand::IGN | RuleCommand::ISTR);
    let mut ctx = UniformContext::new(rule);

    let (diffs, ..) = compare("a b c\n", "a b c d\n", &mut ctx);
    assert_eq!(diffs, 0);
}

#[test]
fn per_row_table_context_applies_different_rules_down_the_file() {
    let strict = Rule::passthrough().with_command(RuleCommand::EQU);
    let loose = Rule::passthrough()
        .with_command(RuleCommand::ABS)
        .with_eps(Epsilons { abs: Indirect::literal(5.0), ..Default::default() });

    let mut ctx = TableContext::new(strict).set_row(2, loose);

    let lhs = "1.0\n100\n";
    let rhs = "1.00\n102\n";
    let (diffs, ..) = compare(lhs, rhs, &mut ctx);
    // row 1 (EQU) fails; row 2 (loose ABS, within 5) passes
    assert_eq!(diffs, 1);
}

#[test]
fn column_restricted_rule_only_governs_its_own_numeric_column() {
    let strict = Rule::passthrough().with_command(RuleCommand::EQU);
    let loose = Rule::passthrough()
        .with_command(RuleCommand::ABS)
        .with_columns(ColumnRange { lo: Some(2), hi: Some(2) })
        .with_eps(Epsilons { abs: Indirect::literal(100.0), ..Default::default() });

    // Column 1 is governed by `strict`, column 2 by `loose`, via a table
    // context that activates `loose` once a row's first number is scanned.
    struct TwoColumn {
        strict: Rule,
        loose: Rule,
    }
    impl Context for TwoColumn {
        fn get_inc(&self, _row: u32, col: u32) -> Option<&Rule> {
            if col >= 2 { Some(&self.loose) } else { Some(&self.strict) }
        }
        fn find_idx(&self, rule: &Rule) -> Option<usize> {
            if std::ptr::eq(rule, &self.strict) {
                Some(0)
            } else if std::ptr::eq(rule, &self.loose) {
                Some(1)
            } else {
                None
            }
        }
        fn find_line(&self, _rule: &Rule) -> Option<u32> {
            None
        }
        fn fmt_rules(&self, _w: &mut dyn std::io::Write) -> std::io::Result<()> {
            Ok(())
        }
    }

    let mut ctx = TwoColumn { strict, loose };
    let (diffs, ..) = compare("1 100\n", "1 150\n", &mut ctx);
    assert_eq!(diffs, 0);

    let mut ctx = TwoColumn {
        strict: Rule::passthrough().with_command(RuleCommand::EQU),
        loose: Rule::passthrough()
            .with_command(RuleCommand::ABS)
            .with_columns(ColumnRange { lo: Some(2), hi: Some(2) })
            .with_eps(Epsilons { abs: Indirect::literal(100.0), ..Default::default() }),
    };
    let (diffs, ..) = compare("1 100\n", "2 150\n", &mut ctx);
    assert_eq!(diffs, 1);
}

#[test]
fn check_mode_surfaces_dual_lookup_mismatch_as_fatal_error() {
    struct Disagreeing {
        a: Rule,
        b: Rule,
    }
    impl Context for Disagreeing {
        fn get_inc(&self, _row: u32, _col: u32) -> Option<&Rule> {
            Some(&self.a)
        }
        fn get_at(&self, _row: u32, _col: u32) -> Option<&Rule> {
            Some(&self.b)
        }
        fn find_idx(&self, _rule: &Rule) -> Option<usize> {
            None
        }
        fn find_line(&self, _rule: &Rule) -> Option<u32> {
            None
        }
        fn fmt_rules(&self, _w: &mut dyn std::io::Write) -> std::io::Result<()> {
            Ok(())
        }
    }

    let mut ctx = Disagreeing { a: Rule::passthrough(), b: Rule::passthrough() };
    let mut dif = DiffState::new(
        Cursor::new(b"1\n".to_vec()),
        Cursor::new(b"1\n".to_vec()),
        &mut ctx,
        "lhs",
        "rhs",
        0,
        0,
    );
    dif.set_options(Options { check: true, ..Default::default() }).unwrap();
    let err = dif.run(None, None).unwrap_err();
    assert!(matches!(err, Error::DualLookupMismatch { .. }));
}

#[test]
fn any_mode_accepts_a_partial_tolerance_pass() {
    let rule = Rule::passthrough()
        .with_command(RuleCommand::ANY | RuleCommand::ABS | RuleCommand::REL)
        .with_eps(Epsilons {
            abs: Indirect::literal(1000.0),
            rel: Indirect::literal(0.0001),
            ..Default::default()
        });
    let mut ctx = UniformContext::new(rule);

    // fails REL (too tight) but passes ABS (loose) -> ANY collapses to pass
    let (diffs, ..) = compare("value 100.0\n", "value 100.5\n", &mut ctx);
    assert_eq!(diffs, 0);
}

#[test]
fn direct_axis_evaluation_reports_the_expected_mask() {
    let rule = Rule::passthrough()
        .with_command(RuleCommand::REL)
        .with_eps(Epsilons { rel: Indirect::literal(0.01), ..Default::default() });
    let mut ctx = UniformContext::new(Rule::passthrough());
    let mut dif = DiffState::new(
        Cursor::new(Vec::<u8>::new()),
        Cursor::new(Vec::<u8>::new()),
        &mut ctx,
        "lhs",
        "rhs",
        0,
        0,
    );
    dif.fill_line("50.0", "60.0");
    dif.next_num(&rule).unwrap();
    let ret = dif.test_num(&rule).unwrap();
    assert_eq!(ret, AxisMask::REL);
}

#[test]
fn malformed_input_path_reports_io_error_not_a_panic() {
    let err = std::fs::File::open("/nonexistent/path/that/should/not/exist")
        .map_err(|source| Error::Io { path: "missing".into(), source })
        .unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}
