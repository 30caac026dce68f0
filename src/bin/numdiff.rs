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

//! Thin command-line front end over the `numdiff` library: argument
//! parsing, a uniform rule built from the tolerance flags, and process exit
//! codes (§4.8).

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use numdiff::{ColumnRange, Context, DiffState, Epsilons, Indirect, Options, Rule, RuleCommand, UniformContext};

/// Compares two text files, tolerating numeric drift within given bounds.
#[derive(Parser, Debug)]
#[command(name = "numdiff", version, about)]
struct Args {
    /// First file to compare.
    lhs_file: PathBuf,

    /// Second file to compare.
    rhs_file: PathBuf,

    /// Label shown in diagnostics identifying this comparison run.
    #[arg(long)]
    test: Option<String>,

    /// Enable the absolute-error axis with the given bound.
    #[arg(long, value_name = "BOUND")]
    abs: Option<f64>,

    /// Enable the relative-error axis with the given bound.
    #[arg(long, value_name = "BOUND")]
    rel: Option<f64>,

    /// Enable the significant-digit axis with the given bound.
    #[arg(long, value_name = "BOUND")]
    dig: Option<f64>,

    /// Require byte-identical numeral representation instead of a tolerance
    /// comparison. The default when no other axis flag is given.
    #[arg(long)]
    equ: bool,

    /// Collapse a multi-axis failure to success unless every enabled axis
    /// failed.
    #[arg(long)]
    any: bool,

    /// Collapse whitespace-only discrepancies while scanning for numbers.
    #[arg(long)]
    blank: bool,

    /// Re-run the redundant context lookup and fail fast on disagreement.
    #[arg(long)]
    check: bool,

    /// Extra punctuation bytes to treat as identifier characters rather than
    /// separators, e.g. "_-" to keep a dashed or underscored token whole.
    #[arg(long, value_name = "CHARS", default_value = "")]
    keep: String,

    /// Stop counting diagnostics after this many reported differences.
    #[arg(long, value_name = "N", default_value_t = u32::MAX)]
    max_diffs: u32,

    /// Increase logging verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Decrease logging verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "verbose")]
    quiet: u8,
}

impl Args {
    fn build_rule(&self) -> Rule {
        let mut command = RuleCommand::empty();
        let mut eps = Epsilons::default();

        if let Some(bound) = self.abs {
            command |= RuleCommand::ABS;
            eps.abs = Indirect::literal(bound);
        }
        if let Some(bound) = self.rel {
            command |= RuleCommand::REL;
            eps.rel = Indirect::literal(bound);
        }
        if let Some(bound) = self.dig {
            command |= RuleCommand::DIG;
            eps.dig = Indirect::literal(bound);
        }
        if self.any {
            command |= RuleCommand::ANY;
        }

        // With no tolerance axis requested at all, fall back to exact
        // numeral comparison rather than a silent no-op rule.
        if self.equ || !command.intersects(RuleCommand::DRA) {
            command |= RuleCommand::EQU;
        }

        Rule::passthrough().with_command(command).with_eps(eps).with_columns(ColumnRange::FULL)
    }

    fn options(&self) -> Options {
        Options {
            blank: self.blank,
            check: self.check,
            max_diffs: self.max_diffs,
            keep_chars: self.keep.bytes().collect(),
        }
    }

    fn log_level(&self) -> tracing::Level {
        let net = i16::from(self.verbose) - i16::from(self.quiet);
        match net {
            i16::MIN..=-1 => tracing::Level::ERROR,
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

fn open(path: &PathBuf) -> Result<BufReader<File>, numdiff::Error> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| numdiff::Error::Io { path: path.display().to_string(), source })
}

fn run(args: &Args) -> Result<u32, numdiff::Error> {
    let lhs = open(&args.lhs_file)?;
    let rhs = open(&args.rhs_file)?;

    let rule = args.build_rule();
    let mut ctx = UniformContext::new(rule);

    let mut dif = DiffState::new(
        lhs,
        rhs,
        &mut ctx as &mut dyn Context,
        args.lhs_file.display().to_string(),
        args.rhs_file.display().to_string(),
        0,
        0,
    );
    if let Some(label) = &args.test {
        dif = dif.with_test_label(label.clone());
    }
    dif.set_options(args.options())?;

    let outcome = dif.run(None, None)?;
    Ok(outcome.diff_lines)
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_directive = tracing_subscriber::filter::LevelFilter::from_level(args.log_level());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::builder().with_default_directive(default_directive.into()).parse_lossy(""))
        .with_target(false)
        .without_time()
        .init();

    match run(&args) {
        Ok(0) => ExitCode::from(0),
        Ok(_) => ExitCode::from(1),
        Err(err) => {
            tracing::error!("{}", format!("{err}").red());
            ExitCode::from(2)
        }
    }
}
