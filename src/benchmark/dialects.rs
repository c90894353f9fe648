//! Per-solver output conventions
//!
//! Each solver family prints its answer differently. An [`OutputDialect`]
//! turns raw log text into a solver-agnostic `(verdict, model)` pair so the
//! aggregation code never sees formatting quirks.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::sexpr;
use crate::models::Verdict;

/// Verdict token at the start of a line; `sat(` and `sat (` both match
static VERDICT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(sat|unsat|unknown)\b").expect("valid regex"));

/// A line holding nothing but a verdict token
static VERDICT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(sat|unsat|unknown)\s*$").expect("valid regex"));

static ERROR_FORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\(\s*error\b").expect("valid regex"));

static JVM_FAILURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"OutOfMemoryError|StackOverflowError|Exception in thread").expect("valid regex")
});

/// Output convention of a solver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputDialect {
    /// Verdict alone on the first non-empty line, model as following
    /// S-expressions (cvc5, z3-noodler)
    #[default]
    Smtlib,
    /// Verdict directly followed by a parenthesized model on the same line,
    /// e.g. `sat((define-fun X () String ""))`
    Inline,
    /// SMT-LIB answers preceded by arbitrary JVM chatter (ostrich)
    Jvm,
}

/// What a dialect could read from a log
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedOutput {
    /// `None` when no verdict token or error form was recognized
    pub verdict: Option<Verdict>,
    pub model: Option<String>,
}

impl ParsedOutput {
    fn error() -> Self {
        Self {
            verdict: Some(Verdict::Error),
            model: None,
        }
    }
}

impl OutputDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputDialect::Smtlib => "smtlib",
            OutputDialect::Inline => "inline",
            OutputDialect::Jvm => "jvm",
        }
    }

    /// Interpret raw solver output
    pub fn parse(&self, text: &str) -> ParsedOutput {
        match self {
            OutputDialect::Smtlib => parse_first_line(text, &VERDICT_LINE),
            OutputDialect::Inline => parse_first_line(text, &VERDICT_PREFIX),
            OutputDialect::Jvm => parse_jvm(text),
        }
    }
}

/// One line of output with its position in the full text
struct Line<'a> {
    text: &'a str,
    /// Byte offset of the line's first character
    start: usize,
    /// Byte offset just past the line terminator
    next: usize,
}

fn lines(text: &str) -> impl Iterator<Item = Line<'_>> {
    let mut offset = 0;
    text.split_inclusive('\n').map(move |raw| {
        let start = offset;
        offset += raw.len();
        Line {
            text: raw.trim_end_matches(['\n', '\r']),
            start,
            next: offset,
        }
    })
}

fn parse_first_line(text: &str, verdict_pattern: &Regex) -> ParsedOutput {
    let Some(line) = lines(text).find(|line| !line.text.trim().is_empty()) else {
        return ParsedOutput::default();
    };
    if ERROR_FORM.is_match(line.text) {
        return ParsedOutput::error();
    }
    match verdict_pattern.captures(line.text) {
        Some(caps) => {
            let token_end = caps.get(0).map_or(0, |m| m.end());
            with_model(&caps[1], &text[line.start + token_end..])
        }
        None => ParsedOutput::default(),
    }
}

fn parse_jvm(text: &str) -> ParsedOutput {
    for line in lines(text) {
        if ERROR_FORM.is_match(line.text) {
            return ParsedOutput::error();
        }
        if let Some(caps) = VERDICT_LINE.captures(line.text) {
            return with_model(&caps[1], &text[line.next..]);
        }
    }
    if JVM_FAILURE.is_match(text) {
        return ParsedOutput::error();
    }
    ParsedOutput::default()
}

fn with_model(token: &str, rest: &str) -> ParsedOutput {
    let verdict = Verdict::from_token(token);
    let model = match verdict {
        Some(Verdict::Sat) => model_text(rest),
        _ => None,
    };
    ParsedOutput { verdict, model }
}

/// Single binding: its value. Several: `name=value` pairs joined by `; `.
fn model_text(rest: &str) -> Option<String> {
    let bindings = sexpr::bindings(&sexpr::parse_all(rest));
    match bindings.as_slice() {
        [] => None,
        [only] => Some(only.value_text()),
        many => Some(
            many.iter()
                .map(|b| format!("{}={}", b.name, b.value_text()))
                .collect::<Vec<_>>()
                .join("; "),
        ),
    }
}
