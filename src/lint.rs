//! Style checks for log format strings.
//!
//! Findings go to the diagnostic stream only; they never change the
//! store or the exit status.

use once_cell::sync::Lazy;
use regex::Regex;

const HL_ON: &str = "\x1b[41;37;1m";
const HL_OFF: &str = "\x1b[m";

static RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"[\n\t]+").unwrap(),
            "error: log message contains tab or newline",
        ),
        (
            Regex::new(r"(?i)^((?:warn(?:ing)?|error)(?:: )?)").unwrap(),
            "warning: log message starts with severity",
        ),
    ]
});

/// A log occurrence eligible for linting.
#[derive(Debug, Clone)]
pub struct LintSource {
    pub file: String,
    pub line: i64,
    pub func: String,
    pub fmtstring: String,
}

/// One finding, pre-rendered for the diagnostic stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintFinding {
    pub file: String,
    pub line: i64,
    pub message: String,
}

/// Apply every rule to one occurrence.
pub fn check(source: &LintSource, color: bool) -> Vec<LintFinding> {
    let mut findings = Vec::new();
    for (rex, msg) in RULES.iter() {
        if !rex.is_match(&source.fmtstring) {
            continue;
        }
        let excerpt = highlight(rex, &source.fmtstring, color);
        findings.push(LintFinding {
            file: source.file.clone(),
            line: source.line,
            message: format!(
                "{}:{}: {}: \"{}\" (in {}())",
                source.file, source.line, msg, excerpt, source.func
            ),
        });
    }
    findings
}

/// Check every occurrence and sort the findings by origin for
/// deterministic, file-ordered output.
pub fn run(sources: &[LintSource], color: bool) -> Vec<LintFinding> {
    let mut findings: Vec<LintFinding> = sources.iter().flat_map(|s| check(s, color)).collect();
    findings.sort_by(|a, b| {
        (a.file.as_str(), a.line, a.message.as_str()).cmp(&(b.file.as_str(), b.line, b.message.as_str()))
    });
    findings
}

/// Escape the format string, wrapping matched spans in highlight codes
/// when the stream is a terminal.
fn highlight(rex: &Regex, text: &str, color: bool) -> String {
    if !color {
        return text.escape_debug().to_string();
    }
    let mut out = String::new();
    let mut last = 0;
    for m in rex.find_iter(text) {
        out.extend(text[last..m.start()].escape_debug());
        out.push_str(HL_ON);
        out.extend(m.as_str().escape_debug());
        out.push_str(HL_OFF);
        last = m.end();
    }
    out.extend(text[last..].escape_debug());
    out
}
