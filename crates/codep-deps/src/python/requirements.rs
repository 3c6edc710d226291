//! requirements.txt grammar

use crate::types::DependencyMap;
use regex::Regex;
use std::sync::LazyLock;

/// `name[extras] <specifier>`
static REQUIREMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*[A-Za-z0-9][A-Za-z0-9._-]*(?:\[[^\]]*\])?)\s*(.*)$")
        .expect("valid requirement regex")
});

/// A requirement line split into rewritable pieces
struct RequirementLine<'a> {
    /// Leading whitespace, name and extras
    head: &'a str,
    /// Bare package name
    name: &'a str,
    /// Version specifier, possibly empty
    specifier: &'a str,
    /// Whitespace, environment marker and comment after the specifier
    tail: &'a str,
}

fn split_line(line: &str) -> Option<RequirementLine<'_>> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('-') {
        return None;
    }

    // Environment markers and comments are carried through untouched
    let cut = line.find([';', '#']).unwrap_or(line.len());
    let requirement = line[..cut].trim_end();

    let captures = REQUIREMENT_RE.captures(requirement)?;
    let head = captures.get(1)?.as_str();
    let name = head.trim_start().split('[').next().unwrap_or_default();

    Some(RequirementLine {
        head,
        name,
        specifier: captures.get(2).map_or("", |m| m.as_str()),
        tail: &line[requirement.len()..],
    })
}

/// Parse requirements.txt text into name → specifier.
///
/// Comments, blank lines and option lines (`-r`, `-e`, `--index-url`) are
/// skipped; a bare name maps to an empty specifier.
pub fn parse_requirements(content: &str) -> DependencyMap {
    content
        .lines()
        .filter_map(split_line)
        .map(|line| (line.name.to_string(), line.specifier.to_string()))
        .collect()
}

/// Specifier text written for a target value
fn format_specifier(value: &str) -> String {
    if value == "latest" {
        String::new()
    } else if value.starts_with(|c: char| c.is_ascii_digit()) {
        format!("=={}", value)
    } else {
        value.to_string()
    }
}

/// Rewrite the lines whose package appears in `deps` with a changed
/// specifier. Every other line is kept byte-for-byte.
pub fn render_requirements(content: &str, deps: &DependencyMap) -> String {
    let rewritten: Vec<String> = content
        .lines()
        .map(|line| {
            let Some(parsed) = split_line(line) else {
                return line.to_string();
            };
            match deps.get(parsed.name) {
                Some(value) if value != parsed.specifier => format!(
                    "{}{}{}",
                    parsed.head,
                    format_specifier(value),
                    parsed.tail
                ),
                _ => line.to_string(),
            }
        })
        .collect();

    let mut rendered = rewritten.join("\n");
    if content.ends_with('\n') {
        rendered.push('\n');
    }
    rendered
}
