//! Line-oriented access to TOML-style `[section]` tables in pyproject.toml
//! and Pipfile.
//!
//! A section runs from its heading to the next line starting with `[`.
//! Only `key = "string"` entries are tracked; inline tables and arrays are
//! left alone.

use crate::types::DependencyMap;

/// Key and quoted value span of a `key = "value"` line
struct Entry<'a> {
    key: &'a str,
    value_start: usize,
    value_end: usize,
}

fn parse_entry(line: &str) -> Option<Entry<'_>> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let (raw_key, rest) = line.split_once('=')?;
    let key = raw_key.trim().trim_matches(|c| c == '"' || c == '\'');
    if key.is_empty() {
        return None;
    }

    let value_offset = line.len() - rest.len();
    let rest_trimmed = rest.trim_start();
    let quote = rest_trimmed.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value_start = value_offset + (rest.len() - rest_trimmed.len()) + 1;
    let value_len = line[value_start..].find(quote)?;

    Some(Entry {
        key,
        value_start,
        value_end: value_start + value_len,
    })
}

fn heading(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    trimmed.strip_prefix('[')?.strip_suffix(']').map(str::trim)
}

/// Byte-preserving walk over the lines of the named sections
fn for_each_section_line<'a>(
    content: &'a str,
    headings: &[&str],
    mut visit: impl FnMut(&'a str, bool),
) {
    let mut inside = false;
    for line in content.lines() {
        if line.trim_start().starts_with('[') {
            inside = heading(line).is_some_and(|name| headings.contains(&name));
            visit(line, false);
            continue;
        }
        visit(line, inside);
    }
}

/// Whether any of `headings` is present
pub fn has_section(content: &str, headings: &[&str]) -> bool {
    content
        .lines()
        .filter_map(heading)
        .any(|name| headings.contains(&name))
}

/// String entries of the named sections; `None` if none of them exist.
///
/// Keys listed in `exclude` are skipped.
pub fn parse_section(content: &str, headings: &[&str], exclude: &[&str]) -> Option<DependencyMap> {
    if !has_section(content, headings) {
        return None;
    }

    let mut deps = DependencyMap::new();
    for_each_section_line(content, headings, |line, inside| {
        if !inside {
            return;
        }
        if let Some(entry) = parse_entry(line) {
            if !exclude.contains(&entry.key) {
                deps.insert(
                    entry.key.to_string(),
                    line[entry.value_start..entry.value_end].to_string(),
                );
            }
        }
    });
    Some(deps)
}

/// Replace the quoted values of entries listed in `deps` inside the named
/// sections, formatting each new value with `format_value`.
pub fn render_section(
    content: &str,
    headings: &[&str],
    deps: &DependencyMap,
    format_value: impl Fn(&str) -> String,
) -> String {
    let mut lines: Vec<String> = Vec::new();
    for_each_section_line(content, headings, |line, inside| {
        let replacement = inside
            .then(|| parse_entry(line))
            .flatten()
            .and_then(|entry| {
                let current = &line[entry.value_start..entry.value_end];
                let value = deps.get(entry.key)?;
                (value != current).then(|| {
                    format!(
                        "{}{}{}",
                        &line[..entry.value_start],
                        format_value(value),
                        &line[entry.value_end..]
                    )
                })
            });
        lines.push(replacement.unwrap_or_else(|| line.to_string()));
    });

    let mut rendered = lines.join("\n");
    if content.ends_with('\n') {
        rendered.push('\n');
    }
    rendered
}
