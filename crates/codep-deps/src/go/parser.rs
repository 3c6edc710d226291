//! go.mod grammar: directives and `require` entries

use crate::types::DependencyMap;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static MODULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^module\s+(\S+)").expect("valid module regex"));

static GO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^go\s+(\S+)").expect("valid go regex"));

static REQUIRE_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ms)^require\s*\(\s*\n(.*?)^\)").expect("valid require block regex")
});

static REQUIRE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^require\s+([^\s(]+)\s+(\S+)(.*)$").expect("valid require regex")
});

/// Parsed go.mod contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoMod {
    /// `module` directive
    pub module: Option<String>,
    /// `go` directive
    pub go_version: Option<String>,
    /// Required module paths and versions
    pub requires: DependencyMap,
    /// Requirements marked `// indirect`
    pub indirect: BTreeSet<String>,
}

/// Parse go.mod text.
///
/// Entries from `require ( ... )` blocks are read first; standalone
/// `require path version` lines override them on collision.
pub fn parse_go_mod(content: &str) -> GoMod {
    let mut go_mod = GoMod {
        module: MODULE_RE.captures(content).map(|c| c[1].to_string()),
        go_version: GO_RE.captures(content).map(|c| c[1].to_string()),
        ..Default::default()
    };

    for block in REQUIRE_BLOCK_RE.captures_iter(content) {
        for line in block[1].lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            let mut parts = line.split_whitespace();
            if let (Some(path), Some(version)) = (parts.next(), parts.next()) {
                go_mod.insert(path, version, line.contains("// indirect"));
            }
        }
    }

    for single in REQUIRE_LINE_RE.captures_iter(content) {
        go_mod.insert(&single[1], &single[2], single[3].contains("// indirect"));
    }

    go_mod
}

impl GoMod {
    fn insert(&mut self, path: &str, version: &str, indirect: bool) {
        self.requires.insert(path.to_string(), version.to_string());
        if indirect {
            self.indirect.insert(path.to_string());
        } else {
            self.indirect.remove(path);
        }
    }
}

fn render_require_block(
    requires: &DependencyMap,
    indirect: &BTreeSet<String>,
    comments: &[&str],
) -> String {
    let mut block = String::from("require (\n");
    for comment in comments {
        block.push('\t');
        block.push_str(comment);
        block.push('\n');
    }
    for (path, version) in requires {
        block.push('\t');
        block.push_str(path);
        block.push(' ');
        block.push_str(version);
        if indirect.contains(path) {
            block.push_str(" // indirect");
        }
        block.push('\n');
    }
    block.push(')');
    block
}

fn is_block_start(trimmed: &str) -> bool {
    trimmed
        .strip_prefix("require")
        .is_some_and(|rest| rest.trim_start().starts_with('('))
}

fn is_single_require(trimmed: &str) -> bool {
    trimmed
        .strip_prefix("require")
        .is_some_and(|rest| rest.starts_with([' ', '\t']) && !rest.trim_start().starts_with('('))
}

/// Rewrite `content` so it carries exactly one `require ( ... )` block built
/// from `requires`.
///
/// The block replaces the first existing require statement in place; later
/// require statements are dropped. Standalone `//` comment lines from the
/// old blocks are kept, in order, at the top of the new block. Every other
/// line is kept as-is.
pub fn render_go_mod(
    content: &str,
    requires: &DependencyMap,
    indirect: &BTreeSet<String>,
) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut comments: Vec<&str> = Vec::new();
    let mut block_at = None;
    let mut in_block = false;

    for line in content.lines() {
        let trimmed = line.trim_start();
        if in_block {
            if trimmed.starts_with(')') {
                in_block = false;
            } else if trimmed.starts_with("//") {
                comments.push(trimmed.trim_end());
            }
            continue;
        }

        let block_start = is_block_start(trimmed);
        if block_start || is_single_require(trimmed) {
            // A one-line `require ( ... )` closes itself
            in_block = block_start && !trimmed.trim_end().ends_with(')');
            if block_at.is_none() {
                block_at = Some(lines.len());
                lines.push("");
            }
            continue;
        }

        lines.push(line);
    }

    let block = render_require_block(requires, indirect, &comments);
    let mut output: Vec<&str> = lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            if block_at == Some(index) {
                block.as_str()
            } else {
                *line
            }
        })
        .collect();

    if block_at.is_none() && !requires.is_empty() {
        if output.last().is_some_and(|last| !last.trim().is_empty()) {
            output.push("");
        }
        output.push(&block);
    }

    let mut rendered = output.join("\n");
    rendered.push('\n');
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    const GO_MOD: &str = "module github.com/acme/app

go 1.21

require (
\tgithub.com/gin-gonic/gin v1.9.0
\tgolang.org/x/text v0.13.0 // indirect
)

require github.com/stretchr/testify v1.8.0
";

    #[test]
    fn test_parse_directives() {
        let go_mod = parse_go_mod(GO_MOD);
        assert_eq!(go_mod.module.as_deref(), Some("github.com/acme/app"));
        assert_eq!(go_mod.go_version.as_deref(), Some("1.21"));
    }

    #[test]
    fn test_parse_requires() {
        let go_mod = parse_go_mod(GO_MOD);
        assert_eq!(go_mod.requires.len(), 3);
        assert_eq!(go_mod.requires["github.com/gin-gonic/gin"], "v1.9.0");
        assert_eq!(go_mod.requires["golang.org/x/text"], "v0.13.0");
        assert_eq!(go_mod.requires["github.com/stretchr/testify"], "v1.8.0");
        assert!(go_mod.indirect.contains("golang.org/x/text"));
    }

    #[test]
    fn test_single_line_overrides_block() {
        let content = "module m\n\nrequire (\n\tgithub.com/a/b v1.0.0\n)\n\nrequire github.com/a/b v1.2.0\n";
        let go_mod = parse_go_mod(content);
        assert_eq!(go_mod.requires["github.com/a/b"], "v1.2.0");
    }

    #[test]
    fn test_render_folds_single_requires() {
        let mut go_mod = parse_go_mod(GO_MOD);
        go_mod
            .requires
            .insert("github.com/gin-gonic/gin".into(), "v1.10.0".into());

        let rendered = render_go_mod(GO_MOD, &go_mod.requires, &go_mod.indirect);
        assert_eq!(
            rendered,
            "module github.com/acme/app

go 1.21

require (
\tgithub.com/gin-gonic/gin v1.10.0
\tgithub.com/stretchr/testify v1.8.0
\tgolang.org/x/text v0.13.0 // indirect
)

"
        );
        assert_eq!(parse_go_mod(&rendered).requires, go_mod.requires);
    }

    #[test]
    fn test_render_keeps_block_comments() {
        let content = "module m

require (
\t// pinned for the 1.x api
\tgithub.com/a/b v1.0.0
\t// tooling
\tgithub.com/c/d v0.2.0 // indirect
)
";
        let go_mod = parse_go_mod(content);
        let rendered = render_go_mod(content, &go_mod.requires, &go_mod.indirect);

        assert_eq!(
            rendered,
            "module m

require (
\t// pinned for the 1.x api
\t// tooling
\tgithub.com/a/b v1.0.0
\tgithub.com/c/d v0.2.0 // indirect
)
"
        );
        assert_eq!(parse_go_mod(&rendered).requires, go_mod.requires);
    }

    #[test]
    fn test_render_appends_block() {
        let requires = DependencyMap::from([("github.com/a/b".into(), "v1.0.0".into())]);
        let rendered = render_go_mod("module m\n\ngo 1.22\n", &requires, &BTreeSet::new());
        assert_eq!(
            rendered,
            "module m\n\ngo 1.22\n\nrequire (\n\tgithub.com/a/b v1.0.0\n)\n"
        );
    }
}
