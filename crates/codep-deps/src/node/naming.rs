//! npm package name rules

use crate::types::ValidationResult;

const MAX_LENGTH: usize = 214;

const BLACKLIST: &[&str] = &["node_modules", "favicon.ico"];

const CORE_MODULES: &[&str] = &[
    "assert", "buffer", "child_process", "cluster", "crypto", "dgram", "dns", "domain", "events",
    "fs", "http", "https", "net", "os", "path", "punycode", "querystring", "readline", "stream",
    "string_decoder", "timers", "tls", "tty", "url", "util", "v8", "vm", "zlib",
];

/// Characters `encodeURIComponent` leaves untouched
fn is_url_safe(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_.!~*'()".contains(c))
}

/// Validate an npm package name, including `@scope/name` forms.
pub fn validate_npm_name(name: &str) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if name.is_empty() {
        errors.push("name length must be greater than zero".to_string());
    }
    if name.starts_with('.') {
        errors.push("name cannot start with a period".to_string());
    }
    if name.starts_with('_') {
        errors.push("name cannot start with an underscore".to_string());
    }
    if name.trim() != name {
        errors.push("name cannot contain leading or trailing spaces".to_string());
    }
    if BLACKLIST.iter().any(|b| b.eq_ignore_ascii_case(name)) {
        errors.push(format!("{} is a blacklisted name", name));
    }

    if CORE_MODULES.contains(&name) {
        warnings.push(format!("{} is a core module name", name));
    }
    if name.len() > MAX_LENGTH {
        warnings.push(format!("name can no longer contain more than {} characters", MAX_LENGTH));
    }
    if name.to_lowercase() != name {
        warnings.push("name can no longer contain capital letters".to_string());
    }

    let unscoped = name.rsplit('/').next().unwrap_or(name);
    if unscoped.contains(['~', '\'', '!', '(', ')', '*']) {
        warnings.push("name can no longer contain special characters (\"~'!()*\")".to_string());
    }

    if !is_url_safe(name) {
        let scoped_ok = name
            .strip_prefix('@')
            .and_then(|rest| rest.split_once('/'))
            .map(|(scope, pkg)| {
                !scope.is_empty() && !pkg.is_empty() && is_url_safe(scope) && is_url_safe(pkg)
            })
            .unwrap_or(false);

        if !scoped_ok {
            errors.push("name can only contain URL-friendly characters".to_string());
        }
    }

    ValidationResult {
        valid_for_new_packages: errors.is_empty() && warnings.is_empty(),
        valid_for_old_packages: errors.is_empty(),
        errors,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["react", "lodash.merge", "@types/node", "@babel/core", "left-pad"] {
            let result = validate_npm_name(name);
            assert!(result.valid_for_new_packages, "{} should be valid", name);
        }
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", ".hidden", "_private", " react", "node_modules", "has space", "a/b/c", "@/pkg"] {
            let result = validate_npm_name(name);
            assert!(!result.valid_for_old_packages, "{} should be invalid", name);
        }
    }

    #[test]
    fn test_legacy_names_are_warnings() {
        let result = validate_npm_name("JSONStream");
        assert!(result.valid_for_old_packages);
        assert!(!result.valid_for_new_packages);

        let result = validate_npm_name("http");
        assert!(result.valid_for_old_packages);
        assert_eq!(result.warnings.len(), 1);

        let long = "a".repeat(215);
        assert!(!validate_npm_name(&long).valid_for_new_packages);
    }
}
