//! "Did you mean" hints for package names that failed to resolve

/// Frequently used packages across the supported registries
const COMMON_PACKAGES: &[&str] = &[
    // npm
    "react",
    "react-dom",
    "lodash",
    "express",
    "typescript",
    "vue",
    "axios",
    "next",
    "webpack",
    "jest",
    "eslint",
    "prettier",
    "moment",
    "chalk",
    // PyPI
    "requests",
    "flask",
    "django",
    "numpy",
    "pandas",
    "pytest",
    "fastapi",
    // Go
    "github.com/gin-gonic/gin",
    "github.com/stretchr/testify",
    "golang.org/x/net",
    "golang.org/x/text",
];

/// Maximum edit distance for a suggestion
const MAX_DISTANCE: usize = 2;

/// Edit distance between two strings, two-row dynamic programming
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0; b_chars.len() + 1];

    for (i, a_char) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != *b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}

/// Closest common package within [`MAX_DISTANCE`] edits, never `name` itself
pub fn suggest_package(name: &str) -> Option<&'static str> {
    let lowered = name.to_lowercase();
    COMMON_PACKAGES
        .iter()
        .filter(|candidate| **candidate != lowered)
        .map(|candidate| (levenshtein_distance(&lowered, candidate), *candidate))
        .filter(|(distance, _)| *distance <= MAX_DISTANCE)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate)
}
