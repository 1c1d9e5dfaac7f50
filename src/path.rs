//! Decides which request paths require a token.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Rule {
    Prefix(String),
    Exact(String),
}

impl Rule {
    fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix("/*") {
            Some(prefix) => Rule::Prefix(prefix.to_string()),
            None => Rule::Exact(strip_trailing_slash(pattern).to_string()),
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            Rule::Prefix(prefix) => path.starts_with(prefix.as_str()),
            Rule::Exact(exact) => path == exact,
        }
    }
}

fn strip_trailing_slash(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}

/// Matches request paths against an exclusion list.
#[derive(Debug, Clone, Default)]
pub struct PathMatcher {
    rules: Vec<Rule>,
}

impl PathMatcher {
    pub fn new<I, P>(patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        Self {
            rules: patterns
                .into_iter()
                .map(|pattern| Rule::parse(pattern.as_ref()))
                .collect(),
        }
    }

    /// Returns `false` when `path` matches an exclusion pattern.
    pub fn is_protected(&self, path: &str) -> bool {
        let path = strip_trailing_slash(path);
        !self.rules.iter().any(|rule| rule.matches(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> PathMatcher {
        PathMatcher::new(["/login", "/public/*"])
    }

    #[test]
    fn exact_exclusions() {
        let m = matcher();
        assert!(!m.is_protected("/login"));
        assert!(!m.is_protected("/login/"));
        assert!(m.is_protected("/login/extra"));
        assert!(m.is_protected("/account"));
    }

    #[test]
    fn prefix_exclusions() {
        let m = matcher();
        assert!(!m.is_protected("/public/anything"));
        assert!(!m.is_protected("/public/nested/file.css"));
        assert!(!m.is_protected("/public"));
        assert!(m.is_protected("/private/anything"));
    }

    #[test]
    fn pattern_trailing_slash_is_ignored() {
        let m = PathMatcher::new(["/health/"]);
        assert!(!m.is_protected("/health"));
        assert!(!m.is_protected("/health/"));
    }

    #[test]
    fn root_pattern() {
        let m = PathMatcher::new(["/"]);
        assert!(!m.is_protected("/"));
        assert!(m.is_protected("/account"));
    }

    #[test]
    fn empty_list_protects_everything() {
        let m = PathMatcher::default();
        assert!(m.is_protected("/"));
        assert!(m.is_protected("/login"));
    }
}
