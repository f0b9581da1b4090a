//! URL access rules
//!
//! An ordered list of Ant-style path patterns decides which requests may
//! pass without a login. Pattern syntax:
//!
//! - `*` matches one path segment, or a run of characters inside a segment
//! - `?` matches one character inside a segment
//! - `**` matches zero or more whole segments
//!
//! Matching looks at the path only, is case sensitive, and ignores empty
//! segments (so a trailing slash makes no difference).

/// Paths reachable without an authenticated session
pub const DEFAULT_PUBLIC_PATHS: [&str; 7] = [
    "/login",
    "/h2-console/**",
    "/hello1",
    "/helloworld-bean",
    "/helloworld1",
    "/health",
    "/actuator/health",
];

/// Maximum iterations allowed for pattern matching to prevent runaway backtracking
const MAX_MATCH_ITERATIONS: usize = 10000;

/// Outcome of evaluating a request path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The request may proceed
    Permit,
    /// The request needs an authenticated session
    RequireLogin,
}

/// Ordered public-path rules
#[derive(Debug, Clone)]
pub struct AccessRules {
    patterns: Vec<CompiledPattern>,
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    source: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    /// Segment text that must match exactly
    Literal(String),
    /// Segment containing `*` or `?`
    Glob(Vec<char>),
    /// `**`
    AnySegments,
}

impl AccessRules {
    /// Compile public-path patterns, keeping their order
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| CompiledPattern::compile(p.as_ref()))
            .collect();
        Self { patterns }
    }

    /// Append a pattern unless an identical one is already present
    pub fn permit(mut self, pattern: &str) -> Self {
        if !self.patterns.iter().any(|p| p.source == pattern) {
            self.patterns.push(CompiledPattern::compile(pattern));
        }
        self
    }

    /// Pattern sources in evaluation order
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.source.as_str())
    }

    /// First pattern matching `path`, if any
    pub fn matching_pattern(&self, path: &str) -> Option<&str> {
        let path_segments = split_segments(path);
        self.patterns
            .iter()
            .find(|p| p.matches(&path_segments))
            .map(|p| p.source.as_str())
    }

    /// Whether `path` is reachable without a login
    pub fn is_public(&self, path: &str) -> bool {
        self.matching_pattern(path).is_some()
    }

    /// Decide access for a request
    pub fn decide(&self, path: &str, authenticated: bool) -> Access {
        if authenticated || self.is_public(path) {
            Access::Permit
        } else {
            Access::RequireLogin
        }
    }
}

impl Default for AccessRules {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLIC_PATHS)
    }
}

impl CompiledPattern {
    fn compile(pattern: &str) -> Self {
        let segments = split_segments(pattern)
            .into_iter()
            .map(|part| {
                if part == "**" {
                    Segment::AnySegments
                } else if part.contains('*') || part.contains('?') {
                    Segment::Glob(part.chars().collect())
                } else {
                    Segment::Literal(part.to_string())
                }
            })
            .collect();

        Self {
            source: pattern.to_string(),
            segments,
        }
    }

    fn matches(&self, path_segments: &[&str]) -> bool {
        let mut iterations = 0;
        match_segments(&self.segments, path_segments, &mut iterations)
    }
}

fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn match_segments(pattern: &[Segment], path: &[&str], iterations: &mut usize) -> bool {
    *iterations += 1;
    if *iterations > MAX_MATCH_ITERATIONS {
        tracing::warn!(
            "Pattern matching exceeded {} iterations, aborting",
            MAX_MATCH_ITERATIONS
        );
        return false;
    }

    let Some((first, rest)) = pattern.split_first() else {
        return path.is_empty();
    };

    match first {
        Segment::AnySegments => {
            if rest.is_empty() {
                return true;
            }
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..], iterations))
        }
        Segment::Literal(literal) => match path.split_first() {
            Some((segment, remaining)) if *segment == literal.as_str() => {
                match_segments(rest, remaining, iterations)
            }
            _ => false,
        },
        Segment::Glob(glob) => match path.split_first() {
            Some((segment, remaining)) => {
                let text: Vec<char> = segment.chars().collect();
                glob_matches(glob, &text) && match_segments(rest, remaining, iterations)
            }
            None => false,
        },
    }
}

/// Match one segment against a glob made of literals, `*` and `?`
fn glob_matches(glob: &[char], text: &[char]) -> bool {
    let (mut g, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if g < glob.len() && (glob[g] == '?' || glob[g] == text[t]) {
            g += 1;
            t += 1;
        } else if g < glob.len() && glob[g] == '*' {
            star = Some((g, t));
            g += 1;
        } else if let Some((star_g, star_t)) = star {
            g = star_g + 1;
            t = star_t + 1;
            star = Some((star_g, star_t + 1));
        } else {
            return false;
        }
    }

    glob[g..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_public_paths_permit_anonymous() {
        let rules = AccessRules::default();
        for path in [
            "/login",
            "/h2-console",
            "/h2-console/login.do",
            "/hello1",
            "/helloworld-bean",
            "/helloworld1",
            "/health",
            "/actuator/health",
        ] {
            assert_eq!(rules.decide(path, false), Access::Permit, "{}", path);
        }
    }

    #[test]
    fn test_other_paths_require_login() {
        let rules = AccessRules::default();
        for path in ["/", "/roles", "/users/1", "/hello", "/health/details", "/actuator/info"] {
            assert_eq!(rules.decide(path, false), Access::RequireLogin, "{}", path);
            assert_eq!(rules.decide(path, true), Access::Permit, "{}", path);
        }
    }

    #[test]
    fn test_trailing_slash_and_case() {
        let rules = AccessRules::default();
        assert!(rules.is_public("/health/"));
        assert!(!rules.is_public("/HEALTH"));
    }

    #[test]
    fn test_single_segment_wildcard() {
        let rules = AccessRules::new(["/users/*/profile", "/static/*.css"]);
        assert!(rules.is_public("/users/42/profile"));
        assert!(!rules.is_public("/users/42/43/profile"));
        assert!(!rules.is_public("/users/profile"));
        assert!(rules.is_public("/static/site.css"));
        assert!(!rules.is_public("/static/site.js"));
    }

    #[test]
    fn test_question_mark_and_inner_double_wildcard() {
        let rules = AccessRules::new(["/file?.txt", "/api/**/public"]);
        assert!(rules.is_public("/file1.txt"));
        assert!(!rules.is_public("/file12.txt"));
        assert!(rules.is_public("/api/public"));
        assert!(rules.is_public("/api/v1/docs/public"));
        assert!(!rules.is_public("/api/v1/private"));
    }

    #[test]
    fn test_first_matching_pattern_wins() {
        let rules = AccessRules::new(["/docs/**", "/docs/index"]);
        assert_eq!(rules.matching_pattern("/docs/index"), Some("/docs/**"));
        assert_eq!(rules.patterns().collect::<Vec<_>>(), vec!["/docs/**", "/docs/index"]);
    }

    #[test]
    fn test_permit_appends_once() {
        let rules = AccessRules::default().permit("/logout").permit("/login");
        assert!(rules.is_public("/logout"));
        assert_eq!(rules.patterns().count(), DEFAULT_PUBLIC_PATHS.len() + 1);
    }

    #[test]
    fn test_empty_rules_permit_nothing() {
        let rules = AccessRules::new(Vec::<String>::new());
        assert_eq!(rules.decide("/health", false), Access::RequireLogin);
    }
}
