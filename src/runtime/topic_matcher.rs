//! Topic pattern matching.
//!
//! A pattern is either a literal topic (exact equality) or a shell-style
//! glob: `*` matches any run of characters, `?` matches exactly one, and
//! `[seq]` / `[!seq]` match one character in or out of the set.
//! Globs are compiled to anchored regular expressions once, at load time.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw `matches` value from configuration: one pattern or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawMatches {
    One(String),
    Many(Vec<String>),
}

impl RawMatches {
    /// Normalize to a list of pattern strings.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            RawMatches::One(pattern) => vec![pattern],
            RawMatches::Many(patterns) => patterns,
        }
    }
}

/// A single compiled topic pattern
#[derive(Debug, Clone)]
pub enum TopicPattern {
    /// Exact topic equality
    Literal(String),
    /// Glob pattern with its compiled form
    Wildcard { raw: String, regex: Regex },
}

impl TopicPattern {
    /// Compile a pattern string.
    ///
    /// # Example
    /// ```
    /// use topicmap::runtime::TopicPattern;
    ///
    /// let pattern = TopicPattern::compile("/topic/VirtualTopic.koji.repo.*").unwrap();
    /// assert!(pattern.matches("/topic/VirtualTopic.koji.repo.done"));
    /// assert!(!pattern.matches("/topic/VirtualTopic.koji.repo"));
    /// ```
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        if !pattern.contains(['*', '?', '[']) {
            return Ok(TopicPattern::Literal(pattern.to_string()));
        }

        Ok(TopicPattern::Wildcard {
            raw: pattern.to_string(),
            regex: Regex::new(&glob_to_regex(pattern))?,
        })
    }

    pub fn matches(&self, topic: &str) -> bool {
        match self {
            TopicPattern::Literal(literal) => literal == topic,
            TopicPattern::Wildcard { regex, .. } => regex.is_match(topic),
        }
    }

    /// The pattern as written in configuration.
    pub fn as_str(&self) -> &str {
        match self {
            TopicPattern::Literal(raw) | TopicPattern::Wildcard { raw, .. } => raw,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, TopicPattern::Wildcard { .. })
    }
}

/// Translate a shell glob into an anchored regular expression.
///
/// `*` and `?` also match newlines. `[seq]` and `[!seq]` become character
/// classes; a `[` without a closing `]` is matched literally.
fn glob_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut expr = String::with_capacity(pattern.len() + 12);
    expr.push_str("(?s)^");

    let mut buf = [0u8; 4];
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    push_class(&mut expr, &chars[i + 1..end]);
                    i = end;
                }
                None => expr.push_str(r"\["),
            },
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
        i += 1;
    }

    expr.push('$');
    expr
}

/// Index of the `]` closing the class opened at `start`, if any.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    // a leading ']' is a member, not the terminator
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    (j..chars.len()).find(|&k| chars[k] == ']')
}

fn push_class(expr: &mut String, body: &[char]) {
    let (negated, members) = match body.split_first() {
        Some(('!', rest)) => (true, rest),
        _ => (false, body),
    };

    expr.push('[');
    if negated {
        expr.push('^');
    }
    for &ch in members {
        match ch {
            '\\' | '[' | ']' | '^' | '&' | '~' | '|' => {
                expr.push('\\');
                expr.push(ch);
            }
            other => expr.push(other),
        }
    }
    expr.push(']');
}

impl PartialEq for TopicPattern {
    fn eq(&self, other: &Self) -> bool {
        self.is_wildcard() == other.is_wildcard() && self.as_str() == other.as_str()
    }
}

impl Eq for TopicPattern {}

impl fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The ordered pattern set of one mapping entry.
///
/// An empty set never matches; entries without `matches` end up here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicPatterns {
    patterns: Vec<TopicPattern>,
}

impl TopicPatterns {
    /// Compile every pattern, failing on the first invalid one.
    pub fn compile<I, S>(patterns: I) -> Result<Self, (String, regex::Error)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                TopicPattern::compile(p).map_err(|e| (p.to_string(), e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// True if any pattern in the set matches `topic`.
    pub fn matches(&self, topic: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(topic))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TopicPattern> {
        self.patterns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_pattern() {
        let pattern = TopicPattern::compile("/topic/VirtualTopic.koji.repo.done").unwrap();

        assert!(!pattern.is_wildcard());
        assert!(pattern.matches("/topic/VirtualTopic.koji.repo.done"));
        assert!(!pattern.matches("/topic/VirtualTopic.koji.repo.done.extra"));
        assert!(!pattern.matches("/topic/VirtualTopic.koji.repo"));
    }

    #[test]
    fn test_wildcard_trailing_segment() {
        let pattern = TopicPattern::compile("a.b.*").unwrap();

        assert!(pattern.is_wildcard());
        assert!(pattern.matches("a.b.c"));
        assert!(pattern.matches("a.b.c.d"));
        assert!(!pattern.matches("a.b"));
        assert!(!pattern.matches("a.bc"));
    }

    #[test]
    fn test_wildcard_dots_are_literal() {
        let pattern = TopicPattern::compile("a.b.*").unwrap();

        // '.' in the pattern must not act as a regex wildcard
        assert!(!pattern.matches("aXbXc"));
    }

    #[test]
    fn test_wildcard_question_mark() {
        let pattern = TopicPattern::compile("build.v?.done").unwrap();

        assert!(pattern.matches("build.v1.done"));
        assert!(!pattern.matches("build.v10.done"));
    }

    #[test]
    fn test_wildcard_middle_segment() {
        let pattern = TopicPattern::compile("/topic/*.greenwave.decision.update").unwrap();

        assert!(pattern.matches("/topic/VirtualTopic.eng.greenwave.decision.update"));
        assert!(!pattern.matches("/topic/VirtualTopic.eng.greenwave.decision.create"));
    }

    #[test]
    fn test_regex_metacharacters_escaped() {
        let pattern = TopicPattern::compile("queue+(x)|y.*").unwrap();

        assert!(pattern.matches("queue+(x)|y.created"));
        assert!(!pattern.matches("queuex.created"));
    }

    #[test]
    fn test_wildcard_character_class() {
        let pattern = TopicPattern::compile("a.[bc]").unwrap();

        assert!(pattern.is_wildcard());
        assert!(pattern.matches("a.b"));
        assert!(pattern.matches("a.c"));
        assert!(!pattern.matches("a.d"));
        assert!(!pattern.matches("a.bc"));
    }

    #[test]
    fn test_wildcard_negated_class_and_range() {
        let negated = TopicPattern::compile("build.[!0-9]").unwrap();
        assert!(negated.matches("build.x"));
        assert!(!negated.matches("build.7"));

        let range = TopicPattern::compile("v[1-3].done").unwrap();
        assert!(range.matches("v2.done"));
        assert!(!range.matches("v4.done"));
    }

    #[test]
    fn test_unclosed_bracket_is_literal() {
        let pattern = TopicPattern::compile("a.[b*").unwrap();

        assert!(pattern.matches("a.[bcd"));
        assert!(!pattern.matches("a.b"));
    }

    #[test]
    fn test_star_matches_newline() {
        let pattern = TopicPattern::compile("a.*").unwrap();

        assert!(pattern.matches("a.x\ny"));
    }

    #[test]
    fn test_invalid_class_range_fails_to_compile() {
        assert!(TopicPattern::compile("a.[z-a]").is_err());
    }

    #[test]
    fn test_raw_matches_normalization() {
        assert_eq!(RawMatches::One("a".into()).into_vec(), vec!["a".to_string()]);
        assert_eq!(
            RawMatches::Many(vec!["a".into(), "b".into()]).into_vec(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_pattern_set() {
        let set = TopicPatterns::compile(["x.done", "y.*"]).unwrap();

        assert_eq!(set.len(), 2);
        assert!(set.matches("x.done"));
        assert!(set.matches("y.anything"));
        assert!(!set.matches("z.done"));
    }

    #[test]
    fn test_empty_pattern_set_never_matches() {
        let set = TopicPatterns::default();

        assert!(set.is_empty());
        assert!(!set.matches(""));
        assert!(!set.matches("x.done"));
    }
}
