//! Window patterns: what a spot is restricted to, and whether it applies now
//!
//! Patterns are a tagged value in memory. They only become text at the
//! storage boundary ([`Pattern::to_storage`] / [`Pattern::from_storage`]),
//! where three schema generations of hand-editable strings must keep working.

use fancy_regex::Regex;
use std::fmt;
use tracing::warn;

use crate::constants::pattern::{APP_PREFIX, LOOKAHEAD_PREFIX};

/// Rule deciding whether a spot applies to the focused window
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Pattern {
    /// Matches every window
    #[default]
    Global,
    /// Case-insensitive containment in the window title
    Substring(String),
    /// Case-insensitive containment in the foreground application's name
    AppName(String),
    /// Every entry must be contained in the title, in any order (always 2+ entries)
    CombinedAll(Vec<String>),
    /// Hand-written lookahead expression, searched case-insensitively in the title
    Lookahead(TitleRegex),
}

/// A compiled stored expression; equality is on the stored text
#[derive(Debug, Clone)]
pub struct TitleRegex {
    source: String,
    regex: Regex,
}

impl TitleRegex {
    pub fn new(source: &str) -> Result<Self, fancy_regex::Error> {
        let regex = Regex::new(&format!("(?i){source}"))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// A search that hits the backtracking limit counts as plain containment
    pub fn is_match(&self, title: &str) -> bool {
        self.regex.is_match(title).unwrap_or_else(|err| {
            warn!(pattern = %self.source, error = %err, "Pattern evaluation failed, using substring match");
            contains_folded(title, &self.source)
        })
    }
}

impl PartialEq for TitleRegex {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for TitleRegex {}

impl Pattern {
    /// Build a conjunction, degrading to simpler variants for short lists
    pub fn combined(segments: Vec<String>) -> Self {
        match segments.len() {
            0 => Pattern::Global,
            1 => Pattern::Substring(segments.into_iter().next().unwrap_or_default()),
            _ => Pattern::CombinedAll(segments),
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Pattern::Global)
    }

    /// Decide whether this pattern applies to the given window
    pub fn matches(&self, title: &str, app_name: &str) -> bool {
        match self {
            Pattern::Global => true,
            Pattern::AppName(text) => contains_folded(app_name, text),
            Pattern::Substring(text) => contains_folded(title, text),
            Pattern::CombinedAll(parts) => parts.iter().all(|part| contains_folded(title, part)),
            Pattern::Lookahead(regex) => regex.is_match(title),
        }
    }

    /// Text written to the `WindowPattern` column (empty for global)
    pub fn to_storage(&self) -> String {
        match self {
            Pattern::Global => String::new(),
            Pattern::Substring(text) => text.clone(),
            Pattern::AppName(text) => format!("{APP_PREFIX}{text}"),
            Pattern::CombinedAll(parts) => lookahead_conjunction(parts),
            Pattern::Lookahead(regex) => regex.as_str().to_string(),
        }
    }

    /// Parse a stored `WindowPattern` cell. Never fails: a lookahead string is
    /// a conjunction when it only holds escaped literals, a compiled
    /// expression otherwise, and a substring of its raw text when it does not
    /// compile, so a hand-edited file can't block lookups.
    pub fn from_storage(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Pattern::Global;
        }
        if let Some(app) = raw.strip_prefix(APP_PREFIX) {
            return Pattern::AppName(app.to_string());
        }
        if raw.starts_with(LOOKAHEAD_PREFIX) {
            if let Some(parts) = parse_lookahead_conjunction(raw) {
                return Pattern::combined(parts);
            }
            return match TitleRegex::new(raw) {
                Ok(regex) => Pattern::Lookahead(regex),
                Err(err) => {
                    warn!(pattern = %raw, error = %err, "Malformed lookahead pattern, falling back to substring match");
                    Pattern::Substring(raw.to_string())
                }
            };
        }
        Pattern::Substring(raw.to_string())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Global => write!(f, "global"),
            Pattern::Substring(text) => write!(f, "{text}"),
            Pattern::AppName(text) => write!(f, "app: {text}"),
            Pattern::CombinedAll(parts) => write!(f, "all of: {}", parts.join(" + ")),
            Pattern::Lookahead(regex) => write!(f, "regex: {}", regex.as_str()),
        }
    }
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// `(?=.*a)(?=.*b)...`: one lookahead per escaped segment
pub fn lookahead_conjunction(parts: &[String]) -> String {
    parts
        .iter()
        .map(|part| format!("{LOOKAHEAD_PREFIX}.*{})", regex::escape(part)))
        .collect()
}

/// Inverse of [`lookahead_conjunction`]. Accepts escapes from any generation
/// (an escaped space or hyphen is as good as a bare one); any unescaped regex
/// syntax inside a lookahead body means the string is a real expression.
fn parse_lookahead_conjunction(raw: &str) -> Option<Vec<String>> {
    let mut parts = Vec::new();
    let mut rest = raw;

    while !rest.is_empty() {
        rest = rest.strip_prefix(LOOKAHEAD_PREFIX)?.strip_prefix(".*")?;
        let mut literal = String::new();
        let mut chars = rest.char_indices();
        let mut end = None;

        while let Some((idx, c)) = chars.next() {
            match c {
                '\\' => {
                    let (_, escaped) = chars.next()?;
                    // \d, \w, \b etc. are classes, not literals
                    if escaped.is_ascii_alphanumeric() {
                        return None;
                    }
                    literal.push(escaped);
                }
                ')' => {
                    end = Some(idx);
                    break;
                }
                '.' | '^' | '$' | '*' | '+' | '?' | '(' | '[' | ']' | '{' | '}' | '|' => {
                    return None;
                }
                other => literal.push(other),
            }
        }

        let end = end?;
        if literal.is_empty() {
            return None;
        }
        parts.push(literal);
        rest = &rest[end + 1..];
    }

    if parts.is_empty() { None } else { Some(parts) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_global_always_matches() {
        assert!(Pattern::Global.matches("", ""));
        assert!(Pattern::Global.matches("Anything - Firefox", "firefox"));
    }

    #[test]
    fn test_substring_is_case_insensitive() {
        let pattern = Pattern::Substring("github".to_string());
        assert!(pattern.matches("GitHub - screen-spots - Brave", "Brave"));
        assert!(!pattern.matches("GitLab - Brave", "Brave"));
    }

    #[test]
    fn test_app_name_ignores_title() {
        let pattern = Pattern::AppName("code".to_string());
        assert!(pattern.matches("unrelated", "Visual Studio Code"));
        assert!(!pattern.matches("code review - Firefox", "Firefox"));
    }

    #[test]
    fn test_combined_is_order_independent() {
        let pattern = Pattern::CombinedAll(strings(&["Cursor", "GitHub"]));
        assert!(pattern.matches("GitHub - screen-spots - Cursor", ""));
        assert!(pattern.matches("cursor | github", ""));
        assert!(!pattern.matches("GitHub - Brave", ""));
    }

    #[test]
    fn test_combined_degrades_for_short_lists() {
        assert_eq!(Pattern::combined(vec![]), Pattern::Global);
        assert_eq!(
            Pattern::combined(strings(&["Inbox"])),
            Pattern::Substring("Inbox".to_string())
        );
        assert_eq!(
            Pattern::combined(strings(&["a1", "b2"])),
            Pattern::CombinedAll(strings(&["a1", "b2"]))
        );
    }

    #[test]
    fn test_storage_text_forms() {
        assert_eq!(Pattern::Global.to_storage(), "");
        assert_eq!(Pattern::AppName("Slack".to_string()).to_storage(), "app:Slack");
        assert_eq!(
            Pattern::CombinedAll(strings(&["README.md", "Code"])).to_storage(),
            r"(?=.*README\.md)(?=.*Code)"
        );
    }

    #[test]
    fn test_from_storage_recognises_each_form() {
        assert_eq!(Pattern::from_storage("  "), Pattern::Global);
        assert_eq!(Pattern::from_storage("app:Slack"), Pattern::AppName("Slack".to_string()));
        assert_eq!(
            Pattern::from_storage("Inbox (5)"),
            Pattern::Substring("Inbox (5)".to_string())
        );
        assert_eq!(
            Pattern::from_storage(r"(?=.*GitHub)(?=.*screen\-spots\-improved)(?=.*Cursor)"),
            Pattern::CombinedAll(strings(&["GitHub", "screen-spots-improved", "Cursor"]))
        );
    }

    #[test]
    fn test_from_storage_accepts_escaped_spaces() {
        // Older files escaped every non-alphanumeric character
        assert_eq!(
            Pattern::from_storage(r"(?=.*Google\ Chrome)(?=.*Inbox)"),
            Pattern::CombinedAll(strings(&["Google Chrome", "Inbox"]))
        );
    }

    #[test]
    fn test_from_storage_single_lookahead_is_substring() {
        assert_eq!(
            Pattern::from_storage("(?=.*Inbox)"),
            Pattern::Substring("Inbox".to_string())
        );
    }

    #[test]
    fn test_malformed_lookahead_degrades_to_substring() {
        for raw in ["(?=.*foo", "(?=[a-", "(?=.*a)(?=.*(b"] {
            let pattern = Pattern::from_storage(raw);
            assert_eq!(pattern, Pattern::Substring(raw.to_string()), "raw={raw}");
        }
        // Still usable: matches only when the raw text is literally present
        let pattern = Pattern::from_storage("(?=.*foo");
        assert!(pattern.matches("title with (?=.*foo inside", ""));
        assert!(!pattern.matches("foo", ""));
    }

    #[test]
    fn test_hand_written_lookahead_is_evaluated() {
        let title = "Gmail - Inbox (5) - GitHub Pull request #12";
        for raw in [
            "(?=.*Gmail.*Inbox)",
            r"(?=.*Inbox \(\d+\))",
            r"(?=.*gmail)(?=.*PULL REQUEST #\d+)",
        ] {
            let pattern = Pattern::from_storage(raw);
            assert!(matches!(pattern, Pattern::Lookahead(_)), "raw={raw}");
            assert!(pattern.matches(title, ""), "raw={raw}");
            assert!(!pattern.matches("Outlook - Calendar", ""), "raw={raw}");
            assert_eq!(pattern.to_storage(), raw);
        }
    }

    #[test]
    fn test_lookahead_order_is_irrelevant() {
        let pattern = Pattern::from_storage(r"(?=.*Cursor)(?=.*Git\w+)");
        assert!(pattern.matches("GitHub - screen-spots - Cursor", ""));
        assert!(!pattern.matches("GitHub - Brave", ""));
    }

    #[test]
    fn test_storage_text_survives_reload() {
        let pattern = Pattern::CombinedAll(strings(&["a|b", "x (y)", "[tag]"]));
        assert_eq!(Pattern::from_storage(&pattern.to_storage()), pattern);
    }
}
