//! Window title segmentation and pattern suggestions
//!
//! Splits a title like `README.md - my-project - Visual Studio Code` into the
//! fragments a user would plausibly want to bind a spot to, and ranks them as
//! pattern suggestions.

use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use crate::constants::title::FILE_EXTENSIONS;
use crate::pattern::{lookahead_conjunction, Pattern};

/// `http(s)://` up to the next whitespace
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid regex"));

/// Spaced pipe/em dash/en dash/hyphen, or a colon followed by whitespace.
/// Dots and bare slashes are deliberately absent.
static DELIMITER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+[|\u{2014}\u{2013}]\s+|\s+-\s+|\s+:\s+|:\s+").expect("valid regex")
});

static DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9][-a-zA-Z0-9]*(\.[a-zA-Z0-9][-a-zA-Z0-9]*)+$").expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    /// Application name of the focused window (offered by the save flow)
    App,
    Segment,
    Domain,
    /// Conjunction of every segment; always offered last
    Combined,
}

impl fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SuggestionKind::App => "app",
            SuggestionKind::Segment => "segment",
            SuggestionKind::Domain => "domain",
            SuggestionKind::Combined => "combined",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub pattern: Pattern,
    pub description: String,
    pub kind: SuggestionKind,
}

/// Split a title into unique fragments, appending the lookahead conjunction
/// of all of them when there are at least two.
pub fn segment(title: &str, min_length: usize) -> Vec<String> {
    let mut segments = split_segments(title, min_length);
    if segments.len() > 1 {
        let combined = lookahead_conjunction(&segments);
        segments.push(combined);
    }
    segments
}

/// Classify [`segment`]'s output: domains, plain segments, and the trailing
/// conjunction (when present) as a combined pattern over every segment
pub fn suggest(title: &str, min_length: usize) -> Vec<Suggestion> {
    let mut segments = segment(title, min_length);
    let combined = if segments.len() > 1 {
        // Drop the synthetic lookahead text; the pattern keeps the literals
        segments.pop();
        Some(Pattern::combined(segments.clone()))
    } else {
        None
    };

    let mut suggestions: Vec<Suggestion> = segments
        .into_iter()
        .map(|seg| {
            let (description, kind) = if is_domain(&seg) {
                ("Domain", SuggestionKind::Domain)
            } else {
                ("Title segment", SuggestionKind::Segment)
            };
            Suggestion {
                pattern: Pattern::Substring(seg),
                description: description.to_string(),
                kind,
            }
        })
        .collect();

    if let Some(pattern) = combined {
        suggestions.push(Suggestion {
            pattern,
            description: "Combined (all segments)".to_string(),
            kind: SuggestionKind::Combined,
        });
    }

    suggestions
}

/// Looks like `host.example.org` and not like `notes.txt`
pub fn is_domain(text: &str) -> bool {
    if !text.contains('.') {
        return false;
    }
    let lower = text.to_lowercase();
    if FILE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return false;
    }
    DOMAIN.is_match(text)
}

/// Cleaned, deduplicated fragments without the synthetic conjunction
fn split_segments(title: &str, min_length: usize) -> Vec<String> {
    let title = title.trim();
    if title.is_empty() {
        return Vec::new();
    }

    let processed = replace_urls_with_domains(title);
    let mut seen = HashSet::new();

    DELIMITER
        .split(&processed)
        .map(str::trim)
        .filter(|seg| seg.chars().count() >= min_length.max(1))
        .filter(|seg| seen.insert(seg.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Runs before splitting so slashes in a URL path never look like delimiters
fn replace_urls_with_domains(title: &str) -> String {
    URL.replace_all(title, |caps: &regex::Captures| url_domain(&caps[0]).to_string())
        .into_owned()
}

fn url_domain(url: &str) -> &str {
    let no_protocol = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let domain = no_protocol.split('/').next().unwrap_or(no_protocol);
    domain.strip_prefix("www.").unwrap_or(domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::title::DEFAULT_MIN_SEGMENT_LENGTH;

    fn seg(title: &str) -> Vec<String> {
        segment(title, DEFAULT_MIN_SEGMENT_LENGTH)
    }

    fn suggest_default(title: &str) -> Vec<Suggestion> {
        suggest(title, DEFAULT_MIN_SEGMENT_LENGTH)
    }

    #[test]
    fn test_hyphen_delimited_title() {
        let segments = seg("GitHub - screen-spots-improved - Cursor");
        assert_eq!(segments.len(), 4);
        assert_eq!(&segments[..3], ["GitHub", "screen-spots-improved", "Cursor"]);

        let suggestions = suggest_default("GitHub - screen-spots-improved - Cursor");
        assert_eq!(suggestions.len(), 4);
        let last = suggestions.last().unwrap();
        assert_eq!(last.kind, SuggestionKind::Combined);
        assert!(last.pattern.matches("Cursor | GitHub | screen-spots-improved", ""));
        assert!(!last.pattern.matches("GitHub - Cursor", ""));
    }

    #[test]
    fn test_suggestions_mirror_segments() {
        let title = "https://www.google.com/search - Google - Chrome";
        let segments = seg(title);
        let suggestions = suggest_default(title);
        assert_eq!(suggestions.len(), segments.len());
        assert_eq!(suggestions[0].pattern, Pattern::Substring(segments[0].clone()));
        assert_eq!(suggestions.last().unwrap().pattern.to_storage(), *segments.last().unwrap());
    }

    #[test]
    fn test_combined_entry_is_lookahead_text() {
        let segments = seg("Document — Microsoft Word");
        assert_eq!(segments[2], "(?=.*Document)(?=.*Microsoft Word)");
    }

    #[test]
    fn test_pipe_em_dash_en_dash() {
        assert_eq!(&seg("Gmail | Inbox | Google Chrome")[..3], ["Gmail", "Inbox", "Google Chrome"]);
        assert_eq!(&seg("Document — Microsoft Word")[..2], ["Document", "Microsoft Word"]);
        assert_eq!(&seg("Page – Firefox")[..2], ["Page", "Firefox"]);
    }

    #[test]
    fn test_colon_delimiters() {
        assert_eq!(
            &seg("Project: README.md - Visual Studio Code")[..3],
            ["Project", "README.md", "Visual Studio Code"]
        );
        assert_eq!(
            &seg("Error : Something went wrong - App")[..3],
            ["Error", "Something went wrong", "App"]
        );
    }

    #[test]
    fn test_urls_reduced_to_domain() {
        let segments = seg("https://www.google.com/search - Google - Chrome");
        assert!(segments.contains(&"google.com".to_string()));
        assert!(!segments.contains(&"www.google.com".to_string()));
        assert!(segments.iter().all(|s| !s.contains("https://")));

        let segments = seg("File: https://example.com/path/to/file.txt - Browser");
        assert_eq!(&segments[..3], ["File", "example.com", "Browser"]);
    }

    #[test]
    fn test_urls_joined_by_plain_word_stay_together() {
        let segments = seg("Compare: https://site1.com vs https://site2.org - Browser");
        assert_eq!(&segments[..3], ["Compare", "site1.com vs site2.org", "Browser"]);

        let segments = seg("Site A: https://site1.com | Site B: https://site2.org - Browser");
        assert_eq!(&segments[..5], ["Site A", "site1.com", "Site B", "site2.org", "Browser"]);
    }

    #[test]
    fn test_short_fragments_dropped() {
        let segments = seg("H | Long Segment Here | X | Another Good One");
        assert_eq!(&segments[..2], ["Long Segment Here", "Another Good One"]);
        assert_eq!(segments.len(), 3);
    }

    #[test]
    fn test_dots_and_slashes_are_not_delimiters() {
        let segments = seg("README.md - screen-spots-improved");
        assert_eq!(&segments[..2], ["README.md", "screen-spots-improved"]);
        assert_eq!(seg("src/main.rs"), ["src/main.rs"]);
    }

    #[test]
    fn test_duplicates_removed_case_insensitively() {
        let segments = seg("GitHub - github - Brave");
        assert_eq!(&segments[..2], ["GitHub", "Brave"]);
        assert_eq!(segments.len(), 3);
    }

    #[test]
    fn test_empty_and_blank_titles() {
        assert!(seg("").is_empty());
        assert!(seg("   ").is_empty());
        assert!(suggest_default("").is_empty());
    }

    #[test]
    fn test_single_segment_has_no_combined_entry() {
        assert_eq!(seg("Terminal"), ["Terminal"]);
        let suggestions = suggest_default("Terminal");
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].kind, SuggestionKind::Segment);
    }

    #[test]
    fn test_segments_respect_min_length_and_uniqueness() {
        let titles = [
            "a - bb - ccc - dddd",
            "X | x | Yes | YES | yes",
            "https://a.io/x - ab - abc: abcd",
            "one — two – three | four",
        ];
        for title in titles {
            for min_length in 1..6 {
                let segments = segment(title, min_length);
                let plain = if segments.len() > 1 { &segments[..segments.len() - 1] } else { &segments[..] };
                let mut seen = HashSet::new();
                for s in plain {
                    assert!(s.chars().count() >= min_length, "{s:?} shorter than {min_length}");
                    assert!(seen.insert(s.to_lowercase()), "duplicate {s:?}");
                }
            }
        }
    }

    #[test]
    fn test_domain_classification() {
        assert!(is_domain("github.com"));
        assert!(is_domain("docs.rs"));
        assert!(!is_domain("README.md"));
        assert!(!is_domain("screen-spots.py"));
        assert!(!is_domain("GitHub"));
        assert!(!is_domain("site1.com vs site2.org"));

        let suggestions = suggest_default("https://github.com/user/repo - GitHub - Brave");
        let kinds: Vec<_> = suggestions.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            [SuggestionKind::Domain, SuggestionKind::Segment, SuggestionKind::Segment, SuggestionKind::Combined]
        );
        assert_eq!(suggestions[0].pattern, Pattern::Substring("github.com".to_string()));
    }

    #[test]
    fn test_long_pull_request_title() {
        let title = "H | Enhance README and add CSV support for screen-spots | https://github.com/adam-edison/screen-spots-improved/pull/1 | Brave";
        let segments = seg(title);
        assert_eq!(
            &segments[..3],
            ["Enhance README and add CSV support for screen-spots", "github.com", "Brave"]
        );
        assert!(segments.iter().all(|s| !s.contains("adam-edison")));
    }
}
