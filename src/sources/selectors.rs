//! Small, allocation-light helpers for pulling values out of fetched HTML.
//!
//! Source documents drift over time, so each client tries an ordered list of
//! parse attempts. An attempt is a pure function from the document to an
//! optional match; the first `Some` wins.

use regex::Regex;
use std::sync::LazyLock;

/// A single structural parse attempt over a document
pub type ParseAttempt<T> = fn(&str) -> Option<T>;

/// Run attempts in priority order, returning the first match and its index
pub fn first_match<T>(document: &str, attempts: &[ParseAttempt<T>]) -> Option<(usize, T)> {
    attempts
        .iter()
        .enumerate()
        .find_map(|(idx, attempt)| attempt(document).map(|found| (idx, found)))
}

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));
static TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([01]?\d|2[0-3])\s*[:hH]\s*([0-5]\d)\b").expect("time pattern is valid"));
static OPEN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<([a-z][a-z0-9]*)\b[^>]*>").expect("open tag pattern is valid"));
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("attribute pattern is valid")
});

/// Strip markup, decode the common entities and collapse whitespace
pub fn clean_text(fragment: &str) -> String {
    let without_tags = TAG.replace_all(fragment, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&deg;", "°")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

/// Visible text split at element and line boundaries, one cleaned entry per line
pub fn text_lines(document: &str) -> Vec<String> {
    TAG.replace_all(document, "\n")
        .lines()
        .map(clean_text)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Parse a number out of decorated text ("18,5 °C", "12 km/h", "1 013 hPa").
///
/// Leading decoration is skipped. Once a digit is seen, only digits, spaces
/// and one decimal separator continue the number; anything else ends it.
/// Returns `None` when nothing numeric was found.
pub fn parse_number(text: &str) -> Option<f64> {
    let mut out = String::with_capacity(text.len());
    let mut seen_digit = false;
    let mut seen_separator = false;

    for ch in text.chars() {
        match ch {
            '0'..='9' => {
                out.push(ch);
                seen_digit = true;
            }
            '-' if !seen_digit && out.is_empty() => out.push('-'),
            '.' | ',' if seen_digit && !seen_separator => {
                out.push('.');
                seen_separator = true;
            }
            ' ' | '\u{a0}' if seen_digit => {}
            _ if seen_digit => break,
            _ => {}
        }
    }

    if !seen_digit {
        return None;
    }
    out.trim_end_matches('.').parse().ok()
}

/// Extract `HH:MM` (also `HHhMM`) as hour and minute
pub fn parse_time(text: &str) -> Option<chrono::NaiveTime> {
    let caps = TIME.captures(text)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
    chrono::NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Value of an attribute inside a single tag. Empty values count as absent.
pub fn attribute(tag: &str, name: &str) -> Option<String> {
    let value = raw_attribute(tag, name)?.trim().to_string();
    (!value.is_empty()).then_some(value)
}

fn raw_attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    ATTRIBUTE
        .captures_iter(tag)
        .filter(|caps| caps[1].eq_ignore_ascii_case(name))
        .find_map(|caps| caps.get(2).or_else(|| caps.get(3)))
        .map(|m| m.as_str())
}

/// Whether the tag's class list contains `class` as a whole token
pub fn has_class(tag: &str, class: &str) -> bool {
    raw_attribute(tag, "class")
        .is_some_and(|classes| classes.split_whitespace().any(|token| token == class))
}

/// All opening tags carrying the given attribute
pub fn tags_with_attribute<'a>(document: &'a str, name: &str) -> Vec<&'a str> {
    OPEN_TAG
        .find_iter(document)
        .map(|m| m.as_str())
        .filter(|tag| raw_attribute(tag, name).is_some())
        .collect()
}

/// First value of an attribute anywhere in the document
pub fn first_attribute(document: &str, name: &str) -> Option<String> {
    tags_with_attribute(document, name)
        .into_iter()
        .find_map(|tag| attribute(tag, name))
}

/// Text directly inside the first element whose class list contains `class`
pub fn text_by_class(document: &str, class: &str) -> Option<String> {
    OPEN_TAG
        .find_iter(document)
        .filter(|m| has_class(m.as_str(), class))
        .map(|m| {
            let rest = &document[m.end()..];
            clean_text(&rest[..rest.find('<').unwrap_or(rest.len())])
        })
        .find(|text| !text.is_empty())
}

/// Inner HTML of every `<tag ...>...</tag>` block whose class list contains `class`.
/// Blocks of the same tag do not nest.
pub fn blocks_by_class<'a>(document: &'a str, tag: &str, class: &str) -> Vec<&'a str> {
    let closing = format!("</{}", tag.to_ascii_lowercase());

    OPEN_TAG
        .captures_iter(document)
        .filter(|caps| caps[1].eq_ignore_ascii_case(tag))
        .filter_map(|caps| {
            let open = caps.get(0)?;
            if !has_class(open.as_str(), class) {
                return None;
            }
            let rest = &document[open.end()..];
            // ASCII lowercasing keeps byte offsets intact
            let end = rest.to_ascii_lowercase().find(&closing)?;
            Some(&rest[..end])
        })
        .collect()
}

/// Opening tag and inner HTML of every `<td>`/`<th>` cell in a row
pub fn cells(row: &str) -> Vec<(&str, &str)> {
    static CELL: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?is)(<t[dh]\b[^>]*>)(.*?)</t[dh]>").expect("cell pattern is valid")
    });
    CELL.captures_iter(row)
        .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
        .collect()
}
