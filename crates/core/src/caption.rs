//! Text that goes into the EXIF description block.

use regex::Regex;
use std::sync::LazyLock;

pub const CAPTION_MAX_CHARS: usize = 500;
pub const TAG_LIST_MAX_CHARS: usize = 1000;
pub const KEYWORDS_PREFIX: &str = "Keywords:";
pub const EDITED_MARKER: &str = "edited";

const ELLIPSIS: &str = "...";
const SECTION_SEPARATOR: &str = "\n\n";

// Default `toString()` output of JVM objects (`[B@1b6d3586`, `java.lang.String@6d06d69c`)
// that older exporters wrote instead of the actual text.
static OBJECT_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\[+[A-Za-z][\w$.;]*|[A-Za-z_$][\w$]*(\.[A-Za-z_$][\w$]*)+)@[0-9a-f]{1,8}\s*$")
        .expect("object reference pattern")
});

pub fn sanitize_caption(input: &str) -> String {
    let text = to_single_byte(input);
    let text = text.trim();
    truncate_chars(text, CAPTION_MAX_CHARS)
}

/// Replaces typographic characters with ASCII and anything left outside
/// Latin-1 with `?`.
pub fn to_single_byte(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\u{2013}' | '\u{2014}' | '\u{2212}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{2018}' | '\u{2019}' | '\u{201A}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' => out.push('"'),
            '\u{20AC}' => out.push_str("[EUR]"),
            '\u{00A3}' => out.push_str("[GBP]"),
            '\u{00A5}' => out.push_str("[JPY]"),
            '\u{2122}' => out.push_str("[TM]"),
            '\u{00A9}' => out.push_str("[C]"),
            '\u{00AE}' => out.push_str("[R]"),
            c if (c as u32) <= 0xFF => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Builds `Keywords: a, b, c`. Tags that would push the list past
/// [`TAG_LIST_MAX_CHARS`] are dropped whole.
pub fn keywords_line(tags: &[String]) -> Option<String> {
    let mut sorted: Vec<String> = tags
        .iter()
        .map(|tag| to_single_byte(tag.trim()))
        .filter(|tag| !tag.is_empty())
        .collect();
    sorted.sort();
    sorted.dedup();

    let mut list = String::new();
    for tag in sorted {
        let extra = if list.is_empty() { 0 } else { 2 };
        if list.chars().count() + extra + tag.chars().count() > TAG_LIST_MAX_CHARS {
            continue;
        }
        if !list.is_empty() {
            list.push_str(", ");
        }
        list.push_str(&tag);
    }

    if list.is_empty() {
        None
    } else {
        Some(format!("{KEYWORDS_PREFIX} {list}"))
    }
}

/// Cuts `text` to at most `limit` characters, ending in `...` when cut.
/// A zero limit drops the text.
pub fn truncate_to_limit(text: &str, limit: usize) -> Option<String> {
    if limit == 0 || text.is_empty() {
        return None;
    }
    Some(truncate_chars(text, limit))
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    if limit <= ELLIPSIS.len() {
        return text.chars().take(limit).collect();
    }
    let mut out: String = text.chars().take(limit - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}

pub fn is_object_reference(text: &str) -> bool {
    OBJECT_REFERENCE.is_match(text)
}

/// Existing description text worth keeping, without any keywords line a
/// previous export added.
pub fn clean_existing_description(text: &str) -> Option<String> {
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if text.is_empty() || is_object_reference(text) {
        return None;
    }

    let kept = text
        .split(SECTION_SEPARATOR)
        .filter(|section| !section.trim_start().starts_with(KEYWORDS_PREFIX))
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR);
    let kept = kept.trim();
    if kept.is_empty() {
        None
    } else {
        Some(kept.to_string())
    }
}

/// Joins the sections with blank lines. A caption that already is one of
/// the sections of the existing text is not repeated.
pub fn compose_description(
    existing: Option<&str>,
    caption: Option<&str>,
    keywords: Option<&str>,
) -> Option<String> {
    let caption = caption.filter(|c| {
        !existing.is_some_and(|e| {
            e.split(SECTION_SEPARATOR)
                .any(|section| section.trim() == c.trim())
        })
    });
    let sections: Vec<&str> = [existing, caption, keywords]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect();

    if sections.is_empty() {
        None
    } else {
        Some(sections.join(SECTION_SEPARATOR))
    }
}

pub fn edited_caption(caption: Option<&str>) -> String {
    match caption.map(str::trim).filter(|c| !c.is_empty()) {
        Some(caption) => format!("{caption} ({EDITED_MARKER})"),
        None => EDITED_MARKER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typographic_characters_become_ascii() {
        assert_eq!(
            sanitize_caption("Paris \u{2013} day 1\u{2026} \u{201C}wow\u{201D} \u{20AC}5 \u{2122}"),
            "Paris - day 1... \"wow\" [EUR]5 [TM]"
        );
        assert_eq!(sanitize_caption("caf\u{e9} \u{6771}\u{4eac}"), "caf\u{e9} ??");
    }

    #[test]
    fn caption_is_capped_at_500_chars() {
        let caption = sanitize_caption(&"x".repeat(900));
        assert_eq!(caption.chars().count(), CAPTION_MAX_CHARS);
        assert!(caption.ends_with("..."));
    }

    #[test]
    fn keywords_are_sorted_and_deduplicated() {
        let tags = vec!["paris".to_string(), "2024".to_string(), "paris".to_string()];
        assert_eq!(keywords_line(&tags).as_deref(), Some("Keywords: 2024, paris"));
        assert_eq!(keywords_line(&[]), None);
    }

    #[test]
    fn keyword_cap_drops_whole_tags() {
        let tags: Vec<String> = (0..200).map(|i| format!("tag{i:04}-{}", "z".repeat(10))).collect();
        let line = keywords_line(&tags).expect("line");
        let list = line.trim_start_matches("Keywords: ");
        assert!(list.chars().count() <= TAG_LIST_MAX_CHARS);
        for part in list.split(", ") {
            assert_eq!(part.len(), 18, "tag cut mid-text: {part}");
        }
    }

    #[test]
    fn ladder_truncation_cuts_mid_text() {
        assert_eq!(truncate_to_limit("Keywords: alpha, beta", 12).as_deref(), Some("Keywords:..."));
        assert_eq!(truncate_to_limit("short", 50).as_deref(), Some("short"));
        assert_eq!(truncate_to_limit("anything", 0), None);
    }

    #[test]
    fn object_references_are_detected() {
        assert!(is_object_reference("[B@1b6d3586"));
        assert!(is_object_reference("java.lang.String@6d06d69c"));
        assert!(is_object_reference("[Ljava.lang.String;@7852e922"));
        assert!(is_object_reference("[B@1f"));
        assert!(is_object_reference("java.lang.Object@a"));
        assert!(!is_object_reference("mail me at bob@cafe123"));
        assert!(!is_object_reference("Sunset at the beach"));
    }

    #[test]
    fn existing_description_drops_old_keywords() {
        let cleaned = clean_existing_description("Holiday\n\nKeywords: a, b\0").expect("text");
        assert_eq!(cleaned, "Holiday");
        assert_eq!(clean_existing_description("Keywords: a"), None);
        assert_eq!(clean_existing_description("[B@1b6d3586"), None);
    }

    #[test]
    fn description_sections_are_separated_by_blank_lines() {
        let text = compose_description(Some("Camera text"), Some("Caption"), Some("Keywords: a"));
        assert_eq!(text.as_deref(), Some("Camera text\n\nCaption\n\nKeywords: a"));
        let text = compose_description(Some("Camera text\n\nCaption"), Some("Caption"), None);
        assert_eq!(text.as_deref(), Some("Camera text\n\nCaption"));
        assert_eq!(compose_description(None, None, None), None);
    }

    #[test]
    fn caption_inside_longer_existing_text_is_still_added() {
        let text = compose_description(Some("Paris trip 2019"), Some("Paris"), None);
        assert_eq!(text.as_deref(), Some("Paris trip 2019\n\nParis"));
    }

    #[test]
    fn edited_caption_appends_marker() {
        assert_eq!(edited_caption(Some("Sunset")), "Sunset (edited)");
        assert_eq!(edited_caption(None), "edited");
    }
}
