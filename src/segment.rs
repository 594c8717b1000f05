//! Chapter text segmentation
//!
//! Turns raw chapter markup into an ordered list of speakable units.
//! Markup handling is deliberately small: strip tags, drop non-textual
//! elements wholesale, unescape the handful of entities that actually
//! occur in book content, then split on line breaks.

/// Split raw chapter content into speakable units.
///
/// Indices into the returned vector are the unit indices used throughout
/// the engine: dense, 0-based, stable for the lifetime of the chapter.
#[must_use]
pub fn segment_chapter(raw: &str) -> Vec<String> {
    let stripped = strip_markup(raw);
    let text = unescape_entities(&stripped);

    text.lines()
        .map(str::trim)
        .filter(|line| is_speakable(line))
        .map(ToString::to_string)
        .collect()
}

/// A unit is speakable if it contains at least one alphanumeric character.
///
/// Punctuation-only lines ("***", "— — —") render fine on a page but
/// produce garbage audio, so they are dropped before synthesis.
#[must_use]
pub fn is_speakable(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}

/// Remove markup, keeping inner text.
///
/// `<svg>` elements are dropped together with their body; everything inside
/// them is drawing instructions, not prose. Self-contained media tags
/// (`<img>`, `<image>`) carry no inner text and disappear with the tag
/// itself. Block-level boundaries are turned into line breaks so chapters
/// without literal newlines still segment.
fn strip_markup(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];

        let Some(close) = tail.find('>') else {
            // Unterminated tag: treat the remainder as literal text
            out.push_str(&rest[open..]);
            return out;
        };

        let tag = &tail[..close];
        let name = tag_name(tag);
        rest = &tail[close + 1..];

        if name == "svg" && !tag.ends_with('/') {
            rest = skip_element(rest, "svg");
        } else if emits_line_break(tag, &name) {
            out.push('\n');
        }
    }

    out.push_str(rest);
    out
}

/// Lowercased tag name, with any leading `/` removed
fn tag_name(tag: &str) -> String {
    tag.trim_start()
        .trim_start_matches('/')
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Whether this tag marks a block boundary worth a line break
fn emits_line_break(tag: &str, name: &str) -> bool {
    if matches!(name, "br" | "hr") {
        return true;
    }
    tag.trim_start().starts_with('/')
        && matches!(
            name,
            "p" | "div" | "li" | "tr" | "blockquote" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
        )
}

/// Skip past the matching `</name>` close tag, returning the remainder.
///
/// If the element is never closed, the rest of the input is markup and is
/// dropped entirely.
fn skip_element<'a>(rest: &'a str, name: &str) -> &'a str {
    let needle = format!("</{name}");
    let mut cursor = rest;

    loop {
        let Some(pos) = find_ignore_ascii_case(cursor, &needle) else {
            return "";
        };
        let after = &cursor[pos + needle.len()..];
        let trimmed = after.trim_start();
        if let Some(stripped) = trimmed.strip_prefix('>') {
            return stripped;
        }
        cursor = after;
    }
}

/// Byte-wise ASCII case-insensitive substring search.
///
/// The needle is always ASCII here, so every match starts and ends on a
/// character boundary.
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || h.len() < n.len() {
        return None;
    }
    (0..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

/// Replace the common named entities with their characters
fn unescape_entities(text: &str) -> String {
    const ENTITIES: &[(&str, char)] = &[
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&#39;", '\''),
        ("&apos;", '\''),
        ("&nbsp;", ' '),
    ];

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        let known = ENTITIES.iter().find(|(name, _)| tail.starts_with(name));
        match known {
            Some((name, ch)) => {
                out.push(*ch);
                rest = &tail[name.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_line_breaks() {
        let units = segment_chapter("First line\nSecond line\nThird line");
        assert_eq!(units, vec!["First line", "Second line", "Third line"]);
    }

    #[test]
    fn drops_blank_and_punctuation_only_lines() {
        let units = segment_chapter("Hello\n\n!!!\nWorld");
        assert_eq!(units, vec!["Hello", "World"]);
    }

    #[test]
    fn trims_whitespace() {
        let units = segment_chapter("  padded  \n\t tabbed \t");
        assert_eq!(units, vec!["padded", "tabbed"]);
    }

    #[test]
    fn strips_tags_keeping_inner_text() {
        let units = segment_chapter("<p>He said <em>hello</em> to her.</p>");
        assert_eq!(units, vec!["He said hello to her."]);
    }

    #[test]
    fn block_close_tags_split_units() {
        let units = segment_chapter("<p>One paragraph.</p><p>Another paragraph.</p>");
        assert_eq!(units, vec!["One paragraph.", "Another paragraph."]);
    }

    #[test]
    fn br_splits_units() {
        let units = segment_chapter("Line one<br/>Line two");
        assert_eq!(units, vec!["Line one", "Line two"]);
    }

    #[test]
    fn removes_img_tags_entirely() {
        let units = segment_chapter("Before <img src=\"cover.png\" alt=\"x\"/> after");
        assert_eq!(units, vec!["Before  after"]);
    }

    #[test]
    fn removes_svg_with_inner_content() {
        let units =
            segment_chapter("Intro\n<svg viewBox=\"0 0 1 1\"><text>ornament</text></svg>\nOutro");
        assert_eq!(units, vec!["Intro", "Outro"]);
    }

    #[test]
    fn svg_close_tag_is_case_insensitive() {
        let units = segment_chapter("A\n<SVG><circle/></SVG>\nB");
        assert_eq!(units, vec!["A", "B"]);
    }

    #[test]
    fn unclosed_svg_drops_remainder() {
        let units = segment_chapter("Kept\n<svg><circle/>never closed");
        assert_eq!(units, vec!["Kept"]);
    }

    #[test]
    fn unescapes_entities() {
        let units = segment_chapter("Tom &amp; Jerry &lt;3\nShe said &quot;hi&quot;");
        assert_eq!(units, vec!["Tom & Jerry <3", "She said \"hi\""]);
    }

    #[test]
    fn unescapes_numeric_apostrophe() {
        let units = segment_chapter("It&#39;s fine\nIt&apos;s also fine");
        assert_eq!(units, vec!["It's fine", "It's also fine"]);
    }

    #[test]
    fn nbsp_only_line_is_dropped() {
        let units = segment_chapter("Real text\n&nbsp;&nbsp;\nMore text");
        assert_eq!(units, vec!["Real text", "More text"]);
    }

    #[test]
    fn unknown_entity_kept_verbatim() {
        let units = segment_chapter("Fish &chips; tonight");
        assert_eq!(units, vec!["Fish &chips; tonight"]);
    }

    #[test]
    fn unterminated_tag_is_literal_text() {
        let units = segment_chapter("At 3 < 4 we stop");
        assert_eq!(units, vec!["At 3 < 4 we stop"]);
    }

    #[test]
    fn empty_input_yields_no_units() {
        assert!(segment_chapter("").is_empty());
        assert!(segment_chapter("\n\n\n").is_empty());
    }

    #[test]
    fn preserves_relative_order() {
        let raw = "<h1>Title</h1>alpha\n<p>beta</p>\n---\ngamma";
        assert_eq!(segment_chapter(raw), vec!["Title", "alpha", "beta", "gamma"]);
    }

    #[test]
    fn is_speakable_requires_alphanumeric() {
        assert!(is_speakable("word"));
        assert!(is_speakable("7"));
        assert!(is_speakable("ünïcode"));
        assert!(!is_speakable("!!!"));
        assert!(!is_speakable("— — —"));
        assert!(!is_speakable(""));
    }
}
