//! Markdown header sections.
//!
//! A section starts at a `#`, `##` or `###` heading line and runs until the next one. Heading
//! lines stay in the section they open, and headings inside fenced code blocks are ignored.

use super::types::HeaderPath;

/// A slice of the document sharing one header path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Section<'a> {
    pub text: &'a str,
    /// Character offset of the section within the document.
    pub start_offset: usize,
    pub headers: HeaderPath,
}

/// Split `text` into header sections, skipping any that hold only whitespace.
///
/// Concatenating every section (including the skipped blank ones) reproduces `text`.
pub(crate) fn split_sections(text: &str) -> Vec<Section<'_>> {
    let mut sections = Vec::new();
    let mut headers = HeaderPath::default();
    let (mut start_byte, mut start_char) = (0, 0);
    let (mut byte_pos, mut char_pos) = (0, 0);
    let mut in_fence = false;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
        } else if !in_fence {
            if let Some((level, title)) = parse_heading(trimmed) {
                push_section(
                    &mut sections,
                    &text[start_byte..byte_pos],
                    start_char,
                    &headers,
                );
                headers.enter(level, title);
                start_byte = byte_pos;
                start_char = char_pos;
            }
        }
        byte_pos += line.len();
        char_pos += line.chars().count();
    }
    push_section(&mut sections, &text[start_byte..], start_char, &headers);
    sections
}

fn push_section<'a>(
    sections: &mut Vec<Section<'a>>,
    text: &'a str,
    start_offset: usize,
    headers: &HeaderPath,
) {
    if !text.trim().is_empty() {
        sections.push(Section {
            text,
            start_offset,
            headers: headers.clone(),
        });
    }
}

/// Level and title of an ATX heading up to level 3.
fn parse_heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if !(1..=3).contains(&level) {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let title = rest.trim();
    (!title.is_empty()).then_some((level, title))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUIDE: &str = "Intro line\n\
        # Guide\n\
        Text A\n\
        ## Setup\n\
        Step one\n\
        ```\n\
        # not a heading\n\
        ```\n\
        ### Detail\n\
        Deep\n\
        # Next\n\
        End\n";

    #[test]
    fn parse_heading_accepts_levels_one_to_three() {
        assert_eq!(parse_heading("# Title"), Some((1, "Title")));
        assert_eq!(parse_heading("###\tDeep  "), Some((3, "Deep")));
        assert_eq!(parse_heading("#### Too deep"), None);
        assert_eq!(parse_heading("#hashtag"), None);
        assert_eq!(parse_heading("## "), None);
        assert_eq!(parse_heading("plain"), None);
    }

    #[test]
    fn sections_follow_heading_hierarchy() {
        let sections = split_sections(GUIDE);
        let texts: Vec<&str> = sections.iter().map(|s| s.text).collect();
        assert_eq!(
            texts,
            vec![
                "Intro line\n",
                "# Guide\nText A\n",
                "## Setup\nStep one\n```\n# not a heading\n```\n",
                "### Detail\nDeep\n",
                "# Next\nEnd\n",
            ]
        );

        assert!(sections[0].headers.is_empty());
        assert_eq!(sections[1].headers.h1.as_deref(), Some("Guide"));
        assert_eq!(sections[2].headers.h2.as_deref(), Some("Setup"));
        assert_eq!(sections[3].headers.h1.as_deref(), Some("Guide"));
        assert_eq!(sections[3].headers.h3.as_deref(), Some("Detail"));
        assert_eq!(sections[4].headers.h1.as_deref(), Some("Next"));
        assert!(sections[4].headers.h2.is_none());
    }

    #[test]
    fn section_offsets_point_into_the_document() {
        let text = "préface ✓\n# Über\nJa\n\n## Zwei\nNein";
        let sections = split_sections(text);
        assert_eq!(sections.len(), 3);
        for section in &sections {
            let expected: String = text
                .chars()
                .skip(section.start_offset)
                .take(section.text.chars().count())
                .collect();
            assert_eq!(section.text, expected);
        }
        let rebuilt: String = sections.iter().map(|s| s.text).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn blank_sections_are_skipped() {
        let sections = split_sections("\n\n# Only\nbody");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].start_offset, 2);
        assert!(split_sections("").is_empty());
    }
}
