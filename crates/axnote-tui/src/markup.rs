//! Prose renderer.
//!
//! Renders a prose cell's (already normalized) markup source into plain
//! terminal text for the output region. Raw HTML events are dropped rather
//! than passed through: the terminal neither renders markup nor should a
//! screen reader speak it.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

/// Cap on rendered size; a prose cell that expands past this fails instead
/// of flooding the output region.
const MAX_RENDERED_BYTES: usize = 1 << 20;

#[derive(Debug, thiserror::Error)]
pub enum MarkupRenderError {
    #[error("rendered prose is too large ({bytes} bytes)")]
    TooLarge { bytes: usize },
}

fn ensure_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn ensure_blank_line(out: &mut String) {
    ensure_line(out);
    if !out.is_empty() && !out.ends_with("\n\n") {
        out.push('\n');
    }
}

pub fn render_prose(source: &str) -> Result<String, MarkupRenderError> {
    let options =
        Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES | Options::ENABLE_TASKLISTS;
    let mut out = String::new();
    let mut list_depth: usize = 0;

    for event in Parser::new_ext(source, options) {
        match event {
            Event::Start(tag) => match tag {
                Tag::Paragraph | Tag::Heading { .. } | Tag::CodeBlock(_) | Tag::BlockQuote(_) => {
                    ensure_blank_line(&mut out);
                }
                Tag::List(_) => {
                    list_depth += 1;
                    ensure_line(&mut out);
                }
                Tag::Item => {
                    ensure_line(&mut out);
                    for _ in 1..list_depth {
                        out.push_str("  ");
                    }
                    out.push_str("- ");
                }
                _ => {}
            },
            Event::End(tag) => match tag {
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::CodeBlock | TagEnd::Item => {
                    ensure_line(&mut out);
                }
                TagEnd::List(_) => {
                    list_depth = list_depth.saturating_sub(1);
                }
                _ => {}
            },
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => {
                ensure_blank_line(&mut out);
                out.push_str("---");
                ensure_line(&mut out);
            }
            Event::TaskListMarker(done) => out.push_str(if done { "[x] " } else { "[ ] " }),
            // The sanitize step: raw markup never reaches the output region.
            Event::Html(_) | Event::InlineHtml(_) => {}
            _ => {}
        }
        if out.len() > MAX_RENDERED_BYTES {
            return Err(MarkupRenderError::TooLarge { bytes: out.len() });
        }
    }

    Ok(out.trim_matches('\n').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headings_and_paragraphs_as_plain_text() {
        let text = render_prose("# Title\n\nfirst paragraph\n\nsecond paragraph").unwrap();
        assert_eq!(text, "Title\n\nfirst paragraph\n\nsecond paragraph");
    }

    #[test]
    fn renders_list_items_with_markers() {
        let text = render_prose("- one\n- two").unwrap();
        assert_eq!(text, "- one\n- two");
    }

    #[test]
    fn drops_raw_html() {
        let text = render_prose("before\n\n<script>alert('x')</script>\n\nafter").unwrap();
        assert!(!text.contains("script"));
        assert!(text.contains("before"));
        assert!(text.contains("after"));
    }

    #[test]
    fn inline_code_is_kept_verbatim() {
        let text = render_prose("use `let x = 1;` here").unwrap();
        assert_eq!(text, "use let x = 1; here");
    }

    #[test]
    fn oversized_render_is_an_error() {
        let source = "x".repeat(MAX_RENDERED_BYTES + 16);
        assert!(matches!(
            render_prose(&source),
            Err(MarkupRenderError::TooLarge { .. })
        ));
    }
}
