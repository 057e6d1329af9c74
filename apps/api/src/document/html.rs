//! Delta → HTML renderer. Pure; the caller re-renders the whole delta on every change.

use crate::document::delta::{Attributes, Delta, NamedSize, Run, Size};

const LINE_BREAK: &str = "<br/>";

/// Renders a delta to markup, preserving run order and styling.
pub fn render_html(delta: &Delta) -> String {
    let mut out = String::new();
    for run in delta {
        render_run(run, &mut out);
    }
    out
}

fn render_run(run: &Run, out: &mut String) {
    let text = run.text.as_str();
    if text.is_empty() {
        return;
    }

    if text.trim().is_empty() && text.contains('\n') {
        out.push_str(LINE_BREAK);
        return;
    }

    let body = escape_html(text).replace('\n', LINE_BREAK);
    let style = run.attributes.as_ref().map(style_for).unwrap_or_default();

    if text.contains('\n') {
        if style.is_empty() {
            out.push_str("<div>");
        } else {
            out.push_str(&format!("<div style=\"{style}\">"));
        }
        out.push_str(&body);
        out.push_str("</div>");
    } else if !style.is_empty() {
        out.push_str(&format!("<span style=\"{style}\">{body}</span>"));
    } else {
        out.push_str(&body);
    }
}

/// Inline CSS for a run's attributes. Empty when nothing applies.
pub fn style_for(attrs: &Attributes) -> String {
    let mut rules = Vec::new();
    if attrs.is_bold() {
        rules.push("font-weight: bold;".to_string());
    }
    if attrs.is_italic() {
        rules.push("font-style: italic;".to_string());
    }
    if let Some(size) = attrs.size {
        rules.push(format!("font-size: {};", css_size(size)));
    }
    if let Some(font) = &attrs.font {
        rules.push(format!("font-family: {};", escape_attr(font)));
    }
    rules.join(" ")
}

fn css_size(size: Size) -> String {
    match size {
        Size::Absolute(v) => format!("{v}px"),
        Size::Named(NamedSize::Small) => "0.75em".to_string(),
        Size::Named(NamedSize::Large) => "1.5em".to_string(),
        Size::Named(NamedSize::Huge) => "2.5em".to_string(),
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// Font names end up inside a double-quoted style attribute.
fn escape_attr(text: &str) -> String {
    escape_html(text).replace(';', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::delta::Run;

    #[test]
    fn test_bold_only_run() {
        let delta = Delta::from(vec![Run::styled("Hi", Attributes::bold())]);
        let html = render_html(&delta);

        assert_eq!(html, "<span style=\"font-weight: bold;\">Hi</span>");
        assert!(!html.contains("font-style"));
        assert!(!html.contains("font-size"));
        assert!(!html.contains("font-family"));
    }

    #[test]
    fn test_lone_newline_is_standalone_break() {
        let delta = Delta::from(vec![
            Run::plain("a"),
            Run::styled("\n", Attributes::bold()),
            Run::plain(" \n "),
        ]);
        assert_eq!(render_html(&delta), "a<br/><br/>");
    }

    #[test]
    fn test_embedded_newline_becomes_block() {
        let delta = Delta::from(vec![Run::plain("John Doe\n\n")]);
        assert_eq!(render_html(&delta), "<div>John Doe<br/><br/></div>");
    }

    #[test]
    fn test_styled_block_keeps_style() {
        let attrs = Attributes {
            bold: Some(true),
            size: Some(Size::Named(NamedSize::Large)),
            ..Attributes::default()
        };
        let delta = Delta::from(vec![Run::styled("NAME\n", attrs)]);
        assert_eq!(
            render_html(&delta),
            "<div style=\"font-weight: bold; font-size: 1.5em;\">NAME<br/></div>"
        );
    }

    #[test]
    fn test_unstyled_inline_is_bare_and_escaped() {
        let delta = Delta::from(vec![Run::plain("a < b & c")]);
        assert_eq!(render_html(&delta), "a &lt; b &amp; c");
    }

    #[test]
    fn test_all_attributes() {
        let attrs = Attributes {
            bold: Some(false),
            italic: Some(true),
            size: Some(Size::Absolute(11.0)),
            font: Some("Times New Roman".into()),
        };
        assert_eq!(
            style_for(&attrs),
            "font-style: italic; font-size: 11px; font-family: Times New Roman;"
        );
    }

    #[test]
    fn test_empty_delta_renders_nothing() {
        assert_eq!(render_html(&Delta::new()), "");
    }
}
