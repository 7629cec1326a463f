//! Minimal terminal rendering for the markdown answers the agent produces.
//!
//! Only the block structure is styled: headings, bullets, quotes and fenced
//! code. Inline markup is left as written.

use crate::themes::{Slot, Theme};
use colored::Colorize;

pub fn render_markdown(text: &str, theme: &Theme) -> String {
    let mut out = Vec::new();
    let mut in_code = false;

    for line in text.lines() {
        let trimmed = line.trim_start();

        if let Some(fence) = trimmed.strip_prefix("```") {
            if in_code {
                out.push(theme.paint(Slot::Secondary, "└──").to_string());
            } else {
                let label = if fence.trim().is_empty() { "code" } else { fence.trim() };
                out.push(theme.paint(Slot::Secondary, &format!("┌── {}", label)).to_string());
            }
            in_code = !in_code;
            continue;
        }

        if in_code {
            out.push(format!(
                "{} {}",
                theme.paint(Slot::Secondary, "│"),
                theme.paint(Slot::Accent, line)
            ));
            continue;
        }

        if trimmed.starts_with('#') {
            let heading = trimmed.trim_start_matches('#').trim();
            out.push(theme.paint(Slot::Primary, heading).bold().to_string());
        } else if let Some(item) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            let indent = &line[..line.len() - trimmed.len()];
            out.push(format!(
                "{}{} {}",
                indent,
                theme.paint(Slot::Accent, "•"),
                theme.paint(Slot::Text, item)
            ));
        } else if let Some(quote) = trimmed.strip_prefix('>') {
            out.push(format!(
                "{} {}",
                theme.paint(Slot::Secondary, "▌"),
                theme.paint(Slot::Text, quote.trim_start()).italic()
            ));
        } else {
            out.push(theme.paint(Slot::Text, line).to_string());
        }
    }

    // close a fence the model forgot to terminate
    if in_code {
        out.push(theme.paint(Slot::Secondary, "└──").to_string());
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &str) -> String {
        colored::control::set_override(false);
        render_markdown(text, Theme::named("ocean"))
    }

    #[test]
    fn test_headings_and_bullets() {
        let rendered = plain("## Usage\n- first\n  * nested\nplain text");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines, vec!["Usage", "• first", "  • nested", "plain text"]);
    }

    #[test]
    fn test_code_fence_is_framed() {
        let rendered = plain("```rust\nlet x = 1;\n```");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines, vec!["┌── rust", "│ let x = 1;", "└──"]);
    }

    #[test]
    fn test_unterminated_fence_is_closed() {
        let rendered = plain("```\n# not a heading");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines, vec!["┌── code", "│ # not a heading", "└──"]);
    }

    #[test]
    fn test_quote() {
        assert_eq!(plain("> note"), "▌ note");
    }
}
