use crate::themes::{Slot, Theme};
use colored::*;
use std::io::Write;

pub fn print_header(theme: &Theme, text: &str) {
    println!("\n{}", theme.paint(Slot::Primary, text).bold());
    println!("{}", theme.paint(Slot::Primary, &"=".repeat(text.chars().count())));
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_warning(text: &str) {
    println!("{}", text.yellow());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(theme: &Theme, text: &str) {
    println!("{}", theme.paint(Slot::Secondary, text));
}

pub fn print_dim(text: &str) {
    println!("{}", text.dimmed());
}

pub fn print_prompt(theme: &Theme, text: &str) {
    print!("{}", theme.paint(Slot::Primary, text).bold());
    let _ = std::io::stdout().flush();
}

/// Box `body` under a title, e.g. for agent errors.
pub fn render_panel(title: &str, body: &str) -> String {
    let width = body
        .lines()
        .map(|line| line.chars().count())
        .chain(std::iter::once(title.chars().count() + 2))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let title_pad = width - title.chars().count();
    out.push_str(&format!("╭─ {} {}╮\n", title, "─".repeat(title_pad.saturating_sub(1))));
    for line in body.lines() {
        let pad = width - line.chars().count();
        out.push_str(&format!("│ {}{} │\n", line, " ".repeat(pad)));
    }
    out.push_str(&format!("╰{}╯", "─".repeat(width + 2)));
    out
}

pub fn print_error_panel(title: &str, body: &str) {
    println!("{}", render_panel(title, body).red());
}

/// Plain-text table with columns padded to the widest cell.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let format_row = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{}{}", cell, " ".repeat(width - cell.chars().count())))
            .collect::<Vec<_>>()
            .join(" │ ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![format_row(headers.to_vec())];
    lines.push(
        widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─"),
    );
    for row in rows {
        let cells: Vec<&str> = (0..widths.len())
            .map(|i| row.get(i).map(String::as_str).unwrap_or(""))
            .collect();
        lines.push(format_row(cells));
    }
    lines.join("\n")
}
