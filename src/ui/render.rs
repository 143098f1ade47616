//! Plain-text rendering of the view model.
//!
//! All remote text passes through [`strip_control_chars`] before it is
//! printed.

use crate::app::App;
use crate::menu::{Menu, Selection};
use crate::sync::FeedPhase;
use crate::util::{single_line, strip_control_chars, truncate_to_width, wrap_to_width};
use std::fmt::Write;

/// Column width for wrapped body text.
const WRAP_WIDTH: usize = 78;
/// Column width for one-line titles.
const TITLE_WIDTH: usize = 60;

const HELP: &str = "\
Commands:
  m                 show the menu
  s <main> <sub>    select a sub-category (two-level menu)
  s <category>      select a category (flat menu)
  g <main>          switch main category
  r                 refresh the current selection
  p <n>             read item n aloud / stop (0 = summary)
  o <n>             open link n in the browser
  v                 show the current view again
  h                 this help
  q                 quit
";

pub fn render_help() -> &'static str {
    HELP
}

/// Menu listing with the active leaf marked `*`.
pub fn render_menu(menu: &Menu, current: &Selection) -> String {
    let mut out = String::new();
    match menu {
        Menu::Flat(categories) => {
            for name in categories {
                let mark = if current.leaf() == name.as_str() && current.main().is_none() {
                    '*'
                } else {
                    ' '
                };
                let _ = writeln!(out, " {} {}", mark, name);
            }
        }
        Menu::Nested(groups) => {
            for group in groups {
                let _ = writeln!(out, "{}", group.name);
                for sub in &group.subs {
                    let active = current.main() == Some(group.name.as_str()) && current.leaf() == sub.as_str();
                    let mark = if active { '*' } else { ' ' };
                    let _ = writeln!(out, "  {} {}", mark, sub);
                }
            }
        }
    }
    out
}

/// Full view: quote, selection header, body with numbered items, links,
/// and the status line.
pub fn render_view(app: &App) -> String {
    let view = app.view();
    let mut out = String::new();

    if let Some(quote) = view.quote {
        let text = strip_control_chars(&quote.content);
        let _ = writeln!(out, "「{}」", single_line(&text));
        if !quote.author.is_empty() {
            let _ = writeln!(out, "    — {}", strip_control_chars(&quote.author));
        }
        out.push('\n');
    }

    let _ = writeln!(out, "== {} ==", view.selection);

    match (view.phase, view.content) {
        (FeedPhase::Idle, _) => out.push_str("(nothing loaded yet)\n"),
        (FeedPhase::Loading, None) => out.push_str("Loading…\n"),
        (FeedPhase::Empty, _) => out.push_str("No content for this category yet.\n"),
        (FeedPhase::Failed(kind), _) => {
            let _ = writeln!(out, "Failed to load: {} (r to retry)", kind);
        }
        (phase, Some(content)) => {
            if phase == FeedPhase::Loading {
                out.push_str("Refreshing…\n");
            }
            if let Some(date) = content.date {
                let _ = writeln!(out, "{}", date.format("%Y-%m-%d"));
            }
            push_item(&mut out, 0, "", &content.content, view.playback_index);

            for (i, card) in content.cards.iter().enumerate() {
                out.push('\n');
                push_item(&mut out, i + 1, &card.title, &card.body, view.playback_index);
            }

            let targets = content.open_targets();
            if !targets.is_empty() {
                out.push_str("\nLinks:\n");
                for (i, (title, url)) in targets.iter().enumerate() {
                    let label = if title.is_empty() { url } else { title };
                    let label = single_line(&strip_control_chars(label));
                    let _ = writeln!(out, "  [{}] {}", i + 1, truncate_to_width(&label, TITLE_WIDTH));
                }
            }
        }
        // Loaded always carries content
        (FeedPhase::Loaded, None) => {}
    }

    if let Some((msg, _)) = &app.status_message {
        let _ = writeln!(out, "\n> {}", strip_control_chars(msg));
    }
    out
}

fn push_item(out: &mut String, index: usize, title: &str, body: &str, playing: Option<usize>) {
    let marker = if playing == Some(index) { "▶" } else { " " };
    let title = single_line(&strip_control_chars(title));
    if title.is_empty() {
        let _ = writeln!(out, "{}[{}]", marker, index);
    } else {
        let _ = writeln!(
            out,
            "{}[{}] {}",
            marker,
            index,
            truncate_to_width(&title, TITLE_WIDTH)
        );
    }
    for line in wrap_to_width(&strip_control_chars(body), WRAP_WIDTH) {
        let _ = writeln!(out, "    {}", line);
    }
}
