//! Command-line input: parsing and dispatch.
//!
//! Each stdin line is one command. Parsing is pure so it can be tested
//! without an [`App`]; dispatch mutates the app and may spawn fetches.

use crate::app::{App, AppEvent};
use crate::menu::Selection;
use crate::util::validate_url_for_open;
use tokio::sync::mpsc;

use super::render::{render_help, render_menu, render_view};
use super::Action;

/// A parsed user command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the menu.
    Menu,
    /// Select a leaf.
    Select(Selection),
    /// Switch the main axis.
    Main(String),
    /// Reselect the current selection.
    Refresh,
    /// Toggle read-aloud for an item (0 = body).
    Play(usize),
    /// Open link `n` (1-based, as printed).
    Open(usize),
    /// Reprint the view.
    View,
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (head, args.as_slice()) {
        ("m" | "menu", []) => Command::Menu,
        ("s" | "select", [category]) => Command::Select(Selection::category(*category)),
        ("s" | "select", [main, sub]) => Command::Select(Selection::pair(*main, *sub)),
        ("s" | "select", _) => return Err("usage: s <category> | s <main> <sub>".to_string()),
        ("g" | "go", [main]) => Command::Main(main.to_string()),
        ("g" | "go", _) => return Err("usage: g <main>".to_string()),
        ("r" | "refresh", []) => Command::Refresh,
        ("p" | "play", [n]) => Command::Play(parse_index(n)?),
        ("p" | "play", _) => return Err("usage: p <item number>".to_string()),
        ("o" | "open", [n]) => Command::Open(parse_index(n)?),
        ("o" | "open", _) => return Err("usage: o <link number>".to_string()),
        ("v" | "view", []) => Command::View,
        ("h" | "help" | "?", []) => Command::Help,
        ("q" | "quit" | "exit", []) => Command::Quit,
        (other, _) => return Err(format!("Unknown command '{}' (h for help)", other)),
    };
    Ok(Some(command))
}

fn parse_index(s: &str) -> Result<usize, String> {
    s.parse()
        .map_err(|_| format!("'{}' is not a number", s))
}

/// Apply `command` to the app.
pub fn handle_command(
    app: &mut App,
    command: Command,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    match command {
        Command::Menu => {
            return Action::Print(render_menu(app.feed.menu(), app.feed.selection()));
        }
        Command::Select(selection) => {
            // A single word in a two-axis menu is most likely a main category
            let selection = match selection {
                Selection::Category(name) if app.feed.menu().is_nested() => {
                    app.select_main(&name, event_tx);
                    return Action::Continue;
                }
                other => other,
            };
            app.select(selection, event_tx);
        }
        Command::Main(main) => app.select_main(&main, event_tx),
        Command::Refresh => app.refresh(event_tx),
        Command::Play(index) => app.toggle_item(index),
        Command::Open(n) => open_link(app, n),
        Command::View => return Action::Print(render_view(app)),
        Command::Help => return Action::Print(render_help().to_string()),
        Command::Quit => return Action::Quit,
    }
    Action::Continue
}

fn open_link(app: &mut App, n: usize) {
    let url = app.feed.content().and_then(|content| {
        n.checked_sub(1)
            .and_then(|i| content.open_targets().get(i).map(|(_, url)| url.to_string()))
    });
    let Some(url) = url else {
        app.set_status(format!("No link {}", n));
        return;
    };

    // Validate before open::that() so store content cannot launch arbitrary handlers
    match validate_url_for_open(&url) {
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Refusing to open link");
            app.set_status(e.to_string());
        }
        Ok(url) => match open::that(url.as_str()) {
            Ok(()) => app.set_status(format!("Opening {}", url.host_str().unwrap_or("link"))),
            Err(e) => app.set_status(format!("Failed to open browser: {}", e)),
        },
    }
}
