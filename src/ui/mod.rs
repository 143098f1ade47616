//! Line-oriented terminal front-end.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop (`run`) and one-shot mode (`run_once`)
//! - `input` - Command parsing and dispatch
//! - `render` - Plain-text rendering of the view model

mod input;
mod loop_runner;
mod render;

pub use input::{handle_command, parse_command, Command};
pub use loop_runner::{run, run_once, Action};
pub use render::{render_help, render_menu, render_view};
