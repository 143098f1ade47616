//! Utility functions for common operations.
//!
//! - **Link validation**: only public http(s) links from the store are opened
//! - **Text processing**: width-aware truncation and wrapping, and stripping
//!   of terminal control sequences from remote text
//!
//! # Examples
//!
//! ```
//! use dailybrief::util::{display_width, strip_control_chars, validate_url_for_open};
//!
//! let url = validate_url_for_open("https://example.com/story").unwrap();
//! assert_eq!(url.host_str(), Some("example.com"));
//!
//! assert_eq!(display_width("国内 AI"), 7);
//! assert_eq!(strip_control_chars("\x1b[1m标题"), "标题");
//! ```

mod text;
mod url_validator;

pub use text::{display_width, single_line, strip_control_chars, truncate_to_width, wrap_to_width};
pub use url_validator::{validate_url_for_open, UrlValidationError};
