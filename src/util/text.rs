use std::borrow::Cow;
use std::iter::Peekable;
use std::str::Chars;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: char = '…';

/// Terminal columns occupied by `s` (CJK and emoji count as two).
///
/// ```
/// use dailybrief::util::display_width;
///
/// assert_eq!(display_width("AI"), 2);
/// assert_eq!(display_width("国际"), 4);
/// ```
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(0)
}

/// Shorten `s` to at most `max_width` columns, ending in `…` when cut.
///
/// Borrows when nothing is removed.
///
/// ```
/// use dailybrief::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("每日一笑", 8), "每日一笑");
/// assert_eq!(truncate_to_width("每日一笑", 7), "每日一…");
/// assert_eq!(truncate_to_width("headline", 0), "");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    // Reserve one column for the ellipsis
    let budget = max_width - 1;
    let mut used = 0;
    let mut out = String::new();
    for c in s.chars() {
        let w = char_width(c);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push(ELLIPSIS);
    Cow::Owned(out)
}

/// Split `s` into lines no wider than `width` columns.
///
/// Existing line breaks are kept. Lines break between characters, which
/// suits CJK text; ASCII words are not kept together. A `width` of zero
/// yields the paragraphs unwrapped.
pub fn wrap_to_width(s: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in s.lines() {
        if width == 0 || display_width(paragraph) <= width {
            lines.push(paragraph.to_string());
            continue;
        }
        let mut line = String::new();
        let mut used = 0;
        for c in paragraph.chars() {
            let w = char_width(c);
            if used + w > width && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                used = 0;
            }
            line.push(c);
            used += w;
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}

fn is_stripped_control(c: char) -> bool {
    c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r')
}

/// Remove terminal control characters and ANSI escape sequences.
///
/// Store text is printed straight to the terminal, so escape sequences in it
/// could move the cursor, recolour output, or retitle the window. Removed:
///
/// - C0 controls and DEL, except tab, newline and carriage return
/// - CSI sequences (`ESC [` … final byte `@`..`~`)
/// - OSC sequences (`ESC ]` … BEL or `ESC \`)
/// - any other ESC together with the character after it
///
/// ```
/// use dailybrief::util::strip_control_chars;
///
/// assert_eq!(strip_control_chars("\x1b[31m红色\x1b[0m"), "红色");
/// assert_eq!(strip_control_chars("plain"), "plain");
/// ```
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_stripped_control) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            skip_escape(&mut chars);
        } else if !is_stripped_control(c) {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Consume the remainder of an escape sequence whose ESC was already read.
fn skip_escape(chars: &mut Peekable<Chars<'_>>) {
    match chars.next() {
        Some('[') => {
            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
        }
        Some(']') => {
            while let Some(c) = chars.next() {
                if c == '\x07' {
                    break;
                }
                if c == '\x1b' && chars.peek() == Some(&'\\') {
                    chars.next();
                    break;
                }
            }
        }
        // Two-character escape, or ESC at end of input
        _ => {}
    }
}

/// Collapse runs of whitespace (including newlines) into single spaces.
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
