//! Minimal SGR styling and ANSI-aware measurement.
//!
//! The reporter only ever emits SGR color codes and the cursor-control
//! escapes owned by the status renderer, so a handful of wrappers is the
//! whole styling surface. Close codes restore the previous attribute class
//! instead of resetting everything, which keeps nested styles composable.

use unicode_width::UnicodeWidthChar;

fn sgr(open: u8, close: u8, s: &str) -> String {
    format!("\x1b[{open}m{s}\x1b[{close}m")
}

#[must_use]
pub fn red(s: &str) -> String {
    sgr(31, 39, s)
}

#[must_use]
pub fn green(s: &str) -> String {
    sgr(32, 39, s)
}

#[must_use]
pub fn yellow(s: &str) -> String {
    sgr(33, 39, s)
}

#[must_use]
pub fn magenta(s: &str) -> String {
    sgr(35, 39, s)
}

#[must_use]
pub fn white(s: &str) -> String {
    sgr(37, 39, s)
}

#[must_use]
pub fn bold(s: &str) -> String {
    sgr(1, 22, s)
}

#[must_use]
pub fn dim(s: &str) -> String {
    sgr(2, 22, s)
}

#[must_use]
pub fn inverse(s: &str) -> String {
    sgr(7, 27, s)
}

/// Visible column width of `s`, with escape sequences contributing zero.
#[must_use]
pub fn visible_width(s: &str) -> usize {
    let mut width = 0;
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // CSI sequence: consume through the final byte (0x40..=0x7e).
            if chars.peek() == Some(&'[') {
                chars.next();
                for follow in chars.by_ref() {
                    if ('\u{40}'..='\u{7e}').contains(&follow) {
                        break;
                    }
                }
            }
            continue;
        }
        width += c.width().unwrap_or(0);
    }

    width
}

/// Hard-wrap `s` to `width` visible columns, leaving escape sequences in
/// place with zero width so styled headers wrap like their plain text.
#[must_use]
pub fn wrap_ansi_line(s: &str, width: usize) -> String {
    if width == 0 {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut col = 0;
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            out.push(c);
            if chars.peek() == Some(&'[') {
                out.push('[');
                chars.next();
                for follow in chars.by_ref() {
                    out.push(follow);
                    if ('\u{40}'..='\u{7e}').contains(&follow) {
                        break;
                    }
                }
            }
            continue;
        }

        let w = c.width().unwrap_or(0);
        if col + w > width {
            out.push('\n');
            col = 0;
        }
        out.push(c);
        col += w;
    }

    out
}
