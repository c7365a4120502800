//! Live status frame and its erase sequence.
//!
//! The status area is a single-buffer, diff-free redraw: each frame is
//! written after the previous frame's erase sequence, and carries the erase
//! sequence that removes it on the next redraw. The invariant is that
//! nothing else writes to the terminal between redraws; out-of-band output
//! must go through the printer's `print_msg`, which clears the status first
//! and reprints it after.

use crate::style::{green, white, wrap_ansi_line};

/// Clear the current line and move the cursor up one line. Repeated once
/// per line of the previous frame, this erases exactly that frame.
pub const ERASE_LINE_UNIT: &str = "\r\x1B[K\r\x1B[1A";

/// Maximum progress bar width in columns.
const PROGRESS_BAR_WIDTH: usize = 40;

/// One rendered status frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusFrame {
    /// The frame text, ending in a newline.
    pub content: String,
    /// Escape sequence that erases exactly this frame.
    pub clear: String,
}

/// Computes status frames from the aggregator's live view.
#[derive(Debug, Clone, Copy)]
pub struct StatusRenderer {
    /// Terminal width in columns, for wrapping and the progress bar.
    pub width: usize,
}

impl StatusRenderer {
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    /// Build a frame from already-styled header lines for finished and
    /// running root suites, an optional summary block, and an optional
    /// `(completed, estimated_total)` progress pair.
    #[must_use]
    pub fn render(
        &self,
        done: &[String],
        running: &[String],
        summary: Option<&str>,
        progress: Option<(usize, usize)>,
    ) -> StatusFrame {
        let mut content = String::new();

        for line in done {
            content.push_str(&wrap_ansi_line(line, self.width));
            content.push('\n');
        }

        if !done.is_empty() && !running.is_empty() {
            content.push('\n');
        }

        for line in running {
            content.push_str(&wrap_ansi_line(line, self.width));
            content.push('\n');
        }

        if let Some(summary) = summary {
            content.push_str("\n\n");
            content.push_str(summary);
        }

        if let Some((completed, estimated)) = progress {
            let bar_width = self.width.min(PROGRESS_BAR_WIDTH);
            if bar_width >= 2 {
                // Denominator defaults to 1 so a zero-test run still
                // renders an empty bar instead of dividing by zero.
                let total = estimated.max(1);
                let fraction = completed.min(total) as f64 / total as f64;
                let filled = (fraction * bar_width as f64).floor() as usize;

                content.push_str("\n\n");
                content.push_str(&green(&"█".repeat(filled)));
                content.push_str(&white(&"█".repeat(bar_width - filled)));
            }
        }

        content.push('\n');

        let height = content.matches('\n').count();
        StatusFrame { clear: ERASE_LINE_UNIT.repeat(height), content }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("suite {i}")).collect()
    }

    #[test]
    fn erase_sequence_repeats_once_per_frame_line() {
        let renderer = StatusRenderer::new(80);
        let frame = renderer.render(&lines(2), &[], None, None);
        // Two suite lines plus the trailing newline: three lines printed.
        assert_eq!(frame.content.matches('\n').count(), 3);
        assert_eq!(frame.clear, ERASE_LINE_UNIT.repeat(3));
    }

    #[test]
    fn blank_separator_only_between_done_and_running() {
        let renderer = StatusRenderer::new(80);

        // The frame always ends in a newline, so compare the body only.
        let both = renderer.render(&lines(1), &lines(1), None, None);
        assert!(both.content.trim_end_matches('\n').contains("\n\n"));

        let only_running = renderer.render(&[], &lines(1), None, None);
        assert!(!only_running.content.trim_end_matches('\n').contains("\n\n"));

        let only_done = renderer.render(&lines(1), &[], None, None);
        assert!(!only_done.content.trim_end_matches('\n').contains("\n\n"));
    }

    #[test]
    fn zero_total_progress_renders_an_empty_bar() {
        let renderer = StatusRenderer::new(80);
        let frame = renderer.render(&[], &[], None, Some((0, 0)));
        assert!(frame.content.contains(&white(&"█".repeat(PROGRESS_BAR_WIDTH))));
    }

    #[test]
    fn full_progress_fills_the_bar() {
        let renderer = StatusRenderer::new(80);
        let frame = renderer.render(&[], &[], None, Some((10, 10)));
        assert!(frame.content.contains(&green(&"█".repeat(PROGRESS_BAR_WIDTH))));
    }

    #[test]
    fn progress_bar_clamps_to_terminal_width() {
        let renderer = StatusRenderer::new(10);
        let frame = renderer.render(&[], &[], None, Some((1, 2)));
        assert!(frame.content.contains(&green(&"█".repeat(5))));
        assert!(frame.content.contains(&white(&"█".repeat(5))));
    }

    #[test]
    fn narrow_terminal_skips_the_bar() {
        let renderer = StatusRenderer::new(1);
        let frame = renderer.render(&[], &[], None, Some((1, 2)));
        assert!(!frame.content.contains('█'));
    }

    #[test]
    fn summary_lines_count_toward_erase_height() {
        let renderer = StatusRenderer::new(80);
        let bare = renderer.render(&lines(1), &[], None, None);
        let with_summary = renderer.render(&lines(1), &[], Some("Tests: 1 total\nTime: 1 s"), None);
        assert!(with_summary.clear.len() > bare.clear.len());
    }
}
