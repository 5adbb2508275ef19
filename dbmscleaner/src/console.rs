//! Coloured terminal output and prompts for the command line.

use colored::{ColoredString, Colorize};
use dialoguer::Confirm;
use num_format::{Locale, ToFormattedString};

/// Colour applied to a piece of console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Failures
    Red,
    /// Reclaimed space and success markers
    Green,
    /// Warnings and dry-run notices
    Yellow,
    /// Measured sizes
    Blue,
}

/// Applies `style` to `text`.
pub fn paint(text: &str, style: Style) -> ColoredString {
    match style {
        Style::Red => text.red(),
        Style::Green => text.green(),
        Style::Yellow => text.yellow(),
        Style::Blue => text.blue(),
    }
}

/// Formats a byte count with thousands separators (`1,048,576`) and applies
/// `style`.
pub fn paint_bytes(bytes: i64, style: Style) -> ColoredString {
    paint(&bytes.to_formatted_string(&Locale::en), style)
}

/// Asks a yes/no question on the terminal; anything but an explicit yes is
/// a no.
///
/// # Errors
/// Fails when there is no interactive terminal to ask on
pub fn confirm(prompt: &str) -> Result<bool, dialoguer::Error> {
    Confirm::new().with_prompt(prompt).default(false).interact()
}
