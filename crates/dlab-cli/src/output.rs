// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! CLI output styling for diagnostics and help.
//!
//! Only the `error:`/`hang:` labels and the help text are styled; the run
//! report on standard output stays plain.

use std::io::{self, IsTerminal};

use colored::{ColoredString, Colorize};

/// Decide once whether labels are colored. They are written to stderr, so
/// color follows stderr being a terminal; `NO_COLOR` turns it off.
pub fn init() {
    let no_color = std::env::var_os("NO_COLOR").is_some();
    colored::control::set_override(use_color(no_color, io::stderr().is_terminal()));
}

fn use_color(no_color: bool, stderr_is_terminal: bool) -> bool {
    !no_color && stderr_is_terminal
}

// === Diagnostics ===

pub fn error_label() -> ColoredString {
    "error".red().bold()
}

pub fn hang_label() -> ColoredString {
    "hang".yellow().bold()
}

// === Help Output ===

pub fn title(name: &str) -> ColoredString {
    name.bold()
}

pub fn section_header(header: &str) -> ColoredString {
    header.yellow().bold()
}

pub fn flag(name: &str) -> ColoredString {
    name.green()
}

pub fn arg(name: &str) -> ColoredString {
    name.cyan()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_needs_a_terminal_and_no_opt_out() {
        assert!(use_color(false, true));
        assert!(!use_color(true, true));
        assert!(!use_color(false, false));
    }
}
