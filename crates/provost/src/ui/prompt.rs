//! Confirmation prompts
//!
//! Questions are styled on stderr and answered on stdin, so prompts keep
//! working when stdin is piped (the unattended flag skips them entirely).
//! Anything other than an explicit yes declines.

use anyhow::Result;
use console::style;
use std::io::{BufRead, Write};

/// Ask a yes/no question. Returns `false` on anything but `y`/`yes`,
/// including end-of-input.
pub fn confirm(question: &str) -> Result<bool> {
    eprint!("{} [y/N] ", style(question).bold());
    std::io::stderr().flush()?;

    let mut answer = String::new();
    let read = std::io::stdin().lock().read_line(&mut answer)?;
    if read == 0 {
        // EOF: treat as a decline rather than hanging or assuming consent
        return Ok(false);
    }

    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}
