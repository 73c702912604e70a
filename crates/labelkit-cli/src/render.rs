use std::io::Write;

use colored::Colorize;
use labelkit_core::events::Event;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::cli::Verbosity;

/// Width of the block-character progress bar.
const BAR_WIDTH: usize = 25;

/// Render a `filled/total` proportion as the inline block bar:
/// `[████████→-----------------] 32%`
pub fn block_bar(completed: usize, total: usize) -> String {
    let total = total.max(1);
    let filled = (BAR_WIDTH * completed / total).min(BAR_WIDTH);
    let percent = 100 * completed / total;
    format!(
        "[{}→{}] {}%",
        "█".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        percent
    )
}

/// Drain core events to the terminal until the channel closes.
///
/// Status and progress updates overwrite a single line (the dashboard's
/// status label); warnings and errors get their own lines. Returns whether
/// any error event was seen, so the caller can pick an exit code.
pub async fn render_events(mut rx: UnboundedReceiver<Event>, verbosity: Verbosity) -> bool {
    let mut saw_error = false;
    let mut line_active = false;
    while let Some(event) = rx.recv().await {
        match event {
            Event::Status(text) => {
                if verbosity != Verbosity::Quiet {
                    status_line(&text.cyan().to_string());
                    line_active = true;
                }
            }
            Event::Progress {
                completed,
                total,
                message,
            } => {
                if verbosity != Verbosity::Quiet {
                    let bar = block_bar(completed, total);
                    status_line(&format!("{bar} {}", message.dimmed()));
                    line_active = true;
                }
            }
            Event::Warning(text) => {
                if line_active {
                    println!();
                    line_active = false;
                }
                println!("{} {}", "WARNING:".yellow().bold(), text);
            }
            Event::Error(text) => {
                saw_error = true;
                if line_active {
                    println!();
                    line_active = false;
                }
                eprintln!("{} {}", "ERROR:".red().bold(), text);
            }
            Event::TaskStarted { ref name } | Event::TaskFinished { ref name, .. } => {
                if verbosity == Verbosity::Verbose {
                    if line_active {
                        println!();
                        line_active = false;
                    }
                    println!("{} {name}: {event:?}", "DEBUG".dimmed());
                }
            }
            Event::ActionEnabled(_) => {}
        }
    }
    if line_active {
        println!();
    }
    saw_error
}

/// Overwrite the current terminal line with `text`.
fn status_line(text: &str) {
    print!("\r\x1b[2K{text}");
    let _ = std::io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_bar_empty_and_full() {
        assert_eq!(block_bar(0, 5), format!("[→{}] 0%", "-".repeat(25)));
        assert_eq!(block_bar(5, 5), format!("[{}→] 100%", "█".repeat(25)));
    }

    #[test]
    fn test_block_bar_partial_fill() {
        let bar = block_bar(2, 5);
        assert!(bar.starts_with(&format!("[{}", "█".repeat(10))));
        assert!(bar.ends_with("40%"));
    }

    #[test]
    fn test_block_bar_tolerates_zero_total() {
        // Guard division, not a real input.
        let bar = block_bar(0, 0);
        assert!(bar.contains("0%"));
    }
}
