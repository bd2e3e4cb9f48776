//! Terminal output helpers for the Umbra CLI: colored diffs and batch
//! summaries. Colors are only used when stdout is a tty.

use std::io::Write;
use std::path::Path;

use difference::{Changeset, Difference};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn stdout() -> StandardStream {
    let choice = if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

fn write_colored(stream: &mut StandardStream, color: Color, text: &str) {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(color));
    let _ = stream.set_color(&spec);
    let _ = writeln!(stream, "{text}");
    let _ = stream.reset();
}

/// Prints a line-oriented diff: removals red with a `-` gutter, additions
/// green with `+`, unchanged lines plain.
pub fn print_diff(changeset: &Changeset) {
    let mut stream = stdout();
    for diff in &changeset.diffs {
        match diff {
            Difference::Same(block) => {
                for line in block.lines() {
                    let _ = writeln!(stream, "  {line}");
                }
            }
            Difference::Add(block) => {
                for line in block.lines() {
                    write_colored(&mut stream, Color::Green, &format!("+ {line}"));
                }
            }
            Difference::Rem(block) => {
                for line in block.lines() {
                    write_colored(&mut stream, Color::Red, &format!("- {line}"));
                }
            }
        }
    }
}

/// One line of the batch summary.
pub fn print_batch_line(path: &Path, ok: bool) {
    let mut stream = stdout();
    if ok {
        write_colored(
            &mut stream,
            Color::Green,
            &format!("instrumented {}", path.display()),
        );
    } else {
        write_colored(
            &mut stream,
            Color::Red,
            &format!("failed       {}", path.display()),
        );
    }
}

/// Closing line of the batch summary.
pub fn print_batch_summary(done: usize, failed: usize) {
    let mut stream = stdout();
    let color = if failed == 0 { Color::Green } else { Color::Yellow };
    write_colored(
        &mut stream,
        color,
        &format!("{done} file(s) instrumented, {failed} failed"),
    );
}
