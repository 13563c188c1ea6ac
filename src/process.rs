//! Helpers for child processes whose output dx captures

use tokio::io::{AsyncBufReadExt, BufReader};

/// Max number of output lines to include in install error messages.
const ERROR_TAIL_LINES: usize = 30;

/// Extract the useful tail of captured output for error diagnostics.
pub(crate) fn error_tail(lines: &[String]) -> String {
    let start = lines.len().saturating_sub(ERROR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Stream stdout+stderr from a child process, calling `on_output` for each line.
///
/// Returns every line in arrival order. Both streams must have been
/// configured as piped; a child without them yields no output.
pub(crate) async fn stream_child_output(
    child: &mut tokio::process::Child,
    on_output: &(dyn Fn(String) + Send + Sync),
) -> Vec<String> {
    let mut collected = Vec::new();
    let (Some(stderr), Some(stdout)) = (child.stderr.take(), child.stdout.take()) else {
        return collected;
    };

    let mut err_lines = BufReader::new(stderr).lines();
    let mut out_lines = BufReader::new(stdout).lines();
    let (mut err_open, mut out_open) = (true, true);

    let mut record = |line: std::io::Result<Option<String>>, open: &mut bool| match line {
        Ok(Some(line)) => {
            on_output(line.clone());
            collected.push(line);
        }
        // EOF and read errors both end the stream
        _ => *open = false,
    };

    while err_open || out_open {
        tokio::select! {
            line = err_lines.next_line(), if err_open => record(line, &mut err_open),
            line = out_lines.next_line(), if out_open => record(line, &mut out_open),
        }
    }

    collected
}
