use std::io::{self, BufRead, Write};

pub(crate) const CANCEL_PROMPT: &str = "Cancel podcast generation? [y/N] ";

/// Anything other than an explicit yes keeps the job running.
pub(crate) fn parse_answer(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Asks on the terminal without blocking the runtime. A closed stdin counts
/// as "no".
pub(crate) async fn ask_cancel() -> io::Result<bool> {
    tokio::task::spawn_blocking(|| {
        let mut stdout = io::stdout().lock();
        write!(stdout, "\n{CANCEL_PROMPT}")?;
        stdout.flush()?;
        let mut answer = String::new();
        let read = io::stdin().lock().read_line(&mut answer)?;
        Ok(read > 0 && parse_answer(&answer))
    })
    .await
    .map_err(io::Error::other)?
}
