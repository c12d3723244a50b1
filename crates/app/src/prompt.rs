use std::io::Write;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

/// Line-oriented terminal input.
pub struct Prompt<R> {
    lines: Lines<R>,
}

impl Prompt<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> Prompt<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Print `label` and read one trimmed line. `None` at end of input.
    pub async fn ask(&mut self, label: &str) -> Result<Option<String>> {
        print!("{label}");
        std::io::stdout().flush().context("failed to flush stdout")?;
        let line = self
            .lines
            .next_line()
            .await
            .context("failed to read input")?;
        Ok(line.map(|l| l.trim().to_string()))
    }

    /// Like [`Prompt::ask`], but end of input is an error.
    pub async fn require(&mut self, label: &str) -> Result<String> {
        self.ask(label)
            .await?
            .context("input closed before a value was entered")
    }
}
