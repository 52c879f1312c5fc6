use log::error;
use std::future::Future;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Source of operator answers to TCK console prompts
pub trait ConsoleInput: Send + Sync {
    /// Show the prompt and wait for one line of input.
    /// `None` when no more input is available.
    fn prompt(&self, message: &str) -> impl Future<Output = Option<String>> + Send;
}

/// Reads replies from the process's standard input
pub struct StdinConsole {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl StdinConsole {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

impl Default for StdinConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleInput for StdinConsole {
    async fn prompt(&self, message: &str) -> Option<String> {
        println!("\n=== CONSOLE PROMPT ===");
        println!("{}", message);
        println!("======================");
        print!("\nEnter response (PASS/FAIL): ");
        let _ = std::io::stdout().flush();

        let mut lines = self.lines.lock().await;
        match lines.next_line().await {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read console reply: {}", e);
                None
            }
        }
    }
}
