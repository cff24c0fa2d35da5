//! Interactive question-answering loop.
//!
//! Reads free-text questions from stdin and prints grounded answers until the
//! user types `exit` or `bye`.

use std::io::{BufRead, Write};

use anyhow::Result;

use crate::answer::Synthesizer;

pub async fn run_chat(synthesizer: &Synthesizer<'_>) -> Result<()> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let message = line?;
        let message = message.trim();

        if message.is_empty() {
            continue;
        }
        if matches!(message, "exit" | "bye") {
            break;
        }

        match synthesizer.answer(message).await {
            Ok(reply) => {
                println!();
                println!("{}", reply);
                println!();
            }
            Err(e) => {
                eprintln!("Warning: could not answer: {}", e);
            }
        }
    }

    Ok(())
}
