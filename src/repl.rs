// src/repl.rs
// Terminal chat client over the controller
//
// Prints fragments as they arrive so the answer "types" into the
// terminal the way the web client renders it.

use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::controller::ChatController;
use crate::message::ChatEvent;

pub async fn run(controller: &mut ChatController) -> Result<()> {
    controller.load_history().await;
    if !controller.conversation().is_empty() {
        println!(
            "Resuming conversation ({} earlier turns).",
            controller.conversation().len()
        );
    }
    println!("AI Mentor - ask about the catalog (/reset clears history, Ctrl+D exits)");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!(">>> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match trimmed {
            "/reset" => {
                controller.reset().await?;
                println!("History cleared.");
                continue;
            }
            "/quit" | "/exit" => break,
            _ => {}
        }

        let (tx, mut rx) = mpsc::channel::<ChatEvent>(64);
        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    ChatEvent::Fragment(text) => {
                        print!("{text}");
                        let _ = std::io::stdout().flush();
                    }
                    ChatEvent::Completed(message) => {
                        println!();
                        if let Some(items) = &message.recommended_content {
                            println!();
                            for item in items {
                                println!("  -> {}: {}", item.display_name(), item.summary());
                            }
                        }
                    }
                    ChatEvent::Error { message } => println!("{message}"),
                }
            }
        });

        if let Err(err) = controller
            .send_message(trimmed, tx, CancellationToken::new())
            .await
        {
            println!("{err}");
        }
        let _ = printer.await;
        println!();
    }

    Ok(())
}
