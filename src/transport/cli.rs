//! Terminal client for a running relay
//!
//! Drives a `WidgetController` over HTTP the same way the embedded widget does,
//! printing the assistant's reply as it streams.

use anyhow::{Context, Result};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::protocol::UiRole;
use crate::widget::{
    send_message, CdnPresenter, Effect, HttpChatTransport, Presenter, WidgetConfig,
    WidgetController, WidgetError, WidgetView,
};

/// Prints the unseen suffix of the streaming assistant message
#[derive(Default)]
struct ReplyPrinter {
    printed: usize,
}

impl ReplyPrinter {
    fn on_effect(&mut self, controller: &WidgetController, effect: &Effect) {
        if *effect != Effect::ScrollToBottom {
            return;
        }
        let Some(last) = controller.messages().last() else {
            return;
        };
        if last.role != UiRole::Assistant {
            return;
        }

        let text = last.text_content();
        if let Some(suffix) = text.get(self.printed..) {
            print!("{}", suffix);
            let _ = io::stdout().flush();
        }
        self.printed = text.len();
    }
}

async fn ask_once(
    controller: &mut WidgetController,
    transport: &HttpChatTransport,
    message: &str,
    render: bool,
) -> Result<(), WidgetError> {
    let mut printer = ReplyPrinter::default();
    let result = send_message(controller, transport, message, |c, e| printer.on_effect(c, e)).await;
    println!();

    if render {
        println!("{}\n", CdnPresenter.render(&WidgetView::from_controller(controller)));
    }
    result
}

/// Chat with the relay at `endpoint`
///
/// With a message, sends it and exits; a failed request is an error. Without
/// one, reads prompts from stdin until `exit`; `clear` starts a new
/// conversation.
pub async fn run_ask(endpoint: &str, message: Option<String>, render: bool) -> Result<()> {
    let config = WidgetConfig::new(endpoint);
    let transport =
        HttpChatTransport::from_config(&config).context("Invalid relay endpoint")?;
    let mut controller = WidgetController::new(config);
    let _ = controller.open();

    tracing::debug!("Using relay at {}", transport.endpoint());

    if let Some(msg) = message {
        return ask_once(&mut controller, &transport, &msg, render)
            .await
            .context("Chat request failed");
    }

    println!("{}", controller.config().title);
    println!("Type 'exit' or 'quit' to exit, 'clear' to clear history\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "exit" | "quit" => {
                println!("Goodbye!");
                break;
            }
            "clear" => {
                controller.reset();
                println!("Conversation cleared.\n");
                continue;
            }
            _ => {}
        }

        println!();
        if let Err(e) = ask_once(&mut controller, &transport, input, render).await {
            eprintln!("Error: {}\n", e);
        }
        println!();
    }

    Ok(())
}
