//! An interactive chat that prints replies as they are generated.
//!
//! Run this example with `OPENAI_API_KEY=... cargo run --example chat_stream`.
//! Press Ctrl-C while a reply is streaming to stop it early.

use std::io::Write;

use futures_util::StreamExt;
use openai_sdk::{
    endpoints::chat::{ChatCompletion, Message, Role},
    system_message, CancellationToken, EnvironmentAuthTokenProvider, OpenAI, OpenAIResult,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> OpenAIResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let client = OpenAI::new(EnvironmentAuthTokenProvider);
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_owned());
    let mut history = vec![system_message!("You are a concise, friendly assistant.")];

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Ok(Some(line)) = stdin.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            prompt();
            continue;
        }
        history.push(Message::role(Role::User).content(line.to_owned()).build());

        let request = ChatCompletion::model(model.as_str())
            .messages(history.clone())
            .build();

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        let mut reply = String::new();
        let mut frames = client.stream_with_cancellation(&request, cancel).await?;
        while let Some(chunk) = frames.next().await {
            match chunk {
                Ok(chunk) => {
                    let text = chunk.content().unwrap_or_default();
                    print!("{text}");
                    let _ = std::io::stdout().flush();
                    reply.push_str(text);
                }
                Err(err) => {
                    eprintln!("\nstream failed: {err}");
                    break;
                }
            }
        }
        interrupt.abort();
        println!();

        history.push(Message::role(Role::Assistant).content(reply).build());
        prompt();
    }

    Ok(())
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}
