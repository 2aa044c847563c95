use std::future::Future;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use donna_relay::chat::{ChatSession, SessionError};
use donna_relay::client::{
    attend_turn, run_turn, send_turn, ChatClient, TurnOutcome, DEFAULT_RELAY_URL,
};
use donna_relay::config::load_config;
use donna_relay::logging::init_logging;
use donna_relay::relay::SUGGESTED_PROMPTS;

#[derive(Parser, Debug)]
#[command(name = "donna-chat", about = "Terminal chat against a running relay")]
struct ChatArgs {
    /// Relay API root.
    #[arg(long, short = 'u', default_value = DEFAULT_RELAY_URL)]
    url: String,
    /// Config file, used for logging settings.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
    /// Wait for whole replies instead of streaming them.
    #[arg(long)]
    no_stream: bool,
}

enum Command<'a> {
    New,
    Quit,
    Message(&'a str),
    Empty,
}

fn parse_command(line: &str) -> Command<'_> {
    match line.trim() {
        "" => Command::Empty,
        "/new" => Command::New,
        "/quit" | "/exit" => Command::Quit,
        _ => Command::Message(line),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ChatArgs::parse();
    let loaded = load_config(args.config).context("failed to load configuration")?;
    let mut logging = loaded.config.logging;
    if logging.path.is_none() {
        logging.level = "warn".to_string();
    }
    let _logger = init_logging(&logging).context("failed to start logging")?;

    let client = ChatClient::new(args.url);
    if !client.check_health().await {
        eprintln!("Relay at {} is not reachable.", client.base_url());
    }
    println!("Chatting with Donna. /new starts over, /quit exits.");
    println!("Try: {}", SUGGESTED_PROMPTS.join(" | "));

    let mut lines = spawn_line_reader();
    let mut session = ChatSession::new();

    while let Some(line) = prompt_and_read(&mut lines).await {
        let text = match parse_command(&line) {
            Command::Empty => continue,
            Command::Quit => break,
            Command::New => {
                session.reset();
                println!("New conversation.");
                continue;
            }
            Command::Message(text) => text,
        };

        let cancel = CancellationToken::new();
        let interrupt = cancel_on_interrupt(&cancel);
        let outcome = if args.no_stream {
            let turn = async {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Ok(TurnOutcome::Cancelled),
                    outcome = send_turn(&client, &mut session, text) => outcome,
                }
            };
            attend_turn(turn, &mut lines, refuse).await
        } else {
            let mut printed = 0usize;
            let turn = run_turn(&client, &mut session, text, &cancel, |partial| {
                let mut stdout = io::stdout();
                let _ = stdout.write_all(partial[printed..].as_bytes());
                let _ = stdout.flush();
                printed = partial.len();
            });
            let outcome = attend_turn(turn, &mut lines, refuse).await;
            println!();
            outcome
        };
        interrupt.abort();
        report(outcome, args.no_stream);
    }
    Ok(())
}

fn spawn_line_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut reader = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = reader.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });
    rx
}

async fn prompt_and_read(lines: &mut mpsc::Receiver<String>) -> Option<String> {
    print!("> ");
    let _ = io::stdout().flush();
    let interrupt = async {
        let _ = tokio::signal::ctrl_c().await;
        println!();
    };
    read_line_or_interrupt(lines, interrupt).await
}

/// Next line from the user; `None` on end of input or once `interrupt`
/// resolves.
async fn read_line_or_interrupt<I>(lines: &mut mpsc::Receiver<String>, interrupt: I) -> Option<String>
where
    I: Future<Output = ()>,
{
    tokio::select! {
        line = lines.recv() => line,
        _ = interrupt => None,
    }
}

/// Cancels `cancel` on Ctrl-C until the returned task is aborted.
fn cancel_on_interrupt(cancel: &CancellationToken) -> tokio::task::JoinHandle<()> {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    })
}

fn refuse(line: &str) {
    eprintln!("\n(still replying, ignored: {line})");
}

fn report(outcome: Result<TurnOutcome, SessionError>, print_reply: bool) {
    match outcome {
        Ok(TurnOutcome::Completed(Some(reply))) if print_reply => println!("{reply}"),
        Ok(TurnOutcome::Completed(Some(_))) => {}
        Ok(TurnOutcome::Completed(None)) => println!("(empty reply)"),
        Ok(TurnOutcome::Failed(message)) => println!("Error: {message}"),
        Ok(TurnOutcome::Cancelled) => println!("(cancelled)"),
        Err(err) => println!("{err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn interrupt_at_the_prompt_ends_input() {
        let (_tx, mut lines) = mpsc::channel::<String>(1);
        assert_eq!(read_line_or_interrupt(&mut lines, async {}).await, None);
    }

    #[tokio::test]
    async fn typed_line_is_returned() {
        let (tx, mut lines) = mpsc::channel(1);
        tx.send("hello".to_string()).await.unwrap();
        let line = read_line_or_interrupt(&mut lines, std::future::pending()).await;
        assert_eq!(line.as_deref(), Some("hello"));
    }

    #[test]
    fn commands_are_recognised() {
        assert!(matches!(parse_command("/new"), Command::New));
        assert!(matches!(parse_command(" /quit "), Command::Quit));
        assert!(matches!(parse_command("   "), Command::Empty));
        assert!(matches!(parse_command("hi"), Command::Message("hi")));
    }
}
