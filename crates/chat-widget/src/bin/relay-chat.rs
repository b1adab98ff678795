use chat_widget::cli::{CliError, CliOptions, Command};
use chat_widget::{
    CHIP_PROMPTS, CLEARED_NOTICE, ChatWidget, ERROR_NOTICE, HttpRelayTransport, SubmitOutcome,
    WELCOME_MESSAGE,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "chat_widget=warn".to_string()),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = match CliOptions::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(CliError::HelpRequested) => {
            print_usage();
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    let transport = match HttpRelayTransport::new(&options.relay_url) {
        Ok(transport) => transport,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };
    let widget = ChatWidget::new(transport);

    println!("{WELCOME_MESSAGE}\n");
    for (index, prompt) in CHIP_PROMPTS.iter().enumerate() {
        println!("  /chip {}  {prompt}", index + 1);
    }
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                eprintln!("failed to read input: {err}");
                std::process::exit(1);
            }
        };

        let outcome = match Command::parse(&line) {
            Command::Quit => break,
            Command::Clear => {
                widget.clear();
                println!("{CLEARED_NOTICE}\n");
                continue;
            }
            Command::Chip(index) => match CHIP_PROMPTS.get(index) {
                Some(prompt) => {
                    widget.chip(prompt);
                    println!("> {prompt}");
                    widget.submit_draft().await
                }
                None => {
                    eprintln!("no chip #{}", index + 1);
                    continue;
                }
            },
            Command::Send(text) => {
                widget.set_draft(&text);
                widget.submit_draft().await
            }
        };

        match outcome {
            SubmitOutcome::Replied(reply) => println!("{reply}\n"),
            SubmitOutcome::Failed => println!("{ERROR_NOTICE}\n"),
            SubmitOutcome::Ignored | SubmitOutcome::Discarded => {}
        }
    }
}

fn print_usage() {
    eprintln!(
        "Usage: relay-chat [--url http://localhost:3000]\n\
         \n\
         Reads messages from stdin and prints the relay's replies.\n\
         \n\
         Commands:\n\
         - /chip N   Send preset prompt N\n\
         - /clear    Start a new conversation\n\
         - /quit     Exit"
    );
}
