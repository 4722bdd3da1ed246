use clap::{Arg, ArgMatches, Command};
use std::env;
use std::path::PathBuf;
use std::process;
use tracing::{error, info, warn, Level};
use url::Url;

mod api;
mod controller;
mod utils;

use api::server::{ApiServer, ServerConfig, DEFAULT_BIND, DEFAULT_PUBLIC_DIR};
use controller::prompt::SummaryLength;
use controller::session::{load_dropped_file, Session};
use controller::InteractionController;
use utils::completion::{CompletionConfig, CompletionService, DEFAULT_API_BASE, DEFAULT_MODEL};
use utils::pdf::PdfTextExtractor;
use utils::proxy_client::ProxyClient;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Startup banner for the proxy, drawn on stderr so it never mixes with
/// piped output. Lines may carry ANSI colors; centering ignores them.
fn print_banner(bind: &str, model: &str) {
    const INNER_WIDTH: usize = 56;

    let listening = format!("\x1b[0mListening on http://{}", bind);
    let model = format!("\x1b[90mModel: {}", model);
    let lines = [
        "",
        "\x1b[1m\x1b[31mPDF-Chat completion proxy",
        "",
        listening.as_str(),
        model.as_str(),
        "",
    ];

    eprintln!("\n\x1b[36m╔{}╗", "═".repeat(INNER_WIDTH));
    for line in lines {
        // Overlong lines are printed as-is and break the right border
        let padding = INNER_WIDTH.saturating_sub(visible_width(line));
        let left = padding / 2;
        eprintln!(
            "║{}{}{}\x1b[36m║",
            " ".repeat(left),
            line,
            " ".repeat(padding - left)
        );
    }
    eprintln!("╚{}╝\x1b[0m\n", "═".repeat(INNER_WIDTH));
}

/// Number of printed characters, skipping `ESC [ ... <letter>` sequences.
fn visible_width(text: &str) -> usize {
    let mut width = 0;
    let mut in_escape = false;

    for ch in text.chars() {
        match (in_escape, ch) {
            (false, '\x1b') => in_escape = true,
            (false, _) => width += 1,
            (true, c) if c.is_ascii_alphabetic() => in_escape = false,
            (true, _) => {}
        }
    }

    width
}

fn cli() -> Command {
    Command::new("pdf-chat")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Summarize and question PDF documents through an LLM completion proxy")
        .long_about(
            "Commands:\n\
            - serve: run the /api/chat completion proxy and serve static files\n\
            - chat: drop a PDF into an interactive session backed by a running proxy",
        )
        .subcommand_required(true)
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .global(true)
                .help("Only log errors and skip the startup banner")
                .action(clap::ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("serve")
                .about("Run the completion proxy")
                .arg(
                    Arg::new("bind")
                        .long("bind")
                        .value_name("ADDR")
                        .help("Address to listen on [env: PDF_CHAT_BIND] [default: 127.0.0.1:3000]")
                        .action(clap::ArgAction::Set),
                )
                .arg(
                    Arg::new("api-key")
                        .long("api-key")
                        .value_name("KEY")
                        .help("Completion API key [env: GROQ_API_KEY]")
                        .action(clap::ArgAction::Set),
                )
                .arg(
                    Arg::new("api-base")
                        .long("api-base")
                        .value_name("URL")
                        .help("OpenAI-compatible API base URL [env: GROQ_API_BASE]")
                        .action(clap::ArgAction::Set),
                )
                .arg(
                    Arg::new("model")
                        .long("model")
                        .value_name("MODEL")
                        .help("Model identifier sent with every request [env: GROQ_MODEL]")
                        .action(clap::ArgAction::Set),
                )
                .arg(
                    Arg::new("public-dir")
                        .long("public-dir")
                        .value_name("DIR")
                        .help("Directory served as static files (PDF worker script)")
                        .default_value(DEFAULT_PUBLIC_DIR)
                        .action(clap::ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("chat")
                .about("Summarize a PDF and ask questions about it")
                .arg(
                    Arg::new("file")
                        .value_name("FILE")
                        .help("Document to drop into the session")
                        .required(true)
                        .action(clap::ArgAction::Set),
                )
                .arg(
                    Arg::new("server")
                        .long("server")
                        .value_name("URL")
                        .help("Base URL of a running proxy [env: PDF_CHAT_SERVER]")
                        .action(clap::ArgAction::Set),
                )
                .arg(
                    Arg::new("length")
                        .long("length")
                        .value_name("LENGTH")
                        .help("Summary length")
                        .value_parser(SummaryLength::ALL.map(SummaryLength::as_str))
                        .default_value("medium")
                        .action(clap::ArgAction::Set),
                ),
        )
}

/// Command line value first, then the environment variable.
fn arg_or_env(matches: &ArgMatches, id: &str, var: &str) -> Option<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .or_else(|| env::var(var).ok())
}

async fn serve(matches: &ArgMatches, quiet: bool) -> anyhow::Result<()> {
    let api_key = arg_or_env(matches, "api-key", "GROQ_API_KEY");

    // Log credential status without exposing it
    match &api_key {
        Some(_) => info!("Completion API key configured"),
        None => warn!("GROQ_API_KEY not set - chat requests will fail until it is configured"),
    }

    let completion_config = CompletionConfig {
        api_key,
        api_base: arg_or_env(matches, "api-base", "GROQ_API_BASE")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        model: arg_or_env(matches, "model", "GROQ_MODEL")
            .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
    };
    let completer = CompletionService::new(completion_config)?;
    info!("Using model {}", completer.model());

    let server_config = ServerConfig {
        bind: arg_or_env(matches, "bind", "PDF_CHAT_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
        public_dir: matches
            .get_one::<String>("public-dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PUBLIC_DIR)),
    };

    if !quiet {
        print_banner(&server_config.bind, completer.model());
    }

    info!("Starting completion proxy...");
    ApiServer::new(server_config, completer).start().await
}

async fn chat(matches: &ArgMatches) -> anyhow::Result<()> {
    let server = arg_or_env(matches, "server", "PDF_CHAT_SERVER")
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
    let server = Url::parse(&server)?;

    let length = matches
        .get_one::<String>("length")
        .map(|value| value.parse::<SummaryLength>())
        .transpose()
        .map_err(anyhow::Error::msg)?
        .unwrap_or_default();

    let path = matches
        .get_one::<String>("file")
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("missing FILE argument"))?;
    let file = load_dropped_file(&path).await?;

    let backend = ProxyClient::new(&server)?;
    info!("Sending prompts to {}", backend.endpoint());

    let mut controller = InteractionController::new(backend, PdfTextExtractor);
    // No document yet, so this only selects the length.
    controller.on_summary_length_change(length).await;

    Session::stdio().run(&mut controller, Some(file)).await
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let matches = cli().get_matches();
    let quiet = matches.get_flag("quiet");

    // Logs go to stderr; stdout carries session output
    let level = if quiet {
        Level::ERROR
    } else {
        env::var("RUST_LOG")
            .ok()
            .and_then(|value| value.parse::<Level>().ok())
            .unwrap_or(Level::INFO)
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    let result = match matches.subcommand() {
        Some(("serve", sub)) => serve(sub, quiet).await,
        Some(("chat", sub)) => chat(sub).await,
        _ => Err(anyhow::anyhow!("no command given")),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }
}
