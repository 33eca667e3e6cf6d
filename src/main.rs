//! CLI entry point for `gmail-client`.
//!
//! The binary works offline: it materializes raw RFC 5322 files (for
//! example a `BODY[]` literal saved from a session) the same way a live
//! fetch would.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use humansize::{format_size, DECIMAL};

use gmail_client::config::{self, Config};
use gmail_client::{FetchResponse, Message, Uid};

#[derive(Parser)]
#[command(name = "gmail-client", version, about = "Inspect raw Gmail/IMAP messages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Materialize a raw message file and print a summary
    Parse {
        /// Raw RFC 5322 message
        path: PathBuf,
        /// Fetch response line carrying FLAGS / X-GM-* annotations
        #[arg(short, long, default_value = "")]
        annotations: String,
        /// Mailbox the message belongs to
        #[arg(long, default_value = "INBOX")]
        mailbox: String,
        #[arg(long, default_value_t = 1)]
        uid: Uid,
        #[arg(long)]
        json: bool,
    },
    /// Save every attachment of a raw message file
    Attachments {
        path: PathBuf,
        /// Output directory (defaults to the configured one, then the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load_config();

    let level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(level, &config);

    match cli.command {
        Commands::Parse {
            path,
            annotations,
            mailbox,
            uid,
            json,
        } => cmd_parse(&path, &annotations, &mailbox, uid, json),
        Commands::Attachments { path, output } => {
            let output = output
                .or_else(|| config.attachments.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            cmd_attachments(&path, &output)
        }
        Commands::Config => cmd_config(&config),
        Commands::Completions { shell } => cmd_completions(shell),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "gmail-client.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

fn load_message(path: &Path, annotations: &str, mailbox: &str, uid: Uid) -> anyhow::Result<Message> {
    let raw = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let response = FetchResponse {
        header_text: annotations.to_string(),
        raw,
    };
    Ok(Message::from_response(mailbox, uid, &response)?)
}

fn cmd_parse(
    path: &Path,
    annotations: &str,
    mailbox: &str,
    uid: Uid,
    json: bool,
) -> anyhow::Result<()> {
    let message = load_message(path, annotations, mailbox, uid)?;

    if json {
        let attachments: Vec<_> = message
            .attachments
            .iter()
            .map(|a| {
                serde_json::json!({
                    "name": a.name,
                    "content_type": a.content_type,
                    "size": a.size(),
                })
            })
            .collect();
        let out = serde_json::json!({
            "uid": message.uid,
            "mailbox": message.mailbox,
            "subject": message.subject,
            "from": message.from,
            "to": message.to,
            "cc": message.cc,
            "delivered_to": message.delivered_to,
            "sent_at": message.sent_at.map(|d| d.to_rfc3339()),
            "flags": message.flags(),
            "labels": message.labels(),
            "thread_id": message.thread_id,
            "message_id": message.message_id,
            "body": message.body,
            "html": message.html,
            "attachments": attachments,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Subject:     {}", message.subject);
    if let Some(sender) = message.sender() {
        println!("From:        {sender}");
    }
    for rcpt in message.recipients() {
        println!("To/Cc:       {rcpt}");
    }
    if let Some(sent_at) = message.sent_at {
        println!("Date:        {}", sent_at.format("%Y-%m-%d %H:%M:%S %z"));
    }
    println!("Flags:       {}", join(message.flags()));
    println!("Labels:      {}", join(message.labels()));
    println!(
        "Thread:      {}",
        message.thread_id.as_deref().unwrap_or("-")
    );
    println!(
        "Gmail id:    {}",
        message.message_id.as_deref().unwrap_or("-")
    );
    println!("Text body:   {}", format_size(message.body.len(), DECIMAL));
    println!("HTML body:   {}", format_size(message.html.len(), DECIMAL));
    for att in &message.attachments {
        println!(
            "Attachment:  {} ({}, {})",
            att.name,
            att.content_type,
            format_size(att.size(), DECIMAL)
        );
    }
    Ok(())
}

fn join<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    let joined: Vec<&str> = items.into_iter().map(String::as_str).collect();
    if joined.is_empty() {
        "-".to_string()
    } else {
        joined.join(" ")
    }
}

fn cmd_attachments(path: &Path, output: &Path) -> anyhow::Result<()> {
    let message = load_message(path, "", "INBOX", 1)?;
    std::fs::create_dir_all(output)
        .with_context(|| format!("creating {}", output.display()))?;

    if message.attachments.is_empty() {
        eprintln!("No attachments in {}", path.display());
        return Ok(());
    }

    for att in &message.attachments {
        match att.save(Some(output)) {
            Ok(written) => println!("{}", written.display()),
            Err(e) => {
                tracing::warn!(filename = %att.name, error = %e, "Failed to save attachment");
            }
        }
    }
    Ok(())
}

fn cmd_config(config: &Config) -> anyhow::Result<()> {
    if let Some(path) = config::config_file_path() {
        eprintln!("# {}", path.display());
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "gmail-client", &mut std::io::stdout());
    Ok(())
}
