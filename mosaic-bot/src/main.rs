//! mosaic-bot entry point: a console session driving the real pipeline.
//!
//! Platform adapters (the pieces that speak an actual chat wire protocol)
//! live outside this repository and drain the same command channel this
//! binary does. Here, each stdin line becomes a message mentioning the bot
//! in a simulated channel: replies and embeds print to stdout, composite
//! attachments are written into the output directory.
//!
//! Usage:
//!   MOSAIC_GENERATION_URL=https://... cargo run --bin mosaic-bot -- \
//!     --channels-file channel_ids.txt --output-dir ./out

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncBufReadExt;

use mosaic_sdk::client::{Command, command_channel};
use mosaic_sdk::event::{Event, MessageEvent, UserRef};

use mosaic_bot::bot::{Bot, DEFAULT_KEYWORD};
use mosaic_bot::generation::{GenerationClient, HttpTransport};
use mosaic_bot::pipeline::Pipeline;
use mosaic_bot::registry::ChannelRegistry;

#[derive(Parser)]
#[command(
    name = "mosaic-bot",
    about = "Chat bot that turns prompt messages into 3x3 image mosaics"
)]
struct Args {
    /// Generation service endpoint
    #[arg(long, env = "MOSAIC_GENERATION_URL")]
    endpoint: String,

    /// Channel registry file (one channel id per line)
    #[arg(long, default_value = "channel_ids.txt")]
    channels_file: PathBuf,

    /// Directory composite images are written to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Bot user id as the platform reports it
    #[arg(long, default_value = "mosaic")]
    bot_id: String,

    /// Bot display name
    #[arg(long, default_value = "mosaic")]
    bot_name: String,

    /// Opt-in keyword that registers a channel
    #[arg(long, default_value = DEFAULT_KEYWORD)]
    keyword: String,

    /// Generation attempts before giving up
    #[arg(long, default_value = "3")]
    attempts: u32,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value = "60")]
    request_timeout_secs: u64,

    /// Delay between generation attempts in milliseconds
    #[arg(long, default_value = "0")]
    retry_delay_ms: u64,

    /// Maximum concurrent generation pipelines
    #[arg(long, default_value = "4")]
    max_in_flight: usize,

    /// Channel id used for the console session
    #[arg(long, default_value = "console")]
    channel: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mosaic_bot=info".into()),
        )
        .init();

    let args = Args::parse();

    tokio::fs::create_dir_all(&args.output_dir)
        .await
        .with_context(|| format!("failed to create {}", args.output_dir.display()))?;

    let registry = Arc::new(
        ChannelRegistry::load(&args.channels_file)
            .await
            .context("cannot start without a readable channel registry")?,
    );

    let transport = HttpTransport::new(
        args.endpoint.clone(),
        Duration::from_secs(args.request_timeout_secs),
    )
    .context("failed to build the generation transport")?;
    let client = GenerationClient::new(
        Box::new(transport),
        args.attempts,
        Duration::from_millis(args.retry_delay_ms),
    );
    let pipeline = Arc::new(Pipeline::new(client, args.max_in_flight));

    let (handle, cmd_rx) = command_channel(64);
    let bot_user = UserRef::new(args.bot_id.clone(), args.bot_name.clone());
    let bot = Bot::new(
        bot_user.clone(),
        handle,
        registry,
        Arc::clone(&pipeline),
        args.keyword.clone(),
    );

    tracing::info!(
        endpoint = %args.endpoint,
        channel = %args.channel,
        "console session started; type a prompt, Ctrl-D to quit"
    );

    let printer = tokio::spawn(print_commands(cmd_rx, args.output_dir.clone()));

    bot.handle_event(&Event::Ready {
        bot: bot_user.clone(),
    })
    .await?;

    // Each stdin line is a message tagging the bot in the console channel.
    let author = UserRef::new("console-user", "console");
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event = Event::Message(MessageEvent {
            author: author.clone(),
            channel_id: args.channel.clone(),
            content: format!("<@{}> {}", bot_user.id, line),
            mentions: vec![bot_user.clone()],
        });
        if let Err(e) = bot.handle_event(&event).await {
            tracing::error!(error = %e, "event handler error");
        }
    }

    tracing::info!("stdin closed, draining in-flight generations");
    pipeline.cancel_signal().set();
    pipeline.drain().await;
    drop(bot);
    let _ = printer.await;

    Ok(())
}

/// Render drained platform commands to the console, writing attachments
/// out as files.
async fn print_commands(mut rx: tokio::sync::mpsc::Receiver<Command>, output_dir: PathBuf) {
    let mut file_count = 0u32;
    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Reply { channel_id, text } => {
                println!("[{channel_id}] {text}");
            }
            Command::Send {
                channel_id,
                message,
            } => {
                for embed in &message.embeds {
                    println!("[{channel_id}] {}", embed.description);
                    for field in &embed.fields {
                        println!("[{channel_id}]   {}: {}", field.name, field.value);
                    }
                }
                for file in message.files {
                    file_count += 1;
                    let path = output_dir.join(format!("{:04}-{}", file_count, file.filename));
                    match tokio::fs::write(&path, &file.bytes).await {
                        Ok(()) => println!("[{channel_id}] wrote {}", path.display()),
                        Err(e) => {
                            tracing::error!(path = %path.display(), error = %e, "failed to write attachment");
                        }
                    }
                }
            }
        }
    }
}
