use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use voxstream::config::read_app_config;
use voxstream::stream_transcriber::{StreamTranscriber, TranscriptUpdate};

#[derive(Parser)]
#[command(name = "voxstream")]
#[command(about = "Streams microphone audio to a cloud speech recognizer")]
#[command(version)]
struct Args {
    /// Path to the configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Override the language code sent to the recognizer
    #[arg(long)]
    language: Option<String>,

    /// Override the recognizer endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Do not request interim results
    #[arg(long)]
    no_interim: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("voxstream=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("voxstream=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let mut app_config = read_app_config(&args.config);
    if let Some(language) = args.language {
        app_config.stream.language_code = language;
    }
    if let Some(endpoint) = args.endpoint {
        app_config.stream.endpoint = endpoint;
    }
    if args.no_interim {
        app_config.stream.interim_results = false;
    }

    let mut transcriber = StreamTranscriber::new(app_config);
    // Subscribe before the response reader starts so no early result is
    // broadcast without a receiver.
    let transcript_rx = transcriber.subscribe();
    transcriber.start().await?;

    let running = transcriber.get_running();
    let running_for_signal = running.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!();
            tracing::info!("Ctrl+C received, shutting down");
            running_for_signal.store(false, Ordering::Relaxed);
        }
    });

    println!("Listening. Press Ctrl+C to stop.");
    run_print_loop(transcript_rx, running).await;

    transcriber.shutdown().await?;
    Ok(())
}

/// Prints transcript updates until the session ends
///
/// Interim results rewrite the current console line; final results commit it.
async fn run_print_loop(
    mut transcript_rx: broadcast::Receiver<TranscriptUpdate>,
    running: Arc<AtomicBool>,
) {
    loop {
        tokio::select! {
            update = transcript_rx.recv() => match update {
                Ok(update) => {
                    if update.is_final {
                        print!("\r{:100}\r", "");
                        println!("{}", update.text);
                    } else {
                        print!("\r{:100}\r{}", "", update.text);
                        let _ = std::io::stdout().flush();
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Display fell behind, skipped {} transcript updates", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::time::sleep(Duration::from_millis(100)) => {
                if !running.load(Ordering::Relaxed) {
                    break;
                }
            }
        }
    }
}
