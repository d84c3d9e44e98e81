// src/main.rs - Runs the echo sketch against a simulated board
use std::sync::Arc;

use boardsim::board::BoardModel;
use boardsim::config::{self, Config, DebugConfig};
use boardsim::hardware::Board;
use boardsim::serial::feed_lines;
use boardsim::sketch::{EchoSketch, Runner};
use clap::Parser;
use tokio::io::BufReader;

#[derive(Debug, Parser)]
#[command(name = "boardsim", version, about = "Simulated microcontroller board running an echo sketch")]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Board model override (uno, nano, pro, pro_mini)
    #[arg(short, long)]
    board: Option<BoardModel>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Trace every pin read and write (implies --verbose)
    #[arg(long)]
    debug: bool,

    #[arg(long)]
    max_loops: Option<u64>,

    #[arg(long)]
    loop_delay_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();

    let level = if cli.verbose || cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting boardsim {}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            config::load_config(path).map_err(|e| {
                tracing::error!("Failed to load config from '{}': {}", path, e);
                Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>
            })?
        }
        None => Config::default(),
    };
    if let Some(model) = cli.board {
        config.board.model = model;
    }
    if cli.debug {
        config.debug = DebugConfig::all();
    }
    if cli.max_loops.is_some() {
        config.runner.max_loops = cli.max_loops;
    }
    if let Some(delay) = cli.loop_delay_ms {
        config.runner.loop_delay_ms = delay;
    }
    config.validate()?;

    let board = Arc::new(Board::new(&config));
    let runner = Runner::new(&config.runner);

    let feeder = tokio::spawn({
        let board = Arc::clone(&board);
        async move { feed_lines(BufReader::new(tokio::io::stdin()), board.serial()).await }
    });

    let stop = runner.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping sketch");
            stop.stop();
        }
    });

    let baud = config.serial.baud;
    let sketch_board = Arc::clone(&board);
    let loops = tokio::task::spawn_blocking(move || {
        let mut sketch = EchoSketch::new(baud);
        runner.run(&sketch_board, &mut sketch)
    })
    .await?;

    feeder.abort();
    board.serial().flush();
    tracing::info!(loops, "boardsim finished");

    // The stdin reader sits in a blocking read that runtime shutdown would wait on.
    std::process::exit(0);
}
