use std::error::Error;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use url::Url;

use hunter2_live_cli::render::Printer;
use hunter2_live_cli::{now_ms, run, AnswerClient, LiveCommand, LiveEvent, LiveOptions, PageAuth};
use hunter2_live_core::config::CLOCK_SKEW_THRESHOLD_MS;
use hunter2_live_core::{NetDelayConfig, PuzzleSession, SessionSnapshot, SyncConfig};

#[derive(Parser)]
#[command(name = "hunter2-live", version, about = "Follow a hunter2 puzzle page from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct PageArgs {
    /// Puzzle page url, e.g. https://hunt.example/hunt/ep/1/pz/2/
    #[arg(long, env = "HUNTER2_PAGE_URL")]
    page_url: Url,
    #[arg(long, env = "HUNTER2_WS_BASE")]
    ws_base: Option<String>,
    /// Cookie header of a logged-in player, e.g. `sessionid=...`.
    #[arg(long, env = "HUNTER2_COOKIE")]
    cookie: Option<String>,
    #[arg(long, env = "HUNTER2_CSRF_TOKEN")]
    csrf_token: Option<String>,
}

impl PageArgs {
    fn auth(&self) -> PageAuth {
        PageAuth {
            cookie: self.cookie.clone(),
            csrf_token: self.csrf_token.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Stream guesses, unlocks, hints and announcements.
    Watch {
        #[command(flatten)]
        page: PageArgs,
        /// Print a JSON page view per change instead of text lines.
        #[arg(long)]
        json: bool,
        /// Snapshot file used to resume without a full backfill.
        #[arg(long, env = "HUNTER2_RESUME_FILE")]
        resume_file: Option<PathBuf>,
        /// Submit each line typed on stdin as an answer.
        #[arg(long)]
        interactive: bool,
        #[arg(long, default_value_t = CLOCK_SKEW_THRESHOLD_MS)]
        skew_threshold_ms: u64,
        #[arg(long, env = "HUNTER2_NET_IN_DELAY_MS", default_value_t = 0)]
        net_in_delay_ms: u32,
        #[arg(long, env = "HUNTER2_NET_OUT_DELAY_MS", default_value_t = 0)]
        net_out_delay_ms: u32,
        #[arg(long, env = "HUNTER2_NET_JITTER_MS", default_value_t = 0)]
        net_jitter_ms: u32,
    },
    /// Submit one answer and report the result.
    Submit {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long, env = "HUNTER2_ANSWER")]
        answer: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Watch {
            page,
            json,
            resume_file,
            interactive,
            skew_threshold_ms,
            net_in_delay_ms,
            net_out_delay_ms,
            net_jitter_ms,
        } => {
            let config = SyncConfig {
                clock_skew_threshold_ms: skew_threshold_ms,
                request_hints_on_first_load: true,
                ..SyncConfig::default()
            };
            let options = LiveOptions {
                page_url: page.page_url.clone(),
                ws_base: page.ws_base.clone(),
                auth: page.auth(),
                net: NetDelayConfig {
                    inbound_ms: net_in_delay_ms,
                    outbound_ms: net_out_delay_ms,
                    jitter_ms: net_jitter_ms,
                },
            };
            watch(config, options, resume_file, interactive, json).await
        }
        Commands::Submit { page, answer } => submit(&page, &answer).await,
    }
}

async fn watch(
    config: SyncConfig,
    options: LiveOptions,
    resume: Option<PathBuf>,
    interactive: bool,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let page_key = options.page_url.to_string();
    let mut session = PuzzleSession::new(config, now_ms());
    if let Some(path) = &resume {
        load_snapshot(path, &page_key, &mut session);
    }

    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    if interactive {
        let stdin_tx = commands_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let answer = line.trim();
                if answer.is_empty() {
                    continue;
                }
                if stdin_tx.send(LiveCommand::Submit(answer.to_string())).is_err() {
                    break;
                }
            }
        });
    }
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = commands_tx.send(LiveCommand::Shutdown);
        }
    });

    let mut printer = Printer::stdout(json);
    let session = run(session, options, commands_rx, |session, event| {
        if let Err(err) = printer.observe(session, event) {
            warn!(error = %err, "failed to print update");
        }
        if let (LiveEvent::Connected { .. }, Some(path)) = (event, &resume) {
            if let Err(err) = save_snapshot(path, &page_key, session) {
                warn!(error = %err, path = %path.display(), "failed to save snapshot");
            }
        }
    })
    .await?;

    if let Some(path) = &resume {
        save_snapshot(path, &page_key, &session)?;
    }
    Ok(())
}

async fn submit(page: &PageArgs, answer: &str) -> Result<(), Box<dyn Error>> {
    let client = AnswerClient::new(&page.page_url, page.auth())?;
    let mut session = PuzzleSession::new(SyncConfig::default(), now_ms());
    let request = session.submit(answer)?;
    let result = client.submit(&request).await;
    let update = session.on_submit_result(result, now_ms());

    for notice in &update.notices {
        eprintln!("{}", notice.message);
    }
    if let Some(solved) = &update.solved {
        println!("{}", solved.message());
        if let Some(url) = &solved.url {
            println!("{url}");
        }
    } else if let Some(wait_ms) = update.cooldown_ms {
        println!("incorrect, next answer in {:.1}s", wait_ms as f64 / 1000.0);
    }
    Ok(())
}

fn load_snapshot(path: &Path, page_key: &str, session: &mut PuzzleSession) {
    match std::fs::read(path) {
        Ok(bytes) => match SessionSnapshot::from_bytes(&bytes, page_key) {
            Ok(snapshot) => session.restore(&snapshot),
            Err(err) => warn!(error = %err, path = %path.display(), "ignoring snapshot"),
        },
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!(error = %err, path = %path.display(), "failed to read snapshot"),
    }
}

fn save_snapshot(path: &Path, page_key: &str, session: &PuzzleSession) -> Result<(), Box<dyn Error>> {
    let bytes = session.snapshot(page_key).to_bytes()?;
    std::fs::write(path, bytes)?;
    Ok(())
}
