use clap::{Parser, Subcommand};
use cue_flow::config::SessionConfig;
use cue_flow::fsm_player::AdFetcher;
use cue_flow::media::{AdBreak, MediaModel};
use cue_flow::session::PlayerSession;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Parser)]
#[command(name = "cueflow", about = "Ad-break scheduling core CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated playback session against stub collaborators
    Simulate {
        /// Session config file (JSON). Cue flags below override it.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Cue point in milliseconds (repeatable)
        #[arg(long = "cue")]
        cues: Vec<u64>,
        /// Networking lookahead in milliseconds
        #[arg(long)]
        ahead: Option<u64>,
        /// Tolerance window in milliseconds
        #[arg(long)]
        tolerance: Option<u64>,
        /// Content duration in milliseconds
        #[arg(long, default_value_t = 120_000)]
        duration: u64,
        /// Mean progress-callback interval in milliseconds
        #[arg(long, default_value_t = 400)]
        step: u64,
        /// Max random jitter added to each interval in milliseconds
        #[arg(long, default_value_t = 200)]
        jitter: u64,
        /// Creatives per fetched break
        #[arg(long, default_value_t = 2)]
        pod_size: usize,
        /// Simulate every metadata fetch failing
        #[arg(long)]
        fail_fetch: bool,
    },
    /// Validate a config file and print the derived ad-call table
    Check {
        /// Session config file (JSON)
        config: PathBuf,
    },
    /// Session configuration files
    Config {
        #[command(subcommand)]
        action: ConfigCmd,
    },
}

#[derive(Subcommand)]
enum ConfigCmd {
    /// Write a starter config with example cue points
    Init { path: PathBuf },
    /// Print a config file
    Show { path: PathBuf },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            config,
            cues,
            ahead,
            tolerance,
            duration,
            step,
            jitter,
            pod_size,
            fail_fetch,
        } => {
            let mut cfg = match config {
                Some(path) => match SessionConfig::load(&path) {
                    Ok(c) => c,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                },
                None => SessionConfig::default(),
            };
            if !cues.is_empty() {
                cfg.cue_points = cues;
            }
            if let Some(a) = ahead {
                cfg.networking_ahead_millis = a;
            }
            if let Some(t) = tolerance {
                cfg.tolerance_window_millis = t;
            }
            if cfg.cue_points.is_empty() {
                eprintln!("Error: no cue points (pass --cue or a config file).");
                std::process::exit(1);
            }

            if let Err(e) = simulate(&cfg, duration, step, jitter, pod_size, fail_fetch) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }

        Commands::Check { config } => match SessionConfig::load(&config) {
            Ok(cfg) => {
                println!(
                    "Config OK: {} cue point(s), lookahead {} ms, tolerance ±{} ms",
                    cfg.cue_points.len(),
                    cfg.networking_ahead_millis,
                    cfg.tolerance_window_millis
                );
                println!("{:>12}  {:>12}", "cue (ms)", "ad call (ms)");
                for &cue in &cfg.cue_points {
                    println!(
                        "{:>12}  {:>12}",
                        cue,
                        cue.saturating_sub(cfg.networking_ahead_millis)
                    );
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },

        Commands::Config { action } => match action {
            ConfigCmd::Init { path } => {
                let cfg = SessionConfig {
                    cue_points: vec![30_000, 300_000, 600_000],
                    ..Default::default()
                };
                match cfg.save(&path) {
                    Ok(()) => println!("Wrote starter config to {}", path.display()),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigCmd::Show { path } => match SessionConfig::load(&path) {
                Ok(cfg) => match serde_json::to_string_pretty(&cfg) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                },
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            },
        },
    }
}

/// Stub network collaborator: records the requested cue point so the
/// simulation loop can answer with a generated pod (or a failure).
#[derive(Default)]
struct StubFetcher {
    requested: RefCell<Option<u64>>,
}

/// Local wrapper so the foreign-trait-for-`Rc` impl satisfies coherence.
struct SharedFetcher(Rc<StubFetcher>);

impl AdFetcher for SharedFetcher {
    fn fetch_ad_metadata(&self, cue_point_millis: u64) {
        *self.0.requested.borrow_mut() = Some(cue_point_millis);
    }
}

/// Drive a whole session with an irregular progress clock, answering each
/// side effect the way the real collaborators would.
fn simulate(
    cfg: &SessionConfig,
    duration: u64,
    step: u64,
    jitter: u64,
    pod_size: usize,
    fail_fetch: bool,
) -> Result<(), String> {
    let content = MediaModel::content("Feature", "sim://content");
    let mut session = PlayerSession::new(cfg, content)?;

    let fetcher = Rc::new(StubFetcher::default());
    session.set_fetcher(Box::new(SharedFetcher(fetcher.clone())));

    println!(
        "Simulating {} ms of playback, {} cue point(s), step {}±{} ms",
        duration,
        cfg.cue_points.len(),
        step,
        jitter
    );

    let mut position: u64 = 0;
    let mut breaks_played = 0usize;

    while position <= duration {
        session.on_progress(position, duration);

        // Answer an in-flight ad call.
        if let Some(cue) = fetcher.requested.borrow_mut().take() {
            if fail_fetch {
                println!("[{:>7}] fetch for cue {} failed", position, cue);
                session.on_ad_error();
            } else {
                println!(
                    "[{:>7}] fetched {} creative(s) for cue {}",
                    position, pod_size, cue
                );
                let ads = (0..pod_size)
                    .map(|i| MediaModel::ad(format!("spot-{}-{}", cue, i + 1), "sim://ad"))
                    .collect();
                session.on_ad_metadata(AdBreak::new(cue, ads));
            }
        }

        // Play out a started break creative by creative.
        if session.is_ad_playing() {
            println!("[{:>7}] ad break started", position);
            while session.is_ad_playing() {
                session.on_ad_finished();
            }
            breaks_played += 1;
            println!("[{:>7}] break finished, content resumed", position);
        }

        position += step + fastrand::u64(0..=jitter);
    }

    session.end_session();
    println!(
        "Done: {} break(s) played, {} cue point(s) left un-played",
        breaks_played,
        session.cue_points().len()
    );
    Ok(())
}
