//! kb: CLI binary for Knucklebones self-play.
//!
//! Subcommands:
//! - selfplay    Run self-play games through the batching dispatcher

use std::env;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use kb_core::Config;
use kb_infer::{HeuristicOracle, InferenceServer, ServerOptions};
use kb_logging::{now_ms, EpisodeEventV1, NdjsonWriter, ServerStatsEventV1};
use kb_mcts::MctsConfig;
use kb_selfplay::play_episode;

fn print_help() {
    eprintln!(
        r#"kb - Knucklebones self-play CLI

USAGE:
    kb <COMMAND> [OPTIONS]

COMMANDS:
    selfplay            Run self-play games with MCTS + batched inference

OPTIONS:
    -h, --help          Print this help message
"#
    );
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("selfplay") => cmd_selfplay(&args[1..]),
        Some("-h") | Some("--help") | None => print_help(),
        Some(other) => {
            eprintln!("Unknown command: {other}");
            eprintln!("Run `kb --help` for usage.");
            process::exit(1);
        }
    }
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> T {
    if i + 1 >= args.len() {
        eprintln!("Missing value for {flag}");
        process::exit(1);
    }
    args[i + 1].parse().unwrap_or_else(|_| {
        eprintln!("Invalid {flag} value: {}", args[i + 1]);
        process::exit(1);
    })
}

fn cmd_selfplay(args: &[String]) {
    let mut config_path: Option<String> = None;
    let mut games: Option<u32> = None;
    let mut seed: Option<u64> = None;
    let mut workers: Option<u32> = None;
    let mut simulations: Option<u32> = None;
    let mut out: Option<String> = None;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!(
                    r#"kb selfplay

USAGE:
    kb selfplay [--config PATH] [--games N] [--seed S] [--workers W]
                [--simulations N] [--out FILE]

OPTIONS:
    --config PATH    YAML config file (defaults apply when omitted)
    --games N        Number of games to play
    --seed S         Base seed; per-game seeds derive from it
    --workers W      Worker threads sharing the dispatcher
    --simulations N  MCTS simulations per decision
    --out FILE       Append NDJSON events to FILE
"#
                );
                return;
            }
            "--config" => {
                config_path = Some(parse_value(args, i, "--config"));
                i += 2;
            }
            "--games" => {
                games = Some(parse_value(args, i, "--games"));
                i += 2;
            }
            "--seed" => {
                seed = Some(parse_value(args, i, "--seed"));
                i += 2;
            }
            "--workers" => {
                workers = Some(parse_value(args, i, "--workers"));
                i += 2;
            }
            "--simulations" => {
                simulations = Some(parse_value(args, i, "--simulations"));
                i += 2;
            }
            "--out" => {
                out = Some(parse_value(args, i, "--out"));
                i += 2;
            }
            other => {
                eprintln!("Unknown option for `kb selfplay`: {other}");
                eprintln!("Run `kb selfplay --help` for usage.");
                process::exit(1);
            }
        }
    }

    let mut cfg = match &config_path {
        Some(p) => Config::load(p).unwrap_or_else(|e| {
            eprintln!("Failed to load config {p}: {e}");
            process::exit(1);
        }),
        None => Config::default(),
    };
    if let Some(v) = games {
        cfg.selfplay.games = v;
    }
    if let Some(v) = seed {
        cfg.selfplay.seed = v;
    }
    if let Some(v) = workers {
        cfg.selfplay.workers = v;
    }
    if let Some(v) = simulations {
        cfg.mcts.simulations = v;
    }

    let writer = match &out {
        Some(path) => match NdjsonWriter::open_append_with_flush(path, 64) {
            Ok(w) => Some(w),
            Err(e) => {
                eprintln!("Failed to open {path}: {e}");
                process::exit(1);
            }
        },
        None => None,
    };
    let writer = Arc::new(Mutex::new(writer));

    let server = Arc::new(InferenceServer::start(
        HeuristicOracle,
        ServerOptions {
            max_batch: cfg.inference.max_batch as usize,
            max_wait: Duration::from_micros(cfg.inference.max_wait_us),
        },
    ));

    let mcts_cfg = MctsConfig {
        c_puct: cfg.mcts.c_puct,
        simulations: cfg.mcts.simulations,
        batch_size: cfg.mcts.batch_size as usize,
        ..MctsConfig::default()
    };

    let games_total = cfg.selfplay.games as u64;
    let next_game = Arc::new(AtomicU64::new(0));
    let samples_total = Arc::new(AtomicU64::new(0));
    let failures = Arc::new(AtomicU64::new(0));

    let t0 = Instant::now();
    let n_workers = cfg.selfplay.workers.max(1).min(cfg.selfplay.games.max(1));
    let mut handles = Vec::with_capacity(n_workers as usize);
    for _ in 0..n_workers {
        let server = Arc::clone(&server);
        let writer = Arc::clone(&writer);
        let next_game = Arc::clone(&next_game);
        let samples_total = Arc::clone(&samples_total);
        let failures = Arc::clone(&failures);
        let schedule = cfg.selfplay.temperature_schedule.clone();
        let base_seed = cfg.selfplay.seed;

        handles.push(thread::spawn(move || loop {
            let game_id = next_game.fetch_add(1, Ordering::Relaxed);
            if game_id >= games_total {
                break;
            }
            let game_seed = base_seed ^ game_id.wrapping_mul(0x9E37_79B9_7F4A_7C15);
            match play_episode(&*server, mcts_cfg, &schedule, game_seed) {
                Ok(samples) => {
                    samples_total.fetch_add(samples.len() as u64, Ordering::Relaxed);
                    let z_player0 = samples.first().map(|s| s.z).unwrap_or(0.0);
                    let mut w = writer.lock().unwrap();
                    if let Some(w) = w.as_mut() {
                        let ev = EpisodeEventV1 {
                            event: "episode",
                            ts_ms: now_ms(),
                            game_id,
                            seed: game_seed,
                            decisions: samples.len(),
                            z_player0,
                        };
                        if let Err(e) = w.write_event(&ev) {
                            eprintln!("Failed to write episode event: {e}");
                        }
                    }
                }
                Err(e) => {
                    eprintln!("Game {game_id} failed: {e}");
                    failures.fetch_add(1, Ordering::Relaxed);
                }
            }
        }));
    }
    for h in handles {
        let _ = h.join();
    }

    let elapsed = t0.elapsed().as_secs_f64();
    let stats = server.stats_snapshot();

    {
        let mut w = writer.lock().unwrap();
        if let Some(w) = w.as_mut() {
            let ev = ServerStatsEventV1 {
                event: "server_stats",
                ts_ms: now_ms(),
                batches: stats.batches,
                requests: stats.requests,
                avg_batch_size: stats.avg_batch_size,
            };
            if let Err(e) = w.write_event(&ev).and_then(|_| w.flush()) {
                eprintln!("Failed to write stats event: {e}");
            }
        }
    }

    println!("Self-play finished:");
    println!("  - Games: {} ({} failed)", games_total, failures.load(Ordering::Relaxed));
    println!("  - Samples: {}", samples_total.load(Ordering::Relaxed));
    println!("  - Elapsed: {elapsed:.2}s");
    println!(
        "  - Inference: {} requests in {} batches (avg batch {:.2})",
        stats.requests, stats.batches, stats.avg_batch_size
    );

    server.stop();
}
