//! CLI for the multisig vault.
//!
//! Pipeline: load config -> spawn vault actor -> replay script -> report / event sink.

mod script;

use clap::{Parser, Subcommand};
use multisig_core::VaultConfig;
use multisig_engine::reporter::Report;
use multisig_engine::sink::json_stream::JsonStreamSink;
use multisig_engine::sink::{EventRow, EventSequencer};
use multisig_engine::{actor, Vault};
use multisig_host::{Clock, ManualClock, NullTransport, SystemClock};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "multisig", version, about = "Quorum-governed shared-custody vault")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a scripted session against a fresh vault.
    Run {
        #[arg(short, long, env = "MULTISIG_CONFIG")]
        config: PathBuf,

        #[arg(short, long)]
        script: PathBuf,

        #[arg(long, default_value_t = false)]
        json: bool,

        /// Stop at the first rejected step instead of logging and continuing.
        #[arg(long, default_value_t = false)]
        strict: bool,

        /// Event sink: "ndjson" writes NDJSON to stdout,
        /// "ndjson:/path/to/file" writes to file.
        #[arg(long)]
        sink: Option<String>,
    },

    /// Validate a config file and print the initial vault.
    Check {
        #[arg(short, long, env = "MULTISIG_CONFIG")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => {
            let cfg = VaultConfig::from_path(&config)?;
            let vault = Vault::with_system_clock(cfg)?;
            tracing::info!(path = %config.display(), "config ok");
            print!("{}", Report::build(&vault).render());
        }

        Commands::Run {
            config,
            script,
            json,
            strict,
            sink,
        } => {
            let t0 = Instant::now();

            // 1. Load inputs.
            let cfg = VaultConfig::from_path(&config)?;
            let script = script::Script::from_path(&script)?;
            let clock = ManualClock::new(script.start.unwrap_or_else(|| SystemClock.now()));
            tracing::info!(
                owners = cfg.owners.len(),
                quorum = cfg.quorum,
                steps = script.steps.len(),
                start = clock.now(),
                "starting session"
            );

            // 2. Spawn the single-writer actor.
            let vault = Vault::new(cfg, clock.clone())?;
            let (handle, task) = actor::spawn(vault, NullTransport);

            // 3. Replay steps, draining events after each one.
            let mut sequencer = EventSequencer::new();
            let mut rows: Vec<EventRow> = Vec::new();
            let mut rejected = 0usize;

            for (i, step) in script.steps.into_iter().enumerate() {
                match step.run(&handle, &clock).await {
                    Ok(outcome) => tracing::info!(step = i, "{outcome}"),
                    Err(e) => {
                        rejected += 1;
                        tracing::warn!(step = i, error = %e, "step rejected");
                        if strict {
                            return Err(e.into());
                        }
                    }
                }
                let events = handle.drain_events().await?;
                rows.extend(sequencer.rows(clock.now(), events));
            }

            drop(handle);
            let vault = task.await?;

            tracing::info!(
                events = rows.len(),
                rejected,
                elapsed_ms = t0.elapsed().as_millis(),
                "session complete"
            );

            // 4. Report.
            let report = Report::build(&vault);

            // 5. Sink output.
            if let Some(ref sink_spec) = sink {
                if sink_spec == "ndjson" {
                    let mut s = JsonStreamSink::stdout();
                    s.write_rows(&rows)?;
                    let n = s.finish()?;
                    tracing::info!(rows = n, "ndjson sink: wrote to stdout");
                } else if let Some(path) = sink_spec.strip_prefix("ndjson:") {
                    let file = std::fs::File::create(path)?;
                    let mut s = JsonStreamSink::new(file);
                    s.write_rows(&rows)?;
                    let n = s.finish()?;
                    tracing::info!(rows = n, path, "ndjson sink: wrote to file");
                } else {
                    eprintln!(
                        "Unknown sink: {}. Use 'ndjson' or 'ndjson:/path'",
                        sink_spec
                    );
                }

                // Still print report to stderr so it's visible.
                eprint!("{}", report.render());
            } else if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render());
            }
        }
    }

    Ok(())
}
