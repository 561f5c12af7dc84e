// src/main.rs

/*
ARCHITECTURE OVERVIEW

This binary drives one position capture session from a command script.

High-level flow:
1. Parse CLI arguments (provider source, timeouts, strict mode).
2. Build the location provider:
   - --at    → the same fix for every request
   - --track → replay of a recorded CSV track
3. If the provider is unavailable or not permitted, print a single
   blocking message and stop: no capture command is run.
4. Execute script commands in order against the capture session:
   fix / watch / label / add / clear / select / compare / show / list
5. Report rejected commands.

Key design choices:
- `fix` and `watch` are the only commands that wait (provider answer or
  timeout). `watch` keeps the newest reading of the stream pending.
- Rejected commands leave the session untouched; the session notifies
  the user on stderr. In strict mode the first rejection stops the run.
- Capture rules live in `capture`, distances in `util`, parsing in `geo`.

The main module focuses on orchestration and I/O only.
*/

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use geocompare::capture::{CaptureError, CaptureSession, FixOptions};
use geocompare::command::{Command, CommandError, script_lines};
use geocompare::geo::Coordinate;
use geocompare::notify::{ConsoleSink, NotificationSink};
use geocompare::provider::{
    FixError, LocationProvider, ProviderStatus, ReplayProvider, StaticProvider, TrackError,
};
use geocompare::render::{render, write_entries_csv};
use geocompare::util::round;

/* ---------------- CONSTANTES ---------------- */

const BLOCKED_MESSAGE: &str = "Location is not available. Check that this device supports \
geolocation and that location access has been granted.";

/* ---------------- CLI ---------------- */

// Command-line interface definition.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Session script, one command per line (stdin when omitted)
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Answer every fix request with this position ("lat,lon" or DMS)
    #[arg(long, allow_hyphen_values = true, conflicts_with = "track")]
    at: Option<Coordinate>,

    /// Replay fixes from a CSV track (latitude,longitude[,error])
    #[arg(short, long)]
    track: Option<PathBuf>,

    /// Give up on a fix request after this many milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Decimal places kept on each axis of a fix
    #[arg(long, default_value_t = 7)]
    precision: u32,

    /// Simulated provider latency per fix, in milliseconds
    #[arg(long, default_value_t = 0)]
    fix_delay_ms: u64,

    /// Simulate a device without location support
    #[arg(long)]
    unavailable: bool,

    /// Simulate denied location permission
    #[arg(long)]
    permission_denied: bool,

    /// Strict mode: stop on first rejected command
    #[arg(long)]
    strict: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

/* ---------------- MAIN ERROR ---------------- */

// Application-level errors.
#[derive(Error, Debug)]
enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Track error: {0}")]
    Track(#[from] TrackError),

    #[error("either --at or --track is required")]
    NoProvider,

    #[error("Line {line}: {source}")]
    InvalidCommand { line: usize, source: CommandError },

    #[error("Line {line}: {source}")]
    Rejected { line: usize, source: CaptureError },
}

/* ---------------- PROVIDER ---------------- */

// The providers selectable from the command line.
enum Provider {
    Static(StaticProvider),
    Replay(ReplayProvider),
}

impl LocationProvider for Provider {
    fn status(&self) -> ProviderStatus {
        match self {
            Provider::Static(p) => p.status(),
            Provider::Replay(p) => p.status(),
        }
    }

    async fn request_fix(&mut self) -> Result<Coordinate, FixError> {
        match self {
            Provider::Static(p) => p.request_fix().await,
            Provider::Replay(p) => p.request_fix().await,
        }
    }

    fn readings_left(&self) -> Option<usize> {
        match self {
            Provider::Static(p) => p.readings_left(),
            Provider::Replay(p) => p.readings_left(),
        }
    }
}

fn build_provider(cli: &Cli) -> Result<Provider, AppError> {
    let status = ProviderStatus {
        available: !cli.unavailable,
        enabled: !cli.permission_denied,
    };
    let delay = Duration::from_millis(cli.fix_delay_ms);

    let provider = match (&cli.track, cli.at) {
        (Some(path), _) => Provider::Replay(
            ReplayProvider::from_path(path)?
                .with_status(status)
                .with_delay(delay),
        ),
        (None, Some(at)) => Provider::Static(
            StaticProvider::new(at)
                .with_status(status)
                .with_delay(delay),
        ),
        (None, None) => return Err(AppError::NoProvider),
    };

    Ok(provider)
}

/* ---------------- MAIN ---------------- */

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn read_script(path: Option<&Path>) -> Result<String, io::Error> {
    match path {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn main() -> Result<(), AppError> {

    // Parse CLI arguments.
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut provider = build_provider(&cli)?;

    // No capture controls without a usable provider.
    if let Some(message) = blocking_message(provider.status()) {
        println!("{message}");
        return Ok(());
    }

    let script = read_script(cli.script.as_deref())?;
    let options = FixOptions {
        timeout_ms: cli.timeout_ms,
        precision: cli.precision,
    };
    let mut session = CaptureSession::new(ConsoleSink::stderr());
    let mut out = io::stdout().lock();

    let rejected = smol::block_on(run_script(
        &mut session,
        &mut provider,
        options,
        &script,
        cli.strict,
        &mut out,
    ))?;

    if rejected > 0 {
        eprintln!("{} rejected command(s)", rejected);
    }

    Ok(())
}

// The single message shown instead of the capture controls.
fn blocking_message(status: ProviderStatus) -> Option<&'static str> {
    (!status.is_usable()).then_some(BLOCKED_MESSAGE)
}

// Runs every script command in order and returns how many were rejected.
// In strict mode the first invalid or rejected command ends the run.
async fn run_script<N: NotificationSink, P: LocationProvider, W: Write>(
    session: &mut CaptureSession<N>,
    provider: &mut P,
    options: FixOptions,
    script: &str,
    strict: bool,
    out: &mut W,
) -> Result<u64, AppError> {
    // Processing counters.
    let mut rejected: u64 = 0;

    for (line, text) in script_lines(script) {
        let command = match text.parse::<Command>() {
            Ok(c) => c,
            Err(source) => {
                if strict {
                    return Err(AppError::InvalidCommand { line, source });
                }
                warn!(line, %source, "command ignored");
                rejected += 1;
                continue;
            }
        };

        debug!(line, ?command, "running");
        match run_command(session, provider, options, command, out).await {
            Ok(()) => {}
            Err(source) if !strict => {
                debug!(line, %source, "command rejected");
                rejected += 1;
            }
            Err(source) => return Err(AppError::Rejected { line, source }),
        }
        out.flush()?;
    }

    Ok(rejected)
}

// Runs one command. Session rules are reported as `CaptureError`;
// output write failures are only logged.
async fn run_command<N: NotificationSink, P: LocationProvider, W: Write>(
    session: &mut CaptureSession<N>,
    provider: &mut P,
    options: FixOptions,
    command: Command,
    out: &mut W,
) -> Result<(), CaptureError> {
    match command {
        Command::Fix => {
            session.acquire_fix(provider, options).await?;
        }
        Command::Watch(limit) => {
            let report = session.watch(provider, options, limit).await?;
            info!(received = report.received, failed = report.failed, "watch done");
        }
        Command::Label(text) => session.set_label(text),
        Command::Add => {
            session.commit()?;
        }
        Command::Clear => session.clear_all(),
        Command::Select { index, side } => session.toggle_selection(index, side)?,
        Command::Compare => {
            let text = match (session.compute_comparison(), session.selection().pair()) {
                (Some(cmp), Some((left, right))) => {
                    let entries = session.entries();
                    format!(
                        "{} vs {}: {} (planar) / {} m (great circle)",
                        entries[left].label(),
                        entries[right].label(),
                        cmp.planar,
                        round(cmp.great_circle, 2)
                    )
                }
                _ => "nothing to compare: select a left and a right position".to_string(),
            };
            print_or_warn(out, &text);
        }
        Command::Show => print_or_warn(out, render(&session.snapshot()).trim_end()),
        Command::List => {
            if let Err(e) = write_entries_csv(session.entries(), &mut *out) {
                warn!(error = %e, "could not write position list");
            }
        }
    }
    Ok(())
}

fn print_or_warn<W: Write>(out: &mut W, text: &str) {
    if let Err(e) = writeln!(out, "{text}") {
        warn!(error = %e, "could not write output");
    }
}

/* ---------------- TEST ---------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use geocompare::notify::{MSG_NO_PENDING, Notice};

    fn provider_at(lat: f64, lon: f64) -> StaticProvider {
        StaticProvider::new(Coordinate::from_degrees(lat, lon))
    }

    fn run(
        session: &mut CaptureSession<Vec<Notice>>,
        provider: &mut impl LocationProvider,
        script: &str,
        strict: bool,
    ) -> (Result<u64, AppError>, String) {
        let mut out = Vec::new();
        let res = smol::block_on(run_script(
            session,
            provider,
            FixOptions::default(),
            script,
            strict,
            &mut out,
        ));
        (res, String::from_utf8(out).unwrap())
    }

    /* --- blocking message --------------------*/
    #[test]
    fn test_blocking_message_when_unusable() {
        assert_eq!(blocking_message(ProviderStatus::READY), None);
        assert_eq!(
            blocking_message(ProviderStatus { available: false, enabled: true }),
            Some(BLOCKED_MESSAGE)
        );
        assert_eq!(
            blocking_message(ProviderStatus { available: true, enabled: false }),
            Some(BLOCKED_MESSAGE)
        );
    }

    /* --- run_command --------------------*/
    #[test]
    fn test_run_command_fix_label_add() {
        let mut session = CaptureSession::new(Vec::new());
        let mut provider = provider_at(13.7563, 100.5018);
        let mut out = Vec::new();

        smol::block_on(async {
            for command in [Command::Fix, Command::Label("Bangkok".into()), Command::Add] {
                run_command(&mut session, &mut provider, FixOptions::default(), command, &mut out)
                    .await
                    .unwrap();
            }
        });

        assert_eq!(session.entries().len(), 1);
        assert_eq!(session.entries()[0].raw_text(), "13.7563,100.5018");
        assert_eq!(session.notifier().as_slice(), [Notice::success("added Bangkok")]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_run_command_add_without_fix_is_rejected() {
        let mut session = CaptureSession::new(Vec::new());
        let mut provider = provider_at(1.0, 2.0);
        let mut out = Vec::new();

        let res = smol::block_on(run_command(
            &mut session,
            &mut provider,
            FixOptions::default(),
            Command::Add,
            &mut out,
        ));

        assert_eq!(res, Err(CaptureError::NoPendingFix));
        assert_eq!(session.notifier().as_slice(), [Notice::error(MSG_NO_PENDING)]);
    }

    #[test]
    fn test_compare_output_line() {
        let mut session = CaptureSession::new(Vec::new());
        let mut provider = ReplayProvider::new([
            Ok(Coordinate::from_degrees(0.0, 0.0)),
            Ok(Coordinate::from_degrees(0.0, 1.0)),
        ]);
        let script = "\
fix
label Equator
add
fix
label East
add
compare
select 0 left
select 1 right
compare
";
        let (res, out) = run(&mut session, &mut provider, script, true);

        assert_eq!(res.unwrap(), 0);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "nothing to compare: select a left and a right position");
        assert!(lines[1].starts_with("Equator vs East: 1 (planar) / 111194.9"));
        assert!(lines[1].ends_with(" m (great circle)"));
    }

    #[test]
    fn test_list_writes_csv() {
        let mut session = CaptureSession::new(Vec::new());
        let mut provider = provider_at(1.0, 2.0);

        let (res, out) = run(&mut session, &mut provider, "fix\nlabel Gate #4\nadd\nlist\n", true);

        assert_eq!(res.unwrap(), 0);
        assert!(out.starts_with("index,label,latitude,longitude,raw,dms\n0,Gate #4,1.0,2.0,\"1,2\","));
    }

    /* --- strict / permissive --------------------*/
    const REJECTING_SCRIPT: &str = "\
fix
add
fly away
label Home
add
";

    #[test]
    fn test_permissive_mode_counts_rejections() {
        let mut session = CaptureSession::new(Vec::new());
        let mut provider = provider_at(1.0, 2.0);

        let (res, _) = run(&mut session, &mut provider, REJECTING_SCRIPT, false);

        // `add` without a label, then the unknown command.
        assert_eq!(res.unwrap(), 2);
        assert_eq!(session.entries().len(), 1);
        assert_eq!(session.entries()[0].label(), "Home");
    }

    #[test]
    fn test_strict_mode_stops_at_first_rejection() {
        let mut session = CaptureSession::new(Vec::new());
        let mut provider = provider_at(1.0, 2.0);

        let (res, _) = run(&mut session, &mut provider, REJECTING_SCRIPT, true);

        assert!(matches!(
            res,
            Err(AppError::Rejected { line: 2, source: CaptureError::EmptyLabel })
        ));
        assert!(session.entries().is_empty());
        assert!(session.state().pending().is_some());
    }

    #[test]
    fn test_strict_mode_stops_at_invalid_command() {
        let mut session = CaptureSession::new(Vec::new());
        let mut provider = provider_at(1.0, 2.0);

        let (res, _) = run(&mut session, &mut provider, "# start\nfly away\nfix\n", true);

        assert!(matches!(
            res,
            Err(AppError::InvalidCommand { line: 2, source: CommandError::Unknown(_) })
        ));
        assert_eq!(session.state(), geocompare::CaptureState::Idle);
    }

    /* --- watch --------------------*/
    #[test]
    fn test_watch_then_add_commits_last_reading() {
        let mut session = CaptureSession::new(Vec::new());
        let mut provider = Provider::Replay(ReplayProvider::new([
            Ok(Coordinate::from_degrees(1.0, 1.0)),
            Ok(Coordinate::from_degrees(2.0, 2.0)),
            Ok(Coordinate::from_degrees(3.0, 3.0)),
        ]));

        let (res, _) = run(&mut session, &mut provider, "watch\nlabel Last\nadd\n", true);

        assert_eq!(res.unwrap(), 0);
        assert_eq!(session.entries()[0].raw_text(), "3,3");
        assert_eq!(provider.readings_left(), Some(0));
    }
}
