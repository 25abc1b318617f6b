//! cnamed - publish CNAME aliases for the local host over Avahi/mDNS.
//!
//! Thin glue around the publisher engine: parse arguments, set up logging,
//! optionally daemonize, wire signals, and run the reconnect loop. All
//! publishing logic lives in `cname-core`; the D-Bus transport lives in
//! `cname-avahi`.

mod daemon;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use cname_avahi::AvahiNameService;
use cname_core::{CnamePublisher, HostName, RecordTtl};
use logging::LogTarget;

/// Pause between health checks of the naming-service connection.
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Settling delay after teardown; Avahi needs time to forget us before the
/// records disappear network-wide.
const SETTLE_DELAY: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(
    name = "cnamed",
    version,
    about = "Publish CNAMEs pointing to the local host over Avahi/mDNS."
)]
struct Cli {
    /// Fully-qualified CNAME(s) to publish. Subdomains are allowed, but
    /// names must end with the '.local' domain.
    #[arg(value_name = "CNAME", required = true)]
    cnames: Vec<HostName>,

    /// TTL for published records, in seconds.
    #[arg(short, long, value_name = "SECONDS", default_value_t = RecordTtl::default())]
    ttl: RecordTtl,

    /// Do not check for availability before publishing.
    #[arg(short, long)]
    force: bool,

    /// Produce extra output for debugging purposes.
    #[arg(short, long)]
    verbose: bool,

    /// Run the publishing service in the background.
    #[arg(short, long)]
    daemon: bool,

    /// Log messages into 'syslog' or the specified log file.
    #[arg(short, long, value_name = "TARGET")]
    log: Option<String>,
}

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown (signal-triggered teardown completed)
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum AppExitCode {
    CleanShutdown = 0,
    SetupError = 1,
    RuntimeError = 2,
}

impl From<AppExitCode> for ExitCode {
    fn from(code: AppExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let target = LogTarget::from_arg(cli.log.as_deref());
    if let Err(e) = logging::init(&target, cli.verbose, cli.daemon) {
        eprintln!("cnamed: {e:#}");
        return AppExitCode::SetupError.into();
    }

    // After logging, so a relative log path resolves against the launch
    // directory; before any thread exists, since fork drops other threads.
    if cli.daemon {
        if let Err(e) = daemon::daemonize() {
            error!("Cannot run in the background: {e:#}");
            return AppExitCode::SetupError.into();
        }
    }

    // INT/TERM/HUP only flip the flag; teardown runs on the main thread.
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst)) {
            error!("Cannot install the signal handler: {e}");
            return AppExitCode::SetupError.into();
        }
    }

    match run(&cli, &shutdown) {
        Ok(()) => AppExitCode::CleanShutdown.into(),
        Err(e) => {
            error!("{e:#}");
            AppExitCode::RuntimeError.into()
        }
    }
}

/// Outer service loop: keep one healthy publisher alive until a
/// termination signal arrives, then withdraw everything.
///
/// A lost connection discards the whole engine and builds a fresh one on
/// the next tick; there is no in-place repair. Unexpected protocol errors
/// escape to `main` and exit with a runtime error.
fn run(cli: &Cli, shutdown: &AtomicBool) -> anyhow::Result<()> {
    info!("Avahi/mDNS publisher starting...");
    if cli.force {
        info!("Forcing CNAME publishing without collision checks");
    }

    let mut publisher: Option<CnamePublisher> = None;

    while !shutdown.load(Ordering::SeqCst) {
        let healthy = match &publisher {
            Some(p) => p.available().context("health check failed unexpectedly")?,
            None => false,
        };

        if !healthy {
            if publisher.take().is_some() {
                info!("Lost connection with Avahi. Reconnecting...");
            }

            match connect_and_publish(cli) {
                Ok(p) => publisher = Some(p),
                Err(e) if e.is_connection_lost() => {
                    warn!("Avahi is not reachable ({e}), retrying...");
                }
                Err(e) => return Err(e).context("publishing failed unexpectedly"),
            }
        }

        // The records exist for as long as this process stays alive; there
        // is nothing to do between health checks.
        thread::sleep(HEALTH_CHECK_INTERVAL);
    }

    info!("Exiting on termination signal...");
    if let Some(mut p) = publisher.take() {
        if let Err(e) = p.teardown() {
            error!("Failed to withdraw some records: {e}");
        }
        thread::sleep(SETTLE_DELAY);
    }

    Ok(())
}

/// Build a fresh engine over a new connection and publish the whole batch.
///
/// Per-name conflicts are logged and skipped; a connection-level failure
/// mid-batch discards the attempt so the caller can reconnect.
fn connect_and_publish(cli: &Cli) -> cname_core::Result<CnamePublisher> {
    let service = AvahiNameService::connect()?;
    let mut publisher = CnamePublisher::new(Box::new(service), cli.ttl)?;

    for name in &cli.cnames {
        match publisher.publish(name, cli.force) {
            Ok(()) => {}
            Err(e) if e.is_conflict() => error!("Failed to publish '{name}': {e}"),
            Err(e) => return Err(e),
        }
    }

    if publisher.count() == cli.cnames.len() {
        info!("All CNAMEs published");
    } else {
        warn!(
            "{} out of {} CNAMEs published",
            publisher.count(),
            cli.cnames.len()
        );
    }

    Ok(publisher)
}
