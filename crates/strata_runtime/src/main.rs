//! Strata Runtime
//!
//! Headless session: one authority host plus scripted observers walking
//! around it, each materializing its own copy of the streamed cell set.

mod session;

use anyhow::{bail, Context, Result};
use clap::Parser;
use session::Walker;
use std::path::PathBuf;
use std::time::Duration;
use strata_core::Seed;
use strata_net::AuthorityHost;
use strata_services::input::spread;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "strata", about = "Headless spatial streaming session")]
struct Args {
    /// JSON settings file; defaults are used when omitted.
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Overrides `session.observers`.
    #[arg(long)]
    observers: Option<usize>,
    /// Overrides `session.seed`.
    #[arg(long)]
    seed: Option<i32>,
    #[arg(long, default_value_t = 10)]
    duration_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = Args::parse();
    info!("Strata v{}", strata_core::VERSION);

    let mut settings =
        strata_services::load_settings(args.settings.as_deref()).context("failed to load settings")?;
    if let Some(observers) = args.observers {
        settings.session.observers = observers;
    }
    if let Some(seed) = args.seed {
        settings.session.seed = Some(seed);
    }
    settings.validate().context("invalid settings")?;

    let seed = settings.session.seed.map(Seed).unwrap_or_else(Seed::random);
    let (host, handle) = AuthorityHost::new(settings.scheduler_config(), seed, settings.field);
    let host_task = tokio::spawn(host.run());

    let session = &settings.session;
    let duration = Duration::from_secs(args.duration_secs);
    let report_every = Duration::from_millis(session.position_interval_ms);
    let walkers: Vec<_> = spread(session.observers, session.walk_radius, session.walk_speed)
        .into_iter()
        .enumerate()
        .map(|(i, path)| {
            let walker = Walker::connect(
                &handle,
                format!("walker-{i}"),
                path,
                report_every,
                settings.reconciler_config(),
            );
            tokio::spawn(walker.run(duration))
        })
        .collect();
    info!(observers = walkers.len(), %seed, "session started");

    let mut diverged = 0;
    for walker in walkers {
        let summary = walker.await.context("walker task panicked")??;
        if !summary.audit.consistent() {
            warn!(walker = %summary.name, audit = ?summary.audit, "walker diverged");
            diverged += 1;
        }
    }

    handle.shutdown();
    let report = host_task.await.context("host task panicked")?;
    info!(
        sync_steps = report.sync_steps,
        cleanup_steps = report.cleanup_steps,
        events = report.events_sent,
        peak_cells = report.peak_cells,
        final_cells = report.final_cells,
        "session finished"
    );
    info!(
        added = report.cells_added,
        removed = report.cells_removed,
        clears = report.clears,
        recompute_avg = ?report.recompute_avg,
        recompute_max = ?report.recompute_max,
        evict_avg = ?report.evict_avg,
        evict_max = ?report.evict_max,
        "authority metrics"
    );

    if diverged > 0 {
        bail!("{diverged} observer(s) diverged from the authority");
    }
    Ok(())
}
