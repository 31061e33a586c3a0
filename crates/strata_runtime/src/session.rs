//! Scripted observers walking around a shared authority

use std::time::Duration;
use strata_core::pool::HeadlessFactory;
use strata_net::{ClientEvent, CountAudit, HostHandle, NetError, ObserverClient, ReconcilerConfig};
use strata_services::WalkPath;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// How one walker's local state ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkSummary {
    pub name: String,
    pub audit: CountAudit,
    pub created: usize,
    pub peak_active: usize,
    pub pooled: usize,
    pub gaps: u64,
}

pub struct Walker {
    name: String,
    path: WalkPath,
    report_every: Duration,
    client: ObserverClient<HeadlessFactory>,
}

impl Walker {
    pub fn connect(
        handle: &HostHandle,
        name: impl Into<String>,
        path: WalkPath,
        report_every: Duration,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            name: name.into(),
            path,
            report_every,
            client: ObserverClient::new(handle.connect(), HeadlessFactory::default(), config),
        }
    }

    /// Walk for `duration`, then audit local state against the authority and leave.
    pub async fn run(mut self, duration: Duration) -> Result<WalkSummary, NetError> {
        self.client.join(&self.name, self.path.position_at(Duration::ZERO))?;
        let start = Instant::now();
        let mut ticker = interval(self.report_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let elapsed = start.elapsed();
                    if elapsed >= duration {
                        break;
                    }
                    self.client.report_position(self.path.position_at(elapsed))?;
                }
                event = self.client.next_event() => {
                    if let ClientEvent::Synced { events } = event? {
                        debug!(walker = %self.name, events, "synced");
                    }
                }
            }
        }

        // Frames queued ahead of the reply are applied before it is read
        self.client.request_count()?;
        let audit = loop {
            if let ClientEvent::Audited(audit) = self.client.next_event().await? {
                break audit;
            }
        };
        self.client.leave()?;

        let reconciler = self.client.reconciler().ok_or(NetError::NotWelcomed)?;
        let summary = WalkSummary {
            name: self.name,
            audit,
            created: reconciler.created_count(),
            peak_active: reconciler.peak_active(),
            pooled: reconciler.pooled_count(),
            gaps: reconciler.mirror().gaps(),
        };
        info!(
            walker = %summary.name,
            active = summary.audit.local,
            created = summary.created,
            peak = summary.peak_active,
            pooled = summary.pooled,
            "walk finished"
        );
        Ok(summary)
    }
}
