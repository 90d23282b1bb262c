//! FIFO research queue with a single worker.
//!
//! Jobs share rate-limited search and extraction quotas, so they run one at a
//! time. The worker is spawned once when the queue starts and lives until
//! [`ResearchQueue::shutdown`]. A job that fails or panics is reported through
//! its reporter and the worker moves on to the next entry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use leadscout_shared::{LeadScoutError, ResearchConfig, Result};

use crate::job::{ResearchJob, ResearchReporter, ResearchServices, notify};

struct QueueEntry {
    org_name: String,
    region: String,
    reporter: Arc<dyn ResearchReporter>,
}

/// Status shared between the queue handle and its worker.
#[derive(Default)]
struct QueueStatus {
    pending: AtomicUsize,
    current: Mutex<Option<String>>,
}

impl QueueStatus {
    fn set_current(&self, org_name: Option<String>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = org_name;
    }

    fn current(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Clears the current-job marker however the job ends.
struct CurrentJobGuard<'a> {
    status: &'a QueueStatus,
}

impl<'a> CurrentJobGuard<'a> {
    fn set(status: &'a QueueStatus, org_name: &str) -> Self {
        status.set_current(Some(org_name.to_string()));
        Self { status }
    }
}

impl Drop for CurrentJobGuard<'_> {
    fn drop(&mut self) {
        self.status.set_current(None);
    }
}

// ---------------------------------------------------------------------------
// ResearchQueue
// ---------------------------------------------------------------------------

/// Handle to the research queue. Construct once and share by reference.
pub struct ResearchQueue {
    sender: mpsc::UnboundedSender<QueueEntry>,
    status: Arc<QueueStatus>,
    worker: JoinHandle<()>,
}

impl ResearchQueue {
    /// Spawn the worker. Must be called from within a tokio runtime.
    pub fn start(services: ResearchServices, config: ResearchConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let status = Arc::new(QueueStatus::default());
        let worker = tokio::spawn(worker_loop(receiver, status.clone(), services, config));

        Self {
            sender,
            status,
            worker,
        }
    }

    /// Append a job to the back of the queue.
    pub fn enqueue(
        &self,
        org_name: impl Into<String>,
        region: impl Into<String>,
        reporter: Arc<dyn ResearchReporter>,
    ) -> Result<()> {
        let entry = QueueEntry {
            org_name: org_name.into(),
            region: region.into(),
            reporter,
        };
        let org_name = entry.org_name.clone();

        self.status.pending.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(entry).is_err() {
            self.status.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(LeadScoutError::validation("research queue worker has stopped"));
        }

        info!(org = %org_name, queued = self.queue_size(), "research job enqueued");
        Ok(())
    }

    /// Whether a job is running right now.
    pub fn is_busy(&self) -> bool {
        self.status.current().is_some()
    }

    /// Org name of the running job, if any.
    pub fn current_job(&self) -> Option<String> {
        self.status.current()
    }

    /// Jobs waiting to start, not counting the running one.
    pub fn queue_size(&self) -> usize {
        self.status.pending.load(Ordering::SeqCst)
    }

    /// Stop accepting work and wait for every queued job to finish.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.worker.await {
            error!(error = %e, "research worker terminated abnormally");
        }
    }
}

async fn worker_loop(
    mut receiver: mpsc::UnboundedReceiver<QueueEntry>,
    status: Arc<QueueStatus>,
    services: ResearchServices,
    config: ResearchConfig,
) {
    while let Some(entry) = receiver.recv().await {
        let _guard = CurrentJobGuard::set(&status, &entry.org_name);
        status.pending.fetch_sub(1, Ordering::SeqCst);

        process_entry(entry, services.clone(), config.clone()).await;
    }
    info!("research queue drained, worker exiting");
}

/// Run one job and its completion callback, each on its own task so a panic
/// surfaces as a `JoinError` instead of killing the worker.
async fn process_entry(entry: QueueEntry, services: ResearchServices, config: ResearchConfig) {
    let QueueEntry {
        org_name,
        region,
        reporter,
    } = entry;

    let job_reporter = reporter.clone();
    let job_org = org_name.clone();
    let outcome = tokio::spawn(async move {
        let job = ResearchJob::new(job_org, region, services, config)?;
        Ok::<_, LeadScoutError>(job.run(job_reporter.as_ref()).await)
    })
    .await;

    let summary = match outcome {
        Ok(Ok(summary)) => summary,
        Ok(Err(e)) => {
            error!(org = %org_name, error = %e, "research job failed");
            notify(reporter.as_ref(), &format!("Research failed for {org_name}: {e}"));
            return;
        }
        Err(e) => {
            error!(org = %org_name, error = %e, "research job panicked");
            notify(
                reporter.as_ref(),
                &format!("Research crashed for {org_name}: {e}"),
            );
            return;
        }
    };

    let completion = tokio::spawn(async move { reporter.on_complete(summary).await }).await;
    match completion {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(org = %org_name, error = %e, "completion callback failed"),
        Err(e) => error!(org = %org_name, error = %e, "completion callback panicked"),
    }
}
