use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use spider_core::Pacing;
use spider_logging::{spider_error, spider_info};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::download::Downloader;
use crate::provider::SourceProvider;
use crate::runner::{ProviderRunner, RunError, RunReport};

/// Result of running one provider.
#[derive(Debug)]
pub struct ProviderOutcome {
    pub provider: String,
    pub result: Result<RunReport, RunError>,
}

impl ProviderOutcome {
    pub fn is_error(&self) -> bool {
        self.result.is_err()
    }
}

/// Outcomes of one pass over the providers, in processing order.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub outcomes: Vec<ProviderOutcome>,
}

impl CycleReport {
    pub fn errored(&self) -> Vec<bool> {
        self.outcomes.iter().map(ProviderOutcome::is_error).collect()
    }

    pub fn error_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_error()).count()
    }
}

/// Drives period scans over a fixed list of providers and serves on-demand triggers.
///
/// Runs of the same provider name never overlap: the periodic loop and any
/// number of concurrent triggers queue on a per-provider lock.
pub struct Scheduler {
    providers: Vec<Arc<dyn SourceProvider>>,
    runner: ProviderRunner,
    pacing: Pacing,
    run_locks: HashMap<String, Arc<Mutex<()>>>,
}

impl Scheduler {
    pub fn new(
        providers: Vec<Arc<dyn SourceProvider>>,
        downloader: Arc<dyn Downloader>,
        config: &SchedulerConfig,
    ) -> Self {
        let runner = ProviderRunner::new(downloader, config.ledger_store(), config.layout.clone());
        Self::with_runner(providers, runner, config.pacing())
    }

    pub fn with_runner(
        providers: Vec<Arc<dyn SourceProvider>>,
        runner: ProviderRunner,
        pacing: Pacing,
    ) -> Self {
        let run_locks = providers
            .iter()
            .map(|p| (p.name().to_string(), Arc::new(Mutex::new(()))))
            .collect();
        Self {
            providers,
            runner,
            pacing,
            run_locks,
        }
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    pub fn provider_names(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|p| p.name())
    }

    /// Runs period scans until `shutdown` is cancelled.
    ///
    /// Cancellation is observed between providers and during the sleep; a
    /// provider run already in progress is finished first.
    pub async fn run(&self, shutdown: CancellationToken) {
        spider_info!(
            "Scheduler started with {} providers, period {:?}",
            self.providers.len(),
            self.pacing.period
        );
        loop {
            let report = self.cycle(Some(&shutdown)).await;
            if shutdown.is_cancelled() {
                break;
            }

            let delay = self.pacing.next_delay(&report.errored());
            spider_info!(
                "Scan finished ({} of {} providers failed), next scan in {:?}",
                report.error_count(),
                report.outcomes.len(),
                delay
            );
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        spider_info!("Scheduler stopped");
    }

    /// One period scan over every provider, in list order.
    pub async fn run_cycle(&self) -> CycleReport {
        self.cycle(None).await
    }

    /// Immediately runs every provider named `name`. No-op when none matches.
    pub async fn trigger_run(&self, name: &str) -> Vec<ProviderOutcome> {
        let mut outcomes = Vec::new();
        for provider in self.providers.iter().filter(|p| p.name() == name) {
            outcomes.push(self.run_provider(provider).await);
        }
        if outcomes.is_empty() {
            spider_info!("Trigger for unknown provider {} ignored", name);
        }
        outcomes
    }

    /// Immediately runs every provider, in list order.
    pub async fn trigger_run_all(&self) -> CycleReport {
        self.cycle(None).await
    }

    async fn cycle(&self, shutdown: Option<&CancellationToken>) -> CycleReport {
        let mut report = CycleReport::default();
        for provider in &self.providers {
            if shutdown.is_some_and(CancellationToken::is_cancelled) {
                break;
            }
            report.outcomes.push(self.run_provider(provider).await);
        }
        report
    }

    async fn run_provider(&self, provider: &Arc<dyn SourceProvider>) -> ProviderOutcome {
        let name = provider.name().to_string();
        let lock = self
            .run_locks
            .get(&name)
            .cloned()
            .unwrap_or_else(|| Arc::new(Mutex::new(())));
        let _guard = lock.lock().await;

        let result = match AssertUnwindSafe(self.runner.run(provider.as_ref()))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => Err(RunError::Panicked {
                provider: name.clone(),
                message: panic_message(payload.as_ref()),
            }),
        };

        match &result {
            Ok(report) if !report.ineligible => spider_info!(
                "Provider {}: {} links, {} new downloads, {} already seen",
                name,
                report.links,
                report.downloaded,
                report.already_seen
            ),
            Ok(_) => {}
            Err(err) => spider_error!("{}", err),
        }

        ProviderOutcome {
            provider: name,
            result,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic".to_string()
}

/// A scheduler running as a background task, stoppable on demand.
pub struct SchedulerHandle {
    scheduler: Arc<Scheduler>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Spawns `scheduler.run` on the current tokio runtime.
    pub fn spawn(scheduler: Arc<Scheduler>) -> Self {
        let shutdown = CancellationToken::new();
        let task = {
            let scheduler = scheduler.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };
        Self {
            scheduler,
            shutdown,
            task,
        }
    }

    /// The running scheduler, for on-demand triggers.
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Signals shutdown and waits for the loop to exit.
    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Err(err) = self.task.await {
            spider_error!("Scheduler task ended abnormally: {}", err);
        }
    }
}
