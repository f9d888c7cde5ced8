use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info};
use skyfare_booking::MarketSimulator;
use skyfare_store::app_config::SchedulerConfig;

const JOB_QUEUE_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketJob {
    /// Random availability step plus a fresh fare per flight
    Perturb,
    /// Fresh fare per flight, availability untouched
    RecordPrices,
}

/// Handle on the running market scheduler.
pub struct MarketScheduler {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl MarketScheduler {
    /// Stop the tickers and the dispatcher and wait for them to exit. A job
    /// that is already running finishes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                error!("Market scheduler task ended abnormally: {}", e);
            }
        }
        info!("Market scheduler stopped");
    }
}

/// Start one ticker per job plus a single dispatcher that runs the jobs in
/// arrival order. Ticks that find the queue full are dropped.
pub fn start_market_scheduler(market: Arc<MarketSimulator>, config: &SchedulerConfig) -> MarketScheduler {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (job_tx, job_rx) = mpsc::channel(JOB_QUEUE_CAPACITY);

    let market_every = Duration::from_secs(config.market_interval_seconds.max(1));
    let history_every = Duration::from_secs(config.history_interval_seconds.max(1));

    let tasks = vec![
        tokio::spawn(ticker(MarketJob::Perturb, market_every, job_tx.clone(), shutdown_rx.clone())),
        tokio::spawn(ticker(MarketJob::RecordPrices, history_every, job_tx, shutdown_rx.clone())),
        tokio::spawn(dispatcher(market, job_rx, shutdown_rx)),
    ];

    info!(
        market_interval_seconds = market_every.as_secs(),
        history_interval_seconds = history_every.as_secs(),
        "Market scheduler started"
    );
    MarketScheduler {
        shutdown: shutdown_tx,
        tasks,
    }
}

async fn ticker(job: MarketJob, every: Duration, queue: mpsc::Sender<MarketJob>, mut shutdown: watch::Receiver<bool>) {
    let mut interval = interval_at(Instant::now() + every, every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = interval.tick() => match queue.try_send(job) {
                Ok(()) => {}
                Err(TrySendError::Full(job)) => debug!(?job, "Job queue full, skipping tick"),
                Err(TrySendError::Closed(_)) => break,
            },
        }
    }
}

async fn dispatcher(market: Arc<MarketSimulator>, mut queue: mpsc::Receiver<MarketJob>, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            job = queue.recv() => match job {
                Some(job) => run_job(&market, job).await,
                None => break,
            },
        }
    }
}

async fn run_job(market: &MarketSimulator, job: MarketJob) {
    let result = match job {
        MarketJob::Perturb => market.perturb_market().await,
        MarketJob::RecordPrices => market.record_prices().await,
    };
    if let Err(e) = result {
        // per-flight failures are already absorbed; this is the flight listing itself
        error!(?job, "Market job failed: {}", e);
    }
}
