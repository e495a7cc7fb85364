// src/core/scheduler.rs
//! Polls the venue for candle history, once per candle, per registered pair.
//!
//! Every pair gets its own single-slot queue. Publication blocks on a full
//! queue, so a slow consumer delays updates for its own pair only: a pair
//! whose last series has not been handed off yet is skipped by later scans
//! while the other pairs keep their schedule.
use crate::connectors::traits::VenueDriver;
use crate::error::SchedulerError;
use crate::types::{AssetPair, Series, Timeframe};
use crate::utils::shutdown::{cancelled, is_cancelled};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

pub const TICK_INTERVAL: Duration = Duration::from_millis(500);

const CHECK_INTERVAL_MS: i64 = 1000;
const REFRESH_SLACK_MS: i64 = 2000;

/// Minimum spacing between two scans of the registrations.
pub fn check_interval() -> chrono::Duration {
    chrono::Duration::milliseconds(CHECK_INTERVAL_MS)
}

/// Added to the computed next candle open so the new candle has surely started
/// on the venue side when it is fetched.
pub fn refresh_slack() -> chrono::Duration {
    chrono::Duration::milliseconds(REFRESH_SLACK_MS)
}

type PairKey = (AssetPair, Timeframe);

struct Registration {
    next_refresh: DateTime<Utc>,
    in_flight: bool,
    sender: mpsc::Sender<Series>,
}

#[derive(Default)]
struct SchedulerState {
    registrations: HashMap<PairKey, Registration>,
    last_check: Option<DateTime<Utc>>,
}

pub struct RefreshScheduler {
    venue: Arc<dyn VenueDriver>,
    // Held for map inspection and updates only, never across a venue call.
    state: Mutex<SchedulerState>,
}

impl RefreshScheduler {
    pub fn new(venue: Arc<dyn VenueDriver>) -> Self {
        Self {
            venue,
            state: Mutex::new(SchedulerState::default()),
        }
    }

    /// Starts polling `asset` on `timeframe`. The first fetch happens on the
    /// next scan because the refresh time starts at the epoch.
    pub async fn register(
        &self,
        asset: AssetPair,
        timeframe: Timeframe,
    ) -> Result<mpsc::Receiver<Series>, SchedulerError> {
        let mut state = self.state.lock().await;
        let key = (asset, timeframe);
        if state.registrations.contains_key(&key) {
            let (asset, timeframe) = key;
            return Err(SchedulerError::AlreadyRegistered { asset, timeframe });
        }

        let (sender, receiver) = mpsc::channel(1);
        info!(asset = %key.0, timeframe = %key.1, "Registered series refresh");
        state.registrations.insert(
            key,
            Registration {
                next_refresh: DateTime::<Utc>::UNIX_EPOCH,
                in_flight: false,
                sender,
            },
        );
        Ok(receiver)
    }

    pub async fn next_refresh(&self, asset: &AssetPair, timeframe: Timeframe) -> Option<DateTime<Utc>> {
        let state = self.state.lock().await;
        state
            .registrations
            .get(&(asset.clone(), timeframe))
            .map(|r| r.next_refresh)
    }

    /// Scans the registrations as of `now` and spawns one refresh task per
    /// due pair into `tasks`. Returns the number of refreshes started.
    pub async fn dispatch_due(
        self: &Arc<Self>,
        now: DateTime<Utc>,
        tasks: &mut JoinSet<()>,
        shutdown: &watch::Receiver<bool>,
    ) -> usize {
        let due: Vec<(PairKey, mpsc::Sender<Series>)> = {
            let mut state = self.state.lock().await;
            if let Some(last) = state.last_check {
                if now - last < check_interval() {
                    return 0;
                }
            }
            state.last_check = Some(now);

            state
                .registrations
                .iter_mut()
                .filter(|(_, r)| !r.in_flight && r.next_refresh <= now)
                .map(|(key, r)| {
                    r.in_flight = true;
                    (key.clone(), r.sender.clone())
                })
                .collect()
        };

        let started = due.len();
        for ((asset, timeframe), sender) in due {
            let scheduler = Arc::clone(self);
            let shutdown = shutdown.clone();
            tasks.spawn(async move {
                scheduler.refresh(asset, timeframe, sender, shutdown).await;
            });
        }
        started
    }

    async fn refresh(
        &self,
        asset: AssetPair,
        timeframe: Timeframe,
        sender: mpsc::Sender<Series>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let series = match self.venue.get_series(&asset, timeframe).await {
            Ok(series) => series,
            Err(e) => {
                error!(asset = %asset, timeframe = %timeframe, error = %e, "Failed to fetch series");
                self.release(&asset, timeframe, None).await;
                return;
            }
        };

        let Some(current) = series.current() else {
            warn!(asset = %asset, timeframe = %timeframe, "Venue returned an empty series");
            self.release(&asset, timeframe, None).await;
            return;
        };
        let next = timeframe.next_open(current.open_time, current.close_time) + refresh_slack();
        debug!(
            asset = %asset,
            candles = series.len(),
            next_refresh = %next,
            "Fetched series"
        );

        tokio::select! {
            biased;
            _ = cancelled(&mut shutdown) => {
                debug!(asset = %asset, "Dropping series on shutdown");
            }
            sent = sender.send(series) => {
                if sent.is_err() {
                    warn!(asset = %asset, timeframe = %timeframe, "Series consumer is gone");
                }
            }
        }
        self.release(&asset, timeframe, Some(next)).await;
    }

    async fn release(&self, asset: &AssetPair, timeframe: Timeframe, next: Option<DateTime<Utc>>) {
        let mut state = self.state.lock().await;
        if let Some(registration) = state.registrations.get_mut(&(asset.clone(), timeframe)) {
            registration.in_flight = false;
            if let Some(next) = next {
                registration.next_refresh = next;
            }
        }
    }

    /// Tick loop. Returns once cancellation is observed and every in-flight
    /// refresh has finished.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tasks = JoinSet::new();
        info!(venue = self.venue.name(), "Refresh scheduler running");

        loop {
            tokio::select! {
                biased;
                _ = cancelled(&mut shutdown) => break,
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Refresh task failed");
                    }
                }
                _ = ticker.tick() => {
                    if !is_cancelled(&shutdown) {
                        self.dispatch_due(Utc::now(), &mut tasks, &shutdown).await;
                    }
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Refresh task failed");
            }
        }
        info!("Refresh scheduler stopped");
    }
}
