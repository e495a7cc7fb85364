// src/strategies/runtime.rs
//! Drives a [`Strategy`] over a stream of series and emits signals.
use crate::strategies::traits::{EvaluationMode, Strategy};
use crate::types::{Series, Side, Signal};
use crate::utils::shutdown::cancelled;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// All signals `strategy` produces for one received series, in emission order.
pub fn evaluate(strategy: &dyn Strategy, series: &Series) -> Vec<Signal> {
    match strategy.mode() {
        EvaluationMode::Live => check(strategy, series, false),
        EvaluationMode::Backtest => {
            let start = strategy.min_samples().max(2);
            (start..=series.len())
                .flat_map(|len| check(strategy, &series.sub_series(len), true))
                .collect()
        }
    }
}

/// One evaluation over `series` with its forming candle left out.
fn check(strategy: &dyn Strategy, series: &Series, backtest: bool) -> Vec<Signal> {
    if series.len() < strategy.min_samples().max(2) {
        return Vec::new();
    }
    let Some(current) = series.current() else {
        return Vec::new();
    };

    let closed = series.sub_series(series.len() - 1);
    let decision = strategy.decide(&closed);

    let make = |side: Side| {
        if backtest {
            Signal::backtest(strategy.name(), series.asset.clone(), side, current.open_time)
        } else {
            Signal::live(strategy.name(), series.asset.clone(), side)
        }
    };

    let mut signals = Vec::with_capacity(2);
    if decision.buy {
        signals.push(make(Side::Buy));
    }
    if decision.sell {
        signals.push(make(Side::Sell));
    }
    signals
}

/// Consumes series until cancelled or the input closes.
///
/// Each signal is handed off one at a time; a slow consumer stalls this loop
/// and, through it, the scheduler's publication for this pair.
pub async fn run(
    strategy: Box<dyn Strategy>,
    mut series_rx: mpsc::Receiver<Series>,
    signal_tx: mpsc::Sender<Signal>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(strategy = strategy.name(), mode = ?strategy.mode(), "Strategy loop running");

    loop {
        let series = tokio::select! {
            biased;
            _ = cancelled(&mut shutdown) => break,
            received = series_rx.recv() => match received {
                Some(series) => series,
                None => {
                    warn!(strategy = strategy.name(), "Series stream closed");
                    break;
                }
            },
        };

        debug!(
            strategy = strategy.name(),
            asset = %series.asset,
            candles = series.len(),
            "Received new data"
        );

        for signal in evaluate(strategy.as_ref(), &series) {
            debug!(signal = %signal, "Emitting signal");
            tokio::select! {
                biased;
                _ = cancelled(&mut shutdown) => {
                    info!(strategy = strategy.name(), "Strategy loop cancelled");
                    return;
                }
                sent = signal_tx.send(signal) => {
                    if sent.is_err() {
                        warn!(strategy = strategy.name(), "Signal consumer is gone");
                        return;
                    }
                }
            }
        }
    }

    info!(strategy = strategy.name(), "Strategy loop stopped");
}
