// src/core/engine.rs
use crate::config::{AppConfig, TradeConfig};
use crate::core::executor::{Execution, OrderExecutor};
use crate::core::scheduler::RefreshScheduler;
use crate::error::ExecutionError;
use crate::registry::Registries;
use crate::strategies::runtime;
use crate::types::Signal;
use crate::utils::shutdown::{cancel_on_termination, cancelled};
use anyhow::{Context, Result};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Wires one venue, one strategy and one notifier into the
/// scheduler → strategy → executor pipeline and runs it until cancelled.
pub struct TradingEngine {
    settings: AppConfig,
    registries: Registries,
}

impl TradingEngine {
    pub fn new(settings: AppConfig, registries: Registries) -> Self {
        Self {
            settings,
            registries,
        }
    }

    pub async fn run(self) -> Result<()> {
        let settings = &self.settings;
        info!("Engine starting...");

        // Configuration problems abort here, before any task is spawned.
        let asset = settings.asset.pair();
        let timeframe = settings.asset.timeframe().context("invalid asset timeframe")?;
        let trade = TradeConfig::try_from(&settings.trade).context("invalid trade settings")?;

        let venue = self
            .registries
            .venues
            .resolve(&settings.exchange.name, &settings.exchange.args)
            .with_context(|| format!("cannot create venue driver '{}'", settings.exchange.name))?;

        let scheduler = Arc::new(RefreshScheduler::new(venue.clone()));
        let series_rx = scheduler.register(asset.clone(), timeframe).await?;

        let strategy = self
            .registries
            .strategies
            .resolve(&settings.strategy.name, &settings.strategy.args)
            .with_context(|| format!("cannot create strategy '{}'", settings.strategy.name))?;
        let mut strategy_config: Vec<_> = strategy.config().into_iter().collect();
        strategy_config.sort();
        info!(
            strategy = strategy.name(),
            mode = ?strategy.mode(),
            config = ?strategy_config,
            "Strategy configured"
        );

        let notifier = self
            .registries
            .notifiers
            .resolve(&settings.notifier.name, &settings.notifier.args)
            .with_context(|| format!("cannot create notifier '{}'", settings.notifier.name))?;

        match venue.get_account_info().await {
            Ok(account) => {
                let c = &account.commissions;
                info!(
                    venue = venue.name(),
                    maker = %c.maker,
                    taker = %c.taker,
                    buyer = %c.buyer,
                    seller = %c.seller,
                    "Account commissions"
                );
                for balance in account
                    .balances
                    .iter()
                    .filter(|b| !b.free.is_zero() || !b.locked.is_zero())
                {
                    info!(
                        asset = %balance.asset,
                        free = %balance.free,
                        locked = %balance.locked,
                        "Balance"
                    );
                }
            }
            Err(e) => warn!(venue = venue.name(), error = %e, "Failed to fetch account info"),
        }

        info!(
            asset = %asset,
            timeframe = %timeframe,
            paper = trade.paper,
            "Engine loop running"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (signal_tx, signal_rx) = mpsc::channel(1);

        let termination = tokio::spawn(cancel_on_termination(shutdown_tx.clone()));
        let mut tasks = JoinSet::new();
        tasks.spawn(scheduler.run(shutdown_rx.clone()));
        tasks.spawn(runtime::run(
            strategy,
            series_rx,
            signal_tx,
            shutdown_rx.clone(),
        ));

        let executor = OrderExecutor::new(venue, notifier, trade);
        let outcome = AssertUnwindSafe(signal_loop(executor, signal_rx, shutdown_rx))
            .catch_unwind()
            .await;
        if let Err(panic) = outcome {
            error!(panic = %panic_message(&panic), "Engine loop panicked, shutting down");
        }

        let _ = shutdown_tx.send(true);
        termination.abort();
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Engine task failed");
            }
        }

        info!("Engine stopped");
        Ok(())
    }
}

/// Feeds signals to `executor` one at a time, in arrival order, until
/// cancellation or until the strategy side goes away.
pub async fn signal_loop(
    mut executor: OrderExecutor,
    mut signals: mpsc::Receiver<Signal>,
    mut shutdown: watch::Receiver<bool>,
) -> OrderExecutor {
    loop {
        tokio::select! {
            biased;
            _ = cancelled(&mut shutdown) => {
                info!("Engine loop cancelled");
                break;
            }
            received = signals.recv() => match received {
                Some(signal) => handle_signal(&mut executor, &signal).await,
                None => {
                    warn!("Signal stream closed");
                    break;
                }
            },
        }
    }
    executor
}

async fn handle_signal(executor: &mut OrderExecutor, signal: &Signal) {
    info!(signal = %signal, "Signal received");
    match executor.execute(signal).await {
        Ok(Execution::Opened { quantity, price }) => {
            info!(asset = %signal.asset, quantity = %quantity, price = %price, "Position opened")
        }
        Ok(Execution::Closed {
            quantity,
            confirmed,
        }) => info!(
            asset = %signal.asset,
            quantity = %quantity,
            confirmed,
            "Position closed"
        ),
        Ok(Execution::Ignored) | Ok(Execution::Backtest) => {}
        Err(e @ ExecutionError::InsufficientFunds { .. }) => {
            warn!(asset = %signal.asset, error = %e, "Buy skipped")
        }
        Err(e) => error!(asset = %signal.asset, side = %signal.side, error = %e, "Execution failed"),
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AssetSettings, LogSettings, PluginSettings, TradeSettings};
    use crate::connectors::traits::VenueDriver;
    use crate::error::ConfigError;
    use crate::registry::PluginArgs;
    use crate::strategies::traits::{Decision, EvaluationMode, Strategy};
    use crate::testing::{btc_usdt, MockVenue, RecordingNotifier};
    use crate::types::{Series, Side};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn paper_executor(venue: Arc<MockVenue>, notifier: Arc<RecordingNotifier>) -> OrderExecutor {
        let config = TradeConfig::new("pct", dec!(0.5), true, true, None).unwrap();
        OrderExecutor::new(venue, notifier, config)
    }

    #[tokio::test]
    async fn signals_are_executed_in_order() {
        let venue = Arc::new(MockVenue::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let (tx, rx) = mpsc::channel(1);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(signal_loop(
            paper_executor(venue.clone(), notifier.clone()),
            rx,
            shutdown_rx,
        ));
        for side in [Side::Buy, Side::Buy, Side::Sell, Side::Buy] {
            tx.send(Signal::live("test", btc_usdt(), side)).await.unwrap();
        }
        drop(tx);

        let executor = handle.await.unwrap();
        assert!(executor.position(&btc_usdt()).is_some());
        let messages = notifier.messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].contains("BUY"));
        assert!(messages[1].contains("SELL"));
        assert!(messages[2].contains("BUY"));
    }

    #[tokio::test]
    async fn errors_do_not_stop_the_loop() {
        let venue = Arc::new(MockVenue::new());
        venue.state().book.asks.clear();
        let notifier = Arc::new(RecordingNotifier::default());
        let (tx, rx) = mpsc::channel(1);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(signal_loop(
            paper_executor(venue.clone(), notifier),
            rx,
            shutdown_rx,
        ));
        tx.send(Signal::live("test", btc_usdt(), Side::Buy)).await.unwrap();
        tx.send(Signal::live("test", btc_usdt(), Side::Buy)).await.unwrap();
        drop(tx);

        let executor = handle.await.unwrap();
        assert_eq!(executor.open_positions(), 0);
        assert_eq!(venue.count("get_order_book"), 2);
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop() {
        let venue = Arc::new(MockVenue::new());
        let (_tx, rx) = mpsc::channel::<Signal>(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(signal_loop(
            paper_executor(venue, Arc::new(RecordingNotifier::default())),
            rx,
            shutdown_rx,
        ));
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    fn settings(strategy: &str) -> AppConfig {
        AppConfig {
            asset: AssetSettings::default(),
            exchange: PluginSettings {
                name: "mock".into(),
                args: PluginArgs::new(),
            },
            strategy: PluginSettings {
                name: strategy.into(),
                args: PluginArgs::new(),
            },
            notifier: PluginSettings {
                name: "noop".into(),
                args: PluginArgs::new(),
            },
            trade: TradeSettings::default(),
            log: LogSettings::default(),
        }
    }

    fn registries(venue: Arc<MockVenue>) -> Registries {
        let mut registries = Registries::with_builtin();
        registries
            .venues
            .register("mock", move |_| Ok(venue.clone() as Arc<dyn VenueDriver>));
        registries
    }

    #[tokio::test]
    async fn unknown_strategy_aborts_before_start() {
        let venue = Arc::new(MockVenue::new());
        let engine = TradingEngine::new(settings("Nope"), registries(venue.clone()));
        let err = engine.run().await.unwrap_err();
        assert!(err.to_string().contains("Nope"));
        assert_eq!(venue.count("get_series"), 0);
        assert_eq!(venue.count("get_account_info"), 0);
    }

    #[tokio::test]
    async fn invalid_trade_settings_abort_before_start() {
        let venue = Arc::new(MockVenue::new());
        let mut settings = settings("Ema/Sma");
        settings.trade.volume_type = "everything".into();
        let engine = TradingEngine::new(settings, registries(venue.clone()));
        assert!(engine.run().await.is_err());
        assert!(venue.calls().is_empty());
    }

    struct AlwaysBuy;

    impl Strategy for AlwaysBuy {
        fn name(&self) -> &str {
            "AlwaysBuy"
        }

        fn configure(&mut self, _args: &PluginArgs) -> Result<(), ConfigError> {
            Ok(())
        }

        fn default_config(&self) -> PluginArgs {
            PluginArgs::new()
        }

        fn config(&self) -> PluginArgs {
            PluginArgs::new()
        }

        fn mode(&self) -> EvaluationMode {
            EvaluationMode::Live
        }

        fn min_samples(&self) -> usize {
            2
        }

        fn decide(&self, _closed: &Series) -> Decision {
            Decision {
                buy: true,
                sell: false,
            }
        }
    }

    #[tokio::test]
    async fn executor_panic_cancels_and_joins_every_task() {
        let venue = Arc::new(MockVenue::new());
        venue.state().panic_on_book = true;
        let mut registries = registries(venue.clone());
        registries
            .strategies
            .register("AlwaysBuy", |_| Ok(Box::new(AlwaysBuy) as Box<dyn Strategy>));

        let engine = TradingEngine::new(settings("AlwaysBuy"), registries);
        tokio::time::timeout(Duration::from_secs(10), engine.run())
            .await
            .expect("engine did not stop after the panic")
            .unwrap();
        assert_eq!(venue.count("get_order_book"), 1);
        assert_eq!(venue.count("place_order"), 0);
    }

    #[test]
    fn panic_payloads_are_readable() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&payload), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&payload), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&payload), "unknown panic");
    }
}
