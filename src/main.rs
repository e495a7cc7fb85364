use anyhow::Context;
use candle_trader::config::AppConfig;
use candle_trader::core::engine::TradingEngine;
use candle_trader::registry::Registries;
use candle_trader::utils::logging;
use dotenvy::dotenv;
use tracing::error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // 1. Load Configuration
    let settings = AppConfig::new().context("failed to load settings")?;
    let _log_guard = logging::init(&settings.log)?;

    println!("========================================");
    println!("       CANDLE TRADER - v{}", env!("CARGO_PKG_VERSION"));
    println!("========================================");
    println!(
        "Target: {} [{}]",
        settings.asset.pair(),
        settings.asset.timeframe
    );
    println!("Venue:    {}", settings.exchange.name);
    println!("Strategy: {}", settings.strategy.name);
    println!(
        "Mode:   {}",
        if settings.trade.paper {
            "📝 PAPER TRADING"
        } else {
            "🚨 LIVE TRADING"
        }
    );
    println!("========================================");

    // 2. Run Engine
    let engine = TradingEngine::new(settings, Registries::with_builtin());
    if let Err(e) = engine.run().await {
        error!(error = %format!("{e:#}"), "Fatal engine error");
        return Err(e);
    }

    Ok(())
}
