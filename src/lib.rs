//! Candle-driven single-venue trading loop.
//!
//! A [`core::scheduler::RefreshScheduler`] pulls candle history once per
//! candle, a [`strategies::traits::Strategy`] turns it into signals and the
//! [`core::executor::OrderExecutor`] trades them, one open position per pair.
pub mod config;
pub mod connectors;
pub mod core;
pub mod error;
pub mod notifiers;
pub mod registry;
pub mod strategies;
pub mod types;
pub mod utils;

#[cfg(test)]
mod testing;
