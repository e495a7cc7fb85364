pub mod ema_sma;
pub mod indicators;
pub mod runtime;
pub mod traits;
