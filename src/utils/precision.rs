// src/utils/precision.rs
use rust_decimal::Decimal;

/// Округляет значение ВНИЗ до ближайшего кратного step.
/// Used for every order quantity so the venue never sees more than we hold.
/// Пример: amount=10.999, step=1.0 -> 10.0
pub fn floor_to_step(amount: Decimal, step: Decimal) -> Decimal {
    if step <= Decimal::ZERO {
        return amount;
    }
    ((amount / step).floor() * step).normalize()
}

/// Округляет цену до БЛИЖАЙШЕГО кратного tick_size.
/// Пример: price=100.16, tick=0.1 -> 100.2
pub fn round_to_step(price: Decimal, tick_size: Decimal) -> Decimal {
    if tick_size <= Decimal::ZERO {
        return price;
    }
    ((price / tick_size).round() * tick_size).normalize()
}
