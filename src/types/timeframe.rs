// src/types/timeframe.rs
use crate::error::ConfigError;
use chrono::{DateTime, Duration, Months, Utc};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeframeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl TimeframeUnit {
    pub fn symbol(&self) -> char {
        match self {
            TimeframeUnit::Second => 's',
            TimeframeUnit::Minute => 'm',
            TimeframeUnit::Hour => 'h',
            TimeframeUnit::Day => 'd',
            TimeframeUnit::Week => 'w',
            TimeframeUnit::Month => 'M',
        }
    }

    fn from_symbol(c: char) -> Option<Self> {
        match c {
            's' => Some(TimeframeUnit::Second),
            'm' => Some(TimeframeUnit::Minute),
            'h' => Some(TimeframeUnit::Hour),
            'd' => Some(TimeframeUnit::Day),
            'w' => Some(TimeframeUnit::Week),
            'M' => Some(TimeframeUnit::Month),
            _ => None,
        }
    }
}

/// Candle interval, e.g. `4h`. The magnitude is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timeframe {
    magnitude: u32,
    unit: TimeframeUnit,
}

impl Timeframe {
    pub fn new(magnitude: u32, unit: TimeframeUnit) -> Result<Self, ConfigError> {
        if magnitude == 0 {
            return Err(ConfigError::InvalidTimeframe(format!("0{}", unit.symbol())));
        }
        Ok(Self { magnitude, unit })
    }

    pub fn magnitude(&self) -> u32 {
        self.magnitude
    }

    pub fn unit(&self) -> TimeframeUnit {
        self.unit
    }

    /// Open time of the candle following the one spanning `current_open..current_close`.
    ///
    /// Months are calendar months. Falls back to `current_close` if the result
    /// is not representable.
    pub fn next_open(
        &self,
        current_open: DateTime<Utc>,
        current_close: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let n = i64::from(self.magnitude);
        let next = match self.unit {
            TimeframeUnit::Second => current_open.checked_add_signed(Duration::seconds(n)),
            TimeframeUnit::Minute => current_open.checked_add_signed(Duration::minutes(n)),
            TimeframeUnit::Hour => current_open.checked_add_signed(Duration::hours(n)),
            TimeframeUnit::Day => current_open.checked_add_signed(Duration::days(n)),
            TimeframeUnit::Week => current_open.checked_add_signed(Duration::weeks(n)),
            TimeframeUnit::Month => current_open.checked_add_months(Months::new(self.magnitude)),
        };
        next.unwrap_or(current_close)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit.symbol())
    }
}

impl FromStr for Timeframe {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidTimeframe(s.to_string());
        let s = s.trim();
        let unit_char = s.chars().last().ok_or_else(invalid)?;
        let unit = TimeframeUnit::from_symbol(unit_char).ok_or_else(invalid)?;
        let magnitude = s[..s.len() - unit_char.len_utf8()]
            .parse::<u32>()
            .map_err(|_| invalid())?;
        Timeframe::new(magnitude, unit).map_err(|_| invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_and_displays() {
        let tf: Timeframe = "4h".parse().unwrap();
        assert_eq!(tf.magnitude(), 4);
        assert_eq!(tf.unit(), TimeframeUnit::Hour);
        assert_eq!(tf.to_string(), "4h");

        assert_eq!("1M".parse::<Timeframe>().unwrap().unit(), TimeframeUnit::Month);
        assert_eq!("15m".parse::<Timeframe>().unwrap().unit(), TimeframeUnit::Minute);

        assert!("0h".parse::<Timeframe>().is_err());
        assert!("4x".parse::<Timeframe>().is_err());
        assert!("h".parse::<Timeframe>().is_err());
        assert!("".parse::<Timeframe>().is_err());
    }

    #[test]
    fn next_open_per_unit() {
        let open = Utc.with_ymd_and_hms(2024, 1, 31, 8, 0, 0).unwrap();
        let close = open + Duration::hours(4) - Duration::milliseconds(1);

        let tf: Timeframe = "4h".parse().unwrap();
        assert_eq!(tf.next_open(open, close), open + Duration::hours(4));

        let tf: Timeframe = "15m".parse().unwrap();
        assert_eq!(tf.next_open(open, close), open + Duration::minutes(15));

        let tf: Timeframe = "3d".parse().unwrap();
        assert_eq!(tf.next_open(open, close), open + Duration::days(3));

        let tf: Timeframe = "1M".parse().unwrap();
        assert_eq!(
            tf.next_open(open, close),
            Utc.with_ymd_and_hms(2024, 2, 29, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn next_open_is_strictly_after_open() {
        let units = [
            TimeframeUnit::Second,
            TimeframeUnit::Minute,
            TimeframeUnit::Hour,
            TimeframeUnit::Day,
            TimeframeUnit::Week,
            TimeframeUnit::Month,
        ];
        let opens = [
            DateTime::<Utc>::UNIX_EPOCH,
            Utc.with_ymd_and_hms(2021, 12, 31, 23, 59, 59).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap(),
        ];
        for unit in units {
            for magnitude in [1, 2, 3, 7, 12, 30] {
                let tf = Timeframe::new(magnitude, unit).unwrap();
                for open in opens {
                    assert!(tf.next_open(open, open) > open, "{tf} from {open}");
                }
            }
        }
    }
}
