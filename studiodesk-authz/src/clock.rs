//! Injected time source for time-window checks

use chrono::{DateTime, FixedOffset, TimeZone, Timelike, Utc};
use std::sync::Arc;

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Hour of day (0-23) at the given UTC offset
    fn hour_at(&self, offset: FixedOffset) -> u32 {
        self.now().with_timezone(&offset).hour()
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    instant: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self { instant }
    }

    /// Clock reading `hour:00` UTC on an arbitrary fixed date
    pub fn at_hour(hour: u32) -> Self {
        let instant = Utc
            .with_ymd_and_hms(2024, 6, 3, hour.min(23), 0, 0)
            .single()
            .unwrap_or_default();
        Self::new(instant)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
