use chrono::DateTime;
use chrono::Duration;
use chrono::FixedOffset;
use chrono::Local;
use chrono::Utc;
use std::fmt;
use std::sync::Mutex;
use std::sync::PoisonError;

pub trait Clock: Send + Sync + fmt::Debug {
    /// Current wall-clock time in the local offset.
    fn now(&self) -> DateTime<FixedOffset>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Calendar-day equality in the offset of `now`. Deliberately not a 24h TTL:
/// 23:59 and 00:01 the next morning are different days.
pub fn is_same_calendar_day(loaded_at: DateTime<Utc>, now: DateTime<FixedOffset>) -> bool {
    loaded_at.with_timezone(now.offset()).date_naive() == now.date_naive()
}

/// `YYYY-MM-DD HH:MM:SS`, the collector's timestamp format.
pub fn format_stamp(now: DateTime<FixedOffset>) -> String {
    now.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_date(now: DateTime<FixedOffset>) -> String {
    now.format("%Y-%m-%d").to_string()
}
