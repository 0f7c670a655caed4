//! Trading session clock: timezone conversion and minute indexing.
//!
//! Maps arbitrary timestamps onto a canonical (trading date, minute index)
//! axis under one fixed regular session (09:30-16:00 by default). Minute
//! indices are 1-based; the opening minute is index 1.

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::types::MinuteIndex;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Converts timestamps into session-local time and minute indices.
///
/// Pure with respect to its inputs; all calendar parameters are fixed at
/// construction.
#[derive(Debug, Clone)]
pub struct SessionClock {
    tz: Tz,
    open: NaiveTime,
    close: NaiveTime,
    minutes_per_session: u32,
}

impl SessionClock {
    /// Create a clock from session configuration.
    ///
    /// Fails with a configuration error if the timezone is unknown, the
    /// open/close wall times are malformed, or the close does not follow
    /// the open.
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let tz: Tz = config
            .timezone
            .parse()
            .map_err(|_| Error::config(format!("unknown timezone: {}", config.timezone)))?;

        let open = NaiveTime::from_hms_opt(config.open_hour, config.open_minute, 0)
            .ok_or_else(|| Error::config("invalid session open time"))?;
        let close = NaiveTime::from_hms_opt(config.close_hour, config.close_minute, 0)
            .ok_or_else(|| Error::config("invalid session close time"))?;

        if close <= open {
            return Err(Error::config("session close must follow session open"));
        }
        if config.minutes_per_session == 0 {
            return Err(Error::config("session length must be positive"));
        }

        Ok(Self {
            tz,
            open,
            close,
            minutes_per_session: config.minutes_per_session,
        })
    }

    /// Session length in minutes.
    #[inline]
    pub fn minutes_per_session(&self) -> u32 {
        self.minutes_per_session
    }

    /// Session open wall time.
    #[inline]
    pub fn open(&self) -> NaiveTime {
        self.open
    }

    /// Session close wall time.
    #[inline]
    pub fn close(&self) -> NaiveTime {
        self.close
    }

    /// Interpret a naive timestamp as UTC and convert it to session-local
    /// wall time.
    pub fn to_session_time(&self, naive_utc: NaiveDateTime) -> NaiveDateTime {
        Utc.from_utc_datetime(&naive_utc)
            .with_timezone(&self.tz)
            .naive_local()
    }

    /// Current calendar date in the session timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    /// Compute the 1-based minute index for a session-local timestamp.
    ///
    /// The index counts whole elapsed minutes since the session open, plus
    /// one: 09:30 maps to 1, 09:31 to 2, 15:59 to 390. A stamp at exactly
    /// the close wall time belongs to the final session minute, so 16:00
    /// also maps to 390.
    ///
    /// Fails with `OutOfSession` when the time of day precedes the open,
    /// exceeds the close, or the computed index falls outside the session.
    pub fn minute_index(&self, local: NaiveDateTime) -> Result<MinuteIndex> {
        let tod = local.time();
        if tod < self.open || tod > self.close {
            return Err(Error::out_of_session(format!(
                "{} outside session {}-{}",
                tod, self.open, self.close
            )));
        }

        if tod == self.close {
            return Ok(self.minutes_per_session);
        }

        let elapsed = tod.signed_duration_since(self.open).num_minutes();
        let index = elapsed as MinuteIndex + 1;
        if index > self.minutes_per_session {
            return Err(Error::out_of_session(format!(
                "minute index {} exceeds session length {}",
                index, self.minutes_per_session
            )));
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> SessionClock {
        SessionClock::new(&SessionConfig::default()).unwrap()
    }

    fn local(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_minute_index_open_is_one() {
        assert_eq!(clock().minute_index(local(9, 30, 0)).unwrap(), 1);
        assert_eq!(clock().minute_index(local(9, 31, 0)).unwrap(), 2);
    }

    #[test]
    fn test_minute_index_truncates_seconds() {
        // Seconds within a minute do not advance the index
        assert_eq!(clock().minute_index(local(9, 30, 59)).unwrap(), 1);
        assert_eq!(clock().minute_index(local(10, 0, 30)).unwrap(), 31);
    }

    #[test]
    fn test_minute_index_close_boundary() {
        assert_eq!(clock().minute_index(local(15, 59, 0)).unwrap(), 390);
        // The close stamp folds into the final session minute
        assert_eq!(clock().minute_index(local(16, 0, 0)).unwrap(), 390);
    }

    #[test]
    fn test_minute_index_rejects_out_of_session() {
        assert!(matches!(
            clock().minute_index(local(9, 29, 59)),
            Err(Error::OutOfSession(_))
        ));
        assert!(matches!(
            clock().minute_index(local(16, 0, 1)),
            Err(Error::OutOfSession(_))
        ));
        assert!(matches!(
            clock().minute_index(local(0, 0, 0)),
            Err(Error::OutOfSession(_))
        ));
    }

    #[test]
    fn test_to_session_time_standard_time() {
        // January: US/Eastern is UTC-5
        let utc = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        let et = clock().to_session_time(utc);
        assert_eq!(et, local(9, 30, 0));
    }

    #[test]
    fn test_to_session_time_daylight_saving() {
        // July: US/Eastern is UTC-4
        let utc = NaiveDate::from_ymd_opt(2024, 7, 10)
            .unwrap()
            .and_hms_opt(13, 30, 0)
            .unwrap();
        let et = clock().to_session_time(utc);
        assert_eq!(et.time(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
    }

    #[test]
    fn test_utc_to_index_round_trip() {
        // 18:45 UTC in January is 13:45 ET -> 255 elapsed minutes -> index 256
        let utc = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(18, 45, 0)
            .unwrap();
        let c = clock();
        let idx = c.minute_index(c.to_session_time(utc)).unwrap();
        assert_eq!(idx, 256);
    }

    #[test]
    fn test_rejects_bad_config() {
        let mut config = SessionConfig::default();
        config.timezone = "Mars/Olympus".to_string();
        assert!(matches!(SessionClock::new(&config), Err(Error::Config(_))));

        let mut config = SessionConfig::default();
        config.close_hour = 9;
        config.close_minute = 0;
        assert!(matches!(SessionClock::new(&config), Err(Error::Config(_))));
    }
}
