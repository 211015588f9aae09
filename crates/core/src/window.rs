//! Time-bucket windows for aligning irregular event streams.
//!
//! Fixed-duration windows (hours, days) floor against the Unix epoch.
//! Calendar windows (weekly, monthly) floor against the civil date, which
//! keeps week and month boundaries correct across year boundaries and for
//! timestamps that do not fall on UTC midnight. The two flooring rules are
//! deliberately distinct; collapsing weeks into "7 days" drifts away from
//! calendar Mondays because the epoch was a Thursday.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};

use crate::error::PipelineError;

/// A bucketing window applied to article and price timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketWindow {
    /// Fixed width in whole seconds, epoch-aligned.
    Fixed(Duration),
    /// Calendar week beginning on the given weekday at 00:00 UTC.
    Weekly(Weekday),
    /// Calendar month beginning on the first at 00:00 UTC.
    Monthly,
}

impl BucketWindow {
    /// Floors a timestamp to the start of its bucket.
    #[must_use]
    pub fn floor(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Self::Fixed(width) => {
                let secs = width.num_seconds().max(1);
                let rem = ts.timestamp().rem_euclid(secs);
                let nanos = i64::from(ts.timestamp_subsec_nanos());
                ts - Duration::seconds(rem) - Duration::nanoseconds(nanos)
            }
            Self::Weekly(start) => {
                let date = ts.date_naive();
                let back = (i64::from(date.weekday().num_days_from_monday())
                    - i64::from(start.num_days_from_monday()))
                .rem_euclid(7);
                midnight(date - Duration::days(back))
            }
            Self::Monthly => {
                let date = ts.date_naive();
                let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
                    .expect("first of month is a valid date");
                midnight(first)
            }
        }
    }

    /// True for calendar-period windows (weekly, monthly).
    #[must_use]
    pub fn is_calendar(&self) -> bool {
        matches!(self, Self::Weekly(_) | Self::Monthly)
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

impl FromStr for BucketWindow {
    type Err = PipelineError;

    /// Parses window strings of the form `1h`, `4h`, `1d`, `3d`, `W`,
    /// `W-MON`..`W-SUN`, `M`, or `1M`. Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim();
        let upper = norm.to_ascii_uppercase();

        match upper.as_str() {
            "" => {
                return Err(PipelineError::InvalidConfig(
                    "bucket window must not be empty".to_string(),
                ))
            }
            "M" | "1M" => return Ok(Self::Monthly),
            "W" => return Ok(Self::Weekly(Weekday::Mon)),
            _ => {}
        }

        if let Some(day) = upper.strip_prefix("W-") {
            let weekday = match day {
                "MON" => Weekday::Mon,
                "TUE" => Weekday::Tue,
                "WED" => Weekday::Wed,
                "THU" => Weekday::Thu,
                "FRI" => Weekday::Fri,
                "SAT" => Weekday::Sat,
                "SUN" => Weekday::Sun,
                _ => {
                    return Err(PipelineError::InvalidConfig(format!(
                        "unrecognized week start in bucket window '{norm}'"
                    )))
                }
            };
            return Ok(Self::Weekly(weekday));
        }

        let split = norm
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(norm.len());
        let (count, unit) = norm.split_at(split);
        let n: i64 = count.parse().map_err(|_| {
            PipelineError::InvalidConfig(format!("unrecognized bucket window '{norm}'"))
        })?;
        if n < 1 {
            return Err(PipelineError::InvalidConfig(format!(
                "bucket window '{norm}' must cover at least one unit"
            )));
        }

        match unit.to_ascii_lowercase().as_str() {
            "h" => Ok(Self::Fixed(Duration::hours(n))),
            "d" => Ok(Self::Fixed(Duration::days(n))),
            _ => Err(PipelineError::InvalidConfig(format!(
                "unrecognized bucket window '{norm}' (expected h, d, W-XXX, or M)"
            ))),
        }
    }
}

impl fmt::Display for BucketWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Fixed(width) => {
                let secs = width.num_seconds();
                if secs % 86_400 == 0 {
                    write!(f, "{}d", secs / 86_400)
                } else if secs % 3_600 == 0 {
                    write!(f, "{}h", secs / 3_600)
                } else {
                    write!(f, "{secs}s")
                }
            }
            Self::Weekly(day) => {
                let code = match day {
                    Weekday::Mon => "MON",
                    Weekday::Tue => "TUE",
                    Weekday::Wed => "WED",
                    Weekday::Thu => "THU",
                    Weekday::Fri => "FRI",
                    Weekday::Sat => "SAT",
                    Weekday::Sun => "SUN",
                };
                write!(f, "W-{code}")
            }
            Self::Monthly => write!(f, "1M"),
        }
    }
}
