//! Schedule specifications: `interval:<secs>` or a five-field cron expression.

use crate::config::CronTimezone;
use crate::error::{MonitorError, Result};
use chrono::{DateTime, Local, Utc};
use croner::Cron;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const INTERVAL_PREFIX: &str = "interval:";
const CRON_FIELDS: usize = 5;

/// A parsed site schedule.
#[derive(Debug)]
pub enum ScheduleSpec {
    /// Fire every period, first after one full period.
    Interval(Duration),
    /// Fire at each matching minute.
    Cron(CronSchedule),
}

/// Cron expression in minute / hour / day-of-month / month / day-of-week order.
pub struct CronSchedule {
    expr: String,
    cron: Cron,
}

impl CronSchedule {
    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// First occurrence strictly after `after`, with fields read in `tz`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Schedule`] if the expression never matches again.
    pub fn next_after(&self, after: DateTime<Utc>, tz: CronTimezone) -> Result<DateTime<Utc>> {
        let next = match tz {
            CronTimezone::Utc => self.cron.find_next_occurrence(&after, false),
            CronTimezone::Local => self
                .cron
                .find_next_occurrence(&after.with_timezone(&Local), false)
                .map(|t| t.with_timezone(&Utc)),
        };
        next.map_err(|e| {
            MonitorError::Schedule(format!("`{}` has no next run: {e}", self.expr))
        })
    }
}

impl fmt::Debug for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CronSchedule").field(&self.expr).finish()
    }
}

impl ScheduleSpec {
    /// Parse a schedule string.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Schedule`] for a zero or non-numeric interval,
    /// a cron expression without exactly five fields, or an invalid field.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if let Some(secs) = spec.strip_prefix(INTERVAL_PREFIX) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                MonitorError::Schedule(format!(
                    "`{spec}`: interval must be a whole number of seconds"
                ))
            })?;
            if secs == 0 {
                return Err(MonitorError::Schedule(format!(
                    "`{spec}`: interval must be greater than 0"
                )));
            }
            return Ok(Self::Interval(Duration::from_secs(secs)));
        }

        let fields: Vec<&str> = spec.split_whitespace().collect();
        if fields.len() != CRON_FIELDS {
            return Err(MonitorError::Schedule(format!(
                "`{spec}`: expected {CRON_FIELDS} cron fields \
                 (minute hour day-of-month month day-of-week), got {}",
                fields.len()
            )));
        }
        let expr = fields.join(" ");
        let cron = Cron::new(&expr)
            .parse()
            .map_err(|e| MonitorError::Schedule(format!("`{expr}`: {e}")))?;
        Ok(Self::Cron(CronSchedule { expr, cron }))
    }
}

impl FromStr for ScheduleSpec {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ScheduleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interval(period) => write!(f, "every {}s", period.as_secs()),
            Self::Cron(cron) => write!(f, "cron `{}`", cron.expr),
        }
    }
}
