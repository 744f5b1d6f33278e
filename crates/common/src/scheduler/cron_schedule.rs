use crate::scheduler::SchedulerError;
use chrono::{DateTime, Utc};
use std::str::FromStr;

/// A validated cron recurrence.
///
/// Accepts the 6/7-field form with a leading seconds field as well as the
/// classic 5-field form, which fires at second zero.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: cron::Schedule,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self, SchedulerError> {
        let trimmed = expression.trim();
        let field_count = trimmed.split_whitespace().count();
        if !(5..=7).contains(&field_count) {
            return Err(SchedulerError::InvalidCron {
                expression: expression.to_string(),
                reason: format!("expected 5 to 7 fields, got {field_count}"),
            });
        }

        let normalized = if field_count == 5 {
            format!("0 {trimmed}")
        } else {
            trimmed.to_string()
        };

        let schedule =
            cron::Schedule::from_str(&normalized).map_err(|e| SchedulerError::InvalidCron {
                expression: expression.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    /// The expression as originally supplied
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`
    pub fn next_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(after).next()
    }
}

impl FromStr for CronSchedule {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
