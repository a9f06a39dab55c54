// Achievements: completed tasks over a time window

use crate::task::{Task, TaskStatus};
use chrono::{DateTime, Datelike, Months, TimeZone};
use eyre::{Result, eyre};
use std::str::FromStr;

/// Window over `completedAt`, evaluated in the time zone of `now`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    /// The current calendar month
    #[default]
    Month,
    /// The current calendar year
    Year,
    /// The last two years up to now
    History,
}

impl Period {
    pub fn as_str(self) -> &'static str {
        match self {
            Period::Month => "month",
            Period::Year => "year",
            Period::History => "history",
        }
    }

    fn contains<Tz: TimeZone>(self, completed: &DateTime<Tz>, now: &DateTime<Tz>) -> bool {
        match self {
            Period::Month => completed.year() == now.year() && completed.month() == now.month(),
            Period::Year => completed.year() == now.year(),
            Period::History => {
                let start = now.clone().checked_sub_months(Months::new(24));
                start.is_none_or(|start| *completed >= start) && completed <= now
            }
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Period {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            "history" => Ok(Period::History),
            other => Err(eyre!("Unknown period: {} (expected month, year or history)", other)),
        }
    }
}

/// Completed tasks whose `completedAt` falls in `period`, newest first
pub fn achievements<'a, I, Tz>(tasks: I, period: Period, now: &DateTime<Tz>) -> Vec<&'a Task>
where
    I: IntoIterator<Item = &'a Task>,
    Tz: TimeZone,
{
    let mut matched: Vec<&Task> = tasks
        .into_iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .filter(|t| {
            t.completed_at
                .map(|c| period.contains(&c.with_timezone(&now.timezone()), now))
                .unwrap_or(false)
        })
        .collect();

    matched.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    matched
}

/// Split tasks into consecutive runs sharing a `completedAt` month
///
/// Headings read like `June 2024`, in the time zone `tz`. Input order is
/// kept, so newest-first input gives newest month first.
pub fn group_by_month<'a, Tz>(tasks: &[&'a Task], tz: &Tz) -> Vec<(String, Vec<&'a Task>)>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut groups: Vec<(String, Vec<&Task>)> = Vec::new();

    for &task in tasks {
        let Some(completed) = task.completed_at else {
            continue;
        };
        let heading = completed.with_timezone(tz).format("%B %Y").to_string();

        match groups.last_mut() {
            Some((last, members)) if *last == heading => members.push(task),
            _ => groups.push((heading, vec![task])),
        }
    }

    groups
}
