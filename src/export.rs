// CSV export

use crate::filter::Scope;
use crate::task::Task;
use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use eyre::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CSV_HEADER: &str = "Title,Description,Due Time,Filter,Status,Created,Completed,Deleted";

/// Render tasks as a CSV document, one row per task, in the given order
///
/// Title and description are always quoted with embedded quotes doubled;
/// line breaks in the description become single spaces. The remaining
/// columns are written bare, empty when absent.
pub fn to_csv<'a, I>(tasks: I) -> String
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut lines = vec![CSV_HEADER.to_string()];
    lines.extend(tasks.into_iter().map(csv_row));
    lines.join("\n")
}

fn csv_row(task: &Task) -> String {
    [
        quote(&task.title),
        quote(&collapse_newlines(&task.description)),
        task.due_time.clone().unwrap_or_default(),
        task.filter.to_string(),
        task.status.to_string(),
        timestamp(Some(task.created_at)),
        timestamp(task.completed_at),
        timestamp(task.deleted_at),
    ]
    .join(",")
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn collapse_newlines(value: &str) -> String {
    value.replace("\r\n", " ").replace('\n', " ")
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

/// Date stamped into export file names: the UTC calendar date of `now`
pub fn export_date<Tz: TimeZone>(now: &DateTime<Tz>) -> NaiveDate {
    now.with_timezone(&Utc).date_naive()
}

/// `momentum-<scope>-<YYYY-MM-DD>.csv`
pub fn export_file_name(scope: Scope, date: NaiveDate) -> String {
    format!("momentum-{}-{}.csv", scope, date.format("%Y-%m-%d"))
}

/// Write the CSV for `tasks` into `dir`, returning the file's path
pub fn write_csv<'a, I>(dir: &Path, scope: Scope, date: NaiveDate, tasks: I) -> Result<PathBuf>
where
    I: IntoIterator<Item = &'a Task>,
{
    fs::create_dir_all(dir).context("Failed to create export directory")?;

    let path = dir.join(export_file_name(scope, date));
    let csv = to_csv(tasks);
    fs::write(&path, &csv).with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), %scope, "Exported tasks");
    Ok(path)
}
