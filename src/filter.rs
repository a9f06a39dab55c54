// Scheduling buckets and list selections

use crate::task::{Task, TaskStatus};
use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Scheduling bucket an active task lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    Tomorrow,
    Later,
}

impl Filter {
    pub fn as_str(self) -> &'static str {
        match self {
            Filter::Tomorrow => "tomorrow",
            Filter::Later => "later",
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Filter {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tomorrow" => Ok(Filter::Tomorrow),
            "later" => Ok(Filter::Later),
            other => Err(eyre!("Unknown filter: {} (expected tomorrow or later)", other)),
        }
    }
}

/// Selection of tasks used by exports and listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Tomorrow,
    Later,
    Completed,
    Deleted,
}

impl Scope {
    pub const ALL: [Scope; 5] = [
        Scope::All,
        Scope::Tomorrow,
        Scope::Later,
        Scope::Completed,
        Scope::Deleted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::All => "all",
            Scope::Tomorrow => "tomorrow",
            Scope::Later => "later",
            Scope::Completed => "completed",
            Scope::Deleted => "deleted",
        }
    }

    /// Whether a task belongs to this selection
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Scope::All => true,
            Scope::Tomorrow => task.is_active_in(Filter::Tomorrow),
            Scope::Later => task.is_active_in(Filter::Later),
            Scope::Completed => task.status == TaskStatus::Completed,
            Scope::Deleted => task.status == TaskStatus::Deleted,
        }
    }
}

impl From<Filter> for Scope {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Tomorrow => Scope::Tomorrow,
            Filter::Later => Scope::Later,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Scope {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Scope::ALL
            .into_iter()
            .find(|scope| scope.as_str() == wanted)
            .ok_or_else(|| eyre!("Unknown scope: {} (expected all, tomorrow, later, completed or deleted)", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_round_trips_through_str() {
        assert_eq!("tomorrow".parse::<Filter>().unwrap(), Filter::Tomorrow);
        assert_eq!("Later".parse::<Filter>().unwrap(), Filter::Later);
        assert!("someday".parse::<Filter>().is_err());
        assert_eq!(Filter::Later.to_string(), "later");
    }

    #[test]
    fn test_filter_default_is_tomorrow() {
        assert_eq!(Filter::default(), Filter::Tomorrow);
    }

    #[test]
    fn test_filter_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Filter::Tomorrow).unwrap(), "\"tomorrow\"");
        let parsed: Filter = serde_json::from_str("\"later\"").unwrap();
        assert_eq!(parsed, Filter::Later);
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!("all".parse::<Scope>().unwrap(), Scope::All);
        assert_eq!("COMPLETED".parse::<Scope>().unwrap(), Scope::Completed);
        assert!("archived".parse::<Scope>().is_err());
        assert_eq!(Scope::from(Filter::Later), Scope::Later);
    }

    #[test]
    fn test_scope_matches() {
        let mut task = Task::new("t", "", None, Filter::Later, chrono::Utc::now());
        assert!(Scope::All.matches(&task));
        assert!(Scope::Later.matches(&task));
        assert!(!Scope::Tomorrow.matches(&task));
        assert!(!Scope::Completed.matches(&task));

        task.status = TaskStatus::Deleted;
        assert!(Scope::Deleted.matches(&task));
        assert!(!Scope::Later.matches(&task));
    }
}
