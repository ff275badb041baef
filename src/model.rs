use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;

use crate::error::Error;

/// Statuses (compared case-insensitively) that mark a task as finished.
pub const COMPLETION_STATUSES: [&str; 2] = ["done", "completed"];

pub fn is_completion_status(status: &str) -> bool {
    COMPLETION_STATUSES
        .iter()
        .any(|s| s.eq_ignore_ascii_case(status))
}

/// How a task's points are attributed to the people working on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    /// One exclusive assignee (`tasks.assigned_to`) earns the full points.
    Single,
    /// Points are split evenly across `task_assignees`.
    Shared,
    /// Split evenly like `Shared`; the order of assignees carries no weight.
    Sequential,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Single => "SINGLE",
            TaskType::Shared => "SHARED",
            TaskType::Sequential => "SEQUENTIAL",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SINGLE" => Ok(TaskType::Single),
            "SHARED" => Ok(TaskType::Shared),
            "SEQUENTIAL" => Ok(TaskType::Sequential),
            _ => Err(Error::InvalidTaskType(s.to_string())),
        }
    }
}

impl ToSql for TaskType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TaskType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: Error| FromSqlError::Other(Box::new(e)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Employee {
    pub id: String,
    pub organization_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Project {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub is_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub status: String,
    pub points: i64,
    pub task_type: TaskType,
    pub assigned_to: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_status_case_insensitive() {
        assert!(is_completion_status("done"));
        assert!(is_completion_status("DONE"));
        assert!(is_completion_status("Completed"));
        assert!(!is_completion_status(" done "));
        assert!(!is_completion_status("in progress"));
        assert!(!is_completion_status("done-ish"));
    }

    #[test]
    fn test_task_type_parse() {
        assert_eq!("shared".parse::<TaskType>().unwrap(), TaskType::Shared);
        assert_eq!("SEQUENTIAL".parse::<TaskType>().unwrap(), TaskType::Sequential);
        assert!(matches!(
            "pair".parse::<TaskType>(),
            Err(Error::InvalidTaskType(_))
        ));
    }

    #[test]
    fn test_task_type_serializes_upper() {
        assert_eq!(
            serde_json::to_string(&TaskType::Sequential).unwrap(),
            "\"SEQUENTIAL\""
        );
    }
}
