use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::date_util::{parse_timestamp, to_sql_timestamp};
use crate::model::{is_completion_status, Employee, Organization, Project, Task};

// ── Organizations ──────────────────────────────────────────────────

pub fn upsert_organization(conn: &Connection, org: &Organization) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO organizations (id, name) VALUES (?1, ?2)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        params![org.id, org.name],
    )?;
    Ok(())
}

// ── Employees ──────────────────────────────────────────────────────

pub fn upsert_employee(conn: &Connection, employee: &Employee) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO employees (id, organization_id, first_name, last_name, email)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
           organization_id = excluded.organization_id,
           first_name = excluded.first_name,
           last_name = excluded.last_name,
           email = COALESCE(excluded.email, employees.email)",
        params![
            employee.id,
            employee.organization_id,
            employee.first_name,
            employee.last_name,
            employee.email
        ],
    )?;
    Ok(())
}

pub fn list_employees(
    conn: &Connection,
    organization_id: &str,
) -> Result<Vec<Employee>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, organization_id, first_name, last_name, email
         FROM employees WHERE organization_id = ?1 ORDER BY last_name, first_name, id",
    )?;
    let rows = stmt.query_map([organization_id], |row| {
        Ok(Employee {
            id: row.get(0)?,
            organization_id: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            email: row.get(4)?,
        })
    })?;
    rows.collect()
}

// ── Projects ───────────────────────────────────────────────────────

pub fn upsert_project(conn: &Connection, project: &Project) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO projects (id, organization_id, name, is_archived)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
           organization_id = excluded.organization_id,
           name = excluded.name,
           is_archived = excluded.is_archived",
        params![
            project.id,
            project.organization_id,
            project.name,
            project.is_archived as i32
        ],
    )?;
    Ok(())
}

/// Returns false when no such project exists.
pub fn set_project_archived(
    conn: &Connection,
    project_id: &str,
    archived: bool,
) -> Result<bool, rusqlite::Error> {
    let n = conn.execute(
        "UPDATE projects SET is_archived = ?2 WHERE id = ?1",
        params![project_id, archived as i32],
    )?;
    Ok(n > 0)
}

// ── Tasks ──────────────────────────────────────────────────────────

pub fn insert_task(conn: &Connection, task: &Task) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO tasks (id, project_id, title, status, points, task_type, assigned_to,
                            completed_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            task.id,
            task.project_id,
            task.title,
            task.status,
            task.points,
            task.task_type,
            task.assigned_to,
            task.completed_at.map(to_sql_timestamp),
            to_sql_timestamp(task.created_at),
            to_sql_timestamp(task.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_task(conn: &Connection, task_id: &str) -> Result<Option<Task>, rusqlite::Error> {
    conn.query_row(
        "SELECT id, project_id, title, status, points, task_type, assigned_to,
                completed_at, created_at, updated_at
         FROM tasks WHERE id = ?1",
        [task_id],
        |row| {
            Ok(Task {
                id: row.get(0)?,
                project_id: row.get(1)?,
                title: row.get(2)?,
                status: row.get(3)?,
                points: row.get(4)?,
                task_type: row.get(5)?,
                assigned_to: row.get(6)?,
                completed_at: row
                    .get::<_, Option<String>>(7)?
                    .map(|s| timestamp_from(7, &s))
                    .transpose()?,
                created_at: timestamp_column(row, 8)?,
                updated_at: timestamp_column(row, 9)?,
            })
        },
    )
    .optional()
}

/// Change a task's status at `at`.
///
/// `updated_at` always moves to `at`. Entering a completion status stamps
/// `completed_at` unless it is already set; leaving one clears it.
/// Returns false when no such task exists.
pub fn set_task_status(
    conn: &Connection,
    task_id: &str,
    status: &str,
    at: DateTime<Utc>,
) -> Result<bool, rusqlite::Error> {
    let n = conn.execute(
        "UPDATE tasks SET
           status = ?2,
           updated_at = ?3,
           completed_at = CASE WHEN ?4 THEN COALESCE(completed_at, ?3) ELSE NULL END
         WHERE id = ?1",
        params![
            task_id,
            status,
            to_sql_timestamp(at),
            is_completion_status(status)
        ],
    )?;
    Ok(n > 0)
}

/// Replace the co-assignee set of a task in one transaction.
pub fn set_task_assignees(
    conn: &mut Connection,
    task_id: &str,
    employee_ids: &[&str],
) -> Result<(), rusqlite::Error> {
    let tx = conn.transaction()?;
    replace_task_assignees(&tx, task_id, employee_ids)?;
    tx.commit()
}

/// Same as [`set_task_assignees`] for callers already inside a transaction.
pub fn replace_task_assignees(
    conn: &Connection,
    task_id: &str,
    employee_ids: &[&str],
) -> Result<(), rusqlite::Error> {
    conn.execute("DELETE FROM task_assignees WHERE task_id = ?1", [task_id])?;
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO task_assignees (task_id, employee_id) VALUES (?1, ?2)",
    )?;
    for employee_id in employee_ids {
        stmt.execute(params![task_id, employee_id])?;
    }
    Ok(())
}

pub fn list_task_assignees(
    conn: &Connection,
    task_id: &str,
) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT employee_id FROM task_assignees WHERE task_id = ?1 ORDER BY employee_id",
    )?;
    let rows = stmt.query_map([task_id], |row| row.get(0))?;
    rows.collect()
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    let s: String = row.get(idx)?;
    timestamp_from(idx, &s)
}

fn timestamp_from(idx: usize, s: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    parse_timestamp(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ── Status ─────────────────────────────────────────────────────────

/// Row counts for the main tables, in display order.
pub fn table_counts(conn: &Connection) -> Result<Vec<(&'static str, i64)>, rusqlite::Error> {
    let mut counts = Vec::new();
    for (label, table) in [
        ("Organizations", "organizations"),
        ("Employees", "employees"),
        ("Projects", "projects"),
        ("Tasks", "tasks"),
        ("Assignees", "task_assignees"),
    ] {
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })?;
        counts.push((label, n));
    }
    Ok(counts)
}

// ── Config ─────────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO app_config (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::model::TaskType;

    fn conn() -> Connection {
        migrated_conn()
    }

    #[test]
    fn test_employee_upsert_keeps_email() {
        let conn = conn();
        org(&conn, "o1");
        upsert_employee(
            &conn,
            &Employee {
                id: "e1".into(),
                organization_id: "o1".into(),
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: Some("ada@example.com".into()),
            },
        )
        .unwrap();
        employee(&conn, "o1", "e1", "Ada", "King");

        let list = list_employees(&conn, "o1").unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].last_name, "King");
        assert_eq!(list[0].email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_employee_requires_existing_org() {
        let conn = conn();
        let err = upsert_employee(
            &conn,
            &Employee {
                id: "e1".into(),
                organization_id: "missing".into(),
                first_name: "A".into(),
                last_name: "B".into(),
                email: None,
            },
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_task_roundtrip() {
        let conn = conn();
        org(&conn, "o1");
        employee(&conn, "o1", "e1", "Ada", "Lovelace");
        project(&conn, "o1", "p1", false);
        TaskSpec::single("t1", "p1", "e1", 8)
            .done_at("2025-03-10 09:30:00")
            .insert(&conn);

        let task = get_task(&conn, "t1").unwrap().unwrap();
        assert_eq!(task.points, 8);
        assert_eq!(task.task_type, TaskType::Single);
        assert_eq!(task.assigned_to.as_deref(), Some("e1"));
        assert_eq!(task.completed_at, Some(at("2025-03-10 09:30:00")));
        assert!(get_task(&conn, "nope").unwrap().is_none());
    }

    #[test]
    fn test_set_task_status_stamps_and_clears_completion() {
        let conn = conn();
        org(&conn, "o1");
        employee(&conn, "o1", "e1", "Ada", "Lovelace");
        project(&conn, "o1", "p1", false);
        TaskSpec::single("t1", "p1", "e1", 5).insert(&conn);

        assert!(set_task_status(&conn, "t1", "Done", at("2025-03-10 10:00:00")).unwrap());
        let task = get_task(&conn, "t1").unwrap().unwrap();
        assert_eq!(task.completed_at, Some(at("2025-03-10 10:00:00")));

        // Touching a finished task keeps the original completion time.
        assert!(set_task_status(&conn, "t1", "completed", at("2025-03-11 10:00:00")).unwrap());
        let task = get_task(&conn, "t1").unwrap().unwrap();
        assert_eq!(task.completed_at, Some(at("2025-03-10 10:00:00")));
        assert_eq!(task.updated_at, at("2025-03-11 10:00:00"));

        assert!(set_task_status(&conn, "t1", "in progress", at("2025-03-12 10:00:00")).unwrap());
        let task = get_task(&conn, "t1").unwrap().unwrap();
        assert_eq!(task.completed_at, None);

        assert!(!set_task_status(&conn, "missing", "done", at("2025-03-12 10:00:00")).unwrap());
    }

    #[test]
    fn test_set_task_assignees_replaces_set() {
        let mut conn = conn();
        org(&conn, "o1");
        for id in ["e1", "e2", "e3"] {
            employee(&conn, "o1", id, "F", id);
        }
        project(&conn, "o1", "p1", false);
        TaskSpec::split("t1", "p1", TaskType::Shared, &["e1", "e2"], 20).insert(&conn);
        assert_eq!(list_task_assignees(&conn, "t1").unwrap(), vec!["e1", "e2"]);

        set_task_assignees(&mut conn, "t1", &["e2", "e3", "e3"]).unwrap();
        assert_eq!(list_task_assignees(&conn, "t1").unwrap(), vec!["e2", "e3"]);
    }

    #[test]
    fn test_archive_project() {
        let conn = conn();
        org(&conn, "o1");
        project(&conn, "o1", "p1", false);
        assert!(set_project_archived(&conn, "p1", true).unwrap());
        assert!(!set_project_archived(&conn, "p2", true).unwrap());
        let archived: i64 = conn
            .query_row("SELECT is_archived FROM projects WHERE id = 'p1'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(archived, 1);
    }

    #[test]
    fn test_config_roundtrip() {
        let conn = conn();
        assert_eq!(get_config(&conn, "organization_id").unwrap(), None);
        set_config(&conn, "organization_id", "o1").unwrap();
        set_config(&conn, "organization_id", "o2").unwrap();
        set_config(&conn, "a", "1").unwrap();
        assert_eq!(
            get_config(&conn, "organization_id").unwrap().as_deref(),
            Some("o2")
        );
        assert_eq!(
            list_config(&conn).unwrap(),
            vec![
                ("a".to_string(), "1".to_string()),
                ("organization_id".to_string(), "o2".to_string())
            ]
        );
    }

    #[test]
    fn test_table_counts() {
        let conn = conn();
        org(&conn, "o1");
        employee(&conn, "o1", "e1", "Ada", "Lovelace");
        let counts = table_counts(&conn).unwrap();
        assert_eq!(counts[0], ("Organizations", 1));
        assert_eq!(counts[1], ("Employees", 1));
        assert_eq!(counts[3], ("Tasks", 0));
    }
}
