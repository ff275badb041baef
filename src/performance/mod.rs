pub mod types;

pub use types::*;

use rusqlite::Connection;

use crate::error::Result;
use crate::query::builder::{count_column, ReportParams, ReportQuery};
use crate::query::cte::{DAILY_STATS, PROJECT_STATS, RANKED_PERFORMERS, WEEKLY_STATS};
use crate::storage::Pool;

/// Weekly points for every employee of the organization.
pub async fn weekly_performance(pool: &Pool, params: &ReportParams) -> Result<Vec<WeeklyPerformance>> {
    let params = params.clone();
    pool.transaction(move |tx| Ok(query_weekly(tx, &params)?))
        .await
}

/// Yesterday's points and task counts for every employee of the organization.
pub async fn daily_performance(pool: &Pool, params: &ReportParams) -> Result<Vec<DailyPerformance>> {
    let params = params.clone();
    pool.transaction(move |tx| Ok(query_daily(tx, &params)?))
        .await
}

/// Point totals for every non-archived project of the organization.
pub async fn project_performance(
    pool: &Pool,
    params: &ReportParams,
) -> Result<Vec<ProjectPerformance>> {
    let params = params.clone();
    pool.transaction(move |tx| Ok(query_projects(tx, &params)?))
        .await
}

/// Ranked contributors for each of the organization's projects, optionally
/// keeping only the first `limit` per project.
pub async fn top_performers(
    pool: &Pool,
    params: &ReportParams,
    limit: Option<u32>,
) -> Result<Vec<TopPerformer>> {
    let params = params.clone();
    pool.transaction(move |tx| Ok(query_top_performers(tx, &params, limit)?))
        .await
}

// ── SQL ────────────────────────────────────────────────────────────

pub fn query_weekly(
    conn: &Connection,
    params: &ReportParams,
) -> std::result::Result<Vec<WeeklyPerformance>, rusqlite::Error> {
    ReportQuery::new()
        .with(WEEKLY_STATS)
        .select("SELECT employee_id, weekly_points FROM weekly_stats ORDER BY employee_id")
        .query(conn, params, |row| {
            Ok(WeeklyPerformance {
                employee_id: row.get(0)?,
                weekly_points: row.get(1)?,
            })
        })
}

pub fn query_daily(
    conn: &Connection,
    params: &ReportParams,
) -> std::result::Result<Vec<DailyPerformance>, rusqlite::Error> {
    ReportQuery::new()
        .with(DAILY_STATS)
        .select(
            "SELECT employee_id, yesterday_points, yesterday_task_count
             FROM daily_stats ORDER BY employee_id",
        )
        .query(conn, params, |row| {
            Ok(DailyPerformance {
                employee_id: row.get(0)?,
                yesterday_points: row.get(1)?,
                yesterday_task_count: count_column(row, 2)?,
            })
        })
}

pub fn query_projects(
    conn: &Connection,
    params: &ReportParams,
) -> std::result::Result<Vec<ProjectPerformance>, rusqlite::Error> {
    ReportQuery::new()
        .with(PROJECT_STATS)
        .select(
            "SELECT project_id, total_points, yesterday_points
             FROM project_stats ORDER BY project_id",
        )
        .query(conn, params, |row| {
            Ok(ProjectPerformance {
                project_id: row.get(0)?,
                total_points: row.get(1)?,
                yesterday_points: row.get(2)?,
            })
        })
}

pub fn query_top_performers(
    conn: &Connection,
    params: &ReportParams,
    limit: Option<u32>,
) -> std::result::Result<Vec<TopPerformer>, rusqlite::Error> {
    // The ranking covers every project in the store; scope it here.
    let base = "SELECT rp.project_id, rp.employee_id, rp.first_name, rp.last_name,
                       rp.points, rp.performer_rank
                FROM ranked_performers rp
                JOIN projects p ON p.id = rp.project_id
                WHERE p.organization_id = :org_id";
    let order = "ORDER BY rp.project_id, rp.performer_rank";

    let mut query = ReportQuery::new().with(RANKED_PERFORMERS);
    query = match limit {
        Some(n) => query
            .select(&format!("{base} AND rp.performer_rank <= :top_n {order}"))
            .param(":top_n", i64::from(n)),
        None => query.select(&format!("{base} {order}")),
    };
    query.query(conn, params, |row| {
        Ok(TopPerformer {
            project_id: row.get(0)?,
            employee_id: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            points: row.get(4)?,
            rank: row.get(5)?,
        })
    })
}
