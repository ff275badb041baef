//! Dashboard reports built by joining several aggregation fragments in a
//! single statement.

use rusqlite::Connection;
use serde::Serialize;

use crate::error::Result;
use crate::query::builder::{count_column, ReportParams, ReportQuery};
use crate::query::cte::{DAILY_STATS, PROJECT_STATS, RANKED_PERFORMERS, WEEKLY_STATS};
use crate::storage::Pool;

/// One line of the employee leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub position: u32,
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub weekly_points: f64,
    pub yesterday_points: f64,
    pub yesterday_task_count: u64,
}

/// Highest-ranked contributor of a project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectLeader {
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub points: i64,
}

/// One line of the project board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectBoardEntry {
    pub project_id: String,
    pub project_name: String,
    pub total_points: i64,
    pub yesterday_points: i64,
    pub leader: Option<ProjectLeader>,
}

pub async fn leaderboard(pool: &Pool, params: &ReportParams) -> Result<Vec<LeaderboardEntry>> {
    let params = params.clone();
    pool.transaction(move |tx| Ok(query_leaderboard(tx, &params)?))
        .await
}

pub async fn project_board(pool: &Pool, params: &ReportParams) -> Result<Vec<ProjectBoardEntry>> {
    let params = params.clone();
    pool.transaction(move |tx| Ok(query_project_board(tx, &params)?))
        .await
}

/// Weekly and daily stats side by side, best week first.
pub fn query_leaderboard(
    conn: &Connection,
    params: &ReportParams,
) -> std::result::Result<Vec<LeaderboardEntry>, rusqlite::Error> {
    ReportQuery::new()
        .with(WEEKLY_STATS)
        .with(DAILY_STATS)
        .select(
            "SELECT ROW_NUMBER() OVER (ORDER BY ws.weekly_points DESC, e.id ASC) AS position,
                    e.id, e.first_name, e.last_name,
                    ws.weekly_points, ds.yesterday_points, ds.yesterday_task_count
             FROM weekly_stats ws
             JOIN daily_stats ds ON ds.employee_id = ws.employee_id
             JOIN employees e ON e.id = ws.employee_id
             ORDER BY position",
        )
        .query(conn, params, |row| {
            Ok(LeaderboardEntry {
                position: row.get(0)?,
                employee_id: row.get(1)?,
                first_name: row.get(2)?,
                last_name: row.get(3)?,
                weekly_points: row.get(4)?,
                yesterday_points: row.get(5)?,
                yesterday_task_count: count_column(row, 6)?,
            })
        })
}

/// Project totals with each project's rank-1 performer, largest pool first.
pub fn query_project_board(
    conn: &Connection,
    params: &ReportParams,
) -> std::result::Result<Vec<ProjectBoardEntry>, rusqlite::Error> {
    ReportQuery::new()
        .with(PROJECT_STATS)
        .with(RANKED_PERFORMERS)
        .select(
            "SELECT p.id, p.name, ps.total_points, ps.yesterday_points,
                    rp.employee_id, rp.first_name, rp.last_name, rp.points
             FROM project_stats ps
             JOIN projects p ON p.id = ps.project_id
             LEFT JOIN ranked_performers rp
                    ON rp.project_id = ps.project_id AND rp.performer_rank = 1
             ORDER BY ps.total_points DESC, p.id ASC",
        )
        .query(conn, params, |row| {
            let leader = match row.get::<_, Option<String>>(4)? {
                Some(employee_id) => Some(ProjectLeader {
                    employee_id,
                    first_name: row.get(5)?,
                    last_name: row.get(6)?,
                    points: row.get(7)?,
                }),
                None => None,
            };
            Ok(ProjectBoardEntry {
                project_id: row.get(0)?,
                project_name: row.get(1)?,
                total_points: row.get(2)?,
                yesterday_points: row.get(3)?,
                leader,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskType;
    use crate::storage::repository::fixtures::*;

    fn params() -> ReportParams {
        ReportParams::new("o1", at("2025-03-12 15:00:00"))
    }

    fn seeded() -> Connection {
        let conn = migrated_conn();
        org(&conn, "o1");
        employee(&conn, "o1", "e1", "Ada", "Lovelace");
        employee(&conn, "o1", "e2", "Grace", "Hopper");
        employee(&conn, "o1", "e3", "Edsger", "Dijkstra");
        project(&conn, "o1", "p1", false);
        project(&conn, "o1", "p2", false);
        project(&conn, "o1", "old", true);
        conn
    }

    #[test]
    fn test_leaderboard_orders_by_weekly_points() {
        let conn = seeded();
        TaskSpec::single("t1", "p1", "e2", 10)
            .done_at("2025-03-11 10:00:00")
            .insert(&conn);
        TaskSpec::split("t2", "p1", TaskType::Shared, &["e1", "e2"], 8)
            .done_at("2025-03-09 10:00:00")
            .insert(&conn);

        let board = query_leaderboard(&conn, &params()).unwrap();
        let order: Vec<_> = board
            .iter()
            .map(|e| (e.position, e.employee_id.as_str()))
            .collect();
        // e3 and e1 trail; e1 has 4 points, e3 none.
        assert_eq!(order, vec![(1, "e2"), (2, "e1"), (3, "e3")]);

        assert_eq!(board[0].weekly_points, 14.0);
        assert_eq!(board[0].yesterday_points, 10.0);
        assert_eq!(board[0].yesterday_task_count, 1);
        assert_eq!(board[1].weekly_points, 4.0);
        assert_eq!(board[1].yesterday_task_count, 0);
        assert_eq!(board[2].first_name, "Edsger");
    }

    #[test]
    fn test_leaderboard_ties_fall_back_to_employee_id() {
        let conn = seeded();
        let board = query_leaderboard(&conn, &params()).unwrap();
        let ids: Vec<_> = board.iter().map(|e| e.employee_id.as_str()).collect();
        assert_eq!(ids, vec!["e1", "e2", "e3"]);
    }

    #[test]
    fn test_project_board_attaches_leader() {
        let conn = seeded();
        TaskSpec::single("t1", "p1", "e1", 5)
            .done_at("2025-03-11 10:00:00")
            .insert(&conn);
        TaskSpec::single("t2", "p1", "e3", 7)
            .done_at("2025-03-01 10:00:00")
            .insert(&conn);
        TaskSpec::single("t3", "p2", "e2", 40).insert(&conn);
        TaskSpec::single("t4", "old", "e2", 1000)
            .done_at("2025-03-11 10:00:00")
            .insert(&conn);

        let board = query_project_board(&conn, &params()).unwrap();
        let ids: Vec<_> = board.iter().map(|e| e.project_id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p1"]);

        // p2 has points but nothing completed yet.
        assert_eq!(board[0].total_points, 40);
        assert_eq!(board[0].leader, None);

        assert_eq!(board[1].project_name, "Project p1");
        assert_eq!(board[1].total_points, 12);
        assert_eq!(board[1].yesterday_points, 5);
        let leader = board[1].leader.as_ref().unwrap();
        assert_eq!(leader.employee_id, "e3");
        assert_eq!(leader.points, 7);
    }

    #[tokio::test]
    async fn test_reports_through_pool() {
        let pool = Pool::open_memory().await.unwrap();
        pool.transaction(|tx| {
            org(tx, "o1");
            employee(tx, "o1", "e1", "Ada", "Lovelace");
            project(tx, "o1", "p1", false);
            TaskSpec::single("t1", "p1", "e1", 3)
                .done_at("2025-03-11 10:00:00")
                .insert(tx);
            Ok(())
        })
        .await
        .unwrap();

        let board = leaderboard(&pool, &params()).await.unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].weekly_points, 3.0);

        let projects = project_board(&pool, &params()).await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].leader.as_ref().map(|l| l.points), Some(3));
    }
}
