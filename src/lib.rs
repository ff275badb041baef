pub mod date_util;
pub mod error;
pub mod model;
pub mod performance;
pub mod query;
pub mod report;
pub mod storage;

pub use error::{Error, Result};
pub use model::{Employee, Organization, Project, Task, TaskType};
pub use performance::{DailyPerformance, ProjectPerformance, TopPerformer, WeeklyPerformance};
pub use query::builder::{ReportParams, ReportQuery};
pub use report::{LeaderboardEntry, ProjectBoardEntry, ProjectLeader};
pub use storage::{Pool, PoolConfig};

use storage::repository;

/// Config key holding the organization reports default to.
pub const ORGANIZATION_KEY: &str = "organization_id";

/// Main entry point: performance reporting over a pooled task store.
#[derive(Clone)]
pub struct WorkPulse {
    pool: Pool,
}

impl WorkPulse {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Access the pool (for direct queries in the CLI).
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Use `explicit` if given, else the configured default organization.
    pub async fn resolve_organization(&self, explicit: Option<&str>) -> Result<String> {
        if let Some(id) = explicit {
            return Ok(id.to_string());
        }
        self.config_get(ORGANIZATION_KEY).await?.ok_or_else(|| {
            Error::Config(format!(
                "no organization given. Pass --org or run: workpulse config set {ORGANIZATION_KEY} <ID>"
            ))
        })
    }

    // ── Reports ────────────────────────────────────────────────────

    pub async fn weekly(&self, params: &ReportParams) -> Result<Vec<WeeklyPerformance>> {
        performance::weekly_performance(&self.pool, params).await
    }

    pub async fn daily(&self, params: &ReportParams) -> Result<Vec<DailyPerformance>> {
        performance::daily_performance(&self.pool, params).await
    }

    pub async fn projects(&self, params: &ReportParams) -> Result<Vec<ProjectPerformance>> {
        performance::project_performance(&self.pool, params).await
    }

    pub async fn top_performers(
        &self,
        params: &ReportParams,
        limit: Option<u32>,
    ) -> Result<Vec<TopPerformer>> {
        performance::top_performers(&self.pool, params, limit).await
    }

    pub async fn leaderboard(&self, params: &ReportParams) -> Result<Vec<LeaderboardEntry>> {
        report::leaderboard(&self.pool, params).await
    }

    pub async fn project_board(&self, params: &ReportParams) -> Result<Vec<ProjectBoardEntry>> {
        report::project_board(&self.pool, params).await
    }

    // ── Status ─────────────────────────────────────────────────────

    pub async fn table_counts(&self) -> Result<Vec<(&'static str, i64)>> {
        self.pool
            .transaction(|tx| Ok(repository::table_counts(tx)?))
            .await
    }

    // ── Config commands ────────────────────────────────────────────

    pub async fn config_get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.pool
            .transaction(move |tx| Ok(repository::get_config(tx, &key)?))
            .await
    }

    pub async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.pool
            .transaction(move |tx| Ok(repository::set_config(tx, &key, &value)?))
            .await
    }

    pub async fn config_list(&self) -> Result<Vec<(String, String)>> {
        self.pool
            .transaction(|tx| Ok(repository::list_config(tx)?))
            .await
    }
}
