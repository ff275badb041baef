use serde::Serialize;

/// Points earned by one employee over the trailing seven days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyPerformance {
    pub employee_id: String,
    pub weekly_points: f64,
}

/// Points and completed tasks for one employee on the previous calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPerformance {
    pub employee_id: String,
    pub yesterday_points: f64,
    pub yesterday_task_count: u64,
}

/// Point totals for one non-archived project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectPerformance {
    pub project_id: String,
    /// Sum of every task's points, any status.
    pub total_points: i64,
    /// Completed tasks last updated on the previous calendar day.
    pub yesterday_points: i64,
}

/// One employee's position within a project's completed-points ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopPerformer {
    pub project_id: String,
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub points: i64,
    /// 1-based; unique within a project even when points tie.
    pub rank: u32,
}
