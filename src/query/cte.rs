//! Named sub-queries the performance reports are assembled from.
//!
//! Every fragment reads caller input only through the named parameters
//! `:org_id` and `:now` (see [`super::builder::ReportParams`]); nothing is
//! spliced into the SQL text at run time.
//!
//! Points for SHARED and SEQUENTIAL tasks are split evenly across the rows in
//! `task_assignees`. A split task with no such rows falls back to its
//! `assigned_to` employee with a divisor of 1.

/// A named `WITH` fragment plus the fragments it reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cte {
    pub name: &'static str,
    pub body: &'static str,
    pub depends_on: &'static [Cte],
}

/// `(task_id, assignee_count)` for every task with co-assignees.
pub const ASSIGNEE_COUNTS: Cte = Cte {
    name: "assignee_counts",
    body: "SELECT task_id, COUNT(*) AS assignee_count
           FROM task_assignees
           GROUP BY task_id",
    depends_on: &[],
};

/// `(task_id, employee_id, credit)`: the share of a task's points owed to
/// each linked employee, regardless of status or dates.
pub const TASK_CREDITS: Cte = Cte {
    name: "task_credits",
    body: "SELECT t.id AS task_id,
                  t.assigned_to AS employee_id,
                  CASE WHEN t.task_type IN ('SHARED', 'SEQUENTIAL')
                       THEN CAST(t.points AS REAL) / MAX(1, COALESCE(ac.assignee_count, 0))
                       ELSE CAST(t.points AS REAL)
                  END AS credit
           FROM tasks t
           LEFT JOIN assignee_counts ac ON ac.task_id = t.id
           WHERE t.assigned_to IS NOT NULL
             AND (t.task_type NOT IN ('SHARED', 'SEQUENTIAL') OR ac.task_id IS NULL)
           UNION ALL
           SELECT ta.task_id,
                  ta.employee_id,
                  CAST(t.points AS REAL) / MAX(1, ac.assignee_count)
           FROM task_assignees ta
           JOIN tasks t ON t.id = ta.task_id
           JOIN assignee_counts ac ON ac.task_id = ta.task_id
           WHERE t.task_type IN ('SHARED', 'SEQUENTIAL')",
    depends_on: &[ASSIGNEE_COUNTS],
};

/// `(employee_id, weekly_points)` for every employee of `:org_id`, counting
/// tasks completed at or after `:now - 7 days` (rolling).
pub const WEEKLY_STATS: Cte = Cte {
    name: "weekly_stats",
    body: "SELECT e.id AS employee_id,
                  COALESCE(SUM(CASE
                      WHEN LOWER(t.status) IN ('done', 'completed')
                       AND t.completed_at >= datetime(:now, '-7 days')
                      THEN tc.credit
                  END), 0.0) AS weekly_points
           FROM employees e
           LEFT JOIN task_credits tc ON tc.employee_id = e.id
           LEFT JOIN tasks t ON t.id = tc.task_id
           WHERE e.organization_id = :org_id
           GROUP BY e.id",
    depends_on: &[TASK_CREDITS],
};

/// `(employee_id, yesterday_points, yesterday_task_count)` for every employee
/// of `:org_id`, counting tasks whose `completed_at` falls on the calendar day
/// before `:now`.
pub const DAILY_STATS: Cte = Cte {
    name: "daily_stats",
    body: "SELECT e.id AS employee_id,
                  COALESCE(SUM(CASE
                      WHEN LOWER(t.status) IN ('done', 'completed')
                       AND t.completed_at >= datetime(:now, 'start of day', '-1 day')
                       AND t.completed_at < datetime(:now, 'start of day')
                      THEN tc.credit
                  END), 0.0) AS yesterday_points,
                  COUNT(CASE
                      WHEN LOWER(t.status) IN ('done', 'completed')
                       AND t.completed_at >= datetime(:now, 'start of day', '-1 day')
                       AND t.completed_at < datetime(:now, 'start of day')
                      THEN 1
                  END) AS yesterday_task_count
           FROM employees e
           LEFT JOIN task_credits tc ON tc.employee_id = e.id
           LEFT JOIN tasks t ON t.id = tc.task_id
           WHERE e.organization_id = :org_id
           GROUP BY e.id",
    depends_on: &[TASK_CREDITS],
};

/// `(project_id, total_points, yesterday_points)` for every non-archived
/// project of `:org_id`.
///
/// Unlike [`DAILY_STATS`], "yesterday" here means the date of `updated_at`
/// equals the day before `:now`. Both definitions are in use by callers.
pub const PROJECT_STATS: Cte = Cte {
    name: "project_stats",
    body: "SELECT p.id AS project_id,
                  COALESCE(SUM(t.points), 0) AS total_points,
                  COALESCE(SUM(CASE
                      WHEN LOWER(t.status) IN ('done', 'completed')
                       AND date(t.updated_at) = date(:now, '-1 day')
                      THEN t.points
                  END), 0) AS yesterday_points
           FROM projects p
           LEFT JOIN tasks t ON t.project_id = p.id
           WHERE p.organization_id = :org_id
             AND p.is_archived = 0
           GROUP BY p.id",
    depends_on: &[],
};

/// `(project_id, employee_id, first_name, last_name, points)` over every
/// completed task in the store, attributed through `assigned_to`.
/// Not scoped to an organization.
pub const PROJECT_EMPLOYEE_POINTS: Cte = Cte {
    name: "project_employee_points",
    body: "SELECT t.project_id,
                  e.id AS employee_id,
                  e.first_name,
                  e.last_name,
                  SUM(t.points) AS points
           FROM tasks t
           JOIN employees e ON e.id = t.assigned_to
           WHERE LOWER(t.status) IN ('done', 'completed')
           GROUP BY t.project_id, e.id",
    depends_on: &[],
};

/// [`PROJECT_EMPLOYEE_POINTS`] plus `performer_rank`, a gap-free 1..N row
/// number per project ordered by points descending, then employee id.
pub const RANKED_PERFORMERS: Cte = Cte {
    name: "ranked_performers",
    body: "SELECT project_id,
                  employee_id,
                  first_name,
                  last_name,
                  points,
                  ROW_NUMBER() OVER (
                      PARTITION BY project_id
                      ORDER BY points DESC, employee_id ASC
                  ) AS performer_rank
           FROM project_employee_points",
    depends_on: &[PROJECT_EMPLOYEE_POINTS],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::COMPLETION_STATUSES;

    const ALL: [Cte; 7] = [
        ASSIGNEE_COUNTS,
        TASK_CREDITS,
        WEEKLY_STATS,
        DAILY_STATS,
        PROJECT_STATS,
        PROJECT_EMPLOYEE_POINTS,
        RANKED_PERFORMERS,
    ];

    #[test]
    fn test_completion_filter_matches_model() {
        let list = COMPLETION_STATUSES
            .iter()
            .map(|s| format!("'{s}'"))
            .collect::<Vec<_>>()
            .join(", ");
        let expected = format!("LOWER(t.status) IN ({list})");
        for cte in [WEEKLY_STATS, DAILY_STATS, PROJECT_STATS, PROJECT_EMPLOYEE_POINTS] {
            assert!(cte.body.contains(&expected), "{} filter drifted", cte.name);
        }
    }

    #[test]
    fn test_names_unique() {
        let mut names: Vec<_> = ALL.iter().map(|c| c.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ALL.len());
    }

    #[test]
    fn test_only_named_parameters() {
        for cte in ALL {
            assert!(!cte.body.contains('?'), "{} uses positional params", cte.name);
        }
    }
}
