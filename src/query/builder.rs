use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, Row};

use super::cte::Cte;
use crate::date_util::to_sql_timestamp;

pub const ORG_PARAM: &str = ":org_id";
pub const NOW_PARAM: &str = ":now";

/// Inputs shared by every report query.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportParams {
    pub organization_id: String,
    /// Instant the windows are measured from. "Yesterday" is the UTC calendar
    /// day before this instant's date.
    pub as_of: DateTime<Utc>,
}

impl ReportParams {
    pub fn new(organization_id: impl Into<String>, as_of: DateTime<Utc>) -> Self {
        Self {
            organization_id: organization_id.into(),
            as_of,
        }
    }

    pub fn now(organization_id: impl Into<String>) -> Self {
        Self::new(organization_id, Utc::now())
    }
}

/// Composes [`Cte`] fragments into one `WITH ... SELECT` statement.
///
/// Dependencies are pulled in ahead of the fragments that read them, and each
/// fragment appears once however many times it is requested.
#[derive(Debug, Clone, Default)]
pub struct ReportQuery {
    ctes: Vec<Cte>,
    select: Option<String>,
    extra: Vec<(&'static str, Value)>,
}

impl ReportQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, cte: Cte) -> Self {
        self.push(cte);
        self
    }

    /// Final statement. Defaults to `SELECT * FROM <last fragment>`.
    pub fn select(mut self, sql: &str) -> Self {
        self.select = Some(sql.to_string());
        self
    }

    /// Bind an additional named parameter used by the final statement.
    pub fn param(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.extra.push((name, value.into()));
        self
    }

    pub fn cte_names(&self) -> Vec<&'static str> {
        self.ctes.iter().map(|c| c.name).collect()
    }

    fn push(&mut self, cte: Cte) {
        if self.ctes.iter().any(|c| c.name == cte.name) {
            return;
        }
        for dep in cte.depends_on {
            self.push(*dep);
        }
        self.ctes.push(cte);
    }

    pub fn build_sql(&self) -> String {
        let mut sql = String::new();
        if !self.ctes.is_empty() {
            let parts: Vec<String> = self
                .ctes
                .iter()
                .map(|c| format!("{} AS (\n{}\n)", c.name, c.body))
                .collect();
            sql.push_str("WITH ");
            sql.push_str(&parts.join(",\n"));
            sql.push('\n');
        }
        match (&self.select, self.ctes.last()) {
            (Some(select), _) => sql.push_str(select),
            (None, Some(last)) => sql.push_str(&format!("SELECT * FROM {}", last.name)),
            (None, None) => {}
        }
        sql
    }

    /// Prepare, bind and run the statement, mapping every row through `map`.
    ///
    /// Only the parameters the statement actually mentions are bound.
    pub fn query<T, F>(
        &self,
        conn: &Connection,
        params: &ReportParams,
        mut map: F,
    ) -> Result<Vec<T>, rusqlite::Error>
    where
        F: FnMut(&Row<'_>) -> Result<T, rusqlite::Error>,
    {
        let sql = self.build_sql();
        log::debug!("Running report query over [{}]", self.cte_names().join(", "));

        let mut stmt = conn.prepare(&sql)?;
        if let Some(idx) = stmt.parameter_index(ORG_PARAM)? {
            stmt.raw_bind_parameter(idx, &params.organization_id)?;
        }
        if let Some(idx) = stmt.parameter_index(NOW_PARAM)? {
            stmt.raw_bind_parameter(idx, to_sql_timestamp(params.as_of))?;
        }
        for (name, value) in &self.extra {
            match stmt.parameter_index(name)? {
                Some(idx) => stmt.raw_bind_parameter(idx, value)?,
                None => return Err(rusqlite::Error::InvalidParameterName(name.to_string())),
            }
        }

        let mut out = Vec::new();
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next()? {
            out.push(map(row)?);
        }
        Ok(out)
    }
}

/// Read a `COUNT(...)` column as `u64`, rejecting negative values.
pub(crate) fn count_column(row: &Row<'_>, idx: usize) -> Result<u64, rusqlite::Error> {
    let n: i64 = row.get(idx)?;
    u64::try_from(n).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, n))
}
