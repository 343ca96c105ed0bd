use chrono::NaiveDate;
use sqlx::MySqlExecutor;

/// Resolved `LIMIT`/`OFFSET` window for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub per_page: u32,
    pub offset: u64,
}

impl PageWindow {
    pub const DEFAULT_PER_PAGE: u32 = 20;
    pub const MAX_PER_PAGE: u32 = 100;

    /// Page starts at 1; `per_page` is clamped to `1..=MAX_PER_PAGE`.
    /// The offset is computed in 64 bits so any `u32` page is representable.
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page
            .unwrap_or(Self::DEFAULT_PER_PAGE)
            .clamp(1, Self::MAX_PER_PAGE);
        let offset = u64::from(page - 1) * u64::from(per_page);

        Self { page, per_page, offset }
    }
}

/// SQL bindable value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    U8(u8),
    F64(f64),
    Date(NaiveDate),
}

/// Partial UPDATE builder. Column names are `&'static str` so they can only
/// come from code, never from the request body.
#[derive(Debug)]
pub struct SqlUpdate {
    table: &'static str,
    assignments: Vec<(&'static str, SqlValue)>,
}

impl SqlUpdate {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            assignments: Vec::new(),
        }
    }

    pub fn set(&mut self, column: &'static str, value: SqlValue) -> &mut Self {
        self.assignments.push((column, value));
        self
    }

    /// Sets `column` only when a value was supplied
    pub fn set_opt<T: Into<SqlValue>>(&mut self, column: &'static str, value: Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.set(column, v.into());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn sql(&self, id_column: &str) -> String {
        let set_clause = self
            .assignments
            .iter()
            .map(|(column, _)| format!("{} = ?", column))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "UPDATE {} SET {} WHERE {} = ?",
            self.table, set_clause, id_column
        )
    }

    /// Runs the update against the row whose `id_column` equals `id`.
    /// Returns the number of rows matched. An empty update touches nothing.
    pub async fn execute<'e, E: MySqlExecutor<'e>>(
        &self,
        executor: E,
        id_column: &str,
        id: u64,
    ) -> Result<u64, sqlx::Error> {
        if self.is_empty() {
            return Ok(0);
        }

        let sql = self.sql(id_column);
        let mut query = sqlx::query(&sql);

        for (_, value) in &self.assignments {
            query = match value.clone() {
                SqlValue::String(v) => query.bind(v),
                SqlValue::U64(v) => query.bind(v),
                SqlValue::U8(v) => query.bind(v),
                SqlValue::F64(v) => query.bind(v),
                SqlValue::Date(v) => query.bind(v),
            };
        }

        let result = query.bind(id).execute(executor).await?;
        Ok(result.rows_affected())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::String(v)
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        SqlValue::U64(v)
    }
}

impl From<u8> for SqlValue {
    fn from(v: u8) -> Self {
        SqlValue::U8(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}
