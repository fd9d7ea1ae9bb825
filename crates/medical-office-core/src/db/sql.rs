//! Small SELECT builder for the filtered list queries.

use rusqlite::types::Value;

/// `FROM ... WHERE ... ORDER BY ...` with positional parameters.
#[derive(Debug, Clone)]
pub(crate) struct SelectBuilder {
    from: String,
    conditions: Vec<String>,
    params: Vec<Value>,
    order_by: Vec<String>,
}

impl SelectBuilder {
    /// `from` is everything after `FROM`, joins included.
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            conditions: Vec::new(),
            params: Vec::new(),
            order_by: Vec::new(),
        }
    }

    /// AND a condition. Each `?` in `condition` consumes one of `params`.
    pub fn and_where<I>(&mut self, condition: &str, params: I) -> &mut Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.conditions.push(format!("({})", condition));
        self.params.extend(params);
        self
    }

    /// Case-insensitive substring match of `needle` against any of
    /// `columns`. SQLite's `lower()` folds ASCII only.
    pub fn and_contains_any(&mut self, columns: &[&str], needle: &str) -> &mut Self {
        let needle = needle.to_lowercase();
        let condition = columns
            .iter()
            .map(|c| format!("instr(lower({}), ?) > 0", c))
            .collect::<Vec<_>>()
            .join(" OR ");
        let params = columns.iter().map(|_| Value::Text(needle.clone())).collect::<Vec<_>>();
        self.and_where(&condition, params)
    }

    pub fn order_by(&mut self, term: impl Into<String>) -> &mut Self {
        self.order_by.push(term.into());
        self
    }

    fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    /// `SELECT COUNT(*)` over the filtered rows.
    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {}{}", self.from, self.where_clause())
    }

    /// `SELECT columns` with ordering and an optional `LIMIT/OFFSET`.
    pub fn select_sql(&self, columns: &str, window: Option<(u32, u64)>) -> String {
        let mut sql = format!("SELECT {} FROM {}{}", columns, self.from, self.where_clause());
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        if let Some((limit, offset)) = window {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
        }
        sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}
