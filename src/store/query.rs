///! Structured query construction: filter terms compiled to parameterized SQL
use super::{StoreError, Value};

/// Boolean operator joining filter terms. One operator applies uniformly
/// between every term of a query, never per term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoolOp {
    #[default]
    And,
    Or,
}

impl BoolOp {
    fn separator(self) -> &'static str {
        match self {
            BoolOp::And => " AND ",
            BoolOp::Or => " OR ",
        }
    }
}

/// One filter term. Values are always bound parameters, never spliced into
/// the SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterTerm {
    Equals {
        column: String,
        value: Value,
        negate: bool,
    },
    In {
        column: String,
        values: Vec<Value>,
        negate: bool,
    },
}

impl FilterTerm {
    pub fn equals(column: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterTerm::Equals {
            column: column.into(),
            value: value.into(),
            negate: false,
        }
    }

    /// Multi-value match: compiles to a parenthesized OR-group of equality
    /// comparisons. `values` must be non-empty.
    pub fn any_of(column: impl Into<String>, values: Vec<Value>) -> Self {
        FilterTerm::In {
            column: column.into(),
            values,
            negate: false,
        }
    }

    /// Prepends a logical NOT to the whole term.
    pub fn negated(mut self) -> Self {
        match &mut self {
            FilterTerm::Equals { negate, .. } | FilterTerm::In { negate, .. } => *negate = true,
        }
        self
    }

    fn render(&self, sql: &mut String, params: &mut Vec<Value>) -> Result<(), StoreError> {
        match self {
            FilterTerm::Equals {
                column,
                value,
                negate,
            } => {
                render_equality(sql, column, *negate);
                params.push(value.clone());
            }
            FilterTerm::In {
                column,
                values,
                negate,
            } => {
                if values.is_empty() {
                    return Err(StoreError::InvalidFilter(format!(
                        "multi-value filter on {column:?} has no values"
                    )));
                }
                if values.len() == 1 {
                    render_equality(sql, column, *negate);
                    params.push(values[0].clone());
                } else {
                    if *negate {
                        sql.push_str("NOT ");
                    }
                    sql.push('(');
                    for (i, value) in values.iter().enumerate() {
                        if i > 0 {
                            sql.push_str(" OR ");
                        }
                        sql.push_str(column);
                        sql.push_str(" = ?");
                        params.push(value.clone());
                    }
                    sql.push(')');
                }
            }
        }
        Ok(())
    }
}

fn render_equality(sql: &mut String, column: &str, negate: bool) {
    if negate {
        sql.push_str("NOT ");
    }
    sql.push_str(column);
    sql.push_str(" = ?");
}

/// A structured table query: projection, filters, and post-load timestamp
/// columns, or a verbatim escape-hatch query for joins beyond the filter
/// model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableQuery {
    table: String,
    columns: Vec<String>,
    filters: Vec<FilterTerm>,
    op: BoolOp,
    distinct: bool,
    datetimes: Vec<String>,
    direct: Option<String>,
}

impl TableQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Verbatim query escape hatch. When set, every other structural input
    /// is ignored and the caller owns any sanitization.
    pub fn direct(table: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            direct: Some(sql.into()),
            ..Default::default()
        }
    }

    /// Columns to select, in order. Falls back to all columns at load time
    /// if any name is missing from the relation.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn filter(mut self, term: FilterTerm) -> Self {
        self.filters.push(term);
        self
    }

    pub fn combine(mut self, op: BoolOp) -> Self {
        self.op = op;
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    /// Columns holding integer epoch seconds to convert to calendar
    /// timestamps after loading.
    pub fn datetimes<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.datetimes = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn requested_columns(&self) -> &[String] {
        &self.columns
    }

    pub fn datetime_columns(&self) -> &[String] {
        &self.datetimes
    }

    pub fn direct_sql(&self) -> Option<&str> {
        self.direct.as_deref()
    }

    /// Compiles the query to SQL text plus its positional parameter list.
    /// `select_list` is resolved against the live schema by the store.
    pub(crate) fn render(&self, select_list: &str) -> Result<(String, Vec<Value>), StoreError> {
        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(select_list);
        sql.push_str(" FROM ");
        sql.push_str(&self.table);

        let mut params = Vec::new();
        for (i, term) in self.filters.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { self.op.separator() });
            term.render(&mut sql, &mut params)?;
        }
        Ok((sql, params))
    }
}
