//! INSERT statement builders.

use super::comment_prefix;
use super::delete::upsert;
use super::select::Select;
use super::{FragmentError, FragmentResult};
use crate::sql::dialect::{Dialect, SqlDialect};

/// INSERT ... VALUES builder.
///
/// ```text
/// insert into T (c1, c2) values (?, ?)[, (?, ?) ...]
/// insert into T <dialect no-columns insert>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "builders have no effect until rendered with to_statement_string()"]
pub struct Insert {
    dialect: Dialect,
    table_name: String,
    comment: Option<String>,
    columns: Vec<(String, String)>,
    additional_rows: Vec<Vec<String>>,
}

impl Insert {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            table_name: String::new(),
            comment: None,
            columns: Vec::new(),
            additional_rows: Vec::new(),
        }
    }

    pub fn set_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn set_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn add_column(self, name: impl Into<String>) -> Self {
        self.add_column_with_value(name, "?")
    }

    pub fn add_column_with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        upsert(&mut self.columns, name.into(), value.into());
        self
    }

    /// Add every column whose `insertable` flag is set.
    pub fn add_columns<S: AsRef<str>>(mut self, names: &[S], insertable: &[bool]) -> Self {
        for (name, _) in names.iter().zip(insertable).filter(|(_, i)| **i) {
            self = self.add_column(name.as_ref());
        }
        self
    }

    /// List an identity column only if the dialect needs a value for it.
    pub fn add_identity_column(self, name: impl Into<String>) -> Self {
        match self.dialect.identity_insert_string() {
            Some(value) => self.add_column_with_value(name, value),
            None => self,
        }
    }

    /// Another row of values after the first; its arity must match the
    /// columns.
    pub fn add_row<I, S>(mut self, values: I) -> FragmentResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.len() != self.columns.len() {
            return Err(FragmentError::AssertionFailure(format!(
                "insert row has {} value(s) for {} column(s)",
                values.len(),
                self.columns.len()
            )));
        }
        self.additional_rows.push(values);
        Ok(self)
    }

    pub fn to_statement_string(&self) -> String {
        let mut buf = comment_prefix(self.comment.as_deref());
        buf.push_str("insert into ");
        buf.push_str(&self.table_name);

        if self.columns.is_empty() {
            buf.push(' ');
            buf.push_str(self.dialect.no_columns_insert_string());
        } else {
            let names: Vec<&str> = self.columns.iter().map(|(n, _)| n.as_str()).collect();
            let values: Vec<&str> = self.columns.iter().map(|(_, v)| v.as_str()).collect();
            buf.push_str(" (");
            buf.push_str(&names.join(", "));
            buf.push_str(") values (");
            buf.push_str(&values.join(", "));
            buf.push(')');
            for row in &self.additional_rows {
                buf.push_str(", (");
                buf.push_str(&row.join(", "));
                buf.push(')');
            }
        }
        buf
    }
}

/// INSERT ... SELECT builder.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[must_use = "builders have no effect until rendered with to_statement_string()"]
pub struct InsertSelect {
    table_name: String,
    comment: Option<String>,
    columns: Vec<String>,
    select: Option<String>,
}

impl InsertSelect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn set_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn add_column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(name.into());
        self
    }

    pub fn add_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn set_select(self, select: Select) -> Self {
        self.set_select_text(select.to_statement_string())
    }

    /// Use an already rendered query, e.g. a set operation.
    pub fn set_select_text(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    pub fn to_statement_string(&self) -> String {
        let mut buf = comment_prefix(self.comment.as_deref());
        buf.push_str("insert into ");
        buf.push_str(&self.table_name);
        if !self.columns.is_empty() {
            buf.push_str(" (");
            buf.push_str(&self.columns.join(", "));
            buf.push(')');
        }
        if let Some(select) = &self.select {
            buf.push(' ');
            buf.push_str(select);
        }
        buf
    }
}
