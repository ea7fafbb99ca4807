//! DELETE statement builder.
//!
//! ```text
//! [/* comment */ ]delete from T[ where pk1=? and pk2=?[ and <where>][ and version=?]]
//! ```

use super::comment_prefix;

/// DELETE statement builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use = "builders have no effect until rendered with to_statement_string()"]
pub struct Delete {
    table_name: String,
    comment: Option<String>,
    primary_key_columns: Vec<(String, String)>,
    where_clause: Option<String>,
    version_column_name: Option<String>,
}

impl Delete {
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

    /// Replace the key columns; each is compared to `?`.
    pub fn set_primary_key_column_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key_columns.clear();
        for name in names {
            self = self.add_primary_key_column(name, "?");
        }
        self
    }

    pub fn add_primary_key_column(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        upsert(&mut self.primary_key_columns, name.into(), value.into());
        self
    }

    pub fn set_where(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = Some(where_clause.into());
        self
    }

    /// Conjoin `fragment` with any existing where text.
    pub fn add_where_fragment(mut self, fragment: impl Into<String>) -> Self {
        let fragment = fragment.into();
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => format!("{existing} and {fragment}"),
            None => fragment,
        });
        self
    }

    pub fn set_version_column_name(mut self, name: impl Into<String>) -> Self {
        self.version_column_name = Some(name.into());
        self
    }

    pub fn to_statement_string(&self) -> String {
        let mut buf = comment_prefix(self.comment.as_deref());
        buf.push_str("delete from ");
        buf.push_str(&self.table_name);

        let mut conditions: Vec<String> = self
            .primary_key_columns
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        conditions.extend(self.where_clause.clone());
        if let Some(version) = &self.version_column_name {
            conditions.push(format!("{version}=?"));
        }

        if !conditions.is_empty() {
            buf.push_str(" where ");
            buf.push_str(&conditions.join(" and "));
        }
        buf
    }
}

/// Insert or replace a `(column, value)` entry, keeping first-insertion order.
pub(crate) fn upsert(entries: &mut Vec<(String, String)>, name: String, value: String) {
    match entries.iter_mut().find(|(n, _)| *n == name) {
        Some(entry) => entry.1 = value,
        None => entries.push((name, value)),
    }
}
