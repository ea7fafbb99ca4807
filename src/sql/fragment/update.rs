//! UPDATE statement builder.
//!
//! ```text
//! update T set c1=?, c2=?[, <assignments>][ where pk=?[ and <where>][ and wc<op>][ and version=?]]
//! ```

use super::comment_prefix;
use super::delete::upsert;

/// UPDATE statement builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use = "builders have no effect until rendered with to_statement_string()"]
pub struct Update {
    table_name: String,
    comment: Option<String>,
    columns: Vec<(String, String)>,
    assignments: Option<String>,
    primary_key_columns: Vec<(String, String)>,
    where_clause: Option<String>,
    where_columns: Vec<(String, String)>,
    version_column_name: Option<String>,
}

impl Update {
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

    /// `column=?`
    pub fn add_column(self, name: impl Into<String>) -> Self {
        self.add_column_with_value(name, "?")
    }

    pub fn add_column_with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        upsert(&mut self.columns, name.into(), value.into());
        self
    }

    /// Add every column whose `updatable` flag is set.
    pub fn add_columns<S: AsRef<str>>(mut self, names: &[S], updatable: &[bool]) -> Self {
        for (name, _) in names.iter().zip(updatable).filter(|(_, u)| **u) {
            self = self.add_column(name.as_ref());
        }
        self
    }

    /// Append a raw `x=expr` assignment after the columns.
    pub fn append_assignment_fragment(mut self, fragment: impl Into<String>) -> Self {
        let fragment = fragment.into();
        self.assignments = Some(match self.assignments.take() {
            Some(existing) => format!("{existing}, {fragment}"),
            None => fragment,
        });
        self
    }

    /// `column=column+1`
    pub fn increment_version(self, column: &str) -> Self {
        self.add_column_with_value(column, format!("{column}+1"))
    }

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

    pub fn add_where_fragment(mut self, fragment: impl Into<String>) -> Self {
        let fragment = fragment.into();
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => format!("{existing} and {fragment}"),
            None => fragment,
        });
        self
    }

    /// Restrict on `name` with an operator and value, e.g. `("state", "<>?")`.
    pub fn add_where_column(mut self, name: impl Into<String>, op_value: impl Into<String>) -> Self {
        upsert(&mut self.where_columns, name.into(), op_value.into());
        self
    }

    pub fn set_version_column_name(mut self, name: impl Into<String>) -> Self {
        self.version_column_name = Some(name.into());
        self
    }

    pub fn to_statement_string(&self) -> String {
        let mut buf = comment_prefix(self.comment.as_deref());
        buf.push_str("update ");
        buf.push_str(&self.table_name);
        buf.push_str(" set ");

        let mut assignments: Vec<String> = self
            .columns
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        assignments.extend(self.assignments.clone());
        buf.push_str(&assignments.join(", "));

        let mut conditions: Vec<String> = self
            .primary_key_columns
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        conditions.extend(self.where_clause.clone());
        conditions.extend(
            self.where_columns
                .iter()
                .map(|(name, op_value)| format!("{name}{op_value}")),
        );
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_update_shape() {
        let update = Update::new()
            .set_table_name("T")
            .add_column("c1")
            .add_column("c2")
            .append_assignment_fragment("touched=current_timestamp")
            .set_primary_key_column_names(["pk"])
            .set_where("owner=?")
            .add_where_column("state", "<>?")
            .set_version_column_name("version");
        assert_eq!(
            update.to_statement_string(),
            "update T set c1=?, c2=?, touched=current_timestamp where pk=? and owner=? and state<>? and version=?"
        );
    }

    #[test]
    fn test_increment_version_and_updatable_flags() {
        let update = Update::new()
            .set_table_name("book")
            .add_columns(&["title", "isbn", "price"], &[true, false, true])
            .increment_version("version");
        assert_eq!(
            update.to_statement_string(),
            "update book set title=?, price=?, version=version+1"
        );
    }

    #[test]
    fn test_repeated_column_keeps_position() {
        let update = Update::new()
            .set_table_name("t")
            .add_column("a")
            .add_column("b")
            .add_column_with_value("a", "1");
        assert_eq!(update.to_statement_string(), "update t set a=1, b=?");
    }
}
