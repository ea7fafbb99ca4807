//! SELECT statement builders.
//!
//! [`Select`] assembles a statement from already rendered clauses, which is
//! what the AST renderer produces. [`SimpleSelect`] builds a single-table
//! select from column names, for load-by-key style statements.

use super::comment_prefix;
use super::limit::{apply_limit, LimitClause};
use super::FragmentResult;
use crate::sql::dialect::{Dialect, SqlDialect};
use crate::sql::lock::LockOptions;

/// SELECT statement assembled from clause text.
///
/// ```text
/// [/* c */ ]select <select> from <from><joins after from>
///   [ where <joins after where>[ and ]<where>]
///   [ group by ..][ having ..][ order by ..][<pagination>][<lock clause>]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[must_use = "builders have no effect until rendered with to_statement_string()"]
pub struct Select {
    dialect: Dialect,
    comment: Option<String>,
    select_clause: String,
    from_clause: String,
    outer_joins_after_from: String,
    outer_joins_after_where: String,
    where_clause: String,
    group_by_clause: String,
    having_clause: String,
    order_by_clause: String,
    limit: LimitClause,
    lock: Option<(LockOptions, Option<String>)>,
}

impl Select {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    pub fn set_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn set_select_clause(mut self, select_clause: impl Into<String>) -> Self {
        self.select_clause = select_clause.into();
        self
    }

    pub fn set_from_clause(mut self, from_clause: impl Into<String>) -> Self {
        self.from_clause = from_clause.into();
        self
    }

    /// `from <table> <alias>`
    pub fn set_from_table(self, table: &str, alias: &str) -> Self {
        self.set_from_clause(format!("{table} {alias}"))
    }

    /// Set join text from a join fragment. A leading `and` of the where part
    /// is stripped; the join text is conjoined with the where clause.
    pub fn set_outer_joins(mut self, after_from: impl Into<String>, after_where: &str) -> Self {
        self.outer_joins_after_from = after_from.into();
        let trimmed = after_where.trim();
        self.outer_joins_after_where = trimmed
            .strip_prefix("and ")
            .map(str::trim_start)
            .unwrap_or(trimmed)
            .to_string();
        self
    }

    pub fn set_where_clause(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = where_clause.into();
        self
    }

    pub fn set_group_by_clause(mut self, group_by: impl Into<String>) -> Self {
        self.group_by_clause = group_by.into();
        self
    }

    pub fn set_having_clause(mut self, having: impl Into<String>) -> Self {
        self.having_clause = having.into();
        self
    }

    pub fn set_order_by_clause(mut self, order_by: impl Into<String>) -> Self {
        self.order_by_clause = order_by.into();
        self
    }

    /// Set pagination; fails if the dialect cannot express it.
    pub fn set_limit(mut self, limit: LimitClause) -> FragmentResult<Self> {
        limit.check(self.dialect)?;
        self.limit = limit;
        Ok(self)
    }

    /// Request a lock clause; `of` is the dialect-formatted lock target list.
    pub fn set_lock_options(mut self, options: LockOptions, of: Option<String>) -> Self {
        self.lock = Some((options, of));
        self
    }

    pub fn to_statement_string(&self) -> String {
        let mut buf = comment_prefix(self.comment.as_deref());
        buf.push_str("select ");
        buf.push_str(&self.select_clause);
        buf.push_str(" from ");
        buf.push_str(&self.from_clause);
        buf.push_str(&self.outer_joins_after_from);

        if !self.where_clause.is_empty() || !self.outer_joins_after_where.is_empty() {
            buf.push_str(" where ");
            // join predicates go first so filters see them
            if !self.outer_joins_after_where.is_empty() {
                buf.push_str(&self.outer_joins_after_where);
                if !self.where_clause.is_empty() {
                    buf.push_str(" and ");
                }
            }
            buf.push_str(&self.where_clause);
        }
        for (keyword, clause) in [
            (" group by ", &self.group_by_clause),
            (" having ", &self.having_clause),
            (" order by ", &self.order_by_clause),
        ] {
            if !clause.is_empty() {
                buf.push_str(keyword);
                buf.push_str(clause);
            }
        }

        let mut sql = apply_limit(&buf, !self.order_by_clause.is_empty(), &self.limit, self.dialect);
        if let Some((options, of)) = &self.lock {
            sql.push_str(&self.dialect.for_update_clause(options, of.as_deref()));
        }
        sql
    }
}

/// Single-table SELECT built from column names.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "builders have no effect until rendered with to_statement_string()"]
pub struct SimpleSelect {
    dialect: Dialect,
    comment: Option<String>,
    table_name: String,
    columns: Vec<String>,
    aliases: Vec<(String, String)>,
    where_tokens: Vec<String>,
    order_by: Option<String>,
    lock_options: LockOptions,
}

impl SimpleSelect {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            comment: None,
            table_name: String::new(),
            columns: Vec::new(),
            aliases: Vec::new(),
            where_tokens: Vec::new(),
            order_by: None,
            lock_options: LockOptions::default(),
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

    pub fn add_column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(name.into());
        self
    }

    pub fn add_column_as(mut self, name: impl Into<String>, alias: impl Into<String>) -> Self {
        let name = name.into();
        super::delete::upsert(&mut self.aliases, name.clone(), alias.into());
        self.columns.push(name);
        self
    }

    pub fn add_columns<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        for name in names {
            self = self.add_column(name.as_ref());
        }
        self
    }

    pub fn add_columns_as<S: AsRef<str>>(mut self, names: &[S], aliases: &[S]) -> Self {
        for (name, alias) in names.iter().zip(aliases) {
            self = self.add_column_as(name.as_ref(), alias.as_ref());
        }
        self
    }

    /// `lhs<op>rhs`
    pub fn add_condition(mut self, lhs: &str, op: &str, rhs: &str) -> Self {
        self.where_tokens.push(format!("{lhs}{op}{rhs}"));
        self
    }

    /// `col<condition>` for every column, e.g. `(["id", "rev"], "=?")`.
    pub fn add_column_conditions<S: AsRef<str>>(mut self, columns: &[S], condition: &str) -> Self {
        for column in columns {
            self.where_tokens.push(format!("{}{condition}", column.as_ref()));
        }
        self
    }

    pub fn set_where(mut self, where_clause: impl Into<String>) -> Self {
        let where_clause = where_clause.into();
        if !where_clause.is_empty() {
            self.where_tokens.push(where_clause);
        }
        self
    }

    pub fn set_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn set_lock_options(mut self, lock_options: LockOptions) -> Self {
        self.lock_options = lock_options;
        self
    }

    fn alias_of(&self, column: &str) -> Option<&str> {
        self.aliases
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, a)| a.as_str())
    }

    pub fn to_statement_string(&self) -> String {
        let mut buf = comment_prefix(self.comment.as_deref());
        buf.push_str("select ");

        let mut seen: Vec<&str> = Vec::new();
        for column in &self.columns {
            let alias = self.alias_of(column);
            let key = alias.unwrap_or(column);
            if seen.contains(&key) {
                continue;
            }
            if !seen.is_empty() {
                buf.push_str(", ");
            }
            seen.push(key);
            buf.push_str(column);
            if let Some(alias) = alias.filter(|a| a != column) {
                buf.push_str(" as ");
                buf.push_str(alias);
            }
        }

        buf.push_str(" from ");
        buf.push_str(&self.dialect.append_lock_hint(
            self.lock_options.effective_mode(),
            self.lock_options.effective_timeout(),
            &self.table_name,
        ));

        if !self.where_tokens.is_empty() {
            buf.push_str(" where ");
            buf.push_str(&self.where_tokens.join(" and "));
        }
        if let Some(order_by) = &self.order_by {
            buf.push_str(" order by ");
            buf.push_str(order_by);
        }
        buf.push_str(&self.dialect.for_update_clause(&self.lock_options, None));
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::lock::{LockMode, LockTimeout};

    #[test]
    fn test_select_clauses_in_order() {
        let select = Select::new(Dialect::Postgres)
            .set_comment("HQL: select b from Book b")
            .set_select_clause("b1_0.id,b1_0.title")
            .set_from_table("book", "b1_0")
            .set_outer_joins(" join author a1_0 on a1_0.id=b1_0.author_id", "")
            .set_where_clause("b1_0.price>?")
            .set_group_by_clause("b1_0.id")
            .set_having_clause("count(*)>1")
            .set_order_by_clause("b1_0.title");
        assert_eq!(
            select.to_statement_string(),
            "/* HQL: select b from Book b */ select b1_0.id,b1_0.title from book b1_0 join author a1_0 on a1_0.id=b1_0.author_id where b1_0.price>? group by b1_0.id having count(*)>1 order by b1_0.title"
        );
    }

    #[test]
    fn test_outer_joins_after_where_strip_leading_and() {
        let select = Select::new(Dialect::Oracle8i)
            .set_select_clause("e.name")
            .set_from_table("emp", "e")
            .set_outer_joins(", dept d", " and e.dept_id=d.id(+)")
            .set_where_clause("e.active=1");
        assert_eq!(
            select.to_statement_string(),
            "select e.name from emp e, dept d where e.dept_id=d.id(+) and e.active=1"
        );

        let only_joins = Select::new(Dialect::Oracle8i)
            .set_select_clause("e.name")
            .set_from_table("emp", "e")
            .set_outer_joins(", dept d", " and e.dept_id=d.id(+)");
        assert_eq!(
            only_joins.to_statement_string(),
            "select e.name from emp e, dept d where e.dept_id=d.id(+)"
        );
    }

    #[test]
    fn test_limit_then_lock() {
        let select = Select::new(Dialect::Postgres)
            .set_select_clause("b1_0.id")
            .set_from_table("book", "b1_0")
            .set_limit(LimitClause::new(None, Some("?".into())))
            .unwrap()
            .set_lock_options(LockOptions::new(LockMode::PessimisticWrite), Some("b1_0".into()));
        assert_eq!(
            select.to_statement_string(),
            "select b1_0.id from book b1_0 limit ? for update of b1_0"
        );
    }

    #[test]
    fn test_limit_rejected_for_sybase() {
        let result = Select::new(Dialect::Sybase11).set_limit(LimitClause::new(None, Some("?".into())));
        assert!(result.is_err());
    }

    #[test]
    fn test_simple_select_dedups_columns() {
        let select = SimpleSelect::new(Dialect::Ansi)
            .set_table_name("book")
            .add_column("id")
            .add_column_as("title", "t")
            .add_column("id")
            .add_column_as("name", "t")
            .add_column_conditions(&["id", "rev"], "=?")
            .add_condition("version", "=", "?")
            .set_order_by("id");
        assert_eq!(
            select.to_statement_string(),
            "select id, title as t from book where id=? and rev=? and version=? order by id"
        );
    }

    #[test]
    fn test_simple_select_locks() {
        let pg = SimpleSelect::new(Dialect::Postgres)
            .set_table_name("book")
            .add_column("id")
            .add_column_conditions(&["id"], "=?")
            .set_lock_options(LockOptions::new(LockMode::UpgradeNowait));
        assert_eq!(pg.to_statement_string(), "select id from book where id=? for update nowait");

        let sqlserver = SimpleSelect::new(Dialect::TSql)
            .set_table_name("book")
            .add_column("id")
            .set_lock_options(
                LockOptions::new(LockMode::PessimisticWrite).with_timeout(LockTimeout::SkipLocked),
            );
        assert_eq!(
            sqlserver.to_statement_string(),
            "select id from book with (updlock,rowlock,readpast)"
        );
    }
}
