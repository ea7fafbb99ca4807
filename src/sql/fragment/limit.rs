//! Pagination clauses per dialect limit style.

use super::{FragmentError, FragmentResult};
use crate::sql::dialect::{Dialect, LimitStyle, SqlDialect};
use crate::sqm::operator::FetchClauseType;

/// Offset and fetch expressions, already rendered (usually `?` markers).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LimitClause {
    pub offset: Option<String>,
    pub fetch: Option<String>,
    pub fetch_type: FetchClauseType,
}

impl LimitClause {
    pub fn new(offset: Option<String>, fetch: Option<String>) -> Self {
        Self {
            offset,
            fetch,
            fetch_type: FetchClauseType::RowsOnly,
        }
    }

    pub fn with_fetch_type(mut self, fetch_type: FetchClauseType) -> Self {
        self.fetch_type = fetch_type;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.offset.is_none() && self.fetch.is_none()
    }

    /// Fail if the dialect cannot express this clause.
    pub fn check(&self, dialect: Dialect) -> FragmentResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        let style = dialect.limit_style();
        if style == LimitStyle::Unsupported {
            return Err(FragmentError::Unsupported(format!(
                "dialect {dialect} has no pagination syntax"
            )));
        }
        if self.fetch_type != FetchClauseType::RowsOnly && style != LimitStyle::OffsetFetch {
            return Err(FragmentError::Unsupported(format!(
                "fetch {:?} requires offset/fetch pagination, dialect {dialect} uses {style:?}",
                self.fetch_type
            )));
        }
        Ok(())
    }
}

/// Apply `limit` to a select statement without its lock clause.
///
/// `rownum` dialects wrap the statement; the others append a clause.
pub fn apply_limit(sql: &str, has_order_by: bool, limit: &LimitClause, dialect: Dialect) -> String {
    if limit.is_empty() {
        return sql.to_string();
    }
    match dialect.limit_style() {
        LimitStyle::LimitOffset => {
            let mut out = sql.to_string();
            if let Some(fetch) = &limit.fetch {
                out.push_str(" limit ");
                out.push_str(fetch);
            }
            if let Some(offset) = &limit.offset {
                out.push_str(" offset ");
                out.push_str(offset);
            }
            out
        }
        LimitStyle::OffsetFetch => {
            let mut out = sql.to_string();
            let requires_offset = dialect.requires_order_by_for_offset();
            if requires_offset && !has_order_by {
                out.push_str(" order by (select 0)");
            }
            let offset = match (&limit.offset, requires_offset) {
                (Some(offset), _) => Some(offset.as_str()),
                (None, true) => Some("0"),
                (None, false) => None,
            };
            if let Some(offset) = offset {
                out.push_str(" offset ");
                out.push_str(offset);
                out.push_str(" rows");
            }
            if let Some(fetch) = &limit.fetch {
                out.push_str(if offset.is_some() { " fetch next " } else { " fetch first " });
                out.push_str(fetch);
                out.push_str(if limit.fetch_type.is_percent() { " percent rows" } else { " rows" });
                out.push_str(if limit.fetch_type.with_ties() { " with ties" } else { " only" });
            }
            out
        }
        LimitStyle::RowNum => match (&limit.offset, &limit.fetch) {
            (Some(offset), Some(fetch)) => format!(
                "select * from ( select row_.*, rownum rownum_ from ( {sql} ) row_ where rownum <= {offset}+{fetch}) where rownum_ > {offset}"
            ),
            (Some(offset), None) => format!(
                "select * from ( select row_.*, rownum rownum_ from ( {sql} ) row_) where rownum_ > {offset}"
            ),
            (None, Some(fetch)) => format!("select * from ( {sql} ) where rownum <= {fetch}"),
            (None, None) => sql.to_string(),
        },
        LimitStyle::Unsupported => sql.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(offset: Option<&str>, fetch: Option<&str>) -> LimitClause {
        LimitClause::new(offset.map(String::from), fetch.map(String::from))
    }

    #[test]
    fn test_limit_offset() {
        let sql = apply_limit("select 1", false, &limit(Some("?"), Some("?")), Dialect::Postgres);
        assert_eq!(sql, "select 1 limit ? offset ?");
    }

    #[test]
    fn test_offset_fetch() {
        let sql = apply_limit("select 1", true, &limit(None, Some("10")), Dialect::Oracle);
        assert_eq!(sql, "select 1 fetch first 10 rows only");
        let sql = apply_limit("select 1", true, &limit(Some("5"), Some("10")), Dialect::Oracle);
        assert_eq!(sql, "select 1 offset 5 rows fetch next 10 rows only");
    }

    #[test]
    fn test_sqlserver_needs_order_by_and_offset() {
        let sql = apply_limit("select 1 from t", false, &limit(None, Some("?")), Dialect::TSql);
        assert_eq!(sql, "select 1 from t order by (select 0) offset 0 rows fetch next ? rows only");
    }

    #[test]
    fn test_rownum_wrapping() {
        let sql = apply_limit("select a from t", false, &limit(None, Some("?")), Dialect::Oracle8i);
        assert_eq!(sql, "select * from ( select a from t ) where rownum <= ?");
    }

    #[test]
    fn test_check() {
        assert!(limit(None, Some("?")).check(Dialect::Sybase11).is_err());
        assert!(limit(None, None).check(Dialect::Sybase11).is_ok());
        let ties = limit(None, Some("3")).with_fetch_type(FetchClauseType::RowsWithTies);
        assert!(ties.check(Dialect::Postgres).is_err());
        assert!(ties.check(Dialect::Oracle).is_ok());
    }
}
