//! ANSI `join ... on` fragments.

use super::{check_key_arity, JoinBuffers, JoinFragmentBuilder, JoinType};
use crate::sql::fragment::{append_condition, FragmentError, FragmentResult};

/// Renders ` <kind> join <table> <alias> on fk=alias.pk[ and ...]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnsiJoinFragment {
    buffers: JoinBuffers,
}

impl AnsiJoinFragment {
    pub fn new() -> Self {
        Self::default()
    }
}

fn join_keyword(join_type: JoinType) -> FragmentResult<&'static str> {
    match join_type {
        JoinType::Inner => Ok(" inner join "),
        JoinType::LeftOuter => Ok(" left outer join "),
        JoinType::RightOuter => Ok(" right outer join "),
        JoinType::Full => Ok(" full outer join "),
        JoinType::None => Err(FragmentError::AssertionFailure(
            "undefined join type for an ANSI join".into(),
        )),
    }
}

impl JoinFragmentBuilder for AnsiJoinFragment {
    fn add_join(
        &mut self,
        table: &str,
        alias: &str,
        fk_columns: &[&str],
        pk_columns: &[&str],
        join_type: JoinType,
        on: Option<&str>,
    ) -> FragmentResult<()> {
        let keyword = join_keyword(join_type)?;
        check_key_arity(fk_columns, pk_columns)?;

        let from = &mut self.buffers.after_from;
        from.push_str(keyword);
        from.push_str(table);
        from.push(' ');
        from.push_str(alias);
        from.push_str(" on ");

        for (i, (fk, pk)) in fk_columns.iter().zip(pk_columns).enumerate() {
            if i > 0 {
                from.push_str(" and ");
            }
            from.push_str(fk);
            from.push('=');
            from.push_str(alias);
            from.push('.');
            from.push_str(pk);
        }

        let on = on.unwrap_or_default();
        if fk_columns.is_empty() {
            // entity join: the on clause is the whole join condition
            from.push_str(on.strip_prefix(" and ").unwrap_or(on).trim_start());
        } else {
            append_condition(from, on);
        }
        Ok(())
    }

    fn buffers(&self) -> &JoinBuffers {
        &self.buffers
    }

    fn buffers_mut(&mut self) -> &mut JoinBuffers {
        &mut self.buffers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inner_join() {
        let mut f = AnsiJoinFragment::new();
        f.add_join("DEPT", "d", &["emp.dept_id"], &["id"], JoinType::Inner, None)
            .unwrap();
        assert_eq!(f.to_from_fragment_string(), " inner join DEPT d on emp.dept_id=d.id");
        assert_eq!(f.to_where_fragment_string(), "");
    }

    #[test]
    fn test_composite_keys_and_on_clause() {
        let mut f = AnsiJoinFragment::new();
        f.add_join(
            "LINE",
            "l",
            &["o.id", "o.rev"],
            &["order_id", "order_rev"],
            JoinType::LeftOuter,
            Some("l.deleted=0"),
        )
        .unwrap();
        assert_eq!(
            f.to_from_fragment_string(),
            " left outer join LINE l on o.id=l.order_id and o.rev=l.order_rev and l.deleted=0"
        );
    }

    #[test]
    fn test_on_clause_with_leading_and_is_not_doubled() {
        let mut f = AnsiJoinFragment::new();
        f.add_join("DEPT", "d", &["e.dept_id"], &["id"], JoinType::Full, Some(" and d.x=1"))
            .unwrap();
        assert_eq!(
            f.to_from_fragment_string(),
            " full outer join DEPT d on e.dept_id=d.id and d.x=1"
        );
    }

    #[test]
    fn test_entity_join_without_keys() {
        let mut f = AnsiJoinFragment::new();
        f.add_join("AUDIT", "a", &[], &[], JoinType::RightOuter, Some("a.ref=e.id"))
            .unwrap();
        assert_eq!(f.to_from_fragment_string(), " right outer join AUDIT a on a.ref=e.id");
    }

    #[test]
    fn test_undefined_join_type_is_assertion_failure() {
        let mut f = AnsiJoinFragment::new();
        let err = f
            .add_join("DEPT", "d", &["e.dept_id"], &["id"], JoinType::None, None)
            .unwrap_err();
        assert!(matches!(err, FragmentError::AssertionFailure(_)));
        assert_eq!(f.to_from_fragment_string(), "");
    }

    #[test]
    fn test_key_condition_rejected() {
        let mut f = AnsiJoinFragment::new();
        assert!(matches!(
            f.add_key_condition("d", &["e.dept_id"], &["id"]),
            Err(FragmentError::Unsupported(_))
        ));
    }
}
