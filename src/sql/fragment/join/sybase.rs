//! Sybase 11 `*=` / `=*` outer joins.

use super::{check_key_arity, JoinBuffers, JoinFragmentBuilder, JoinType};
use crate::sql::fragment::{FragmentError, FragmentResult};

/// Sybase 11 join fragment: cross joins plus marked key predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sybase11JoinFragment {
    buffers: JoinBuffers,
}

impl Sybase11JoinFragment {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JoinFragmentBuilder for Sybase11JoinFragment {
    fn add_join(
        &mut self,
        table: &str,
        alias: &str,
        fk_columns: &[&str],
        pk_columns: &[&str],
        join_type: JoinType,
        on: Option<&str>,
    ) -> FragmentResult<()> {
        if join_type == JoinType::Full {
            return Err(FragmentError::Unsupported(
                "full outer joins are not supported by Sybase 11".into(),
            ));
        }
        check_key_arity(fk_columns, pk_columns)?;

        self.add_cross_join(table, alias);

        let operator = match join_type {
            JoinType::LeftOuter => " *= ",
            JoinType::RightOuter => " =* ",
            _ => " = ",
        };
        let where_part = &mut self.buffers.after_where;
        for (fk, pk) in fk_columns.iter().zip(pk_columns) {
            where_part.push_str(" and ");
            where_part.push_str(fk);
            where_part.push_str(operator);
            where_part.push_str(alias);
            where_part.push('.');
            where_part.push_str(pk);
        }
        self.buffers.has_theta_joins = true;

        if let Some(on) = on {
            self.add_condition(on);
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
