//! Table groups a pessimistic lock applies to.

use crate::sqm::path::NavigablePath;

use super::from::GroupRef;
use super::SqmTranslator;

impl SqmTranslator<'_> {
    /// Navigable paths of the groups owning the selected columns, in
    /// selection order. Without entity-valued selections every root is
    /// locked. Alias-specific lock modes narrow the set to the groups whose
    /// identification variable requests a pessimistic mode.
    pub(super) fn locking_roots(&self, selected: &[GroupRef]) -> Vec<NavigablePath> {
        let Some(scope) = self.scopes.last() else {
            return Vec::new();
        };
        let current = self.scopes.len() - 1;
        let mut indexes: Vec<usize> = Vec::new();
        for group in selected.iter().filter(|g| g.scope == current) {
            if !indexes.contains(&group.index) {
                indexes.push(group.index);
            }
        }
        if indexes.is_empty() {
            indexes = scope.roots.clone();
        }

        let alias_modes = self
            .options
            .lock
            .as_ref()
            .map(|lock| lock.alias_modes.as_slice())
            .unwrap_or_default();
        if !alias_modes.is_empty() {
            let locked_alias = |alias: &str| {
                alias_modes
                    .iter()
                    .any(|(name, mode)| mode.is_pessimistic() && name.eq_ignore_ascii_case(alias))
            };
            indexes = scope
                .tree_order()
                .into_iter()
                .filter(|&index| {
                    scope
                        .groups
                        .get(index)
                        .and_then(|g| g.sqm_alias.as_deref())
                        .is_some_and(locked_alias)
                })
                .collect();
        }

        indexes
            .into_iter()
            .filter_map(|index| scope.groups.get(index))
            .map(|group| group.navigable_path.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::sql_with;
    use super::super::TranslationOptions;
    use crate::sql::dialect::Dialect;
    use crate::sql::lock::{LockMode, LockOptions, LockTimeout};

    fn locked(hql: &str, dialect: Dialect, lock: LockOptions) -> String {
        sql_with(hql, TranslationOptions::new(dialect).with_lock(lock))
    }

    #[test]
    fn test_selected_join_is_locked() {
        insta::assert_snapshot!(
            locked(
                "select a from Publication p join p.author a",
                Dialect::Postgres,
                LockOptions::new(LockMode::PessimisticWrite),
            ),
            @"select a1_0.id,a1_0.name,a1_0.street,a1_0.city from publication p1_0 inner join person a1_0 on p1_0.author_id=a1_0.id for update of a1_0"
        );
    }

    #[test]
    fn test_scalar_selection_locks_roots() {
        insta::assert_snapshot!(
            locked(
                "select p.title from Publication p",
                Dialect::Postgres,
                LockOptions::new(LockMode::PessimisticWrite).with_timeout(LockTimeout::NoWait),
            ),
            @"select p1_0.title from publication p1_0 for update of p1_0 nowait"
        );
    }

    #[test]
    fn test_alias_mode_narrows_locked_groups() {
        insta::assert_snapshot!(
            locked(
                "select p, a from Publication p join p.author a",
                Dialect::Postgres,
                LockOptions::new(LockMode::None).with_alias_mode("a", LockMode::PessimisticWrite),
            ),
            @"select p1_0.id,p1_0.kind,p1_0.title,p1_0.price,p1_0.published_on,p1_0.version,p1_0.author_id,p1_0.genre,a1_0.id,a1_0.name,a1_0.street,a1_0.city from publication p1_0 inner join person a1_0 on p1_0.author_id=a1_0.id for update of a1_0"
        );
    }

    #[test]
    fn test_optimistic_lock_adds_no_clause() {
        insta::assert_snapshot!(
            locked(
                "select p.title from Publication p",
                Dialect::Postgres,
                LockOptions::new(LockMode::Optimistic),
            ),
            @"select p1_0.title from publication p1_0"
        );
    }
}
