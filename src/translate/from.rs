//! Table groups of a query block: roots, attribute joins and the joins
//! implied by path navigation.

use std::collections::HashMap;

use crate::metamodel::{AttributeKind, EntityType};
use crate::sql::ast::{
    AssociationTable, ColumnReference, Expression, JoinKey, Predicate, TableGroup, TableGroupJoin,
    TableReference,
};
use crate::sql::fragment::FragmentError;
use crate::sql::template::{inject_alias, render_where_string_template};
use crate::sqm::error::{SqmError, SqmResult};
use crate::sqm::from::{FromSource, SqmFrom};
use crate::sqm::operator::{ComparisonOperator, SqmJoinType};
use crate::sqm::path::{FromId, NavigablePath};

use super::SqmTranslator;

/// Position of a group: scope index and index within that scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct GroupRef {
    pub scope: usize,
    pub index: usize,
}

/// What the rows of a group are.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum GroupKind {
    Entity(String),
    /// Derived table, CTE or link table, by column name.
    Columns(Vec<String>),
}

#[derive(Debug)]
pub(super) struct JoinSpec {
    pub join_type: SqmJoinType,
    pub key: Option<JoinKey>,
    pub on: Option<Predicate>,
    /// Entity restrictions of the joined rows.
    pub restrictions: Vec<Predicate>,
}

#[derive(Debug)]
pub(super) struct GroupNode {
    pub navigable_path: NavigablePath,
    pub table: TableReference,
    pub alias: String,
    /// Alias given in the query, if any.
    pub sqm_alias: Option<String>,
    /// Mutation target: columns are unqualified inside its own block.
    pub bare: bool,
    pub kind: GroupKind,
    pub key_columns: Vec<String>,
    pub association_table: Option<AssociationTable>,
    pub join: Option<JoinSpec>,
    pub children: Vec<usize>,
    pub fetched: bool,
    pub fetch_order: Option<String>,
}

impl GroupNode {
    fn new(navigable_path: NavigablePath, table: TableReference, alias: String, kind: GroupKind) -> Self {
        Self {
            navigable_path,
            table,
            alias,
            sqm_alias: None,
            bare: false,
            kind,
            key_columns: Vec::new(),
            association_table: None,
            join: None,
            children: Vec::new(),
            fetched: false,
            fetch_order: None,
        }
    }
}

/// Table groups of one query block.
#[derive(Debug)]
pub(super) struct Scope {
    pub groups: Vec<GroupNode>,
    pub roots: Vec<usize>,
    pub by_from: HashMap<FromId, GroupRef>,
    /// Joins reusable by path navigation, keyed by navigable path.
    pub implicit: HashMap<NavigablePath, usize>,
    /// Conditions for the where clause: root restrictions and correlations.
    pub restrictions: Vec<Predicate>,
    pub allow_implicit_joins: bool,
}

impl Scope {
    pub(super) fn new(allow_implicit_joins: bool) -> Self {
        Self {
            groups: Vec::new(),
            roots: Vec::new(),
            by_from: HashMap::new(),
            implicit: HashMap::new(),
            restrictions: Vec::new(),
            allow_implicit_joins,
        }
    }

    fn push(&mut self, node: GroupNode) -> usize {
        self.groups.push(node);
        self.groups.len() - 1
    }

    pub(super) fn add_restriction(&mut self, predicate: Predicate) {
        if !self.restrictions.contains(&predicate) {
            self.restrictions.push(predicate);
        }
    }

    /// Group indexes, depth first from each root.
    pub(super) fn tree_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.groups.len());
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(index) = stack.pop() {
            order.push(index);
            if let Some(group) = self.groups.get(index) {
                stack.extend(group.children.iter().rev());
            }
        }
        order
    }

    pub(super) fn into_from_clause(self) -> Vec<TableGroup> {
        let mut slots: Vec<Option<GroupNode>> = self.groups.into_iter().map(Some).collect();
        self.roots
            .iter()
            .filter_map(|&index| take_group(&mut slots, index).map(|(group, _)| group))
            .collect()
    }
}

fn take_group(slots: &mut [Option<GroupNode>], index: usize) -> Option<(TableGroup, Option<JoinSpec>)> {
    let node = slots.get_mut(index)?.take()?;
    let mut joins = Vec::with_capacity(node.children.len());
    for &child in &node.children {
        if let Some((group, Some(spec))) = take_group(slots, child) {
            joins.push(TableGroupJoin {
                join_type: spec.join_type,
                group,
                key: spec.key,
                predicate: Predicate::combine(spec.on, Predicate::all(spec.restrictions)),
            });
        }
    }
    Some((
        TableGroup {
            navigable_path: node.navigable_path,
            table: node.table,
            alias: node.alias,
            key_columns: node.key_columns,
            association_table: node.association_table,
            joins,
        },
        node.join,
    ))
}

/// Join key and link table of an association.
pub(super) struct AssociationKey {
    /// Columns of the owner, unqualified.
    pub owner: Vec<String>,
    /// Matching columns of the target, or of the link table.
    pub target: Vec<String>,
    pub link: Option<AssociationTable>,
    pub order: Option<String>,
}

impl SqmTranslator<'_> {
    fn current_scope(&self) -> usize {
        self.scopes.len().saturating_sub(1)
    }

    pub(super) fn scope_mut(&mut self) -> SqmResult<&mut Scope> {
        self.scopes
            .last_mut()
            .ok_or_else(|| SqmError::interpretation("no query block to register table groups in"))
    }

    pub(super) fn group(&self, group: GroupRef) -> SqmResult<&GroupNode> {
        self.scopes
            .get(group.scope)
            .and_then(|scope| scope.groups.get(group.index))
            .ok_or_else(|| SqmError::interpretation("dangling table group reference"))
    }

    fn group_mut(&mut self, group: GroupRef) -> SqmResult<&mut GroupNode> {
        self.scopes
            .get_mut(group.scope)
            .and_then(|scope| scope.groups.get_mut(group.index))
            .ok_or_else(|| SqmError::interpretation("dangling table group reference"))
    }

    /// The group registered for a from node, innermost block first.
    pub(super) fn lookup_from(&self, id: FromId) -> SqmResult<GroupRef> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.by_from.get(&id).copied())
            .ok_or_else(|| SqmError::interpretation(format!("unregistered from node {id:?}")))
    }

    /// Alias qualifying the columns of `group` in the current block.
    pub(super) fn qualifier(&self, group: GroupRef) -> SqmResult<Option<String>> {
        let node = self.group(group)?;
        Ok(if node.bare && group.scope == self.current_scope() {
            None
        } else {
            Some(node.alias.clone())
        })
    }

    pub(super) fn entity_type(&self, name: &str) -> SqmResult<&EntityType> {
        self.model
            .entity(name)
            .ok_or_else(|| SqmError::UnknownEntity(name.to_string()))
    }

    /// Render a mapping-author fragment against `qualifier`.
    pub(super) fn qualify_fragment(&self, fragment: &str, qualifier: Option<&str>) -> SqmResult<String> {
        let placeholder = &self.options.template_placeholder;
        let template = render_where_string_template(fragment, placeholder, self.options.dialect)?;
        Ok(inject_alias(&template, placeholder, qualifier.unwrap_or("")))
    }

    /// `@Where` restrictions of `entity` and its super types, plus the
    /// discriminator restriction of subtypes.
    pub(super) fn entity_restrictions(
        &self,
        entity: &str,
        qualifier: Option<&str>,
    ) -> SqmResult<Vec<Predicate>> {
        let mut restrictions = Vec::new();
        let mut current = Some(self.entity_type(entity)?);
        while let Some(e) = current {
            if let Some(fragment) = &e.where_restriction {
                restrictions.push(Predicate::Formula(self.qualify_fragment(fragment, qualifier)?));
            }
            current = e.super_type.as_deref().and_then(|s| self.model.entity(s));
        }
        if self.entity_type(entity)?.super_type.is_some() {
            restrictions.extend(self.discriminator_restriction(entity, qualifier));
        }
        Ok(restrictions)
    }

    /// Rows of `entity` and its subtypes, by discriminator value.
    pub(super) fn discriminator_restriction(&self, entity: &str, qualifier: Option<&str>) -> Option<Predicate> {
        let discriminator = self.model.discriminator(entity)?;
        let column = Expression::column(qualifier, &discriminator.column);
        let mut values: Vec<Expression> = self
            .model
            .discriminator_values(entity)
            .into_iter()
            .map(Expression::Formula)
            .collect();
        match values.len() {
            0 => None,
            1 => Some(Predicate::Comparison {
                lhs: column,
                op: ComparisonOperator::Equal,
                rhs: values.remove(0),
            }),
            _ => Some(Predicate::InList {
                expr: column,
                list: values,
                negated: false,
            }),
        }
    }

    /// Register a root of the current block and everything joined to it.
    pub(super) fn register_root(&mut self, root: &SqmFrom) -> SqmResult<()> {
        let mut node = match &root.source {
            FromSource::Correlated { outer } => {
                let outer = self.lookup_from(*outer)?;
                self.scope_mut()?.by_from.insert(root.id, outer);
                for join in &root.joins {
                    self.register_join(outer, join)?;
                }
                return Ok(());
            }
            FromSource::Entity(name) => {
                let entity = self.entity_type(name)?;
                let (table, id_column) = (entity.table.clone(), entity.id_column().to_string());
                let alias = format!("{}_0", self.alias_base(name));
                let restrictions = self.entity_restrictions(name, Some(alias.as_str()))?;
                let scope = self.scope_mut()?;
                for restriction in restrictions {
                    scope.add_restriction(restriction);
                }
                let mut node = GroupNode::new(
                    root.navigable_path.clone(),
                    TableReference::Named { table },
                    alias,
                    GroupKind::Entity(name.clone()),
                );
                node.key_columns = vec![id_column];
                node
            }
            FromSource::Derived { .. } | FromSource::Cte { .. } => self.derived_group(root)?,
            FromSource::Function { name, .. } => {
                return Err(FragmentError::Unsupported(format!(
                    "set-returning function '{name}' in the from clause"
                ))
                .into())
            }
            FromSource::Attribute { attribute, .. } => {
                return Err(SqmError::interpretation(format!(
                    "attribute '{attribute}' registered as a root"
                )))
            }
        };
        node.sqm_alias = root.alias.clone();
        let scope_index = self.current_scope();
        let scope = self.scope_mut()?;
        let index = scope.push(node);
        scope.roots.push(index);
        let group = GroupRef {
            scope: scope_index,
            index,
        };
        scope.by_from.insert(root.id, group);
        for join in &root.joins {
            self.register_join(group, join)?;
        }
        Ok(())
    }

    /// Register the entity an update, delete or insert writes to. Returns
    /// the entity name and its table.
    pub(super) fn register_mutation_target(&mut self, target: &SqmFrom) -> SqmResult<(String, String)> {
        let FromSource::Entity(name) = &target.source else {
            return Err(SqmError::interpretation("mutation target is not an entity"));
        };
        let entity = self.entity_type(name)?;
        let (table, id_column) = (entity.table.clone(), entity.id_column().to_string());
        let restrictions = self.entity_restrictions(name, None)?;

        let mut node = GroupNode::new(
            target.navigable_path.clone(),
            TableReference::Named {
                table: table.clone(),
            },
            table.clone(),
            GroupKind::Entity(name.clone()),
        );
        node.bare = true;
        node.sqm_alias = target.alias.clone();
        node.key_columns = vec![id_column];

        let scope_index = self.current_scope();
        let scope = self.scope_mut()?;
        let index = scope.push(node);
        scope.roots.push(index);
        scope.by_from.insert(
            target.id,
            GroupRef {
                scope: scope_index,
                index,
            },
        );
        for restriction in restrictions {
            scope.add_restriction(restriction);
        }
        Ok((name.clone(), table))
    }

    fn derived_group(&mut self, from: &SqmFrom) -> SqmResult<GroupNode> {
        Ok(match &from.source {
            FromSource::Derived {
                query,
                lateral,
                columns,
            } => {
                let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
                let query = self.query(query, Some(names.as_slice()))?;
                let alias = format!("{}_0", self.alias_base("derived"));
                GroupNode::new(
                    from.navigable_path.clone(),
                    TableReference::Derived {
                        query: Box::new(query),
                        lateral: *lateral,
                    },
                    alias,
                    GroupKind::Columns(names),
                )
            }
            FromSource::Cte { name, columns } => {
                let alias = format!("{}_0", self.alias_base(name));
                GroupNode::new(
                    from.navigable_path.clone(),
                    TableReference::Cte { name: name.clone() },
                    alias,
                    GroupKind::Columns(columns.iter().map(|c| c.name.clone()).collect()),
                )
            }
            _ => return Err(SqmError::interpretation("not a derived from node")),
        })
    }

    fn register_join(&mut self, parent: GroupRef, join: &SqmFrom) -> SqmResult<()> {
        let info = join
            .join
            .as_ref()
            .ok_or_else(|| SqmError::interpretation("join node without join information"))?;
        let group = match &join.source {
            FromSource::Attribute { attribute, treat } => {
                let group = self.attribute_join(
                    parent,
                    attribute,
                    treat.as_deref(),
                    info.join_type,
                    join.navigable_path.clone(),
                )?;
                let node = self.group_mut(group)?;
                node.sqm_alias = join.alias.clone();
                node.fetched = info.fetch;
                if join.alias.is_none() && treat.is_none() {
                    self.scope_mut()?
                        .implicit
                        .insert(join.navigable_path.clone(), group.index);
                }
                group
            }
            FromSource::Entity(name) => {
                let entity = self.entity_type(name)?;
                let (table, id_column) = (entity.table.clone(), entity.id_column().to_string());
                let alias = format!("{}_0", self.alias_base(name));
                let restrictions = self.entity_restrictions(name, Some(alias.as_str()))?;
                let mut node = GroupNode::new(
                    join.navigable_path.clone(),
                    TableReference::Named { table },
                    alias,
                    GroupKind::Entity(name.clone()),
                );
                node.key_columns = vec![id_column];
                node.sqm_alias = join.alias.clone();
                node.join = Some(JoinSpec {
                    join_type: info.join_type,
                    key: None,
                    on: None,
                    restrictions,
                });
                self.attach(parent, node)?
            }
            FromSource::Derived { .. } | FromSource::Cte { .. } => {
                let mut node = self.derived_group(join)?;
                node.sqm_alias = join.alias.clone();
                node.join = Some(JoinSpec {
                    join_type: info.join_type,
                    key: None,
                    on: None,
                    restrictions: Vec::new(),
                });
                self.attach(parent, node)?
            }
            FromSource::Function { name, .. } => {
                return Err(FragmentError::Unsupported(format!(
                    "set-returning function '{name}' in the from clause"
                ))
                .into())
            }
            FromSource::Correlated { .. } => {
                return Err(SqmError::interpretation("correlated node used as a join"))
            }
        };
        self.scope_mut()?.by_from.insert(join.id, group);
        for nested in &join.joins {
            self.register_join(group, nested)?;
        }
        Ok(())
    }

    /// Add `node` as a join of `parent`, which must live in the current block.
    fn attach(&mut self, parent: GroupRef, node: GroupNode) -> SqmResult<GroupRef> {
        if parent.scope != self.current_scope() {
            return Err(SqmError::Semantic(format!(
                "Cannot join '{}' to a from element of an enclosing query",
                node.navigable_path
            )));
        }
        let scope = parent.scope;
        let index = self.scope_mut()?.push(node);
        self.group_mut(parent)?.children.push(index);
        Ok(GroupRef { scope, index })
    }

    /// Translate the `on` predicates below `from`, once every group of the
    /// block is registered.
    pub(super) fn translate_join_predicates(&mut self, from: &SqmFrom) -> SqmResult<()> {
        for join in &from.joins {
            if let Some(on) = join.join.as_ref().and_then(|info| info.on.as_ref()) {
                let predicate = self.predicate(on)?;
                let group = self.lookup_from(join.id)?;
                if let Some(spec) = self.group_mut(group)?.join.as_mut() {
                    spec.on = Some(predicate);
                }
            }
            self.translate_join_predicates(join)?;
        }
        Ok(())
    }

    pub(super) fn association_key(&self, owner: &str, attribute: &str) -> SqmResult<(String, AssociationKey)> {
        let (owner_type, definition) = self.model.find_attribute(owner, attribute).ok_or_else(|| {
            SqmError::UnknownPathElement {
                container: owner.to_string(),
                attribute: attribute.to_string(),
            }
        })?;
        let owner_id = owner_type.id_column().to_string();
        Ok(match &definition.kind {
            AttributeKind::ToOne {
                target,
                join_columns,
                ..
            } => (
                target.clone(),
                AssociationKey {
                    owner: join_columns.clone(),
                    target: vec![self.entity_type(target)?.id_column().to_string()],
                    link: None,
                    order: None,
                },
            ),
            AttributeKind::OneToMany {
                target,
                mapped_by,
                order_by,
            } => {
                let foreign_key = match self.model.find_attribute(target, mapped_by) {
                    Some((_, attribute)) => match &attribute.kind {
                        AttributeKind::ToOne { join_columns, .. } => join_columns.clone(),
                        _ => Vec::new(),
                    },
                    None => Vec::new(),
                };
                if foreign_key.is_empty() {
                    return Err(SqmError::interpretation(format!(
                        "'{target}.{mapped_by}' does not map '{owner}.{attribute}'"
                    )));
                }
                (
                    target.clone(),
                    AssociationKey {
                        owner: vec![owner_id],
                        target: foreign_key,
                        link: None,
                        order: order_by.clone(),
                    },
                )
            }
            AttributeKind::ManyToMany {
                target,
                join_table,
                owner_columns,
                target_columns,
                order_by,
            } => (
                target.clone(),
                AssociationKey {
                    owner: vec![owner_id],
                    target: owner_columns.clone(),
                    link: Some(AssociationTable {
                        table: join_table.clone(),
                        alias: String::new(),
                        owner_columns: owner_columns.clone(),
                        target_columns: target_columns.clone(),
                    }),
                    order: order_by.clone(),
                },
            ),
            AttributeKind::Basic { .. } | AttributeKind::Embedded { .. } => {
                return Err(SqmError::IllegalPathUsage(format!(
                    "'{owner}.{attribute}' is not an association"
                )))
            }
        })
    }

    /// Join an association of `parent`.
    ///
    /// A parent living in an enclosing block cannot take joins; the target
    /// then becomes a root of the current block, correlated through the
    /// where clause.
    pub(super) fn attribute_join(
        &mut self,
        parent: GroupRef,
        attribute: &str,
        treat: Option<&str>,
        join_type: SqmJoinType,
        navigable_path: NavigablePath,
    ) -> SqmResult<GroupRef> {
        let owner = match &self.group(parent)?.kind {
            GroupKind::Entity(entity) => entity.clone(),
            GroupKind::Columns(_) => {
                return Err(SqmError::IllegalPathUsage(format!(
                    "'{navigable_path}' does not navigate an entity"
                )))
            }
        };
        let parent_qualifier = self.qualifier(parent)?;
        let (target, key) = self.association_key(&owner, attribute)?;
        let entity_name = treat.unwrap_or(&target).to_string();
        let entity = self.entity_type(&entity_name)?;
        let (table, target_id) = (entity.table.clone(), entity.id_column().to_string());

        let base = self.alias_base(attribute);
        let alias = match key.link {
            Some(_) => format!("{base}_1"),
            None => format!("{base}_0"),
        };
        let link = key.link.map(|link| AssociationTable {
            alias: format!("{base}_0"),
            ..link
        });
        let restrictions = self.entity_restrictions(&entity_name, Some(alias.as_str()))?;

        let mut node = GroupNode::new(
            navigable_path,
            TableReference::Named { table },
            alias.clone(),
            GroupKind::Entity(entity_name),
        );
        node.key_columns = vec![target_id.clone()];
        node.fetch_order = key.order;

        if parent.scope == self.current_scope() {
            let lhs = key
                .owner
                .iter()
                .map(|c| qualified(parent_qualifier.as_deref(), c))
                .collect();
            let rhs = match &link {
                Some(_) => vec![target_id],
                None => key.target,
            };
            node.association_table = link;
            node.join = Some(JoinSpec {
                join_type,
                key: Some(JoinKey {
                    lhs_columns: lhs,
                    rhs_columns: rhs,
                }),
                on: None,
                restrictions,
            });
            return self.attach(parent, node);
        }

        // correlated: the owner columns are compared in the where clause
        let scope_index = self.current_scope();
        let parent_qualifier = parent_qualifier.as_deref();
        let (correlation, root, target_join) = match link {
            Some(link) => {
                let correlation =
                    correlation(parent_qualifier, &key.owner, &link.alias, &link.owner_columns);
                let link_columns = link
                    .target_columns
                    .iter()
                    .map(|c| format!("{}.{c}", link.alias))
                    .collect();
                let link_node = GroupNode::new(
                    node.navigable_path.append("{link}", None),
                    TableReference::Named { table: link.table },
                    link.alias,
                    GroupKind::Columns(
                        link.owner_columns
                            .into_iter()
                            .chain(link.target_columns)
                            .collect(),
                    ),
                );
                node.join = Some(JoinSpec {
                    join_type: SqmJoinType::Inner,
                    key: Some(JoinKey {
                        lhs_columns: link_columns,
                        rhs_columns: vec![target_id],
                    }),
                    on: None,
                    restrictions,
                });
                (correlation, link_node, Some(node))
            }
            None => {
                let mut correlation = correlation(parent_qualifier, &key.owner, &alias, &key.target);
                correlation.extend(restrictions);
                (correlation, node, None)
            }
        };
        let scope = self.scope_mut()?;
        for predicate in correlation {
            scope.add_restriction(predicate);
        }
        let root_index = scope.push(root);
        scope.roots.push(root_index);
        let root = GroupRef {
            scope: scope_index,
            index: root_index,
        };
        match target_join {
            Some(target) => self.attach(root, target),
            None => Ok(root),
        }
    }

    /// The join navigating `attribute` of `parent`, created on first use.
    pub(super) fn implicit_join(
        &mut self,
        parent: GroupRef,
        attribute: &str,
        path: &NavigablePath,
    ) -> SqmResult<GroupRef> {
        let scope_index = self.current_scope();
        let scope = self.scope_mut()?;
        if let Some(&index) = scope.implicit.get(path) {
            return Ok(GroupRef {
                scope: scope_index,
                index,
            });
        }
        if !scope.allow_implicit_joins {
            return Err(SqmError::Semantic(format!(
                "Implicit join '{path}' is not allowed in a mutation statement"
            )));
        }
        let group = self.attribute_join(parent, attribute, None, SqmJoinType::Inner, path.clone())?;
        self.scope_mut()?.implicit.insert(path.clone(), group.index);
        Ok(group)
    }
}

/// `outer.owner = qualifier.column` for each column pair.
pub(super) fn correlation(
    outer: Option<&str>,
    owner: &[String],
    qualifier: &str,
    columns: &[String],
) -> Vec<Predicate> {
    owner
        .iter()
        .zip(columns)
        .map(|(o, c)| Predicate::Comparison {
            lhs: Expression::column(outer, o),
            op: ComparisonOperator::Equal,
            rhs: Expression::Column(ColumnReference::new(qualifier, c.as_str())),
        })
        .collect()
}

fn qualified(qualifier: Option<&str>, column: &str) -> String {
    match qualifier {
        Some(q) => format!("{q}.{column}"),
        None => column.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::sql;

    #[test]
    fn test_explicit_many_to_one_join() {
        insta::assert_snapshot!(
            sql("select a.name from Publication p join p.author a"),
            @"select a1_0.name from publication p1_0 inner join person a1_0 on p1_0.author_id=a1_0.id"
        );
    }

    #[test]
    fn test_left_join_with_on() {
        insta::assert_snapshot!(
            sql("select p.title from Publication p left join p.author a on a.name = :name"),
            @"select p1_0.title from publication p1_0 left outer join person a1_0 on p1_0.author_id=a1_0.id and a1_0.name=?"
        );
    }

    #[test]
    fn test_many_to_many_join_uses_link_table() {
        insta::assert_snapshot!(
            sql("select t.name from Publication p join p.tags t"),
            @"select t1_1.name from publication p1_0 inner join publication_tags t1_0 on p1_0.id=t1_0.publication_id inner join tag t1_1 on t1_0.tag_id=t1_1.id and (t1_1.active = 1)"
        );
    }

    #[test]
    fn test_one_to_many_join() {
        insta::assert_snapshot!(
            sql("select p.title from Person a join a.publications p"),
            @"select p2_0.title from person p1_0 inner join publication p2_0 on p1_0.id=p2_0.author_id"
        );
    }

    #[test]
    fn test_implicit_join_is_reused() {
        insta::assert_snapshot!(
            sql("select p.author.name from Publication p where p.author.name like 'A%'"),
            @"select a1_0.name from publication p1_0 inner join person a1_0 on p1_0.author_id=a1_0.id where a1_0.name like 'A%'"
        );
    }

    #[test]
    fn test_treated_join_restricts_discriminator() {
        insta::assert_snapshot!(
            sql("select n.genre from Person a join treat(a.publications as Novel) n"),
            @"select p2_0.genre from person p1_0 inner join publication p2_0 on p1_0.id=p2_0.author_id and p2_0.kind='Novel'"
        );
    }

    #[test]
    fn test_cross_join_of_second_root() {
        insta::assert_snapshot!(
            sql("select p.title from Publication p, Tag t where t.name = p.title"),
            @"select p1_0.title from publication p1_0 cross join tag t1_0 where t1_0.name=p1_0.title and (t1_0.active = 1)"
        );
    }
}
