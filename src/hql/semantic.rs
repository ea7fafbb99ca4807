//! Lowering of the HQL syntax tree to SQM.
//!
//! Names are resolved against the domain model here: aliases through a
//! stack of query scopes, attribute paths through [`SqmPath::get`], entity
//! names through the model. Association dereferences stay paths; the
//! translator turns them into joins.

use std::collections::HashMap;

use tracing::trace;

use super::ast::{
    self, BinaryOp, Expr, ExprKind, FromRoot, Ident, InsertValues, JoinTarget, Literal, Parameter,
    PathExpr, PathRoot, Predicate, PredicateKind, QuantifierKind, QueryBody, QueryExpression,
    RootSource, SelectItem, Selectable, SortItem, Statement,
};
use crate::metamodel::DomainModel;
use crate::sql::dialect::helpers::{lookup_function, JPA_FUNCTIONS};
use crate::sqm::error::{SqmError, SqmResult, StrictJpaViolation};
use crate::sqm::expression::{
    LiteralValue, ParamLabel, SqmExpression, SqmFrame, SqmFrameBound, SqmWindow,
};
use crate::sqm::from::{FromSource, JoinInfo, SqmFrom};
use crate::sqm::operator::{CastType, FetchClauseType, SqmJoinType};
use crate::sqm::path::{DerivedColumn, FromId, NavigablePath, ParamId, PathKind, SqmPath};
use crate::sqm::predicate::SqmPredicate;
use crate::sqm::statement::{
    SqmCte, SqmDeleteStatement, SqmInsertSource, SqmInsertStatement, SqmQuery, SqmQueryPart,
    SqmQuerySource, SqmQuerySpec, SqmSelectStatement, SqmSelectable, SqmSelection, SqmSortSpec,
    SqmStatement, SqmUpdateStatement,
};
use crate::sqm::types::{BasicType, SqmExpressible};
use crate::sqm::NodeBuilder;

/// Options that change how a query is interpreted.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpretOptions {
    /// Reject HQL extensions that JPQL does not allow.
    pub strict_jpa_compliance: bool,
}

/// Lower a parsed statement to SQM.
pub fn build_statement(
    statement: &Statement,
    model: &dyn DomainModel,
    options: InterpretOptions,
) -> SqmResult<SqmStatement> {
    let mut builder = SemanticBuilder::new(model, options);
    let statement = match statement {
        Statement::Select(select) => SqmStatement::Select(builder.select_statement(select)?),
        Statement::Update(update) => SqmStatement::Update(builder.update(update)?),
        Statement::Delete(delete) => SqmStatement::Delete(builder.delete(delete)?),
        Statement::Insert(insert) => SqmStatement::Insert(builder.insert(insert)?),
    };
    builder.check_positional_parameters()?;
    Ok(statement)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    From,
    On,
    Select,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Set,
    Values,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ParamKey {
    Named(String),
    Positional(u32),
}

/// A from node visible by alias (or implicitly) in a query block.
struct Binding {
    alias: Option<String>,
    path: SqmPath,
}

#[derive(Default)]
struct Scope {
    bindings: Vec<Binding>,
    result_aliases: Vec<(String, SqmExpression)>,
}

struct SemanticBuilder<'m> {
    nb: NodeBuilder<'m>,
    options: InterpretOptions,
    scopes: Vec<Scope>,
    ctes: Vec<(String, Vec<DerivedColumn>)>,
    parameters: HashMap<ParamKey, ParamId>,
    clause: Clause,
}

impl<'m> SemanticBuilder<'m> {
    fn new(model: &'m dyn DomainModel, options: InterpretOptions) -> Self {
        Self {
            nb: NodeBuilder::new(model),
            options,
            scopes: Vec::new(),
            ctes: Vec::new(),
            parameters: HashMap::new(),
            clause: Clause::Select,
        }
    }

    fn model(&self) -> &'m dyn DomainModel {
        self.nb.model()
    }

    fn strict(&self, violation: StrictJpaViolation) -> SqmResult<()> {
        if self.options.strict_jpa_compliance {
            Err(SqmError::StrictJpaViolation(violation))
        } else {
            Ok(())
        }
    }

    /// Run `f` with a fresh innermost scope; the clause is restored after.
    fn in_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> SqmResult<T>) -> SqmResult<T> {
        let clause = self.clause;
        self.scopes.push(Scope::default());
        let result = f(self);
        self.scopes.pop();
        self.clause = clause;
        result
    }

    fn scope_mut(&mut self) -> SqmResult<&mut Scope> {
        self.scopes
            .last_mut()
            .ok_or_else(|| SqmError::interpretation("no query scope is active"))
    }

    fn bind(&mut self, from: &SqmFrom) -> SqmResult<()> {
        trace!(alias = ?from.alias, path = %from.navigable_path, "registered from element");
        let binding = Binding {
            alias: from.alias.clone(),
            path: from.path(),
        };
        self.scope_mut()?.bindings.push(binding);
        Ok(())
    }

    fn check_from_alias(&self, alias: Option<&str>) -> SqmResult<()> {
        let Some(alias) = alias else { return Ok(()) };
        let taken = self.scopes.last().is_some_and(|scope| {
            scope
                .bindings
                .iter()
                .any(|b| b.alias.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(alias)))
        });
        if taken {
            return Err(SqmError::AliasCollision {
                alias: alias.to_string(),
                context: "from clause".into(),
            });
        }
        Ok(())
    }

    /// Innermost binding with this alias.
    fn lookup_alias(&self, alias: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| {
            scope
                .bindings
                .iter()
                .find(|b| b.alias.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(alias)))
        })
    }

    /// The single from node of the innermost scope that has `attribute`.
    fn implicit_alias(&self, attribute: &str) -> SqmResult<Option<SqmPath>> {
        for scope in self.scopes.iter().rev() {
            let candidates: Vec<&Binding> = scope
                .bindings
                .iter()
                .filter(|b| self.has_attribute(&b.path, attribute))
                .collect();
            match candidates.as_slice() {
                [] => continue,
                [single] => return Ok(Some(single.path.clone())),
                _ => {
                    return Err(SqmError::Semantic(format!(
                        "Unqualified attribute '{attribute}' is ambiguous; qualify it with an alias"
                    )))
                }
            }
        }
        Ok(None)
    }

    fn has_attribute(&self, path: &SqmPath, attribute: &str) -> bool {
        match &path.kind {
            PathKind::Entity { entity } => {
                self.model().find_attribute(entity, attribute).is_some()
            }
            PathKind::Derived { columns } => {
                columns.iter().any(|c| c.name == attribute)
            }
            _ => false,
        }
    }

    fn cte_columns(&self, name: &str) -> Option<&Vec<DerivedColumn>> {
        self.ctes
            .iter()
            .rev()
            .find(|(cte, _)| cte.eq_ignore_ascii_case(name))
            .map(|(_, columns)| columns)
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn select_statement(&mut self, select: &ast::SelectStatement) -> SqmResult<SqmSelectStatement> {
        if !select.ctes.is_empty() {
            self.strict(StrictJpaViolation::CteQuery)?;
        }
        let mut ctes = Vec::new();
        for cte in &select.ctes {
            let query = self.query_expression(&cte.query)?;
            let columns = derived_columns(&query, &cte.columns)?;
            self.ctes.push((cte.name.value.clone(), columns.clone()));
            ctes.push(SqmCte {
                name: cte.name.value.clone(),
                columns: columns.into_iter().map(|c| c.name).collect(),
                query,
            });
        }
        let query = self.query_expression(&select.query)?;
        Ok(SqmSelectStatement {
            ctes,
            query,
            source: SqmQuerySource::Hql,
        })
    }

    fn update(&mut self, update: &ast::UpdateStatement) -> SqmResult<SqmUpdateStatement> {
        let nb = self.nb;
        let mut statement = nb.create_update(&update.entity, alias_of(&update.alias))?;
        statement.source = SqmQuerySource::Hql;
        statement.versioned = update.versioned;
        if update.versioned && !self.is_versioned(statement.target.entity.as_deref()) {
            return Err(SqmError::Semantic(format!(
                "Entity '{}' is not versioned; 'update versioned' requires a version attribute",
                update.entity.value
            )));
        }

        self.in_scope(|this| {
            this.bind(&statement.target)?;
            this.clause = Clause::Set;
            for assignment in &update.assignments {
                let path = this.resolve_path(&assignment.path)?;
                let value = this.expression(&assignment.value)?;
                statement.assignments.push(nb.assignment(path, value)?);
            }
            this.clause = Clause::Where;
            statement.where_ = this.optional_predicate(update.where_.as_ref())?;
            Ok(())
        })?;
        Ok(statement)
    }

    fn is_versioned(&self, entity: Option<&str>) -> bool {
        let Some(entity) = entity else { return false };
        let model = self.model();
        model.entity(entity).is_some_and(|e| e.version.is_some())
            || model.root_entity(entity).is_some_and(|e| e.version.is_some())
    }

    fn delete(&mut self, delete: &ast::DeleteStatement) -> SqmResult<SqmDeleteStatement> {
        let mut statement = self
            .nb
            .create_delete(&delete.entity, alias_of(&delete.alias))?;
        statement.source = SqmQuerySource::Hql;
        self.in_scope(|this| {
            this.bind(&statement.target)?;
            this.clause = Clause::Where;
            statement.where_ = this.optional_predicate(delete.where_.as_ref())?;
            Ok(())
        })?;
        Ok(statement)
    }

    fn insert(&mut self, insert: &ast::InsertStatement) -> SqmResult<SqmInsertStatement> {
        let target = self.nb.from(&insert.entity, None)?;
        let paths = self.in_scope(|this| {
            this.bind(&target)?;
            this.clause = Clause::Set;
            insert
                .paths
                .iter()
                .map(|p| this.resolve_path(p))
                .collect::<SqmResult<Vec<_>>>()
        })?;
        for path in &paths {
            if !path.is_terminal() && path.entity_name().is_none() {
                return Err(SqmError::IllegalPathUsage(format!(
                    "'{}' cannot be an insert target",
                    path.navigable_path
                )));
            }
        }

        let values = match &insert.values {
            InsertValues::Rows(rows) => {
                self.strict(StrictJpaViolation::ValuesInsert)?;
                let clause = self.clause;
                self.clause = Clause::Values;
                let mut lowered = Vec::with_capacity(rows.len());
                for row in rows {
                    if row.len() != paths.len() {
                        return Err(SqmError::Semantic(format!(
                            "Expected {} values in insert row but found {}",
                            paths.len(),
                            row.len()
                        )));
                    }
                    let mut values = Vec::with_capacity(row.len());
                    for (value, path) in row.iter().zip(&paths) {
                        let mut value = self.expression(value)?;
                        value.infer_type(path.expressible.as_ref());
                        values.push(value);
                    }
                    lowered.push(values);
                }
                self.clause = clause;
                SqmInsertSource::Values(lowered)
            }
            InsertValues::Query(query) => {
                let query = self.query_expression(query)?;
                let selected = query
                    .first_spec()
                    .map_or(0, |spec| spec.select.selections.len());
                if selected != paths.len() {
                    return Err(SqmError::Semantic(format!(
                        "Insert of {} attributes cannot take a query selecting {selected} items",
                        paths.len()
                    )));
                }
                SqmInsertSource::Select(query)
            }
        };

        Ok(SqmInsertStatement {
            target,
            paths,
            values,
            source: SqmQuerySource::Hql,
        })
    }

    fn check_positional_parameters(&self) -> SqmResult<()> {
        let mut positions: Vec<u32> = self
            .parameters
            .keys()
            .filter_map(|key| match key {
                ParamKey::Positional(p) => Some(*p),
                ParamKey::Named(_) => None,
            })
            .collect();
        positions.sort_unstable();
        for (index, position) in positions.iter().enumerate() {
            let expected = index as u32 + 1;
            if *position != expected {
                return Err(SqmError::Semantic(format!(
                    "Gap between positional parameters: ?{expected} is never used"
                )));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn query_expression(&mut self, query: &QueryExpression) -> SqmResult<SqmQuery> {
        if query.has_limit() {
            self.strict(StrictJpaViolation::LimitOffset)?;
        }
        let mut lowered = match &query.body {
            QueryBody::Spec(spec) => self.in_scope(|this| {
                let spec = this.query_spec(spec)?;
                this.clause = Clause::OrderBy;
                let order_by = this.sort_items(&query.order_by)?;
                let mut lowered = SqmQuery::new(spec);
                lowered.order_by = order_by;
                Ok(lowered)
            })?,
            QueryBody::SetOperation { op, parts } => {
                self.strict(StrictJpaViolation::SetOperations)?;
                let parts = parts
                    .iter()
                    .map(|part| self.query_expression(part))
                    .collect::<SqmResult<Vec<_>>>()?;
                check_set_arity(&parts)?;
                let order_by = set_sort_items(&parts, &query.order_by, self.nb)?;
                SqmQuery {
                    part: SqmQueryPart::Group { op: *op, parts },
                    order_by,
                    offset: None,
                    fetch: None,
                    fetch_type: FetchClauseType::RowsOnly,
                }
            }
        };

        if let Some(offset) = &query.offset {
            lowered.offset = Some(self.row_count(offset)?);
        }
        if let Some(limit) = &query.limit {
            lowered.fetch = Some(self.row_count(limit)?);
        }
        if let Some(fetch) = &query.fetch {
            lowered.fetch = Some(self.row_count(&fetch.count)?);
            lowered.fetch_type = fetch.kind;
        }
        Ok(lowered)
    }

    fn row_count(&mut self, expr: &Expr) -> SqmResult<SqmExpression> {
        let mut count = self.expression(expr)?;
        count.infer_type(Some(&BasicType::Integer.into()));
        Ok(count)
    }

    fn query_spec(&mut self, spec: &ast::QuerySpec) -> SqmResult<SqmQuerySpec> {
        let mut lowered = self.nb.create_query();

        self.clause = Clause::From;
        for root in &spec.from {
            self.from_root(root, &mut lowered)?;
        }

        self.clause = Clause::Select;
        match &spec.select {
            Some(select) => {
                lowered.select.distinct = select.distinct;
                for item in &select.items {
                    let selection = self.select_item(item)?;
                    self.register_result_alias(&selection)?;
                    lowered.add_selection(selection);
                }
            }
            None => {
                self.strict(StrictJpaViolation::ImplicitSelect)?;
                let roots: Vec<SqmExpression> = lowered
                    .from
                    .iter()
                    .map(|root| SqmExpression::Path(root.path()))
                    .collect();
                for root in roots {
                    lowered.add_selection(SqmSelection::expression(root));
                }
            }
        }

        self.clause = Clause::Where;
        lowered.where_ = self.optional_predicate(spec.where_.as_ref())?;

        self.clause = Clause::GroupBy;
        lowered.group_by = spec
            .group_by
            .iter()
            .map(|e| self.expression(e))
            .collect::<SqmResult<Vec<_>>>()?;

        self.clause = Clause::Having;
        lowered.having = self.optional_predicate(spec.having.as_ref())?;
        Ok(lowered)
    }

    fn register_result_alias(&mut self, selection: &SqmSelection) -> SqmResult<()> {
        let Some(alias) = &selection.alias else { return Ok(()) };
        let collides_with_from = self.lookup_alias(alias).is_some();
        let scope = self.scope_mut()?;
        if collides_with_from
            || scope
                .result_aliases
                .iter()
                .any(|(a, _)| a.eq_ignore_ascii_case(alias))
        {
            return Err(SqmError::AliasCollision {
                alias: alias.clone(),
                context: "select clause".into(),
            });
        }
        if let SqmSelectable::Expression(expr) = &selection.item {
            scope.result_aliases.push((alias.clone(), expr.clone()));
        }
        Ok(())
    }

    fn select_item(&mut self, item: &SelectItem) -> SqmResult<SqmSelection> {
        let nb = self.nb;
        let selection = match &item.value {
            Selectable::Expr(Expr {
                kind: ExprKind::Star,
                ..
            }) => {
                return Err(SqmError::Semantic(
                    "'*' is only allowed as the argument of count()".into(),
                ))
            }
            Selectable::Expr(expr) => SqmSelection::expression(self.expression(expr)?),
            Selectable::Instantiation { target, arguments } => {
                let arguments = arguments
                    .iter()
                    .map(|a| self.select_item(a))
                    .collect::<SqmResult<Vec<_>>>()?;
                match target.value.to_ascii_lowercase().as_str() {
                    "list" => nb.list(arguments),
                    "map" => nb.map(arguments),
                    _ => nb.construct(&target.value, arguments),
                }
            }
        };
        Ok(match &item.alias {
            Some(alias) => selection.with_alias(alias.value.clone()),
            None => selection,
        })
    }

    fn sort_items(&mut self, items: &[SortItem]) -> SqmResult<Vec<SqmSortSpec>> {
        items
            .iter()
            .map(|item| {
                Ok(SqmSortSpec {
                    expr: self.expression(&item.expr)?,
                    direction: item.direction,
                    nulls: item.nulls,
                })
            })
            .collect()
    }

    // ========================================================================
    // From clause
    // ========================================================================

    fn from_root(&mut self, root: &FromRoot, spec: &mut SqmQuerySpec) -> SqmResult<()> {
        let alias = alias_of(&root.alias);
        self.check_from_alias(alias)?;
        let from = match &root.source {
            RootSource::Entity(name) => match self.cte_columns(name) {
                Some(columns) => derived_from(
                    FromSource::Cte {
                        name: name.value.clone(),
                        columns: columns.clone(),
                    },
                    &name.value,
                    alias,
                ),
                None => self.nb.from(name, alias)?,
            },
            RootSource::Subquery { query, lateral } => {
                self.strict(StrictJpaViolation::FromSubquery)?;
                let query = self.query_expression(query)?;
                let columns = derived_columns(&query, &[])?;
                derived_from(
                    FromSource::Derived {
                        query: Box::new(query),
                        lateral: *lateral,
                        columns,
                    },
                    "derived",
                    alias,
                )
            }
        };
        let root_id = from.id;
        self.bind(&from)?;
        spec.add_root(from)?;
        for join in &root.joins {
            self.join(join, root_id, spec)?;
        }
        Ok(())
    }

    fn is_entity_join(&self, path: &PathExpr) -> bool {
        match &path.root {
            PathRoot::Ident(name) if path.segments.is_empty() => self.lookup_alias(name).is_none(),
            _ => false,
        }
    }

    fn join(&mut self, join: &ast::Join, root_id: FromId, spec: &mut SqmQuerySpec) -> SqmResult<()> {
        let nb = self.nb;
        let alias = alias_of(&join.alias);
        self.check_from_alias(alias)?;
        if join.fetch && alias.is_some() {
            self.strict(StrictJpaViolation::AliasedFetchJoin)?;
        }
        let is_cross = join.join_type == SqmJoinType::Cross;

        let (parent, mut from) = match &join.target {
            JoinTarget::Path(path) if self.is_entity_join(path) => {
                let PathRoot::Ident(name) = &path.root else {
                    return Err(SqmError::interpretation("entity join without an entity name"));
                };
                if join.fetch {
                    return Err(SqmError::Semantic(format!(
                        "Entity join to '{}' cannot be fetched",
                        name.value
                    )));
                }
                let from = if is_cross {
                    self.strict(StrictJpaViolation::CrossJoin)?;
                    nb.cross_join(name, alias)?
                } else {
                    if join.on.is_none() {
                        return Err(SqmError::Semantic(format!(
                            "Entity join to '{}' requires an 'on' clause",
                            name.value
                        )));
                    }
                    nb.entity_join(name, alias, join.join_type, None)?
                };
                (root_id, from)
            }
            JoinTarget::Path(path) | JoinTarget::Treat { path, .. } => {
                if is_cross {
                    return Err(SqmError::Semantic(format!(
                        "Cross join requires an entity name, '{}' is a path",
                        path.dotted()
                    )));
                }
                let treat = match &join.target {
                    JoinTarget::Treat { entity, .. } => Some(entity.value.as_str()),
                    _ => None,
                };
                let (parent, attribute) = self.join_parent(path, spec)?;
                let parent_from = spec
                    .find_from(parent)
                    .ok_or_else(|| SqmError::interpretation("join parent vanished"))?;
                let from = nb.attribute_join(
                    parent_from,
                    &attribute,
                    treat,
                    join.join_type,
                    alias,
                    join.fetch,
                )?;
                (parent, from)
            }
            JoinTarget::Subquery { query, lateral } => {
                self.strict(StrictJpaViolation::FromSubquery)?;
                let query = self.query_expression(query)?;
                let columns = derived_columns(&query, &[])?;
                let mut from = derived_from(
                    FromSource::Derived {
                        query: Box::new(query),
                        lateral: *lateral,
                        columns,
                    },
                    "derived",
                    alias,
                );
                from.join = Some(JoinInfo {
                    join_type: join.join_type,
                    fetch: false,
                    on: None,
                });
                (root_id, from)
            }
        };

        self.bind(&from)?;
        if let Some(on) = &join.on {
            if is_cross {
                return Err(SqmError::Semantic("Cross joins cannot have an 'on' clause".into()));
            }
            self.clause = Clause::On;
            let predicate = self.predicate(on)?;
            from.apply_on(predicate);
            self.clause = Clause::From;
        }
        spec.add_join(parent, from)
    }

    /// Resolve the owner of the joined attribute, adding unaliased inner
    /// joins for intermediate associations (`b.author.publications`).
    fn join_parent(
        &mut self,
        path: &PathExpr,
        spec: &mut SqmQuerySpec,
    ) -> SqmResult<(FromId, String)> {
        let PathRoot::Ident(root) = &path.root else {
            return Err(SqmError::Semantic(format!(
                "treat() cannot start a join path: '{}'",
                path.dotted()
            )));
        };
        let Some((last, intermediate)) = path.segments.split_last() else {
            return Err(SqmError::Semantic(format!(
                "Join path '{}' names no attribute",
                path.dotted()
            )));
        };
        let mut parent = self
            .scopes
            .last()
            .and_then(|scope| {
                scope
                    .bindings
                    .iter()
                    .find(|b| b.alias.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(root)))
            })
            .map(|b| b.path.lhs)
            .ok_or_else(|| SqmError::UnknownAlias(root.value.clone()))?;

        for segment in intermediate {
            let parent_from = spec
                .find_from(parent)
                .ok_or_else(|| SqmError::interpretation("join parent vanished"))?;
            let existing = parent_from.joins.iter().find(|j| {
                j.alias.is_none()
                    && matches!(&j.source, FromSource::Attribute { attribute, treat: None } if attribute == &segment.value)
            });
            parent = match existing {
                Some(join) => join.id,
                None => {
                    let join = self.nb.attribute_join(
                        parent_from,
                        segment,
                        None,
                        SqmJoinType::Inner,
                        None,
                        false,
                    )?;
                    let id = join.id;
                    spec.add_join(parent, join)?;
                    id
                }
            };
        }
        Ok((parent, last.value.clone()))
    }

    // ========================================================================
    // Paths
    // ========================================================================

    /// A path that must resolve to a navigable reference.
    fn resolve_path(&mut self, path: &PathExpr) -> SqmResult<SqmPath> {
        let base = match &path.root {
            PathRoot::Treat { path: inner, entity } => {
                if !matches!(self.clause, Clause::From | Clause::On | Clause::Where) {
                    self.strict(StrictJpaViolation::NonJpaTreat)?;
                }
                let inner = self.resolve_path(inner)?;
                self.nb.treat(&inner, entity)?
            }
            PathRoot::Ident(root) => {
                if let Some(binding) = self.lookup_alias(root) {
                    binding.path.clone()
                } else if let Some(base) = self.implicit_alias(root)? {
                    base.get(self.model(), root)?
                } else if path.segments.is_empty() {
                    return Err(SqmError::Semantic(format!(
                        "Could not interpret path expression '{}'",
                        root.value
                    )));
                } else {
                    return Err(SqmError::UnknownAlias(root.value.clone()));
                }
            }
        };
        let model = self.model();
        path.segments
            .iter()
            .try_fold(base, |p, segment| p.get(model, segment))
    }

    /// A path in expression position: also result aliases, entity names and
    /// parenthesis-free functions such as `current_date`.
    fn path_expression(&mut self, path: &PathExpr) -> SqmResult<SqmExpression> {
        if let (PathRoot::Ident(root), true) = (&path.root, path.segments.is_empty()) {
            if self.lookup_alias(root).is_none() {
                if self.clause == Clause::OrderBy {
                    let result = self.scopes.last().and_then(|scope| {
                        scope
                            .result_aliases
                            .iter()
                            .find(|(alias, _)| alias.eq_ignore_ascii_case(root))
                            .map(|(_, expr)| expr.clone())
                    });
                    if let Some(expr) = result {
                        return Ok(expr);
                    }
                }
                if let Some(function) =
                    lookup_function(root, &[]).filter(|f| !f.has_parens_if_no_args)
                {
                    return Ok(self.nb.function(function.name, Vec::new()));
                }
                if self.model().entity(root).is_some() && self.implicit_alias(root)?.is_none() {
                    return self.nb.entity_type_literal(root);
                }
            }
        }
        self.resolve_path(path).map(SqmExpression::Path)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn parameter(&mut self, parameter: &Parameter) -> SqmResult<SqmExpression> {
        let (key, label) = match parameter {
            Parameter::Named(name) => (ParamKey::Named(name.clone()), ParamLabel::Named(name.clone())),
            Parameter::Positional(position) => (
                ParamKey::Positional(*position),
                ParamLabel::Positional(*position),
            ),
        };
        let mixed = self.parameters.keys().any(|existing| {
            matches!(
                (existing, &key),
                (ParamKey::Named(_), ParamKey::Positional(_))
                    | (ParamKey::Positional(_), ParamKey::Named(_))
            )
        });
        if mixed {
            return Err(SqmError::Semantic(
                "Cannot mix named and positional parameters in one query".into(),
            ));
        }
        let id = *self.parameters.entry(key).or_insert_with(ParamId::next);
        Ok(SqmExpression::Parameter {
            id,
            label,
            expressible: None,
        })
    }

    fn literal(&self, literal: &Literal) -> SqmResult<SqmExpression> {
        Ok(match literal {
            Literal::Null => self.nb.null_literal(),
            Literal::Boolean(value) => self.nb.literal(*value),
            Literal::Number(text) => self.nb.numeric_literal(text)?,
            Literal::String(text) => self.nb.literal(text.as_str()),
        })
    }

    fn expression(&mut self, expr: &Expr) -> SqmResult<SqmExpression> {
        let nb = self.nb;
        Ok(match &expr.kind {
            ExprKind::Path(path) => self.path_expression(path)?,
            ExprKind::Literal(literal) => self.literal(literal)?,
            ExprKind::Parameter(parameter) => self.parameter(parameter)?,
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.expression(lhs)?;
                let rhs = self.expression(rhs)?;
                match op {
                    BinaryOp::Add => nb.sum(lhs, rhs)?,
                    BinaryOp::Subtract => nb.diff(lhs, rhs)?,
                    BinaryOp::Multiply => nb.prod(lhs, rhs)?,
                    BinaryOp::Divide => nb.div(lhs, rhs)?,
                    BinaryOp::Modulo => nb.modulo(lhs, rhs)?,
                    BinaryOp::Concat => nb.concat(lhs, rhs),
                }
            }
            ExprKind::Negate(operand) => {
                let operand = self.expression(operand)?;
                nb.neg(operand)
            }
            ExprKind::Function(call) => self.function(call)?,
            ExprKind::CaseSearched { whens, otherwise } => {
                let mut case = nb.select_case();
                for (when, then) in whens {
                    let when = self.predicate(when)?;
                    let then = self.expression(then)?;
                    case = case.when(when, then);
                }
                match otherwise {
                    Some(otherwise) => case.otherwise(self.expression(otherwise)?),
                    None => case.end(),
                }
            }
            ExprKind::CaseSimple {
                operand,
                whens,
                otherwise,
            } => {
                let mut case = nb.simple_case(self.expression(operand)?);
                for (when, then) in whens {
                    let when = self.expression(when)?;
                    let then = self.expression(then)?;
                    case = case.when(when, then);
                }
                match otherwise {
                    Some(otherwise) => case.otherwise(self.expression(otherwise)?),
                    None => case.end(),
                }
            }
            ExprKind::Cast { expr, target } => {
                let cast_type = CastType::from_type_name(target).ok_or_else(|| {
                    SqmError::Semantic(format!("Unknown cast target type '{}'", target.value))
                })?;
                nb.cast(self.expression(expr)?, cast_type)
            }
            ExprKind::Trim {
                spec,
                character,
                source,
            } => {
                let character = match character {
                    Some(c) => Some(self.expression(c)?),
                    None => None,
                };
                nb.trim(*spec, character, self.expression(source)?)
            }
            ExprKind::Extract { field, source } => SqmExpression::Extract {
                field: field.value.to_ascii_lowercase(),
                source: Box::new(self.expression(source)?),
            },
            ExprKind::Type(path) => {
                let path = self.resolve_path(path)?;
                nb.type_of(&path)?
            }
            ExprKind::Size(path) => {
                let path = self.resolve_path(path)?;
                nb.size(&path)?
            }
            ExprKind::Tuple(items) => nb.row(
                items
                    .iter()
                    .map(|i| self.expression(i))
                    .collect::<SqmResult<Vec<_>>>()?,
            ),
            ExprKind::Subquery(query) => {
                SqmExpression::Subquery(Box::new(self.query_expression(query)?))
            }
            ExprKind::Quantified { quantifier, query } => {
                let query = self.query_expression(query)?;
                match quantifier {
                    QuantifierKind::All => nb.all(query),
                    QuantifierKind::Any => nb.any(query),
                }
            }
            ExprKind::Star => {
                return Err(SqmError::Semantic(
                    "'*' is only allowed as the argument of count()".into(),
                ))
            }
        })
    }

    fn function(&mut self, call: &ast::FunctionCall) -> SqmResult<SqmExpression> {
        let name = call.name.value.to_ascii_lowercase();
        if !JPA_FUNCTIONS.contains(&name.as_str()) {
            self.strict(StrictJpaViolation::FunctionCall)?;
        }
        let mut arguments = Vec::with_capacity(call.arguments.len());
        for argument in &call.arguments {
            arguments.push(match argument.kind {
                ExprKind::Star if name == "count" && call.arguments.len() == 1 => {
                    SqmExpression::Star
                }
                _ => self.expression(argument)?,
            });
        }

        let mut function = self.nb.function(&name, arguments);
        if let SqmExpression::Function(f) = &mut function {
            f.distinct = call.distinct;
            if let Some(filter) = &call.filter {
                self.strict(StrictJpaViolation::Filter)?;
                f.filter = Some(self.predicate(filter)?);
            }
            if let Some(window) = &call.over {
                self.strict(StrictJpaViolation::WindowFunction)?;
                f.over = Some(self.window(window)?);
            }
        }
        Ok(function)
    }

    fn window(&mut self, window: &ast::Window) -> SqmResult<SqmWindow> {
        let partition_by = window
            .partition_by
            .iter()
            .map(|e| self.expression(e))
            .collect::<SqmResult<Vec<_>>>()?;
        let order_by = self.sort_items(&window.order_by)?;
        let frame = match &window.frame {
            Some(frame) => Some(SqmFrame {
                mode: frame.mode,
                start: self.frame_bound(&frame.start)?,
                end: match &frame.end {
                    Some(end) => Some(self.frame_bound(end)?),
                    None => None,
                },
                exclusion: frame.exclusion,
            }),
            None => None,
        };
        Ok(SqmWindow {
            partition_by,
            order_by,
            frame,
        })
    }

    fn frame_bound(&mut self, bound: &ast::FrameBound) -> SqmResult<SqmFrameBound> {
        let offset = match &bound.offset {
            Some(offset) => Some(Box::new(self.expression(offset)?)),
            None => None,
        };
        Ok(SqmFrameBound {
            kind: bound.kind,
            offset,
        })
    }

    // ========================================================================
    // Predicates
    // ========================================================================

    fn optional_predicate(&mut self, predicate: Option<&Predicate>) -> SqmResult<Option<SqmPredicate>> {
        predicate.map(|p| self.predicate(p)).transpose()
    }

    fn predicate(&mut self, predicate: &Predicate) -> SqmResult<SqmPredicate> {
        let nb = self.nb;
        let lowered = match &predicate.kind {
            PredicateKind::Comparison { lhs, op, rhs } => {
                let lhs = self.expression(lhs)?;
                let rhs = self.expression(rhs)?;
                nb.compare(lhs, *op, rhs)?
            }
            PredicateKind::Between {
                expr,
                lower,
                upper,
                negated,
            } => {
                let expr = self.expression(expr)?;
                let lower = self.expression(lower)?;
                let upper = self.expression(upper)?;
                negate_if(nb.between(expr, lower, upper)?, *negated)
            }
            PredicateKind::Like {
                expr,
                pattern,
                escape,
                negated,
                case_sensitive,
            } => {
                let expr = self.expression(expr)?;
                let pattern = self.expression(pattern)?;
                let escape = match escape {
                    Some(e) => Some(self.expression(e)?),
                    None => None,
                };
                let mut like = nb.like(expr, pattern, escape);
                if let SqmPredicate::Like {
                    case_sensitive: sensitive,
                    ..
                } = &mut like
                {
                    *sensitive = *case_sensitive;
                }
                negate_if(like, *negated)
            }
            PredicateKind::IsNull { expr, negated } => {
                let expr = self.expression(expr)?;
                negate_if(nb.is_null(expr), *negated)
            }
            PredicateKind::IsEmpty { path, negated } => {
                let path = self.resolve_path(path)?;
                negate_if(nb.is_empty(&path)?, *negated)
            }
            PredicateKind::InList {
                expr,
                list,
                negated,
            } => {
                let expr = self.expression(expr)?;
                let list = list
                    .iter()
                    .map(|e| self.expression(e))
                    .collect::<SqmResult<Vec<_>>>()?;
                negate_if(nb.in_list(expr, list)?, *negated)
            }
            PredicateKind::InSubquery {
                expr,
                query,
                negated,
            } => {
                let expr = self.expression(expr)?;
                let query = self.query_expression(query)?;
                negate_if(nb.in_subquery(expr, query), *negated)
            }
            PredicateKind::Exists { query, negated } => {
                let query = self.query_expression(query)?;
                negate_if(nb.exists(query), *negated)
            }
            PredicateKind::MemberOf {
                expr,
                path,
                negated,
            } => {
                let expr = self.expression(expr)?;
                let path = self.resolve_path(path)?;
                negate_if(nb.is_member(expr, &path)?, *negated)
            }
            PredicateKind::And(lhs, rhs) => {
                let lhs = self.predicate(lhs)?;
                let rhs = self.predicate(rhs)?;
                SqmPredicate::and(lhs, rhs)
            }
            PredicateKind::Or(lhs, rhs) => {
                let lhs = self.predicate(lhs)?;
                let rhs = self.predicate(rhs)?;
                SqmPredicate::or(lhs, rhs)
            }
            PredicateKind::Not(inner) => self.predicate(inner)?.negated(),
            PredicateKind::Expr(expr) => {
                let expr = self.expression(expr)?;
                nb.wrap(expr)?
            }
        };
        Ok(lowered)
    }
}

fn alias_of(alias: &Option<Ident>) -> Option<&str> {
    alias.as_ref().map(|a| a.value.as_str())
}

fn negate_if(predicate: SqmPredicate, negated: bool) -> SqmPredicate {
    if negated {
        predicate.negated()
    } else {
        predicate
    }
}

/// From node over a derived table or CTE.
fn derived_from(source: FromSource, name: &str, alias: Option<&str>) -> SqmFrom {
    SqmFrom {
        id: FromId::next(),
        source,
        alias: alias.map(str::to_string),
        navigable_path: NavigablePath::root(name, alias),
        entity: None,
        joins: Vec::new(),
        join: None,
    }
}

/// Columns a derived query exposes: explicit names, else select aliases,
/// else the last attribute name of a selected path.
fn derived_columns(query: &SqmQuery, explicit: &[Ident]) -> SqmResult<Vec<DerivedColumn>> {
    let spec = query
        .first_spec()
        .ok_or_else(|| SqmError::interpretation("derived query has no query spec"))?;
    let selections = &spec.select.selections;
    if !explicit.is_empty() && explicit.len() != selections.len() {
        return Err(SqmError::Semantic(format!(
            "{} column names given for a query selecting {} items",
            explicit.len(),
            selections.len()
        )));
    }
    selections
        .iter()
        .enumerate()
        .map(|(index, selection)| {
            let SqmSelectable::Expression(expr) = &selection.item else {
                return Err(SqmError::Semantic(
                    "Dynamic instantiation cannot be selected by a derived query".into(),
                ));
            };
            if matches!(expr.expressible(), Some(SqmExpressible::Entity(_))) {
                return Err(SqmError::Semantic(
                    "Entity-valued items cannot be selected by a derived query".into(),
                ));
            }
            let name = explicit
                .get(index)
                .map(|c| c.value.clone())
                .or_else(|| selection.alias.clone())
                .or_else(|| {
                    expr.as_path()
                        .and_then(SqmPath::last_attribute)
                        .map(str::to_string)
                })
                .ok_or_else(|| {
                    SqmError::Semantic(format!(
                        "Select item {} of a derived query needs an alias",
                        index + 1
                    ))
                })?;
            Ok(DerivedColumn {
                name,
                expressible: expr.expressible(),
            })
        })
        .collect()
}

fn check_set_arity(parts: &[SqmQuery]) -> SqmResult<()> {
    let arities: Vec<usize> = parts
        .iter()
        .filter_map(SqmQuery::first_spec)
        .map(|spec| spec.select.selections.len())
        .collect();
    if arities.windows(2).any(|w| w[0] != w[1]) {
        return Err(SqmError::Semantic(
            "All query parts of a set operation must select the same number of items".into(),
        ));
    }
    Ok(())
}

/// Order by of a set operation: select aliases of the first part, or
/// positions, rendered positionally.
fn set_sort_items(
    parts: &[SqmQuery],
    items: &[SortItem],
    nb: NodeBuilder<'_>,
) -> SqmResult<Vec<SqmSortSpec>> {
    let selections = parts
        .first()
        .and_then(SqmQuery::first_spec)
        .map(|spec| spec.select.selections.as_slice())
        .unwrap_or_default();
    items
        .iter()
        .map(|item| {
            let position = match &item.expr.kind {
                ExprKind::Literal(Literal::Number(text)) => text.parse::<usize>().ok(),
                ExprKind::Path(PathExpr {
                    root: PathRoot::Ident(name),
                    segments,
                    ..
                }) if segments.is_empty() => selections
                    .iter()
                    .position(|s| s.alias.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(name)))
                    .map(|index| index + 1),
                _ => None,
            };
            let position = position
                .filter(|p| (1..=selections.len()).contains(p))
                .ok_or_else(|| {
                    SqmError::Semantic(
                        "Order by of a set operation must name a select alias or position".into(),
                    )
                })?;
            let literal = LiteralValue::Numeric {
                text: position.to_string(),
                ty: BasicType::Integer,
            };
            Ok(SqmSortSpec {
                expr: nb.literal(literal),
                direction: item.direction,
                nulls: item.nulls,
            })
        })
        .collect()
}
