//! Paths, expressions and predicates.

use crate::metamodel::AttributeKind;
use crate::sql::ast::{
    Expression, Frame, FrameBound, FunctionCall, JdbcParameter, Predicate, Query, QuerySpec,
    SqlSelection, TableGroup, TableReference, Window,
};
use crate::sqm::error::{SqmError, SqmResult};
use crate::sqm::expression::{LiteralValue, SqmExpression, SqmFrameBound, SqmFunction};
use crate::sqm::operator::UnaryArithmeticOperator;
use crate::sqm::path::{FromId, NavigablePath, PathKind, PathSegment, SqmPath};
use crate::sqm::predicate::SqmPredicate;
use crate::sqm::types::{BasicType, SqmExpressible};

use super::from::{correlation, GroupKind, GroupRef};
use super::SqmTranslator;

/// Position a path expression is translated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Usage {
    /// Entities stand for their identifier; to-one paths for their foreign key.
    Value,
    /// Entities expand to all their columns.
    Selection,
}

/// A translated path and the table group owning its columns.
#[derive(Debug)]
pub(super) struct ResolvedPath {
    pub group: GroupRef,
    pub expression: Expression,
}

/// What a collection subquery selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollectionSelection {
    Count,
    One,
    Element,
}

/// Where path navigation stands.
#[derive(Debug)]
struct Cursor {
    group: GroupRef,
    kind: GroupKind,
    path: NavigablePath,
}

fn segment_name(segment: &PathSegment) -> &str {
    match segment {
        PathSegment::Attribute(name) | PathSegment::Treat(name) => name,
    }
}

fn literal_one() -> Expression {
    Expression::Literal(LiteralValue::Numeric {
        text: "1".to_string(),
        ty: BasicType::Integer,
    })
}

impl SqmTranslator<'_> {
    fn cursor(&self, lhs: FromId) -> SqmResult<Cursor> {
        let group = self.lookup_from(lhs)?;
        let node = self.group(group)?;
        Ok(Cursor {
            group,
            kind: node.kind.clone(),
            path: node.navigable_path.clone(),
        })
    }

    pub(super) fn resolve_path(&mut self, path: &SqmPath, usage: Usage) -> SqmResult<ResolvedPath> {
        let discriminator = matches!(path.kind, PathKind::Discriminator { .. });
        let mut cursor = self.cursor(path.lhs)?;
        for (i, segment) in path.segments.iter().enumerate() {
            if let PathSegment::Attribute(name) = segment {
                let remaining = &path.segments[i + 1..];
                if let Some(expression) = self.terminal(&cursor, name, remaining, usage, discriminator)? {
                    return Ok(ResolvedPath {
                        group: cursor.group,
                        expression,
                    });
                }
            }
            cursor = self.step(cursor, segment)?;
        }
        let expression = self.finish(&cursor, usage, discriminator)?;
        Ok(ResolvedPath {
            group: cursor.group,
            expression,
        })
    }

    /// Columns of `name` when no join is needed to reach them: basic and
    /// embedded attributes, and foreign keys standing for a to-one target.
    fn terminal(
        &self,
        cursor: &Cursor,
        name: &str,
        remaining: &[PathSegment],
        usage: Usage,
        discriminator: bool,
    ) -> SqmResult<Option<Expression>> {
        let qualifier = self.qualifier(cursor.group)?;
        let q = qualifier.as_deref();
        let dereference = |attribute: &str| SqmError::TerminalPathDereference {
            path: cursor.path.append(name, None).to_string(),
            attribute: attribute.to_string(),
        };
        let entity = match &cursor.kind {
            GroupKind::Columns(columns) => {
                if !columns.iter().any(|c| c == name) {
                    return Err(SqmError::UnknownPathElement {
                        container: cursor.path.to_string(),
                        attribute: name.to_string(),
                    });
                }
                if let Some(next) = remaining.first() {
                    return Err(dereference(segment_name(next)));
                }
                return Ok(Some(Expression::column(q, name)));
            }
            GroupKind::Entity(entity) => entity,
        };
        let (_, attribute) = self.model.find_attribute(entity, name).ok_or_else(|| {
            SqmError::UnknownPathElement {
                container: entity.clone(),
                attribute: name.to_string(),
            }
        })?;
        Ok(match &attribute.kind {
            AttributeKind::Basic {
                column, formula, ..
            } => {
                if let Some(next) = remaining.first() {
                    return Err(dereference(segment_name(next)));
                }
                Some(match formula {
                    Some(formula) => Expression::Formula(format!("({})", self.qualify_fragment(formula, q)?)),
                    None => Expression::column(q, column),
                })
            }
            AttributeKind::Embedded { embeddable, .. } => {
                let columns = match remaining {
                    [] => attribute.owned_columns(),
                    [PathSegment::Attribute(sub)] => attribute
                        .sub_attribute(sub)
                        .ok_or_else(|| SqmError::UnknownPathElement {
                            container: embeddable.clone(),
                            attribute: sub.clone(),
                        })?
                        .owned_columns(),
                    [_, next, ..] | [next] => return Err(dereference(segment_name(next))),
                };
                Some(Expression::from_columns(
                    columns.into_iter().map(|c| Expression::column(q, c)).collect(),
                ))
            }
            AttributeKind::ToOne {
                target,
                join_columns,
                ..
            } if !discriminator => {
                let target_id = &self.entity_type(target)?.identifier.name;
                let foreign_key = || {
                    Expression::from_columns(
                        join_columns.iter().map(|c| Expression::column(q, c)).collect(),
                    )
                };
                match remaining {
                    [] if usage == Usage::Value => Some(foreign_key()),
                    [PathSegment::Attribute(id)] if id == target_id => Some(foreign_key()),
                    _ => None,
                }
            }
            _ => None,
        })
    }

    /// Move along one association or treat.
    fn step(&mut self, cursor: Cursor, segment: &PathSegment) -> SqmResult<Cursor> {
        match segment {
            PathSegment::Treat(entity) => {
                let qualifier = self.qualifier(cursor.group)?;
                if let Some(restriction) = self.discriminator_restriction(entity, qualifier.as_deref()) {
                    self.scope_mut()?.add_restriction(restriction);
                }
                Ok(Cursor {
                    group: cursor.group,
                    kind: GroupKind::Entity(entity.clone()),
                    path: cursor.path.treat_as(entity),
                })
            }
            PathSegment::Attribute(name) => {
                let target = match &cursor.kind {
                    GroupKind::Entity(entity) => self
                        .model
                        .find_attribute(entity, name)
                        .and_then(|(_, attribute)| attribute.target())
                        .map(str::to_string),
                    GroupKind::Columns(_) => None,
                };
                let target = target.ok_or_else(|| SqmError::TerminalPathDereference {
                    path: cursor.path.to_string(),
                    attribute: name.clone(),
                })?;
                let path = cursor.path.append(name, None);
                let group = self.implicit_join(cursor.group, name, &path)?;
                Ok(Cursor {
                    group,
                    kind: GroupKind::Entity(target),
                    path,
                })
            }
        }
    }

    /// The path denotes a whole table group.
    fn finish(&self, cursor: &Cursor, usage: Usage, discriminator: bool) -> SqmResult<Expression> {
        let qualifier = self.qualifier(cursor.group)?;
        let q = qualifier.as_deref();
        Ok(match &cursor.kind {
            GroupKind::Columns(columns) => {
                Expression::from_columns(columns.iter().map(|c| Expression::column(q, c)).collect())
            }
            GroupKind::Entity(entity) if discriminator => match self.model.discriminator(entity) {
                Some(d) => Expression::column(q, &d.column),
                None => Expression::Literal(LiteralValue::String(entity.clone())),
            },
            GroupKind::Entity(entity) => match usage {
                Usage::Value => Expression::column(q, self.entity_type(entity)?.id_column()),
                Usage::Selection => Expression::from_columns(self.entity_columns(entity, q)?),
            },
        })
    }

    /// Identifier, discriminator, then the columns of every attribute of
    /// `entity` and its subtypes.
    pub(super) fn entity_columns(&self, entity: &str, qualifier: Option<&str>) -> SqmResult<Vec<Expression>> {
        let entity_type = self.entity_type(entity)?;
        let mut columns = vec![Expression::column(qualifier, entity_type.id_column())];
        if let Some(discriminator) = self.model.discriminator(entity) {
            columns.push(Expression::column(qualifier, &discriminator.column));
        }
        let subtypes = self.model.subtypes(entity);
        let attributes = self
            .model
            .all_attributes(entity)
            .into_iter()
            .chain(subtypes.iter().flat_map(|s| s.attributes.iter()));
        for attribute in attributes {
            let expressions = match &attribute.kind {
                AttributeKind::Basic {
                    formula: Some(formula),
                    ..
                } => vec![Expression::Formula(format!(
                    "({})",
                    self.qualify_fragment(formula, qualifier)?
                ))],
                _ => attribute
                    .owned_columns()
                    .into_iter()
                    .map(|c| Expression::column(qualifier, c))
                    .collect(),
            };
            for expression in expressions {
                if !columns.contains(&expression) {
                    columns.push(expression);
                }
            }
        }
        Ok(columns)
    }

    /// Columns of fetched joins, appended to the select clause.
    pub(super) fn fetched_columns(&self) -> SqmResult<Vec<Expression>> {
        let Some(scope) = self.scopes.last() else {
            return Ok(Vec::new());
        };
        let mut columns = Vec::new();
        for index in scope.tree_order() {
            let Some(group) = scope.groups.get(index) else {
                continue;
            };
            if let (true, GroupKind::Entity(entity)) = (group.fetched, &group.kind) {
                columns.extend(self.entity_columns(entity, Some(group.alias.as_str()))?);
            }
        }
        Ok(columns)
    }

    pub(super) fn expression(&mut self, expr: &SqmExpression) -> SqmResult<Expression> {
        Ok(match expr {
            SqmExpression::Path(path) => self.resolve_path(path, Usage::Value)?.expression,
            SqmExpression::Literal { value, .. } => Expression::Literal(value.clone()),
            SqmExpression::Parameter {
                id,
                label,
                expressible,
            } => Expression::Parameter(JdbcParameter {
                id: *id,
                label: label.clone(),
                expressible: expressible.clone(),
                component: None,
            }),
            SqmExpression::Binary { op, lhs, rhs, .. } => Expression::Binary {
                op: *op,
                lhs: Box::new(self.expression(lhs)?),
                rhs: Box::new(self.expression(rhs)?),
            },
            SqmExpression::Unary { op, operand } => {
                let operand = self.expression(operand)?;
                match op {
                    UnaryArithmeticOperator::UnaryMinus => Expression::Negate(Box::new(operand)),
                    UnaryArithmeticOperator::UnaryPlus => operand,
                }
            }
            SqmExpression::Function(function) => Expression::Function(Box::new(self.function(function)?)),
            SqmExpression::Trim {
                spec,
                character,
                source,
            } => Expression::Trim {
                spec: *spec,
                character: self.boxed(character.as_deref())?,
                source: Box::new(self.expression(source)?),
            },
            SqmExpression::Cast { operand, target } => Expression::Cast {
                operand: Box::new(self.expression(operand)?),
                target: *target,
            },
            SqmExpression::Extract { field, source } => Expression::Extract {
                field: field.clone(),
                source: Box::new(self.expression(source)?),
            },
            SqmExpression::CaseSearched {
                whens, otherwise, ..
            } => {
                let mut translated = Vec::with_capacity(whens.len());
                for (condition, result) in whens {
                    translated.push((self.predicate(condition)?, self.expression(result)?));
                }
                Expression::CaseSearched {
                    whens: translated,
                    otherwise: self.boxed(otherwise.as_deref())?,
                }
            }
            SqmExpression::CaseSimple {
                operand,
                whens,
                otherwise,
                ..
            } => {
                let operand = Box::new(self.expression(operand)?);
                let mut translated = Vec::with_capacity(whens.len());
                for (value, result) in whens {
                    translated.push((self.expression(value)?, self.expression(result)?));
                }
                Expression::CaseSimple {
                    operand,
                    whens: translated,
                    otherwise: self.boxed(otherwise.as_deref())?,
                }
            }
            SqmExpression::Tuple(items) => Expression::Tuple(self.expressions(items)?),
            SqmExpression::Subquery(query) => Expression::Subquery(Box::new(self.query(query, None)?)),
            SqmExpression::Quantified { quantifier, query } => Expression::Quantified {
                quantifier: *quantifier,
                query: Box::new(self.query(query, None)?),
            },
            SqmExpression::CollectionSize(path) => Expression::Subquery(Box::new(
                self.collection_query(path, CollectionSelection::Count)?,
            )),
            SqmExpression::EntityTypeLiteral(name) => {
                match &self.entity_type(name)?.discriminator_value {
                    Some(value) => Expression::Formula(value.clone()),
                    None => Expression::Literal(LiteralValue::String(name.clone())),
                }
            }
            SqmExpression::Star => Expression::Star,
        })
    }

    fn expressions(&mut self, items: &[SqmExpression]) -> SqmResult<Vec<Expression>> {
        items.iter().map(|item| self.expression(item)).collect()
    }

    fn boxed(&mut self, expr: Option<&SqmExpression>) -> SqmResult<Option<Box<Expression>>> {
        expr.map(|e| self.expression(e).map(Box::new)).transpose()
    }

    fn function(&mut self, function: &SqmFunction) -> SqmResult<FunctionCall> {
        let arguments = self.expressions(&function.arguments)?;
        let filter = match &function.filter {
            Some(filter) => Some(self.predicate(filter)?),
            None => None,
        };
        let over = match &function.over {
            Some(window) => {
                let frame = match &window.frame {
                    Some(frame) => Some(Frame {
                        mode: frame.mode,
                        start: self.frame_bound(&frame.start)?,
                        end: frame.end.as_ref().map(|b| self.frame_bound(b)).transpose()?,
                        exclusion: frame.exclusion,
                    }),
                    None => None,
                };
                Some(Window {
                    partition_by: self.expressions(&window.partition_by)?,
                    order_by: self.sort_specifications(&window.order_by)?,
                    frame,
                })
            }
            None => None,
        };
        Ok(FunctionCall {
            name: function.name.clone(),
            arguments,
            distinct: function.distinct,
            filter,
            over,
        })
    }

    fn frame_bound(&mut self, bound: &SqmFrameBound) -> SqmResult<FrameBound> {
        Ok(FrameBound {
            kind: bound.kind,
            offset: self.boxed(bound.offset.as_deref())?,
        })
    }

    /// Components of an embedded path, for binding a parameter against it.
    fn embedded_components(&self, target: &SqmExpression) -> Vec<(String, SqmExpressible)> {
        let SqmExpression::Path(path) = target else {
            return Vec::new();
        };
        let PathKind::Embedded { owner, attribute } = &path.kind else {
            return Vec::new();
        };
        match self.model.find_attribute(owner, attribute).map(|(_, a)| &a.kind) {
            Some(AttributeKind::Embedded { attributes, .. }) => attributes
                .iter()
                .filter(|a| !a.owned_columns().is_empty())
                .map(|a| (a.name.clone(), a.expressible()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// A parameter compared with an embedded value binds one marker per
    /// component.
    pub(super) fn expand_parameter(&self, target: &SqmExpression, value: Expression) -> Expression {
        let components = self.embedded_components(target);
        match value {
            Expression::Parameter(parameter) if !components.is_empty() => Expression::from_columns(
                components
                    .into_iter()
                    .map(|(name, expressible)| {
                        Expression::Parameter(JdbcParameter {
                            id: parameter.id,
                            label: parameter.label.clone(),
                            expressible: Some(expressible),
                            component: Some(name),
                        })
                    })
                    .collect(),
            ),
            other => other,
        }
    }

    pub(super) fn predicate(&mut self, predicate: &SqmPredicate) -> SqmResult<Predicate> {
        Ok(match predicate {
            SqmPredicate::Comparison { lhs, op, rhs } => {
                let left = self.expression(lhs)?;
                let right = self.expression(rhs)?;
                Predicate::Comparison {
                    lhs: self.expand_parameter(rhs, left),
                    op: *op,
                    rhs: self.expand_parameter(lhs, right),
                }
            }
            SqmPredicate::Between {
                expr,
                lower,
                upper,
                negated,
            } => {
                let translated = self.expression(expr)?;
                let lower_bound = self.expression(lower)?;
                let upper_bound = self.expression(upper)?;
                Predicate::Between {
                    expr: translated,
                    lower: self.expand_parameter(expr, lower_bound),
                    upper: self.expand_parameter(expr, upper_bound),
                    negated: *negated,
                }
            }
            SqmPredicate::Like {
                expr,
                pattern,
                escape,
                negated,
                case_sensitive,
            } => Predicate::Like {
                expr: self.expression(expr)?,
                pattern: self.expression(pattern)?,
                escape: escape.as_ref().map(|e| self.expression(e)).transpose()?,
                negated: *negated,
                case_sensitive: *case_sensitive,
            },
            SqmPredicate::Null { expr, negated } => Predicate::Null {
                expr: self.expression(expr)?,
                negated: *negated,
            },
            SqmPredicate::Empty { path, negated } => Predicate::Exists {
                query: Box::new(self.collection_query(path, CollectionSelection::One)?),
                negated: !*negated,
            },
            SqmPredicate::InList {
                expr,
                list,
                negated,
            } => {
                let translated = self.expression(expr)?;
                let mut items = Vec::with_capacity(list.len());
                for item in list {
                    let value = self.expression(item)?;
                    items.push(self.expand_parameter(expr, value));
                }
                Predicate::InList {
                    expr: translated,
                    list: items,
                    negated: *negated,
                }
            }
            SqmPredicate::InSubquery {
                expr,
                query,
                negated,
            } => Predicate::InSubquery {
                expr: self.expression(expr)?,
                query: Box::new(self.query(query, None)?),
                negated: *negated,
            },
            SqmPredicate::Exists { query, negated } => Predicate::Exists {
                query: Box::new(self.query(query, None)?),
                negated: *negated,
            },
            SqmPredicate::MemberOf {
                expr,
                path,
                negated,
            } => Predicate::InSubquery {
                expr: self.expression(expr)?,
                query: Box::new(self.collection_query(path, CollectionSelection::Element)?),
                negated: *negated,
            },
            SqmPredicate::Junction { op, lhs, rhs } => Predicate::Junction {
                op: *op,
                lhs: Box::new(self.predicate(lhs)?),
                rhs: Box::new(self.predicate(rhs)?),
            },
            SqmPredicate::BooleanExpression { expr, negated } => Predicate::BooleanExpression {
                expr: self.expression(expr)?,
                negated: *negated,
            },
            SqmPredicate::Constant(value) => Predicate::Constant(*value),
        })
    }

    /// Subquery over the rows of a plural attribute, correlated to its owner.
    fn collection_query(&mut self, path: &SqmPath, selection: CollectionSelection) -> SqmResult<Query> {
        let not_plural = || SqmError::IllegalPathUsage(format!("'{}' is not a plural attribute", path.navigable_path));
        let (attribute, prefix) = match path.segments.split_last() {
            Some((PathSegment::Attribute(name), prefix)) => (name, prefix),
            _ => return Err(not_plural()),
        };
        let mut cursor = self.cursor(path.lhs)?;
        for segment in prefix {
            cursor = self.step(cursor, segment)?;
        }
        let GroupKind::Entity(owner) = &cursor.kind else {
            return Err(not_plural());
        };
        let plural = self
            .model
            .find_attribute(owner, attribute)
            .is_some_and(|(_, a)| a.is_plural());
        if !plural {
            return Err(not_plural());
        }
        let (target, key) = self.association_key(owner, attribute)?;

        // the owner is always qualified: inside the subquery a bare column
        // would bind to the collection table
        let outer = self.group(cursor.group)?.alias.clone();
        let alias = format!("{}_0", self.alias_base(attribute));
        let mut restrictions = correlation(Some(outer.as_str()), &key.owner, &alias, &key.target);
        let (table, element) = match &key.link {
            Some(link) => (link.table.clone(), link.target_columns.clone()),
            None => {
                restrictions.extend(self.entity_restrictions(&target, Some(alias.as_str()))?);
                let entity = self.entity_type(&target)?;
                (entity.table.clone(), vec![entity.id_column().to_string()])
            }
        };
        let expression = match selection {
            CollectionSelection::Count => Expression::Function(Box::new(FunctionCall {
                name: "count".to_string(),
                arguments: vec![literal_one()],
                distinct: false,
                filter: None,
                over: None,
            })),
            CollectionSelection::One => literal_one(),
            CollectionSelection::Element => Expression::from_columns(
                element
                    .iter()
                    .map(|c| Expression::column(Some(alias.as_str()), c))
                    .collect(),
            ),
        };
        Ok(Query::spec(QuerySpec {
            selections: vec![SqlSelection {
                expression,
                alias: None,
            }],
            from: vec![TableGroup {
                navigable_path: cursor.path.append(attribute, None),
                table: TableReference::Named { table },
                alias,
                key_columns: Vec::new(),
                association_table: None,
                joins: Vec::new(),
            }],
            where_: Predicate::all(restrictions),
            ..QuerySpec::default()
        }))
    }
}
