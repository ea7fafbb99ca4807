//! Read-only traversal of SQM trees.
//!
//! Implement the `visit_*` methods of interest and call the matching
//! `walk_*` function to continue into children.

use super::expression::{ParamLabel, SqmExpression, SqmFunction};
use super::from::{FromSource, SqmFrom};
use super::path::{ParamId, SqmPath};
use super::predicate::SqmPredicate;
use super::statement::{
    SqmInsertSource, SqmQuery, SqmQueryPart, SqmQuerySpec, SqmSelectable, SqmSelection,
    SqmStatement,
};
use super::types::SqmExpressible;

pub trait SqmVisitor {
    fn visit_statement(&mut self, statement: &SqmStatement) {
        walk_statement(self, statement);
    }

    fn visit_query(&mut self, query: &SqmQuery) {
        walk_query(self, query);
    }

    fn visit_spec(&mut self, spec: &SqmQuerySpec) {
        walk_spec(self, spec);
    }

    fn visit_from(&mut self, from: &SqmFrom) {
        walk_from(self, from);
    }

    fn visit_predicate(&mut self, predicate: &SqmPredicate) {
        walk_predicate(self, predicate);
    }

    fn visit_expression(&mut self, expr: &SqmExpression) {
        walk_expression(self, expr);
    }

    fn visit_path(&mut self, _path: &SqmPath) {}

    fn visit_parameter(
        &mut self,
        _id: ParamId,
        _label: &ParamLabel,
        _expressible: Option<&SqmExpressible>,
    ) {
    }
}

pub fn walk_statement<V: SqmVisitor + ?Sized>(v: &mut V, statement: &SqmStatement) {
    match statement {
        SqmStatement::Select(s) => {
            for cte in &s.ctes {
                v.visit_query(&cte.query);
            }
            v.visit_query(&s.query);
        }
        SqmStatement::Update(s) => {
            v.visit_from(&s.target);
            for assignment in &s.assignments {
                v.visit_path(&assignment.path);
                v.visit_expression(&assignment.value);
            }
            if let Some(p) = &s.where_ {
                v.visit_predicate(p);
            }
        }
        SqmStatement::Delete(s) => {
            v.visit_from(&s.target);
            if let Some(p) = &s.where_ {
                v.visit_predicate(p);
            }
        }
        SqmStatement::Insert(s) => {
            v.visit_from(&s.target);
            for path in &s.paths {
                v.visit_path(path);
            }
            match &s.values {
                SqmInsertSource::Select(query) => v.visit_query(query),
                SqmInsertSource::Values(rows) => {
                    for expr in rows.iter().flatten() {
                        v.visit_expression(expr);
                    }
                }
            }
        }
    }
}

pub fn walk_query<V: SqmVisitor + ?Sized>(v: &mut V, query: &SqmQuery) {
    match &query.part {
        SqmQueryPart::Spec(spec) => v.visit_spec(spec),
        SqmQueryPart::Group { parts, .. } => {
            for part in parts {
                v.visit_query(part);
            }
        }
    }
    for sort in &query.order_by {
        v.visit_expression(&sort.expr);
    }
    for expr in query.offset.iter().chain(query.fetch.iter()) {
        v.visit_expression(expr);
    }
}

pub fn walk_spec<V: SqmVisitor + ?Sized>(v: &mut V, spec: &SqmQuerySpec) {
    for from in &spec.from {
        v.visit_from(from);
    }
    for selection in &spec.select.selections {
        walk_selection(v, selection);
    }
    if let Some(p) = &spec.where_ {
        v.visit_predicate(p);
    }
    for expr in &spec.group_by {
        v.visit_expression(expr);
    }
    if let Some(p) = &spec.having {
        v.visit_predicate(p);
    }
}

fn walk_selection<V: SqmVisitor + ?Sized>(v: &mut V, selection: &SqmSelection) {
    match &selection.item {
        SqmSelectable::Expression(expr) => v.visit_expression(expr),
        SqmSelectable::Instantiation(inst) => {
            for arg in &inst.arguments {
                walk_selection(v, arg);
            }
        }
    }
}

pub fn walk_from<V: SqmVisitor + ?Sized>(v: &mut V, from: &SqmFrom) {
    match &from.source {
        FromSource::Derived { query, .. } => v.visit_query(query),
        FromSource::Function { arguments, .. } => {
            for arg in arguments {
                v.visit_expression(arg);
            }
        }
        _ => {}
    }
    if let Some(on) = from.join.as_ref().and_then(|j| j.on.as_ref()) {
        v.visit_predicate(on);
    }
    for join in &from.joins {
        v.visit_from(join);
    }
}

pub fn walk_predicate<V: SqmVisitor + ?Sized>(v: &mut V, predicate: &SqmPredicate) {
    match predicate {
        SqmPredicate::Comparison { lhs, rhs, .. } => {
            v.visit_expression(lhs);
            v.visit_expression(rhs);
        }
        SqmPredicate::Between {
            expr, lower, upper, ..
        } => {
            v.visit_expression(expr);
            v.visit_expression(lower);
            v.visit_expression(upper);
        }
        SqmPredicate::Like {
            expr,
            pattern,
            escape,
            ..
        } => {
            v.visit_expression(expr);
            v.visit_expression(pattern);
            if let Some(e) = escape {
                v.visit_expression(e);
            }
        }
        SqmPredicate::Null { expr, .. } | SqmPredicate::BooleanExpression { expr, .. } => {
            v.visit_expression(expr)
        }
        SqmPredicate::Empty { path, .. } => v.visit_path(path),
        SqmPredicate::InList { expr, list, .. } => {
            v.visit_expression(expr);
            for item in list {
                v.visit_expression(item);
            }
        }
        SqmPredicate::InSubquery { expr, query, .. } => {
            v.visit_expression(expr);
            v.visit_query(query);
        }
        SqmPredicate::Exists { query, .. } => v.visit_query(query),
        SqmPredicate::MemberOf { expr, path, .. } => {
            v.visit_expression(expr);
            v.visit_path(path);
        }
        SqmPredicate::Junction { lhs, rhs, .. } => {
            v.visit_predicate(lhs);
            v.visit_predicate(rhs);
        }
        SqmPredicate::Constant(_) => {}
    }
}

pub fn walk_expression<V: SqmVisitor + ?Sized>(v: &mut V, expr: &SqmExpression) {
    match expr {
        SqmExpression::Path(path) | SqmExpression::CollectionSize(path) => v.visit_path(path),
        SqmExpression::Parameter {
            id,
            label,
            expressible,
        } => v.visit_parameter(*id, label, expressible.as_ref()),
        SqmExpression::Binary { lhs, rhs, .. } => {
            v.visit_expression(lhs);
            v.visit_expression(rhs);
        }
        SqmExpression::Unary { operand, .. } | SqmExpression::Cast { operand, .. } => {
            v.visit_expression(operand)
        }
        SqmExpression::Function(function) => walk_function(v, function),
        SqmExpression::Trim {
            character, source, ..
        } => {
            if let Some(c) = character {
                v.visit_expression(c);
            }
            v.visit_expression(source);
        }
        SqmExpression::Extract { source, .. } => v.visit_expression(source),
        SqmExpression::CaseSearched {
            whens, otherwise, ..
        } => {
            for (when, then) in whens {
                v.visit_predicate(when);
                v.visit_expression(then);
            }
            if let Some(o) = otherwise {
                v.visit_expression(o);
            }
        }
        SqmExpression::CaseSimple {
            operand,
            whens,
            otherwise,
            ..
        } => {
            v.visit_expression(operand);
            for (when, then) in whens {
                v.visit_expression(when);
                v.visit_expression(then);
            }
            if let Some(o) = otherwise {
                v.visit_expression(o);
            }
        }
        SqmExpression::Tuple(items) => {
            for item in items {
                v.visit_expression(item);
            }
        }
        SqmExpression::Subquery(query) | SqmExpression::Quantified { query, .. } => {
            v.visit_query(query)
        }
        SqmExpression::Literal { .. }
        | SqmExpression::EntityTypeLiteral(_)
        | SqmExpression::Star => {}
    }
}

fn walk_function<V: SqmVisitor + ?Sized>(v: &mut V, function: &SqmFunction) {
    for arg in &function.arguments {
        v.visit_expression(arg);
    }
    if let Some(filter) = &function.filter {
        v.visit_predicate(filter);
    }
    if let Some(window) = &function.over {
        for expr in &window.partition_by {
            v.visit_expression(expr);
        }
        for sort in &window.order_by {
            v.visit_expression(&sort.expr);
        }
    }
}

/// A parameter declared by a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SqmParameterInfo {
    pub id: ParamId,
    pub label: ParamLabel,
    pub expressible: Option<SqmExpressible>,
}

#[derive(Default)]
struct ParameterCollector {
    parameters: Vec<SqmParameterInfo>,
}

impl SqmVisitor for ParameterCollector {
    fn visit_parameter(
        &mut self,
        id: ParamId,
        label: &ParamLabel,
        expressible: Option<&SqmExpressible>,
    ) {
        match self.parameters.iter_mut().find(|p| p.id == id) {
            Some(existing) => {
                if existing.expressible.is_none() {
                    existing.expressible = expressible.cloned();
                }
            }
            None => self.parameters.push(SqmParameterInfo {
                id,
                label: label.clone(),
                expressible: expressible.cloned(),
            }),
        }
    }
}

/// Distinct parameters of a statement, in order of first occurrence.
pub fn collect_parameters(statement: &SqmStatement) -> Vec<SqmParameterInfo> {
    let mut collector = ParameterCollector::default();
    collector.visit_statement(statement);
    collector.parameters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqm::operator::ComparisonOperator;
    use crate::sqm::statement::{SqmQuerySource, SqmSelectStatement};

    #[test]
    fn test_collect_parameters_dedups_by_identity() {
        let id = ParamId::next();
        let param = SqmExpression::Parameter {
            id,
            label: ParamLabel::Named("p".into()),
            expressible: None,
        };
        let mut spec = SqmQuerySpec::default();
        spec.apply_predicate(SqmPredicate::Comparison {
            lhs: param.clone(),
            op: ComparisonOperator::Equal,
            rhs: param,
        });
        let statement = SqmStatement::Select(SqmSelectStatement::new(
            SqmQuery::new(spec),
            SqmQuerySource::Criteria,
        ));
        let params = collect_parameters(&statement);
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].label, ParamLabel::Named("p".into()));
    }
}
