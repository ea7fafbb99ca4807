//! Deep copies of SQM trees with fresh node identities.
//!
//! A copy allocates new [`FromId`]s and [`ParamId`]s and re-points every
//! reference through the [`SqmCopyContext`], so a from node or parameter
//! shared by several places in the original is shared the same way in the
//! copy. References to nodes outside the copied tree keep their identity.

use std::collections::HashMap;

use super::expression::{SqmExpression, SqmFunction};
use super::from::{FromSource, SqmFrom};
use super::path::{FromId, ParamId, SqmPath};
use super::predicate::SqmPredicate;
use super::statement::{
    SqmInsertSource, SqmQuery, SqmQueryPart, SqmQuerySpec, SqmSelectable, SqmSelection,
    SqmStatement,
};

/// Identity mapping for one copy operation.
#[derive(Debug, Default)]
pub struct SqmCopyContext {
    froms: HashMap<FromId, FromId>,
    parameters: HashMap<ParamId, ParamId>,
}

impl SqmCopyContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The copy of `original`, if it has been copied in this operation.
    pub fn copied_from(&self, original: FromId) -> Option<FromId> {
        self.froms.get(&original).copied()
    }

    fn register_from(&mut self, original: FromId) -> FromId {
        *self.froms.entry(original).or_insert_with(FromId::next)
    }

    fn from_id(&self, original: FromId) -> FromId {
        self.copied_from(original).unwrap_or(original)
    }

    /// The copy of a parameter, allocated on first use.
    pub fn param_id(&mut self, original: ParamId) -> ParamId {
        *self.parameters.entry(original).or_insert_with(ParamId::next)
    }
}

/// Nodes that can be deep-copied under a [`SqmCopyContext`].
pub trait SqmCopy: Clone {
    fn copy(&self, ctx: &mut SqmCopyContext) -> Self {
        let mut copy = self.clone();
        copy.remap(ctx);
        copy
    }

    /// Re-point identities in place.
    fn remap(&mut self, ctx: &mut SqmCopyContext);
}

impl SqmCopy for SqmStatement {
    fn remap(&mut self, ctx: &mut SqmCopyContext) {
        match self {
            SqmStatement::Select(s) => {
                for cte in &mut s.ctes {
                    cte.query.remap(ctx);
                }
                s.query.remap(ctx);
            }
            SqmStatement::Update(s) => {
                register_tree(&s.target, ctx);
                s.target.remap(ctx);
                for assignment in &mut s.assignments {
                    assignment.path.remap(ctx);
                    assignment.value.remap(ctx);
                }
                if let Some(p) = &mut s.where_ {
                    p.remap(ctx);
                }
            }
            SqmStatement::Delete(s) => {
                register_tree(&s.target, ctx);
                s.target.remap(ctx);
                if let Some(p) = &mut s.where_ {
                    p.remap(ctx);
                }
            }
            SqmStatement::Insert(s) => {
                register_tree(&s.target, ctx);
                s.target.remap(ctx);
                for path in &mut s.paths {
                    path.remap(ctx);
                }
                match &mut s.values {
                    SqmInsertSource::Select(query) => query.remap(ctx),
                    SqmInsertSource::Values(rows) => {
                        for expr in rows.iter_mut().flatten() {
                            expr.remap(ctx);
                        }
                    }
                }
            }
        }
    }
}

impl SqmCopy for SqmQuery {
    fn remap(&mut self, ctx: &mut SqmCopyContext) {
        match &mut self.part {
            SqmQueryPart::Spec(spec) => spec.remap(ctx),
            SqmQueryPart::Group { parts, .. } => {
                for part in parts {
                    part.remap(ctx);
                }
            }
        }
        for sort in &mut self.order_by {
            sort.expr.remap(ctx);
        }
        for expr in self.offset.iter_mut().chain(self.fetch.iter_mut()) {
            expr.remap(ctx);
        }
    }
}

impl SqmCopy for SqmQuerySpec {
    fn remap(&mut self, ctx: &mut SqmCopyContext) {
        // every node gets its new id before any reference is re-pointed
        for root in &self.from {
            register_tree(root, ctx);
        }
        for root in &mut self.from {
            root.remap(ctx);
        }
        for selection in &mut self.select.selections {
            remap_selection(selection, ctx);
        }
        if let Some(p) = &mut self.where_ {
            p.remap(ctx);
        }
        for expr in &mut self.group_by {
            expr.remap(ctx);
        }
        if let Some(p) = &mut self.having {
            p.remap(ctx);
        }
    }
}

fn register_tree(from: &SqmFrom, ctx: &mut SqmCopyContext) {
    for node in from.walk() {
        ctx.register_from(node.id);
    }
}

fn remap_selection(selection: &mut SqmSelection, ctx: &mut SqmCopyContext) {
    match &mut selection.item {
        SqmSelectable::Expression(expr) => expr.remap(ctx),
        SqmSelectable::Instantiation(inst) => {
            for arg in &mut inst.arguments {
                remap_selection(arg, ctx);
            }
        }
    }
}

impl SqmCopy for SqmFrom {
    fn remap(&mut self, ctx: &mut SqmCopyContext) {
        self.id = ctx.register_from(self.id);
        match &mut self.source {
            FromSource::Correlated { outer } => *outer = ctx.from_id(*outer),
            FromSource::Derived { query, .. } => query.remap(ctx),
            FromSource::Function { arguments, .. } => {
                for arg in arguments {
                    arg.remap(ctx);
                }
            }
            FromSource::Entity(_) | FromSource::Attribute { .. } | FromSource::Cte { .. } => {}
        }
        if let Some(on) = self.join.as_mut().and_then(|j| j.on.as_mut()) {
            on.remap(ctx);
        }
        for join in &mut self.joins {
            join.remap(ctx);
        }
    }
}

impl SqmCopy for SqmPath {
    fn remap(&mut self, ctx: &mut SqmCopyContext) {
        self.lhs = ctx.from_id(self.lhs);
    }
}

impl SqmCopy for SqmPredicate {
    fn remap(&mut self, ctx: &mut SqmCopyContext) {
        match self {
            SqmPredicate::Comparison { lhs, rhs, .. } => {
                lhs.remap(ctx);
                rhs.remap(ctx);
            }
            SqmPredicate::Between {
                expr, lower, upper, ..
            } => {
                expr.remap(ctx);
                lower.remap(ctx);
                upper.remap(ctx);
            }
            SqmPredicate::Like {
                expr,
                pattern,
                escape,
                ..
            } => {
                expr.remap(ctx);
                pattern.remap(ctx);
                if let Some(e) = escape {
                    e.remap(ctx);
                }
            }
            SqmPredicate::Null { expr, .. } | SqmPredicate::BooleanExpression { expr, .. } => {
                expr.remap(ctx)
            }
            SqmPredicate::Empty { path, .. } => path.remap(ctx),
            SqmPredicate::InList { expr, list, .. } => {
                expr.remap(ctx);
                for item in list {
                    item.remap(ctx);
                }
            }
            SqmPredicate::InSubquery { expr, query, .. } => {
                expr.remap(ctx);
                query.remap(ctx);
            }
            SqmPredicate::Exists { query, .. } => query.remap(ctx),
            SqmPredicate::MemberOf { expr, path, .. } => {
                expr.remap(ctx);
                path.remap(ctx);
            }
            SqmPredicate::Junction { lhs, rhs, .. } => {
                lhs.remap(ctx);
                rhs.remap(ctx);
            }
            SqmPredicate::Constant(_) => {}
        }
    }
}

impl SqmCopy for SqmExpression {
    fn remap(&mut self, ctx: &mut SqmCopyContext) {
        match self {
            SqmExpression::Path(path) | SqmExpression::CollectionSize(path) => path.remap(ctx),
            SqmExpression::Parameter { id, .. } => *id = ctx.param_id(*id),
            SqmExpression::Binary { lhs, rhs, .. } => {
                lhs.remap(ctx);
                rhs.remap(ctx);
            }
            SqmExpression::Unary { operand, .. } | SqmExpression::Cast { operand, .. } => {
                operand.remap(ctx)
            }
            SqmExpression::Function(function) => remap_function(function, ctx),
            SqmExpression::Trim {
                character, source, ..
            } => {
                if let Some(c) = character {
                    c.remap(ctx);
                }
                source.remap(ctx);
            }
            SqmExpression::Extract { source, .. } => source.remap(ctx),
            SqmExpression::CaseSearched {
                whens, otherwise, ..
            } => {
                for (when, then) in whens {
                    when.remap(ctx);
                    then.remap(ctx);
                }
                if let Some(o) = otherwise {
                    o.remap(ctx);
                }
            }
            SqmExpression::CaseSimple {
                operand,
                whens,
                otherwise,
                ..
            } => {
                operand.remap(ctx);
                for (when, then) in whens {
                    when.remap(ctx);
                    then.remap(ctx);
                }
                if let Some(o) = otherwise {
                    o.remap(ctx);
                }
            }
            SqmExpression::Tuple(items) => {
                for item in items {
                    item.remap(ctx);
                }
            }
            SqmExpression::Subquery(query) | SqmExpression::Quantified { query, .. } => {
                query.remap(ctx)
            }
            SqmExpression::Literal { .. }
            | SqmExpression::EntityTypeLiteral(_)
            | SqmExpression::Star => {}
        }
    }
}

fn remap_function(function: &mut SqmFunction, ctx: &mut SqmCopyContext) {
    for arg in &mut function.arguments {
        arg.remap(ctx);
    }
    if let Some(filter) = &mut function.filter {
        filter.remap(ctx);
    }
    if let Some(window) = &mut function.over {
        for expr in &mut window.partition_by {
            expr.remap(ctx);
        }
        for sort in &mut window.order_by {
            sort.expr.remap(ctx);
        }
    }
}
