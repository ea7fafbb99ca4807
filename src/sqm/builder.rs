//! Criteria builder: constructs SQM nodes programmatically.
//!
//! The HQL front-end builds its trees through the same constructors, so a
//! criteria query and the equivalent HQL produce identical SQM.
//!
//! ```ignore
//! let nb = NodeBuilder::new(&model);
//! let mut query = nb.create_query();
//! let b = nb.from("Book", Some("b"))?;
//! let price = nb.get(&b.path(), "price")?;
//! query.add_selection(b.path().into());
//! query.apply_predicate(nb.greater_than(price.into(), nb.literal(10))?);
//! query.add_root(b)?;
//! ```

use super::error::{SqmError, SqmResult};
use super::expression::{LiteralValue, ParamLabel, Quantifier, SqmExpression, SqmFunction};
use super::from::{FromSource, JoinInfo, SqmFrom};
use super::operator::{
    BinaryArithmeticOperator, BooleanOperator, CastType, ComparisonOperator, SortDirection,
    SqmJoinType, TrimSpec, UnaryArithmeticOperator,
};
use super::path::{NavigablePath, ParamId, PathKind, SqmPath};
use super::predicate::SqmPredicate;
use super::statement::{
    InstantiationTarget, SqmDeleteStatement, SqmDynamicInstantiation, SqmQuery, SqmQuerySource,
    SqmQuerySpec, SqmSelectStatement, SqmSelectable, SqmSelection, SqmSortSpec, SqmStatement,
    SqmUpdateStatement,
};
use super::types::{self, BasicType, SqmExpressible};
use crate::metamodel::{AttributeKind, DomainModel};
use crate::sql::dialect::helpers::lookup_function;

impl From<i32> for LiteralValue {
    fn from(v: i32) -> Self {
        LiteralValue::Numeric {
            text: v.to_string(),
            ty: BasicType::Integer,
        }
    }
}

impl From<i64> for LiteralValue {
    fn from(v: i64) -> Self {
        LiteralValue::Numeric {
            text: v.to_string(),
            ty: BasicType::Long,
        }
    }
}

impl From<f64> for LiteralValue {
    fn from(v: f64) -> Self {
        let mut buffer = ryu::Buffer::new();
        LiteralValue::Numeric {
            text: buffer.format(v).to_string(),
            ty: BasicType::Double,
        }
    }
}

impl From<bool> for LiteralValue {
    fn from(v: bool) -> Self {
        LiteralValue::Boolean(v)
    }
}

impl From<&str> for LiteralValue {
    fn from(v: &str) -> Self {
        LiteralValue::String(v.to_string())
    }
}

impl From<String> for LiteralValue {
    fn from(v: String) -> Self {
        LiteralValue::String(v)
    }
}

/// Either side of `wrap`: a predicate, or a boolean-valued expression.
#[derive(Debug, Clone, PartialEq)]
pub enum BooleanOperand {
    Predicate(SqmPredicate),
    Expression(SqmExpression),
}

impl From<SqmPredicate> for BooleanOperand {
    fn from(p: SqmPredicate) -> Self {
        BooleanOperand::Predicate(p)
    }
}

impl From<SqmExpression> for BooleanOperand {
    fn from(e: SqmExpression) -> Self {
        BooleanOperand::Expression(e)
    }
}

/// Factory for SQM nodes bound to a domain model.
#[derive(Clone, Copy)]
pub struct NodeBuilder<'m> {
    model: &'m dyn DomainModel,
}

impl<'m> NodeBuilder<'m> {
    pub fn new(model: &'m dyn DomainModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &'m dyn DomainModel {
        self.model
    }

    // =========================================================================
    // Statements
    // =========================================================================

    pub fn create_query(&self) -> SqmQuerySpec {
        SqmQuerySpec::default()
    }

    /// Wrap a finished query spec into a select statement.
    pub fn select_statement(&self, query: SqmQuery) -> SqmStatement {
        SqmStatement::Select(SqmSelectStatement::new(query, SqmQuerySource::Criteria))
    }

    pub fn create_update(&self, entity: &str, alias: Option<&str>) -> SqmResult<SqmUpdateStatement> {
        Ok(SqmUpdateStatement {
            target: self.from(entity, alias)?,
            versioned: false,
            assignments: Vec::new(),
            where_: None,
            source: SqmQuerySource::Criteria,
        })
    }

    pub fn create_delete(&self, entity: &str, alias: Option<&str>) -> SqmResult<SqmDeleteStatement> {
        Ok(SqmDeleteStatement {
            target: self.from(entity, alias)?,
            where_: None,
            source: SqmQuerySource::Criteria,
        })
    }

    /// `set path = value`, inferring the type of an untyped value.
    pub fn assignment(
        &self,
        path: SqmPath,
        mut value: SqmExpression,
    ) -> SqmResult<super::statement::SqmAssignment> {
        if !path.is_terminal() && !matches!(path.kind, PathKind::Entity { .. }) {
            return Err(SqmError::IllegalPathUsage(format!(
                "'{}' cannot be assigned",
                path.navigable_path
            )));
        }
        value.infer_type(path.expressible.as_ref());
        Ok(super::statement::SqmAssignment { path, value })
    }

    // =========================================================================
    // From clause
    // =========================================================================

    /// A root over `entity`, which may be a query name or a class name.
    pub fn from(&self, entity: &str, alias: Option<&str>) -> SqmResult<SqmFrom> {
        let entity = self
            .model
            .entity(entity)
            .ok_or_else(|| SqmError::UnknownEntity(entity.to_string()))?;
        Ok(SqmFrom::root(entity.name.clone(), alias.map(str::to_string)))
    }

    /// Attribute join of an association of `parent`.
    pub fn join(
        &self,
        parent: &SqmFrom,
        attribute: &str,
        join_type: SqmJoinType,
        alias: Option<&str>,
    ) -> SqmResult<SqmFrom> {
        self.attribute_join(parent, attribute, None, join_type, alias, false)
    }

    /// Fetch join; fetched associations are selected with their owner.
    pub fn fetch(
        &self,
        parent: &SqmFrom,
        attribute: &str,
        join_type: SqmJoinType,
    ) -> SqmResult<SqmFrom> {
        self.attribute_join(parent, attribute, None, join_type, None, true)
    }

    /// `join treat(parent.attribute as Subtype) alias`
    pub fn join_treat(
        &self,
        parent: &SqmFrom,
        attribute: &str,
        subtype: &str,
        join_type: SqmJoinType,
        alias: Option<&str>,
    ) -> SqmResult<SqmFrom> {
        self.attribute_join(parent, attribute, Some(subtype), join_type, alias, false)
    }

    pub(crate) fn attribute_join(
        &self,
        parent: &SqmFrom,
        attribute: &str,
        treat: Option<&str>,
        join_type: SqmJoinType,
        alias: Option<&str>,
        fetch: bool,
    ) -> SqmResult<SqmFrom> {
        let owner = parent.entity.as_deref().ok_or_else(|| {
            SqmError::IllegalPathUsage(format!(
                "'{}' has no attributes to join",
                parent.navigable_path
            ))
        })?;
        let (_, attr) = self.model.find_attribute(owner, attribute).ok_or_else(|| {
            SqmError::UnknownPathElement {
                container: owner.to_string(),
                attribute: attribute.to_string(),
            }
        })?;
        let target = match &attr.kind {
            AttributeKind::ToOne { target, .. }
            | AttributeKind::OneToMany { target, .. }
            | AttributeKind::ManyToMany { target, .. } => target.clone(),
            AttributeKind::Basic { .. } | AttributeKind::Embedded { .. } => {
                return Err(SqmError::IllegalPathUsage(format!(
                    "'{owner}.{attribute}' is not an association and cannot be joined"
                )))
            }
        };
        let entity = match treat {
            Some(subtype) => {
                let sub = self
                    .model
                    .entity(subtype)
                    .ok_or_else(|| SqmError::UnknownEntity(subtype.to_string()))?;
                if !self.model.is_subtype_of(&sub.name, &target) {
                    return Err(SqmError::TreatMisuse(format!(
                        "'{}' is not a subtype of '{target}'",
                        sub.name
                    )));
                }
                sub.name.clone()
            }
            None => target,
        };

        let mut navigable_path = parent.navigable_path.append(attribute, alias);
        if treat.is_some() {
            navigable_path = navigable_path.treat_as(&entity);
        }
        Ok(SqmFrom {
            id: super::path::FromId::next(),
            source: FromSource::Attribute {
                attribute: attribute.to_string(),
                treat: treat.map(|_| entity.clone()),
            },
            alias: alias.map(str::to_string),
            navigable_path,
            entity: Some(entity),
            joins: Vec::new(),
            join: Some(JoinInfo {
                join_type,
                fetch,
                on: None,
            }),
        })
    }

    /// `cross join Entity alias`
    pub fn cross_join(&self, entity: &str, alias: Option<&str>) -> SqmResult<SqmFrom> {
        let mut join = self.from(entity, alias)?;
        join.join = Some(JoinInfo {
            join_type: SqmJoinType::Cross,
            fetch: false,
            on: None,
        });
        Ok(join)
    }

    /// `join Entity alias on ...`
    pub fn entity_join(
        &self,
        entity: &str,
        alias: Option<&str>,
        join_type: SqmJoinType,
        on: Option<SqmPredicate>,
    ) -> SqmResult<SqmFrom> {
        let mut join = self.from(entity, alias)?;
        join.join = Some(JoinInfo {
            join_type,
            fetch: false,
            on,
        });
        Ok(join)
    }

    /// A subquery root standing for `outer`.
    pub fn correlate(&self, outer: &SqmFrom) -> SqmFrom {
        SqmFrom {
            id: super::path::FromId::next(),
            source: FromSource::Correlated { outer: outer.id },
            alias: outer.alias.clone(),
            navigable_path: outer.navigable_path.clone(),
            entity: outer.entity.clone(),
            joins: Vec::new(),
            join: None,
        }
    }

    // =========================================================================
    // Paths
    // =========================================================================

    pub fn get(&self, path: &SqmPath, attribute: &str) -> SqmResult<SqmPath> {
        path.get(self.model, attribute)
    }

    /// Dereference a dotted attribute path: `get_path(b, "author.name")`.
    pub fn get_path(&self, path: &SqmPath, dotted: &str) -> SqmResult<SqmPath> {
        dotted
            .split('.')
            .try_fold(path.clone(), |p, name| p.get(self.model, name))
    }

    pub fn treat(&self, path: &SqmPath, entity: &str) -> SqmResult<SqmPath> {
        path.treat_as(self.model, entity)
    }

    /// `type(path)`
    pub fn type_of(&self, path: &SqmPath) -> SqmResult<SqmExpression> {
        Ok(SqmExpression::Path(path.discriminator()?))
    }

    pub fn entity_type_literal(&self, entity: &str) -> SqmResult<SqmExpression> {
        let entity = self
            .model
            .entity(entity)
            .ok_or_else(|| SqmError::UnknownEntity(entity.to_string()))?;
        Ok(SqmExpression::EntityTypeLiteral(entity.name.clone()))
    }

    // =========================================================================
    // Literals and parameters
    // =========================================================================

    pub fn literal(&self, value: impl Into<LiteralValue>) -> SqmExpression {
        SqmExpression::literal(value.into())
    }

    pub fn null_literal(&self) -> SqmExpression {
        SqmExpression::null()
    }

    /// Numeric literal as written in a query, with an optional type suffix:
    /// `L` long, `BI` big integer, `F` float, `D` double, `BD` big decimal.
    pub fn numeric_literal(&self, text: &str) -> SqmResult<SqmExpression> {
        let lower = text.to_ascii_lowercase();
        let error = |reason: &str| SqmError::LiteralNumberFormat {
            text: text.to_string(),
            reason: reason.to_string(),
        };
        let (digits, ty) = if let Some(d) = lower.strip_suffix("bi") {
            if d.is_empty() || !d.bytes().all(|b| b.is_ascii_digit()) {
                return Err(error("big integer literals take digits only"));
            }
            (d, BasicType::BigInteger)
        } else if let Some(d) = lower.strip_suffix("bd") {
            d.parse::<f64>()
                .map_err(|_| error("not a valid decimal number"))?;
            (d, BasicType::BigDecimal)
        } else if let Some(d) = lower.strip_suffix('l') {
            d.parse::<i64>()
                .map_err(|_| error("out of range for a long"))?;
            (d, BasicType::Long)
        } else if let Some(d) = lower.strip_suffix('f') {
            d.parse::<f64>()
                .map_err(|_| error("not a valid floating point number"))?;
            (d, BasicType::Float)
        } else if let Some(d) = lower.strip_suffix('d') {
            d.parse::<f64>()
                .map_err(|_| error("not a valid floating point number"))?;
            (d, BasicType::Double)
        } else if lower.contains(['.', 'e']) {
            lower
                .parse::<f64>()
                .map_err(|_| error("not a valid floating point number"))?;
            (lower.as_str(), BasicType::Double)
        } else if lower.parse::<i32>().is_ok() {
            (lower.as_str(), BasicType::Integer)
        } else if lower.parse::<i64>().is_ok() {
            (lower.as_str(), BasicType::Long)
        } else {
            return Err(error("integer literal out of range"));
        };
        Ok(SqmExpression::literal(LiteralValue::Numeric {
            text: digits.to_string(),
            ty,
        }))
    }

    /// `:name`
    pub fn parameter(&self, name: &str, ty: Option<BasicType>) -> SqmExpression {
        SqmExpression::Parameter {
            id: ParamId::next(),
            label: ParamLabel::Named(name.to_string()),
            expressible: ty.map(SqmExpressible::Basic),
        }
    }

    /// `?position`
    pub fn positional_parameter(&self, position: u32, ty: Option<BasicType>) -> SqmExpression {
        SqmExpression::Parameter {
            id: ParamId::next(),
            label: ParamLabel::Positional(position),
            expressible: ty.map(SqmExpressible::Basic),
        }
    }

    pub fn anonymous_parameter(&self, ty: Option<BasicType>) -> SqmExpression {
        SqmExpression::Parameter {
            id: ParamId::next(),
            label: ParamLabel::Anonymous,
            expressible: ty.map(SqmExpressible::Basic),
        }
    }

    // =========================================================================
    // Arithmetic
    // =========================================================================

    pub fn arithmetic(
        &self,
        op: BinaryArithmeticOperator,
        mut lhs: SqmExpression,
        mut rhs: SqmExpression,
    ) -> SqmResult<SqmExpression> {
        lhs.infer_type(rhs.expressible().as_ref());
        rhs.infer_type(lhs.expressible().as_ref());
        check_operable(op, &lhs, &rhs)?;
        let expressible = types::arithmetic_result_type(
            op,
            lhs.expressible().as_ref(),
            rhs.expressible().as_ref(),
            false,
        );
        Ok(SqmExpression::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            expressible,
        })
    }

    pub fn sum(&self, lhs: SqmExpression, rhs: SqmExpression) -> SqmResult<SqmExpression> {
        self.arithmetic(BinaryArithmeticOperator::Add, lhs, rhs)
    }

    pub fn diff(&self, lhs: SqmExpression, rhs: SqmExpression) -> SqmResult<SqmExpression> {
        self.arithmetic(BinaryArithmeticOperator::Subtract, lhs, rhs)
    }

    pub fn prod(&self, lhs: SqmExpression, rhs: SqmExpression) -> SqmResult<SqmExpression> {
        self.arithmetic(BinaryArithmeticOperator::Multiply, lhs, rhs)
    }

    pub fn quot(&self, lhs: SqmExpression, rhs: SqmExpression) -> SqmResult<SqmExpression> {
        self.arithmetic(BinaryArithmeticOperator::Quot, lhs, rhs)
    }

    pub fn div(&self, lhs: SqmExpression, rhs: SqmExpression) -> SqmResult<SqmExpression> {
        self.arithmetic(BinaryArithmeticOperator::Divide, lhs, rhs)
    }

    pub fn modulo(&self, lhs: SqmExpression, rhs: SqmExpression) -> SqmResult<SqmExpression> {
        self.arithmetic(BinaryArithmeticOperator::Modulo, lhs, rhs)
    }

    pub fn neg(&self, operand: SqmExpression) -> SqmExpression {
        SqmExpression::Unary {
            op: UnaryArithmeticOperator::UnaryMinus,
            operand: Box::new(operand),
        }
    }

    // =========================================================================
    // Functions
    // =========================================================================

    /// Generic function call; the result type comes from the function
    /// registry, or from the first argument.
    pub fn function(&self, name: &str, arguments: Vec<SqmExpression>) -> SqmExpression {
        let name = name.to_ascii_lowercase();
        let argument_types: Vec<_> = arguments.iter().map(SqmExpression::expressible).collect();
        let expressible = match lookup_function(&name, &[]) {
            Some(f) if f.return_type.is_some() => f.return_type.map(SqmExpressible::Basic),
            _ if matches!(name.as_str(), "coalesce" | "nullif" | "min" | "max") => {
                types::highest_precedence_of(argument_types.iter().map(Option::as_ref))
            }
            _ => argument_types.into_iter().next().flatten(),
        };
        SqmExpression::Function(Box::new(SqmFunction {
            name,
            arguments,
            distinct: false,
            filter: None,
            over: None,
            expressible,
        }))
    }

    pub fn concat(&self, lhs: SqmExpression, rhs: SqmExpression) -> SqmExpression {
        self.function("concat", vec![lhs, rhs])
    }

    pub fn lower(&self, expr: SqmExpression) -> SqmExpression {
        self.function("lower", vec![expr])
    }

    pub fn upper(&self, expr: SqmExpression) -> SqmExpression {
        self.function("upper", vec![expr])
    }

    pub fn length(&self, expr: SqmExpression) -> SqmExpression {
        self.function("length", vec![expr])
    }

    pub fn substring(
        &self,
        expr: SqmExpression,
        start: SqmExpression,
        length: Option<SqmExpression>,
    ) -> SqmExpression {
        let mut args = vec![expr, start];
        args.extend(length);
        self.function("substring", args)
    }

    pub fn locate(
        &self,
        pattern: SqmExpression,
        expr: SqmExpression,
        start: Option<SqmExpression>,
    ) -> SqmExpression {
        let mut args = vec![pattern, expr];
        args.extend(start);
        self.function("locate", args)
    }

    pub fn trim(
        &self,
        spec: TrimSpec,
        character: Option<SqmExpression>,
        source: SqmExpression,
    ) -> SqmExpression {
        SqmExpression::Trim {
            spec,
            character: character.map(Box::new),
            source: Box::new(source),
        }
    }

    pub fn cast(&self, operand: SqmExpression, target: CastType) -> SqmExpression {
        SqmExpression::Cast {
            operand: Box::new(operand),
            target,
        }
    }

    pub fn coalesce(&self, arguments: Vec<SqmExpression>) -> SqmExpression {
        self.function("coalesce", arguments)
    }

    pub fn nullif(&self, lhs: SqmExpression, rhs: SqmExpression) -> SqmExpression {
        self.function("nullif", vec![lhs, rhs])
    }

    /// `size(plural)`
    pub fn size(&self, path: &SqmPath) -> SqmResult<SqmExpression> {
        require_plural(path, "size()")?;
        Ok(SqmExpression::CollectionSize(path.clone()))
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    fn aggregate(&self, name: &str, arg: SqmExpression, distinct: bool) -> SqmExpression {
        let mut function = self.function(name, vec![arg]);
        if let SqmExpression::Function(f) = &mut function {
            f.distinct = distinct;
        }
        function
    }

    pub fn count(&self, arg: SqmExpression) -> SqmExpression {
        self.aggregate("count", arg, false)
    }

    pub fn count_star(&self) -> SqmExpression {
        self.aggregate("count", SqmExpression::Star, false)
    }

    pub fn count_distinct(&self, arg: SqmExpression) -> SqmExpression {
        self.aggregate("count", arg, true)
    }

    pub fn sum_agg(&self, arg: SqmExpression) -> SqmExpression {
        self.aggregate("sum", arg, false)
    }

    pub fn avg(&self, arg: SqmExpression) -> SqmExpression {
        self.aggregate("avg", arg, false)
    }

    pub fn max(&self, arg: SqmExpression) -> SqmExpression {
        self.aggregate("max", arg, false)
    }

    pub fn min(&self, arg: SqmExpression) -> SqmExpression {
        self.aggregate("min", arg, false)
    }

    // =========================================================================
    // Case expressions
    // =========================================================================

    pub fn select_case(&self) -> SearchedCaseBuilder {
        SearchedCaseBuilder::default()
    }

    pub fn simple_case(&self, operand: SqmExpression) -> SimpleCaseBuilder {
        SimpleCaseBuilder {
            operand,
            whens: Vec::new(),
        }
    }

    // =========================================================================
    // Predicates
    // =========================================================================

    pub fn compare(
        &self,
        mut lhs: SqmExpression,
        op: ComparisonOperator,
        mut rhs: SqmExpression,
    ) -> SqmResult<SqmPredicate> {
        self.check_comparable(&lhs, &rhs)?;
        lhs.infer_type(rhs.expressible().as_ref());
        rhs.infer_type(lhs.expressible().as_ref());
        Ok(SqmPredicate::Comparison { lhs, op, rhs })
    }

    pub fn equal(&self, lhs: SqmExpression, rhs: SqmExpression) -> SqmResult<SqmPredicate> {
        self.compare(lhs, ComparisonOperator::Equal, rhs)
    }

    pub fn not_equal(&self, lhs: SqmExpression, rhs: SqmExpression) -> SqmResult<SqmPredicate> {
        self.compare(lhs, ComparisonOperator::NotEqual, rhs)
    }

    pub fn greater_than(&self, lhs: SqmExpression, rhs: SqmExpression) -> SqmResult<SqmPredicate> {
        self.compare(lhs, ComparisonOperator::GreaterThan, rhs)
    }

    pub fn greater_than_or_equal(
        &self,
        lhs: SqmExpression,
        rhs: SqmExpression,
    ) -> SqmResult<SqmPredicate> {
        self.compare(lhs, ComparisonOperator::GreaterThanOrEqual, rhs)
    }

    pub fn less_than(&self, lhs: SqmExpression, rhs: SqmExpression) -> SqmResult<SqmPredicate> {
        self.compare(lhs, ComparisonOperator::LessThan, rhs)
    }

    pub fn less_than_or_equal(
        &self,
        lhs: SqmExpression,
        rhs: SqmExpression,
    ) -> SqmResult<SqmPredicate> {
        self.compare(lhs, ComparisonOperator::LessThanOrEqual, rhs)
    }

    pub fn between(
        &self,
        mut expr: SqmExpression,
        mut lower: SqmExpression,
        mut upper: SqmExpression,
    ) -> SqmResult<SqmPredicate> {
        self.check_comparable(&expr, &lower)?;
        self.check_comparable(&expr, &upper)?;
        let ty = types::highest_precedence_of([
            expr.expressible().as_ref(),
            lower.expressible().as_ref(),
            upper.expressible().as_ref(),
        ]);
        expr.infer_type(ty.as_ref());
        lower.infer_type(ty.as_ref());
        upper.infer_type(ty.as_ref());
        Ok(SqmPredicate::Between {
            expr,
            lower,
            upper,
            negated: false,
        })
    }

    pub fn like(
        &self,
        expr: SqmExpression,
        mut pattern: SqmExpression,
        escape: Option<SqmExpression>,
    ) -> SqmPredicate {
        pattern.infer_type(Some(&BasicType::String.into()));
        SqmPredicate::Like {
            expr,
            pattern,
            escape: escape.map(|mut e| {
                e.infer_type(Some(&BasicType::Character.into()));
                e
            }),
            negated: false,
            case_sensitive: true,
        }
    }

    pub fn ilike(&self, expr: SqmExpression, pattern: SqmExpression) -> SqmPredicate {
        let mut predicate = self.like(expr, pattern, None);
        if let SqmPredicate::Like { case_sensitive, .. } = &mut predicate {
            *case_sensitive = false;
        }
        predicate
    }

    pub fn not_like(&self, expr: SqmExpression, pattern: SqmExpression) -> SqmPredicate {
        self.like(expr, pattern, None).negated()
    }

    pub fn is_null(&self, expr: SqmExpression) -> SqmPredicate {
        SqmPredicate::Null {
            expr,
            negated: false,
        }
    }

    pub fn is_not_null(&self, expr: SqmExpression) -> SqmPredicate {
        self.is_null(expr).negated()
    }

    /// `plural is empty`
    pub fn is_empty(&self, path: &SqmPath) -> SqmResult<SqmPredicate> {
        require_plural(path, "is empty")?;
        Ok(SqmPredicate::Empty {
            path: path.clone(),
            negated: false,
        })
    }

    /// `expr member of plural`
    pub fn is_member(&self, mut expr: SqmExpression, path: &SqmPath) -> SqmResult<SqmPredicate> {
        require_plural(path, "member of")?;
        expr.infer_type(path.expressible.as_ref());
        Ok(SqmPredicate::MemberOf {
            expr,
            path: path.clone(),
            negated: false,
        })
    }

    pub fn in_list(&self, expr: SqmExpression, mut list: Vec<SqmExpression>) -> SqmResult<SqmPredicate> {
        for item in &mut list {
            self.check_comparable(&expr, item)?;
            item.infer_type(expr.expressible().as_ref());
        }
        Ok(SqmPredicate::InList {
            expr,
            list,
            negated: false,
        })
    }

    pub fn in_subquery(&self, expr: SqmExpression, query: SqmQuery) -> SqmPredicate {
        SqmPredicate::InSubquery {
            expr,
            query: Box::new(query),
            negated: false,
        }
    }

    pub fn exists(&self, query: SqmQuery) -> SqmPredicate {
        SqmPredicate::Exists {
            query: Box::new(query),
            negated: false,
        }
    }

    pub fn all(&self, query: SqmQuery) -> SqmExpression {
        SqmExpression::Quantified {
            quantifier: Quantifier::All,
            query: Box::new(query),
        }
    }

    pub fn any(&self, query: SqmQuery) -> SqmExpression {
        SqmExpression::Quantified {
            quantifier: Quantifier::Any,
            query: Box::new(query),
        }
    }

    /// `a and (b and (c ...))`; empty input is `conjunction()`.
    pub fn and(&self, predicates: Vec<SqmPredicate>) -> SqmPredicate {
        SqmPredicate::junction(BooleanOperator::And, predicates)
    }

    /// `a or (b or (c ...))`; empty input is `disjunction()`.
    pub fn or(&self, predicates: Vec<SqmPredicate>) -> SqmPredicate {
        SqmPredicate::junction(BooleanOperator::Or, predicates)
    }

    pub fn conjunction(&self) -> SqmPredicate {
        SqmPredicate::Constant(true)
    }

    pub fn disjunction(&self) -> SqmPredicate {
        SqmPredicate::Constant(false)
    }

    pub fn not(&self, predicate: SqmPredicate) -> SqmPredicate {
        predicate.negated()
    }

    /// Use a predicate or boolean expression as a predicate.
    pub fn wrap(&self, operand: impl Into<BooleanOperand>) -> SqmResult<SqmPredicate> {
        match operand.into() {
            BooleanOperand::Predicate(p) => Ok(p),
            BooleanOperand::Expression(mut expr) => {
                match expr.expressible() {
                    None | Some(SqmExpressible::Basic(BasicType::Boolean)) => {}
                    Some(other) => {
                        return Err(SqmError::Semantic(format!(
                            "Non-boolean expression of type '{}' used as a predicate",
                            other.type_name()
                        )))
                    }
                }
                expr.infer_type(Some(&BasicType::Boolean.into()));
                Ok(SqmPredicate::BooleanExpression {
                    expr,
                    negated: false,
                })
            }
        }
    }

    pub fn is_true(&self, expr: SqmExpression) -> SqmResult<SqmPredicate> {
        self.equal(expr, self.literal(true))
    }

    pub fn is_false(&self, expr: SqmExpression) -> SqmResult<SqmPredicate> {
        self.equal(expr, self.literal(false))
    }

    // =========================================================================
    // Ordering and selections
    // =========================================================================

    pub fn asc(&self, expr: SqmExpression) -> SqmSortSpec {
        SqmSortSpec::new(expr, SortDirection::Ascending)
    }

    pub fn desc(&self, expr: SqmExpression) -> SqmSortSpec {
        SqmSortSpec::new(expr, SortDirection::Descending)
    }

    /// Wrap a query spec as a subquery (or top-level query part).
    pub fn subquery(&self, spec: SqmQuerySpec) -> SqmQuery {
        SqmQuery::new(spec)
    }

    /// `new fully.qualified.Class(args...)`
    pub fn construct(&self, class: &str, arguments: Vec<SqmSelection>) -> SqmSelection {
        self.instantiation(InstantiationTarget::Class(class.to_string()), arguments)
    }

    /// `new list(args...)`
    pub fn list(&self, arguments: Vec<SqmSelection>) -> SqmSelection {
        self.instantiation(InstantiationTarget::List, arguments)
    }

    /// `new map(args...)`
    pub fn map(&self, arguments: Vec<SqmSelection>) -> SqmSelection {
        self.instantiation(InstantiationTarget::Map, arguments)
    }

    fn instantiation(
        &self,
        target: InstantiationTarget,
        arguments: Vec<SqmSelection>,
    ) -> SqmSelection {
        SqmSelection {
            item: SqmSelectable::Instantiation(SqmDynamicInstantiation { target, arguments }),
            alias: None,
        }
    }

    /// Multi-select returning a tuple per row.
    pub fn tuple(&self, selections: Vec<SqmSelection>) -> Vec<SqmSelection> {
        selections
    }

    /// Multi-select returning an array per row.
    pub fn array(&self, selections: Vec<SqmSelection>) -> Vec<SqmSelection> {
        selections
    }

    /// Row value constructor: `(a, b)`.
    pub fn row(&self, items: Vec<SqmExpression>) -> SqmExpression {
        SqmExpression::Tuple(items)
    }

    /// Reject comparisons between obviously incompatible types. Entities
    /// compare through their identifier type.
    fn check_comparable(&self, lhs: &SqmExpression, rhs: &SqmExpression) -> SqmResult<()> {
        let (Some(l), Some(r)) = (self.comparison_type(lhs), self.comparison_type(rhs)) else {
            return Ok(());
        };
        let incompatible = (l.is_numeric() && (r.is_textual() || r.is_temporal()))
            || (r.is_numeric() && (l.is_textual() || l.is_temporal()));
        if incompatible {
            return Err(SqmError::Semantic(format!(
                "Cannot compare left expression of type '{l}' with right expression of type '{r}'"
            )));
        }
        Ok(())
    }

    fn comparison_type(&self, expr: &SqmExpression) -> Option<BasicType> {
        if matches!(expr, SqmExpression::EntityTypeLiteral(_)) {
            return None;
        }
        match expr.expressible()? {
            SqmExpressible::Basic(b) => Some(b),
            SqmExpressible::Entity(name) => self.model.entity(&name).map(|e| e.id_type()),
            _ => None,
        }
    }

    /// Navigable path of a root, for building expected values in tests.
    pub fn root_path(&self, entity: &str, alias: Option<&str>) -> NavigablePath {
        NavigablePath::root(entity, alias)
    }
}

fn require_plural(path: &SqmPath, context: &str) -> SqmResult<()> {
    match path.kind {
        PathKind::Plural { .. } => Ok(()),
        _ => Err(SqmError::IllegalPathUsage(format!(
            "{context} requires a plural path, '{}' is not one",
            path.navigable_path
        ))),
    }
}

/// Reject arithmetic on operands that are neither numeric nor temporal.
///
/// Numbers combine with numbers (and scale durations), durations add to and
/// subtract from durations, and temporal values accept `+ duration` and
/// `- temporal|duration`. Untyped operands are not checked.
fn check_operable(
    op: BinaryArithmeticOperator,
    lhs: &SqmExpression,
    rhs: &SqmExpression,
) -> SqmResult<()> {
    use BinaryArithmeticOperator::*;

    let (Some(l), Some(r)) = (lhs.expressible(), rhs.expressible()) else {
        return Ok(());
    };
    let operand_error = |operand: &SqmExpressible, expected: &str| -> SqmResult<()> {
        Err(SqmError::Semantic(format!(
            "Operand of {} is of type '{}' which is not {expected}",
            op.operator_symbol(),
            operand.type_name()
        )))
    };
    let right = r.basic();
    let right_is = |f: fn(BasicType) -> bool| right.is_some_and(f);
    let is_duration = |b: BasicType| b == BasicType::Duration;

    match l.basic() {
        Some(b) if b.is_numeric() => {
            if right_is(BasicType::is_numeric) || (op == Multiply && right_is(is_duration)) {
                Ok(())
            } else {
                operand_error(&r, "a numeric type")
            }
        }
        Some(BasicType::Duration) => match op {
            Add | Subtract if right_is(is_duration) => Ok(()),
            Add | Subtract => operand_error(&r, "a temporal amount"),
            _ => operand_error(&l, "a numeric type"),
        },
        Some(b) if b.is_temporal() => match op {
            Add if right_is(is_duration) => Ok(()),
            Subtract if right_is(is_duration) || right_is(BasicType::is_temporal) => Ok(()),
            Add | Subtract => operand_error(&r, "a temporal amount"),
            _ => operand_error(&l, "a numeric type"),
        },
        _ => operand_error(&l, "a numeric or temporal type"),
    }
}

/// `case when ... then ... [else ...] end`
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct SearchedCaseBuilder {
    whens: Vec<(SqmPredicate, SqmExpression)>,
}

impl SearchedCaseBuilder {
    pub fn when(mut self, predicate: SqmPredicate, result: SqmExpression) -> Self {
        self.whens.push((predicate, result));
        self
    }

    pub fn otherwise(self, result: SqmExpression) -> SqmExpression {
        self.finish(Some(result))
    }

    pub fn end(self) -> SqmExpression {
        self.finish(None)
    }

    fn finish(self, otherwise: Option<SqmExpression>) -> SqmExpression {
        let expressible = types::highest_precedence_of(
            self.whens
                .iter()
                .map(|(_, r)| r.expressible())
                .chain(otherwise.iter().map(SqmExpression::expressible))
                .collect::<Vec<_>>()
                .iter()
                .map(Option::as_ref),
        );
        SqmExpression::CaseSearched {
            whens: self.whens,
            otherwise: otherwise.map(Box::new),
            expressible,
        }
    }
}

/// `case operand when value then ... [else ...] end`
#[derive(Debug, Clone)]
#[must_use]
pub struct SimpleCaseBuilder {
    operand: SqmExpression,
    whens: Vec<(SqmExpression, SqmExpression)>,
}

impl SimpleCaseBuilder {
    pub fn when(mut self, mut value: SqmExpression, result: SqmExpression) -> Self {
        value.infer_type(self.operand.expressible().as_ref());
        self.whens.push((value, result));
        self
    }

    pub fn otherwise(self, result: SqmExpression) -> SqmExpression {
        self.finish(Some(result))
    }

    pub fn end(self) -> SqmExpression {
        self.finish(None)
    }

    fn finish(self, otherwise: Option<SqmExpression>) -> SqmExpression {
        let expressible = types::highest_precedence_of(
            self.whens
                .iter()
                .map(|(_, r)| r.expressible())
                .chain(otherwise.iter().map(SqmExpression::expressible))
                .collect::<Vec<_>>()
                .iter()
                .map(Option::as_ref),
        );
        SqmExpression::CaseSimple {
            operand: Box::new(self.operand),
            whens: self.whens,
            otherwise: otherwise.map(Box::new),
            expressible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metamodel::test_model;

    #[test]
    fn test_numeric_literal_suffixes() {
        let model = test_model::library();
        let nb = NodeBuilder::new(&model);
        let ty = |text: &str| nb.numeric_literal(text).unwrap().expressible();
        assert_eq!(ty("10"), Some(BasicType::Integer.into()));
        assert_eq!(ty("3000000000"), Some(BasicType::Long.into()));
        assert_eq!(ty("10L"), Some(BasicType::Long.into()));
        assert_eq!(ty("10bi"), Some(BasicType::BigInteger.into()));
        assert_eq!(ty("1.5"), Some(BasicType::Double.into()));
        assert_eq!(ty("1.5f"), Some(BasicType::Float.into()));
        assert_eq!(ty("1.5BD"), Some(BasicType::BigDecimal.into()));
    }

    #[test]
    fn test_numeric_literal_out_of_range() {
        let model = test_model::library();
        let nb = NodeBuilder::new(&model);
        let err = nb.numeric_literal("99999999999999999999").unwrap_err();
        assert!(matches!(err, SqmError::LiteralNumberFormat { .. }));
        assert!(nb.numeric_literal("99999999999999999999bi").is_ok());
    }

    #[test]
    fn test_float_literal_uses_shortest_form() {
        let model = test_model::library();
        let nb = NodeBuilder::new(&model);
        let SqmExpression::Literal {
            value: LiteralValue::Numeric { text, .. },
            ..
        } = nb.literal(0.1_f64)
        else {
            panic!("expected numeric literal");
        };
        assert_eq!(text, "0.1");
    }

    #[test]
    fn test_aggregate_types() {
        let model = test_model::library();
        let nb = NodeBuilder::new(&model);
        let b = nb.from("Publication", Some("p")).unwrap();
        let price = nb.get(&b.path(), "price").unwrap();
        assert_eq!(
            nb.avg(price.clone().into()).expressible(),
            Some(BasicType::Double.into())
        );
        assert_eq!(
            nb.count(price.clone().into()).expressible(),
            Some(BasicType::Long.into())
        );
        assert_eq!(
            nb.sum_agg(price.clone().into()).expressible(),
            price.expressible
        );
        assert_eq!(
            nb.concat(nb.literal("a"), nb.literal(1)).expressible(),
            Some(BasicType::String.into())
        );
    }

    #[test]
    fn test_join_basic_attribute_fails() {
        let model = test_model::library();
        let nb = NodeBuilder::new(&model);
        let p = nb.from("Publication", Some("p")).unwrap();
        let err = nb.join(&p, "title", SqmJoinType::Inner, None).unwrap_err();
        assert!(matches!(err, SqmError::IllegalPathUsage(_)));
    }

    #[test]
    fn test_terminal_path_dereference() {
        let model = test_model::library();
        let nb = NodeBuilder::new(&model);
        let p = nb.from("Publication", Some("p")).unwrap();
        let title = nb.get(&p.path(), "title").unwrap();
        let err = nb.get(&title, "length").unwrap_err();
        assert!(matches!(err, SqmError::TerminalPathDereference { .. }));
    }

    #[test]
    fn test_parameter_takes_compared_type() {
        let model = test_model::library();
        let nb = NodeBuilder::new(&model);
        let p = nb.from("Publication", Some("p")).unwrap();
        let title = nb.get(&p.path(), "title").unwrap();
        let SqmPredicate::Comparison { rhs, .. } =
            nb.equal(title.into(), nb.parameter("t", None)).unwrap()
        else {
            panic!("expected comparison");
        };
        assert_eq!(rhs.expressible(), Some(BasicType::String.into()));
    }

    #[test]
    fn test_arithmetic_operand_types() {
        let model = test_model::library();
        let nb = NodeBuilder::new(&model);
        let p = nb.from("Publication", Some("p")).unwrap();
        let path = p.path();
        let title: SqmExpression = nb.get(&path, "title").unwrap().into();
        let price: SqmExpression = nb.get(&path, "price").unwrap().into();
        let published: SqmExpression = nb.get(&path, "publishedOn").unwrap().into();
        let duration = || nb.anonymous_parameter(Some(BasicType::Duration));

        assert!(nb.sum(price.clone(), nb.literal(1)).is_ok());
        assert!(nb.sum(price.clone(), nb.parameter("delta", None)).is_ok());
        assert!(nb.prod(nb.literal(2), duration()).is_ok());
        assert!(nb.sum(published.clone(), duration()).is_ok());
        assert!(nb.diff(published.clone(), published.clone()).is_ok());

        let err = nb.sum(title, nb.literal(1)).unwrap_err();
        assert!(matches!(err, SqmError::Semantic(_)));
        assert!(err.to_string().contains("'string'"), "{err}");
        assert!(nb.sum(nb.literal(1), nb.literal("a")).is_err());
        assert!(nb.prod(published, nb.literal(2)).is_err());
        assert!(nb.diff(duration(), nb.literal(1)).is_err());
        assert!(nb.sum(price, nb.literal(true)).is_err());
    }

    #[test]
    fn test_entity_compares_by_identifier_type() {
        let model = test_model::library();
        let nb = NodeBuilder::new(&model);
        let p = nb.from("Publication", Some("p")).unwrap();
        let author: SqmExpression = nb.get(&p.path(), "author").unwrap().into();

        assert!(nb.equal(author.clone(), nb.literal(1)).is_ok());
        let err = nb.equal(author, nb.literal("x")).unwrap_err();
        assert!(err.to_string().contains("'long'"), "{err}");
    }

    #[test]
    fn test_wrap_rejects_non_boolean() {
        let model = test_model::library();
        let nb = NodeBuilder::new(&model);
        assert!(nb.wrap(nb.literal("x")).is_err());
        assert!(nb.wrap(nb.literal(true)).is_ok());
        let p = nb.conjunction();
        assert_eq!(nb.wrap(p.clone()).unwrap(), p);
    }
}
