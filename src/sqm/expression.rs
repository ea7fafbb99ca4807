//! Expression nodes.

use super::operator::{
    BinaryArithmeticOperator, CastType, FrameExclusion, FrameKind, FrameMode, TrimSpec,
    UnaryArithmeticOperator,
};
use super::path::{ParamId, SqmPath};
use super::predicate::SqmPredicate;
use super::statement::{SqmQuery, SqmSortSpec};
use super::types::{BasicType, SqmExpressible};

/// Literal values, as written.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Null,
    Boolean(bool),
    /// Numeric text without its type suffix.
    Numeric { text: String, ty: BasicType },
    String(String),
}

/// How a parameter was declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamLabel {
    /// `:name`
    Named(String),
    /// `?1`
    Positional(u32),
    /// Criteria parameter without a name.
    Anonymous,
}

impl std::fmt::Display for ParamLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamLabel::Named(name) => write!(f, ":{name}"),
            ParamLabel::Positional(position) => write!(f, "?{position}"),
            ParamLabel::Anonymous => f.write_str("<anonymous>"),
        }
    }
}

/// `all` / `any` quantifier over a subquery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    All,
    Any,
}

impl Quantifier {
    pub fn sql_text(self) -> &'static str {
        match self {
            Quantifier::All => "all",
            Quantifier::Any => "any",
        }
    }
}

/// Function invocation, including aggregates and window functions.
#[derive(Debug, Clone, PartialEq)]
pub struct SqmFunction {
    /// Lower-cased function name.
    pub name: String,
    pub arguments: Vec<SqmExpression>,
    pub distinct: bool,
    pub filter: Option<SqmPredicate>,
    pub over: Option<SqmWindow>,
    pub expressible: Option<SqmExpressible>,
}

/// `over (partition by ... order by ... frame)`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqmWindow {
    pub partition_by: Vec<SqmExpression>,
    pub order_by: Vec<SqmSortSpec>,
    pub frame: Option<SqmFrame>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmFrame {
    pub mode: FrameMode,
    pub start: SqmFrameBound,
    pub end: Option<SqmFrameBound>,
    pub exclusion: Option<FrameExclusion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmFrameBound {
    pub kind: FrameKind,
    pub offset: Option<Box<SqmExpression>>,
}

/// A typed value-producing node.
#[derive(Debug, Clone, PartialEq)]
pub enum SqmExpression {
    Path(SqmPath),
    Literal {
        value: LiteralValue,
        expressible: Option<SqmExpressible>,
    },
    Parameter {
        id: ParamId,
        label: ParamLabel,
        expressible: Option<SqmExpressible>,
    },
    Binary {
        op: BinaryArithmeticOperator,
        lhs: Box<SqmExpression>,
        rhs: Box<SqmExpression>,
        expressible: Option<SqmExpressible>,
    },
    Unary {
        op: UnaryArithmeticOperator,
        operand: Box<SqmExpression>,
    },
    Function(Box<SqmFunction>),
    Trim {
        spec: TrimSpec,
        character: Option<Box<SqmExpression>>,
        source: Box<SqmExpression>,
    },
    Cast {
        operand: Box<SqmExpression>,
        target: CastType,
    },
    /// `extract(field from source)`
    Extract {
        field: String,
        source: Box<SqmExpression>,
    },
    CaseSearched {
        whens: Vec<(SqmPredicate, SqmExpression)>,
        otherwise: Option<Box<SqmExpression>>,
        expressible: Option<SqmExpressible>,
    },
    CaseSimple {
        operand: Box<SqmExpression>,
        whens: Vec<(SqmExpression, SqmExpression)>,
        otherwise: Option<Box<SqmExpression>>,
        expressible: Option<SqmExpressible>,
    },
    Tuple(Vec<SqmExpression>),
    Subquery(Box<SqmQuery>),
    Quantified {
        quantifier: Quantifier,
        query: Box<SqmQuery>,
    },
    /// `size(plural)`
    CollectionSize(SqmPath),
    /// Entity name used as a discriminator value (`type(p) = Novel`).
    EntityTypeLiteral(String),
    /// `*` inside `count(*)`.
    Star,
}

impl SqmExpression {
    pub fn literal(value: LiteralValue) -> Self {
        let expressible = match &value {
            LiteralValue::Null => None,
            LiteralValue::Boolean(_) => Some(BasicType::Boolean.into()),
            LiteralValue::Numeric { ty, .. } => Some((*ty).into()),
            LiteralValue::String(_) => Some(BasicType::String.into()),
        };
        SqmExpression::Literal { value, expressible }
    }

    pub fn null() -> Self {
        Self::literal(LiteralValue::Null)
    }

    pub fn expressible(&self) -> Option<SqmExpressible> {
        match self {
            SqmExpression::Path(path) => path.expressible.clone(),
            SqmExpression::Literal { expressible, .. }
            | SqmExpression::Parameter { expressible, .. }
            | SqmExpression::Binary { expressible, .. }
            | SqmExpression::CaseSearched { expressible, .. }
            | SqmExpression::CaseSimple { expressible, .. } => expressible.clone(),
            SqmExpression::Unary { operand, .. } => operand.expressible(),
            SqmExpression::Function(function) => function.expressible.clone(),
            SqmExpression::Trim { .. } => Some(BasicType::String.into()),
            SqmExpression::Cast { target, .. } => {
                BasicType::from_cast_type(*target).map(SqmExpressible::Basic)
            }
            SqmExpression::Extract { .. } => Some(BasicType::Integer.into()),
            SqmExpression::Tuple(items) => Some(SqmExpressible::Tuple(
                items
                    .iter()
                    .map(|i| i.expressible().unwrap_or(SqmExpressible::Basic(BasicType::String)))
                    .collect(),
            )),
            SqmExpression::Subquery(query) | SqmExpression::Quantified { query, .. } => {
                query.single_selection_type()
            }
            SqmExpression::CollectionSize(_) => Some(BasicType::Integer.into()),
            SqmExpression::EntityTypeLiteral(name) => Some(SqmExpressible::Entity(name.clone())),
            SqmExpression::Star => None,
        }
    }

    /// Give an untyped node (parameter, null literal) the type it is compared to.
    pub fn infer_type(&mut self, inferred: Option<&SqmExpressible>) {
        let Some(inferred) = inferred else { return };
        match self {
            SqmExpression::Parameter { expressible, .. }
            | SqmExpression::Literal {
                value: LiteralValue::Null,
                expressible,
            } if expressible.is_none() => *expressible = Some(inferred.clone()),
            SqmExpression::Tuple(items) => {
                if let SqmExpressible::Tuple(types) = inferred {
                    for (item, ty) in items.iter_mut().zip(types) {
                        item.infer_type(Some(ty));
                    }
                }
            }
            _ => {}
        }
    }

    pub fn as_path(&self) -> Option<&SqmPath> {
        match self {
            SqmExpression::Path(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self, SqmExpression::Parameter { .. })
    }
}

impl From<SqmPath> for SqmExpression {
    fn from(path: SqmPath) -> Self {
        SqmExpression::Path(path)
    }
}
