//! Indented dump of an SQM tree, logged at trace level before translation.

use std::fmt::Write;

use super::expression::{LiteralValue, SqmExpression};
use super::from::{FromSource, SqmFrom};
use super::path::SqmPath;
use super::predicate::SqmPredicate;
use super::statement::{SqmQuery, SqmQueryPart, SqmQuerySpec, SqmStatement};
use super::visit::{self, SqmVisitor};

#[derive(Default)]
struct TreePrinter {
    out: String,
    depth: usize,
}

impl TreePrinter {
    fn line(&mut self, text: impl std::fmt::Display) {
        let _ = writeln!(self.out, "{:indent$}{text}", "", indent = self.depth * 2);
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self)) {
        self.depth += 1;
        f(self);
        self.depth -= 1;
    }
}

impl SqmVisitor for TreePrinter {
    fn visit_statement(&mut self, statement: &SqmStatement) {
        let label = match statement {
            SqmStatement::Select(_) => "select-statement",
            SqmStatement::Update(s) if s.versioned => "update-statement (versioned)",
            SqmStatement::Update(_) => "update-statement",
            SqmStatement::Delete(_) => "delete-statement",
            SqmStatement::Insert(_) => "insert-statement",
        };
        self.line(label);
        self.nested(|p| visit::walk_statement(p, statement));
    }

    fn visit_query(&mut self, query: &SqmQuery) {
        if let SqmQueryPart::Group { op, .. } = &query.part {
            self.line(format!("query-group [{}]", op.sql_text()));
        }
        self.nested(|p| visit::walk_query(p, query));
    }

    fn visit_spec(&mut self, spec: &SqmQuerySpec) {
        self.line(if spec.select.distinct {
            "query-spec (distinct)"
        } else {
            "query-spec"
        });
        self.nested(|p| visit::walk_spec(p, spec));
    }

    fn visit_from(&mut self, from: &SqmFrom) {
        let kind = match (&from.source, &from.join) {
            (FromSource::Correlated { .. }, _) => "correlation",
            (_, None) => "root",
            (_, Some(info)) if info.fetch => "fetch-join",
            (_, Some(_)) => "join",
        };
        let join_type = from
            .join_type()
            .map(|t| format!(" {}", t.text()))
            .unwrap_or_default();
        self.line(format!("{kind}{join_type} {}", from.navigable_path));
        self.nested(|p| visit::walk_from(p, from));
    }

    fn visit_predicate(&mut self, predicate: &SqmPredicate) {
        let label = match predicate {
            SqmPredicate::Comparison { op, .. } => format!("comparison {}", op.sql_text()),
            SqmPredicate::Junction { op, .. } => format!("junction {}", op.sql_text()),
            SqmPredicate::Constant(value) => format!("constant {value}"),
            other => {
                let name = match other {
                    SqmPredicate::Between { .. } => "between",
                    SqmPredicate::Like { .. } => "like",
                    SqmPredicate::Null { .. } => "is-null",
                    SqmPredicate::Empty { .. } => "is-empty",
                    SqmPredicate::InList { .. } => "in-list",
                    SqmPredicate::InSubquery { .. } => "in-subquery",
                    SqmPredicate::Exists { .. } => "exists",
                    SqmPredicate::MemberOf { .. } => "member-of",
                    _ => "boolean-expression",
                };
                if other.is_negated() {
                    format!("not {name}")
                } else {
                    name.to_string()
                }
            }
        };
        self.line(label);
        self.nested(|p| visit::walk_predicate(p, predicate));
    }

    fn visit_expression(&mut self, expr: &SqmExpression) {
        match expr {
            SqmExpression::Path(_) | SqmExpression::Parameter { .. } => {
                visit::walk_expression(self, expr)
            }
            SqmExpression::Literal { value, .. } => self.line(match value {
                LiteralValue::Null => "literal null".to_string(),
                LiteralValue::Boolean(b) => format!("literal {b}"),
                LiteralValue::Numeric { text, ty } => format!("literal {text} ({ty})"),
                LiteralValue::String(s) => format!("literal '{s}'"),
            }),
            other => {
                let label = match other {
                    SqmExpression::Binary { op, .. } => format!("arithmetic {}", op.operator_symbol()),
                    SqmExpression::Function(f) => format!("function {}", f.name),
                    SqmExpression::EntityTypeLiteral(e) => format!("entity-type {e}"),
                    SqmExpression::Subquery(_) => "subquery".to_string(),
                    _ => "expression".to_string(),
                };
                self.line(label);
                self.nested(|p| visit::walk_expression(p, other));
            }
        }
    }

    fn visit_path(&mut self, path: &SqmPath) {
        self.line(format!("path {}", path.navigable_path));
    }

    fn visit_parameter(
        &mut self,
        _id: super::path::ParamId,
        label: &super::expression::ParamLabel,
        expressible: Option<&super::types::SqmExpressible>,
    ) {
        let ty = expressible.map(|t| t.type_name()).unwrap_or_else(|| "?".into());
        self.line(format!("parameter {label} ({ty})"));
    }
}

/// Render `statement` as an indented tree.
pub fn print_tree(statement: &SqmStatement) -> String {
    let mut printer = TreePrinter::default();
    printer.visit_statement(statement);
    printer.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqm::operator::ComparisonOperator;
    use crate::sqm::statement::{SqmQuerySource, SqmSelectStatement};

    #[test]
    fn test_print_simple_query() {
        let root = SqmFrom::root("Book", Some("b".into()));
        let mut spec = SqmQuerySpec::default();
        spec.add_selection(SqmExpression::Path(root.path()).into());
        spec.apply_predicate(SqmPredicate::Comparison {
            lhs: SqmExpression::Path(root.path()),
            op: ComparisonOperator::Equal,
            rhs: SqmExpression::null(),
        });
        spec.add_root(root).unwrap();
        let statement = SqmStatement::Select(SqmSelectStatement::new(
            SqmQuery::new(spec),
            SqmQuerySource::Hql,
        ));
        let tree = print_tree(&statement);
        assert!(tree.starts_with("select-statement\n"));
        assert!(tree.contains("root Book(b)"));
        assert!(tree.contains("comparison ="));
        assert!(tree.contains("literal null"));
    }
}
