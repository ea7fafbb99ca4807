//! Translation of SQM statements to the SQL AST.
//!
//! The translator walks a statement once, block by block. Each query block
//! owns a [`Scope`](from::Scope) of table groups; paths resolve against the
//! innermost scope first, then the enclosing ones. Joins implied by path
//! navigation are created on first use and reused afterwards.
//!
//! - [`from`] - table groups, joins and entity restrictions
//! - [`expression`] - paths, expressions and predicates
//! - [`locking`] - roots a pessimistic lock applies to
//! - [`mutation`] - update, delete and insert statements

mod expression;
mod from;
mod locking;
mod mutation;

use std::collections::HashMap;

use inflector::Inflector;
use tracing::debug;

use crate::metamodel::DomainModel;
use crate::sql::ast::{
    CteStatement, Expression, Predicate, Query, QueryBody, QuerySpec, SelectStatement,
    SortSpecification, SqlSelection, SqlStatement,
};
use crate::sql::dialect::Dialect;
use crate::sql::lock::LockOptions;
use crate::sql::template::{inject_alias, render_order_by_string_template, TEMPLATE};
use crate::sqm::error::SqmResult;
use crate::sqm::expression::SqmExpression;
use crate::sqm::operator::{NullPrecedence, SortDirection};
use crate::sqm::statement::{
    SqmQuery, SqmQueryPart, SqmQuerySpec, SqmSelectStatement, SqmSelectable, SqmSelection,
    SqmSortSpec,
};
use crate::sqm::SqmStatement;

use from::{GroupRef, Scope};

/// Options for [`translate`].
#[derive(Debug, Clone)]
pub struct TranslationOptions {
    pub dialect: Dialect,
    /// Lock applied to a select statement.
    pub lock: Option<LockOptions>,
    /// Placeholder used while qualifying formulas and restrictions.
    pub template_placeholder: String,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            lock: None,
            template_placeholder: TEMPLATE.to_string(),
        }
    }
}

impl TranslationOptions {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_lock(mut self, lock: LockOptions) -> Self {
        self.lock = Some(lock);
        self
    }

    #[must_use]
    pub fn with_template_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.template_placeholder = placeholder.into();
        self
    }
}

/// Translate a statement against `model`.
pub fn translate(
    statement: &SqmStatement,
    model: &dyn DomainModel,
    options: &TranslationOptions,
) -> SqmResult<SqlStatement> {
    let mut translator = SqmTranslator::new(model, options);
    let translated = match statement {
        SqmStatement::Select(select) => SqlStatement::Select(translator.select_statement(select)?),
        SqmStatement::Update(update) => SqlStatement::Update(translator.update(update)?),
        SqmStatement::Delete(delete) => SqlStatement::Delete(translator.delete(delete)?),
        SqmStatement::Insert(insert) => SqlStatement::Insert(translator.insert(insert)?),
    };
    debug!(
        source = ?statement.source(),
        tables = ?translated.affected_tables(),
        "translated statement"
    );
    Ok(translated)
}

/// Acronym of an entity or attribute name: `Publication` → `p`,
/// `publishedOn` → `po`.
pub(crate) fn alias_stem(name: &str) -> String {
    let simple = name.rsplit('.').next().unwrap_or(name);
    let stem: String = simple
        .to_snake_case()
        .split('_')
        .filter_map(|part| part.chars().next())
        .filter(char::is_ascii_alphabetic)
        .collect();
    if stem.is_empty() {
        "t".to_string()
    } else {
        stem.to_ascii_lowercase()
    }
}

/// Stateful walker for one statement.
pub(crate) struct SqmTranslator<'a> {
    model: &'a dyn DomainModel,
    options: &'a TranslationOptions,
    /// Alias counters per stem, shared by every block of the statement.
    alias_counters: HashMap<String, usize>,
    scopes: Vec<Scope>,
}

/// Clauses of a translated query block, before its from clause is assembled.
struct BlockParts {
    distinct: bool,
    selections: Vec<SqlSelection>,
    where_: Option<Predicate>,
    group_by: Vec<Expression>,
    having: Option<Predicate>,
    order_by: Vec<SortSpecification>,
    offset: Option<Expression>,
    fetch: Option<Expression>,
    locking: Vec<crate::sqm::path::NavigablePath>,
}

impl<'a> SqmTranslator<'a> {
    fn new(model: &'a dyn DomainModel, options: &'a TranslationOptions) -> Self {
        Self {
            model,
            options,
            alias_counters: HashMap::new(),
            scopes: Vec::new(),
        }
    }

    /// Next alias base for `name`: `p1`, `p2`, ...
    pub(super) fn alias_base(&mut self, name: &str) -> String {
        let stem = alias_stem(name);
        let counter = self.alias_counters.entry(stem.clone()).or_insert(0);
        *counter += 1;
        format!("{stem}{counter}")
    }

    fn select_statement(&mut self, statement: &SqmSelectStatement) -> SqmResult<SelectStatement> {
        let mut ctes = Vec::with_capacity(statement.ctes.len());
        for cte in &statement.ctes {
            ctes.push(CteStatement {
                name: cte.name.clone(),
                columns: cte.columns.clone(),
                query: self.query(&cte.query, Some(cte.columns.as_slice()))?,
            });
        }
        let query = self.query(&statement.query, None)?;
        let lock = self
            .options
            .lock
            .clone()
            .filter(LockOptions::requires_lock_clause);
        Ok(SelectStatement { ctes, query, lock })
    }

    /// Translate a query; `columns` names the selections of derived tables
    /// and CTEs.
    pub(super) fn query(&mut self, query: &SqmQuery, columns: Option<&[String]>) -> SqmResult<Query> {
        match &query.part {
            SqmQueryPart::Spec(spec) => {
                self.scopes.push(Scope::new(true));
                let parts = self.query_block(spec, query, columns);
                let scope = self.scopes.pop();
                let parts = parts?;
                let from = scope.map(Scope::into_from_clause).unwrap_or_default();
                Ok(Query {
                    body: QueryBody::Spec(Box::new(QuerySpec {
                        distinct: parts.distinct,
                        selections: parts.selections,
                        from,
                        where_: parts.where_,
                        group_by: parts.group_by,
                        having: parts.having,
                        root_paths_for_locking: parts.locking,
                    })),
                    order_by: parts.order_by,
                    offset: parts.offset,
                    fetch: parts.fetch,
                    fetch_type: query.fetch_type,
                })
            }
            SqmQueryPart::Group { op, parts } => {
                let parts = parts
                    .iter()
                    .map(|part| self.query(part, columns))
                    .collect::<SqmResult<Vec<_>>>()?;
                Ok(Query {
                    body: QueryBody::Group { op: *op, parts },
                    order_by: self.sort_specifications(&query.order_by)?,
                    offset: self.optional_expression(query.offset.as_ref())?,
                    fetch: self.optional_expression(query.fetch.as_ref())?,
                    fetch_type: query.fetch_type,
                })
            }
        }
    }

    fn query_block(
        &mut self,
        spec: &SqmQuerySpec,
        query: &SqmQuery,
        columns: Option<&[String]>,
    ) -> SqmResult<BlockParts> {
        for root in &spec.from {
            self.register_root(root)?;
        }
        for root in &spec.from {
            self.translate_join_predicates(root)?;
        }

        let mut selections = Vec::new();
        let mut selected = Vec::new();
        self.selections(&spec.select.selections, &mut selections, &mut selected)?;
        selections.extend(
            self.fetched_columns()?
                .into_iter()
                .map(|expression| SqlSelection { expression, alias: None }),
        );
        if let Some(columns) = columns {
            for (selection, name) in selections.iter_mut().zip(columns) {
                selection.alias = Some(name.clone());
            }
        }

        let where_ = match &spec.where_ {
            Some(predicate) => Some(self.predicate(predicate)?),
            None => None,
        };
        let group_by = spec
            .group_by
            .iter()
            .map(|e| self.expression(e))
            .collect::<SqmResult<Vec<_>>>()?;
        let having = match &spec.having {
            Some(predicate) => Some(self.predicate(predicate)?),
            None => None,
        };

        let mut order_by = self.sort_specifications(&query.order_by)?;
        order_by.extend(self.fetched_collection_order()?);
        let offset = self.optional_expression(query.offset.as_ref())?;
        let fetch = self.optional_expression(query.fetch.as_ref())?;

        let locking = self.locking_roots(&selected);
        let restrictions = self
            .scopes
            .last_mut()
            .map(|scope| std::mem::take(&mut scope.restrictions))
            .unwrap_or_default();

        Ok(BlockParts {
            distinct: spec.select.distinct,
            selections,
            where_: Predicate::combine(where_, Predicate::all(restrictions)),
            group_by,
            having,
            order_by,
            offset,
            fetch,
            locking,
        })
    }

    /// Selections flattened to columns; dynamic instantiations contribute
    /// their arguments in order.
    fn selections(
        &mut self,
        items: &[SqmSelection],
        out: &mut Vec<SqlSelection>,
        selected: &mut Vec<GroupRef>,
    ) -> SqmResult<()> {
        for selection in items {
            match &selection.item {
                SqmSelectable::Expression(SqmExpression::Path(path)) => {
                    let resolved = self.resolve_path(path, expression::Usage::Selection)?;
                    selected.push(resolved.group);
                    out.extend(
                        resolved
                            .expression
                            .components()
                            .into_iter()
                            .map(|expression| SqlSelection {
                                expression: expression.clone(),
                                alias: None,
                            }),
                    );
                }
                SqmSelectable::Expression(expr) => out.push(SqlSelection {
                    expression: self.expression(expr)?,
                    alias: None,
                }),
                SqmSelectable::Instantiation(instantiation) => {
                    self.selections(&instantiation.arguments, out, selected)?;
                }
            }
        }
        Ok(())
    }

    pub(super) fn sort_specifications(
        &mut self,
        specs: &[SqmSortSpec],
    ) -> SqmResult<Vec<SortSpecification>> {
        specs
            .iter()
            .map(|spec| {
                Ok(SortSpecification {
                    expression: self.expression(&spec.expr)?,
                    direction: spec.direction,
                    nulls: spec.nulls,
                })
            })
            .collect()
    }

    fn optional_expression(&mut self, expr: Option<&SqmExpression>) -> SqmResult<Option<Expression>> {
        expr.map(|e| self.expression(e)).transpose()
    }

    /// Element order of fetched collections, qualified with the alias of
    /// the fetched group.
    fn fetched_collection_order(&self) -> SqmResult<Vec<SortSpecification>> {
        let Some(scope) = self.scopes.last() else {
            return Ok(Vec::new());
        };
        let placeholder = &self.options.template_placeholder;
        let mut order = Vec::new();
        for index in scope.tree_order() {
            let group = &scope.groups[index];
            let Some(fragment) = group.fetch_order.as_deref().filter(|_| group.fetched) else {
                continue;
            };
            let template =
                render_order_by_string_template(fragment, placeholder, self.options.dialect)?;
            order.push(SortSpecification {
                expression: Expression::Formula(inject_alias(&template, placeholder, &group.alias)),
                direction: SortDirection::Ascending,
                nulls: NullPrecedence::None,
            });
        }
        Ok(order)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::hql::{self, InterpretOptions};
    use crate::metamodel::test_model::library;
    use crate::sql::ast::SqlRenderer;
    use crate::sql::dialect::Dialect;

    use super::{translate, TranslationOptions};

    /// Compile `hql` against the library model and render it.
    pub fn sql(hql: &str) -> String {
        sql_with(hql, TranslationOptions::default())
    }

    pub fn sql_with(hql: &str, options: TranslationOptions) -> String {
        let model = library();
        let statement = hql::interpret(hql, &model, InterpretOptions::default()).unwrap();
        let translated = translate(&statement, &model, &options).unwrap();
        SqlRenderer::new(options.dialect)
            .render(&translated)
            .unwrap()
            .sql
    }

    pub fn sql_for(hql: &str, dialect: Dialect) -> String {
        sql_with(hql, TranslationOptions::new(dialect))
    }
}
