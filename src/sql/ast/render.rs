//! SQL AST to SQL text.
//!
//! Statements are assembled through the fragment builders so that joins,
//! pagination and lock clauses follow the dialect. Parameters are written as
//! internal markers while clauses are assembled; a final pass replaces them
//! with `?` and numbers the bindings in textual order. Dialects that move
//! join conditions into the where clause therefore still bind correctly.

use serde::Serialize;
use tracing::trace;

use super::{
    Expression, Frame, FrameBound, FunctionCall, InsertSource, JdbcParameter, Predicate, Query,
    QueryBody, QuerySpec, SelectStatement, SortSpecification, SqlSelection, SqlStatement,
    TableGroup, TableReference, Window,
};
use crate::sql::dialect::{Dialect, ForUpdateOfStyle, SqlDialect};
use crate::sql::fragment::limit::{apply_limit, LimitClause};
use crate::sql::fragment::{
    Delete, FragmentError, Insert, InsertSelect, JoinFragmentBuilder, JoinType, QueryJoinFragment,
    Select, Update,
};
use crate::sql::lock::LockOptions;
use crate::sqm::error::{SqmError, SqmResult};
use crate::sqm::expression::{LiteralValue, ParamLabel};
use crate::sqm::operator::{
    BinaryArithmeticOperator, BooleanOperator, ComparisonOperator, NullPrecedence, SortDirection,
    SqmJoinType,
};
use crate::sqm::path::ParamId;
use crate::sqm::types::SqmExpressible;

const MARKER: char = '\u{1}';

/// One `?` of the rendered SQL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JdbcParameterBinding {
    /// 1-based position of the marker.
    pub position: usize,
    #[serde(skip)]
    pub id: ParamId,
    #[serde(serialize_with = "serialize_label")]
    pub label: ParamLabel,
    #[serde(serialize_with = "serialize_expressible")]
    pub expressible: Option<SqmExpressible>,
    /// Embeddable attribute bound through this marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
}

fn serialize_label<S: serde::Serializer>(label: &ParamLabel, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(label)
}

fn serialize_expressible<S: serde::Serializer>(
    expressible: &Option<SqmExpressible>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match expressible {
        Some(e) => s.serialize_some(&e.type_name()),
        None => s.serialize_none(),
    }
}

/// Rendered SQL with its parameter bindings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JdbcOperation {
    pub sql: String,
    pub parameters: Vec<JdbcParameterBinding>,
    pub affected_tables: Vec<String>,
}

/// Renders one statement; create a new renderer per statement.
#[derive(Debug)]
pub struct SqlRenderer {
    dialect: Dialect,
    use_theta_style_inner_joins: bool,
    parameters: Vec<JdbcParameter>,
}

impl SqlRenderer {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            use_theta_style_inner_joins: false,
            parameters: Vec::new(),
        }
    }

    /// Render inner joins as cross joins plus where conditions.
    #[must_use]
    pub fn with_theta_style_inner_joins(mut self, enabled: bool) -> Self {
        self.use_theta_style_inner_joins = enabled;
        self
    }

    pub fn render(mut self, statement: &SqlStatement) -> SqmResult<JdbcOperation> {
        let text = match statement {
            SqlStatement::Select(select) => self.select_statement(select)?,
            SqlStatement::Update(update) => self.update(update)?,
            SqlStatement::Delete(delete) => self.delete(delete)?,
            SqlStatement::Insert(insert) => self.insert(insert)?,
        };
        let (sql, parameters) = self.bind_markers(&text)?;
        trace!(sql = %sql, parameters = parameters.len(), "rendered statement");
        Ok(JdbcOperation {
            sql,
            parameters,
            affected_tables: statement.affected_tables(),
        })
    }

    fn bind_markers(&self, text: &str) -> SqmResult<(String, Vec<JdbcParameterBinding>)> {
        let mut sql = String::with_capacity(text.len());
        let mut bindings: Vec<JdbcParameterBinding> = Vec::new();
        let mut rest = text;
        while let Some(start) = rest.find(MARKER) {
            sql.push_str(&rest[..start]);
            let after = &rest[start + MARKER.len_utf8()..];
            let end = after
                .find(MARKER)
                .ok_or_else(|| SqmError::interpretation("unterminated parameter marker"))?;
            let parameter = after[..end]
                .parse::<usize>()
                .ok()
                .and_then(|index| self.parameters.get(index))
                .ok_or_else(|| SqmError::interpretation("unknown parameter marker"))?;
            sql.push('?');
            bindings.push(JdbcParameterBinding {
                position: bindings.len() + 1,
                id: parameter.id,
                label: parameter.label.clone(),
                expressible: parameter.expressible.clone(),
                component: parameter.component.clone(),
            });
            rest = &after[end + MARKER.len_utf8()..];
        }
        sql.push_str(rest);
        Ok((sql, bindings))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn select_statement(&mut self, statement: &SelectStatement) -> SqmResult<String> {
        let mut sql = String::new();
        if !statement.ctes.is_empty() {
            if !self.dialect.supports_with_clause() {
                return Err(FragmentError::Unsupported(format!(
                    "dialect {} has no with clause",
                    self.dialect
                ))
                .into());
            }
            let mut ctes = Vec::with_capacity(statement.ctes.len());
            for cte in &statement.ctes {
                let query = self.query(&cte.query, None)?;
                ctes.push(format!("{}({}) as ({query})", cte.name, cte.columns.join(",")));
            }
            sql.push_str("with ");
            sql.push_str(&ctes.join(","));
            sql.push(' ');
        }
        let lock = statement.lock.as_ref().filter(|l| l.requires_lock_clause());
        sql.push_str(&self.query(&statement.query, lock)?);
        Ok(sql)
    }

    fn query(&mut self, query: &Query, lock: Option<&LockOptions>) -> SqmResult<String> {
        let order_by = self.order_by(&query.order_by)?;
        let limit = self.limit_clause(query)?;
        match &query.body {
            QueryBody::Spec(spec) => {
                if lock.is_some() {
                    self.check_lockable(spec, &limit)?;
                }
                let mut select = self
                    .query_spec(spec, lock)?
                    .set_order_by_clause(order_by)
                    .set_limit(limit)?;
                if let Some(lock) = lock {
                    let targets = self.lock_targets(spec);
                    select = select.set_lock_options(lock.clone(), targets);
                }
                Ok(select.to_statement_string())
            }
            QueryBody::Group { op, parts } => {
                if lock.is_some() {
                    return Err(FragmentError::Unsupported(
                        "pessimistic locking of set operations".into(),
                    )
                    .into());
                }
                let mut texts = Vec::with_capacity(parts.len());
                for part in parts {
                    let text = self.query(part, None)?;
                    let has_own_clauses =
                        !part.order_by.is_empty() || part.offset.is_some() || part.fetch.is_some();
                    texts.push(if has_own_clauses {
                        format!("({text})")
                    } else {
                        text
                    });
                }
                let mut sql = texts.join(&format!(" {} ", op.sql_text()));
                if !order_by.is_empty() {
                    sql.push_str(" order by ");
                    sql.push_str(&order_by);
                }
                limit.check(self.dialect)?;
                Ok(apply_limit(&sql, !order_by.is_empty(), &limit, self.dialect))
            }
        }
    }

    /// Fail on query shapes the dialect's lock clause cannot follow.
    fn check_lockable(&self, spec: &QuerySpec, limit: &LimitClause) -> SqmResult<()> {
        if self.dialect.uses_lock_hints() {
            return Ok(());
        }
        if !limit.is_empty() && !self.dialect.supports_lock_with_pagination() {
            return Err(FragmentError::Unsupported(format!(
                "pessimistic locking of a paginated query on dialect {}",
                self.dialect
            ))
            .into());
        }
        if self.dialect.supports_lock_with_aggregation() {
            return Ok(());
        }
        let shape = if spec.distinct {
            Some("distinct")
        } else if !spec.group_by.is_empty() || spec.having.is_some() {
            Some("grouped")
        } else if spec
            .selections
            .iter()
            .any(|s| contains_aggregate(&s.expression, self.dialect))
        {
            Some("aggregate")
        } else {
            None
        };
        match shape {
            Some(shape) => Err(FragmentError::Unsupported(format!(
                "pessimistic locking of a {shape} query on dialect {}",
                self.dialect
            ))
            .into()),
            None => Ok(()),
        }
    }

    fn limit_clause(&mut self, query: &Query) -> SqmResult<LimitClause> {
        let offset = query
            .offset
            .as_ref()
            .map(|e| self.expression(e))
            .transpose()?;
        let fetch = query
            .fetch
            .as_ref()
            .map(|e| self.expression(e))
            .transpose()?;
        Ok(LimitClause::new(offset, fetch).with_fetch_type(query.fetch_type))
    }

    fn query_spec(&mut self, spec: &QuerySpec, lock: Option<&LockOptions>) -> SqmResult<Select> {
        let mut selections = Vec::with_capacity(spec.selections.len());
        for selection in &spec.selections {
            selections.push(self.selection(selection)?);
        }
        let mut select_clause = selections.join(",");
        if spec.distinct {
            select_clause.insert_str(0, "distinct ");
        }

        let (from, joins) = self.from_clause(spec, lock)?;
        let join_where = joins.to_where_fragment_string();
        let mut select = Select::new(self.dialect)
            .set_select_clause(select_clause)
            .set_from_clause(from)
            .set_outer_joins(joins.to_from_fragment_string(), &join_where);

        if let Some(where_) = &spec.where_ {
            let mut text = self.predicate(where_)?;
            if !join_where.trim().is_empty() && is_disjunction(where_) {
                text = format!("({text})");
            }
            select = select.set_where_clause(text);
        }
        if !spec.group_by.is_empty() {
            let mut items = Vec::with_capacity(spec.group_by.len());
            for expr in &spec.group_by {
                items.push(self.expression(expr)?);
            }
            select = select.set_group_by_clause(items.join(","));
        }
        if let Some(having) = &spec.having {
            select = select.set_having_clause(self.predicate(having)?);
        }
        Ok(select)
    }

    fn selection(&mut self, selection: &SqlSelection) -> SqmResult<String> {
        let expr = self.expression(&selection.expression)?;
        Ok(match &selection.alias {
            Some(alias) => format!("{expr} {alias}"),
            None => expr,
        })
    }

    fn order_by(&mut self, items: &[SortSpecification]) -> SqmResult<String> {
        let mut rendered = Vec::with_capacity(items.len());
        for item in items {
            rendered.push(self.sort_specification(item)?);
        }
        Ok(rendered.join(","))
    }

    fn sort_specification(&mut self, sort: &SortSpecification) -> SqmResult<String> {
        let expr = self.expression(&sort.expression)?;
        let mut out = String::new();
        let native_nulls = self.dialect.supports_nulls_ordering();
        if !native_nulls {
            // rank nulls explicitly ahead of the key itself
            match sort.nulls {
                NullPrecedence::First => {
                    out.push_str(&format!("case when {expr} is null then 0 else 1 end,"))
                }
                NullPrecedence::Last => {
                    out.push_str(&format!("case when {expr} is null then 1 else 0 end,"))
                }
                NullPrecedence::None => {}
            }
        }
        out.push_str(&expr);
        if sort.direction == SortDirection::Descending {
            out.push_str(" desc");
        }
        if native_nulls {
            match sort.nulls {
                NullPrecedence::First => out.push_str(" nulls first"),
                NullPrecedence::Last => out.push_str(" nulls last"),
                NullPrecedence::None => {}
            }
        }
        Ok(out)
    }

    // ========================================================================
    // From clause and locking
    // ========================================================================

    fn from_clause(
        &mut self,
        spec: &QuerySpec,
        lock: Option<&LockOptions>,
    ) -> SqmResult<(String, QueryJoinFragment)> {
        let mut joins = QueryJoinFragment::new(self.dialect, self.use_theta_style_inner_joins);
        let mut from = String::new();
        for (i, root) in spec.from.iter().enumerate() {
            let table = self.table_text(root)?;
            let hinted = lock
                .filter(|_| self.dialect.uses_lock_hints())
                .filter(|_| spec.root_paths_for_locking.contains(&root.navigable_path))
                .map(|l| {
                    self.dialect.append_lock_hint(
                        l.effective_mode(),
                        l.effective_timeout(),
                        &format!("{table} {}", root.alias),
                    )
                });
            match (i, hinted) {
                (0, Some(text)) => from = text,
                (0, None) => from = format!("{table} {}", root.alias),
                (_, Some(text)) => joins.add_from_fragment_string(&format!(", {text}")),
                (_, None) => joins.add_cross_join(&table, &root.alias),
            }
            self.table_group_joins(root, &mut joins)?;
        }
        Ok((from, joins))
    }

    fn table_text(&mut self, group: &TableGroup) -> SqmResult<String> {
        Ok(match &group.table {
            TableReference::Named { table } => table.clone(),
            TableReference::Cte { name } => name.clone(),
            TableReference::Derived { query, lateral } => {
                let text = self.query(query, None)?;
                if *lateral {
                    format!("lateral ({text})")
                } else {
                    format!("({text})")
                }
            }
        })
    }

    fn table_group_joins(
        &mut self,
        group: &TableGroup,
        joins: &mut QueryJoinFragment,
    ) -> SqmResult<()> {
        for join in &group.joins {
            let target = &join.group;
            let table = self.table_text(target)?;
            let on = join
                .predicate
                .as_ref()
                .map(|p| self.predicate(p))
                .transpose()?;
            let join_type = JoinType::from(join.join_type);

            match (&target.association_table, &join.key) {
                (_, None) if join.join_type == SqmJoinType::Cross => {
                    joins.add_cross_join(&table, &target.alias);
                    if let Some(on) = &on {
                        joins.add_condition(on);
                    }
                }
                (Some(link), Some(key)) => {
                    joins.add_join(
                        &link.table,
                        &link.alias,
                        &as_refs(&key.lhs_columns),
                        &as_refs(&link.owner_columns),
                        join_type,
                        None,
                    )?;
                    let link_columns: Vec<String> = link
                        .target_columns
                        .iter()
                        .map(|c| format!("{}.{c}", link.alias))
                        .collect();
                    joins.add_join(
                        &table,
                        &target.alias,
                        &as_refs(&link_columns),
                        &as_refs(&key.rhs_columns),
                        join_type,
                        on.as_deref(),
                    )?;
                }
                (None, Some(key)) => joins.add_join(
                    &table,
                    &target.alias,
                    &as_refs(&key.lhs_columns),
                    &as_refs(&key.rhs_columns),
                    join_type,
                    on.as_deref(),
                )?,
                (_, None) => joins.add_join(
                    &table,
                    &target.alias,
                    &[],
                    &[],
                    join_type,
                    Some(on.as_deref().unwrap_or("1=1")),
                )?,
            }
            self.table_group_joins(target, joins)?;
        }
        Ok(())
    }

    /// The dialect-formatted `for update of` list, if the dialect has one.
    fn lock_targets(&self, spec: &QuerySpec) -> Option<String> {
        let groups = spec
            .root_paths_for_locking
            .iter()
            .filter_map(|path| spec.find_group(path));
        let targets: Vec<String> = match self.dialect.for_update_of_style() {
            ForUpdateOfStyle::Unsupported => return None,
            ForUpdateOfStyle::Tables => groups.map(|g| g.alias.clone()).collect(),
            ForUpdateOfStyle::Columns => groups
                .flat_map(|g| g.key_columns.iter().map(move |c| format!("{}.{c}", g.alias)))
                .collect(),
        };
        if targets.is_empty() {
            None
        } else {
            Some(targets.join(","))
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    fn update(&mut self, statement: &super::UpdateStatement) -> SqmResult<String> {
        let mut update = Update::new().set_table_name(&statement.table);
        for assignment in &statement.assignments {
            let values = match &assignment.value {
                Expression::Tuple(items) if assignment.columns.len() > 1 => items
                    .iter()
                    .map(|item| self.expression(item))
                    .collect::<SqmResult<Vec<_>>>()?,
                value => vec![self.expression(value)?],
            };
            if values.len() != assignment.columns.len() {
                return Err(FragmentError::AssertionFailure(format!(
                    "assignment of {} value(s) to {} column(s)",
                    values.len(),
                    assignment.columns.len()
                ))
                .into());
            }
            for (column, value) in assignment.columns.iter().zip(values) {
                update = update.add_column_with_value(column, value);
            }
        }
        if let Some(version) = &statement.version_increment {
            update = update.increment_version(version);
        }
        if let Some(where_) = &statement.where_ {
            update = update.set_where(self.predicate(where_)?);
        }
        Ok(update.to_statement_string())
    }

    fn delete(&mut self, statement: &super::DeleteStatement) -> SqmResult<String> {
        let mut delete = Delete::new().set_table_name(&statement.table);
        if let Some(where_) = &statement.where_ {
            delete = delete.set_where(self.predicate(where_)?);
        }
        Ok(delete.to_statement_string())
    }

    fn insert(&mut self, statement: &super::InsertStatement) -> SqmResult<String> {
        match &statement.source {
            InsertSource::Values(rows) => {
                let mut insert = Insert::new(self.dialect).set_table_name(&statement.table);
                for (i, row) in rows.iter().enumerate() {
                    let mut values = Vec::with_capacity(row.len());
                    for value in row {
                        values.push(self.expression(value)?);
                    }
                    if i == 0 {
                        for (column, value) in statement.columns.iter().zip(values) {
                            insert = insert.add_column_with_value(column, value);
                        }
                    } else {
                        insert = insert.add_row(values)?;
                    }
                }
                Ok(insert.to_statement_string())
            }
            InsertSource::Query(query) => {
                let select = self.query(query, None)?;
                Ok(InsertSelect::new()
                    .set_table_name(&statement.table)
                    .add_columns(statement.columns.iter().cloned())
                    .set_select_text(select)
                    .to_statement_string())
            }
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expression(&mut self, expr: &Expression) -> SqmResult<String> {
        Ok(match expr {
            Expression::Column(column) => column.text(),
            Expression::Formula(text) => text.clone(),
            Expression::Literal(value) => self.literal(value),
            Expression::Parameter(parameter) => {
                let index = self.parameters.len();
                self.parameters.push(parameter.clone());
                format!("{MARKER}{index}{MARKER}")
            }
            Expression::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs)?,
            Expression::Negate(operand) => {
                let text = self.expression(operand)?;
                match operand.as_ref() {
                    Expression::Binary { .. } => format!("-({text})"),
                    _ => format!("-{text}"),
                }
            }
            Expression::Function(call) => self.function(call)?,
            Expression::Cast { operand, target } => format!(
                "cast({} as {})",
                self.expression(operand)?,
                self.dialect.cast_type_name(*target)
            ),
            Expression::Extract { field, source } => {
                format!("extract({field} from {})", self.expression(source)?)
            }
            Expression::Trim {
                spec,
                character,
                source,
            } => {
                let mut out = format!("trim({} ", spec.sql_text());
                if let Some(character) = character {
                    out.push_str(&self.expression(character)?);
                    out.push(' ');
                }
                out.push_str("from ");
                out.push_str(&self.expression(source)?);
                out.push(')');
                out
            }
            Expression::CaseSearched { whens, otherwise } => {
                let mut out = String::from("case");
                for (condition, result) in whens {
                    out.push_str(" when ");
                    out.push_str(&self.predicate(condition)?);
                    out.push_str(" then ");
                    out.push_str(&self.expression(result)?);
                }
                self.case_end(&mut out, otherwise.as_deref())?;
                out
            }
            Expression::CaseSimple {
                operand,
                whens,
                otherwise,
            } => {
                let mut out = format!("case {}", self.expression(operand)?);
                for (value, result) in whens {
                    out.push_str(" when ");
                    out.push_str(&self.expression(value)?);
                    out.push_str(" then ");
                    out.push_str(&self.expression(result)?);
                }
                self.case_end(&mut out, otherwise.as_deref())?;
                out
            }
            Expression::Tuple(items) => format!("({})", self.expression_list(items)?),
            Expression::Subquery(query) => format!("({})", self.query(query, None)?),
            Expression::Quantified { quantifier, query } => {
                format!("{} ({})", quantifier.sql_text(), self.query(query, None)?)
            }
            Expression::Star => "*".to_string(),
        })
    }

    fn case_end(&mut self, out: &mut String, otherwise: Option<&Expression>) -> SqmResult<()> {
        if let Some(otherwise) = otherwise {
            out.push_str(" else ");
            out.push_str(&self.expression(otherwise)?);
        }
        out.push_str(" end");
        Ok(())
    }

    fn expression_list(&mut self, items: &[Expression]) -> SqmResult<String> {
        let mut rendered = Vec::with_capacity(items.len());
        for item in items {
            rendered.push(self.expression(item)?);
        }
        Ok(rendered.join(","))
    }

    fn literal(&self, value: &LiteralValue) -> String {
        match value {
            LiteralValue::Null => "null".to_string(),
            LiteralValue::Boolean(b) => self.dialect.format_bool(*b).to_string(),
            LiteralValue::Numeric { text, .. } => text.clone(),
            LiteralValue::String(s) => self.dialect.quote_string(s),
        }
    }

    fn binary(
        &mut self,
        op: BinaryArithmeticOperator,
        lhs: &Expression,
        rhs: &Expression,
    ) -> SqmResult<String> {
        if op == BinaryArithmeticOperator::Modulo && !self.dialect.modulo_uses_operator() {
            return Ok(format!(
                "mod({},{})",
                self.expression(lhs)?,
                self.expression(rhs)?
            ));
        }
        let lhs = self.operand(lhs, op, false)?;
        let rhs = self.operand(rhs, op, true)?;
        Ok(format!("{lhs}{}{rhs}", op.operator_symbol()))
    }

    fn operand(
        &mut self,
        expr: &Expression,
        parent: BinaryArithmeticOperator,
        right: bool,
    ) -> SqmResult<String> {
        let text = self.expression(expr)?;
        let needs_parens = match expr {
            Expression::Binary { op, .. } => {
                let modulo_call = *op == BinaryArithmeticOperator::Modulo
                    && !self.dialect.modulo_uses_operator();
                !modulo_call
                    && (op.precedence() < parent.precedence()
                        || (right && op.precedence() == parent.precedence()))
            }
            _ => false,
        };
        Ok(if needs_parens { format!("({text})") } else { text })
    }

    fn function(&mut self, call: &FunctionCall) -> SqmResult<String> {
        let mut out = if call.name.eq_ignore_ascii_case("concat") && call.over.is_none() {
            self.concat(&call.arguments)?
        } else {
            let name = self
                .dialect
                .remap_function(&call.name)
                .map(str::to_string)
                .unwrap_or_else(|| call.name.clone());
            let bare = call.arguments.is_empty()
                && self
                    .dialect
                    .function(&call.name)
                    .is_some_and(|f| !f.has_parens_if_no_args);
            if bare {
                name
            } else {
                let distinct = if call.distinct { "distinct " } else { "" };
                format!("{name}({distinct}{})", self.expression_list(&call.arguments)?)
            }
        };
        if let Some(filter) = &call.filter {
            out.push_str(&format!(" filter (where {})", self.predicate(filter)?));
        }
        if let Some(window) = &call.over {
            out.push_str(&format!(" over ({})", self.window(window)?));
        }
        Ok(out)
    }

    fn concat(&mut self, arguments: &[Expression]) -> SqmResult<String> {
        if self.dialect.supports_concat_operator() {
            let mut parts = Vec::with_capacity(arguments.len());
            for argument in arguments {
                parts.push(self.expression(argument)?);
            }
            Ok(format!("({})", parts.join(self.dialect.concat_operator())))
        } else {
            Ok(format!("concat({})", self.expression_list(arguments)?))
        }
    }

    fn window(&mut self, window: &Window) -> SqmResult<String> {
        let mut parts = Vec::new();
        if !window.partition_by.is_empty() {
            parts.push(format!(
                "partition by {}",
                self.expression_list(&window.partition_by)?
            ));
        }
        if !window.order_by.is_empty() {
            parts.push(format!("order by {}", self.order_by(&window.order_by)?));
        }
        if let Some(frame) = &window.frame {
            parts.push(self.frame(frame)?);
        }
        Ok(parts.join(" "))
    }

    fn frame(&mut self, frame: &Frame) -> SqmResult<String> {
        let mut out = frame.mode.sql_text().to_string();
        match &frame.end {
            Some(end) => {
                out.push_str(" between ");
                out.push_str(&self.frame_bound(&frame.start)?);
                out.push_str(" and ");
                out.push_str(&self.frame_bound(end)?);
            }
            None => {
                out.push(' ');
                out.push_str(&self.frame_bound(&frame.start)?);
            }
        }
        if let Some(exclusion) = frame.exclusion {
            out.push(' ');
            out.push_str(exclusion.sql_text());
        }
        Ok(out)
    }

    fn frame_bound(&mut self, bound: &FrameBound) -> SqmResult<String> {
        match (&bound.offset, bound.kind.has_offset()) {
            (Some(offset), true) => Ok(format!(
                "{} {}",
                self.expression(offset)?,
                bound.kind.sql_text()
            )),
            _ => Ok(bound.kind.sql_text().to_string()),
        }
    }

    // ========================================================================
    // Predicates
    // ========================================================================

    fn predicate(&mut self, predicate: &Predicate) -> SqmResult<String> {
        Ok(match predicate {
            Predicate::Comparison { lhs, op, rhs } => self.comparison(lhs, *op, rhs)?,
            Predicate::Between {
                expr,
                lower,
                upper,
                negated,
            } => format!(
                "{}{} between {} and {}",
                self.expression(expr)?,
                not(*negated),
                self.expression(lower)?,
                self.expression(upper)?
            ),
            Predicate::Like {
                expr,
                pattern,
                escape,
                negated,
                case_sensitive,
            } => {
                let expr = self.expression(expr)?;
                let pattern = self.expression(pattern)?;
                let mut out = if *case_sensitive {
                    format!("{expr}{} like {pattern}", not(*negated))
                } else if self.dialect.supports_case_insensitive_like() {
                    format!("{expr}{} ilike {pattern}", not(*negated))
                } else {
                    format!("lower({expr}){} like lower({pattern})", not(*negated))
                };
                if let Some(escape) = escape {
                    out.push_str(" escape ");
                    out.push_str(&self.expression(escape)?);
                }
                out
            }
            Predicate::Null { expr, negated } => {
                let check = if *negated { "is not null" } else { "is null" };
                match expr {
                    Expression::Tuple(items) => {
                        let mut parts = Vec::with_capacity(items.len());
                        for item in items {
                            parts.push(format!("{} {check}", self.expression(item)?));
                        }
                        format!("({})", parts.join(" and "))
                    }
                    other => format!("{} {check}", self.expression(other)?),
                }
            }
            Predicate::InList {
                expr,
                list,
                negated,
            } => {
                if list.is_empty() {
                    return Ok(if *negated { "1=1" } else { "1<>1" }.to_string());
                }
                format!(
                    "{}{} in ({})",
                    self.expression(expr)?,
                    not(*negated),
                    self.expression_list(list)?
                )
            }
            Predicate::InSubquery {
                expr,
                query,
                negated,
            } => format!(
                "{}{} in ({})",
                self.expression(expr)?,
                not(*negated),
                self.query(query, None)?
            ),
            Predicate::Exists { query, negated } => {
                let keyword = if *negated { "not exists" } else { "exists" };
                format!("{keyword}({})", self.query(query, None)?)
            }
            Predicate::Junction { op, lhs, rhs } => {
                let lhs = self.junction_operand(lhs, *op)?;
                let rhs = self.junction_operand(rhs, *op)?;
                format!("{lhs} {} {rhs}", op.sql_text())
            }
            Predicate::BooleanExpression { expr, negated } => {
                let text = self.expression(expr)?;
                let native = self.dialect.format_bool(true) == "true";
                match (native, negated) {
                    (true, false) => text,
                    (true, true) => format!("not({text})"),
                    (false, false) => format!("{text}=1"),
                    (false, true) => format!("{text}=0"),
                }
            }
            Predicate::Formula(text) => format!("({text})"),
            Predicate::Constant(true) => "1=1".to_string(),
            Predicate::Constant(false) => "1<>1".to_string(),
        })
    }

    fn junction_operand(&mut self, predicate: &Predicate, parent: BooleanOperator) -> SqmResult<String> {
        let text = self.predicate(predicate)?;
        Ok(match predicate {
            Predicate::Junction { op, .. } if *op != parent => format!("({text})"),
            _ => text,
        })
    }

    fn comparison(
        &mut self,
        lhs: &Expression,
        op: ComparisonOperator,
        rhs: &Expression,
    ) -> SqmResult<String> {
        if let (Expression::Tuple(left), Expression::Tuple(right)) = (lhs, rhs) {
            if left.len() != right.len() {
                return Err(SqmError::Semantic(format!(
                    "Cannot compare tuples of different arity ({} and {})",
                    left.len(),
                    right.len()
                )));
            }
            if !self.dialect.supports_row_value_comparison() {
                return self.expanded_tuple_comparison(left, op, right);
            }
        }
        Ok(format!(
            "{}{}{}",
            self.expression(lhs)?,
            op.sql_text(),
            self.expression(rhs)?
        ))
    }

    fn expanded_tuple_comparison(
        &mut self,
        left: &[Expression],
        op: ComparisonOperator,
        right: &[Expression],
    ) -> SqmResult<String> {
        let joiner = match op {
            ComparisonOperator::Equal => " and ",
            ComparisonOperator::NotEqual => " or ",
            other => {
                return Err(FragmentError::Unsupported(format!(
                    "tuple comparison '{other}' without row value support in dialect {}",
                    self.dialect
                ))
                .into())
            }
        };
        let mut parts = Vec::with_capacity(left.len());
        for (l, r) in left.iter().zip(right) {
            parts.push(format!(
                "{}{}{}",
                self.expression(l)?,
                op.sql_text(),
                self.expression(r)?
            ));
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            format!("({})", parts.join(joiner))
        })
    }
}

fn not(negated: bool) -> &'static str {
    if negated {
        " not"
    } else {
        ""
    }
}

fn is_disjunction(predicate: &Predicate) -> bool {
    matches!(
        predicate,
        Predicate::Junction {
            op: BooleanOperator::Or,
            ..
        }
    )
}

/// Whether `expr` aggregates or windows rows of the enclosing query.
/// Subqueries are not inspected.
fn contains_aggregate(expr: &Expression, dialect: Dialect) -> bool {
    let any = |exprs: &[Expression]| exprs.iter().any(|e| contains_aggregate(e, dialect));
    match expr {
        Expression::Function(call) => {
            call.over.is_some()
                || dialect.function(&call.name).is_some_and(|f| f.aggregate)
                || any(&call.arguments)
        }
        Expression::Binary { lhs, rhs, .. } => {
            contains_aggregate(lhs, dialect) || contains_aggregate(rhs, dialect)
        }
        Expression::Negate(operand) | Expression::Cast { operand, .. } => {
            contains_aggregate(operand, dialect)
        }
        Expression::Extract { source, .. } | Expression::Trim { source, .. } => {
            contains_aggregate(source, dialect)
        }
        Expression::CaseSearched { whens, otherwise } => {
            whens.iter().any(|(_, then)| contains_aggregate(then, dialect))
                || otherwise.as_deref().is_some_and(|e| contains_aggregate(e, dialect))
        }
        Expression::CaseSimple {
            operand,
            whens,
            otherwise,
        } => {
            contains_aggregate(operand, dialect)
                || whens
                    .iter()
                    .any(|(w, t)| contains_aggregate(w, dialect) || contains_aggregate(t, dialect))
                || otherwise.as_deref().is_some_and(|e| contains_aggregate(e, dialect))
        }
        Expression::Tuple(items) => any(items),
        Expression::Column(_)
        | Expression::Formula(_)
        | Expression::Literal(_)
        | Expression::Parameter(_)
        | Expression::Subquery(_)
        | Expression::Quantified { .. }
        | Expression::Star => false,
    }
}

fn as_refs(columns: &[String]) -> Vec<&str> {
    columns.iter().map(String::as_str).collect()
}
