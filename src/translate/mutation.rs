//! Update, delete and insert statements.
//!
//! The target table is written without an alias, so its columns are bare
//! in the statement itself and qualified by table name inside subqueries.
//! Paths of the target may not navigate associations implicitly.

use crate::metamodel::AttributeKind;
use crate::sql::ast::{
    Assignment, DeleteStatement, Expression, InsertSource, InsertStatement, Predicate, Query,
    QueryBody, SqlSelection, UpdateStatement,
};
use crate::sqm::error::{SqmError, SqmResult};
use crate::sqm::expression::SqmExpression;
use crate::sqm::path::SqmPath;
use crate::sqm::predicate::SqmPredicate;
use crate::sqm::statement::{
    SqmDeleteStatement, SqmInsertSource, SqmInsertStatement, SqmUpdateStatement,
};

use super::expression::Usage;
use super::from::Scope;
use super::SqmTranslator;

impl SqmTranslator<'_> {
    pub(super) fn update(&mut self, statement: &SqmUpdateStatement) -> SqmResult<UpdateStatement> {
        self.scopes.push(Scope::new(false));
        let result = self.update_in_scope(statement);
        self.scopes.pop();
        result
    }

    fn update_in_scope(&mut self, statement: &SqmUpdateStatement) -> SqmResult<UpdateStatement> {
        let (entity, table) = self.register_mutation_target(&statement.target)?;
        let mut assignments = Vec::with_capacity(statement.assignments.len());
        for assignment in &statement.assignments {
            let columns = self.assigned_columns(&assignment.path)?;
            let value = self.expression(&assignment.value)?;
            let target = SqmExpression::Path(assignment.path.clone());
            assignments.push(Assignment {
                columns,
                value: self.expand_parameter(&target, value),
            });
        }
        let version_increment = if statement.versioned {
            Some(self.version_column(&entity)?)
        } else {
            None
        };
        Ok(UpdateStatement {
            table,
            assignments,
            version_increment,
            where_: self.mutation_where(statement.where_.as_ref())?,
        })
    }

    pub(super) fn delete(&mut self, statement: &SqmDeleteStatement) -> SqmResult<DeleteStatement> {
        self.scopes.push(Scope::new(false));
        let result = self
            .register_mutation_target(&statement.target)
            .and_then(|(_, table)| {
                Ok(DeleteStatement {
                    table,
                    where_: self.mutation_where(statement.where_.as_ref())?,
                })
            });
        self.scopes.pop();
        result
    }

    pub(super) fn insert(&mut self, statement: &SqmInsertStatement) -> SqmResult<InsertStatement> {
        self.scopes.push(Scope::new(false));
        let result = self.insert_in_scope(statement);
        self.scopes.pop();
        result
    }

    fn insert_in_scope(&mut self, statement: &SqmInsertStatement) -> SqmResult<InsertStatement> {
        let (entity, table) = self.register_mutation_target(&statement.target)?;
        let mut columns = Vec::new();
        let mut widths = Vec::with_capacity(statement.paths.len());
        for path in &statement.paths {
            let assigned = self.assigned_columns(path)?;
            widths.push(assigned.len());
            columns.extend(assigned);
        }
        let discriminator = self.inserted_discriminator(&entity, &columns)?;
        if let Some((column, _)) = &discriminator {
            columns.push(column.clone());
        }

        let source = match &statement.values {
            SqmInsertSource::Values(rows) => {
                let mut translated = Vec::with_capacity(rows.len());
                for row in rows {
                    let mut values = Vec::with_capacity(columns.len());
                    for ((value, path), width) in row.iter().zip(&statement.paths).zip(&widths) {
                        let expression = self.expression(value)?;
                        let target = SqmExpression::Path(path.clone());
                        let expression = self.expand_parameter(&target, expression);
                        let components = expression.components();
                        if components.len() != *width {
                            return Err(SqmError::Semantic(format!(
                                "Value for '{}' has {} column(s), expected {width}",
                                path.navigable_path,
                                components.len()
                            )));
                        }
                        values.extend(components.into_iter().cloned());
                    }
                    if let Some((_, value)) = &discriminator {
                        values.push(Expression::Formula(value.clone()));
                    }
                    translated.push(values);
                }
                InsertSource::Values(translated)
            }
            SqmInsertSource::Select(query) => {
                let mut query = self.query(query, None)?;
                if let Some((_, value)) = &discriminator {
                    append_selection(&mut query, &Expression::Formula(value.clone()));
                }
                InsertSource::Query(query)
            }
        };
        Ok(InsertStatement {
            table,
            columns,
            source,
        })
    }

    /// Columns written through an assigned path of the target.
    fn assigned_columns(&mut self, path: &SqmPath) -> SqmResult<Vec<String>> {
        let resolved = self.resolve_path(path, Usage::Value)?;
        resolved
            .expression
            .components()
            .into_iter()
            .map(|component| match component {
                Expression::Column(column) => Ok(column.column.clone()),
                _ => Err(SqmError::IllegalPathUsage(format!(
                    "'{}' is not a writable attribute",
                    path.navigable_path
                ))),
            })
            .collect()
    }

    fn version_column(&self, entity: &str) -> SqmResult<String> {
        let mut current = Some(self.entity_type(entity)?);
        while let Some(e) = current {
            if let Some(attribute) = e.version_attribute() {
                if let AttributeKind::Basic { column, .. } = &attribute.kind {
                    return Ok(column.clone());
                }
            }
            current = e.super_type.as_deref().and_then(|s| self.model.entity(s));
        }
        Err(SqmError::Semantic(format!(
            "Entity '{entity}' has no version attribute for 'update versioned'"
        )))
    }

    /// Discriminator column and value for rows inserted into a hierarchy,
    /// unless the statement sets the column itself.
    fn inserted_discriminator(
        &self,
        entity: &str,
        columns: &[String],
    ) -> SqmResult<Option<(String, String)>> {
        let Some(value) = self.entity_type(entity)?.discriminator_value.clone() else {
            return Ok(None);
        };
        Ok(self
            .model
            .discriminator(entity)
            .filter(|d| !columns.contains(&d.column))
            .map(|d| (d.column.clone(), value)))
    }

    fn mutation_where(&mut self, where_: Option<&SqmPredicate>) -> SqmResult<Option<Predicate>> {
        let predicate = where_.map(|p| self.predicate(p)).transpose()?;
        let restrictions = std::mem::take(&mut self.scope_mut()?.restrictions);
        Ok(Predicate::combine(predicate, Predicate::all(restrictions)))
    }
}

fn append_selection(query: &mut Query, expression: &Expression) {
    match &mut query.body {
        QueryBody::Spec(spec) => spec.selections.push(SqlSelection {
            expression: expression.clone(),
            alias: None,
        }),
        QueryBody::Group { parts, .. } => {
            for part in parts {
                append_selection(part, expression);
            }
        }
    }
}
