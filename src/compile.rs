//! End-to-end compilation from HQL text or SQM trees to SQL.
//!
//! ```text
//! HQL text → Parse → Interpret (SQM) → Translate (SQL AST) → Render → SQL + bindings
//! ```
//!
//! # Example
//!
//! ```ignore
//! use hqlc::compile::{compile, CompileOptions};
//! use hqlc::metamodel::MappingMetamodel;
//! use hqlc::sql::Dialect;
//!
//! let model = MappingMetamodel::from_file("mapping.toml")?;
//! let options = CompileOptions::default().with_dialect(Dialect::Postgres);
//! let compiled = compile("select b.title from Book b where b.price > :min", &model, &options)?;
//! println!("{}", compiled.sql);
//! ```

use serde::Serialize;
use tracing::debug;

use crate::config::QuerySettings;
use crate::error::{QueryError, QueryResult};
use crate::hql::{self, InterpretOptions};
use crate::metamodel::DomainModel;
use crate::sql::ast::{JdbcParameterBinding, SqlRenderer, SqlStatement};
use crate::sql::lock::LockOptions;
use crate::sql::template::TEMPLATE;
use crate::sql::Dialect;
use crate::sqm::error::{SqmError, SqmResult};
use crate::sqm::{NodeBuilder, SqmExpression, SqmQuery, SqmSelection, SqmStatement};
use crate::translate::{translate, TranslationOptions};

// ============================================================================
// Options
// ============================================================================

/// Options for compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// SQL dialect to generate.
    pub dialect: Dialect,

    /// Reject HQL extensions that JPQL does not allow.
    pub strict_jpa_compliance: bool,

    /// Render inner joins as cross joins plus where conditions.
    pub use_theta_style_inner_joins: bool,

    /// Alias placeholder used while qualifying mapping fragments.
    pub template_placeholder: String,

    /// Lock applied to select statements.
    pub lock: Option<LockOptions>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            strict_jpa_compliance: false,
            use_theta_style_inner_joins: false,
            template_placeholder: TEMPLATE.to_string(),
            lock: None,
        }
    }
}

impl CompileOptions {
    /// Options from the `[query]` section of the config file.
    pub fn from_settings(settings: &QuerySettings) -> Self {
        Self {
            dialect: settings.dialect,
            strict_jpa_compliance: settings.strict_jpa_compliance,
            use_theta_style_inner_joins: settings.use_theta_style_inner_joins,
            template_placeholder: settings.template_placeholder.clone(),
            lock: None,
        }
    }

    /// Set the SQL dialect.
    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    #[must_use]
    pub fn with_strict_jpa_compliance(mut self, strict: bool) -> Self {
        self.strict_jpa_compliance = strict;
        self
    }

    #[must_use]
    pub fn with_theta_style_inner_joins(mut self, enabled: bool) -> Self {
        self.use_theta_style_inner_joins = enabled;
        self
    }

    #[must_use]
    pub fn with_template_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.template_placeholder = placeholder.into();
        self
    }

    #[must_use]
    pub fn with_lock(mut self, lock: LockOptions) -> Self {
        self.lock = Some(lock);
        self
    }

    fn translation_options(&self) -> TranslationOptions {
        let options = TranslationOptions::new(self.dialect)
            .with_template_placeholder(self.template_placeholder.clone());
        match &self.lock {
            Some(lock) => options.with_lock(lock.clone()),
            None => options,
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// A statement ready for execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    /// The generated SQL string, with `?` parameter markers.
    pub sql: String,

    /// One binding per marker, in textual order.
    pub parameters: Vec<JdbcParameterBinding>,

    /// Tables read or written, in first-seen order.
    pub affected_tables: Vec<String>,

    /// Navigable paths of the table groups a pessimistic lock applies to.
    pub locking_roots: Vec<String>,

    /// The dialect used for generation.
    pub dialect: Dialect,
}

// ============================================================================
// Compilation Functions
// ============================================================================

/// Compile HQL text against `model`.
pub fn compile(
    source: &str,
    model: &dyn DomainModel,
    options: &CompileOptions,
) -> QueryResult<CompiledQuery> {
    let interpret_options = InterpretOptions {
        strict_jpa_compliance: options.strict_jpa_compliance,
    };
    let statement = hql::interpret(source, model, interpret_options)
        .map_err(|e| QueryError::from_sqm(e, Some(source)))?;
    compile_sqm(&statement, model, options, Some(source))
}

/// Compile a statement built with the criteria API.
pub fn compile_statement(
    statement: &SqmStatement,
    model: &dyn DomainModel,
    options: &CompileOptions,
) -> QueryResult<CompiledQuery> {
    compile_sqm(statement, model, options, None)
}

/// Select one instance of `entity` by identifier, bound to the `:id`
/// parameter.
pub fn load_by_id(
    entity: &str,
    model: &dyn DomainModel,
    options: &CompileOptions,
) -> QueryResult<CompiledQuery> {
    let statement = load_statement(entity, model)?;
    compile_sqm(&statement, model, options, None)
}

/// [`load_by_id`] under a lock.
pub fn lock_by_id(
    entity: &str,
    model: &dyn DomainModel,
    lock: LockOptions,
    options: &CompileOptions,
) -> QueryResult<CompiledQuery> {
    load_by_id(entity, model, &options.clone().with_lock(lock))
}

fn load_statement(entity: &str, model: &dyn DomainModel) -> SqmResult<SqmStatement> {
    let nb = NodeBuilder::new(model);
    let entity_type = model
        .entity(entity)
        .ok_or_else(|| SqmError::UnknownEntity(entity.to_string()))?;

    let root = nb.from(entity, None)?;
    let path = root.path();
    let id = nb.get(&path, &entity_type.identifier.name)?;
    let restriction = nb.equal(
        SqmExpression::Path(id),
        nb.parameter("id", Some(entity_type.id_type())),
    )?;

    let mut spec = nb.create_query();
    spec.add_root(root)?;
    spec.add_selection(SqmSelection::expression(SqmExpression::Path(path)));
    spec.apply_predicate(restriction);
    Ok(nb.select_statement(SqmQuery::new(spec)))
}

fn compile_sqm(
    statement: &SqmStatement,
    model: &dyn DomainModel,
    options: &CompileOptions,
    source: Option<&str>,
) -> QueryResult<CompiledQuery> {
    let adapt = |e: SqmError| QueryError::from_sqm(e, source);

    let translated = translate(statement, model, &options.translation_options()).map_err(adapt)?;
    let locking_roots = match &translated {
        SqlStatement::Select(select) => select
            .query
            .first_spec()
            .map(|spec| {
                spec.root_paths_for_locking
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    let operation = SqlRenderer::new(options.dialect)
        .with_theta_style_inner_joins(options.use_theta_style_inner_joins)
        .render(&translated)
        .map_err(adapt)?;
    debug!(
        dialect = %options.dialect,
        sql = %operation.sql,
        parameters = operation.parameters.len(),
        "compiled query"
    );

    Ok(CompiledQuery {
        sql: operation.sql,
        parameters: operation.parameters,
        affected_tables: operation.affected_tables,
        locking_roots,
        dialect: options.dialect,
    })
}
