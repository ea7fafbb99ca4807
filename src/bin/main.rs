//! hqlc CLI - Compile HQL/JPQL queries to SQL
//!
//! Usage:
//!   hqlc translate <query> --mapping <mapping.toml> [--dialect <dialect>] [--strict] [--lock <mode>]
//!   hqlc tokens <query>
//!   hqlc check <query> --mapping <mapping.toml>
//!
//! Examples:
//!   hqlc translate "select b from Book b where b.price > :min" --mapping library.toml
//!   hqlc translate "select b from Book b" --mapping library.toml --dialect oracle --lock pessimistic_write
//!   hqlc tokens "select b.title from Book b"

use clap::{Parser, Subcommand, ValueEnum};
use hqlc::compile::{compile, CompileOptions};
use hqlc::config::Settings;
use hqlc::hql::{self, InterpretOptions};
use hqlc::metamodel::MappingMetamodel;
use hqlc::sql::{Dialect, LockMode, LockOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hqlc")]
#[command(about = "hqlc - Compile HQL/JPQL queries to multi-dialect SQL")]
#[command(version)]
struct Cli {
    /// Log pipeline stages to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $HQLC_CONFIG, ./hqlc.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a query to SQL
    Translate {
        /// The HQL query text
        query: String,

        /// Mapping file describing the entities (overrides [mapping] file)
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// SQL dialect to generate (overrides [query] dialect)
        #[arg(short, long)]
        dialect: Option<DialectArg>,

        /// Reject HQL extensions that JPQL does not allow
        #[arg(long)]
        strict: bool,

        /// Lock mode for select statements (e.g. pessimistic_write, upgrade_nowait)
        #[arg(short, long, value_parser = parse_lock_mode)]
        lock: Option<LockMode>,

        /// Output format
        #[arg(short, long, default_value = "sql")]
        output: OutputFormat,
    },

    /// Print the tokens of a query
    Tokens {
        /// The HQL query text
        query: String,
    },

    /// Parse and interpret a query without generating SQL
    Check {
        /// The HQL query text
        query: String,

        /// Mapping file describing the entities (overrides [mapping] file)
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// Reject HQL extensions that JPQL does not allow
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Ansi,
    Postgres,
    Mysql,
    Oracle,
    Oracle8i,
    Sybase11,
    Tsql,
    Hsql,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Ansi => Dialect::Ansi,
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Mysql => Dialect::MySql,
            DialectArg::Oracle => Dialect::Oracle,
            DialectArg::Oracle8i => Dialect::Oracle8i,
            DialectArg::Sybase11 => Dialect::Sybase11,
            DialectArg::Tsql => Dialect::TSql,
            DialectArg::Hsql => Dialect::Hsql,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Output SQL only
    Sql,
    /// Output SQL with parameter and locking comments
    Verbose,
    /// Output the compiled query as JSON
    Json,
}

fn parse_lock_mode(name: &str) -> Result<LockMode, String> {
    LockMode::from_name(name).ok_or_else(|| format!("unknown lock mode '{name}'"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Translate {
            query,
            mapping,
            dialect,
            strict,
            lock,
            output,
        } => {
            let mut options = CompileOptions::from_settings(&settings.query);
            if let Some(dialect) = dialect {
                options = options.with_dialect(dialect.into());
            }
            if strict {
                options = options.with_strict_jpa_compliance(true);
            }
            if let Some(mode) = lock {
                options = options.with_lock(LockOptions::new(mode));
            }
            cmd_translate(&query, mapping, &settings, &options, output)
        }
        Commands::Tokens { query } => cmd_tokens(&query),
        Commands::Check {
            query,
            mapping,
            strict,
        } => cmd_check(&query, mapping, &settings, strict || settings.query.strict_jpa_compliance),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("hqlc=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_mapping(mapping: Option<PathBuf>, settings: &Settings) -> Result<MappingMetamodel, String> {
    let path = match mapping {
        Some(path) => path,
        None => settings
            .mapping
            .resolved_file()
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "no mapping file given (use --mapping or [mapping] file)".to_string())?,
    };
    debug!(path = %path.display(), "loading mapping");
    MappingMetamodel::from_file(&path).map_err(|e| format!("'{}': {e}", path.display()))
}

fn cmd_translate(
    query: &str,
    mapping: Option<PathBuf>,
    settings: &Settings,
    options: &CompileOptions,
    output: OutputFormat,
) -> ExitCode {
    let model = match load_mapping(mapping, settings) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Error loading mapping {e}");
            return ExitCode::FAILURE;
        }
    };

    let compiled = match compile(query, &model, options) {
        Ok(compiled) => compiled,
        Err(e) => {
            eprintln!("Error ({:?}): {e}", e.kind());
            return ExitCode::FAILURE;
        }
    };

    match output {
        OutputFormat::Sql => println!("{}", compiled.sql),
        OutputFormat::Verbose => {
            println!("-- hqlc Compiled SQL");
            println!("-- Query: {query}");
            println!("-- Dialect: {}", compiled.dialect);
            for parameter in &compiled.parameters {
                println!("-- ?{} = {}", parameter.position, parameter.label);
            }
            if !compiled.locking_roots.is_empty() {
                println!("-- Locking roots: {}", compiled.locking_roots.join(", "));
            }
            println!();
            println!("{}", compiled.sql);
        }
        OutputFormat::Json => match serde_json::to_string_pretty(&compiled) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing output: {e}");
                return ExitCode::FAILURE;
            }
        },
    }
    ExitCode::SUCCESS
}

fn cmd_tokens(query: &str) -> ExitCode {
    match hql::lexer::lex(query) {
        Ok(tokens) => {
            for (token, span) in tokens {
                println!("{:>4}..{:<4} {token:?}", span.start, span.end);
            }
            ExitCode::SUCCESS
        }
        Err(_) => {
            eprint!("{}", hql::render_diagnostics(query, &hql::parse(query)));
            ExitCode::FAILURE
        }
    }
}

fn cmd_check(query: &str, mapping: Option<PathBuf>, settings: &Settings, strict: bool) -> ExitCode {
    let parsed = hql::parse(query);
    if !parsed.is_ok() {
        eprint!("{}", hql::render_diagnostics(query, &parsed));
        return ExitCode::FAILURE;
    }

    let model = match load_mapping(mapping, settings) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Error loading mapping {e}");
            return ExitCode::FAILURE;
        }
    };

    let options = InterpretOptions {
        strict_jpa_compliance: strict,
    };
    match hql::interpret(query, &model, options) {
        Ok(statement) => {
            println!("OK: query is valid ({:?})", statement.source());
            debug!(tree = %hqlc::sqm::print_tree(&statement), "interpreted");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Validation error: {e}");
            ExitCode::FAILURE
        }
    }
}
