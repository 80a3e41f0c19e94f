use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use normform::normalize::CoverMode;
use normform::parser::{ParseError, parse_scheme};
use normform::serializer::serialize;
use normform::{
    Dialect, NormalForm, NormalFormViolation, Normalizer, NormalizerConfig, QueryBuilder, Scheme, SchemeError,
    build_ddl, normalize_scheme,
};

/// normform - normalize relational schemes and compile them to SQL
#[derive(Parser, Debug)]
#[command(name = "normform")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decompose every table into second or third normal form
    Normalize {
        /// Scheme file (.json wire form, anything else is scheme notation)
        input: PathBuf,
        /// Target normal form
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(2..=3))]
        form: u8,
        /// Canonicalization: full minimal cover or split only
        #[arg(long, default_value = "minimal", value_parser = parse_cover)]
        cover: CoverMode,
        /// Do not re-target the input relationships onto the produced tables
        #[arg(long)]
        drop_relationships: bool,
        /// Do not add a table keyed by the original primary key
        #[arg(long)]
        no_key_table: bool,
        /// Output format (default: same as input)
        #[arg(long, value_enum)]
        format: Option<Format>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a scheme and compile it to CREATE TABLE / ALTER TABLE statements
    Sql {
        /// Scheme file (.json wire form, anything else is scheme notation)
        input: PathBuf,
        /// SQL dialect: generic, postgres, mysql
        #[arg(long, default_value = "generic", value_parser = parse_dialect)]
        dialect: Dialect,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report first normal form violations and validation errors
    Check {
        /// Scheme file (.json wire form, anything else is scheme notation)
        input: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Dsl,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("{0}")]
    Scheme(#[from] SchemeError),
    #[error("First normal form violated:\n{}", list_violations(.0))]
    Violations(Vec<NormalFormViolation>),
    #[error("Scheme check failed")]
    CheckFailed,
}

fn list_violations(violations: &[NormalFormViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("  {}", v))
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_cover(s: &str) -> Result<CoverMode, String> {
    CoverMode::from_str(s).ok_or_else(|| format!("invalid cover mode: {} (minimal, split)", s))
}

fn parse_dialect(s: &str) -> Result<Dialect, String> {
    Dialect::from_str(s).ok_or_else(|| format!("invalid dialect: {} (generic, postgres, mysql)", s))
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Normalize {
            input,
            form,
            cover,
            drop_relationships,
            no_key_table,
            format,
            output,
        } => {
            let (scheme, input_format) = load(&input)?;
            let form = NormalForm::from_number(form).unwrap_or_default();
            let config = NormalizerConfig::default()
                .cover(cover)
                .carry_relationships(!drop_relationships)
                .preserve_key(!no_key_table);
            debug!(?config, form = form.number(), "normalizing");

            let normalized = normalize_scheme(&scheme, form, config).map_err(CliError::Violations)?;
            let text = match format.unwrap_or(input_format) {
                Format::Json => normalized.to_json()?,
                Format::Dsl => serialize(&normalized),
            };
            emit(output.as_deref(), &text)
        }
        Command::Sql {
            input,
            dialect,
            output,
        } => {
            let (scheme, _) = load(&input)?;
            let mut sql = build_ddl(scheme, dialect)?;
            sql.push('\n');
            emit(output.as_deref(), &sql)
        }
        Command::Check { input } => {
            let (scheme, _) = load(&input)?;
            let mut ok = true;

            let violations = Normalizer::new(&scheme).check_first_normal_form();
            if !violations.is_empty() {
                ok = false;
                println!("first normal form:\n{}", list_violations(&violations));
            }
            if let Err(e) = QueryBuilder::validate(&scheme) {
                ok = false;
                println!("validation: {}", e);
            }

            if ok {
                println!("ok: {} tables, {} relationships", scheme.tables.len(), scheme.relationships.len());
                Ok(())
            } else {
                Err(CliError::CheckFailed)
            }
        }
    }
}

fn load(path: &Path) -> Result<(Scheme, Format), CliError> {
    let source = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Ok((Scheme::from_json(&source)?, Format::Json))
    } else {
        Ok((parse_scheme(&source)?, Format::Dsl))
    }
}

fn emit(output: Option<&Path>, text: &str) -> Result<(), CliError> {
    match output {
        Some(path) => {
            fs::write(path, text).map_err(|source| CliError::Write {
                path: path.to_path_buf(),
                source,
            })?;
            info!(path = %path.display(), "written");
            Ok(())
        }
        None => {
            print!("{}", text);
            Ok(())
        }
    }
}
