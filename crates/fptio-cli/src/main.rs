//! fptio - Flow Production Tracking entity references
//!
//! Usage:
//!   fptio resolve fpt://asset/PublishedFile/123       # Resolve locations
//!   fptio resolve -t name -t frames fpt://...         # Resolve other traits
//!   fptio traits fpt://workfile/maya_shot_work/0010   # Traits an entity carries
//!   fptio policy -t location -t name                  # Pre-flight support levels
//!   fptio check <text>...                             # Is it a reference?
//!   fptio capabilities                                # What this deployment can do

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fptio_core::config::{HostEnvironment, ManagerSettings, SettingsStore};
use fptio_core::manager::{Access, ManagementPolicy, Manager, SupportLevel};
use fptio_core::reference::{self, EntityKind};
use fptio_core::traits::{TraitId, TraitSet, TraitsData};

#[derive(Parser)]
#[command(name = "fptio")]
#[command(about = "Resolve Flow Production Tracking entity references", long_about = None)]
struct Cli {
    /// Settings file (defaults to <config dir>/fptio/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve references to trait data
    Resolve {
        /// Entity references
        #[arg(required = true)]
        references: Vec<String>,

        /// Traits to resolve: location, name, frames, work, entity or a full trait id
        #[arg(short = 't', long = "trait", default_value = "location")]
        traits: Vec<String>,

        #[arg(long, default_value = "read")]
        access: AccessArg,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// List the traits each referenced entity carries
    Traits {
        #[arg(required = true)]
        references: Vec<String>,

        #[arg(long, default_value = "read")]
        access: AccessArg,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show which traits are worth requesting
    Policy {
        #[arg(short = 't', long = "trait", default_values = ["location", "name", "frames"])]
        traits: Vec<String>,

        #[arg(long, default_value = "read")]
        access: AccessArg,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Check whether strings are entity references
    Check {
        #[arg(required = true)]
        texts: Vec<String>,
    },

    /// Show detected capabilities
    Capabilities {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum AccessArg {
    #[default]
    Read,
    Write,
}

impl From<AccessArg> for Access {
    fn from(arg: AccessArg) -> Self {
        match arg {
            AccessArg::Read => Access::Read,
            AccessArg::Write => Access::Write,
        }
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fptio=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let code = run_cli(cli.command, cli.config)?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn run_cli(command: Commands, config: Option<PathBuf>) -> Result<i32> {
    match command {
        Commands::Check { texts } => Ok(run_check(&texts)),
        Commands::Resolve {
            references,
            traits,
            access,
            format,
        } => {
            let manager = load_manager(config)?;
            run_resolve(&manager, &references, &parse_traits(&traits), access.into(), format)
        }
        Commands::Traits {
            references,
            access,
            format,
        } => {
            let manager = load_manager(config)?;
            run_traits(&manager, &references, access.into(), format)
        }
        Commands::Policy {
            traits,
            access,
            format,
        } => {
            let manager = load_manager(config)?;
            let policy = manager.management_policy(&parse_traits(&traits), access.into());
            match format {
                OutputFormat::Table => print_policy_table(&policy),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&policy)?),
            }
            Ok(0)
        }
        Commands::Capabilities { format } => {
            let manager = load_manager(config)?;
            run_capabilities(&manager, format)?;
            Ok(0)
        }
    }
}

fn load_settings(config: Option<PathBuf>) -> Result<ManagerSettings> {
    let store = match config {
        Some(path) => SettingsStore::from_path(path),
        None => SettingsStore::from_default_location()?,
    };
    tracing::debug!("Loading settings from {}", store.settings_path().display());
    store.load()
}

fn load_manager(config: Option<PathBuf>) -> Result<Manager> {
    let settings = load_settings(config)?;
    Manager::builder()
        .settings(settings)
        .environment(HostEnvironment::from_process())
        .build()
        .context("Failed to initialise manager")
}

fn parse_traits(raw: &[String]) -> TraitSet {
    raw.iter().map(|alias| TraitId::from_alias(alias)).collect()
}

// =============================================================================
// Commands
// =============================================================================

fn run_check(texts: &[String]) -> i32 {
    let mut code = 0;
    for text in texts {
        if !reference::is_reference(text) {
            println!("{:<8} {}", "no", text);
            code = 1;
            continue;
        }
        match reference::decode(text) {
            Ok(entity) => println!("{:<8} {} ({})", "yes", text, entity.kind()),
            Err(err) => {
                println!("{:<8} {} ({})", "invalid", text, err);
                code = 1;
            }
        }
    }
    code
}

fn run_resolve(
    manager: &Manager,
    references: &[String],
    traits: &TraitSet,
    access: Access,
    format: OutputFormat,
) -> Result<i32> {
    let results = manager.resolve(references, traits, access);
    let failures = results.iter().filter(|r| r.is_err()).count();

    match format {
        OutputFormat::Table => {
            for (text, result) in references.iter().zip(&results) {
                match result {
                    Ok(data) => print_traits_data(text, data),
                    Err(err) => println!("{}\n  error: {}", text, err),
                }
            }
        }
        OutputFormat::Json => {
            let output: Vec<_> = references
                .iter()
                .zip(&results)
                .map(|(text, result)| match result {
                    Ok(data) => serde_json::json!({ "reference": text, "traits": data }),
                    Err(err) => serde_json::json!({
                        "reference": text,
                        "error": { "kind": err.kind(), "message": err.to_string() },
                    }),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(if failures > 0 { 1 } else { 0 })
}

fn run_traits(
    manager: &Manager,
    references: &[String],
    access: Access,
    format: OutputFormat,
) -> Result<i32> {
    let results = manager.entity_traits(references, access);
    let failures = results.iter().filter(|r| r.is_err()).count();

    match format {
        OutputFormat::Table => {
            for (text, result) in references.iter().zip(&results) {
                println!("{}", text);
                match result {
                    Ok(traits) => {
                        for trait_id in traits {
                            println!("  {}", trait_id);
                        }
                    }
                    Err(err) => println!("  error: {}", err),
                }
            }
        }
        OutputFormat::Json => {
            let output: Vec<_> = references
                .iter()
                .zip(&results)
                .map(|(text, result)| match result {
                    Ok(traits) => serde_json::json!({ "reference": text, "traits": traits }),
                    Err(err) => serde_json::json!({
                        "reference": text,
                        "error": { "kind": err.kind(), "message": err.to_string() },
                    }),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(if failures > 0 { 1 } else { 0 })
}

fn run_capabilities(manager: &Manager, format: OutputFormat) -> Result<()> {
    let info = manager.info();
    match format {
        OutputFormat::Table => {
            let capabilities = info.capabilities;
            println!("{} ({})", info.display_name, info.identifier);
            println!("Reference prefix: {}", info.entity_reference_prefix);
            println!("{}", "-".repeat(50));
            println!(
                "{:<32} {}",
                "Database entities",
                yes_no(capabilities.can_resolve_database_entities)
            );
            println!("{:<32} {}", "Workfiles", yes_no(capabilities.can_resolve_workfiles));
            println!(
                "{:<32} {}",
                "Project context",
                yes_no(capabilities.has_project_context)
            );
            if let Some(id) = manager.project().project_id() {
                println!("{:<32} {}", "Project id", id);
            }
            if let Some(path) = manager.project().pipeline_config() {
                println!("{:<32} {}", "Pipeline configuration", path.display());
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "info": info,
                "project_id": manager.project().project_id(),
                "pipeline_config": manager.project().pipeline_config(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn print_traits_data(text: &str, data: &TraitsData) {
    println!("{}", text);
    if data.is_empty() {
        println!("  (no trait data)");
        return;
    }
    for trait_id in data.trait_ids() {
        println!("  {}", trait_id);
        if let Some(properties) = data.properties(trait_id) {
            for (property, value) in properties {
                println!("    {:<12} {}", property, value);
            }
        }
    }
}

fn print_policy_table(policy: &ManagementPolicy) {
    println!("{:<60} {:<12} Workfile", "Trait", "Database");
    println!("{}", "-".repeat(84));

    for trait_id in policy.database.keys() {
        println!(
            "{:<60} {:<12} {}",
            trait_id.as_str(),
            level_str(policy.support(EntityKind::Database, trait_id)),
            level_str(policy.support(EntityKind::Workfile, trait_id))
        );
    }
}

fn level_str(level: SupportLevel) -> &'static str {
    match level {
        SupportLevel::Supported => "supported",
        SupportLevel::Partial => "partial",
        SupportLevel::Unsupported => "-",
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
