//! wscli command-line tool.
//!
//! Migrates Konflux tenant RoleBindings from KubeSaw users and roles to
//! predetermined cluster roles targeting Red Hat SSO identities. The migrated
//! RoleBindings are written to a YAML file for review; nothing is applied to
//! the cluster.
//!
//! This tool assumes you have already authenticated with Red Hat SSO and with
//! the target KubeSaw member cluster.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use wscli_core::config::{MigrationConfig, DEFAULT_CONFIG_TEMPLATE};
use wscli_core::identity::{clean_email, DirectoryLookup, IdentityResolver, LdapSession, Transform};
use wscli_core::models::MigrationSummary;
use wscli_core::{KubeCluster, Migrator};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// CLI tool to migrate Konflux RoleBindings from KubeSaw users to SSO users.
#[derive(Parser, Debug)]
#[command(
    name = "wscli",
    version,
    about = "CLI tool to migrate Konflux RoleBindings from kubesaw users to sso users"
)]
struct Cli {
    /// Path to an optional TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Migrate tenant RoleBindings from KubeSaw accounts to SSO users.
    Migrate {
        /// Select between 'email' and 'user' as the target identity attribute to use in RBAC.
        #[arg(short, long, default_value = "user")]
        target: String,

        /// Path to output file where migrated RoleBindings will be written.
        #[arg(short, long, default_value = "migrated_rolebindings.yaml")]
        output_file: PathBuf,

        /// Path to the kubeconfig file (default: ~/.kube/config).
        #[arg(long)]
        kubeconfig: Option<PathBuf>,
    },

    /// Resolve a single email address to its target identity.
    Lookup {
        /// Email address to resolve.
        email: String,

        /// Select between 'email' and 'user' as the target identity attribute.
        #[arg(short, long, default_value = "user")]
        target: String,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./wscli.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

/// Target identity attribute selected with `-t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    User,
    Email,
}

impl Target {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "email" => Some(Self::Email),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { output } => {
            init_tracing(cli.log_level.as_deref().unwrap_or("warn"));
            cmd_init(&output)
        }
        Commands::Migrate {
            target,
            output_file,
            kubeconfig,
        } => {
            let config = setup(cli.config.as_deref(), cli.log_level.as_deref())?;
            let Some(target) = Target::parse(&target) else {
                println!("Please select the target identity attribute by passing -t Flag");
                return print_subcommand_help("migrate");
            };
            let kubeconfig = match kubeconfig {
                Some(path) => path,
                None => default_kubeconfig()?,
            };
            cmd_migrate(&config, target, &output_file, &kubeconfig).await
        }
        Commands::Lookup { email, target } => {
            let config = setup(cli.config.as_deref(), cli.log_level.as_deref())?;
            let Some(target) = Target::parse(&target) else {
                println!("Please select the target identity attribute by passing -t Flag");
                return print_subcommand_help("lookup");
            };
            cmd_lookup(&config, target, &email).await
        }
        Commands::Validate => {
            let config = setup(cli.config.as_deref(), cli.log_level.as_deref())?;
            cmd_validate(cli.config.as_deref(), &config)
        }
    }
}

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be installed when commands run in-process.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init();
}

/// Load the configuration and start logging at its level unless overridden.
fn setup(config_path: Option<&Path>, log_level: Option<&str>) -> Result<MigrationConfig> {
    let config = load_config(config_path)?;
    init_tracing(log_level.unwrap_or(&config.log_level));
    Ok(config)
}

fn load_config(path: Option<&Path>) -> Result<MigrationConfig> {
    let mut config = match path {
        Some(path) => {
            MigrationConfig::load_from_file(path).context("failed to load configuration file")?
        }
        None => MigrationConfig::default(),
    };
    config
        .resolve_env_vars()
        .context("failed to resolve environment variables")?;
    config.validate().context("configuration validation failed")?;
    Ok(config)
}

fn default_kubeconfig() -> Result<PathBuf> {
    let home = dirs::home_dir().context("error getting home dir")?;
    Ok(home.join(".kube").join("config"))
}

fn print_subcommand_help(name: &str) -> Result<()> {
    let mut command = Cli::command();
    if let Some(sub) = command.find_subcommand_mut(name) {
        sub.print_help().context("failed to print usage")?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_migrate(
    config: &MigrationConfig,
    target: Target,
    output_file: &Path,
    kubeconfig: &Path,
) -> Result<()> {
    let cluster = KubeCluster::from_kubeconfig(kubeconfig, &config.cluster)
        .await
        .context("failed to connect to the cluster")?;
    let migrator = Migrator::new(&cluster, &config.rename);

    let output = match target {
        Target::Email => {
            println!("migrate called for email");
            let mut resolver: IdentityResolver<LdapSession> =
                IdentityResolver::new(Transform::Deterministic);
            migrator.run(&mut resolver).await?
        }
        Target::User => {
            println!("migrate called for user name");
            let lookup = DirectoryLookup::new(LdapSession::new(&config.directory), &config.directory);
            let mut resolver = IdentityResolver::new(Transform::Directory(lookup));
            let result = migrator.run(&mut resolver).await;
            if let Some(session) = resolver.into_directory() {
                if let Err(e) = session.close().await {
                    debug!(error = %e, "failed to close LDAP session");
                }
            }
            result?
        }
    };

    for unmapped in &output.resolution.unmapped {
        println!("UserAccount {}: {}", unmapped.account, unmapped.reason);
    }
    print_summary(&output.summary);

    std::fs::write(output_file, &output.manifest.text)
        .with_context(|| format!("failed to create file {}", output_file.display()))?;
    println!(
        "Wrote {} migrated RoleBindings to {}",
        output.summary.written,
        output_file.display()
    );

    Ok(())
}

fn print_summary(summary: &MigrationSummary) {
    println!(
        "Found {} user accounts ({} mapped, {} not mapped)",
        summary.accounts, summary.mapped_accounts, summary.unmapped_accounts
    );
    println!("Found {} Tenant Namespaces", summary.tenant_namespaces);
    if !summary.namespaces_without_bindings.is_empty() {
        println!(
            "{} Tenant Namespaces have no candidate RoleBindings:",
            summary.namespaces_without_bindings.len()
        );
        for ns in &summary.namespaces_without_bindings {
            println!("  {}", ns);
        }
    }
    println!(
        "Found {} candidate RoleBindings ({} migrated, {} skipped)",
        summary.candidate_bindings, summary.migrated_bindings, summary.skipped_bindings
    );

    println!("Searching for post-migration orphan Tenant Namespaces:");
    for ns in &summary.orphans {
        println!("{}", ns);
    }
    if summary.orphans.is_empty() {
        println!("No orphan Tenant Namespaces found");
    } else {
        println!(
            "There were {} orphan Tenant Namespaces found",
            summary.orphans.len()
        );
    }

    if summary.duplicates > 0 {
        println!(
            "Skipped {} RoleBindings that were already processed",
            summary.duplicates
        );
    }
    if summary.failed > 0 {
        println!(
            "Failed to encode {} RoleBindings, see the log for details",
            summary.failed
        );
    }
}

async fn cmd_lookup(config: &MigrationConfig, target: Target, email: &str) -> Result<()> {
    match target {
        Target::Email => {
            println!("{}", clean_email(email));
            Ok(())
        }
        Target::User => {
            let mut lookup =
                DirectoryLookup::new(LdapSession::new(&config.directory), &config.directory);
            let result = lookup.resolve(email).await;
            if let Err(e) = lookup.into_inner().close().await {
                debug!(error = %e, "failed to close LDAP session");
            }
            match result.context("directory lookup failed")? {
                Some(uid) => println!("{}", uid),
                None => println!("No user found for email {}", clean_email(email)),
            }
            Ok(())
        }
    }
}

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, DEFAULT_CONFIG_TEMPLATE).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit the directory and cluster settings if they differ from the defaults");
    println!(
        "  2. Validate with: wscli validate --config {}",
        output.display()
    );
    println!(
        "  3. Run: wscli migrate -t user --config {}",
        output.display()
    );

    Ok(())
}

fn cmd_validate(path: Option<&Path>, config: &MigrationConfig) -> Result<()> {
    match path {
        Some(path) => println!("Validating configuration: {}", path.display()),
        None => println!("No configuration file given, validating built-in defaults"),
    }
    println!();
    println!("  [OK] TOML structure is valid");
    println!("  [OK] All required fields are valid");
    println!();
    println!("Configuration summary:");
    println!("  LDAP URL          : {}", config.directory.url);
    println!("  LDAP base DN      : {}", config.directory.base_dn);
    println!(
        "  LDAP bind         : {}",
        config.directory.bind_dn.as_deref().unwrap_or("anonymous")
    );
    println!(
        "  Search attributes : {}",
        config.directory.search_attributes.join(", ")
    );
    println!("  Account namespace : {}", config.cluster.account_namespace);
    println!("  Tenant selector   : {}", config.cluster.tenant_namespace_selector);
    println!("  Binding selector  : {}", config.cluster.binding_selector);
    println!(
        "  Rename            : {} -> {}",
        config.rename.legacy_token, config.rename.target_token
    );
    println!();
    println!("Configuration is valid.");

    Ok(())
}
