//! Tenant Provisioner
//!
//! Operator command line for multi-tenant hosting environments:
//! - Tenant environment creation (OUs, security group, accounts)
//! - Incremental account allocation for existing tenants
//! - Environment, host and account queries
//! - Account lifecycle (enable, disable, unlock, password reset)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info, warn};

use directory_client::{health as directory_health, DirectoryClient, DirectoryConfig, MemoryDirectory};
use host_inventory::{HostInventoryProbe, InventoryConfig};
use provisioner_core::{
    CreateEnvironmentRequest, CreateUsersRequest, CredentialConfig, CredentialGenerator,
};
use provisioning_engine::{Job, JobOutput, ProvisioningConfig, ProvisioningEngine, ProvisioningQueue};
use telemetry::{health, init_tracing_from_env, metrics};

mod cli;

use cli::{Cli, Commands, UserCommands};

/// Application configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default)]
    directory: DirectoryConfig,

    #[serde(default)]
    inventory: InventoryConfig,

    #[serde(default)]
    credentials: CredentialConfig,

    #[serde(default)]
    provisioning: ProvisioningConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    let cli = Cli::parse();
    info!("Starting Tenant Provisioner v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    let engine = Arc::new(build_engine(&config, &cli).context("Failed to initialize provisioner")?);

    match cli.command {
        Commands::CreateEnvironment(args) => {
            let queue = start_queue(&engine, &config);
            let request =
                CreateEnvironmentRequest::new(args.tenant, args.host, args.users, args.requested_by);
            let deadline = deadline(args.deadline_secs, &config);
            match queue
                .submit_with_deadline(Job::CreateEnvironment(request), deadline)
                .await?
            {
                JobOutput::Environment(result) => print_json(&result)?,
                JobOutput::Users(result) => print_json(&result)?,
            }
        }
        Commands::AddUsers(args) => {
            let queue = start_queue(&engine, &config);
            let request = CreateUsersRequest::new(args.host, args.users, args.requested_by);
            let deadline = deadline(args.deadline_secs, &config);
            match queue
                .submit_with_deadline(Job::CreateUsers(request), deadline)
                .await?
            {
                JobOutput::Users(result) => {
                    if !result.is_complete() {
                        warn!(failed = result.failed_users.len(), "Some accounts were not created");
                    }
                    print_json(&result)?
                }
                JobOutput::Environment(result) => print_json(&result)?,
            }
        }
        Commands::Describe(args) => print_json(&engine.describe_environment(&args.host).await?)?,
        Commands::ListEnvironments => print_json(&engine.list_environments().await?)?,
        Commands::ListHosts => print_json(&engine.list_hosts().await?)?,
        Commands::User(user) => run_user_command(&engine, user.command).await?,
        Commands::Health => {
            check_health(&engine).await;
            print_json(&HealthOutput {
                health: health().report(),
                metrics: metrics().snapshot(),
            })?;
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct HealthOutput {
    health: telemetry::HealthReport,
    metrics: telemetry::MetricsSnapshot,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountAction<'a> {
    username: &'a str,
    action: &'static str,
    changed: bool,
}

async fn run_user_command(engine: &ProvisioningEngine, command: UserCommands) -> Result<()> {
    match command {
        UserCommands::Info(args) => print_json(&engine.account_info(&args.username).await?),
        UserCommands::Enable(args) => {
            engine.enable_user(&args.username).await?;
            print_json(&AccountAction {
                username: &args.username,
                action: "enable",
                changed: true,
            })
        }
        UserCommands::Disable(args) => {
            engine.disable_user(&args.username).await?;
            print_json(&AccountAction {
                username: &args.username,
                action: "disable",
                changed: true,
            })
        }
        UserCommands::Unlock(args) => {
            let changed = engine.unlock_user(&args.username).await?;
            print_json(&AccountAction {
                username: &args.username,
                action: "unlock",
                changed,
            })
        }
        UserCommands::ResetPassword(args) => {
            print_json(&engine.reset_password(&args.username, args.password).await?)
        }
    }
}

/// Wire the directory, inventory and credential components into an engine.
fn build_engine(config: &Config, cli: &Cli) -> Result<ProvisioningEngine> {
    let directory = if cli.dry_run {
        info!("Dry run: using an in-memory directory");
        let memory = Arc::new(MemoryDirectory::with_layout(&config.directory));
        seed_dry_run(&memory, &config.directory, &cli.command);
        DirectoryClient::new(memory, config.directory.clone())
    } else {
        DirectoryClient::ldap(config.directory.clone())
    };

    let probe = HostInventoryProbe::from_config(config.inventory.clone())?;
    host_inventory::record_health(&probe);

    let credentials = CredentialGenerator::new(&config.credentials);
    Ok(ProvisioningEngine::new(directory, probe, credentials))
}

/// Place the requested host in the default computers container so a dry run
/// can walk the whole workflow.
fn seed_dry_run(memory: &MemoryDirectory, config: &DirectoryConfig, command: &Commands) {
    let host = match command {
        Commands::CreateEnvironment(args) => &args.host,
        Commands::Describe(args) => &args.host,
        _ => return,
    };
    let computers = format!("CN=Computers,{}", config.base_dn);
    memory.add_computer(host, &computers);
}

fn start_queue(engine: &Arc<ProvisioningEngine>, config: &Config) -> ProvisioningQueue {
    let (queue, _worker) = ProvisioningQueue::start(engine.clone(), &config.provisioning);
    queue
}

fn deadline(override_secs: Option<u64>, config: &Config) -> Duration {
    override_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.provisioning.deadline())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{rendered}");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("PROVISIONER")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Nested parsing is unreliable for underscored field names; secrets get explicit overrides
    if let Ok(url) = std::env::var("PROVISIONER_DIRECTORY_URL") {
        config.directory.url = url;
    }
    if let Ok(bind_dn) = std::env::var("PROVISIONER_DIRECTORY_BIND_DN") {
        config.directory.bind_dn = bind_dn;
    }
    if let Ok(password) = std::env::var("PROVISIONER_DIRECTORY_BIND_PASSWORD") {
        config.directory.bind_password = Some(password);
    }
    if let Ok(agent_url) = std::env::var("PROVISIONER_INVENTORY_AGENT_URL") {
        config.inventory.agent_url = agent_url;
    }

    Ok(config)
}

/// Check component health and update the registry.
async fn check_health(engine: &ProvisioningEngine) {
    let directory = engine.directory();
    if directory_health::check_connection(directory).await {
        info!("Directory connection: healthy");
        if let Err(e) = directory_health::verify_layout(directory).await {
            error!("Directory layout incomplete: {}", e);
            health().directory.set_unhealthy(e.to_string());
        }
    } else {
        error!("Directory connection: unhealthy");
    }
}
