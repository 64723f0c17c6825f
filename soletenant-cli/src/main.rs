use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tabled::{Table, Tabled};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use soletenant_compute::config::{
    DEFAULT_MACHINE_TYPE, DEFAULT_NAME, DEFAULT_NODE_TYPE, DEFAULT_REGION, DEFAULT_ZONE,
};
use soletenant_compute::container::parse_env;
use soletenant_compute::gce::DEFAULT_ENDPOINT;
use soletenant_compute::{
    ChainConfig, ComputeApi, ComputeClients, ResourceManager, WorkloadSpec,
};

/// Environment variable consulted when --access-token is not given.
const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

#[derive(Parser, Debug)]
#[command(name = "soletenant")]
#[command(about = "Run a container on a sole-tenant Compute Engine node", long_about = None)]
struct Cli {
    /// Project ID
    #[arg(short, long)]
    project: String,

    /// Region for the node template
    #[arg(long, default_value = DEFAULT_REGION)]
    region: String,

    /// Zone for the node group and instance
    #[arg(long, default_value = DEFAULT_ZONE)]
    zone: String,

    /// Machine type of the instance
    #[arg(long, default_value = DEFAULT_MACHINE_TYPE)]
    machine_type: String,

    /// Node type of the sole-tenant template
    #[arg(long, default_value = DEFAULT_NODE_TYPE)]
    node_type: String,

    /// Name shared by template, group and instance
    #[arg(long, default_value = DEFAULT_NAME)]
    name: String,

    /// Compute Engine API endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// OAuth access token (defaults to $GOOGLE_OAUTH_ACCESS_TOKEN)
    #[arg(long)]
    access_token: Option<String>,

    /// Operation timeout in seconds
    #[arg(long, default_value = "60", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Operation poll interval in seconds
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the template, group and instance running the container
    Create {
        /// Container image
        #[arg(long)]
        image: String,

        /// Container entrypoint
        #[arg(long)]
        command: Option<String>,

        /// Container argument (repeatable)
        #[arg(long = "arg", allow_hyphen_values = true)]
        args: Vec<String>,

        /// Environment variable as NAME=VALUE (repeatable)
        #[arg(long = "env", value_parser = parse_env)]
        env: Vec<(String, String)>,
    },

    /// Delete the instance, group and template
    Delete,

    /// Show which resources of the chain exist
    Status,
}

impl Cli {
    fn chain_config(&self) -> ChainConfig {
        let mut config = ChainConfig::new(&self.project);
        config.region = self.region.clone();
        config.zone = self.zone.clone();
        config.machine_type = self.machine_type.clone();
        config.node_type = self.node_type.clone();
        config.name = self.name.clone();
        config.operation_timeout = Duration::from_secs(self.timeout);
        config.poll_interval = Duration::from_secs(self.poll_interval);
        config
    }

    fn access_token(&self) -> Option<String> {
        self.access_token
            .clone()
            .or_else(|| std::env::var(ACCESS_TOKEN_ENV).ok())
            .filter(|t| !t.is_empty())
    }
}

#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "KIND")]
    kind: &'static str,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "DETAIL")]
    detail: String,
}

fn status_rows(manager: &ResourceManager) -> Vec<ResourceRow> {
    let absent = || "absent".to_string();
    let name = manager.config().name.clone();
    vec![
        ResourceRow {
            kind: "node template",
            name: name.clone(),
            status: manager
                .template()
                .map(|t| t.status.clone().unwrap_or_else(|| "-".to_string()))
                .unwrap_or_else(absent),
            detail: manager
                .template()
                .map(|t| t.node_type.clone())
                .unwrap_or_default(),
        },
        ResourceRow {
            kind: "node group",
            name: name.clone(),
            status: manager
                .group()
                .map(|g| g.status.clone().unwrap_or_else(|| "-".to_string()))
                .unwrap_or_else(absent),
            detail: manager
                .group()
                .and_then(|g| g.size)
                .map(|size| format!("{} node(s)", size))
                .unwrap_or_default(),
        },
        ResourceRow {
            kind: "instance",
            name,
            status: manager
                .instance()
                .map(|i| i.status.clone().unwrap_or_else(|| "-".to_string()))
                .unwrap_or_else(absent),
            detail: manager
                .instance()
                .and_then(|i| i.external_ip())
                .map(|ip| format!("external IP {}", ip))
                .unwrap_or_default(),
        },
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "soletenant=info,soletenant_compute=info,reqwest=warn,hyper=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let api = Arc::new(ComputeApi::new(cli.endpoint.clone(), cli.access_token()));
    let mut manager = ResourceManager::new(cli.chain_config(), ComputeClients::from_backend(api));
    info!(
        "Managing sole-tenant chain {} in {}",
        manager.config().name,
        manager.config().zone_scope()
    );

    match cli.command {
        Commands::Create {
            image,
            command,
            args,
            env,
        } => {
            let workload = WorkloadSpec {
                image,
                command: command.into_iter().collect(),
                args,
                env,
            };
            let instance = manager
                .provision(&workload)
                .await
                .context("Failed to provision sole-tenant instance")?;
            println!("Created instance: {}", instance.name);
            if let Some(ip) = instance.external_ip() {
                println!("External IP: {}", ip);
            }
        }

        Commands::Delete => {
            manager
                .teardown()
                .await
                .context("Failed to tear down sole-tenant chain")?;
            println!("Deleted sole-tenant chain: {}", manager.config().name);
        }

        Commands::Status => {
            let state = manager
                .refresh()
                .await
                .context("Failed to read sole-tenant chain")?;
            println!("{}", Table::new(status_rows(&manager)));
            println!("Chain state: {}", state);
        }
    }

    Ok(())
}
