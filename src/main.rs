use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use kc_subflow::cli::{Cli, Commands};
use kc_subflow::config;
use kc_subflow::keycloak::KeycloakClient;
use kc_subflow::logging;
use kc_subflow::subflow::{SubFlow, SubFlowManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(logging::env_filter())
        .init();

    let cli = Cli::parse();

    let config = config::load_config(&cli.connection).context("Failed to load configuration")?;
    tracing::debug!(url = %config.url, admin_realm = %config.admin_realm, "Config loaded");

    let client = KeycloakClient::new(&config).context("Failed to set up Keycloak client")?;

    // Ctrl-C stops the operation between remote calls.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, abandoning remaining steps");
            on_signal.cancel();
        }
    });

    let manager = SubFlowManager::new(Arc::new(client)).with_cancellation(cancel);

    match cli.command {
        Commands::Create {
            realm,
            parent,
            alias,
            provider_id,
            description,
            authenticator,
            requirement,
            priority,
        } => {
            let mut subflow = SubFlow::new(realm, parent, alias, provider_id);
            subflow.description = description.unwrap_or_default();
            subflow.authenticator = authenticator.unwrap_or_default();
            subflow.requirement = requirement.unwrap_or_default();
            subflow.priority = priority.unwrap_or_default();

            if let Err(e) = manager.create(&mut subflow).await {
                if e.subflow_id().is_some() {
                    eprintln!(
                        "Sub-flow {} exists but is not fully configured; retry with `kc-subflow update {}`",
                        subflow.key(),
                        subflow.key()
                    );
                }
                return Err(e.into());
            }
            print_subflow(&subflow)?;
        }
        Commands::Get { key } => {
            let subflow = manager
                .read(&key.realm_id, &key.parent_flow_alias, &key.id)
                .await?;
            print_subflow(&subflow)?;
        }
        Commands::Update {
            key,
            alias,
            provider_id,
            description,
            requirement,
        } => {
            let mut subflow = manager
                .read(&key.realm_id, &key.parent_flow_alias, &key.id)
                .await?;
            if let Some(alias) = alias {
                subflow.alias = alias;
            }
            if let Some(provider_id) = provider_id {
                subflow.provider_id = provider_id;
            }
            if let Some(description) = description {
                subflow.description = description;
            }
            if let Some(requirement) = requirement {
                subflow.requirement = requirement;
            }

            manager.update(&mut subflow).await?;
            print_subflow(&subflow)?;
        }
        Commands::Delete { key } => {
            manager
                .delete(&key.realm_id, &key.parent_flow_alias, &key.id)
                .await?;
            println!("Deleted sub-flow {key}");
        }
        Commands::RaisePriority { key } => {
            manager
                .raise_priority(&key.realm_id, &key.parent_flow_alias, &key.id)
                .await?;
            println!("Raised priority of sub-flow {key}");
        }
        Commands::LowerPriority { key } => {
            manager
                .lower_priority(&key.realm_id, &key.parent_flow_alias, &key.id)
                .await?;
            println!("Lowered priority of sub-flow {key}");
        }
    }

    Ok(())
}

fn print_subflow(subflow: &SubFlow) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(subflow)?);
    Ok(())
}
