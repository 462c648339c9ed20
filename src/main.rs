// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use tracing::{info, warn};

use secret_linker::config::Config;
use secret_linker::kubernetes::wait_for_component_crd;
use secret_linker::reconcilers::{ComponentReconciler, SecretReconciler};
use secret_linker::sync::LinkManager;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting secret-linker operator");

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: prefix={}, common_secrets_label={}, dedupe_on_link={}",
        config.service_account_prefix, config.common_secrets_label, config.dedupe_on_link
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    info!("Waiting for Component CRD to become available...");
    wait_for_component_crd(&client).await?;

    // Every write goes through the link manager
    let (link_manager, link_handle) = LinkManager::new(client.clone(), config.clone());

    let secret_reconciler = SecretReconciler::new(client.clone(), &config, link_handle.clone());
    let component_reconciler = ComponentReconciler::new(client.clone(), link_handle);

    info!("Starting reconcilers...");

    tokio::try_join!(
        link_manager.run(),
        secret_reconciler.run(),
        component_reconciler.run()
    )?;

    // This should never be reached as reconcilers run forever
    warn!("All reconcilers stopped unexpectedly");
    Ok(())
}
