// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Secret reconciler - watches Secrets and notifies the link manager of
//! common secrets and of linked secrets that lost the label.

use crate::config::Config;
use crate::constants::reconcile::{ERROR_REQUEUE_SECS, SECRET_RESYNC_SECS};
use crate::error::{LinkerError, Result};
use crate::sync::{LinkEvent, LinkManagerHandle};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    runtime::{controller::Action, reflector::ObjectRef, Controller},
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub struct SecretReconciler {
    client: Client,
    common_secrets_label: String,
    link_handle: LinkManagerHandle,
}

impl SecretReconciler {
    pub fn new(client: Client, config: &Config, link_handle: LinkManagerHandle) -> Self {
        Self {
            client,
            common_secrets_label: config.common_secrets_label.clone(),
            link_handle,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let secrets: Api<Secret> = Api::all(self.client.clone());
        let context = Arc::new(self);

        Controller::new(secrets, WatcherConfig::default())
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled secret: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

/// Check if a secret has the common-secrets label set to "true"
pub fn is_common_secret(secret: &Secret, label: &str) -> bool {
    secret
        .metadata
        .labels
        .as_ref()
        .and_then(|l| l.get(label))
        .is_some_and(|v| v == "true")
}

async fn reconcile(secret: Arc<Secret>, ctx: Arc<SecretReconciler>) -> Result<Action> {
    let name = secret.name_any();
    let namespace = secret.namespace().unwrap_or_default();

    debug!("Reconciling secret: {}/{}", namespace, name);

    let event = if is_common_secret(&secret, &ctx.common_secrets_label) {
        LinkEvent::CommonSecretChanged {
            secret: (*secret).clone(),
        }
    } else if ctx.link_handle.is_linked(&ObjectRef::from_obj(&*secret)).await {
        debug!(
            "Secret {}/{} lost the common-secrets label, unlinking",
            namespace, name
        );
        LinkEvent::SecretLabelRemoved {
            secret: (*secret).clone(),
        }
    } else {
        return Ok(Action::await_change());
    };

    ctx.link_handle.send(event).await;

    // Revisit so links or unlinks that failed for some components are retried
    Ok(Action::requeue(Duration::from_secs(SECRET_RESYNC_SECS)))
}

fn error_policy(_secret: Arc<Secret>, error: &LinkerError, _ctx: Arc<SecretReconciler>) -> Action {
    error!("Reconciliation error: {}", error);
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_SECS))
}
