// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Link and unlink secrets on component build service accounts.
//!
//! Every write reads the service account, rebuilds `imagePullSecrets` and
//! `secrets` in memory and replaces both arrays in a single JSON-patch.
//! Bulk operations run one link at a time: concurrent replace-array writes
//! to the same service account would drop entries.

use crate::config::Config;
use crate::constants::paths;
use crate::error::Result;
use crate::linker::references::{
    append_reference, contains_reference, ensure_reference, is_empty_list, remove_reference,
};
use crate::linker::replace_patch;
use crate::types::Component;
use k8s_openapi::api::core::v1::{Secret, ServiceAccount};
use kube::{
    api::{ListParams, Patch, PatchParams},
    Api, Client, ResourceExt,
};
use serde_json::Value;
use tracing::{debug, info, instrument};

/// Where a secret gets linked: resolved only when both objects are named and
/// live in the same namespace.
struct LinkTarget<'a> {
    secret_name: &'a str,
    namespace: &'a str,
    service_account: String,
}

/// Links secrets to the build pipeline service accounts of components
#[derive(Clone)]
pub struct SecretLinker {
    client: Client,
    config: Config,
}

impl SecretLinker {
    pub fn new(client: Client, config: Config) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn link_target<'a>(
        &self,
        secret: &'a Secret,
        component: &'a Component,
    ) -> Option<LinkTarget<'a>> {
        let secret_name = secret.metadata.name.as_deref()?;
        let secret_namespace = secret.metadata.namespace.as_deref()?;
        let namespace = component.metadata.namespace.as_deref()?;
        if secret_namespace != namespace {
            return None;
        }
        let service_account = component.service_account_name(&self.config.service_account_prefix)?;

        Some(LinkTarget {
            secret_name,
            namespace,
            service_account,
        })
    }

    /// Fetch the service account and return its two reference lists as JSON
    async fn reference_lists(&self, target: &LinkTarget<'_>) -> Result<(Value, Value)> {
        let service_accounts: Api<ServiceAccount> =
            Api::namespaced(self.client.clone(), target.namespace);
        let sa = service_accounts.get(&target.service_account).await?;

        Ok((
            serde_json::to_value(&sa.image_pull_secrets)?,
            serde_json::to_value(&sa.secrets)?,
        ))
    }

    async fn replace_references(
        &self,
        target: &LinkTarget<'_>,
        image_pull_secrets: Vec<Value>,
        secrets: Vec<Value>,
    ) -> Result<ServiceAccount> {
        let patch = replace_patch(vec![
            (paths::IMAGE_PULL_SECRETS, Value::Array(image_pull_secrets)),
            (paths::SECRETS, Value::Array(secrets)),
        ]);

        let service_accounts: Api<ServiceAccount> =
            Api::namespaced(self.client.clone(), target.namespace);
        Ok(service_accounts
            .patch(
                &target.service_account,
                &PatchParams::default(),
                &Patch::Json::<()>(patch),
            )
            .await?)
    }

    /// Append the secret to the component's service account.
    ///
    /// Returns `Ok(None)` without touching the API when either object lacks a
    /// name or namespace, or when the namespaces differ. With
    /// `dedupe_on_link` set, lists that already reference the secret are kept
    /// as is and no patch is sent if both do.
    #[instrument(
        skip(self, secret, component),
        fields(secret = %secret.name_any(), component = %component.name_any())
    )]
    pub async fn link_secret_to_service_account(
        &self,
        secret: &Secret,
        component: &Component,
    ) -> Result<Option<ServiceAccount>> {
        let Some(target) = self.link_target(secret, component) else {
            debug!("Secret and component are not linkable, skipping");
            return Ok(None);
        };

        let (image_pull_secrets, secrets) = self.reference_lists(&target).await?;

        let (image_pull_secrets, secrets) = if self.config.dedupe_on_link {
            if contains_reference(&image_pull_secrets, target.secret_name)
                && contains_reference(&secrets, target.secret_name)
            {
                debug!(
                    "Service account {}/{} already references secret {}",
                    target.namespace, target.service_account, target.secret_name
                );
                return Ok(None);
            }
            (
                ensure_reference(&image_pull_secrets, target.secret_name),
                ensure_reference(&secrets, target.secret_name),
            )
        } else {
            (
                append_reference(&image_pull_secrets, target.secret_name),
                append_reference(&secrets, target.secret_name),
            )
        };

        let sa = self
            .replace_references(&target, image_pull_secrets, secrets)
            .await?;

        info!(
            "Linked secret {} to service account {}/{}",
            target.secret_name, target.namespace, target.service_account
        );
        Ok(Some(sa))
    }

    /// Remove every reference to the secret from the component's service account.
    ///
    /// Same guard as [`Self::link_secret_to_service_account`]. Nothing is written
    /// when both lists are present and empty; otherwise the filtered lists are
    /// written even if the secret was not referenced.
    #[instrument(
        skip(self, secret, component),
        fields(secret = %secret.name_any(), component = %component.name_any())
    )]
    pub async fn unlink_secret_from_service_account(
        &self,
        secret: &Secret,
        component: &Component,
    ) -> Result<Option<ServiceAccount>> {
        let Some(target) = self.link_target(secret, component) else {
            debug!("Secret and component are not linkable, skipping");
            return Ok(None);
        };

        let (image_pull_secrets, secrets) = self.reference_lists(&target).await?;

        if is_empty_list(&image_pull_secrets) && is_empty_list(&secrets) {
            debug!(
                "Service account {}/{} has no secrets, nothing to unlink",
                target.namespace, target.service_account
            );
            return Ok(None);
        }

        let sa = self
            .replace_references(
                &target,
                remove_reference(&image_pull_secrets, target.secret_name),
                remove_reference(&secrets, target.secret_name),
            )
            .await?;

        info!(
            "Unlinked secret {} from service account {}/{}",
            target.secret_name, target.namespace, target.service_account
        );
        Ok(Some(sa))
    }

    /// Link one secret to the service account of each component, in order.
    /// Stops at the first failure.
    #[instrument(
        skip(self, secret, components),
        fields(secret = %secret.name_any(), components = components.len())
    )]
    pub async fn link_secret_to_all_service_accounts(
        &self,
        secret: &Secret,
        components: &[Component],
    ) -> Result<Vec<ServiceAccount>> {
        if secret.metadata.namespace.is_none() || components.is_empty() {
            debug!("No namespace or no components, skipping");
            return Ok(Vec::new());
        }

        let mut linked = Vec::new();
        for component in components {
            if let Some(sa) = self.link_secret_to_service_account(secret, component).await? {
                linked.push(sa);
            }
        }
        Ok(linked)
    }

    /// Unlink one secret from the service account of each component, in order.
    /// Stops at the first failure.
    #[instrument(
        skip(self, secret, components),
        fields(secret = %secret.name_any(), components = components.len())
    )]
    pub async fn unlink_secret_from_all_service_accounts(
        &self,
        secret: &Secret,
        components: &[Component],
    ) -> Result<Vec<ServiceAccount>> {
        if secret.metadata.namespace.is_none() || components.is_empty() {
            debug!("No namespace or no components, skipping");
            return Ok(Vec::new());
        }

        let mut unlinked = Vec::new();
        for component in components {
            if let Some(sa) = self
                .unlink_secret_from_service_account(secret, component)
                .await?
            {
                unlinked.push(sa);
            }
        }
        Ok(unlinked)
    }

    /// List the secrets of a namespace that carry the common-secrets label
    #[instrument(skip(self))]
    pub async fn list_common_secrets(&self, namespace: &str) -> Result<Vec<Secret>> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let lp = ListParams::default().labels(&self.config.common_secrets_selector());
        Ok(secrets.list(&lp).await?.items)
    }

    /// Link every common secret of the component's namespace to its service account
    #[instrument(skip(self, component), fields(component = %component.name_any()))]
    pub async fn link_common_secrets_to_service_account(
        &self,
        component: &Component,
    ) -> Result<Vec<ServiceAccount>> {
        let Some(namespace) = component.namespace() else {
            debug!("Component has no namespace, skipping");
            return Ok(Vec::new());
        };

        let common_secrets = self.list_common_secrets(&namespace).await?;
        debug!("Found {} common secrets", common_secrets.len());

        let mut linked = Vec::new();
        for secret in &common_secrets {
            if let Some(sa) = self.link_secret_to_service_account(secret, component).await? {
                linked.push(sa);
            }
        }
        Ok(linked)
    }
}
