// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Central coordinator that performs every link and unlink.
//!
//! Reconcilers only send events; the manager handles them one at a time so
//! no two read-then-replace cycles on a service account overlap.
//!
//! Links are tracked per component instance (by uid) and per secret, so a
//! component recreated under the same name starts over and a link that
//! failed for one component is retried without rewriting the others.

use crate::config::Config;
use crate::linker::SecretLinker;
use crate::types::Component;
use k8s_openapi::api::core::v1::Secret;
use kube::{api::ListParams, runtime::reflector::ObjectRef, Api, Client, ResourceExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, instrument, warn};

/// Events that reconcilers send to the LinkManager
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// A component was created or updated
    ComponentChanged { component: Component },
    /// A component was deleted
    ComponentDeleted { component: Component },
    /// A secret carrying the common-secrets label was created or updated
    CommonSecretChanged { secret: Secret },
    /// A previously linked secret no longer carries the common-secrets label
    SecretLabelRemoved { secret: Secret },
}

/// What the manager has linked to one component instance
#[derive(Debug, Default)]
struct ComponentLinks {
    uid: String,
    /// Every common secret listed for the component was linked
    complete: bool,
    secrets: HashSet<ObjectRef<Secret>>,
}

impl ComponentLinks {
    fn new(uid: String) -> Self {
        Self {
            uid,
            ..Default::default()
        }
    }
}

/// Central coordinator for linking secrets to service accounts.
/// Receives events from reconcilers and performs the actual API writes.
pub struct LinkManager {
    client: Client,
    linker: SecretLinker,
    event_rx: mpsc::Receiver<LinkEvent>,
    components: HashMap<ObjectRef<Component>, ComponentLinks>,
    /// Secrets linked to at least one component, shared with the handles
    linked_secrets: Arc<RwLock<HashSet<ObjectRef<Secret>>>>,
}

/// Handle to send events to the LinkManager
#[derive(Clone)]
pub struct LinkManagerHandle {
    event_tx: mpsc::Sender<LinkEvent>,
    linked_secrets: Arc<RwLock<HashSet<ObjectRef<Secret>>>>,
}

impl LinkManagerHandle {
    pub async fn send(&self, event: LinkEvent) {
        if let Err(e) = self.event_tx.send(event).await {
            error!("Failed to send event to LinkManager: {}", e);
        }
    }

    /// Check if the manager has linked this secret to any component
    pub async fn is_linked(&self, secret: &ObjectRef<Secret>) -> bool {
        self.linked_secrets.read().await.contains(secret)
    }
}

impl LinkManager {
    pub fn new(client: Client, config: Config) -> (Self, LinkManagerHandle) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let linked_secrets = Arc::new(RwLock::new(HashSet::new()));

        let manager = Self {
            linker: SecretLinker::new(client.clone(), config),
            client,
            event_rx,
            components: HashMap::new(),
            linked_secrets: linked_secrets.clone(),
        };

        let handle = LinkManagerHandle {
            event_tx,
            linked_secrets,
        };
        (manager, handle)
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("LinkManager started, listening for events...");

        while let Some(event) = self.event_rx.recv().await {
            self.handle_event(event).await;
        }

        Ok(())
    }

    async fn handle_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::ComponentChanged { component } => {
                self.handle_component_changed(&component).await;
            }
            LinkEvent::ComponentDeleted { component } => {
                self.handle_component_deleted(&component);
            }
            LinkEvent::CommonSecretChanged { secret } => {
                self.handle_common_secret_changed(&secret).await;
            }
            LinkEvent::SecretLabelRemoved { secret } => {
                self.handle_secret_label_removed(&secret).await;
            }
        }
        self.publish_linked_secrets().await;
    }

    /// Links recorded for the current instance of a component. A different
    /// uid means the component was recreated, so its old links are dropped.
    fn links_for(&mut self, component: &Component) -> &mut ComponentLinks {
        let uid = component.uid().unwrap_or_default();
        let links = self
            .components
            .entry(ObjectRef::from_obj(component))
            .or_insert_with(|| ComponentLinks::new(uid.clone()));
        if links.uid != uid {
            debug!("Component was recreated, forgetting previous links");
            *links = ComponentLinks::new(uid);
        }
        links
    }

    /// Link the secret unless this component instance already has it.
    /// Returns false when the link failed.
    async fn link_once(&mut self, secret: &Secret, component: &Component) -> bool {
        let key = ObjectRef::from_obj(secret);
        if self.links_for(component).secrets.contains(&key) {
            return true;
        }

        match self
            .linker
            .link_secret_to_service_account(secret, component)
            .await
        {
            Ok(_) => {
                self.links_for(component).secrets.insert(key);
                true
            }
            Err(e) => {
                error!(
                    "Failed to link secret {} to component {}: {}",
                    secret.name_any(),
                    component.name_any(),
                    e
                );
                false
            }
        }
    }

    #[instrument(
        skip(self, component),
        fields(namespace = ?component.namespace(), component = %component.name_any())
    )]
    async fn handle_component_changed(&mut self, component: &Component) {
        if self.links_for(component).complete {
            debug!("Common secrets already linked, skipping");
            return;
        }

        let Some(namespace) = component.namespace() else {
            return;
        };
        let common_secrets = match self.linker.list_common_secrets(&namespace).await {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to list common secrets: {}", e);
                return;
            }
        };

        let mut complete = true;
        for secret in &common_secrets {
            complete &= self.link_once(secret, component).await;
        }

        if complete {
            info!("Linked {} common secrets", common_secrets.len());
        } else {
            warn!("Some common secrets could not be linked, will retry");
        }
        self.links_for(component).complete = complete;
    }

    fn handle_component_deleted(&mut self, component: &Component) {
        let key = ObjectRef::from_obj(component);
        let uid = component.uid().unwrap_or_default();
        if self.components.get(&key).is_some_and(|links| links.uid == uid) {
            debug!("Forgetting links of deleted component {}", key);
            self.components.remove(&key);
        }
    }

    #[instrument(
        skip(self, secret),
        fields(namespace = ?secret.namespace(), secret = %secret.name_any())
    )]
    async fn handle_common_secret_changed(&mut self, secret: &Secret) {
        let Some(namespace) = secret.namespace() else {
            return;
        };
        let components = match self.get_components(&namespace).await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to list components: {}", e);
                return;
            }
        };

        // Keep going past failures so one component without a service
        // account does not hold back the rest
        let mut failed = 0;
        for component in &components {
            if !self.link_once(secret, component).await {
                failed += 1;
            }
        }

        if failed == 0 {
            debug!("Common secret linked to all {} components", components.len());
        } else {
            warn!(
                "Common secret could not be linked to {} of {} components",
                failed,
                components.len()
            );
        }
    }

    #[instrument(
        skip(self, secret),
        fields(namespace = ?secret.namespace(), secret = %secret.name_any())
    )]
    async fn handle_secret_label_removed(&mut self, secret: &Secret) {
        let key = ObjectRef::from_obj(secret);
        if !self.linked_secrets.read().await.contains(&key) {
            debug!("Secret was never linked, skipping");
            return;
        }

        let Some(namespace) = secret.namespace() else {
            return;
        };
        let components = match self.get_components(&namespace).await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to list components: {}", e);
                return;
            }
        };

        match self
            .linker
            .unlink_secret_from_all_service_accounts(secret, &components)
            .await
        {
            Ok(unlinked) => {
                info!("Unlinked secret from {} service accounts", unlinked.len());
                for links in self.components.values_mut() {
                    links.secrets.remove(&key);
                }
            }
            Err(e) => error!("Failed to unlink secret: {}", e),
        }
    }

    /// Share the set of secrets linked to at least one component
    async fn publish_linked_secrets(&self) {
        let linked: HashSet<ObjectRef<Secret>> = self
            .components
            .values()
            .flat_map(|links| links.secrets.iter().cloned())
            .collect();
        *self.linked_secrets.write().await = linked;
    }

    /// Get all components of a namespace
    async fn get_components(&self, namespace: &str) -> crate::error::Result<Vec<Component>> {
        let components: Api<Component> = Api::namespaced(self.client.clone(), namespace);
        Ok(components.list(&ListParams::default()).await?.items)
    }
}
