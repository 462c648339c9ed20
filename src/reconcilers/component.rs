// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Component reconciler - watches Components and notifies the link manager
//! of changes and deletions.

use crate::constants::reconcile::{COMPONENT_RESYNC_SECS, ERROR_REQUEUE_SECS};
use crate::error::{LinkerError, Result};
use crate::sync::{LinkEvent, LinkManagerHandle};
use crate::types::Component;
use futures::{pin_mut, StreamExt};
use kube::{
    runtime::{controller::Action, watcher, Controller, WatchStreamExt},
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub struct ComponentReconciler {
    client: Client,
    link_handle: LinkManagerHandle,
}

impl ComponentReconciler {
    pub fn new(client: Client, link_handle: LinkManagerHandle) -> Self {
        Self {
            client,
            link_handle,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let components: Api<Component> = Api::all(self.client.clone());
        let deletions = watch_deletions(components.clone(), self.link_handle.clone());
        let context = Arc::new(self);

        let controller = Controller::new(components, watcher::Config::default())
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled component: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            });

        tokio::join!(controller, deletions);

        Ok(())
    }
}

/// Forward component deletions so the manager can forget their links.
/// The controller only reports objects that still exist.
async fn watch_deletions(components: Api<Component>, link_handle: LinkManagerHandle) {
    let stream = watcher(components, watcher::Config::default()).default_backoff();
    pin_mut!(stream);

    while let Some(event) = stream.next().await {
        match event {
            Ok(watcher::Event::Delete(component)) => {
                debug!(
                    "Component {}/{} deleted",
                    component.namespace().unwrap_or_default(),
                    component.name_any()
                );
                link_handle
                    .send(LinkEvent::ComponentDeleted { component })
                    .await;
            }
            Ok(_) => {}
            Err(e) => warn!("Error watching component deletions: {}", e),
        }
    }

    warn!("Component deletion watch ended");
}

async fn reconcile(component: Arc<Component>, ctx: Arc<ComponentReconciler>) -> Result<Action> {
    debug!(
        "Reconciling component: {}/{}",
        component.namespace().unwrap_or_default(),
        component.name_any()
    );

    ctx.link_handle
        .send(LinkEvent::ComponentChanged {
            component: (*component).clone(),
        })
        .await;

    // The manager skips components whose common secrets are all linked,
    // so revisiting is cheap
    Ok(Action::requeue(Duration::from_secs(COMPONENT_RESYNC_SECS)))
}

fn error_policy(
    _component: Arc<Component>,
    error: &LinkerError,
    _ctx: Arc<ComponentReconciler>,
) -> Action {
    error!("Reconciliation error: {}", error);
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_SECS))
}
