// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Defaults for the values carried by [`crate::config::Config`]
pub mod defaults {
    /// Prefix of the build pipeline service account owned by each component
    pub const SERVICE_ACCOUNT_PREFIX: &str = "build-pipeline-";
    /// Label key marking a secret as shared by every component in its namespace
    pub const COMMON_SECRETS_LABEL: &str = "build.appstudio.openshift.io/common-secret";
}

/// JSON-patch paths written by the linkers, as pointer tokens
pub mod paths {
    pub const IMAGE_PULL_SECRETS: &[&str] = &["imagePullSecrets"];
    pub const SECRETS: &[&str] = &["secrets"];
    pub const BUILD_NUDGES_REF: &[&str] = &["spec", "build-nudges-ref"];
}

/// Component CRD coordinates and polling configuration
pub mod crd {
    pub const GROUP: &str = "appstudio.redhat.com";
    pub const VERSION: &str = "v1alpha1";
    pub const KIND: &str = "Component";
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}

/// Requeue intervals of the reconcilers
pub mod reconcile {
    /// Components are revisited so a service account created after the
    /// component still gets its common secrets
    pub const COMPONENT_RESYNC_SECS: u64 = 300;
    /// Common and linked secrets are revisited so links that failed for
    /// some components are retried
    pub const SECRET_RESYNC_SECS: u64 = 300;
    /// Retry interval after a reconcile error
    pub const ERROR_REQUEUE_SECS: u64 = 60;
}
