// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkerError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to build patch: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid component relations: {0}")]
    InvalidRelations(String),
}

pub type Result<T> = std::result::Result<T, LinkerError>;
