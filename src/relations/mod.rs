// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Relations between components.

pub mod nudges;

pub use nudges::{
    transform_nudge_data, update_nudge_dependencies, validate_relations, ComponentRelation,
    NudgeType,
};
