// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Component nudge relations and the `build-nudges-ref` field they drive.

use crate::constants::paths;
use crate::error::{LinkerError, Result};
use crate::linker::replace_patch;
use crate::types::Component;
use kube::{
    api::{Patch, PatchParams},
    Api, Client,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, info, instrument};

/// Direction of a relation between components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NudgeType {
    /// The source nudges each target after it builds
    Nudges,
    /// The source is nudged by each target
    NudgedBy,
}

impl fmt::Display for NudgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NudgeType::Nudges => f.write_str("nudges"),
            NudgeType::NudgedBy => f.write_str("nudged-by"),
        }
    }
}

/// One relation row: `source` nudges, or is nudged by, every `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRelation {
    pub source: String,
    pub nudge_type: NudgeType,
    #[serde(default)]
    pub target: Vec<String>,
}

/// Append the names not yet in `acc`, keeping first-seen order
fn union_into(acc: &mut Vec<String>, names: &[String]) {
    for name in names {
        if !acc.contains(name) {
            acc.push(name.clone());
        }
    }
}

/// Fold relations into the nudges list of each component.
///
/// `nudges` rows add their targets to the source's list; `nudged-by` rows add
/// the source to each target's list. Rows without a source are ignored.
pub fn transform_nudge_data(relations: &[ComponentRelation]) -> BTreeMap<String, Vec<String>> {
    relations
        .iter()
        .filter(|r| !r.source.is_empty())
        .fold(BTreeMap::new(), |mut acc, relation| {
            match relation.nudge_type {
                NudgeType::Nudges => {
                    union_into(acc.entry(relation.source.clone()).or_default(), &relation.target);
                }
                NudgeType::NudgedBy => {
                    for target in &relation.target {
                        union_into(
                            acc.entry(target.clone()).or_default(),
                            std::slice::from_ref(&relation.source),
                        );
                    }
                }
            }
            acc
        })
}

/// Check a set of relations before it is written.
///
/// Requires at least one relation, a source on every relation, and no two
/// relations with the same source and direction.
pub fn validate_relations(relations: &[ComponentRelation]) -> Result<()> {
    if relations.is_empty() {
        return Err(LinkerError::InvalidRelations(
            "at least one relation is required".to_string(),
        ));
    }

    let mut problems = Vec::new();
    let mut seen: HashMap<(&str, NudgeType), usize> = HashMap::new();

    for (index, relation) in relations.iter().enumerate() {
        if relation.source.is_empty() {
            problems.push(format!("relation {} has no source", index));
            continue;
        }
        let count = seen
            .entry((relation.source.as_str(), relation.nudge_type))
            .or_default();
        *count += 1;
        if *count == 2 {
            problems.push(format!(
                "duplicate relation: {} {}",
                relation.source, relation.nudge_type
            ));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(LinkerError::InvalidRelations(problems.join("; ")))
    }
}

/// Write the nudges list computed from `relations` to each affected component.
///
/// Components are patched one after the other; the first failure stops the
/// run. With `dry_run` the API server validates the patches without
/// persisting them.
#[instrument(skip(client, relations), fields(relations = relations.len()))]
pub async fn update_nudge_dependencies(
    client: &Client,
    relations: &[ComponentRelation],
    namespace: &str,
    dry_run: bool,
) -> Result<Vec<Component>> {
    let components: Api<Component> = Api::namespaced(client.clone(), namespace);
    let pp = PatchParams {
        dry_run,
        ..Default::default()
    };

    let mut updated = Vec::new();
    for (name, nudges) in transform_nudge_data(relations) {
        debug!("Setting nudges of component {} to {:?}", name, nudges);
        let patch = replace_patch(vec![(paths::BUILD_NUDGES_REF, Value::from(nudges))]);
        let component = components
            .patch(&name, &pp, &Patch::Json::<()>(patch))
            .await?;
        updated.push(component);
    }

    info!(
        "Updated nudges of {} components in namespace {}",
        updated.len(),
        namespace
    );
    Ok(updated)
}
