// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Linking secrets to component build service accounts.

pub mod references;
pub mod service_account;

pub use service_account::SecretLinker;

use json_patch::{PatchOperation, ReplaceOperation};
use jsonptr::PointerBuf;
use serde_json::Value;

/// Build a JSON-patch made only of `replace` operations, in the given order.
/// Each path is given as its pointer tokens.
pub(crate) fn replace_patch(ops: Vec<(&[&str], Value)>) -> json_patch::Patch {
    json_patch::Patch(
        ops.into_iter()
            .map(|(path, value)| {
                PatchOperation::Replace(ReplaceOperation {
                    path: PointerBuf::from_tokens(path.iter().copied()),
                    value,
                })
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::paths;
    use serde_json::json;

    #[test]
    fn test_replace_patch_serializes_in_order() {
        let patch = replace_patch(vec![
            (paths::IMAGE_PULL_SECRETS, json!([{ "name": "a" }])),
            (paths::SECRETS, json!([])),
        ]);

        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!([
                { "op": "replace", "path": "/imagePullSecrets", "value": [{ "name": "a" }] },
                { "op": "replace", "path": "/secrets", "value": [] }
            ])
        );
    }

    #[test]
    fn test_replace_patch_nested_path() {
        let patch = replace_patch(vec![(paths::BUILD_NUDGES_REF, json!(["b"]))]);

        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!([{ "op": "replace", "path": "/spec/build-nudges-ref", "value": ["b"] }])
        );
    }
}
