// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::CustomResource;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "appstudio.redhat.com", version = "v1alpha1", kind = "Component")]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    pub component_name: String,
    pub application: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<serde_json::Value>,
    /// Names of the components this one nudges after a successful build
    #[serde(
        rename = "build-nudges-ref",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub build_nudges_ref: Option<Vec<String>>,
}

impl Component {
    /// Name of the build pipeline service account owned by this component.
    /// `None` when the component has no name.
    pub fn service_account_name(&self, prefix: &str) -> Option<String> {
        self.metadata
            .name
            .as_deref()
            .map(|name| format!("{}{}", prefix, name))
    }

    /// Components this one nudges, empty when unset
    pub fn nudges(&self) -> &[String] {
        self.spec.build_nudges_ref.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;

    fn make_component(name: Option<&str>, nudges: Option<Vec<String>>) -> Component {
        Component {
            metadata: ObjectMeta {
                name: name.map(str::to_string),
                namespace: Some("test-ns".to_string()),
                ..Default::default()
            },
            spec: ComponentSpec {
                component_name: "frontend".to_string(),
                application: "shop".to_string(),
                build_nudges_ref: nudges,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_service_account_name() {
        let component = make_component(Some("frontend"), None);
        assert_eq!(
            component.service_account_name("build-pipeline-").as_deref(),
            Some("build-pipeline-frontend")
        );
    }

    #[test]
    fn test_service_account_name_without_name() {
        let component = make_component(None, None);
        assert_eq!(component.service_account_name("build-pipeline-"), None);
    }

    #[test]
    fn test_nudges() {
        let component = make_component(Some("frontend"), Some(vec!["backend".to_string()]));
        assert_eq!(component.nudges(), ["backend".to_string()]);
        assert!(make_component(Some("frontend"), None).nudges().is_empty());
    }

    #[test]
    fn test_deserialize_nudges_field() {
        let component: Component = serde_json::from_value(serde_json::json!({
            "apiVersion": "appstudio.redhat.com/v1alpha1",
            "kind": "Component",
            "metadata": { "name": "frontend", "namespace": "test-ns" },
            "spec": {
                "componentName": "frontend",
                "application": "shop",
                "build-nudges-ref": ["backend", "worker"]
            }
        }))
        .unwrap();

        assert_eq!(component.nudges(), ["backend".to_string(), "worker".to_string()]);
        assert_eq!(component.spec.container_image, None);
    }
}
