//! The internal representation of the Gardener resources which carry OpenStack provider
//! configuration. Only the fields the validators look at are modelled.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Capability names mapped to the values a machine image or machine type supports.
pub type Capabilities = BTreeMap<String, Vec<String>>;

/// Declares a capability and every value it may take.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityDefinition {
    pub name: String,

    #[serde(default)]
    pub values: Vec<String>,
}

/// A set of capabilities a machine image version is published with.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityFlavor {
    #[serde(default)]
    pub capabilities: Capabilities,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineImage {
    pub name: String,

    #[serde(default)]
    pub versions: Vec<MachineImageVersion>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineImageVersion {
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,

    /// Architectures the version is published for. An empty list means `amd64`.
    #[serde(default)]
    pub architectures: Vec<String>,

    #[serde(default)]
    pub capability_flavors: Vec<CapabilityFlavor>,
}

/// Names the profile a Shoot or NamespacedCloudProfile refers to.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfileReference {
    pub kind: String,
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfile {
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: CloudProfileSpec,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfileSpec {
    #[serde(rename = "type")]
    pub provider_type: String,

    #[serde(default)]
    pub machine_images: Vec<MachineImage>,

    #[serde(default)]
    pub machine_capabilities: Vec<CapabilityDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<Value>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespacedCloudProfile {
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: NamespacedCloudProfileSpec,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespacedCloudProfileSpec {
    pub parent: CloudProfileReference,

    #[serde(default)]
    pub machine_images: Vec<MachineImage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<Value>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shoot {
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: ShootSpec,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShootSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_profile_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_profile: Option<CloudProfileReference>,

    pub region: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_binding_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_binding_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networking: Option<Networking>,

    pub provider: ShootProvider,
}

impl ShootSpec {
    /// Returns the referenced profile, falling back to the deprecated `cloudProfileName`.
    pub fn cloud_profile_reference(&self) -> Option<CloudProfileReference> {
        self.cloud_profile.clone().or_else(|| {
            self.cloud_profile_name
                .as_ref()
                .map(|name| CloudProfileReference {
                    kind: "CloudProfile".to_owned(),
                    name: name.clone(),
                })
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Networking {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pods: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShootProvider {
    #[serde(rename = "type")]
    pub provider_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure_config: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane_config: Option<Value>,

    #[serde(default)]
    pub workers: Vec<Worker>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    pub name: String,

    #[serde(default)]
    pub zones: Vec<String>,

    /// Plain Kubernetes labels applied to the nodes of the pool.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<Value>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    pub kind: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingProvider {
    #[serde(rename = "type")]
    pub provider_type: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretBinding {
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub secret_ref: SecretReference,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<BindingProvider>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsBinding {
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub credentials_ref: ObjectReference,
    pub provider: BindingProvider,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupBucket {
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: BackupBucketSpec,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupBucketSpec {
    pub provider: RegionalProvider,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_ref: Option<ObjectReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretReference>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionalProvider {
    #[serde(rename = "type")]
    pub provider_type: String,

    #[serde(default)]
    pub region: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Seed {
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: SeedSpec,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSpec {
    pub provider: RegionalProvider,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<SeedBackup>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedBackup {
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_ref: Option<ObjectReference>,
}
