//! OpenStack provider configuration (`openstack.provider.extensions.gardener.cloud`).
//!
//! These types are decoded from the raw `providerConfig` payloads embedded in CloudProfiles,
//! NamespacedCloudProfiles and Shoots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::apis::{ARCHITECTURE_AMD64, TypeMeta, v1beta1};

/// Configuration embedded in a CloudProfile (or NamespacedCloudProfile) as `providerConfig`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfileConfig {
    #[serde(flatten)]
    pub type_meta: TypeMeta,

    #[serde(default)]
    pub constraints: Constraints,

    #[serde(default)]
    pub dns_servers: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcp_domain: Option<String>,

    #[serde(rename = "keystoneURL", default)]
    pub keystone_url: String,

    #[serde(rename = "keystoneURLs", default)]
    pub keystone_urls: Vec<KeyStoneUrl>,

    #[serde(rename = "keystoneCACert", default, skip_serializing_if = "Option::is_none")]
    pub keystone_ca_cert: Option<String>,

    #[serde(default)]
    pub keystone_force_insecure: bool,

    #[serde(default)]
    pub machine_images: Vec<MachineImages>,

    /// Timeout of requests against the OpenStack API, e.g. `30s`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rescan_block_storage_on_resize: Option<bool>,

    #[serde(rename = "ignoreVolumeAZ", default, skip_serializing_if = "Option::is_none")]
    pub ignore_volume_az: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_volume_attach_limit: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_octavia: Option<bool>,

    #[serde(rename = "useSNAT", default, skip_serializing_if = "Option::is_none")]
    pub use_snat: Option<bool>,

    /// Server group policies shoots may request for their worker pools.
    #[serde(default)]
    pub server_group_policies: Vec<String>,

    #[serde(default)]
    pub resolv_conf_options: Vec<String>,

    #[serde(default)]
    pub storage_classes: Vec<StorageClassDefinition>,
}

impl CloudProfileConfig {
    /// The only part of the config a NamespacedCloudProfile may set.
    pub fn machine_images_projection(&self) -> Self {
        Self {
            type_meta: self.type_meta.clone(),
            machine_images: self.machine_images.clone(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    #[serde(default)]
    pub floating_pools: Vec<FloatingPool>,

    #[serde(default)]
    pub load_balancer_providers: Vec<LoadBalancerProvider>,
}

/// An external network shoots may allocate floating IPs from.
///
/// The name may end in `*` to admit every pool name starting with the given prefix.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FloatingPool {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_floating_subnet: Option<String>,

    /// Marks the pool as additionally available, independent of the other pools configured for
    /// the same scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_constraining: Option<bool>,

    #[serde(default)]
    pub load_balancer_classes: Vec<LoadBalancerClass>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerProvider {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Clone, Copy, Debug, Display, EnumString, Eq, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum LoadBalancerClassPurpose {
    Default,
    Private,
    Vpn,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerClass {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,

    #[serde(rename = "floatingSubnetID", default, skip_serializing_if = "Option::is_none")]
    pub floating_subnet_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floating_subnet_tags: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floating_subnet_name: Option<String>,

    #[serde(rename = "floatingNetworkID", default, skip_serializing_if = "Option::is_none")]
    pub floating_network_id: Option<String>,

    #[serde(rename = "subnetID", default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
}

impl LoadBalancerClass {
    /// Whether the class acts as the class of the given purpose, either explicitly or by being
    /// named after it.
    pub fn has_purpose(&self, purpose: LoadBalancerClassPurpose) -> bool {
        let purpose = purpose.to_string();
        self.name == purpose || self.purpose.as_deref() == Some(purpose.as_str())
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStoneUrl {
    pub region: String,
    pub url: String,

    #[serde(rename = "caCert", default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineImages {
    pub name: String,

    #[serde(default)]
    pub versions: Vec<MachineImageVersion>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineImageVersion {
    pub version: String,

    /// Image name used when no region mapping applies.
    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub regions: Vec<RegionIdMapping>,

    #[serde(default)]
    pub capability_flavors: Vec<MachineImageFlavor>,
}

/// Maps a region to the image ID published there.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionIdMapping {
    pub name: String,
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
}

impl RegionIdMapping {
    pub fn architecture_or_default(&self) -> &str {
        self.architecture.as_deref().unwrap_or(ARCHITECTURE_AMD64)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineImageFlavor {
    #[serde(default)]
    pub capabilities: v1beta1::Capabilities,

    #[serde(default)]
    pub regions: Vec<RegionIdMapping>,

    #[serde(default)]
    pub image: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageClassDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioner: Option<String>,

    #[serde(default)]
    pub parameters: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reclaim_policy: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_binding_mode: Option<String>,
}

/// Configuration embedded in a Shoot as `spec.provider.infrastructureConfig`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureConfig {
    #[serde(flatten)]
    pub type_meta: TypeMeta,

    #[serde(default)]
    pub floating_pool_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floating_pool_subnet_name: Option<String>,

    #[serde(default)]
    pub networks: Networks,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Networks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router: Option<Router>,

    /// Deprecated in favour of `workers`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_network: Option<ShareNetwork>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Router {
    pub id: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareNetwork {
    #[serde(default)]
    pub enabled: bool,
}

/// Configuration embedded in a Shoot as `spec.provider.controlPlaneConfig`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneConfig {
    #[serde(flatten)]
    pub type_meta: TypeMeta,

    #[serde(default)]
    pub load_balancer_provider: String,

    #[serde(default)]
    pub load_balancer_classes: Vec<LoadBalancerClass>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<Storage>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Storage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csi_manila: Option<CsiManila>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsiManila {
    #[serde(default)]
    pub enabled: bool,
}

/// Configuration embedded in a worker pool as `providerConfig`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerConfig {
    #[serde(flatten)]
    pub type_meta: TypeMeta,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_group: Option<ServerGroup>,

    #[serde(default)]
    pub machine_labels: Vec<MachineLabel>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerGroup {
    #[serde(default)]
    pub policy: String,
}

/// A label set on the OpenStack server (not the Kubernetes node).
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineLabel {
    pub name: String,
    pub value: String,

    #[serde(default)]
    pub trigger_rolling_on_update: bool,
}
