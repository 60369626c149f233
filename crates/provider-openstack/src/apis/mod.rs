//! API types consumed by the validators.
//!
//! - [`core`] holds the internal representation of the Gardener resources the admission layer
//!   receives.
//! - [`v1beta1`] holds the versioned representation used for parent CloudProfiles, together with
//!   the capability defaulting helpers.
//! - [`openstack`] holds the OpenStack provider configuration carried as raw JSON inside the
//!   Gardener resources.

use serde::{Deserialize, Serialize};

pub mod core;
pub mod helper;
pub mod openstack;
pub mod v1beta1;

/// The architecture assumed for region mappings which don't state one.
pub const ARCHITECTURE_AMD64: &str = "amd64";
pub const ARCHITECTURE_ARM64: &str = "arm64";

/// All architectures machine images can be published for.
pub const VALID_ARCHITECTURES: &[&str] = &[ARCHITECTURE_AMD64, ARCHITECTURE_ARM64];

/// The name of the capability which carries the architecture in capability flavors.
pub const CAPABILITY_ARCHITECTURE: &str = "architecture";

/// The provider type all OpenStack resources carry.
pub const PROVIDER_TYPE: &str = "openstack";

/// The `apiVersion` and `kind` of a provider configuration payload.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}
