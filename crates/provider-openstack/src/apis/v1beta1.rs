//! The versioned (`core.gardener.cloud/v1beta1`) representation of the CloudProfile parts the
//! validators need.
//!
//! Parent CloudProfiles of NamespacedCloudProfiles are handed to the validators in this
//! representation. The capability defaulting helpers are defined on these types only, so internal
//! values are mapped over with the `TryFrom` implementations below before defaults are applied.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use snafu::{Snafu, ensure};

use crate::apis::core;

type Result<T, E = ConversionError> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ConversionError {
    #[snafu(display("capability {name:?} is defined more than once"))]
    DuplicateCapabilityDefinition { name: String },

    #[snafu(display("capability {name:?} does not declare any values"))]
    EmptyCapabilityValues { name: String },
}

/// A non-empty list of capability values.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CapabilityValues(Vec<String>);

impl CapabilityValues {
    fn try_new(name: &str, values: &[String]) -> Result<Self> {
        ensure!(
            !values.is_empty(),
            EmptyCapabilityValuesSnafu {
                name: name.to_owned()
            }
        );
        Ok(Self(values.to_vec()))
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|v| v == value)
    }
}

/// Capability names mapped to their values.
pub type Capabilities = BTreeMap<String, CapabilityValues>;

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityDefinition {
    pub name: String,
    pub values: CapabilityValues,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineImageFlavor {
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

    #[serde(default)]
    pub architectures: Vec<String>,

    #[serde(default)]
    pub capability_flavors: Vec<MachineImageFlavor>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfileSpec {
    #[serde(rename = "type", default)]
    pub provider_type: String,

    #[serde(default)]
    pub machine_images: Vec<MachineImage>,

    #[serde(default)]
    pub machine_capabilities: Vec<CapabilityDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<serde_json::Value>,
}

fn convert_capabilities(capabilities: &core::Capabilities) -> Result<Capabilities> {
    capabilities
        .iter()
        .map(|(name, values)| Ok((name.clone(), CapabilityValues::try_new(name, values)?)))
        .collect()
}

impl TryFrom<&core::CapabilityDefinition> for CapabilityDefinition {
    type Error = ConversionError;

    fn try_from(definition: &core::CapabilityDefinition) -> Result<Self> {
        Ok(Self {
            name: definition.name.clone(),
            values: CapabilityValues::try_new(&definition.name, &definition.values)?,
        })
    }
}

/// Maps a list of internal capability definitions, rejecting duplicate names.
pub fn convert_capability_definitions(
    definitions: &[core::CapabilityDefinition],
) -> Result<Vec<CapabilityDefinition>> {
    let mut converted: Vec<CapabilityDefinition> = Vec::with_capacity(definitions.len());
    for definition in definitions {
        ensure!(
            converted.iter().all(|c| c.name != definition.name),
            DuplicateCapabilityDefinitionSnafu {
                name: definition.name.clone()
            }
        );
        converted.push(definition.try_into()?);
    }
    Ok(converted)
}

impl TryFrom<&core::CapabilityFlavor> for MachineImageFlavor {
    type Error = ConversionError;

    fn try_from(flavor: &core::CapabilityFlavor) -> Result<Self> {
        Ok(Self {
            capabilities: convert_capabilities(&flavor.capabilities)?,
        })
    }
}

impl TryFrom<&core::MachineImageVersion> for MachineImageVersion {
    type Error = ConversionError;

    fn try_from(version: &core::MachineImageVersion) -> Result<Self> {
        Ok(Self {
            version: version.version.clone(),
            architectures: version.architectures.clone(),
            capability_flavors: version
                .capability_flavors
                .iter()
                .map(MachineImageFlavor::try_from)
                .collect::<Result<_>>()?,
        })
    }
}

impl TryFrom<&core::MachineImage> for MachineImage {
    type Error = ConversionError;

    fn try_from(image: &core::MachineImage) -> Result<Self> {
        Ok(Self {
            name: image.name.clone(),
            versions: image
                .versions
                .iter()
                .map(MachineImageVersion::try_from)
                .collect::<Result<_>>()?,
        })
    }
}

impl TryFrom<&core::CloudProfileSpec> for CloudProfileSpec {
    type Error = ConversionError;

    fn try_from(spec: &core::CloudProfileSpec) -> Result<Self> {
        Ok(Self {
            provider_type: spec.provider_type.clone(),
            machine_images: spec
                .machine_images
                .iter()
                .map(MachineImage::try_from)
                .collect::<Result<_>>()?,
            machine_capabilities: convert_capability_definitions(&spec.machine_capabilities)?,
            provider_config: spec.provider_config.clone(),
        })
    }
}

/// Returns `capabilities` with every capability it does not set filled in with all values the
/// matching definition allows. Capabilities without a definition are dropped.
pub fn capabilities_with_applied_defaults(
    capabilities: &Capabilities,
    definitions: &[CapabilityDefinition],
) -> Capabilities {
    definitions
        .iter()
        .map(|definition| {
            let values = capabilities
                .get(&definition.name)
                .unwrap_or(&definition.values)
                .clone();
            (definition.name.clone(), values)
        })
        .collect()
}

/// Returns the flavors of an image version with defaults applied. A version without any flavor
/// is treated as a single flavor supporting every defined value.
pub fn image_flavors_with_applied_defaults(
    flavors: &[MachineImageFlavor],
    definitions: &[CapabilityDefinition],
) -> Vec<MachineImageFlavor> {
    if flavors.is_empty() {
        return vec![MachineImageFlavor {
            capabilities: capabilities_with_applied_defaults(&Capabilities::new(), definitions),
        }];
    }

    flavors
        .iter()
        .map(|flavor| MachineImageFlavor {
            capabilities: capabilities_with_applied_defaults(&flavor.capabilities, definitions),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definitions() -> Vec<CapabilityDefinition> {
        convert_capability_definitions(&[
            core::CapabilityDefinition {
                name: "architecture".to_owned(),
                values: vec!["amd64".to_owned(), "arm64".to_owned()],
            },
            core::CapabilityDefinition {
                name: "gpu".to_owned(),
                values: vec!["none".to_owned(), "nvidia".to_owned()],
            },
        ])
        .expect("valid definitions")
    }

    #[test]
    fn duplicate_definitions_are_rejected() {
        let definition = core::CapabilityDefinition {
            name: "architecture".to_owned(),
            values: vec!["amd64".to_owned()],
        };

        assert_eq!(
            convert_capability_definitions(&[definition.clone(), definition]),
            Err(ConversionError::DuplicateCapabilityDefinition {
                name: "architecture".to_owned()
            })
        );
    }

    #[test]
    fn empty_values_are_rejected() {
        let flavor = core::CapabilityFlavor {
            capabilities: core::Capabilities::from([("gpu".to_owned(), vec![])]),
        };

        assert!(matches!(
            MachineImageFlavor::try_from(&flavor),
            Err(ConversionError::EmptyCapabilityValues { name }) if name == "gpu"
        ));
    }

    #[test]
    fn cloud_profile_spec_is_mapped() {
        let spec = core::CloudProfileSpec {
            provider_type: "openstack".to_owned(),
            machine_images: vec![core::MachineImage {
                name: "gardenlinux".to_owned(),
                versions: vec![core::MachineImageVersion {
                    version: "1.0.0".to_owned(),
                    classification: Some("supported".to_owned()),
                    architectures: vec!["arm64".to_owned()],
                    ..Default::default()
                }],
            }],
            ..Default::default()
        };

        let mapped = CloudProfileSpec::try_from(&spec).expect("mappable spec");

        assert_eq!(mapped.provider_type, "openstack");
        assert_eq!(mapped.machine_images[0].versions[0].architectures, ["arm64"]);
        assert!(mapped.machine_capabilities.is_empty());
    }

    #[test]
    fn defaults_fill_missing_capabilities() {
        let capabilities = Capabilities::from([(
            "architecture".to_owned(),
            CapabilityValues(vec!["arm64".to_owned()]),
        )]);

        let defaulted = capabilities_with_applied_defaults(&capabilities, &definitions());

        assert_eq!(defaulted["architecture"].values(), ["arm64"]);
        assert_eq!(defaulted["gpu"].values(), ["none", "nvidia"]);
    }

    #[test]
    fn missing_flavors_default_to_single_flavor() {
        let flavors = image_flavors_with_applied_defaults(&[], &definitions());

        assert_eq!(flavors.len(), 1);
        assert_eq!(
            flavors[0].capabilities["architecture"].values(),
            ["amd64", "arm64"]
        );
    }
}
