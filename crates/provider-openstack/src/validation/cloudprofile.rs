//! Validation of the OpenStack `CloudProfileConfig` embedded in CloudProfiles.
//!
//! Besides the structural checks of the config itself, the machine images of the config are
//! matched against the machine images of the CloudProfile (see [`MachineImageMatrix`]). Every
//! image version offered by the profile needs a provider mapping (an image per region), and
//! every mapping needs a version in the profile.
//!
//! If the profile defines machine capabilities, versions are mapped per capability flavor.
//! Otherwise they are mapped per architecture, with [`ARCHITECTURE_AMD64`] assumed for region
//! mappings without an architecture.

use std::{collections::BTreeSet, net::IpAddr};

use url::Url;

use crate::{
    apis::{
        ARCHITECTURE_AMD64, VALID_ARCHITECTURES, core,
        helper::{CoreImagesContext, ParentImagesContext, ProviderImagesContext},
        openstack::{
            CloudProfileConfig, FloatingPool, LoadBalancerProvider, MachineImageFlavor,
            MachineImageVersion, MachineImages, RegionIdMapping, StorageClassDefinition,
        },
        v1beta1::{self, CapabilityDefinition, ConversionError},
    },
    validation::{
        controlplane::validate_load_balancer_classes,
        field::{ErrorList, FieldError, FieldPath},
        primitives::FieldValidators,
    },
};

/// Validates the provider config of a CloudProfile.
///
/// `spec_path` is the path of the CloudProfile spec, the config is expected at its
/// `providerConfig` child.
pub fn validate_cloud_profile_config(
    config: &CloudProfileConfig,
    machine_images: &[core::MachineImage],
    machine_capabilities: &[core::CapabilityDefinition],
    validators: &FieldValidators,
    spec_path: &FieldPath,
) -> ErrorList {
    let path = spec_path.child("providerConfig");
    let constraints_path = path.child("constraints");
    let mut errors = ErrorList::new();

    errors.extend(validate_floating_pools(
        &config.constraints.floating_pools,
        &constraints_path.child("floatingPools"),
    ));
    errors.extend(validate_load_balancer_providers(
        &config.constraints.load_balancer_providers,
        &constraints_path.child("loadBalancerProviders"),
    ));
    errors.extend(validate_keystone_urls(config, &path));

    for (i, dns_server) in config.dns_servers.iter().enumerate() {
        if dns_server.parse::<IpAddr>().is_err() {
            errors.push(FieldError::invalid(
                &path.child("dnsServers").index(i),
                dns_server.as_str(),
                "must be a valid IP address",
            ));
        }
    }

    if config.dhcp_domain.as_deref() == Some("") {
        errors.push(FieldError::required(
            &path.child("dhcpDomain"),
            "must provide a dhcp domain when the key is specified",
        ));
    }

    if let Some(request_timeout) = &config.request_timeout {
        if let Err(error) = humantime::parse_duration(request_timeout) {
            errors.push(FieldError::invalid(
                &path.child("requestTimeout"),
                request_timeout.as_str(),
                format!("must be a valid duration: {error}"),
            ));
        }
    }

    let mut policies = BTreeSet::new();
    for (i, policy) in config.server_group_policies.iter().enumerate() {
        let policy_path = path.child("serverGroupPolicies").index(i);
        if policy.is_empty() {
            errors.push(FieldError::required(&policy_path, "policy cannot be empty"));
        } else if !policies.insert(policy.as_str()) {
            errors.push(FieldError::duplicate(&policy_path, policy.as_str()));
        }
    }

    errors.extend(validate_storage_classes(
        &config.storage_classes,
        validators,
        &path.child("storageClasses"),
    ));

    let capability_definitions = match v1beta1::convert_capability_definitions(machine_capabilities)
    {
        Ok(definitions) => definitions,
        Err(error) => {
            errors.push(FieldError::internal_error(
                &spec_path.child("machineCapabilities"),
                &error,
            ));
            return errors;
        }
    };

    let images_path = path.child("machineImages");
    if config.machine_images.is_empty() {
        errors.push(FieldError::required(
            &images_path,
            "must provide at least one machine image",
        ));
    }
    for (i, image) in config.machine_images.iter().enumerate() {
        errors.extend(validate_provider_machine_image(
            image,
            &capability_definitions,
            &images_path.index(i),
        ));
    }

    let matrix = MachineImageMatrix {
        core_images: machine_images,
        provider_images: &config.machine_images,
        parent_images: &[],
        capability_definitions: &capability_definitions,
        profile_kind: "CloudProfile",
    };
    errors.extend(matrix.validate(&spec_path.child("machineImages"), &images_path));

    errors
}

fn validate_floating_pools(floating_pools: &[FloatingPool], path: &FieldPath) -> ErrorList {
    let mut errors = ErrorList::new();
    if floating_pools.is_empty() {
        errors.push(FieldError::required(
            path,
            "must provide at least one floating pool",
        ));
    }

    let mut scopes = BTreeSet::new();
    for (i, pool) in floating_pools.iter().enumerate() {
        let pool_path = path.index(i);
        if pool.name.is_empty() {
            errors.push(FieldError::required(&pool_path.child("name"), "must provide a name"));
        }
        if pool.region.as_deref() == Some("") {
            errors.push(FieldError::required(
                &pool_path.child("region"),
                "must provide a region if key is present",
            ));
        }
        if pool.domain.as_deref() == Some("") {
            errors.push(FieldError::required(
                &pool_path.child("domain"),
                "must provide a domain if key is present",
            ));
        }
        if !scopes.insert((&pool.name, &pool.region, &pool.domain)) {
            errors.push(FieldError::duplicate(
                &pool_path.child("name"),
                pool.name.as_str(),
            ));
        }

        errors.extend(validate_load_balancer_classes(
            &pool.load_balancer_classes,
            &pool_path.child("loadBalancerClasses"),
        ));
    }

    errors
}

fn validate_load_balancer_providers(
    providers: &[LoadBalancerProvider],
    path: &FieldPath,
) -> ErrorList {
    let mut errors = ErrorList::new();
    if providers.is_empty() {
        errors.push(FieldError::required(
            path,
            "must provide at least one load balancer provider",
        ));
    }

    let mut scopes = BTreeSet::new();
    for (i, provider) in providers.iter().enumerate() {
        let provider_path = path.index(i);
        if provider.name.is_empty() {
            errors.push(FieldError::required(
                &provider_path.child("name"),
                "must provide a name",
            ));
        }
        if provider.region.as_deref() == Some("") {
            errors.push(FieldError::required(
                &provider_path.child("region"),
                "must provide a region if key is present",
            ));
        }
        if !scopes.insert((&provider.name, &provider.region)) {
            errors.push(FieldError::duplicate(
                &provider_path.child("name"),
                provider.name.as_str(),
            ));
        }
    }

    errors
}

fn validate_url(url: &str, path: &FieldPath) -> ErrorList {
    match Url::parse(url) {
        Ok(_) => ErrorList::new(),
        Err(error) => {
            FieldError::invalid(path, url, format!("must be a valid URL: {error}")).into()
        }
    }
}

fn validate_keystone_urls(config: &CloudProfileConfig, path: &FieldPath) -> ErrorList {
    let mut errors = ErrorList::new();
    let keystone_url_path = path.child("keystoneURL");

    if config.keystone_url.is_empty() && config.keystone_urls.is_empty() {
        errors.push(FieldError::required(
            &keystone_url_path,
            "must provide the URL to KeyStone",
        ));
    }
    if !config.keystone_url.is_empty() {
        errors.extend(validate_url(&config.keystone_url, &keystone_url_path));
    }

    let mut regions = BTreeSet::new();
    for (i, keystone_url) in config.keystone_urls.iter().enumerate() {
        let url_path = path.child("keystoneURLs").index(i);
        if keystone_url.region.is_empty() {
            errors.push(FieldError::required(
                &url_path.child("region"),
                "must provide a region",
            ));
        } else if !regions.insert(keystone_url.region.as_str()) {
            errors.push(FieldError::duplicate(
                &url_path.child("region"),
                keystone_url.region.as_str(),
            ));
        }

        if keystone_url.url.is_empty() {
            errors.push(FieldError::required(&url_path.child("url"), "must provide an url"));
        } else {
            errors.extend(validate_url(&keystone_url.url, &url_path.child("url")));
        }
    }

    errors
}

fn validate_storage_classes(
    storage_classes: &[StorageClassDefinition],
    validators: &FieldValidators,
    path: &FieldPath,
) -> ErrorList {
    let mut errors = ErrorList::new();
    let mut names = BTreeSet::new();
    let mut default_found = false;

    for (i, storage_class) in storage_classes.iter().enumerate() {
        let class_path = path.index(i);
        if storage_class.name.is_empty() {
            errors.push(FieldError::required(
                &class_path.child("name"),
                "must provide a name",
            ));
        } else if !names.insert(storage_class.name.as_str()) {
            errors.push(FieldError::duplicate(
                &class_path.child("name"),
                storage_class.name.as_str(),
            ));
        }

        if storage_class.default == Some(true) {
            if default_found {
                errors.push(FieldError::invalid(
                    &class_path.child("default"),
                    true,
                    "only one default storage class is allowed",
                ));
            }
            default_found = true;
        }

        if let Some(reclaim_policy) = &storage_class.reclaim_policy {
            errors.extend((validators.reclaim_policy)(
                reclaim_policy,
                &class_path.child("reclaimPolicy"),
            ));
        }
        if let Some(volume_binding_mode) = &storage_class.volume_binding_mode {
            errors.extend((validators.volume_binding_mode)(
                volume_binding_mode,
                &class_path.child("volumeBindingMode"),
            ));
        }
    }

    errors
}

/// Validates a single machine image of a provider config on its own.
pub fn validate_provider_machine_image(
    image: &MachineImages,
    capability_definitions: &[CapabilityDefinition],
    path: &FieldPath,
) -> ErrorList {
    let mut errors = ErrorList::new();

    if image.name.is_empty() {
        errors.push(FieldError::required(&path.child("name"), "must provide a name"));
    }
    if image.versions.is_empty() {
        errors.push(FieldError::required(
            &path.child("versions"),
            format!(
                "must provide at least one version for machine image {:?}",
                image.name
            ),
        ));
    }

    for (j, version) in image.versions.iter().enumerate() {
        let version_path = path.child("versions").index(j);
        if version.version.is_empty() {
            errors.push(FieldError::required(
                &version_path.child("version"),
                "must provide a version",
            ));
        }

        if capability_definitions.is_empty() {
            errors.extend(validate_architecture_mappings(version, &version_path));
        } else {
            errors.extend(validate_capability_flavor_mappings(
                version,
                capability_definitions,
                &version_path,
            ));
        }
    }

    errors
}

fn validate_region_mapping(region: &RegionIdMapping, path: &FieldPath) -> ErrorList {
    let mut errors = ErrorList::new();
    if region.name.is_empty() {
        errors.push(FieldError::required(&path.child("name"), "must provide a name"));
    }
    if region.id.is_empty() {
        errors.push(FieldError::required(&path.child("id"), "must provide an image ID"));
    }
    errors
}

fn validate_architecture_mappings(version: &MachineImageVersion, path: &FieldPath) -> ErrorList {
    let mut errors = ErrorList::new();

    if !version.capability_flavors.is_empty() {
        errors.push(FieldError::forbidden(
            &path.child("capabilityFlavors"),
            "must not be set as the CloudProfile does not define machine capabilities",
        ));
    }
    if version.image.is_empty() && version.regions.is_empty() {
        errors.push(FieldError::required(
            &path.child("regions"),
            "must provide an image or at least one region mapping",
        ));
    }

    for (r, region) in version.regions.iter().enumerate() {
        let region_path = path.child("regions").index(r);
        errors.extend(validate_region_mapping(region, &region_path));
        if let Some(architecture) = &region.architecture {
            if !VALID_ARCHITECTURES.contains(&architecture.as_str()) {
                errors.push(FieldError::not_supported(
                    &region_path.child("architecture"),
                    architecture.as_str(),
                    VALID_ARCHITECTURES.iter().copied(),
                ));
            }
        }
    }

    errors
}

fn validate_capability_flavor_mappings(
    version: &MachineImageVersion,
    capability_definitions: &[CapabilityDefinition],
    path: &FieldPath,
) -> ErrorList {
    let mut errors = ErrorList::new();
    let flavors_path = path.child("capabilityFlavors");

    if !version.regions.is_empty() {
        errors.push(FieldError::forbidden(
            &path.child("regions"),
            "must not be set when machine capabilities are defined, use capabilityFlavors[].regions instead",
        ));
    }

    for (k, flavor) in version.capability_flavors.iter().enumerate() {
        let flavor_path = flavors_path.index(k);
        errors.extend(validate_flavor_capabilities(
            flavor,
            capability_definitions,
            &flavor_path.child("capabilities"),
        ));

        if flavor.image.is_empty() && flavor.regions.is_empty() {
            errors.push(FieldError::required(
                &flavor_path.child("regions"),
                "must provide an image or at least one region mapping",
            ));
        }
        for (r, region) in flavor.regions.iter().enumerate() {
            let region_path = flavor_path.child("regions").index(r);
            errors.extend(validate_region_mapping(region, &region_path));
            if region.architecture.is_some() {
                errors.push(FieldError::forbidden(
                    &region_path.child("architecture"),
                    "must not be set when machine capabilities are defined, the architecture is part of the flavor's capabilities",
                ));
            }
        }
    }

    // Every flavor of a version needs to be available in every region the version is offered in
    let all_regions: BTreeSet<&str> = version
        .capability_flavors
        .iter()
        .flat_map(|flavor| flavor.regions.iter().map(|region| region.name.as_str()))
        .filter(|name| !name.is_empty())
        .collect();
    for (k, flavor) in version.capability_flavors.iter().enumerate() {
        for region in &all_regions {
            if !flavor.regions.iter().any(|mapping| mapping.name == *region) {
                errors.push(FieldError::required(
                    &flavors_path.index(k).child("regions"),
                    format!(
                        "must provide an image for region {region:?}, which is covered by other capability flavors of version {:?}",
                        version.version
                    ),
                ));
            }
        }
    }

    errors
}

fn validate_flavor_capabilities(
    flavor: &MachineImageFlavor,
    capability_definitions: &[CapabilityDefinition],
    path: &FieldPath,
) -> ErrorList {
    let mut errors = ErrorList::new();

    for (name, values) in &flavor.capabilities {
        let capability_path = path.key(name.as_str());
        let Some(definition) = capability_definitions
            .iter()
            .find(|definition| &definition.name == name)
        else {
            errors.push(FieldError::not_supported(
                &capability_path,
                name.as_str(),
                capability_definitions
                    .iter()
                    .map(|definition| definition.name.as_str()),
            ));
            continue;
        };

        for value in values.values() {
            if !definition.values.contains(value) {
                errors.push(FieldError::not_supported(
                    &capability_path,
                    value.as_str(),
                    definition.values.values().iter().map(String::as_str),
                ));
            }
        }
    }

    errors
}

/// Renders capabilities as JSON for error messages.
fn display_capabilities(capabilities: &v1beta1::Capabilities) -> String {
    serde_json::to_string(capabilities).unwrap_or_default()
}

/// The architectures a core image version is published for.
fn core_architectures(version: &core::MachineImageVersion) -> Vec<&str> {
    if version.architectures.is_empty() {
        vec![ARCHITECTURE_AMD64]
    } else {
        version.architectures.iter().map(String::as_str).collect()
    }
}

/// Cross checks the machine images of a profile against the machine images of its provider config.
///
/// In the NamespacedCloudProfile case, versions of the profile which are already mapped by the
/// parent CloudProfile don't need a mapping in the provider config.
pub struct MachineImageMatrix<'a> {
    pub core_images: &'a [core::MachineImage],
    pub provider_images: &'a [MachineImages],
    pub parent_images: &'a [v1beta1::MachineImage],
    pub capability_definitions: &'a [CapabilityDefinition],

    /// The kind of the validated profile, used in error messages.
    pub profile_kind: &'static str,
}

impl MachineImageMatrix<'_> {
    /// Validates the matrix. `core_path` points at the profile's machine images, `provider_path`
    /// at the provider config's machine images.
    pub fn validate(&self, core_path: &FieldPath, provider_path: &FieldPath) -> ErrorList {
        let mut errors = self.validate_core_images(core_path);
        errors.extend(self.validate_provider_images(provider_path));
        errors
    }

    fn defaulted_core_flavors(
        &self,
        version: &core::MachineImageVersion,
    ) -> Result<Vec<v1beta1::Capabilities>, ConversionError> {
        let version = v1beta1::MachineImageVersion::try_from(version)?;
        Ok(v1beta1::image_flavors_with_applied_defaults(
            &version.capability_flavors,
            self.capability_definitions,
        )
        .into_iter()
        .map(|flavor| flavor.capabilities)
        .collect())
    }

    fn defaulted_provider_flavors(&self, version: &MachineImageVersion) -> Vec<v1beta1::Capabilities> {
        version
            .capability_flavors
            .iter()
            .map(|flavor| {
                v1beta1::capabilities_with_applied_defaults(
                    &flavor.capabilities,
                    self.capability_definitions,
                )
            })
            .collect()
    }

    fn validate_core_images(&self, core_path: &FieldPath) -> ErrorList {
        let mut errors = ErrorList::new();
        let provider = ProviderImagesContext::new(self.provider_images);
        let parent = ParentImagesContext::new(self.parent_images);

        for (i, image) in self.core_images.iter().enumerate() {
            let image_path = core_path.index(i);
            if provider.image(&image.name).is_none() && parent.image(&image.name).is_none() {
                errors.push(FieldError::required(
                    &image_path,
                    format!(
                        "must provide an image mapping for image {:?} in providerConfig",
                        image.name
                    ),
                ));
                continue;
            }

            for (j, version) in image.versions.iter().enumerate() {
                let version_path = image_path.child("versions").index(j);
                let Some(provider_version) = provider.image_version(&image.name, &version.version)
                else {
                    if parent.image_version(&image.name, &version.version).is_none() {
                        errors.push(FieldError::required(
                            &version_path,
                            format!(
                                "machine image version {}@{} is not defined in the providerConfig",
                                image.name, version.version
                            ),
                        ));
                    }
                    continue;
                };

                if self.capability_definitions.is_empty() {
                    for architecture in core_architectures(version) {
                        let mapped = provider_version
                            .regions
                            .iter()
                            .any(|region| region.architecture_or_default() == architecture);
                        if !mapped {
                            errors.push(FieldError::required(
                                &version_path,
                                format!(
                                    "missing providerConfig mapping for machine image version {}@{} and architecture: {architecture}",
                                    image.name, version.version
                                ),
                            ));
                        }
                    }
                    continue;
                }

                let core_flavors = match self.defaulted_core_flavors(version) {
                    Ok(flavors) => flavors,
                    Err(error) => {
                        errors.push(FieldError::internal_error(&version_path, &error));
                        continue;
                    }
                };
                let provider_flavors = self.defaulted_provider_flavors(provider_version);
                for flavor in &core_flavors {
                    if !provider_flavors.contains(flavor) {
                        errors.push(FieldError::required(
                            &version_path,
                            format!(
                                "missing providerConfig mapping for machine image version {}@{} and capabilities {}",
                                image.name,
                                version.version,
                                display_capabilities(flavor)
                            ),
                        ));
                    }
                }
            }
        }

        errors
    }

    fn validate_provider_images(&self, provider_path: &FieldPath) -> ErrorList {
        let mut errors = ErrorList::new();
        let core = CoreImagesContext::new(self.core_images);

        for (i, image) in self.provider_images.iter().enumerate() {
            for (j, version) in image.versions.iter().enumerate() {
                let version_path = provider_path.index(i).child("versions").index(j);
                let Some(core_version) = core.image_version(&image.name, &version.version) else {
                    errors.push(FieldError::required(
                        &version_path,
                        format!(
                            "machine image version {}@{} is not defined in the {} spec.machineImages",
                            image.name, version.version, self.profile_kind
                        ),
                    ));
                    continue;
                };

                if self.capability_definitions.is_empty() {
                    let architectures = core_architectures(core_version);
                    for (r, region) in version.regions.iter().enumerate() {
                        let architecture = region.architecture_or_default();
                        if !architectures.contains(&architecture) {
                            errors.push(FieldError::forbidden(
                                &version_path.child("regions").index(r),
                                format!(
                                    "machine image version {}@{} has an excess entry for region {:?} and architecture {architecture:?}, which is not defined in the machineImages spec",
                                    image.name, version.version, region.name
                                ),
                            ));
                        }
                    }
                    continue;
                }

                // Conversion failures are reported for the core version
                let Ok(core_flavors) = self.defaulted_core_flavors(core_version) else {
                    continue;
                };
                for (k, flavor) in self.defaulted_provider_flavors(version).iter().enumerate() {
                    if !core_flavors.contains(flavor) {
                        errors.push(FieldError::forbidden(
                            &version_path.child("capabilityFlavors").index(k),
                            format!(
                                "machine image version {}@{} has an excess entry for capabilities {}, which are not defined in the machineImages spec",
                                image.name,
                                version.version,
                                display_capabilities(flavor)
                            ),
                        ));
                    }
                }
            }
        }

        errors
    }
}
