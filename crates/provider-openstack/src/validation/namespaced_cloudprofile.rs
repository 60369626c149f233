//! Validation of the OpenStack provider config of NamespacedCloudProfiles.
//!
//! A NamespacedCloudProfile may only add machine image versions to its parent CloudProfile. Its
//! provider config is therefore restricted to `machineImages`, and must not remap versions the
//! parent already maps.

use crate::{
    apis::{
        core,
        helper::ParentImagesContext,
        openstack::CloudProfileConfig,
        v1beta1,
    },
    validation::{
        cloudprofile::{MachineImageMatrix, validate_provider_machine_image},
        field::{ErrorList, FieldError, FieldPath},
    },
};

/// Validates the provider config of a NamespacedCloudProfile against its own machine images and
/// the parent CloudProfile's spec.
pub fn validate_namespaced_cloud_profile_config(
    config: &CloudProfileConfig,
    machine_images: &[core::MachineImage],
    parent: &v1beta1::CloudProfileSpec,
    spec_path: &FieldPath,
) -> ErrorList {
    let path = spec_path.child("providerConfig");
    let images_path = path.child("machineImages");
    let mut errors = ErrorList::new();

    if *config != config.machine_images_projection() {
        errors.push(FieldError::forbidden(&path, "must only set machineImages"));
    }

    for (i, image) in config.machine_images.iter().enumerate() {
        errors.extend(validate_provider_machine_image(
            image,
            &parent.machine_capabilities,
            &images_path.index(i),
        ));
    }

    let parent_images = ParentImagesContext::new(&parent.machine_images);
    for (i, image) in config.machine_images.iter().enumerate() {
        for (j, version) in image.versions.iter().enumerate() {
            if parent_images
                .image_version(&image.name, &version.version)
                .is_some()
            {
                errors.push(FieldError::forbidden(
                    &images_path.index(i).child("versions").index(j),
                    format!(
                        "machine image version {}@{} is already defined in the parent CloudProfile",
                        image.name, version.version
                    ),
                ));
            }
        }
    }

    let matrix = MachineImageMatrix {
        core_images: machine_images,
        provider_images: &config.machine_images,
        parent_images: &parent.machine_images,
        capability_definitions: &parent.machine_capabilities,
        profile_kind: "NamespacedCloudProfile",
    };
    errors.extend(matrix.validate(&spec_path.child("machineImages"), &images_path));

    errors
}
