//! Lookup helpers over the three machine image representations (core, versioned parent and
//! OpenStack provider config).

use std::collections::BTreeMap;

use crate::apis::{core, openstack, v1beta1};

/// A named machine image with a list of versions.
pub trait MachineImageEntry {
    type Version: MachineImageVersionEntry;

    fn name(&self) -> &str;
    fn versions(&self) -> &[Self::Version];
}

pub trait MachineImageVersionEntry {
    fn version(&self) -> &str;
}

macro_rules! impl_machine_image_entry {
    ($image:ty, $version:ty) => {
        impl MachineImageEntry for $image {
            type Version = $version;

            fn name(&self) -> &str {
                &self.name
            }

            fn versions(&self) -> &[Self::Version] {
                &self.versions
            }
        }

        impl MachineImageVersionEntry for $version {
            fn version(&self) -> &str {
                &self.version
            }
        }
    };
}

impl_machine_image_entry!(core::MachineImage, core::MachineImageVersion);
impl_machine_image_entry!(v1beta1::MachineImage, v1beta1::MachineImageVersion);
impl_machine_image_entry!(openstack::MachineImages, openstack::MachineImageVersion);

/// Indexes machine images by name and version.
///
/// If an image or version is declared more than once, the first declaration wins.
pub struct ImagesContext<'a, I: MachineImageEntry> {
    images: BTreeMap<&'a str, (&'a I, BTreeMap<&'a str, &'a I::Version>)>,
}

impl<'a, I: MachineImageEntry> ImagesContext<'a, I> {
    pub fn new(images: &'a [I]) -> Self {
        let mut indexed = BTreeMap::new();
        for image in images {
            let (_, versions) = indexed
                .entry(image.name())
                .or_insert_with(|| (image, BTreeMap::new()));
            for version in image.versions() {
                versions.entry(version.version()).or_insert(version);
            }
        }
        Self { images: indexed }
    }

    pub fn image(&self, name: &str) -> Option<&'a I> {
        self.images.get(name).map(|(image, _)| *image)
    }

    pub fn image_version(&self, name: &str, version: &str) -> Option<&'a I::Version> {
        self.images
            .get(name)
            .and_then(|(_, versions)| versions.get(version).copied())
    }
}

pub type CoreImagesContext<'a> = ImagesContext<'a, core::MachineImage>;
pub type ParentImagesContext<'a> = ImagesContext<'a, v1beta1::MachineImage>;
pub type ProviderImagesContext<'a> = ImagesContext<'a, openstack::MachineImages>;

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_images() -> Vec<openstack::MachineImages> {
        vec![
            openstack::MachineImages {
                name: "gardenlinux".to_owned(),
                versions: vec![
                    openstack::MachineImageVersion {
                        version: "1.0.0".to_owned(),
                        image: "first".to_owned(),
                        ..Default::default()
                    },
                    openstack::MachineImageVersion {
                        version: "1.0.0".to_owned(),
                        image: "second".to_owned(),
                        ..Default::default()
                    },
                ],
            },
            openstack::MachineImages {
                name: "ubuntu".to_owned(),
                versions: vec![],
            },
        ]
    }

    #[test]
    fn lookup_by_name_and_version() {
        let images = provider_images();
        let context = ProviderImagesContext::new(&images);

        assert!(context.image("ubuntu").is_some());
        assert!(context.image("suse").is_none());
        assert_eq!(
            context
                .image_version("gardenlinux", "1.0.0")
                .map(|v| v.image.as_str()),
            Some("first")
        );
        assert!(context.image_version("ubuntu", "1.0.0").is_none());
    }
}
