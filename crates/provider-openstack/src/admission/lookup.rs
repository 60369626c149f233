use k8s_openapi::{api::core::v1::Secret, apimachinery::pkg::apis::meta::v1::ObjectMeta};

use crate::{
    admission::Resource,
    apis::core::{CloudProfile, CredentialsBinding, NamespacedCloudProfile, SecretBinding},
};

/// Fetches the objects a validated resource refers to.
///
/// Inside an admission webhook this is backed by a (cached) API client, the command line front
/// end uses a [`StaticLookup`] over the manifests it was given.
pub trait ObjectLookup {
    fn cloud_profile(&self, name: &str) -> Option<&CloudProfile>;
    fn namespaced_cloud_profile(
        &self,
        namespace: &str,
        name: &str,
    ) -> Option<&NamespacedCloudProfile>;
    fn secret(&self, namespace: &str, name: &str) -> Option<&Secret>;
    fn secret_binding(&self, namespace: &str, name: &str) -> Option<&SecretBinding>;
    fn credentials_binding(&self, namespace: &str, name: &str) -> Option<&CredentialsBinding>;
}

/// An [`ObjectLookup`] over a fixed set of resources.
#[derive(Clone, Debug, Default)]
pub struct StaticLookup {
    resources: Vec<Resource>,
}

impl StaticLookup {
    pub fn new(resources: Vec<Resource>) -> Self {
        Self { resources }
    }

    pub fn push(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    fn find<'a, T>(
        &'a self,
        namespace: Option<&str>,
        name: &str,
        select: impl Fn(&'a Resource) -> Option<(&'a ObjectMeta, &'a T)>,
    ) -> Option<&'a T> {
        self.resources
            .iter()
            .filter_map(select)
            .find(|(metadata, _)| {
                metadata.name.as_deref() == Some(name)
                    && (namespace.is_none() || metadata.namespace.as_deref() == namespace)
            })
            .map(|(_, object)| object)
    }
}

impl FromIterator<Resource> for StaticLookup {
    fn from_iter<T: IntoIterator<Item = Resource>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl ObjectLookup for StaticLookup {
    fn cloud_profile(&self, name: &str) -> Option<&CloudProfile> {
        self.find(None, name, |resource| match resource {
            Resource::CloudProfile(profile) => Some((&profile.metadata, profile)),
            _ => None,
        })
    }

    fn namespaced_cloud_profile(
        &self,
        namespace: &str,
        name: &str,
    ) -> Option<&NamespacedCloudProfile> {
        self.find(Some(namespace), name, |resource| match resource {
            Resource::NamespacedCloudProfile(profile) => Some((&profile.metadata, profile)),
            _ => None,
        })
    }

    fn secret(&self, namespace: &str, name: &str) -> Option<&Secret> {
        self.find(Some(namespace), name, |resource| match resource {
            Resource::Secret(secret) => Some((&secret.metadata, secret)),
            _ => None,
        })
    }

    fn secret_binding(&self, namespace: &str, name: &str) -> Option<&SecretBinding> {
        self.find(Some(namespace), name, |resource| match resource {
            Resource::SecretBinding(binding) => Some((&binding.metadata, binding)),
            _ => None,
        })
    }

    fn credentials_binding(&self, namespace: &str, name: &str) -> Option<&CredentialsBinding> {
        self.find(Some(namespace), name, |resource| match resource {
            Resource::CredentialsBinding(binding) => Some((&binding.metadata, binding)),
            _ => None,
        })
    }
}
