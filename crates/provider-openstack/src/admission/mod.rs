//! Admission of Gardener resources carrying OpenStack configuration.
//!
//! The [`Validator`] receives the admitted [`Resource`] (and its previous state on updates),
//! fetches referenced objects through an [`ObjectLookup`] and runs the matching validations.

use k8s_openapi::{api::core::v1::Secret, apimachinery::pkg::apis::meta::v1::ObjectMeta};
use serde::{
    Deserialize, Deserializer,
    de::{DeserializeOwned, Error as _},
};
use serde_json::Value;
use snafu::{OptionExt, ResultExt, Snafu, ensure};
use tracing::{debug, instrument};

use crate::{
    apis::{
        PROVIDER_TYPE,
        core::{
            BackupBucket, CloudProfile, CloudProfileReference, CredentialsBinding,
            NamespacedCloudProfile, ObjectReference, SecretBinding, SecretReference, Seed, Shoot,
        },
        openstack::{CloudProfileConfig, ControlPlaneConfig, InfrastructureConfig},
        v1beta1,
    },
    validation::{
        cloudprofile::validate_cloud_profile_config,
        controlplane::{
            validate_control_plane_config, validate_control_plane_config_against_cloud_profile,
        },
        field::{ErrorList, FieldError, FieldPath},
        infrastructure::{
            validate_infrastructure_config, validate_infrastructure_config_against_cloud_profile,
            validate_infrastructure_config_update,
        },
        namespaced_cloudprofile::validate_namespaced_cloud_profile_config,
        primitives::FieldValidators,
        secret::{DOMAIN_NAME, secret_value, validate_credentials_secret},
        shoot::validate_networking,
        worker::{validate_workers, validate_workers_update},
    },
};

mod lookup;

pub use lookup::{ObjectLookup, StaticLookup};

type Result<T, E = Error> = std::result::Result<T, E>;

const KIND_CLOUD_PROFILE: &str = "CloudProfile";
const KIND_NAMESPACED_CLOUD_PROFILE: &str = "NamespacedCloudProfile";
const KIND_SECRET: &str = "Secret";

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to decode {field} of {object}"))]
    DecodeProviderConfig {
        source: serde_json::Error,
        field: &'static str,
        object: String,
    },

    #[snafu(display("{kind} {name:?} not found"))]
    CloudProfileNotFound { kind: String, name: String },

    #[snafu(display("{kind} {name:?} has no providerConfig"))]
    CloudProfileConfigMissing { kind: String, name: String },

    #[snafu(display("{kind} {namespace}/{name} not found"))]
    BindingNotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    #[snafu(display("secret {namespace}/{name} not found"))]
    SecretNotFound { namespace: String, name: String },

    #[snafu(display("referenced secret {namespace}/{name} is not valid: {errors}"))]
    InvalidSecret {
        namespace: String,
        name: String,
        errors: ErrorList,
    },

    #[snafu(display("cannot compare a {new} to a previous {old}"))]
    KindMismatch { new: &'static str, old: &'static str },

    #[snafu(display("{kind} {object} is invalid: {errors}"))]
    Invalid {
        kind: &'static str,
        object: String,
        errors: ErrorList,
    },
}

/// The kinds of resources the validator admits.
///
/// Resources are told apart by their `kind`. The whole manifest, `kind` included, is handed to
/// the selected type since the Kubernetes types check their own `apiVersion` and `kind`.
#[derive(Clone, Debug, PartialEq, strum::IntoStaticStr, strum::VariantNames)]
pub enum Resource {
    Shoot(Shoot),
    CloudProfile(CloudProfile),
    NamespacedCloudProfile(NamespacedCloudProfile),
    SecretBinding(SecretBinding),
    CredentialsBinding(CredentialsBinding),
    BackupBucket(BackupBucket),
    Seed(Seed),
    Secret(Secret),
}

impl Resource {
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Resource::Shoot(shoot) => &shoot.metadata,
            Resource::CloudProfile(profile) => &profile.metadata,
            Resource::NamespacedCloudProfile(profile) => &profile.metadata,
            Resource::SecretBinding(binding) => &binding.metadata,
            Resource::CredentialsBinding(binding) => &binding.metadata,
            Resource::BackupBucket(bucket) => &bucket.metadata,
            Resource::Seed(seed) => &seed.metadata,
            Resource::Secret(secret) => &secret.metadata,
        }
    }

    /// `namespace/name` for namespaced resources, `name` otherwise.
    pub fn object_name(&self) -> String {
        object_name(self.metadata())
    }
}

impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use strum::VariantNames as _;

        fn parse<'de, T: DeserializeOwned, D: Deserializer<'de>>(
            manifest: Value,
        ) -> Result<T, D::Error> {
            T::deserialize(manifest).map_err(D::Error::custom)
        }

        let manifest = Value::deserialize(deserializer)?;
        let kind = manifest
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| D::Error::missing_field("kind"))?
            .to_owned();

        match kind.as_str() {
            "Shoot" => parse::<_, D>(manifest).map(Resource::Shoot),
            "CloudProfile" => parse::<_, D>(manifest).map(Resource::CloudProfile),
            "NamespacedCloudProfile" => {
                parse::<_, D>(manifest).map(Resource::NamespacedCloudProfile)
            }
            "SecretBinding" => parse::<_, D>(manifest).map(Resource::SecretBinding),
            "CredentialsBinding" => parse::<_, D>(manifest).map(Resource::CredentialsBinding),
            "BackupBucket" => parse::<_, D>(manifest).map(Resource::BackupBucket),
            "Seed" => parse::<_, D>(manifest).map(Resource::Seed),
            "Secret" => parse::<_, D>(manifest).map(Resource::Secret),
            other => Err(D::Error::unknown_variant(other, Self::VARIANTS)),
        }
    }
}

fn object_name(metadata: &ObjectMeta) -> String {
    let name = metadata.name.as_deref().unwrap_or_default();
    match metadata.namespace.as_deref() {
        Some(namespace) => format!("{namespace}/{name}"),
        None => name.to_owned(),
    }
}

fn decode<T: DeserializeOwned>(value: &Value, field: &'static str, object: &str) -> Result<T> {
    T::deserialize(value).context(DecodeProviderConfigSnafu { field, object })
}

/// Validates admitted resources.
pub struct Validator {
    validators: FieldValidators,
}

impl Validator {
    pub fn new(validators: FieldValidators) -> Self {
        Self { validators }
    }

    /// Validates `new`, which replaces `old` on updates.
    #[instrument(skip_all, fields(kind = new.kind(), object = %new.object_name()))]
    pub fn validate(
        &self,
        new: &Resource,
        old: Option<&Resource>,
        lookup: &dyn ObjectLookup,
    ) -> Result<()> {
        if let Some(old) = old {
            ensure!(old.kind() == new.kind(), KindMismatchSnafu {
                new: new.kind(),
                old: old.kind(),
            });
        }

        if new.metadata().deletion_timestamp.is_some() {
            debug!("skipping validation of resource in deletion");
            return Ok(());
        }

        let errors = match new {
            Resource::Shoot(shoot) => {
                let old = match old {
                    Some(Resource::Shoot(old)) => Some(old),
                    _ => None,
                };
                self.validate_shoot(shoot, old, lookup)?
            }
            Resource::CloudProfile(profile) => self.validate_cloud_profile(profile)?,
            Resource::NamespacedCloudProfile(profile) => {
                self.validate_namespaced_cloud_profile(profile, lookup)?
            }
            Resource::SecretBinding(binding) => self.validate_secret_binding(binding, lookup)?,
            Resource::CredentialsBinding(binding) => {
                self.validate_credentials_binding(binding, lookup)?
            }
            Resource::BackupBucket(bucket) => self.validate_backup_bucket(bucket, lookup)?,
            Resource::Seed(seed) => self.validate_seed(seed, lookup)?,
            Resource::Secret(secret) => validate_credentials_secret(secret, &FieldPath::new("data")),
        };

        debug!(error_count = errors.len(), "validated resource");
        ensure!(errors.is_empty(), InvalidSnafu {
            kind: new.kind(),
            object: new.object_name(),
            errors,
        });
        Ok(())
    }

    /// Returns the OpenStack config of the CloudProfile a shoot refers to.
    ///
    /// NamespacedCloudProfiles may only add machine images, so the constraints are taken from
    /// their parent.
    fn shoot_cloud_profile_config(
        &self,
        reference: &CloudProfileReference,
        namespace: &str,
        lookup: &dyn ObjectLookup,
    ) -> Result<CloudProfileConfig> {
        let profile_name = if reference.kind == KIND_NAMESPACED_CLOUD_PROFILE {
            let namespaced = lookup
                .namespaced_cloud_profile(namespace, &reference.name)
                .context(CloudProfileNotFoundSnafu {
                    kind: KIND_NAMESPACED_CLOUD_PROFILE,
                    name: format!("{namespace}/{}", reference.name),
                })?;
            namespaced.spec.parent.name.as_str()
        } else {
            reference.name.as_str()
        };

        let profile = lookup
            .cloud_profile(profile_name)
            .context(CloudProfileNotFoundSnafu {
                kind: KIND_CLOUD_PROFILE,
                name: profile_name,
            })?;
        let provider_config =
            profile
                .spec
                .provider_config
                .as_ref()
                .context(CloudProfileConfigMissingSnafu {
                    kind: KIND_CLOUD_PROFILE,
                    name: profile_name,
                })?;

        decode(provider_config, "providerConfig", profile_name)
    }

    /// Returns the keystone domain of the credentials a shoot uses, if the shoot refers to any.
    fn shoot_domain(
        &self,
        shoot: &Shoot,
        namespace: &str,
        lookup: &dyn ObjectLookup,
    ) -> Result<Option<String>> {
        let secret_reference = if let Some(name) = &shoot.spec.credentials_binding_name {
            let binding = lookup.credentials_binding(namespace, name).context(
                BindingNotFoundSnafu {
                    kind: "CredentialsBinding",
                    namespace,
                    name: name.as_str(),
                },
            )?;
            secret_reference_of(&binding.credentials_ref, namespace)
        } else if let Some(name) = &shoot.spec.secret_binding_name {
            let binding = lookup
                .secret_binding(namespace, name)
                .context(BindingNotFoundSnafu {
                    kind: "SecretBinding",
                    namespace,
                    name: name.as_str(),
                })?;
            Some(secret_reference_with_default(&binding.secret_ref, namespace))
        } else {
            None
        };

        let Some((secret_namespace, secret_name)) = secret_reference else {
            return Ok(None);
        };
        let secret = lookup
            .secret(&secret_namespace, &secret_name)
            .context(SecretNotFoundSnafu {
                namespace: secret_namespace.as_str(),
                name: secret_name.as_str(),
            })?;

        Ok(secret_value(secret, DOMAIN_NAME)
            .ok()
            .flatten()
            .map(ToOwned::to_owned))
    }

    fn validate_shoot(
        &self,
        shoot: &Shoot,
        old: Option<&Shoot>,
        lookup: &dyn ObjectLookup,
    ) -> Result<ErrorList> {
        let spec = &shoot.spec;
        if spec.provider.provider_type != PROVIDER_TYPE {
            debug!(
                provider_type = spec.provider.provider_type.as_str(),
                "skipping shoot of other provider"
            );
            return Ok(ErrorList::new());
        }

        let object = object_name(&shoot.metadata);
        let namespace = shoot.metadata.namespace.as_deref().unwrap_or_default();
        let spec_path = FieldPath::new("spec");
        let provider_path = spec_path.child("provider");
        let infrastructure_path = provider_path.child("infrastructureConfig");
        let control_plane_path = provider_path.child("controlPlaneConfig");
        let workers_path = provider_path.child("workers");

        let mut errors = validate_networking(spec.networking.as_ref(), &spec_path.child("networking"));

        let Some(infrastructure) = &spec.provider.infrastructure_config else {
            errors.push(FieldError::required(
                &infrastructure_path,
                "infrastructureConfig must be set for OpenStack shoots",
            ));
            return Ok(errors);
        };
        let infrastructure: InfrastructureConfig =
            decode(infrastructure, "infrastructureConfig", &object)?;

        let Some(control_plane) = &spec.provider.control_plane_config else {
            errors.push(FieldError::required(
                &control_plane_path,
                "controlPlaneConfig must be set for OpenStack shoots",
            ));
            return Ok(errors);
        };
        let control_plane: ControlPlaneConfig =
            decode(control_plane, "controlPlaneConfig", &object)?;

        let old_infrastructure: Option<InfrastructureConfig> = old
            .and_then(|old| old.spec.provider.infrastructure_config.as_ref())
            .map(|config| decode(config, "infrastructureConfig", &object))
            .transpose()?;
        let old_control_plane: Option<ControlPlaneConfig> = old
            .and_then(|old| old.spec.provider.control_plane_config.as_ref())
            .map(|config| decode(config, "controlPlaneConfig", &object))
            .transpose()?;

        let Some(reference) = spec.cloud_profile_reference() else {
            errors.push(FieldError::required(
                &spec_path.child("cloudProfile"),
                "must refer to a CloudProfile",
            ));
            return Ok(errors);
        };
        let profile_config = self.shoot_cloud_profile_config(&reference, namespace, lookup)?;
        let domain = self.shoot_domain(shoot, namespace, lookup)?;
        let nodes = spec
            .networking
            .as_ref()
            .and_then(|networking| networking.nodes.as_deref());

        errors.extend(validate_infrastructure_config(
            &infrastructure,
            nodes,
            &self.validators,
            &infrastructure_path,
        ));
        if let Some(old_infrastructure) = &old_infrastructure {
            errors.extend(validate_infrastructure_config_update(
                old_infrastructure,
                &infrastructure,
                &infrastructure_path,
            ));
        }
        errors.extend(validate_infrastructure_config_against_cloud_profile(
            old_infrastructure.as_ref(),
            &infrastructure,
            domain.as_deref(),
            &spec.region,
            &profile_config,
            &infrastructure_path,
        ));

        errors.extend(validate_control_plane_config(
            &control_plane,
            &infrastructure,
            &control_plane_path,
        ));
        errors.extend(validate_control_plane_config_against_cloud_profile(
            old_control_plane.as_ref(),
            &control_plane,
            domain.as_deref(),
            &spec.region,
            &infrastructure.floating_pool_name,
            &profile_config,
            &control_plane_path,
        ));

        errors.extend(validate_workers(
            &spec.provider.workers,
            &profile_config,
            &self.validators,
            &workers_path,
        ));
        if let Some(old) = old {
            errors.extend(validate_workers_update(
                &old.spec.provider.workers,
                &spec.provider.workers,
                &workers_path,
            ));
        }

        Ok(errors)
    }

    fn validate_cloud_profile(&self, profile: &CloudProfile) -> Result<ErrorList> {
        let spec_path = FieldPath::new("spec");
        let Some(provider_config) = &profile.spec.provider_config else {
            return Ok(FieldError::required(
                &spec_path.child("providerConfig"),
                "providerConfig must be set for OpenStack cloud profiles",
            )
            .into());
        };
        let config: CloudProfileConfig = decode(
            provider_config,
            "providerConfig",
            &object_name(&profile.metadata),
        )?;

        Ok(validate_cloud_profile_config(
            &config,
            &profile.spec.machine_images,
            &profile.spec.machine_capabilities,
            &self.validators,
            &spec_path,
        ))
    }

    fn validate_namespaced_cloud_profile(
        &self,
        profile: &NamespacedCloudProfile,
        lookup: &dyn ObjectLookup,
    ) -> Result<ErrorList> {
        // Without a providerConfig every added version must be mapped by the parent
        let config: CloudProfileConfig = match &profile.spec.provider_config {
            Some(provider_config) => decode(
                provider_config,
                "providerConfig",
                &object_name(&profile.metadata),
            )?,
            None => CloudProfileConfig::default(),
        };

        let spec_path = FieldPath::new("spec");
        let parent_name = profile.spec.parent.name.as_str();
        let parent = lookup
            .cloud_profile(parent_name)
            .context(CloudProfileNotFoundSnafu {
                kind: KIND_CLOUD_PROFILE,
                name: parent_name,
            })?;
        let parent_spec = match v1beta1::CloudProfileSpec::try_from(&parent.spec) {
            Ok(spec) => spec,
            Err(error) => {
                return Ok(FieldError::internal_error(&spec_path.child("parent"), &error).into());
            }
        };

        Ok(validate_namespaced_cloud_profile_config(
            &config,
            &profile.spec.machine_images,
            &parent_spec,
            &spec_path,
        ))
    }

    /// Looks up and validates a referenced credentials secret.
    fn validate_referenced_secret(
        &self,
        namespace: &str,
        name: &str,
        lookup: &dyn ObjectLookup,
    ) -> Result<()> {
        let secret = lookup
            .secret(namespace, name)
            .context(SecretNotFoundSnafu { namespace, name })?;
        let errors = validate_credentials_secret(secret, &FieldPath::new("data"));

        ensure!(errors.is_empty(), InvalidSecretSnafu {
            namespace,
            name,
            errors,
        });
        Ok(())
    }

    fn validate_secret_binding(
        &self,
        binding: &SecretBinding,
        lookup: &dyn ObjectLookup,
    ) -> Result<ErrorList> {
        if let Some(provider) = &binding.provider {
            if provider.provider_type != PROVIDER_TYPE {
                return Ok(provider_type_not_supported(
                    &provider.provider_type,
                    &FieldPath::from_fields(["provider", "type"]),
                ));
            }
        }

        let namespace = binding.metadata.namespace.as_deref().unwrap_or_default();
        let (secret_namespace, secret_name) =
            secret_reference_with_default(&binding.secret_ref, namespace);
        self.validate_referenced_secret(&secret_namespace, &secret_name, lookup)?;
        Ok(ErrorList::new())
    }

    fn validate_credentials_binding(
        &self,
        binding: &CredentialsBinding,
        lookup: &dyn ObjectLookup,
    ) -> Result<ErrorList> {
        if binding.provider.provider_type != PROVIDER_TYPE {
            return Ok(provider_type_not_supported(
                &binding.provider.provider_type,
                &FieldPath::from_fields(["provider", "type"]),
            ));
        }

        let namespace = binding.metadata.namespace.as_deref().unwrap_or_default();
        let Some((secret_namespace, secret_name)) =
            secret_reference_of(&binding.credentials_ref, namespace)
        else {
            return Ok(credentials_kind_not_supported(
                &binding.credentials_ref,
                &FieldPath::from_fields(["credentialsRef", "kind"]),
            ));
        };
        self.validate_referenced_secret(&secret_namespace, &secret_name, lookup)?;
        Ok(ErrorList::new())
    }

    fn validate_backup_bucket(
        &self,
        bucket: &BackupBucket,
        lookup: &dyn ObjectLookup,
    ) -> Result<ErrorList> {
        let spec = &bucket.spec;
        let spec_path = FieldPath::new("spec");
        if spec.provider.provider_type != PROVIDER_TYPE {
            return Ok(provider_type_not_supported(
                &spec.provider.provider_type,
                &spec_path.child("provider").child("type"),
            ));
        }

        let namespace = bucket.metadata.namespace.as_deref().unwrap_or_default();
        let secret_reference = match (&spec.credentials_ref, &spec.secret_ref) {
            (Some(credentials_ref), _) => {
                let Some(reference) = secret_reference_of(credentials_ref, namespace) else {
                    return Ok(credentials_kind_not_supported(
                        credentials_ref,
                        &spec_path.child("credentialsRef").child("kind"),
                    ));
                };
                reference
            }
            (None, Some(secret_ref)) => secret_reference_with_default(secret_ref, namespace),
            (None, None) => {
                return Ok(FieldError::required(
                    &spec_path.child("credentialsRef"),
                    "must refer to the credentials of the bucket",
                )
                .into());
            }
        };

        self.validate_referenced_secret(&secret_reference.0, &secret_reference.1, lookup)?;
        Ok(ErrorList::new())
    }

    fn validate_seed(&self, seed: &Seed, lookup: &dyn ObjectLookup) -> Result<ErrorList> {
        let Some(backup) = &seed.spec.backup else {
            return Ok(ErrorList::new());
        };
        if backup.provider != PROVIDER_TYPE {
            return Ok(ErrorList::new());
        }

        let Some(credentials_ref) = &backup.credentials_ref else {
            return Ok(FieldError::required(
                &FieldPath::from_fields(["spec", "backup", "credentialsRef"]),
                "must refer to the credentials of the backup bucket",
            )
            .into());
        };
        let Some((namespace, name)) = secret_reference_of(credentials_ref, "") else {
            return Ok(credentials_kind_not_supported(
                credentials_ref,
                &FieldPath::from_fields(["spec", "backup", "credentialsRef", "kind"]),
            ));
        };

        self.validate_referenced_secret(&namespace, &name, lookup)?;
        Ok(ErrorList::new())
    }
}

/// The namespace and name of a secret reference, defaulting the namespace.
fn secret_reference_with_default(
    reference: &SecretReference,
    default_namespace: &str,
) -> (String, String) {
    (
        reference
            .namespace
            .clone()
            .unwrap_or_else(|| default_namespace.to_owned()),
        reference.name.clone(),
    )
}

/// The namespace and name of the secret an object reference points to, if it points to one.
fn secret_reference_of(
    reference: &ObjectReference,
    default_namespace: &str,
) -> Option<(String, String)> {
    (reference.kind == KIND_SECRET).then(|| {
        (
            reference
                .namespace
                .clone()
                .unwrap_or_else(|| default_namespace.to_owned()),
            reference.name.clone(),
        )
    })
}

fn provider_type_not_supported(provider_type: &str, path: &FieldPath) -> ErrorList {
    FieldError::not_supported(path, provider_type, [PROVIDER_TYPE]).into()
}

fn credentials_kind_not_supported(reference: &ObjectReference, path: &FieldPath) -> ErrorList {
    FieldError::not_supported(path, reference.kind.as_str(), [KIND_SECRET]).into()
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn resource(input: &str) -> Resource {
        serde_yaml::from_str(input).expect("valid resource")
    }

    fn validator() -> Validator {
        Validator::new(FieldValidators::new().expect("validators must compile"))
    }

    #[test]
    fn resources_are_decoded_by_kind() {
        let secret = resource(indoc! {"
            apiVersion: v1
            kind: Secret
            metadata:
              name: openstack
              namespace: garden-dev
            stringData:
              domainName: domain
        "});
        let binding = resource(indoc! {"
            apiVersion: core.gardener.cloud/v1beta1
            kind: SecretBinding
            metadata:
              name: openstack
              namespace: garden-dev
            secretRef:
              name: openstack
        "});

        assert_eq!(secret.kind(), "Secret");
        assert_eq!(secret.object_name(), "garden-dev/openstack");
        assert_eq!(binding.kind(), "SecretBinding");
    }

    #[test]
    fn kinds_must_match_on_update() {
        let secret = resource(indoc! {"
            apiVersion: v1
            kind: Secret
            metadata:
              name: openstack
        "});
        let profile = resource(indoc! {"
            kind: CloudProfile
            metadata:
              name: openstack
            spec:
              type: openstack
        "});

        let result = validator().validate(&secret, Some(&profile), &StaticLookup::default());
        assert!(matches!(result, Err(Error::KindMismatch { .. })));
    }

    #[test]
    fn cloud_profile_requires_provider_config() {
        let profile = resource(indoc! {"
            kind: CloudProfile
            metadata:
              name: openstack
            spec:
              type: openstack
        "});

        let Err(Error::Invalid { errors, .. }) =
            validator().validate(&profile, None, &StaticLookup::default())
        else {
            panic!("expected the profile to be invalid");
        };
        assert_eq!(errors[0].path.to_string(), "spec.providerConfig");
    }

    #[test]
    fn shoots_of_other_providers_are_skipped() {
        let shoot = resource(indoc! {"
            kind: Shoot
            metadata:
              name: aws
              namespace: garden-dev
            spec:
              region: eu-1
              provider:
                type: aws
        "});

        assert!(validator().validate(&shoot, None, &StaticLookup::default()).is_ok());
    }

    #[test]
    fn binding_secret_must_exist_and_be_valid() {
        let binding = resource(indoc! {"
            apiVersion: core.gardener.cloud/v1beta1
            kind: SecretBinding
            metadata:
              name: openstack
              namespace: garden-dev
            secretRef:
              name: openstack
            provider:
              type: openstack
        "});
        let secret = resource(indoc! {"
            apiVersion: v1
            kind: Secret
            metadata:
              name: openstack
              namespace: garden-dev
            stringData:
              domainName: domain
              tenantName: tenant
              username: user
        "});

        assert!(matches!(
            validator().validate(&binding, None, &StaticLookup::default()),
            Err(Error::SecretNotFound { .. })
        ));

        let lookup = StaticLookup::new(vec![secret]);
        let Err(Error::InvalidSecret { errors, .. }) = validator().validate(&binding, None, &lookup)
        else {
            panic!("expected the secret to be invalid");
        };
        assert_eq!(errors[0].path.to_string(), "data[password]");
    }

    #[test]
    fn credentials_binding_must_refer_to_secret() {
        let binding = resource(indoc! {"
            kind: CredentialsBinding
            metadata:
              name: openstack
              namespace: garden-dev
            credentialsRef:
              apiVersion: security.gardener.cloud/v1alpha1
              kind: WorkloadIdentity
              name: openstack
            provider:
              type: openstack
        "});

        let Err(Error::Invalid { errors, .. }) =
            validator().validate(&binding, None, &StaticLookup::default())
        else {
            panic!("expected the binding to be invalid");
        };
        assert_eq!(errors[0].path.to_string(), "credentialsRef.kind");
        assert_eq!(errors[0].supported_values, ["Secret"]);
    }
}
