use indoc::{formatdoc, indoc};
use provider_openstack::{
    admission::{Error, Resource, StaticLookup, Validator},
    validation::{
        field::{ErrorKind, ErrorList},
        primitives::FieldValidators,
    },
};
use rstest::rstest;
use serde::Deserialize;

const CLOUD_PROFILE: &str = indoc! {"
    apiVersion: core.gardener.cloud/v1beta1
    kind: CloudProfile
    metadata:
      name: openstack
    spec:
      type: openstack
      machineImages:
        - name: gardenlinux
          versions:
            - version: 1.0.0
              architectures: [amd64]
      providerConfig:
        apiVersion: openstack.provider.extensions.gardener.cloud/v1alpha1
        kind: CloudProfileConfig
        keystoneURL: https://keystone.example.com/v3
        constraints:
          floatingPools:
            - name: fip-*
              region: eu-1
              loadBalancerClasses:
                - name: internet
                  purpose: default
          loadBalancerProviders:
            - name: amphora
        serverGroupPolicies: [affinity, soft-anti-affinity]
        machineImages:
          - name: gardenlinux
            versions:
              - version: 1.0.0
                regions:
                  - name: eu-1
                    id: 6e0f1d1c-0b4e-4bfa-9a5e-0c3a1f0f5c11
"};

const CREDENTIALS: &str = indoc! {"
    apiVersion: core.gardener.cloud/v1beta1
    kind: SecretBinding
    metadata:
      name: openstack
      namespace: garden-dev
    secretRef:
      name: openstack
    provider:
      type: openstack
    ---
    apiVersion: v1
    kind: Secret
    metadata:
      name: openstack
      namespace: garden-dev
    stringData:
      domainName: dom-a
      tenantName: tenant
      username: user
      password: secret
"};

fn resources(manifests: &str) -> Vec<Resource> {
    serde_yaml::Deserializer::from_str(manifests)
        .map(|document| Resource::deserialize(document).expect("valid manifest"))
        .collect()
}

fn context() -> StaticLookup {
    resources(&format!("{CLOUD_PROFILE}---\n{CREDENTIALS}"))
        .into_iter()
        .collect()
}

fn validator() -> Validator {
    Validator::new(FieldValidators::new().expect("validators must compile"))
}

fn shoot(floating_pool: &str, zones: &str, policy: &str) -> Resource {
    let manifest = formatdoc! {"
            apiVersion: core.gardener.cloud/v1beta1
            kind: Shoot
            metadata:
              name: dev
              namespace: garden-dev
            spec:
              cloudProfile:
                kind: CloudProfile
                name: openstack
              region: eu-1
              secretBindingName: openstack
              networking:
                nodes: 10.250.0.0/16
              provider:
                type: openstack
                infrastructureConfig:
                  apiVersion: openstack.provider.extensions.gardener.cloud/v1alpha1
                  kind: InfrastructureConfig
                  floatingPoolName: {floating_pool}
                  networks:
                    workers: 10.250.0.0/19
                controlPlaneConfig:
                  apiVersion: openstack.provider.extensions.gardener.cloud/v1alpha1
                  kind: ControlPlaneConfig
                  loadBalancerProvider: amphora
                  loadBalancerClasses:
                    - name: internet
                      purpose: default
                workers:
                  - name: pool-1
                    zones: {zones}
                    providerConfig:
                      apiVersion: openstack.provider.extensions.gardener.cloud/v1alpha1
                      kind: WorkerConfig
                      serverGroup:
                        policy: {policy}
    "};
    serde_yaml::from_str(&manifest).expect("valid shoot")
}

fn field_errors(result: Result<(), Error>) -> ErrorList {
    match result {
        Ok(()) => ErrorList::new(),
        Err(Error::Invalid { errors, .. }) => errors,
        Err(error) => panic!("unexpected error: {error}"),
    }
}

#[test]
fn valid_shoot_is_admitted() {
    let shoot = shoot("fip-1", "[z1]", "affinity");
    validator()
        .validate(&shoot, None, &context())
        .expect("shoot must be valid");
}

#[test]
fn affinity_across_zones_is_forbidden() {
    let shoot = shoot("fip-1", "[z1, z2]", "affinity");

    let errors = field_errors(validator().validate(&shoot, None, &context()));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::Forbidden);
    assert_eq!(
        errors[0].path.to_string(),
        "spec.provider.workers[0].providerConfig.serverGroup.policy"
    );
}

#[rstest]
#[case::pool_outside_profile("other", "spec.provider.infrastructureConfig.floatingPoolName")]
fn unknown_floating_pool_is_not_supported(#[case] floating_pool: &str, #[case] path: &str) {
    let shoot = shoot(floating_pool, "[z1]", "soft-anti-affinity");

    let errors = field_errors(validator().validate(&shoot, None, &context()));
    let error = errors
        .iter()
        .find(|error| error.path.to_string() == path)
        .expect("floating pool must be rejected");
    assert_eq!(error.kind, ErrorKind::NotSupported);
    assert_eq!(error.supported_values, ["fip-*"]);
}

#[test]
fn policy_must_be_offered_by_profile() {
    let shoot = shoot("fip-1", "[z1]", "anti-affinity");

    let errors = field_errors(validator().validate(&shoot, None, &context()));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::Invalid);
    assert_eq!(
        errors[0].path.to_string(),
        "spec.provider.workers[0].providerConfig.serverGroup.policy"
    );
}

#[rstest]
#[case::appended("[z1, z2]", "[z1, z2, z3]", false)]
#[case::unchanged("[z1, z2]", "[z1, z2]", false)]
#[case::removed("[z1, z2]", "[z1]", true)]
#[case::reordered("[z1, z2]", "[z2, z1]", true)]
fn zones_may_only_be_appended(#[case] old: &str, #[case] new: &str, #[case] rejected: bool) {
    let old = shoot("fip-1", old, "soft-anti-affinity");
    let new = shoot("fip-1", new, "soft-anti-affinity");

    let errors = field_errors(validator().validate(&new, Some(&old), &context()));
    assert_eq!(
        errors
            .iter()
            .any(|error| error.path.to_string() == "spec.provider.workers[0].zones"),
        rejected
    );
}

#[test]
fn missing_cloud_profile_is_reported() {
    let shoot = shoot("fip-1", "[z1]", "affinity");
    let lookup: StaticLookup = resources(CREDENTIALS).into_iter().collect();

    assert!(matches!(
        validator().validate(&shoot, None, &lookup),
        Err(Error::CloudProfileNotFound { .. })
    ));
}

#[test]
fn namespaced_profile_cannot_redeclare_parent_versions() {
    let profile = resources(indoc! {"
        apiVersion: core.gardener.cloud/v1beta1
        kind: NamespacedCloudProfile
        metadata:
          name: custom
          namespace: garden-dev
        spec:
          parent:
            kind: CloudProfile
            name: openstack
          machineImages:
            - name: gardenlinux
              versions:
                - version: 1.0.0
          providerConfig:
            apiVersion: openstack.provider.extensions.gardener.cloud/v1alpha1
            kind: CloudProfileConfig
            machineImages:
              - name: gardenlinux
                versions:
                  - version: 1.0.0
                    regions:
                      - name: eu-1
                        id: 0b7c2d1e-5f4a-4a3b-8c9d-1e2f3a4b5c6d
    "})
    .remove(0);

    let errors = field_errors(validator().validate(&profile, None, &context()));
    assert!(errors.iter().any(|error| {
        error.kind == ErrorKind::Forbidden
            && error.path.to_string() == "spec.providerConfig.machineImages[0].versions[0]"
            && error.detail.contains("already defined in the parent CloudProfile")
    }));
}

#[test]
fn namespaced_profile_may_add_versions() {
    let profile = resources(indoc! {"
        apiVersion: core.gardener.cloud/v1beta1
        kind: NamespacedCloudProfile
        metadata:
          name: custom
          namespace: garden-dev
        spec:
          parent:
            kind: CloudProfile
            name: openstack
          machineImages:
            - name: gardenlinux
              versions:
                - version: 1.1.0
                  architectures: [amd64]
          providerConfig:
            apiVersion: openstack.provider.extensions.gardener.cloud/v1alpha1
            kind: CloudProfileConfig
            machineImages:
              - name: gardenlinux
                versions:
                  - version: 1.1.0
                    regions:
                      - name: eu-1
                        id: 0b7c2d1e-5f4a-4a3b-8c9d-1e2f3a4b5c6d
    "})
    .remove(0);

    validator()
        .validate(&profile, None, &context())
        .expect("namespaced profile must be valid");
}

#[test]
fn namespaced_profile_without_provider_config_needs_mapped_images() {
    let profile = resources(indoc! {"
        apiVersion: core.gardener.cloud/v1beta1
        kind: NamespacedCloudProfile
        metadata:
          name: custom
          namespace: garden-dev
        spec:
          parent:
            kind: CloudProfile
            name: openstack
          machineImages:
            - name: ubuntu
              versions:
                - version: '1.0'
    "})
    .remove(0);

    let errors = field_errors(validator().validate(&profile, None, &context()));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::Required);
    assert_eq!(errors[0].path.to_string(), "spec.machineImages[0]");
}

#[test]
fn namespaced_profile_without_provider_config_may_reuse_parent_versions() {
    let profile = resources(indoc! {"
        apiVersion: core.gardener.cloud/v1beta1
        kind: NamespacedCloudProfile
        metadata:
          name: custom
          namespace: garden-dev
        spec:
          parent:
            kind: CloudProfile
            name: openstack
          machineImages:
            - name: gardenlinux
              versions:
                - version: 1.0.0
    "})
    .remove(0);

    validator()
        .validate(&profile, None, &context())
        .expect("versions of the parent need no mapping");
}

#[test]
fn cloud_profile_is_validated() {
    let profile = resources(CLOUD_PROFILE).remove(0);
    validator()
        .validate(&profile, None, &StaticLookup::default())
        .expect("cloud profile must be valid");
}
