use std::{collections::BTreeSet, str::FromStr};

use crate::{
    apis::openstack::{
        CloudProfileConfig, ControlPlaneConfig, InfrastructureConfig, LoadBalancerClass,
        LoadBalancerClassPurpose, LoadBalancerProvider,
    },
    validation::{
        field::{ErrorList, FieldError, FieldPath},
        filter::{self, Query},
    },
};

/// Validates a shoot's control plane config on its own.
pub fn validate_control_plane_config(
    config: &ControlPlaneConfig,
    infrastructure: &InfrastructureConfig,
    path: &FieldPath,
) -> ErrorList {
    let mut errors = ErrorList::new();

    if config.load_balancer_provider.is_empty() {
        errors.push(FieldError::required(
            &path.child("loadBalancerProvider"),
            "must provide the name of a load balancer provider",
        ));
    }

    errors.extend(validate_load_balancer_classes(
        &config.load_balancer_classes,
        &path.child("loadBalancerClasses"),
    ));

    let csi_manila_enabled = config
        .storage
        .as_ref()
        .and_then(|storage| storage.csi_manila.as_ref())
        .is_some_and(|csi_manila| csi_manila.enabled);
    let share_network_enabled = infrastructure
        .networks
        .share_network
        .as_ref()
        .is_some_and(|share_network| share_network.enabled);
    if csi_manila_enabled && !share_network_enabled {
        errors.push(FieldError::forbidden(
            &path.child("storage").child("csiManila").child("enabled"),
            "CSI Manila driver requires the share network to be enabled in the infrastructure config",
        ));
    }

    errors
}

/// Validates a single load balancer class.
pub fn validate_load_balancer_class(class: &LoadBalancerClass, path: &FieldPath) -> ErrorList {
    let mut errors = ErrorList::new();

    if let Some(purpose) = &class.purpose {
        if LoadBalancerClassPurpose::from_str(purpose).is_err() {
            errors.push(FieldError::invalid(
                &path.child("purpose"),
                purpose.as_str(),
                format!(
                    "invalid load balancer class purpose, valid values are {:?}, {:?} and {:?}",
                    LoadBalancerClassPurpose::Default.to_string(),
                    LoadBalancerClassPurpose::Private.to_string(),
                    LoadBalancerClassPurpose::Vpn.to_string(),
                ),
            ));
        }
    }

    let subnet_selectors = [
        &class.floating_subnet_id,
        &class.floating_subnet_name,
        &class.floating_subnet_tags,
    ];
    if subnet_selectors
        .iter()
        .filter(|selector| selector.is_some())
        .count()
        > 1
    {
        errors.push(FieldError::forbidden(
            path,
            "specify only one of floatingSubnetID, floatingSubnetName or floatingSubnetTags",
        ));
    }

    errors
}

/// Validates a list of load balancer classes as a set: names must be unique, and at most one class
/// may act as the default class, as well as the private class.
pub fn validate_load_balancer_classes(classes: &[LoadBalancerClass], path: &FieldPath) -> ErrorList {
    let mut errors = ErrorList::new();
    let mut names = BTreeSet::new();

    for (i, class) in classes.iter().enumerate() {
        let class_path = path.index(i);
        if !names.insert(class.name.as_str()) {
            errors.push(FieldError::duplicate(
                &class_path.child("name"),
                class.name.as_str(),
            ));
        }
        errors.extend(validate_load_balancer_class(class, &class_path));
    }

    for purpose in [LoadBalancerClassPurpose::Default, LoadBalancerClassPurpose::Private] {
        let count = classes
            .iter()
            .filter(|class| class.has_purpose(purpose))
            .count();
        if count > 1 {
            let class_names: Vec<String> = classes.iter().map(|class| class.name.clone()).collect();
            errors.push(FieldError::invalid(
                path,
                class_names,
                format!("not allowed to configure more than one {purpose} load balancer class"),
            ));
        }
    }

    errors
}

/// Checks that the requested load balancer provider is offered in `region`.
///
/// Nothing is checked if the provider didn't change compared to `old_name`.
pub fn validate_load_balancer_provider_constraints(
    providers: &[LoadBalancerProvider],
    region: &str,
    name: &str,
    old_name: Option<&str>,
    path: &FieldPath,
) -> ErrorList {
    if old_name == Some(name) {
        return ErrorList::new();
    }

    match filter::resolve(providers, Query::new(region, None), name, path) {
        Ok(_) => ErrorList::new(),
        Err(error) => error.into(),
    }
}

/// Validates a shoot's control plane config against the constraints of its CloudProfile.
///
/// `floating_pool_name` is the pool of the shoot's infrastructure config. If the shoot declares
/// load balancer classes and the resolved pool restricts them, every class must be one of the
/// pool's classes.
pub fn validate_control_plane_config_against_cloud_profile(
    old_config: Option<&ControlPlaneConfig>,
    config: &ControlPlaneConfig,
    domain: Option<&str>,
    region: &str,
    floating_pool_name: &str,
    profile_config: &CloudProfileConfig,
    path: &FieldPath,
) -> ErrorList {
    let mut errors = validate_load_balancer_provider_constraints(
        &profile_config.constraints.load_balancer_providers,
        region,
        &config.load_balancer_provider,
        old_config.map(|old| old.load_balancer_provider.as_str()),
        &path.child("loadBalancerProvider"),
    );

    let classes_changed =
        old_config.is_none_or(|old| old.load_balancer_classes != config.load_balancer_classes);
    if !classes_changed || config.load_balancer_classes.is_empty() {
        return errors;
    }

    // An unknown pool is reported by the infrastructure validation
    let Ok(floating_pool) = filter::find_floating_pool(
        &profile_config.constraints.floating_pools,
        domain,
        region,
        floating_pool_name,
        &path.child("floatingPoolName"),
    ) else {
        return errors;
    };
    if floating_pool.load_balancer_classes.is_empty() {
        return errors;
    }

    for (i, class) in config.load_balancer_classes.iter().enumerate() {
        if !floating_pool.load_balancer_classes.contains(class) {
            errors.push(FieldError::forbidden(
                &path.child("loadBalancerClasses").index(i),
                format!(
                    "load balancer class {name:?} is not allowed by floating pool {pool:?}",
                    name = class.name,
                    pool = floating_pool.name,
                ),
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{
        apis::openstack::{CsiManila, FloatingPool, Networks, ShareNetwork, Storage},
        validation::field::ErrorKind,
    };

    fn class(name: &str, purpose: Option<&str>) -> LoadBalancerClass {
        LoadBalancerClass {
            name: name.to_owned(),
            purpose: purpose.map(ToOwned::to_owned),
            ..Default::default()
        }
    }

    fn kinds_and_paths(errors: &ErrorList) -> Vec<(ErrorKind, String)> {
        errors
            .iter()
            .map(|error| (error.kind, error.path.to_string()))
            .collect()
    }

    #[test]
    fn competing_subnet_selectors_are_forbidden_once() {
        let class = LoadBalancerClass {
            name: "x".to_owned(),
            floating_subnet_id: Some("id".to_owned()),
            floating_subnet_name: Some("name".to_owned()),
            ..Default::default()
        };

        let errors = validate_load_balancer_class(&class, &FieldPath::new("class"));

        assert_eq!(kinds_and_paths(&errors), [(ErrorKind::Forbidden, "class".to_owned())]);
    }

    #[test]
    fn all_subnet_selectors_are_forbidden_once() {
        let class = LoadBalancerClass {
            name: "x".to_owned(),
            floating_subnet_id: Some("id".to_owned()),
            floating_subnet_name: Some("name".to_owned()),
            floating_subnet_tags: Some("tag".to_owned()),
            ..Default::default()
        };

        assert_eq!(validate_load_balancer_class(&class, &FieldPath::new("class")).len(), 1);
    }

    #[rstest]
    #[case::unset(None, 0)]
    #[case::default(Some("default"), 0)]
    #[case::private(Some("private"), 0)]
    #[case::vpn(Some("vpn"), 0)]
    #[case::unknown(Some("public"), 1)]
    #[case::wrong_case(Some("Default"), 1)]
    fn purposes(#[case] purpose: Option<&str>, #[case] expected_errors: usize) {
        let errors = validate_load_balancer_class(&class("x", purpose), &FieldPath::new("class"));
        assert_eq!(errors.len(), expected_errors);
    }

    #[rstest]
    #[case::empty(vec![], vec![])]
    #[case::distinct(vec![class("a", None), class("b", Some("private"))], vec![])]
    #[case::duplicate_name(
        vec![class("a", None), class("a", None)],
        vec![(ErrorKind::Duplicate, "classes[1].name".to_owned())],
    )]
    #[case::two_defaults_by_name_and_purpose(
        vec![class("default", None), class("b", Some("default"))],
        vec![(ErrorKind::Invalid, "classes".to_owned())],
    )]
    #[case::two_private(
        vec![class("private", None), class("b", Some("private"))],
        vec![(ErrorKind::Invalid, "classes".to_owned())],
    )]
    #[case::multiple_vpn_allowed(vec![class("a", Some("vpn")), class("b", Some("vpn"))], vec![])]
    fn class_sets(
        #[case] classes: Vec<LoadBalancerClass>,
        #[case] expected: Vec<(ErrorKind, String)>,
    ) {
        let errors = validate_load_balancer_classes(&classes, &FieldPath::new("classes"));
        assert_eq!(kinds_and_paths(&errors), expected);
    }

    #[test]
    fn control_plane_config_requires_provider_and_share_network() {
        let config = ControlPlaneConfig {
            storage: Some(Storage {
                csi_manila: Some(CsiManila { enabled: true }),
            }),
            ..Default::default()
        };
        let mut infrastructure = InfrastructureConfig::default();

        let errors =
            validate_control_plane_config(&config, &infrastructure, &FieldPath::new("config"));
        assert_eq!(kinds_and_paths(&errors), [
            (ErrorKind::Required, "config.loadBalancerProvider".to_owned()),
            (ErrorKind::Forbidden, "config.storage.csiManila.enabled".to_owned()),
        ]);

        infrastructure.networks = Networks {
            share_network: Some(ShareNetwork { enabled: true }),
            ..Default::default()
        };
        let errors =
            validate_control_plane_config(&config, &infrastructure, &FieldPath::new("config"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn unchanged_provider_is_not_resolved() {
        let providers = [LoadBalancerProvider {
            name: "ovn".to_owned(),
            region: None,
        }];
        let path = FieldPath::new("loadBalancerProvider");

        assert!(
            validate_load_balancer_provider_constraints(
                &providers,
                "r1",
                "amphora",
                Some("amphora"),
                &path
            )
            .is_empty()
        );

        let errors =
            validate_load_balancer_provider_constraints(&providers, "r1", "amphora", None, &path);
        assert_eq!(kinds_and_paths(&errors), [(
            ErrorKind::NotSupported,
            "loadBalancerProvider".to_owned()
        )]);
    }

    #[test]
    fn classes_must_be_offered_by_floating_pool() {
        let profile_config = CloudProfileConfig {
            constraints: crate::apis::openstack::Constraints {
                floating_pools: vec![FloatingPool {
                    name: "fip".to_owned(),
                    load_balancer_classes: vec![class("internal", Some("private"))],
                    ..Default::default()
                }],
                load_balancer_providers: vec![LoadBalancerProvider {
                    name: "amphora".to_owned(),
                    region: None,
                }],
            },
            ..Default::default()
        };
        let config = ControlPlaneConfig {
            load_balancer_provider: "amphora".to_owned(),
            load_balancer_classes: vec![class("internal", Some("private")), class("other", None)],
            ..Default::default()
        };

        let errors = validate_control_plane_config_against_cloud_profile(
            None,
            &config,
            None,
            "r1",
            "fip",
            &profile_config,
            &FieldPath::new("config"),
        );
        assert_eq!(kinds_and_paths(&errors), [(
            ErrorKind::Forbidden,
            "config.loadBalancerClasses[1]".to_owned()
        )]);

        // Unchanged classes are not checked again
        let errors = validate_control_plane_config_against_cloud_profile(
            Some(&config),
            &config,
            None,
            "r1",
            "fip",
            &profile_config,
            &FieldPath::new("config"),
        );
        assert!(errors.is_empty());
    }
}
