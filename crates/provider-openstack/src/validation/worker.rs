use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::Value;

use crate::{
    apis::{
        core::Worker,
        openstack::{CloudProfileConfig, ServerGroup, WorkerConfig},
    },
    validation::{
        field::{ErrorList, FieldError, FieldPath},
        primitives::FieldValidators,
    },
};

/// The server group policy which places all machines of a pool onto the same host.
pub const SERVER_GROUP_POLICY_AFFINITY: &str = "affinity";

fn validate_server_group(
    server_group: &ServerGroup,
    profile_config: &CloudProfileConfig,
    path: &FieldPath,
) -> ErrorList {
    let policy_path = path.child("policy");
    let policy = server_group.policy.as_str();

    if policy.is_empty() {
        return FieldError::invalid(&policy_path, policy, "policy field cannot be empty").into();
    }
    if !profile_config
        .server_group_policies
        .iter()
        .any(|allowed| allowed == policy)
    {
        return FieldError::invalid(
            &policy_path,
            policy,
            "no matching server group policy found in cloudprofile",
        )
        .into();
    }

    ErrorList::new()
}

fn validate_machine_labels(
    worker: &Worker,
    config: &WorkerConfig,
    validators: &FieldValidators,
    path: &FieldPath,
) -> ErrorList {
    let mut errors = ErrorList::new();
    let mut names = BTreeSet::new();

    for (i, label) in config.machine_labels.iter().enumerate() {
        let label_path = path.index(i);
        let name_path = label_path.child("name");
        errors.extend((validators.machine_label_name)(&label.name, &name_path));
        errors.extend((validators.machine_label_value)(
            &label.value,
            &label_path.child("value"),
        ));

        if !names.insert(label.name.as_str()) {
            errors.push(FieldError::duplicate(&name_path, label.name.as_str()));
        } else if worker.labels.contains_key(&label.name) {
            errors.push(FieldError::invalid(
                &name_path,
                label.name.as_str(),
                "label name already defined as pool label",
            ));
        }
    }

    errors
}

/// Validates the decoded provider config of a worker pool. `path` points at the pool's
/// `providerConfig`.
pub fn validate_worker_config(
    worker: &Worker,
    config: &WorkerConfig,
    profile_config: &CloudProfileConfig,
    validators: &FieldValidators,
    path: &FieldPath,
) -> ErrorList {
    let mut errors = ErrorList::new();

    if let Some(server_group) = &config.server_group {
        let server_group_path = path.child("serverGroup");
        errors.extend(validate_server_group(
            server_group,
            profile_config,
            &server_group_path,
        ));

        if server_group.policy == SERVER_GROUP_POLICY_AFFINITY && worker.zones.len() > 1 {
            errors.push(FieldError::forbidden(
                &server_group_path.child("policy"),
                format!(
                    "using {SERVER_GROUP_POLICY_AFFINITY:?} policy with multiple availability zones is not allowed"
                ),
            ));
        }
    }

    errors.extend(validate_machine_labels(
        worker,
        config,
        validators,
        &path.child("machineLabels"),
    ));

    errors
}

/// Decodes the provider config of a worker pool.
pub fn decode_worker_config(provider_config: &Value) -> Result<WorkerConfig, serde_json::Error> {
    WorkerConfig::deserialize(provider_config)
}

/// Validates all worker pools of a shoot. `path` points at `spec.provider.workers`.
pub fn validate_workers(
    workers: &[Worker],
    profile_config: &CloudProfileConfig,
    validators: &FieldValidators,
    path: &FieldPath,
) -> ErrorList {
    let mut errors = ErrorList::new();

    for (i, worker) in workers.iter().enumerate() {
        let worker_path = path.index(i);
        if worker.zones.is_empty() {
            errors.push(FieldError::required(
                &worker_path.child("zones"),
                "at least one zone must be configured",
            ));
        }

        let Some(provider_config) = &worker.provider_config else {
            continue;
        };
        let provider_config_path = worker_path.child("providerConfig");
        match decode_worker_config(provider_config) {
            Ok(config) => errors.extend(validate_worker_config(
                worker,
                &config,
                profile_config,
                validators,
                &provider_config_path,
            )),
            Err(error) => errors.push(FieldError::invalid(
                &provider_config_path,
                provider_config.clone(),
                format!("providerConfig could not be decoded: {error}"),
            )),
        }
    }

    errors
}

/// Validates an update of the worker pools of a shoot. Zones of existing pools may only be
/// appended to.
pub fn validate_workers_update(
    old_workers: &[Worker],
    workers: &[Worker],
    path: &FieldPath,
) -> ErrorList {
    let mut errors = ErrorList::new();

    for (i, worker) in workers.iter().enumerate() {
        let Some(old_worker) = old_workers.iter().find(|old| old.name == worker.name) else {
            continue;
        };
        if !worker.zones.starts_with(&old_worker.zones) {
            errors.push(FieldError::invalid(
                &path.index(i).child("zones"),
                worker.zones.clone(),
                "field is immutable",
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::validation::field::ErrorKind;

    fn profile_config() -> CloudProfileConfig {
        CloudProfileConfig {
            server_group_policies: vec![
                SERVER_GROUP_POLICY_AFFINITY.to_owned(),
                "soft-anti-affinity".to_owned(),
            ],
            ..Default::default()
        }
    }

    fn worker(zones: &[&str], provider_config: Value) -> Worker {
        Worker {
            name: "pool".to_owned(),
            zones: zones.iter().map(|zone| (*zone).to_owned()).collect(),
            labels: [("role".to_owned(), "worker".to_owned())].into(),
            provider_config: Some(provider_config),
        }
    }

    fn validate(workers: &[Worker]) -> Vec<(ErrorKind, String)> {
        let validators = FieldValidators::new().expect("validators must compile");
        validate_workers(
            workers,
            &profile_config(),
            &validators,
            &FieldPath::from_fields(["spec", "provider", "workers"]),
        )
        .iter()
        .map(|error| (error.kind, error.path.to_string()))
        .collect()
    }

    #[test]
    fn affinity_across_zones_is_forbidden() {
        let workers = [worker(
            &["z1", "z2"],
            json!({"serverGroup": {"policy": "affinity"}}),
        )];

        assert_eq!(validate(&workers), [(
            ErrorKind::Forbidden,
            "spec.provider.workers[0].providerConfig.serverGroup.policy".to_owned()
        )]);
    }

    #[rstest]
    #[case::single_zone_affinity(&["z1"], "affinity", vec![])]
    #[case::multi_zone_anti_affinity(&["z1", "z2"], "soft-anti-affinity", vec![])]
    #[case::empty_policy(&["z1"], "", vec![ErrorKind::Invalid])]
    #[case::unknown_policy(&["z1"], "anti-affinity", vec![ErrorKind::Invalid])]
    fn server_group_policies(
        #[case] zones: &[&str],
        #[case] policy: &str,
        #[case] expected: Vec<ErrorKind>,
    ) {
        let workers = [worker(zones, json!({"serverGroup": {"policy": policy}}))];
        let kinds: Vec<ErrorKind> = validate(&workers).into_iter().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, expected);
    }

    #[test]
    fn machine_labels() {
        let workers = [worker(
            &["z1"],
            json!({"machineLabels": [
                {"name": "team", "value": "a"},
                {"name": "team", "value": "b"},
                {"name": "role", "value": "c"},
                {"name": "tier", "value": ""},
            ]}),
        )];

        assert_eq!(validate(&workers), [
            (
                ErrorKind::Duplicate,
                "spec.provider.workers[0].providerConfig.machineLabels[1].name".to_owned()
            ),
            (
                ErrorKind::Invalid,
                "spec.provider.workers[0].providerConfig.machineLabels[2].name".to_owned()
            ),
            (
                ErrorKind::Required,
                "spec.provider.workers[0].providerConfig.machineLabels[3].value".to_owned()
            ),
        ]);
    }

    #[test]
    fn zones_and_decoding() {
        let workers = [
            worker(&[], json!({})),
            worker(&["z1"], json!({"serverGroup": "affinity"})),
        ];

        assert_eq!(validate(&workers), [
            (ErrorKind::Required, "spec.provider.workers[0].zones".to_owned()),
            (ErrorKind::Invalid, "spec.provider.workers[1].providerConfig".to_owned()),
        ]);
    }

    #[test]
    fn zoneless_worker_still_validates_provider_config() {
        let workers = [worker(&[], json!({"serverGroup": {"policy": "anti-affinity"}}))];

        assert_eq!(validate(&workers), [
            (ErrorKind::Required, "spec.provider.workers[0].zones".to_owned()),
            (
                ErrorKind::Invalid,
                "spec.provider.workers[0].providerConfig.serverGroup.policy".to_owned()
            ),
        ]);
    }

    #[rstest]
    #[case::unchanged(&["z1", "z2"], true)]
    #[case::appended(&["z1", "z2", "z3"], true)]
    #[case::removed(&["z1"], false)]
    #[case::reordered(&["z2", "z1"], false)]
    fn zone_updates(#[case] zones: &[&str], #[case] allowed: bool) {
        let old = [worker(&["z1", "z2"], json!({}))];
        let new = [worker(zones, json!({}))];

        let errors = validate_workers_update(&old, &new, &FieldPath::new("workers"));
        assert_eq!(errors.is_empty(), allowed);
    }
}
