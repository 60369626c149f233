use std::{
    fmt::Display,
    net::{AddrParseError, IpAddr},
    num::ParseIntError,
    str::FromStr,
};

use serde_json::Value;
use snafu::{OptionExt, ResultExt, Snafu, ensure};

use crate::{
    apis::openstack::{CloudProfileConfig, InfrastructureConfig},
    validation::{
        field::{ErrorList, FieldError, FieldPath},
        filter,
        primitives::FieldValidators,
    },
};

#[derive(Debug, Eq, PartialEq, Snafu)]
pub enum CidrError {
    #[snafu(display("missing prefix length, expected <address>/<prefix length>"))]
    MissingPrefixLength,

    #[snafu(display("failed to parse address"))]
    ParseAddress { source: AddrParseError },

    #[snafu(display("failed to parse prefix length"))]
    ParsePrefixLength { source: ParseIntError },

    #[snafu(display("prefix length {prefix_length} exceeds {max}"))]
    PrefixLengthTooLong { prefix_length: u8, max: u8 },
}

/// An IP network in CIDR notation, e.g. `10.250.0.0/16`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Cidr {
    address: IpAddr,
    prefix_length: u8,
}

impl FromStr for Cidr {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, prefix_length) = s.split_once('/').context(MissingPrefixLengthSnafu)?;
        let address: IpAddr = address.parse().context(ParseAddressSnafu)?;
        let prefix_length: u8 = prefix_length.parse().context(ParsePrefixLengthSnafu)?;

        let max = match address {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        ensure!(prefix_length <= max, PrefixLengthTooLongSnafu { prefix_length, max });

        Ok(Self {
            address,
            prefix_length,
        })
    }
}

impl Display for Cidr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_length)
    }
}

impl Cidr {
    /// The address as a number, and the number of bits of its family.
    fn bits(address: IpAddr) -> (u128, u8) {
        match address {
            IpAddr::V4(address) => (u128::from(u32::from(address)), 32),
            IpAddr::V6(address) => (u128::from(address), 128),
        }
    }

    /// The address with all bits after `prefix_length` cleared.
    fn network_bits(address: IpAddr, prefix_length: u8) -> u128 {
        let (bits, width) = Self::bits(address);
        let host_bits = u32::from(width - prefix_length);
        bits & u128::MAX.checked_shl(host_bits).unwrap_or(0)
    }

    /// Whether no host bits are set.
    pub fn is_canonical(&self) -> bool {
        Self::network_bits(self.address, self.prefix_length) == Self::bits(self.address).0
    }

    /// Whether every address of `other` is also part of this network.
    pub fn contains(&self, other: &Cidr) -> bool {
        self.address.is_ipv4() == other.address.is_ipv4()
            && self.prefix_length <= other.prefix_length
            && Self::network_bits(self.address, self.prefix_length)
                == Self::network_bits(other.address, self.prefix_length)
    }
}

/// Validates a shoot's infrastructure config on its own.
///
/// If the shoot's nodes CIDR is known, the workers network must be part of it.
pub fn validate_infrastructure_config(
    config: &InfrastructureConfig,
    nodes_cidr: Option<&str>,
    validators: &FieldValidators,
    path: &FieldPath,
) -> ErrorList {
    let mut errors = ErrorList::new();

    errors.extend((validators.resource_name)(
        &config.floating_pool_name,
        &path.child("floatingPoolName"),
    ));

    let networks = &config.networks;
    let networks_path = path.child("networks");
    let router = networks.router.as_ref();

    if let Some(subnet_name) = &config.floating_pool_subnet_name {
        let subnet_name_path = path.child("floatingPoolSubnetName");
        errors.extend((validators.optional_resource_name)(subnet_name, &subnet_name_path));
        if router.is_some_and(|router| !router.id.is_empty()) {
            errors.push(FieldError::forbidden(
                &subnet_name_path,
                "cannot select a floating pool subnet when using an existing router",
            ));
        }
    }

    if let Some(router) = router {
        errors.extend((validators.resource_id)(
            &router.id,
            &networks_path.child("router").child("id"),
        ));
    }

    if let Some(network_id) = &networks.id {
        errors.extend((validators.resource_id)(network_id, &networks_path.child("id")));
    }
    if let Some(subnet_id) = &networks.subnet_id {
        let subnet_id_path = networks_path.child("subnetId");
        errors.extend((validators.resource_id)(subnet_id, &subnet_id_path));
        if networks.id.is_none() {
            errors.push(FieldError::invalid(
                &subnet_id_path,
                subnet_id.as_str(),
                "if subnetId is given, the network id must also be given",
            ));
        }
    }

    // The legacy `worker` field is used if `workers` isn't set
    let (workers, workers_path) = match (&networks.workers, &networks.worker) {
        (Some(workers), _) => (workers.as_str(), networks_path.child("workers")),
        (None, Some(worker)) => (worker.as_str(), networks_path.child("worker")),
        (None, None) => ("", networks_path.child("workers")),
    };
    if workers.is_empty() {
        errors.push(FieldError::required(
            &workers_path,
            "must specify the network range for the worker nodes",
        ));
        return errors;
    }

    let workers_cidr = match workers.parse::<Cidr>() {
        Ok(cidr) => cidr,
        Err(error) => {
            errors.push(FieldError::invalid(
                &workers_path,
                workers,
                format!("invalid CIDR: {error}"),
            ));
            return errors;
        }
    };
    if !workers_cidr.is_canonical() {
        errors.push(FieldError::invalid(
            &workers_path,
            workers,
            "must be a canonical CIDR without host bits set",
        ));
    }

    if let Some(Ok(nodes_cidr)) = nodes_cidr.map(str::parse::<Cidr>) {
        if !nodes_cidr.contains(&workers_cidr) {
            errors.push(FieldError::invalid(
                &workers_path,
                workers,
                format!("must be a subset of the shoot's nodes network {nodes_cidr}"),
            ));
        }
    }

    errors
}

/// Validates an update of a shoot's infrastructure config. The networks can't be changed.
pub fn validate_infrastructure_config_update(
    old_config: &InfrastructureConfig,
    config: &InfrastructureConfig,
    path: &FieldPath,
) -> ErrorList {
    if old_config.networks == config.networks {
        return ErrorList::new();
    }

    let value = serde_json::to_value(&config.networks).unwrap_or(Value::Null);
    FieldError::invalid(&path.child("networks"), value, "field is immutable").into()
}

/// Validates a shoot's infrastructure config against the constraints of its CloudProfile.
///
/// The floating pool is only resolved if it is new or changed, so that shoots keep working after
/// a pool has been removed from the profile.
pub fn validate_infrastructure_config_against_cloud_profile(
    old_config: Option<&InfrastructureConfig>,
    config: &InfrastructureConfig,
    domain: Option<&str>,
    region: &str,
    profile_config: &CloudProfileConfig,
    path: &FieldPath,
) -> ErrorList {
    let unchanged =
        old_config.is_some_and(|old| old.floating_pool_name == config.floating_pool_name);
    if unchanged {
        return ErrorList::new();
    }

    match filter::find_floating_pool(
        &profile_config.constraints.floating_pools,
        domain,
        region,
        &config.floating_pool_name,
        &path.child("floatingPoolName"),
    ) {
        Ok(_) => ErrorList::new(),
        Err(error) => error.into(),
    }
}
