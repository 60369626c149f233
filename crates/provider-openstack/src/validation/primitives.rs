//! Composable validators for single string fields.
//!
//! Each validator takes a value and its [`FieldPath`] and returns every problem it found. They are
//! combined with [`all`], which runs every validator regardless of earlier failures. Validators
//! checking the format of a value ([`regex`], [`uuid`], [`one_of_ignore_case`]) accept the empty
//! string, so that an empty value is only reported once by [`not_empty`].
//!
//! Validators needing compiled state are built once by [`FieldValidators::new`], which is passed
//! down to the validation functions.

use const_format::concatcp;
use regex::Regex;
use snafu::{ResultExt, Snafu};

use crate::validation::field::{ErrorList, FieldError, FieldPath};

/// Names of OpenStack resources (floating pools, subnets, server labels) must not contain braces,
/// brackets or line breaks.
const RESOURCE_NAME_FMT: &str = r"[^{}\[\]\n]+";
const RESOURCE_NAME_REGEX: &str = concatcp!("^", RESOURCE_NAME_FMT, "$");

/// The maximum length of resource names and label values, counted in characters.
pub const RESOURCE_NAME_MAX_LENGTH: usize = 255;

pub const RECLAIM_POLICIES: &[&str] = &["Delete", "Retain"];
pub const VOLUME_BINDING_MODES: &[&str] = &["Immediate", "WaitForFirstConsumer"];

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to compile regex {regex:?}"))]
    CompileRegex { source: regex::Error, regex: String },
}

/// A validator for a string field.
pub type StringValidator = Box<dyn Fn(&str, &FieldPath) -> ErrorList + Send + Sync>;

/// Runs every validator and concatenates their errors.
pub fn all(validators: Vec<StringValidator>) -> StringValidator {
    Box::new(move |value, path| {
        validators
            .iter()
            .flat_map(|validator| validator(value, path))
            .collect()
    })
}

/// Reports an empty value as missing.
pub fn not_empty() -> StringValidator {
    Box::new(|value, path| {
        if value.is_empty() {
            FieldError::required(path, "cannot be empty").into()
        } else {
            ErrorList::new()
        }
    })
}

/// Reports values with more than `max_length` characters.
pub fn max_length(max_length: usize) -> StringValidator {
    Box::new(move |value, path| {
        let length = value.chars().count();
        if length > max_length {
            FieldError::invalid(
                path,
                value,
                format!("must not be more than {max_length} characters, got {length}"),
            )
            .into()
        } else {
            ErrorList::new()
        }
    })
}

/// Reports non-empty values not matching `regex`.
pub fn regex(regex: Regex) -> StringValidator {
    Box::new(move |value, path| {
        if value.is_empty() || regex.is_match(value) {
            ErrorList::new()
        } else {
            FieldError::invalid(
                path,
                value,
                format!("does not match expected regex {}", regex.as_str()),
            )
            .into()
        }
    })
}

/// Reports non-empty values which are not UUIDs.
pub fn uuid() -> StringValidator {
    Box::new(|value, path| {
        if value.is_empty() || ::uuid::Uuid::parse_str(value).is_ok() {
            ErrorList::new()
        } else {
            FieldError::invalid(path, value, "must be a valid UUID").into()
        }
    })
}

/// Reports non-empty values which are not one of `allowed`, ignoring case.
pub fn one_of_ignore_case(allowed: &'static [&'static str]) -> StringValidator {
    Box::new(move |value, path| {
        if value.is_empty() || allowed.iter().any(|a| a.eq_ignore_ascii_case(value)) {
            ErrorList::new()
        } else {
            FieldError::not_supported(path, value, allowed.iter().copied()).into()
        }
    })
}

/// The composed field validators used across the OpenStack validation functions.
pub struct FieldValidators {
    /// A required OpenStack resource name, e.g. a floating pool name.
    pub resource_name: StringValidator,

    /// An optional OpenStack resource name, validated only if set.
    pub optional_resource_name: StringValidator,

    /// An OpenStack resource ID.
    pub resource_id: StringValidator,

    pub machine_label_name: StringValidator,
    pub machine_label_value: StringValidator,

    pub reclaim_policy: StringValidator,
    pub volume_binding_mode: StringValidator,
}

impl FieldValidators {
    pub fn new() -> Result<Self, Error> {
        let resource_name_regex = || {
            Regex::new(RESOURCE_NAME_REGEX).context(CompileRegexSnafu {
                regex: RESOURCE_NAME_REGEX,
            })
        };

        Ok(Self {
            resource_name: all(vec![
                not_empty(),
                regex(resource_name_regex()?),
                max_length(RESOURCE_NAME_MAX_LENGTH),
            ]),
            optional_resource_name: all(vec![
                regex(resource_name_regex()?),
                max_length(RESOURCE_NAME_MAX_LENGTH),
            ]),
            resource_id: all(vec![not_empty(), uuid()]),
            machine_label_name: all(vec![
                not_empty(),
                regex(resource_name_regex()?),
                max_length(RESOURCE_NAME_MAX_LENGTH),
            ]),
            machine_label_value: all(vec![
                not_empty(),
                regex(resource_name_regex()?),
                max_length(RESOURCE_NAME_MAX_LENGTH),
            ]),
            reclaim_policy: one_of_ignore_case(RECLAIM_POLICIES),
            volume_binding_mode: one_of_ignore_case(VOLUME_BINDING_MODES),
        })
    }
}
