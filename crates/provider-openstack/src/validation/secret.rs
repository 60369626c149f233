//! Validation of the secrets carrying OpenStack credentials.
//!
//! A secret authenticates either with a username and password or with an application credential.
//! Application credentials are identified by ID, or by name together with the username owning
//! them.

use std::str::Utf8Error;

use k8s_openapi::api::core::v1::Secret;
use url::Url;

use crate::validation::field::{ErrorList, FieldError, FieldPath};

pub const DOMAIN_NAME: &str = "domainName";
pub const TENANT_NAME: &str = "tenantName";
pub const USERNAME: &str = "username";
pub const PASSWORD: &str = "password";
pub const APPLICATION_CREDENTIAL_ID: &str = "applicationCredentialID";
pub const APPLICATION_CREDENTIAL_NAME: &str = "applicationCredentialName";
pub const APPLICATION_CREDENTIAL_SECRET: &str = "applicationCredentialSecret";
pub const AUTH_URL: &str = "authURL";

/// Returns the value of `key`, preferring `stringData` over `data`.
///
/// Fails if the value in `data` is not valid UTF-8.
pub fn secret_value<'a>(secret: &'a Secret, key: &str) -> Result<Option<&'a str>, Utf8Error> {
    if let Some(value) = secret
        .string_data
        .as_ref()
        .and_then(|string_data| string_data.get(key))
    {
        return Ok(Some(value.as_str()));
    }

    secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .map(|value| std::str::from_utf8(&value.0))
        .transpose()
}

/// The non-empty value of `key`, or [`None`] if it is unset, empty or not UTF-8.
fn non_empty_value<'a>(secret: &'a Secret, key: &str) -> Option<&'a str> {
    secret_value(secret, key)
        .ok()
        .flatten()
        .filter(|value| !value.is_empty())
}

fn validate_value(secret: &Secret, key: &str, required: bool, path: &FieldPath) -> ErrorList {
    let key_path = path.key(key);
    let value = match secret_value(secret, key) {
        Ok(value) => value,
        Err(error) => {
            // Raw bytes have no JSON rendering
            return FieldError::invalid(
                &key_path,
                serde_json::Value::Null,
                format!("field {key:?} in secret must be valid UTF-8: {error}"),
            )
            .into();
        }
    };

    match value {
        None if required => {
            FieldError::required(&key_path, format!("missing {key:?} field in secret")).into()
        }
        None => ErrorList::new(),
        Some("") => {
            if required {
                FieldError::required(&key_path, format!("field {key:?} in secret cannot be empty"))
                    .into()
            } else {
                ErrorList::new()
            }
        }
        Some(value) if value.trim() != value => FieldError::invalid(
            &key_path,
            value,
            format!("field {key:?} in secret must not contain leading or trailing whitespace"),
        )
        .into(),
        Some(_) => ErrorList::new(),
    }
}

/// Validates a secret holding OpenStack credentials. `path` points at the secret's data.
pub fn validate_credentials_secret(secret: &Secret, path: &FieldPath) -> ErrorList {
    let mut errors = ErrorList::new();

    for key in [DOMAIN_NAME, TENANT_NAME] {
        errors.extend(validate_value(secret, key, true, path));
    }

    let has_password = non_empty_value(secret, PASSWORD).is_some();
    let has_application_credential = non_empty_value(secret, APPLICATION_CREDENTIAL_SECRET).is_some();

    if has_application_credential {
        if has_password {
            errors.push(FieldError::forbidden(
                &path.key(PASSWORD),
                format!("must not be set together with {APPLICATION_CREDENTIAL_SECRET:?}"),
            ));
        }

        let has_id = non_empty_value(secret, APPLICATION_CREDENTIAL_ID).is_some();
        let has_name = non_empty_value(secret, APPLICATION_CREDENTIAL_NAME).is_some();
        if !has_id && !has_name {
            errors.push(FieldError::required(
                &path.key(APPLICATION_CREDENTIAL_ID),
                format!(
                    "either {APPLICATION_CREDENTIAL_ID:?} or {APPLICATION_CREDENTIAL_NAME:?} must be set for application credentials"
                ),
            ));
        }
        if has_name && !has_id && non_empty_value(secret, USERNAME).is_none() {
            errors.push(FieldError::required(
                &path.key(USERNAME),
                format!("must be set when using {APPLICATION_CREDENTIAL_NAME:?}"),
            ));
        }

        for key in [
            USERNAME,
            APPLICATION_CREDENTIAL_ID,
            APPLICATION_CREDENTIAL_NAME,
            APPLICATION_CREDENTIAL_SECRET,
        ] {
            errors.extend(validate_value(secret, key, false, path));
        }
    } else {
        for key in [USERNAME, PASSWORD] {
            errors.extend(validate_value(secret, key, true, path));
        }
    }

    errors.extend(validate_value(secret, AUTH_URL, false, path));
    if let Some(auth_url) = non_empty_value(secret, AUTH_URL) {
        if let Err(error) = Url::parse(auth_url) {
            errors.push(FieldError::invalid(
                &path.key(AUTH_URL),
                auth_url,
                format!("must be a valid URL: {error}"),
            ));
        }
    }

    errors
}
