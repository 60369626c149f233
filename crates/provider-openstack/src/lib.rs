//! Validation of the OpenStack provider configuration embedded in Gardener resources.
//!
//! - [`apis`] contains the resource and provider configuration types.
//! - [`validation`] contains the validators, each returning every problem it found.
//! - [`admission`] dispatches admitted resources to the validators and fetches referenced
//!   objects.

pub mod admission;
pub mod apis;
pub mod validation;
