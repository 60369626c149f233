//! Validation of OpenStack provider configuration.
//!
//! All validators are pure functions returning every problem they find as an [`ErrorList`]
//! instead of stopping at the first one, so that a single admission response can report all of
//! them.
//!
//! [`ErrorList`]: field::ErrorList

pub mod cloudprofile;
pub mod controlplane;
pub mod field;
pub mod filter;
pub mod infrastructure;
pub mod namespaced_cloudprofile;
pub mod primitives;
pub mod secret;
pub mod shoot;
pub mod worker;
