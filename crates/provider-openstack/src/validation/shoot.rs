use crate::{
    apis::core::Networking,
    validation::field::{ErrorList, FieldError, FieldPath},
};

/// Validates the networking section of an OpenStack shoot. OpenStack shoots need a nodes network
/// to place the worker subnet in.
pub fn validate_networking(networking: Option<&Networking>, path: &FieldPath) -> ErrorList {
    let has_nodes = networking
        .and_then(|networking| networking.nodes.as_deref())
        .is_some_and(|nodes| !nodes.is_empty());

    if has_nodes {
        ErrorList::new()
    } else {
        FieldError::required(
            &path.child("nodes"),
            "a nodes CIDR must be provided for OpenStack shoots",
        )
        .into()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::missing_networking(None, false)]
    #[case::missing_nodes(Some(Networking::default()), false)]
    #[case::empty_nodes(Some(Networking { nodes: Some(String::new()), ..Default::default() }), false)]
    #[case::nodes(Some(Networking { nodes: Some("10.250.0.0/16".to_owned()), ..Default::default() }), true)]
    fn nodes_are_required(#[case] networking: Option<Networking>, #[case] valid: bool) {
        let errors = validate_networking(networking.as_ref(), &FieldPath::new("networking"));
        assert_eq!(errors.is_empty(), valid);
    }
}
