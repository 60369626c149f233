//! Resolution of a requested name against a list of scoped rules.
//!
//! Floating pools and load balancer providers are declared in the CloudProfileConfig as rules
//! which may be scoped to a region and/or a (keystone) domain. A rule without a region or domain
//! applies to all of them. Rule names may end in `*` to admit every name starting with the
//! literal prefix.
//!
//! Resolution searches scopes from the most to the least specific one and returns the first
//! match:
//!
//! 1. rules scoped to exactly the requested domain and region,
//! 2. rules scoped to the region only and rules scoped to the domain only. If only one of both
//!    axes has rules, a match on that axis is accepted. If both have rules, the requested name
//!    must be admitted by both of them and no further scope is searched,
//! 3. rules without any scope.
//!
//! If nothing matches, resolution fails with the names of all searched scopes as supported
//! values. Rules marked as `nonConstraining` never take part in the search. They are accepted for
//! every request they apply to, but only if no other rule matched.

use std::collections::BTreeSet;

use tracing::trace;

use crate::{
    apis::openstack::{FloatingPool, LoadBalancerProvider},
    validation::field::{FieldError, FieldPath},
};

/// A rule which applies to a subset of regions and domains.
pub trait ScopedRule {
    fn name(&self) -> &str;
    fn region(&self) -> Option<&str>;

    fn domain(&self) -> Option<&str> {
        None
    }

    fn is_non_constraining(&self) -> bool {
        false
    }
}

impl ScopedRule for FloatingPool {
    fn name(&self) -> &str {
        &self.name
    }

    fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    fn is_non_constraining(&self) -> bool {
        self.non_constraining.unwrap_or_default()
    }
}

impl ScopedRule for LoadBalancerProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

/// How well a rule name matches a requested name. Exact matches rank above every wildcard match,
/// wildcard matches rank by the length of their literal prefix.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum MatchScore {
    Prefix(usize),
    Exact,
}

/// Matches `name` against the rule name `pattern`.
pub fn match_score(pattern: &str, name: &str) -> Option<MatchScore> {
    if pattern == name {
        return Some(MatchScore::Exact);
    }

    pattern
        .strip_suffix('*')
        .filter(|prefix| name.starts_with(prefix))
        .map(|prefix| MatchScore::Prefix(prefix.chars().count()))
}

/// The region and (optional) domain a name is requested for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Query<'q> {
    pub region: &'q str,

    /// The keystone domain of the requesting shoot. Without a domain, only rules not scoped to a
    /// domain apply.
    pub domain: Option<&'q str>,
}

impl<'q> Query<'q> {
    pub fn new(region: &'q str, domain: Option<&'q str>) -> Self {
        Self { region, domain }
    }

    fn applies_to(&self, rule: &impl ScopedRule) -> bool {
        rule.region().is_none_or(|region| region == self.region)
            && rule.domain().is_none_or(|domain| Some(domain) == self.domain)
    }
}

/// Rules scoped to exactly this domain and region.
#[derive(Clone, Copy, Debug)]
struct Scope<'q> {
    domain: Option<&'q str>,
    region: Option<&'q str>,
}

impl Scope<'_> {
    const GLOBAL: Self = Self {
        domain: None,
        region: None,
    };

    fn includes(&self, rule: &impl ScopedRule) -> bool {
        rule.domain() == self.domain && rule.region() == self.region
    }
}

fn constraining_rules<'a, R: ScopedRule>(
    rules: &'a [R],
    scope: Scope<'_>,
) -> impl Iterator<Item = &'a R> {
    rules
        .iter()
        .filter(move |rule| !rule.is_non_constraining() && scope.includes(*rule))
}

/// The best match among a set of rules, and the names of all of them.
struct Search<'a, R> {
    hit: Option<(&'a R, MatchScore)>,
    valid_values: Vec<&'a str>,
}

impl<'a, R: ScopedRule> Search<'a, R> {
    fn run(rules: impl IntoIterator<Item = &'a R>, name: &str) -> Self {
        let mut search = Self {
            hit: None,
            valid_values: Vec::new(),
        };

        for rule in rules {
            search.valid_values.push(rule.name());

            let Some(score) = match_score(rule.name(), name) else {
                continue;
            };
            // Earlier declarations win ties
            if search.hit.is_none_or(|(_, best)| score > best) {
                search.hit = Some((rule, score));
            }
        }

        search
    }

    fn rule(&self) -> Option<&'a R> {
        self.hit.map(|(rule, _)| rule)
    }
}

/// Searches the rules without any scope, after `searched` produced no match.
fn resolve_globally<'a, R: ScopedRule>(
    rules: &'a [R],
    name: &str,
    mut searched: Vec<&'a str>,
) -> Result<&'a R, Vec<&'a str>> {
    trace!("resolving in global scope");
    let global = Search::run(constraining_rules(rules, Scope::GLOBAL), name);
    if let Some(rule) = global.rule() {
        return Ok(rule);
    }

    searched.extend(global.valid_values);
    Err(searched)
}

/// Resolves `name` against rules scoped by region only.
fn resolve_by_region<'a, R: ScopedRule>(
    rules: &'a [R],
    region: &str,
    name: &str,
) -> Result<&'a R, Vec<&'a str>> {
    let regional = Search::run(
        constraining_rules(rules, Scope {
            domain: None,
            region: Some(region),
        }),
        name,
    );
    if let Some(rule) = regional.rule() {
        trace!(region, "resolved in region scope");
        return Ok(rule);
    }

    resolve_globally(rules, name, regional.valid_values)
}

/// Resolves `name` against rules scoped by domain and region.
fn resolve_by_domain_and_region<'a, R: ScopedRule>(
    rules: &'a [R],
    domain: &str,
    region: &str,
    name: &str,
) -> Result<&'a R, Vec<&'a str>> {
    let exact = Search::run(
        constraining_rules(rules, Scope {
            domain: Some(domain),
            region: Some(region),
        }),
        name,
    );
    if let Some(rule) = exact.rule() {
        trace!(domain, region, "resolved in domain and region scope");
        return Ok(rule);
    }
    let mut searched = exact.valid_values;

    let region_scope = Scope {
        domain: None,
        region: Some(region),
    };
    let domain_scope = Scope {
        domain: Some(domain),
        region: None,
    };
    let by_region = Search::run(constraining_rules(rules, region_scope), name);
    let by_domain = Search::run(constraining_rules(rules, domain_scope), name);

    match (
        by_region.valid_values.is_empty(),
        by_domain.valid_values.is_empty(),
    ) {
        (true, true) => resolve_globally(rules, name, searched),
        (false, true) => {
            if let Some(rule) = by_region.rule() {
                trace!(region, "resolved in region scope");
                return Ok(rule);
            }
            searched.extend(by_region.valid_values);
            resolve_globally(rules, name, searched)
        }
        (true, false) => {
            if let Some(rule) = by_domain.rule() {
                trace!(domain, "resolved in domain scope");
                return Ok(rule);
            }
            searched.extend(by_domain.valid_values);
            resolve_globally(rules, name, searched)
        }
        (false, false) => {
            if let (Some(regional), Some(domained)) = (by_region.rule(), by_domain.rule()) {
                if regional.name() == domained.name() {
                    return Ok(regional);
                }
            }

            // Both axes constrain the request, only names admitted by both remain valid
            let region_values: BTreeSet<&str> = by_region.valid_values.into_iter().collect();
            let intersection: BTreeSet<&str> = by_domain
                .valid_values
                .into_iter()
                .filter(|value| region_values.contains(value))
                .collect();
            trace!(?intersection, "resolving in intersection of region and domain scope");

            let retry = Search::run(
                rules.iter().filter(|rule| {
                    !rule.is_non_constraining()
                        && (region_scope.includes(*rule) || domain_scope.includes(*rule))
                        && intersection.contains(rule.name())
                }),
                name,
            );
            if let Some(rule) = retry.rule() {
                return Ok(rule);
            }

            searched.extend(intersection);
            Err(searched)
        }
    }
}

/// Finds the rule admitting `name` for `query`.
///
/// Fails with a [`NotSupported`](crate::validation::field::ErrorKind::NotSupported) error at
/// `path` listing every name which would have been accepted.
pub fn resolve<'a, R: ScopedRule>(
    rules: &'a [R],
    query: Query<'_>,
    name: &str,
    path: &FieldPath,
) -> Result<&'a R, FieldError> {
    let constrained = match query.domain {
        Some(domain) => resolve_by_domain_and_region(rules, domain, query.region, name),
        None => resolve_by_region(rules, query.region, name),
    };
    let valid_values = match constrained {
        Ok(rule) => return Ok(rule),
        Err(valid_values) => valid_values,
    };

    let additional = Search::run(
        rules
            .iter()
            .filter(|rule| rule.is_non_constraining() && query.applies_to(*rule)),
        name,
    );
    if let Some(rule) = additional.rule() {
        trace!(rule = rule.name(), "resolved to non-constraining rule");
        return Ok(rule);
    }

    Err(FieldError::not_supported(
        path,
        name,
        valid_values.into_iter().chain(additional.valid_values),
    ))
}

/// Finds the floating pool a shoot in `region` (and `domain`, if known) may use under `name`.
pub fn find_floating_pool<'a>(
    floating_pools: &'a [FloatingPool],
    domain: Option<&str>,
    region: &str,
    name: &str,
    path: &FieldPath,
) -> Result<&'a FloatingPool, FieldError> {
    resolve(floating_pools, Query::new(region, domain), name, path)
}
