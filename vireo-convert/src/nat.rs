//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! NAT rule composition.
//!
//! An unordered vendor rule set becomes one deterministic transformation
//! per traffic direction. Rules rewriting the same IP field are mutually
//! exclusive alternatives in a priority chain; rules rewriting different
//! fields compose sequentially, so one packet can have both addresses
//! rewritten by two independently matched rules.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use ipnetwork::Ipv4Network;

use vireo_model::diag::{Diagnostics, StructureKind, StructureUsage};
use vireo_model::ip::Ipv4NetworkExt;
use vireo_model::nat::{FlowField, FlowMatch, FlowRewrite, Transformation};
use vireo_vendor::config::VendorConfig;
use vireo_vendor::nat::{NatAddrSpec, NatMechanism, NatRule, NatRuleKind};

use crate::debug::Debug;
use crate::refs::References;

// Traffic direction a composed transformation applies to. `Outgoing` is
// inside-to-outside traffic, `Incoming` the return path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NatDirection {
    Outgoing,
    Incoming,
}

// One surviving rule, classified and ready to chain.
struct Candidate {
    guard: FlowMatch,
    step: FlowRewrite,
    dynamic: bool,
    // Widened match-side prefix length; longest wins within the statics.
    prefix_len: u8,
    order: u32,
}

// ===== impl NatDirection =====

impl NatDirection {
    pub const fn values() -> [NatDirection; 2] {
        [NatDirection::Outgoing, NatDirection::Incoming]
    }
}

impl std::fmt::Display for NatDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NatDirection::Outgoing => write!(f, "outgoing"),
            NatDirection::Incoming => write!(f, "incoming"),
        }
    }
}

// ===== global functions =====

// Composes every applicable NAT rule into one transformation for the given
// direction. Returns None when no rule survives.
pub fn compose(
    cfg: &VendorConfig,
    direction: NatDirection,
    refs: &mut References,
    diags: &mut Diagnostics,
) -> Option<Transformation> {
    let mut groups: BTreeMap<FlowField, Vec<Candidate>> = BTreeMap::new();
    for rule in &cfg.nat_rules {
        if let Some(candidate) = classify(rule, direction, cfg, refs, diags) {
            groups
                .entry(rewritten_field(rule.kind, direction))
                .or_default()
                .push(candidate);
        }
    }

    // Within one field group, statics strictly precede dynamics; statics
    // order longest-prefix-first, dynamics keep their declared order.
    let mut chains = BTreeMap::new();
    for (field, mut group) in groups {
        group.sort_by_key(|candidate| {
            (candidate.dynamic, Reverse(candidate.prefix_len), candidate.order)
        });
        let rules = group.len();
        let chain = group
            .into_iter()
            .map(|candidate| {
                Transformation::step(candidate.guard, vec![candidate.step])
            })
            .reduce(|chain, next| chain.or_else(next));
        Debug::NatComposed(&format!("{direction}/{field:?}"), rules).log();
        chains.insert(field, chain);
    }

    // Source and destination chains are independent stages, never
    // alternatives.
    Transformation::sequence(
        chains.remove(&FlowField::Source).flatten(),
        chains.remove(&FlowField::Destination).flatten(),
    )
}

// ===== helper functions =====

// Direction in which a rule's vendor semantics are defined.
fn forward_direction(kind: NatRuleKind) -> NatDirection {
    match kind {
        NatRuleKind::SourceInside | NatRuleKind::DestinationInside => {
            NatDirection::Outgoing
        }
        NatRuleKind::SourceOutside => NatDirection::Incoming,
    }
}

// IP field a rule visibly rewrites, which depends on the traffic direction:
// a source-inside rule changes the source of outgoing packets but the
// destination of their replies.
fn rewritten_field(kind: NatRuleKind, direction: NatDirection) -> FlowField {
    match (kind, direction) {
        (NatRuleKind::SourceInside, NatDirection::Outgoing) => {
            FlowField::Source
        }
        (NatRuleKind::SourceInside, NatDirection::Incoming) => {
            FlowField::Destination
        }
        (
            NatRuleKind::SourceOutside | NatRuleKind::DestinationInside,
            NatDirection::Outgoing,
        ) => FlowField::Destination,
        (
            NatRuleKind::SourceOutside | NatRuleKind::DestinationInside,
            NatDirection::Incoming,
        ) => FlowField::Source,
    }
}

fn classify(
    rule: &NatRule,
    direction: NatDirection,
    cfg: &VendorConfig,
    refs: &mut References,
    diags: &mut Diagnostics,
) -> Option<Candidate> {
    let field = rewritten_field(rule.kind, direction);
    match &rule.mechanism {
        NatMechanism::Dynamic { acl, pool } => {
            refs.note(StructureKind::AccessList, &acl.name);
            refs.note(StructureKind::NatPool, &pool.name);
            if !cfg.access_lists.contains_key(&acl.name) {
                diags.undefined(
                    StructureKind::AccessList,
                    &acl.name,
                    StructureUsage::NatDynamicAcl,
                    acl.line,
                );
                return None;
            }
            let Some(addresses) = cfg.nat_pools.get(&pool.name) else {
                diags.undefined(
                    StructureKind::NatPool,
                    &pool.name,
                    StructureUsage::NatDynamicPool,
                    pool.line,
                );
                return None;
            };
            // Dynamic translation state only exists for flows the rule
            // created, so it never acts on the return path.
            if forward_direction(rule.kind) != direction {
                diags.advisory(format!(
                    "dynamic nat rule using pool {} cannot translate {} traffic",
                    pool.name, direction,
                ));
                return None;
            }
            Some(Candidate {
                guard: FlowMatch::PermittedByAcl(acl.name.clone()),
                step: FlowRewrite::AssignFromPool {
                    field,
                    first: addresses.first,
                    last: addresses.last,
                },
                dynamic: true,
                prefix_len: 0,
                order: rule.order,
            })
        }
        NatMechanism::Static { from, to } => {
            let from = resolve_spec(from, cfg, refs, diags)?;
            let to = resolve_spec(to, cfg, refs, diags)?;
            let (from, to) = match (from, to) {
                (Some(from), Some(to)) => (from, to),
                // A wildcard on either side leaves the mapping
                // underspecified; refuse to guess.
                _ => {
                    diags.advisory(
                        "static nat rule with ambiguous address \
                         specification skipped",
                    );
                    return None;
                }
            };

            // Differing prefix lengths are widened to the longer one, so
            // only the lowest addresses of the wider range map back. This
            // mirrors the vendor's asymmetric behavior.
            let widened = from.prefix().max(to.prefix());
            let (match_net, translate_net) =
                if forward_direction(rule.kind) == direction {
                    (from, to)
                } else {
                    (to, from)
                };
            Some(Candidate {
                guard: FlowMatch::FieldInNetwork {
                    field,
                    net: match_net.with_prefix(widened),
                },
                step: FlowRewrite::ShiftIntoNetwork {
                    field,
                    net: translate_net.with_prefix(widened),
                },
                dynamic: false,
                prefix_len: widened,
                order: rule.order,
            })
        }
    }
}

// Resolves one side of a static rule to a concrete network. `None` inside
// the `Some` means a wildcard; `None` outside means the rule must be
// dropped (dangling object, already reported).
fn resolve_spec(
    spec: &NatAddrSpec,
    cfg: &VendorConfig,
    refs: &mut References,
    diags: &mut Diagnostics,
) -> Option<Option<Ipv4Network>> {
    match spec {
        NatAddrSpec::Any => Some(None),
        NatAddrSpec::Network(net) => Some(Some(*net)),
        NatAddrSpec::Object(object) => {
            refs.note(StructureKind::AddressObject, &object.name);
            match cfg.address_objects.get(&object.name) {
                Some(net) => Some(Some(*net)),
                None => {
                    diags.undefined(
                        StructureKind::AddressObject,
                        &object.name,
                        StructureUsage::NatStaticObject,
                        object.line,
                    );
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use const_addrs::{ip4, net4};
    use vireo_model::nat::Flow;
    use vireo_vendor::acl::{AccessList, AccessListLine};
    use vireo_vendor::config::NamedRef;
    use vireo_vendor::nat::NatPool;
    use vireo_model::filter::LineAction;

    use super::*;

    fn named(name: &str) -> NamedRef {
        NamedRef::new(name.to_owned(), None)
    }

    fn cfg_with_pool() -> VendorConfig {
        let mut cfg = VendorConfig::default();
        let mut acl = AccessList::new("INSIDE");
        acl.lines.push(AccessListLine::new(
            LineAction::Permit,
            net4!("10.0.0.0/8"),
            None,
        ));
        cfg.access_lists.insert("INSIDE".to_owned(), acl);
        cfg.nat_pools.insert(
            "POOL".to_owned(),
            NatPool::new(ip4!("203.0.113.1"), ip4!("203.0.113.14")),
        );
        cfg
    }

    fn static_rule(
        kind: NatRuleKind,
        from: &str,
        to: &str,
        order: u32,
    ) -> NatRule {
        NatRule::new(
            kind,
            NatMechanism::Static {
                from: NatAddrSpec::Network(from.parse().unwrap()),
                to: NatAddrSpec::Network(to.parse().unwrap()),
            },
            order,
            None,
        )
    }

    fn dynamic_rule(kind: NatRuleKind, order: u32) -> NatRule {
        NatRule::new(
            kind,
            NatMechanism::Dynamic {
                acl: named("INSIDE"),
                pool: named("POOL"),
            },
            order,
            None,
        )
    }

    fn compose_dir(
        cfg: &VendorConfig,
        direction: NatDirection,
        diags: &mut Diagnostics,
    ) -> Option<Transformation> {
        let mut refs = References::new();
        compose(cfg, direction, &mut refs, diags)
    }

    #[test]
    fn test_static_precedes_dynamic() {
        let mut cfg = cfg_with_pool();
        // Declared order puts the dynamics first; composition must not
        // care.
        cfg.nat_rules.push(dynamic_rule(NatRuleKind::SourceInside, 1));
        cfg.nat_rules.push(dynamic_rule(NatRuleKind::SourceInside, 2));
        cfg.nat_rules.push(static_rule(
            NatRuleKind::SourceInside,
            "10.0.0.0/24",
            "198.51.100.0/24",
            3,
        ));

        let mut diags = Diagnostics::new();
        let composed =
            compose_dir(&cfg, NatDirection::Outgoing, &mut diags).unwrap();
        assert!(matches!(
            composed.guard,
            FlowMatch::FieldInNetwork { field: FlowField::Source, .. }
        ));

        // The static rule wins for overlapping traffic.
        let mut acls = BTreeMap::new();
        acls.insert(
            "INSIDE".to_owned(),
            crate::filter::convert_flow_acl(&cfg.access_lists["INSIDE"]),
        );
        let flow = Flow::new(ip4!("10.0.0.7"), ip4!("8.8.8.8"));
        assert_eq!(composed.apply(&flow, &acls).src_ip, ip4!("198.51.100.7"));
        // Traffic outside the static network falls through to the pool.
        let flow = Flow::new(ip4!("10.9.9.9"), ip4!("8.8.8.8"));
        assert_eq!(composed.apply(&flow, &acls).src_ip, ip4!("203.0.113.1"));
    }

    #[test]
    fn test_longest_prefix_static_first() {
        let mut cfg = VendorConfig::default();
        cfg.nat_rules.push(static_rule(
            NatRuleKind::SourceInside,
            "10.0.0.0/16",
            "198.51.0.0/16",
            1,
        ));
        cfg.nat_rules.push(static_rule(
            NatRuleKind::SourceInside,
            "10.0.0.0/24",
            "203.0.113.0/24",
            2,
        ));

        let mut diags = Diagnostics::new();
        let composed =
            compose_dir(&cfg, NatDirection::Outgoing, &mut diags).unwrap();
        let flow = Flow::new(ip4!("10.0.0.1"), ip4!("8.8.8.8"));
        assert_eq!(
            composed.apply(&flow, &BTreeMap::new()).src_ip,
            ip4!("203.0.113.1")
        );
    }

    #[test]
    fn test_source_and_destination_both_rewritten() {
        let mut cfg = VendorConfig::default();
        cfg.nat_rules.push(static_rule(
            NatRuleKind::SourceInside,
            "10.0.0.0/24",
            "198.51.100.0/24",
            1,
        ));
        cfg.nat_rules.push(static_rule(
            NatRuleKind::DestinationInside,
            "203.0.113.0/24",
            "172.16.0.0/24",
            2,
        ));

        let mut diags = Diagnostics::new();
        let outgoing =
            compose_dir(&cfg, NatDirection::Outgoing, &mut diags).unwrap();
        let flow = Flow::new(ip4!("10.0.0.5"), ip4!("203.0.113.9"));
        let out = outgoing.apply(&flow, &BTreeMap::new());
        assert_eq!(out.src_ip, ip4!("198.51.100.5"));
        assert_eq!(out.dst_ip, ip4!("172.16.0.9"));

        // The incoming composition reverses both fields.
        let incoming =
            compose_dir(&cfg, NatDirection::Incoming, &mut diags).unwrap();
        let reply = Flow::new(ip4!("172.16.0.9"), ip4!("198.51.100.5"));
        let back = incoming.apply(&reply, &BTreeMap::new());
        assert_eq!(back.src_ip, ip4!("203.0.113.9"));
        assert_eq!(back.dst_ip, ip4!("10.0.0.5"));
    }

    #[test]
    fn test_dynamic_reverse_direction_dropped() {
        let mut cfg = cfg_with_pool();
        cfg.nat_rules.push(dynamic_rule(NatRuleKind::SourceInside, 1));

        let mut diags = Diagnostics::new();
        assert!(
            compose_dir(&cfg, NatDirection::Incoming, &mut diags).is_none()
        );
        assert_eq!(diags.advisories().len(), 1);
    }

    #[test]
    fn test_ambiguous_static_dropped() {
        let mut cfg = VendorConfig::default();
        cfg.nat_rules.push(NatRule::new(
            NatRuleKind::SourceInside,
            NatMechanism::Static {
                from: NatAddrSpec::Any,
                to: NatAddrSpec::Network(net4!("198.51.100.0/24")),
            },
            1,
            None,
        ));

        let mut diags = Diagnostics::new();
        assert!(
            compose_dir(&cfg, NatDirection::Outgoing, &mut diags).is_none()
        );
        assert_eq!(diags.advisories().len(), 1);
    }

    #[test]
    fn test_dangling_pool_dropped_with_diagnostic() {
        let mut cfg = cfg_with_pool();
        cfg.nat_pools.clear();
        cfg.nat_rules.push(dynamic_rule(NatRuleKind::SourceInside, 1));

        let mut diags = Diagnostics::new();
        assert!(
            compose_dir(&cfg, NatDirection::Outgoing, &mut diags).is_none()
        );
        assert!(diags.has_undefined(StructureKind::NatPool, "POOL"));
    }

    #[test]
    fn test_widened_prefix_mapping() {
        // /16 to /24: both sides widen to /24, so only the first /24 of
        // the /16 maps bidirectionally.
        let mut cfg = VendorConfig::default();
        cfg.nat_rules.push(static_rule(
            NatRuleKind::SourceInside,
            "10.0.0.0/16",
            "198.51.100.0/24",
            1,
        ));

        let mut diags = Diagnostics::new();
        let composed =
            compose_dir(&cfg, NatDirection::Outgoing, &mut diags).unwrap();
        let inside = Flow::new(ip4!("10.0.0.9"), ip4!("8.8.8.8"));
        assert_eq!(
            composed.apply(&inside, &BTreeMap::new()).src_ip,
            ip4!("198.51.100.9")
        );
        // Addresses beyond the widened range no longer match.
        let outside = Flow::new(ip4!("10.0.5.9"), ip4!("8.8.8.8"));
        assert_eq!(
            composed.apply(&outside, &BTreeMap::new()).src_ip,
            ip4!("10.0.5.9")
        );
    }
}
