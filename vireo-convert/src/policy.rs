//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! Route-map and route-policy compilation.
//!
//! Both source forms compile into the same result: a main policy plus any
//! per-clause sub-policies, all callable by name. Route-map clauses are
//! processed in descending sequence order so each clause can hand off to its
//! successor, while runtime evaluation proceeds in ascending order.
//!
//! A clause without a verdict of its own ends in `Return(LocalDefault)`,
//! never a hard accept or reject, so the compiled policy works both as a
//! plain filter and as a link in a continue chain.

use vireo_model::diag::{Diagnostics, StructureKind, StructureUsage};
use vireo_model::filter::LineAction;
use vireo_model::policy::{
    PolicyExpr, PolicyStmt, PrefixSetRef, RoutingPolicy, Verdict,
};
use vireo_vendor::config::VendorConfig;
use vireo_vendor::routemap::{
    RouteMap, RouteMapClause, RouteMapMatch, RouteMapSet, RoutePolicy,
    RoutePolicyCond, RoutePolicyStmt,
};

use crate::names;
use crate::refs::References;

// Output of compiling one route map or route policy.
#[derive(Clone, Debug)]
pub struct CompiledPolicy {
    pub main: RoutingPolicy,
    pub subpolicies: Vec<RoutingPolicy>,
}

// ===== impl CompiledPolicy =====

impl CompiledPolicy {
    pub fn into_policies(self) -> impl Iterator<Item = RoutingPolicy> {
        std::iter::once(self.main).chain(self.subpolicies)
    }
}

// ===== global functions =====

pub fn compile_route_map(
    map: &RouteMap,
    cfg: &VendorConfig,
    refs: &mut References,
    diags: &mut Diagnostics,
) -> CompiledPolicy {
    if map.has_continue() {
        compile_with_continues(map, cfg, refs, diags)
    } else {
        compile_flat(map, cfg, refs, diags)
    }
}

pub fn compile_route_policy(
    policy: &RoutePolicy,
    cfg: &VendorConfig,
    refs: &mut References,
    diags: &mut Diagnostics,
) -> CompiledPolicy {
    let mut stmts = convert_policy_stmts(&policy.stmts, cfg, refs, diags);
    stmts.push(PolicyStmt::Return(Verdict::LocalDefault));
    CompiledPolicy {
        main: RoutingPolicy { name: policy.name.clone(), stmts },
        subpolicies: Vec::new(),
    }
}

// ===== helper functions =====

// Folds the clauses right-to-left into nested `If`s: the lowest-numbered
// clause becomes the policy body and runtime evaluation runs ascending.
fn compile_flat(
    map: &RouteMap,
    cfg: &VendorConfig,
    refs: &mut References,
    diags: &mut Diagnostics,
) -> CompiledPolicy {
    let mut stmts = vec![PolicyStmt::Return(Verdict::LocalDefault)];
    for clause in map.clauses.values().rev() {
        let mut then = convert_sets(&clause.sets);
        then.push(PolicyStmt::Return(match clause.action {
            LineAction::Permit => Verdict::Accept,
            LineAction::Deny => Verdict::Reject,
        }));
        stmts = vec![PolicyStmt::If {
            guard: clause_guard(map, clause, cfg, refs, diags),
            then,
            otherwise: stmts,
        }];
    }
    CompiledPolicy {
        main: RoutingPolicy { name: map.name.clone(), stmts },
        subpolicies: Vec::new(),
    }
}

// Emits one sub-policy per clause; the false branch of each clause applies
// the next one and a matching permit clause with `continue` marks a pending
// accept before transferring to its target.
fn compile_with_continues(
    map: &RouteMap,
    cfg: &VendorConfig,
    refs: &mut References,
    diags: &mut Diagnostics,
) -> CompiledPolicy {
    let seqs: Vec<u32> = map.clauses.keys().copied().collect();
    let mut subpolicies = Vec::new();

    for (position, clause) in map.clauses.values().enumerate().rev() {
        let next = seqs.get(position + 1).copied();
        let otherwise = match next {
            Some(next) => {
                vec![PolicyStmt::Apply(names::clause_policy(&map.name, next))]
            }
            None => vec![PolicyStmt::Return(Verdict::LocalDefault)],
        };

        let mut then = convert_sets(&clause.sets);
        match clause.action {
            // Deny terminates unconditionally; a configured continue is
            // ignored.
            LineAction::Deny => {
                then.push(PolicyStmt::Return(Verdict::Reject));
            }
            LineAction::Permit => {
                match continue_target(map, clause, next, diags) {
                    Some(target) => {
                        then.push(PolicyStmt::SetLocalDefault(true));
                        then.push(PolicyStmt::Apply(names::clause_policy(
                            &map.name, target,
                        )));
                    }
                    None => {
                        then.push(PolicyStmt::Return(Verdict::Accept));
                    }
                }
            }
        }

        subpolicies.push(RoutingPolicy {
            name: names::clause_policy(&map.name, clause.seq),
            stmts: vec![PolicyStmt::If {
                guard: clause_guard(map, clause, cfg, refs, diags),
                then,
                otherwise,
            }],
        });
    }

    let stmts = match seqs.first() {
        Some(first) => {
            vec![PolicyStmt::Apply(names::clause_policy(&map.name, *first))]
        }
        None => vec![PolicyStmt::Return(Verdict::LocalDefault)],
    };
    CompiledPolicy {
        main: RoutingPolicy { name: map.name.clone(), stmts },
        subpolicies,
    }
}

// Resolves a clause's continue directive to a target sequence number, or
// None when the clause should terminate normally. A bare continue falls to
// the next sequential clause (and is silently dropped on the last one); an
// explicit target must exist and lie forward of the clause.
fn continue_target(
    map: &RouteMap,
    clause: &RouteMapClause,
    next: Option<u32>,
    diags: &mut Diagnostics,
) -> Option<u32> {
    let cont = clause.continue_line.as_ref()?;
    match cont.target {
        Some(target) => {
            if target > clause.seq && map.clauses.contains_key(&target) {
                Some(target)
            } else {
                diags.undefined(
                    StructureKind::RouteMapClause,
                    format!("{} {}", map.name, target),
                    StructureUsage::RouteMapContinue,
                    cont.line,
                );
                None
            }
        }
        None => next,
    }
}

// Builds a clause's guard: non-address matches are AND-terms, the four
// address-flavored kinds are OR'd together into one AND-term.
fn clause_guard(
    map: &RouteMap,
    clause: &RouteMapClause,
    cfg: &VendorConfig,
    refs: &mut References,
    diags: &mut Diagnostics,
) -> PolicyExpr {
    let line = map.definition_line;
    let mut terms = Vec::new();
    let mut addr_terms = Vec::new();

    for match_line in &clause.matches {
        match match_line {
            RouteMapMatch::AsPath(lists) => {
                let alts = lists
                    .iter()
                    .map(|name| {
                        refs.note(StructureKind::AsPathList, name);
                        if !cfg.as_path_lists.contains_key(name) {
                            diags.undefined(
                                StructureKind::AsPathList,
                                name,
                                StructureUsage::RouteMapMatchAsPath,
                                line,
                            );
                        }
                        PolicyExpr::MatchAsPath(name.clone())
                    })
                    .collect();
                terms.push(one_or_disjunction(alts));
            }
            RouteMapMatch::Community(lists) => {
                let alts = lists
                    .iter()
                    .map(|name| {
                        refs.note(StructureKind::CommunityList, name);
                        if !cfg.community_lists.contains_key(name) {
                            diags.undefined(
                                StructureKind::CommunityList,
                                name,
                                StructureUsage::RouteMapMatchCommunity,
                                line,
                            );
                        }
                        PolicyExpr::MatchCommunity(name.clone())
                    })
                    .collect();
                terms.push(one_or_disjunction(alts));
            }
            RouteMapMatch::Ipv4AccessList(lists) => {
                for name in lists {
                    refs.note(StructureKind::AccessList, name);
                    if !cfg.access_lists.contains_key(name) {
                        diags.undefined(
                            StructureKind::AccessList,
                            name,
                            StructureUsage::RouteMapMatchAcl,
                            line,
                        );
                    }
                    addr_terms.push(PolicyExpr::MatchPrefixSet(
                        PrefixSetRef::Named(name.clone()),
                    ));
                }
            }
            RouteMapMatch::Ipv4PrefixList(lists) => {
                for name in lists {
                    refs.note(StructureKind::PrefixList, name);
                    if !cfg.prefix_lists.contains_key(name) {
                        diags.undefined(
                            StructureKind::PrefixList,
                            name,
                            StructureUsage::RouteMapMatchPrefixList,
                            line,
                        );
                    }
                    addr_terms.push(PolicyExpr::MatchPrefixSet(
                        PrefixSetRef::Named(name.clone()),
                    ));
                }
            }
            RouteMapMatch::Ipv6AccessList(lists) => {
                // IPv6 access lists are not modeled; the reference is kept
                // so the match misses at evaluation.
                for name in lists {
                    diags.undefined(
                        StructureKind::Ipv6AccessList,
                        name,
                        StructureUsage::RouteMapMatchAcl,
                        line,
                    );
                    addr_terms.push(PolicyExpr::MatchPrefix6Set(
                        PrefixSetRef::Named(name.clone()),
                    ));
                }
            }
            RouteMapMatch::Ipv6PrefixList(lists) => {
                for name in lists {
                    refs.note(StructureKind::Ipv6PrefixList, name);
                    if !cfg.prefix6_lists.contains_key(name) {
                        diags.undefined(
                            StructureKind::Ipv6PrefixList,
                            name,
                            StructureUsage::RouteMapMatchPrefixList,
                            line,
                        );
                    }
                    addr_terms.push(PolicyExpr::MatchPrefix6Set(
                        PrefixSetRef::Named(name.clone()),
                    ));
                }
            }
            RouteMapMatch::Metric(metric) => {
                terms.push(PolicyExpr::MatchMetric(*metric));
            }
            RouteMapMatch::Tag(tags) => {
                let alts = tags
                    .iter()
                    .map(|tag| PolicyExpr::MatchTag(*tag))
                    .collect();
                terms.push(one_or_disjunction(alts));
            }
        }
    }

    if !addr_terms.is_empty() {
        terms.push(one_or_disjunction(addr_terms));
    }
    // An empty conjunction matches everything, which is exactly what a
    // clause without match lines does.
    PolicyExpr::Conjunction(terms)
}

fn one_or_disjunction(mut alts: Vec<PolicyExpr>) -> PolicyExpr {
    if alts.len() == 1 {
        alts.pop().unwrap()
    } else {
        PolicyExpr::Disjunction(alts)
    }
}

pub(crate) fn convert_sets(sets: &[RouteMapSet]) -> Vec<PolicyStmt> {
    sets.iter().map(convert_set).collect()
}

fn convert_set(set: &RouteMapSet) -> PolicyStmt {
    match set {
        RouteMapSet::LocalPreference(value) => PolicyStmt::SetLocalPref(*value),
        RouteMapSet::Metric(value) => PolicyStmt::SetMetric(*value),
        RouteMapSet::MetricType(value) => PolicyStmt::SetOspfMetricType(*value),
        RouteMapSet::Origin(value) => PolicyStmt::SetOrigin(*value),
        RouteMapSet::NextHop(value) => PolicyStmt::SetNextHop(*value),
        RouteMapSet::Community { comms, additive } => {
            PolicyStmt::SetCommunities {
                comms: comms.clone(),
                additive: *additive,
            }
        }
        RouteMapSet::AsPathPrepend { asn, count } => {
            PolicyStmt::PrependAsPath { asn: *asn, count: *count }
        }
        RouteMapSet::Tag(value) => PolicyStmt::SetTag(*value),
        RouteMapSet::Weight(value) => PolicyStmt::SetWeight(*value),
    }
}

fn convert_policy_stmts(
    stmts: &[RoutePolicyStmt],
    cfg: &VendorConfig,
    refs: &mut References,
    diags: &mut Diagnostics,
) -> Vec<PolicyStmt> {
    stmts
        .iter()
        .map(|stmt| match stmt {
            RoutePolicyStmt::If { cond, then, otherwise } => PolicyStmt::If {
                guard: convert_cond(cond, cfg, refs, diags),
                then: convert_policy_stmts(then, cfg, refs, diags),
                otherwise: convert_policy_stmts(otherwise, cfg, refs, diags),
            },
            RoutePolicyStmt::Set(set) => convert_set(set),
            RoutePolicyStmt::Apply(target) => {
                refs.note(StructureKind::RoutePolicy, &target.name);
                if !cfg.route_policies.contains_key(&target.name) {
                    diags.undefined(
                        StructureKind::RoutePolicy,
                        &target.name,
                        StructureUsage::RoutePolicyApply,
                        target.line,
                    );
                }
                PolicyStmt::Apply(target.name.clone())
            }
            RoutePolicyStmt::Done => PolicyStmt::Return(Verdict::Accept),
            RoutePolicyStmt::Drop => PolicyStmt::Return(Verdict::Reject),
            RoutePolicyStmt::Pass => PolicyStmt::SetLocalDefault(true),
        })
        .collect()
}

fn convert_cond(
    cond: &RoutePolicyCond,
    cfg: &VendorConfig,
    refs: &mut References,
    diags: &mut Diagnostics,
) -> PolicyExpr {
    match cond {
        RoutePolicyCond::All(conds) => PolicyExpr::Conjunction(
            conds
                .iter()
                .map(|cond| convert_cond(cond, cfg, refs, diags))
                .collect(),
        ),
        RoutePolicyCond::AnyOf(conds) => PolicyExpr::Disjunction(
            conds
                .iter()
                .map(|cond| convert_cond(cond, cfg, refs, diags))
                .collect(),
        ),
        RoutePolicyCond::Not(cond) => PolicyExpr::Not(Box::new(convert_cond(
            cond, cfg, refs, diags,
        ))),
        RoutePolicyCond::DestinationIn(list) => {
            refs.note(StructureKind::PrefixList, &list.name);
            if !cfg.prefix_lists.contains_key(&list.name) {
                diags.undefined(
                    StructureKind::PrefixList,
                    &list.name,
                    StructureUsage::RoutePolicyMatch,
                    list.line,
                );
            }
            PolicyExpr::MatchPrefixSet(PrefixSetRef::Named(list.name.clone()))
        }
        RoutePolicyCond::AsPathIn(list) => {
            refs.note(StructureKind::AsPathList, &list.name);
            if !cfg.as_path_lists.contains_key(&list.name) {
                diags.undefined(
                    StructureKind::AsPathList,
                    &list.name,
                    StructureUsage::RoutePolicyMatch,
                    list.line,
                );
            }
            PolicyExpr::MatchAsPath(list.name.clone())
        }
        RoutePolicyCond::CommunityIn(list) => {
            refs.note(StructureKind::CommunityList, &list.name);
            if !cfg.community_lists.contains_key(&list.name) {
                diags.undefined(
                    StructureKind::CommunityList,
                    &list.name,
                    StructureUsage::RoutePolicyMatch,
                    list.line,
                );
            }
            PolicyExpr::MatchCommunity(list.name.clone())
        }
        RoutePolicyCond::ProtocolIs(protocol) => {
            PolicyExpr::MatchProtocol(*protocol)
        }
        RoutePolicyCond::TagIs(tag) => PolicyExpr::MatchTag(*tag),
    }
}
