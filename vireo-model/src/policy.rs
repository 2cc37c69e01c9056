//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! Executable routing-policy intermediate representation.
//!
//! Every vendor construct that filters or rewrites routes (route-map
//! clauses, route-policy statements, synthesized export/import logic)
//! compiles into a [`RoutingPolicy`]: an ordered statement list over a small
//! closed expression language. Policies call each other by name, so the
//! compiled output of one configuration unit forms a flat namespace of
//! callable boolean policies.

use std::net::IpAddr;
use std::ops::RangeInclusive;

use enum_as_inner::EnumAsInner;
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::route::{BgpOrigin, Comm, OspfMetricType, RouteProtocol};

// Prefix plus the prefix-length range it stands for.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct PrefixRange {
    pub prefix: IpNetwork,
    pub lengths: RangeInclusive<u8>,
}

// Reference to a prefix space: a named route filter list or an inline set
// of ranges.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(EnumAsInner)]
#[derive(Deserialize, Serialize)]
pub enum PrefixSetRef {
    Named(String),
    Explicit(Vec<PrefixRange>),
}

// Next-hop rewrite target.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum NextHopExpr {
    Address(IpAddr),
    // The local address of the session the route is exported over.
    SelfAddress,
    // The remote address of the session the route was learned over.
    PeerAddress,
}

// Boolean policy expressions.
//
// Match kinds read the original route attributes; they never observe
// pending writes. `WithIntermediateAttrs` is the one exception to "matching
// has no side effects": writes performed while evaluating the wrapped
// expression are buffered and committed only when it matches, followed by
// the `on_match` statements. It backs attribute-maps on aggregates and
// redistribution, where set statements must not leak out of a failed branch.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(EnumAsInner)]
#[derive(Deserialize, Serialize)]
pub enum PolicyExpr {
    Conjunction(Vec<PolicyExpr>),
    Disjunction(Vec<PolicyExpr>),
    Not(Box<PolicyExpr>),
    Constant(bool),
    // Evaluates the named policy as a boolean in the same environment.
    CallPolicy(String),
    MatchPrefixSet(PrefixSetRef),
    MatchPrefix6Set(PrefixSetRef),
    MatchProtocol(RouteProtocol),
    MatchAsPath(String),
    MatchCommunity(String),
    MatchTag(u32),
    MatchMetric(u32),
    WithIntermediateAttrs {
        expr: Box<PolicyExpr>,
        on_match: Vec<PolicyStmt>,
    },
}

// Terminal policy verdicts.
//
// `LocalDefault` is a sentinel resolved at evaluation time against the
// environment's pending default action, which makes one compiled policy
// usable both as a plain filter (pending default starts as reject) and as a
// continue-chain link (an earlier clause may have marked a pending accept).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum Verdict {
    Accept,
    Reject,
    LocalDefault,
}

// Policy statements, executed in order until one returns.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(EnumAsInner)]
#[derive(Deserialize, Serialize)]
pub enum PolicyStmt {
    If {
        guard: PolicyExpr,
        then: Vec<PolicyStmt>,
        otherwise: Vec<PolicyStmt>,
    },
    Return(Verdict),
    SetLocalDefault(bool),
    // Tail transfer: runs the named policy and returns its verdict.
    Apply(String),
    SetMetric(u32),
    SetOspfMetricType(OspfMetricType),
    SetOrigin(BgpOrigin),
    SetLocalPref(u32),
    SetNextHop(NextHopExpr),
    SetCommunities { comms: Vec<Comm>, additive: bool },
    PrependAsPath { asn: u32, count: u8 },
    SetTag(u32),
    SetWeight(u16),
    RemovePrivateAs,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct RoutingPolicy {
    pub name: String,
    pub stmts: Vec<PolicyStmt>,
}

// Result of applying a policy to a route.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum PolicyResult<T> {
    // Route was accepted, carrying the rewritten attributes.
    Accept(T),
    Reject,
}

// ===== impl PrefixRange =====

impl PrefixRange {
    // Range matching the prefix exactly.
    pub fn exact(prefix: IpNetwork) -> PrefixRange {
        let len = prefix.prefix();
        PrefixRange { prefix, lengths: len..=len }
    }

    // Range matching strictly more specific prefixes.
    pub fn more_specific(prefix: IpNetwork) -> PrefixRange {
        let max = match prefix {
            IpNetwork::V4(_) => 32,
            IpNetwork::V6(_) => 128,
        };
        let lower = prefix.prefix().saturating_add(1).min(max);
        PrefixRange { prefix, lengths: lower..=max }
    }
}

// ===== impl PolicyExpr =====

impl PolicyExpr {
    // Matches the IPv4 default route.
    pub fn match_default_route() -> PolicyExpr {
        let default = IpNetwork::V4(
            ipnetwork::Ipv4Network::new(std::net::Ipv4Addr::UNSPECIFIED, 0)
                // Zero-length prefix is always valid.
                .unwrap(),
        );
        PolicyExpr::MatchPrefixSet(PrefixSetRef::Explicit(vec![
            PrefixRange::exact(default),
        ]))
    }
}

// ===== impl RoutingPolicy =====

impl RoutingPolicy {
    pub fn new(name: impl Into<String>) -> RoutingPolicy {
        RoutingPolicy { name: name.into(), stmts: Vec::new() }
    }
}

// ===== impl PolicyResult =====

impl<T> PolicyResult<T> {
    pub fn is_accept(&self) -> bool {
        matches!(self, PolicyResult::Accept(_))
    }

    pub fn is_reject(&self) -> bool {
        matches!(self, PolicyResult::Reject)
    }
}
