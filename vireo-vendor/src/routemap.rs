//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! Route maps (clause/sequence form) and route policies (linear form).
//!
//! Both are closed syntax trees: the compiler matches exhaustively over
//! every match/set/statement kind, so adding a construct here fails to
//! compile until every consumer handles it.

use std::collections::{BTreeMap, BTreeSet};

use derive_new::new;
use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

use vireo_model::filter::LineAction;
use vireo_model::policy::NextHopExpr;
use vireo_model::route::{BgpOrigin, Comm, OspfMetricType, RouteProtocol};

use crate::config::NamedRef;

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct RouteMap {
    pub name: String,
    // Keyed by sequence number; iteration order is evaluation order.
    pub clauses: BTreeMap<u32, RouteMapClause>,
    pub definition_line: Option<u32>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct RouteMapClause {
    pub seq: u32,
    pub action: LineAction,
    pub matches: Vec<RouteMapMatch>,
    pub sets: Vec<RouteMapSet>,
    pub continue_line: Option<ContinueLine>,
}

// One `continue` directive. A bare `continue` names no target and falls to
// the next sequential clause.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(new)]
#[derive(Deserialize, Serialize)]
pub struct ContinueLine {
    pub target: Option<u32>,
    pub line: Option<u32>,
}

// Match lines. Each variant carries every name listed on its line(s); names
// of one kind are alternatives. The four address-flavored kinds are
// alternatives of each other as well, forming one OR-group per clause.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(EnumAsInner)]
#[derive(Deserialize, Serialize)]
pub enum RouteMapMatch {
    AsPath(Vec<String>),
    Community(Vec<String>),
    Ipv4AccessList(Vec<String>),
    Ipv4PrefixList(Vec<String>),
    Ipv6AccessList(Vec<String>),
    Ipv6PrefixList(Vec<String>),
    Metric(u32),
    Tag(BTreeSet<u32>),
}

// Set lines, translated 1:1 into policy statements.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(EnumAsInner)]
#[derive(Deserialize, Serialize)]
pub enum RouteMapSet {
    LocalPreference(u32),
    Metric(u32),
    MetricType(OspfMetricType),
    Origin(BgpOrigin),
    NextHop(NextHopExpr),
    Community { comms: Vec<Comm>, additive: bool },
    AsPathPrepend { asn: u32, count: u8 },
    Tag(u32),
    Weight(u16),
}

// Linear-form policy (`route-policy` blocks).
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct RoutePolicy {
    pub name: String,
    pub stmts: Vec<RoutePolicyStmt>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(EnumAsInner)]
#[derive(Deserialize, Serialize)]
pub enum RoutePolicyStmt {
    If {
        cond: RoutePolicyCond,
        then: Vec<RoutePolicyStmt>,
        otherwise: Vec<RoutePolicyStmt>,
    },
    Set(RouteMapSet),
    Apply(NamedRef),
    // Accept immediately.
    Done,
    // Reject immediately.
    Drop,
    // Mark a pending accept and keep executing.
    Pass,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(EnumAsInner)]
#[derive(Deserialize, Serialize)]
pub enum RoutePolicyCond {
    All(Vec<RoutePolicyCond>),
    AnyOf(Vec<RoutePolicyCond>),
    Not(Box<RoutePolicyCond>),
    DestinationIn(NamedRef),
    AsPathIn(NamedRef),
    CommunityIn(NamedRef),
    ProtocolIs(RouteProtocol),
    TagIs(u32),
}

// ===== impl RouteMap =====

impl RouteMap {
    pub fn new(name: impl Into<String>) -> RouteMap {
        RouteMap {
            name: name.into(),
            clauses: BTreeMap::new(),
            definition_line: None,
        }
    }

    // True when any clause carries a continue directive.
    pub fn has_continue(&self) -> bool {
        self.clauses
            .values()
            .any(|clause| clause.continue_line.is_some())
    }
}

// ===== impl RouteMapClause =====

impl RouteMapClause {
    pub fn new(seq: u32, action: LineAction) -> RouteMapClause {
        RouteMapClause {
            seq,
            action,
            matches: Vec::new(),
            sets: Vec::new(),
            continue_line: None,
        }
    }
}

// ===== impl RouteMapMatch =====

impl RouteMapMatch {
    // Address-flavored matches are OR'd together; everything else is an
    // AND-term.
    pub fn is_address_match(&self) -> bool {
        matches!(
            self,
            RouteMapMatch::Ipv4AccessList(_)
                | RouteMapMatch::Ipv4PrefixList(_)
                | RouteMapMatch::Ipv6AccessList(_)
                | RouteMapMatch::Ipv6PrefixList(_)
        )
    }
}

// ===== impl RoutePolicy =====

impl RoutePolicy {
    pub fn new(name: impl Into<String>) -> RoutePolicy {
        RoutePolicy { name: name.into(), stmts: Vec::new() }
    }
}
