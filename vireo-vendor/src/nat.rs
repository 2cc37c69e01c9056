//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! NAT rules in vendor form. Rules are unordered relative to each other on
//! the device; `order` records the configuration position used as the
//! sorting tiebreaker during composition.

use std::net::Ipv4Addr;

use derive_new::new;
use enum_as_inner::EnumAsInner;
use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

use crate::config::NamedRef;

// Which address space a rule translates, in vendor terms. The IP field a
// rule visibly rewrites depends on both the kind and the traffic direction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum NatRuleKind {
    SourceInside,
    SourceOutside,
    DestinationInside,
}

// Address side of a static rule.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(EnumAsInner)]
#[derive(Deserialize, Serialize)]
pub enum NatAddrSpec {
    Any,
    Network(Ipv4Network),
    Object(NamedRef),
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(EnumAsInner)]
#[derive(Deserialize, Serialize)]
pub enum NatMechanism {
    // ACL-gated translation into a pool; only acts in the rule's forward
    // direction.
    Dynamic { acl: NamedRef, pool: NamedRef },
    // Bidirectional network-to-network mapping.
    Static { from: NatAddrSpec, to: NatAddrSpec },
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(new)]
#[derive(Deserialize, Serialize)]
pub struct NatRule {
    pub kind: NatRuleKind,
    pub mechanism: NatMechanism,
    pub order: u32,
    pub line: Option<u32>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(new)]
#[derive(Deserialize, Serialize)]
pub struct NatPool {
    pub first: Ipv4Addr,
    pub last: Ipv4Addr,
}
