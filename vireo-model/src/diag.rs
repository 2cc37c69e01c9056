//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! Conversion diagnostics.
//!
//! Everything recoverable lands here instead of aborting the conversion:
//! dangling references degrade the referring feature and leave a record, and
//! advisories capture lossy or suspicious spots. The sink is append-only and
//! threaded explicitly through every conversion stage.

use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::warn;

// Kinds of named configuration structures that can be referenced.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum StructureKind {
    AccessList,
    AddressObject,
    AsPathList,
    CommunityList,
    Interface,
    Ipv6AccessList,
    Ipv6PrefixList,
    NatPool,
    PeerGroup,
    PeerSession,
    PrefixList,
    RouteMap,
    RouteMapClause,
    RoutePolicy,
}

// Where a dangling reference was found.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum StructureUsage {
    BgpAggregateAttributeMap,
    BgpDefaultOriginateMap,
    BgpInboundDistributeList,
    BgpInboundPrefixList,
    BgpInboundRouteMap,
    BgpNetworkRouteMap,
    BgpOutboundDistributeList,
    BgpOutboundPrefixList,
    BgpOutboundRouteMap,
    BgpPeerGroupParent,
    BgpPeerSessionParent,
    BgpRedistributionMap,
    BgpUpdateSource,
    EigrpRedistributionMap,
    NatDynamicAcl,
    NatDynamicPool,
    NatStaticObject,
    OspfDefaultOriginateMap,
    OspfRedistributionMap,
    RipDefaultOriginateMap,
    RipRedistributionMap,
    RouteMapContinue,
    RouteMapMatchAcl,
    RouteMapMatchAsPath,
    RouteMapMatchCommunity,
    RouteMapMatchPrefixList,
    RoutePolicyApply,
    RoutePolicyMatch,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(new)]
#[derive(Deserialize, Serialize)]
pub struct UndefinedReference {
    pub kind: StructureKind,
    pub name: String,
    pub usage: StructureUsage,
    pub line: Option<u32>,
}

#[derive(Clone, Debug, Default)]
#[derive(Deserialize, Serialize)]
pub struct Diagnostics {
    undefined_refs: Vec<UndefinedReference>,
    advisories: Vec<String>,
}

// ===== impl StructureKind =====

impl std::fmt::Display for StructureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructureKind::AccessList => write!(f, "access-list"),
            StructureKind::AddressObject => write!(f, "address object"),
            StructureKind::AsPathList => write!(f, "as-path list"),
            StructureKind::CommunityList => write!(f, "community list"),
            StructureKind::Interface => write!(f, "interface"),
            StructureKind::Ipv6AccessList => write!(f, "ipv6 access-list"),
            StructureKind::Ipv6PrefixList => write!(f, "ipv6 prefix-list"),
            StructureKind::NatPool => write!(f, "nat pool"),
            StructureKind::PeerGroup => write!(f, "bgp peer-group"),
            StructureKind::PeerSession => write!(f, "bgp peer-session"),
            StructureKind::PrefixList => write!(f, "prefix-list"),
            StructureKind::RouteMap => write!(f, "route-map"),
            StructureKind::RouteMapClause => write!(f, "route-map clause"),
            StructureKind::RoutePolicy => write!(f, "route-policy"),
        }
    }
}

// ===== impl StructureUsage =====

impl std::fmt::Display for StructureUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructureUsage::BgpAggregateAttributeMap => {
                write!(f, "bgp aggregate-address attribute-map")
            }
            StructureUsage::BgpDefaultOriginateMap => {
                write!(f, "bgp default-originate route-map")
            }
            StructureUsage::BgpInboundDistributeList => {
                write!(f, "bgp inbound distribute-list")
            }
            StructureUsage::BgpInboundPrefixList => {
                write!(f, "bgp inbound prefix-list")
            }
            StructureUsage::BgpInboundRouteMap => {
                write!(f, "bgp inbound route-map")
            }
            StructureUsage::BgpNetworkRouteMap => {
                write!(f, "bgp network route-map")
            }
            StructureUsage::BgpOutboundDistributeList => {
                write!(f, "bgp outbound distribute-list")
            }
            StructureUsage::BgpOutboundPrefixList => {
                write!(f, "bgp outbound prefix-list")
            }
            StructureUsage::BgpOutboundRouteMap => {
                write!(f, "bgp outbound route-map")
            }
            StructureUsage::BgpPeerGroupParent => {
                write!(f, "bgp peer-group inheritance")
            }
            StructureUsage::BgpPeerSessionParent => {
                write!(f, "bgp peer-session inheritance")
            }
            StructureUsage::BgpRedistributionMap => {
                write!(f, "bgp redistribution route-map")
            }
            StructureUsage::BgpUpdateSource => {
                write!(f, "bgp update-source")
            }
            StructureUsage::EigrpRedistributionMap => {
                write!(f, "eigrp redistribution route-map")
            }
            StructureUsage::NatDynamicAcl => {
                write!(f, "nat dynamic rule access-list")
            }
            StructureUsage::NatDynamicPool => {
                write!(f, "nat dynamic rule pool")
            }
            StructureUsage::NatStaticObject => {
                write!(f, "nat static rule address object")
            }
            StructureUsage::OspfDefaultOriginateMap => {
                write!(f, "ospf default-information originate route-map")
            }
            StructureUsage::OspfRedistributionMap => {
                write!(f, "ospf redistribution route-map")
            }
            StructureUsage::RipDefaultOriginateMap => {
                write!(f, "rip default-information originate route-map")
            }
            StructureUsage::RipRedistributionMap => {
                write!(f, "rip redistribution route-map")
            }
            StructureUsage::RouteMapContinue => {
                write!(f, "route-map continue")
            }
            StructureUsage::RouteMapMatchAcl => {
                write!(f, "route-map match ip address")
            }
            StructureUsage::RouteMapMatchAsPath => {
                write!(f, "route-map match as-path")
            }
            StructureUsage::RouteMapMatchCommunity => {
                write!(f, "route-map match community")
            }
            StructureUsage::RouteMapMatchPrefixList => {
                write!(f, "route-map match ip address prefix-list")
            }
            StructureUsage::RoutePolicyApply => {
                write!(f, "route-policy apply")
            }
            StructureUsage::RoutePolicyMatch => {
                write!(f, "route-policy match")
            }
        }
    }
}

// ===== impl Diagnostics =====

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    // Records a dangling reference.
    pub fn undefined(
        &mut self,
        kind: StructureKind,
        name: impl Into<String>,
        usage: StructureUsage,
        line: Option<u32>,
    ) {
        let name = name.into();
        warn!(%kind, %name, %usage, ?line, "undefined reference");
        self.undefined_refs
            .push(UndefinedReference::new(kind, name, usage, line));
    }

    // Records a free-form warning.
    pub fn advisory(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        warn!(message = %msg, "conversion advisory");
        self.advisories.push(msg);
    }

    pub fn undefined_refs(&self) -> &[UndefinedReference] {
        &self.undefined_refs
    }

    pub fn advisories(&self) -> &[String] {
        &self.advisories
    }

    // Convenience for tests and report assembly.
    pub fn has_undefined(&self, kind: StructureKind, name: &str) -> bool {
        self.undefined_refs
            .iter()
            .any(|r| r.kind == kind && r.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.undefined_refs.is_empty() && self.advisories.is_empty()
    }
}
