//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! Vendor-independent device model: the output of one conversion. All
//! collections are name-keyed BTreeMaps so serialized output is stable.

use std::collections::{BTreeMap, BTreeSet};
use std::net::{IpAddr, Ipv4Addr};

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::filter::{
    AsPathList, CommunityList, Route6FilterList, RouteFilterList,
};
use crate::nat::{FlowAcl, Transformation};
use crate::policy::RoutingPolicy;

// Administrative distance of generated aggregate routes.
pub const AGGREGATE_ROUTE_ADMIN: u32 = 200;

// Largest usable administrative distance; generated default routes carry it
// so they never beat a real route.
pub const MAX_ADMIN_DISTANCE: u32 = 32767;

// Administrative distance of OSPF inter-area discard routes.
pub const DEFAULT_OSPF_ADMIN: u32 = 110;

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct GeneratedRoute {
    pub prefix: IpNetwork,
    pub admin: u32,
    // Policy deciding whether the route is generated at all.
    pub generation_policy: Option<String>,
    // Policy rewriting the generated route's attributes.
    pub attribute_policy: Option<String>,
    pub discard: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct BgpPeer {
    pub remote_as: u32,
    pub local_as: Option<u32>,
    pub description: Option<String>,
    // Peer-group the neighbor was declared under, kept for reporting.
    pub group: Option<String>,
    pub cluster_id: Option<Ipv4Addr>,
    pub route_reflector_client: bool,
    pub send_community: bool,
    pub update_source: Option<IpAddr>,
    pub ebgp_multihop: bool,
    pub shutdown: bool,
    // True for listen-range peers covering a whole prefix.
    pub dynamic: bool,
    pub export_policy: String,
    pub import_policy: Option<String>,
    pub generated_routes: Vec<GeneratedRoute>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct BgpConfig {
    pub router_id: Ipv4Addr,
    pub neighbors: BTreeMap<IpNetwork, BgpPeer>,
    pub multipath_ebgp: bool,
    pub multipath_ibgp: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct OspfArea {
    pub id: u32,
    pub interfaces: BTreeSet<String>,
    pub summary_filter: Option<String>,
}

// Stub-router advertisement knobs (RFC 6987).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct MaxMetricRouterLsa {
    pub include_stub: bool,
    pub summary_lsa: Option<u32>,
    pub external_lsa: Option<u32>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct OspfConfig {
    pub router_id: Ipv4Addr,
    pub areas: BTreeMap<u32, OspfArea>,
    pub export_policy: String,
    pub reference_bandwidth: Option<u32>,
    pub max_metric_router_lsa: Option<MaxMetricRouterLsa>,
    pub generated_routes: Vec<GeneratedRoute>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct RipConfig {
    pub interfaces: BTreeSet<String>,
    pub export_policy: String,
    pub generated_routes: Vec<GeneratedRoute>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct EigrpConfig {
    pub asn: u32,
    pub interfaces: BTreeSet<String>,
    pub export_policy: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Interface {
    pub name: String,
    pub vrf: String,
    pub addresses: Vec<IpNetwork>,
    pub active: bool,
    pub passive: bool,
    pub incoming_transformation: Option<Transformation>,
    pub outgoing_transformation: Option<Transformation>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Vrf {
    pub name: String,
    pub interfaces: BTreeSet<String>,
    pub bgp: Option<BgpConfig>,
    pub ospf: Option<OspfConfig>,
    pub rip: Option<RipConfig>,
    pub eigrp: Option<EigrpConfig>,
    pub generated_routes: Vec<GeneratedRoute>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Model {
    pub hostname: String,
    pub interfaces: BTreeMap<String, Interface>,
    pub vrfs: BTreeMap<String, Vrf>,
    pub policies: BTreeMap<String, RoutingPolicy>,
    pub route_filter_lists: BTreeMap<String, RouteFilterList>,
    pub route6_filter_lists: BTreeMap<String, Route6FilterList>,
    pub as_path_lists: BTreeMap<String, AsPathList>,
    pub community_lists: BTreeMap<String, CommunityList>,
    pub flow_acls: BTreeMap<String, FlowAcl>,
}

// ===== impl GeneratedRoute =====

impl GeneratedRoute {
    pub fn new(prefix: IpNetwork, admin: u32) -> GeneratedRoute {
        GeneratedRoute {
            prefix,
            admin,
            generation_policy: None,
            attribute_policy: None,
            discard: false,
        }
    }
}

// ===== impl Vrf =====

impl Vrf {
    pub fn new(name: impl Into<String>) -> Vrf {
        Vrf {
            name: name.into(),
            interfaces: BTreeSet::new(),
            bgp: None,
            ospf: None,
            rip: None,
            eigrp: None,
            generated_routes: Vec::new(),
        }
    }
}

// ===== impl Model =====

impl Model {
    pub fn new(hostname: impl Into<String>) -> Model {
        Model { hostname: hostname.into(), ..Default::default() }
    }
}
