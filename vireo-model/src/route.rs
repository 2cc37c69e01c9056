//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! Route attributes as seen by policy evaluation. A [`Route`] is the unit
//! every compiled policy runs against: matches read it, set statements write
//! the pending copy owned by the evaluation environment.

use std::collections::BTreeSet;
use std::net::IpAddr;

use derive_new::new;
use ipnetwork::IpNetwork;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

// Protocol that installed (or would install) a route.
//
// `Bgp` and `Ibgp` are distinct on purpose: several synthesized policies
// treat locally originated eBGP and iBGP routes differently. `Aggregate`
// marks routes produced by a generation policy rather than learned.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum RouteProtocol {
    Connected,
    Static,
    Rip,
    Ospf,
    Eigrp,
    Bgp,
    Ibgp,
    Aggregate,
}

// BGP origin attribute.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum BgpOrigin {
    Igp = 0,
    Egp = 1,
    Incomplete = 2,
}

// OSPF external metric type.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum OspfMetricType {
    Type1,
    Type2,
}

// Standard BGP community.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct Comm(pub u32);

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(new)]
#[derive(Deserialize, Serialize)]
pub struct Route {
    pub prefix: IpNetwork,
    pub protocol: RouteProtocol,
    #[new(default)]
    pub metric: u32,
    #[new(default)]
    pub tag: u32,
    #[new(default)]
    pub nexthop: Option<IpAddr>,
    #[new(default)]
    pub origin: Option<BgpOrigin>,
    #[new(default)]
    pub local_pref: Option<u32>,
    #[new(default)]
    pub communities: BTreeSet<Comm>,
    #[new(default)]
    pub as_path: Vec<u32>,
    #[new(default)]
    pub weight: u16,
    #[new(default)]
    pub ospf_metric_type: Option<OspfMetricType>,
}

// ===== impl Comm =====

impl std::fmt::Display for Comm {
    // Canonical "asn:value" rendering, also the form community-list regexes
    // run against.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let asn = self.0 >> 16;
        let local = self.0 & 0xFFFF;
        write!(f, "{}:{}", asn, local)
    }
}

// ===== impl Route =====

impl Route {
    // Space-separated AS path rendering used for as-path list matching.
    pub fn as_path_string(&self) -> String {
        self.as_path.iter().join(" ")
    }
}
