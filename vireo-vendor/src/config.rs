//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! Device-level configuration root. A [`VendorConfig`] is the parsed object
//! graph one conversion consumes; the front-end that produces it from CLI
//! text lives outside this workspace.

use std::collections::BTreeMap;

use derive_new::new;
use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

use crate::acl::{
    AccessList, AsPathList, CommunityList, Prefix6List, PrefixList,
};
use crate::bgp::BgpProcess;
use crate::igp::{EigrpProcess, OspfProcess, RipProcess};
use crate::interface::Interface;
use crate::nat::{NatPool, NatRule};
use crate::routemap::{RouteMap, RoutePolicy};

// Name of the implicit VRF interfaces and processes belong to unless
// configured otherwise.
pub const DEFAULT_VRF: &str = "default";

// Configuration dialect family the input was parsed from.
//
// The dialect decides a handful of documented behavioral asymmetries
// (router-id extremum direction, loopback0 preference); everything else is
// dialect-independent.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum ConfigDialect {
    #[default]
    Ios,
    IosXr,
    Nxos,
}

// Named reference to another structure, carrying the source line of the
// referring statement for diagnostics.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(new)]
#[derive(Deserialize, Serialize)]
pub struct NamedRef {
    pub name: String,
    pub line: Option<u32>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct VendorVrf {
    pub bgp: Option<BgpProcess>,
    pub ospf: Option<OspfProcess>,
    pub rip: Option<RipProcess>,
    pub eigrp: Option<EigrpProcess>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct VendorConfig {
    pub hostname: String,
    pub dialect: ConfigDialect,
    pub vrfs: BTreeMap<String, VendorVrf>,
    pub interfaces: BTreeMap<String, Interface>,
    pub route_maps: BTreeMap<String, RouteMap>,
    pub route_policies: BTreeMap<String, RoutePolicy>,
    pub access_lists: BTreeMap<String, AccessList>,
    pub prefix_lists: BTreeMap<String, PrefixList>,
    pub prefix6_lists: BTreeMap<String, Prefix6List>,
    pub as_path_lists: BTreeMap<String, AsPathList>,
    pub community_lists: BTreeMap<String, CommunityList>,
    pub nat_rules: Vec<NatRule>,
    pub nat_pools: BTreeMap<String, NatPool>,
    pub address_objects: BTreeMap<String, Ipv4Network>,
}

// ===== impl NamedRef =====

impl std::fmt::Display for NamedRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ===== impl VendorConfig =====

impl VendorConfig {
    pub fn new(
        hostname: impl Into<String>,
        dialect: ConfigDialect,
    ) -> VendorConfig {
        VendorConfig {
            hostname: hostname.into(),
            dialect,
            ..Default::default()
        }
    }

    // VRF entry for a process definition, created on first use.
    pub fn vrf_mut(&mut self, name: impl Into<String>) -> &mut VendorVrf {
        self.vrfs.entry(name.into()).or_default()
    }
}
