//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! Names of synthesized policies and lists. The `~` sigil keeps them out of
//! the namespace vendor configurations can spell, so a generated name can
//! never collide with a user-defined structure.

use std::fmt::Display;

// Sub-policy of one route-map clause.
pub fn clause_policy(map: &str, seq: u32) -> String {
    format!("~rm-clause:{}:{}~", map, seq)
}

// Per-VRF BGP export policy shared by every neighbor.
pub fn bgp_common_export(vrf: &str) -> String {
    format!("~bgp-common-export:{}~", vrf)
}

pub fn bgp_peer_export(vrf: &str, peer: &impl Display) -> String {
    format!("~bgp-peer-export:{}:{}~", vrf, peer)
}

pub fn bgp_peer_import(vrf: &str, peer: &impl Display) -> String {
    format!("~bgp-peer-import:{}:{}~", vrf, peer)
}

pub fn bgp_default_originate(vrf: &str, peer: &impl Display) -> String {
    format!("~bgp-default-originate:{}:{}~", vrf, peer)
}

// Generation policy of one aggregate route.
pub fn aggregate_gen(vrf: &str, prefix: &impl Display) -> String {
    format!("~aggregate-gen:{}:{}~", vrf, prefix)
}

// Filter list suppressing routes covered by a summary-only aggregate.
pub fn suppress_summary_only(vrf: &str) -> String {
    format!("~suppress-summary-only:{}~", vrf)
}

pub fn ospf_export(vrf: &str) -> String {
    format!("~ospf-export:{}~", vrf)
}

pub fn ospf_summary_filter(vrf: &str, area: u32) -> String {
    format!("~ospf-summary-filter:{}:{}~", vrf, area)
}

pub fn rip_export(vrf: &str) -> String {
    format!("~rip-export:{}~", vrf)
}

pub fn eigrp_export(vrf: &str) -> String {
    format!("~eigrp-export:{}~", vrf)
}

// Synthetic group wrapping an unused session template's fake neighbor.
pub fn fake_group(index: usize) -> String {
    format!("~fake-group:{}~", index)
}
