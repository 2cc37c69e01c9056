//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! Router-id inference, shared by the BGP and OSPF converters (and the BGP
//! default cluster-id).
//!
//! Selection order: explicit configuration, then the dialect extremum among
//! active loopback addresses, then the same extremum among all active
//! interface addresses, then 0.0.0.0 with an advisory. IOS and IOS-XR pick
//! the highest address, NX-OS the lowest; NX-OS additionally prefers an
//! interface literally named loopback0. The asymmetry is documented vendor
//! behavior and preserved as such.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use vireo_model::diag::Diagnostics;
use vireo_vendor::config::ConfigDialect;
use vireo_vendor::interface::Interface;

pub(crate) fn infer_router_id(
    explicit: Option<Ipv4Addr>,
    dialect: ConfigDialect,
    interfaces: &BTreeMap<String, Interface>,
    diags: &mut Diagnostics,
) -> Ipv4Addr {
    if let Some(addr) = explicit {
        return addr;
    }

    if dialect == ConfigDialect::Nxos {
        if let Some(addr) = interfaces
            .values()
            .filter(|iface| iface.active)
            .find(|iface| iface.name.eq_ignore_ascii_case("loopback0"))
            .and_then(|iface| iface.primary_address())
        {
            return addr.ip();
        }
    }

    let extremum = |loopback_only: bool| {
        let candidates = interfaces
            .values()
            .filter(|iface| iface.active)
            .filter(|iface| !loopback_only || iface.is_loopback())
            .filter_map(|iface| iface.primary_address())
            .map(|prefix| prefix.ip());
        match dialect {
            ConfigDialect::Ios | ConfigDialect::IosXr => candidates.max(),
            ConfigDialect::Nxos => candidates.min(),
        }
    };

    if let Some(addr) = extremum(true).or_else(|| extremum(false)) {
        return addr;
    }

    diags.advisory("no router-id configured and no interface address to infer one from");
    Ipv4Addr::UNSPECIFIED
}
