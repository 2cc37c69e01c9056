//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! OSPF, RIP and EIGRP process configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use derive_new::new;
use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

use vireo_model::model::MaxMetricRouterLsa;
use vireo_model::route::{OspfMetricType, RouteProtocol};

use crate::config::NamedRef;

// Shared shape of `redistribute <protocol>` statements across the IGPs and
// BGP. Which fields are honored (and which defaults kick in when unset)
// depends on the receiving process.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct RedistributionPolicy {
    pub metric: Option<u32>,
    pub metric_type: Option<OspfMetricType>,
    pub route_map: Option<NamedRef>,
}

// One `network <prefix> area <id>` statement.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(new)]
#[derive(Deserialize, Serialize)]
pub struct OspfNetwork {
    pub prefix: Ipv4Network,
    pub area: u32,
}

// `default-information originate` and its knobs; absence of the struct
// means origination is off.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct OspfDefaultOriginate {
    pub always: bool,
    pub metric: Option<u32>,
    pub metric_type: Option<OspfMetricType>,
    pub route_map: Option<NamedRef>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct OspfProcess {
    pub process_id: u32,
    pub router_id: Option<Ipv4Addr>,
    pub distance: Option<u32>,
    pub networks: Vec<OspfNetwork>,
    // Per area: summarized prefix to advertise flag. Non-advertised
    // summaries still produce discard routes.
    pub area_summaries: BTreeMap<u32, BTreeMap<Ipv4Network, bool>>,
    pub passive_interface_default: bool,
    pub passive_interfaces: BTreeSet<String>,
    pub active_interfaces: BTreeSet<String>,
    pub default_information_originate: Option<OspfDefaultOriginate>,
    pub default_metric: Option<u32>,
    pub redistribution: BTreeMap<RouteProtocol, RedistributionPolicy>,
    pub reference_bandwidth: Option<u32>,
    pub max_metric_router_lsa: Option<MaxMetricRouterLsa>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct RipProcess {
    pub networks: BTreeSet<Ipv4Network>,
    pub passive_interface_default: bool,
    pub passive_interfaces: BTreeSet<String>,
    pub active_interfaces: BTreeSet<String>,
    pub default_information_originate: bool,
    pub default_information_metric: Option<u32>,
    pub default_information_originate_map: Option<NamedRef>,
    pub redistribution: BTreeMap<RouteProtocol, RedistributionPolicy>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct EigrpProcess {
    pub asn: u32,
    pub default_metric: Option<u32>,
    pub networks: BTreeSet<Ipv4Network>,
    pub redistribution: BTreeMap<RouteProtocol, RedistributionPolicy>,
}

// ===== impl OspfProcess =====

impl OspfProcess {
    pub fn new(process_id: u32) -> OspfProcess {
        OspfProcess {
            process_id,
            router_id: None,
            distance: None,
            networks: Vec::new(),
            area_summaries: BTreeMap::new(),
            passive_interface_default: false,
            passive_interfaces: BTreeSet::new(),
            active_interfaces: BTreeSet::new(),
            default_information_originate: None,
            default_metric: None,
            redistribution: BTreeMap::new(),
            reference_bandwidth: None,
            max_metric_router_lsa: None,
        }
    }

    // Passive state of an enrolled interface.
    pub fn is_passive(&self, interface: &str) -> bool {
        self.passive_interfaces.contains(interface)
            || (self.passive_interface_default
                && !self.active_interfaces.contains(interface))
    }
}

// ===== impl RipProcess =====

impl RipProcess {
    pub fn is_passive(&self, interface: &str) -> bool {
        self.passive_interfaces.contains(interface)
            || (self.passive_interface_default
                && !self.active_interfaces.contains(interface))
    }
}

// ===== impl EigrpProcess =====

impl EigrpProcess {
    pub fn new(asn: u32) -> EigrpProcess {
        EigrpProcess {
            asn,
            default_metric: None,
            networks: BTreeSet::new(),
            redistribution: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passive_logic() {
        let mut ospf = OspfProcess::new(1);
        ospf.passive_interfaces.insert("Ethernet0".to_owned());
        assert!(ospf.is_passive("Ethernet0"));
        assert!(!ospf.is_passive("Ethernet1"));

        ospf.passive_interface_default = true;
        ospf.active_interfaces.insert("Ethernet1".to_owned());
        assert!(ospf.is_passive("Ethernet2"));
        assert!(!ospf.is_passive("Ethernet1"));
    }
}
