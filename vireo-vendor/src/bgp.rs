//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! BGP process configuration: templates, leaf neighbors and the per-process
//! knobs the synthesizer reads. Templates and leaves share one optional
//! field bundle ([`PeerCfg`]) so inheritance is a single merge operation.

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use serde::{Deserialize, Serialize};

use vireo_model::route::RouteProtocol;

use crate::config::NamedRef;
use crate::igp::RedistributionPolicy;

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct BgpProcess {
    pub asn: u32,
    pub router_id: Option<Ipv4Addr>,
    pub cluster_id: Option<Ipv4Addr>,
    pub default_information_originate: bool,
    pub default_metric: Option<u32>,
    pub maximum_paths_ebgp: u32,
    pub maximum_paths_ibgp: u32,
    pub networks: Vec<BgpNetwork>,
    pub networks6: Vec<BgpNetwork6>,
    pub aggregates: Vec<BgpAggregate>,
    pub aggregates6: Vec<BgpAggregate6>,
    pub redistribution: BTreeMap<RouteProtocol, RedistributionPolicy>,
    // Process-level neighbor defaults, weakest link of every inheritance
    // chain.
    pub defaults: PeerCfg,
    pub groups: BTreeMap<String, PeerTemplate>,
    pub sessions: BTreeMap<String, PeerTemplate>,
    pub neighbors: Vec<LeafPeer>,
}

// Neighbor settings as an optional-field bundle. `None` means "not
// configured here", which is what template inheritance keys on; consumers
// see `None` surviving resolution as the vendor default.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct PeerCfg {
    pub remote_as: Option<u32>,
    pub local_as: Option<u32>,
    pub description: Option<String>,
    pub shutdown: Option<bool>,
    pub update_source: Option<NamedRef>,
    pub route_reflector_client: Option<bool>,
    pub cluster_id: Option<Ipv4Addr>,
    pub send_community: Option<bool>,
    pub next_hop_self: Option<bool>,
    pub remove_private_as: Option<bool>,
    pub ebgp_multihop: Option<bool>,
    pub default_originate: Option<bool>,
    pub default_originate_map: Option<NamedRef>,
    pub route_map_in: Option<NamedRef>,
    pub route_map_out: Option<NamedRef>,
    pub prefix_list_in: Option<NamedRef>,
    pub prefix_list_out: Option<NamedRef>,
    pub distribute_list_in: Option<NamedRef>,
    pub distribute_list_out: Option<NamedRef>,
}

// Named peer-group or peer-session template. A template may itself inherit
// from a group parent and a session parent.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct PeerTemplate {
    pub name: String,
    pub cfg: PeerCfg,
    pub group: Option<NamedRef>,
    pub session: Option<NamedRef>,
    pub definition_line: Option<u32>,
}

// Concrete neighbor: a host prefix for static peers, a wider prefix for
// dynamic listen ranges.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct LeafPeer {
    pub addr: IpNetwork,
    pub cfg: PeerCfg,
    pub group: Option<NamedRef>,
    pub session: Option<NamedRef>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct BgpNetwork {
    pub prefix: Ipv4Network,
    pub route_map: Option<NamedRef>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct BgpNetwork6 {
    pub prefix: Ipv6Network,
    pub route_map: Option<NamedRef>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct BgpAggregate {
    pub prefix: Ipv4Network,
    pub summary_only: bool,
    pub as_set: bool,
    pub attribute_map: Option<NamedRef>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct BgpAggregate6 {
    pub prefix: Ipv6Network,
    pub summary_only: bool,
    pub as_set: bool,
    pub attribute_map: Option<NamedRef>,
}

// ===== impl BgpProcess =====

impl BgpProcess {
    pub fn new(asn: u32) -> BgpProcess {
        BgpProcess {
            asn,
            router_id: None,
            cluster_id: None,
            default_information_originate: false,
            default_metric: None,
            maximum_paths_ebgp: 1,
            maximum_paths_ibgp: 1,
            networks: Vec::new(),
            networks6: Vec::new(),
            aggregates: Vec::new(),
            aggregates6: Vec::new(),
            redistribution: BTreeMap::new(),
            defaults: PeerCfg::default(),
            groups: BTreeMap::new(),
            sessions: BTreeMap::new(),
            neighbors: Vec::new(),
        }
    }

    // Names of templates referenced as somebody's parent, used to find the
    // unreferenced remainder.
    pub fn referenced_parents(&self) -> BTreeSet<&str> {
        self.neighbors
            .iter()
            .map(|leaf| (&leaf.group, &leaf.session))
            .chain(
                self.groups
                    .values()
                    .chain(self.sessions.values())
                    .map(|tmpl| (&tmpl.group, &tmpl.session)),
            )
            .flat_map(|(group, session)| [group, session])
            .filter_map(|parent| {
                parent.as_ref().map(|parent| parent.name.as_str())
            })
            .collect()
    }
}

// ===== impl PeerCfg =====

impl PeerCfg {
    // Copies every field the parent sets and the child still lacks. A field
    // set on the child is never overwritten, so merging group ancestors
    // before session ancestors yields child > group > session precedence.
    pub fn inherit_unset(&mut self, parent: &PeerCfg) {
        macro_rules! inherit {
            ($($field:ident),+ $(,)?) => {
                $(
                    if self.$field.is_none() {
                        self.$field = parent.$field.clone();
                    }
                )+
            };
        }
        inherit!(
            remote_as,
            local_as,
            description,
            shutdown,
            update_source,
            route_reflector_client,
            cluster_id,
            send_community,
            next_hop_self,
            remove_private_as,
            ebgp_multihop,
            default_originate,
            default_originate_map,
            route_map_in,
            route_map_out,
            prefix_list_in,
            prefix_list_out,
            distribute_list_in,
            distribute_list_out,
        );
    }
}

// ===== impl PeerTemplate =====

impl PeerTemplate {
    pub fn new(name: impl Into<String>) -> PeerTemplate {
        PeerTemplate {
            name: name.into(),
            cfg: PeerCfg::default(),
            group: None,
            session: None,
            definition_line: None,
        }
    }
}

// ===== impl LeafPeer =====

impl LeafPeer {
    pub fn new(addr: IpNetwork) -> LeafPeer {
        LeafPeer {
            addr,
            cfg: PeerCfg::default(),
            group: None,
            session: None,
        }
    }

    // Listen-range peers cover more than a single host.
    pub fn is_dynamic(&self) -> bool {
        match self.addr {
            IpNetwork::V4(addr) => addr.prefix() < 32,
            IpNetwork::V6(addr) => addr.prefix() < 128,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inherit_keeps_child_fields() {
        let mut child = PeerCfg {
            remote_as: Some(65001),
            description: Some("child".to_owned()),
            ..Default::default()
        };
        let parent = PeerCfg {
            remote_as: Some(65002),
            local_as: Some(65000),
            ..Default::default()
        };

        child.inherit_unset(&parent);
        assert_eq!(child.remote_as, Some(65001));
        assert_eq!(child.local_as, Some(65000));
        assert_eq!(child.description.as_deref(), Some("child"));
    }

    #[test]
    fn test_inherit_first_parent_wins() {
        let mut child = PeerCfg::default();
        let group = PeerCfg {
            remote_as: Some(65010),
            shutdown: Some(false),
            ..Default::default()
        };
        let session = PeerCfg {
            remote_as: Some(65020),
            ebgp_multihop: Some(true),
            ..Default::default()
        };

        child.inherit_unset(&group);
        child.inherit_unset(&session);
        assert_eq!(child.remote_as, Some(65010));
        assert_eq!(child.shutdown, Some(false));
        assert_eq!(child.ebgp_multihop, Some(true));
    }

    #[test]
    fn test_referenced_parents() {
        let mut bgp = BgpProcess::new(65000);
        let mut tmpl = PeerTemplate::new("CORE");
        tmpl.group = Some(NamedRef::new("BASE".to_owned(), None));
        bgp.groups.insert("CORE".to_owned(), tmpl);
        bgp.groups.insert("BASE".to_owned(), PeerTemplate::new("BASE"));
        bgp.groups.insert("IDLE".to_owned(), PeerTemplate::new("IDLE"));

        let mut leaf = LeafPeer::new("192.0.2.1/32".parse().unwrap());
        leaf.group = Some(NamedRef::new("CORE".to_owned(), None));
        bgp.neighbors.push(leaf);

        let referenced = bgp.referenced_parents();
        assert!(referenced.contains("CORE"));
        assert!(referenced.contains("BASE"));
        assert!(!referenced.contains("IDLE"));
    }
}
