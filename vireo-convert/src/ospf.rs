//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! OSPF conversion: area membership from `network` statements, inter-area
//! summarization (filter list plus discard routes), default-information
//! origination and the redistribution export policy.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use ipnetwork::IpNetwork;

use vireo_model::diag::{Diagnostics, StructureUsage};
use vireo_model::filter::{LineAction, RouteFilterLine, RouteFilterList};
use vireo_model::model::{
    DEFAULT_OSPF_ADMIN, GeneratedRoute, MAX_ADMIN_DISTANCE, Model, OspfArea,
    OspfConfig,
};
use vireo_model::policy::{PolicyExpr, PolicyStmt, RoutingPolicy, Verdict};
use vireo_model::route::{OspfMetricType, RouteProtocol};
use vireo_vendor::config::VendorConfig;
use vireo_vendor::igp::OspfProcess;

use crate::convert::{add_policy, checked_policy_ref, protocol_term};
use crate::error::Error;
use crate::names;
use crate::refs::References;
use crate::routerid::infer_router_id;

const REDISTRIBUTION_SOURCES: [RouteProtocol; 5] = [
    RouteProtocol::Connected,
    RouteProtocol::Static,
    RouteProtocol::Bgp,
    RouteProtocol::Rip,
    RouteProtocol::Eigrp,
];

// Seed metric when neither the redistribute statement nor `default-metric`
// provides one.
fn default_redistribution_metric(protocol: RouteProtocol) -> u32 {
    match protocol {
        RouteProtocol::Bgp | RouteProtocol::Ibgp | RouteProtocol::Rip => 1,
        _ => 20,
    }
}

pub fn convert_ospf(
    vrf_name: &str,
    proc: &OspfProcess,
    cfg: &VendorConfig,
    model: &mut Model,
    refs: &mut References,
    diags: &mut Diagnostics,
) -> Result<(), Error> {
    let router_id =
        infer_router_id(proc.router_id, cfg.dialect, &cfg.interfaces, diags);

    let mut areas = assign_areas(vrf_name, proc, cfg, model);
    let mut generated = Vec::new();
    convert_summaries(vrf_name, proc, model, &mut areas, &mut generated);

    let mut stmts = Vec::new();
    convert_default_originate(
        vrf_name, proc, cfg, &mut stmts, &mut generated, refs, diags,
    );

    for protocol in REDISTRIBUTION_SOURCES {
        let Some(policy) = proc.redistribution.get(&protocol) else {
            continue;
        };
        let mut conjuncts = vec![protocol_term(protocol)];
        // Redistributed defaults only enter via default-information
        // originate, never via plain redistribution of protocols that can
        // carry one.
        if matches!(protocol, RouteProtocol::Static | RouteProtocol::Bgp) {
            conjuncts
                .push(PolicyExpr::Not(Box::new(PolicyExpr::match_default_route())));
        }
        if let Some(map) = checked_policy_ref(
            &policy.route_map,
            StructureUsage::OspfRedistributionMap,
            cfg,
            refs,
            diags,
        ) {
            conjuncts.push(PolicyExpr::CallPolicy(map));
        }
        let metric = policy
            .metric
            .or(proc.default_metric)
            .unwrap_or_else(|| default_redistribution_metric(protocol));
        stmts.push(PolicyStmt::If {
            guard: PolicyExpr::Conjunction(conjuncts),
            then: vec![
                PolicyStmt::SetOspfMetricType(
                    policy.metric_type.unwrap_or(OspfMetricType::Type2),
                ),
                PolicyStmt::SetMetric(metric),
                PolicyStmt::Return(Verdict::Accept),
            ],
            otherwise: Vec::new(),
        });
    }
    stmts.push(PolicyStmt::Return(Verdict::Reject));

    let export_policy = names::ospf_export(vrf_name);
    add_policy(
        model,
        RoutingPolicy { name: export_policy.clone(), stmts },
    )?;

    let vrf = model
        .vrfs
        .entry(vrf_name.to_owned())
        .or_insert_with(|| vireo_model::model::Vrf::new(vrf_name));
    vrf.ospf = Some(OspfConfig {
        router_id,
        areas,
        export_policy,
        reference_bandwidth: proc.reference_bandwidth,
        max_metric_router_lsa: proc.max_metric_router_lsa.clone(),
        generated_routes: generated,
    });
    Ok(())
}

// ===== helper functions =====

// Enrolls interfaces into areas by longest matching `network` statement
// against the interface's primary address, and records passive state on the
// model interface.
fn assign_areas(
    vrf_name: &str,
    proc: &OspfProcess,
    cfg: &VendorConfig,
    model: &mut Model,
) -> BTreeMap<u32, OspfArea> {
    let mut networks = proc.networks.clone();
    networks.sort_by_key(|network| Reverse(network.prefix.prefix()));

    let mut areas: BTreeMap<u32, OspfArea> = BTreeMap::new();
    for iface in cfg
        .interfaces
        .values()
        .filter(|iface| iface.vrf == vrf_name && iface.active)
    {
        let Some(addr) = iface.primary_address() else {
            continue;
        };
        let Some(network) =
            networks.iter().find(|network| network.prefix.contains(addr.ip()))
        else {
            continue;
        };
        areas
            .entry(network.area)
            .or_insert_with(|| OspfArea {
                id: network.area,
                interfaces: Default::default(),
                summary_filter: None,
            })
            .interfaces
            .insert(iface.name.clone());
        if proc.is_passive(&iface.name)
            && let Some(model_iface) = model.interfaces.get_mut(&iface.name)
        {
            model_iface.passive = true;
        }
    }
    areas
}

// Per-area summarization: a filter list suppressing routes covered by a
// summary (advertised summaries keep themselves, non-advertised ones do
// not), plus a discard route per summary so suppressed traffic blackholes
// locally instead of following the default.
fn convert_summaries(
    vrf_name: &str,
    proc: &OspfProcess,
    model: &mut Model,
    areas: &mut BTreeMap<u32, OspfArea>,
    generated: &mut Vec<GeneratedRoute>,
) {
    let admin = proc.distance.unwrap_or(DEFAULT_OSPF_ADMIN);
    for (area_id, summaries) in &proc.area_summaries {
        let list_name = names::ospf_summary_filter(vrf_name, *area_id);
        let mut lines = Vec::new();
        for (prefix, advertise) in summaries {
            let lower = if *advertise {
                prefix.prefix().saturating_add(1)
            } else {
                prefix.prefix()
            };
            lines.push(RouteFilterLine {
                action: LineAction::Deny,
                prefix: *prefix,
                lengths: lower..=32,
            });
            generated.push(GeneratedRoute {
                prefix: IpNetwork::V4(*prefix),
                admin,
                generation_policy: None,
                attribute_policy: None,
                discard: true,
            });
        }
        lines.push(RouteFilterLine {
            action: LineAction::Permit,
            prefix: "0.0.0.0/0".parse().unwrap(),
            lengths: 0..=32,
        });
        model.route_filter_lists.insert(
            list_name.clone(),
            RouteFilterList { name: list_name.clone(), lines },
        );
        areas
            .entry(*area_id)
            .or_insert_with(|| OspfArea {
                id: *area_id,
                interfaces: Default::default(),
                summary_filter: None,
            })
            .summary_filter = Some(list_name);
    }
}

fn convert_default_originate(
    vrf_name: &str,
    proc: &OspfProcess,
    cfg: &VendorConfig,
    stmts: &mut Vec<PolicyStmt>,
    generated: &mut Vec<GeneratedRoute>,
    refs: &mut References,
    diags: &mut Diagnostics,
) {
    let Some(originate) = &proc.default_information_originate else {
        return;
    };
    stmts.push(PolicyStmt::If {
        guard: PolicyExpr::Conjunction(vec![
            PolicyExpr::match_default_route(),
            PolicyExpr::MatchProtocol(RouteProtocol::Aggregate),
        ]),
        then: vec![
            PolicyStmt::SetOspfMetricType(
                originate.metric_type.unwrap_or(OspfMetricType::Type2),
            ),
            PolicyStmt::SetMetric(originate.metric.unwrap_or(1)),
            PolicyStmt::Return(Verdict::Accept),
        ],
        otherwise: Vec::new(),
    });

    let map = checked_policy_ref(
        &originate.route_map,
        StructureUsage::OspfDefaultOriginateMap,
        cfg,
        refs,
        diags,
    );
    // `always` generates unconditionally; otherwise the route-map decides
    // whether a default exists at all. Neither configured nor `always`
    // leaves the generated default contingent on nothing, so it is emitted
    // ungated too.
    let generation_policy = if originate.always { None } else { map };
    generated.push(GeneratedRoute {
        prefix: "0.0.0.0/0".parse().unwrap(),
        admin: MAX_ADMIN_DISTANCE,
        generation_policy,
        attribute_policy: None,
        discard: false,
    });
}

#[cfg(test)]
mod tests {
    use const_addrs::net4;
    use maplit::btreemap;
    use vireo_model::eval::apply_policy;
    use vireo_model::route::Route;
    use vireo_vendor::config::{DEFAULT_VRF, NamedRef};
    use vireo_vendor::igp::{OspfDefaultOriginate, OspfNetwork};

    use super::*;

    fn convert(
        cfg: &VendorConfig,
        proc: &OspfProcess,
    ) -> (Model, Diagnostics) {
        let mut model = Model::new("r1");
        for iface in cfg.interfaces.values() {
            model.interfaces.insert(
                iface.name.clone(),
                vireo_model::model::Interface {
                    name: iface.name.clone(),
                    vrf: iface.vrf.clone(),
                    addresses: iface
                        .addresses
                        .iter()
                        .copied()
                        .map(IpNetwork::V4)
                        .collect(),
                    active: iface.active,
                    passive: false,
                    incoming_transformation: None,
                    outgoing_transformation: None,
                },
            );
        }
        let mut refs = References::new();
        let mut diags = Diagnostics::new();
        convert_ospf(DEFAULT_VRF, proc, cfg, &mut model, &mut refs, &mut diags)
            .unwrap();
        (model, diags)
    }

    fn iface(name: &str, addr: &str) -> vireo_vendor::interface::Interface {
        let mut iface = vireo_vendor::interface::Interface::new(name);
        iface.addresses.push(addr.parse().unwrap());
        iface.active = true;
        iface
    }

    #[test]
    fn test_area_assignment_longest_match() {
        let mut cfg = VendorConfig::default();
        cfg.interfaces
            .insert("Ethernet0".to_owned(), iface("Ethernet0", "10.1.2.3/24"));
        cfg.interfaces
            .insert("Ethernet1".to_owned(), iface("Ethernet1", "10.9.0.1/24"));
        let mut proc = OspfProcess::new(1);
        proc.networks.push(OspfNetwork::new(net4!("10.0.0.0/8"), 0));
        proc.networks.push(OspfNetwork::new(net4!("10.1.0.0/16"), 1));

        let (model, _) = convert(&cfg, &proc);
        let ospf = model.vrfs[DEFAULT_VRF].ospf.as_ref().unwrap();
        assert!(ospf.areas[&1].interfaces.contains("Ethernet0"));
        assert!(ospf.areas[&0].interfaces.contains("Ethernet1"));
    }

    #[test]
    fn test_passive_interface_marked() {
        let mut cfg = VendorConfig::default();
        cfg.interfaces
            .insert("Ethernet0".to_owned(), iface("Ethernet0", "10.1.2.3/24"));
        let mut proc = OspfProcess::new(1);
        proc.networks.push(OspfNetwork::new(net4!("10.0.0.0/8"), 0));
        proc.passive_interfaces.insert("Ethernet0".to_owned());

        let (model, _) = convert(&cfg, &proc);
        assert!(model.interfaces["Ethernet0"].passive);
    }

    #[test]
    fn test_summary_filter_and_discard_route() {
        let mut proc = OspfProcess::new(1);
        proc.area_summaries.insert(
            0,
            btreemap! {
                net4!("10.0.0.0/16") => true,
                net4!("10.1.0.0/16") => false,
            },
        );

        let (model, _) = convert(&VendorConfig::default(), &proc);
        let list =
            &model.route_filter_lists[&names::ospf_summary_filter(DEFAULT_VRF, 0)];
        // More specifics of the advertised summary are suppressed, the
        // summary itself is not.
        assert!(!list.permits(&net4!("10.0.1.0/24")));
        assert!(list.permits(&net4!("10.0.0.0/16")));
        // Non-advertised summaries suppress themselves too.
        assert!(!list.permits(&net4!("10.1.0.0/16")));
        // Unrelated prefixes pass on the tail line.
        assert!(list.permits(&net4!("192.168.0.0/24")));

        let ospf = model.vrfs[DEFAULT_VRF].ospf.as_ref().unwrap();
        assert_eq!(ospf.generated_routes.len(), 2);
        assert!(ospf.generated_routes.iter().all(|route| {
            route.discard && route.admin == DEFAULT_OSPF_ADMIN
        }));
        assert_eq!(
            ospf.areas[&0].summary_filter.as_deref(),
            Some(names::ospf_summary_filter(DEFAULT_VRF, 0).as_str())
        );
    }

    #[test]
    fn test_redistribution_metric_defaults() {
        let mut proc = OspfProcess::new(1);
        proc.redistribution
            .entry(RouteProtocol::Connected)
            .or_default();
        proc.redistribution.entry(RouteProtocol::Bgp).or_default();

        let (model, _) = convert(&VendorConfig::default(), &proc);
        let export = names::ospf_export(DEFAULT_VRF);

        let connected =
            Route::new(net4!("10.0.0.0/24").into(), RouteProtocol::Connected);
        match apply_policy(&model, &export, &connected) {
            vireo_model::policy::PolicyResult::Accept(route) => {
                assert_eq!(route.metric, 20);
                assert_eq!(
                    route.ospf_metric_type,
                    Some(OspfMetricType::Type2)
                );
            }
            vireo_model::policy::PolicyResult::Reject => {
                panic!("expected accept")
            }
        }

        // Both eBGP and iBGP routes land on the BGP branch with metric 1.
        for protocol in [RouteProtocol::Bgp, RouteProtocol::Ibgp] {
            let route = Route::new(net4!("172.16.0.0/16").into(), protocol);
            match apply_policy(&model, &export, &route) {
                vireo_model::policy::PolicyResult::Accept(route) => {
                    assert_eq!(route.metric, 1);
                }
                vireo_model::policy::PolicyResult::Reject => {
                    panic!("expected accept")
                }
            }
        }

        // Redistributed defaults are excluded for BGP.
        let default = Route::new(net4!("0.0.0.0/0").into(), RouteProtocol::Bgp);
        assert!(apply_policy(&model, &export, &default).is_reject());
    }

    #[test]
    fn test_default_originate() {
        let mut proc = OspfProcess::new(1);
        proc.default_information_originate = Some(OspfDefaultOriginate {
            always: false,
            metric: Some(5),
            metric_type: Some(OspfMetricType::Type1),
            route_map: Some(NamedRef::new("GHOST".to_owned(), Some(3))),
        });

        let (model, diags) = convert(&VendorConfig::default(), &proc);
        let export = names::ospf_export(DEFAULT_VRF);
        let default =
            Route::new(net4!("0.0.0.0/0").into(), RouteProtocol::Aggregate);
        match apply_policy(&model, &export, &default) {
            vireo_model::policy::PolicyResult::Accept(route) => {
                assert_eq!(route.metric, 5);
                assert_eq!(
                    route.ospf_metric_type,
                    Some(OspfMetricType::Type1)
                );
            }
            vireo_model::policy::PolicyResult::Reject => {
                panic!("expected accept")
            }
        }
        // The dangling route-map is reported and the generated default is
        // left ungated.
        assert_eq!(diags.undefined_refs().len(), 1);
        let ospf = model.vrfs[DEFAULT_VRF].ospf.as_ref().unwrap();
        assert_eq!(ospf.generated_routes.len(), 1);
        assert!(ospf.generated_routes[0].generation_policy.is_none());
        assert_eq!(ospf.generated_routes[0].admin, MAX_ADMIN_DISTANCE);
    }
}
