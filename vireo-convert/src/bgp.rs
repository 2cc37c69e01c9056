//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! BGP conversion: template inheritance, the common export policy shared by
//! every neighbor, per-neighbor export/import policies and generated routes
//! (aggregates, default-originate).
//!
//! The common export policy decides which locally known routes are eligible
//! for BGP export at all: network statements, aggregate generation,
//! redistribution and already-BGP routes, each an independent reason in one
//! disjunction. Per-neighbor policies wrap a call to it by name.

use std::collections::BTreeMap;
use std::net::IpAddr;

use ipnetwork::IpNetwork;

use vireo_model::diag::{Diagnostics, StructureKind, StructureUsage};
use vireo_model::filter::{LineAction, RouteFilterLine, RouteFilterList};
use vireo_model::model::{
    AGGREGATE_ROUTE_ADMIN, BgpConfig, BgpPeer, GeneratedRoute,
    MAX_ADMIN_DISTANCE, Model, Vrf,
};
use vireo_model::policy::{
    PolicyExpr, PolicyStmt, PrefixRange, PrefixSetRef, RoutingPolicy, Verdict,
};
use vireo_model::route::{BgpOrigin, RouteProtocol};
use vireo_vendor::bgp::BgpProcess;
use vireo_vendor::config::{DEFAULT_VRF, VendorConfig};

use crate::convert::{add_policy, checked_policy_ref, protocol_term};
use crate::error::Error;
use crate::inherit::{self, ResolvedPeer};
use crate::names;
use crate::refs::References;
use crate::routerid::infer_router_id;

// Protocols BGP can redistribute from.
const REDISTRIBUTION_SOURCES: [RouteProtocol; 5] = [
    RouteProtocol::Connected,
    RouteProtocol::Static,
    RouteProtocol::Rip,
    RouteProtocol::Ospf,
    RouteProtocol::Eigrp,
];

pub fn convert_bgp(
    vrf_name: &str,
    proc: &BgpProcess,
    cfg: &VendorConfig,
    model: &mut Model,
    refs: &mut References,
    diags: &mut Diagnostics,
) -> Result<(), Error> {
    let outcome = inherit::resolve(proc, diags);

    // Non-default VRFs without an explicit router-id borrow the default
    // VRF's before falling back to interface inference.
    let explicit = proc.router_id.or_else(|| {
        (vrf_name != DEFAULT_VRF)
            .then(|| {
                cfg.vrfs
                    .get(DEFAULT_VRF)
                    .and_then(|vrf| vrf.bgp.as_ref())
                    .and_then(|bgp| bgp.router_id)
            })
            .flatten()
    });
    let router_id =
        infer_router_id(explicit, cfg.dialect, &cfg.interfaces, diags);

    let mut generated = Vec::new();
    let common_name =
        common_export(vrf_name, proc, cfg, model, &mut generated, refs, diags)?;

    let mut neighbors = BTreeMap::new();
    for peer in &outcome.peers {
        if let Some((addr, neighbor)) = convert_peer(
            vrf_name,
            peer,
            proc,
            &common_name,
            router_id,
            cfg,
            model,
            refs,
            diags,
        )? {
            neighbors.insert(addr, neighbor);
        }
    }

    let vrf = model
        .vrfs
        .entry(vrf_name.to_owned())
        .or_insert_with(|| Vrf::new(vrf_name));
    vrf.generated_routes.extend(generated);
    vrf.bgp = Some(BgpConfig {
        router_id,
        neighbors,
        multipath_ebgp: proc.maximum_paths_ebgp > 1,
        multipath_ibgp: proc.maximum_paths_ibgp > 1,
    });
    Ok(())
}

// ===== helper functions =====

// Builds the per-VRF common export policy and the aggregate generated
// routes, returning the policy name.
fn common_export(
    vrf_name: &str,
    proc: &BgpProcess,
    cfg: &VendorConfig,
    model: &mut Model,
    generated: &mut Vec<GeneratedRoute>,
    refs: &mut References,
    diags: &mut Diagnostics,
) -> Result<String, Error> {
    let mut stmts = Vec::new();

    // Routes strictly more specific than a summary-only aggregate are
    // suppressed before any export reason is considered.
    let summary_only: Vec<_> =
        proc.aggregates.iter().filter(|agg| agg.summary_only).collect();
    if !summary_only.is_empty() {
        let list_name = names::suppress_summary_only(vrf_name);
        let list = RouteFilterList {
            name: list_name.clone(),
            lines: summary_only
                .iter()
                .map(|agg| RouteFilterLine {
                    action: LineAction::Permit,
                    prefix: agg.prefix,
                    lengths: agg.prefix.prefix().saturating_add(1)..=32,
                })
                .collect(),
        };
        model.route_filter_lists.insert(list_name.clone(), list);
        stmts.push(PolicyStmt::If {
            guard: PolicyExpr::MatchPrefixSet(PrefixSetRef::Named(list_name)),
            then: vec![PolicyStmt::Return(Verdict::Reject)],
            otherwise: Vec::new(),
        });
    }

    let mut disjuncts = Vec::new();

    // Aggregate generation conditions, plus a generated route carrying the
    // aggregate itself.
    for agg in &proc.aggregates {
        let prefix = IpNetwork::V4(agg.prefix);
        let attribute_map = checked_policy_ref(
            &agg.attribute_map,
            StructureUsage::BgpAggregateAttributeMap,
            cfg,
            refs,
            diags,
        );
        let attr_expr = attribute_map
            .clone()
            .map(PolicyExpr::CallPolicy)
            .unwrap_or(PolicyExpr::Constant(true));
        disjuncts.push(PolicyExpr::Conjunction(vec![
            PolicyExpr::MatchPrefixSet(PrefixSetRef::Explicit(vec![
                PrefixRange::exact(prefix),
            ])),
            PolicyExpr::MatchProtocol(RouteProtocol::Aggregate),
            PolicyExpr::WithIntermediateAttrs {
                expr: Box::new(attr_expr),
                on_match: vec![PolicyStmt::SetOrigin(BgpOrigin::Igp)],
            },
        ]));

        let gen_name = names::aggregate_gen(vrf_name, &agg.prefix);
        add_policy(
            model,
            RoutingPolicy {
                name: gen_name.clone(),
                stmts: vec![PolicyStmt::If {
                    // The aggregate exists when any strictly more specific
                    // contributing route does.
                    guard: PolicyExpr::MatchPrefixSet(PrefixSetRef::Explicit(
                        vec![PrefixRange::more_specific(prefix)],
                    )),
                    then: vec![PolicyStmt::Return(Verdict::Accept)],
                    otherwise: vec![PolicyStmt::Return(Verdict::Reject)],
                }],
            },
        )?;
        generated.push(GeneratedRoute {
            prefix,
            admin: AGGREGATE_ROUTE_ADMIN,
            generation_policy: Some(gen_name),
            attribute_policy: attribute_map,
            discard: !agg.as_set,
        });
    }

    // IPv6 aggregates contribute generated routes only; the v4 export
    // prefilter does not see them.
    for agg in &proc.aggregates6 {
        let prefix = IpNetwork::V6(agg.prefix);
        let attribute_map = checked_policy_ref(
            &agg.attribute_map,
            StructureUsage::BgpAggregateAttributeMap,
            cfg,
            refs,
            diags,
        );
        let gen_name = names::aggregate_gen(vrf_name, &agg.prefix);
        add_policy(
            model,
            RoutingPolicy {
                name: gen_name.clone(),
                stmts: vec![PolicyStmt::If {
                    guard: PolicyExpr::MatchPrefix6Set(PrefixSetRef::Explicit(
                        vec![PrefixRange::more_specific(prefix)],
                    )),
                    then: vec![PolicyStmt::Return(Verdict::Accept)],
                    otherwise: vec![PolicyStmt::Return(Verdict::Reject)],
                }],
            },
        )?;
        generated.push(GeneratedRoute {
            prefix,
            admin: AGGREGATE_ROUTE_ADMIN,
            generation_policy: Some(gen_name),
            attribute_policy: attribute_map,
            discard: !agg.as_set,
        });
    }

    // One branch per enabled redistribution source.
    for protocol in REDISTRIBUTION_SOURCES {
        let Some(policy) = proc.redistribution.get(&protocol) else {
            continue;
        };
        let mut conjuncts = vec![protocol_term(protocol)];
        if !proc.default_information_originate {
            conjuncts
                .push(PolicyExpr::Not(Box::new(PolicyExpr::match_default_route())));
        }
        let map_expr = checked_policy_ref(
            &policy.route_map,
            StructureUsage::BgpRedistributionMap,
            cfg,
            refs,
            diags,
        )
        .map(PolicyExpr::CallPolicy)
        .unwrap_or(PolicyExpr::Constant(true));
        let mut on_match = vec![PolicyStmt::SetOrigin(BgpOrigin::Incomplete)];
        if let Some(metric) = policy.metric.or(proc.default_metric) {
            on_match.push(PolicyStmt::SetMetric(metric));
        }
        conjuncts.push(PolicyExpr::WithIntermediateAttrs {
            expr: Box::new(map_expr),
            on_match,
        });
        disjuncts.push(PolicyExpr::Conjunction(conjuncts));
    }

    // Network statements export matching routes from any protocol except
    // ones already sourced from BGP or aggregation, which would re-export
    // in a loop.
    for network in &proc.networks {
        let map_expr = checked_policy_ref(
            &network.route_map,
            StructureUsage::BgpNetworkRouteMap,
            cfg,
            refs,
            diags,
        )
        .map(PolicyExpr::CallPolicy)
        .unwrap_or(PolicyExpr::Constant(true));
        disjuncts.push(PolicyExpr::Conjunction(vec![
            PolicyExpr::MatchPrefixSet(PrefixSetRef::Explicit(vec![
                PrefixRange::exact(IpNetwork::V4(network.prefix)),
            ])),
            PolicyExpr::Not(Box::new(PolicyExpr::MatchProtocol(
                RouteProtocol::Bgp,
            ))),
            PolicyExpr::Not(Box::new(PolicyExpr::MatchProtocol(
                RouteProtocol::Ibgp,
            ))),
            PolicyExpr::Not(Box::new(PolicyExpr::MatchProtocol(
                RouteProtocol::Aggregate,
            ))),
            PolicyExpr::WithIntermediateAttrs {
                expr: Box::new(map_expr),
                on_match: vec![PolicyStmt::SetOrigin(BgpOrigin::Igp)],
            },
        ]));
    }

    // Routes already in BGP pass unconditionally.
    disjuncts.push(PolicyExpr::MatchProtocol(RouteProtocol::Bgp));
    disjuncts.push(PolicyExpr::MatchProtocol(RouteProtocol::Ibgp));

    stmts.push(PolicyStmt::If {
        guard: PolicyExpr::Disjunction(disjuncts),
        then: vec![PolicyStmt::Return(Verdict::Accept)],
        otherwise: Vec::new(),
    });
    stmts.push(PolicyStmt::Return(Verdict::Reject));

    let name = names::bgp_common_export(vrf_name);
    add_policy(model, RoutingPolicy { name: name.clone(), stmts })?;
    Ok(name)
}

fn convert_peer(
    vrf_name: &str,
    peer: &ResolvedPeer,
    proc: &BgpProcess,
    common_name: &str,
    router_id: std::net::Ipv4Addr,
    cfg: &VendorConfig,
    model: &mut Model,
    refs: &mut References,
    diags: &mut Diagnostics,
) -> Result<Option<(IpNetwork, BgpPeer)>, Error> {
    let Some(remote_as) = peer.cfg.remote_as else {
        diags.advisory(format!(
            "bgp neighbor {} has no remote-as and was skipped",
            peer.addr,
        ));
        return Ok(None);
    };
    if peer.addr.ip().is_unspecified() {
        diags.advisory(format!(
            "bgp neighbor {} has no usable address and was skipped",
            peer.addr,
        ));
        return Ok(None);
    }
    let shutdown = peer.cfg.shutdown.unwrap_or(false);
    let default_originate = peer.cfg.default_originate.unwrap_or(false);

    // Export policy: unconditional side effects first, then one guarded
    // verdict.
    let mut stmts = Vec::new();
    if peer.cfg.next_hop_self.unwrap_or(false) {
        stmts.push(PolicyStmt::SetNextHop(
            vireo_model::policy::NextHopExpr::SelfAddress,
        ));
    }
    if peer.cfg.remove_private_as.unwrap_or(false) {
        stmts.push(PolicyStmt::RemovePrivateAs);
    }

    let mut export_reasons =
        vec![PolicyExpr::CallPolicy(common_name.to_owned())];
    if default_originate {
        export_reasons.push(PolicyExpr::match_default_route());
    }
    let mut conjuncts = vec![PolicyExpr::Disjunction(export_reasons)];
    if let Some(constraint) = outbound_constraint(peer, cfg, refs, diags) {
        conjuncts.push(constraint);
    }
    stmts.push(PolicyStmt::If {
        guard: PolicyExpr::Conjunction(conjuncts),
        then: vec![PolicyStmt::Return(Verdict::Accept)],
        otherwise: vec![PolicyStmt::Return(Verdict::Reject)],
    });

    let export_name = names::bgp_peer_export(vrf_name, &peer.addr);
    add_policy(model, RoutingPolicy { name: export_name.clone(), stmts })?;

    // Default-originate generates a default route toward this neighbor,
    // gated by the configured map or a synthesized aggregate-style policy.
    let mut generated_routes = Vec::new();
    if default_originate {
        let generation_policy = match checked_policy_ref(
            &peer.cfg.default_originate_map,
            StructureUsage::BgpDefaultOriginateMap,
            cfg,
            refs,
            diags,
        ) {
            Some(map) => map,
            None => {
                let gen_name =
                    names::bgp_default_originate(vrf_name, &peer.addr);
                add_policy(
                    model,
                    RoutingPolicy {
                        name: gen_name.clone(),
                        stmts: vec![PolicyStmt::If {
                            guard: PolicyExpr::Conjunction(vec![
                                PolicyExpr::match_default_route(),
                                PolicyExpr::MatchProtocol(
                                    RouteProtocol::Aggregate,
                                ),
                            ]),
                            then: vec![PolicyStmt::Return(Verdict::Accept)],
                            otherwise: vec![PolicyStmt::Return(
                                Verdict::Reject,
                            )],
                        }],
                    },
                )?;
                gen_name
            }
        };
        generated_routes.push(GeneratedRoute {
            prefix: "0.0.0.0/0".parse().unwrap(),
            admin: MAX_ADMIN_DISTANCE,
            generation_policy: Some(generation_policy),
            attribute_policy: None,
            discard: false,
        });
    }

    let import_policy =
        import_policy(vrf_name, peer, cfg, model, refs, diags)?;
    let update_source = resolve_update_source(peer, vrf_name, shutdown, cfg, diags);

    let neighbor = BgpPeer {
        remote_as,
        local_as: peer.cfg.local_as,
        description: peer.cfg.description.clone(),
        group: peer.group.clone(),
        cluster_id: Some(
            peer.cfg
                .cluster_id
                .or(proc.cluster_id)
                .unwrap_or(router_id),
        ),
        route_reflector_client: peer
            .cfg
            .route_reflector_client
            .unwrap_or(false),
        send_community: peer.cfg.send_community.unwrap_or(false),
        update_source,
        ebgp_multihop: peer.cfg.ebgp_multihop.unwrap_or(false),
        shutdown,
        dynamic: match peer.addr {
            IpNetwork::V4(addr) => addr.prefix() < 32,
            IpNetwork::V6(addr) => addr.prefix() < 128,
        },
        export_policy: export_name,
        import_policy,
        generated_routes,
    };
    Ok(Some((peer.addr, neighbor)))
}

// Outbound filter with route-map > prefix-list > distribute-list
// precedence; only the strongest configured kind is honored.
fn outbound_constraint(
    peer: &ResolvedPeer,
    cfg: &VendorConfig,
    refs: &mut References,
    diags: &mut Diagnostics,
) -> Option<PolicyExpr> {
    let configured = [
        peer.cfg.route_map_out.is_some(),
        peer.cfg.prefix_list_out.is_some(),
        peer.cfg.distribute_list_out.is_some(),
    ]
    .into_iter()
    .filter(|present| *present)
    .count();
    if configured > 1 {
        diags.advisory(format!(
            "bgp neighbor {} has multiple outbound filters; \
             only the highest-precedence one is honored",
            peer.addr,
        ));
    }

    if peer.cfg.route_map_out.is_some() {
        return checked_policy_ref(
            &peer.cfg.route_map_out,
            StructureUsage::BgpOutboundRouteMap,
            cfg,
            refs,
            diags,
        )
        .map(PolicyExpr::CallPolicy);
    }
    if let Some(list) = &peer.cfg.prefix_list_out {
        refs.note(StructureKind::PrefixList, &list.name);
        if !cfg.prefix_lists.contains_key(&list.name) {
            diags.undefined(
                StructureKind::PrefixList,
                &list.name,
                StructureUsage::BgpOutboundPrefixList,
                list.line,
            );
            return None;
        }
        return Some(PolicyExpr::MatchPrefixSet(PrefixSetRef::Named(
            list.name.clone(),
        )));
    }
    if let Some(list) = &peer.cfg.distribute_list_out {
        refs.note(StructureKind::AccessList, &list.name);
        if !cfg.access_lists.contains_key(&list.name) {
            diags.undefined(
                StructureKind::AccessList,
                &list.name,
                StructureUsage::BgpOutboundDistributeList,
                list.line,
            );
            return None;
        }
        return Some(PolicyExpr::MatchPrefixSet(PrefixSetRef::Named(
            list.name.clone(),
        )));
    }
    None
}

// Import constraint, same precedence order as export. A route-map is used
// directly as the peer's import policy; list-based constraints get a small
// wrapper policy; no constraint means accept-everything and no policy.
fn import_policy(
    vrf_name: &str,
    peer: &ResolvedPeer,
    cfg: &VendorConfig,
    model: &mut Model,
    refs: &mut References,
    diags: &mut Diagnostics,
) -> Result<Option<String>, Error> {
    let configured = [
        peer.cfg.route_map_in.is_some(),
        peer.cfg.prefix_list_in.is_some(),
        peer.cfg.distribute_list_in.is_some(),
    ]
    .into_iter()
    .filter(|present| *present)
    .count();
    if configured > 1 {
        diags.advisory(format!(
            "bgp neighbor {} has multiple inbound filters; \
             only the highest-precedence one is honored",
            peer.addr,
        ));
    }

    if peer.cfg.route_map_in.is_some() {
        return Ok(checked_policy_ref(
            &peer.cfg.route_map_in,
            StructureUsage::BgpInboundRouteMap,
            cfg,
            refs,
            diags,
        ));
    }

    let list_name = if let Some(list) = &peer.cfg.prefix_list_in {
        refs.note(StructureKind::PrefixList, &list.name);
        if !cfg.prefix_lists.contains_key(&list.name) {
            diags.undefined(
                StructureKind::PrefixList,
                &list.name,
                StructureUsage::BgpInboundPrefixList,
                list.line,
            );
            return Ok(None);
        }
        list.name.clone()
    } else if let Some(list) = &peer.cfg.distribute_list_in {
        refs.note(StructureKind::AccessList, &list.name);
        if !cfg.access_lists.contains_key(&list.name) {
            diags.undefined(
                StructureKind::AccessList,
                &list.name,
                StructureUsage::BgpInboundDistributeList,
                list.line,
            );
            return Ok(None);
        }
        list.name.clone()
    } else {
        return Ok(None);
    };

    let name = names::bgp_peer_import(vrf_name, &peer.addr);
    add_policy(
        model,
        RoutingPolicy {
            name: name.clone(),
            stmts: vec![PolicyStmt::If {
                guard: PolicyExpr::MatchPrefixSet(PrefixSetRef::Named(
                    list_name,
                )),
                then: vec![PolicyStmt::Return(Verdict::Accept)],
                otherwise: vec![PolicyStmt::Return(Verdict::Reject)],
            }],
        },
    )?;
    Ok(Some(name))
}

// Local address of the session: the configured update-source interface's
// primary address, or the address of a VRF interface on the peer's subnet.
fn resolve_update_source(
    peer: &ResolvedPeer,
    vrf_name: &str,
    shutdown: bool,
    cfg: &VendorConfig,
    diags: &mut Diagnostics,
) -> Option<IpAddr> {
    if let Some(source) = &peer.cfg.update_source {
        match cfg.interfaces.get(&source.name) {
            Some(iface) => match iface.primary_address() {
                Some(prefix) => return Some(IpAddr::V4(prefix.ip())),
                None => diags.advisory(format!(
                    "bgp update-source interface {} has no address",
                    source.name,
                )),
            },
            None => diags.undefined(
                StructureKind::Interface,
                &source.name,
                StructureUsage::BgpUpdateSource,
                source.line,
            ),
        }
    }

    let IpAddr::V4(peer_addr) = peer.addr.ip() else {
        return None;
    };
    // Last matching interface wins, in name order.
    let mut found = None;
    for iface in cfg
        .interfaces
        .values()
        .filter(|iface| iface.vrf == vrf_name && iface.active)
    {
        for addr in &iface.addresses {
            if addr.contains(peer_addr) {
                found = Some(IpAddr::V4(addr.ip()));
            }
        }
    }
    if found.is_none() && !shutdown {
        diags.advisory(format!(
            "unable to determine update source for bgp neighbor {}",
            peer.addr,
        ));
    }
    found
}

#[cfg(test)]
mod tests {
    use const_addrs::{ip4, net, net4};
    use vireo_model::eval::apply_policy;
    use vireo_model::route::Route;
    use vireo_vendor::bgp::{BgpAggregate, LeafPeer};
    use vireo_vendor::config::NamedRef;

    use super::*;

    fn convert(
        cfg: &VendorConfig,
        proc: &BgpProcess,
    ) -> (Model, Diagnostics) {
        let mut model = Model::new("r1");
        model.vrfs.insert(DEFAULT_VRF.to_owned(), Vrf::new(DEFAULT_VRF));
        let mut refs = References::new();
        let mut diags = Diagnostics::new();
        convert_bgp(DEFAULT_VRF, proc, cfg, &mut model, &mut refs, &mut diags)
            .unwrap();
        (model, diags)
    }

    fn leaf(addr: &str, cfg: vireo_vendor::bgp::PeerCfg) -> LeafPeer {
        let mut leaf = LeafPeer::new(addr.parse().unwrap());
        leaf.cfg = cfg;
        leaf
    }

    #[test]
    fn test_summary_only_aggregate_suppression() {
        let mut proc = BgpProcess::new(65000);
        proc.aggregates.push(BgpAggregate {
            prefix: net4!("10.0.0.0/16"),
            summary_only: true,
            as_set: false,
            attribute_map: None,
        });

        let (model, _) = convert(&VendorConfig::default(), &proc);
        let common = names::bgp_common_export(DEFAULT_VRF);

        // A strictly more specific learned route is suppressed.
        let specific = Route::new(net!("10.0.1.0/24"), RouteProtocol::Ospf);
        assert!(apply_policy(&model, &common, &specific).is_reject());

        // The aggregate itself is exported with IGP origin.
        let aggregate =
            Route::new(net!("10.0.0.0/16"), RouteProtocol::Aggregate);
        match apply_policy(&model, &common, &aggregate) {
            vireo_model::policy::PolicyResult::Accept(route) => {
                assert_eq!(route.origin, Some(BgpOrigin::Igp));
            }
            vireo_model::policy::PolicyResult::Reject => {
                panic!("expected accept")
            }
        }

        // The generated aggregate route exists only while a contributing
        // route does.
        let vrf = &model.vrfs[DEFAULT_VRF];
        let generated = &vrf.generated_routes[0];
        assert_eq!(generated.admin, AGGREGATE_ROUTE_ADMIN);
        assert!(generated.discard);
        let gen_policy = generated.generation_policy.as_ref().unwrap();
        assert!(apply_policy(&model, gen_policy, &specific).is_accept());
        assert!(apply_policy(&model, gen_policy, &aggregate).is_reject());
    }

    #[test]
    fn test_non_summary_aggregate_suppresses_nothing() {
        let mut proc = BgpProcess::new(65000);
        proc.aggregates.push(BgpAggregate {
            prefix: net4!("10.0.0.0/16"),
            summary_only: false,
            as_set: false,
            attribute_map: None,
        });
        proc.redistribution
            .entry(RouteProtocol::Ospf)
            .or_default();

        let (model, _) = convert(&VendorConfig::default(), &proc);
        let common = names::bgp_common_export(DEFAULT_VRF);
        let specific = Route::new(net!("10.0.1.0/24"), RouteProtocol::Ospf);
        assert!(apply_policy(&model, &common, &specific).is_accept());
    }

    #[test]
    fn test_missing_outbound_route_map() {
        let mut proc = BgpProcess::new(65000);
        let mut cfg = vireo_vendor::bgp::PeerCfg::default();
        cfg.remote_as = Some(65001);
        cfg.route_map_out = Some(NamedRef::new("GHOST".to_owned(), Some(7)));
        proc.neighbors.push(leaf("192.0.2.1/32", cfg));

        let (model, diags) = convert(&VendorConfig::default(), &proc);
        // The export policy is still synthesized, without the constraint.
        let export = names::bgp_peer_export(
            DEFAULT_VRF,
            &"192.0.2.1/32".parse::<IpNetwork>().unwrap(),
        );
        assert!(model.policies.contains_key(&export));
        assert!(diags.has_undefined(StructureKind::RouteMap, "GHOST"));
        assert_eq!(
            diags
                .undefined_refs()
                .iter()
                .filter(|record| record.name == "GHOST")
                .count(),
            1
        );

        // Without the constraint, already-BGP routes flow through.
        let route = Route::new(net!("10.0.0.0/8"), RouteProtocol::Bgp);
        assert!(apply_policy(&model, &export, &route).is_accept());
    }

    #[test]
    fn test_default_originate_export_path() {
        let mut proc = BgpProcess::new(65000);
        let mut peer_cfg = vireo_vendor::bgp::PeerCfg::default();
        peer_cfg.remote_as = Some(65001);
        peer_cfg.default_originate = Some(true);
        proc.neighbors.push(leaf("192.0.2.1/32", peer_cfg));

        let (model, _) = convert(&VendorConfig::default(), &proc);
        let export = names::bgp_peer_export(
            DEFAULT_VRF,
            &"192.0.2.1/32".parse::<IpNetwork>().unwrap(),
        );

        // The default route passes peer export even though the common
        // policy rejects it.
        let default = Route::new(net!("0.0.0.0/0"), RouteProtocol::Aggregate);
        assert!(apply_policy(&model, &export, &default).is_accept());

        // And the peer carries a generated default gated by the
        // synthesized policy.
        let peer = &model.vrfs[DEFAULT_VRF].bgp.as_ref().unwrap().neighbors
            [&"192.0.2.1/32".parse::<IpNetwork>().unwrap()];
        assert_eq!(peer.generated_routes.len(), 1);
        assert_eq!(peer.generated_routes[0].admin, MAX_ADMIN_DISTANCE);
        let r#gen = peer.generated_routes[0].generation_policy.as_ref().unwrap();
        assert!(apply_policy(&model, r#gen, &default).is_accept());
    }

    #[test]
    fn test_multiple_outbound_filters_advisory() {
        let mut cfg = VendorConfig::default();
        cfg.prefix_lists.insert(
            "PL".to_owned(),
            vireo_vendor::acl::PrefixList::new("PL"),
        );
        let mut map = vireo_vendor::routemap::RouteMap::new("RM");
        map.clauses.insert(
            10,
            vireo_vendor::routemap::RouteMapClause::new(
                10,
                LineAction::Permit,
            ),
        );
        cfg.route_maps.insert("RM".to_owned(), map);

        let mut proc = BgpProcess::new(65000);
        let mut peer_cfg = vireo_vendor::bgp::PeerCfg::default();
        peer_cfg.remote_as = Some(65001);
        peer_cfg.route_map_out = Some(NamedRef::new("RM".to_owned(), None));
        peer_cfg.prefix_list_out = Some(NamedRef::new("PL".to_owned(), None));
        proc.neighbors.push(leaf("192.0.2.1/32", peer_cfg));

        let (_, diags) = convert(&cfg, &proc);
        assert!(
            diags
                .advisories()
                .iter()
                .any(|msg| msg.contains("multiple outbound filters")),
            "{:?}",
            diags.advisories()
        );
    }

    #[test]
    fn test_network_statement_excludes_bgp_sourced() {
        let mut proc = BgpProcess::new(65000);
        proc.networks.push(vireo_vendor::bgp::BgpNetwork {
            prefix: net4!("172.16.0.0/16"),
            route_map: None,
        });

        let (model, _) = convert(&VendorConfig::default(), &proc);
        let common = names::bgp_common_export(DEFAULT_VRF);
        let connected =
            Route::new(net!("172.16.0.0/16"), RouteProtocol::Connected);
        assert!(apply_policy(&model, &common, &connected).is_accept());
        // Already-aggregate routes do not match the network branch, but
        // BGP routes pass on the unconditional branch.
        let aggregate =
            Route::new(net!("172.16.0.0/16"), RouteProtocol::Aggregate);
        assert!(apply_policy(&model, &common, &aggregate).is_reject());
    }

    #[test]
    fn test_cluster_id_precedence() {
        let mut proc = BgpProcess::new(65000);
        proc.router_id = Some(ip4!("192.0.2.100"));
        proc.cluster_id = Some(ip4!("192.0.2.200"));
        let mut with_own = vireo_vendor::bgp::PeerCfg::default();
        with_own.remote_as = Some(65000);
        with_own.cluster_id = Some(ip4!("1.2.3.4"));
        proc.neighbors.push(leaf("192.0.2.1/32", with_own));
        let mut without = vireo_vendor::bgp::PeerCfg::default();
        without.remote_as = Some(65000);
        proc.neighbors.push(leaf("192.0.2.2/32", without));

        let (model, _) = convert(&VendorConfig::default(), &proc);
        let bgp = model.vrfs[DEFAULT_VRF].bgp.as_ref().unwrap();
        let first =
            &bgp.neighbors[&"192.0.2.1/32".parse::<IpNetwork>().unwrap()];
        assert_eq!(first.cluster_id, Some(ip4!("1.2.3.4")));
        let second =
            &bgp.neighbors[&"192.0.2.2/32".parse::<IpNetwork>().unwrap()];
        assert_eq!(second.cluster_id, Some(ip4!("192.0.2.200")));
    }
}
