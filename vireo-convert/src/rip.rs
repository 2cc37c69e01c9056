//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! RIP conversion. Interfaces enroll by exact match between their connected
//! network and a `network` statement; the export policy carries
//! default-information origination and redistribution.

use std::collections::BTreeSet;

use vireo_model::diag::{Diagnostics, StructureUsage};
use vireo_model::ip::Ipv4NetworkExt;
use vireo_model::model::{
    GeneratedRoute, MAX_ADMIN_DISTANCE, Model, RipConfig,
};
use vireo_model::policy::{PolicyExpr, PolicyStmt, RoutingPolicy, Verdict};
use vireo_model::route::RouteProtocol;
use vireo_vendor::config::VendorConfig;
use vireo_vendor::igp::RipProcess;

use crate::convert::{add_policy, checked_policy_ref, protocol_term};
use crate::error::Error;
use crate::names;
use crate::refs::References;

const REDISTRIBUTION_SOURCES: [RouteProtocol; 5] = [
    RouteProtocol::Connected,
    RouteProtocol::Static,
    RouteProtocol::Bgp,
    RouteProtocol::Ospf,
    RouteProtocol::Eigrp,
];

pub fn convert_rip(
    vrf_name: &str,
    proc: &RipProcess,
    cfg: &VendorConfig,
    model: &mut Model,
    refs: &mut References,
    diags: &mut Diagnostics,
) -> Result<(), Error> {
    let mut interfaces = BTreeSet::new();
    for iface in cfg
        .interfaces
        .values()
        .filter(|iface| iface.vrf == vrf_name && iface.active)
    {
        let Some(addr) = iface.primary_address() else {
            continue;
        };
        if !proc.networks.contains(&addr.apply_mask()) {
            continue;
        }
        interfaces.insert(iface.name.clone());
        if proc.is_passive(&iface.name)
            && let Some(model_iface) = model.interfaces.get_mut(&iface.name)
        {
            model_iface.passive = true;
        }
    }

    let mut stmts = Vec::new();
    let mut generated = Vec::new();
    if proc.default_information_originate {
        stmts.push(PolicyStmt::If {
            guard: PolicyExpr::Conjunction(vec![
                PolicyExpr::match_default_route(),
                PolicyExpr::MatchProtocol(RouteProtocol::Aggregate),
            ]),
            then: vec![
                PolicyStmt::SetMetric(
                    proc.default_information_metric.unwrap_or(1),
                ),
                PolicyStmt::Return(Verdict::Accept),
            ],
            otherwise: Vec::new(),
        });
        let generation_policy = checked_policy_ref(
            &proc.default_information_originate_map,
            StructureUsage::RipDefaultOriginateMap,
            cfg,
            refs,
            diags,
        );
        generated.push(GeneratedRoute {
            prefix: "0.0.0.0/0".parse().unwrap(),
            admin: MAX_ADMIN_DISTANCE,
            generation_policy,
            attribute_policy: None,
            discard: false,
        });
    }

    for protocol in REDISTRIBUTION_SOURCES {
        let Some(policy) = proc.redistribution.get(&protocol) else {
            continue;
        };
        let mut conjuncts = vec![protocol_term(protocol)];
        if matches!(protocol, RouteProtocol::Static | RouteProtocol::Bgp) {
            conjuncts
                .push(PolicyExpr::Not(Box::new(PolicyExpr::match_default_route())));
        }
        if let Some(map) = checked_policy_ref(
            &policy.route_map,
            StructureUsage::RipRedistributionMap,
            cfg,
            refs,
            diags,
        ) {
            conjuncts.push(PolicyExpr::CallPolicy(map));
        }
        stmts.push(PolicyStmt::If {
            guard: PolicyExpr::Conjunction(conjuncts),
            then: vec![
                PolicyStmt::SetMetric(policy.metric.unwrap_or(1)),
                PolicyStmt::Return(Verdict::Accept),
            ],
            otherwise: Vec::new(),
        });
    }
    stmts.push(PolicyStmt::Return(Verdict::Reject));

    let export_policy = names::rip_export(vrf_name);
    add_policy(
        model,
        RoutingPolicy { name: export_policy.clone(), stmts },
    )?;

    let vrf = model
        .vrfs
        .entry(vrf_name.to_owned())
        .or_insert_with(|| vireo_model::model::Vrf::new(vrf_name));
    vrf.rip = Some(RipConfig {
        interfaces,
        export_policy,
        generated_routes: generated,
    });
    Ok(())
}
