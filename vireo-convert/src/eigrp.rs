//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! EIGRP conversion. The composite metric is opaque to the model, so
//! redistribution into EIGRP requires an explicit metric for protocols
//! without a native one; statements lacking it are dropped with an
//! advisory, matching the vendor behavior of never installing them.

use std::collections::BTreeSet;

use vireo_model::diag::{Diagnostics, StructureUsage};
use vireo_model::ip::Ipv4NetworkExt;
use vireo_model::model::{EigrpConfig, Model};
use vireo_model::policy::{PolicyExpr, PolicyStmt, RoutingPolicy, Verdict};
use vireo_model::route::RouteProtocol;
use vireo_vendor::config::VendorConfig;
use vireo_vendor::igp::EigrpProcess;

use crate::convert::{add_policy, checked_policy_ref, protocol_term};
use crate::error::Error;
use crate::names;
use crate::refs::References;

const REDISTRIBUTION_SOURCES: [RouteProtocol; 5] = [
    RouteProtocol::Connected,
    RouteProtocol::Static,
    RouteProtocol::Bgp,
    RouteProtocol::Rip,
    RouteProtocol::Ospf,
];

pub fn convert_eigrp(
    vrf_name: &str,
    proc: &EigrpProcess,
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
        if proc.networks.contains(&addr.apply_mask()) {
            interfaces.insert(iface.name.clone());
        }
    }

    let mut stmts = Vec::new();
    for protocol in REDISTRIBUTION_SOURCES {
        let Some(policy) = proc.redistribution.get(&protocol) else {
            continue;
        };
        let metric = policy.metric.or(proc.default_metric);
        // Connected and static routes redistribute without a seed metric;
        // everything else needs one.
        if metric.is_none()
            && !matches!(
                protocol,
                RouteProtocol::Connected | RouteProtocol::Static
            )
        {
            diags.advisory(format!(
                "eigrp {} redistribution of {:?} has no metric and was \
                 dropped",
                proc.asn, protocol,
            ));
            continue;
        }
        let mut conjuncts = vec![protocol_term(protocol)];
        if matches!(protocol, RouteProtocol::Static | RouteProtocol::Bgp) {
            conjuncts
                .push(PolicyExpr::Not(Box::new(PolicyExpr::match_default_route())));
        }
        if let Some(map) = checked_policy_ref(
            &policy.route_map,
            StructureUsage::EigrpRedistributionMap,
            cfg,
            refs,
            diags,
        ) {
            conjuncts.push(PolicyExpr::CallPolicy(map));
        }
        let mut then = Vec::new();
        if let Some(metric) = metric {
            then.push(PolicyStmt::SetMetric(metric));
        }
        then.push(PolicyStmt::Return(Verdict::Accept));
        stmts.push(PolicyStmt::If {
            guard: PolicyExpr::Conjunction(conjuncts),
            then,
            otherwise: Vec::new(),
        });
    }
    stmts.push(PolicyStmt::Return(Verdict::Reject));

    let export_policy = names::eigrp_export(vrf_name);
    add_policy(
        model,
        RoutingPolicy { name: export_policy.clone(), stmts },
    )?;

    let vrf = model
        .vrfs
        .entry(vrf_name.to_owned())
        .or_insert_with(|| vireo_model::model::Vrf::new(vrf_name));
    vrf.eigrp = Some(EigrpConfig {
        asn: proc.asn,
        interfaces,
        export_policy,
    });
    Ok(())
}
