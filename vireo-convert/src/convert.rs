//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! Top-level conversion driver. One [`convert`] call turns a parsed
//! [`VendorConfig`] into a vendor-independent [`Model`] plus the
//! diagnostics accumulated along the way.

use std::collections::BTreeSet;

use ipnetwork::IpNetwork;
use tracing::debug_span;

use vireo_model::diag::{Diagnostics, StructureKind, StructureUsage};
use vireo_model::model::{Interface, Model, Vrf};
use vireo_model::policy::{
    PolicyExpr, PolicyStmt, PrefixSetRef, RoutingPolicy,
};
use vireo_model::route::RouteProtocol;
use vireo_vendor::config::{DEFAULT_VRF, NamedRef, VendorConfig};
use vireo_vendor::nat::NatMechanism;

use crate::debug::Debug;
use crate::error::Error;
use crate::nat::NatDirection;
use crate::refs::References;
use crate::{bgp, eigrp, filter, nat, ospf, policy, rip};

// Conversion result: the model plus everything worth telling the operator.
#[derive(Debug)]
pub struct ConvertOutput {
    pub model: Model,
    pub diagnostics: Diagnostics,
}

pub fn convert(cfg: &VendorConfig) -> Result<ConvertOutput, Error> {
    debug_span!("convert", hostname = %cfg.hostname)
        .in_scope(|| convert_config(cfg))
        .inspect_err(|error| error.log())
}

fn convert_config(cfg: &VendorConfig) -> Result<ConvertOutput, Error> {
    Debug::ConversionStart(&cfg.hostname).log();
    let mut model = Model::new(&cfg.hostname);
    let mut diags = Diagnostics::new();
    let mut refs = References::new();

    convert_interfaces(cfg, &mut model)?;
    convert_lists(cfg, &mut model);
    convert_policies(cfg, &mut model, &mut refs, &mut diags)?;
    convert_nat(cfg, &mut model, &mut refs, &mut diags);

    for (vrf_name, vrf) in &cfg.vrfs {
        if let Some(proc) = &vrf.rip {
            rip::convert_rip(
                vrf_name, proc, cfg, &mut model, &mut refs, &mut diags,
            )?;
            Debug::ProcessConverted(vrf_name, "rip").log();
        }
        if let Some(proc) = &vrf.ospf {
            ospf::convert_ospf(
                vrf_name, proc, cfg, &mut model, &mut refs, &mut diags,
            )?;
            Debug::ProcessConverted(vrf_name, "ospf").log();
        }
        if let Some(proc) = &vrf.eigrp {
            eigrp::convert_eigrp(
                vrf_name, proc, cfg, &mut model, &mut refs, &mut diags,
            )?;
            Debug::ProcessConverted(vrf_name, "eigrp").log();
        }
        if let Some(proc) = &vrf.bgp {
            bgp::convert_bgp(
                vrf_name, proc, cfg, &mut model, &mut refs, &mut diags,
            )?;
            Debug::ProcessConverted(vrf_name, "bgp").log();
        }
    }

    resolve_acl_prefix_sets(cfg, &mut model);
    report_unused(cfg, &refs, &mut diags);

    Ok(ConvertOutput { model, diagnostics: diags })
}

// ===== helper functions =====

fn convert_interfaces(
    cfg: &VendorConfig,
    model: &mut Model,
) -> Result<(), Error> {
    for name in cfg.vrfs.keys() {
        model.vrfs.insert(name.clone(), Vrf::new(name));
    }
    model
        .vrfs
        .entry(DEFAULT_VRF.to_owned())
        .or_insert_with(|| Vrf::new(DEFAULT_VRF));

    for iface in cfg.interfaces.values() {
        let Some(vrf) = model.vrfs.get_mut(&iface.vrf) else {
            return Err(Error::InterfaceMissingVrf(
                iface.name.clone(),
                iface.vrf.clone(),
            ));
        };
        vrf.interfaces.insert(iface.name.clone());
        model.interfaces.insert(
            iface.name.clone(),
            Interface {
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
    Ok(())
}

fn convert_lists(cfg: &VendorConfig, model: &mut Model) {
    for list in cfg.prefix_lists.values() {
        model
            .route_filter_lists
            .insert(list.name.clone(), filter::convert_prefix_list(list));
    }
    for list in cfg.prefix6_lists.values() {
        model
            .route6_filter_lists
            .insert(list.name.clone(), filter::convert_prefix6_list(list));
    }
    for list in cfg.as_path_lists.values() {
        model
            .as_path_lists
            .insert(list.name.clone(), filter::convert_as_path_list(list));
    }
    for list in cfg.community_lists.values() {
        model
            .community_lists
            .insert(list.name.clone(), filter::convert_community_list(list));
    }
}

fn convert_policies(
    cfg: &VendorConfig,
    model: &mut Model,
    refs: &mut References,
    diags: &mut Diagnostics,
) -> Result<(), Error> {
    for map in cfg.route_maps.values() {
        let compiled = policy::compile_route_map(map, cfg, refs, diags);
        Debug::PolicyCompiled(&map.name, compiled.subpolicies.len()).log();
        for policy in compiled.into_policies() {
            add_policy(model, policy)?;
        }
    }
    for route_policy in cfg.route_policies.values() {
        let compiled =
            policy::compile_route_policy(route_policy, cfg, refs, diags);
        Debug::PolicyCompiled(&route_policy.name, compiled.subpolicies.len())
            .log();
        for policy in compiled.into_policies() {
            add_policy(model, policy)?;
        }
    }
    Ok(())
}

fn convert_nat(
    cfg: &VendorConfig,
    model: &mut Model,
    refs: &mut References,
    diags: &mut Diagnostics,
) {
    let outgoing = nat::compose(cfg, NatDirection::Outgoing, refs, diags);
    let incoming = nat::compose(cfg, NatDirection::Incoming, refs, diags);
    if outgoing.is_none() && incoming.is_none() {
        return;
    }

    // Transformations attach to the outside boundary: rewrites happen as
    // traffic crosses an outside-marked interface.
    for iface in cfg.interfaces.values().filter(|iface| iface.nat_outside) {
        if let Some(model_iface) = model.interfaces.get_mut(&iface.name) {
            model_iface.outgoing_transformation = outgoing.clone();
            model_iface.incoming_transformation = incoming.clone();
        }
    }

    // Flow ACLs consulted by dynamic rule guards.
    for rule in &cfg.nat_rules {
        if let NatMechanism::Dynamic { acl, .. } = &rule.mechanism
            && let Some(list) = cfg.access_lists.get(&acl.name)
        {
            model
                .flow_acls
                .insert(acl.name.clone(), filter::convert_flow_acl(list));
        }
    }
}

// Policies reference prefix sets by name without caring whether the name
// was a prefix-list or an ACL. Prefix-lists are converted up front; any
// remaining name that resolves to an ACL gets the ACL's routing view
// materialized here, after every policy exists.
fn resolve_acl_prefix_sets(cfg: &VendorConfig, model: &mut Model) {
    let mut names = BTreeSet::new();
    for policy in model.policies.values() {
        collect_prefix_set_names(&policy.stmts, &mut names);
    }
    for name in names {
        if !model.route_filter_lists.contains_key(&name)
            && let Some(acl) = cfg.access_lists.get(&name)
        {
            model
                .route_filter_lists
                .insert(name, filter::convert_access_list(acl));
        }
    }
}

fn collect_prefix_set_names(
    stmts: &[PolicyStmt],
    names: &mut BTreeSet<String>,
) {
    for stmt in stmts {
        if let PolicyStmt::If { guard, then, otherwise } = stmt {
            collect_expr_names(guard, names);
            collect_prefix_set_names(then, names);
            collect_prefix_set_names(otherwise, names);
        }
    }
}

fn collect_expr_names(expr: &PolicyExpr, names: &mut BTreeSet<String>) {
    match expr {
        PolicyExpr::Conjunction(exprs) | PolicyExpr::Disjunction(exprs) => {
            for expr in exprs {
                collect_expr_names(expr, names);
            }
        }
        PolicyExpr::Not(expr) => collect_expr_names(expr, names),
        PolicyExpr::MatchPrefixSet(PrefixSetRef::Named(name)) => {
            names.insert(name.clone());
        }
        PolicyExpr::WithIntermediateAttrs { expr, on_match } => {
            collect_expr_names(expr, names);
            collect_prefix_set_names(on_match, names);
        }
        _ => (),
    }
}

// Named structures never referenced anywhere become advisories. Structures
// whose only consumers were themselves dropped still count as referenced;
// the reference record is made at lookup time, not at use time.
fn report_unused(
    cfg: &VendorConfig,
    refs: &References,
    diags: &mut Diagnostics,
) {
    fn report<T>(
        collection: &std::collections::BTreeMap<String, T>,
        kind: StructureKind,
        refs: &References,
        diags: &mut Diagnostics,
    ) {
        for name in collection.keys() {
            if !refs.contains(kind, name) {
                diags.advisory(format!("unused {} {}", kind, name));
            }
        }
    }

    report(&cfg.route_maps, StructureKind::RouteMap, refs, diags);
    report(&cfg.route_policies, StructureKind::RoutePolicy, refs, diags);
    report(&cfg.prefix_lists, StructureKind::PrefixList, refs, diags);
    report(&cfg.access_lists, StructureKind::AccessList, refs, diags);
    report(&cfg.as_path_lists, StructureKind::AsPathList, refs, diags);
    report(&cfg.community_lists, StructureKind::CommunityList, refs, diags);
    report(&cfg.nat_pools, StructureKind::NatPool, refs, diags);
    report(&cfg.address_objects, StructureKind::AddressObject, refs, diags);
}

// Registers a synthesized or compiled policy, failing on a name collision.
// User-defined names cannot collide with synthesized ones (the `~` sigil is
// unspellable in vendor configuration), so a collision is an internal bug.
pub(crate) fn add_policy(
    model: &mut Model,
    policy: RoutingPolicy,
) -> Result<(), Error> {
    let name = policy.name.clone();
    if model.policies.insert(name.clone(), policy).is_some() {
        return Err(Error::DuplicatePolicy(name));
    }
    Ok(())
}

// Resolves an optional route-map reference against both policy namespaces,
// recording the reference and reporting a dangling one. Returns the name to
// call, or `None` when unset or dangling (the referring feature then runs
// unconstrained).
pub(crate) fn checked_policy_ref(
    target: &Option<NamedRef>,
    usage: StructureUsage,
    cfg: &VendorConfig,
    refs: &mut References,
    diags: &mut Diagnostics,
) -> Option<String> {
    let target = target.as_ref()?;
    if cfg.route_maps.contains_key(&target.name) {
        refs.note(StructureKind::RouteMap, &target.name);
        Some(target.name.clone())
    } else if cfg.route_policies.contains_key(&target.name) {
        refs.note(StructureKind::RoutePolicy, &target.name);
        Some(target.name.clone())
    } else {
        refs.note(StructureKind::RouteMap, &target.name);
        diags.undefined(
            StructureKind::RouteMap,
            &target.name,
            usage,
            target.line,
        );
        None
    }
}

// Match expression for a redistribution source. Locally originated eBGP and
// iBGP routes are distinct protocols in the model but one source in vendor
// terms.
pub(crate) fn protocol_term(protocol: RouteProtocol) -> PolicyExpr {
    match protocol {
        RouteProtocol::Bgp => PolicyExpr::Disjunction(vec![
            PolicyExpr::MatchProtocol(RouteProtocol::Bgp),
            PolicyExpr::MatchProtocol(RouteProtocol::Ibgp),
        ]),
        protocol => PolicyExpr::MatchProtocol(protocol),
    }
}
