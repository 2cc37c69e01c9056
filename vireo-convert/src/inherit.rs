//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! BGP template inheritance resolution.
//!
//! Templates and leaf neighbors form a graph: every node may name a
//! peer-group parent and a peer-session parent, resolved independently.
//! Nodes live in an arena with a tri-state visit marker, so diamonds resolve
//! once, cycles short-circuit instead of looping, and partial results are an
//! explicit outcome rather than an accident of field-assignment order.
//!
//! Merge direction is parent-into-child and only ever fills unset fields,
//! giving child > group ancestors > session ancestors > process defaults
//! precedence.

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use ipnetwork::IpNetwork;

use vireo_model::diag::{Diagnostics, StructureKind, StructureUsage};
use vireo_model::ip::Ipv4AddrExt;
use vireo_vendor::bgp::{BgpProcess, PeerCfg};
use vireo_vendor::config::NamedRef;

use crate::collections::{Arena, Index};
use crate::debug::Debug;
use crate::names;

// Visit marker of one template node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ResolveMark {
    Unvisited,
    Visiting,
    Done,
}

#[derive(Debug)]
struct Node {
    name: String,
    cfg: PeerCfg,
    group: Option<NamedRef>,
    session: Option<NamedRef>,
    mark: ResolveMark,
}

// Leaf neighbor with every inheritable field filled in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedPeer {
    pub addr: IpNetwork,
    pub cfg: PeerCfg,
    // Group the neighbor was declared under (or the synthetic group of an
    // unused session template), kept for reporting.
    pub group: Option<String>,
}

#[derive(Debug, Default)]
pub struct InheritOutcome {
    pub peers: Vec<ResolvedPeer>,
    pub unused_groups: BTreeSet<String>,
    pub unused_sessions: BTreeSet<String>,
}

struct Resolver<'a> {
    arena: Arena<Node>,
    groups: BTreeMap<String, Index>,
    sessions: BTreeMap<String, Index>,
    defaults: &'a PeerCfg,
}

// ===== impl Resolver =====

impl<'a> Resolver<'a> {
    fn new(proc: &'a BgpProcess) -> Resolver<'a> {
        let mut arena = Arena::default();
        let mut groups = BTreeMap::new();
        let mut sessions = BTreeMap::new();
        for (name, tmpl) in &proc.groups {
            let index = arena.insert(Node {
                name: name.clone(),
                cfg: tmpl.cfg.clone(),
                group: tmpl.group.clone(),
                session: tmpl.session.clone(),
                mark: ResolveMark::Unvisited,
            });
            groups.insert(name.clone(), index);
        }
        for (name, tmpl) in &proc.sessions {
            let index = arena.insert(Node {
                name: name.clone(),
                cfg: tmpl.cfg.clone(),
                group: tmpl.group.clone(),
                session: tmpl.session.clone(),
                mark: ResolveMark::Unvisited,
            });
            sessions.insert(name.clone(), index);
        }
        Resolver { arena, groups, sessions, defaults: &proc.defaults }
    }

    // Resolves one template node: group-parent chain first, then
    // session-parent chain. Re-resolving a finished node is a no-op; a node
    // revisited mid-resolution is part of a cycle and short-circuits,
    // contributing only its literal fields to whoever reached it.
    fn resolve_node(&mut self, index: Index, diags: &mut Diagnostics) {
        match self.arena[index].mark {
            ResolveMark::Done => return,
            ResolveMark::Visiting => {
                Debug::TemplateCycle(&self.arena[index].name).log();
                return;
            }
            ResolveMark::Unvisited => (),
        }
        self.arena[index].mark = ResolveMark::Visiting;

        let group = self.arena[index].group.clone();
        if let Some(parent) = group {
            if let Some(merged) = self.resolve_parent(
                &parent,
                StructureKind::PeerGroup,
                StructureUsage::BgpPeerGroupParent,
                diags,
            ) {
                self.arena[index].cfg.inherit_unset(&merged);
            }
        }
        let session = self.arena[index].session.clone();
        if let Some(parent) = session {
            if let Some(merged) = self.resolve_parent(
                &parent,
                StructureKind::PeerSession,
                StructureUsage::BgpPeerSessionParent,
                diags,
            ) {
                self.arena[index].cfg.inherit_unset(&merged);
            }
        }

        self.arena[index].mark = ResolveMark::Done;
    }

    // Resolves a named parent and returns its merged field bundle, or None
    // when the name is dangling.
    fn resolve_parent(
        &mut self,
        parent: &NamedRef,
        kind: StructureKind,
        usage: StructureUsage,
        diags: &mut Diagnostics,
    ) -> Option<PeerCfg> {
        let table = match kind {
            StructureKind::PeerSession => &self.sessions,
            _ => &self.groups,
        };
        match table.get(&parent.name).copied() {
            Some(index) => {
                self.resolve_node(index, diags);
                Some(self.arena[index].cfg.clone())
            }
            None => {
                diags.undefined(kind, &parent.name, usage, parent.line);
                None
            }
        }
    }

    // Flattens one leaf's inheritance chains onto a copy of its config.
    fn resolve_leaf(
        &mut self,
        cfg: &PeerCfg,
        group: &Option<NamedRef>,
        session: &Option<NamedRef>,
        diags: &mut Diagnostics,
    ) -> PeerCfg {
        let mut cfg = cfg.clone();
        if let Some(parent) = group {
            if let Some(merged) = self.resolve_parent(
                parent,
                StructureKind::PeerGroup,
                StructureUsage::BgpPeerGroupParent,
                diags,
            ) {
                cfg.inherit_unset(&merged);
            }
        }
        if let Some(parent) = session {
            if let Some(merged) = self.resolve_parent(
                parent,
                StructureKind::PeerSession,
                StructureUsage::BgpPeerSessionParent,
                diags,
            ) {
                cfg.inherit_unset(&merged);
            }
        }
        // The process defaults are the implicit master template at the weak
        // end of every chain.
        cfg.inherit_unset(self.defaults);
        cfg
    }
}

// ===== global functions =====

// Resolves template inheritance for one BGP process. Returns the fully
// populated neighbors, including a disabled synthetic neighbor for every
// template nothing inherits from, so unused template configuration stays
// visible in the output model.
pub fn resolve(
    proc: &BgpProcess,
    diags: &mut Diagnostics,
) -> InheritOutcome {
    let mut resolver = Resolver::new(proc);
    let mut outcome = InheritOutcome::default();

    for leaf in &proc.neighbors {
        let cfg = resolver.resolve_leaf(
            &leaf.cfg,
            &leaf.group,
            &leaf.session,
            diags,
        );
        outcome.peers.push(ResolvedPeer {
            addr: leaf.addr,
            cfg,
            group: leaf.group.as_ref().map(|parent| parent.name.clone()),
        });
    }

    // Force-materialize templates nobody inherits from as shutdown
    // neighbors on placeholder addresses counting down from the top of the
    // address space.
    let referenced = proc.referenced_parents();
    let mut placeholder = u32::MAX;
    for name in proc.groups.keys() {
        if referenced.contains(name.as_str()) {
            continue;
        }
        outcome.unused_groups.insert(name.clone());
        let tmpl = &proc.groups[name];
        let mut cfg = resolver.resolve_leaf(
            &tmpl.cfg,
            &tmpl.group,
            &tmpl.session,
            diags,
        );
        fake_peer_cfg(&mut cfg, proc.asn);
        outcome.peers.push(ResolvedPeer {
            addr: placeholder_addr(&mut placeholder),
            cfg,
            group: Some(name.clone()),
        });
    }
    for (position, name) in proc.sessions.keys().enumerate() {
        if referenced.contains(name.as_str()) {
            continue;
        }
        outcome.unused_sessions.insert(name.clone());
        let tmpl = &proc.sessions[name];
        let mut cfg = resolver.resolve_leaf(
            &tmpl.cfg,
            &tmpl.group,
            &tmpl.session,
            diags,
        );
        fake_peer_cfg(&mut cfg, proc.asn);
        outcome.peers.push(ResolvedPeer {
            addr: placeholder_addr(&mut placeholder),
            cfg,
            // Sessions have no group of their own; a synthetic one keeps
            // the fake neighbor attributable.
            group: Some(names::fake_group(position)),
        });
    }

    outcome
}

// ===== helper functions =====

fn placeholder_addr(counter: &mut u32) -> IpNetwork {
    let addr = Ipv4Addr::from(*counter);
    *counter = counter.wrapping_sub(1);
    IpNetwork::V4(addr.to_host_prefix())
}

fn fake_peer_cfg(cfg: &mut PeerCfg, asn: u32) {
    cfg.shutdown = Some(true);
    // Enough of a session to survive peer assembly.
    cfg.remote_as.get_or_insert(asn);
}
