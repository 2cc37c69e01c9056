//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! Composed NAT transformations.
//!
//! A [`Transformation`] is an if/else tree over flows: when the guard
//! matches, the rewrite steps run and evaluation continues in `and_then`;
//! otherwise it continues in `or_else`. Alternatives (first-match-wins rule
//! chains) are `or_else` chains; sequential stages are grafted onto every
//! leaf with [`Transformation::sequence`], so a later stage applies no
//! matter which alternative of the earlier stage fired.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use derive_new::new;
use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

use crate::filter::LineAction;

// Flow field a NAT rule matches or rewrites.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum FlowField {
    Source,
    Destination,
}

// The slice of a packet NAT evaluation looks at.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(new)]
#[derive(Deserialize, Serialize)]
pub struct Flow {
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
}

// Flow ACL in parsed network form, carried by the model so composed
// transformations stay self-contained.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct FlowAclLine {
    pub action: LineAction,
    pub src: Option<Ipv4Network>,
    pub dst: Option<Ipv4Network>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct FlowAcl {
    pub name: String,
    pub lines: Vec<FlowAclLine>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum FlowMatch {
    Always,
    PermittedByAcl(String),
    FieldInNetwork { field: FlowField, net: Ipv4Network },
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum FlowRewrite {
    // Rewrites the network bits of the field, keeping the host bits.
    ShiftIntoNetwork { field: FlowField, net: Ipv4Network },
    // Deterministic stand-in for dynamic pool allocation: the pool's first
    // address.
    AssignFromPool { field: FlowField, first: Ipv4Addr, last: Ipv4Addr },
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Transformation {
    pub guard: FlowMatch,
    pub steps: Vec<FlowRewrite>,
    pub and_then: Option<Box<Transformation>>,
    pub or_else: Option<Box<Transformation>>,
}

// ===== impl Flow =====

impl Flow {
    pub fn get(&self, field: FlowField) -> Ipv4Addr {
        match field {
            FlowField::Source => self.src_ip,
            FlowField::Destination => self.dst_ip,
        }
    }

    pub fn set(&mut self, field: FlowField, addr: Ipv4Addr) {
        match field {
            FlowField::Source => self.src_ip = addr,
            FlowField::Destination => self.dst_ip = addr,
        }
    }
}

// ===== impl FlowAcl =====

impl FlowAcl {
    // First matching line decides; no match is a deny.
    pub fn permits(&self, flow: &Flow) -> bool {
        self.lines
            .iter()
            .find(|line| {
                line.src.is_none_or(|net| net.contains(flow.src_ip))
                    && line.dst.is_none_or(|net| net.contains(flow.dst_ip))
            })
            .map(|line| line.action == LineAction::Permit)
            .unwrap_or(false)
    }
}

// ===== impl FlowMatch =====

impl FlowMatch {
    pub fn matches(
        &self,
        flow: &Flow,
        acls: &BTreeMap<String, FlowAcl>,
    ) -> bool {
        match self {
            FlowMatch::Always => true,
            FlowMatch::PermittedByAcl(name) => {
                acls.get(name).map(|acl| acl.permits(flow)).unwrap_or(false)
            }
            FlowMatch::FieldInNetwork { field, net } => {
                net.contains(flow.get(*field))
            }
        }
    }
}

// ===== impl FlowRewrite =====

impl FlowRewrite {
    fn apply(&self, flow: &mut Flow) {
        match self {
            FlowRewrite::ShiftIntoNetwork { field, net } => {
                let host_mask =
                    u32::MAX.checked_shr(net.prefix() as u32).unwrap_or(0);
                let addr = u32::from(flow.get(*field));
                let shifted =
                    u32::from(net.network()) | (addr & host_mask);
                flow.set(*field, Ipv4Addr::from(shifted));
            }
            FlowRewrite::AssignFromPool { field, first, .. } => {
                flow.set(*field, *first);
            }
        }
    }
}

// ===== impl Transformation =====

impl Transformation {
    pub fn step(guard: FlowMatch, steps: Vec<FlowRewrite>) -> Transformation {
        Transformation { guard, steps, and_then: None, or_else: None }
    }

    // Chains alternatives: `next` is tried whenever `self`'s guard (or any
    // guard down its or_else chain) did not match.
    pub fn or_else(mut self, next: Transformation) -> Transformation {
        match self.or_else.take() {
            Some(tail) => {
                self.or_else = Some(Box::new((*tail).or_else(next)));
            }
            None => self.or_else = Some(Box::new(next)),
        }
        self
    }

    // Sequential composition: `second` runs after `first` regardless of
    // which of `first`'s branches matched.
    pub fn sequence(
        first: Option<Transformation>,
        second: Option<Transformation>,
    ) -> Option<Transformation> {
        match (first, second) {
            (None, second) => second,
            (first, None) => first,
            (Some(mut first), Some(second)) => {
                first.graft(&second);
                Some(first)
            }
        }
    }

    fn graft(&mut self, tail: &Transformation) {
        match &mut self.and_then {
            Some(next) => next.graft(tail),
            None => self.and_then = Some(Box::new(tail.clone())),
        }
        match &mut self.or_else {
            Some(next) => next.graft(tail),
            None => self.or_else = Some(Box::new(tail.clone())),
        }
    }

    pub fn apply(
        &self,
        flow: &Flow,
        acls: &BTreeMap<String, FlowAcl>,
    ) -> Flow {
        if self.guard.matches(flow, acls) {
            let mut out = *flow;
            for step in &self.steps {
                step.apply(&mut out);
            }
            match &self.and_then {
                Some(next) => next.apply(&out, acls),
                None => out,
            }
        } else {
            match &self.or_else {
                Some(next) => next.apply(flow, acls),
                None => *flow,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use const_addrs::{ip4, net4};
    use maplit::btreemap;

    use super::*;

    #[test]
    fn test_shift_keeps_host_bits() {
        let t = Transformation::step(
            FlowMatch::FieldInNetwork {
                field: FlowField::Source,
                net: net4!("10.0.0.0/24"),
            },
            vec![FlowRewrite::ShiftIntoNetwork {
                field: FlowField::Source,
                net: net4!("192.0.2.0/24"),
            }],
        );
        let flow = Flow::new(ip4!("10.0.0.77"), ip4!("8.8.8.8"));
        let out = t.apply(&flow, &BTreeMap::new());
        assert_eq!(out.src_ip, ip4!("192.0.2.77"));
        assert_eq!(out.dst_ip, ip4!("8.8.8.8"));
    }

    #[test]
    fn test_or_else_first_match_wins() {
        let first = Transformation::step(
            FlowMatch::FieldInNetwork {
                field: FlowField::Source,
                net: net4!("10.0.0.0/25"),
            },
            vec![FlowRewrite::ShiftIntoNetwork {
                field: FlowField::Source,
                net: net4!("192.0.2.0/25"),
            }],
        );
        let second = Transformation::step(
            FlowMatch::FieldInNetwork {
                field: FlowField::Source,
                net: net4!("10.0.0.0/8"),
            },
            vec![FlowRewrite::ShiftIntoNetwork {
                field: FlowField::Source,
                net: net4!("198.0.0.0/8"),
            }],
        );
        let chain = first.or_else(second);

        let narrow = Flow::new(ip4!("10.0.0.5"), ip4!("8.8.8.8"));
        assert_eq!(
            chain.apply(&narrow, &BTreeMap::new()).src_ip,
            ip4!("192.0.2.5")
        );
        let wide = Flow::new(ip4!("10.9.0.5"), ip4!("8.8.8.8"));
        assert_eq!(
            chain.apply(&wide, &BTreeMap::new()).src_ip,
            ip4!("198.9.0.5")
        );
    }

    #[test]
    fn test_sequence_applies_both_stages() {
        let src = Transformation::step(
            FlowMatch::FieldInNetwork {
                field: FlowField::Source,
                net: net4!("10.0.0.0/24"),
            },
            vec![FlowRewrite::ShiftIntoNetwork {
                field: FlowField::Source,
                net: net4!("192.0.2.0/24"),
            }],
        );
        let dst = Transformation::step(
            FlowMatch::FieldInNetwork {
                field: FlowField::Destination,
                net: net4!("203.0.113.0/24"),
            },
            vec![FlowRewrite::ShiftIntoNetwork {
                field: FlowField::Destination,
                net: net4!("172.16.0.0/24"),
            }],
        );
        let both = Transformation::sequence(Some(src), Some(dst)).unwrap();

        // Second stage applies even when the first one did not match.
        let flow = Flow::new(ip4!("10.99.0.1"), ip4!("203.0.113.9"));
        let out = both.apply(&flow, &BTreeMap::new());
        assert_eq!(out.src_ip, ip4!("10.99.0.1"));
        assert_eq!(out.dst_ip, ip4!("172.16.0.9"));

        // And both apply when both match.
        let flow = Flow::new(ip4!("10.0.0.1"), ip4!("203.0.113.9"));
        let out = both.apply(&flow, &BTreeMap::new());
        assert_eq!(out.src_ip, ip4!("192.0.2.1"));
        assert_eq!(out.dst_ip, ip4!("172.16.0.9"));
    }

    #[test]
    fn test_acl_guard() {
        let acls = btreemap! {
            "NAT".to_owned() => FlowAcl {
                name: "NAT".to_owned(),
                lines: vec![FlowAclLine {
                    action: LineAction::Permit,
                    src: Some(net4!("10.0.0.0/8")),
                    dst: None,
                }],
            },
        };
        let t = Transformation::step(
            FlowMatch::PermittedByAcl("NAT".to_owned()),
            vec![FlowRewrite::AssignFromPool {
                field: FlowField::Source,
                first: ip4!("192.0.2.1"),
                last: ip4!("192.0.2.14"),
            }],
        );
        let inside = Flow::new(ip4!("10.1.2.3"), ip4!("8.8.8.8"));
        assert_eq!(t.apply(&inside, &acls).src_ip, ip4!("192.0.2.1"));
        let outside = Flow::new(ip4!("172.16.0.1"), ip4!("8.8.8.8"));
        assert_eq!(t.apply(&outside, &acls).src_ip, ip4!("172.16.0.1"));
    }
}
