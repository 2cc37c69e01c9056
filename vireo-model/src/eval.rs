//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! Policy evaluation.
//!
//! An [`Environment`] runs compiled policies against one route: matches read
//! the original attributes, set statements write a pending copy, and the
//! caller receives the rewritten route on accept. Nested policy runs
//! (`CallPolicy`, `Apply`) share the environment, including the pending
//! default action that backs route-map continue chains.

use std::net::IpAddr;

use ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use tracing::debug;

use crate::model::Model;
use crate::policy::{
    NextHopExpr, PolicyExpr, PolicyResult, PolicyStmt, PrefixRange,
    PrefixSetRef, RoutingPolicy, Verdict,
};
use crate::route::Route;

// Private AS range stripped by `RemovePrivateAs`.
const PRIVATE_AS_FIRST: u32 = 64512;
const PRIVATE_AS_LAST: u32 = 65534;

// Call depth cap; policies reference each other by name, so a configuration
// can spell a cycle.
const MAX_CALL_DEPTH: usize = 64;

pub struct Environment<'a> {
    model: &'a Model,
    route: &'a Route,
    // Pending attribute writes, returned to the caller on accept.
    pub output: Route,
    // Scratch attribute set for `WithIntermediateAttrs`.
    intermediate: Route,
    write_intermediate: bool,
    // Pending default action, shared across nested policy runs.
    local_default: bool,
    self_address: Option<IpAddr>,
    peer_address: Option<IpAddr>,
    depth: usize,
}

// ===== impl Environment =====

impl<'a> Environment<'a> {
    pub fn new(model: &'a Model, route: &'a Route) -> Environment<'a> {
        Environment {
            model,
            route,
            output: route.clone(),
            intermediate: route.clone(),
            write_intermediate: false,
            local_default: false,
            self_address: None,
            peer_address: None,
            depth: 0,
        }
    }

    pub fn with_self_address(mut self, addr: IpAddr) -> Environment<'a> {
        self.self_address = Some(addr);
        self
    }

    pub fn with_peer_address(mut self, addr: IpAddr) -> Environment<'a> {
        self.peer_address = Some(addr);
        self
    }

    // Runs the named policy to a resolved accept/reject.
    pub fn run(&mut self, name: &str) -> bool {
        let Some(policy) = self.model.policies.get(name) else {
            debug!(%name, "policy lookup failed");
            return false;
        };
        self.run_policy(policy)
    }

    fn run_policy(&mut self, policy: &RoutingPolicy) -> bool {
        if self.depth >= MAX_CALL_DEPTH {
            debug!(name = %policy.name, "policy call depth exceeded");
            return false;
        }
        self.depth += 1;
        let verdict = self.run_stmts(&policy.stmts);
        self.depth -= 1;
        // Falling off the end resolves the pending default action.
        verdict.unwrap_or(self.local_default)
    }

    // Returns Some once a statement produced a verdict.
    fn run_stmts(&mut self, stmts: &[PolicyStmt]) -> Option<bool> {
        for stmt in stmts {
            match stmt {
                PolicyStmt::If { guard, then, otherwise } => {
                    let branch = if self.eval_expr(guard) {
                        then
                    } else {
                        otherwise
                    };
                    if let Some(verdict) = self.run_stmts(branch) {
                        return Some(verdict);
                    }
                }
                PolicyStmt::Return(verdict) => {
                    return Some(match verdict {
                        Verdict::Accept => true,
                        Verdict::Reject => false,
                        Verdict::LocalDefault => self.local_default,
                    });
                }
                PolicyStmt::SetLocalDefault(accept) => {
                    self.local_default = *accept;
                }
                PolicyStmt::Apply(name) => {
                    return Some(self.run(name));
                }
                PolicyStmt::SetMetric(metric) => {
                    self.attrs_mut().metric = *metric;
                }
                PolicyStmt::SetOspfMetricType(metric_type) => {
                    self.attrs_mut().ospf_metric_type = Some(*metric_type);
                }
                PolicyStmt::SetOrigin(origin) => {
                    self.attrs_mut().origin = Some(*origin);
                }
                PolicyStmt::SetLocalPref(local_pref) => {
                    self.attrs_mut().local_pref = Some(*local_pref);
                }
                PolicyStmt::SetNextHop(nexthop) => {
                    let addr = match nexthop {
                        NextHopExpr::Address(addr) => Some(*addr),
                        NextHopExpr::SelfAddress => self.self_address,
                        NextHopExpr::PeerAddress => self.peer_address,
                    };
                    if let Some(addr) = addr {
                        self.attrs_mut().nexthop = Some(addr);
                    }
                }
                PolicyStmt::SetCommunities { comms, additive } => {
                    let attrs = self.attrs_mut();
                    if !additive {
                        attrs.communities.clear();
                    }
                    attrs.communities.extend(comms.iter().copied());
                }
                PolicyStmt::PrependAsPath { asn, count } => {
                    let attrs = self.attrs_mut();
                    for _ in 0..*count {
                        attrs.as_path.insert(0, *asn);
                    }
                }
                PolicyStmt::SetTag(tag) => {
                    self.attrs_mut().tag = *tag;
                }
                PolicyStmt::SetWeight(weight) => {
                    self.attrs_mut().weight = *weight;
                }
                PolicyStmt::RemovePrivateAs => {
                    self.attrs_mut().as_path.retain(|asn| {
                        !(PRIVATE_AS_FIRST..=PRIVATE_AS_LAST).contains(asn)
                    });
                }
            }
        }
        None
    }

    fn eval_expr(&mut self, expr: &PolicyExpr) -> bool {
        match expr {
            PolicyExpr::Conjunction(conjuncts) => {
                conjuncts.iter().all(|expr| self.eval_expr(expr))
            }
            PolicyExpr::Disjunction(disjuncts) => {
                disjuncts.iter().any(|expr| self.eval_expr(expr))
            }
            PolicyExpr::Not(expr) => !self.eval_expr(expr),
            PolicyExpr::Constant(value) => *value,
            PolicyExpr::CallPolicy(name) => self.run(name),
            PolicyExpr::MatchPrefixSet(set) => match self.route.prefix {
                IpNetwork::V4(prefix) => match set {
                    PrefixSetRef::Named(name) => self
                        .model
                        .route_filter_lists
                        .get(name)
                        .map(|list| list.permits(&prefix))
                        .unwrap_or(false),
                    PrefixSetRef::Explicit(ranges) => ranges
                        .iter()
                        .any(|range| range_matches_v4(range, &prefix)),
                },
                IpNetwork::V6(_) => false,
            },
            PolicyExpr::MatchPrefix6Set(set) => match self.route.prefix {
                IpNetwork::V6(prefix) => match set {
                    PrefixSetRef::Named(name) => self
                        .model
                        .route6_filter_lists
                        .get(name)
                        .map(|list| list.permits(&prefix))
                        .unwrap_or(false),
                    PrefixSetRef::Explicit(ranges) => ranges
                        .iter()
                        .any(|range| range_matches_v6(range, &prefix)),
                },
                IpNetwork::V4(_) => false,
            },
            PolicyExpr::MatchProtocol(protocol) => {
                self.route.protocol == *protocol
            }
            PolicyExpr::MatchAsPath(name) => self
                .model
                .as_path_lists
                .get(name)
                .map(|list| list.permits(&self.route.as_path_string()))
                .unwrap_or(false),
            PolicyExpr::MatchCommunity(name) => self
                .model
                .community_lists
                .get(name)
                .map(|list| list.matches_route(&self.route.communities))
                .unwrap_or(false),
            PolicyExpr::MatchTag(tag) => self.route.tag == *tag,
            PolicyExpr::MatchMetric(metric) => self.route.metric == *metric,
            PolicyExpr::WithIntermediateAttrs { expr, on_match } => {
                // Buffer writes from the wrapped expression; commit them
                // plus the trailing statements only on a match.
                let saved_flag = self.write_intermediate;
                let saved_scratch =
                    std::mem::replace(&mut self.intermediate, self.output.clone());
                self.write_intermediate = true;
                let matched = self.eval_expr(expr);
                self.write_intermediate = saved_flag;
                let scratch =
                    std::mem::replace(&mut self.intermediate, saved_scratch);
                if matched {
                    self.output = scratch;
                    // Only set statements are generated here; a verdict
                    // inside on_match is ignored.
                    let _ = self.run_stmts(on_match);
                }
                matched
            }
        }
    }

    fn attrs_mut(&mut self) -> &mut Route {
        if self.write_intermediate {
            &mut self.intermediate
        } else {
            &mut self.output
        }
    }
}

// ===== global functions =====

// Applies a named policy to a route, returning the rewritten route on
// accept.
pub fn apply_policy(
    model: &Model,
    policy: &str,
    route: &Route,
) -> PolicyResult<Route> {
    let mut env = Environment::new(model, route);
    if env.run(policy) {
        PolicyResult::Accept(env.output)
    } else {
        PolicyResult::Reject
    }
}

fn range_matches_v4(range: &PrefixRange, candidate: &Ipv4Network) -> bool {
    let IpNetwork::V4(prefix) = range.prefix else {
        return false;
    };
    range.lengths.contains(&candidate.prefix())
        && candidate.prefix() >= prefix.prefix()
        && prefix.contains(candidate.network())
}

fn range_matches_v6(range: &PrefixRange, candidate: &Ipv6Network) -> bool {
    let IpNetwork::V6(prefix) = range.prefix else {
        return false;
    };
    range.lengths.contains(&candidate.prefix())
        && candidate.prefix() >= prefix.prefix()
        && prefix.contains(candidate.network())
}

#[cfg(test)]
mod tests {
    use const_addrs::{ip, net};

    use super::*;
    use crate::policy::PolicyExpr as Expr;
    use crate::policy::PolicyStmt as Stmt;
    use crate::route::{BgpOrigin, Comm, RouteProtocol};

    fn model_with(policies: Vec<RoutingPolicy>) -> Model {
        let mut model = Model::new("r1");
        for policy in policies {
            model.policies.insert(policy.name.clone(), policy);
        }
        model
    }

    fn bgp_route() -> Route {
        Route::new(net!("10.1.0.0/16"), RouteProtocol::Bgp)
    }

    #[test]
    fn test_empty_policy_rejects() {
        let model = model_with(vec![RoutingPolicy::new("P")]);
        let result = apply_policy(&model, "P", &bgp_route());
        assert!(result.is_reject());
    }

    #[test]
    fn test_local_default_resolution() {
        let model = model_with(vec![RoutingPolicy {
            name: "P".to_owned(),
            stmts: vec![
                Stmt::SetLocalDefault(true),
                Stmt::Return(Verdict::LocalDefault),
            ],
        }]);
        assert!(apply_policy(&model, "P", &bgp_route()).is_accept());
    }

    #[test]
    fn test_sets_apply_only_on_taken_branch() {
        let model = model_with(vec![RoutingPolicy {
            name: "P".to_owned(),
            stmts: vec![Stmt::If {
                guard: Expr::MatchProtocol(RouteProtocol::Static),
                then: vec![Stmt::SetMetric(99), Stmt::Return(Verdict::Accept)],
                otherwise: vec![
                    Stmt::SetTag(7),
                    Stmt::Return(Verdict::Accept),
                ],
            }],
        }]);
        match apply_policy(&model, "P", &bgp_route()) {
            PolicyResult::Accept(route) => {
                assert_eq!(route.metric, 0);
                assert_eq!(route.tag, 7);
            }
            PolicyResult::Reject => panic!("expected accept"),
        }
    }

    #[test]
    fn test_call_policy_as_boolean() {
        let model = model_with(vec![
            RoutingPolicy {
                name: "INNER".to_owned(),
                stmts: vec![Stmt::If {
                    guard: Expr::MatchProtocol(RouteProtocol::Bgp),
                    then: vec![Stmt::Return(Verdict::Accept)],
                    otherwise: vec![Stmt::Return(Verdict::Reject)],
                }],
            },
            RoutingPolicy {
                name: "OUTER".to_owned(),
                stmts: vec![Stmt::If {
                    guard: Expr::Conjunction(vec![
                        Expr::CallPolicy("INNER".to_owned()),
                        Expr::Constant(true),
                    ]),
                    then: vec![Stmt::Return(Verdict::Accept)],
                    otherwise: vec![Stmt::Return(Verdict::Reject)],
                }],
            },
        ]);
        assert!(apply_policy(&model, "OUTER", &bgp_route()).is_accept());
    }

    #[test]
    fn test_apply_tail_transfer() {
        let model = model_with(vec![
            RoutingPolicy {
                name: "TAIL".to_owned(),
                stmts: vec![Stmt::Return(Verdict::LocalDefault)],
            },
            RoutingPolicy {
                name: "HEAD".to_owned(),
                stmts: vec![
                    Stmt::SetLocalDefault(true),
                    Stmt::Apply("TAIL".to_owned()),
                ],
            },
        ]);
        // The pending accept marked in HEAD is visible when TAIL resolves.
        assert!(apply_policy(&model, "HEAD", &bgp_route()).is_accept());
    }

    #[test]
    fn test_self_recursion_terminates() {
        let model = model_with(vec![RoutingPolicy {
            name: "LOOP".to_owned(),
            stmts: vec![Stmt::Apply("LOOP".to_owned())],
        }]);
        assert!(apply_policy(&model, "LOOP", &bgp_route()).is_reject());
    }

    #[test]
    fn test_intermediate_attrs_commit_on_match() {
        let comm = Comm(65000 << 16 | 77);
        let model = model_with(vec![
            RoutingPolicy {
                name: "ATTR".to_owned(),
                stmts: vec![
                    Stmt::SetCommunities { comms: vec![comm], additive: true },
                    Stmt::Return(Verdict::Accept),
                ],
            },
            RoutingPolicy {
                name: "P".to_owned(),
                stmts: vec![Stmt::If {
                    guard: Expr::WithIntermediateAttrs {
                        expr: Box::new(Expr::Conjunction(vec![
                            Expr::MatchProtocol(RouteProtocol::Bgp),
                            Expr::CallPolicy("ATTR".to_owned()),
                        ])),
                        on_match: vec![Stmt::SetOrigin(BgpOrigin::Igp)],
                    },
                    then: vec![Stmt::Return(Verdict::Accept)],
                    otherwise: vec![Stmt::Return(Verdict::Reject)],
                }],
            },
        ]);

        match apply_policy(&model, "P", &bgp_route()) {
            PolicyResult::Accept(route) => {
                assert!(route.communities.contains(&comm));
                assert_eq!(route.origin, Some(BgpOrigin::Igp));
            }
            PolicyResult::Reject => panic!("expected accept"),
        }

        // No commit when the wrapped expression misses.
        let route = Route::new(net!("10.1.0.0/16"), RouteProtocol::Static);
        match apply_policy(&model, "P", &route) {
            PolicyResult::Accept(_) => panic!("expected reject"),
            PolicyResult::Reject => (),
        }
    }

    #[test]
    fn test_remove_private_as() {
        let model = model_with(vec![RoutingPolicy {
            name: "P".to_owned(),
            stmts: vec![
                Stmt::RemovePrivateAs,
                Stmt::Return(Verdict::Accept),
            ],
        }]);
        let mut route = bgp_route();
        route.as_path = vec![64512, 100, 65534, 200];
        match apply_policy(&model, "P", &route) {
            PolicyResult::Accept(route) => {
                assert_eq!(route.as_path, vec![100, 200]);
            }
            PolicyResult::Reject => panic!("expected accept"),
        }
    }

    #[test]
    fn test_nexthop_self() {
        let model = model_with(vec![RoutingPolicy {
            name: "P".to_owned(),
            stmts: vec![
                Stmt::SetNextHop(NextHopExpr::SelfAddress),
                Stmt::Return(Verdict::Accept),
            ],
        }]);
        let route = bgp_route();
        let mut env = Environment::new(&model, &route)
            .with_self_address(ip!("192.0.2.1"));
        assert!(env.run("P"));
        assert_eq!(env.output.nexthop, Some(ip!("192.0.2.1")));
    }

    #[test]
    fn test_explicit_prefix_range() {
        let model = model_with(vec![RoutingPolicy {
            name: "P".to_owned(),
            stmts: vec![Stmt::If {
                guard: Expr::MatchPrefixSet(PrefixSetRef::Explicit(vec![
                    PrefixRange::more_specific(net!("10.0.0.0/8")),
                ])),
                then: vec![Stmt::Return(Verdict::Accept)],
                otherwise: vec![Stmt::Return(Verdict::Reject)],
            }],
        }]);
        assert!(apply_policy(&model, "P", &bgp_route()).is_accept());
        let exact = Route::new(net!("10.0.0.0/8"), RouteProtocol::Bgp);
        assert!(apply_policy(&model, "P", &exact).is_reject());
    }
}
