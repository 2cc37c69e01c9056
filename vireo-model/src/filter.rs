//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! Named match lists of the vendor-independent model: route filter lists
//! (prefix matching), as-path lists and community lists. Policy expressions
//! reference them by name; evaluation is first-match-wins with an implicit
//! trailing deny.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use ipnetwork::{Ipv4Network, Ipv6Network};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::route::Comm;

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum LineAction {
    Permit,
    Deny,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct RouteFilterLine {
    pub action: LineAction,
    pub prefix: Ipv4Network,
    pub lengths: RangeInclusive<u8>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct RouteFilterList {
    pub name: String,
    pub lines: Vec<RouteFilterLine>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Route6FilterLine {
    pub action: LineAction,
    pub prefix: Ipv6Network,
    pub lengths: RangeInclusive<u8>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Route6FilterList {
    pub name: String,
    pub lines: Vec<Route6FilterLine>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct AsPathListLine {
    pub action: LineAction,
    // Regex over the space-separated AS path rendering. Vendor wildcard
    // syntax is translated before it gets here.
    pub regex: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct AsPathList {
    pub name: String,
    pub lines: Vec<AsPathListLine>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum CommunityMatcher {
    Literal(Comm),
    // Regex over the "asn:value" rendering.
    Regex(String),
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct CommunityListLine {
    pub action: LineAction,
    pub matcher: CommunityMatcher,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct CommunityList {
    pub name: String,
    pub lines: Vec<CommunityListLine>,
}

// ===== impl RouteFilterLine =====

impl RouteFilterLine {
    fn matches(&self, prefix: &Ipv4Network) -> bool {
        self.lengths.contains(&prefix.prefix())
            && prefix.prefix() >= self.prefix.prefix()
            && self.prefix.contains(prefix.network())
    }
}

// ===== impl RouteFilterList =====

impl RouteFilterList {
    pub fn permits(&self, prefix: &Ipv4Network) -> bool {
        self.lines
            .iter()
            .find(|line| line.matches(prefix))
            .map(|line| line.action == LineAction::Permit)
            .unwrap_or(false)
    }
}

// ===== impl Route6FilterLine =====

impl Route6FilterLine {
    fn matches(&self, prefix: &Ipv6Network) -> bool {
        self.lengths.contains(&prefix.prefix())
            && prefix.prefix() >= self.prefix.prefix()
            && self.prefix.contains(prefix.network())
    }
}

// ===== impl Route6FilterList =====

impl Route6FilterList {
    pub fn permits(&self, prefix: &Ipv6Network) -> bool {
        self.lines
            .iter()
            .find(|line| line.matches(prefix))
            .map(|line| line.action == LineAction::Permit)
            .unwrap_or(false)
    }
}

// ===== impl AsPathList =====

impl AsPathList {
    // First line whose regex matches decides. Invalid regexes are reported
    // at conversion time and never match here.
    pub fn permits(&self, as_path: &str) -> bool {
        self.lines
            .iter()
            .find(|line| {
                Regex::new(&line.regex)
                    .map(|re| re.is_match(as_path))
                    .unwrap_or(false)
            })
            .map(|line| line.action == LineAction::Permit)
            .unwrap_or(false)
    }
}

// ===== impl CommunityList =====

impl CommunityList {
    // First line matching the community decides.
    pub fn permits_community(&self, comm: &Comm) -> bool {
        self.lines
            .iter()
            .find(|line| match &line.matcher {
                CommunityMatcher::Literal(lit) => lit == comm,
                CommunityMatcher::Regex(regex) => Regex::new(regex)
                    .map(|re| re.is_match(&comm.to_string()))
                    .unwrap_or(false),
            })
            .map(|line| line.action == LineAction::Permit)
            .unwrap_or(false)
    }

    // A route matches the list when any of its communities is permitted.
    pub fn matches_route(&self, comms: &BTreeSet<Comm>) -> bool {
        comms.iter().any(|comm| self.permits_community(comm))
    }
}

// ===== global functions =====

// Builds the length range accepted by a filter line matching exactly one
// prefix length.
pub fn exact_length(len: u8) -> RangeInclusive<u8> {
    len..=len
}

#[cfg(test)]
mod tests {
    use const_addrs::net4;

    use super::*;

    fn list() -> RouteFilterList {
        RouteFilterList {
            name: "TEST".to_owned(),
            lines: vec![
                RouteFilterLine {
                    action: LineAction::Deny,
                    prefix: net4!("10.0.1.0/24"),
                    lengths: 24..=32,
                },
                RouteFilterLine {
                    action: LineAction::Permit,
                    prefix: net4!("10.0.0.0/8"),
                    lengths: 8..=24,
                },
            ],
        }
    }

    #[test]
    fn test_first_match_wins() {
        let list = list();
        assert!(!list.permits(&net4!("10.0.1.0/24")));
        assert!(!list.permits(&net4!("10.0.1.128/25")));
        assert!(list.permits(&net4!("10.0.2.0/24")));
    }

    #[test]
    fn test_length_range() {
        let list = list();
        assert!(list.permits(&net4!("10.0.0.0/8")));
        assert!(!list.permits(&net4!("10.1.0.0/25")));
        assert!(!list.permits(&net4!("11.0.0.0/8")));
    }

    #[test]
    fn test_implicit_deny() {
        let list = list();
        assert!(!list.permits(&net4!("192.168.0.0/16")));
    }

    #[test]
    fn test_as_path_list() {
        let list = AsPathList {
            name: "AS100".to_owned(),
            lines: vec![AsPathListLine {
                action: LineAction::Permit,
                regex: "^100( |$)".to_owned(),
            }],
        };
        assert!(list.permits("100 200"));
        assert!(list.permits("100"));
        assert!(!list.permits("200 100"));
    }

    #[test]
    fn test_community_list() {
        let list = CommunityList {
            name: "COMM".to_owned(),
            lines: vec![
                CommunityListLine {
                    action: LineAction::Deny,
                    matcher: CommunityMatcher::Literal(Comm(65000 << 16 | 1)),
                },
                CommunityListLine {
                    action: LineAction::Permit,
                    matcher: CommunityMatcher::Regex("^65000:".to_owned()),
                },
            ],
        };
        assert!(!list.permits_community(&Comm(65000 << 16 | 1)));
        assert!(list.permits_community(&Comm(65000 << 16 | 2)));
        let comms = [Comm(65000 << 16 | 2)].into_iter().collect();
        assert!(list.matches_route(&comms));
    }
}
