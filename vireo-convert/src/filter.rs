//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! Conversions from vendor filtering structures to their model
//! counterparts. These are pure translations; reference checking happens at
//! the sites that consume the converted lists.

use vireo_model::filter::{
    self, AsPathListLine, CommunityListLine, Route6FilterLine,
    Route6FilterList, RouteFilterLine, RouteFilterList, exact_length,
};
use vireo_model::nat::{FlowAcl, FlowAclLine};
use vireo_vendor::acl::{
    AccessList, AsPathList, CommunityList, Prefix6List, PrefixList,
};

pub fn convert_prefix_list(list: &PrefixList) -> RouteFilterList {
    RouteFilterList {
        name: list.name.clone(),
        lines: list
            .lines
            .iter()
            .map(|line| RouteFilterLine {
                action: line.action,
                prefix: line.prefix,
                lengths: line.lengths.clone(),
            })
            .collect(),
    }
}

pub fn convert_prefix6_list(list: &Prefix6List) -> Route6FilterList {
    Route6FilterList {
        name: list.name.clone(),
        lines: list
            .lines
            .iter()
            .map(|line| Route6FilterLine {
                action: line.action,
                prefix: line.prefix,
                lengths: line.lengths.clone(),
            })
            .collect(),
    }
}

// Routing view of an access list: each line's source network is matched as
// an exact prefix. Used when an ACL stands in for a prefix filter
// (distribute lists, route-map address matches).
pub fn convert_access_list(acl: &AccessList) -> RouteFilterList {
    RouteFilterList {
        name: acl.name.clone(),
        lines: acl
            .lines
            .iter()
            .map(|line| RouteFilterLine {
                action: line.action,
                prefix: line.src,
                lengths: exact_length(line.src.prefix()),
            })
            .collect(),
    }
}

pub fn convert_as_path_list(list: &AsPathList) -> filter::AsPathList {
    filter::AsPathList {
        name: list.name.clone(),
        lines: list
            .lines
            .iter()
            .map(|(action, regex)| AsPathListLine {
                action: *action,
                regex: vendor_regex(regex),
            })
            .collect(),
    }
}

pub fn convert_community_list(list: &CommunityList) -> filter::CommunityList {
    filter::CommunityList {
        name: list.name.clone(),
        lines: list
            .lines
            .iter()
            .map(|(action, matcher)| CommunityListLine {
                action: *action,
                matcher: match matcher {
                    filter::CommunityMatcher::Regex(regex) => {
                        filter::CommunityMatcher::Regex(vendor_regex(regex))
                    }
                    literal => literal.clone(),
                },
            })
            .collect(),
    }
}

// Packet-matching view of an access list, used by NAT guards.
pub fn convert_flow_acl(acl: &AccessList) -> FlowAcl {
    FlowAcl {
        name: acl.name.clone(),
        lines: acl
            .lines
            .iter()
            .map(|line| FlowAclLine {
                action: line.action,
                src: Some(line.src),
                dst: line.dst,
            })
            .collect(),
    }
}

// ===== helper functions =====

// Vendor regexes treat `_` as "any delimiter or end"; as-paths and
// communities render space-separated here, so a start/end/space class
// covers it.
fn vendor_regex(regex: &str) -> String {
    regex.replace('_', "(^|$| )")
}

#[cfg(test)]
mod tests {
    use const_addrs::net4;
    use vireo_model::filter::LineAction;
    use vireo_vendor::acl::AccessListLine;

    use super::*;

    #[test]
    fn test_vendor_regex() {
        assert_eq!(vendor_regex("_100_"), "(^|$| )100(^|$| )");
        assert_eq!(vendor_regex("^65000:"), "^65000:");
    }

    #[test]
    fn test_access_list_routing_view() {
        let mut acl = AccessList::new("OUT");
        acl.lines.push(AccessListLine::new(
            LineAction::Permit,
            net4!("10.0.0.0/24"),
            None,
        ));
        let list = convert_access_list(&acl);

        // Exact-length match only.
        assert!(list.permits(&net4!("10.0.0.0/24")));
        assert!(!list.permits(&net4!("10.0.0.0/25")));
        assert!(!list.permits(&net4!("10.0.0.0/23")));
    }
}
