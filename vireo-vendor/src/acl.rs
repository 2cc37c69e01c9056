//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! Filtering structures in their parsed vendor form: access lists, prefix
//! lists, as-path lists and community lists. Network fields arrive already
//! normalized (wildcard masks resolved by the front-end); list entries keep
//! vendor regex syntax untranslated.

use std::ops::RangeInclusive;

use derive_new::new;
use ipnetwork::{Ipv4Network, Ipv6Network};
use serde::{Deserialize, Serialize};

use vireo_model::filter::{CommunityMatcher, LineAction};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(new)]
#[derive(Deserialize, Serialize)]
pub struct AccessListLine {
    pub action: LineAction,
    pub src: Ipv4Network,
    // Extended lists carry a destination; standard lists leave it unset.
    pub dst: Option<Ipv4Network>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct AccessList {
    pub name: String,
    pub lines: Vec<AccessListLine>,
    pub definition_line: Option<u32>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(new)]
#[derive(Deserialize, Serialize)]
pub struct PrefixListLine {
    pub action: LineAction,
    pub prefix: Ipv4Network,
    // Permitted prefix lengths (`ge`/`le` resolved by the front-end).
    pub lengths: RangeInclusive<u8>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct PrefixList {
    pub name: String,
    pub lines: Vec<PrefixListLine>,
    pub definition_line: Option<u32>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(new)]
#[derive(Deserialize, Serialize)]
pub struct Prefix6ListLine {
    pub action: LineAction,
    pub prefix: Ipv6Network,
    pub lengths: RangeInclusive<u8>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Prefix6List {
    pub name: String,
    pub lines: Vec<Prefix6ListLine>,
    pub definition_line: Option<u32>,
}

// As-path access list with untranslated vendor regex lines (`_` wildcards).
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct AsPathList {
    pub name: String,
    pub lines: Vec<(LineAction, String)>,
    pub definition_line: Option<u32>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct CommunityList {
    pub name: String,
    pub lines: Vec<(LineAction, CommunityMatcher)>,
    pub definition_line: Option<u32>,
}

// ===== impl AccessList =====

impl AccessList {
    pub fn new(name: impl Into<String>) -> AccessList {
        AccessList {
            name: name.into(),
            lines: Vec::new(),
            definition_line: None,
        }
    }
}

// ===== impl PrefixList =====

impl PrefixList {
    pub fn new(name: impl Into<String>) -> PrefixList {
        PrefixList {
            name: name.into(),
            lines: Vec::new(),
            definition_line: None,
        }
    }
}
