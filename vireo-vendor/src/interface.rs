//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_VRF;

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Interface {
    pub name: String,
    pub vrf: String,
    // Primary address first, secondaries after.
    pub addresses: Vec<Ipv4Network>,
    pub active: bool,
    pub nat_inside: bool,
    pub nat_outside: bool,
}

// ===== impl Interface =====

impl Interface {
    pub fn new(name: impl Into<String>) -> Interface {
        Interface {
            name: name.into(),
            vrf: DEFAULT_VRF.to_owned(),
            addresses: Vec::new(),
            active: true,
            nat_inside: false,
            nat_outside: false,
        }
    }

    pub fn primary_address(&self) -> Option<Ipv4Network> {
        self.addresses.first().copied()
    }

    pub fn is_loopback(&self) -> bool {
        self.name.to_lowercase().starts_with("loopback")
    }
}
