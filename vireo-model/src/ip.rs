//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! Small prefix helpers shared across the workspace.

use std::net::{IpAddr, Ipv4Addr};

use ipnetwork::{IpNetwork, Ipv4Network};

// Extension methods for IP addresses.
pub trait IpAddrExt {
    // Returns the host prefix (/32 or /128) for the address.
    fn to_host_prefix(&self) -> IpNetwork;
}

// Extension methods for IPv4 addresses.
pub trait Ipv4AddrExt {
    // Returns the /32 prefix for the address.
    fn to_host_prefix(&self) -> Ipv4Network;
}

// Extension methods for IPv4 prefixes.
pub trait Ipv4NetworkExt {
    const MAX_PREFIXLEN: u8 = 32;

    // Clears the host bits of the prefix address.
    fn apply_mask(&self) -> Ipv4Network;

    // Same network address at a different prefix length.
    fn with_prefix(&self, prefix: u8) -> Ipv4Network;
}

// ===== impl IpAddr =====

impl IpAddrExt for IpAddr {
    fn to_host_prefix(&self) -> IpNetwork {
        // The prefix length always fits the address family.
        IpNetwork::new(*self, if self.is_ipv4() { 32 } else { 128 }).unwrap()
    }
}

// ===== impl Ipv4Addr =====

impl Ipv4AddrExt for Ipv4Addr {
    fn to_host_prefix(&self) -> Ipv4Network {
        Ipv4Network::new(*self, Ipv4Network::MAX_PREFIXLEN).unwrap()
    }
}

// ===== impl Ipv4Network =====

impl Ipv4NetworkExt for Ipv4Network {
    fn apply_mask(&self) -> Ipv4Network {
        Ipv4Network::new(self.network(), self.prefix()).unwrap()
    }

    fn with_prefix(&self, prefix: u8) -> Ipv4Network {
        let prefix = prefix.min(Self::MAX_PREFIXLEN);
        Ipv4Network::new(self.network(), prefix).unwrap().apply_mask()
    }
}
