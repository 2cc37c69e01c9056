//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::{debug, debug_span};

// Conversion debug messages.
#[derive(Debug)]
pub enum Debug<'a> {
    ConversionStart(&'a str),
    PolicyCompiled(&'a str, usize),
    ProcessConverted(&'a str, &'a str),
    NatComposed(&'a str, usize),
    TemplateCycle(&'a str),
}

// ===== impl Debug =====

impl Debug<'_> {
    // Log debug message using the tracing API.
    pub(crate) fn log(&self) {
        match self {
            Debug::ConversionStart(hostname) => {
                debug!(%hostname, "{}", self);
            }
            Debug::PolicyCompiled(name, subpolicies) => {
                // Parent span(s): convert
                debug_span!("policy", %name).in_scope(|| {
                    debug!(%subpolicies, "{}", self);
                });
            }
            Debug::ProcessConverted(vrf, protocol) => {
                // Parent span(s): convert
                debug_span!("vrf", name = %vrf).in_scope(|| {
                    debug!(%protocol, "{}", self);
                });
            }
            Debug::NatComposed(direction, rules) => {
                // Parent span(s): convert
                debug_span!("nat").in_scope(|| {
                    debug!(%direction, %rules, "{}", self);
                });
            }
            Debug::TemplateCycle(name) => {
                // Parent span(s): convert
                debug!(%name, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Debug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Debug::ConversionStart(..) => {
                write!(f, "starting conversion")
            }
            Debug::PolicyCompiled(..) => {
                write!(f, "policy compiled")
            }
            Debug::ProcessConverted(..) => {
                write!(f, "routing process converted")
            }
            Debug::NatComposed(..) => {
                write!(f, "NAT transformation composed")
            }
            Debug::TemplateCycle(..) => {
                write!(f, "template inheritance cycle detected")
            }
        }
    }
}
