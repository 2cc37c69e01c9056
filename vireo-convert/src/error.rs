//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::error;

// Conversion errors.
//
// Everything recoverable is a diagnostic, never an `Error`; these variants
// are internal invariant violations that abort the configuration unit being
// converted.
#[derive(Debug)]
pub enum Error {
    InterfaceMissingVrf(String, String),
    DuplicatePolicy(String),
}

// ===== impl Error =====

impl Error {
    pub(crate) fn log(&self) {
        match self {
            Error::InterfaceMissingVrf(interface, vrf) => {
                error!(%interface, %vrf, "{}", self);
            }
            Error::DuplicatePolicy(name) => {
                error!(%name, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InterfaceMissingVrf(..) => {
                write!(f, "interface bound to an undefined VRF")
            }
            Error::DuplicatePolicy(..) => {
                write!(f, "synthesized policy name collision")
            }
        }
    }
}

impl std::error::Error for Error {}
