//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

//! Reference tracking for the unused-structure report. Every stage that
//! consumes a named structure notes it here; after conversion, the driver
//! compares the set against everything the configuration defines.

use std::collections::BTreeSet;

use vireo_model::diag::StructureKind;

#[derive(Debug, Default)]
pub struct References(BTreeSet<(StructureKind, String)>);

// ===== impl References =====

impl References {
    pub fn new() -> References {
        References::default()
    }

    pub fn note(&mut self, kind: StructureKind, name: impl Into<String>) {
        self.0.insert((kind, name.into()));
    }

    pub fn contains(&self, kind: StructureKind, name: &str) -> bool {
        self.0.contains(&(kind, name.to_owned()))
    }
}
