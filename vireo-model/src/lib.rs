//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

#![warn(rust_2018_idioms)]
#![cfg_attr(
    feature = "testing",
    allow(dead_code, unused_variables, unused_imports)
)]

pub mod diag;
pub mod eval;
pub mod filter;
pub mod ip;
pub mod model;
pub mod nat;
pub mod policy;
pub mod route;
