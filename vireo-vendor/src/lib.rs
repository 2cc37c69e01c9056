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

pub mod acl;
pub mod bgp;
pub mod config;
pub mod igp;
pub mod interface;
pub mod nat;
pub mod routemap;
