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

pub mod bgp;
pub mod collections;
pub mod convert;
mod debug;
pub mod eigrp;
pub mod error;
pub mod filter;
pub mod inherit;
pub mod names;
pub mod nat;
pub mod ospf;
pub mod policy;
pub mod refs;
pub mod rip;
pub mod routerid;

pub use convert::{ConvertOutput, convert};
pub use error::Error;
