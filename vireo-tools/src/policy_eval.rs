//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

use std::process::exit;

use clap::{App, Arg};
use vireo_model::eval::apply_policy;
use vireo_model::model::Model;
use vireo_model::policy::PolicyResult;
use vireo_model::route::{Route, RouteProtocol};

fn parse_protocol(name: &str) -> Option<RouteProtocol> {
    let protocol = match name {
        "connected" => RouteProtocol::Connected,
        "static" => RouteProtocol::Static,
        "rip" => RouteProtocol::Rip,
        "ospf" => RouteProtocol::Ospf,
        "eigrp" => RouteProtocol::Eigrp,
        "bgp" => RouteProtocol::Bgp,
        "ibgp" => RouteProtocol::Ibgp,
        "aggregate" => RouteProtocol::Aggregate,
        _ => return None,
    };
    Some(protocol)
}

fn main() {
    let matches = App::new("policy_eval")
        .about(
            "Applies a compiled policy from a converted model to a \
             synthetic route and prints the verdict",
        )
        .arg(
            Arg::with_name("MODEL")
                .help("Converted model JSON file")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("POLICY")
                .help("Name of the policy to apply")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::with_name("PREFIX")
                .help("Route prefix to evaluate")
                .required(true)
                .index(3),
        )
        .arg(
            Arg::with_name("protocol")
                .long("protocol")
                .help("Protocol of the synthetic route")
                .takes_value(true)
                .default_value("bgp"),
        )
        .get_matches();

    let path = matches.value_of("MODEL").unwrap();
    let data = std::fs::read_to_string(path).unwrap_or_else(|error| {
        eprintln!("failed to read {}: {}", path, error);
        exit(1);
    });
    let model: Model = serde_json::from_str(&data).unwrap_or_else(|error| {
        eprintln!("failed to parse {}: {}", path, error);
        exit(1);
    });

    let policy = matches.value_of("POLICY").unwrap();
    if !model.policies.contains_key(policy) {
        eprintln!("no such policy: {}", policy);
        exit(1);
    }
    let prefix = matches.value_of("PREFIX").unwrap();
    let prefix = prefix.parse().unwrap_or_else(|error| {
        eprintln!("invalid prefix {}: {}", prefix, error);
        exit(1);
    });
    let protocol = matches.value_of("protocol").unwrap();
    let protocol = parse_protocol(protocol).unwrap_or_else(|| {
        eprintln!("unknown protocol: {}", protocol);
        exit(1);
    });

    match apply_policy(&model, policy, &Route::new(prefix, protocol)) {
        PolicyResult::Accept(route) => {
            println!("accept");
            // Serialization of a route cannot fail.
            println!("{}", serde_json::to_string_pretty(&route).unwrap());
        }
        PolicyResult::Reject => println!("reject"),
    }
}
