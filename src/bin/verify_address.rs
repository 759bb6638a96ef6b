use std::str::FromStr;

use sol_sender::{AddressValidator, Identity};

/// Usage: verify_address <address> [--sender <base58>]
fn main() {
    let args: Vec<String> = std::env::args().collect();
    let Some(candidate) = args.get(1) else {
        eprintln!("usage: verify_address <address> [--sender <base58>]");
        std::process::exit(2);
    };

    let sender = match args.iter().position(|a| a == "--sender") {
        Some(i) => match args.get(i + 1).map(|s| Identity::from_str(s)) {
            Some(Ok(id)) => Some(id),
            _ => {
                eprintln!("--sender must be a base58 account address");
                std::process::exit(2);
            }
        },
        None => None,
    };

    let result = AddressValidator::validate(candidate, sender.as_ref());
    match result.reason {
        None => {
            println!("✅ {}: valid recipient", candidate);
        }
        Some(reason) => {
            println!("❌ {}: {} ({})", candidate, reason, reason.code());
            std::process::exit(1);
        }
    }
}
