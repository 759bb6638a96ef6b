//! sol_sender - transfer demo
//!
//! Drives one transfer through the form against the in-memory cluster:
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌──────────┐
//! │ Connect  │───▶│  Verify  │───▶│  Submit  │───▶│  Render  │
//! │ (wallet) │    │(address) │    │ (amount) │    │  (JSON)  │
//! └──────────┘    └──────────┘    └──────────┘    └──────────┘
//! ```
//!
//! Usage: `sol_sender [--env dev] [--airdrop 2] [--amount 1.5] [--to <base58>]`

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use sol_sender::config::AppConfig;
use sol_sender::money::{parse_sol, sol_to_lamports};
use sol_sender::{Identity, InMemoryNetwork, TransferForm};

fn get_arg(names: &[&str]) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if names.contains(&args[i].as_str()) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

fn get_env() -> String {
    get_arg(&["--env", "-e"]).unwrap_or_else(|| "dev".to_string())
}

/// Any fresh on-curve key
fn random_recipient() -> Identity {
    let key = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
    Identity::from(key.verifying_key())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env).context("loading config")?;
    let _log_guard = sol_sender::logging::init_logging(&app_config);

    info!(
        build = env!("GIT_HASH"),
        cluster = %app_config.cluster.name,
        rpc_url = %app_config.cluster.rpc_url,
        "Starting sol_sender in {} mode",
        env
    );

    let airdrop = parse_sol(&get_arg(&["--airdrop"]).unwrap_or_else(|| "2".to_string()))
        .context("parsing --airdrop")?;
    let amount = get_arg(&["--amount"]).unwrap_or_else(|| "1.5".to_string());
    let recipient = get_arg(&["--to"]).unwrap_or_else(|| random_recipient().to_string());

    let network = Arc::new(InMemoryNetwork::with_random_wallet());
    let wallet = network.wallet_identity();
    network.set_balance(wallet, sol_to_lamports(airdrop).context("airdrop amount")?);

    let mut form = TransferForm::new(
        network.clone(),
        app_config.cluster.commitment,
        &app_config.transfer,
    );
    form.connect(wallet).await;
    info!(%wallet, "Wallet connected");

    form.set_address(recipient);
    let verified = form.verify_address()?;
    if verified.valid {
        form.set_amount(amount);
        match form.submit().await {
            Ok(signature) => info!(%signature, "Transfer submitted"),
            Err(e) => warn!(code = e.code(), error = %e, "Transfer not sent"),
        }
    }

    // Let the balance notification land before rendering
    tokio::task::yield_now().await;

    let view = form.render();
    println!("{}", serde_json::to_string_pretty(&view)?);

    form.disconnect();
    Ok(())
}
