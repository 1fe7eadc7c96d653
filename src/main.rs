//! `rsk-cli`: command-line front end for the Rootstock wallet engine.
//!
//! ```text
//! rsk-cli createWallet [--testnet] [--force]
//! rsk-cli importWallet [--testnet] [--force]
//! rsk-cli balance      [--testnet]
//! rsk-cli transfer     --address <addr> --value <rbtc> [--testnet] [--no-wait]
//! rsk-cli tx           --txid <hash> [--testnet] [--wait]
//! ```
//!
//! Results go to stdout, logs and errors to stderr. Exit status is 0 on
//! success, 1 on error and 2 when a broadcast may or may not have gone through.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use rsk_wallet::blockchain::units::format_rbtc;
use rsk_wallet::config::resolve_config;
use rsk_wallet::engine::parse_tx_hash;
use rsk_wallet::lifecycle::signals::spawn_ctrl_c_listener;
use rsk_wallet::observability::init_logging;
use rsk_wallet::{EngineError, Network, Shutdown, TransactionReceipt, WalletEngine};

/// Passphrase source when `--passphrase-file` is not given.
const PASSPHRASE_ENV_VAR: &str = "RSK_WALLET_PASSPHRASE";

/// Private key source for `importWallet`; never accepted on the command line.
const IMPORT_KEY_ENV_VAR: &str = "RSK_IMPORT_PRIVATE_KEY";

const EXIT_OUTCOME_UNKNOWN: u8 = 2;

#[derive(Parser)]
#[command(name = "rsk-cli")]
#[command(about = "Wallet and transfer tool for the Rootstock network", long_about = None)]
struct Cli {
    /// Configuration file (defaults to $RSK_CLI_CONFIG, then <data dir>/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Read the wallet passphrase from this file instead of prompting
    #[arg(long, global = true)]
    passphrase_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new wallet and store it encrypted
    #[command(name = "createWallet")]
    CreateWallet {
        #[arg(long)]
        testnet: bool,
        /// Replace an existing wallet for this network
        #[arg(long)]
        force: bool,
    },
    /// Store an existing private key as the wallet
    #[command(name = "importWallet")]
    ImportWallet {
        #[arg(long)]
        testnet: bool,
        #[arg(long)]
        force: bool,
    },
    /// Show the wallet balance
    Balance {
        #[arg(long)]
        testnet: bool,
    },
    /// Send rBTC to an address
    Transfer {
        /// Recipient address
        #[arg(long)]
        address: String,
        /// Amount in rBTC, e.g. 0.001
        #[arg(long)]
        value: String,
        #[arg(long)]
        testnet: bool,
        /// Return after broadcast without waiting for confirmations
        #[arg(long)]
        no_wait: bool,
    },
    /// Show the status of a transaction
    Tx {
        #[arg(long)]
        txid: String,
        #[arg(long)]
        testnet: bool,
        /// Poll until the transaction settles
        #[arg(long)]
        wait: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            match e.downcast_ref::<EngineError>() {
                Some(engine_err) if engine_err.outcome_unknown() => {
                    if let Some(hash) = engine_err.pending_hash() {
                        eprintln!(
                            "The transaction may still be pending. Check it with `rsk-cli tx --txid {}` before sending again.",
                            hash
                        );
                    }
                    ExitCode::from(EXIT_OUTCOME_UNKNOWN)
                }
                _ => ExitCode::FAILURE,
            }
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = resolve_config(cli.config.as_deref())?;
    init_logging(&config.observability.log_level);

    tracing::debug!(data_dir = ?config.data_dir, "Configuration loaded");

    let shutdown = Shutdown::new();
    let engine = WalletEngine::new(config).with_shutdown(shutdown.clone());
    let passphrase_file = cli.passphrase_file.as_deref();

    match cli.command {
        Commands::CreateWallet { testnet, force } => {
            let network = Network::from_testnet_flag(testnet);
            let passphrase = read_passphrase(passphrase_file, true)?;
            let wallet = engine.create_wallet(network, &passphrase, force)?;

            println!("Wallet created on {}", network);
            println!("Address:  {}", wallet.address);
            println!("Saved to: {}", engine.keystore().wallet_path(network).display());
            println!("Explorer: {}", engine.explorer_address_url(network, wallet.address));
        }
        Commands::ImportWallet { testnet, force } => {
            let network = Network::from_testnet_flag(testnet);
            let private_key = read_private_key()?;
            let passphrase = read_passphrase(passphrase_file, true)?;
            let wallet = engine.import_wallet(network, &private_key, &passphrase, force)?;

            println!("Wallet imported on {}", network);
            println!("Address:  {}", wallet.address);
            println!("Saved to: {}", engine.keystore().wallet_path(network).display());
        }
        Commands::Balance { testnet } => {
            let network = Network::from_testnet_flag(testnet);
            let report = engine.balance(network).await?;

            println!("Address: {}", report.address);
            println!("Balance: {} rBTC", report.rbtc());
            println!("Explorer: {}", engine.explorer_address_url(network, report.address));
        }
        Commands::Transfer {
            address,
            value,
            testnet,
            no_wait,
        } => {
            let network = Network::from_testnet_flag(testnet);
            let passphrase = read_passphrase(passphrase_file, false)?;
            let receipt = engine.transfer(network, &address, &value, &passphrase).await?;

            println!("Transaction sent on {}", network);
            println!("Hash:     {}", receipt.tx_hash);
            println!("From:     {}", receipt.from);
            println!("To:       {}", receipt.to);
            println!("Value:    {} rBTC", format_rbtc(receipt.value));
            println!("Nonce:    {}", receipt.nonce);
            println!("Explorer: {}", engine.explorer_tx_url(network, receipt.tx_hash));

            if !no_wait {
                let _listener = spawn_ctrl_c_listener(shutdown.clone());
                let status = engine.status(network, receipt.tx_hash, true).await?;
                print_status(&status);
            }
        }
        Commands::Tx {
            txid,
            testnet,
            wait,
        } => {
            let network = Network::from_testnet_flag(testnet);
            let hash = parse_tx_hash(&txid)?;
            if wait {
                let _listener = spawn_ctrl_c_listener(shutdown.clone());
            }
            let status = engine.status(network, hash, wait).await?;

            print_status(&status);
            println!("Explorer: {}", engine.explorer_tx_url(network, hash));
        }
    }

    Ok(())
}

fn print_status(receipt: &TransactionReceipt) {
    println!("Status:   {}", receipt.status);
    if let Some(block) = receipt.block_number {
        println!("Block:    {}", block);
        println!("Confirmations: {}", receipt.confirmations);
    }
    if let Some(gas_used) = receipt.gas_used {
        println!("Gas used: {}", gas_used);
    }
}

/// Passphrase from `--passphrase-file`, then `RSK_WALLET_PASSPHRASE`, then an
/// interactive prompt. New wallets are asked for twice.
fn read_passphrase(file: Option<&Path>, confirm: bool) -> Result<SecretString, Box<dyn Error>> {
    if let Some(path) = file {
        let contents = Zeroizing::new(
            std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read passphrase file {}: {}", path.display(), e))?,
        );
        let passphrase = contents.trim_end_matches(['\r', '\n']).to_string();
        return Ok(SecretString::from(passphrase));
    }

    if let Ok(passphrase) = std::env::var(PASSPHRASE_ENV_VAR) {
        return Ok(SecretString::from(passphrase));
    }

    let passphrase = SecretString::from(rpassword::prompt_password("Wallet passphrase: ")?);
    if confirm {
        let again = Zeroizing::new(rpassword::prompt_password("Confirm passphrase: ")?);
        if again.as_str() != passphrase.expose_secret() {
            return Err("passphrases do not match".into());
        }
    }
    Ok(passphrase)
}

/// Private key from `RSK_IMPORT_PRIVATE_KEY` or a hidden prompt.
fn read_private_key() -> Result<SecretString, Box<dyn Error>> {
    if let Ok(key) = std::env::var(IMPORT_KEY_ENV_VAR) {
        return Ok(SecretString::from(key));
    }
    Ok(SecretString::from(rpassword::prompt_password(
        "Private key (hex): ",
    )?))
}
