//! Command-line client for the bankgate adapter.
//!
//! # Usage
//!
//! ```bash
//! # Seal and open a virtual-account payload with the credit key pair
//! bankgate encrypt --product credit '{"trx_id":"INV-1"}'
//! bankgate decrypt --product credit "<ciphertext>"
//!
//! # Gateway operations
//! bankgate balance 0115476117
//! bankgate transfer --from 0115476117 --bank 014 --to 3333333333 --name Siti --amount 150000
//!
//! # Virtual-account inquiry
//! bankgate va-inquiry --product debit INV-1
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to TOML configuration file (default: `bankgate.toml`)
//! - `RUST_LOG` - Log level filter (default: `info`)

mod config;

use std::sync::Arc;

use bankgate::cipher;
use bankgate::contract::VaProduct;
use bankgate::resource::ResourceId;
use bankgate_http::provider::TransferRequest;
use bankgate_http::{
    BankProvider, OpgProvider, ProviderRegistry, RemoteCall, StaticBankRouting, TokenCache,
    VaProvider, provider_registry,
};
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;

#[derive(Debug, Parser)]
#[command(name = "bankgate", version, about = "Talk to the bank's gateway and virtual-account APIs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Product {
    Credit,
    Debit,
}

impl From<Product> for VaProduct {
    fn from(product: Product) -> Self {
        match product {
            Product::Credit => Self::Credit,
            Product::Debit => Self::Debit,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Encrypt a payload with a virtual-account key pair.
    Encrypt {
        #[arg(long, value_enum, default_value = "credit")]
        product: Product,
        plaintext: String,
    },
    /// Decrypt a virtual-account payload.
    Decrypt {
        #[arg(long, value_enum, default_value = "credit")]
        product: Product,
        ciphertext: String,
    },
    /// Show an account balance.
    Balance { account: String },
    /// Show a virtual-account billing.
    VaInquiry {
        #[arg(long, value_enum, default_value = "credit")]
        product: Product,
        trx_id: String,
    },
    /// Transfer funds, in-house or to another bank.
    Transfer {
        #[arg(long)]
        from: String,
        /// Destination bank code.
        #[arg(long)]
        bank: String,
        #[arg(long)]
        to: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        amount: Decimal,
        #[arg(long, default_value = "")]
        remark: String,
        /// Reuse when retrying the same transfer.
        #[arg(long)]
        reference: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(Cli::parse()).await {
        tracing::error!("bankgate failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::load()?;
    tracing::info!(
        gateway = %config.bank.opg.endpoint.base_url,
        va = %config.bank.va.endpoint.base_url,
        routes = config.routing.len(),
        "Loaded configuration"
    );

    match cli.command {
        Command::Encrypt { product, plaintext } => {
            let keys = VaProduct::from(product).credentials(&config.bank.va);
            emit(&cipher::encrypt(&plaintext, &keys.client_id, &keys.secret_key)?)?;
        }
        Command::Decrypt {
            product,
            ciphertext,
        } => {
            let keys = VaProduct::from(product).credentials(&config.bank.va);
            emit(&cipher::decrypt(&ciphertext, &keys.client_id, &keys.secret_key)?)?;
        }
        Command::Balance { account } => {
            let providers = providers(config);
            emit(&gateway(&providers)?.get_balance(&account).await?)?;
        }
        Command::VaInquiry { product, trx_id } => {
            let providers = providers(config);
            let va = virtual_account(&providers, product.into())?;
            emit(&va.get_inquiry(&trx_id).await?)?;
        }
        Command::Transfer {
            from,
            bank,
            to,
            name,
            amount,
            remark,
            reference,
        } => {
            let providers = providers(config);
            let request = TransferRequest {
                reference,
                source_account: from,
                destination_bank_code: bank,
                destination_account: to,
                destination_name: name,
                amount,
                remark,
                charge_mode: None,
            };
            emit(&gateway(&providers)?.transfer(request).await?)?;
        }
    }
    Ok(())
}

fn providers(config: CliConfig) -> ProviderRegistry {
    let routing: StaticBankRouting = config.routing.into_iter().collect();
    provider_registry(
        Arc::new(config.bank.opg),
        &Arc::new(config.bank.va),
        RemoteCall::new(),
        Arc::new(TokenCache::new()),
        Arc::new(routing),
    )
}

fn gateway(providers: &ProviderRegistry) -> Result<OpgProvider, Box<dyn std::error::Error>> {
    match providers.resolve(ResourceId::OpgGeneric)? {
        BankProvider::Opg(provider) => Ok(provider),
        BankProvider::Va(_) => Err("OPG_GENERIC is not a gateway provider".into()),
    }
}

fn virtual_account(
    providers: &ProviderRegistry,
    product: VaProduct,
) -> Result<VaProvider, Box<dyn std::error::Error>> {
    match providers.resolve(product.resource())? {
        BankProvider::Va(provider) => Ok(provider),
        BankProvider::Opg(_) => Err(format!("{} is not a virtual-account provider", product.resource()).into()),
    }
}

#[allow(clippy::print_stdout)]
fn emit<T: Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
