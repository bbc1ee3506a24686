//! Command-line front end for the bottle provenance workflows.

use std::path::PathBuf;
use std::sync::Arc;

use alloy_primitives::Address;
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use zeroize::Zeroizing;

use bottleseal::workflows::{CertificateWorkflow, CompanyWorkflow, TransferStage, TransferWorkflow};
use bottleseal::{
    BottleIdentity, ConfigStore, ContractConfig, RpcProviderConfig, RpcWalletProvider,
    WalletSession, WorkflowContext,
};

#[derive(Parser)]
#[command(
    name = "bottleseal",
    version,
    about = "Bottle provenance: registration, labels, ownership transfer and satisfaction certificates"
)]
struct Cli {
    /// JSON-RPC endpoint of the wallet-enabled node.
    #[arg(
        long,
        global = true,
        env = "BOTTLESEAL_RPC_URL",
        default_value = "http://127.0.0.1:8545"
    )]
    rpc_url: String,

    /// Path of the contract-address configuration file.
    #[arg(long, global = true, env = "BOTTLESEAL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show or update the persisted contract addresses.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Register a bottle, mint its NFT, and print its label.
    Label {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        capacity: String,
        /// Use an existing bottle address instead of generating a key pair.
        /// No QR label can be printed for it.
        #[arg(long)]
        address: Option<Address>,
        /// Skip the registration step for an already-registered address.
        #[arg(long)]
        skip_register: bool,
        /// Write the label QR code as SVG to this path.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Verify a scanned label and claim ownership of the bottle.
    Claim {
        /// The scanned private key, or `-` to read it from stdin.
        #[arg(long)]
        key: String,
    },

    /// List the bottles the connected account owns.
    Bottles,

    /// Mint the satisfaction certificate for an owned bottle.
    Certify {
        #[arg(long)]
        bottle: Address,
    },

    /// List the connected account's satisfaction certificates.
    Certificates,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the stored configuration.
    Show,
    /// Set the company contract address.
    SetCompany { address: Address },
    /// Set the customer-satisfaction contract address.
    SetSatisfaction { address: Address },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();
    let store = match &cli.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::default_location()?,
    };

    match cli.command {
        Command::Config(cmd) => run_config(&store, cmd),
        Command::Label {
            name,
            description,
            capacity,
            address,
            skip_register,
            out,
        } => {
            let ctx = connect(&cli.rpc_url, store.load()).await?;
            run_label(ctx, &name, &description, &capacity, address, skip_register, out).await
        }
        Command::Claim { key } => {
            let ctx = connect(&cli.rpc_url, store.load()).await?;
            run_claim(ctx, &key).await
        }
        Command::Bottles => {
            let ctx = connect(&cli.rpc_url, store.load()).await?;
            run_bottles(ctx).await
        }
        Command::Certify { bottle } => {
            let ctx = connect(&cli.rpc_url, store.load()).await?;
            run_certify(ctx, bottle).await
        }
        Command::Certificates => {
            let ctx = connect(&cli.rpc_url, store.load()).await?;
            run_certificates(ctx).await
        }
    }
}

/// Build a connected workflow context: reuse an already-authorized account
/// when there is one, otherwise prompt the wallet.
async fn connect(rpc_url: &str, config: ContractConfig) -> anyhow::Result<WorkflowContext> {
    let provider = Arc::new(RpcWalletProvider::new(RpcProviderConfig::new(rpc_url))?);
    let mut session = WalletSession::new(provider);
    if session.check_connection().await?.is_none() {
        session
            .connect()
            .await
            .context("could not connect a wallet account")?;
    }
    Ok(WorkflowContext::from_session(&session, config))
}

fn run_config(store: &ConfigStore, cmd: ConfigCommand) -> anyhow::Result<()> {
    let config = match cmd {
        ConfigCommand::Show => store.load(),
        ConfigCommand::SetCompany { address } => store.set_company(address)?,
        ConfigCommand::SetSatisfaction { address } => store.set_customer_satisfaction(address)?,
    };
    println!("config file: {}", store.path().display());
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

async fn run_label(
    ctx: WorkflowContext,
    name: &str,
    description: &str,
    capacity: &str,
    address: Option<Address>,
    skip_register: bool,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let identity = match address {
        Some(address) => BottleIdentity::from_address(address),
        None => BottleIdentity::generate(),
    };
    let mut flow = CompanyWorkflow::new(ctx);

    if skip_register {
        println!("skipping registration of {}", identity.address);
    } else {
        flow.register_bottle_address(identity.address).await?;
        println!("registered bottle address {}", identity.address);
    }

    flow.mint_bottle(identity.address, name, description, capacity)
        .await?;
    println!("minted NFT for bottle {}", identity.address);

    if identity.key().is_some() {
        let label = flow.label(&identity, name, description, capacity)?;
        println!("\n{}", label.terminal());
        println!("{}", label.sheet());
        if let Some(path) = out {
            std::fs::write(&path, label.svg())
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("\nlabel SVG written to {}", path.display());
        }
    } else {
        println!("no private key for this address; label printing skipped");
    }
    Ok(())
}

async fn run_claim(ctx: WorkflowContext, key: &str) -> anyhow::Result<()> {
    let key = if key == "-" {
        Zeroizing::new(std::io::read_to_string(std::io::stdin())?)
    } else {
        Zeroizing::new(key.to_owned())
    };

    let mut flow = TransferWorkflow::new(ctx);
    let bottle = flow.scan(key.trim())?;
    println!("scanned bottle {bottle}, verifying...");

    match flow.verify().await? {
        TransferStage::Verified(record) => {
            println!("verified: {} ({}, {})", record.name, record.description, record.capacity);
            println!("current owner: {}", record.owner);
        }
        TransferStage::VerificationFailed(reason) => {
            bail!("this bottle is not genuine: {reason}");
        }
        stage => bail!("unexpected verification outcome: {stage:?}"),
    }

    if !flow.transfer_offered() {
        println!("you already own this bottle; nothing to claim");
        return Ok(());
    }

    println!("claiming ownership...");
    match flow.claim_ownership().await? {
        TransferStage::TransferSucceeded(record) => {
            println!("ownership transferred; new owner: {}", record.owner);
            Ok(())
        }
        stage => bail!("unexpected transfer outcome: {stage:?}"),
    }
}

async fn run_bottles(ctx: WorkflowContext) -> anyhow::Result<()> {
    let flow = CertificateWorkflow::new(ctx);
    let bottles = flow.list_owned_bottles().await?;
    if bottles.is_empty() {
        println!("no bottles owned by the connected account");
        return Ok(());
    }
    for bottle in bottles {
        let cert = if bottle.has_certificate {
            "certificate minted"
        } else {
            "no certificate"
        };
        println!(
            "{}  {} ({}, {})  [{}]",
            bottle.record.bottle_address,
            bottle.record.name,
            bottle.record.description,
            bottle.record.capacity,
            cert,
        );
    }
    Ok(())
}

async fn run_certify(ctx: WorkflowContext, bottle: Address) -> anyhow::Result<()> {
    let mut flow = CertificateWorkflow::new(ctx);
    flow.mint_certificate(bottle).await?;
    println!("satisfaction certificate minted for bottle {bottle}");
    Ok(())
}

async fn run_certificates(ctx: WorkflowContext) -> anyhow::Result<()> {
    let flow = CertificateWorkflow::new(ctx);
    let (balance, records) = flow.list_certificates().await?;
    println!("certificate balance: {balance}");
    for record in records {
        println!(
            "#{}  bottle {}  owner {}",
            record.token_id, record.bottle_address, record.bottle_owner,
        );
    }
    Ok(())
}
