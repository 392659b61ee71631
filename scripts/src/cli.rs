//! Definitions of CLI arguments and commands for the deploy scripts.
//!
//! Every required setting can be supplied as a flag or through the
//! corresponding environment variable; a missing setting is a fatal startup
//! error naming the variable.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{commands, errors::ScriptError};

#[derive(Parser)]
#[command(name = "governance-scripts", about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full deployment sequence, resuming any recorded progress
    Deploy(DeployArgs),
    /// Show which deployment steps have been recorded as complete
    Status(StatusArgs),
}

impl Command {
    pub async fn run(self) -> Result<(), ScriptError> {
        match self {
            Command::Deploy(args) => commands::deploy(args).await,
            Command::Status(args) => commands::status(args),
        }
    }
}

/// Run the full deployment sequence
#[derive(Args)]
pub struct DeployArgs {
    /// L1 RPC URL
    #[arg(long, env = "GOV_DEPLOYER_L1_RPC_URL")]
    pub l1_rpc_url: String,

    /// L2 RPC URL
    #[arg(long, env = "GOV_DEPLOYER_L2_RPC_URL")]
    pub l2_rpc_url: String,

    /// L3 RPC URL, required when deploying to the L3 chain
    #[arg(long, env = "GOV_DEPLOYER_L3_RPC_URL", required_if_eq("deploy_l3", "true"))]
    pub l3_rpc_url: Option<String>,

    /// Private key of the deployer on the L1 chain
    #[arg(long, env = "GOV_DEPLOYER_L1_PRIV_KEY", hide_env_values = true)]
    pub l1_priv_key: String,

    /// Private key of the deployer on the L2 chain
    #[arg(long, env = "GOV_DEPLOYER_L2_PRIV_KEY", hide_env_values = true)]
    pub l2_priv_key: String,

    /// Private key of the deployer on the L3 chain, required when deploying
    /// to the L3 chain
    #[arg(
        long,
        env = "GOV_DEPLOYER_L3_PRIV_KEY",
        hide_env_values = true,
        required_if_eq("deploy_l3", "true")
    )]
    pub l3_priv_key: Option<String>,

    /// Path of the deployer configuration file
    #[arg(long, env = "GOV_DEPLOYER_CONFIG_FILE")]
    pub config_path: PathBuf,

    /// Path of the claim recipients file (account -> eligibility points)
    #[arg(long, env = "GOV_DEPLOYER_CLAIM_RECIPIENTS_FILE")]
    pub claim_recipients_path: PathBuf,

    /// Path of the DAO recipients file (account -> whole-token amount)
    #[arg(long, env = "GOV_DEPLOYER_DAO_RECIPIENTS_FILE")]
    pub dao_recipients_path: PathBuf,

    /// Path of the vested recipients file (account -> whole-token amount)
    #[arg(long, env = "GOV_DEPLOYER_VESTED_RECIPIENTS_FILE")]
    pub vested_recipients_path: PathBuf,

    /// Path of the deploy progress file
    #[arg(long, env = "GOV_DEPLOYER_PROGRESS_FILE")]
    pub progress_path: PathBuf,

    /// Directory holding the contract build artifacts
    #[arg(long, env = "GOV_DEPLOYER_ARTIFACTS_DIR")]
    pub artifacts_dir: PathBuf,

    /// Also deploy the governance contracts to the L3 chain
    #[arg(long, env = "GOV_DEPLOYER_DEPLOY_L3", default_value_t = false)]
    pub deploy_l3: bool,

    /// Verify chain ids against the local test nodes instead of the
    /// production networks
    #[arg(long, env = "GOV_DEPLOYER_LOCAL", default_value_t = false)]
    pub local: bool,
}

/// Show recorded deployment progress
#[derive(Args)]
pub struct StatusArgs {
    /// Path of the deploy progress file
    #[arg(long, env = "GOV_DEPLOYER_PROGRESS_FILE")]
    pub progress_path: PathBuf,

    /// Include the L3 deployment steps
    #[arg(long, env = "GOV_DEPLOYER_DEPLOY_L3", default_value_t = false)]
    pub deploy_l3: bool,
}
