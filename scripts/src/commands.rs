//! Implementations of the deploy and status commands

use tracing::info;

use crate::{
    cli::{DeployArgs, StatusArgs},
    config::{check_distribution_totals, DeployerConfig},
    constants::{
        L1_CHAIN_ID, L1_LOCAL_CHAIN_ID, L2_CHAIN_ID, L2_LOCAL_CHAIN_ID, L3_CHAIN_ID,
        L3_LOCAL_CHAIN_ID,
    },
    deploy::{step_statuses, Deployer},
    errors::ScriptError,
    progress::DeployProgress,
    recipients::{
        load_amount_recipients, load_claim_recipients, map_entitlements, total_amount,
    },
    utils::{setup_client, verify_chain_id},
};

/// Run the full deployment sequence
pub async fn deploy(args: DeployArgs) -> Result<(), ScriptError> {
    let config = DeployerConfig::load(&args.config_path)?;

    // Validate every input before the first chain interaction
    let claim_recipients = load_claim_recipients(&args.claim_recipients_path)?;
    let claim_entitlements = map_entitlements(&claim_recipients)?;
    let dao_recipients = load_amount_recipients(&args.dao_recipients_path)?;
    let vested_recipients = load_amount_recipients(&args.vested_recipients_path)?;
    check_distribution_totals(
        &config,
        total_amount(claim_entitlements.values()),
        total_amount(dao_recipients.values()),
        total_amount(vested_recipients.values()),
    )?;
    info!(
        "loaded {} claim, {} dao, and {} vested recipients",
        claim_entitlements.len(),
        dao_recipients.len(),
        vested_recipients.len()
    );

    let (expected_l1, expected_l2, expected_l3) = if args.local {
        (L1_LOCAL_CHAIN_ID, L2_LOCAL_CHAIN_ID, L3_LOCAL_CHAIN_ID)
    } else {
        (L1_CHAIN_ID, L2_CHAIN_ID, L3_CHAIN_ID)
    };

    let l1 = setup_client(&args.l1_priv_key, &args.l1_rpc_url).await?;
    verify_chain_id(&l1, "l1", expected_l1).await?;
    let l2 = setup_client(&args.l2_priv_key, &args.l2_rpc_url).await?;
    verify_chain_id(&l2, "l2", expected_l2).await?;

    let l3 = if args.deploy_l3 {
        let rpc_url = args.l3_rpc_url.as_deref().ok_or_else(|| {
            ScriptError::ClientInitialization("l3 rpc url is required".to_string())
        })?;
        let priv_key = args.l3_priv_key.as_deref().ok_or_else(|| {
            ScriptError::ClientInitialization("l3 private key is required".to_string())
        })?;
        let client = setup_client(priv_key, rpc_url).await?;
        verify_chain_id(&client, "l3", expected_l3).await?;
        Some(client)
    } else {
        None
    };

    let progress = DeployProgress::load(&args.progress_path)?;
    let mut deployer = Deployer::new(
        l1,
        l2,
        l3,
        expected_l2,
        config,
        args.artifacts_dir,
        progress,
        claim_entitlements,
    );
    deployer.run().await
}

/// Print the completion state of every deployment step
pub fn status(args: StatusArgs) -> Result<(), ScriptError> {
    let progress = DeployProgress::load(&args.progress_path)?;

    for (name, done) in step_statuses(&progress, args.deploy_l3) {
        let marker = if done { "done   " } else { "pending" };
        println!("[{marker}] {name}");
    }
    Ok(())
}
