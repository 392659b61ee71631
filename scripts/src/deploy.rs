//! The deployment sequence: a fixed, strictly ordered set of steps that
//! deploys and wires the governance contracts across the three chains.
//!
//! Every step is gated by a completion check against the progress file and
//! records its artifacts immediately on confirmation. Rerunning the deployer
//! after a failure therefore skips everything already confirmed and picks up
//! at the first unrecorded step. Nothing is ever rolled back: on-chain
//! deployments are not reversible, and the only recovery path is fixing the
//! cause and rerunning.

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use ethers::{
    providers::Middleware,
    types::{Address, Bytes, U256},
};
use tracing::info;

use crate::{
    batch::{run_batches, BatchReceipt},
    config::DeployerConfig,
    constants::{artifacts, keys},
    errors::ScriptError,
    progress::{DeployProgress, ProgressValue},
    recipients::total_amount,
    retryables::{messages_from_receipt, wait_for_redemption},
    solidity::{
        l1_factory::{DeployedFilter as L1GovernanceDeployed, L1GovernanceFactory},
        l2_factory::{
            DeployCoreParams, DeployedFilter as L2GovernanceDeployed, L2GovernanceFactory,
        },
        L1GovernanceToken, L2GovernanceToken, L3GovernanceToken, ProxyAdminContract,
        TokenDistributor, UpgradeExecutor,
    },
    utils::{
        apply_l1_to_l2_alias, decode_event, deploy_from_artifact, proxy_admin_address,
        send_and_confirm, to_base_units, SignerClient,
    },
};

/// A deployment step: its display name and the progress keys it records.
/// A step is complete exactly when all of its keys are recorded.
#[derive(Debug)]
pub struct StepSpec {
    /// Human-readable step name
    pub name: &'static str,
    /// Whether the step only runs when deploying to the L3 chain
    pub l3_only: bool,
    /// The progress keys the step records
    pub keys: &'static [&'static str],
}

/// The deployment steps, in execution order
pub const STEPS: &[StepSpec] = &[
    StepSpec {
        name: "deploy l1 logic contracts",
        l3_only: false,
        keys: &[keys::L1_UPGRADE_EXECUTOR_LOGIC],
    },
    StepSpec {
        name: "deploy l2 logic contracts",
        l3_only: false,
        keys: &[
            keys::L2_TOKEN_LOGIC,
            keys::L2_TIMELOCK_LOGIC,
            keys::L2_GOVERNOR_LOGIC,
            keys::L2_TREASURY_GOVERNOR_LOGIC,
            keys::L2_UPGRADE_EXECUTOR_LOGIC,
        ],
    },
    StepSpec {
        name: "deploy l1 governance factory",
        l3_only: false,
        keys: &[keys::L1_GOVERNANCE_FACTORY],
    },
    StepSpec {
        name: "deploy l1 token",
        l3_only: false,
        keys: &[keys::L1_TOKEN_LOGIC, keys::L1_TOKEN_PROXY],
    },
    StepSpec {
        name: "deploy l2 governance factory",
        l3_only: false,
        keys: &[keys::L2_GOVERNANCE_FACTORY],
    },
    StepSpec {
        name: "deploy l3 upgrade executor",
        l3_only: true,
        keys: &[
            keys::L3_UPGRADE_EXECUTOR_LOGIC,
            keys::L3_UPGRADE_EXECUTOR_PROXY,
            keys::L3_PROXY_ADMIN,
        ],
    },
    StepSpec {
        name: "deploy l3 token",
        l3_only: true,
        keys: &[
            keys::L3_TOKEN_LOGIC,
            keys::L3_TOKEN_PROXY,
            keys::L3_TOKEN_INITIALIZED,
        ],
    },
    StepSpec {
        name: "init l2 governance",
        l3_only: false,
        keys: &[
            keys::L2_TOKEN,
            keys::L2_CORE_TIMELOCK,
            keys::L2_CORE_GOVERNOR,
            keys::L2_TREASURY_GOVERNOR,
            keys::L2_TREASURY,
            keys::L2_PROXY_ADMIN,
            keys::L2_UPGRADE_EXECUTOR,
        ],
    },
    StepSpec {
        name: "init l1 governance",
        l3_only: false,
        keys: &[keys::L1_TIMELOCK, keys::L1_PROXY_ADMIN, keys::L1_UPGRADE_EXECUTOR],
    },
    StepSpec {
        name: "wire l2 executor roles",
        l3_only: false,
        keys: &[keys::L2_EXECUTOR_ROLES_SET],
    },
    StepSpec {
        name: "init l3 executor",
        l3_only: true,
        keys: &[keys::L3_EXECUTOR_INITIALIZED],
    },
    StepSpec {
        name: "finish l1 token",
        l3_only: false,
        keys: &[
            keys::L1_TOKEN_ADMIN_SET,
            keys::L1_TOKEN_INITIALIZED,
            keys::L1_TOKEN_REGISTERED,
        ],
    },
    StepSpec {
        name: "finish l2 token",
        l3_only: false,
        keys: &[
            keys::L2_TOKEN_OWNERSHIP_TRANSFERRED,
            keys::L2_TREASURY_FUNDED,
        ],
    },
    StepSpec {
        name: "deploy token distributor",
        l3_only: false,
        keys: &[
            keys::L2_TOKEN_DISTRIBUTOR,
            keys::DISTRIBUTOR_FUNDED,
            keys::DISTRIBUTOR_RECIPIENTS_SET,
            keys::DISTRIBUTOR_OWNERSHIP_TRANSFERRED,
        ],
    },
];

/// The completion state of each applicable step, in execution order
pub fn step_statuses(progress: &DeployProgress, deploy_l3: bool) -> Vec<(&'static str, bool)> {
    STEPS
        .iter()
        .filter(|step| deploy_l3 || !step.l3_only)
        .map(|step| (step.name, step.keys.iter().all(|key| progress.has(key))))
        .collect()
}

/// The first step a rerun would execute, or `None` if the deployment is
/// complete
pub fn first_pending_step(progress: &DeployProgress, deploy_l3: bool) -> Option<&'static str> {
    step_statuses(progress, deploy_l3)
        .into_iter()
        .find(|(_, done)| !done)
        .map(|(name, _)| name)
}

/// Drives the deployment sequence across the three chains
pub struct Deployer {
    /// Client for the L1 chain
    l1: Arc<SignerClient>,
    /// Client for the L2 chain
    l2: Arc<SignerClient>,
    /// Client for the L3 chain, when the L3 deployment is enabled
    l3: Option<Arc<SignerClient>>,
    /// The chain id of the L2 chain, used to derive retryable ticket ids
    l2_chain_id: u64,
    /// The deployer configuration
    config: DeployerConfig,
    /// Directory holding the contract build artifacts
    artifacts_dir: PathBuf,
    /// The progress record; every confirmed artifact lands here immediately
    progress: DeployProgress,
    /// Claim recipients mapped to whole-token entitlements
    claim_entitlements: BTreeMap<Address, u64>,
}

impl Deployer {
    /// Create a new deployer over the given clients and inputs
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        l1: Arc<SignerClient>,
        l2: Arc<SignerClient>,
        l3: Option<Arc<SignerClient>>,
        l2_chain_id: u64,
        config: DeployerConfig,
        artifacts_dir: PathBuf,
        progress: DeployProgress,
        claim_entitlements: BTreeMap<Address, u64>,
    ) -> Self {
        Self {
            l1,
            l2,
            l3,
            l2_chain_id,
            config,
            artifacts_dir,
            progress,
            claim_entitlements,
        }
    }

    /// Run the full deployment sequence, skipping steps already recorded in
    /// the progress file
    pub async fn run(&mut self) -> Result<(), ScriptError> {
        if let Some(step) = first_pending_step(&self.progress, self.l3.is_some()) {
            info!("starting deployment at step: {}", step);
        } else {
            info!("all deployment steps already recorded");
        }

        self.deploy_l1_logic().await?;
        self.deploy_l2_logic().await?;
        self.deploy_l1_factory().await?;
        self.deploy_l1_token().await?;
        self.deploy_l2_factory().await?;
        if self.l3.is_some() {
            self.deploy_l3_executor().await?;
            self.deploy_l3_token().await?;
        }
        self.init_l2_governance().await?;
        self.init_l1_governance().await?;
        self.wire_executor_roles().await?;
        self.finish_l1_token().await?;
        self.finish_l2_token().await?;
        self.deploy_token_distributor().await?;

        info!("deployment complete");
        Ok(())
    }

    /// The L3 client; only called from steps that run when L3 is enabled
    fn l3_client(&self) -> Result<Arc<SignerClient>, ScriptError> {
        self.l3.clone().ok_or_else(|| {
            ScriptError::ClientInitialization("no l3 client configured".to_string())
        })
    }

    /// Deploy a no-argument logic contract and record it, unless already
    /// recorded
    async fn deploy_logic(
        &mut self,
        client: Arc<SignerClient>,
        key: &str,
        artifact: &str,
    ) -> Result<(), ScriptError> {
        if self.progress.has(key) {
            info!("{} already recorded, skipping", key);
            return Ok(());
        }

        let address = deploy_from_artifact(client, &self.artifacts_dir, artifact, ()).await?;
        info!("{} deployed at {:#x}", artifact, address);
        self.progress.set_address(key, address)
    }

    /// Deploy a transparent proxy over the given logic contract, owned by the
    /// deployer until governance takes over
    async fn deploy_proxy(
        &mut self,
        client: Arc<SignerClient>,
        key: &str,
        logic: Address,
    ) -> Result<(), ScriptError> {
        if self.progress.has(key) {
            info!("{} already recorded, skipping", key);
            return Ok(());
        }

        let owner = client.address();
        let address = deploy_from_artifact(
            client,
            &self.artifacts_dir,
            artifacts::TRANSPARENT_UPGRADEABLE_PROXY,
            (logic, owner, Bytes::new()),
        )
        .await?;
        info!("proxy deployed at {:#x} ({})", address, key);
        self.progress.set_address(key, address)
    }

    /// Step 1: the L1 prerequisite logic contracts
    async fn deploy_l1_logic(&mut self) -> Result<(), ScriptError> {
        self.deploy_logic(
            self.l1.clone(),
            keys::L1_UPGRADE_EXECUTOR_LOGIC,
            artifacts::UPGRADE_EXECUTOR,
        )
        .await
    }

    /// Step 2: the L2 prerequisite logic contracts
    async fn deploy_l2_logic(&mut self) -> Result<(), ScriptError> {
        self.deploy_logic(
            self.l2.clone(),
            keys::L2_TOKEN_LOGIC,
            artifacts::L2_GOVERNANCE_TOKEN,
        )
        .await?;
        self.deploy_logic(
            self.l2.clone(),
            keys::L2_TIMELOCK_LOGIC,
            artifacts::GOVERNANCE_TIMELOCK,
        )
        .await?;
        self.deploy_logic(
            self.l2.clone(),
            keys::L2_GOVERNOR_LOGIC,
            artifacts::CORE_GOVERNOR,
        )
        .await?;
        self.deploy_logic(
            self.l2.clone(),
            keys::L2_TREASURY_GOVERNOR_LOGIC,
            artifacts::TREASURY_GOVERNOR,
        )
        .await?;
        self.deploy_logic(
            self.l2.clone(),
            keys::L2_UPGRADE_EXECUTOR_LOGIC,
            artifacts::UPGRADE_EXECUTOR,
        )
        .await
    }

    /// Step 3: the L1 governance factory
    async fn deploy_l1_factory(&mut self) -> Result<(), ScriptError> {
        self.deploy_logic(
            self.l1.clone(),
            keys::L1_GOVERNANCE_FACTORY,
            artifacts::L1_GOVERNANCE_FACTORY,
        )
        .await
    }

    /// Step 4: the bridgeable L1 token, logic and proxy. Initialization waits
    /// until the L1 governance addresses exist.
    async fn deploy_l1_token(&mut self) -> Result<(), ScriptError> {
        self.deploy_logic(
            self.l1.clone(),
            keys::L1_TOKEN_LOGIC,
            artifacts::L1_GOVERNANCE_TOKEN,
        )
        .await?;

        let logic = self.progress.address(keys::L1_TOKEN_LOGIC)?;
        self.deploy_proxy(self.l1.clone(), keys::L1_TOKEN_PROXY, logic).await
    }

    /// Step 5: the L2 governance factory, constructed over the step-2 logic
    /// contracts
    async fn deploy_l2_factory(&mut self) -> Result<(), ScriptError> {
        if self.progress.has(keys::L2_GOVERNANCE_FACTORY) {
            info!("{} already recorded, skipping", keys::L2_GOVERNANCE_FACTORY);
            return Ok(());
        }

        let constructor_args = (
            self.progress.address(keys::L2_TOKEN_LOGIC)?,
            self.progress.address(keys::L2_TIMELOCK_LOGIC)?,
            self.progress.address(keys::L2_GOVERNOR_LOGIC)?,
            self.progress.address(keys::L2_TREASURY_GOVERNOR_LOGIC)?,
            self.progress.address(keys::L2_UPGRADE_EXECUTOR_LOGIC)?,
        );
        let address = deploy_from_artifact(
            self.l2.clone(),
            &self.artifacts_dir,
            artifacts::L2_GOVERNANCE_FACTORY,
            constructor_args,
        )
        .await?;
        info!("l2 governance factory deployed at {:#x}", address);
        self.progress.set_address(keys::L2_GOVERNANCE_FACTORY, address)
    }

    /// Step 6: the L3 upgrade executor, logic plus proxy, and its admin
    async fn deploy_l3_executor(&mut self) -> Result<(), ScriptError> {
        let l3 = self.l3_client()?;

        self.deploy_logic(
            l3.clone(),
            keys::L3_UPGRADE_EXECUTOR_LOGIC,
            artifacts::UPGRADE_EXECUTOR,
        )
        .await?;

        let logic = self.progress.address(keys::L3_UPGRADE_EXECUTOR_LOGIC)?;
        self.deploy_proxy(l3.clone(), keys::L3_UPGRADE_EXECUTOR_PROXY, logic).await?;

        if !self.progress.has(keys::L3_PROXY_ADMIN) {
            // The proxy deploys its own admin; recover it from the admin slot
            let proxy = self.progress.address(keys::L3_UPGRADE_EXECUTOR_PROXY)?;
            let admin = proxy_admin_address(&l3, proxy).await?;
            info!("l3 proxy admin at {:#x}", admin);
            self.progress.set_address(keys::L3_PROXY_ADMIN, admin)?;
        }
        Ok(())
    }

    /// Step 7: the L3 token, initialized against the L1 token
    async fn deploy_l3_token(&mut self) -> Result<(), ScriptError> {
        let l3 = self.l3_client()?;

        self.deploy_logic(
            l3.clone(),
            keys::L3_TOKEN_LOGIC,
            artifacts::L3_GOVERNANCE_TOKEN,
        )
        .await?;

        let logic = self.progress.address(keys::L3_TOKEN_LOGIC)?;
        self.deploy_proxy(l3.clone(), keys::L3_TOKEN_PROXY, logic).await?;

        if !self.progress.has(keys::L3_TOKEN_INITIALIZED) {
            let token =
                L3GovernanceToken::new(self.progress.address(keys::L3_TOKEN_PROXY)?, l3);
            let l1_token = self.progress.address(keys::L1_TOKEN_PROXY)?;
            send_and_confirm(token.initialize(l1_token), "l3 token initialize").await?;
            self.progress.set_flag(keys::L3_TOKEN_INITIALIZED)?;
        }
        Ok(())
    }

    /// Step 8: L2 governance initialization through the factory. The factory
    /// reports the deployed addresses in its `Deployed` event; they are all
    /// recorded in a single durable write.
    async fn init_l2_governance(&mut self) -> Result<(), ScriptError> {
        if self.progress.has(keys::L2_CORE_TIMELOCK) {
            info!("l2 governance already initialized, skipping");
            return Ok(());
        }

        let factory = L2GovernanceFactory::new(
            self.progress.address(keys::L2_GOVERNANCE_FACTORY)?,
            self.l2.clone(),
        );
        let params = DeployCoreParams {
            l_2_token_logic: self.progress.address(keys::L2_TOKEN_LOGIC)?,
            l_2_token_initial_supply: to_base_units(self.config.token_supply),
            l_2_token_initial_supply_recipient: self.l2.address(),
            l_2_min_timelock_delay: self.config.l2_timelock_delay.into(),
            l_2_voting_delay: self.config.l2_voting_delay.into(),
            l_2_voting_period: self.config.l2_voting_period.into(),
            l_2_core_quorum_threshold: self.config.l2_core_quorum_threshold.into(),
            l_2_treasury_quorum_threshold: self.config.l2_treasury_quorum_threshold.into(),
            l_2_proposal_threshold: to_base_units(self.config.l2_proposal_threshold),
            l_2_min_period_after_quorum: self.config.l2_min_period_after_quorum.into(),
        };

        let receipt =
            send_and_confirm(factory.deploy_step_1(params), "l2 governance factory deployStep1")
                .await?;
        let deployed: L2GovernanceDeployed = decode_event(&receipt)?;
        info!(
            "l2 governance deployed: token {:#x}, core timelock {:#x}, core governor {:#x}, \
             treasury governor {:#x}, treasury {:#x}, executor {:#x}",
            deployed.token,
            deployed.core_timelock,
            deployed.core_governor,
            deployed.treasury_governor,
            deployed.treasury,
            deployed.executor
        );

        self.progress.set_all(&[
            (keys::L2_TOKEN, ProgressValue::Address(deployed.token)),
            (keys::L2_CORE_TIMELOCK, ProgressValue::Address(deployed.core_timelock)),
            (keys::L2_CORE_GOVERNOR, ProgressValue::Address(deployed.core_governor)),
            (
                keys::L2_TREASURY_GOVERNOR,
                ProgressValue::Address(deployed.treasury_governor),
            ),
            (keys::L2_TREASURY, ProgressValue::Address(deployed.treasury)),
            (keys::L2_PROXY_ADMIN, ProgressValue::Address(deployed.proxy_admin)),
            (keys::L2_UPGRADE_EXECUTOR, ProgressValue::Address(deployed.executor)),
        ])
    }

    /// Step 9: L1 governance initialization through the factory, consuming
    /// the L2 core timelock reported by step 8
    async fn init_l1_governance(&mut self) -> Result<(), ScriptError> {
        if self.progress.has(keys::L1_TIMELOCK) {
            info!("l1 governance already initialized, skipping");
            return Ok(());
        }

        let factory = L1GovernanceFactory::new(
            self.progress.address(keys::L1_GOVERNANCE_FACTORY)?,
            self.l1.clone(),
        );
        let call = factory.deploy_step_2(
            self.progress.address(keys::L1_UPGRADE_EXECUTOR_LOGIC)?,
            self.config.l1_timelock_delay.into(),
            self.config.l1_inbox,
            self.progress.address(keys::L2_CORE_TIMELOCK)?,
            true,
        );

        let receipt = send_and_confirm(call, "l1 governance factory deployStep2").await?;
        let deployed: L1GovernanceDeployed = decode_event(&receipt)?;
        info!(
            "l1 governance deployed: timelock {:#x}, proxy admin {:#x}, executor {:#x}",
            deployed.timelock, deployed.proxy_admin, deployed.executor
        );

        self.progress.set_all(&[
            (keys::L1_TIMELOCK, ProgressValue::Address(deployed.timelock)),
            (keys::L1_PROXY_ADMIN, ProgressValue::Address(deployed.proxy_admin)),
            (keys::L1_UPGRADE_EXECUTOR, ProgressValue::Address(deployed.executor)),
        ])
    }

    /// Step 10: grant the executor roles to the aliased L1 timelock, on the
    /// L2 via the factory and, when enabled, on the L3 executor directly
    async fn wire_executor_roles(&mut self) -> Result<(), ScriptError> {
        let aliased = apply_l1_to_l2_alias(self.progress.address(keys::L1_TIMELOCK)?);

        if !self.progress.has(keys::L2_EXECUTOR_ROLES_SET) {
            let factory = L2GovernanceFactory::new(
                self.progress.address(keys::L2_GOVERNANCE_FACTORY)?,
                self.l2.clone(),
            );
            send_and_confirm(
                factory.deploy_step_3(aliased),
                "l2 governance factory deployStep3",
            )
            .await?;
            info!("l2 executor roles granted to aliased l1 timelock {:#x}", aliased);
            self.progress.set_flag(keys::L2_EXECUTOR_ROLES_SET)?;
        }

        if self.l3.is_some() && !self.progress.has(keys::L3_EXECUTOR_INITIALIZED) {
            let executor = UpgradeExecutor::new(
                self.progress.address(keys::L3_UPGRADE_EXECUTOR_PROXY)?,
                self.l3_client()?,
            );
            send_and_confirm(
                executor.initialize(aliased, vec![aliased]),
                "l3 upgrade executor initialize",
            )
            .await?;
            self.progress.set_flag(keys::L3_EXECUTOR_INITIALIZED)?;
        }
        Ok(())
    }

    /// Step 11: L1 token post-deployment. Hand the proxy admin to the L1
    /// executor, initialize the token, and register it with the L2 gateway
    /// and router. Registration submits a retryable message pair; both
    /// messages must be redeemed on the L2 before the step is recorded.
    async fn finish_l1_token(&mut self) -> Result<(), ScriptError> {
        let token_proxy = self.progress.address(keys::L1_TOKEN_PROXY)?;

        if !self.progress.has(keys::L1_TOKEN_ADMIN_SET) {
            let admin = proxy_admin_address(&self.l1, token_proxy).await?;
            let admin_contract = ProxyAdminContract::new(admin, self.l1.clone());
            let executor = self.progress.address(keys::L1_UPGRADE_EXECUTOR)?;
            send_and_confirm(
                admin_contract.transfer_ownership(executor),
                "l1 token proxy admin transfer",
            )
            .await?;
            info!("l1 token proxy admin {:#x} handed to executor {:#x}", admin, executor);
            self.progress.set_flag(keys::L1_TOKEN_ADMIN_SET)?;
        }

        let token = L1GovernanceToken::new(token_proxy, self.l1.clone());

        if !self.progress.has(keys::L1_TOKEN_INITIALIZED) {
            let call = token.initialize(
                self.config.l1_gateway_router,
                self.config.l1_token_gateway,
                self.progress.address(keys::L2_TOKEN)?,
            );
            send_and_confirm(call, "l1 token initialize").await?;
            self.progress.set_flag(keys::L1_TOKEN_INITIALIZED)?;
        }

        if !self.progress.has(keys::L1_TOKEN_REGISTERED) {
            let submission_cost = U256::from(self.config.retryable_submission_cost_wei);
            let max_gas = U256::from(self.config.retryable_gas_limit);
            let gas_price_bid = U256::from(self.config.retryable_gas_price_bid_wei);
            // One retryable for the gateway, one for the router
            let value = submission_cost * 2 + gas_price_bid * max_gas * 2;

            let call = token
                .register_token_on_l2(
                    self.progress.address(keys::L2_TOKEN)?,
                    submission_cost,
                    submission_cost,
                    max_gas,
                    max_gas,
                    gas_price_bid,
                    self.l1.address(),
                )
                .value(value);
            let receipt = send_and_confirm(call, "l1 token registration").await?;

            let messages = messages_from_receipt(&receipt, self.l2_chain_id);
            if messages.len() != 2 {
                return Err(ScriptError::EventDecoding(format!(
                    "expected a retryable message pair in the registration receipt, found {}",
                    messages.len()
                )));
            }
            for message in &messages {
                wait_for_redemption(
                    &self.l2,
                    message,
                    self.config.retryable_poll_interval(),
                    self.config.retryable_timeout(),
                )
                .await?;
            }

            if let Some(block) = receipt.block_number {
                self.progress
                    .set_block(keys::L1_TOKEN_REGISTRATION_BLOCK, block.as_u64())?;
            }
            self.progress.set_flag(keys::L1_TOKEN_REGISTERED)?;
        }
        Ok(())
    }

    /// Step 12: L2 token post-deployment. Ownership moves to the upgrade
    /// executor and the treasury receives its allocation.
    async fn finish_l2_token(&mut self) -> Result<(), ScriptError> {
        let token =
            L2GovernanceToken::new(self.progress.address(keys::L2_TOKEN)?, self.l2.clone());

        if !self.progress.has(keys::L2_TOKEN_OWNERSHIP_TRANSFERRED) {
            let executor = self.progress.address(keys::L2_UPGRADE_EXECUTOR)?;
            send_and_confirm(token.transfer_ownership(executor), "l2 token ownership transfer")
                .await?;
            self.progress.set_flag(keys::L2_TOKEN_OWNERSHIP_TRANSFERRED)?;
        }

        if !self.progress.has(keys::L2_TREASURY_FUNDED) {
            let treasury = self.progress.address(keys::L2_TREASURY)?;
            let amount = to_base_units(self.config.treasury_allocation);
            send_and_confirm(token.transfer(treasury, amount), "treasury allocation transfer")
                .await?;
            info!(
                "transferred {} tokens to the treasury at {:#x}",
                self.config.treasury_allocation, treasury
            );
            self.progress.set_flag(keys::L2_TREASURY_FUNDED)?;
        }
        Ok(())
    }

    /// Step 13: the token distributor. Deploy, fund with the total claimable
    /// amount, register every claim recipient in gas-gated batches, verify
    /// the registered total, then hand ownership to the upgrade executor.
    async fn deploy_token_distributor(&mut self) -> Result<(), ScriptError> {
        let l2_token = self.progress.address(keys::L2_TOKEN)?;

        // The ordered recipient list; identical across reruns, which is what
        // makes the batch cursor meaningful
        let recipients: Vec<Address> = self.claim_entitlements.keys().copied().collect();
        let amounts: Vec<U256> = self
            .claim_entitlements
            .values()
            .map(|amount| to_base_units(*amount))
            .collect();
        let claim_total_tokens = total_amount(self.claim_entitlements.values());
        let claim_total = amounts
            .iter()
            .fold(U256::zero(), |total, amount| total + *amount);

        if !self.progress.has(keys::L2_TOKEN_DISTRIBUTOR) {
            let constructor_args = (
                l2_token,
                // Unclaimed tokens sweep to the treasury after the claim period
                self.progress.address(keys::L2_TREASURY)?,
                // The deployer owns the distributor until registration finishes
                self.l2.address(),
                U256::from(self.config.claim_period_start_block),
                U256::from(self.config.claim_period_end_block),
            );
            let address = deploy_from_artifact(
                self.l2.clone(),
                &self.artifacts_dir,
                artifacts::TOKEN_DISTRIBUTOR,
                constructor_args,
            )
            .await?;
            info!("token distributor deployed at {:#x}", address);
            self.progress.set_address(keys::L2_TOKEN_DISTRIBUTOR, address)?;
        }

        let distributor_address = self.progress.address(keys::L2_TOKEN_DISTRIBUTOR)?;
        let distributor = TokenDistributor::new(distributor_address, self.l2.clone());

        if !self.progress.has(keys::DISTRIBUTOR_FUNDED) {
            let token = L2GovernanceToken::new(l2_token, self.l2.clone());
            send_and_confirm(
                token.transfer(distributor_address, claim_total),
                "distributor funding transfer",
            )
            .await?;
            info!("transferred {} tokens to the distributor", claim_total_tokens);
            self.progress.set_flag(keys::DISTRIBUTOR_FUNDED)?;
        }

        if !self.progress.has(keys::DISTRIBUTOR_RECIPIENTS_SET) {
            let start_batch =
                self.progress.block(keys::DISTRIBUTOR_NEXT_BATCH).unwrap_or(0) as usize;
            let policy = self.config.gas_policy();
            let batch_size = self.config.recipient_batch_size;
            info!(
                "registering {} claim recipients in batches of {}, starting at batch {}",
                recipients.len(),
                batch_size,
                start_batch
            );

            let sampler_client = self.l2.clone();
            let sample = move || {
                let client = sampler_client.clone();
                async move {
                    client
                        .get_gas_price()
                        .await
                        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))
                }
            };
            let submit_contract = distributor.clone();
            let submit = move |accounts: Vec<Address>, claim_amounts: Vec<U256>| {
                let distributor = submit_contract.clone();
                async move {
                    let receipt = send_and_confirm(
                        distributor.set_recipients(accounts, claim_amounts),
                        "distributor setRecipients",
                    )
                    .await?;
                    Ok::<_, ScriptError>(BatchReceipt {
                        gas_used: receipt.gas_used,
                        effective_gas_price: receipt.effective_gas_price,
                    })
                }
            };

            run_batches(
                &recipients,
                &amounts,
                batch_size,
                start_batch,
                keys::DISTRIBUTOR_NEXT_BATCH,
                &mut self.progress,
                &policy,
                sample,
                submit,
            )
            .await?;

            // Read back the registered total before handing the distributor over
            let registered = distributor
                .total_claimable()
                .call()
                .await
                .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
            if registered != claim_total {
                return Err(ScriptError::ContractInteraction(format!(
                    "distributor reports {} claimable, expected {}",
                    registered, claim_total
                )));
            }
            self.progress.set_flag(keys::DISTRIBUTOR_RECIPIENTS_SET)?;
        }

        if !self.progress.has(keys::DISTRIBUTOR_OWNERSHIP_TRANSFERRED) {
            let executor = self.progress.address(keys::L2_UPGRADE_EXECUTOR)?;
            send_and_confirm(
                distributor.transfer_ownership(executor),
                "distributor ownership transfer",
            )
            .await?;
            self.progress.set_flag(keys::DISTRIBUTOR_OWNERSHIP_TRANSFERRED)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ethers::types::Address;

    use crate::progress::DeployProgress;

    use super::{first_pending_step, step_statuses, STEPS};

    fn empty_progress(dir: &tempfile::TempDir) -> DeployProgress {
        DeployProgress::load(dir.path().join("progress.json")).unwrap()
    }

    #[test]
    fn test_fresh_record_has_every_step_pending() {
        let dir = tempfile::tempdir().unwrap();
        let progress = empty_progress(&dir);

        let statuses = step_statuses(&progress, false);
        assert!(statuses.iter().all(|(_, done)| !done));
        assert_eq!(
            first_pending_step(&progress, false),
            Some("deploy l1 logic contracts")
        );
    }

    #[test]
    fn test_l3_steps_only_listed_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let progress = empty_progress(&dir);

        assert_eq!(step_statuses(&progress, true).len(), STEPS.len());
        assert_eq!(
            step_statuses(&progress, false).len(),
            STEPS.iter().filter(|s| !s.l3_only).count()
        );
    }

    #[test]
    fn test_resume_skips_recorded_steps() {
        let dir = tempfile::tempdir().unwrap();
        let mut progress = empty_progress(&dir);

        // Record everything up to and including the L2 governance
        // initialization, as a run that crashed afterwards would have
        for step in STEPS.iter().filter(|s| !s.l3_only).take(6) {
            for key in step.keys {
                progress.set_address(key, Address::from_low_u64_be(1)).unwrap();
            }
        }

        let statuses = step_statuses(&progress, false);
        assert!(statuses.iter().take(6).all(|(_, done)| *done));
        assert_eq!(
            first_pending_step(&progress, false),
            Some("init l1 governance")
        );
    }

    #[test]
    fn test_completed_record_has_no_pending_step() {
        let dir = tempfile::tempdir().unwrap();
        let mut progress = empty_progress(&dir);

        for step in STEPS {
            for key in step.keys {
                progress.set_address(key, Address::from_low_u64_be(1)).unwrap();
            }
        }
        assert_eq!(first_pending_step(&progress, true), None);
    }
}
