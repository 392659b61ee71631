//! The deployer configuration file: governance parameters, allocations, and
//! submission throttles, consumed read-only by the deployment sequence

use std::{fs, path::Path, time::Duration};

use ethers::types::Address;
use serde::Deserialize;

use crate::{batch::GasPolicy, constants::BATCH_SMOOTHING_DELAY, errors::ScriptError};

/// The deployer configuration, parsed from JSON
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeployerConfig {
    /// The minimum delay of the L1 timelock, in seconds
    pub l1_timelock_delay: u64,
    /// The minimum delay of the L2 core timelock, in seconds
    pub l2_timelock_delay: u64,
    /// The delay before voting opens on an L2 proposal, in blocks
    pub l2_voting_delay: u64,
    /// The length of the L2 voting period, in blocks
    pub l2_voting_period: u64,
    /// Quorum numerator for the core governor
    pub l2_core_quorum_threshold: u64,
    /// Quorum numerator for the treasury governor
    pub l2_treasury_quorum_threshold: u64,
    /// Votes required to open a proposal, in whole tokens
    pub l2_proposal_threshold: u64,
    /// The minimum voting time left after quorum is reached, in blocks
    pub l2_min_period_after_quorum: u64,
    /// Total token supply, in whole tokens
    pub token_supply: u64,
    /// The allocation transferred to the L2 treasury, in whole tokens
    pub treasury_allocation: u64,
    /// First L2 block of the claim period
    pub claim_period_start_block: u64,
    /// Last L2 block of the claim period
    pub claim_period_end_block: u64,
    /// The number of recipients registered per distributor batch
    pub recipient_batch_size: usize,
    /// The gas price batches wait to settle back to, in wei
    pub base_gas_price_wei: u64,
    /// The gas price above which batch submission is suspended, in wei
    pub gas_price_ceiling_wei: u64,
    /// The interval between gas price samples while suspended, in seconds
    pub gas_poll_interval_seconds: u64,
    /// The interval between redemption checks for retryable messages, in
    /// seconds
    pub retryable_poll_interval_seconds: u64,
    /// An optional bound on the redemption wait, in seconds; absent means
    /// wait indefinitely
    #[serde(default)]
    pub retryable_timeout_seconds: Option<u64>,
    /// The submission cost attached to each retryable message, in wei
    pub retryable_submission_cost_wei: u64,
    /// The gas limit forwarded with each retryable message
    pub retryable_gas_limit: u64,
    /// The destination gas price bid for retryable messages, in wei
    pub retryable_gas_price_bid_wei: u64,
    /// The L1 inbox through which retryable messages are submitted
    pub l1_inbox: Address,
    /// The L1 gateway router the token registers itself with
    pub l1_gateway_router: Address,
    /// The L1 token gateway the token registers itself with
    pub l1_token_gateway: Address,
}

impl DeployerConfig {
    /// Load the deployer configuration from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| ScriptError::ReadFile(format!("{}: {}", path.display(), e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ScriptError::Serde(format!("{}: {}", path.display(), e)))?;
        config.validate()?;

        Ok(config)
    }

    /// Check the internal consistency of the configuration
    pub fn validate(&self) -> Result<(), ScriptError> {
        if self.recipient_batch_size == 0 {
            return Err(ScriptError::ConfigValidation(
                "recipientBatchSize must be nonzero".to_string(),
            ));
        }
        if self.claim_period_end_block <= self.claim_period_start_block {
            return Err(ScriptError::ConfigValidation(format!(
                "claim period end block {} is not after start block {}",
                self.claim_period_end_block, self.claim_period_start_block
            )));
        }
        if self.base_gas_price_wei > self.gas_price_ceiling_wei {
            return Err(ScriptError::ConfigValidation(format!(
                "baseGasPriceWei {} exceeds gasPriceCeilingWei {}",
                self.base_gas_price_wei, self.gas_price_ceiling_wei
            )));
        }
        if self.treasury_allocation > self.token_supply {
            return Err(ScriptError::ConfigValidation(format!(
                "treasuryAllocation {} exceeds tokenSupply {}",
                self.treasury_allocation, self.token_supply
            )));
        }
        Ok(())
    }

    /// The gas price schedule applied to recipient batch submission
    pub fn gas_policy(&self) -> GasPolicy {
        GasPolicy {
            ceiling: self.gas_price_ceiling_wei.into(),
            base_price: self.base_gas_price_wei.into(),
            poll_interval: Duration::from_secs(self.gas_poll_interval_seconds),
            smoothing_delay: BATCH_SMOOTHING_DELAY,
        }
    }

    /// The interval between redemption checks for retryable messages
    pub fn retryable_poll_interval(&self) -> Duration {
        Duration::from_secs(self.retryable_poll_interval_seconds)
    }

    /// The optional bound on the redemption wait
    pub fn retryable_timeout(&self) -> Option<Duration> {
        self.retryable_timeout_seconds.map(Duration::from_secs)
    }
}

/// Check that the configured allocations account for the whole token supply:
/// claimable entitlements, DAO recipients, vested recipients, and the
/// treasury must sum to exactly the supply
pub fn check_distribution_totals(
    config: &DeployerConfig,
    claim_total: u128,
    dao_total: u128,
    vested_total: u128,
) -> Result<(), ScriptError> {
    let distributed =
        claim_total + dao_total + vested_total + config.treasury_allocation as u128;

    if distributed != config.token_supply as u128 {
        return Err(ScriptError::ConfigValidation(format!(
            "distribution totals ({} claimable + {} dao + {} vested + {} treasury = {}) \
             do not match the token supply of {}",
            claim_total,
            dao_total,
            vested_total,
            config.treasury_allocation,
            distributed,
            config.token_supply
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{check_distribution_totals, DeployerConfig};

    fn test_config_json() -> &'static str {
        r#"{
            "l1TimelockDelay": 259200,
            "l2TimelockDelay": 259200,
            "l2VotingDelay": 21600,
            "l2VotingPeriod": 100800,
            "l2CoreQuorumThreshold": 5,
            "l2TreasuryQuorumThreshold": 3,
            "l2ProposalThreshold": 1000000,
            "l2MinPeriodAfterQuorum": 14400,
            "tokenSupply": 10000000000,
            "treasuryAllocation": 3000000000,
            "claimPeriodStartBlock": 100,
            "claimPeriodEndBlock": 200,
            "recipientBatchSize": 100,
            "baseGasPriceWei": 100000000,
            "gasPriceCeilingWei": 120000000,
            "gasPollIntervalSeconds": 60,
            "retryablePollIntervalSeconds": 10,
            "retryableSubmissionCostWei": 1000000000000,
            "retryableGasLimit": 300000,
            "retryableGasPriceBidWei": 100000000,
            "l1Inbox": "0x00000000000000000000000000000000000000b1",
            "l1GatewayRouter": "0x00000000000000000000000000000000000000a1",
            "l1TokenGateway": "0x00000000000000000000000000000000000000a2"
        }"#
    }

    fn test_config() -> DeployerConfig {
        serde_json::from_str(test_config_json()).unwrap()
    }

    #[test]
    fn test_parse_and_validate() {
        let config = test_config();
        config.validate().unwrap();

        assert_eq!(config.recipient_batch_size, 100);
        assert_eq!(config.retryable_timeout_seconds, None);
        assert_eq!(config.token_supply, 10_000_000_000);
    }

    #[test]
    fn test_inverted_claim_period_is_rejected() {
        let mut config = test_config();
        config.claim_period_end_block = config.claim_period_start_block;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_price_above_ceiling_is_rejected() {
        let mut config = test_config();
        config.base_gas_price_wei = config.gas_price_ceiling_wei + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_distribution_totals_must_match_supply() {
        let config = test_config();

        // 3.5B claimable + 2B dao + 1.5B vested + 3B treasury = 10B supply
        check_distribution_totals(
            &config,
            3_500_000_000,
            2_000_000_000,
            1_500_000_000,
        )
        .unwrap();

        let err =
            check_distribution_totals(&config, 3_500_000_000, 2_000_000_000, 1_000_000_000)
                .unwrap_err();
        assert!(err.to_string().contains("do not match"));
    }
}
