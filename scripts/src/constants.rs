//! Constants used in the deploy scripts

use std::time::Duration;

/// The number of confirmations to wait for on each deployment and
/// initialization transaction
pub const NUM_DEPLOY_CONFIRMATIONS: usize = 1;

/// The storage slot containing the proxy admin contract address in the upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#admin-address
pub const PROXY_ADMIN_STORAGE_SLOT: &str =
    "0xb53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103";

/// The number of bytes stored in a single storage slot
pub const NUM_BYTES_STORAGE_SLOT: usize = 32;

/// The number of bytes in an Ethereum address
pub const NUM_BYTES_ADDRESS: usize = 20;

/// The offset applied to an L1 address when it acts as the sender of an
/// L1 -> L2 message, as hex
pub const ADDRESS_ALIAS_OFFSET: &str = "1111000000000000000000000000000000001111";

/// The number of decimals of the governance token
pub const TOKEN_DECIMALS: usize = 18;

/// The flat delay applied between recipient batches to smooth the
/// submission rate, independent of the gas price
pub const BATCH_SMOOTHING_DELAY: Duration = Duration::from_secs(1);

/// The chain id of the production L1 network
pub const L1_CHAIN_ID: u64 = 1;

/// The chain id of the production L2 network
pub const L2_CHAIN_ID: u64 = 42161;

/// The chain id of the production L3 network
pub const L3_CHAIN_ID: u64 = 42170;

/// The chain id reported by the local L1 test node
pub const L1_LOCAL_CHAIN_ID: u64 = 1337;

/// The chain id reported by the local L2 test node
pub const L2_LOCAL_CHAIN_ID: u64 = 412346;

/// The chain id reported by the local L3 test node
pub const L3_LOCAL_CHAIN_ID: u64 = 333333;

/// Names of the contract build artifacts consumed during deployment
pub mod artifacts {
    /// The upgrade executor contract, deployed as logic on all three chains
    pub const UPGRADE_EXECUTOR: &str = "UpgradeExecutor";
    /// The L1 governance factory contract
    pub const L1_GOVERNANCE_FACTORY: &str = "L1GovernanceFactory";
    /// The L2 governance factory contract
    pub const L2_GOVERNANCE_FACTORY: &str = "L2GovernanceFactory";
    /// The bridgeable L1 governance token
    pub const L1_GOVERNANCE_TOKEN: &str = "L1GovernanceToken";
    /// The L2 governance token logic
    pub const L2_GOVERNANCE_TOKEN: &str = "L2GovernanceToken";
    /// The L3 governance token
    pub const L3_GOVERNANCE_TOKEN: &str = "L3GovernanceToken";
    /// The governance timelock logic
    pub const GOVERNANCE_TIMELOCK: &str = "GovernanceTimelock";
    /// The core governor logic
    pub const CORE_GOVERNOR: &str = "CoreGovernor";
    /// The treasury governor logic
    pub const TREASURY_GOVERNOR: &str = "TreasuryGovernor";
    /// The transparent upgradeable proxy
    pub const TRANSPARENT_UPGRADEABLE_PROXY: &str = "TransparentUpgradeableProxy";
    /// The token distributor contract
    pub const TOKEN_DISTRIBUTOR: &str = "TokenDistributor";
}

/// Keys of the deploy progress file. The set is closed: every key a run can
/// write is named here, and the presence of a key implies the corresponding
/// on-chain action has been confirmed.
pub mod keys {
    /// The L1 upgrade executor logic contract
    pub const L1_UPGRADE_EXECUTOR_LOGIC: &str = "l1UpgradeExecutorLogic";
    /// The L2 governance token logic contract
    pub const L2_TOKEN_LOGIC: &str = "l2TokenLogic";
    /// The L2 timelock logic contract
    pub const L2_TIMELOCK_LOGIC: &str = "l2TimelockLogic";
    /// The L2 core governor logic contract
    pub const L2_GOVERNOR_LOGIC: &str = "l2GovernorLogic";
    /// The L2 treasury governor logic contract
    pub const L2_TREASURY_GOVERNOR_LOGIC: &str = "l2TreasuryGovernorLogic";
    /// The L2 upgrade executor logic contract
    pub const L2_UPGRADE_EXECUTOR_LOGIC: &str = "l2UpgradeExecutorLogic";
    /// The L1 governance factory contract
    pub const L1_GOVERNANCE_FACTORY: &str = "l1GovernanceFactory";
    /// The L1 governance token logic contract
    pub const L1_TOKEN_LOGIC: &str = "l1TokenLogic";
    /// The L1 governance token proxy contract
    pub const L1_TOKEN_PROXY: &str = "l1TokenProxy";
    /// The L2 governance factory contract
    pub const L2_GOVERNANCE_FACTORY: &str = "l2GovernanceFactory";
    /// The L3 upgrade executor logic contract
    pub const L3_UPGRADE_EXECUTOR_LOGIC: &str = "l3UpgradeExecutorLogic";
    /// The L3 upgrade executor proxy contract
    pub const L3_UPGRADE_EXECUTOR_PROXY: &str = "l3UpgradeExecutorProxy";
    /// The admin contract of the L3 upgrade executor proxy
    pub const L3_PROXY_ADMIN: &str = "l3ProxyAdmin";
    /// The L3 governance token logic contract
    pub const L3_TOKEN_LOGIC: &str = "l3TokenLogic";
    /// The L3 governance token proxy contract
    pub const L3_TOKEN_PROXY: &str = "l3TokenProxy";
    /// The L3 governance token has been initialized against the L1 token
    pub const L3_TOKEN_INITIALIZED: &str = "l3TokenInitialized";
    /// The L2 governance token, as reported by the L2 factory
    pub const L2_TOKEN: &str = "l2Token";
    /// The L2 core timelock, as reported by the L2 factory
    pub const L2_CORE_TIMELOCK: &str = "l2CoreTimelock";
    /// The L2 core governor, as reported by the L2 factory
    pub const L2_CORE_GOVERNOR: &str = "l2CoreGovernor";
    /// The L2 treasury governor, as reported by the L2 factory
    pub const L2_TREASURY_GOVERNOR: &str = "l2TreasuryGovernor";
    /// The L2 treasury, as reported by the L2 factory
    pub const L2_TREASURY: &str = "l2Treasury";
    /// The L2 proxy admin, as reported by the L2 factory
    pub const L2_PROXY_ADMIN: &str = "l2ProxyAdmin";
    /// The L2 upgrade executor proxy, as reported by the L2 factory
    pub const L2_UPGRADE_EXECUTOR: &str = "l2UpgradeExecutor";
    /// The L1 timelock, as reported by the L1 factory
    pub const L1_TIMELOCK: &str = "l1Timelock";
    /// The L1 proxy admin, as reported by the L1 factory
    pub const L1_PROXY_ADMIN: &str = "l1ProxyAdmin";
    /// The L1 upgrade executor proxy, as reported by the L1 factory
    pub const L1_UPGRADE_EXECUTOR: &str = "l1UpgradeExecutor";
    /// The L2 executor roles have been wired to the aliased L1 timelock
    pub const L2_EXECUTOR_ROLES_SET: &str = "l2ExecutorRolesSet";
    /// The L3 upgrade executor has been initialized
    pub const L3_EXECUTOR_INITIALIZED: &str = "l3ExecutorInitialized";
    /// The L1 token proxy admin has been handed to the L1 upgrade executor
    pub const L1_TOKEN_ADMIN_SET: &str = "l1TokenProxyAdminSet";
    /// The L1 token has been initialized
    pub const L1_TOKEN_INITIALIZED: &str = "l1TokenInitialized";
    /// The L1 token has been registered on the L2 gateway and router
    pub const L1_TOKEN_REGISTERED: &str = "l1TokenRegistered";
    /// The L1 block in which the token registration landed
    pub const L1_TOKEN_REGISTRATION_BLOCK: &str = "l1TokenRegistrationBlock";
    /// Ownership of the L2 token has been transferred to the upgrade executor
    pub const L2_TOKEN_OWNERSHIP_TRANSFERRED: &str = "l2TokenOwnershipTransferred";
    /// The treasury allocation has been transferred to the L2 treasury
    pub const L2_TREASURY_FUNDED: &str = "l2TreasuryFunded";
    /// The token distributor contract
    pub const L2_TOKEN_DISTRIBUTOR: &str = "l2TokenDistributor";
    /// The distributor holds the total claimable amount
    pub const DISTRIBUTOR_FUNDED: &str = "distributorFunded";
    /// The next recipient batch to submit; batches below this index are confirmed
    pub const DISTRIBUTOR_NEXT_BATCH: &str = "distributorSetRecipientsNextBatch";
    /// All recipient batches are confirmed and the registered total verified
    pub const DISTRIBUTOR_RECIPIENTS_SET: &str = "distributorRecipientsSet";
    /// Ownership of the distributor has been transferred to the upgrade executor
    pub const DISTRIBUTOR_OWNERSHIP_TRANSFERRED: &str = "distributorOwnershipTransferred";
}
