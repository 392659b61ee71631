//! Solidity interface definitions for the contracts driven during deployment

use ethers::contract::abigen;

/// The L1 governance factory. Namespaced because its `Deployed` event shares
/// a name with the L2 factory's.
pub mod l1_factory {
    use ethers::contract::abigen;

    abigen!(
        L1GovernanceFactory,
        r#"[
            function deployStep2(address upgradeExecutorLogic, uint256 timelockDelay, address inbox, address l2Timelock, bool setMinDelay) external
            event Deployed(address timelock, address proxyAdmin, address executor)
        ]"#
    );
}

/// The L2 governance factory
pub mod l2_factory {
    use ethers::contract::abigen;

    abigen!(
        L2GovernanceFactory,
        r#"[
            struct DeployCoreParams { address l2TokenLogic; uint256 l2TokenInitialSupply; address l2TokenInitialSupplyRecipient; uint256 l2MinTimelockDelay; uint256 l2VotingDelay; uint256 l2VotingPeriod; uint256 l2CoreQuorumThreshold; uint256 l2TreasuryQuorumThreshold; uint256 l2ProposalThreshold; uint256 l2MinPeriodAfterQuorum }
            function deployStep1(DeployCoreParams params) external
            function deployStep3(address aliasedL1Timelock) external
            event Deployed(address token, address coreTimelock, address coreGovernor, address treasuryGovernor, address treasury, address proxyAdmin, address executor)
        ]"#
    );
}

abigen!(
    L1GovernanceToken,
    r#"[
        function initialize(address gatewayRouter, address gateway, address l2TokenAddress) external
        function registerTokenOnL2(address l2TokenAddress, uint256 maxSubmissionCostForGateway, uint256 maxSubmissionCostForRouter, uint256 maxGasForGateway, uint256 maxGasForRouter, uint256 gasPriceBid, address creditBackAddress) external payable
    ]"#
);

abigen!(
    L2GovernanceToken,
    r#"[
        function balanceOf(address account) external view returns (uint256)
        function transfer(address to, uint256 amount) external returns (bool)
        function transferOwnership(address newOwner) external
        function owner() external view returns (address)
    ]"#
);

abigen!(
    L3GovernanceToken,
    r#"[
        function initialize(address l1Token) external
    ]"#
);

abigen!(
    UpgradeExecutor,
    r#"[
        function initialize(address admin, address[] executors) external
    ]"#
);

abigen!(
    ProxyAdminContract,
    r#"[
        function owner() external view returns (address)
        function transferOwnership(address newOwner) external
    ]"#
);

abigen!(
    TokenDistributor,
    r#"[
        function setRecipients(address[] recipients, uint256[] claimableAmounts) external
        function totalClaimable() external view returns (uint256)
        function transferOwnership(address newOwner) external
    ]"#
);

abigen!(
    Inbox,
    r#"[
        event InboxMessageDelivered(uint256 indexed messageNum, bytes data)
    ]"#
);
