//! Utilities for the deploy scripts: client setup, network verification,
//! artifact loading, and address arithmetic

use std::{fs, path::Path, str::FromStr, sync::Arc};

use ethers::{
    abi::{Abi, Detokenize, RawLog, Tokenize},
    contract::{builders::ContractCall, ContractFactory, EthEvent},
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, Bytes, TransactionReceipt, H256, U256, U64},
};
use serde::Deserialize;

use crate::{
    constants::{
        ADDRESS_ALIAS_OFFSET, NUM_BYTES_ADDRESS, NUM_BYTES_STORAGE_SLOT,
        NUM_DEPLOY_CONFIRMATIONS, PROXY_ADMIN_STORAGE_SLOT, TOKEN_DECIMALS,
    },
    errors::ScriptError,
};

/// The client type used for all chain interactions
pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Sets up the client with which to interact with one chain, attaching the
/// deployer's wallet and the chain id reported by the node
pub async fn setup_client(priv_key: &str, rpc_url: &str) -> Result<Arc<SignerClient>, ScriptError> {
    let provider = Provider::<Http>::try_from(rpc_url)
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

    let wallet = LocalWallet::from_str(priv_key)
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    let chain_id = provider
        .get_chainid()
        .await
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?
        .as_u64();
    let client = Arc::new(SignerMiddleware::new(
        provider,
        wallet.with_chain_id(chain_id),
    ));

    Ok(client)
}

/// Verify that the connected node reports the expected chain id, guarding
/// against deploying to the wrong network
pub async fn verify_chain_id(
    client: &Arc<SignerClient>,
    label: &str,
    expected: u64,
) -> Result<(), ScriptError> {
    let actual = client
        .get_chainid()
        .await
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?
        .as_u64();

    if actual != expected {
        return Err(ScriptError::NetworkMismatch(format!(
            "{label}: expected chain id {expected}, node reports {actual}"
        )));
    }
    Ok(())
}

/// A contract build artifact, as produced by the Solidity toolchain
#[derive(Deserialize)]
struct Artifact {
    /// The contract ABI
    abi: Abi,
    /// The creation bytecode
    bytecode: ArtifactBytecode,
}

/// The bytecode section of a build artifact
#[derive(Deserialize)]
struct ArtifactBytecode {
    /// The creation bytecode as hex
    object: Bytes,
}

/// Load a contract's ABI and creation bytecode from the artifacts directory
pub fn load_artifact(artifacts_dir: &Path, name: &str) -> Result<(Abi, Bytes), ScriptError> {
    let path = artifacts_dir.join(format!("{name}.json"));
    let contents = fs::read_to_string(&path)
        .map_err(|e| ScriptError::ReadFile(format!("{}: {}", path.display(), e)))?;

    let artifact: Artifact = serde_json::from_str(&contents)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{name}: {e}")))?;

    Ok((artifact.abi, artifact.bytecode.object))
}

/// Deploy a contract from its build artifact and wait for confirmation,
/// returning the deployed address
pub async fn deploy_from_artifact<T: Tokenize>(
    client: Arc<SignerClient>,
    artifacts_dir: &Path,
    name: &str,
    constructor_args: T,
) -> Result<Address, ScriptError> {
    let (abi, bytecode) = load_artifact(artifacts_dir, name)?;
    let factory = ContractFactory::new(abi, bytecode, client);

    let contract = factory
        .deploy(constructor_args)
        .map_err(|e| ScriptError::ContractDeployment(format!("{name}: {e}")))?
        .confirmations(NUM_DEPLOY_CONFIRMATIONS)
        .send()
        .await
        .map_err(|e| ScriptError::ContractDeployment(format!("{name}: {e}")))?;

    Ok(contract.address())
}

/// Send a contract call, await its confirmation, and check that it did not
/// revert, returning the receipt
pub async fn send_and_confirm<D: Detokenize>(
    call: ContractCall<SignerClient, D>,
    what: &str,
) -> Result<TransactionReceipt, ScriptError> {
    let pending = call
        .send()
        .await
        .map_err(|e| ScriptError::ContractInteraction(format!("{what}: {e}")))?;

    let receipt = pending
        .confirmations(NUM_DEPLOY_CONFIRMATIONS)
        .await
        .map_err(|e| ScriptError::ContractInteraction(format!("{what}: {e}")))?
        .ok_or_else(|| {
            ScriptError::ContractInteraction(format!("{what}: transaction dropped from the mempool"))
        })?;

    if receipt.status != Some(U64::one()) {
        return Err(ScriptError::ContractInteraction(format!(
            "{what}: reverted in tx {:?}",
            receipt.transaction_hash
        )));
    }
    Ok(receipt)
}

/// Decode the first occurrence of event `E` from a confirmed receipt,
/// erroring if the receipt does not contain one
pub fn decode_event<E: EthEvent>(receipt: &TransactionReceipt) -> Result<E, ScriptError> {
    receipt
        .logs
        .iter()
        .cloned()
        .find_map(|log| E::decode_log(&RawLog::from(log)).ok())
        .ok_or_else(|| {
            ScriptError::EventDecoding(format!(
                "no `{}` event in receipt for tx {:?}",
                E::name(),
                receipt.transaction_hash
            ))
        })
}

/// Read the admin contract address of a transparent upgradeable proxy.
///
/// This is the recommended way to get the proxy admin address:
/// https://github.com/OpenZeppelin/openzeppelin-contracts/blob/v5.0.0/contracts/proxy/ERC1967/ERC1967Utils.sol#L104-L106
pub async fn proxy_admin_address(
    client: &Arc<SignerClient>,
    proxy: Address,
) -> Result<Address, ScriptError> {
    let slot = client
        .get_storage_at(
            proxy,
            // Can `unwrap` here since we know the storage slot constitutes a valid H256
            H256::from_str(PROXY_ADMIN_STORAGE_SLOT).unwrap(),
            None, /* block */
        )
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

    Ok(Address::from_slice(
        &slot.as_bytes()[NUM_BYTES_STORAGE_SLOT - NUM_BYTES_ADDRESS..NUM_BYTES_STORAGE_SLOT],
    ))
}

/// Apply the L1 -> L2 address aliasing transform: offset addition modulo
/// 2^160. The destination chain sees cross-chain messages from an L1 contract
/// as originating from its aliased address.
pub fn apply_l1_to_l2_alias(address: Address) -> Address {
    // The offset constant is a well-formed hex literal
    let offset = U256::from_str_radix(ADDRESS_ALIAS_OFFSET, 16).unwrap();
    let aliased =
        (U256::from_big_endian(address.as_bytes()) + offset) % (U256::one() << 160);

    let mut buf = [0u8; 32];
    aliased.to_big_endian(&mut buf);
    Address::from_slice(&buf[NUM_BYTES_STORAGE_SLOT - NUM_BYTES_ADDRESS..])
}

/// Scale a whole-token amount to base units
pub fn to_base_units(whole_tokens: u64) -> U256 {
    U256::from(whole_tokens) * U256::exp10(TOKEN_DECIMALS)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use ethers::types::{Address, U256};

    use super::{apply_l1_to_l2_alias, to_base_units};

    #[test]
    fn test_alias_of_zero_address_is_the_offset() {
        let aliased = apply_l1_to_l2_alias(Address::zero());
        assert_eq!(
            aliased,
            Address::from_str("0x1111000000000000000000000000000000001111").unwrap()
        );
    }

    #[test]
    fn test_alias_wraps_modulo_address_width() {
        let max = Address::from_str("0xffffffffffffffffffffffffffffffffffffffff").unwrap();
        let aliased = apply_l1_to_l2_alias(max);
        assert_eq!(
            aliased,
            Address::from_str("0x1111000000000000000000000000000000001110").unwrap()
        );
    }

    #[test]
    fn test_alias_preserves_low_bytes() {
        let address = Address::from_str("0x00000000000000000000000000000000000000aa").unwrap();
        let aliased = apply_l1_to_l2_alias(address);
        assert_eq!(
            aliased,
            Address::from_str("0x11110000000000000000000000000000000011bb").unwrap()
        );
    }

    #[test]
    fn test_to_base_units() {
        assert_eq!(
            to_base_units(3000),
            U256::from_dec_str("3000000000000000000000").unwrap()
        );
        assert_eq!(to_base_units(0), U256::zero());
    }
}
