//! Tracking of L1 -> L2 retryable messages through to redemption.
//!
//! A retryable message only takes effect once it is redeemed on the
//! destination chain. The deployer extracts the submitted tickets from the
//! confirmed L1 receipt and polls the destination chain until each ticket's
//! redemption lands, surfacing the observed status if one never does.

use std::{
    fmt::{self, Display},
    sync::Arc,
    time::Duration,
};

use ethers::{
    abi::RawLog,
    contract::EthEvent,
    providers::Middleware,
    types::{TransactionReceipt, H256, U256, U64},
    utils::keccak256,
};
use tokio::time::{sleep, Instant};
use tracing::info;

use crate::{errors::ScriptError, solidity::InboxMessageDeliveredFilter, utils::SignerClient};

/// The observed status of a retryable message on the destination chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryableStatus {
    /// No redemption receipt yet
    Pending,
    /// The redemption landed and succeeded
    Redeemed,
    /// The redemption landed but reverted
    Reverted,
}

impl Display for RetryableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryableStatus::Pending => write!(f, "PENDING"),
            RetryableStatus::Redeemed => write!(f, "REDEEMED"),
            RetryableStatus::Reverted => write!(f, "REVERTED"),
        }
    }
}

/// A retryable message submitted through the inbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryableMessage {
    /// The inbox message number
    pub message_num: U256,
    /// The ticket id under which the destination chain records the redemption
    pub ticket_id: H256,
}

/// Extract the retryable messages submitted within a confirmed L1 receipt
pub fn messages_from_receipt(
    receipt: &TransactionReceipt,
    dest_chain_id: u64,
) -> Vec<RetryableMessage> {
    receipt
        .logs
        .iter()
        .cloned()
        .filter_map(|log| InboxMessageDeliveredFilter::decode_log(&RawLog::from(log)).ok())
        .map(|event| RetryableMessage {
            message_num: event.message_num,
            ticket_id: submit_retryable_id(dest_chain_id, event.message_num),
        })
        .collect()
}

/// The ticket id of a retryable submission: the keccak digest of the
/// destination chain id and the inbox message number, each left-padded to a
/// full word
fn submit_retryable_id(dest_chain_id: u64, message_num: U256) -> H256 {
    let mut buf = [0u8; 64];
    U256::from(dest_chain_id).to_big_endian(&mut buf[..32]);
    message_num.to_big_endian(&mut buf[32..]);
    H256::from(keccak256(buf))
}

/// Poll the destination chain until the message's redemption receipt lands.
///
/// A reverted redemption is fatal. With no `timeout` configured the wait is
/// unbounded; the registration must not be treated as complete while the
/// message is outstanding.
pub async fn wait_for_redemption(
    client: &Arc<SignerClient>,
    message: &RetryableMessage,
    poll_interval: Duration,
    timeout: Option<Duration>,
) -> Result<(), ScriptError> {
    let deadline = timeout.map(|t| Instant::now() + t);

    loop {
        let receipt = client
            .get_transaction_receipt(message.ticket_id)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

        match receipt {
            Some(receipt) if receipt.status == Some(U64::one()) => {
                info!(
                    "retryable message {} redeemed under ticket {:?}",
                    message.message_num, message.ticket_id
                );
                return Ok(());
            }
            Some(_) => {
                return Err(ScriptError::RetryableNotRedeemed(format!(
                    "ticket {:?} has status {}",
                    message.ticket_id,
                    RetryableStatus::Reverted
                )))
            }
            None => {}
        }

        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Err(ScriptError::RetryableNotRedeemed(format!(
                    "ticket {:?} still has status {} after {:?}",
                    message.ticket_id,
                    RetryableStatus::Pending,
                    timeout.unwrap_or_default()
                )));
            }
        }
        sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use ethers::{
        abi::{encode, Token},
        contract::EthEvent,
        types::{Log, TransactionReceipt, H256, U256},
    };

    use crate::solidity::InboxMessageDeliveredFilter;

    use super::{messages_from_receipt, submit_retryable_id};

    fn inbox_log(message_num: u64) -> Log {
        Log {
            topics: vec![
                InboxMessageDeliveredFilter::signature(),
                H256::from_low_u64_be(message_num),
            ],
            data: encode(&[Token::Bytes(vec![])]).into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_messages_from_receipt_decodes_inbox_events() {
        let receipt = TransactionReceipt {
            logs: vec![inbox_log(7), Log::default(), inbox_log(8)],
            ..Default::default()
        };

        let messages = messages_from_receipt(&receipt, 42161);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message_num, U256::from(7));
        assert_eq!(messages[1].message_num, U256::from(8));
        assert_eq!(messages[0].ticket_id, submit_retryable_id(42161, 7.into()));
    }

    #[test]
    fn test_ticket_ids_depend_on_chain_and_message() {
        let base = submit_retryable_id(42161, 7.into());
        assert_ne!(base, submit_retryable_id(42170, 7.into()));
        assert_ne!(base, submit_retryable_id(42161, 8.into()));
    }
}
