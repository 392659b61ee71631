//! Resumable, rate-limited batch submission of claim recipients.
//!
//! The recipient list is split into fixed-size batches submitted
//! sequentially. Each batch is gated on the gas price, awaited to
//! confirmation, and checkpointed into the progress file before the next
//! batch starts, so a rerun resumes from the first unconfirmed batch.

use std::{future::Future, time::Duration};

use ethers::types::{Address, U256};
use tokio::time::sleep;
use tracing::info;

use crate::{errors::ScriptError, gas::await_acceptable_price, progress::DeployProgress};

/// The gas price schedule applied to batch submission
#[derive(Debug, Clone)]
pub struct GasPolicy {
    /// The price above which submission is suspended
    pub ceiling: U256,
    /// The price the fee must settle back to before submission resumes
    pub base_price: U256,
    /// The interval between price samples while suspended
    pub poll_interval: Duration,
    /// The flat delay applied before every batch to smooth the submission
    /// rate, independent of the price
    pub smoothing_delay: Duration,
}

/// Observed execution cost of a confirmed batch, reported as telemetry only
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchReceipt {
    /// Gas used by the batch transaction
    pub gas_used: Option<U256>,
    /// The price actually paid per unit of gas
    pub effective_gas_price: Option<U256>,
}

/// Submit `recipients`/`amounts` in order, `batch_size` entries at a time,
/// starting from batch index `start_batch`.
///
/// The final partial remainder, if any, forms one extra batch after the
/// evenly-sized ones. Each confirmed batch advances the cursor stored under
/// `cursor_key` before the next submission begins; the cursor is the only
/// state a rerun needs to skip completed work.
#[allow(clippy::too_many_arguments)]
pub async fn run_batches<Sa, SaFut, Su, SuFut>(
    recipients: &[Address],
    amounts: &[U256],
    batch_size: usize,
    start_batch: usize,
    cursor_key: &str,
    progress: &mut DeployProgress,
    policy: &GasPolicy,
    mut sample: Sa,
    mut submit: Su,
) -> Result<(), ScriptError>
where
    Sa: FnMut() -> SaFut,
    SaFut: Future<Output = Result<U256, ScriptError>>,
    Su: FnMut(Vec<Address>, Vec<U256>) -> SuFut,
    SuFut: Future<Output = Result<BatchReceipt, ScriptError>>,
{
    if recipients.len() != amounts.len() {
        return Err(ScriptError::ConfigValidation(format!(
            "recipient and amount lists differ in length: {} vs {}",
            recipients.len(),
            amounts.len()
        )));
    }
    if batch_size == 0 {
        return Err(ScriptError::ConfigValidation(
            "recipient batch size must be nonzero".to_string(),
        ));
    }

    let num_batches = recipients.len() / batch_size;
    for index in start_batch..=num_batches {
        let start = index * batch_size;
        let end = if index == num_batches {
            recipients.len()
        } else {
            start + batch_size
        };
        if start >= end {
            // The list divided evenly; there is no remainder batch
            continue;
        }

        await_acceptable_price(
            &mut sample,
            policy.ceiling,
            policy.base_price,
            policy.poll_interval,
        )
        .await?;
        sleep(policy.smoothing_delay).await;

        let receipt = submit(recipients[start..end].to_vec(), amounts[start..end].to_vec()).await?;

        // The cursor only moves once the batch is confirmed; a crash before
        // this write replays the batch, never skips it
        progress.set_block(cursor_key, (index + 1) as u64)?;
        info!(
            "batch {} confirmed ({} recipients, gas used {:?}, effective gas price {:?})",
            index,
            end - start,
            receipt.gas_used,
            receipt.effective_gas_price
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, time::Duration};

    use ethers::types::{Address, U256};

    use crate::{errors::ScriptError, progress::DeployProgress};

    use super::{run_batches, BatchReceipt, GasPolicy};

    const CURSOR_KEY: &str = "distributorSetRecipientsNextBatch";

    fn test_policy() -> GasPolicy {
        GasPolicy {
            ceiling: U256::from(120),
            base_price: U256::from(100),
            poll_interval: Duration::from_millis(1),
            smoothing_delay: Duration::from_millis(1),
        }
    }

    fn recipient_list(n: usize) -> (Vec<Address>, Vec<U256>) {
        let recipients: Vec<Address> = (1..=n as u64).map(Address::from_low_u64_be).collect();
        let amounts: Vec<U256> = (1..=n as u64).map(U256::from).collect();
        (recipients, amounts)
    }

    fn low_price() -> std::future::Ready<Result<U256, ScriptError>> {
        std::future::ready(Ok(U256::from(90)))
    }

    async fn collect_batches(
        n: usize,
        batch_size: usize,
        start_batch: usize,
        progress: &mut DeployProgress,
    ) -> Vec<Vec<Address>> {
        let (recipients, amounts) = recipient_list(n);
        let submissions: RefCell<Vec<Vec<Address>>> = RefCell::new(Vec::new());

        run_batches(
            &recipients,
            &amounts,
            batch_size,
            start_batch,
            CURSOR_KEY,
            progress,
            &test_policy(),
            low_price,
            |accounts, _amounts| {
                let submissions = &submissions;
                async move {
                    submissions.borrow_mut().push(accounts);
                    Ok::<_, ScriptError>(BatchReceipt::default())
                }
            },
        )
        .await
        .unwrap();

        submissions.into_inner()
    }

    #[tokio::test]
    async fn test_remainder_forms_final_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut progress = DeployProgress::load(dir.path().join("progress.json")).unwrap();

        let batches = collect_batches(250, 100, 0, &mut progress).await;

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 100);
        assert_eq!(batches[1].len(), 100);
        assert_eq!(batches[2].len(), 50);
        assert_eq!(batches[0][0], Address::from_low_u64_be(1));
        assert_eq!(batches[1][0], Address::from_low_u64_be(101));
        assert_eq!(batches[2][0], Address::from_low_u64_be(201));
        assert_eq!(batches[2][49], Address::from_low_u64_be(250));
        assert_eq!(progress.block(CURSOR_KEY), Some(3));
    }

    #[tokio::test]
    async fn test_even_split_has_no_trailing_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut progress = DeployProgress::load(dir.path().join("progress.json")).unwrap();

        let batches = collect_batches(200, 100, 0, &mut progress).await;

        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 100));
    }

    #[tokio::test]
    async fn test_resume_submits_only_the_tail() {
        let dir = tempfile::tempdir().unwrap();
        let mut progress = DeployProgress::load(dir.path().join("progress.json")).unwrap();

        let batches = collect_batches(250, 100, 2, &mut progress).await;

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 50);
        assert_eq!(batches[0][0], Address::from_low_u64_be(201));
    }

    #[tokio::test]
    async fn test_cursor_checkpoints_only_confirmed_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        let mut progress = DeployProgress::load(&path).unwrap();

        let (recipients, amounts) = recipient_list(250);
        let submitted: RefCell<Vec<Vec<Address>>> = RefCell::new(Vec::new());

        // The second batch submission fails after the first confirms
        let result = run_batches(
            &recipients,
            &amounts,
            100,
            0,
            CURSOR_KEY,
            &mut progress,
            &test_policy(),
            low_price,
            |accounts, _amounts| {
                let submitted = &submitted;
                async move {
                    if submitted.borrow().len() == 1 {
                        return Err(ScriptError::ContractInteraction(
                            "transaction dropped".to_string(),
                        ));
                    }
                    submitted.borrow_mut().push(accounts);
                    Ok(BatchReceipt::default())
                }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(progress.block(CURSOR_KEY), Some(1));

        // Rerunning from the persisted cursor completes the remaining batches
        // and leaves the full list submitted exactly once
        let start = progress.block(CURSOR_KEY).unwrap() as usize;
        let tail = collect_batches(250, 100, start, &mut progress).await;

        let mut all: Vec<Address> = submitted.into_inner().into_iter().flatten().collect();
        all.extend(tail.into_iter().flatten());
        assert_eq!(all, recipients);
        assert_eq!(progress.block(CURSOR_KEY), Some(3));
    }

    #[tokio::test]
    async fn test_mismatched_lists_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut progress = DeployProgress::load(dir.path().join("progress.json")).unwrap();

        let (recipients, _) = recipient_list(10);
        let amounts = vec![U256::one(); 9];

        let result = run_batches(
            &recipients,
            &amounts,
            5,
            0,
            CURSOR_KEY,
            &mut progress,
            &test_policy(),
            low_price,
            |_accounts, _amounts| async move { Ok::<_, ScriptError>(BatchReceipt::default()) },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(progress.block(CURSOR_KEY), None);
    }
}
