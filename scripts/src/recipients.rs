//! Loading and validation of the recipient files, and the mapping from
//! eligibility points to claimable token amounts

use std::{collections::BTreeMap, fs, path::Path};

use ethers::types::Address;
use itertools::Itertools;
use serde::Deserialize;

use crate::errors::ScriptError;

/// The eligibility record of a single claim recipient
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Eligibility {
    /// The recipient's eligibility score
    pub points: u64,
}

/// Claim recipients keyed by account, as read from the claim recipients file.
///
/// The map is ordered so that the recipient list derived from it is identical
/// across reruns; the batch cursor indexes into that list.
pub type ClaimRecipients = BTreeMap<Address, Eligibility>;

/// Recipients with directly specified amounts (whole tokens), as read from
/// the DAO and vested recipient files
pub type AmountRecipients = BTreeMap<Address, u64>;

/// Load the claim recipients file
pub fn load_claim_recipients(path: impl AsRef<Path>) -> Result<ClaimRecipients, ScriptError> {
    let contents = read_recipients_file(path.as_ref())?;
    serde_json::from_str(&contents).map_err(|e| ScriptError::Serde(e.to_string()))
}

/// Load a recipients file mapping accounts directly to whole-token amounts
pub fn load_amount_recipients(path: impl AsRef<Path>) -> Result<AmountRecipients, ScriptError> {
    let contents = read_recipients_file(path.as_ref())?;
    serde_json::from_str(&contents).map_err(|e| ScriptError::Serde(e.to_string()))
}

fn read_recipients_file(path: &Path) -> Result<String, ScriptError> {
    fs::read_to_string(path)
        .map_err(|e| ScriptError::ReadFile(format!("{}: {}", path.display(), e)))
}

/// The claimable amount (whole tokens) for a given eligibility score, or
/// `None` if the score is outside the entitlement table
pub fn points_to_amount(points: u64) -> Option<u64> {
    match points {
        3 => Some(3000),
        4 => Some(4500),
        5 => Some(6000),
        6 => Some(9000),
        7 => Some(10_500),
        8..=15 => Some(12_000),
        _ => None,
    }
}

/// Map each claim recipient's eligibility score to its claimable amount.
///
/// Every account must carry a score from the entitlement table; otherwise the
/// whole mapping fails, listing each offending account. No partial result is
/// ever produced.
pub fn map_entitlements(
    recipients: &ClaimRecipients,
) -> Result<BTreeMap<Address, u64>, ScriptError> {
    let mut entitlements = BTreeMap::new();
    let mut invalid = Vec::new();

    for (account, eligibility) in recipients {
        match points_to_amount(eligibility.points) {
            Some(amount) => {
                entitlements.insert(*account, amount);
            }
            None => invalid.push(format!("{account:?} (points {})", eligibility.points)),
        }
    }

    if !invalid.is_empty() {
        return Err(ScriptError::InvalidEntitlement(invalid.iter().join(", ")));
    }

    Ok(entitlements)
}

/// Sum a whole-token amount table. Summed in 128 bits so the total cannot
/// overflow even at the full token supply.
pub fn total_amount<'a>(amounts: impl IntoIterator<Item = &'a u64>) -> u128 {
    amounts.into_iter().map(|amount| *amount as u128).sum()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use ethers::types::Address;

    use super::{
        map_entitlements, points_to_amount, total_amount, ClaimRecipients, Eligibility,
    };

    fn account(i: u64) -> Address {
        Address::from_low_u64_be(i)
    }

    fn recipients(points: &[u64]) -> ClaimRecipients {
        points
            .iter()
            .enumerate()
            .map(|(i, p)| (account(i as u64 + 1), Eligibility { points: *p }))
            .collect()
    }

    #[test]
    fn test_entitlement_table() {
        let expected = [
            (3, 3000),
            (4, 4500),
            (5, 6000),
            (6, 9000),
            (7, 10_500),
            (8, 12_000),
            (9, 12_000),
            (15, 12_000),
        ];
        for (points, amount) in expected {
            assert_eq!(points_to_amount(points), Some(amount));
        }

        for points in [0, 1, 2, 16, 100] {
            assert_eq!(points_to_amount(points), None);
        }
    }

    #[test]
    fn test_map_entitlements_preserves_every_account() {
        let input = recipients(&[3, 5, 8, 15]);
        let mapped = map_entitlements(&input).unwrap();

        assert_eq!(mapped.len(), input.len());
        assert_eq!(mapped[&account(1)], 3000);
        assert_eq!(mapped[&account(2)], 6000);
        assert_eq!(mapped[&account(3)], 12_000);
        assert_eq!(mapped[&account(4)], 12_000);
    }

    #[test]
    fn test_map_entitlements_rejects_unknown_points_naming_the_account() {
        let input = recipients(&[3, 2, 5]);
        let err = map_entitlements(&input).unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains(&format!("{:?}", account(2))));
        assert!(msg.contains("points 2"));
    }

    #[test]
    fn test_map_entitlements_collects_every_violation() {
        let input = recipients(&[1, 4, 16]);
        let err = map_entitlements(&input).unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains(&format!("{:?}", account(1))));
        assert!(msg.contains(&format!("{:?}", account(3))));
        assert!(!msg.contains(&format!("{:?}", account(2))));
    }

    #[test]
    fn test_claim_recipients_file_format() {
        let raw = r#"{
            "0x00000000000000000000000000000000000000aa": { "points": 4 },
            "0x00000000000000000000000000000000000000bb": { "points": 7 }
        }"#;
        let parsed: ClaimRecipients = serde_json::from_str(raw).unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[&Address::from_low_u64_be(0xaa)].points, 4);
        assert_eq!(parsed[&Address::from_low_u64_be(0xbb)].points, 7);
    }

    #[test]
    fn test_total_amount() {
        let mapped: BTreeMap<Address, u64> =
            [(account(1), 3000), (account(2), 4500)].into_iter().collect();
        assert_eq!(total_amount(mapped.values()), 7500);
    }
}
