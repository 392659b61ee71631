//! The deploy progress file: a flat record of which deployment steps have
//! confirmed on-chain, keyed by the artifact they produced.
//!
//! Every mutation is persisted before the call returns, so rerunning the
//! deployer after a crash resumes from the first unrecorded step. The file is
//! replaced atomically (write-to-temp, then rename) so a partial write can
//! never corrupt the record.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::errors::ScriptError;

/// A single recorded artifact: a deployed contract address, a completed-step
/// flag, or a block number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressValue {
    /// A completed-step marker
    Flag(bool),
    /// A block number
    Block(u64),
    /// A deployed contract address
    Address(Address),
}

/// The persisted deploy progress record
#[derive(Debug)]
pub struct DeployProgress {
    /// Path of the backing file
    path: PathBuf,
    /// The in-memory view of the record
    record: BTreeMap<String, ProgressValue>,
}

impl DeployProgress {
    /// Load the progress record from disk. A missing file is a first run and
    /// yields an empty record; a malformed file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref().to_path_buf();
        let record = if path.exists() {
            let contents = fs::read_to_string(&path)
                .map_err(|e| ScriptError::ReadProgress(e.to_string()))?;
            serde_json::from_str(&contents).map_err(|e| ScriptError::ReadProgress(e.to_string()))?
        } else {
            BTreeMap::new()
        };

        Ok(Self { path, record })
    }

    /// Whether the given key has been recorded
    pub fn has(&self, key: &str) -> bool {
        self.record.contains_key(key)
    }

    /// Get the recorded value for the given key
    pub fn get(&self, key: &str) -> Option<ProgressValue> {
        self.record.get(key).copied()
    }

    /// Get the address recorded under the given key, erroring if the key is
    /// absent or holds a non-address value
    pub fn address(&self, key: &str) -> Result<Address, ScriptError> {
        match self.get(key) {
            Some(ProgressValue::Address(address)) => Ok(address),
            Some(_) => Err(ScriptError::ReadProgress(format!(
                "key `{key}` does not hold an address"
            ))),
            None => Err(ScriptError::ReadProgress(format!(
                "key `{key}` has not been recorded"
            ))),
        }
    }

    /// Get the block number recorded under the given key, if any
    pub fn block(&self, key: &str) -> Option<u64> {
        match self.get(key) {
            Some(ProgressValue::Block(block)) => Some(block),
            _ => None,
        }
    }

    /// Record a value under the given key, persisting the record before
    /// returning
    pub fn set(&mut self, key: &str, value: ProgressValue) -> Result<(), ScriptError> {
        self.record.insert(key.to_string(), value);
        self.persist()
    }

    /// Record a deployed contract address
    pub fn set_address(&mut self, key: &str, address: Address) -> Result<(), ScriptError> {
        self.set(key, ProgressValue::Address(address))
    }

    /// Record a completed-step marker
    pub fn set_flag(&mut self, key: &str) -> Result<(), ScriptError> {
        self.set(key, ProgressValue::Flag(true))
    }

    /// Record a block number
    pub fn set_block(&mut self, key: &str, block: u64) -> Result<(), ScriptError> {
        self.set(key, ProgressValue::Block(block))
    }

    /// Record several values in one durable write. Used for steps whose single
    /// confirmed transaction yields multiple artifacts, so a crash can never
    /// leave a partially recorded step behind.
    pub fn set_all(&mut self, entries: &[(&str, ProgressValue)]) -> Result<(), ScriptError> {
        for (key, value) in entries {
            self.record.insert(key.to_string(), *value);
        }
        self.persist()
    }

    /// Write the record to disk, replacing the backing file atomically so a
    /// crash mid-write leaves the previous record intact
    fn persist(&self) -> Result<(), ScriptError> {
        let contents = serde_json::to_string_pretty(&self.record)
            .map_err(|e| ScriptError::Serde(e.to_string()))?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, contents).map_err(|e| ScriptError::WriteProgress(e.to_string()))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| ScriptError::WriteProgress(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use ethers::types::Address;

    use super::{DeployProgress, ProgressValue};

    #[test]
    fn test_load_missing_file_yields_empty_record() {
        let dir = tempfile::tempdir().unwrap();
        let progress = DeployProgress::load(dir.path().join("progress.json")).unwrap();
        assert!(!progress.has("l1Timelock"));
        assert!(progress.get("l1Timelock").is_none());
    }

    #[test]
    fn test_round_trip_across_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");

        let address = Address::from_low_u64_be(0xabcd);
        {
            let mut progress = DeployProgress::load(&path).unwrap();
            progress.set_address("l1Timelock", address).unwrap();
            progress.set_flag("l1TokenRegistered").unwrap();
            progress.set_block("l1TokenRegistrationBlock", 19_000_123).unwrap();
            // The store is dropped here, simulating a process exit
        }

        let progress = DeployProgress::load(&path).unwrap();
        assert_eq!(progress.address("l1Timelock").unwrap(), address);
        assert_eq!(
            progress.get("l1TokenRegistered"),
            Some(ProgressValue::Flag(true))
        );
        assert_eq!(progress.block("l1TokenRegistrationBlock"), Some(19_000_123));
    }

    #[test]
    fn test_every_write_is_durable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");

        let mut progress = DeployProgress::load(&path).unwrap();
        for (i, key) in ["a", "b", "c"].into_iter().enumerate() {
            progress.set_block(key, i as u64).unwrap();
            // Reload from disk after each write, as a crashed process would
            let reloaded = DeployProgress::load(&path).unwrap();
            for earlier in ["a", "b", "c"].iter().take(i + 1) {
                assert!(reloaded.has(earlier));
            }
        }
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");

        let mut progress = DeployProgress::load(&path).unwrap();
        progress.set_flag("l2ExecutorRolesSet").unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(DeployProgress::load(&path).is_err());
    }

    #[test]
    fn test_typed_accessors_reject_mismatched_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");

        let mut progress = DeployProgress::load(&path).unwrap();
        progress.set_flag("l1TokenRegistered").unwrap();

        assert!(progress.address("l1TokenRegistered").is_err());
        assert_eq!(progress.block("l1TokenRegistered"), None);
    }
}
