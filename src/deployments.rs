//! The per-network deployment record store
//!
//! Deployed contract addresses are passed between migration steps through a
//! `deploy-<network>.json` file: each step reads the addresses earlier steps
//! recorded and merges its own output back in. A merge never discards keys it
//! does not name, so independent runs against the same network accumulate
//! into one address book.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use json::JsonValue;

use crate::{
    constants::{DEPLOYMENTS_FILE_PREFIX, JSON_INDENT},
    errors::ScriptError,
};

/// The addresses recorded for one network, keyed by contract name
pub type DeploymentRecord = BTreeMap<String, String>;

/// Returns the record file name for the given network
pub fn deployments_file(network: &str) -> String {
    format!("{DEPLOYMENTS_FILE_PREFIX}{network}.json")
}

/// Storage for per-network deployment records
pub trait DeploymentStore {
    /// Reads the record for the given network, returning an empty record if
    /// none has been written yet
    fn load(&self, network: &str) -> Result<DeploymentRecord, ScriptError>;

    /// Overlays `partial` onto the existing record for the given network and
    /// persists the result
    ///
    /// Keys absent from `partial` survive unchanged; same-named keys take the
    /// new value.
    fn merge_and_save(
        &self,
        network: &str,
        partial: &DeploymentRecord,
    ) -> Result<(), ScriptError>;
}

/// A record store backed by `deploy-<network>.json` files in a directory
pub struct FileDeploymentStore {
    /// The directory the record files live in
    dir: PathBuf,
}

impl FileDeploymentStore {
    /// Creates a store writing records into the given directory
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Path of the record file for the given network
    fn record_path(&self, network: &str) -> PathBuf {
        self.dir.join(deployments_file(network))
    }

    /// Reads and parses the record file, preserving key order
    ///
    /// A missing or empty file parses as an empty object. Anything that is
    /// not parseable JSON, or parses to a non-object, is corrupt — the merge
    /// must not quietly overwrite an address book it could not read.
    fn read_object(&self, network: &str) -> Result<JsonValue, ScriptError> {
        let path = self.record_path(network);
        if !path.exists() {
            return Ok(JsonValue::new_object());
        }

        let contents =
            fs::read_to_string(&path).map_err(|e| ScriptError::ReadDeployments(e.to_string()))?;
        if contents.trim().is_empty() {
            return Ok(JsonValue::new_object());
        }

        let parsed = json::parse(&contents)
            .map_err(|e| ScriptError::RecordCorrupt(format!("{}: {}", path.display(), e)))?;
        if !parsed.is_object() {
            return Err(ScriptError::RecordCorrupt(format!(
                "{}: expected a JSON object",
                path.display()
            )));
        }

        Ok(parsed)
    }
}

impl DeploymentStore for FileDeploymentStore {
    fn load(&self, network: &str) -> Result<DeploymentRecord, ScriptError> {
        let parsed = self.read_object(network)?;

        let mut record = DeploymentRecord::new();
        for (key, value) in parsed.entries() {
            let address = value.as_str().ok_or_else(|| {
                ScriptError::RecordCorrupt(format!("value recorded for {key} is not a string"))
            })?;
            record.insert(key.to_string(), address.to_string());
        }

        Ok(record)
    }

    fn merge_and_save(
        &self,
        network: &str,
        partial: &DeploymentRecord,
    ) -> Result<(), ScriptError> {
        let mut merged = self.read_object(network)?;
        for (key, address) in partial {
            merged[key.as_str()] = JsonValue::String(address.clone());
        }

        // The fully merged object goes out in a single write call, so a
        // non-crashed run never leaves a half-written file behind
        fs::write(
            self.record_path(network),
            json::stringify_pretty(merged, JSON_INDENT),
        )
        .map_err(|e| ScriptError::WriteDeployments(e.to_string()))
    }
}

/// An in-memory record store, substituted for the file-backed one in tests
#[derive(Default)]
pub struct MemoryDeploymentStore {
    /// Records keyed by network name
    records: Mutex<HashMap<String, DeploymentRecord>>,
}

impl MemoryDeploymentStore {
    /// Creates an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeploymentStore for MemoryDeploymentStore {
    fn load(&self, network: &str) -> Result<DeploymentRecord, ScriptError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(network)
            .cloned()
            .unwrap_or_default())
    }

    fn merge_and_save(
        &self,
        network: &str,
        partial: &DeploymentRecord,
    ) -> Result<(), ScriptError> {
        self.records
            .lock()
            .unwrap()
            .entry(network.to_string())
            .or_default()
            .extend(partial.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{
        deployments_file, DeploymentRecord, DeploymentStore, FileDeploymentStore,
        MemoryDeploymentStore,
    };
    use crate::errors::ScriptError;

    /// Builds a record from key/value pairs
    fn record(pairs: &[(&str, &str)]) -> DeploymentRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDeploymentStore::new(dir.path());

        assert!(store.load("rinkeby").unwrap().is_empty());
    }

    #[test]
    fn test_merge_of_disjoint_keys_is_union() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDeploymentStore::new(dir.path());

        store
            .merge_and_save("mainnet", &record(&[("CCALAddress", "0xABC")]))
            .unwrap();
        store
            .merge_and_save("mainnet", &record(&[("KyokoCCAL", "0xDEF")]))
            .unwrap();

        assert_eq!(
            store.load("mainnet").unwrap(),
            record(&[("CCALAddress", "0xABC"), ("KyokoCCAL", "0xDEF")]),
        );
    }

    #[test]
    fn test_later_merge_wins_for_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDeploymentStore::new(dir.path());

        store
            .merge_and_save("rinkeby", &record(&[("CreditSystem", "0x1")]))
            .unwrap();
        store
            .merge_and_save("rinkeby", &record(&[("CreditSystem", "0x2")]))
            .unwrap();

        assert_eq!(
            store.load("rinkeby").unwrap(),
            record(&[("CreditSystem", "0x2")]),
        );
    }

    #[test]
    fn test_records_are_scoped_per_network() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDeploymentStore::new(dir.path());

        store
            .merge_and_save("rinkeby", &record(&[("Game", "0x1")]))
            .unwrap();
        store
            .merge_and_save("bsc", &record(&[("Game", "0x2")]))
            .unwrap();

        assert_eq!(store.load("rinkeby").unwrap(), record(&[("Game", "0x1")]));
        assert_eq!(store.load("bsc").unwrap(), record(&[("Game", "0x2")]));
    }

    #[test]
    fn test_record_file_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDeploymentStore::new(dir.path());

        store
            .merge_and_save("mainnet", &record(&[("CCALAddress", "0xABC")]))
            .unwrap();

        let contents = fs::read_to_string(dir.path().join(deployments_file("mainnet"))).unwrap();
        assert!(contents.contains("\n    \"CCALAddress\": \"0xABC\""));
    }

    #[test]
    fn test_merge_preserves_key_order_of_earlier_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDeploymentStore::new(dir.path());

        store
            .merge_and_save("rinkeby", &record(&[("USDT", "0x1")]))
            .unwrap();
        store
            .merge_and_save("rinkeby", &record(&[("Game", "0x2")]))
            .unwrap();

        let contents = fs::read_to_string(dir.path().join(deployments_file("rinkeby"))).unwrap();
        assert!(contents.find("USDT").unwrap() < contents.find("Game").unwrap());
    }

    #[test]
    fn test_corrupt_record_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDeploymentStore::new(dir.path());
        fs::write(dir.path().join(deployments_file("rinkeby")), "not json").unwrap();

        assert!(matches!(
            store.load("rinkeby"),
            Err(ScriptError::RecordCorrupt(_)),
        ));
        assert!(matches!(
            store.merge_and_save("rinkeby", &record(&[("Game", "0x1")])),
            Err(ScriptError::RecordCorrupt(_)),
        ));
    }

    #[test]
    fn test_non_object_record_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDeploymentStore::new(dir.path());
        fs::write(dir.path().join(deployments_file("rinkeby")), "[1, 2]").unwrap();

        assert!(matches!(
            store.load("rinkeby"),
            Err(ScriptError::RecordCorrupt(_)),
        ));
    }

    #[test]
    fn test_memory_store_merges_like_the_file_store() {
        let store = MemoryDeploymentStore::new();

        store
            .merge_and_save("mainnet", &record(&[("CCALAddress", "0xABC")]))
            .unwrap();
        store
            .merge_and_save("mainnet", &record(&[("KyokoCCAL", "0xDEF")]))
            .unwrap();
        store
            .merge_and_save("mainnet", &record(&[("CCALAddress", "0x123")]))
            .unwrap();

        assert_eq!(
            store.load("mainnet").unwrap(),
            record(&[("CCALAddress", "0x123"), ("KyokoCCAL", "0xDEF")]),
        );
    }
}
