//! # Durable recovery record.
//!
//! Remembers whether the managed process was intentionally running, so the
//! supervisor can resume it after the host process is killed and restarted.
//!
//! The record is split across two partitions:
//!
//! | partition | keys |
//! |-----------|------|
//! | plain     | `was_intentionally_running`, `host`, `port` |
//! | secret    | `startup_parameters` |
//!
//! The persisted parameters only decide *whether* to resume; the supervisor
//! always rebuilds a fresh configuration for the actual start.

mod partition;

pub use partition::{FilePartition, MemoryPartition, Partition};

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::channel::StartupParameters;
use crate::error::StoreError;

const KEY_RUNNING: &str = "was_intentionally_running";
const KEY_HOST: &str = "host";
const KEY_PORT: &str = "port";
const KEY_PARAMS: &str = "startup_parameters";

/// File name of the plain partition under [`RecoveryStore::open_dir`].
pub const PLAIN_FILE: &str = "recovery.json";
/// File name of the secret partition under [`RecoveryStore::open_dir`].
pub const SECRET_FILE: &str = "recovery.secret.json";

/// A complete recovery record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryRecord {
    pub was_intentionally_running: bool,
    pub startup_parameters: StartupParameters,
    pub host: String,
    pub port: u16,
}

/// Recovery record persisted across two partitions.
#[derive(Clone)]
pub struct RecoveryStore {
    plain: Arc<dyn Partition>,
    secret: Arc<dyn Partition>,
}

impl RecoveryStore {
    pub fn new(plain: Arc<dyn Partition>, secret: Arc<dyn Partition>) -> Self {
        Self { plain, secret }
    }

    /// Store backed by two [`MemoryPartition`]s.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryPartition::new()),
            Arc::new(MemoryPartition::new()),
        )
    }

    /// Store backed by [`PLAIN_FILE`] and [`SECRET_FILE`] under `dir`.
    ///
    /// The secret file relies on filesystem permissions (`0600`) for protection;
    /// hosts with a keystore should pass their own secret [`Partition`] to [`new`](Self::new).
    pub fn open_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(
            Arc::new(FilePartition::new(dir.join(PLAIN_FILE))),
            Arc::new(FilePartition::new(dir.join(SECRET_FILE))),
        )
    }

    /// Records a successful start.
    ///
    /// Secret parameters are written first and the running flag last, so an
    /// interrupted write leaves a record that [`try_restore`](Self::try_restore)
    /// rejects as incomplete rather than one pointing at stale parameters.
    pub fn record_running(
        &self,
        params: &StartupParameters,
        host: &str,
        port: u16,
    ) -> Result<(), StoreError> {
        self.secret.put(KEY_PARAMS, params.expose())?;
        self.plain.put(KEY_HOST, host)?;
        self.plain.put(KEY_PORT, &port.to_string())?;
        self.plain.put(KEY_RUNNING, "true")?;
        debug!(host, port, "recovery record written");
        Ok(())
    }

    /// Clears the running flag and erases parameters, host and port.
    ///
    /// Every key is attempted even if an earlier one fails; the first error is returned.
    pub fn record_stopped(&self) -> Result<(), StoreError> {
        let results = [
            self.plain.put(KEY_RUNNING, "false"),
            self.plain.remove(KEY_HOST),
            self.plain.remove(KEY_PORT),
            self.secret.remove(KEY_PARAMS),
        ];
        debug!("recovery record cleared");
        results.into_iter().collect()
    }

    /// Reads the record written by [`record_running`](Self::record_running).
    ///
    /// Returns `None` unless the running flag is set and parameters, host and a
    /// non-zero port are all present. Read failures count as "absent".
    pub fn try_restore(&self) -> Option<RecoveryRecord> {
        let running = read(&*self.plain, KEY_RUNNING)?;
        if running != "true" {
            return None;
        }
        let host = read(&*self.plain, KEY_HOST).filter(|h| !h.is_empty())?;
        let port = read(&*self.plain, KEY_PORT)?
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)?;
        let params = read(&*self.secret, KEY_PARAMS)?;

        Some(RecoveryRecord {
            was_intentionally_running: true,
            startup_parameters: StartupParameters::new(params),
            host,
            port,
        })
    }
}

fn read(part: &dyn Partition, key: &str) -> Option<String> {
    match part.get(key) {
        Ok(v) => v,
        Err(e) => {
            warn!(key, error = %e, label = e.as_label(), "recovery partition unreadable");
            None
        }
    }
}
