// ********* Persistence ***********

use log::{debug, info, warn};
use snafu::{prelude::*, Snafu};

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::record::Record;
use crate::schema::Schema;

/// The namespace under which the survey collection is stored by default.
pub const DEFAULT_NAMESPACE: &str = "survey_records";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PersistError {
    #[snafu(display("I/O error on {path}"))]
    Io {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Could not encode the record collection"))]
    Encoding { source: serde_json::Error },
    #[snafu(display("Could not decode the stored collection {namespace}"))]
    Decoding {
        source: serde_json::Error,
        namespace: String,
    },
    #[snafu(display("The blob store lock was poisoned"))]
    Poisoned {},
    #[snafu(display("Could not start the save worker"))]
    Spawn { source: std::io::Error },
    #[snafu(display("The save worker stopped before reporting"))]
    WorkerGone {},
}

pub type PersistResult<T> = Result<T, PersistError>;

/// A durable home for whole-collection snapshots, addressed by namespace.
pub trait BlobStore: Send {
    /// The last saved blob, or `None` if nothing was ever saved.
    fn load(&self, namespace: &str) -> PersistResult<Option<String>>;

    fn save(&self, namespace: &str, blob: &str) -> PersistResult<()>;
}

/// Blobs kept in memory. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBlobStore {
    pub fn new() -> MemoryBlobStore {
        MemoryBlobStore::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn load(&self, namespace: &str) -> PersistResult<Option<String>> {
        let blobs = self.blobs.lock().map_err(|_| PersistError::Poisoned {})?;
        Ok(blobs.get(namespace).cloned())
    }

    fn save(&self, namespace: &str, blob: &str) -> PersistResult<()> {
        let mut blobs = self.blobs.lock().map_err(|_| PersistError::Poisoned {})?;
        blobs.insert(namespace.to_string(), blob.to_string());
        Ok(())
    }
}

/// One `<namespace>.json` file per namespace, inside a directory.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> FileBlobStore {
        FileBlobStore { dir: dir.into() }
    }

    pub fn path_for(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{}.json", namespace))
    }
}

fn display_path(p: &Path) -> String {
    p.display().to_string()
}

impl BlobStore for FileBlobStore {
    fn load(&self, namespace: &str) -> PersistResult<Option<String>> {
        let p = self.path_for(namespace);
        if !p.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&p).context(IoSnafu {
            path: display_path(&p),
        })?;
        Ok(Some(contents))
    }

    fn save(&self, namespace: &str, blob: &str) -> PersistResult<()> {
        fs::create_dir_all(&self.dir).context(IoSnafu {
            path: display_path(&self.dir),
        })?;
        let p = self.path_for(namespace);
        // Write next to the target then rename, so that readers never see half a snapshot.
        let tmp = self.dir.join(format!(".{}.json.tmp", namespace));
        fs::write(&tmp, blob).context(IoSnafu {
            path: display_path(&tmp),
        })?;
        fs::rename(&tmp, &p).context(IoSnafu {
            path: display_path(&p),
        })?;
        debug!("FileBlobStore::save: wrote {} bytes to {:?}", blob.len(), p);
        Ok(())
    }
}

/// Encodes a collection as a JSON array of flat string maps.
pub fn encode_snapshot(records: &[Record]) -> PersistResult<String> {
    serde_json::to_string(records).context(EncodingSnafu {})
}

/// Decodes a snapshot and conforms every entry to `schema`.
pub fn decode_snapshot(schema: &Schema, namespace: &str, blob: &str) -> PersistResult<Vec<Record>> {
    let raw: Vec<BTreeMap<String, String>> =
        serde_json::from_str(blob).context(DecodingSnafu { namespace })?;
    Ok(raw.into_iter().map(|m| schema.conform(m)).collect())
}

/// Loads the collection stored under `namespace`.
///
/// Any failure is logged and treated as "no prior data".
pub fn load_records(backend: &dyn BlobStore, schema: &Schema, namespace: &str) -> Vec<Record> {
    let blob = match backend.load(namespace) {
        Ok(Some(blob)) => blob,
        Ok(None) => {
            info!("load_records: nothing stored under {:?}", namespace);
            return Vec::new();
        }
        Err(e) => {
            warn!("load_records: could not load {:?}: {}", namespace, e);
            return Vec::new();
        }
    };
    match decode_snapshot(schema, namespace, &blob) {
        Ok(records) => {
            info!(
                "load_records: {} records loaded from {:?}",
                records.len(),
                namespace
            );
            records
        }
        Err(e) => {
            warn!("load_records: discarding stored data: {}", e);
            Vec::new()
        }
    }
}

/// The outcome of one save, delivered once the background writer is done with it.
#[derive(Debug)]
pub struct SaveHandle {
    rx: mpsc::Receiver<PersistResult<()>>,
}

impl SaveHandle {
    fn ready(res: PersistResult<()>) -> SaveHandle {
        let (tx, rx) = mpsc::channel();
        // The receiver is alive, this cannot fail.
        let _ = tx.send(res);
        SaveHandle { rx }
    }

    /// Blocks until the save completed.
    pub fn wait(self) -> PersistResult<()> {
        self.rx.recv().unwrap_or(Err(PersistError::WorkerGone {}))
    }

    /// The result of the save if it already completed.
    pub fn poll(&self) -> Option<PersistResult<()>> {
        match self.rx.try_recv() {
            Ok(res) => Some(res),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(PersistError::WorkerGone {})),
        }
    }
}

struct SaveJob {
    blob: String,
    reply: mpsc::Sender<PersistResult<()>>,
}

/// Writes snapshots on a background thread, in the order they were submitted.
///
/// Dropping the persister lets the queued saves finish before the thread exits.
pub struct Persister {
    namespace: String,
    sender: Option<mpsc::Sender<SaveJob>>,
    worker: Option<JoinHandle<()>>,
}

impl Persister {
    pub fn spawn(backend: Box<dyn BlobStore>, namespace: &str) -> PersistResult<Persister> {
        let (sender, receiver) = mpsc::channel::<SaveJob>();
        let ns = namespace.to_string();
        let worker = thread::Builder::new()
            .name(format!("save-{}", namespace))
            .spawn(move || {
                for job in receiver {
                    let res = backend.save(&ns, &job.blob);
                    if let Err(e) = &res {
                        warn!("Persister: save of {:?} failed: {}", ns, e);
                    }
                    // Nobody may be listening: the caller is free to ignore the handle.
                    let _ = job.reply.send(res);
                }
                debug!("Persister: worker for {:?} stopped", ns);
            })
            .context(SpawnSnafu {})?;
        Ok(Persister {
            namespace: namespace.to_string(),
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Queues a snapshot of `records`. The snapshot is taken before returning.
    pub fn submit(&self, records: &[Record]) -> SaveHandle {
        let blob = match encode_snapshot(records) {
            Ok(blob) => blob,
            Err(e) => {
                warn!("Persister::submit: {}", e);
                return SaveHandle::ready(Err(e));
            }
        };
        let (reply, rx) = mpsc::channel();
        let job = SaveJob { blob, reply };
        match self.sender.as_ref().map(|s| s.send(job)) {
            Some(Ok(())) => SaveHandle { rx },
            _ => {
                warn!("Persister::submit: the save worker is gone");
                SaveHandle::ready(Err(PersistError::WorkerGone {}))
            }
        }
    }
}

impl Drop for Persister {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop once the queue is drained.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Persister: the save worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStore;

    impl BlobStore for BrokenStore {
        fn load(&self, _namespace: &str) -> PersistResult<Option<String>> {
            Err(PersistError::Poisoned {})
        }

        fn save(&self, _namespace: &str, _blob: &str) -> PersistResult<()> {
            Err(PersistError::Poisoned {})
        }
    }

    fn schema() -> Schema {
        Schema::new(["Name", "Age"]).unwrap()
    }

    #[test]
    fn snapshot_format_is_flat_maps() {
        let s = schema();
        let blob = encode_snapshot(&[s.build_record([("name", "Ravi")])]).unwrap();
        assert_eq!(blob, r#"[{"age":"","name":"Ravi"}]"#);
        let back = decode_snapshot(&s, "ns", &blob).unwrap();
        assert_eq!(back, vec![s.build_record([("name", "Ravi")])]);
    }

    #[test]
    fn decoding_conforms_to_schema() {
        let s = schema();
        let back = decode_snapshot(&s, "ns", r#"[{"name":"A","colour":"red"}]"#).unwrap();
        assert_eq!(back, vec![s.build_record([("name", "A")])]);
    }

    #[test]
    fn failed_or_garbled_load_is_empty() {
        let s = schema();
        assert!(load_records(&BrokenStore, &s, "ns").is_empty());
        let mem = MemoryBlobStore::new();
        mem.save("ns", "{not json").unwrap();
        assert!(load_records(&mem, &s, "ns").is_empty());
        assert!(load_records(&mem, &s, "other").is_empty());
    }

    #[test]
    fn saves_are_applied_in_order() {
        let s = schema();
        let mem = MemoryBlobStore::new();
        let persister = Persister::spawn(Box::new(mem.clone()), "ns").unwrap();
        let first = persister.submit(&[s.build_record([("name", "first")])]);
        let second = persister.submit(&[]);
        first.wait().unwrap();
        second.wait().unwrap();
        assert_eq!(mem.load("ns").unwrap(), Some("[]".to_string()));
    }

    #[test]
    fn save_failure_is_observable() {
        let persister = Persister::spawn(Box::new(BrokenStore), "ns").unwrap();
        let handle = persister.submit(&[]);
        assert!(matches!(handle.wait(), Err(PersistError::Poisoned {})));
    }

    #[test]
    fn drop_drains_pending_saves() {
        let s = schema();
        let mem = MemoryBlobStore::new();
        {
            let persister = Persister::spawn(Box::new(mem.clone()), "ns").unwrap();
            persister.submit(&[s.empty_record()]);
        }
        let loaded = load_records(&mem, &s, "ns");
        assert_eq!(loaded, vec![s.empty_record()]);
    }
}
