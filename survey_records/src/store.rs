// ********* Record store ***********

use log::{debug, info};
use snafu::{ensure, Snafu};

use crate::export::serialize;
use crate::persist::{load_records, BlobStore, PersistResult, Persister, SaveHandle};
use crate::reconcile::{reconcile_with_summary, ImportSummary};
use crate::record::{ExportRow, ImportRow, Record};
use crate::schema::Schema;
use crate::Advisory;

#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    #[snafu(display("No record at position {index} (the collection holds {len})"))]
    IndexOutOfRange { index: usize, len: usize },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The ordered collection of records, owned by whoever drives the user interface.
///
/// Every mutation queues a snapshot of the whole collection on the persister, if any.
/// Mutations never wait for the save; the handle of the latest save can be taken with
/// [`RecordStore::take_last_save`].
pub struct RecordStore {
    schema: Schema,
    records: Vec<Record>,
    persister: Option<Persister>,
    last_save: Option<SaveHandle>,
}

impl RecordStore {
    /// A store that lives in memory only.
    pub fn new(schema: Schema) -> RecordStore {
        RecordStore {
            schema,
            records: Vec::new(),
            persister: None,
            last_save: None,
        }
    }

    /// A store rehydrated from `backend`, saving back to it after each mutation.
    ///
    /// Nothing stored, or stored data that cannot be read, starts an empty collection.
    pub fn open(
        schema: Schema,
        backend: Box<dyn BlobStore>,
        namespace: &str,
    ) -> PersistResult<RecordStore> {
        let records = load_records(backend.as_ref(), &schema, namespace);
        let persister = Persister::spawn(backend, namespace)?;
        Ok(RecordStore {
            schema,
            records,
            persister: Some(persister),
            last_save: None,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The records, in order.
    pub fn list(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends a record built from a partial key -> value mapping and returns its
    /// position.
    pub fn create<I, K, V>(&mut self, values: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let record = self.schema.build_record(values);
        self.records.push(record);
        let index = self.records.len() - 1;
        debug!("create: record {}", index);
        self.persist();
        index
    }

    /// Replaces the record at `index` with one built from `values`. Fields absent from
    /// `values` become empty.
    pub fn update<I, K, V>(&mut self, index: usize, values: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.check_index(index)?;
        self.records[index] = self.schema.build_record(values);
        debug!("update: record {}", index);
        self.persist();
        Ok(())
    }

    /// Removes the record at `index`; the following records move down by one.
    ///
    /// There is no undo. Asking the user for confirmation is up to the caller.
    pub fn delete(&mut self, index: usize) -> StoreResult<()> {
        self.check_index(index)?;
        self.records.remove(index);
        debug!("delete: record {}, {} left", index, self.records.len());
        self.persist();
        Ok(())
    }

    /// Appends records in order and returns how many were added.
    pub fn append_all(&mut self, records: Vec<Record>) -> usize {
        let count = records.len();
        let schema = &self.schema;
        self.records
            .extend(records.into_iter().map(|r| schema.conform(r.into_map())));
        debug!("append_all: {} records, {} total", count, self.records.len());
        self.persist();
        count
    }

    pub fn clear(&mut self) {
        info!("clear: dropping {} records", self.records.len());
        self.records.clear();
        self.persist();
    }

    /// Reconciles `rows` against the schema and appends the result.
    ///
    /// The store is left untouched when there are no rows.
    pub fn import_rows(&mut self, rows: &[ImportRow]) -> Result<ImportSummary, Advisory> {
        let (records, summary) = reconcile_with_summary(&self.schema, rows)?;
        let added = self.append_all(records);
        info!("import_rows: imported {} records", added);
        Ok(summary)
    }

    /// The current records as export rows.
    pub fn export_rows(&self) -> Result<Vec<ExportRow>, Advisory> {
        serialize(&self.schema, &self.records)
    }

    /// The handle of the most recent save, if one was queued since the last call.
    pub fn take_last_save(&mut self) -> Option<SaveHandle> {
        self.last_save.take()
    }

    fn check_index(&self, index: usize) -> StoreResult<()> {
        ensure!(
            index < self.records.len(),
            IndexOutOfRangeSnafu {
                index,
                len: self.records.len()
            }
        );
        Ok(())
    }

    fn persist(&mut self) {
        if let Some(persister) = &self.persister {
            self.last_save = Some(persister.submit(&self.records));
        }
    }
}
