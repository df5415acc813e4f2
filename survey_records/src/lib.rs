/*!
Survey records captured against a fixed, ordered schema, and reconciled with
spreadsheets written by other people.

The pieces, from the bottom up:
- [`Schema`]: the ordered fields of the form, each with a label and a key derived from
  it ([`derive_key`]).
- [`RecordStore`]: the ordered collection of [`Record`]s, with create / update /
  delete / append / clear. Every change is saved in the background through a
  [`BlobStore`].
- [`reconcile`]: maps the rows of an imported spreadsheet onto the schema, field by
  field, with a tolerant header matching policy.
- [`serialize`]: turns records into rows whose headers are exactly the schema labels.

Reading and writing the spreadsheet files themselves is left to a [`SheetCodec`].

```
use survey_records::{RecordStore, Schema, SheetRow};

let schema = Schema::new(["Name of the Block", "Age"])?;
let mut store = RecordStore::new(schema);

let rows: Vec<SheetRow> = vec![
    [("NAME OF THE BLOCK ", "Sojat"), ("Age", "41")].into_iter().collect(),
];
store.import_rows(&rows)?;
assert_eq!(store.list()[0].get("name_of_the_block"), Some("Sojat"));

let exported = store.export_rows()?;
assert_eq!(
    exported[0].headers().collect::<Vec<_>>(),
    vec!["Name of the Block", "Age"]
);
# Ok::<(), Box<dyn std::error::Error>>(())
```

See the [manual] for the details of the matching policy and the storage format.
*/

use snafu::Snafu;

pub mod export;
pub mod manual;
pub mod persist;
pub mod reconcile;
mod record;
mod schema;
pub mod store;

pub use crate::export::{serialize, serialize_record};
pub use crate::persist::{
    BlobStore, FileBlobStore, MemoryBlobStore, PersistError, SaveHandle, DEFAULT_NAMESPACE,
};
pub use crate::reconcile::{
    match_field, reconcile, reconcile_row, reconcile_with_summary, ImportSummary, MatchTier,
};
pub use crate::record::{ExportRow, ImportRow, Record, SheetRow};
pub use crate::schema::{derive_key, Field, Schema, SchemaError, KEY_SEPARATOR, SURVEY_LABELS};
pub use crate::store::{RecordStore, StoreError};

/// Outcomes that mean "there was nothing to work on" rather than "something is wrong".
///
/// The operation that reports one of these did not change anything.
#[derive(Debug, Snafu, PartialEq, Eq, Clone, Copy)]
#[snafu(visibility(pub(crate)))]
pub enum Advisory {
    #[snafu(display("No data found in the spreadsheet"))]
    NoDataFound {},
    #[snafu(display("There are no records to export"))]
    EmptyInput {},
}

/// Converts between the bytes of a spreadsheet file and rows of named cells.
pub trait SheetCodec {
    type Error;

    /// Reads the rows of a spreadsheet. The first row holds the headers.
    fn decode(&self, bytes: &[u8]) -> Result<Vec<ImportRow>, Self::Error>;

    /// Writes the rows into a spreadsheet with a single sheet named `sheet_name`. The
    /// headers are taken from the first row.
    fn encode(&self, rows: &[ExportRow], sheet_name: &str) -> Result<Vec<u8>, Self::Error>;
}
