use serde::Serialize;

use std::collections::BTreeMap;

/// One data point. It holds a text value for every key of the schema it was built
/// from, and nothing else.
///
/// Records are only created through a [`crate::Schema`], which is what guarantees the
/// complete key set.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Record {
    values: BTreeMap<String, String>,
}

impl Record {
    pub(crate) fn from_complete_map(values: BTreeMap<String, String>) -> Record {
        Record { values }
    }

    pub(crate) fn set(&mut self, key: String, value: String) {
        self.values.insert(key, value);
    }

    pub(crate) fn into_map(self) -> BTreeMap<String, String> {
        self.values
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The (key, value) pairs in key order. Use [`crate::Schema::values_of`] for the
    /// display order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when every value is the empty string.
    pub fn is_blank(&self) -> bool {
        self.values.values().all(|v| v.is_empty())
    }
}

/// A row of a spreadsheet: (header, value) cells in column order.
///
/// Headers are whatever the spreadsheet author typed. They may repeat, and they may or
/// may not correspond to a field of the schema.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct SheetRow {
    cells: Vec<(String, String)>,
}

/// A decoded spreadsheet row, before reconciliation.
pub type ImportRow = SheetRow;

/// A row ready to be encoded, with the schema labels as headers.
pub type ExportRow = SheetRow;

impl SheetRow {
    pub fn new() -> SheetRow {
        SheetRow { cells: Vec::new() }
    }

    pub fn push(&mut self, header: impl Into<String>, value: impl Into<String>) {
        self.cells.push((header.into(), value.into()));
    }

    /// The value of the first cell whose header is exactly `header`.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(h, _)| h.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SheetRow {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        SheetRow {
            cells: iter
                .into_iter()
                .map(|(h, v)| (h.into(), v.into()))
                .collect(),
        }
    }
}
