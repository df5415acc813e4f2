// ********* Schema registry ***********

use log::{debug, info};
use snafu::{ensure, Snafu};

use std::collections::{BTreeMap, HashMap};

use crate::record::Record;

/// The character inserted between the alphanumeric runs of a label.
pub const KEY_SEPARATOR: char = '_';

/// The labels of the survey form, in display and export order.
pub const SURVEY_LABELS: &[&str] = &[
    "Name of the State",
    "Name of the District",
    "Name of the Block",
    "Name of the Village",
    "Name of the Surveyor",
    "Date of Survey",
    "Name of the Respondent",
    "Age",
    "Gender",
    "Contact Number",
    "Household Size",
    "Primary Occupation",
    "Source of Drinking Water",
    "Remarks",
];

#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum SchemaError {
    #[snafu(display("The label {label:?} appears more than once in the schema"))]
    DuplicateLabel { label: String },
    #[snafu(display("The label {label:?} does not contain any letter or digit"))]
    EmptyKey { label: String },
    #[snafu(display("The labels {first:?} and {second:?} both derive the key {key:?}"))]
    DuplicateKey {
        key: String,
        first: String,
        second: String,
    },
}

/// Derives the machine identifier of a label.
///
/// The label is lower-cased, every run of characters that are not ASCII letters or
/// digits becomes a single separator, and separators at both ends are dropped.
///
/// ```
/// use survey_records::derive_key;
///
/// assert_eq!(derive_key("Name of the Block"), "name_of_the_block");
/// assert_eq!(derive_key("  Contact No. (mobile) "), "contact_no_mobile");
/// assert_eq!(derive_key("---"), "");
/// ```
pub fn derive_key(label: &str) -> String {
    let mut key = String::with_capacity(label.len());
    let mut pending_separator = false;
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !key.is_empty() {
                key.push(KEY_SEPARATOR);
            }
            pending_separator = false;
            key.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    key
}

/// One entry of the schema: what the user reads and what the data is stored under.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Field {
    pub label: String,
    pub key: String,
}

impl Field {
    pub fn new(label: &str) -> Field {
        Field {
            label: label.to_string(),
            key: derive_key(label),
        }
    }
}

/// The ordered set of fields that every record carries.
///
/// A schema is validated once when it is built: labels are unique, and their derived
/// keys are non-empty and unique. It never changes afterwards.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Schema {
    fields: Vec<Field>,
    positions: HashMap<String, usize>,
}

impl Schema {
    pub fn new<I, S>(labels: I) -> Result<Schema, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut fields: Vec<Field> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for label in labels {
            let field = Field::new(label.as_ref());
            ensure!(
                !fields.iter().any(|f| f.label == field.label),
                DuplicateLabelSnafu {
                    label: field.label.clone()
                }
            );
            ensure!(
                !field.key.is_empty(),
                EmptyKeySnafu {
                    label: field.label.clone()
                }
            );
            if let Some(idx) = positions.get(&field.key) {
                return DuplicateKeySnafu {
                    key: field.key.clone(),
                    first: fields[*idx].label.clone(),
                    second: field.label.clone(),
                }
                .fail();
            }
            debug!("Schema::new: field {:?} -> {:?}", field.label, field.key);
            positions.insert(field.key.clone(), fields.len());
            fields.push(field);
        }
        info!("Schema::new: {} fields", fields.len());
        Ok(Schema { fields, positions })
    }

    /// The built-in survey form.
    pub fn survey() -> Result<Schema, SchemaError> {
        Schema::new(SURVEY_LABELS)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.position_of(key).map(|idx| &self.fields[idx])
    }

    pub fn position_of(&self, key: &str) -> Option<usize> {
        self.positions.get(key).cloned()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.key.as_str())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.label.as_str())
    }

    /// A record where every field is the empty string.
    pub fn empty_record(&self) -> Record {
        Record::from_complete_map(
            self.fields
                .iter()
                .map(|f| (f.key.clone(), String::new()))
                .collect(),
        )
    }

    /// Overlays a partial key -> value mapping onto the empty record.
    ///
    /// Keys that are not part of the schema are dropped.
    pub fn build_record<I, K, V>(&self, values: I) -> Record
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = self.empty_record();
        for (key, value) in values {
            let key: String = key.into();
            if self.positions.contains_key(&key) {
                record.set(key, value.into());
            } else {
                debug!("build_record: dropping unknown key {:?}", key);
            }
        }
        record
    }

    /// Brings an arbitrary flat mapping back to the exact key set of the schema.
    pub fn conform(&self, mut values: BTreeMap<String, String>) -> Record {
        let complete: BTreeMap<String, String> = self
            .fields
            .iter()
            .map(|f| (f.key.clone(), values.remove(&f.key).unwrap_or_default()))
            .collect();
        if !values.is_empty() {
            debug!(
                "conform: dropping keys outside of the schema: {:?}",
                values.keys().collect::<Vec<_>>()
            );
        }
        Record::from_complete_map(complete)
    }

    /// The values of a record in schema order. A key missing from the record reads as
    /// the empty string.
    pub fn values_of<'a>(
        &'a self,
        record: &'a Record,
    ) -> impl Iterator<Item = (&'a Field, &'a str)> + 'a {
        self.fields
            .iter()
            .map(move |f| (f, record.get(&f.key).unwrap_or("")))
    }
}
