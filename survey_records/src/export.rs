use log::debug;
use snafu::ensure;

use crate::record::{ExportRow, Record};
use crate::schema::Schema;
use crate::{Advisory, EmptyInputSnafu};

/// Turns one record into a row whose headers are the schema labels, in schema order.
pub fn serialize_record(schema: &Schema, record: &Record) -> ExportRow {
    schema
        .values_of(record)
        .map(|(field, value)| (field.label.as_str(), value))
        .collect()
}

/// Serializes the records for export.
///
/// Columns are always exactly the schema labels, in order: keys missing from a record
/// read as empty and keys outside of the schema are ignored. Nothing is produced for
/// an empty collection ([`Advisory::EmptyInput`]).
pub fn serialize(schema: &Schema, records: &[Record]) -> Result<Vec<ExportRow>, Advisory> {
    ensure!(!records.is_empty(), EmptyInputSnafu {});
    debug!("serialize: {} records", records.len());
    Ok(records
        .iter()
        .map(|record| serialize_record(schema, record))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn headers_follow_schema_order() {
        // Keys sort as age < name < zone; the schema order is different.
        let schema = Schema::new(["Zone", "Name", "Age"]).unwrap();
        let records = vec![schema.build_record([("age", "3"), ("zone", "N")])];
        let rows = serialize(&schema, &records).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].cells().collect::<Vec<_>>(),
            vec![("Zone", "N"), ("Name", ""), ("Age", "3")]
        );
    }

    #[test]
    fn foreign_record_is_read_defensively() {
        let schema = Schema::new(["Name", "Age"]).unwrap();
        let other = Schema::new(["Name", "Height"]).unwrap();
        let record = other.conform(BTreeMap::from([
            ("name".to_string(), "Ravi".to_string()),
            ("height".to_string(), "170".to_string()),
        ]));
        let row = serialize_record(&schema, &record);
        assert_eq!(
            row.cells().collect::<Vec<_>>(),
            vec![("Name", "Ravi"), ("Age", "")]
        );
    }

    #[test]
    fn empty_collection_is_empty_input() {
        let schema = Schema::new(["Name"]).unwrap();
        assert_eq!(serialize(&schema, &[]), Err(Advisory::EmptyInput {}));
    }
}
