// Primitives for reading and writing CSV files.

use crate::sheet::io_common::assemble_rows;
use crate::sheet::*;
use survey_records::{ExportRow, ImportRow};

#[derive(Debug, Clone, Default)]
pub struct CsvCodec {}

impl CsvCodec {
    pub fn new() -> CsvCodec {
        CsvCodec {}
    }
}

impl SheetCodec for CsvCodec {
    type Error = SheetError;

    fn decode(&self, bytes: &[u8]) -> SheetResult<Vec<ImportRow>> {
        let rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);
        let mut records = rdr.into_records();
        let header: Vec<String> = match records.next() {
            Some(line) => line
                .context(CsvSnafu {})?
                .iter()
                .enumerate()
                // Spreadsheet programs like to start their CSV exports with a byte order mark.
                .map(|(idx, s)| match idx {
                    0 => s.trim_start_matches('\u{feff}').to_string(),
                    _ => s.to_string(),
                })
                .collect(),
            None => {
                debug!("CsvCodec::decode: empty file");
                return Ok(Vec::new());
            }
        };
        debug!("CsvCodec::decode: header: {:?}", header);
        let mut data: Vec<Vec<String>> = Vec::new();
        for line_r in records {
            let line = line_r.context(CsvSnafu {})?;
            data.push(line.iter().map(|s| s.to_string()).collect());
        }
        Ok(assemble_rows(&header, data))
    }

    fn encode(&self, rows: &[ExportRow], _sheet_name: &str) -> SheetResult<Vec<u8>> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        if let Some(first) = rows.first() {
            wtr.write_record(first.headers()).context(CsvSnafu {})?;
        }
        for row in rows {
            wtr.write_record(row.cells().map(|(_, v)| v))
                .context(CsvSnafu {})?;
        }
        wtr.into_inner()
            .map_err(|e| e.into_error())
            .context(CsvFlushSnafu {})
    }
}
