use std::io::Cursor;

use calamine::{DataType, Reader, Xlsx};
use rust_xlsxwriter::Workbook;

use crate::sheet::io_common::assemble_rows;
use crate::sheet::*;
use survey_records::{ExportRow, ImportRow};

/// Reads the first worksheet of an Excel workbook, or the one with the given name.
#[derive(Debug, Clone, Default)]
pub struct XlsxCodec {
    worksheet_name: Option<String>,
}

impl XlsxCodec {
    pub fn new(worksheet_name: Option<String>) -> XlsxCodec {
        XlsxCodec { worksheet_name }
    }

    fn get_range(&self, bytes: &[u8]) -> SheetResult<Option<calamine::Range<DataType>>> {
        let mut workbook: Xlsx<_> =
            Xlsx::new(Cursor::new(bytes.to_vec())).context(OpeningExcelSnafu {})?;
        // A worksheet name was provided, use it.
        if let Some(worksheet_name) = &self.worksheet_name {
            debug!("XlsxCodec: reading worksheet {:?}", worksheet_name);
            let wrange = workbook
                .worksheet_range(worksheet_name)
                .context(MissingWorksheetSnafu {
                    worksheet: worksheet_name,
                })?
                .context(OpeningExcelSnafu {})?;
            Ok(Some(wrange))
        } else {
            match workbook.worksheet_range_at(0) {
                Some(wrange) => Ok(Some(wrange.context(OpeningExcelSnafu {})?)),
                None => Ok(None),
            }
        }
    }
}

/// The text of a cell. Numbers without a fractional part are printed as integers.
fn read_cell_calamine(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) | DataType::DateTime(f) if f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", *f as i64)
        }
        DataType::Float(f) | DataType::DateTime(f) => f.to_string(),
        DataType::Bool(b) => b.to_string(),
        DataType::Empty => "".to_string(),
        _ => {
            debug!("read_cell_calamine: no text for cell {:?}", cell);
            "".to_string()
        }
    }
}

impl SheetCodec for XlsxCodec {
    type Error = SheetError;

    fn decode(&self, bytes: &[u8]) -> SheetResult<Vec<ImportRow>> {
        let wrange = match self.get_range(bytes)? {
            Some(wrange) => wrange,
            None => {
                debug!("XlsxCodec::decode: the workbook has no worksheet");
                return Ok(Vec::new());
            }
        };
        let mut iter = wrange.rows();
        let header: Vec<String> = match iter.next() {
            Some(row) => row.iter().map(read_cell_calamine).collect(),
            None => return Ok(Vec::new()),
        };
        debug!("XlsxCodec::decode: header: {:?}", header);
        let data = iter.map(|row| row.iter().map(read_cell_calamine).collect::<Vec<String>>());
        Ok(assemble_rows(&header, data))
    }

    fn encode(&self, rows: &[ExportRow], sheet_name: &str) -> SheetResult<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name).context(WritingExcelSnafu {})?;
        if let Some(first) = rows.first() {
            for (col, header) in first.headers().enumerate() {
                worksheet
                    .write_string(0, col as u16, header)
                    .context(WritingExcelSnafu {})?;
            }
        }
        for (idx, row) in rows.iter().enumerate() {
            let lineno = (idx + 1) as u32;
            for (col, (_, value)) in row.cells().enumerate() {
                // Blank cells are left out of the sheet.
                if value.is_empty() {
                    continue;
                }
                worksheet
                    .write_string(lineno, col as u16, value)
                    .context(WritingExcelSnafu {})?;
            }
        }
        workbook.save_to_buffer().context(WritingExcelSnafu {})
    }
}
