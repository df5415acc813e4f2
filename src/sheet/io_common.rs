use std::path::Path;

use crate::sheet::*;
use survey_records::ImportRow;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SheetFormat {
    Xlsx,
    Csv,
}

impl SheetFormat {
    /// Uses the explicit type if there is one, the file extension otherwise.
    pub fn detect(path: &str, explicit: Option<&str>) -> SheetResult<SheetFormat> {
        let ext = match explicit {
            Some(t) => Some(t.to_lowercase()),
            None => Path::new(path)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase()),
        };
        match ext.as_deref() {
            Some("xlsx") => Ok(SheetFormat::Xlsx),
            Some("csv") => Ok(SheetFormat::Csv),
            _ => UnknownFileTypeSnafu { path }.fail(),
        }
    }
}

/// Pairs the cells of each data row with the header row.
///
/// Columns with a blank header and rows where every cell is blank are skipped. A row
/// shorter than the header is padded with empty cells.
pub fn assemble_rows<I>(header: &[String], data: I) -> Vec<ImportRow>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let columns: Vec<(usize, &String)> = header
        .iter()
        .enumerate()
        .filter(|(_, h)| !h.trim().is_empty())
        .collect();
    debug!("assemble_rows: columns: {:?}", columns);
    let mut res: Vec<ImportRow> = Vec::new();
    for (lineno, cells) in data.into_iter().enumerate() {
        if cells.iter().all(|c| c.trim().is_empty()) {
            debug!("assemble_rows: skipping blank row {}", lineno + 2);
            continue;
        }
        let row: ImportRow = columns
            .iter()
            .map(|(idx, h)| {
                (
                    h.to_string(),
                    cells.get(*idx).cloned().unwrap_or_default(),
                )
            })
            .collect();
        res.push(row);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn detect_format() {
        assert_eq!(SheetFormat::detect("a/b.XLSX", None).unwrap(), SheetFormat::Xlsx);
        assert_eq!(SheetFormat::detect("b.csv", None).unwrap(), SheetFormat::Csv);
        assert_eq!(
            SheetFormat::detect("b.txt", Some("csv")).unwrap(),
            SheetFormat::Csv
        );
        assert!(matches!(
            SheetFormat::detect("b.ods", None),
            Err(SheetError::UnknownFileType { .. })
        ));
    }

    #[test]
    fn rows_are_paired_with_headers() {
        let header = strings(&["Name", "", "Age"]);
        let rows = assemble_rows(
            &header,
            vec![
                strings(&["Asha", "ignored", "30"]),
                strings(&["", " ", ""]),
                strings(&["Ravi"]),
            ],
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].cells().collect::<Vec<_>>(),
            vec![("Name", "Asha"), ("Age", "30")]
        );
        assert_eq!(
            rows[1].cells().collect::<Vec<_>>(),
            vec![("Name", "Ravi"), ("Age", "")]
        );
    }
}
