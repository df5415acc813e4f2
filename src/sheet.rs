use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};

use std::fs;
use std::io::Write;

use survey_records::{
    FileBlobStore, PersistError, RecordStore, Schema, SchemaError, SheetCodec,
    StoreError,
};

use crate::args::{Args, Command};
use crate::sheet::config_reader::*;
use crate::sheet::io_common::SheetFormat;
use crate::sheet::io_csv::CsvCodec;
use crate::sheet::io_xlsx::XlsxCodec;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_xlsx;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SheetError {
    #[snafu(display("Invalid list of fields"))]
    InvalidSchema { source: SchemaError },
    #[snafu(display("Cannot change the records"))]
    Store { source: StoreError },
    #[snafu(display("Cannot save or load the records"))]
    Persist { source: PersistError },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the configuration {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error reading file {path}"))]
    ReadingInput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error printing to the standard output"))]
    Printing { source: std::io::Error },
    #[snafu(display("Error opening the Excel workbook"))]
    OpeningExcel { source: calamine::XlsxError },
    #[snafu(display("The Excel workbook does not contain the worksheet {worksheet}"))]
    MissingWorksheet { worksheet: String },
    #[snafu(display("Error writing the Excel workbook"))]
    WritingExcel {
        source: rust_xlsxwriter::XlsxError,
    },
    #[snafu(display("Error reading or writing CSV data"))]
    Csv { source: csv::Error },
    #[snafu(display("Error flushing CSV data"))]
    CsvFlush { source: std::io::Error },
    #[snafu(display("Cannot guess the type of {path}: use .xlsx or .csv, or pass the type explicitly"))]
    UnknownFileType { path: String },
    #[snafu(display("Expected key=value, got {assignment:?}"))]
    BadAssignment { assignment: String },
    #[snafu(display("There is no field with key {key:?} (see the schema command)"))]
    UnknownKey { key: String },
    #[snafu(display("Refusing to {action} without --yes"))]
    MissingConfirmation { action: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type SheetResult<T> = Result<T, SheetError>;

/// Parses `key=value` pairs, checking that every key belongs to the schema.
fn parse_assignments(schema: &Schema, assignments: &[String]) -> SheetResult<Vec<(String, String)>> {
    let mut res: Vec<(String, String)> = Vec::new();
    for a in assignments {
        let (key, value) = a
            .split_once('=')
            .context(BadAssignmentSnafu { assignment: a })?;
        let key = key.trim();
        ensure!(schema.field(key).is_some(), UnknownKeySnafu { key });
        res.push((key.to_string(), value.to_string()));
    }
    Ok(res)
}

fn write_line(out: &mut dyn Write, line: &str) -> SheetResult<()> {
    writeln!(out, "{}", line).context(PrintingSnafu {})
}

fn print_schema(schema: &Schema, out: &mut dyn Write) -> SheetResult<()> {
    for (idx, field) in schema.fields().iter().enumerate() {
        write_line(out, &format!("{:>3} {}\t{}", idx, field.key, field.label))?;
    }
    Ok(())
}

fn import_file(
    store: &mut RecordStore,
    file: &str,
    input_type: Option<&str>,
    worksheet: Option<String>,
    out: &mut dyn Write,
) -> SheetResult<()> {
    let format = SheetFormat::detect(file, input_type)?;
    info!("import_file: reading {:?} as {:?}", file, format);
    let bytes = fs::read(file).context(ReadingInputSnafu { path: file })?;
    let rows = match format {
        SheetFormat::Xlsx => XlsxCodec::new(worksheet).decode(&bytes)?,
        SheetFormat::Csv => CsvCodec::new().decode(&bytes)?,
    };
    debug!("import_file: {} rows decoded", rows.len());
    match store.import_rows(&rows) {
        Ok(summary) => {
            if !summary.ignored_headers.is_empty() {
                warn!(
                    "import_file: columns that do not match any field: {:?}",
                    summary.ignored_headers
                );
            }
            write_line(
                out,
                &format!("Imported {} records from {}", summary.rows, file),
            )
        }
        Err(advisory) => {
            warn!("import_file: {}: {}", file, advisory);
            write_line(out, &format!("{}: {}", file, advisory))
        }
    }
}

fn export_file(
    store: &RecordStore,
    file: &str,
    output_type: Option<&str>,
    sheet_name: &str,
    out: &mut dyn Write,
) -> SheetResult<()> {
    let format = SheetFormat::detect(file, output_type)?;
    let rows = match store.export_rows() {
        Ok(rows) => rows,
        Err(advisory) => {
            warn!("export_file: {}", advisory);
            return write_line(out, &format!("{}, {} was not written", advisory, file));
        }
    };
    let bytes = match format {
        SheetFormat::Xlsx => XlsxCodec::new(None).encode(&rows, sheet_name)?,
        SheetFormat::Csv => CsvCodec::new().encode(&rows, sheet_name)?,
    };
    fs::write(file, &bytes).context(WritingOutputSnafu { path: file })?;
    info!("export_file: wrote {} bytes to {:?}", bytes.len(), file);
    write_line(out, &format!("Exported {} records to {}", rows.len(), file))
}

/// Runs one command against the store. Everything meant for the user goes to `out`.
pub fn run_command(
    store: &mut RecordStore,
    command: &Command,
    settings: &Settings,
    out: &mut dyn Write,
) -> SheetResult<()> {
    match command {
        Command::Schema => print_schema(store.schema(), out),
        Command::List => {
            for record in store.list() {
                let line = serde_json::to_string(record)
                    .with_whatever_context(|_| "Cannot print a record".to_string())?;
                write_line(out, &line)?;
            }
            Ok(())
        }
        Command::Add { set } => {
            let values = parse_assignments(store.schema(), set)?;
            let idx = store.create(values);
            write_line(out, &idx.to_string())
        }
        Command::Update { index, set } => {
            // The store replaces the whole record: start from the current values.
            let mut values: Vec<(String, String)> = store
                .get(*index)
                .map(|r| r.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
                .unwrap_or_default();
            values.extend(parse_assignments(store.schema(), set)?);
            store.update(*index, values).context(StoreSnafu {})
        }
        Command::Delete { index, yes } => {
            ensure!(
                *yes,
                MissingConfirmationSnafu {
                    action: format!("delete record {}", index)
                }
            );
            store.delete(*index).context(StoreSnafu {})
        }
        Command::Clear { yes } => {
            ensure!(
                *yes,
                MissingConfirmationSnafu {
                    action: "delete all the records"
                }
            );
            store.clear();
            Ok(())
        }
        Command::Import {
            file,
            input_type,
            excel_worksheet_name,
        } => import_file(
            store,
            file,
            input_type.as_deref(),
            excel_worksheet_name
                .clone()
                .or_else(|| settings.excel_worksheet_name.clone()),
            out,
        ),
        Command::Export {
            file,
            output_type,
            sheet_name,
        } => {
            let file = file.clone().unwrap_or_else(|| settings.export_file_name.clone());
            let sheet_name = sheet_name
                .clone()
                .unwrap_or_else(|| settings.sheet_name.clone());
            export_file(store, &file, output_type.as_deref(), &sheet_name, out)
        }
    }
}

pub fn run(args: &Args) -> SheetResult<()> {
    let config = match &args.config {
        Some(path) => read_config(path)?,
        None => SheetConfig::default(),
    };
    let settings = Settings::new(&config, args);
    info!("settings: {:?}", settings);
    let schema = settings.schema()?;
    let mut stdout = std::io::stdout();

    // Printing the schema does not need the stored data.
    if let Command::Schema = args.command {
        return print_schema(&schema, &mut stdout);
    }

    let backend = FileBlobStore::new(&settings.storage_directory);
    let mut store = RecordStore::open(schema, Box::new(backend), &settings.namespace)
        .context(PersistSnafu {})?;
    run_command(&mut store, &args.command, &settings, &mut stdout)?;

    // The process is about to exit: wait for the data to be on disk.
    if let Some(handle) = store.take_last_save() {
        handle.wait().context(PersistSnafu {})?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_records::MemoryBlobStore;

    fn settings() -> Settings {
        Settings {
            fields: Some(vec!["Name of the Block".to_string(), "Age".to_string()]),
            ..Settings::default()
        }
    }

    fn store() -> RecordStore {
        RecordStore::new(settings().schema().unwrap())
    }

    fn run_ok(store: &mut RecordStore, command: Command) -> String {
        let mut out: Vec<u8> = Vec::new();
        run_command(store, &command, &settings(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn add_list_update_delete() {
        let mut store = store();
        let out = run_ok(
            &mut store,
            Command::Add {
                set: vec!["name_of_the_block=Sojat".to_string(), "age=4".to_string()],
            },
        );
        assert_eq!(out, "0\n");
        run_ok(
            &mut store,
            Command::Add {
                set: vec!["age=9".to_string()],
            },
        );
        run_ok(
            &mut store,
            Command::Update {
                index: 1,
                set: vec!["name_of_the_block=Pali".to_string()],
            },
        );
        let out = run_ok(&mut store, Command::List);
        assert_eq!(
            out,
            "{\"age\":\"4\",\"name_of_the_block\":\"Sojat\"}\n{\"age\":\"9\",\"name_of_the_block\":\"Pali\"}\n"
        );
        run_ok(&mut store, Command::Delete { index: 0, yes: true });
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_needs_confirmation() {
        let mut store = store();
        store.create([("age", "1")]);
        let mut out: Vec<u8> = Vec::new();
        let res = run_command(
            &mut store,
            &Command::Delete {
                index: 0,
                yes: false,
            },
            &settings(),
            &mut out,
        );
        assert!(matches!(res, Err(SheetError::MissingConfirmation { .. })));
        assert_eq!(store.len(), 1);
        let res = run_command(&mut store, &Command::Clear { yes: false }, &settings(), &mut out);
        assert!(matches!(res, Err(SheetError::MissingConfirmation { .. })));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn bad_assignments_are_rejected() {
        let schema = settings().schema().unwrap();
        assert!(matches!(
            parse_assignments(&schema, &["age".to_string()]),
            Err(SheetError::BadAssignment { .. })
        ));
        assert!(matches!(
            parse_assignments(&schema, &["height=3".to_string()]),
            Err(SheetError::UnknownKey { .. })
        ));
        assert_eq!(
            parse_assignments(&schema, &["age=a=b".to_string()]).unwrap(),
            vec![("age".to_string(), "a=b".to_string())]
        );
    }

    #[test]
    fn update_keeps_fields_that_are_not_set() {
        let mut store = store();
        store.create([("name_of_the_block", "Sojat"), ("age", "41")]);
        run_ok(
            &mut store,
            Command::Update {
                index: 0,
                set: vec!["age=42".to_string()],
            },
        );
        assert_eq!(store.get(0).unwrap().get("name_of_the_block"), Some("Sojat"));
        assert_eq!(store.get(0).unwrap().get("age"), Some("42"));
        assert_eq!(store.get(0).unwrap().len(), 2);
    }

    #[test]
    fn out_of_range_update_is_an_error() {
        let mut store = store();
        let mut out: Vec<u8> = Vec::new();
        let res = run_command(
            &mut store,
            &Command::Update {
                index: 3,
                set: vec![],
            },
            &settings(),
            &mut out,
        );
        assert!(matches!(res, Err(SheetError::Store { .. })));
    }

    #[test]
    fn csv_import_then_xlsx_export() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        fs::write(&input, "NAME OF THE BLOCK ,age,Colour\nSojat,41,red\n,,\nPali,,blue\n").unwrap();
        let output = dir.path().join("out.xlsx");

        let mut store = RecordStore::open(
            settings().schema().unwrap(),
            Box::new(MemoryBlobStore::new()),
            "test",
        )
        .unwrap();
        let out = run_ok(
            &mut store,
            Command::Import {
                file: input.display().to_string(),
                input_type: None,
                excel_worksheet_name: None,
            },
        );
        assert!(out.starts_with("Imported 2 records"));
        assert_eq!(store.list()[1].get("name_of_the_block"), Some("Pali"));

        run_ok(
            &mut store,
            Command::Export {
                file: Some(output.display().to_string()),
                output_type: None,
                sheet_name: None,
            },
        );
        let bytes = fs::read(&output).unwrap();
        let rows = XlsxCodec::new(None).decode(&bytes).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].cells().collect::<Vec<_>>(),
            vec![("Name of the Block", "Sojat"), ("Age", "41")]
        );
        assert_eq!(
            rows[1].cells().collect::<Vec<_>>(),
            vec![("Name of the Block", "Pali"), ("Age", "")]
        );
    }

    #[test]
    fn empty_export_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");
        let mut store = store();
        let out = run_ok(
            &mut store,
            Command::Export {
                file: Some(output.display().to_string()),
                output_type: None,
                sheet_name: None,
            },
        );
        assert!(out.starts_with("There are no records to export"));
        assert!(!output.exists());
    }

    #[test]
    fn header_only_import_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        fs::write(&input, "Name of the Block,Age\n").unwrap();
        let mut store = store();
        let out = run_ok(
            &mut store,
            Command::Import {
                file: input.display().to_string(),
                input_type: None,
                excel_worksheet_name: None,
            },
        );
        assert!(out.ends_with("No data found in the spreadsheet\n"));
        assert!(store.is_empty());
    }
}
