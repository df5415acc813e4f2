use clap::{Parser, Subcommand};

/// Keeps survey records and moves them in and out of spreadsheets.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file. See the manual for the accepted keys.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory, optional) Where the records are stored. Setting this option overrides the
    /// storageDirectory entry of the configuration.
    #[clap(short, long, value_parser)]
    pub storage: Option<String>,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Prints the label and the key of every field.
    Schema,
    /// Prints every record as a JSON object, one per line.
    List,
    /// Adds a record. Fields that are not set are left empty.
    Add {
        /// (key=value, repeated) A field value, using the key of the field.
        #[clap(long, value_parser)]
        set: Vec<String>,
    },
    /// Changes the record at the given position (starting at 0).
    Update {
        #[clap(value_parser)]
        index: usize,
        /// (key=value, repeated) A new field value. Fields that are not set keep their value.
        #[clap(long, value_parser)]
        set: Vec<String>,
    },
    /// Deletes the record at the given position (starting at 0). This cannot be undone.
    Delete {
        #[clap(value_parser)]
        index: usize,
        /// Confirms the deletion.
        #[clap(long, takes_value = false)]
        yes: bool,
    },
    /// Deletes all the records. This cannot be undone.
    Clear {
        /// Confirms the deletion.
        #[clap(long, takes_value = false)]
        yes: bool,
    },
    /// Adds the rows of a spreadsheet (.xlsx or .csv) as new records.
    Import {
        #[clap(value_parser)]
        file: String,
        /// (xlsx or csv) The type of the input. By default, it is guessed from the file extension.
        #[clap(long, value_parser)]
        input_type: Option<String>,
        /// When importing an Excel file, the name of the worksheet to read (default: the first one).
        #[clap(long, value_parser)]
        excel_worksheet_name: Option<String>,
    },
    /// Writes all the records to a spreadsheet (.xlsx or .csv).
    Export {
        /// (file path, optional) The output file. Defaults to the exportFileName of the configuration.
        #[clap(value_parser)]
        file: Option<String>,
        /// (xlsx or csv) The type of the output. By default, it is guessed from the file extension.
        #[clap(long, value_parser)]
        output_type: Option<String>,
        /// The name of the sheet in the exported Excel file.
        #[clap(long, value_parser)]
        sheet_name: Option<String>,
    },
}
