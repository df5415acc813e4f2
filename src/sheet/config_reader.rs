use crate::args::Args;
use crate::sheet::*;

use serde::{Deserialize, Serialize};
use survey_records::DEFAULT_NAMESPACE;

pub const DEFAULT_EXPORT_FILE_NAME: &str = "survey_records.xlsx";
pub const DEFAULT_SHEET_NAME: &str = "Survey";

/// The configuration file, as written by the user. Every entry is optional.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetConfig {
    #[serde(rename = "storageDirectory")]
    pub storage_directory: Option<String>,
    #[serde(rename = "namespace")]
    pub namespace: Option<String>,
    #[serde(rename = "exportFileName")]
    pub export_file_name: Option<String>,
    #[serde(rename = "sheetName")]
    pub sheet_name: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "fields")]
    pub fields: Option<Vec<String>>,
}

/// The configuration once defaults and command line overrides are applied.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Settings {
    pub storage_directory: String,
    pub namespace: String,
    pub export_file_name: String,
    pub sheet_name: String,
    pub excel_worksheet_name: Option<String>,
    /// None for the built-in survey form.
    pub fields: Option<Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            storage_directory: ".".to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            export_file_name: DEFAULT_EXPORT_FILE_NAME.to_string(),
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            excel_worksheet_name: None,
            fields: None,
        }
    }
}

impl Settings {
    pub fn new(config: &SheetConfig, args: &Args) -> Settings {
        let d = Settings::default();
        Settings {
            storage_directory: args
                .storage
                .clone()
                .or_else(|| config.storage_directory.clone())
                .unwrap_or(d.storage_directory),
            namespace: config.namespace.clone().unwrap_or(d.namespace),
            export_file_name: config.export_file_name.clone().unwrap_or(d.export_file_name),
            sheet_name: config.sheet_name.clone().unwrap_or(d.sheet_name),
            excel_worksheet_name: config.excel_worksheet_name.clone(),
            fields: config.fields.clone(),
        }
    }

    pub fn schema(&self) -> SheetResult<Schema> {
        let schema = match &self.fields {
            Some(labels) => Schema::new(labels),
            None => Schema::survey(),
        };
        schema.context(InvalidSchemaSnafu {})
    }
}

pub fn read_config(path: &str) -> SheetResult<SheetConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: SheetConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn partial_config_and_overrides() {
        let config: SheetConfig = serde_json::from_str(
            r#"{"storageDirectory": "data", "sheetName": "Round 2", "fields": ["Village", "Age"]}"#,
        )
        .unwrap();
        let args = Args::parse_from(["surveysheet", "--storage", "elsewhere", "list"]);
        let settings = Settings::new(&config, &args);
        assert_eq!(settings.storage_directory, "elsewhere");
        assert_eq!(settings.sheet_name, "Round 2");
        assert_eq!(settings.namespace, DEFAULT_NAMESPACE);
        assert_eq!(settings.export_file_name, DEFAULT_EXPORT_FILE_NAME);
        let schema = settings.schema().unwrap();
        assert_eq!(schema.keys().collect::<Vec<_>>(), vec!["village", "age"]);
    }

    #[test]
    fn default_schema_is_the_survey() {
        let schema = Settings::default().schema().unwrap();
        assert_eq!(schema.len(), survey_records::SURVEY_LABELS.len());
    }

    #[test]
    fn colliding_fields_are_rejected() {
        let settings = Settings {
            fields: Some(vec!["Phone No.".to_string(), "Phone (no)".to_string()]),
            ..Settings::default()
        };
        assert!(matches!(
            settings.schema(),
            Err(SheetError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn read_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.json");
        fs::write(&p, r#"{"namespace": "block_survey"}"#).unwrap();
        let config = read_config(&p.display().to_string()).unwrap();
        assert_eq!(config.namespace, Some("block_survey".to_string()));
        assert!(matches!(
            read_config(&dir.path().join("missing.json").display().to_string()),
            Err(SheetError::OpeningJson { .. })
        ));
    }
}
