//! Serializers for the current view and the dashboard summary.
//!
//! CSV and JSON are always available. The spreadsheet writer is compiled in
//! with the `xlsx` feature; [`Capabilities::detect`] reports whether it is
//! present so callers can disable that one option instead of failing.

use std::{path::Path, sync::OnceLock};

use clap::ValueEnum;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::{
    dataset::{Column, Dataset},
    error::ExportError,
    io_utils,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Xlsx,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "tsv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            "xlsx" => Some(ExportFormat::Xlsx),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub csv: bool,
    pub json: bool,
    pub xlsx: bool,
}

impl Capabilities {
    pub fn detect() -> Self {
        Self {
            csv: true,
            json: true,
            xlsx: cfg!(feature = "xlsx"),
        }
    }

    pub fn supports(&self, format: ExportFormat) -> bool {
        match format {
            ExportFormat::Csv => self.csv,
            ExportFormat::Json => self.json,
            ExportFormat::Xlsx => self.xlsx,
        }
    }
}

pub fn export(
    dataset: &Dataset,
    format: ExportFormat,
    delimiter: u8,
) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Csv => to_csv(dataset, delimiter),
        ExportFormat::Json => to_json(dataset).map(String::into_bytes),
        ExportFormat::Xlsx => to_xlsx(dataset),
    }
}

/// Header row then one record per row; missing cells are empty fields.
pub fn to_csv(dataset: &Dataset, delimiter: u8) -> Result<Vec<u8>, ExportError> {
    let mut writer = io_utils::csv_writer(Vec::new(), delimiter);
    writer.write_record(dataset.column_names())?;
    for row in dataset.rows() {
        writer.write_record(
            row.iter()
                .map(|cell| cell.map(|v| v.as_display()).unwrap_or_default()),
        )?;
    }
    writer
        .into_inner()
        .map_err(|err| ExportError::Io(err.into_error()))
}

/// Array of row objects keyed by column name in column order.
pub fn to_json(dataset: &Dataset) -> Result<String, ExportError> {
    let names = dataset.column_names();
    let records = dataset
        .rows()
        .map(|row| {
            names
                .iter()
                .zip(row)
                .map(|(name, cell)| Ok((name.clone(), serde_json::to_value(cell)?)))
                .collect::<Result<Map<String, JsonValue>, serde_json::Error>>()
                .map(JsonValue::Object)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(serde_json::to_string_pretty(&records)?)
}

#[cfg(not(feature = "xlsx"))]
pub fn to_xlsx(_dataset: &Dataset) -> Result<Vec<u8>, ExportError> {
    Err(ExportError::Unavailable {
        format: "xlsx",
        reason: "this build does not include the spreadsheet writer",
    })
}

#[cfg(feature = "xlsx")]
pub use xlsx::to_xlsx;

#[cfg(feature = "xlsx")]
mod xlsx {
    use std::io::{Cursor, Write};

    use zip::{ZipWriter, write::FileOptions};

    use crate::{data::Value, dataset::Dataset, error::ExportError};

    pub const SHEET_NAME: &str = "Data";

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

    const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

    const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

    fn workbook_xml() -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="{SHEET_NAME}" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#
        )
    }

    /// Single-sheet workbook named `Data`, header in row 1, no index column.
    pub fn to_xlsx(dataset: &Dataset) -> Result<Vec<u8>, ExportError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES.as_bytes())?;
        zip.start_file("_rels/.rels", options)?;
        zip.write_all(ROOT_RELS.as_bytes())?;
        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(workbook_xml().as_bytes())?;
        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(WORKBOOK_RELS.as_bytes())?;
        zip.start_file("xl/worksheets/sheet1.xml", options)?;
        zip.write_all(sheet_xml(dataset).as_bytes())?;

        Ok(zip.finish()?.into_inner())
    }

    pub(super) fn sheet_xml(dataset: &Dataset) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        );
        xml.push_str(r#"<row r="1">"#);
        for (col, name) in dataset.column_names().iter().enumerate() {
            push_text_cell(&mut xml, &cell_ref(col, 1), name);
        }
        xml.push_str("</row>");

        for (idx, row) in dataset.rows().enumerate() {
            let row_number = idx + 2;
            xml.push_str(&format!(r#"<row r="{row_number}">"#));
            for (col, cell) in row.iter().enumerate() {
                let reference = cell_ref(col, row_number);
                match cell {
                    None => {}
                    Some(Value::Integer(i)) => push_number_cell(&mut xml, &reference, &i.to_string()),
                    Some(Value::Float(f)) if f.is_finite() => {
                        push_number_cell(&mut xml, &reference, &f.to_string())
                    }
                    Some(Value::Float(_)) => {}
                    Some(other) => push_text_cell(&mut xml, &reference, &other.as_display()),
                }
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData></worksheet>");
        xml
    }

    fn push_number_cell(xml: &mut String, reference: &str, value: &str) {
        xml.push_str(&format!(r#"<c r="{reference}"><v>{value}</v></c>"#));
    }

    fn push_text_cell(xml: &mut String, reference: &str, value: &str) {
        xml.push_str(&format!(
            r#"<c r="{reference}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
            escape_xml(value)
        ));
    }

    /// `A1`-style reference for a 0-based column and 1-based row.
    pub(super) fn cell_ref(column: usize, row: usize) -> String {
        let mut letters = Vec::new();
        let mut n = column + 1;
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push(char::from(b'A' + rem as u8));
            n = (n - 1) / 26;
        }
        letters.iter().rev().collect::<String>() + &row.to_string()
    }

    fn escape_xml(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len());
        for ch in value.chars() {
            match ch {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&apos;"),
                '\t' | '\n' | '\r' => escaped.push(ch),
                c if (c as u32) < 0x20 => {}
                c => escaped.push(c),
            }
        }
        escaped
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMissing {
    pub column: String,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total_records: usize,
    pub total_columns: usize,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub date_columns: Vec<String>,
    pub missing_values: Vec<ColumnMissing>,
    pub duplicate_rows: usize,
}

fn is_date_like_name(name: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)date|time").ok())
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(name))
}

pub fn summarize(dataset: &Dataset) -> DashboardSummary {
    let names_where = |keep: &dyn Fn(&Column) -> bool| {
        dataset
            .columns()
            .iter()
            .filter(|c| keep(c))
            .map(|c| c.name().to_string())
            .collect::<Vec<_>>()
    };
    DashboardSummary {
        total_records: dataset.row_count(),
        total_columns: dataset.column_count(),
        numeric_columns: names_where(&|c| c.kind().is_numeric()),
        categorical_columns: names_where(&|c| c.kind().is_textual()),
        date_columns: names_where(&|c| {
            c.kind().is_temporal() || is_date_like_name(c.name())
        }),
        missing_values: dataset
            .columns()
            .iter()
            .map(|c| ColumnMissing {
                column: c.name().to_string(),
                missing: c.missing_count(),
            })
            .collect(),
        duplicate_rows: dataset.duplicate_row_count(),
    }
}
