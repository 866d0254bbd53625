//! # opsdigest workbook
//!
//! Renders a period's records into a three-sheet `.xlsx` report.
//!
//! ## Overview
//!
//! | Sheet | Source records |
//! |-------|----------------|
//! | `Produção` | full production for the period |
//! | `Sinistros` | claims noticed in the period |
//! | `Assistências Urgentes` | urgent service tickets opened in the period |
//!
//! Records are opaque JSON objects. Each column projects one (possibly nested)
//! field; missing values leave the cell empty.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use opsdigest_workbook::render_workbook;
//! use serde_json::{Map, Value};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let none: Vec<Map<String, Value>> = Vec::new();
//!     let artifact = render_workbook(&none, &none, &none, "2024-05-01", "/tmp".as_ref())?;
//!     println!("{} ({} bytes)", artifact.file_name, artifact.size_bytes()?);
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod columns;
pub mod error;

use std::path::Path;

use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};
use serde_json::{Map, Value};

pub use artifact::Artifact;
pub use columns::{Cell, Column, SheetLayout, CLAIMS_SHEET, PRODUCTION_SHEET, TICKETS_SHEET};
pub use error::WorkbookError;

/// MIME type of the rendered file.
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const HEADER_BACKGROUND: u32 = 0x4A04A5;

/// Anything that exposes its fields as a JSON object can fill a row.
pub trait SheetRow {
    fn fields(&self) -> &Map<String, Value>;
}

impl SheetRow for Map<String, Value> {
    fn fields(&self) -> &Map<String, Value> {
        self
    }
}

/// File name for a report label: `/` and whitespace become `_`.
pub fn artifact_file_name(label: &str) -> String {
    let sanitized: String = label
        .chars()
        .map(|c| if c == '/' || c.is_whitespace() { '_' } else { c })
        .collect();
    format!("relatorio_completo_{sanitized}.xlsx")
}

/// Writes the three report sheets into `output_dir` and returns the artifact.
pub fn render_workbook<R>(
    production: &[R],
    claims: &[R],
    tickets: &[R],
    label: &str,
    output_dir: &Path,
) -> Result<Artifact, WorkbookError>
where
    R: SheetRow,
{
    std::fs::create_dir_all(output_dir).map_err(|source| WorkbookError::io(output_dir, source))?;

    let header = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_BACKGROUND));

    let mut workbook = Workbook::new();
    for (layout, records) in [
        (PRODUCTION_SHEET, production),
        (CLAIMS_SHEET, claims),
        (TICKETS_SHEET, tickets),
    ] {
        let worksheet = workbook.add_worksheet();
        write_sheet(worksheet, &layout, records, &header)?;
    }

    let path = output_dir.join(artifact_file_name(label));
    workbook.save(&path)?;
    Ok(Artifact::new(path))
}

fn write_sheet<R>(
    worksheet: &mut Worksheet,
    layout: &SheetLayout,
    records: &[R],
    header: &Format,
) -> Result<(), WorkbookError>
where
    R: SheetRow,
{
    worksheet.set_name(layout.name)?;

    for (index, column) in layout.columns.iter().enumerate() {
        let col = u16::try_from(index)
            .map_err(|_| WorkbookError::InvalidLayout(format!("too many columns in {}", layout.name)))?;
        worksheet.set_column_width(col, column.width)?;
        worksheet.write_string_with_format(0, col, column.header, header)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (offset, record) in records.iter().enumerate() {
        let row = u32::try_from(offset + 1)
            .map_err(|_| WorkbookError::InvalidLayout(format!("too many rows in {}", layout.name)))?;
        for (index, column) in layout.columns.iter().enumerate() {
            let col = u16::try_from(index).map_err(|_| {
                WorkbookError::InvalidLayout(format!("too many columns in {}", layout.name))
            })?;
            match Cell::project(record.fields(), column.path) {
                Cell::Empty => {}
                Cell::Text(text) => {
                    worksheet.write_string(row, col, text)?;
                }
                Cell::Number(number) => {
                    worksheet.write_number(row, col, number)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn records(values: Vec<Value>) -> Vec<Map<String, Value>> {
        values
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn file_name_replaces_slashes_and_whitespace() {
        assert_eq!(
            artifact_file_name("2024-05-06 até 2024-05-10"),
            "relatorio_completo_2024-05-06_até_2024-05-10.xlsx"
        );
        assert_eq!(artifact_file_name("01/05/2024"), "relatorio_completo_01_05_2024.xlsx");
        assert_eq!(
            artifact_file_name("abril de 2024"),
            "relatorio_completo_abril_de_2024.xlsx"
        );
    }

    #[test]
    fn renders_all_sheets_into_the_output_directory() {
        let temp = tempdir().expect("tempdir");
        let output = temp.path().join("reports");

        let production = records(vec![json!({
            "propostaId": 10,
            "dataVigenciaInicial": "2024-05-01",
            "corretores": [{"nome": "Ana"}],
            "segurado": {"nome": "Bruno", "sexoLabel": "M"},
            "premioTotal": 1520.75
        })]);
        let claims = records(vec![json!({
            "sinistroId": 7,
            "dataAviso": "2024-05-01",
            "proposta": {"segurado": {"cpf_cnpj": "000.000.000-00"}}
        })]);
        let tickets = records(vec![json!({
            "id": 99,
            "titulo": "Solicitação: Assistência Urgente",
            "solicitante": {"nome": "Carla"}
        })]);

        let artifact = render_workbook(&production, &claims, &tickets, "2024-05-01", &output)
            .expect("render");

        assert_eq!(artifact.file_name, "relatorio_completo_2024-05-01.xlsx");
        assert_eq!(artifact.path, output.join("relatorio_completo_2024-05-01.xlsx"));
        assert!(artifact.exists());
        assert!(artifact.size_bytes().expect("size") > 0);

        let bytes = artifact.read_bytes().expect("bytes");
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn empty_inputs_still_produce_a_workbook() {
        let temp = tempdir().expect("tempdir");
        let none: Vec<Map<String, Value>> = Vec::new();

        let artifact = render_workbook(&none, &none, &none, "abril de 2024", temp.path())
            .expect("render");

        assert!(artifact.exists());
        artifact.remove().expect("remove");
        assert!(!artifact.exists());
        assert!(artifact.remove().is_err());
    }
}
