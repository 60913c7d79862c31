//! CSV export of the dashboard's filtered view, column for column what the admin downloads.

use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

use crate::workflows::intake::domain::ApplicationRecord;

pub const EXPORT_HEADERS: [&str; 11] = [
    "Nome",
    "Email",
    "WhatsApp",
    "Cidade",
    "Instituição",
    "Curso",
    "Período",
    "Turno",
    "Áreas de Interesse",
    "Status",
    "Data de Cadastro",
];

/// Brasília time; registration dates are shown as the admin's calendar day.
const DISPLAY_OFFSET_SECONDS: i32 = 3 * 3600;

#[derive(Debug)]
pub enum ExportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io(err) => write!(f, "failed to access export data: {}", err),
            ExportError::Csv(err) => write!(f, "failed to write CSV: {}", err),
            ExportError::Json(err) => write!(f, "invalid application records: {}", err),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io(err) => Some(err),
            ExportError::Csv(err) => Some(err),
            ExportError::Json(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

/// `candidaturas_YYYY-MM-DD.csv`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("candidaturas_{}.csv", date.format("%Y-%m-%d"))
}

pub fn registration_date(created_at: DateTime<Utc>) -> String {
    let offset = FixedOffset::west_opt(DISPLAY_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix());
    created_at
        .with_timezone(&offset)
        .format("%d/%m/%Y")
        .to_string()
}

/// Write the header row and one quoted row per record. No records, header only.
pub fn write_csv<'a, W, I>(records: I, writer: W) -> Result<(), ExportError>
where
    W: Write,
    I: IntoIterator<Item = &'a ApplicationRecord>,
{
    let mut csv_writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(writer);
    csv_writer.write_record(EXPORT_HEADERS)?;

    for record in records {
        let p = &record.payload;
        let areas = p.interest_areas.join("; ");
        let registered = registration_date(record.created_at);
        csv_writer.write_record([
            p.full_name.as_str(),
            p.email.as_str(),
            p.whatsapp.as_str(),
            p.city.as_str(),
            p.institution.as_str(),
            p.course.as_str(),
            p.current_period.as_str(),
            p.study_shift.as_str(),
            areas.as_str(),
            record.status.label(),
            registered.as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_string<'a, I>(records: I) -> Result<String, ExportError>
where
    I: IntoIterator<Item = &'a ApplicationRecord>,
{
    let mut buffer = Vec::new();
    write_csv(records, &mut buffer)?;
    String::from_utf8(buffer).map_err(|err| {
        ExportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    })
}

/// Read a JSON array of stored applications, as dumped from the `applications` table.
pub fn load_records<R: Read>(reader: R) -> Result<Vec<ApplicationRecord>, ExportError> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn load_records_from_path<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<ApplicationRecord>, ExportError> {
    let file = std::fs::File::open(path)?;
    load_records(std::io::BufReader::new(file))
}
