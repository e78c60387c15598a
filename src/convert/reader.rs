//! Spreadsheet reading through calamine.

use std::path::Path;

use calamine::{open_workbook_auto, Data, ExcelDateTime, Range, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};

use super::error::ConvertError;

/// Rendered cell text, row-major.
pub type Rows = Vec<Vec<String>>;

/// Read the first sheet of a workbook as text rows.
///
/// The grid is anchored at A1, so empty leading rows and columns are kept.
///
/// # Errors
///
/// Returns an error if the file is missing, cannot be opened, or is not a
/// readable workbook.
pub fn read_first_sheet(path: &Path) -> Result<Rows, ConvertError> {
    check_readable(path)?;

    let mut workbook = open_workbook_auto(path).map_err(|e| match e {
        calamine::Error::Io(io) => ConvertError::InputUnreadable {
            path: path.to_path_buf(),
            reason: io.to_string(),
        },
        other => ConvertError::Parse {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    })?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ConvertError::EmptyWorkbook(path.to_path_buf()))?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| ConvertError::Parse {
            path: path.to_path_buf(),
            reason: format!("sheet '{sheet}': {e}"),
        })?;

    tracing::debug!(path = %path.display(), sheet = %sheet, size = ?range.get_size(), "Read sheet");
    Ok(range_to_rows(&range))
}

fn check_readable(path: &Path) -> Result<(), ConvertError> {
    match std::fs::File::open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ConvertError::InputNotFound(path.to_path_buf()))
        }
        Err(e) => Err(ConvertError::InputUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

fn range_to_rows(range: &Range<Data>) -> Rows {
    let Some((end_row, end_col)) = range.end() else {
        return Vec::new();
    };
    (0..=end_row)
        .map(|row| {
            (0..=end_col)
                .map(|col| range.get_value((row, col)).map(render_cell).unwrap_or_default())
                .collect()
        })
        .collect()
}

/// Render a cell the way the spreadsheet shows its value.
#[must_use]
pub fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => String::from(if *b { "TRUE" } else { "FALSE" }),
        Data::DateTime(dt) => render_datetime(*dt),
        Data::Error(e) => e.to_string(),
    }
}

/// Render a date cell through calamine's conversion, which honours the
/// workbook's 1900 or 1904 date system.
///
/// Durations render as elapsed `H:MM:SS`, time-of-day values (serial below
/// one) as `HH:MM:SS`, and midnight values as a bare date. The raw serial is
/// the fallback when conversion overflows.
fn render_datetime(dt: ExcelDateTime) -> String {
    if dt.is_duration() {
        return dt
            .as_duration()
            .map_or_else(|| dt.as_f64().to_string(), format_duration);
    }

    let Some(datetime) = dt.as_datetime().map(round_to_second) else {
        return dt.as_f64().to_string();
    };
    if datetime.date() < first_calendar_day() {
        datetime.format("%H:%M:%S").to_string()
    } else if datetime.time() == NaiveTime::MIN {
        datetime.format("%Y-%m-%d").to_string()
    } else {
        datetime.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// 1900-01-01, serial 1 in the 1900 system. Anything earlier carries no date.
fn first_calendar_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn round_to_second(datetime: NaiveDateTime) -> NaiveDateTime {
    let rounded = if datetime.nanosecond() >= 500_000_000 {
        TimeDelta::try_seconds(1)
            .and_then(|second| datetime.checked_add_signed(second))
            .unwrap_or(datetime)
    } else {
        datetime
    };
    rounded.with_nanosecond(0).unwrap_or(rounded)
}

/// Total hours, then minutes and seconds: 36 hours renders as `36:00:00`.
fn format_duration(duration: TimeDelta) -> String {
    let millis = duration.num_milliseconds();
    let sign = if millis < 0 { "-" } else { "" };
    let total = (millis.unsigned_abs() + 500) / 1000;
    format!(
        "{sign}{}:{:02}:{:02}",
        total / 3600,
        (total / 60) % 60,
        total % 60
    )
}
