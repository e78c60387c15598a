//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::Path;

/// Write a single-sheet workbook; `rows[r][c]` lands at row r+1, column c+1.
pub fn write_xlsx(path: &Path, rows: &[&[&str]]) {
    write_xlsx_sheets(path, &[("Sheet1", rows)]);
}

/// Write a workbook with several sheets, in order.
pub fn write_xlsx_sheets(path: &Path, sheets: &[(&str, &[&[&str]])]) {
    let mut book = umya_spreadsheet::new_file();
    for (index, (name, rows)) in sheets.iter().enumerate() {
        if index > 0 {
            book.new_sheet(*name).unwrap();
        }
        let sheet_name = if index == 0 { "Sheet1" } else { *name };
        let sheet = book.get_sheet_by_name_mut(sheet_name).unwrap();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let coord = (u32::try_from(c + 1).unwrap(), u32::try_from(r + 1).unwrap());
                sheet.get_cell_mut(coord).set_value(*value);
            }
        }
    }
    umya_spreadsheet::writer::xlsx::write(&book, path).unwrap();
}

/// Lines of a text file, or an empty list if it does not exist.
pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|s| s.lines().map(String::from).collect())
        .unwrap_or_default()
}
