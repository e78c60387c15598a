//! All-or-nothing CSV output.

use std::fs::Permissions;
use std::path::Path;

use tempfile::NamedTempFile;

use super::error::ConvertError;

/// Write `rows` as CSV to `output`, replacing it atomically.
///
/// Rows go to a hidden temporary file in the output's directory which is
/// renamed over `output` only once fully written. On error the previous
/// output is left untouched and the temporary file is removed.
///
/// # Errors
///
/// Returns [`ConvertError::OutputWrite`] if the directory is not writable or
/// any write, sync or rename fails.
pub fn write_csv_atomic(rows: &[Vec<String>], output: &Path) -> Result<(), ConvertError> {
    let fail = |source: std::io::Error| ConvertError::OutputWrite {
        path: output.to_path_buf(),
        source,
    };

    let parent = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let tmp = tempfile::Builder::new()
        .prefix(".sheetwatch-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(fail)?;

    if let Some(perms) = output_permissions(output) {
        tmp.as_file().set_permissions(perms).map_err(fail)?;
    }

    write_rows(&tmp, rows).map_err(fail)?;
    tmp.as_file().sync_all().map_err(fail)?;
    tmp.persist(output).map_err(|e| fail(e.error))?;

    tracing::debug!(path = %output.display(), rows = rows.len(), "Output replaced");
    Ok(())
}

fn write_rows(tmp: &NamedTempFile, rows: &[Vec<String>]) -> std::io::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(tmp.as_file());
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()
}

/// Keep the permissions of an existing output; temporary files are created
/// owner-only.
fn output_permissions(output: &Path) -> Option<Permissions> {
    if let Ok(meta) = std::fs::metadata(output) {
        return Some(meta.permissions());
    }
    default_permissions()
}

#[cfg(unix)]
fn default_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<Permissions> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| (*c).to_string()).collect()
    }

    #[test]
    fn test_writes_plain_rows() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("orders.csv");
        write_csv_atomic(&[row(&["id", "name"]), row(&["1", "Ayşe"])], &out).unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "id,name\n1,Ayşe\n");
    }

    #[test]
    fn test_escapes_delimiters_quotes_newlines() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("orders.csv");
        write_csv_atomic(&[row(&["a,b", "say \"hi\"", "two\nlines"])], &out).unwrap();

        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "\"a,b\",\"say \"\"hi\"\"\",\"two\nlines\"\n"
        );
    }

    #[test]
    fn test_replaces_existing_output_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("orders.csv");
        std::fs::write(&out, "old\n").unwrap();

        write_csv_atomic(&[row(&["new"])], &out).unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "new\n");
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("orders.csv")]);
    }

    #[test]
    fn test_missing_parent_is_output_error() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("missing").join("orders.csv");

        let err = write_csv_atomic(&[row(&["x"])], &out).unwrap_err();
        assert!(err.is_output_error());
        assert!(!out.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_new_output_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let out = dir.path().join("orders.csv");
        write_csv_atomic(&[row(&["x"])], &out).unwrap();

        let mode = std::fs::metadata(&out).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
