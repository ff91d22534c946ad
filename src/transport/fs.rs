use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::errors::PipelineError;
use crate::table::Table;

const UTF8_BOM: &str = "\u{feff}";

/// Read a headed CSV file into a [`Table`].
///
/// A leading UTF-8 byte order mark is stripped from the first header name.
/// Short rows are padded with empty cells.
pub fn read_table(path: &Path) -> Result<Table, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::MissingInputFile {
            path: path.to_path_buf(),
        });
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(BufReader::new(File::open(path)?));
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            if idx == 0 {
                name.trim_start_matches(UTF8_BOM).to_string()
            } else {
                name.to_string()
            }
        })
        .collect();
    let mut table = Table::new(headers);
    for record in reader.records() {
        let record = record?;
        table.push_row(record.iter().map(str::to_string).collect());
    }
    debug!(
        "[uicrit:io] read {} rows x {} columns from {}",
        table.len(),
        table.headers().len(),
        path.display()
    );
    Ok(table)
}

/// Write `table` to `path` atomically.
///
/// Rows go to a temporary file in the destination directory which replaces
/// `path` only once fully flushed, so a failed write leaves no partial file.
/// Missing parent directories are created.
pub fn write_table(path: &Path, table: &Table, write_bom: bool) -> Result<(), PipelineError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let staged = NamedTempFile::new_in(dir)?;
    {
        let mut sink = BufWriter::new(staged.as_file());
        if write_bom {
            sink.write_all(UTF8_BOM.as_bytes())?;
        }
        let mut writer = csv::Writer::from_writer(&mut sink);
        writer.write_record(table.headers())?;
        for row in table.rows() {
            writer.write_record(row)?;
        }
        writer.flush()?;
        drop(writer);
        sink.flush()?;
    }
    staged.persist(path).map_err(|err| err.error)?;
    debug!(
        "[uicrit:io] wrote {} rows to {}",
        table.len(),
        path.display()
    );
    Ok(())
}

/// Write one text per line, atomically; used for the list of texts still awaiting annotation.
pub fn write_lines<I, S>(path: &Path, lines: I) -> Result<(), PipelineError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let staged = NamedTempFile::new_in(dir)?;
    {
        let mut sink = BufWriter::new(staged.as_file());
        for line in lines {
            writeln!(sink, "{}", line.as_ref())?;
        }
        sink.flush()?;
    }
    staged.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn written_table_reads_back_with_bom_stripped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/out.csv");
        let mut table = Table::new(["id", "task"]);
        table.push_row(vec!["1".into(), "Find a \"quoted\", comma".into()]);
        table.push_row(vec!["2".into()]);

        write_table(&path, &table, true).unwrap();
        let raw = fs::read(&path).unwrap();
        assert!(raw.starts_with(UTF8_BOM.as_bytes()));

        let loaded = read_table(&path).unwrap();
        assert_eq!(loaded.headers(), ["id", "task"]);
        assert_eq!(loaded.cell(0, 1), "Find a \"quoted\", comma");
        assert_eq!(loaded.cell(1, 1), "");
    }

    #[test]
    fn missing_input_is_reported() {
        let dir = tempdir().unwrap();
        let err = read_table(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::MissingInputFile { .. }));
    }

    #[test]
    fn no_temporary_files_are_left_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_table(&path, &Table::new(["id"]), false).unwrap();
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn lines_are_written_one_per_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pending.txt");
        write_lines(&path, ["first text", "second text"]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first text\nsecond text\n");
    }
}
