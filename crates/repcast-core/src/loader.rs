//! Exercise sources.
//!
//! Spreadsheets, CSV files and comma-separated text lines all reduce to rows
//! of text cells through [`RowSource`]. [`load_exercises`] turns those rows
//! into records with one shared parser, so the three inputs behave the same.

use crate::error::{RepcastError, RepcastResult};
use crate::exercise::ExerciseRecord;
use calamine::{open_workbook_auto, Data, Reader};
use std::io::BufRead;
use std::path::PathBuf;
use tracing::{debug, info};

/// Anything that can produce rows of `name, duration[, reps]` cells
pub trait RowSource {
    /// Human-readable name for log messages
    fn describe(&self) -> String;

    /// Whether the first row is a header to skip
    fn has_header(&self) -> bool;

    /// Read every row, in order
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying input cannot be read
    fn rows(&mut self) -> RepcastResult<Vec<Vec<String>>>;
}

/// First worksheet of an `.xlsx` (or other spreadsheet) workbook
#[derive(Debug, Clone)]
pub struct XlsxSource {
    path: PathBuf,
}

impl XlsxSource {
    /// Read from the workbook at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RowSource for XlsxSource {
    fn describe(&self) -> String {
        format!("spreadsheet {}", self.path.display())
    }

    fn has_header(&self) -> bool {
        true
    }

    fn rows(&mut self) -> RepcastResult<Vec<Vec<String>>> {
        let mut workbook = open_workbook_auto(&self.path)
            .map_err(|e| RepcastError::file_read(&self.path, e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| RepcastError::file_read(&self.path, "workbook has no worksheets"))?
            .map_err(|e| RepcastError::file_read(&self.path, e.to_string()))?;

        Ok(range
            .rows()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }
}

/// Text of a spreadsheet cell; whole-number floats lose their `.0`
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 => format!("{}", *f as i64),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A CSV file with a header row
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    /// Read from the CSV file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RowSource for CsvSource {
    fn describe(&self) -> String {
        format!("CSV file {}", self.path.display())
    }

    fn has_header(&self) -> bool {
        true
    }

    fn rows(&mut self) -> RepcastResult<Vec<Vec<String>>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| RepcastError::file_read(&self.path, e.to_string()))?;

        reader
            .records()
            .map(|record| {
                record
                    .map(|r| r.iter().map(str::to_string).collect())
                    .map_err(|e| RepcastError::file_read(&self.path, e.to_string()))
            })
            .collect()
    }
}

/// Comma-separated lines with no header, such as standard input
#[derive(Debug)]
pub struct LineSource<R> {
    reader: R,
    label: String,
}

impl<R: BufRead> LineSource<R> {
    /// Read lines from `reader`; `label` names it in log messages
    pub fn new(reader: R, label: impl Into<String>) -> Self {
        Self {
            reader,
            label: label.into(),
        }
    }
}

impl<R: BufRead> RowSource for LineSource<R> {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn has_header(&self) -> bool {
        false
    }

    fn rows(&mut self) -> RepcastResult<Vec<Vec<String>>> {
        let mut rows = Vec::new();
        for line in (&mut self.reader).lines() {
            let line = line.map_err(|e| RepcastError::file_read(&self.label, e.to_string()))?;
            rows.push(line.split(',').map(str::to_string).collect());
        }
        Ok(rows)
    }
}

/// Parse one row. Blank rows yield `Ok(None)`.
///
/// # Errors
///
/// Returns [`RepcastError::MalformedRow`] if the name is missing or the
/// duration or reps are not positive whole numbers
pub fn parse_row(row: usize, cells: &[String]) -> RepcastResult<Option<ExerciseRecord>> {
    let cell = |i: usize| cells.get(i).map_or("", |c| c.trim());

    if cells.iter().all(|c| c.trim().is_empty()) {
        return Ok(None);
    }

    let name = cell(0);
    if name.is_empty() {
        return Err(RepcastError::malformed_row(row, "missing exercise name"));
    }

    let duration = match cell(1) {
        "" => return Err(RepcastError::malformed_row(row, "missing duration")),
        text => text.parse::<u32>().map_err(|_| {
            RepcastError::malformed_row(row, format!("duration '{text}' is not a whole number"))
        })?,
    };
    if duration == 0 {
        return Err(RepcastError::malformed_row(row, "duration must be at least 1 second"));
    }

    let reps = match cell(2) {
        "" => None,
        text => Some(text.parse::<u32>().map_err(|_| {
            RepcastError::malformed_row(row, format!("reps '{text}' is not a whole number"))
        })?),
    };

    ExerciseRecord::new(name, duration, reps)
        .map(Some)
        .map_err(|e| RepcastError::malformed_row(row, e.to_string()))
}

/// Load every exercise from `source`, in order.
///
/// Nothing is returned unless every row parses.
///
/// # Errors
///
/// Returns the read error or the first [`RepcastError::MalformedRow`]
pub fn load_exercises(source: &mut dyn RowSource) -> RepcastResult<Vec<ExerciseRecord>> {
    let rows = source.rows()?;
    let skip = usize::from(source.has_header());
    debug!("Read {} row(s) from {}", rows.len(), source.describe());

    let mut exercises = Vec::with_capacity(rows.len());
    for (i, cells) in rows.iter().enumerate().skip(skip) {
        if let Some(exercise) = parse_row(i + 1, cells)? {
            exercises.push(exercise);
        }
    }

    info!("Loaded {} exercise(s) from {}", exercises.len(), source.describe());
    Ok(exercises)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn cells(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_row_with_and_without_reps() {
        let with = parse_row(2, &cells(&["jumping jacks", "30", "30"])).unwrap().unwrap();
        assert_eq!(with.reps(), Some(30));

        let without = parse_row(3, &cells(&["burpees", "7"])).unwrap().unwrap();
        assert_eq!(without.reps(), None);

        let blank_reps = parse_row(4, &cells(&["burpees", " 7 ", "  "])).unwrap().unwrap();
        assert_eq!(blank_reps, without);
    }

    #[test]
    fn test_parse_row_blank() {
        assert!(parse_row(1, &cells(&["", " ", ""])).unwrap().is_none());
        assert!(parse_row(1, &[]).unwrap().is_none());
    }

    #[test]
    fn test_parse_row_malformed() {
        let err = parse_row(5, &cells(&["pushups", "abc", "20"])).unwrap_err();
        assert_eq!(
            err,
            RepcastError::malformed_row(5, "duration 'abc' is not a whole number")
        );

        assert!(matches!(
            parse_row(1, &cells(&["pushups", "20", "many"])),
            Err(RepcastError::MalformedRow { row: 1, .. })
        ));
        assert!(parse_row(1, &cells(&["pushups"])).is_err());
        assert!(parse_row(1, &cells(&["", "20"])).is_err());
        assert!(parse_row(1, &cells(&["pushups", "0"])).is_err());
        assert!(parse_row(1, &cells(&["pushups", "-5"])).is_err());
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Float(30.0)), "30");
        assert_eq!(cell_text(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::String("burpees".into())), "burpees");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn test_line_source_has_no_header() {
        let input = "jumping jacks,30,30\nburpees,7\n\n";
        let mut source = LineSource::new(Cursor::new(input), "stdin");
        let exercises = load_exercises(&mut source).unwrap();
        assert_eq!(exercises.len(), 2);
        assert_eq!(exercises[0].name(), "jumping jacks");
        assert_eq!(exercises[1].instruction_text(), "burpees for 7 seconds");
    }

    #[test]
    fn test_line_source_reports_row_number() {
        let mut source = LineSource::new(Cursor::new("squats,10\npushups,abc,20\n"), "stdin");
        let err = load_exercises(&mut source).unwrap_err();
        assert!(matches!(err, RepcastError::MalformedRow { row: 2, .. }));
    }

    #[test]
    fn test_csv_source_skips_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workout.csv");
        std::fs::write(&path, "name,duration,reps\njumping jacks,30,30\nburpees,7,\n").unwrap();

        let mut source = CsvSource::new(&path);
        let exercises = load_exercises(&mut source).unwrap();
        assert_eq!(exercises.len(), 2);
        assert_eq!(exercises[1].reps(), None);
    }

    #[test]
    fn test_missing_workbook() {
        let mut source = XlsxSource::new("/no/such/workout.xlsx");
        assert!(matches!(
            load_exercises(&mut source),
            Err(RepcastError::FileRead { .. })
        ));
    }
}
