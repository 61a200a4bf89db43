#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use sheet_insights::data::{Row, text_row};
use tempfile::{TempDir, tempdir};

pub const SALES_CONFIG: &str = "\
field,label,type,order
sales,Sales,number,1
d,Date,date,2
region,Region,text,3
cycle,Cycle,period,4
";

pub const SALES_DATA: &str = "\
Sales,Date,Region,Cycle
100,2024-01-01,North,Q1
50,01/02/2024,South,Q1
0,2024-01-02,North,Q1
70,2024-04-01,South,Q2
abc,13/04/2024,East,Q2
,,,
";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// Builds a text row matrix from string slices.
pub fn matrix(rows: &[&[&str]]) -> Vec<Row> {
    rows.iter().map(|row| text_row(row.iter())).collect()
}
