//! JSON record file

use crate::output::traits::OutputResult;
use crate::state::PageRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes every page record, failed ones included, as a pretty-printed array
pub fn write_json(pages: &[PageRecord], output_path: &Path) -> OutputResult<()> {
    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, pages)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
