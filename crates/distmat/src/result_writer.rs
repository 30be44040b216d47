use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{distance_result::DistanceResult, error::DistmatError};

pub const HEADER: [&str; 5] = [
    "origin_id",
    "destination_id",
    "distance_m",
    "duration_s",
    "status",
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    #[default]
    Overwrite,
    /// The header is only written when the file is new or empty
    Append,
}

pub struct ResultWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows: usize,
}

impl ResultWriter {
    pub fn create(path: &Path, mode: WriteMode) -> Result<Self, DistmatError> {
        let write_error = |source: csv::Error| DistmatError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| write_error(e.into()))?;
            }
        }

        let file = match mode {
            WriteMode::Overwrite => File::create(path),
            WriteMode::Append => OpenOptions::new().create(true).append(true).open(path),
        }
        .map_err(|e| write_error(e.into()))?;

        let is_empty = file.metadata().map_err(|e| write_error(e.into()))?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if is_empty {
            writer.write_record(HEADER).map_err(write_error)?;
        }

        debug!("Writing results to {:?} ({:?})", path, mode);

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            rows: 0,
        })
    }

    pub fn write(&mut self, result: &DistanceResult) -> Result<(), DistmatError> {
        self.writer
            .serialize(result)
            .map_err(|source| DistmatError::Write {
                path: self.path.clone(),
                source,
            })?;
        self.rows += 1;
        Ok(())
    }

    pub fn write_all<'r>(
        &mut self,
        results: impl IntoIterator<Item = &'r DistanceResult>,
    ) -> Result<(), DistmatError> {
        for result in results {
            self.write(result)?;
        }
        self.flush()
    }

    pub fn flush(&mut self) -> Result<(), DistmatError> {
        self.writer.flush().map_err(|source| DistmatError::Write {
            path: self.path.clone(),
            source: source.into(),
        })
    }

    /// Data rows written through this writer
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn write_results(
    path: &Path,
    results: &[DistanceResult],
    mode: WriteMode,
) -> Result<usize, DistmatError> {
    let mut writer = ResultWriter::create(path, mode)?;
    writer.write_all(results)?;
    Ok(writer.rows())
}
