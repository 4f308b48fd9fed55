use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tracing::info;

use crate::conversions::timestamp::TIMESTAMP_FORMAT;
use crate::error::{ErrorKind, ExportResult};
use crate::export_error;
use crate::sink::{ArchiveName, Sink};

/// Field delimiter of every archived CSV.
pub const CSV_DELIMITER: u8 = b';';

/// Extension of compressed archives.
pub const ARCHIVE_EXTENSION: &str = "csv.gz";

/// Writes `<table>_<start>_to_<end><suffix>.csv` under `<output_dir>/<table>/`,
/// compresses it to `.csv.gz` and removes the intermediate `.csv`.
#[derive(Debug, Clone)]
pub struct CsvArchiveSink {
    output_dir: PathBuf,
}

impl CsvArchiveSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Directory holding every archive of `table`.
    pub fn table_dir(&self, table: &str) -> PathBuf {
        self.output_dir.join(table)
    }

    /// Final archive path for `name`.
    pub fn archive_path(&self, name: &ArchiveName) -> PathBuf {
        self.table_dir(&name.table)
            .join(format!("{}.{ARCHIVE_EXTENSION}", name.stem()))
    }
}

impl Sink for CsvArchiveSink {
    async fn write(&self, name: &ArchiveName, batch: RecordBatch) -> ExportResult<()> {
        let directory = self.table_dir(&name.table);
        let stem = name.stem();
        let rows = batch.num_rows();

        let archive =
            tokio::task::spawn_blocking(move || write_csv_archive(&directory, &stem, &[batch]))
                .await??;

        info!(archive = %archive.display(), rows, "wrote archive");

        Ok(())
    }
}

/// Writes `batches` as one semicolon CSV with a header, then gzips it.
///
/// Returns the archive path. Blocking.
pub fn write_csv_archive(
    directory: &Path,
    stem: &str,
    batches: &[RecordBatch],
) -> ExportResult<PathBuf> {
    fs::create_dir_all(directory)?;

    let csv_path = directory.join(format!("{stem}.csv"));
    let archive_path = directory.join(format!("{stem}.{ARCHIVE_EXTENSION}"));

    {
        let file = BufWriter::new(File::create(&csv_path)?);
        let mut writer = WriterBuilder::new()
            .with_delimiter(CSV_DELIMITER)
            .with_header(true)
            .with_timestamp_format(TIMESTAMP_FORMAT.to_string())
            .build(file);

        for batch in batches {
            writer.write(batch).map_err(|err| {
                export_error!(
                    ErrorKind::SinkError,
                    "Failed to write CSV",
                    format!("{}: {err}", csv_path.display()),
                    source: err
                )
            })?;
        }

        writer.into_inner().flush()?;
    }

    compress(&csv_path, &archive_path)?;
    fs::remove_file(&csv_path)?;

    Ok(archive_path)
}

fn compress(source: &Path, target: &Path) -> ExportResult<()> {
    let mut input = BufReader::new(File::open(source)?);
    let mut encoder = GzEncoder::new(BufWriter::new(File::create(target)?), Compression::default());

    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?.flush()?;

    Ok(())
}

/// Reads a gzipped semicolon CSV archive back with a fixed schema. Blocking.
pub fn read_csv_archive(path: &Path, schema: SchemaRef) -> ExportResult<Vec<RecordBatch>> {
    let decoder = BufReader::new(GzDecoder::new(File::open(path)?));
    let reader = ReaderBuilder::new(schema)
        .with_delimiter(CSV_DELIMITER)
        .with_header(true)
        .build(decoder)?;

    let batches = reader.collect::<Result<Vec<_>, _>>()?;

    Ok(batches)
}
