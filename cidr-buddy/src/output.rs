use std::fmt::Display;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use log::{debug, info};

#[derive(Args, Clone, Debug, Default)]
#[group(id = "sink")]
pub struct Params {
    /// Write results to this file (created or truncated) instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Line-oriented sink for results, backed by stdout or a file. Writes are buffered, so
/// [OutputWriter::finish] must be called before the output is complete.
pub struct OutputWriter {
    target: String,
    writer: Box<dyn Write + Send>,
    count: u64,
}

impl OutputWriter {
    pub fn open(params: &Params) -> Result<Self> {
        match &params.output {
            Some(path) => Self::to_file(path),
            None => Ok(Self::to_stdout()),
        }
    }

    pub fn to_stdout() -> Self {
        OutputWriter {
            target: "stdout".to_string(),
            writer: Box::new(BufWriter::new(io::stdout())),
            count: 0,
        }
    }

    pub fn to_file(path: &Path) -> Result<Self> {
        if let Some(parent_dir) = path.parent().filter(|it| !it.as_os_str().is_empty()) {
            fs::create_dir_all(parent_dir)
                .with_context(|| format!("while creating output parent directory ({:?})", path))?;
        }
        let file = File::create(path) // <- truncates the file
            .with_context(|| format!("while creating output file {:?}", path))?;
        Ok(OutputWriter {
            target: format!("{:?}", path),
            writer: Box::new(BufWriter::new(file)),
            count: 0,
        })
    }

    /// Writes a single item as its own line.
    pub fn push(&mut self, item: impl Display) -> Result<()> {
        writeln!(self.writer, "{}", item)
            .with_context(|| format!("while writing a result to {}", self.target))?;
        self.count += 1;
        Ok(())
    }

    pub fn push_all<T: Display>(&mut self, items: impl IntoIterator<Item = T>) -> Result<()> {
        for item in items {
            self.push(item)?;
        }
        Ok(())
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Flushes any buffered output.
    pub fn finish(mut self) -> Result<u64> {
        self.writer
            .flush()
            .with_context(|| format!("while flushing output to {}", self.target))?;
        debug!("Flushed output to {}", self.target);
        if self.target != "stdout" {
            info!("Wrote {} lines to {}", self.count, self.target);
        }
        Ok(self.count)
    }
}

#[cfg(test)]
mod tests {
    use assertor::*;

    use super::*;

    #[test]
    fn writes_lines_to_file() -> anyhow::Result<()> {
        // given
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("targets.txt");
        let mut writer = OutputWriter::open(&Params {
            output: Some(path.clone()),
        })?;

        // when
        writer.push("10.0.0.1")?;
        writer.push_all(["10.0.0.2", "10.0.0.3"])?;
        let count = writer.finish()?;

        // then
        assert_that!(count).is_equal_to(3);
        assert_that!(fs::read_to_string(&path)?).is_equal_to("10.0.0.1\n10.0.0.2\n10.0.0.3\n".to_string());
        Ok(())
    }

    #[test]
    fn truncates_existing_file() -> anyhow::Result<()> {
        // given
        let file = tempfile::NamedTempFile::new()?;
        fs::write(file.path(), "old content that is longer\n")?;

        // when
        let mut writer = OutputWriter::to_file(file.path())?;
        writer.push(42)?;
        writer.finish()?;

        // then
        assert_that!(fs::read_to_string(file.path())?).is_equal_to("42\n".to_string());
        Ok(())
    }
}
