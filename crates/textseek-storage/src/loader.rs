use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};
use textseek_core::Document;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Read one JSON document per line; blank lines are skipped.
pub fn read_documents(reader: impl Read) -> Result<Vec<Document>, LoadError> {
    let br = BufReader::new(reader);
    let mut out = Vec::new();
    for (idx, line) in br.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc = serde_json::from_str(&line).map_err(|source| LoadError::Parse {
            line: idx + 1,
            source,
        })?;
        out.push(doc);
    }
    Ok(out)
}

pub fn load_documents(path: impl AsRef<Path>) -> Result<Vec<Document>, LoadError> {
    let fh = File::open(path)?;
    read_documents(fh)
}
