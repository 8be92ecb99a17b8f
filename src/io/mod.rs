use std::fs::{File, OpenOptions};
use std::path::Path;
use std::io::{Read, Write, BufReader, BufWriter};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Observation loading and tabular output of sequences, filter passes and chains.
pub mod csv;

pub use self::csv::*;

/// Serializable records of chains and filter passes.
pub mod record;

pub use record::*;

/// JSON run configuration for the sampler.
pub mod config;

pub use config::*;

#[derive(Debug, thiserror::Error)]
pub enum IoError {

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] ::csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Model(#[from] crate::error::Error),

    #[error("column '{0}' not found in header")]
    MissingColumn(String),

    #[error("could not parse '{value}' at line {line} as a number")]
    Parse { value : String, line : usize },

    #[error("no observations found")]
    Empty,

    #[error("invalid configuration: {0}")]
    Config(String)

}

pub type IoResult<T> = Result<T, IoError>;

pub fn load_json<T, R>(reader : R) -> IoResult<T>
where
    T : DeserializeOwned,
    R : Read
{
    Ok(serde_json::from_reader(BufReader::new(reader))?)
}

pub fn load_json_from_path<T, P>(path : P) -> IoResult<T>
where
    T : DeserializeOwned,
    P : AsRef<Path>
{
    load_json(File::open(path)?)
}

pub fn save_json<T, W>(value : &T, writer : W) -> IoResult<()>
where
    T : Serialize,
    W : Write
{
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

pub fn save_json_to_path<T, P>(value : &T, path : P) -> IoResult<()>
where
    T : Serialize,
    P : AsRef<Path>
{
    let file = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
    save_json(value, file)
}
