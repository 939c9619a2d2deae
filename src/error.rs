//! Binary Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("could not open the document cache")]
    Cache,
    #[display("could not set up the remote")]
    Remote,
    #[display("could not read {}", _0.display())]
    Read(#[error(not(source))] PathBuf),
    #[display("{} does not contain valid JSON content", _0.display())]
    InvalidContent(#[error(not(source))] PathBuf),
    /// The cached and remote copies differ and no `--keep` was given
    #[display("cached and remote copies of {_0} differ; rerun with --keep local or --keep cloud")]
    Conflict(#[error(not(source))] String),
    #[display("sync error")]
    Sync,
}
