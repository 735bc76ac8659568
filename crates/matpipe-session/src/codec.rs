//! Boundary to the binary array-container format.
//!
//! The session never looks inside the payload: it hands a [`Workspace`] to
//! the codec on the way in and hands raw save output to it on the way out.

use std::fmt;
use std::str::FromStr;

use crate::value::Workspace;

/// How one-dimensional arrays are laid out when encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Orientation {
    /// As 1×N row vectors.
    #[default]
    Row,
    /// As N×1 column vectors.
    Column,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Row => f.write_str("row"),
            Orientation::Column => f.write_str("column"),
        }
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "row" => Ok(Orientation::Row),
            "column" => Ok(Orientation::Column),
            other => Err(format!("unknown orientation '{other}' (expected row or column)")),
        }
    }
}

/// Encodes and decodes named arrays in the engine's data-file format.
///
/// `decode` receives exactly the bytes the engine wrote between the binary
/// start token and its trailing prompt.
pub trait ArrayCodec {
    type Error: std::error::Error + Send + Sync + 'static;

    fn encode(&self, vars: &Workspace, orientation: Orientation) -> Result<Vec<u8>, Self::Error>;

    fn decode(&self, bytes: &[u8]) -> Result<Workspace, Self::Error>;
}

/// Codec for sessions that only evaluate commands.
///
/// Every encode and decode fails with [`CodecUnavailable`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TextOnly;

#[derive(Debug, thiserror::Error)]
#[error("no array codec configured for this session")]
pub struct CodecUnavailable;

impl ArrayCodec for TextOnly {
    type Error = CodecUnavailable;

    fn encode(&self, _vars: &Workspace, _orientation: Orientation) -> Result<Vec<u8>, Self::Error> {
        Err(CodecUnavailable)
    }

    fn decode(&self, _bytes: &[u8]) -> Result<Workspace, Self::Error> {
        Err(CodecUnavailable)
    }
}
