//! File-format codecs and extension dispatch.

pub mod cmpx;
pub mod native;

use std::fs;
use std::path::Path;

use crate::model::error::{BnError, Result};
use crate::model::network::Network;

/// Options controlling interchange (cmpx) decoding.
#[derive(Debug, Clone)]
pub struct CmpxReadOptions {
    /// Index of the network to extract from the document.
    pub network_index: usize,
    /// Drop nodes with no parents and no children before construction.
    pub remove_disconnected_variables: bool,
    /// Renormalize tables whose columns do not sum to 1.
    pub force_summation: bool,
}

impl Default for CmpxReadOptions {
    fn default() -> Self {
        CmpxReadOptions {
            network_index: 0,
            remove_disconnected_variables: true,
            force_summation: false,
        }
    }
}

impl Network {
    /// Reads a network from an interchange (cmpx) document.
    pub fn from_cmpx<P: AsRef<Path>>(path: P, options: &CmpxReadOptions) -> Result<Network> {
        let text = fs::read_to_string(path)?;
        cmpx::decode_str(&text, options)
    }

    /// Reads a network from the native JSON format.
    pub fn from_json<P: AsRef<Path>>(path: P, force_summation: bool) -> Result<Network> {
        let text = fs::read_to_string(path)?;
        native::decode_str(&text, force_summation)
    }

    /// Writes the network as an interchange (cmpx) document.
    pub fn to_cmpx<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, cmpx::encode_string(self)?)?;
        Ok(())
    }

    /// Writes the network in the native JSON format.
    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, native::encode_string(self)?)?;
        Ok(())
    }

    /// Reads a network, dispatching on the file extension with default
    /// options.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Network> {
        let path = path.as_ref();
        match extension(path)? {
            "cmpx" => Network::from_cmpx(path, &CmpxReadOptions::default()),
            "json" => Network::from_json(path, false),
            other => Err(unrecognized(other)),
        }
    }

    /// Writes the network, dispatching on the file extension.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        match extension(path)? {
            "cmpx" => self.to_cmpx(path),
            "json" => self.to_json(path),
            other => Err(unrecognized(other)),
        }
    }
}

fn extension(path: &Path) -> Result<&str> {
    path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
        BnError::Format(format!(
            "'{}' has no file extension: expected .cmpx or .json",
            path.display()
        ))
    })
}

fn unrecognized(extension: &str) -> BnError {
    BnError::Format(format!(
        "unrecognized file extension '.{extension}': expected .cmpx or .json"
    ))
}
