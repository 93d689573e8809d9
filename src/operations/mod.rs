use crate::engine::TransferEngine;
use crate::error::{EngineErrorCode, Error, Result};
use crate::types::TransferOption;

/// Module for removing remote files
pub(crate) mod delete;

/// Module for downloading files from remote server
pub(crate) mod download;

/// Module for listing remote directory contents
pub(crate) mod list;

/// Module for querying remote file sizes
pub(crate) mod size;

/// Module for uploading files to remote server
pub(crate) mod upload;

/// Applies operation options on top of the baseline
pub(crate) fn configure<E: TransferEngine>(
    engine: &mut E,
    options: impl IntoIterator<Item = TransferOption>,
) -> Result<()> {
    for option in options {
        let name = option.name();
        engine
            .set_option(option)
            .map_err(|e| Error::configuration(name, e))?;
    }
    Ok(())
}

/// Remote names end up on FTP command lines; a line break would start a new
/// command.
pub(crate) fn check_file_name(file_name: &str) -> Result<()> {
    if file_name.contains(['\r', '\n']) {
        return Err(Error::Transfer {
            code: EngineErrorCode::UrlMalformat as u32,
            message: format!("File name contains a line break: {file_name:?}"),
        });
    }
    Ok(())
}
