use std::path::Path;
use std::time::Instant;
use tokio::fs;
use tracing::{error, info};

use crate::engine::TransferEngine;
use crate::error::{EngineErrorCode, Error, Result};
use crate::operations::{check_file_name, configure};
use crate::session::FtpsSession;
use crate::types::TransferOption;

/// Uploads a local file into the session's remote directory
///
/// # Arguments
///
/// * `session` - The session to upload through
/// * `file_name` - Name of the remote file to create
/// * `local_path` - Path to the local file to upload
///
/// # Errors
///
/// Returns [`Error::Transfer`] if:
/// - The local file cannot be opened
/// - The engine fails to store the file
pub async fn upload<E: TransferEngine>(
    session: &mut FtpsSession<E>,
    file_name: &str,
    local_path: &Path,
) -> Result<()> {
    check_file_name(file_name)?;
    let upload_time = Instant::now();
    let local_file = fs::File::open(local_path).await.map_err(|e| {
        error!("Could not open local file {:?}: {:?}", local_path, e);
        Error::Transfer {
            code: EngineErrorCode::ReadError as u32,
            message: format!("Could not open local file {}: {e}", local_path.display()),
        }
    })?;
    let local_file_size = local_file
        .metadata()
        .await
        .map_err(|e| Error::Transfer {
            code: EngineErrorCode::ReadError as u32,
            message: format!("Could not stat local file {}: {e}", local_path.display()),
        })?
        .len();
    drop(local_file);

    let target = format!("{}{}", session.url, file_name);
    let engine = session.transport.acquire()?;
    configure(
        engine,
        [
            TransferOption::Url(Some(target.clone())),
            TransferOption::ReadFrom(Some(local_path.to_path_buf())),
            TransferOption::InFileSize(local_file_size),
        ],
    )?;

    engine
        .perform()
        .await
        .map_err(|e| Error::transfer("Could not upload file", e))?;

    info!(
        "File {:?} uploaded to {}. Time taken {:?}",
        local_path,
        target,
        upload_time.elapsed()
    );
    Ok(())
}
