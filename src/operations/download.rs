use std::path::Path;
use std::time::Instant;
use tokio::fs;
use tracing::{info, warn};

use crate::engine::TransferEngine;
use crate::error::{EngineErrorCode, Error, Result};
use crate::operations::{check_file_name, configure};
use crate::session::FtpsSession;
use crate::types::TransferOption;

/// Downloads a remote file into `local_path` and returns its content
///
/// The local file is created (or truncated) before the transfer starts, so a
/// failed transfer leaves it empty or partial.
///
/// A failed transfer is not an error here: it is logged and reported as an
/// empty string, the same as a file with no content. Callers that need to
/// tell the two apart should check `remote_file_size` first.
///
/// # Errors
///
/// Returns an error if the local file cannot be created or the engine cannot
/// be configured.
pub async fn download<E: TransferEngine>(
    session: &mut FtpsSession<E>,
    local_path: &Path,
    remote_file_name: &str,
) -> Result<String> {
    check_file_name(remote_file_name)?;
    let download_time = Instant::now();
    if let Some(parent) = local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(|e| Error::Transfer {
            code: EngineErrorCode::WriteError as u32,
            message: format!("Failed to create parent directory: {e}"),
        })?;
    }
    fs::File::create(local_path).await.map_err(|e| Error::Transfer {
        code: EngineErrorCode::WriteError as u32,
        message: format!("Could not create local file {}: {e}", local_path.display()),
    })?;
    info!("Local file created: {:?}", local_path);

    let target = format!("{}{}", session.url, remote_file_name);
    let engine = session.transport.acquire()?;
    configure(
        engine,
        [
            TransferOption::Url(Some(target.clone())),
            TransferOption::Upload(false),
            TransferOption::WriteTo(Some(local_path.to_path_buf())),
        ],
    )?;

    match engine.perform().await {
        Ok(body) => {
            info!(
                "File {} downloaded. Time taken {:?}",
                target,
                download_time.elapsed()
            );
            Ok(String::from_utf8_lossy(&body).into_owned())
        }
        Err(e) => {
            warn!("Download of {} returned nothing: {}", target, e);
            Ok(String::new())
        }
    }
}
