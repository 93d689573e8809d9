use tracing::{info, warn};

use crate::engine::TransferEngine;
use crate::error::{Error, Result};
use crate::operations::{check_file_name, configure};
use crate::session::FtpsSession;
use crate::types::{DeleteOutcome, TransferOption};
use crate::utils::split_listing;

/// Deletes a remote file and checks it is gone
///
/// `DELE` runs as a pre-transfer command and the transfer itself is a name
/// listing of the session directory, so one round trip both deletes and
/// confirms.
///
/// # Errors
///
/// Returns [`Error::Transfer`] if `file_name` holds a line break, or if `DELE`
/// is refused or the listing fails.
pub async fn delete<E: TransferEngine>(
    session: &mut FtpsSession<E>,
    file_name: &str,
) -> Result<DeleteOutcome> {
    check_file_name(file_name)?;
    let target = format!("{}{}", session.url, file_name);
    let directory = session.url.clone();
    let engine = session.transport.acquire()?;
    configure(
        engine,
        [
            TransferOption::Url(Some(directory)),
            TransferOption::Upload(false),
            TransferOption::Header(false),
            TransferOption::ListOnly(true),
            TransferOption::Quote(vec![format!("DELE {file_name}")]),
        ],
    )?;

    let body = engine
        .perform()
        .await
        .map_err(|e| Error::transfer("Error deleting", e))?;

    let remaining = split_listing(&String::from_utf8_lossy(&body));
    if remaining.iter().any(|name| name == file_name) {
        warn!("{} is still listed after DELE", target);
        Ok(DeleteOutcome::NotConfirmed)
    } else {
        info!("Deleted {}", target);
        Ok(DeleteOutcome::Deleted(target))
    }
}
