use tracing::info;

use crate::engine::TransferEngine;
use crate::error::{Error, Result};
use crate::operations::configure;
use crate::session::FtpsSession;
use crate::types::TransferOption;
use crate::utils::split_listing;

/// Lists the session's remote directory
///
/// With `names_only` the server is asked for bare file names (`NLST`),
/// otherwise for its full listing lines (`LIST`).
///
/// # Errors
///
/// Returns [`Error::Transfer`] if the directory cannot be set as the target
/// or the listing fails.
pub async fn get_list<E: TransferEngine>(
    session: &mut FtpsSession<E>,
    names_only: bool,
) -> Result<Vec<String>> {
    let directory = session.url.clone();
    let engine = session.transport.acquire()?;
    engine
        .set_option(TransferOption::Url(Some(directory.clone())))
        .map_err(|e| Error::transfer(&format!("Could not set directory: {directory}"), e))?;
    configure(
        engine,
        [
            TransferOption::Upload(false),
            TransferOption::ListOnly(names_only),
        ],
    )?;

    let body = engine
        .perform()
        .await
        .map_err(|e| Error::transfer("Listing files failed", e))?;

    let entries = split_listing(&String::from_utf8_lossy(&body));
    info!("Listed {} entries in {}", entries.len(), directory);
    Ok(entries)
}
