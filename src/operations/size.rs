use tracing::{debug, warn};

use crate::engine::TransferEngine;
use crate::error::Result;
use crate::operations::{check_file_name, configure};
use crate::session::FtpsSession;
use crate::types::TransferOption;

/// Size of a remote file in bytes, `-1` when the engine could not tell.
///
/// Transfer failures only log; they show up as an unknown size.
pub async fn remote_file_size<E: TransferEngine>(
    session: &mut FtpsSession<E>,
    file_name: &str,
) -> Result<i64> {
    check_file_name(file_name)?;
    let target = format!("{}{}", session.url, file_name);
    let engine = session.transport.acquire()?;
    configure(
        engine,
        [
            TransferOption::Url(Some(target.clone())),
            TransferOption::Upload(false),
            TransferOption::Header(true),
            TransferOption::NoBody(true),
        ],
    )?;

    if let Err(e) = engine.perform().await {
        warn!("Size query for {} failed: {}", target, e);
    }

    let size = engine
        .content_length()
        .and_then(|len| i64::try_from(len).ok())
        .unwrap_or(-1);
    debug!("Remote size of {}: {}", target, size);
    Ok(size)
}
