// Copyright (c) 2020-present, UMD Database Group.
//
// This program is free software: you can use, redistribute, and/or modify
// it under the terms of the GNU Affero General Public License, version 3
// or later ("AGPL"), as published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

//! Publishes the deployment archive to S3.

use crate::aws::s3;
use crate::context::WorkflowContext;
use crate::error::{Result, SkyliftError};
use log::{info, warn};
use rusoto_s3::S3Client;
use std::path::Path;

/// Uploads the archive under a key equal to its filename and records the
/// key in the context. The recorded key is what triggers removal of the
/// remote object should any later step fail; on upload failure nothing is
/// recorded because there is nothing to clean up yet.
///
/// The local archive file is removed after the upload attempt, successful
/// or not.
pub async fn upload_archive(
    client: &S3Client,
    ctx: &mut WorkflowContext,
    archive_path: &Path,
) -> Result<()> {
    info!("Uploading ZIP archive to S3");
    let key = archive_path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .ok_or_else(|| SkyliftError::Internal(format!("Bad archive path: {:?}", archive_path)))?;
    let body = tokio::fs::read(archive_path).await?;

    let result = s3::put_object(client, &ctx.s3_bucket, &key, body, "application/zip").await;
    if let Err(e) = tokio::fs::remove_file(archive_path).await {
        warn!(
            "Failed to remove local archive {}: {}",
            archive_path.display(),
            e
        );
    }
    result?;

    info!("ZIP archive uploaded: s3://{}/{}", ctx.s3_bucket, key);
    ctx.archive_key = Some(key);
    Ok(())
}
