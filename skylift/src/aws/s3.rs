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

//! This module contains all wrapped functions of the AWS S3 service.

use crate::error::{Result, SkyliftError};
use rusoto_core::ByteStream;
use rusoto_s3::{DeleteObjectRequest, PutObjectRequest, S3Client, S3};

/// Puts an object to AWS S3. If the object exists, it is overwritten.
///
/// # Arguments
/// * `bucket` - The name of the bucket to put the object in.
/// * `key` - The key of the object to put.
/// * `body` - The body of the object to put.
/// * `content_type` - The content type of the object to put.
pub async fn put_object(
    client: &S3Client,
    bucket: &str,
    key: &str,
    body: Vec<u8>,
    content_type: &str,
) -> Result<()> {
    client
        .put_object(PutObjectRequest {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            body: Some(ByteStream::from(body)),
            content_type: Some(content_type.to_owned()),
            ..Default::default()
        })
        .await
        .map_err(|e| SkyliftError::AWS(e.to_string()))
        .map(|_| ())
}

/// Deletes an object from AWS S3.
///
/// # Arguments
/// * `bucket` - The name of the bucket to delete the object from.
/// * `key` - The key of the object to delete.
pub async fn delete_object(client: &S3Client, bucket: &str, key: &str) -> Result<()> {
    client
        .delete_object(DeleteObjectRequest {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            ..Default::default()
        })
        .await
        .map_err(|e| SkyliftError::AWS(e.to_string()))
        .map(|_| ())
}
