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

//! Synthesizes the CloudFormation template describing the desired end
//! state of the service and uploads it to S3 under a content-addressed key.

use crate::aws::s3;
use crate::config::DeployConfig;
use crate::context::{sanitized_name, WorkflowContext};
use crate::error::{Result, SkyliftError};
use log::{debug, info};
use rusoto_s3::S3Client;
use serde::Serialize;
use sha1::{Digest, Sha1};

use crate::resource::{ResourceContext, ResourceMap};

/// The complete infrastructure document for one service. Resources are
/// kept in a sorted map so serialization is deterministic and the
/// content-addressed S3 key is stable across identical runs.
#[derive(Debug, Serialize)]
pub struct CloudFormationTemplate {
    /// Fixed CloudFormation format version.
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    /// Human-readable service description.
    #[serde(rename = "Description")]
    pub description: String,
    /// Logical resource name to resource description.
    #[serde(rename = "Resources")]
    pub resources: ResourceMap,
}

/// Builds the template from the declared functions: the union of every
/// function's contributed resource descriptions, each wired to the
/// uploaded archive and its resolved execution role ARN.
///
/// Fails if any function's role is absent from the resolved identity map
/// or if two functions contribute the same logical resource name.
pub fn synthesize(ctx: &WorkflowContext, code_key: &str) -> Result<CloudFormationTemplate> {
    let mut resources = ResourceMap::new();
    for function in &ctx.functions {
        // The identity resolver guarantees this, but a template referencing
        // an unresolved role would fail remotely in a far less obvious way.
        let role_arn = ctx.role_arns.get(&function.execution_role).ok_or_else(|| {
            SkyliftError::Configuration(format!(
                "No resolved ARN for execution role {}",
                function.execution_role
            ))
        })?;
        let resource_cx = ResourceContext {
            bucket: &ctx.s3_bucket,
            code_key,
            role_arn,
        };
        function
            .resources
            .build_resources(function, &resource_cx, &mut resources)?;
    }

    Ok(CloudFormationTemplate {
        format_version: "2010-09-09".to_string(),
        description: ctx.service_description.clone(),
        resources,
    })
}

/// The content-addressed S3 key for a serialized template. Identical bytes
/// always map to the identical key, so re-uploading an unchanged template
/// is idempotent.
pub fn template_key(service_name: &str, body: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(body);
    format!(
        "{}-{:x}-cf.json",
        sanitized_name(service_name),
        hasher.finalize()
    )
}

/// Serializes and uploads the template, returning the HTTPS URL that the
/// stack create/update request consumes.
pub async fn upload_template(
    client: &S3Client,
    ctx: &WorkflowContext,
    template: &CloudFormationTemplate,
    config: &DeployConfig,
) -> Result<String> {
    let body = serde_json::to_vec(template)?;
    debug!(
        "CloudFormation template:\n{}",
        String::from_utf8_lossy(&body)
    );
    let key = template_key(&ctx.service_name, &body);

    info!("Uploading CloudFormation template: {}", key);
    s3::put_object(client, &ctx.s3_bucket, &key, body, "application/json").await?;

    Ok(format!(
        "https://{}.s3.{}.amazonaws.com/{}",
        ctx.s3_bucket,
        config.region.name(),
        key
    ))
}
