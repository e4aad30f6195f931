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

//! The provisioning workflow: an ordered, fail-fast pipeline that resolves
//! execution roles, builds and uploads the deployment archive, synthesizes
//! the CloudFormation template, and converges the remote stack to it.

use crate::aws::{iam, s3};
use crate::config::{AwsClients, DeployConfig};
use crate::context::{FunctionSpec, WorkflowContext};
use crate::error::Result;
use log::{error, info, warn};

pub mod package;
pub mod stack;
pub mod template;
pub mod upload;

/// Compiles, packages, and provisions (either create or update) a service.
///
/// The service name distinguishes between create and update operations: it
/// names the CloudFormation stack, so two provisioning runs against the
/// same name must never overlap. Configuration comes from the process
/// environment; use [provision_with] to thread in explicit configuration
/// and clients.
pub async fn provision(
    service_name: impl Into<String>,
    service_description: impl Into<String>,
    functions: Vec<FunctionSpec>,
    s3_bucket: impl Into<String>,
) -> Result<()> {
    let config = DeployConfig::from_env();
    let clients = AwsClients::new(&config.region);
    let ctx = WorkflowContext::new(service_name, service_description, functions, s3_bucket);
    provision_with(ctx, &clients, &config).await
}

/// Runs the provisioning pipeline with explicit clients and configuration.
///
/// One cross-cutting failure policy wraps the step sequence: if any step
/// fails after the archive was uploaded, the remote archive object is
/// deleted best-effort before the original error is surfaced. A cleanup
/// failure is logged, never escalated; the step's error stays
/// authoritative.
pub async fn provision_with(
    mut ctx: WorkflowContext,
    clients: &AwsClients,
    config: &DeployConfig,
) -> Result<()> {
    match run_steps(&mut ctx, clients, config).await {
        Ok(()) => Ok(()),
        Err(err) => {
            error!("{}", err);
            cleanup_archive(&ctx, clients).await;
            Err(err)
        }
    }
}

/// The pipeline itself. Each step's output is a hard input dependency of
/// the next, so the sequence is strictly linear with `?` halting it at the
/// first failure; there is no step-level retry.
async fn run_steps(
    ctx: &mut WorkflowContext,
    clients: &AwsClients,
    config: &DeployConfig,
) -> Result<()> {
    ctx.role_arns = iam::resolve_execution_roles(&clients.iam, &ctx.functions).await?;

    let archive_path = package::build_package(ctx).await?;
    upload::upload_archive(&clients.s3, ctx, &archive_path).await?;
    let code_key = ctx
        .archive_key
        .clone()
        .ok_or("Upload succeeded without recording an archive key")?;

    let template = template::synthesize(ctx, &code_key)?;
    let template_url = template::upload_template(&clients.s3, ctx, &template, config).await?;
    stack::converge(&clients.cloudformation, ctx, &template_url, config).await
}

/// Best-effort removal of the uploaded archive. A `None` key means the
/// upload never succeeded and there is nothing to delete remotely.
pub(crate) async fn cleanup_archive(ctx: &WorkflowContext, clients: &AwsClients) {
    let key = match &ctx.archive_key {
        Some(key) => key,
        None => return,
    };
    info!("Attempting to cleanup ZIP archive: {}", key);
    if let Err(e) = s3::delete_object(&clients.s3, &ctx.s3_bucket, key).await {
        warn!("Failed to delete archive: {}", e);
    }
}
