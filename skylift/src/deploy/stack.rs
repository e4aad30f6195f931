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

//! Converges the remote CloudFormation stack to the synthesized template:
//! create-if-absent or update-if-present, then poll until the stack leaves
//! the transitional states and classify where it landed.

use crate::aws::cloudformation;
use crate::config::DeployConfig;
use crate::context::WorkflowContext;
use crate::error::{Result, SkyliftError};
use log::{error, info};
use rusoto_cloudformation::CloudFormationClient;

/// Resource statuses worth surfacing when diagnosing a failed stack.
const FAILED_RESOURCE_STATUSES: [&str; 3] = ["CREATE_FAILED", "DELETE_FAILED", "UPDATE_FAILED"];

/// Where a stack operation landed once the stack left the transitional
/// states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOutcome {
    /// The create or update request converged.
    Succeeded,
    /// The platform rolled the operation back or tore the stack down.
    Failed,
    /// A terminal status this engine does not recognize. Treated as a
    /// distinct error demanding operator attention, never as success.
    Unknown,
}

/// Whether the status belongs to the transitional family: in-progress
/// creation, update, rollback, or cleanup.
pub fn is_transitional(stack_status: &str) -> bool {
    stack_status.ends_with("_IN_PROGRESS")
}

/// Classifies a terminal stack status. `DELETE_COMPLETE` here means a
/// failed creation was torn down by the on-failure policy; the rollback
/// statuses mean the platform undid a failed create or update.
pub fn classify_terminal_status(stack_status: &str) -> StackOutcome {
    match stack_status {
        "CREATE_COMPLETE" | "UPDATE_COMPLETE" => StackOutcome::Succeeded,
        "DELETE_COMPLETE"
        | "ROLLBACK_COMPLETE"
        | "ROLLBACK_FAILED"
        | "UPDATE_ROLLBACK_COMPLETE"
        | "UPDATE_ROLLBACK_FAILED"
        | "CREATE_FAILED"
        | "DELETE_FAILED" => StackOutcome::Failed,
        _ => StackOutcome::Unknown,
    }
}

/// Drives the remote stack to the state described by the uploaded
/// template and reports the terminal outcome.
///
/// The stack is addressed by service name until the create or update
/// request returns its opaque id, and by that id from then on. Observing a
/// transitional status is not an error, only a reason to wait and
/// re-query; genuine retry logic lives nowhere else in the workflow.
pub async fn converge(
    client: &CloudFormationClient,
    ctx: &WorkflowContext,
    template_url: &str,
    config: &DeployConfig,
) -> Result<()> {
    let exists = cloudformation::stack_exists(client, &ctx.service_name).await?;
    let stack_id = if exists {
        let stack_id =
            cloudformation::update_stack(client, &ctx.service_name, template_url).await?;
        info!("Issued update request: {}", stack_id);
        stack_id
    } else {
        let stack_id = cloudformation::create_stack(
            client,
            &ctx.service_name,
            template_url,
            config.create_timeout,
        )
        .await?;
        info!("Creating stack: {}", stack_id);
        stack_id
    };

    info!("Waiting for stack to complete");
    tokio::time::sleep(config.poll_initial).await;
    let stack = loop {
        let stack = cloudformation::describe_stack(client, &stack_id).await?;
        info!("Current state: {}", stack.stack_status);
        if !is_transitional(&stack.stack_status) {
            break stack;
        }
        tokio::time::sleep(config.poll_interval).await;
    };

    match classify_terminal_status(&stack.stack_status) {
        StackOutcome::Succeeded => {
            info!("Stack provisioned: {}", stack.stack_name);
            Ok(())
        }
        StackOutcome::Failed => {
            report_stack_failures(client, &stack_id).await?;
            Err(SkyliftError::Provision(format!(
                "Failed to provision: {}",
                ctx.service_name
            )))
        }
        StackOutcome::Unknown => Err(SkyliftError::Provision(format!(
            "Stack {} ended in unrecognized terminal status {}, operator attention required",
            ctx.service_name, stack.stack_status
        ))),
    }
}

/// Scans the stack's event history and logs one line per failed resource.
/// This is the primary diagnostic surface when provisioning fails.
async fn report_stack_failures(client: &CloudFormationClient, stack_id: &str) -> Result<()> {
    let events = cloudformation::stack_events(client, stack_id).await?;
    error!("Stack provisioning failed.");
    for event in events {
        let status = event.resource_status.as_deref().unwrap_or_default();
        if FAILED_RESOURCE_STATUSES.contains(&status) {
            error!(
                "\tError ensuring {} ({}): {}",
                event.resource_type.as_deref().unwrap_or("unknown type"),
                event.logical_resource_id.as_deref().unwrap_or("unknown id"),
                event
                    .resource_status_reason
                    .as_deref()
                    .unwrap_or("no reason reported"),
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::cloudformation::tests::{
        client_with, create_stack_response, describe_stacks_response, stack_events_response,
        stack_missing_response, update_stack_response,
    };
    use crate::error::Result;
    use std::time::Duration;

    fn fast_config() -> DeployConfig {
        DeployConfig {
            poll_initial: Duration::from_millis(1),
            poll_interval: Duration::from_millis(1),
            ..Default::default()
        }
    }

    fn context() -> WorkflowContext {
        WorkflowContext::new("demo", "test service", Vec::new(), "bucket")
    }

    #[tokio::test]
    async fn absent_stack_takes_the_create_path() -> Result<()> {
        let client = client_with(vec![
            stack_missing_response(),
            create_stack_response(),
            describe_stacks_response("CREATE_IN_PROGRESS"),
            describe_stacks_response("CREATE_COMPLETE"),
        ]);
        converge(
            &client,
            &context(),
            "https://bucket.s3.us-east-1.amazonaws.com/demo-cf.json",
            &fast_config(),
        )
        .await
    }

    #[tokio::test]
    async fn existing_stack_takes_the_update_path() -> Result<()> {
        let client = client_with(vec![
            describe_stacks_response("CREATE_COMPLETE"),
            update_stack_response(),
            describe_stacks_response("UPDATE_IN_PROGRESS"),
            describe_stacks_response("UPDATE_COMPLETE"),
        ]);
        converge(
            &client,
            &context(),
            "https://bucket.s3.us-east-1.amazonaws.com/demo-cf.json",
            &fast_config(),
        )
        .await
    }

    #[tokio::test]
    async fn rollback_is_reported_with_event_history() {
        let _ = env_logger::builder().is_test(true).try_init();
        let client = client_with(vec![
            stack_missing_response(),
            create_stack_response(),
            describe_stacks_response("ROLLBACK_IN_PROGRESS"),
            describe_stacks_response("ROLLBACK_COMPLETE"),
            stack_events_response("CREATE_FAILED", None),
        ]);
        let err = converge(
            &client,
            &context(),
            "https://bucket.s3.us-east-1.amazonaws.com/demo-cf.json",
            &fast_config(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Failed to provision: demo"));
    }

    #[tokio::test]
    async fn unrecognized_terminal_status_is_not_success() {
        let client = client_with(vec![
            stack_missing_response(),
            create_stack_response(),
            describe_stacks_response("IMPORT_COMPLETE"),
        ]);
        let err = converge(
            &client,
            &context(),
            "https://bucket.s3.us-east-1.amazonaws.com/demo-cf.json",
            &fast_config(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("IMPORT_COMPLETE"));
        assert!(err.to_string().contains("operator attention"));
    }

    #[test]
    fn transitional_family_covers_cleanup_and_rollback() {
        assert!(is_transitional("CREATE_IN_PROGRESS"));
        assert!(is_transitional("UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS"));
        assert!(!is_transitional("CREATE_COMPLETE"));
        assert!(!is_transitional("ROLLBACK_COMPLETE"));
    }

    #[test]
    fn terminal_classification_is_explicit() {
        assert_eq!(
            StackOutcome::Succeeded,
            classify_terminal_status("CREATE_COMPLETE")
        );
        assert_eq!(
            StackOutcome::Failed,
            classify_terminal_status("DELETE_COMPLETE")
        );
        assert_eq!(
            StackOutcome::Failed,
            classify_terminal_status("UPDATE_ROLLBACK_COMPLETE")
        );
        assert_eq!(
            StackOutcome::Unknown,
            classify_terminal_status("IMPORT_COMPLETE")
        );
    }
}
