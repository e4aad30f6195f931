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

//! This module contains all wrapped functions of the AWS CloudFormation
//! service.

use crate::error::{Result, SkyliftError};
use log::debug;
use rusoto_cloudformation::{
    CloudFormation, CloudFormationClient, CreateStackInput, DescribeStackEventsInput,
    DescribeStacksInput, Stack, StackEvent, UpdateStackInput,
};
use rusoto_core::RusotoError;

/// Checks whether a stack with the given name or id exists.
///
/// CloudFormation reports a missing stack as a `ValidationError`, which is
/// not a failure here: an absent stack simply selects the create path.
pub async fn stack_exists(client: &CloudFormationClient, stack_name: &str) -> Result<bool> {
    let result = client
        .describe_stacks(DescribeStacksInput {
            stack_name: Some(stack_name.to_owned()),
            ..Default::default()
        })
        .await;
    match result {
        Ok(output) => {
            debug!("DescribeStacks output: {:?}", output);
            Ok(true)
        }
        Err(RusotoError::Unknown(resp)) if resp.body_as_str().contains("does not exist") => {
            Ok(false)
        }
        Err(e) => Err(SkyliftError::AWS(e.to_string())),
    }
}

/// Issues a stack creation request and returns the new stack id. The stack
/// tears itself down if creation fails, so a failed first deployment leaves
/// nothing behind.
pub async fn create_stack(
    client: &CloudFormationClient,
    stack_name: &str,
    template_url: &str,
    timeout_in_minutes: i64,
) -> Result<String> {
    let output = client
        .create_stack(CreateStackInput {
            stack_name: stack_name.to_owned(),
            template_url: Some(template_url.to_owned()),
            timeout_in_minutes: Some(timeout_in_minutes),
            on_failure: Some("DELETE".to_owned()),
            ..Default::default()
        })
        .await
        .map_err(|e| SkyliftError::AWS(e.to_string()))?;
    output
        .stack_id
        .ok_or_else(|| SkyliftError::AWS("CreateStack returned no stack id".to_string()))
}

/// Issues a stack update request and returns the stack id.
pub async fn update_stack(
    client: &CloudFormationClient,
    stack_name: &str,
    template_url: &str,
) -> Result<String> {
    let output = client
        .update_stack(UpdateStackInput {
            stack_name: stack_name.to_owned(),
            template_url: Some(template_url.to_owned()),
            ..Default::default()
        })
        .await
        .map_err(|e| SkyliftError::AWS(e.to_string()))?;
    output
        .stack_id
        .ok_or_else(|| SkyliftError::AWS("UpdateStack returned no stack id".to_string()))
}

/// Returns the current description of the given stack.
pub async fn describe_stack(client: &CloudFormationClient, stack_id: &str) -> Result<Stack> {
    let output = client
        .describe_stacks(DescribeStacksInput {
            stack_name: Some(stack_id.to_owned()),
            ..Default::default()
        })
        .await
        .map_err(|e| SkyliftError::AWS(e.to_string()))?;
    output
        .stacks
        .and_then(|mut stacks| {
            if stacks.is_empty() {
                None
            } else {
                Some(stacks.remove(0))
            }
        })
        .ok_or_else(|| SkyliftError::AWS(format!("No stack returned for: {}", stack_id)))
}

/// Returns the complete event history of the given stack, following
/// continuation tokens until exhausted.
pub async fn stack_events(
    client: &CloudFormationClient,
    stack_id: &str,
) -> Result<Vec<StackEvent>> {
    let mut events = Vec::new();
    let mut next_token: Option<String> = None;
    loop {
        let output = client
            .describe_stack_events(DescribeStackEventsInput {
                stack_name: Some(stack_id.to_owned()),
                next_token: next_token.clone(),
            })
            .await
            .map_err(|e| SkyliftError::AWS(e.to_string()))?;
        events.extend(output.stack_events.unwrap_or_default());
        next_token = output.next_token;
        if next_token.is_none() {
            break;
        }
    }
    Ok(events)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Result;
    use rusoto_core::Region;
    use rusoto_mock::{
        MockCredentialsProvider, MockRequestDispatcher, MultipleMockRequestDispatcher,
    };

    pub(crate) const STACK_ID: &str =
        "arn:aws:cloudformation:us-east-1:123456789012:stack/demo/0000";

    pub(crate) fn stack_missing_response() -> MockRequestDispatcher {
        MockRequestDispatcher::with_status(400).with_body(
            r#"<ErrorResponse xmlns="http://cloudformation.amazonaws.com/doc/2010-05-15/">
  <Error>
    <Type>Sender</Type>
    <Code>ValidationError</Code>
    <Message>Stack with id demo does not exist</Message>
  </Error>
  <RequestId>00000000-0000-0000-0000-000000000000</RequestId>
</ErrorResponse>"#,
        )
    }

    pub(crate) fn describe_stacks_response(status: &str) -> MockRequestDispatcher {
        MockRequestDispatcher::with_status(200).with_body(&format!(
            r#"<DescribeStacksResponse xmlns="http://cloudformation.amazonaws.com/doc/2010-05-15/">
  <DescribeStacksResult>
    <Stacks>
      <member>
        <StackName>demo</StackName>
        <StackId>{STACK_ID}</StackId>
        <CreationTime>2020-01-01T00:00:00Z</CreationTime>
        <StackStatus>{status}</StackStatus>
      </member>
    </Stacks>
  </DescribeStacksResult>
  <ResponseMetadata><RequestId>00000000-0000-0000-0000-000000000000</RequestId></ResponseMetadata>
</DescribeStacksResponse>"#
        ))
    }

    pub(crate) fn create_stack_response() -> MockRequestDispatcher {
        MockRequestDispatcher::with_status(200).with_body(&format!(
            r#"<CreateStackResponse xmlns="http://cloudformation.amazonaws.com/doc/2010-05-15/">
  <CreateStackResult><StackId>{STACK_ID}</StackId></CreateStackResult>
  <ResponseMetadata><RequestId>00000000-0000-0000-0000-000000000000</RequestId></ResponseMetadata>
</CreateStackResponse>"#
        ))
    }

    pub(crate) fn update_stack_response() -> MockRequestDispatcher {
        MockRequestDispatcher::with_status(200).with_body(&format!(
            r#"<UpdateStackResponse xmlns="http://cloudformation.amazonaws.com/doc/2010-05-15/">
  <UpdateStackResult><StackId>{STACK_ID}</StackId></UpdateStackResult>
  <ResponseMetadata><RequestId>00000000-0000-0000-0000-000000000000</RequestId></ResponseMetadata>
</UpdateStackResponse>"#
        ))
    }

    pub(crate) fn stack_events_response(
        status: &str,
        next_token: Option<&str>,
    ) -> MockRequestDispatcher {
        let token = next_token
            .map(|t| format!("<NextToken>{}</NextToken>", t))
            .unwrap_or_default();
        MockRequestDispatcher::with_status(200).with_body(&format!(
            r#"<DescribeStackEventsResponse xmlns="http://cloudformation.amazonaws.com/doc/2010-05-15/">
  <DescribeStackEventsResult>
    <StackEvents>
      <member>
        <EventId>event-{status}</EventId>
        <StackId>{STACK_ID}</StackId>
        <StackName>demo</StackName>
        <LogicalResourceId>EchoLambdaFunction</LogicalResourceId>
        <ResourceType>AWS::Lambda::Function</ResourceType>
        <Timestamp>2020-01-01T00:00:00Z</Timestamp>
        <ResourceStatus>{status}</ResourceStatus>
        <ResourceStatusReason>Insufficient permissions</ResourceStatusReason>
      </member>
    </StackEvents>
    {token}
  </DescribeStackEventsResult>
  <ResponseMetadata><RequestId>00000000-0000-0000-0000-000000000000</RequestId></ResponseMetadata>
</DescribeStackEventsResponse>"#
        ))
    }

    pub(crate) fn client_with(dispatchers: Vec<MockRequestDispatcher>) -> CloudFormationClient {
        CloudFormationClient::new_with(
            MultipleMockRequestDispatcher::new(dispatchers),
            MockCredentialsProvider,
            Region::UsEast1,
        )
    }

    #[tokio::test]
    async fn missing_stack_is_absent_not_an_error() -> Result<()> {
        let client = client_with(vec![stack_missing_response()]);
        assert!(!stack_exists(&client, "demo").await?);
        Ok(())
    }

    #[tokio::test]
    async fn existing_stack_is_present() -> Result<()> {
        let client = client_with(vec![describe_stacks_response("CREATE_COMPLETE")]);
        assert!(stack_exists(&client, "demo").await?);
        Ok(())
    }

    #[tokio::test]
    async fn other_describe_failures_are_fatal() {
        let client = CloudFormationClient::new_with(
            MockRequestDispatcher::with_status(403).with_body(
                r#"<ErrorResponse xmlns="http://cloudformation.amazonaws.com/doc/2010-05-15/">
  <Error>
    <Type>Sender</Type>
    <Code>AccessDenied</Code>
    <Message>User is not authorized to perform cloudformation:DescribeStacks</Message>
  </Error>
  <RequestId>00000000-0000-0000-0000-000000000000</RequestId>
</ErrorResponse>"#,
            ),
            MockCredentialsProvider,
            Region::UsEast1,
        );
        assert!(stack_exists(&client, "demo").await.is_err());
    }

    #[tokio::test]
    async fn event_history_follows_continuation_tokens() -> Result<()> {
        let client = client_with(vec![
            stack_events_response("CREATE_FAILED", Some("page-2")),
            stack_events_response("CREATE_COMPLETE", None),
        ]);
        let events = stack_events(&client, STACK_ID).await?;
        assert_eq!(2, events.len());
        assert_eq!(Some("CREATE_FAILED".to_string()), events[0].resource_status);
        assert_eq!(
            Some("CREATE_COMPLETE".to_string()),
            events[1].resource_status
        );
        Ok(())
    }
}
