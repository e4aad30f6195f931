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

//! This module contains all wrapped functions of the AWS IAM service.

use crate::context::FunctionSpec;
use crate::error::{Result, SkyliftError};
use log::{debug, info};
use rusoto_iam::{GetRoleRequest, Iam, IamClient};
use std::collections::HashMap;

/// Verifies the execution roles referenced by the declared functions and
/// returns the role name to ARN mapping consumed by template synthesis.
///
/// Each *distinct* role name is looked up exactly once; a missing role or
/// an access failure aborts the whole run, since an unresolvable identity
/// is a configuration defect rather than a transient fault.
pub async fn resolve_execution_roles(
    client: &IamClient,
    functions: &[FunctionSpec],
) -> Result<HashMap<String, String>> {
    info!("Verifying IAM Lambda execution roles");
    let mut role_arns = HashMap::new();

    for function in functions {
        if role_arns.contains_key(&function.execution_role) {
            continue;
        }
        debug!("Checking IAM role name: {}", function.execution_role);
        let resp = client
            .get_role(GetRoleRequest {
                role_name: function.execution_role.clone(),
            })
            .await
            .map_err(|e| {
                SkyliftError::Configuration(format!(
                    "Failed to resolve execution role {}: {}",
                    function.execution_role, e
                ))
            })?;
        // The template needs the execution ARN, not the role name.
        role_arns.insert(function.execution_role.clone(), resp.role.arn);
    }

    info!("IAM roles verified. Count: {}", role_arns.len());
    Ok(role_arns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::resource::LambdaFunctionResource;
    use rusoto_core::Region;
    use rusoto_mock::{
        MockCredentialsProvider, MockRequestDispatcher, MultipleMockRequestDispatcher,
    };

    fn function(name: &str, role: &str) -> FunctionSpec {
        FunctionSpec::new(name, role, Box::new(LambdaFunctionResource::default()))
    }

    fn get_role_response(role: &str) -> MockRequestDispatcher {
        MockRequestDispatcher::with_status(200).with_body(&format!(
            r#"<GetRoleResponse xmlns="https://iam.amazonaws.com/doc/2010-05-08/">
  <GetRoleResult>
    <Role>
      <Path>/</Path>
      <RoleName>{role}</RoleName>
      <RoleId>AROAEXAMPLEID</RoleId>
      <Arn>arn:aws:iam::123456789012:role/{role}</Arn>
      <CreateDate>2020-01-01T00:00:00Z</CreateDate>
    </Role>
  </GetRoleResult>
  <ResponseMetadata><RequestId>00000000-0000-0000-0000-000000000000</RequestId></ResponseMetadata>
</GetRoleResponse>"#
        ))
    }

    #[tokio::test]
    async fn duplicate_role_names_are_looked_up_once() -> Result<()> {
        // Three functions, two distinct roles: exactly two canned responses
        // may be consumed.
        let client = IamClient::new_with(
            MultipleMockRequestDispatcher::new(vec![
                get_role_response("role-a"),
                get_role_response("role-b"),
            ]),
            MockCredentialsProvider,
            Region::UsEast1,
        );
        let functions = vec![
            function("f1", "role-a"),
            function("f2", "role-b"),
            function("f3", "role-a"),
        ];

        let role_arns = resolve_execution_roles(&client, &functions).await?;
        assert_eq!(2, role_arns.len());
        assert_eq!(
            "arn:aws:iam::123456789012:role/role-a",
            role_arns["role-a"]
        );
        assert_eq!(
            "arn:aws:iam::123456789012:role/role-b",
            role_arns["role-b"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn missing_role_aborts_the_run() {
        let client = IamClient::new_with(
            MockRequestDispatcher::with_status(404).with_body(
                r#"<ErrorResponse xmlns="https://iam.amazonaws.com/doc/2010-05-08/">
  <Error>
    <Type>Sender</Type>
    <Code>NoSuchEntity</Code>
    <Message>The role with name ghost-role cannot be found.</Message>
  </Error>
  <RequestId>00000000-0000-0000-0000-000000000000</RequestId>
</ErrorResponse>"#,
            ),
            MockCredentialsProvider,
            Region::UsEast1,
        );
        let functions = vec![function("f1", "ghost-role")];

        let err = resolve_execution_roles(&client, &functions)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ghost-role"));
    }
}
