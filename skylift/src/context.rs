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

//! The data model threaded through one provisioning run.

use crate::resource::ResourceBuilder;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

lazy_static! {
    static ref INVALID_NAME_CHARS: Regex = Regex::new("[^a-zA-Z0-9]").unwrap();
}

/// Replaces every character that is not valid in an AWS logical id or an
/// exported NodeJS identifier with an underscore.
pub fn sanitized_name(name: &str) -> String {
    INVALID_NAME_CHARS.replace_all(name, "_").into_owned()
}

/// One deployable function of the service: its logical name, the name of
/// the IAM role it executes under, and the capability that contributes its
/// CloudFormation resource description(s). Read-only during the workflow.
pub struct FunctionSpec {
    /// Logical function name, routed to by the NodeJS adapter.
    pub name: String,
    /// Name of the IAM execution role. Resolved to an ARN before template
    /// synthesis.
    pub execution_role: String,
    /// Produces the function's CloudFormation resources.
    pub resources: Box<dyn ResourceBuilder>,
}

impl FunctionSpec {
    /// Creates a function spec backed by the given resource builder.
    pub fn new(
        name: impl Into<String>,
        execution_role: impl Into<String>,
        resources: Box<dyn ResourceBuilder>,
    ) -> Self {
        FunctionSpec {
            name: name.into(),
            execution_role: execution_role.into(),
            resources,
        }
    }
}

impl fmt::Debug for FunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionSpec")
            .field("name", &self.name)
            .field("execution_role", &self.execution_role)
            .finish()
    }
}

/// Mutable state owned by exactly one in-flight provisioning run. The
/// workflow steps read and update it in sequence; it must never be shared
/// across concurrent runs against the same service name.
#[derive(Debug)]
pub struct WorkflowContext {
    /// The service's logical name, also the CloudFormation stack name.
    pub service_name: String,
    /// Human-readable description embedded in the template.
    pub service_description: String,
    /// The declared functions, in declaration order.
    pub functions: Vec<FunctionSpec>,
    /// Execution role name to resolved ARN, built once per run.
    pub role_arns: HashMap<String, String>,
    /// Target S3 bucket for the archive and the template.
    pub s3_bucket: String,
    /// S3 key of the uploaded archive. `None` until the upload succeeds;
    /// once recorded it is the trigger for cleanup should a later step fail.
    pub archive_key: Option<String>,
}

impl WorkflowContext {
    /// Creates the context for one provisioning run.
    pub fn new(
        service_name: impl Into<String>,
        service_description: impl Into<String>,
        functions: Vec<FunctionSpec>,
        s3_bucket: impl Into<String>,
    ) -> Self {
        WorkflowContext {
            service_name: service_name.into(),
            service_description: service_description.into(),
            functions,
            role_arns: HashMap::new(),
            s3_bucket: s3_bucket.into(),
            archive_key: None,
        }
    }
}
