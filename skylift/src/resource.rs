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

//! CloudFormation resource contributions.
//!
//! Formatting the description of each individual resource type is a
//! pluggable capability: a [FunctionSpec](crate::context::FunctionSpec)
//! carries a [ResourceBuilder] that writes its resources into the shared
//! [ResourceMap] during template synthesis.

use crate::context::{sanitized_name, FunctionSpec};
use crate::error::{Result, SkyliftError};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Everything a resource description needs to reference the uploaded
/// artifact and the function's execution identity.
#[derive(Debug, Clone, Copy)]
pub struct ResourceContext<'a> {
    /// S3 bucket holding the deployment archive.
    pub bucket: &'a str,
    /// S3 key of the deployment archive.
    pub code_key: &'a str,
    /// Resolved execution role ARN. Never the role name.
    pub role_arn: &'a str,
}

/// The accumulating map from logical resource name to resource description.
///
/// Logical names must be unique within a template, so insertion is
/// fallible: a collision is a synthesis-time configuration error, never a
/// silent overwrite. The map is ordered to keep serialization byte-stable
/// for content addressing.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct ResourceMap(BTreeMap<String, Value>);

impl ResourceMap {
    /// Creates an empty resource map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource description under the given logical name.
    pub fn insert(&mut self, logical_id: impl Into<String>, resource: Value) -> Result<()> {
        let logical_id = logical_id.into();
        if self.0.contains_key(&logical_id) {
            return Err(SkyliftError::Configuration(format!(
                "Duplicate logical resource name: {}",
                logical_id
            )));
        }
        self.0.insert(logical_id, resource);
        Ok(())
    }

    /// The number of resources contributed so far.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no resources have been contributed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Looks up a contributed resource description.
    pub fn get(&self, logical_id: &str) -> Option<&Value> {
        self.0.get(logical_id)
    }
}

/// Contributes the CloudFormation resource description(s) of one function.
pub trait ResourceBuilder: Send + Sync {
    /// Writes the function's resources into `resources`. A failure here
    /// aborts template synthesis.
    fn build_resources(
        &self,
        function: &FunctionSpec,
        cx: &ResourceContext<'_>,
        resources: &mut ResourceMap,
    ) -> Result<()>;
}

/// The standard `AWS::Lambda::Function` resource description, routing
/// invocations through the generated NodeJS adapter.
#[derive(Debug, Clone)]
pub struct LambdaFunctionResource {
    /// Lambda runtime identifier for the adapter.
    pub runtime: String,
    /// Memory ceiling in MB. Must be a multiple of 64 MB.
    pub memory_size: i64,
    /// Invocation timeout in seconds.
    pub timeout: i64,
}

impl Default for LambdaFunctionResource {
    fn default() -> Self {
        LambdaFunctionResource {
            runtime: "nodejs12.x".to_string(),
            memory_size: 128,
            timeout: 30,
        }
    }
}

impl ResourceBuilder for LambdaFunctionResource {
    fn build_resources(
        &self,
        function: &FunctionSpec,
        cx: &ResourceContext<'_>,
        resources: &mut ResourceMap,
    ) -> Result<()> {
        let exported = sanitized_name(&function.name);
        resources.insert(
            format!("{}LambdaFunction", exported),
            json!({
                "Type": "AWS::Lambda::Function",
                "Properties": {
                    "Code": {
                        "S3Bucket": cx.bucket,
                        "S3Key": cx.code_key,
                    },
                    "Handler": format!("index.{}", exported),
                    "Role": cx.role_arn,
                    "Runtime": self.runtime,
                    "MemorySize": self.memory_size,
                    "Timeout": self.timeout,
                }
            }),
        )
    }
}
