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

//! Deployment configuration and AWS service clients.
//!
//! The configuration is an explicit value threaded into the workflow entry
//! point rather than ambient global state, so the deployment core stays
//! testable without environment mutation.

use log::warn;
use rusoto_cloudformation::CloudFormationClient;
use rusoto_core::Region;
use rusoto_iam::IamClient;
use rusoto_s3::S3Client;
use std::env;
use std::time::Duration;

/// Settings for one provisioning run.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// The AWS region all service clients are bound to.
    pub region: Region,
    /// Wait before the first stack status poll.
    pub poll_initial: Duration,
    /// Wait between subsequent stack status polls while the stack is in a
    /// transitional state.
    pub poll_interval: Duration,
    /// Stack creation timeout handed to CloudFormation, in minutes.
    pub create_timeout: i64,
}

impl DeployConfig {
    /// Builds the configuration from the process environment. The region
    /// comes from `AWS_DEFAULT_REGION` with `us-east-1` applied if unset.
    pub fn from_env() -> Self {
        DeployConfig {
            region: region_from(env::var("AWS_DEFAULT_REGION").ok()),
            ..Default::default()
        }
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        DeployConfig {
            region: Region::UsEast1,
            poll_initial: Duration::from_secs(10),
            poll_interval: Duration::from_secs(20),
            create_timeout: 5,
        }
    }
}

/// Resolves a region name to a [Region], falling back to `us-east-1` when
/// the name is missing or unrecognized.
pub fn region_from(name: Option<String>) -> Region {
    match name {
        Some(name) => name.parse().unwrap_or_else(|_| {
            warn!("Unrecognized region {:?}, falling back to us-east-1", name);
            Region::UsEast1
        }),
        None => Region::UsEast1,
    }
}

/// The AWS service clients used by one provisioning run. Constructed once
/// per run; the fields are public so tests can substitute clients backed by
/// canned responses.
pub struct AwsClients {
    /// IAM client used to resolve execution roles.
    pub iam: IamClient,
    /// S3 client used to upload the archive and the template.
    pub s3: S3Client,
    /// CloudFormation client used to converge the stack.
    pub cloudformation: CloudFormationClient,
}

impl AwsClients {
    /// Creates the service clients bound to the given region.
    pub fn new(region: &Region) -> Self {
        AwsClients {
            iam: IamClient::new(region.clone()),
            s3: S3Client::new(region.clone()),
            cloudformation: CloudFormationClient::new(region.clone()),
        }
    }
}
