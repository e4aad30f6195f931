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

//! A "prelude" for users of the Skylift crate.

pub use crate::config::{AwsClients, DeployConfig};
pub use crate::context::{sanitized_name, FunctionSpec, WorkflowContext};
pub use crate::deploy::{provision, provision_with};
pub use crate::error::{Result, SkyliftError};
pub use crate::resource::{
    LambdaFunctionResource, ResourceBuilder, ResourceContext, ResourceMap,
};
