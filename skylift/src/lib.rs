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

#![warn(missing_docs, clippy::needless_borrow)]
#![allow(clippy::comparison_to_empty, clippy::upper_case_acronyms)]

//! Skylift turns a set of compiled function handlers into a deployed
//! serverless service on AWS Lambda. One provisioning run compiles the
//! service binary, packages it with a generated NodeJS adapter, uploads the
//! archive to S3, synthesizes a CloudFormation template describing the
//! desired end state, and converges the remote stack to that state,
//! reporting per-resource causes when the stack ends in a failed status.

pub mod aws;
pub mod config;
pub mod context;
pub mod deploy;
pub mod error;
pub mod prelude;
pub mod resource;
