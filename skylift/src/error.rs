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

//! Skylift error types

use std::error;
use std::fmt::{Display, Formatter};
use std::io;
use std::result;

/// Result type for operations that could result in an [SkyliftError]
pub type Result<T> = result::Result<T, SkyliftError>;

/// Skylift error
#[derive(Debug)]
pub enum SkyliftError {
    /// Error associated to I/O operations and associated traits.
    IoError(io::Error),
    /// Error returned when serde_json failed to serialize or deserialize data.
    SerdeJson(serde_json::Error),
    /// Error returned when the deployment archive cannot be written.
    Zip(zip::result::ZipError),
    /// Error returned when the caller's declarations are defective, such as
    /// an unresolvable execution role or colliding resource names. These are
    /// never retried.
    Configuration(String),
    /// Error returned when compiling or packaging the service binary fails.
    /// Carries the underlying tool's diagnostic text.
    Build(String),
    /// Error returned when accessing the AWS services fails.
    AWS(String),
    /// Error returned when the remote stack converges to a failed terminal
    /// state. The per-resource causes are emitted as diagnostics, not
    /// carried in the error value.
    Provision(String),
    /// Error raised when one of Skylift's internal invariants is not
    /// verified during execution.
    Internal(String),
}

impl From<io::Error> for SkyliftError {
    fn from(e: io::Error) -> Self {
        SkyliftError::IoError(e)
    }
}

impl From<serde_json::Error> for SkyliftError {
    fn from(e: serde_json::Error) -> Self {
        SkyliftError::SerdeJson(e)
    }
}

impl From<zip::result::ZipError> for SkyliftError {
    fn from(e: zip::result::ZipError) -> Self {
        SkyliftError::Zip(e)
    }
}

impl From<&str> for SkyliftError {
    fn from(e: &str) -> Self {
        SkyliftError::Internal(e.to_string())
    }
}

impl Display for SkyliftError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            SkyliftError::IoError(ref desc) => write!(f, "IO error: {}", desc),
            SkyliftError::SerdeJson(ref desc) => write!(f, "serde_json error: {:?}", desc),
            SkyliftError::Zip(ref desc) => write!(f, "Archive error: {}", desc),
            SkyliftError::Configuration(ref desc) => {
                write!(f, "Configuration error: {}", desc)
            }
            SkyliftError::Build(ref desc) => write!(f, "Build error: {}", desc),
            SkyliftError::AWS(ref desc) => write!(f, "AWS error: {}", desc),
            SkyliftError::Provision(ref desc) => write!(f, "Provision error: {}", desc),
            SkyliftError::Internal(ref desc) => write!(
                f,
                "Internal error: {}. This was likely caused by a bug in Skylift's \
                    code and we would welcome that you file an bug report in our issue tracker",
                desc
            ),
        }
    }
}

impl error::Error for SkyliftError {}
