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

//! Builds and packages the deployment artifact: compiles the service into a
//! Lambda-target binary and zips it together with a generated NodeJS
//! adapter that routes invocations to the declared functions.

use crate::context::{sanitized_name, FunctionSpec, WorkflowContext};
use crate::error::{Result, SkyliftError};
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use uuid::Uuid;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// The NodeJS bootstrap prelude, consumed verbatim. Generated export
/// statements are appended to it at packaging time.
const ADAPTER_PRELUDE: &str = include_str!("../../resources/index.js");

const LAMBDA_TARGET: &str = "x86_64-unknown-linux-musl";

/// The deterministic in-archive name of the service executable.
pub fn executable_name(service_name: &str) -> String {
    format!("{}.lambda.x86_64", sanitized_name(service_name))
}

/// Compiles the service into a Lambda-target executable in the working
/// directory and returns its path.
///
/// The service's crate is expected to expose a binary target named after
/// the sanitized service name.
pub async fn compile_binary(service_name: &str) -> Result<PathBuf> {
    let bin_name = sanitized_name(service_name);
    let executable = PathBuf::from(executable_name(service_name));
    info!("Compiling binary: {}", executable.display());

    let output = Command::new("cargo")
        .args([
            "build",
            "--release",
            "--target",
            LAMBDA_TARGET,
            "--bin",
            bin_name.as_str(),
        ])
        .output()
        .await
        .map_err(|e| SkyliftError::Build(format!("Failed to invoke cargo: {}", e)))?;
    if !output.status.success() {
        return Err(SkyliftError::Build(
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ));
    }

    let built = Path::new("target")
        .join(LAMBDA_TARGET)
        .join("release")
        .join(&bin_name);
    fs::copy(&built, &executable)
        .map_err(|e| SkyliftError::Build(format!("Failed to copy {}: {}", built.display(), e)))?;

    let stat = fs::metadata(&executable)
        .map_err(|_| SkyliftError::Build("Failed to stat build output".to_string()))?;
    debug!("Executable binary size (MB): {}", stat.len() / (1024 * 1024));
    Ok(executable)
}

/// Generates the complete NodeJS adapter source: the bootstrap prelude,
/// one export per function in declaration order, and the name of the
/// embedded executable so the bootstrap can locate it at invocation time.
///
/// The output is byte-identical across repeated runs for identical
/// declarations, so rebuilds stay diffable.
pub fn generate_adapter(service_name: &str, functions: &[FunctionSpec]) -> String {
    let mut source = String::from(ADAPTER_PRELUDE);
    source.push_str("// DO NOT EDIT - CONTENT UNTIL EOF IS AUTOMATICALLY GENERATED\n");
    for function in functions {
        source.push_str(&format!(
            "exports[\"{}\"] = createForwarder(\"/{}\");\n",
            sanitized_name(&function.name),
            function.name
        ));
    }
    source.push_str(&format!(
        "SKYLIFT_BINARY_NAME='{}';\n",
        executable_name(service_name)
    ));
    source
}

/// Writes the deployment archive: the executable under its deterministic
/// name plus the adapter source as `index.js`. The local executable is
/// removed whether or not archiving succeeds.
pub fn package_archive(
    executable: &Path,
    adapter_source: &str,
    archive_path: &Path,
) -> Result<()> {
    let result = write_archive(executable, adapter_source, archive_path);
    if let Err(e) = fs::remove_file(executable) {
        warn!(
            "Failed to remove local executable {}: {}",
            executable.display(),
            e
        );
    }
    result
}

fn write_archive(executable: &Path, adapter_source: &str, archive_path: &Path) -> Result<()> {
    let entry_name = executable
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SkyliftError::Build(format!("Bad executable path: {:?}", executable)))?;
    let file = File::create(archive_path)
        .map_err(|e| SkyliftError::Build(format!("Failed to create archive file: {}", e)))?;
    let mut archive = ZipWriter::new(file);

    archive
        .start_file(
            entry_name,
            FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .unix_permissions(0o755),
        )
        .map_err(|e| {
            SkyliftError::Build(format!("Failed to create ZIP entry {}: {}", entry_name, e))
        })?;
    archive
        .write_all(&fs::read(executable).map_err(|e| {
            SkyliftError::Build(format!("Failed to open file {}: {}", executable.display(), e))
        })?)
        .map_err(|e| {
            SkyliftError::Build(format!("Failed to write ZIP entry {}: {}", entry_name, e))
        })?;

    archive
        .start_file(
            "index.js",
            FileOptions::default().compression_method(CompressionMethod::Deflated),
        )
        .map_err(|e| SkyliftError::Build(format!("Failed to create ZIP entry index.js: {}", e)))?;
    archive
        .write_all(adapter_source.as_bytes())
        .map_err(|e| SkyliftError::Build(format!("Failed to write ZIP entry index.js: {}", e)))?;
    archive
        .finish()
        .map_err(|e| SkyliftError::Build(format!("Failed to finalize archive: {}", e)))?;
    Ok(())
}

/// Compiles and packages the service, returning the path of the archive to
/// upload. The archive filename doubles as its S3 key.
pub async fn build_package(ctx: &WorkflowContext) -> Result<PathBuf> {
    let executable = compile_binary(&ctx.service_name).await?;
    let adapter_source = generate_adapter(&ctx.service_name, &ctx.functions);
    debug!("Dynamically generated NodeJS adapter:\n{}", adapter_source);

    let archive_path = PathBuf::from(format!(
        "{}-{}.zip",
        sanitized_name(&ctx.service_name),
        Uuid::new_v4()
    ));
    info!("Creating ZIP archive for upload: {}", archive_path.display());
    package_archive(&executable, &adapter_source, &archive_path)?;
    Ok(archive_path)
}
