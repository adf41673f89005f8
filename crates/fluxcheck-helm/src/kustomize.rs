use std::path::Path;

use crate::{CommandLine, ToolError};

/// Build the renderer invocation: the configured command prefix followed by
/// the Kustomization directory.
pub(crate) fn render_command(prefix: &[String], dir: &Path) -> Result<CommandLine, ToolError> {
    let (program, rest) = prefix.split_first().ok_or_else(|| ToolError::Spawn {
        command: String::new(),
        source: std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "empty kustomize command",
        ),
    })?;
    Ok(CommandLine::new(program).args(rest).arg(dir))
}
