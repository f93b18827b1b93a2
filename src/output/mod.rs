use anyhow::Result;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::transcribe::InvocationOutput;

/// Render an invocation result as JSON
pub fn render(result: &InvocationOutput, format: &OutputFormat) -> Result<String> {
    let content = match format {
        OutputFormat::Json => serde_json::to_string(result)?,
        OutputFormat::Pretty => serde_json::to_string_pretty(result)?,
    };

    Ok(content)
}

/// Save invocation result to file
pub async fn save_to_file(result: &InvocationOutput, path: &Path, format: &OutputFormat) -> Result<()> {
    let content = render(result, format)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print invocation result to console
pub fn print_to_console(result: &InvocationOutput, format: &OutputFormat) -> Result<()> {
    println!("{}", render(result, format)?);
    Ok(())
}
