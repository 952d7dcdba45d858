use anyhow::{bail, Context, Result};
use std::{
    path::Path,
    process::{Command, Stdio},
};

/// Opens `path` in `editor` and waits for it to exit. The editor string may
/// carry arguments, e.g. `code --wait`.
pub fn open(editor: &str, path: &Path) -> Result<()> {
    let mut parts = editor.split_whitespace();
    let program = parts.next().context("no editor configured")?;
    let status = Command::new(program)
        .args(parts)
        .arg(path)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .with_context(|| format!("failed to launch editor '{program}'"))?;
    if !status.success() {
        bail!("editor exited with {status}");
    }
    Ok(())
}
