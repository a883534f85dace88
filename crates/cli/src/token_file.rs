use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result, bail};

pub fn store(path: &Path, token: &str) -> Result<()> {
    fs::write(path, token).with_context(|| format!("failed to write token to {}", path.display()))
}

pub fn load(path: &Path) -> Result<String> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            bail!("not logged in: no token at {} (run `expensegate login`)", path.display())
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read token from {}", path.display()));
        }
    };

    let token = raw.trim();
    if token.is_empty() {
        bail!("token file {} is empty", path.display());
    }
    Ok(token.to_string())
}

pub fn remove(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
    }
}
