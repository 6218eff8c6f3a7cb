use std::path::Path;
use std::process::Command;

use tracing::info;

use crate::error::BillingError;

/// Hands a rendered document to the platform print spooler. Best
/// effort: by the time this runs the invoice is already saved, so a
/// failure here is reported and changes nothing.
pub fn submit_for_printing(path: &Path) -> Result<(), BillingError> {
    dispatch(path).map_err(BillingError::PrintDispatchFailure)?;
    info!(document = %path.display(), "document sent to printer");
    Ok(())
}

/// Opens the rendered document with the system viewer.
pub fn open_document(path: &Path) -> Result<(), BillingError> {
    #[cfg(target_os = "windows")]
    let spawned = Command::new("cmd").args(["/C", "start", ""]).arg(path).spawn();

    #[cfg(not(target_os = "windows"))]
    let spawned = Command::new("xdg-open").arg(path).spawn();

    spawned
        .map(|_| ())
        .map_err(|e| BillingError::PrintDispatchFailure(format!("cannot open {}: {e}", path.display())))
}

#[cfg(target_os = "windows")]
fn dispatch(path: &Path) -> Result<(), String> {
    // Hands the file to the default associated printer via the shell
    // "print" verb
    let command = format!("Start-Process -FilePath '{}' -Verb Print", path.display());
    let status = Command::new("powershell")
        .args(["-NoProfile", "-Command", &command])
        .status()
        .map_err(|e| e.to_string())?;

    if status.success() {
        Ok(())
    } else {
        Err(format!("print command exited with {status}"))
    }
}

#[cfg(not(target_os = "windows"))]
fn dispatch(path: &Path) -> Result<(), String> {
    // CUPS: lp, falling back to lpr where lp is not installed
    match run_spooler("lp", path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            run_spooler("lpr", path).map_err(|e| e.to_string())
        }
        other => other.map_err(|e| e.to_string()),
    }
}

#[cfg(not(target_os = "windows"))]
fn run_spooler(program: &str, path: &Path) -> std::io::Result<()> {
    let output = Command::new(program).arg(path).output()?;
    if output.status.success() {
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ))
    }
}
