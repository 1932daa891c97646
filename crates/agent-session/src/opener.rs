//! URL-open side effect.
//!
//! Tries the desktop's default handler first and falls back to the
//! platform's open command. Failures are logged and otherwise ignored: they
//! never affect the connection.

use std::io;
use std::process::{Command, Stdio};

/// Opens a URL on this machine.
///
/// Called from a blocking thread, once per URL, in command order.
pub trait UrlOpener: Send + Sync + 'static {
    fn open(&self, url: &str);
}

/// Opens URLs in the user's default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl UrlOpener for SystemOpener {
    fn open(&self, url: &str) {
        let Err(e) = open::that_detached(url) else {
            return;
        };
        tracing::warn!(%url, "default handler failed: {e}, trying fallback");

        if let Err(e) = fallback_open(url) {
            tracing::error!(%url, "fallback open failed: {e}");
        }
    }
}

fn fallback_open(url: &str) -> io::Result<()> {
    let status = platform_command(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("open command exited with {status}")))
    }
}

#[cfg(target_os = "windows")]
fn platform_command(url: &str) -> Command {
    let mut cmd = Command::new("cmd");
    // Empty title argument so `start` does not treat the URL as one.
    cmd.args(["/C", "start", "", url]);
    cmd
}

#[cfg(target_os = "macos")]
fn platform_command(url: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(url);
    cmd
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn platform_command(url: &str) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(url);
    cmd
}
