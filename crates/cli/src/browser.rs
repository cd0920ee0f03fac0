use opalview_session::ApprovalOpener;
use tracing::warn;

/// Prints the approval URL and asks the desktop to open it.
pub struct BrowserOpener;

impl ApprovalOpener for BrowserOpener {
    fn open(&self, url: &str) {
        eprintln!("Approve this login in your browser:\n  {url}");
        if let Err(e) = launch(url) {
            warn!("Could not open a browser: {e}");
        }
    }
}

fn launch(url: &str) -> std::io::Result<()> {
    let mut cmd = if cfg!(target_os = "macos") {
        std::process::Command::new("open")
    } else if cfg!(windows) {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        std::process::Command::new("xdg-open")
    };
    cmd.arg(url)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map(|_| ())
}
