//! Terminal collaborators and the interactive loop.

use std::future;
use std::io::Write as _;

use parley_core::audio::CueSink;
use parley_core::auth::AuthError;
use parley_navigation::Screen;
use parley_reveal::RevealSnapshot;
use parley_session::LoginLauncher;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::shell::{Command, Outcome, Shell};

/// Cue sink that rings the terminal bell. The bell has no duration, so it
/// is never reported as playing and `stop` has nothing to halt.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl CueSink for TerminalBell {
    fn play(&self, _volume: f32) {
        let mut stderr = std::io::stderr().lock();
        if stderr.write_all(b"\x07").and_then(|()| stderr.flush()).is_err() {
            debug!("terminal bell could not be written");
        }
    }

    fn stop(&self) {}

    fn is_playing(&self) -> bool {
        false
    }
}

/// Login launcher that prints the URL for the user to open.
#[derive(Debug, Default)]
pub struct PrintingLauncher;

impl LoginLauncher for PrintingLauncher {
    fn launch(&self, url: &str) -> Result<(), AuthError> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "\nOpen this address in your browser to sign in:\n  {url}\n")
            .map_err(|e| AuthError::Transport(format!("could not print login URL: {e}")))
    }
}

async fn reveal_changed(reveal: &mut Option<watch::Receiver<RevealSnapshot>>) -> bool {
    match reveal {
        Some(receiver) => receiver.changed().await.is_ok(),
        None => future::pending().await,
    }
}

async fn emit<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<(), AppError> {
    if text.is_empty() {
        return Ok(());
    }
    output.write_all(text.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}

/// Reads commands from `input` and writes screens to `output` until `quit`
/// or end of input.
///
/// # Errors
///
/// Returns `AppError::Io` if reading or writing fails.
pub async fn run<R, W>(shell: &mut Shell, input: R, mut output: W) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut screens = shell.context().navigator.watch();
    let mut catalog = shell.context().catalog.watch();
    let mut session = shell.context().session.watch();
    let mut reveal = shell.reveal_watch();

    emit(&mut output, &shell.reveal_delta()).await?;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let result = match line.parse::<Command>() {
                    Ok(command) => shell.execute(command).await,
                    Err(error) => Err(error),
                };
                match result {
                    Ok(Outcome::Quit) => break,
                    Ok(Outcome::Continue(Some(message))) => {
                        emit(&mut output, &format!("{message}\n")).await?;
                    }
                    Ok(Outcome::Continue(None)) => {}
                    Err(error) => {
                        warn!(%error, "command rejected");
                        emit(&mut output, &format!("{error}\n")).await?;
                    }
                }
            }
            Ok(()) = screens.changed() => {
                if shell.sync() {
                    reveal = None;
                }
                emit(&mut output, &format!("\n{}", shell.render())).await?;
            }
            Ok(()) = catalog.changed() => {
                if shell.context().navigator.screen() == Screen::ScenarioList {
                    emit(&mut output, &shell.render()).await?;
                }
            }
            Ok(()) = session.changed() => {
                let resolving = session.borrow_and_update().resolving;
                if !resolving {
                    emit(&mut output, &format!("{}\n", shell.session_line())).await?;
                }
            }
            changed = reveal_changed(&mut reveal) => {
                if changed {
                    emit(&mut output, &shell.reveal_delta()).await?;
                } else {
                    reveal = None;
                }
            }
        }
    }
    Ok(())
}
