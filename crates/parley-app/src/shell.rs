//! Command handling and screen rendering for the terminal front-end.

use std::str::FromStr;

use parley_catalog::{CatalogStatus, CatalogView};
use parley_core::auth::AuthError;
use parley_core::error::DomainError;
use parley_core::identity::Identity;
use parley_navigation::Screen;
use parley_reveal::{RevealHandle, RevealSnapshot, WELCOME_TEXT};
use parley_session::capture_callback_token;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, instrument};

use crate::context::AppContext;

/// Commands accepted on standard input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Reveal the whole intro now.
    Skip,
    /// Leave the welcome screen.
    Start,
    /// Begin an external login with the named provider.
    Login(String),
    /// Finish a login with the URL the browser was redirected to.
    Callback(String),
    /// Sign out.
    Logout,
    /// Fetch the catalog again.
    Reload,
    /// Play the n-th listed scenario (1-based).
    Select(usize),
    /// Back from play to the list.
    Exit,
    /// List the commands.
    Help,
    /// Leave the program.
    Quit,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(CommandError::Usage("type `help` to list commands"));
        };
        let argument = words.next();
        match (verb.to_ascii_lowercase().as_str(), argument) {
            ("skip", None) => Ok(Self::Skip),
            ("start", None) => Ok(Self::Start),
            ("login", Some(provider)) => Ok(Self::Login(provider.to_owned())),
            ("login", None) => Err(CommandError::Usage("usage: login <google|facebook>")),
            ("callback", Some(url)) => Ok(Self::Callback(url.to_owned())),
            ("callback", None) => Err(CommandError::Usage("usage: callback <redirect url>")),
            ("logout", None) => Ok(Self::Logout),
            ("reload", None) => Ok(Self::Reload),
            ("select", Some(index)) => index
                .parse()
                .ok()
                .filter(|index| *index > 0)
                .map(Self::Select)
                .ok_or(CommandError::Usage("usage: select <number from the list>")),
            ("select", None) => Err(CommandError::Usage("usage: select <number from the list>")),
            ("exit", None) => Ok(Self::Exit),
            ("help", None) => Ok(Self::Help),
            ("quit", None) => Ok(Self::Quit),
            _ => Err(CommandError::Unknown(line.trim().to_owned())),
        }
    }
}

/// A command that could not be carried out. None of these are fatal.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Unrecognized input.
    #[error("unknown command `{0}`, type `help` to list commands")]
    Unknown(String),

    /// A recognized command with bad arguments.
    #[error("{0}")]
    Usage(&'static str),

    /// The command does not apply to the active screen.
    #[error("`{command}` is not available on the {screen} screen")]
    NotHere {
        /// The rejected command.
        command: &'static str,
        /// The active screen.
        screen: Screen,
    },

    /// The navigator refused the move.
    #[error(transparent)]
    Navigation(#[from] DomainError),

    /// The auth collaborator refused the request.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// What the caller should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Keep reading commands, printing `message` if present.
    Continue(Option<String>),
    /// Stop the program.
    Quit,
}

const HELP: &str = "commands: skip, start, login <google|facebook>, callback <url>, logout, \
reload, select <n>, exit, help, quit";

/// Label of the welcome call-to-action.
#[must_use]
pub fn cta_label(identity: Option<&Identity>) -> &'static str {
    if identity.is_some() {
        "Start playing"
    } else {
        "Play as guest"
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

/// Terminal front-end state on top of the application context.
pub struct Shell {
    context: AppContext,
    reveal: Option<RevealHandle>,
    printed_chars: usize,
    cta_announced: bool,
    guest_start: Option<JoinHandle<()>>,
}

impl Shell {
    /// Wraps `context`; nothing runs until [`Shell::begin`].
    #[must_use]
    pub fn new(context: AppContext) -> Self {
        Self {
            context,
            reveal: None,
            printed_chars: 0,
            cta_announced: false,
            guest_start: None,
        }
    }

    /// The wrapped application context.
    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Starts the welcome reveal, skipping it at once when `skip_intro`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the reveal timings are invalid.
    pub fn begin(&mut self, skip_intro: bool) -> Result<(), DomainError> {
        let reveal = RevealHandle::start(
            WELCOME_TEXT,
            self.context.reveal_config,
            self.context.cue.clone(),
        )?;
        if skip_intro {
            reveal.skip();
        }
        self.reveal = Some(reveal);
        self.printed_chars = 0;
        self.cta_announced = false;
        Ok(())
    }

    /// Follows the running reveal, if any.
    pub fn reveal_watch(&self) -> Option<watch::Receiver<RevealSnapshot>> {
        self.reveal.as_ref().map(RevealHandle::watch)
    }

    /// Current reveal state, if the welcome screen is still up.
    pub fn reveal_snapshot(&self) -> Option<RevealSnapshot> {
        self.reveal.as_ref().map(RevealHandle::snapshot)
    }

    /// Tears the reveal down once the navigator has left the welcome
    /// screen. Returns true if a reveal was torn down.
    pub fn sync(&mut self) -> bool {
        if self.context.navigator.screen() == Screen::Welcome {
            return false;
        }
        match self.reveal.take() {
            Some(reveal) => {
                reveal.cancel();
                debug!("welcome screen left, reveal torn down");
                true
            }
            None => false,
        }
    }

    /// Stops everything still running.
    pub fn shutdown(&mut self) {
        if let Some(reveal) = self.reveal.take() {
            reveal.cancel();
        }
        if let Some(task) = self.guest_start.take() {
            task.abort();
        }
        self.context.catalog.cancel();
    }

    /// Text revealed since the previous call, followed by the call-to-action
    /// the first time it becomes visible.
    pub fn reveal_delta(&mut self) -> String {
        let Some(reveal) = &self.reveal else {
            return String::new();
        };
        let snapshot = reveal.snapshot();
        let mut delta: String = reveal
            .text()
            .chars()
            .skip(self.printed_chars)
            .take(snapshot.revealed_chars.saturating_sub(self.printed_chars))
            .collect();
        self.printed_chars = self.printed_chars.max(snapshot.revealed_chars);

        if snapshot.cta_visible && !self.cta_announced {
            self.cta_announced = true;
            let label = cta_label(self.context.session.identity().as_ref());
            delta.push_str(&format!("\n\n> {label} (type `start`)\n"));
        }
        delta
    }

    /// Renders the active screen (the welcome screen renders through
    /// [`Shell::reveal_delta`] instead).
    pub fn render(&self) -> String {
        let snapshot = self.context.navigator.snapshot();
        let mut out = String::new();
        match snapshot.screen {
            Screen::Welcome => {
                if let Some(reveal) = &self.reveal {
                    let state = reveal.snapshot();
                    if state.cta_visible {
                        let label = cta_label(self.context.session.identity().as_ref());
                        push_line(&mut out, &format!("> {label} (type `start`)"));
                    }
                }
            }
            Screen::ScenarioList => {
                push_line(&mut out, "== Scenarios ==");
                match self.context.catalog.state().view() {
                    CatalogView::Idle | CatalogView::Loading => {
                        push_line(&mut out, "Loading scenarios...");
                    }
                    CatalogView::Failed(message) => {
                        push_line(&mut out, &format!("{message} Type `reload` to try again."));
                    }
                    CatalogView::Empty => {
                        push_line(&mut out, "No scenarios available yet.");
                    }
                    CatalogView::Ready(items) => {
                        for (index, scenario) in items.iter().enumerate() {
                            let position = index + 1;
                            push_line(
                                &mut out,
                                &format!("{position:>3}. {}", scenario.display_name()),
                            );
                        }
                        push_line(&mut out, "Type `select <n>` to play.");
                    }
                }
            }
            Screen::Play => {
                if let Some(scenario) = &snapshot.current_scenario {
                    push_line(&mut out, &format!("== {} ==", scenario.display_name()));
                    if let Some(story) = &scenario.story {
                        push_line(&mut out, story);
                    }
                }
                push_line(&mut out, "Type `exit` to return to the list.");
            }
        }
        out
    }

    /// One-line description of the session.
    pub fn session_line(&self) -> String {
        let snapshot = self.context.session.snapshot();
        match (&snapshot.identity, snapshot.resolving) {
            (_, true) => "Checking sign-in...".to_owned(),
            (Some(identity), false) => format!("Signed in as {}.", identity.display_name),
            (None, false) => "Playing as guest.".to_owned(),
        }
    }

    /// Carries out `command`.
    ///
    /// # Errors
    ///
    /// Returns `CommandError` when the command does not apply right now;
    /// the shell stays usable.
    #[instrument(skip(self))]
    pub async fn execute(&mut self, command: Command) -> Result<Outcome, CommandError> {
        self.sync();
        let screen = self.context.navigator.screen();
        match command {
            Command::Skip => {
                let skipped = self
                    .reveal
                    .as_ref()
                    .filter(|_| screen == Screen::Welcome)
                    .is_some_and(RevealHandle::skip);
                if !skipped {
                    return Err(CommandError::NotHere { command: "skip", screen });
                }
                Ok(Outcome::Continue(None))
            }
            Command::Start => self.start(screen),
            Command::Login(provider) => {
                self.context.session.login(&provider).await?;
                Ok(Outcome::Continue(Some(
                    "Finish signing in in the browser, then paste the address you land on with \
                     `callback <url>`."
                        .to_owned(),
                )))
            }
            Command::Callback(url) => {
                let Some(token) = capture_callback_token(&url)? else {
                    return Err(CommandError::Usage("that address carries no login token"));
                };
                self.context.tokens.set(token);
                self.context.session.rehydrate().await;
                // A catalog fetched as a guest may differ for members.
                if self.context.catalog.state().status != CatalogStatus::Idle {
                    if let Err(error) = self.context.catalog.load().await {
                        debug!(%error, "catalog reload after login failed");
                    }
                }
                Ok(Outcome::Continue(Some(self.session_line())))
            }
            Command::Logout => {
                self.context.session.logout();
                Ok(Outcome::Continue(Some(self.session_line())))
            }
            Command::Reload => {
                if screen != Screen::ScenarioList {
                    return Err(CommandError::NotHere { command: "reload", screen });
                }
                // Failures surface through the rendered list.
                if let Err(error) = self.context.catalog.load().await {
                    debug!(%error, "catalog reload failed");
                }
                Ok(Outcome::Continue(Some(self.render())))
            }
            Command::Select(position) => {
                if screen != Screen::ScenarioList {
                    return Err(CommandError::NotHere { command: "select", screen });
                }
                let state = self.context.catalog.state();
                let Some(scenario) = position
                    .checked_sub(1)
                    .and_then(|index| state.items.get(index))
                else {
                    return Err(CommandError::Usage("no scenario with that number"));
                };
                self.context.navigator.select(scenario.clone())?;
                Ok(Outcome::Continue(None))
            }
            Command::Exit => {
                self.context.navigator.exit_to_list()?;
                Ok(Outcome::Continue(None))
            }
            Command::Help => Ok(Outcome::Continue(Some(HELP.to_owned()))),
            Command::Quit => Ok(Outcome::Quit),
        }
    }

    /// Signed-in users move at once. Guests move once the catalog has been
    /// fetched; that runs in the background so the shell keeps reading
    /// commands and the screen change arrives through the navigator watch.
    fn start(&mut self, screen: Screen) -> Result<Outcome, CommandError> {
        if screen != Screen::Welcome {
            return Err(CommandError::NotHere { command: "start", screen });
        }
        if self
            .guest_start
            .as_ref()
            .is_some_and(|task| !task.is_finished())
        {
            return Err(CommandError::Usage("already starting, scenarios are loading"));
        }
        let cta_visible = self
            .reveal
            .as_ref()
            .is_some_and(|reveal| reveal.snapshot().cta_visible);
        if !cta_visible {
            return Err(DomainError::InvalidTransition(
                "cannot start before the call-to-action is shown".to_owned(),
            )
            .into());
        }
        self.context.cue.stop();

        if self.context.session.identity().is_some() {
            self.context.navigator.start(true)?;
            info!("welcome screen left");
            self.sync();
            return Ok(Outcome::Continue(None));
        }

        let navigator = self.context.navigator.clone();
        let catalog = self.context.catalog.clone();
        self.guest_start = Some(tokio::spawn(
            async move {
                match navigator.start_guest(true, &catalog).await {
                    Ok(()) => info!("welcome screen left"),
                    Err(error) => debug!(%error, "guest start abandoned"),
                }
            }
            .instrument(info_span!("guest_start")),
        ));
        Ok(Outcome::Continue(Some("Loading scenarios...".to_owned())))
    }
}
