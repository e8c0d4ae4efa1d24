//! The intro text shown on the welcome screen.

/// Revealed character by character before the call-to-action appears.
pub const WELCOME_TEXT: &str = "Welcome.
Life runs on countless small negotiations every day.
Sometimes with a friend, sometimes in a business meeting, sometimes with yourself.
This game is built to show you not only what you say, but why you act the way you do.
In scenarios taken from real life you will test how you set boundaries, persuade, and manage emotions.
Every choice is a reflection of your awareness.
Every scenario is a challenge to strengthen the way you communicate.
The goal is not just to know yourself, but to become a more strategic, more effective negotiator.
If you are ready, let the game begin.";
