//! Parley client: Navigation State Machine.
//!
//! Owns the active [`Screen`] and the selected scenario. Moves are driven by
//! the user (start, select, exit) and by session change events, which can
//! advance the welcome screen to the scenario list once per login.

pub mod driver;
pub mod machine;
pub mod screen;

pub use driver::follow_session;
pub use machine::{NavigationSnapshot, Navigator};
pub use screen::Screen;
