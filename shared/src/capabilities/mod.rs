//! Render and Http come straight from Crux; realtime, navigation and audio
//! are app-specific capabilities served by the shell.

mod audio;
mod navigation;
mod realtime;

pub use self::audio::{Audio, AudioOperation};
pub use self::navigation::{Navigation, NavigationOperation, Route};
pub use self::realtime::{ChangeKind, Realtime, RealtimeOperation, RealtimeOutput};

pub use crux_core::render::Render;
pub use crux_http::Http;

use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub render: Render<Event>,
    pub realtime: Realtime<Event>,
    pub navigation: Navigation<Event>,
    pub audio: Audio<Event>,
}
