pub mod decay;
pub mod events;
pub mod mood;
pub mod pulse;
pub mod session_marker;
pub mod taxonomy;
pub mod watcher;

pub use events::{append_event, read_events, Event};
pub use mood::{read_mood, write_mood, Mood};
pub use pulse::{read_pulse, write_pulse, Pulse};
pub use session_marker::{
    create_session_marker, delete_session_marker, read_session_marker, session_is_active,
    SessionMarker,
};
pub use watcher::{FabricChange, FabricWatcher};
