pub mod actions;
pub mod hand_gestures;
pub mod logging;
pub mod macros;
pub mod settings;
