pub mod db;
pub mod engine;
pub mod service;
pub mod tracking;

pub use db::{ConfigError, Macro, MacroRegistry, RegistryEditError, RegistryStore, MACROS_FILE};
pub use engine::{extract, finger_state, FingerState, GestureSignature, HandLandmarks, Landmark};
pub use service::{
    DispatchOutcome, DispatchState, ExecutionHandle, GestureDispatcher, OutcomeObserver,
    SkipReason, DEFAULT_COOLDOWN,
};
pub use tracking::{FrameSource, JsonLinesLandmarks, PoseEstimator, RecordedPose, TrackingLoop};
