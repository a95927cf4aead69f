//! Application layer: the tree-mutation engine
//!
//! Group controllers, the move reconciler, root assembly and the session that
//! ties them together for the owning application.

pub mod assembler;
pub mod controller;
pub mod error;
pub mod events;
pub mod gesture;
pub mod reconciler;
pub mod session;

pub use assembler::{apply_gesture, apply_gestures, RootAssembler};
pub use controller::GroupController;
pub use error::{EngineError, EngineResult};
pub use events::{ChangeEvent, Emission, GroupUpdate, Notification};
pub use gesture::Gesture;
pub use reconciler::{MoveReconciler, SettledEdit};
pub use session::QueryBuilder;
