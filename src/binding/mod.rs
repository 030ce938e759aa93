//! Platform binding seam.
//!
//! The allocator never talks to a graphics API. A [`PlatformBinding`] is told
//! when blocks appear, when mutable blocks need re-uploading, and when
//! single-frame blocks are recycled; it reads the staged bytes it is handed
//! and owns whatever GPU objects mirror them.
//!
//! [`RecordingBinding`] keeps those bytes in RAM and is used by the tests and
//! by hosts running without a GPU.

pub mod recording;
pub mod traits;

pub use recording::{BindingEvent, RecordingBinding};
pub use traits::{PlatformBinding, Upload};
