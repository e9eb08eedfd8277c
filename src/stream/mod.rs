//! Stream lifecycle: which camera is open, and the guarantee that at most one is.

pub mod handle;
pub mod selector;
pub mod session;


pub use handle::StreamHandle;
pub use selector::{FacingMode, Selector};
pub use session::{AcquireOutcome, CapabilityFlags, StreamSession};
