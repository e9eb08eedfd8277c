use super::Selector;
use crate::platform::MediaStream;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Exclusive ownership of a granted stream.
///
/// Tracks are stopped by [`StreamHandle::stop`]. A handle dropped without
/// being stopped stops its tracks on the way out, so hardware is never left
/// engaged by a forgotten handle.
pub struct StreamHandle {
    stream: Arc<dyn MediaStream>,
    selector: Selector,
    stopped: bool,
}

impl StreamHandle {
    pub(crate) fn new(stream: Arc<dyn MediaStream>, selector: Selector) -> Self {
        Self {
            stream,
            selector,
            stopped: false,
        }
    }

    pub fn id(&self) -> &str {
        self.stream.id()
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn stream(&self) -> &Arc<dyn MediaStream> {
        &self.stream
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// True while any track is still live
    pub fn is_live(&self) -> bool {
        !self.stopped && self.stream.tracks().iter().any(|t| t.is_live())
    }

    /// Stop every track; a second call does nothing
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        let tracks = self.stream.tracks();
        for track in &tracks {
            track.stop();
        }
        self.stopped = true;
        debug!("Stopped {} track(s) of stream {}", tracks.len(), self.id());
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        if !self.stopped {
            warn!("Stream {} dropped while live, stopping its tracks", self.id());
            self.stop();
        }
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("id", &self.id())
            .field("selector", &self.selector)
            .field("stopped", &self.stopped)
            .finish()
    }
}
