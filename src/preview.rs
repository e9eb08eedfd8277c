use crate::frame::{FrameSource, Size};
use crate::platform::MediaStream;
use image::RgbaImage;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Where the live feed is shown. Also the frame source photos are taken from.
pub trait PreviewSink: FrameSource {
    fn attach(&self, stream: Arc<dyn MediaStream>);

    fn detach(&self);

    /// Id of the stream currently shown
    fn attached_stream_id(&self) -> Option<String>;
}

/// Preview that renders whatever stream it is attached to
#[derive(Default)]
pub struct VideoPreview {
    stream: RwLock<Option<Arc<dyn MediaStream>>>,
}

impl VideoPreview {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSource for VideoPreview {
    fn natural_size(&self) -> Size {
        self.stream
            .read()
            .as_ref()
            .map(|s| s.frame_size())
            .unwrap_or_default()
    }

    fn current_frame(&self) -> Option<RgbaImage> {
        self.stream.read().as_ref().and_then(|s| s.latest_frame())
    }
}

impl PreviewSink for VideoPreview {
    fn attach(&self, stream: Arc<dyn MediaStream>) {
        debug!("Preview attached to stream {}", stream.id());
        *self.stream.write() = Some(stream);
    }

    fn detach(&self) {
        if let Some(stream) = self.stream.write().take() {
            debug!("Preview detached from stream {}", stream.id());
        }
    }

    fn attached_stream_id(&self) -> Option<String> {
        self.stream.read().as_ref().map(|s| s.id().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SnapcamConfig;
    use crate::platform::synthetic::{SyntheticDevice, SyntheticPlatform};
    use crate::platform::{MediaDevices, StreamConstraints};
    use crate::stream::Selector;

    #[test]
    fn test_detached_preview_has_no_frame() {
        let preview = VideoPreview::new();
        assert_eq!(preview.natural_size(), Size::new(0, 0));
        assert!(preview.current_frame().is_none());
        assert!(preview.attached_stream_id().is_none());
    }

    #[tokio::test]
    async fn test_attached_preview_reports_stream_frames() {
        let platform = SyntheticPlatform::new(vec![
            SyntheticDevice::new("cam", "Cam").with_resolution(Size::new(320, 240))
        ]);
        let constraints = StreamConstraints::for_selector(
            &Selector::device("cam"),
            &SnapcamConfig::default().camera,
        );
        let stream = platform.get_user_media(&constraints).await.unwrap();
        let id = stream.id().to_string();

        let preview = VideoPreview::new();
        preview.attach(Arc::clone(&stream));
        assert_eq!(preview.attached_stream_id(), Some(id));
        assert_eq!(preview.natural_size(), Size::new(320, 240));
        let frame = preview.current_frame().unwrap();
        assert_eq!(frame.dimensions(), (320, 240));

        preview.detach();
        assert_eq!(preview.natural_size(), Size::new(0, 0));
        for track in stream.tracks() {
            track.stop();
        }
    }
}
