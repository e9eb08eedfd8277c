use crate::error::{EventBusError, FailureKind};
use crate::stream::Selector;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

/// Changes in a camera session that a presentation layer reacts to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// The device snapshot was replaced
    DevicesChanged { count: usize },
    /// A stream request was sent to the platform
    AcquisitionStarted { selector: Selector },
    /// A stream was granted and bound to the preview
    StreamAcquired { stream_id: String, selector: Selector },
    /// A stream's tracks were stopped
    StreamReleased { stream_id: String },
    /// The platform refused or could not provide a stream
    AcquisitionFailed { kind: FailureKind, reason: String },
    /// A stream arrived for a request that was no longer current and was stopped
    AcquisitionSuperseded { stream_id: String },
    /// The preview produced its first frame
    PreviewReady { stream_id: String },
    /// A still was captured
    PhotoCaptured { width: u32, height: u32, bytes: usize },
    /// The image sequence changed
    ImagesChanged { count: usize },
    /// Images were handed to the host
    SessionFinished { image_count: usize },
    /// The session was discarded
    SessionCancelled,
}

impl SessionEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            SessionEvent::DevicesChanged { count } => format!("{} camera(s) available", count),
            SessionEvent::AcquisitionStarted { selector } => {
                format!("Requesting stream ({})", selector)
            }
            SessionEvent::StreamAcquired {
                stream_id,
                selector,
            } => format!("Stream {} acquired ({})", stream_id, selector),
            SessionEvent::StreamReleased { stream_id } => {
                format!("Stream {} released", stream_id)
            }
            SessionEvent::AcquisitionFailed { kind, reason } => {
                format!("Acquisition failed ({:?}): {}", kind, reason)
            }
            SessionEvent::AcquisitionSuperseded { stream_id } => {
                format!("Stale stream {} discarded", stream_id)
            }
            SessionEvent::PreviewReady { stream_id } => {
                format!("Preview of stream {} ready", stream_id)
            }
            SessionEvent::PhotoCaptured {
                width,
                height,
                bytes,
            } => format!("Captured {}x{} still ({} bytes)", width, height, bytes),
            SessionEvent::ImagesChanged { count } => format!("{} image(s) in session", count),
            SessionEvent::SessionFinished { image_count } => {
                format!("Session finished with {} image(s)", image_count)
            }
            SessionEvent::SessionCancelled => "Session cancelled".to_string(),
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::DevicesChanged { .. } => "devices_changed",
            SessionEvent::AcquisitionStarted { .. } => "acquisition_started",
            SessionEvent::StreamAcquired { .. } => "stream_acquired",
            SessionEvent::StreamReleased { .. } => "stream_released",
            SessionEvent::AcquisitionFailed { .. } => "acquisition_failed",
            SessionEvent::AcquisitionSuperseded { .. } => "acquisition_superseded",
            SessionEvent::PreviewReady { .. } => "preview_ready",
            SessionEvent::PhotoCaptured { .. } => "photo_captured",
            SessionEvent::ImagesChanged { .. } => "images_changed",
            SessionEvent::SessionFinished { .. } => "session_finished",
            SessionEvent::SessionCancelled => "session_cancelled",
        }
    }
}

/// Broadcast bus carrying [`SessionEvent`]s to any number of observers
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        Self {
            debug_logging: true,
            ..Self::new(capacity)
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Subscribe with a filter
    pub fn subscribe_filtered<S: Into<String>>(&self, filter: EventFilter, name: S) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), filter, name.into())
    }

    /// Publish an event to all subscribers, returning how many received it
    pub fn publish(&self, event: SessionEvent) -> Result<usize, EventBusError> {
        if self.debug_logging {
            debug!("Publishing event: {}", event.description());
        }

        match &event {
            SessionEvent::AcquisitionFailed { .. } => warn!("{}", event.description()),
            SessionEvent::SessionFinished { .. } | SessionEvent::SessionCancelled => {
                info!("{}", event.description())
            }
            _ => {}
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Publish, treating the absence of subscribers as normal
    pub fn notify(&self, event: SessionEvent) {
        let kind = event.event_type();
        if let Err(e) = self.publish(event) {
            trace!("No observers for {} event: {}", kind, e);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    All,
    EventTypes(Vec<&'static str>),
    /// Stream lifecycle events only
    StreamLifecycle,
    Custom(fn(&SessionEvent) -> bool),
}

impl EventFilter {
    pub fn matches(&self, event: &SessionEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::StreamLifecycle => matches!(
                event,
                SessionEvent::AcquisitionStarted { .. }
                    | SessionEvent::StreamAcquired { .. }
                    | SessionEvent::StreamReleased { .. }
                    | SessionEvent::AcquisitionFailed { .. }
                    | SessionEvent::AcquisitionSuperseded { .. }
            ),
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<SessionEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(
        receiver: broadcast::Receiver<SessionEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next event that passes the filter
    pub async fn recv(&mut self) -> Result<SessionEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<SessionEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Drain everything currently queued that passes the filter
    pub fn drain(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::FacingMode;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let delivered = event_bus
            .publish(SessionEvent::DevicesChanged { count: 2 })
            .unwrap();
        assert_eq!(delivered, 1);

        let received = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, SessionEvent::DevicesChanged { count: 2 });
    }

    #[test]
    fn test_publish_without_subscribers() {
        let event_bus = EventBus::new(4);
        assert!(event_bus
            .publish(SessionEvent::SessionCancelled)
            .is_err());
        // notify swallows the missing-subscriber case
        event_bus.notify(SessionEvent::SessionCancelled);
        assert!(!event_bus.has_subscribers());
    }

    #[tokio::test]
    async fn test_filtered_receiver_skips_other_events() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe_filtered(EventFilter::StreamLifecycle, "test");

        event_bus.notify(SessionEvent::ImagesChanged { count: 1 });
        event_bus.notify(SessionEvent::StreamReleased {
            stream_id: "s1".to_string(),
        });

        let event = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.event_type(), "stream_released");
        assert!(receiver.try_recv().unwrap().is_none());
    }

    #[test]
    fn test_event_type_filter() {
        let filter = EventFilter::EventTypes(vec!["photo_captured"]);
        assert!(filter.matches(&SessionEvent::PhotoCaptured {
            width: 10,
            height: 20,
            bytes: 100,
        }));
        assert!(!filter.matches(&SessionEvent::AcquisitionStarted {
            selector: Selector::facing(FacingMode::User),
        }));
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(
            SessionEvent::PhotoCaptured {
                width: 540,
                height: 1080,
                bytes: 2048
            }
            .description(),
            "Captured 540x1080 still (2048 bytes)"
        );
        assert_eq!(
            SessionEvent::AcquisitionStarted {
                selector: Selector::device("cam")
            }
            .description(),
            "Requesting stream (device=cam)"
        );
    }

    #[test]
    fn test_drain_collects_queued_events() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe_filtered(EventFilter::All, "drain");
        event_bus.notify(SessionEvent::ImagesChanged { count: 1 });
        event_bus.notify(SessionEvent::ImagesChanged { count: 2 });
        assert_eq!(receiver.drain().len(), 2);
        assert!(receiver.drain().is_empty());
    }
}
