use crate::capture::CapturedImage;
use tracing::debug;

/// Ordered stills of the current session.
///
/// Images are identified only by position; removing one closes the gap.
#[derive(Debug, Clone, Default)]
pub struct ImageGallery {
    images: Vec<CapturedImage>,
}

impl ImageGallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, image: CapturedImage) {
        self.images.push(image);
        debug!("Gallery now holds {} image(s)", self.images.len());
    }

    /// Remove the image at `index`; an out-of-range index changes nothing
    pub fn remove_at(&mut self, index: usize) -> Option<CapturedImage> {
        if index >= self.images.len() {
            debug!(
                "Ignoring removal at {} from gallery of {}",
                index,
                self.images.len()
            );
            return None;
        }
        Some(self.images.remove(index))
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }

    /// Hand over every image, leaving the gallery empty
    pub fn take_all(&mut self) -> Vec<CapturedImage> {
        std::mem::take(&mut self.images)
    }

    pub fn get(&self, index: usize) -> Option<&CapturedImage> {
        self.images.get(index)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapturedImage> {
        self.images.iter()
    }

    pub fn to_vec(&self) -> Vec<CapturedImage> {
        self.images.clone()
    }

    /// Total encoded size of all images
    pub fn total_bytes(&self) -> usize {
        self.images.iter().map(CapturedImage::len).sum()
    }
}
