//! Preview frames fetched from the camera's MJPEG endpoint.

use std::time::Duration;

use bytes::Bytes;
use image::DynamicImage;

/// Poll period while the camera is idle.
pub const IDLE_PREVIEW_PERIOD: Duration = Duration::from_millis(50);
/// Poll period while recording, to leave bandwidth to the recorder.
pub const RECORDING_PREVIEW_PERIOD: Duration = Duration::from_millis(200);

/// Preview poll period for the recording state at negotiation time.
pub fn preview_period(recording: bool) -> Duration {
    if recording {
        RECORDING_PREVIEW_PERIOD
    } else {
        IDLE_PREVIEW_PERIOD
    }
}

/// A decoded preview image and the JPEG it came from.
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    jpeg: Bytes,
    image: DynamicImage,
}

impl PreviewFrame {
    pub fn decode(jpeg: Bytes) -> Result<Self, image::ImageError> {
        let image = image::load_from_memory_with_format(&jpeg, image::ImageFormat::Jpeg)?;
        Ok(Self { jpeg, image })
    }

    pub fn jpeg(&self) -> &Bytes {
        &self.jpeg
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
