use anyhow::Result;
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::{Camera, nokhwa_initialize};
use tracing::{debug, error};

/// An open, streaming camera. Dropping it releases the device.
pub struct InputVideoStream {
    camera: Camera,
}

impl InputVideoStream {
    pub fn open(index: u32, fps: u32) -> Result<InputVideoStream> {
        nokhwa_initialize(|granted| {
            debug!("camera permission granted: {granted}");
        });

        let mut camera = Camera::new(
            CameraIndex::Index(index),
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
        )?;

        camera.set_frame_rate(fps)?;
        camera.open_stream()?;

        Ok(InputVideoStream { camera })
    }

    pub fn frame(&mut self) -> Result<RgbImage> {
        let frame = self.camera.frame()?;
        Ok(frame.decode_image::<RgbFormat>()?)
    }
}

impl Drop for InputVideoStream {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            error!("failed to stop camera stream: {e:?}");
        }
    }
}
