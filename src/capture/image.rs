//! Captured still image type

use image::RgbaImage;

use super::StillFrame;
use crate::domain::CoordinateSpace;
use crate::error::CaptureDeviceError;

/// A captured still with its encoded bytes, intrinsic size and (when the
/// bytes decode) the RGBA pixels for the loupe and the export
#[derive(Clone, Debug)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
    pub rgba: Option<RgbaImage>,
    width: u32,
    height: u32,
}

impl CapturedImage {
    /// Validate a device frame and learn its intrinsic dimensions.
    ///
    /// Decoded dimensions win over the ones the device reports. Bytes that do
    /// not decode are kept as long as the device reported a usable size.
    pub fn from_frame(frame: StillFrame) -> Result<Self, CaptureDeviceError> {
        if frame.bytes.is_empty() {
            return Err(CaptureDeviceError::InvalidFrame("empty frame".into()));
        }

        let rgba = match image::load_from_memory(&frame.bytes) {
            Ok(decoded) => Some(decoded.to_rgba8()),
            Err(err) => {
                log::warn!("Captured frame does not decode: {}", err);
                None
            }
        };

        let (width, height) = match &rgba {
            Some(img) => {
                if img.dimensions() != (frame.width, frame.height) {
                    log::warn!(
                        "Device reported {}x{} but frame decodes to {}x{}",
                        frame.width,
                        frame.height,
                        img.width(),
                        img.height()
                    );
                }
                img.dimensions()
            }
            None => (frame.width, frame.height),
        };

        if width == 0 || height == 0 {
            return Err(CaptureDeviceError::InvalidFrame(format!(
                "zero-sized frame {width}x{height}"
            )));
        }

        log::debug!("CapturedImage: {}x{} pixels", width, height);
        Ok(Self {
            bytes: frame.bytes,
            rgba,
            width,
            height,
        })
    }

    /// Get the width of the image
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the height of the image
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The image pixel coordinate space of this capture
    pub fn space(&self) -> CoordinateSpace {
        CoordinateSpace::image(self.width as f32, self.height as f32)
    }

    /// MIME type of the encoded bytes, JPEG when unknown
    pub fn mime_type(&self) -> &'static str {
        match image::guess_format(&self.bytes) {
            Ok(image::ImageFormat::Png) => "image/png",
            Ok(image::ImageFormat::WebP) => "image/webp",
            _ => "image/jpeg",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::image::encode_png;

    fn png_frame(width: u32, height: u32, reported: (u32, u32)) -> StillFrame {
        let img = RgbaImage::from_pixel(width, height, image::Rgba([10, 120, 30, 255]));
        StillFrame {
            bytes: encode_png(&img).unwrap(),
            width: reported.0,
            height: reported.1,
        }
    }

    #[test]
    fn test_decoded_dimensions_win() {
        let captured = CapturedImage::from_frame(png_frame(30, 24, (3000, 2400))).unwrap();
        assert_eq!((captured.width(), captured.height()), (30, 24));
        assert_eq!(captured.space(), CoordinateSpace::image(30.0, 24.0));
        assert_eq!(captured.mime_type(), "image/png");
        assert!(captured.rgba.is_some());
    }

    #[test]
    fn test_undecodable_bytes_use_reported_size() {
        let frame = StillFrame {
            bytes: vec![1, 2, 3, 4],
            width: 3000,
            height: 2400,
        };
        let captured = CapturedImage::from_frame(frame).unwrap();
        assert_eq!(captured.space(), CoordinateSpace::image(3000.0, 2400.0));
        assert!(captured.rgba.is_none());
        assert_eq!(captured.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_empty_or_zero_sized_frames_are_rejected() {
        let empty = StillFrame {
            bytes: vec![],
            width: 10,
            height: 10,
        };
        assert!(CapturedImage::from_frame(empty).is_err());

        let zero = StillFrame {
            bytes: vec![0xde, 0xad],
            width: 0,
            height: 10,
        };
        assert!(matches!(
            CapturedImage::from_frame(zero),
            Err(CaptureDeviceError::InvalidFrame(_))
        ));
    }
}
