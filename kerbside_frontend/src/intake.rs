use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use lazy_static::lazy_static;
use log::warn;
use regex::Regex;
use reqwest::Url;
use thiserror::Error;
use uuid::Uuid;

/// Upload ceiling enforced client-side before any network call.
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Long edge above which an upload is resized before shipping.
const MAX_LONG_EDGE: u32 = 1600;
/// Byte count above which an upload is re-encoded even if small enough.
const COMPRESS_BYTE_THRESHOLD: usize = 1024 * 1024;
const JPEG_QUALITY: u8 = 80;
/// Previews are decoded once and downscaled for the texture cache.
const PREVIEW_EDGE: u32 = 512;

lazy_static! {
    static ref IMAGE_EXT_RE: Regex =
        Regex::new(r"(?i)\.(jpe?g|png|webp|gif)$").expect("image extension pattern");
}

/// Hostname fragments that mark a URL as image-hosting even without a file
/// extension in the path.
const IMAGE_HOST_HINTS: [&str; 6] = [
    "imgur.com",
    "unsplash.com",
    "cloudinary.com",
    "googleusercontent.com",
    "amazonaws.com",
    "supabase.co",
];

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("file is {size_mb:.1} MB, over the 10 MB limit")]
    TooLarge { size_mb: f64 },
    #[error("unsupported file type {0}; use JPEG, PNG, WebP, or GIF")]
    UnsupportedType(String),
    #[error("could not decode image: {0}")]
    Undecodable(String),
    #[error("could not read file: {0}")]
    Unreadable(String),
}

/// Decoded RGBA pixels sized for an egui texture.
#[derive(Clone, Debug)]
pub struct Preview {
    pub size: [usize; 2],
    pub pixels: Vec<u8>,
}

/// A locally selected file that passed validation: original bytes retained
/// for upload, preview retained for display until the file is removed.
#[derive(Clone, Debug)]
pub struct AcceptedImage {
    pub key: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub preview: Preview,
}

/// Validates and decodes one selected file. Failures carry a per-file message
/// and never abort the rest of the batch (the caller collects both sides).
pub fn ingest_file(path: &Path) -> Result<AcceptedImage, IntakeError> {
    let bytes =
        std::fs::read(path).map_err(|err| IntakeError::Unreadable(err.to_string()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    accept_bytes(&file_name, bytes)
}

pub fn accept_bytes(file_name: &str, bytes: Vec<u8>) -> Result<AcceptedImage, IntakeError> {
    if bytes.len() as u64 > MAX_IMAGE_BYTES {
        return Err(IntakeError::TooLarge {
            size_mb: bytes.len() as f64 / (1024.0 * 1024.0),
        });
    }
    // Sniff the content, not the extension; a renamed .exe stays rejected.
    let mime = match infer::get(&bytes).map(|kind| kind.mime_type()) {
        Some("image/jpeg") => "image/jpeg",
        Some("image/png") => "image/png",
        Some("image/webp") => "image/webp",
        Some("image/gif") => "image/gif",
        other => {
            return Err(IntakeError::UnsupportedType(
                other.unwrap_or("unknown").to_string(),
            ))
        }
    };
    let preview = decode_preview(&bytes).map_err(IntakeError::Undecodable)?;
    Ok(AcceptedImage {
        key: Uuid::new_v4().to_string(),
        file_name: file_name.to_string(),
        bytes,
        mime,
        preview,
    })
}

/// Decodes bytes into RGBA pixels, downscaled to the preview edge.
pub fn decode_preview(bytes: &[u8]) -> Result<Preview, String> {
    let decoded = image::load_from_memory(bytes).map_err(|err| err.to_string())?;
    let scaled = if decoded.width().max(decoded.height()) > PREVIEW_EDGE {
        decoded.thumbnail(PREVIEW_EDGE, PREVIEW_EDGE)
    } else {
        decoded
    };
    let rgba = scaled.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(Preview {
        size,
        pixels: rgba.into_raw(),
    })
}

/// Prepares an accepted image for upload: oversized or heavy stills are
/// resized and re-encoded as JPEG; GIFs pass through so animation survives.
/// Returns (bytes, content type, file extension).
pub fn compress_for_upload(image: &AcceptedImage) -> (Vec<u8>, &'static str, &'static str) {
    let ext = extension_for_mime(image.mime);
    if image.mime == "image/gif" {
        return (image.bytes.clone(), image.mime, ext);
    }
    let needs_reencode = image.bytes.len() >= COMPRESS_BYTE_THRESHOLD;
    let decoded = match image::load_from_memory(&image.bytes) {
        Ok(decoded) => decoded,
        Err(err) => {
            warn!("re-decode of {} failed, uploading original: {err}", image.file_name);
            return (image.bytes.clone(), image.mime, ext);
        }
    };
    let long_edge = decoded.width().max(decoded.height());
    if !needs_reencode && long_edge <= MAX_LONG_EDGE {
        return (image.bytes.clone(), image.mime, ext);
    }
    let resized = if long_edge > MAX_LONG_EDGE {
        decoded.thumbnail(MAX_LONG_EDGE, MAX_LONG_EDGE)
    } else {
        decoded
    };
    // JPEG has no alpha channel.
    let rgb = resized.to_rgb8();
    let mut out = Vec::new();
    match JpegEncoder::new_with_quality(&mut Cursor::new(&mut out), JPEG_QUALITY)
        .encode_image(&rgb)
    {
        Ok(()) => (out, "image/jpeg", "jpg"),
        Err(err) => {
            warn!("re-encode of {} failed, uploading original: {err}", image.file_name);
            (image.bytes.clone(), image.mime, ext)
        }
    }
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}

/// Syntactic URL validation plus the "looks like an image" heuristic. The
/// async load probe runs afterwards, off the UI thread.
pub fn validate_image_url(raw: &str) -> Result<Url, String> {
    let parsed = Url::parse(raw.trim()).map_err(|_| "not a valid URL".to_string())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err("only http(s) URLs are supported".to_string());
    }
    let by_extension = IMAGE_EXT_RE.is_match(parsed.path());
    let by_host = parsed
        .host_str()
        .map(|host| {
            IMAGE_HOST_HINTS.iter().any(|hint| host.ends_with(hint))
                || host.starts_with("cdn.")
                || host.starts_with("images.")
        })
        .unwrap_or(false);
    if by_extension || by_host {
        Ok(parsed)
    } else {
        Err("this does not look like an image URL".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, image::Rgba([80, 90, 100, 255]));
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .expect("encode png");
        out
    }

    #[test]
    fn oversize_files_get_a_size_specific_error() {
        let bytes = vec![0u8; (MAX_IMAGE_BYTES + 1) as usize];
        match accept_bytes("huge.jpg", bytes) {
            Err(IntakeError::TooLarge { size_mb }) => assert!(size_mb > 10.0),
            Err(other) => panic!("expected TooLarge, got {other:?}"),
            Ok(_) => panic!("expected TooLarge, got an accepted file"),
        }
    }

    #[test]
    fn allowed_type_under_ceiling_is_accepted_with_a_preview() {
        let accepted = accept_bytes("tiny.png", png_bytes(4, 4)).expect("accepted");
        assert_eq!(accepted.mime, "image/png");
        assert_eq!(accepted.preview.size, [4, 4]);
        assert!(!accepted.preview.pixels.is_empty());
        assert!(!accepted.key.is_empty());
    }

    #[test]
    fn non_image_bytes_are_rejected_by_content() {
        let err = accept_bytes("notes.png", b"plain text pretending".to_vec())
            .expect_err("rejected");
        assert!(matches!(err, IntakeError::UnsupportedType(_)));
    }

    #[test]
    fn large_previews_are_downscaled() {
        let preview = decode_preview(&png_bytes(1024, 16)).expect("preview");
        assert!(preview.size[0] <= PREVIEW_EDGE as usize);
    }

    #[test]
    fn small_images_upload_unmodified() {
        let accepted = accept_bytes("tiny.png", png_bytes(4, 4)).expect("accepted");
        let (bytes, mime, ext) = compress_for_upload(&accepted);
        assert_eq!(bytes, accepted.bytes);
        assert_eq!(mime, "image/png");
        assert_eq!(ext, "png");
    }

    #[test]
    fn wide_images_are_resized_and_reencoded() {
        let accepted = accept_bytes("wide.png", png_bytes(2000, 10)).expect("accepted");
        let (bytes, mime, ext) = compress_for_upload(&accepted);
        assert_eq!(mime, "image/jpeg");
        assert_eq!(ext, "jpg");
        let reloaded = image::load_from_memory(&bytes).expect("decode");
        assert!(reloaded.width() <= MAX_LONG_EDGE);
    }

    #[test]
    fn url_heuristic_accepts_extensions_and_known_hosts() {
        assert!(validate_image_url("https://shop.test/photos/a.JPG?w=600").is_ok());
        assert!(validate_image_url("https://i.imgur.com/abcd").is_ok());
        assert!(validate_image_url("https://images.market.test/items/42").is_ok());
    }

    #[test]
    fn url_validation_reports_each_failure_class() {
        assert_eq!(
            validate_image_url("not a url").unwrap_err(),
            "not a valid URL"
        );
        assert_eq!(
            validate_image_url("ftp://host.test/a.png").unwrap_err(),
            "only http(s) URLs are supported"
        );
        assert!(validate_image_url("https://shop.test/about.html").is_err());
    }
}
