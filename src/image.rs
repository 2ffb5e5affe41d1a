// src/image.rs
// Multimodal payload assembly - image references to chat content parts

use crate::error::{LingshuError, Result};
use crate::llm::ContentPart;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Largest decoded image accepted for inline encoding (20 MiB)
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// MIME type used when neither the bytes nor the file name identify the format
const FALLBACK_MIME: &str = "image/png";

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "tif", "tiff"];

/// Longest slice of a rejected argument echoed back in an error
const ECHO_CHARS: usize = 64;

/// An image reference as supplied by a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// Already base64-encoded payload without a data URI prefix
    Base64(String),
    /// Complete `data:<mime>;base64,<payload>` URI
    DataUri(String),
    /// Raw binary buffer
    Bytes(Vec<u8>),
    /// Local file to read and encode
    Path(PathBuf),
    /// http(s) URL, passed through for the backend to fetch
    Url(String),
}

impl ImageInput {
    /// Classify a string tool argument
    pub fn from_argument(raw: &str) -> Self {
        let value = raw.trim();
        let lower = value.to_ascii_lowercase();

        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(value.to_string())
        } else if lower.starts_with("data:") {
            Self::DataUri(value.to_string())
        } else if looks_like_path(value) {
            Self::Path(expand_home(value))
        } else {
            Self::Base64(value.to_string())
        }
    }

    /// Resolve into a content part that always declares its encoding.
    ///
    /// URLs pass through unresolved; everything else becomes a base64 data URI.
    pub fn to_content_part(&self) -> Result<ContentPart> {
        match self {
            Self::Url(url) => {
                if url.trim().is_empty() {
                    return Err(LingshuError::InvalidImage("image URL is empty".into()));
                }
                Ok(ContentPart::image_url(url.clone()))
            }
            Self::DataUri(uri) => {
                // Re-encode so the MIME type and payload are validated
                let (mime, bytes) = decode_data_uri(uri)?;
                Ok(ContentPart::image_url(encode_data_uri(&bytes, Some(&mime))?))
            }
            Self::Base64(encoded) => {
                // A missing path with base64-safe characters decodes to noise
                let bytes = decode_base64(encoded)?;
                if sniff_mime(&bytes).is_none() {
                    return Err(not_an_image(encoded));
                }
                Ok(ContentPart::image_url(encode_data_uri(&bytes, None)?))
            }
            Self::Bytes(bytes) => {
                check_size(bytes)?;
                if sniff_mime(bytes).is_none() {
                    return Err(LingshuError::InvalidImage(
                        "bytes are not a recognised image format".into(),
                    ));
                }
                Ok(ContentPart::image_url(encode_data_uri(bytes, None)?))
            }
            Self::Path(path) => {
                let bytes = read_image_file(path)?;
                let hint = mime_guess::from_path(path)
                    .first()
                    .filter(|m| m.type_() == mime_guess::mime::IMAGE)
                    .map(|m| m.essence_str().to_string());
                if sniff_mime(&bytes).is_none() && hint.is_none() {
                    return Err(LingshuError::InvalidImage(format!(
                        "image file {} is not a recognised image format",
                        path.display()
                    )));
                }
                debug!(path = %path.display(), bytes = bytes.len(), "Read image file");
                Ok(ContentPart::image_url(encode_data_uri(&bytes, hint.as_deref())?))
            }
        }
    }

    /// Short description for logs and result metadata (never the payload)
    pub fn describe(&self) -> String {
        match self {
            Self::Base64(s) => format!("base64 ({} chars)", s.len()),
            Self::DataUri(s) => format!("data URI ({} chars)", s.len()),
            Self::Bytes(b) => format!("bytes ({} bytes)", b.len()),
            Self::Path(p) => format!("file {}", p.display()),
            Self::Url(u) => format!("url {}", u),
        }
    }
}

/// Encode raw bytes as `data:<mime>;base64,<payload>`.
///
/// Sniffed magic bytes win over `mime_hint`; `image/png` is the final fallback.
pub fn encode_data_uri(bytes: &[u8], mime_hint: Option<&str>) -> Result<String> {
    check_size(bytes)?;
    let mime = sniff_mime(bytes)
        .or(mime_hint)
        .unwrap_or(FALLBACK_MIME);
    let encoded = BASE64.encode(bytes);
    if encoded.is_empty() {
        return Err(LingshuError::InvalidImage("encoding produced no data".into()));
    }
    Ok(format!("data:{};base64,{}", mime, encoded))
}

/// Split a base64 data URI into its MIME type and decoded bytes
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| LingshuError::InvalidImage("not a data URI".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| LingshuError::InvalidImage("data URI has no payload separator".into()))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| LingshuError::InvalidImage("data URI is not base64-encoded".into()))?;
    let mime = if mime.is_empty() { FALLBACK_MIME } else { mime };
    if !mime.to_ascii_lowercase().starts_with("image/") {
        return Err(LingshuError::InvalidImage(format!(
            "data URI declares {}, not an image type",
            mime
        )));
    }
    let bytes = decode_base64(payload)?;
    Ok((mime.to_string(), bytes))
}

fn not_an_image(value: &str) -> LingshuError {
    let value = value.trim();
    let echo: String = value.chars().take(ECHO_CHARS).collect();
    let ellipsis = if value.chars().count() > ECHO_CHARS { "..." } else { "" };
    LingshuError::InvalidImage(format!(
        "'{}{}' is neither a readable file nor base64 image data",
        echo, ellipsis
    ))
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(LingshuError::InvalidImage("image data is empty".into()));
    }
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| LingshuError::InvalidImage(format!("image is not valid base64: {}", e)))?;
    check_size(&bytes)?;
    Ok(bytes)
}

fn read_image_file(path: &Path) -> Result<Vec<u8>> {
    let meta = std::fs::metadata(path).map_err(|e| {
        LingshuError::InvalidImage(format!("cannot read image file {}: {}", path.display(), e))
    })?;
    if meta.len() as usize > MAX_IMAGE_BYTES {
        return Err(LingshuError::InvalidImage(format!(
            "image file {} is {} bytes, limit is {}",
            path.display(),
            meta.len(),
            MAX_IMAGE_BYTES
        )));
    }
    std::fs::read(path).map_err(|e| {
        LingshuError::InvalidImage(format!("cannot read image file {}: {}", path.display(), e))
    })
}

fn check_size(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(LingshuError::InvalidImage("image data is empty".into()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(LingshuError::InvalidImage(format!(
            "image is {} bytes, limit is {}",
            bytes.len(),
            MAX_IMAGE_BYTES
        )));
    }
    Ok(())
}

/// Identify common image formats from their magic bytes
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.starts_with(b"BM") {
        Some("image/bmp")
    } else if bytes.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || bytes.starts_with(&[0x4D, 0x4D, 0x00, 0x2A]) {
        Some("image/tiff")
    } else {
        None
    }
}

fn looks_like_path(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    if Path::new(value).is_file() {
        return true;
    }
    if value.starts_with("./")
        || value.starts_with("../")
        || value.starts_with('~')
        || value.starts_with(".\\")
    {
        return true;
    }
    // Base64 never contains '.', so a file extension is a reliable signal
    let has_image_ext = Path::new(value)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    if has_image_ext {
        return true;
    }
    // JPEG base64 starts with "/9j/", so a leading slash alone is ambiguous
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    value.starts_with('/') && BASE64.decode(compact.as_bytes()).is_err()
}

fn expand_home(value: &str) -> PathBuf {
    if let Some(rest) = value.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ImageUrl;
    use std::io::Write;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];
    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    fn url_of(part: &ContentPart) -> &str {
        match part {
            ContentPart::ImageUrl { image_url: ImageUrl { url } } => url,
            ContentPart::Text { .. } => panic!("expected image part"),
        }
    }

    #[test]
    fn test_bytes_round_trip() {
        let original: Vec<u8> = JPEG_HEADER.iter().copied().chain(0..=255u8).collect();
        let part = ImageInput::Bytes(original.clone()).to_content_part().unwrap();
        let (mime, decoded) = decode_data_uri(url_of(&part)).unwrap();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_url_passes_through() {
        let part = ImageInput::from_argument("https://example.org/chest.png")
            .to_content_part()
            .unwrap();
        assert_eq!(url_of(&part), "https://example.org/chest.png");
    }

    #[test]
    fn test_base64_gets_data_uri_prefix() {
        let encoded = BASE64.encode(PNG_HEADER);
        let part = ImageInput::from_argument(&encoded).to_content_part().unwrap();
        assert_eq!(url_of(&part), format!("data:image/png;base64,{}", encoded));
    }

    #[test]
    fn test_jpeg_base64_is_not_mistaken_for_path() {
        let encoded = BASE64.encode(JPEG_HEADER);
        assert!(encoded.starts_with("/9j/"));
        let input = ImageInput::from_argument(&encoded);
        assert!(matches!(input, ImageInput::Base64(_)));
        let part = input.to_content_part().unwrap();
        assert!(url_of(&part).starts_with("data:image/jpeg;base64,/9j/"));
    }

    #[test]
    fn test_missing_absolute_path_is_path() {
        let input = ImageInput::from_argument("/no/such/dir/scan");
        assert!(matches!(input, ImageInput::Path(_)));
    }

    #[test]
    fn test_data_uri_is_preserved() {
        let uri = format!("data:image/jpeg;base64,{}", BASE64.encode(JPEG_HEADER));
        let input = ImageInput::from_argument(&uri);
        assert!(matches!(input, ImageInput::DataUri(_)));
        let part = input.to_content_part().unwrap();
        assert_eq!(url_of(&part), uri);
    }

    #[test]
    fn test_unknown_bytes_fall_back_to_png() {
        let uri = encode_data_uri(b"not an image header", None).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        let uri = encode_data_uri(b"not an image header", Some("image/webp")).unwrap();
        assert!(uri.starts_with("data:image/webp;base64,"));
    }

    #[test]
    fn test_empty_inputs_are_invalid_image() {
        for input in [
            ImageInput::from_argument(""),
            ImageInput::from_argument("   "),
            ImageInput::Bytes(Vec::new()),
            ImageInput::Url(String::new()),
            ImageInput::DataUri("data:image/png;base64,".into()),
            ImageInput::DataUri("data:text/html;base64,PGh0bWw+".into()),
        ] {
            let err = input.to_content_part().unwrap_err();
            assert!(matches!(err, LingshuError::InvalidImage(_)), "{:?}", input);
        }
    }

    #[test]
    fn test_non_image_data_uri_rejected() {
        let err = decode_data_uri("data:application/pdf;base64,JVBERi0=").unwrap_err();
        assert!(err.to_string().contains("application/pdf"));
        // An empty MIME still defaults to PNG
        let uri = format!("data:;base64,{}", BASE64.encode(PNG_HEADER));
        assert_eq!(decode_data_uri(&uri).unwrap().0, "image/png");
    }

    #[test]
    fn test_missing_path_decoding_as_base64_is_invalid_image() {
        for value in ["/mnt/img1234", "scans/chest1"] {
            assert!(BASE64.decode(value).is_ok(), "{value} should decode");
            let err = ImageInput::from_argument(value).to_content_part().unwrap_err();
            assert!(matches!(err, LingshuError::InvalidImage(_)), "{value}");
            assert!(err.to_string().contains("neither a readable file"), "{err}");
        }
    }

    #[test]
    fn test_unrecognised_bytes_rejected() {
        let err = ImageInput::Bytes(b"not an image header".to_vec())
            .to_content_part()
            .unwrap_err();
        assert!(matches!(err, LingshuError::InvalidImage(_)));
    }

    #[test]
    fn test_dicom_file_is_invalid_image() {
        let mut file = tempfile::Builder::new().suffix(".dcm").tempfile().unwrap();
        let mut dicom = vec![0u8; 128];
        dicom.extend_from_slice(b"DICM");
        file.write_all(&dicom).unwrap();

        let err = ImageInput::Path(file.path().to_path_buf())
            .to_content_part()
            .unwrap_err();
        assert!(matches!(err, LingshuError::InvalidImage(_)));
        assert!(err.to_string().contains("not a recognised image format"));
    }

    #[test]
    fn test_bad_base64_is_invalid_image() {
        let err = ImageInput::Base64("@@not base64@@".into())
            .to_content_part()
            .unwrap_err();
        assert!(matches!(err, LingshuError::InvalidImage(_)));
    }

    #[test]
    fn test_missing_file_is_invalid_image() {
        let input = ImageInput::from_argument("./definitely/missing/lung.jpeg");
        assert!(matches!(input, ImageInput::Path(_)));
        let err = input.to_content_part().unwrap_err();
        assert!(matches!(err, LingshuError::InvalidImage(_)));
        assert!(err.to_string().contains("cannot read image file"));
    }

    #[test]
    fn test_file_is_read_and_sniffed() {
        let mut file = tempfile::Builder::new().suffix(".img").tempfile().unwrap();
        file.write_all(PNG_HEADER).unwrap();

        let input = ImageInput::from_argument(file.path().to_str().unwrap());
        assert!(matches!(input, ImageInput::Path(_)));
        let part = input.to_content_part().unwrap();
        let (mime, bytes) = decode_data_uri(url_of(&part)).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, PNG_HEADER);
    }

    #[test]
    fn test_oversized_bytes_rejected() {
        let big = vec![0u8; MAX_IMAGE_BYTES + 1];
        let err = encode_data_uri(&big, None).unwrap_err();
        assert!(matches!(err, LingshuError::InvalidImage(_)));
    }

    #[test]
    fn test_sniff_formats() {
        assert_eq!(sniff_mime(PNG_HEADER), Some("image/png"));
        assert_eq!(sniff_mime(JPEG_HEADER), Some("image/jpeg"));
        assert_eq!(sniff_mime(b"GIF89a...."), Some("image/gif"));
        assert_eq!(sniff_mime(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_mime(b"plain"), None);
    }

    #[test]
    fn test_describe_never_contains_payload() {
        let input = ImageInput::Base64("QUJDRA==".into());
        assert!(!input.describe().contains("QUJDRA"));
    }
}
