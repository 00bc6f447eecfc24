//! Content-type and extension mapping for supported photo formats.

const IMAGE_JPEG: &str = "image/jpeg";
const IMAGE_PNG: &str = "image/png";

/// Map an upload content type to the stored file extension.
/// Only jpg and png are supported.
pub fn mime_to_extension(content_type: Option<&str>) -> Option<&'static str> {
    match content_type {
        Some(IMAGE_JPEG) => Some("jpg"),
        Some(IMAGE_PNG) => Some("png"),
        _ => None,
    }
}

pub fn extension_to_mime_type(extension: &str) -> Option<&'static str> {
    match extension {
        "jpg" | "jpeg" => Some(IMAGE_JPEG),
        "png" => Some(IMAGE_PNG),
        _ => None,
    }
}

/// Lower-cased extension of a filename, if it has one.
pub fn get_extension(filename: &str) -> Option<String> {
    let (_, extension) = filename.rsplit_once('.')?;
    if extension.is_empty() {
        None
    } else {
        Some(extension.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_mapping() {
        assert_eq!(mime_to_extension(Some("image/jpeg")), Some("jpg"));
        assert_eq!(mime_to_extension(Some("image/png")), Some("png"));
        assert_eq!(mime_to_extension(Some("image/webp")), None);
        assert_eq!(mime_to_extension(None), None);
    }

    #[test]
    fn extension_of_filename() {
        assert_eq!(get_extension("4711_1.JPG").as_deref(), Some("jpg"));
        assert_eq!(get_extension("noextension"), None);
        assert_eq!(get_extension("trailingdot."), None);
    }
}
