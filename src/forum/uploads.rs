use std::path::Path;

use crate::error::{AppError, AppResult};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif"];

/// An image attached to a post form, held in memory until it passes
/// validation. Nothing touches the filesystem before `store`.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Validate size, extension, and sniffed content type. Returns the
/// normalized (lowercase) extension on success.
pub fn validate(upload: &ImageUpload) -> AppResult<String> {
    if upload.data.len() > MAX_IMAGE_BYTES {
        return Err(AppError::InvalidInput(
            "Image file is too large. Maximum size is 5MB.".into(),
        ));
    }

    let ext = extension_of(&upload.filename).ok_or_else(|| {
        AppError::InvalidInput("Invalid file type. Only JPG, PNG, and GIF are allowed.".into())
    })?;

    // The declared extension is not trusted on its own; the leading bytes
    // must carry a known image signature.
    let head = &upload.data[..upload.data.len().min(512)];
    if sniff_content_type(head).is_none() {
        return Err(AppError::InvalidInput(
            "Invalid image type. Only JPG, PNG, and GIF are allowed.".into(),
        ));
    }

    Ok(ext)
}

/// Write a validated upload under the uploads directory as
/// `<user_id>_<unix_secs><ext>` and return the public path posts store.
pub fn store(uploads_dir: &Path, user_id: i64, upload: &ImageUpload) -> AppResult<String> {
    let ext = validate(upload)?;
    let timestamp = chrono::Utc::now().timestamp();
    let filename = format!("{}_{}{}", user_id, timestamp, ext);

    std::fs::create_dir_all(uploads_dir)?;
    std::fs::write(uploads_dir.join(&filename), &upload.data)?;

    Ok(format!("/static/uploads/{}", filename))
}

fn extension_of(filename: &str) -> Option<String> {
    let dot = filename.rfind('.')?;
    let ext = filename[dot..].to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Magic-byte detection for the three accepted formats, matched against
/// the first bytes of the file.
fn sniff_content_type(head: &[u8]) -> Option<&'static str> {
    if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if head.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
        Some("image/gif")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes() -> Vec<u8> {
        let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        data.extend_from_slice(&[0u8; 64]);
        data
    }

    fn upload(filename: &str, data: Vec<u8>) -> ImageUpload {
        ImageUpload {
            filename: filename.to_string(),
            data,
        }
    }

    #[test]
    fn accepts_valid_png() {
        let ext = validate(&upload("photo.PNG", png_bytes())).unwrap();
        assert_eq!(ext, ".png");
    }

    #[test]
    fn rejects_oversized_file() {
        let mut data = png_bytes();
        data.resize(MAX_IMAGE_BYTES + 1, 0);
        let err = validate(&upload("photo.png", data)).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref m) if m.contains("too large")));
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = validate(&upload("photo.bmp", png_bytes())).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn rejects_extension_content_mismatch() {
        // .png name, but no image signature in the bytes
        let err = validate(&upload("photo.png", b"not an image at all".to_vec())).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn sniffs_all_three_formats() {
        assert_eq!(sniff_content_type(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_content_type(&png_bytes()), Some("image/png"));
        assert_eq!(sniff_content_type(b"GIF89a..."), Some("image/gif"));
        assert_eq!(sniff_content_type(b"plain text"), None);
    }

    #[test]
    fn store_writes_file_and_returns_public_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = store(tmp.path(), 7, &upload("photo.png", png_bytes())).unwrap();
        assert!(path.starts_with("/static/uploads/7_"));
        assert!(path.ends_with(".png"));

        let name = path.rsplit('/').next().unwrap();
        assert!(tmp.path().join(name).exists());
    }

    #[test]
    fn store_rejects_invalid_upload_without_writing() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(store(tmp.path(), 7, &upload("x.png", b"nope".to_vec())).is_err());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
