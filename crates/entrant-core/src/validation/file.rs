use super::filename::file_extension;

/// Content types accepted for competition uploads
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    // Archives
    "application/zip",
    "application/x-zip-compressed",
    // Documents
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    // Presentations
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    // Images
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/gif",
    "image/webp",
    "image/svg+xml",
];

const ACCEPTED_TYPES_LABEL: &str = "ZIP, PDF, PPTX, DOC, DOCX, PNG, JPG, GIF, WebP, SVG";

/// Content types a file with the given (lowercased) extension may declare
fn expected_content_types(extension: &str) -> Option<&'static [&'static str]> {
    let types: &'static [&'static str] = match extension {
        "zip" => &["application/zip", "application/x-zip-compressed"],
        "pdf" => &["application/pdf"],
        "doc" => &["application/msword"],
        "docx" => &["application/vnd.openxmlformats-officedocument.wordprocessingml.document"],
        "ppt" => &["application/vnd.ms-powerpoint"],
        "pptx" => &["application/vnd.openxmlformats-officedocument.presentationml.presentation"],
        "png" => &["image/png"],
        "jpg" | "jpeg" => &["image/jpeg", "image/jpg"],
        "gif" => &["image/gif"],
        "webp" => &["image/webp"],
        "svg" => &["image/svg+xml"],
        _ => return None,
    };
    Some(types)
}

/// Leading bytes expected for a content type. Office formats and SVG have no
/// entry and skip the check.
fn magic_number(content_type: &str) -> Option<&'static [u8]> {
    match content_type {
        "application/zip" | "application/x-zip-compressed" => Some(&[0x50, 0x4B]),
        "application/pdf" => Some(&[0x25, 0x50, 0x44, 0x46]),
        "image/png" => Some(&[0x89, 0x50, 0x4E, 0x47]),
        "image/jpeg" | "image/jpg" => Some(&[0xFF, 0xD8, 0xFF]),
        "image/gif" => Some(&[0x47, 0x49, 0x46]),
        "image/webp" => Some(&[0x52, 0x49, 0x46, 0x46]),
        _ => None,
    }
}

/// Strip parameters and lowercase ("image/PNG; charset=x" -> "image/png")
fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_lowercase()
}

fn format_mb(bytes: u64) -> String {
    let mb = bytes as f64 / 1024.0 / 1024.0;
    if mb.fract() == 0.0 {
        format!("{}", mb as u64)
    } else {
        format!("{:.2}", mb)
    }
}

/// Reasons an upload is rejected. The display text is shown to the uploader.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileValidationError {
    #[error("File appears to be empty. Please select a valid file.")]
    EmptyFile,

    #[error("File exceeds the {}MB limit. Current size: {:.2}MB", format_mb(*.max), *.size as f64 / 1024.0 / 1024.0)]
    FileTooLarge { size: u64, max: u64 },

    #[error("File type not supported. Accepted: {}", ACCEPTED_TYPES_LABEL)]
    UnsupportedContentType { content_type: String },

    #[error("File has no extension. Please ensure file has valid extension (e.g., .zip, .pdf).")]
    MissingExtension,

    #[error("File extension \".{extension}\" is not supported.")]
    UnsupportedExtension { extension: String },

    #[error("File extension \".{extension}\" doesn't match file type. File may be corrupted.")]
    ExtensionMismatch {
        extension: String,
        content_type: String,
    },

    #[error("File content doesn't match its type. File may be corrupted or mislabeled.")]
    SignatureMismatch { content_type: String },
}

/// Upload validator for competition files.
///
/// Checks run in a fixed order and stop at the first failure: size, content
/// type allow-list, extension/content-type consistency, then the magic number.
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_file_size: u64,
}

impl FileValidator {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Validate an uploaded buffer against its declared metadata.
    pub fn validate(
        &self,
        data: &[u8],
        filename: &str,
        content_type: &str,
        size: u64,
    ) -> Result<(), FileValidationError> {
        let content_type = normalize_content_type(content_type);

        self.validate_file_size(size)?;
        self.validate_content_type(&content_type)?;
        self.validate_extension_content_type_match(filename, &content_type)?;
        self.validate_magic_number(data, &content_type)?;

        Ok(())
    }

    pub fn validate_file_size(&self, size: u64) -> Result<(), FileValidationError> {
        if size == 0 {
            return Err(FileValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(FileValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    pub fn validate_content_type(&self, content_type: &str) -> Result<(), FileValidationError> {
        if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
            return Err(FileValidationError::UnsupportedContentType {
                content_type: content_type.to_string(),
            });
        }
        Ok(())
    }

    pub fn validate_extension_content_type_match(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<(), FileValidationError> {
        let extension = file_extension(filename).ok_or(FileValidationError::MissingExtension)?;

        let expected = expected_content_types(&extension).ok_or_else(|| {
            FileValidationError::UnsupportedExtension {
                extension: extension.clone(),
            }
        })?;

        if !expected.contains(&content_type) {
            return Err(FileValidationError::ExtensionMismatch {
                extension,
                content_type: content_type.to_string(),
            });
        }

        Ok(())
    }

    pub fn validate_magic_number(
        &self,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), FileValidationError> {
        let Some(expected) = magic_number(content_type) else {
            return Ok(());
        };

        let header = &data[..data.len().min(8)];
        if !header.starts_with(expected) {
            return Err(FileValidationError::SignatureMismatch {
                content_type: content_type.to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PDF: &[u8] = &[0x25, 0x50, 0x44, 0x46, 0x2D, 0x31, 0x2E, 0x34];
    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    const ZIP: &[u8] = &[0x50, 0x4B, 0x03, 0x04, 0x14, 0x00, 0x00, 0x00];

    fn test_validator() -> FileValidator {
        FileValidator::new(52_428_800)
    }

    #[test]
    fn test_validate_accepts_zip() {
        let mut data = ZIP.to_vec();
        data.resize(2 * 1024 * 1024, 0);
        let result = test_validator().validate(&data, "entry.zip", "application/zip", data.len() as u64);
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_file_too_large_mentions_sizes() {
        let validator = FileValidator::new(1024 * 1024);
        let err = validator
            .validate(PDF, "big.pdf", "application/pdf", 3 * 1024 * 1024)
            .unwrap_err();
        assert!(matches!(err, FileValidationError::FileTooLarge { .. }));
        let message = err.to_string();
        assert!(message.contains("1MB limit"), "{}", message);
        assert!(message.contains("3.00MB"), "{}", message);
    }

    #[test]
    fn test_validate_default_limit_message() {
        let err = test_validator()
            .validate_file_size(52_428_801)
            .unwrap_err();
        assert!(err.to_string().starts_with("File exceeds the 50MB limit"));
        assert!(test_validator().validate_file_size(52_428_800).is_ok());
    }

    #[test]
    fn test_validate_empty_regardless_of_type() {
        for (name, ct) in [
            ("a.pdf", "application/pdf"),
            ("a.exe", "application/x-msdownload"),
            ("noext", "text/plain"),
        ] {
            let err = test_validator().validate(&[], name, ct, 0).unwrap_err();
            assert_eq!(err, FileValidationError::EmptyFile);
        }
    }

    #[test]
    fn test_validate_unsupported_content_type() {
        let err = test_validator()
            .validate(b"MZ", "tool.exe", "application/x-msdownload", 2)
            .unwrap_err();
        assert!(matches!(err, FileValidationError::UnsupportedContentType { .. }));
        assert!(err.to_string().contains("ZIP, PDF, PPTX"));
    }

    #[test]
    fn test_validate_missing_and_unknown_extension() {
        let err = test_validator()
            .validate(PDF, "report", "application/pdf", 8)
            .unwrap_err();
        assert_eq!(err, FileValidationError::MissingExtension);

        let err = test_validator()
            .validate(PDF, "report.txt", "application/pdf", 8)
            .unwrap_err();
        assert_eq!(err.to_string(), "File extension \".txt\" is not supported.");
    }

    #[test]
    fn test_validate_extension_mismatch() {
        let pairs = [
            ("photo.png", "image/jpeg"),
            ("entry.pdf", "application/zip"),
            ("slides.pptx", "application/vnd.ms-powerpoint"),
            ("essay.doc", "application/pdf"),
        ];
        for (name, ct) in pairs {
            let err = test_validator().validate(PNG, name, ct, 8).unwrap_err();
            assert!(
                matches!(err, FileValidationError::ExtensionMismatch { .. }),
                "{} / {} gave {:?}",
                name,
                ct,
                err
            );
            assert!(err.to_string().contains("may be corrupted"));
        }
    }

    #[test]
    fn test_validate_extension_case_insensitive() {
        assert!(test_validator()
            .validate(PDF, "REPORT.PDF", "application/pdf", 8)
            .is_ok());
    }

    #[test]
    fn test_validate_magic_number() {
        assert!(test_validator()
            .validate(PDF, "doc.pdf", "application/pdf", 8)
            .is_ok());

        let err = test_validator()
            .validate(PDF, "doc.png", "image/png", 8)
            .unwrap_err();
        assert!(matches!(err, FileValidationError::SignatureMismatch { .. }));
    }

    #[test]
    fn test_validate_magic_number_short_buffer() {
        let err = test_validator()
            .validate(&[0x25, 0x50], "doc.pdf", "application/pdf", 2)
            .unwrap_err();
        assert!(matches!(err, FileValidationError::SignatureMismatch { .. }));
    }

    #[test]
    fn test_validate_skips_magic_for_office_and_svg() {
        let garbage = b"not really a docx";
        assert!(test_validator()
            .validate(
                garbage,
                "essay.docx",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                garbage.len() as u64
            )
            .is_ok());
        assert!(test_validator()
            .validate(b"<svg/>", "logo.svg", "image/svg+xml", 6)
            .is_ok());
    }

    #[test]
    fn test_validate_content_type_parameters_ignored() {
        assert!(test_validator()
            .validate(PNG, "pic.png", "Image/PNG; charset=binary", 8)
            .is_ok());
    }
}
