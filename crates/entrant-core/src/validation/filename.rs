const MAX_BASE_NAME_LENGTH: usize = 100;

/// Split a filename into its base name and trailing extension.
///
/// A leading dot does not start an extension (`.hidden` has none).
fn split_extension(filename: &str) -> (&str, Option<&str>) {
    match filename.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() => (base, Some(ext)),
        _ => (filename, None),
    }
}

/// Lowercased extension of `filename`, if it has a non-empty one.
pub fn file_extension(filename: &str) -> Option<String> {
    split_extension(filename)
        .1
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_lowercase())
}

/// Map an arbitrary user-supplied filename to a storage-key friendly name.
///
/// The base name keeps only `[A-Za-z0-9_-]`, with everything else replaced by
/// `_`, runs of `_` collapsed and leading/trailing `_` trimmed. An empty result
/// becomes `file`. The base is capped at 100 characters. The extension keeps
/// its original case.
pub fn sanitize_filename(filename: &str) -> String {
    let (base, extension) = split_extension(filename);

    let mut sanitized = String::with_capacity(base.len());
    for c in base.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            c
        } else {
            '_'
        };
        if c == '_' && sanitized.ends_with('_') {
            continue;
        }
        sanitized.push(c);
    }

    let mut sanitized = sanitized.trim_matches('_').to_string();
    if sanitized.is_empty() {
        sanitized = "file".to_string();
    }
    // ASCII only at this point, so byte truncation is char-safe
    sanitized.truncate(MAX_BASE_NAME_LENGTH);

    // Path separators or other junk after the last dot are dropped
    let extension: String = extension
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    if extension.is_empty() {
        sanitized
    } else {
        format!("{}.{}", sanitized, extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_safe_with_extension(name: &str, ext: &str) -> bool {
        let Some(base) = name.strip_suffix(&format!(".{}", ext)) else {
            return false;
        };
        !base.is_empty()
            && base
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }

    #[test]
    fn test_sanitize_unicode_and_punctuation() {
        let name = sanitize_filename("My Résumé!! v2.PDF");
        assert!(is_safe_with_extension(&name, "PDF"), "got {}", name);
        assert!(!name.contains("__"));
        assert_eq!(name, "My_R_sum_v2.PDF");
    }

    #[test]
    fn test_sanitize_keeps_simple_names() {
        assert_eq!(sanitize_filename("entry.zip"), "entry.zip");
        assert_eq!(sanitize_filename("my-entry_v1.pdf"), "my-entry_v1.pdf");
    }

    #[test]
    fn test_sanitize_empty_base_falls_back() {
        assert_eq!(sanitize_filename("!!!.png"), "file.png");
        assert_eq!(sanitize_filename(""), "file");
    }

    #[test]
    fn test_sanitize_truncates_base() {
        let long = format!("{}.zip", "a".repeat(250));
        let name = sanitize_filename(&long);
        assert_eq!(name, format!("{}.zip", "a".repeat(100)));
    }

    #[test]
    fn test_sanitize_path_traversal() {
        let name = sanitize_filename("../../etc/passwd");
        assert!(!name.contains('/'));
        assert!(!name.contains(".."));

        let name = sanitize_filename("report.pdf/../../secret");
        assert!(!name.contains('/'));
    }

    #[test]
    fn test_sanitize_dotfile_has_no_extension() {
        assert_eq!(sanitize_filename(".hidden"), "hidden");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("entry.ZIP"), Some("zip".to_string()));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(file_extension("README"), None);
        assert_eq!(file_extension("trailing."), None);
    }
}
