use crate::TransferError;

/// Limits applied to a file before any network request is made.
#[derive(Debug, Clone)]
pub struct FileConstraints {
    /// Maximum file size in bytes.
    pub max_bytes: u64,
    /// Allowed file extensions, lowercase without the dot.
    /// An empty list allows any extension.
    pub allowed_extensions: Vec<String>,
}

impl Default for FileConstraints {
    fn default() -> Self {
        Self {
            // Admin uploads are images and short showcase videos.
            max_bytes: 256 * 1024 * 1024,
            allowed_extensions: Vec::new(),
        }
    }
}

impl FileConstraints {
    /// Restricts uploads to the given extensions (case-insensitive).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = extensions
            .into_iter()
            .map(|e| e.into().to_lowercase())
            .collect();
        self
    }

    /// Sets the maximum file size in bytes.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

/// Validates a file selection against `constraints`.
///
/// Zero-byte files are rejected here rather than uploaded as an empty
/// chunk; an empty marketing asset is never valid.
pub fn validate_file(
    file_name: &str,
    size: u64,
    constraints: &FileConstraints,
) -> Result<(), TransferError> {
    if file_name.is_empty() {
        return Err(TransferError::InvalidFileName("empty name".into()));
    }
    if size == 0 {
        return Err(TransferError::EmptyFile);
    }
    if size > constraints.max_bytes {
        return Err(TransferError::FileTooLarge {
            size,
            max: constraints.max_bytes,
        });
    }
    if !constraints.allowed_extensions.is_empty() {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, e)| e.to_lowercase())
            .unwrap_or_default();
        if !constraints.allowed_extensions.contains(&ext) {
            return Err(TransferError::UnsupportedType(file_name.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_file_within_limits() {
        let c = FileConstraints::default();
        assert!(validate_file("cover.webp", 1024, &c).is_ok());
    }

    #[test]
    fn rejects_empty_name() {
        let c = FileConstraints::default();
        assert!(matches!(
            validate_file("", 10, &c),
            Err(TransferError::InvalidFileName(_))
        ));
    }

    #[test]
    fn rejects_zero_byte_file() {
        let c = FileConstraints::default();
        assert!(matches!(
            validate_file("empty.png", 0, &c),
            Err(TransferError::EmptyFile)
        ));
    }

    #[test]
    fn rejects_oversized_file() {
        let c = FileConstraints::default().with_max_bytes(100);
        let err = validate_file("big.mp4", 101, &c).unwrap_err();
        assert!(matches!(
            err,
            TransferError::FileTooLarge { size: 101, max: 100 }
        ));
    }

    #[test]
    fn accepts_file_at_the_limit() {
        let c = FileConstraints::default().with_max_bytes(100);
        assert!(validate_file("ok.mp4", 100, &c).is_ok());
    }

    #[test]
    fn extension_allow_list_is_case_insensitive() {
        let c = FileConstraints::default().with_extensions(["png", "WEBP"]);
        assert!(validate_file("logo.PNG", 10, &c).is_ok());
        assert!(validate_file("logo.webp", 10, &c).is_ok());
    }

    #[test]
    fn rejects_disallowed_extension() {
        let c = FileConstraints::default().with_extensions(["png"]);
        assert!(matches!(
            validate_file("script.exe", 10, &c),
            Err(TransferError::UnsupportedType(_))
        ));
    }

    #[test]
    fn rejects_missing_extension_when_list_set() {
        let c = FileConstraints::default().with_extensions(["png"]);
        assert!(validate_file("noext", 10, &c).is_err());
    }

    #[test]
    fn empty_allow_list_accepts_anything() {
        let c = FileConstraints::default();
        assert!(validate_file("whatever.xyz", 10, &c).is_ok());
    }
}
