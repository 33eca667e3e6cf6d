//! File-bearing MIME parts.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{GmailError, Result};

/// One decoded attachment of a [`Message`](super::message::Message).
///
/// The payload has every transfer encoding reversed; it is exactly the
/// bytes of the attached file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Decoded filename (RFC 2047 / RFC 2231 resolved). Generated if the
    /// part carried no name.
    pub name: String,

    /// MIME content type, lowercase (e.g. `"application/pdf"`).
    pub content_type: String,

    /// Decoded payload.
    pub content: Vec<u8>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            content,
        }
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Payload size in kilobytes (1000 bytes), rounded to nearest.
    pub fn size_kb(&self) -> u64 {
        (self.content.len() as u64 + 500) / 1000
    }

    /// Write the payload to disk and return the path written.
    ///
    /// - `None`: `<name>` in the current directory
    /// - a directory: `<dir>/<name>`
    /// - anything else: that exact path
    ///
    /// Only the final component of the attachment name is used, so a name
    /// like `../../etc/passwd` lands as `passwd` inside the target.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let target = match path {
            None => PathBuf::from(self.file_name()?),
            Some(dir) if dir.is_dir() => dir.join(self.file_name()?),
            Some(file) => file.to_path_buf(),
        };

        let mut file = File::create(&target).map_err(|e| GmailError::io(&target, e))?;
        file.write_all(&self.content)
            .map_err(|e| GmailError::io(&target, e))?;
        file.flush().map_err(|e| GmailError::io(&target, e))?;

        tracing::debug!(path = %target.display(), bytes = self.size(), "Saved attachment");
        Ok(target)
    }

    /// The attachment name reduced to a single path component.
    fn file_name(&self) -> Result<&str> {
        Path::new(&self.name)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| GmailError::InvalidPath(self.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(name: &str, len: usize) -> Attachment {
        Attachment::new(name, "application/octet-stream", vec![7u8; len])
    }

    #[test]
    fn test_sizes() {
        let a = attachment("a.bin", 1499);
        assert_eq!(a.size(), 1499);
        assert_eq!(a.size_kb(), 1);
        assert_eq!(attachment("b.bin", 1500).size_kb(), 2);
        assert_eq!(attachment("c.bin", 0).size_kb(), 0);
    }

    #[test]
    fn test_save_into_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let a = attachment("report.pdf", 10);
        let path = a.save(Some(tmp.path())).unwrap();
        assert_eq!(path, tmp.path().join("report.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![7u8; 10]);
    }

    #[test]
    fn test_save_to_explicit_file() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("renamed.bin");
        let path = attachment("report.pdf", 3).save(Some(&target)).unwrap();
        assert_eq!(path, target);
        assert_eq!(std::fs::read(&target).unwrap().len(), 3);
    }

    #[test]
    fn test_save_strips_directory_components() {
        let tmp = tempfile::tempdir().unwrap();
        let path = attachment("../../evil.sh", 1).save(Some(tmp.path())).unwrap();
        assert_eq!(path, tmp.path().join("evil.sh"));
    }

    #[test]
    fn test_save_rejects_unusable_name() {
        let tmp = tempfile::tempdir().unwrap();
        let err = attachment("..", 1).save(Some(tmp.path())).unwrap_err();
        assert!(matches!(err, GmailError::InvalidPath(_)));
    }
}
