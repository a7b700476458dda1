//! Qualification upload: file resolution and multipart assembly.
//!
//! # Design
//! An upload names its files by logical reference. A [`FileSource`] turns a
//! reference into bytes, a filename and a content type. Every reference is
//! resolved before the body is assembled, so one bad file aborts the call
//! with nothing sent. Files are read into memory during resolution and their
//! handles are dropped immediately, whichever way the call ends.
//!
//! Two sources are provided: [`StorageFileSource`] for files already stored
//! under a directory, and [`InMemoryFileSource`] for files received in memory
//! (for example from an incoming form submission).

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use crate::encoding::MultipartBody;
use crate::error::SourceError;

pub const PLATFORM_KEY_FIELD: &str = "platform_key";
pub const PARTNER_ACCOUNT_FIELD: &str = "partner_account";

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Logical reference to a file, interpreted by a [`FileSource`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileRef(String);

impl FileRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FileRef {
    fn from(reference: &str) -> Self {
        Self::new(reference)
    }
}

impl From<String> for FileRef {
    fn from(reference: String) -> Self {
        Self(reference)
    }
}

/// A file ready to become a multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub trait FileSource: Send + Sync {
    /// Resolve the file registered under multipart field `field`.
    fn resolve(&self, field: &str, reference: &FileRef) -> Result<ResolvedFile, SourceError>;
}

fn guess_content_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first()
        .map_or_else(|| FALLBACK_CONTENT_TYPE.to_string(), |mime| mime.essence_str().to_string())
}

/// Files stored under a root directory, referenced by relative path.
#[derive(Debug, Clone)]
pub struct StorageFileSource {
    root: PathBuf,
}

impl StorageFileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileSource for StorageFileSource {
    fn resolve(&self, field: &str, reference: &FileRef) -> Result<ResolvedFile, SourceError> {
        let relative = Path::new(reference.as_str());
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(SourceError::OutsideRoot {
                field: field.to_string(),
                reference: reference.as_str().to_string(),
            });
        }

        let not_found = || SourceError::NotFound {
            field: field.to_string(),
            reference: reference.as_str().to_string(),
        };
        let path = self.root.join(relative);
        if !path.is_file() {
            return Err(not_found());
        }
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(not_found)?;

        let bytes = read_all(&path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => not_found(),
            _ => SourceError::Unreadable {
                field: field.to_string(),
                reference: reference.as_str().to_string(),
                reason: err.to_string(),
            },
        })?;

        Ok(ResolvedFile {
            content_type: guess_content_type(&filename),
            filename,
            bytes,
        })
    }
}

/// The handle is closed when this returns, on success or error.
fn read_all(path: &Path) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// A file received in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: &str, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.to_string(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }
}

/// Uploaded files keyed by reference.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFileSource {
    files: HashMap<FileRef, UploadedFile>,
}

impl InMemoryFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, reference: impl Into<FileRef>, file: UploadedFile) {
        self.files.insert(reference.into(), file);
    }

    pub fn with(mut self, reference: impl Into<FileRef>, file: UploadedFile) -> Self {
        self.insert(reference, file);
        self
    }
}

impl FileSource for InMemoryFileSource {
    fn resolve(&self, field: &str, reference: &FileRef) -> Result<ResolvedFile, SourceError> {
        let file = self.files.get(reference).ok_or_else(|| SourceError::NotFound {
            field: field.to_string(),
            reference: reference.as_str().to_string(),
        })?;
        Ok(ResolvedFile {
            filename: file.filename.clone(),
            content_type: file
                .content_type
                .clone()
                .unwrap_or_else(|| guess_content_type(&file.filename)),
            bytes: file.bytes.clone(),
        })
    }
}

/// Everything needed for one upload call. Field names become multipart part
/// names and are emitted in sorted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSpec {
    pub files: BTreeMap<String, FileRef>,
    pub partner_account: String,
    pub platform_key: String,
}

impl UploadSpec {
    pub fn new(partner_account: &str, platform_key: &str) -> Self {
        Self {
            files: BTreeMap::new(),
            partner_account: partner_account.to_string(),
            platform_key: platform_key.to_string(),
        }
    }

    pub fn file(mut self, field: &str, reference: impl Into<FileRef>) -> Self {
        self.files.insert(field.to_string(), reference.into());
        self
    }
}

/// Resolve every file in `spec`, stopping at the first failure.
pub fn validate(spec: &UploadSpec, source: &dyn FileSource) -> Result<Vec<(String, ResolvedFile)>, SourceError> {
    spec.files
        .iter()
        .map(|(field, reference)| source.resolve(field, reference).map(|file| (field.clone(), file)))
        .collect()
}

/// Metadata fields first, then one part per file.
pub fn assemble(spec: &UploadSpec, files: Vec<(String, ResolvedFile)>, body: MultipartBody) -> MultipartBody {
    let body = body
        .text(PLATFORM_KEY_FIELD, &spec.platform_key)
        .text(PARTNER_ACCOUNT_FIELD, &spec.partner_account);
    files.into_iter().fold(body, |body, (field, file)| {
        body.file(&field, &file.filename, &file.content_type, file.bytes)
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn storage_source_reads_file_and_guesses_type() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("license.pdf"), b"%PDF-1.4").unwrap();
        let source = StorageFileSource::new(dir.path());
        let file = source.resolve("license", &FileRef::from("license.pdf")).unwrap();
        assert_eq!(file.filename, "license.pdf");
        assert_eq!(file.content_type, "application/pdf");
        assert_eq!(file.bytes, b"%PDF-1.4");
    }

    #[test]
    fn storage_source_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = StorageFileSource::new(dir.path());
        let err = source.resolve("id_card", &FileRef::from("nope.png")).unwrap_err();
        assert_eq!(err.to_string(), "file not found: id_card (nope.png)");
    }

    #[test]
    fn storage_source_treats_directory_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let source = StorageFileSource::new(dir.path());
        assert!(matches!(
            source.resolve("f", &FileRef::from("sub")),
            Err(SourceError::NotFound { .. })
        ));
    }

    #[test]
    fn storage_source_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let source = StorageFileSource::new(dir.path());
        assert!(matches!(
            source.resolve("f", &FileRef::from("../etc/passwd")),
            Err(SourceError::OutsideRoot { .. })
        ));
        assert!(matches!(
            source.resolve("f", &FileRef::from("/etc/passwd")),
            Err(SourceError::OutsideRoot { .. })
        ));
    }

    #[test]
    fn unknown_extension_falls_back_to_octet_stream() {
        assert_eq!(guess_content_type("blob.zzqq"), FALLBACK_CONTENT_TYPE);
        assert_eq!(guess_content_type("photo.jpg"), "image/jpeg");
    }

    #[test]
    fn in_memory_source_prefers_declared_type() {
        let source = InMemoryFileSource::new()
            .with("a", UploadedFile::new("scan.bin", vec![1, 2]).with_content_type("image/png"));
        let file = source.resolve("front", &FileRef::from("a")).unwrap();
        assert_eq!(file.content_type, "image/png");
        assert!(source.resolve("back", &FileRef::from("b")).is_err());
    }

    #[test]
    fn validate_stops_at_first_missing_reference() {
        let source = InMemoryFileSource::new().with("present", UploadedFile::new("a.png", vec![0]));
        let spec = UploadSpec::new("acct", "pk")
            .file("a_front", "present")
            .file("b_back", "missing");
        let err = validate(&spec, &source).unwrap_err();
        assert_eq!(err.to_string(), "file not found: b_back (missing)");
    }

    #[test]
    fn assemble_orders_metadata_before_files() {
        let source = InMemoryFileSource::new()
            .with("1", UploadedFile::new("b.png", vec![1]))
            .with("2", UploadedFile::new("a.txt", vec![2]));
        let spec = UploadSpec::new("acct-9", "pk-1").file("zeta", "1").file("alpha", "2");
        let files = validate(&spec, &source).unwrap();
        let body = assemble(&spec, files, MultipartBody::with_boundary("B"));
        let names: Vec<&str> = body.parts().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["platform_key", "partner_account", "alpha", "zeta"]);
        assert_eq!(body.parts()[2].content_type.as_deref(), Some("text/plain"));
        assert_eq!(body.parts()[1].data, b"acct-9");
    }
}
