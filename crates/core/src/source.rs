//! Content provider abstraction for manifest retrieval.
//!
//! The [`ContentProvider`] trait decouples parsing from I/O. The resolver
//! only ever asks for the text behind a manifest id; whether that id is a
//! local path, a `file:` URL or an `http(s)` URL is the provider's concern.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Supplies the text of a manifest given its id (path or URL).
pub trait ContentProvider {
    fn get_content(&self, manifest_id: &str) -> io::Result<String>;

    /// Canonical identity of a manifest, used to recognise the same manifest
    /// reached through different ids (symlinks). `None` when the provider
    /// knows nothing better than the id itself.
    fn canonicalize(&self, _manifest_id: &str) -> Option<String> {
        None
    }
}

/// Closures are providers, which makes substituting fetch behaviour in tests
/// a one-liner.
impl<F> ContentProvider for F
where
    F: Fn(&str) -> io::Result<String>,
{
    fn get_content(&self, manifest_id: &str) -> io::Result<String> {
        self(manifest_id)
    }
}

/// `true` when the id names a remote or `file:` URL rather than a plain path.
pub fn is_remote(manifest_id: &str) -> bool {
    let lower = manifest_id.get(..6).unwrap_or(manifest_id).to_ascii_lowercase();
    lower.starts_with("http:") || lower.starts_with("https:") || lower.starts_with("file:")
}

/// Decode manifest bytes: UTF-8 with an optional BOM, or UTF-16 with a BOM.
pub fn decode_manifest(bytes: &[u8]) -> io::Result<String> {
    let invalid = |e: String| io::Error::new(io::ErrorKind::InvalidData, e);
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8(rest.to_vec()).map_err(|e| invalid(e.to_string()));
    }
    let utf16 = |rest: &[u8], from: fn([u8; 2]) -> u16| -> io::Result<String> {
        if rest.len() % 2 != 0 {
            return Err(invalid("odd number of bytes in UTF-16 content".to_owned()));
        }
        let units: Vec<u16> = rest.chunks_exact(2).map(|c| from([c[0], c[1]])).collect();
        String::from_utf16(&units).map_err(|e| invalid(e.to_string()))
    };
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return utf16(rest, u16::from_be_bytes);
    }
    String::from_utf8(bytes.to_vec()).map_err(|e| invalid(e.to_string()))
}

/// Normalize a path by resolving `.` and `..` components without touching
/// the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                } else if !matches!(components.last(), Some(Component::RootDir)) {
                    components.push(component);
                }
            }
            other => components.push(other),
        }
    }
    components.iter().collect()
}

/// Local paths and `file:` URLs.
pub struct FileSystemProvider;

impl FileSystemProvider {
    fn local_path(manifest_id: &str) -> io::Result<PathBuf> {
        if !manifest_id.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("file:")) {
            return Ok(PathBuf::from(manifest_id));
        }
        let url = url::Url::parse(manifest_id)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
        match url.host_str() {
            None | Some("") | Some("localhost") => {}
            Some(host) => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("non-local file URIs are not supported: host '{}'", host),
                ))
            }
        }
        url.to_file_path().map_err(|()| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot convert '{}' to a local path", manifest_id),
            )
        })
    }
}

impl ContentProvider for FileSystemProvider {
    fn get_content(&self, manifest_id: &str) -> io::Result<String> {
        let path = Self::local_path(manifest_id)?;
        debug!(path = %path.display(), "reading manifest");
        decode_manifest(&std::fs::read(path)?)
    }

    fn canonicalize(&self, manifest_id: &str) -> Option<String> {
        let path = Self::local_path(manifest_id).ok()?;
        let canon = std::fs::canonicalize(path).ok()?;
        Some(canon.to_string_lossy().into_owned())
    }
}

/// `http(s)` URLs, fetched with a blocking `ureq` agent.
#[cfg(feature = "remote")]
pub struct HttpProvider {
    agent: ureq::Agent,
}

#[cfg(feature = "remote")]
impl Default for HttpProvider {
    fn default() -> Self {
        HttpProvider {
            agent: ureq::Agent::new_with_defaults(),
        }
    }
}

#[cfg(feature = "remote")]
impl ContentProvider for HttpProvider {
    fn get_content(&self, manifest_id: &str) -> io::Result<String> {
        debug!("GET {manifest_id}");
        let response = self
            .agent
            .get(manifest_id)
            .call()
            .map_err(|e| io::Error::other(format!("GET {}: {}", manifest_id, e)))?;
        let bytes = response
            .into_body()
            .read_to_vec()
            .map_err(|e| io::Error::other(format!("error reading response body: {}", e)))?;
        decode_manifest(&bytes)
    }
}

/// Remote ids go over HTTP, everything else to the filesystem.
#[derive(Default)]
pub struct DefaultProvider {
    #[cfg(feature = "remote")]
    http: HttpProvider,
}

impl ContentProvider for DefaultProvider {
    fn get_content(&self, manifest_id: &str) -> io::Result<String> {
        let lower = manifest_id.get(..8).unwrap_or(manifest_id).to_ascii_lowercase();
        if lower.starts_with("http:") || lower.starts_with("https:") {
            #[cfg(feature = "remote")]
            {
                return self.http.get_content(manifest_id);
            }
            #[cfg(not(feature = "remote"))]
            {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("remote manifests need the `remote` feature: {}", manifest_id),
                ));
            }
        }
        FileSystemProvider.get_content(manifest_id)
    }

    fn canonicalize(&self, manifest_id: &str) -> Option<String> {
        let lower = manifest_id.get(..8).unwrap_or(manifest_id).to_ascii_lowercase();
        if lower.starts_with("http:") || lower.starts_with("https:") {
            return None;
        }
        FileSystemProvider.canonicalize(manifest_id)
    }
}

/// In-memory provider for embedding and tests. Local ids are normalized
/// (`./a/../b.txt` == `b.txt`); URLs are matched verbatim.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    files: HashMap<String, String>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, manifest_id: &str, content: &str) -> Self {
        self.insert(manifest_id, content);
        self
    }

    pub fn insert(&mut self, manifest_id: &str, content: &str) {
        self.files.insert(Self::key(manifest_id), content.to_owned());
    }

    fn key(manifest_id: &str) -> String {
        if is_remote(manifest_id) {
            manifest_id.to_owned()
        } else {
            normalize_path(Path::new(manifest_id))
                .to_string_lossy()
                .into_owned()
        }
    }
}

impl ContentProvider for InMemoryProvider {
    fn get_content(&self, manifest_id: &str) -> io::Result<String> {
        self.files.get(&Self::key(manifest_id)).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("manifest not found in memory: {}", manifest_id),
            )
        })
    }
}
