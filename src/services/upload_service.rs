use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use base64::{engine::general_purpose, Engine as _};
use log::{debug, info, warn};
use mime::Mime;
use regex::Regex;
use serde::Serialize;

use crate::errors::BlogError;
use crate::repositories::MAX_HEAD_IMAGE_LEN;
use crate::services::clock::Clock;

/// How many suffixed names to try when a timestamped name is already taken.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Upper bound on a sanitized name. Stored names add a 20-digit stamp, an
/// optional `-NN` retry suffix and `_`; the URL adds `/uploads/`.
pub const MAX_SAFE_NAME_LEN: usize = 150;

/// Extensions longer than this are treated as part of the stem.
const MAX_EXTENSION_LEN: usize = 16;

const _: () = assert!("/uploads/".len() + 20 + 3 + 1 + MAX_SAFE_NAME_LEN <= MAX_HEAD_IMAGE_LEN);

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("valid filename regex"));

/// Where uploaded bytes end up.
pub trait BlobStore: Send + Sync {
    /// Writes a new blob. Fails with `ErrorKind::AlreadyExists` if the name
    /// is taken; existing blobs are never overwritten.
    fn put_new(&self, name: &str, bytes: &[u8]) -> io::Result<()>;

    fn get(&self, name: &str) -> io::Result<Option<Vec<u8>>>;

    fn remove(&self, name: &str) -> io::Result<()>;
}

/// Blobs as plain files in one directory, world-readable and not executable.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }
}

impl BlobStore for LocalBlobStore {
    fn put_new(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.root.join(name);
        let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        let written = file.write_all(bytes).and_then(|()| file.sync_all());

        #[cfg(unix)]
        let written = written.and_then(|()| {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o644))
        });
        remove_on_error(&path, written)
    }

    fn get(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.root.join(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        match fs::remove_file(self.root.join(name)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Drops a half-written file so a failed put leaves nothing behind.
fn remove_on_error(path: &Path, written: io::Result<()>) -> io::Result<()> {
    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(path) {
            warn!("failed to remove partial upload {}: {}", path.display(), cleanup);
        }
        return Err(e);
    }
    Ok(())
}

/// A stored file and the public path it is served from.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoredUpload {
    pub name: String,
    pub url: String,
}

pub struct UploadService {
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    max_bytes: usize,
}

impl UploadService {
    pub fn new(blobs: Arc<dyn BlobStore>, clock: Arc<dyn Clock>, max_bytes: usize) -> Self {
        Self { blobs, clock, max_bytes }
    }

    /// Saves `blob` as `<timestamp>_<sanitized name>` and returns its reference.
    pub fn store(&self, original_name: &str, blob: Option<&[u8]>) -> Result<StoredUpload, BlogError> {
        let blob = match blob {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return Err(BlogError::InvalidUpload("No file uploaded".to_string())),
        };
        if original_name.trim().is_empty() {
            return Err(BlogError::InvalidUpload("No selected file".to_string()));
        }
        if blob.len() > self.max_bytes {
            return Err(BlogError::TooLarge { limit: self.max_bytes });
        }

        let safe_name = secure_filename(original_name);
        if safe_name.is_empty() {
            return Err(BlogError::InvalidUpload("Invalid file name".to_string()));
        }

        let stamp = self.clock.now().format("%Y%m%d%H%M%S%6f").to_string();
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{}_{}", stamp, safe_name)
            } else {
                format!("{}-{}_{}", stamp, attempt, safe_name)
            };
            match self.blobs.put_new(&name, blob) {
                Ok(()) => {
                    info!("stored upload {} ({} bytes)", name, blob.len());
                    let url = format!("/uploads/{}", urlencoding::encode(&name));
                    return Ok(StoredUpload { name, url });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("upload name {} taken, retrying", name);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(BlogError::Internal(format!(
            "could not find a free name for {}",
            safe_name
        )))
    }

    /// Bytes and content type of a stored file.
    pub fn retrieve(&self, name: &str) -> Result<(Vec<u8>, Mime), BlogError> {
        // Only bare file names inside the upload directory are served.
        let is_bare = Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
        if name.is_empty() || !is_bare || name.starts_with('.') {
            return Err(BlogError::NotFound("File"));
        }
        let bytes = self.blobs.get(name)?.ok_or(BlogError::NotFound("File"))?;
        Ok((bytes, content_type_for(name)))
    }

    /// Best-effort removal, used to undo a store whose follow-up write failed.
    pub fn discard(&self, name: &str) {
        if let Err(e) = self.blobs.remove(name) {
            warn!("failed to remove upload {}: {}", name, e);
        }
    }

    /// Decodes a base64 payload, with or without a `data:...;base64,` prefix.
    /// Payloads that cannot fit under the limit are refused before decoding.
    pub fn decode_payload(&self, data: &str) -> Result<Vec<u8>, BlogError> {
        let encoded = match data.split_once(',') {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => data,
        };
        let encoded = encoded.trim();
        if encoded.len() / 4 * 3 > self.max_bytes.saturating_add(3) {
            return Err(BlogError::TooLarge { limit: self.max_bytes });
        }
        general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| BlogError::InvalidUpload("Invalid base64 file data".to_string()))
    }
}

/// Reduces a client-supplied file name to `[A-Za-z0-9_.-]`, with no path
/// components and no leading or trailing dots/underscores. Long names are cut
/// to `MAX_SAFE_NAME_LEN`, keeping the extension. May return "".
pub fn secure_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(&joined, "");
    shorten(cleaned.trim_matches(|c| c == '.' || c == '_'))
}

// Input is ASCII by now, so byte offsets are char boundaries.
fn shorten(name: &str) -> String {
    if name.len() <= MAX_SAFE_NAME_LEN {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(i) if i > 0 && name.len() - i <= MAX_EXTENSION_LEN => name.split_at(i),
        _ => (name, ""),
    };
    let stem = stem[..MAX_SAFE_NAME_LEN - ext.len()].trim_end_matches(|c| c == '.' || c == '_');
    format!("{}{}", stem, ext)
}

/// SVG and anything unknown go out as `application/octet-stream`; uploads
/// share the app's origin, so nothing scriptable is served inline.
fn content_type_for(name: &str) -> Mime {
    let ext = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => mime::IMAGE_JPEG,
        Some("png") => mime::IMAGE_PNG,
        Some("gif") => mime::IMAGE_GIF,
        Some("webp") => "image/webp".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        Some("pdf") => mime::APPLICATION_PDF,
        Some("txt") => mime::TEXT_PLAIN_UTF_8,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}
