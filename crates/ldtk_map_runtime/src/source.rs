//! Where documents and images come from
//!
//! The loader never touches the filesystem directly; it asks an
//! [`AssetSource`]. Futures returned by a source must not borrow it, so
//! they can be parked in a cache and driven later.

use crate::SourceError;
use ldtk_map_core::ImageHandle;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;

/// What a fetched document is expected to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// An `.ldtk` project
    Project,
    /// An external `.ldtkl` level
    Level,
}

/// Host hook for fetching raw documents and loading images
pub trait AssetSource {
    /// Fetch the bytes of a JSON document
    fn fetch_document(
        &self,
        path: &str,
        kind: DocumentKind,
    ) -> impl Future<Output = Result<Vec<u8>, SourceError>> + 'static;

    /// Load an image and report its size
    fn load_image(&self, path: &str)
        -> impl Future<Output = Result<ImageHandle, SourceError>> + 'static;
}

/// Reads assets from a directory
///
/// Paths are taken relative to `root`; a leading `/` is relative to `root`
/// as well, the way a web server would serve them.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl AssetSource for FileSource {
    fn fetch_document(
        &self,
        path: &str,
        kind: DocumentKind,
    ) -> impl Future<Output = Result<Vec<u8>, SourceError>> + 'static {
        let full = self.full_path(path);
        let path = path.to_string();
        async move {
            log::debug!("reading {:?} document {}", kind, full.display());
            std::fs::read(&full).map_err(|error| SourceError::io(&path, error))
        }
    }

    fn load_image(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<ImageHandle, SourceError>> + 'static {
        let full = self.full_path(path);
        let path = path.to_string();
        async move {
            if !full.exists() {
                return Err(SourceError::NotFound { path });
            }
            let (width, height) =
                image::image_dimensions(&full).map_err(|error| SourceError::Image {
                    path: path.clone(),
                    error,
                })?;
            Ok(ImageHandle::new(path, width, height))
        }
    }
}

/// Serves documents and image sizes from memory
///
/// Counts every request so callers can check what was fetched and how
/// often.
#[derive(Debug, Default)]
pub struct MemorySource {
    documents: HashMap<String, Vec<u8>>,
    images: HashMap<String, (u32, u32)>,
    requests: RefCell<HashMap<String, usize>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert_document(path, bytes);
        self
    }

    pub fn with_image(mut self, path: impl Into<String>, width: u32, height: u32) -> Self {
        self.insert_image(path, width, height);
        self
    }

    pub fn insert_document(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.documents.insert(path.into(), bytes.into());
    }

    pub fn insert_image(&mut self, path: impl Into<String>, width: u32, height: u32) {
        self.images.insert(path.into(), (width, height));
    }

    /// How many times `path` was requested
    pub fn request_count(&self, path: &str) -> usize {
        self.requests.borrow().get(path).copied().unwrap_or(0)
    }

    /// Total requests over all paths
    pub fn total_requests(&self) -> usize {
        self.requests.borrow().values().sum()
    }

    fn record(&self, path: &str) {
        *self
            .requests
            .borrow_mut()
            .entry(path.to_string())
            .or_default() += 1;
    }
}

impl AssetSource for MemorySource {
    fn fetch_document(
        &self,
        path: &str,
        _kind: DocumentKind,
    ) -> impl Future<Output = Result<Vec<u8>, SourceError>> + 'static {
        self.record(path);
        let result = self
            .documents
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                path: path.to_string(),
            });
        async move { result }
    }

    fn load_image(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<ImageHandle, SourceError>> + 'static {
        self.record(path);
        let result = self
            .images
            .get(path)
            .map(|&(width, height)| ImageHandle::new(path, width, height))
            .ok_or_else(|| SourceError::NotFound {
                path: path.to_string(),
            });
        async move { result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_memory_source_counts_requests() {
        let source = MemorySource::new()
            .with_document("world.ldtk", "{}")
            .with_image("tiles.png", 64, 32);

        assert_eq!(
            block_on(source.fetch_document("world.ldtk", DocumentKind::Project)).unwrap(),
            b"{}"
        );
        let image = block_on(source.load_image("tiles.png")).unwrap();
        assert_eq!((image.width, image.height), (64, 32));
        assert!(matches!(
            block_on(source.load_image("missing.png")),
            Err(SourceError::NotFound { .. })
        ));

        assert_eq!(source.request_count("world.ldtk"), 1);
        assert_eq!(source.total_requests(), 3);
    }

    #[test]
    fn test_file_source_reads_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("maps")).unwrap();
        std::fs::write(dir.path().join("maps/world.ldtk"), b"{ }").unwrap();
        image::RgbaImage::new(48, 16)
            .save(dir.path().join("maps/tiles.png"))
            .unwrap();

        let source = FileSource::new(dir.path());
        let bytes = block_on(source.fetch_document("/maps/world.ldtk", DocumentKind::Project));
        assert_eq!(bytes.unwrap(), b"{ }");

        let image = block_on(source.load_image("maps/tiles.png")).unwrap();
        assert_eq!(&*image.path, "maps/tiles.png");
        assert_eq!((image.width, image.height), (48, 16));

        assert!(matches!(
            block_on(source.fetch_document("maps/nope.ldtk", DocumentKind::Level)),
            Err(SourceError::NotFound { .. })
        ));
        assert!(matches!(
            block_on(source.load_image("maps/nope.png")),
            Err(SourceError::NotFound { .. })
        ));
    }
}
