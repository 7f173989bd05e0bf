// 📥 File Collector - gathers candidate files and keeps only images
//
// Files arrive from command-line arguments, the TUI file input, or paths
// dropped onto the terminal (which the terminal pastes as text).

use crate::error::PipelineError;
use crate::view::{Dashboard, FileRow};
use std::path::{Path, PathBuf};

// ============================================================================
// CANDIDATE FILE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFile {
    pub name: String,
    pub path: PathBuf,
    /// Detected media type, e.g. `image/png`
    pub media_type: Option<String>,
}

impl CandidateFile {
    pub fn new(path: impl Into<PathBuf>, media_type: Option<String>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
            .unwrap_or_else(|| path.display().to_string());

        CandidateFile { name, path, media_type }
    }

    /// Detect the media type from the file's leading bytes, falling back to
    /// the extension when the content is unrecognized or unreadable.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        let sniffed = match infer::get_from_path(path) {
            Ok(kind) => kind.map(|k| k.mime_type().to_string()),
            Err(e) => {
                tracing::debug!("Could not sniff {}: {}", path.display(), e);
                None
            }
        };

        let media_type = sniffed.or_else(|| media_type_for_extension(path).map(str::to_string));
        CandidateFile::new(path, media_type)
    }

    pub fn is_image(&self) -> bool {
        self.media_type
            .as_deref()
            .map(|m| m.starts_with("image/"))
            .unwrap_or(false)
    }
}

/// Media type implied by a file extension
pub fn media_type_for_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();

    let media_type = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        _ => return None,
    };

    Some(media_type)
}

// ============================================================================
// UPLOAD BATCH
// ============================================================================

/// Accepted image files, in the order they were selected
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadBatch {
    files: Vec<CandidateFile>,
}

impl UploadBatch {
    pub fn files(&self) -> &[CandidateFile] {
        &self.files
    }

    pub fn names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn into_files(self) -> Vec<CandidateFile> {
        self.files
    }
}

#[derive(Debug)]
pub struct Collection {
    pub batch: UploadBatch,
    pub rejected: Vec<PipelineError>,
}

/// Split a selection into accepted images and rejects.
///
/// Returns `None` for an empty selection and leaves the dashboard untouched.
/// Otherwise the file list is replaced by the accepted files, and every
/// reject is announced in the alert area.
pub fn collect(files: Vec<CandidateFile>, dashboard: &mut dyn Dashboard) -> Option<Collection> {
    if files.is_empty() {
        return None;
    }

    let mut accepted = Vec::with_capacity(files.len());
    let mut rejected = Vec::new();

    for file in files {
        if file.is_image() {
            accepted.push(file);
        } else {
            tracing::warn!(
                "Rejected {} ({})",
                file.name,
                file.media_type.as_deref().unwrap_or("unknown type")
            );
            rejected.push(PipelineError::InvalidFileType {
                name: file.name,
                media_type: file.media_type,
            });
        }
    }

    dashboard.replace_files(accepted.iter().map(|f| FileRow::new(f.name.clone())).collect());
    for err in &rejected {
        dashboard.show_alert(&err.alert_text());
    }

    Some(Collection {
        batch: UploadBatch { files: accepted },
        rejected,
    })
}

// ============================================================================
// DROPPED PATHS
// ============================================================================

/// Parse the text a terminal pastes when files are dropped onto it.
///
/// Handles whitespace/newline separated paths, single or double quotes,
/// backslash-escaped spaces and `file://` URIs with percent-encoding.
pub fn parse_dropped_paths(text: &str) -> Vec<PathBuf> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => quote = Some(c),
            (None, '\\') => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            (None, c) if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            (None, c) => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
        .into_iter()
        .map(|token| match token.strip_prefix("file://") {
            Some(rest) => {
                let decoded = urlencoding::decode(rest)
                    .map(|d| d.into_owned())
                    .unwrap_or_else(|_| rest.to_string());
                PathBuf::from(decoded)
            }
            None => PathBuf::from(token),
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::DashboardModel;
    use crate::view::AlertRow;

    fn image(name: &str) -> CandidateFile {
        CandidateFile::new(name, Some("image/png".to_string()))
    }

    #[test]
    fn test_images_listed_in_input_order() {
        let mut dashboard = DashboardModel::default();
        let files = vec![image("c.png"), image("a.png"), image("b.png")];

        let collection = collect(files, &mut dashboard).unwrap();

        assert_eq!(collection.batch.names(), vec!["c.png", "a.png", "b.png"]);
        let listed: Vec<&str> = dashboard.files.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(listed, vec!["c.png", "a.png", "b.png"]);
        assert!(dashboard.files.iter().all(|r| r.icon == crate::view::FILE_ICON));
        assert!(collection.rejected.is_empty());
    }

    #[test]
    fn test_non_image_excluded_with_warning() {
        let mut dashboard = DashboardModel::default();
        let files = vec![
            image("bill1.png"),
            CandidateFile::new("notes.txt", Some("text/plain".to_string())),
            image("bill2.jpg"),
        ];

        let collection = collect(files, &mut dashboard).unwrap();

        assert_eq!(collection.batch.names(), vec!["bill1.png", "bill2.jpg"]);
        assert_eq!(dashboard.files.len(), 2);
        assert_eq!(collection.rejected.len(), 1);
        assert!(dashboard.results_visible);
        assert!(matches!(&dashboard.alerts[0], AlertRow::Warning(text) if text.contains("notes.txt")));
    }

    #[test]
    fn test_empty_selection_is_noop() {
        let mut dashboard = DashboardModel::default();
        dashboard.replace_files(vec![FileRow::new("previous.png")]);

        assert!(collect(Vec::new(), &mut dashboard).is_none());
        assert_eq!(dashboard.files.len(), 1);
    }

    #[test]
    fn test_new_selection_replaces_file_list() {
        let mut dashboard = DashboardModel::default();
        collect(vec![image("old1.png"), image("old2.png")], &mut dashboard).unwrap();
        collect(vec![image("new.png")], &mut dashboard).unwrap();

        assert_eq!(dashboard.files, vec![FileRow::new("new.png")]);
    }

    #[test]
    fn test_unknown_type_is_not_an_image() {
        let file = CandidateFile::new("mystery", None);
        assert!(!file.is_image());
    }

    #[test]
    fn test_media_type_sniffed_from_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.dat");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46]).unwrap();

        let file = CandidateFile::from_path(&path);
        assert_eq!(file.name, "scan.dat");
        assert_eq!(file.media_type.as_deref(), Some("image/jpeg"));
        assert!(file.is_image());
    }

    #[test]
    fn test_media_type_falls_back_to_extension() {
        let file = CandidateFile::from_path("/does/not/exist/Receipt.PNG");
        assert_eq!(file.media_type.as_deref(), Some("image/png"));

        let text = CandidateFile::from_path("/does/not/exist/notes.txt");
        assert!(!text.is_image());
    }

    #[test]
    fn test_parse_dropped_paths() {
        let pasted = "'/home/me/My Bills/a.png' /tmp/b\\ c.jpg\nfile:///tmp/d%20e.png \"/x/y.gif\"";
        let paths = parse_dropped_paths(pasted);

        assert_eq!(
            paths,
            vec![
                PathBuf::from("/home/me/My Bills/a.png"),
                PathBuf::from("/tmp/b c.jpg"),
                PathBuf::from("/tmp/d e.png"),
                PathBuf::from("/x/y.gif"),
            ]
        );
    }

    #[test]
    fn test_parse_dropped_paths_blank() {
        assert!(parse_dropped_paths("  \n ").is_empty());
    }
}
