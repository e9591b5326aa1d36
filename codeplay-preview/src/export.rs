//! Export of a snapshot as a standalone page or a three-file bundle,
//! written either as a directory or as a ZIP archive.

use crate::compositor::{compose_with, escape_html, ComposeOptions};
use crate::error::{PreviewError, PreviewResult};
use crate::snapshot::CodeSnapshot;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const EXPORT_TITLE: &str = "Code Playground Export";
pub const EXPORT_FILE_NAME: &str = "playground-export.html";
pub const EXPORT_ZIP_NAME: &str = "playground-export.zip";

/// Single-file export. Same composition as the live preview, without the bridge shim.
pub fn export_html(snapshot: &CodeSnapshot) -> String {
    compose_with(snapshot, &ComposeOptions::export(EXPORT_TITLE))
}

/// Files of a multi-file export, relative paths with their contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBundle {
    pub files: Vec<(String, String)>,
}

impl ExportBundle {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, content)| content.as_str())
    }

    /// Write every file into `dir`, creating it if needed. Returns the written paths.
    pub fn write_to(&self, dir: &Path) -> PreviewResult<Vec<PathBuf>> {
        fs::create_dir_all(dir).map_err(|e| PreviewError::io(dir, e))?;
        let mut written = Vec::with_capacity(self.files.len());
        for (name, content) in &self.files {
            let path = dir.join(name);
            fs::write(&path, content).map_err(|e| PreviewError::io(&path, e))?;
            written.push(path);
        }
        Ok(written)
    }

    /// Deflated ZIP archive holding every file at the archive root, in bundle order.
    pub fn zip_bytes(&self) -> PreviewResult<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, content) in &self.files {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(content.as_bytes())
                .map_err(|e| PreviewError::Archive(e.to_string()))?;
        }
        Ok(zip.finish()?.into_inner())
    }

    pub fn write_zip(&self, path: &Path) -> PreviewResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PreviewError::io(parent, e))?;
        }
        let bytes = self.zip_bytes()?;
        fs::write(path, bytes).map_err(|e| PreviewError::io(path, e))
    }
}

/// `index.html` referencing `style.css` and `script.js`, plus those two files verbatim.
pub fn export_bundle(snapshot: &CodeSnapshot) -> ExportBundle {
    let index = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{}</title>
<link rel="stylesheet" href="style.css">
</head>
<body>
{}
<script src="script.js"></script>
</body>
</html>
"#,
        escape_html(EXPORT_TITLE),
        snapshot.markup()
    );
    ExportBundle {
        files: vec![
            ("index.html".to_string(), index),
            ("style.css".to_string(), snapshot.style().to_string()),
            ("script.js".to_string(), snapshot.script().to_string()),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn read_entry<R: std::io::Read + std::io::Seek>(archive: &mut ZipArchive<R>, name: &str) -> String {
        let mut text = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn html_export_has_title_and_no_bridge() {
        let doc = export_html(&CodeSnapshot::new("<p>x</p>", "p{}", "go()"));
        assert!(doc.contains("<title>Code Playground Export</title>"));
        assert!(doc.contains("<p>x</p>"));
        assert!(!doc.contains("postMessage"));
    }

    #[test]
    fn bundle_keeps_sources_verbatim() {
        let snap = CodeSnapshot::new("<main></main>", "main{}", "let a = '</script>';");
        let bundle = export_bundle(&snap);
        assert_eq!(bundle.get("style.css"), Some("main{}"));
        assert_eq!(bundle.get("script.js"), Some("let a = '</script>';"));
        let index = bundle.get("index.html").unwrap();
        assert!(index.contains("<main></main>"));
        assert!(index.contains(r#"<script src="script.js"></script>"#));
    }

    #[test]
    fn zip_archive_reads_back() {
        let snap = CodeSnapshot::new("<h1>Hi</h1>", "h1{color:red}", "console.log('</script>');");
        let bundle = export_bundle(&snap);
        let mut archive = ZipArchive::new(Cursor::new(bundle.zip_bytes().unwrap())).unwrap();

        assert_eq!(archive.len(), 3);
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["index.html", "style.css", "script.js"]);
        assert_eq!(read_entry(&mut archive, "style.css"), "h1{color:red}");
        assert_eq!(read_entry(&mut archive, "script.js"), "console.log('</script>');");
        assert_eq!(read_entry(&mut archive, "index.html"), bundle.get("index.html").unwrap());
    }

    #[test]
    fn write_zip_creates_parent_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out").join(EXPORT_ZIP_NAME);
        export_bundle(&CodeSnapshot::new("<p>x</p>", "", "")).write_zip(&path).unwrap();

        let mut archive = ZipArchive::new(fs::File::open(&path).unwrap()).unwrap();
        assert!(read_entry(&mut archive, "index.html").contains("<p>x</p>"));
        assert_eq!(read_entry(&mut archive, "script.js"), "");
    }

    #[test]
    fn unreadable_archive_maps_to_archive_error() {
        let err = ZipArchive::new(Cursor::new(b"not a zip".to_vec())).err().unwrap();
        assert!(matches!(PreviewError::from(err), PreviewError::Archive(_)));
    }
}
