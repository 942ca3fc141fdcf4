use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::Article;

/// Reads article files from a directory tree for bulk ingest.
///
/// - `*.json`: a single article object or an array of them
/// - `*.txt`: first non-empty line is the title, the remainder the body; the
///   top-level directory below the root becomes the locale
#[derive(Debug, Default)]
pub struct ArticleLoader;

impl ArticleLoader {
    pub fn new() -> Self { Self }

    pub fn load_directory(&self, data_dir: &Path) -> Result<Vec<Article>> {
        self.load_files(data_dir, self.list_article_files(data_dir))
    }

    pub fn load_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<Article>> {
        let mut files = self.list_article_files(data_dir);
        if files.len() > limit { files.truncate(limit); info!(limit, "limited article files"); }
        self.load_files(data_dir, files)
    }

    fn load_files(&self, data_dir: &Path, files: Vec<PathBuf>) -> Result<Vec<Article>> {
        if files.is_empty() {
            warn!("No article files found under {}", data_dir.display());
            return Ok(vec![]);
        }
        let mut articles = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            debug!("Loading file {}/{}: {}", file_index + 1, files.len(), file_path.display());
            match file_path.extension().and_then(|s| s.to_str()) {
                Some("json") => articles.extend(self.read_json_articles(file_path)?),
                _ => {
                    if let Some(article) = self.read_text_article(file_path, data_dir)? { articles.push(article); }
                }
            }
        }
        info!("Loaded {} articles from {} files", articles.len(), files.len());
        Ok(articles)
    }

    fn read_json_articles(&self, file_path: &Path) -> Result<Vec<Article>> {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum OneOrMany { One(Article), Many(Vec<Article>) }

        let raw = fs::read_to_string(file_path).map_err(|e| Error::io(file_path, e))?;
        match serde_json::from_str::<OneOrMany>(&raw).map_err(|e| Error::json(file_path, e))? {
            OneOrMany::One(article) => Ok(vec![article]),
            OneOrMany::Many(articles) => Ok(articles),
        }
    }

    fn read_text_article(&self, file_path: &Path, data_dir: &Path) -> Result<Option<Article>> {
        let content = match fs::read_to_string(file_path) {
            Ok(content) => content,
            Err(_) => String::from_utf8_lossy(&fs::read(file_path).map_err(|e| Error::io(file_path, e))?).to_string(),
        };
        let mut lines = content.lines().skip_while(|l| l.trim().is_empty());
        let Some(title) = lines.next() else {
            warn!("Skipping empty article file {}", file_path.display());
            return Ok(None);
        };
        let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();
        let mut article = Article::new(title.trim(), body);
        article.locale = self.locale_from_path(file_path, data_dir);
        Ok(Some(article))
    }

    fn locale_from_path(&self, file_path: &Path, data_dir: &Path) -> Option<String> {
        let relative_path = file_path.strip_prefix(data_dir).unwrap_or(file_path);
        let components: Vec<_> = relative_path.components().collect();
        if components.len() < 2 { return None; }
        Some(components[0].as_os_str().to_string_lossy().to_string())
    }

    fn list_article_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            if matches!(path.extension().and_then(|s| s.to_str()), Some("json" | "txt")) { files.push(path.to_path_buf()); }
        }
        files.sort(); files
    }
}
