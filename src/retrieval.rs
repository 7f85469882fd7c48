//! Retrieval of data files behind cutout and data URLs

use crate::error::{Error, Result, check_status};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Maximum number of " (n)" suffixes tried before giving up on a unique name
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// A downloaded file held in memory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetrievedFile {
    /// URL the file was fetched from
    pub url: String,
    /// File name from `Content-Disposition` or the URL path
    pub filename: String,
    /// Response body
    pub content: Vec<u8>,
}

impl RetrievedFile {
    /// Write the file into `dir`, renaming to `name (n).ext` if the name is taken
    pub async fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = unique_path(&dir.join(&self.filename))?;
        tokio::fs::write(&path, &self.content).await?;
        info!(url = %self.url, path = %path.display(), "saved file");
        Ok(path)
    }
}

/// Fetches files over HTTP
#[derive(Clone, Debug)]
pub struct FileRetriever {
    http: reqwest::Client,
}

impl FileRetriever {
    /// Create a retriever using `http` for requests
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// GET `url` and keep the whole body in memory
    pub async fn fetch(&self, url: &str) -> Result<RetrievedFile> {
        debug!(url, "retrieving file");
        let response = check_status(self.http.get(url).send().await?)?;
        let filename = filename_from_response(&response, url);
        let content = response.bytes().await?.to_vec();

        debug!(url, filename = %filename, bytes = content.len(), "retrieved file");
        Ok(RetrievedFile {
            url: url.to_string(),
            filename,
            content,
        })
    }
}

/// File name for a response.
///
/// Tries the `Content-Disposition` header (`filename=` and RFC 5987
/// `filename*=`), then the last segment of the URL path, then `download`.
pub fn filename_from_response(response: &reqwest::Response, url: &str) -> String {
    let disposition = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok());
    filename_from_parts(disposition, url)
}

fn filename_from_parts(disposition: Option<&str>, url: &str) -> String {
    if let Some(value) = disposition {
        // attachment; filename="file.fits" or filename*=UTF-8''file.fits
        for part in value.split(';') {
            let part = part.trim();
            if let Some(name) = part.strip_prefix("filename=") {
                let name = name.trim_matches('"');
                if let Some(name) = sanitize(name) {
                    return name;
                }
            } else if let Some(encoded) = part.strip_prefix("filename*=")
                && let Some(idx) = encoded.rfind('\'')
                && let Ok(decoded) = urlencoding::decode(&encoded[idx + 1..])
                && let Some(name) = sanitize(&decoded)
            {
                return name;
            }
        }
    }

    if let Ok(parsed) = url::Url::parse(url)
        && let Some(mut segments) = parsed.path_segments()
        && let Some(last) = segments.next_back()
        && let Ok(decoded) = urlencoding::decode(last)
        && let Some(name) = sanitize(&decoded)
    {
        return name;
    }

    "download".to_string()
}

// Keep only the final path component so a header cannot escape the target dir
fn sanitize(name: &str) -> Option<String> {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// `path` if it does not exist, otherwise the first free `stem (n).ext`
fn unique_path(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Ok(path.to_path_buf());
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::usage(format!("cannot extract file stem of {}", path.display())))?;
    let extension = path.extension().and_then(|e| e.to_str());
    let parent = path
        .parent()
        .ok_or_else(|| Error::usage(format!("no parent directory for {}", path.display())))?;

    for i in 1..=MAX_RENAME_ATTEMPTS {
        let name = match extension {
            Some(ext) => format!("{} ({}).{}", stem, i, ext),
            None => format!("{} ({})", stem, i),
        };
        let candidate = parent.join(name);
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(Error::Io(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        format!("no free file name for {}", path.display()),
    )))
}
