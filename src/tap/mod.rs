//! Table Access Protocol client
//!
//! - [`TapService`] - synchronous queries and job submission against one TAP base URL
//! - [`job`] - caller-driven lifecycle of asynchronous (UWS) jobs
//! - [`uws`] - UWS job document parsing

pub mod job;
pub mod uws;


pub use job::AsyncJob;
pub use uws::{JobPhase, JobRef, JobSummary};

use crate::error::{Error, Result, check_status};
use crate::votable::{Table, parse_votable};
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Source of an uploaded table
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadSource {
    /// The service fetches the table from this URL
    Url(String),
    /// VOTable document sent inline with the request
    VoTable(Vec<u8>),
}

/// A temporary table made available to the query as `TAP_UPLOAD.<name>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Upload {
    /// Table name inside the `TAP_UPLOAD` schema
    pub name: String,
    /// Where the table comes from
    pub source: UploadSource,
}

impl Upload {
    /// Upload fetched by the service from `url`
    pub fn url(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: UploadSource::Url(url.into()),
        }
    }

    /// Upload sent inline as a VOTable document
    pub fn votable(name: impl Into<String>, document: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            source: UploadSource::VoTable(document.into()),
        }
    }

    fn reference(&self) -> String {
        match &self.source {
            UploadSource::Url(url) => format!("{},{}", self.name, url),
            UploadSource::VoTable(_) => format!("{},param:{}", self.name, self.name),
        }
    }
}

/// Optional parameters of a TAP query
#[derive(Clone, Debug, Default)]
pub struct QueryOptions {
    /// Maximum number of rows to return (service default when `None`)
    pub maxrec: Option<u64>,
    /// Tables to upload alongside the query
    pub uploads: Vec<Upload>,
}

/// A TAP service at a fixed base URL
#[derive(Clone, Debug)]
pub struct TapService {
    http: reqwest::Client,
    base_url: String,
    poll_interval: Duration,
}

impl TapService {
    /// Create a client for the service at `base_url` (without `/sync` or `/async`)
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, poll_interval: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            poll_interval,
        }
    }

    /// The service base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run `query` synchronously and return the result table
    pub async fn search(&self, query: &str, options: &QueryOptions) -> Result<Table> {
        let bytes = self.search_raw(query, options).await?;
        let votable = parse_votable(&bytes)?.into_result()?;

        if votable.table.is_possibly_truncated() {
            debug!(
                rows = votable.table.len(),
                "synchronous query results may be truncated"
            );
        }
        Ok(votable.table)
    }

    /// Run `query` synchronously and write the raw VOTable to `path`
    pub async fn search_to_file(
        &self,
        query: &str,
        options: &QueryOptions,
        path: &Path,
    ) -> Result<()> {
        let bytes = self.search_raw(query, options).await?;
        tokio::fs::write(path, &bytes).await?;
        info!(path = %path.display(), bytes = bytes.len(), "saved query result");
        Ok(())
    }

    /// Run `query` synchronously and return the response body unparsed
    pub async fn search_raw(&self, query: &str, options: &QueryOptions) -> Result<Vec<u8>> {
        let url = format!("{}/sync", self.base_url);
        debug!(url = %url, query, "running synchronous TAP query");

        let response = self.post_query(&url, query, options)?.send().await?;
        let response = check_status(response)?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Create an asynchronous job for `query`; the job is left `PENDING`
    pub async fn submit_job(&self, query: &str, options: &QueryOptions) -> Result<AsyncJob> {
        let url = format!("{}/async", self.base_url);
        debug!(url = %url, query, "creating asynchronous TAP job");

        // The service answers 303 See Other pointing at the new job
        let response = self.post_query(&url, query, options)?.send().await?;
        let response = check_status(response)?;
        let job_url = response.url().to_string();
        if job_url.trim_end_matches('/') == url {
            return Err(Error::Query(
                "job creation did not redirect to a job resource".to_string(),
            ));
        }

        info!(job = %job_url, "created asynchronous TAP job");
        Ok(AsyncJob::new(self.http.clone(), job_url, self.poll_interval))
    }

    /// Reattach to an existing job by id
    pub fn job(&self, job_id: &str) -> AsyncJob {
        AsyncJob::new(
            self.http.clone(),
            format!("{}/async/{}", self.base_url, job_id),
            self.poll_interval,
        )
    }

    /// List the caller's asynchronous jobs
    pub async fn list_jobs(&self) -> Result<Vec<JobRef>> {
        let url = format!("{}/async", self.base_url);
        let response = check_status(self.http.get(&url).send().await?)?;
        uws::parse_job_list(&response.text().await?)
    }

    fn post_query(
        &self,
        url: &str,
        query: &str,
        options: &QueryOptions,
    ) -> Result<reqwest::RequestBuilder> {
        let mut params = vec![
            ("REQUEST".to_string(), "doQuery".to_string()),
            ("LANG".to_string(), "ADQL".to_string()),
            ("QUERY".to_string(), query.to_string()),
        ];
        if let Some(maxrec) = options.maxrec {
            params.push(("MAXREC".to_string(), maxrec.to_string()));
        }
        if !options.uploads.is_empty() {
            let upload = options
                .uploads
                .iter()
                .map(Upload::reference)
                .collect::<Vec<_>>()
                .join(";");
            params.push(("UPLOAD".to_string(), upload));
        }

        let inline: Vec<&Upload> = options
            .uploads
            .iter()
            .filter(|u| matches!(u.source, UploadSource::VoTable(_)))
            .collect();

        if inline.is_empty() {
            return Ok(self.http.post(url).form(&params));
        }

        let mut form = Form::new();
        for (key, value) in params {
            form = form.text(key, value);
        }
        for upload in inline {
            if let UploadSource::VoTable(document) = &upload.source {
                let part = Part::bytes(document.clone())
                    .file_name(format!("{}.xml", upload.name))
                    .mime_str("application/x-votable+xml")?;
                form = form.part(upload.name.clone(), part);
            }
        }
        Ok(self.http.post(url).multipart(form))
    }
}
