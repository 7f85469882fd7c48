//! Asynchronous TAP jobs
//!
//! A job is driven entirely by the caller. A typical sequence:
//!
//! ```no_run
//! # async fn example(tap: cadc_tap::tap::TapService) -> cadc_tap::Result<()> {
//! let job = tap.submit_job("SELECT TOP 10 * FROM caom2.Plane", &Default::default()).await?;
//! job.run().await?;
//! job.wait().await?;
//! job.raise_if_error().await?;
//! let table = job.fetch_result().await?;
//! job.delete().await?;
//! # Ok(())
//! # }
//! ```

use super::uws::{JobPhase, JobSummary, parse_job};
use crate::error::{Error, Result, check_status};
use crate::votable::{Table, parse_votable};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Handle on a UWS job resource
#[derive(Clone, Debug)]
pub struct AsyncJob {
    http: reqwest::Client,
    url: String,
    poll_interval: Duration,
}

impl AsyncJob {
    pub(crate) fn new(http: reqwest::Client, url: String, poll_interval: Duration) -> Self {
        Self {
            http,
            url: url.trim_end_matches('/').to_string(),
            poll_interval,
        }
    }

    /// URL of the job resource
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Job identifier (last path segment of the job URL)
    pub fn job_id(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }

    /// Current phase
    pub async fn phase(&self) -> Result<JobPhase> {
        let response = self
            .http
            .get(format!("{}/phase", self.url))
            .send()
            .await?;
        let text = check_status(response)?.text().await?;
        text.parse()
    }

    /// Full job summary
    pub async fn summary(&self) -> Result<JobSummary> {
        let response = self.http.get(&self.url).send().await?;
        let text = check_status(response)?.text().await?;
        parse_job(&text)
    }

    /// Start execution
    pub async fn run(&self) -> Result<()> {
        self.set_phase("RUN").await?;
        info!(job = %self.url, "started job");
        Ok(())
    }

    /// Ask the service to abort execution
    pub async fn abort(&self) -> Result<()> {
        self.set_phase("ABORT").await?;
        info!(job = %self.url, "aborted job");
        Ok(())
    }

    /// Poll the phase until the job reaches a terminal phase, returning it
    pub async fn wait(&self) -> Result<JobPhase> {
        loop {
            let phase = self.phase().await?;
            if phase.is_terminal() {
                debug!(job = %self.url, %phase, "job finished");
                return Ok(phase);
            }
            if phase == JobPhase::Pending {
                return Err(Error::Query(format!(
                    "job {} is PENDING; call run() before wait()",
                    self.job_id()
                )));
            }
            debug!(job = %self.url, %phase, "waiting for job");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Fail with [`Error::Query`] if the job ended in `ERROR` or `ABORTED`
    pub async fn raise_if_error(&self) -> Result<()> {
        let summary = self.summary().await?;
        match summary.phase {
            JobPhase::Error => Err(Error::Query(
                summary
                    .error_message
                    .unwrap_or_else(|| format!("job {} failed", self.job_id())),
            )),
            JobPhase::Aborted => Err(Error::Query(format!("job {} was aborted", self.job_id()))),
            _ => Ok(()),
        }
    }

    /// Download and parse the `result` of a completed job
    pub async fn fetch_result(&self) -> Result<Table> {
        let bytes = self.fetch_result_raw().await?;
        Ok(parse_votable(&bytes)?.into_result()?.table)
    }

    /// Download the `result` of a completed job and write it to `path`
    pub async fn save_result(&self, path: &Path) -> Result<()> {
        let bytes = self.fetch_result_raw().await?;
        tokio::fs::write(path, &bytes).await?;
        info!(job = %self.url, path = %path.display(), "saved job result");
        Ok(())
    }

    /// Delete the job on the service
    pub async fn delete(&self) -> Result<()> {
        let response = self.http.delete(&self.url).send().await?;
        check_status(response)?;
        info!(job = %self.url, "deleted job");
        Ok(())
    }

    async fn fetch_result_raw(&self) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(format!("{}/results/result", self.url))
            .send()
            .await?;
        Ok(check_status(response)?.bytes().await?.to_vec())
    }

    async fn set_phase(&self, phase: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/phase", self.url))
            .form(&[("PHASE", phase)])
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }
}
