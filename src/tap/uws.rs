//! Universal Worker Service (UWS) job documents

use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::fmt;
use std::str::FromStr;

/// Execution phase of a UWS job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobPhase {
    /// Created, not yet run
    Pending,
    /// Accepted for execution
    Queued,
    /// Running
    Executing,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Error,
    /// Aborted by the client or the service
    Aborted,
    /// Held by the service
    Held,
    /// Suspended by the service
    Suspended,
    /// Results deleted, summary kept
    Archived,
    /// The service does not know
    Unknown,
}

impl JobPhase {
    /// True for phases a job never leaves on its own
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobPhase::Completed | JobPhase::Error | JobPhase::Aborted | JobPhase::Archived
        )
    }

    /// The UWS spelling of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Pending => "PENDING",
            JobPhase::Queued => "QUEUED",
            JobPhase::Executing => "EXECUTING",
            JobPhase::Completed => "COMPLETED",
            JobPhase::Error => "ERROR",
            JobPhase::Aborted => "ABORTED",
            JobPhase::Held => "HELD",
            JobPhase::Suspended => "SUSPENDED",
            JobPhase::Archived => "ARCHIVED",
            JobPhase::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobPhase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => JobPhase::Pending,
            "QUEUED" => JobPhase::Queued,
            "EXECUTING" => JobPhase::Executing,
            "COMPLETED" => JobPhase::Completed,
            "ERROR" => JobPhase::Error,
            "ABORTED" => JobPhase::Aborted,
            "HELD" => JobPhase::Held,
            "SUSPENDED" => JobPhase::Suspended,
            "ARCHIVED" => JobPhase::Archived,
            "UNKNOWN" => JobPhase::Unknown,
            other => return Err(Error::Xml(format!("unknown UWS phase '{}'", other))),
        })
    }
}

/// The parts of a `<uws:job>` document this crate uses
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobSummary {
    /// Job identifier
    pub job_id: Option<String>,
    /// Current phase
    pub phase: JobPhase,
    /// Message of the `errorSummary`, when the job failed
    pub error_message: Option<String>,
}

/// One `<uws:jobref>` of a job list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobRef {
    /// Job identifier
    pub job_id: String,
    /// Phase at listing time
    pub phase: Option<JobPhase>,
}

/// Parse a `<uws:job>` document
pub fn parse_job(xml: &str) -> Result<JobSummary> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current = String::new();
    let mut in_error_summary = false;
    let mut job_id = None;
    let mut phase = None;
    let mut error_message: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                current = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if current == "errorSummary" {
                    in_error_summary = true;
                }
            }
            Event::Text(ref e) => {
                let text = e.unescape()?;
                match current.as_str() {
                    "jobId" => job_id = Some(text.to_string()),
                    "phase" => phase = Some(text.parse::<JobPhase>()?),
                    "message" if in_error_summary => {
                        error_message
                            .get_or_insert_with(String::new)
                            .push_str(&text);
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => {
                if e.local_name().as_ref() == b"errorSummary" {
                    in_error_summary = false;
                }
                current.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let phase = phase.ok_or_else(|| Error::Xml("UWS job document has no phase".to_string()))?;
    Ok(JobSummary {
        job_id,
        phase,
        error_message,
    })
}

/// Parse a `<uws:jobs>` list
pub fn parse_job_list(xml: &str) -> Result<Vec<JobRef>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut jobs = Vec::new();
    let mut in_phase = false;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"jobref" => {
                    let id = e
                        .try_get_attribute("id")
                        .map_err(|err| Error::Xml(err.to_string()))?
                        .map(|a| a.unescape_value().map(|v| v.into_owned()))
                        .transpose()?
                        .ok_or_else(|| Error::Xml("jobref without id".to_string()))?;
                    jobs.push(JobRef {
                        job_id: id,
                        phase: None,
                    });
                }
                b"phase" => in_phase = true,
                _ => {}
            },
            Event::Text(ref e) if in_phase => {
                if let Some(job) = jobs.last_mut() {
                    job.phase = Some(e.unescape()?.parse()?);
                }
            }
            Event::End(ref e) => {
                if e.local_name().as_ref() == b"phase" {
                    in_phase = false;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(jobs)
}
