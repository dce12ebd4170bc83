//! Job timing metrics
//!
//! A fixed record of the eight timestamps taken during a job, plus the
//! formatting that turns it into the text returned to the caller and
//! persisted under `logs/<logName>`.
//!
//! Rendered form (epoch milliseconds, `-` for a timestamp never taken):
//!
//! ```text
//! job start: 1700000000000 job end: 1700000000420 download start: ... upload end: 1700000000419
//! ```

use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use thiserror::Error;

/// Pipeline stage with recorded start/end timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Download,
    Execution,
    Upload,
}

impl Stage {
    fn label(self) -> &'static str {
        match self {
            Stage::Download => "download",
            Stage::Execution => "execution",
            Stage::Upload => "upload",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Timestamps captured while running one job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metrics {
    pub job_start: Option<DateTime<Utc>>,
    pub job_end: Option<DateTime<Utc>>,
    pub download_start: Option<DateTime<Utc>>,
    pub download_end: Option<DateTime<Utc>>,
    pub execution_start: Option<DateTime<Utc>>,
    pub execution_end: Option<DateTime<Utc>>,
    pub upload_start: Option<DateTime<Utc>>,
    pub upload_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricsParseError {
    #[error("unexpected end of metrics string")]
    UnexpectedEnd,

    #[error("unknown metrics label '{0}'")]
    UnknownLabel(String),

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
}

const LABELS: [(&str, &str); 8] = [
    ("job", "start:"),
    ("job", "end:"),
    ("download", "start:"),
    ("download", "end:"),
    ("execution", "start:"),
    ("execution", "end:"),
    ("upload", "start:"),
    ("upload", "end:"),
];

impl Metrics {
    /// Creates a record with the job start taken now
    pub fn started() -> Self {
        Self {
            job_start: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn mark_stage_start(&mut self, stage: Stage) {
        *self.slot(stage, true) = Some(Utc::now());
    }

    pub fn mark_stage_end(&mut self, stage: Stage) {
        *self.slot(stage, false) = Some(Utc::now());
    }

    pub fn finish(&mut self) {
        self.job_end = Some(Utc::now());
    }

    /// True once all eight timestamps are present
    pub fn is_complete(&self) -> bool {
        self.fields().iter().all(Option::is_some)
    }

    fn slot(&mut self, stage: Stage, start: bool) -> &mut Option<DateTime<Utc>> {
        match (stage, start) {
            (Stage::Download, true) => &mut self.download_start,
            (Stage::Download, false) => &mut self.download_end,
            (Stage::Execution, true) => &mut self.execution_start,
            (Stage::Execution, false) => &mut self.execution_end,
            (Stage::Upload, true) => &mut self.upload_start,
            (Stage::Upload, false) => &mut self.upload_end,
        }
    }

    fn fields(&self) -> [Option<DateTime<Utc>>; 8] {
        [
            self.job_start,
            self.job_end,
            self.download_start,
            self.download_end,
            self.execution_start,
            self.execution_end,
            self.upload_start,
            self.upload_end,
        ]
    }

    /// Renders the record in its stable text form
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Parses the text produced by [`Metrics::render`]
    pub fn parse(s: &str) -> Result<Self, MetricsParseError> {
        let mut tokens = s.split_whitespace();
        let mut values = [None; 8];

        for (idx, (subject, edge)) in LABELS.iter().enumerate() {
            let got_subject = tokens.next().ok_or(MetricsParseError::UnexpectedEnd)?;
            let got_edge = tokens.next().ok_or(MetricsParseError::UnexpectedEnd)?;
            if got_subject != *subject || got_edge != *edge {
                return Err(MetricsParseError::UnknownLabel(format!(
                    "{} {}",
                    got_subject, got_edge
                )));
            }

            let raw = tokens.next().ok_or(MetricsParseError::UnexpectedEnd)?;
            values[idx] = parse_millis(raw)?;
        }

        Ok(Self {
            job_start: values[0],
            job_end: values[1],
            download_start: values[2],
            download_end: values[3],
            execution_start: values[4],
            execution_end: values[5],
            upload_start: values[6],
            upload_end: values[7],
        })
    }
}

fn parse_millis(raw: &str) -> Result<Option<DateTime<Utc>>, MetricsParseError> {
    if raw == "-" {
        return Ok(None);
    }

    let millis: i64 = raw
        .parse()
        .map_err(|_| MetricsParseError::InvalidTimestamp(raw.to_string()))?;

    Utc.timestamp_millis_opt(millis)
        .single()
        .map(Some)
        .ok_or_else(|| MetricsParseError::InvalidTimestamp(raw.to_string()))
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, ((subject, edge), value)) in LABELS.iter().zip(self.fields()).enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            match value {
                Some(ts) => write!(f, "{} {} {}", subject, edge, ts.timestamp_millis())?,
                None => write!(f, "{} {} -", subject, edge)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(millis).single()
    }

    fn full() -> Metrics {
        Metrics {
            job_start: at(1_000),
            job_end: at(8_000),
            download_start: at(2_000),
            download_end: at(3_000),
            execution_start: at(4_000),
            execution_end: at(5_000),
            upload_start: at(6_000),
            upload_end: at(7_000),
        }
    }

    #[test]
    fn test_render_format() {
        assert_eq!(
            full().render(),
            "job start: 1000 job end: 8000 download start: 2000 download end: 3000 \
             execution start: 4000 execution end: 5000 upload start: 6000 upload end: 7000"
        );
    }

    #[test]
    fn test_render_missing_timestamps() {
        let metrics = Metrics {
            job_start: at(1_000),
            ..Default::default()
        };
        assert!(metrics.render().starts_with("job start: 1000 job end: -"));
        assert!(!metrics.is_complete());
    }

    #[test]
    fn test_parse_reads_rendered_text() {
        let metrics = full();
        assert_eq!(Metrics::parse(&metrics.render()), Ok(metrics));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(
            Metrics::parse("job start: 1"),
            Err(MetricsParseError::UnexpectedEnd)
        );
        assert!(matches!(
            Metrics::parse("fargate start: 1"),
            Err(MetricsParseError::UnknownLabel(_))
        ));
        assert!(matches!(
            Metrics::parse(&full().render().replace("2000", "soon")),
            Err(MetricsParseError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_stage_marks() {
        let mut metrics = Metrics::started();
        for stage in [Stage::Download, Stage::Execution, Stage::Upload] {
            metrics.mark_stage_start(stage);
            metrics.mark_stage_end(stage);
        }
        assert!(!metrics.is_complete());
        metrics.finish();
        assert!(metrics.is_complete());
        assert!(metrics.download_start <= metrics.upload_end);
    }
}
