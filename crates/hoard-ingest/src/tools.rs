//! Collaborators backed by the ImageMagick command-line tools.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::collaborators::{Classifier, DerivedArtifact, Deriver, Metadata, MetadataExtractor};
use crate::error::{IngestError, IngestResult};
use crate::maidenhead;

/// Default `-resize` geometry: scale to roughly 480k pixels.
pub const DEFAULT_GEOMETRY: &str = "480000@";

const EXIF_FORMAT: &str = "%[EXIF:DateTimeOriginal]|%[EXIF:DateTime]|%[EXIF:GPSLatitude]|\
%[EXIF:GPSLatitudeRef]|%[EXIF:GPSLongitude]|%[EXIF:GPSLongitudeRef]";
const EXIF_DATETIME: &str = "%Y:%m:%d %H:%M:%S";

/// Supports whatever `identify` can read.
#[derive(Clone, Debug)]
pub struct IdentifyClassifier {
    program: PathBuf,
}

impl IdentifyClassifier {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Classifier for IdentifyClassifier {
    async fn is_supported(&self, path: &Path) -> bool {
        let status = Command::new(&self.program)
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match status {
            Ok(status) => status.success(),
            Err(e) => {
                warn!(program = %self.program.display(), error = %e, "classifier did not run");
                false
            }
        }
    }
}

/// Shrinks images with `convert -resize`.
#[derive(Clone, Debug)]
pub struct ThumbnailDeriver {
    program: PathBuf,
    geometry: String,
}

impl ThumbnailDeriver {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            geometry: DEFAULT_GEOMETRY.to_string(),
        }
    }

    pub fn with_geometry(mut self, geometry: impl Into<String>) -> Self {
        self.geometry = geometry.into();
        self
    }

    fn failure(&self, path: &Path, reason: impl Into<String>) -> IngestError {
        IngestError::Tool {
            program: self.program.display().to_string(),
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Deriver for ThumbnailDeriver {
    async fn derive(&self, path: &Path) -> IngestResult<DerivedArtifact> {
        let target = tempfile::Builder::new()
            .prefix("hoard-thumb-")
            .suffix(".jpg")
            .tempfile()?
            .into_temp_path();
        // Dropping the artifact on any error below removes the file.
        let artifact = DerivedArtifact::new(target);

        let output = Command::new(&self.program)
            .arg("-resize")
            .arg(&self.geometry)
            .arg(path)
            .arg(artifact.path())
            .stdout(Stdio::null())
            .output()
            .await
            .map_err(|e| self.failure(path, e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(path, format!("{}: {}", output.status, stderr.trim())));
        }

        debug!(source = %path.display(), thumb = %artifact.path().display(), "thumbnail derived");
        Ok(artifact)
    }
}

/// Reads EXIF date and GPS tags through `identify -format`.
#[derive(Clone, Debug)]
pub struct ExifExtractor {
    program: PathBuf,
}

impl ExifExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn read_tags(&self, path: &Path) -> Option<String> {
        // `[0]` limits the output to the first frame of multi-frame files.
        let mut target = path.as_os_str().to_owned();
        target.push("[0]");
        let output = Command::new(&self.program)
            .arg("-format")
            .arg(EXIF_FORMAT)
            .arg(target)
            .stderr(Stdio::null())
            .output()
            .await;
        match output {
            Ok(out) if out.status.success() => {
                Some(String::from_utf8_lossy(&out.stdout).into_owned())
            }
            Ok(out) => {
                debug!(path = %path.display(), status = %out.status, "no EXIF tags");
                None
            }
            Err(e) => {
                warn!(program = %self.program.display(), error = %e, "EXIF reader did not run");
                None
            }
        }
    }
}

#[async_trait]
impl MetadataExtractor for ExifExtractor {
    async fn extract(&self, path: &Path) -> Metadata {
        let (timestamp, gridsquare) = match self.read_tags(path).await {
            Some(raw) => parse_tags(&raw),
            None => (None, None),
        };
        let timestamp = match timestamp {
            Some(ts) => ts,
            None => modification_time(path).await,
        };
        Metadata::new(timestamp, gridsquare.unwrap_or_default())
    }
}

async fn modification_time(path: &Path) -> DateTime<Utc> {
    match tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
        Ok(mtime) => mtime.into(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "no modification time, using now");
            Utc::now()
        }
    }
}

/// Split the `EXIF_FORMAT` output into a timestamp and a locator.
fn parse_tags(raw: &str) -> (Option<DateTime<Utc>>, Option<String>) {
    let fields: Vec<&str> = raw.trim().split('|').map(str::trim).collect();
    let field = |i: usize| fields.get(i).copied().unwrap_or("");

    let timestamp = parse_exif_datetime(field(0)).or_else(|| parse_exif_datetime(field(1)));

    let lat = parse_coordinate(field(2), field(3));
    let lon = parse_coordinate(field(4), field(5));
    let gridsquare = match (lat, lon) {
        (Some(lat), Some(lon)) => maidenhead::locator(lat, lon),
        _ => None,
    };
    (timestamp, gridsquare)
}

/// EXIF stores local camera time without a zone; it is taken as UTC.
fn parse_exif_datetime(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, EXIF_DATETIME)
        .ok()
        .map(|naive| naive.and_utc())
}

/// `"52/1, 22/1, 3045/100"` plus a hemisphere reference to signed degrees.
fn parse_coordinate(value: &str, reference: &str) -> Option<f64> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|part| parse_rational(part.trim()))
        .collect::<Option<_>>()?;
    let degrees = match parts.as_slice() {
        [d] => *d,
        [d, m] => d + m / 60.0,
        [d, m, s] => d + m / 60.0 + s / 3600.0,
        _ => return None,
    };
    match reference {
        "S" | "W" => Some(-degrees),
        "N" | "E" => Some(degrees),
        _ => None,
    }
}

fn parse_rational(value: &str) -> Option<f64> {
    match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => value.parse().ok(),
    }
}
