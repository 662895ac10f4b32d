/// Remote ephemeris lookups for solar-system bodies (JPL Horizons style API)
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::ObserverState;
use crate::{SkydomeError, SkydomeResult};

const BLOCK_START: &str = "$$SOE";
const BLOCK_END: &str = "$$EOE";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

// Column offsets after the date and time tokens
const COL_RA: usize = 2;
const COL_DEC: usize = 3;

#[derive(thiserror::Error, Debug)]
pub enum EphemerisError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("service returned HTTP {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Response(String),
    #[error("response has no $$SOE/$$EOE block")]
    MissingSentinels,
    #[error("ephemeris block is empty")]
    EmptyBlock,
    #[error("ephemeris line has too few columns: '{0}'")]
    ShortLine(String),
    #[error("non-numeric coordinate '{0}'")]
    NotNumeric(String),
}

/// Apparent equatorial position in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquatorialCoordinates {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

/// Anything that can resolve a body identifier to its current RA/Dec.
/// Shared across the per-body worker threads.
pub trait EphemerisSource: Send + Sync {
    fn fetch(
        &self,
        body_id: &str,
        observer: &ObserverState,
    ) -> Result<EquatorialCoordinates, EphemerisError>;
}

pub struct HorizonsClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HorizonsClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SkydomeResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SkydomeError::Ephemeris(EphemerisError::Request(e.to_string())))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl EphemerisSource for HorizonsClient {
    fn fetch(
        &self,
        body_id: &str,
        observer: &ObserverState,
    ) -> Result<EquatorialCoordinates, EphemerisError> {
        let params = query_parameters(body_id, observer);
        log::debug!("Querying ephemeris for body {}", body_id);

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .map_err(|e| EphemerisError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EphemerisError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .map_err(|e| EphemerisError::Request(e.to_string()))?;

        parse_response(&body)
    }
}

/// Query string for one body at the observer's site and instant
pub fn query_parameters(body_id: &str, observer: &ObserverState) -> Vec<(&'static str, String)> {
    let start = observer.timestamp;
    let stop = start + chrono::Duration::minutes(1);

    vec![
        ("format", "json".to_string()),
        ("COMMAND", quoted(body_id)),
        ("MAKE_EPHEM", quoted("YES")),
        ("EPHEM_TYPE", quoted("OBSERVER")),
        ("CENTER", quoted("coord@399")),
        ("COORD_TYPE", quoted("GEODETIC")),
        (
            "SITE_COORD",
            quoted(&format!(
                "{},{},0",
                observer.longitude_deg, observer.latitude_deg
            )),
        ),
        ("START_TIME", quoted(&format_time(start))),
        ("STOP_TIME", quoted(&format_time(stop))),
        ("STEP_SIZE", quoted("1m")),
        ("QUANTITIES", quoted("1")),
        ("ANG_FORMAT", quoted("DEG")),
    ]
}

fn quoted(value: &str) -> String {
    format!("'{}'", value)
}

fn format_time(time: DateTime<Utc>) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Extract RA/Dec from a JSON response whose `result` field carries the text ephemeris
pub fn parse_response(body: &str) -> Result<EquatorialCoordinates, EphemerisError> {
    let json: serde_json::Value =
        serde_json::from_str(body).map_err(|e| EphemerisError::Response(e.to_string()))?;

    let result = json
        .get("result")
        .and_then(|r| r.as_str())
        .ok_or_else(|| EphemerisError::Response("missing 'result' field".to_string()))?;

    parse_ephemeris_block(result)
}

/// Parse the first data line between the start/end sentinels
pub fn parse_ephemeris_block(text: &str) -> Result<EquatorialCoordinates, EphemerisError> {
    let start = text.find(BLOCK_START).ok_or(EphemerisError::MissingSentinels)? + BLOCK_START.len();
    let end = text[start..]
        .find(BLOCK_END)
        .ok_or(EphemerisError::MissingSentinels)?
        + start;

    let line = text[start..end]
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or(EphemerisError::EmptyBlock)?;

    let columns = data_columns(line);
    if columns.len() <= COL_DEC {
        return Err(EphemerisError::ShortLine(line.to_string()));
    }

    Ok(EquatorialCoordinates {
        ra_deg: parse_angle(columns[COL_RA])?,
        dec_deg: parse_angle(columns[COL_DEC])?,
    })
}

/// Split a data line, dropping the solar/lunar presence markers that may sit
/// between the time and the first angle
fn data_columns(line: &str) -> Vec<&str> {
    line.split_whitespace()
        .enumerate()
        .filter(|(index, token)| *index < COL_RA || !is_presence_marker(token))
        .map(|(_, token)| token)
        .collect()
}

fn is_presence_marker(token: &str) -> bool {
    token.len() <= 2 && token.parse::<f64>().is_err()
}

fn parse_angle(token: &str) -> Result<f64, EphemerisError> {
    token
        .parse::<f64>()
        .map_err(|_| EphemerisError::NotNumeric(token.to_string()))
}
