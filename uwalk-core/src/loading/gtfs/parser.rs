use std::fs::File;
use std::path::Path;

use crate::error::Error;
use crate::TripEventTime;

pub fn deserialize_gtfs_file<T>(path: &Path) -> Result<Vec<T>, Error>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let file = File::open(path).map_err(|e| Error::UnreadableFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut rows = Vec::new();
    for row in csv::Reader::from_reader(file).deserialize() {
        rows.push(row.map_err(|e| {
            Error::InvalidGtfs(format!("bad row in '{}': {e}", path.display()))
        })?);
    }
    Ok(rows)
}

/// Parse a GTFS `HH:MM:SS` time to seconds since midnight. Hours may
/// exceed 23 for trips running past midnight.
pub fn parse_time(time_str: &str) -> Result<TripEventTime, Error> {
    let mut parts = time_str.split(':');
    let mut next_part = |what: &str| {
        parts
            .next()
            .and_then(|p| p.parse::<TripEventTime>().ok())
            .ok_or_else(|| Error::InvalidGtfs(format!("bad {what} in time '{time_str}'")))
    };
    let hours = next_part("hours")?;
    let minutes = next_part("minutes")?;
    let seconds = next_part("seconds")?;
    if parts.next().is_some() || !(0..60).contains(&minutes) || !(0..60).contains(&seconds) || hours < 0 {
        return Err(Error::InvalidGtfs(format!("bad time '{time_str}'")));
    }
    Ok(hours * 3600 + minutes * 60 + seconds)
}
