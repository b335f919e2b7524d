//! Remote directory listings
//!
//! Listings come from GNU `find -printf`, one entry per line with
//! tab-separated fields: type, size, mtime (epoch seconds with fraction),
//! octal mode, name. The name is last so tabs inside it survive.

use chrono::{DateTime, Utc};
use tracing::trace;

use ibridge_core::ports::RemoteEntry;

use crate::SshError;

/// `-printf` format producing one parsable line per entry
pub const FIND_FORMAT: &str = "%y\\t%s\\t%T@\\t%m\\t%f\\n";

/// Parse one listing line
///
/// Returns `Ok(None)` for entry types other than files, directories and
/// symlinks (sockets, fifos, devices).
pub fn parse_line(line: &str) -> Result<Option<RemoteEntry>, SshError> {
    let invalid = || SshError::InvalidListing(line.to_string());

    let mut fields = line.splitn(5, '\t');
    let kind = fields.next().ok_or_else(invalid)?;
    let size = fields.next().ok_or_else(invalid)?;
    let mtime = fields.next().ok_or_else(invalid)?;
    let mode = fields.next().ok_or_else(invalid)?;
    let name = fields.next().ok_or_else(invalid)?;

    let is_dir = match kind {
        "d" => true,
        "f" | "l" => false,
        other => {
            trace!(kind = other, name, "Skipping special file");
            return Ok(None);
        }
    };

    Ok(Some(RemoteEntry {
        name: name.to_string(),
        is_dir,
        size: if is_dir {
            0
        } else {
            size.parse().map_err(|_| invalid())?
        },
        modified: parse_mtime(mtime),
        mode: u32::from_str_radix(mode, 8).ok(),
    }))
}

/// Parse a whole listing, skipping blank lines
pub fn parse_listing(output: &str) -> Result<Vec<RemoteEntry>, SshError> {
    let mut entries = Vec::new();
    for line in output.lines().filter(|l| !l.is_empty()) {
        if let Some(entry) = parse_line(line)? {
            entries.push(entry);
        }
    }
    Ok(entries)
}

fn parse_mtime(raw: &str) -> Option<DateTime<Utc>> {
    let (secs, frac) = raw.split_once('.').unwrap_or((raw, ""));
    let secs: i64 = secs.parse().ok()?;
    let nanos = if frac.is_empty() {
        0
    } else {
        let digits: String = frac.chars().take(9).collect();
        let scale = 10u32.pow(9 - digits.len() as u32);
        digits.parse::<u32>().ok()? * scale
    };
    DateTime::from_timestamp(secs, nanos)
}
