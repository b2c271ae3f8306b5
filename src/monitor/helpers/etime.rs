use crate::prelude::*;
use std::time::Duration;

/// Parse a ps elapsed-time value of the form `[[DD-]HH:]MM:SS` into a
/// duration.
pub fn parse_etime(etime: &str) -> Result<Duration> {
    let fields: Vec<u64> = etime
        .split(['-', ':'])
        .map(|field| {
            field
                .parse()
                .with_context(|| format!("invalid elapsed-time field {field:?} in {etime:?}"))
        })
        .collect::<Result<_>>()?;

    let seconds = match fields[..] {
        [minutes, seconds] => minutes * 60 + seconds,
        [hours, minutes, seconds] => hours * 3600 + minutes * 60 + seconds,
        [days, hours, minutes, seconds] => days * 86400 + hours * 3600 + minutes * 60 + seconds,
        _ => bail!("unexpected elapsed-time shape {etime:?}"),
    };

    Ok(Duration::from_secs(seconds))
}

/// Render a time-since-start as a short human label: `42s`, `7m`, `3h 5m`,
/// `65d 10h`.
pub fn format_uptime(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();

    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 3600 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 86400 {
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        return format!("{hours}h {minutes}m");
    }

    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    format!("{days}d {hours}h")
}
