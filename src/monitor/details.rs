use crate::monitor::helpers::etime::{format_uptime, parse_etime};
use crate::monitor::interfaces::{CWD_PLACEHOLDER, GroupKey, ProcessRecord};
use crate::prelude::*;
use crate::sys::{IdentityRow, MetricsRow, ProcessProbe};
use std::time::SystemTime;

/// Fetch identity rows for a batch of new pids in one query. A failing query
/// degrades to an empty batch with a warning; the pids simply stay out of the
/// cache until a later tick.
pub async fn fetch_identities(probe: &dyn ProcessProbe, pids: &[u32]) -> Vec<IdentityRow> {
    match probe.identity_batch(pids).await {
        Ok(rows) => rows,
        Err(err) => {
            warn!("identity query failed for {} pids: {err:#}", pids.len());
            Vec::new()
        }
    }
}

/// Fetch volatile metrics for a batch of known pids in one query. Pids missing
/// from the result are not an error here; eviction is driven solely by the
/// snapshot source.
pub async fn fetch_metrics(probe: &dyn ProcessProbe, pids: &[u32]) -> Vec<MetricsRow> {
    match probe.metrics_batch(pids).await {
        Ok(rows) => rows,
        Err(err) => {
            warn!("metrics query failed for {} pids: {err:#}", pids.len());
            Vec::new()
        }
    }
}

/// Round resident memory from KB (as ps reports it) to MB.
pub fn rss_kb_to_mb(rss_kb: u64) -> u64 {
    (rss_kb as f64 / 1024.0).round() as u64
}

/// Derive the short display name: the final path segment of the executable,
/// or the first command-line token when it carries no path separator.
pub fn derive_short_name(command: &str) -> String {
    let executable = command.split_whitespace().next().unwrap_or(command);
    executable
        .rsplit('/')
        .next()
        .unwrap_or(executable)
        .to_string()
}

/// Build a full record from one identity row. The start timestamp is derived
/// once, here; the uptime label is recomputed locally from it afterwards.
/// Fails only on an unparsable elapsed-time field, in which case the caller
/// drops the row.
pub fn build_record(row: IdentityRow, ports: Vec<u16>, group: GroupKey) -> Result<ProcessRecord> {
    let elapsed = parse_etime(&row.etime)?;
    let started_at = SystemTime::now() - elapsed;

    Ok(ProcessRecord {
        pid: row.pid,
        ppid: row.ppid,
        name: derive_short_name(&row.command),
        command: row.command,
        cwd: CWD_PLACEHOLDER.to_string(),
        ports,
        cpu: row.cpu,
        memory_mb: rss_kb_to_mb(row.rss_kb),
        started_at,
        uptime: format_uptime(elapsed),
        group,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_row(command: &str) -> IdentityRow {
        IdentityRow {
            pid: 41320,
            ppid: 812,
            cpu: 1.5,
            rss_kb: 123456,
            etime: "01:30".to_string(),
            command: command.to_string(),
        }
    }

    #[test]
    fn test_derive_short_name_from_executable_path() {
        assert_eq!(derive_short_name("/usr/local/bin/node server.js"), "node");
        assert_eq!(
            derive_short_name("/usr/bin/node server/index.js --watch"),
            "node"
        );
    }

    #[test]
    fn test_derive_short_name_without_path_separator() {
        assert_eq!(derive_short_name("python3 -m http.server 8000"), "python3");
    }

    #[test]
    fn test_rss_rounding() {
        assert_eq!(rss_kb_to_mb(123456), 121); // 120.56 MB rounds up
        assert_eq!(rss_kb_to_mb(1024), 1);
        assert_eq!(rss_kb_to_mb(511), 0);
    }

    #[test]
    fn test_build_record_derives_start_time_and_label() {
        let record = build_record(
            identity_row("/usr/local/bin/node server.js"),
            vec![3000],
            GroupKey::detached(),
        )
        .unwrap();

        assert_eq!(record.name, "node");
        assert_eq!(record.memory_mb, 121);
        assert_eq!(record.cwd, CWD_PLACEHOLDER);
        assert_eq!(record.uptime, "1m");

        let elapsed = record.started_at.elapsed().unwrap().as_secs();
        assert!((89..=91).contains(&elapsed));
    }

    #[test]
    fn test_build_record_rejects_malformed_etime() {
        let mut row = identity_row("node server.js");
        row.etime = "garbage".to_string();
        assert!(build_record(row, vec![], GroupKey::detached()).is_err());
    }
}
