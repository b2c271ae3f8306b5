//! Line-level parsers for the command output the probe consumes.
//!
//! Every function parses exactly one line (or one record) and returns an
//! explicit per-line result; callers drop failed lines and keep going, so one
//! malformed row never poisons a batch.

use crate::prelude::*;
use crate::sys::{IdentityRow, ListeningSocket, MetricsRow};
use regex::Regex;

/// Parse one body line of `lsof -iTCP -sTCP:LISTEN -P -n` output.
///
/// Relevant columns: COMMAND (0), PID (1), NAME (8, `addr:port`). Trailing
/// columns such as `(LISTEN)` are ignored.
pub fn parse_listening_line(line: &str) -> Result<ListeningSocket> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 9 {
        bail!("expected at least 9 columns, got {}", parts.len());
    }

    let name = parts[0].to_string();
    let pid: u32 = parts[1]
        .parse()
        .with_context(|| format!("invalid pid column {:?}", parts[1]))?;

    let addr = parts[8];
    let (_, port) = addr
        .rsplit_once(':')
        .with_context(|| format!("no port in address column {addr:?}"))?;
    let port: u16 = port
        .parse()
        .with_context(|| format!("invalid port {port:?}"))?;

    Ok(ListeningSocket { pid, name, port })
}

/// Parse one line of `ps -p <pids> -o pid=,ppid=,%cpu=,rss=,etime=,args=`.
///
/// The args column can contain arbitrary whitespace, so the fixed-width fields
/// are matched first and the remainder is taken verbatim.
pub fn parse_identity_line(line: &str) -> Result<IdentityRow> {
    lazy_static::lazy_static! {
        static ref IDENTITY_REGEX: Regex =
            Regex::new(r"^(\d+)\s+(\d+)\s+([\d.]+)\s+(\d+)\s+(\S+)\s+(.+)$").unwrap();
    }

    let captures = IDENTITY_REGEX
        .captures(line.trim())
        .with_context(|| format!("unexpected ps identity line {line:?}"))?;

    Ok(IdentityRow {
        pid: captures[1].parse()?,
        ppid: captures[2].parse()?,
        cpu: captures[3].parse()?,
        rss_kb: captures[4].parse()?,
        etime: captures[5].to_string(),
        command: captures[6].to_string(),
    })
}

/// Parse one line of `ps -p <pids> -o pid=,%cpu=,rss=,etime=`.
pub fn parse_metrics_line(line: &str) -> Result<MetricsRow> {
    lazy_static::lazy_static! {
        static ref METRICS_REGEX: Regex =
            Regex::new(r"^(\d+)\s+([\d.]+)\s+(\d+)\s+(\S+)$").unwrap();
    }

    let captures = METRICS_REGEX
        .captures(line.trim())
        .with_context(|| format!("unexpected ps metrics line {line:?}"))?;

    Ok(MetricsRow {
        pid: captures[1].parse()?,
        cpu: captures[2].parse()?,
        rss_kb: captures[3].parse()?,
        etime: captures[4].to_string(),
    })
}

/// Parse the output of `ps -p <pid> -o ppid=,comm=` for one pid.
///
/// The executable name may contain spaces (`Code Helper (Plugin)`), so only
/// the leading ppid column is split off.
pub fn parse_parent_line(output: &str) -> Result<(u32, String)> {
    let trimmed = output.trim();
    let (ppid, comm) = trimmed
        .split_once(char::is_whitespace)
        .with_context(|| format!("unexpected ps parent line {trimmed:?}"))?;

    let ppid: u32 = ppid
        .parse()
        .with_context(|| format!("invalid ppid column {ppid:?}"))?;

    Ok((ppid, comm.trim().to_string()))
}

/// Extract the working directory from `lsof -a -p <pid> -d cwd -Fn` output.
///
/// The field format emits `fcwd` on one line and `n<path>` on the next.
pub fn parse_cwd_records(output: &str) -> Option<String> {
    let mut lines = output.lines().peekable();
    while let Some(line) = lines.next() {
        if line == "fcwd"
            && let Some(path) = lines.peek().and_then(|next| next.strip_prefix('n'))
        {
            return Some(path.to_string());
        }
    }
    None
}

/// Parse newline-separated pids, as printed by `pgrep -P <pid>`. Lines that do
/// not parse are dropped.
pub fn parse_pid_lines(output: &str) -> Vec<u32> {
    output
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listening_line() {
        let line = "node      41320 alice   23u  IPv4 0x3f9e8c2a      0t0  TCP *:3000 (LISTEN)";
        let socket = parse_listening_line(line).unwrap();
        assert_eq!(
            socket,
            ListeningSocket {
                pid: 41320,
                name: "node".to_string(),
                port: 3000,
            }
        );
    }

    #[test]
    fn test_parse_listening_line_ipv6() {
        let line = "vite      512 alice   31u  IPv6 0xdeadbeef      0t0  TCP [::1]:5173 (LISTEN)";
        let socket = parse_listening_line(line).unwrap();
        assert_eq!(socket.port, 5173);
    }

    #[test]
    fn test_parse_listening_line_rejects_header() {
        let header = "COMMAND   PID   USER   FD   TYPE DEVICE SIZE/OFF NODE NAME";
        assert!(parse_listening_line(header).is_err());
    }

    #[test]
    fn test_parse_identity_line_keeps_spaces_in_args() {
        let line = "41320 812 2.5 123456 65-10:20:30 /usr/local/bin/node server.js --port 3000";
        let row = parse_identity_line(line).unwrap();
        assert_eq!(row.pid, 41320);
        assert_eq!(row.ppid, 812);
        assert_eq!(row.cpu, 2.5);
        assert_eq!(row.rss_kb, 123456);
        assert_eq!(row.etime, "65-10:20:30");
        assert_eq!(row.command, "/usr/local/bin/node server.js --port 3000");
    }

    #[test]
    fn test_parse_identity_line_rejects_truncated_row() {
        assert!(parse_identity_line("41320 812 2.5").is_err());
    }

    #[test]
    fn test_parse_metrics_line() {
        let row = parse_metrics_line("  41320   0.0 2048 01:30  ").unwrap();
        assert_eq!(
            row,
            MetricsRow {
                pid: 41320,
                cpu: 0.0,
                rss_kb: 2048,
                etime: "01:30".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_parent_line_with_spaces_in_comm() {
        let (ppid, comm) = parse_parent_line("  812 Code Helper (Plugin)\n").unwrap();
        assert_eq!(ppid, 812);
        assert_eq!(comm, "Code Helper (Plugin)");
    }

    #[test]
    fn test_parse_parent_line_empty_output() {
        assert!(parse_parent_line("").is_err());
    }

    #[test]
    fn test_parse_cwd_records() {
        let output = "p41320\nfcwd\nn/Users/alice/dev/webapp\n";
        assert_eq!(
            parse_cwd_records(output).as_deref(),
            Some("/Users/alice/dev/webapp")
        );
    }

    #[test]
    fn test_parse_cwd_records_without_cwd_field() {
        assert_eq!(parse_cwd_records("p41320\nftxt\nn/usr/bin/node\n"), None);
    }

    #[test]
    fn test_parse_pid_lines_drops_garbage() {
        assert_eq!(parse_pid_lines("101\nnot-a-pid\n102\n"), vec![101, 102]);
    }
}
