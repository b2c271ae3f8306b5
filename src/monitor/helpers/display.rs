use std::env;

/// Replace a leading home-directory prefix with `~`.
pub fn tildify(path: &str) -> String {
    match env::var("HOME") {
        Ok(home) if !home.is_empty() && path.starts_with(&home) => {
            format!("~{}", &path[home.len()..])
        }
        _ => path.to_string(),
    }
}

/// Shorten a path for a table cell: home becomes `~`, and anything longer
/// than `max_len` keeps only its last two components behind an ellipsis.
pub fn truncate_path(path: &str, max_len: usize) -> String {
    let normalized = tildify(path);

    if normalized.len() <= max_len {
        return normalized;
    }

    let parts: Vec<&str> = normalized.split('/').collect();
    if parts.len() <= 2 {
        return ellipsize(&normalized, max_len);
    }

    format!(".../{}", parts[parts.len() - 2..].join("/"))
}

/// Truncate a command line for a table cell.
pub fn truncate_command(command: &str, max_len: usize) -> String {
    if command.len() <= max_len {
        return command.to_string();
    }
    ellipsize(command, max_len)
}

fn ellipsize(text: &str, max_len: usize) -> String {
    let head: String = text.chars().take(max_len.saturating_sub(3)).collect();
    format!("{head}...")
}
