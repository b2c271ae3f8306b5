use crate::monitor::interfaces::{ProcessRecord, TerminalGroup};
use itertools::Itertools;

/// Bucket records into session groups for display.
///
/// Pure function of the records passed in: orphaned groups sort strictly after
/// owned ones, groups sort alphabetically by name within each partition, and
/// members are ordered by pid so repeated calls over the same cache render
/// identically.
pub fn group_records<'a>(records: impl Iterator<Item = &'a ProcessRecord>) -> Vec<TerminalGroup> {
    let buckets = records
        .cloned()
        .into_group_map_by(|record| record.group.clone());

    buckets
        .into_iter()
        .map(|(key, mut processes)| {
            processes.sort_by_key(|record| record.pid);
            TerminalGroup {
                name: key.name,
                icon: key.icon,
                is_orphaned: key.is_orphaned,
                processes,
            }
        })
        .sorted_by(|a, b| {
            a.is_orphaned
                .cmp(&b.is_orphaned)
                .then_with(|| a.name.cmp(&b.name))
        })
        .collect()
}
