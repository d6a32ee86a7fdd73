use kubedeck_types::LogLine;

/// Fewest lines fetched from any one container when a tail is split
const MIN_TAIL_PER_CONTAINER: i64 = 10;

/// Split a total tail across `containers` containers. A tail of 0 (no limit) stays 0.
pub fn per_container_tail(total: i64, containers: usize) -> i64 {
    if total <= 0 {
        return 0;
    }
    let n = containers.max(1) as i64;
    (total / n).max(MIN_TAIL_PER_CONTAINER)
}

/// Concatenate per-container batches and order them by timestamp.
///
/// The sort is stable: lines with equal timestamps keep their batch order, and
/// lines without a timestamp sort first.
pub fn merge_container_logs(batches: Vec<Vec<LogLine>>) -> Vec<LogLine> {
    let mut merged: Vec<LogLine> = batches.into_iter().flatten().collect();
    merged.sort_by_key(|l| l.timestamp);
    merged
}
