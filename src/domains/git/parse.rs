use crate::domains::sessions::entity::GitDiffStats;

/// Counts entries in `git status --porcelain` output. Each non-empty line is
/// one modified or untracked file.
pub fn count_porcelain_entries(output: &str) -> usize {
    output.lines().filter(|line| !line.trim().is_empty()).count()
}

/// Parses `git rev-list <range> --count` output.
pub fn parse_rev_list_count(output: &str) -> Option<usize> {
    output.trim().parse().ok()
}

/// Sums the added/removed columns of `git diff --numstat` output. Binary
/// files report `-` in both columns and contribute zero.
pub fn parse_diff_numstat(output: &str) -> GitDiffStats {
    let mut stats = GitDiffStats::default();

    for line in output.lines() {
        let mut fields = line.split_whitespace();
        let (Some(added), Some(removed)) = (fields.next(), fields.next()) else {
            continue;
        };
        stats.lines_added += added.parse::<u64>().unwrap_or(0);
        stats.lines_removed += removed.parse::<u64>().unwrap_or(0);
    }

    stats
}
