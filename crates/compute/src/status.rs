use std::collections::HashMap;

/// Label shown for projects with an empty status.
pub const UNKNOWN_STATUS: &str = "Unknown";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StatusBucket {
    Completed,
    InProgress,
    Planned,
}

impl StatusBucket {
    pub const ALL: [StatusBucket; 3] = [
        StatusBucket::Completed,
        StatusBucket::InProgress,
        StatusBucket::Planned,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StatusBucket::Completed => "Siap",
            StatusBucket::InProgress => "Dalam Pembinaan",
            StatusBucket::Planned => "Perancangan",
        }
    }

    fn needles(&self) -> &'static [&'static str] {
        match self {
            StatusBucket::Completed => &["siap", "complete", "selesai", "done"],
            StatusBucket::InProgress => &["pembinaan", "progress", "ongoing", "construction"],
            StatusBucket::Planned => &["perancangan", "plan", "cadang"],
        }
    }

    fn matches(&self, status: &str) -> bool {
        self.needles().iter().any(|n| status.contains(n))
    }

    /// Case-insensitive substring match, checked in [`StatusBucket::ALL`]
    /// order. Statuses matching nothing belong to no bucket.
    ///
    /// A negated completion ("Belum Siap", "Incomplete") is never
    /// `Completed`; it falls through to the later buckets and defaults to
    /// `InProgress`.
    pub fn classify(status: &str) -> Option<StatusBucket> {
        let status = status.to_lowercase();
        if StatusBucket::Completed.matches(&status) && is_negated(&status) {
            let later = [StatusBucket::InProgress, StatusBucket::Planned];
            return Some(
                later
                    .into_iter()
                    .find(|bucket| bucket.matches(&status))
                    .unwrap_or(StatusBucket::InProgress),
            );
        }
        StatusBucket::ALL
            .into_iter()
            .find(|bucket| bucket.matches(&status))
    }
}

const NEGATIONS: &[&str] = &["belum", "tidak", "not ", "not-", "incomplete", "uncomplete"];

fn is_negated(status: &str) -> bool {
    NEGATIONS.iter().any(|n| status.contains(n))
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum StatusBreakdownMode {
    /// Every distinct status label, most frequent first.
    #[default]
    Raw,
    /// The three fixed buckets, in order, zero counts included.
    Bucketed,
}

impl StatusBreakdownMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Some(StatusBreakdownMode::Raw),
            "bucketed" | "buckets" => Some(StatusBreakdownMode::Bucketed),
            _ => None,
        }
    }
}

/// Ordered `(label, count)` list for the dashboard.
pub fn status_breakdown<'a>(
    statuses: impl IntoIterator<Item = &'a str>,
    mode: StatusBreakdownMode,
) -> Vec<(String, usize)> {
    match mode {
        StatusBreakdownMode::Raw => {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for status in statuses {
                let label = if status.trim().is_empty() {
                    UNKNOWN_STATUS
                } else {
                    status.trim()
                };
                *counts.entry(label).or_default() += 1;
            }
            let mut out: Vec<(String, usize)> = counts
                .into_iter()
                .map(|(label, n)| (label.to_string(), n))
                .collect();
            out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            out
        }
        StatusBreakdownMode::Bucketed => {
            let mut counts = [0usize; 3];
            for status in statuses {
                if let Some(bucket) = StatusBucket::classify(status) {
                    counts[bucket as usize] += 1;
                }
            }
            StatusBucket::ALL
                .into_iter()
                .map(|b| (b.label().to_string(), counts[b as usize]))
                .collect()
        }
    }
}
