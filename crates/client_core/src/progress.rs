use serde::Serialize;
use shared::domain::TodoRecord;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    /// Exact share of completed records in `0.0..=100.0`.
    pub percentage: f64,
}

impl Progress {
    pub fn rounded_percentage(&self) -> u32 {
        self.percentage.round() as u32
    }

    pub fn summary_label(&self) -> String {
        format!("{} of {} completed", self.completed, self.total)
    }
}

pub fn compute_progress(records: &[TodoRecord]) -> Progress {
    let completed = records.iter().filter(|record| record.is_completed).count();
    let total = records.len();
    let percentage = if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    };
    Progress {
        completed,
        total,
        percentage,
    }
}
