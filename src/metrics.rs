use crate::data::RelationLabel;

/// Aggregate balance metrics for relation labels in a batch of instances.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelBalance {
    pub total: usize,
    pub min: usize,
    pub max: usize,
    pub max_share: f64,
    pub min_share: f64,
    pub ratio: f64,
    pub per_label: Vec<LabelShare>,
}

/// Share of one relation label, reported in class-id order.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelShare {
    pub label: RelationLabel,
    pub count: usize,
    pub share: f64,
}

impl LabelBalance {
    /// Share of `label`, zero when it never occurs.
    pub fn share_of(&self, label: RelationLabel) -> f64 {
        self.per_label
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.share)
            .unwrap_or(0.0)
    }

    /// Number of instances carrying `label`.
    pub fn count_of(&self, label: RelationLabel) -> usize {
        self.per_label
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }
}

/// Compute label balance over every class, absent classes counted as zero.
/// Returns `None` for an empty label list.
pub fn label_balance(labels: &[RelationLabel]) -> Option<LabelBalance> {
    if labels.is_empty() {
        return None;
    }
    let mut counts = [0usize; RelationLabel::ALL.len()];
    for label in labels {
        counts[label.class_id() as usize] += 1;
    }
    let total = labels.len();
    let min = counts.iter().copied().min().unwrap_or(0);
    let max = counts.iter().copied().max().unwrap_or(0);
    let ratio = if min == 0 {
        f64::INFINITY
    } else {
        max as f64 / min as f64
    };
    let per_label = RelationLabel::ALL
        .iter()
        .zip(counts)
        .map(|(&label, count)| LabelShare {
            label,
            count,
            share: count as f64 / total as f64,
        })
        .collect();
    Some(LabelBalance {
        total,
        min,
        max,
        max_share: max as f64 / total as f64,
        min_share: min as f64 / total as f64,
        ratio,
        per_label,
    })
}
