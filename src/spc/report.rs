//! Evaluation output.
//!
//! A [`VerdictReport`] is immutable and aligned with the input sequence: one
//! record per observation, in order, with 1-based order indices. It also
//! carries the baseline and control limits so that charting and table-export
//! collaborators can draw reference lines without recomputing anything.

use serde::{Deserialize, Serialize};

use super::baseline::BaselineStatistics;
use super::chart::{ControlLimits, Rule, ViolationLabel};

/// Verdict for one observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictRecord {
    /// 1-based position in the input sequence.
    pub order_index: usize,
    /// The observation.
    pub value: f64,
    /// Rule that flagged the point, if any.
    pub label: ViolationLabel,
    /// Stage label passed through from the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

/// One row of the tabular export.
///
/// Column names match the table layout consumed by plotting front-ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow<'a> {
    #[serde(rename = "Tested Column")]
    pub value: f64,
    #[serde(rename = "Order Column")]
    pub order: usize,
    /// 0 when clear, otherwise the rule id.
    #[serde(rename = "Test Failed")]
    pub test_failed: u8,
    /// `"Yes"` when the point was flagged.
    #[serde(rename = "Fail")]
    pub fail: &'static str,
    #[serde(rename = "Stage", skip_serializing_if = "Option::is_none")]
    pub stage: Option<&'a str>,
}

/// Per-point verdicts plus the statistics they were judged against.
///
/// Deserialization re-checks alignment: order indices must run `1..=n`
/// without gaps and stage labels must be present on every record or none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ReportFields")]
pub struct VerdictReport {
    records: Vec<VerdictRecord>,
    baseline: BaselineStatistics,
    limits: ControlLimits,
}

impl VerdictReport {
    pub(crate) fn new(
        data: &[f64],
        labels: Vec<ViolationLabel>,
        stages: Option<Vec<String>>,
        baseline: BaselineStatistics,
        limits: ControlLimits,
    ) -> Self {
        debug_assert_eq!(data.len(), labels.len());
        let mut stages = stages.map(Vec::into_iter);

        let records = data
            .iter()
            .zip(labels)
            .enumerate()
            .map(|(i, (&value, label))| VerdictRecord {
                order_index: i + 1,
                value,
                label,
                stage: stages.as_mut().and_then(Iterator::next),
            })
            .collect();

        Self {
            records,
            baseline,
            limits,
        }
    }

    pub fn records(&self) -> &[VerdictRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VerdictRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The evaluated sequence, in order.
    pub fn values(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.value).collect()
    }

    pub fn order_indices(&self) -> Vec<usize> {
        self.records.iter().map(|r| r.order_index).collect()
    }

    pub fn labels(&self) -> Vec<ViolationLabel> {
        self.records.iter().map(|r| r.label).collect()
    }

    /// Stage labels, if the evaluation carried them.
    pub fn stages(&self) -> Option<Vec<&str>> {
        self.records
            .iter()
            .map(|r| r.stage.as_deref())
            .collect()
    }

    pub fn baseline(&self) -> &BaselineStatistics {
        &self.baseline
    }

    pub fn limits(&self) -> &ControlLimits {
        &self.limits
    }

    pub fn mean(&self) -> f64 {
        self.baseline.mean
    }

    pub fn sigma(&self) -> f64 {
        self.baseline.sigma
    }

    pub fn target(&self) -> Option<f64> {
        self.limits.target
    }

    /// `true` if no point carries a label.
    pub fn is_in_control(&self) -> bool {
        self.records.iter().all(|r| !r.label.is_violation())
    }

    /// Records that carry a label.
    pub fn violations(&self) -> impl Iterator<Item = &VerdictRecord> {
        self.records.iter().filter(|r| r.label.is_violation())
    }

    /// Number of points whose surviving label is `rule`.
    pub fn count_for(&self, rule: Rule) -> usize {
        self.records
            .iter()
            .filter(|r| r.label.rule() == Some(rule))
            .count()
    }

    /// 1-based order indices of flagged points.
    pub fn failed_order_indices(&self) -> Vec<usize> {
        self.violations().map(|r| r.order_index).collect()
    }

    /// Rows for table export, one per observation.
    pub fn rows(&self) -> Vec<ExportRow<'_>> {
        self.records
            .iter()
            .map(|r| ExportRow {
                value: r.value,
                order: r.order_index,
                test_failed: r.label.code(),
                fail: if r.label.is_violation() { "Yes" } else { "No" },
                stage: r.stage.as_deref(),
            })
            .collect()
    }
}

/// Unchecked wire form of a [`VerdictReport`].
#[derive(Deserialize)]
struct ReportFields {
    records: Vec<VerdictRecord>,
    baseline: BaselineStatistics,
    limits: ControlLimits,
}

impl TryFrom<ReportFields> for VerdictReport {
    type Error = String;

    fn try_from(fields: ReportFields) -> Result<Self, Self::Error> {
        for (i, record) in fields.records.iter().enumerate() {
            if record.order_index != i + 1 {
                return Err(format!(
                    "record {i} has order index {}, expected {}",
                    record.order_index,
                    i + 1
                ));
            }
        }
        let staged = fields.records.iter().filter(|r| r.stage.is_some()).count();
        if staged != 0 && staged != fields.records.len() {
            return Err(format!(
                "{staged} of {} records carry a stage label",
                fields.records.len()
            ));
        }

        Ok(Self {
            records: fields.records,
            baseline: fields.baseline,
            limits: fields.limits,
        })
    }
}

impl<'a> IntoIterator for &'a VerdictReport {
    type Item = &'a VerdictRecord;
    type IntoIter = std::slice::Iter<'a, VerdictRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
