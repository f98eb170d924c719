//! Fee balances and collection summary

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::models::Record;

// Balances below half a cent count as settled
const SETTLED_EPSILON: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeStatus {
    Paid,
    Partial,
    Unpaid,
    Overdue,
}

impl FeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeStatus::Paid => "paid",
            FeeStatus::Partial => "partial",
            FeeStatus::Unpaid => "unpaid",
            FeeStatus::Overdue => "overdue",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fee {
    pub id: i64,
    pub student_id: Option<i64>,
    pub student_name: String,
    pub description: String,
    pub amount: f64,
    pub amount_paid: f64,
    pub due_date: Option<NaiveDate>,
    /// Status string as sent by the server
    pub status: String,
}

impl Fee {
    /// Typed view of a fee record; `None` when the amount is missing
    pub fn from_record(record: &Record) -> Option<Fee> {
        let amount = record.number("amount")?;
        let status = record.text("status");
        let amount_paid = match record.number("amount_paid") {
            Some(paid) => paid,
            None if status.eq_ignore_ascii_case("paid") => amount,
            None => 0.0,
        };

        Some(Fee {
            id: record.id,
            student_id: record.number("student").map(|n| n as i64),
            student_name: record.text("student_name"),
            description: record.text("description"),
            amount,
            amount_paid,
            due_date: parse_date(&record.text("due_date")),
            status,
        })
    }

    pub fn outstanding(&self) -> f64 {
        (self.amount - self.amount_paid).max(0.0)
    }

    pub fn status_on(&self, today: NaiveDate) -> FeeStatus {
        if self.outstanding() < SETTLED_EPSILON {
            FeeStatus::Paid
        } else if self.due_date.map_or(false, |due| due < today) {
            FeeStatus::Overdue
        } else if self.amount_paid > 0.0 {
            FeeStatus::Partial
        } else {
            FeeStatus::Unpaid
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentBalance {
    pub student: String,
    pub outstanding: f64,
    pub fees: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeeSummary {
    pub total_billed: f64,
    pub total_paid: f64,
    pub total_outstanding: f64,
    pub paid: usize,
    pub partial: usize,
    pub unpaid: usize,
    pub overdue: usize,
    /// Students with a balance, largest first
    pub by_student: Vec<StudentBalance>,
    /// Records that could not be read as fees
    pub skipped: usize,
}

impl FeeSummary {
    pub fn collection_rate(&self) -> f64 {
        if self.total_billed <= 0.0 {
            0.0
        } else {
            self.total_paid.min(self.total_billed) / self.total_billed * 100.0
        }
    }
}

pub fn summarize_fees(records: &[Record], today: NaiveDate) -> FeeSummary {
    let mut summary = FeeSummary::default();
    let mut balances: HashMap<String, StudentBalance> = HashMap::new();

    for record in records {
        let Some(fee) = Fee::from_record(record) else {
            summary.skipped += 1;
            continue;
        };

        summary.total_billed += fee.amount;
        summary.total_paid += fee.amount_paid;
        summary.total_outstanding += fee.outstanding();

        match fee.status_on(today) {
            FeeStatus::Paid => summary.paid += 1,
            FeeStatus::Partial => summary.partial += 1,
            FeeStatus::Unpaid => summary.unpaid += 1,
            FeeStatus::Overdue => summary.overdue += 1,
        }

        if fee.outstanding() >= SETTLED_EPSILON {
            let key = student_label(&fee);
            let entry = balances.entry(key.clone()).or_insert(StudentBalance {
                student: key,
                outstanding: 0.0,
                fees: 0,
            });
            entry.outstanding += fee.outstanding();
            entry.fees += 1;
        }
    }

    let mut by_student: Vec<StudentBalance> = balances.into_values().collect();
    by_student.sort_by(|a, b| {
        b.outstanding
            .total_cmp(&a.outstanding)
            .then_with(|| a.student.cmp(&b.student))
    });
    summary.by_student = by_student;
    summary
}

fn student_label(fee: &Fee) -> String {
    if !fee.student_name.is_empty() {
        fee.student_name.clone()
    } else if let Some(id) = fee.student_id {
        format!("Student #{}", id)
    } else {
        "Unassigned".to_string()
    }
}

/// Accepts `YYYY-MM-DD` and ISO datetimes
pub(crate) fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let day = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
