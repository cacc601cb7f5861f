use chrono::{Datelike, NaiveDate};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// Base monthly charge for a class with no fee-structure row.
pub const DEFAULT_BASE_FEE: f64 = 1000.0;

/// Day of month a generated fee falls due when the student has no override.
pub const DEFAULT_DUE_DAY: u32 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct FeeError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl FeeError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeStructureRow {
    pub tuition_fee: f64,
    pub exam_fee: f64,
    pub sports_fee: f64,
}

impl FeeStructureRow {
    pub fn base_fee(&self) -> f64 {
        self.tuition_fee + self.exam_fee + self.sports_fee
    }
}

pub fn structure_for_class(
    conn: &Connection,
    class_name: &str,
) -> Result<Option<FeeStructureRow>, FeeError> {
    conn.query_row(
        "SELECT tuition_fee, exam_fee, sports_fee FROM fee_structure WHERE class_name = ?",
        [class_name],
        |r| {
            Ok(FeeStructureRow {
                tuition_fee: r.get(0)?,
                exam_fee: r.get(1)?,
                sports_fee: r.get(2)?,
            })
        },
    )
    .optional()
    .map_err(|e| FeeError::new("db_query_failed", e.to_string()))
}

/// Sum of the class's named sub-fees, or the fixed fallback for a class with
/// no fee-structure row.
pub fn base_fee_for_class(conn: &Connection, class_name: &str) -> Result<f64, FeeError> {
    Ok(structure_for_class(conn, class_name)?
        .map(|row| row.base_fee())
        .unwrap_or(DEFAULT_BASE_FEE))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Sibling,
    StaffWard,
    Merit,
    FinancialAid,
    Other,
}

impl DiscountType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sibling" => Some(Self::Sibling),
            "staff_ward" => Some(Self::StaffWard),
            "merit" => Some(Self::Merit),
            "financial_aid" => Some(Self::FinancialAid),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sibling => "sibling",
            Self::StaffWard => "staff_ward",
            Self::Merit => "merit",
            Self::FinancialAid => "financial_aid",
            Self::Other => "other",
        }
    }
}

pub fn discount_amount(amount: f64, percent: f64) -> f64 {
    amount * percent / 100.0
}

pub fn final_amount(amount: f64, percent: f64) -> f64 {
    amount - discount_amount(amount, percent)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdditionalFeeKind {
    Registration,
    Lab,
    Library,
    Activity,
}

impl AdditionalFeeKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "registration" => Some(Self::Registration),
            "lab" => Some(Self::Lab),
            "library" => Some(Self::Library),
            "activity" => Some(Self::Activity),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeFrequency {
    OneTime,
    Annual,
    Monthly,
}

impl FeeFrequency {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "one_time" => Some(Self::OneTime),
            "annual" => Some(Self::Annual),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalFee {
    pub kind: AdditionalFeeKind,
    pub frequency: FeeFrequency,
    pub amount: f64,
}

/// `totalAmount = amount + sum(additionalFees)`. The discount is carried in
/// `finalAmount` and does not feed the total.
pub fn total_amount(amount: f64, additional: &[AdditionalFee]) -> f64 {
    amount + additional.iter().map(|a| a.amount).sum::<f64>()
}

pub fn parse_additional_fees(raw: &str) -> Result<Vec<AdditionalFee>, FeeError> {
    serde_json::from_str(raw)
        .map_err(|e| FeeError::new("db_query_failed", format!("bad additional_fees json: {e}")))
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (ny, nm) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(ny, nm, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// Due date for a (month, year) fee: the student's due-day override or the
/// default 10th, clamped to the month's last day.
pub fn due_date(year: i32, month: u32, due_day: Option<u32>) -> Result<NaiveDate, FeeError> {
    if !(1..=12).contains(&month) {
        return Err(FeeError::new("bad_params", "month must be 1..=12"));
    }
    let day = due_day.unwrap_or(DEFAULT_DUE_DAY).max(1);
    let day = day.min(last_day_of_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| FeeError::new("bad_params", "invalid due date"))
}

/// Overdue is view-time only: a pending fee whose due date has passed.
pub fn is_overdue(status: &str, due_date: &str, today: NaiveDate) -> bool {
    if status != "pending" {
        return false;
    }
    match NaiveDate::parse_from_str(due_date, "%Y-%m-%d") {
        Ok(d) => d < today,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_fee_sums_named_sub_fees() {
        let row = FeeStructureRow {
            tuition_fee: 450.0,
            exam_fee: 200.0,
            sports_fee: 100.0,
        };
        assert_eq!(row.base_fee(), 750.0);
    }

    #[test]
    fn discount_is_exact_percentage_of_amount() {
        assert_eq!(discount_amount(750.0, 10.0), 75.0);
        assert_eq!(final_amount(750.0, 10.0), 675.0);
        assert_eq!(final_amount(500.0, 0.0), 500.0);
    }

    #[test]
    fn total_uses_base_amount_not_discounted_amount() {
        // Worked example: 750 base, 10% sibling discount, +200 registration.
        let adds = vec![AdditionalFee {
            kind: AdditionalFeeKind::Registration,
            frequency: FeeFrequency::OneTime,
            amount: 200.0,
        }];
        assert_eq!(final_amount(750.0, 10.0), 675.0);
        assert_eq!(total_amount(750.0, &adds), 950.0);
    }

    #[test]
    fn due_date_defaults_to_tenth_and_clamps() {
        let d = due_date(2025, 4, None).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 4, 10).unwrap());

        // 31st override in a 30-day month clamps to the 30th.
        let d = due_date(2025, 4, Some(31)).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 4, 30).unwrap());

        // February, non-leap year.
        let d = due_date(2025, 2, Some(30)).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    }

    #[test]
    fn overdue_applies_only_to_pending_past_due() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert!(is_overdue("pending", "2025-06-10", today));
        assert!(!is_overdue("pending", "2025-06-15", today));
        assert!(!is_overdue("paid", "2025-06-10", today));
        assert!(!is_overdue("pending", "not-a-date", today));
    }

    #[test]
    fn additional_fees_round_trip_json() {
        let adds = vec![
            AdditionalFee {
                kind: AdditionalFeeKind::Lab,
                frequency: FeeFrequency::Monthly,
                amount: 50.0,
            },
            AdditionalFee {
                kind: AdditionalFeeKind::Library,
                frequency: FeeFrequency::Annual,
                amount: 120.0,
            },
        ];
        let raw = serde_json::to_string(&adds).unwrap();
        let parsed = parse_additional_fees(&raw).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(total_amount(0.0, &parsed), 170.0);
    }
}
