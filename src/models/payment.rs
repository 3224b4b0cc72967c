use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{
    double_option,
    student::{Currency, DayType, PlanType},
    text_enum,
};

text_enum! {
    pub enum PaymentStatus: "payment status" {
        Paid => "paid",
        Due => "due" | "pending",
        Overdue => "overdue",
        Expired => "expired",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub amount: f64,
    pub currency: Currency,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub status: PaymentStatus,
    pub plan_type: PlanType,
    pub day_type: DayType,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A payment row about to be inserted, either generated by the monthly sync
/// or assembled from a create request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub student_id: Uuid,
    pub student_name: String,
    pub amount: f64,
    pub currency: Currency,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub status: PaymentStatus,
    pub plan_type: PlanType,
    pub day_type: DayType,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub student_id: Uuid,
    /// Defaults to the student's fee for their day type.
    pub amount: Option<f64>,
    pub currency: Option<Currency>,
    /// Defaults to the 15th of the current month.
    pub due_date: Option<NaiveDate>,
    pub paid_date: Option<NaiveDate>,
    pub status: Option<PaymentStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    pub id: Option<Uuid>,
    pub amount: Option<f64>,
    pub currency: Option<Currency>,
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub paid_date: Option<Option<NaiveDate>>,
    pub status: Option<PaymentStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl Payment {
    pub fn from_new(id: Uuid, new: NewPayment) -> Self {
        let now = Utc::now();
        Self {
            id,
            student_id: new.student_id,
            student_name: new.student_name,
            amount: new.amount,
            currency: new.currency,
            due_date: new.due_date,
            paid_date: new.paid_date,
            status: new.status,
            plan_type: new.plan_type,
            day_type: new.day_type,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a partial update. Marking a payment paid without a paid date
    /// stamps `today`.
    pub fn apply(&mut self, patch: UpdatePaymentRequest, today: NaiveDate) {
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(currency) = patch.currency {
            self.currency = currency;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(paid_date) = patch.paid_date {
            self.paid_date = paid_date;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if self.status == PaymentStatus::Paid && self.paid_date.is_none() {
            self.paid_date = Some(today);
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Payment {
        Payment::from_new(
            Uuid::nil(),
            NewPayment {
                student_id: Uuid::nil(),
                student_name: "Kiran".into(),
                amount: 1500.0,
                currency: Currency::Inr,
                due_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
                paid_date: None,
                status: PaymentStatus::Overdue,
                plan_type: PlanType::Monthly,
                day_type: DayType::Full,
                notes: None,
            },
        )
    }

    #[test]
    fn marking_paid_stamps_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let mut payment = sample();
        payment.apply(
            UpdatePaymentRequest {
                status: Some(PaymentStatus::Paid),
                ..Default::default()
            },
            today,
        );
        assert_eq!(payment.status, PaymentStatus::Paid);
        assert_eq!(payment.paid_date, Some(today));
    }

    #[test]
    fn explicit_paid_date_is_kept() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let paid_on = NaiveDate::from_ymd_opt(2024, 3, 18).unwrap();
        let mut payment = sample();
        let patch: UpdatePaymentRequest =
            serde_json::from_str(r#"{"status": "paid", "paidDate": "2024-03-18"}"#).unwrap();
        payment.apply(patch, today);
        assert_eq!(payment.paid_date, Some(paid_on));
    }
}
