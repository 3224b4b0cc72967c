use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{double_option, text_enum};

text_enum! {
    pub enum PlanType: "plan type" {
        Daily => "daily",
        Monthly => "monthly",
        Yearly => "yearly",
    }
}

text_enum! {
    /// Full-day plans hold a seat alone; half-day plans share it by slot.
    pub enum DayType: "day type" {
        Full => "full",
        Half => "half",
    }
}

text_enum! {
    pub enum HalfDaySlot: "half-day slot" {
        Morning => "morning",
        Evening => "evening",
    }
}

text_enum! {
    pub enum StudentStatus: "student status" {
        Active => "active",
        Inactive => "inactive",
        Expired => "expired",
    }
}

text_enum! {
    pub enum Currency: "currency" {
        Usd => "USD" | "usd",
        Eur => "EUR" | "eur",
        Inr => "INR" | "inr",
        Gbp => "GBP" | "gbp",
    }
}

impl Default for PlanType {
    fn default() -> Self {
        PlanType::Monthly
    }
}

impl Default for DayType {
    fn default() -> Self {
        DayType::Full
    }
}

impl Default for StudentStatus {
    fn default() -> Self {
        StudentStatus::Active
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::Inr
    }
}

impl StudentStatus {
    /// Active and expired students keep their seat until an admin frees it.
    pub fn holds_seat(self) -> bool {
        matches!(self, StudentStatus::Active | StudentStatus::Expired)
    }
}

impl Currency {
    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Inr => "₹",
            Currency::Gbp => "£",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub mobile: String,
    pub plan_type: PlanType,
    pub day_type: DayType,
    pub half_day_slot: Option<HalfDaySlot>,
    pub seat_number: Option<i32>,
    pub status: StudentStatus,
    pub subscription_start_date: Option<NaiveDate>,
    pub subscription_end_date: Option<NaiveDate>,
    pub currency: Currency,
    pub monthly_amount: f64,
    pub half_day_amount: f64,
    pub full_day_amount: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    pub name: String,
    pub email: Option<String>,
    pub mobile: String,
    #[serde(default)]
    pub plan_type: PlanType,
    #[serde(default)]
    pub day_type: DayType,
    pub half_day_slot: Option<HalfDaySlot>,
    pub seat_number: Option<i32>,
    #[serde(default)]
    pub status: StudentStatus,
    pub subscription_start_date: Option<NaiveDate>,
    pub subscription_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub monthly_amount: f64,
    #[serde(default)]
    pub half_day_amount: f64,
    #[serde(default)]
    pub full_day_amount: f64,
}

/// Partial update. Nullable columns use `Option<Option<_>>` so that an
/// explicit `null` clears the value (e.g. freeing a seat).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudentRequest {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    pub mobile: Option<String>,
    pub plan_type: Option<PlanType>,
    pub day_type: Option<DayType>,
    #[serde(default, deserialize_with = "double_option")]
    pub half_day_slot: Option<Option<HalfDaySlot>>,
    #[serde(default, deserialize_with = "double_option")]
    pub seat_number: Option<Option<i32>>,
    pub status: Option<StudentStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub subscription_start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub subscription_end_date: Option<Option<NaiveDate>>,
    pub currency: Option<Currency>,
    pub monthly_amount: Option<f64>,
    pub half_day_amount: Option<f64>,
    pub full_day_amount: Option<f64>,
}

/// Query string shared by the `?id=` style endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<Uuid>,
}

impl Student {
    /// Builds an unsaved student from a create request. The id and timestamps
    /// are placeholders until the row is inserted.
    pub fn from_request(req: CreateStudentRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: req.name.trim().to_string(),
            email: req.email.filter(|e| !e.trim().is_empty()),
            mobile: req.mobile.trim().to_string(),
            plan_type: req.plan_type,
            day_type: req.day_type,
            half_day_slot: req.half_day_slot,
            seat_number: req.seat_number,
            status: req.status,
            subscription_start_date: req.subscription_start_date,
            subscription_end_date: req.subscription_end_date,
            currency: req.currency,
            monthly_amount: req.monthly_amount,
            half_day_amount: req.half_day_amount,
            full_day_amount: req.full_day_amount,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: UpdateStudentRequest) {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(email) = patch.email {
            self.email = email.filter(|e| !e.trim().is_empty());
        }
        if let Some(mobile) = patch.mobile {
            self.mobile = mobile.trim().to_string();
        }
        if let Some(plan_type) = patch.plan_type {
            self.plan_type = plan_type;
        }
        if let Some(day_type) = patch.day_type {
            self.day_type = day_type;
        }
        if let Some(slot) = patch.half_day_slot {
            self.half_day_slot = slot;
        }
        if let Some(seat) = patch.seat_number {
            self.seat_number = seat;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(start) = patch.subscription_start_date {
            self.subscription_start_date = start;
        }
        if let Some(end) = patch.subscription_end_date {
            self.subscription_end_date = end;
        }
        if let Some(currency) = patch.currency {
            self.currency = currency;
        }
        if let Some(amount) = patch.monthly_amount {
            self.monthly_amount = amount;
        }
        if let Some(amount) = patch.half_day_amount {
            self.half_day_amount = amount;
        }
        if let Some(amount) = patch.full_day_amount {
            self.full_day_amount = amount;
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_null_clears_the_seat() {
        let patch: UpdateStudentRequest =
            serde_json::from_str(r#"{"seatNumber": null}"#).unwrap();
        assert_eq!(patch.seat_number, Some(None));

        let patch: UpdateStudentRequest = serde_json::from_str(r#"{"name": "Asha"}"#).unwrap();
        assert_eq!(patch.seat_number, None);
    }

    #[test]
    fn create_request_fills_defaults() {
        let req: CreateStudentRequest =
            serde_json::from_str(r#"{"name": " Ravi ", "mobile": "9876543210"}"#).unwrap();
        let student = Student::from_request(req);
        assert_eq!(student.name, "Ravi");
        assert_eq!(student.plan_type, PlanType::Monthly);
        assert_eq!(student.day_type, DayType::Full);
        assert_eq!(student.status, StudentStatus::Active);
        assert_eq!(student.currency, Currency::Inr);
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let req: CreateStudentRequest = serde_json::from_str(
            r#"{"name": "Meera", "mobile": "1", "seatNumber": 12, "email": "m@example.com"}"#,
        )
        .unwrap();
        let mut student = Student::from_request(req);
        let patch: UpdateStudentRequest =
            serde_json::from_str(r#"{"seatNumber": null, "dayType": "half"}"#).unwrap();
        student.apply(patch);

        assert_eq!(student.seat_number, None);
        assert_eq!(student.day_type, DayType::Half);
        assert_eq!(student.email.as_deref(), Some("m@example.com"));
    }
}
