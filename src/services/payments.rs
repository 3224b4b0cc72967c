use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::{
        payment::{CreatePaymentRequest, NewPayment, Payment, PaymentStatus, UpdatePaymentRequest},
        settings::FeeDefaults,
        student::Student,
    },
    services::{
        billing::{self, SyncAction},
        students::StudentService,
        ServiceError,
    },
};

pub struct PaymentService;

/// Counts of what a sync pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: u64,
    pub updated: u64,
}

/// Resolves a create request against the student it bills.
pub fn new_payment_for(
    student: &Student,
    req: CreatePaymentRequest,
    today: NaiveDate,
    fees: &FeeDefaults,
) -> Result<NewPayment, ServiceError> {
    let amount = req.amount.unwrap_or_else(|| billing::fee_for(student, fees));
    if amount < 0.0 || !amount.is_finite() {
        return Err(ServiceError::Validation("Amount cannot be negative".into()));
    }
    let due_date = req.due_date.unwrap_or_else(|| billing::due_date_for(today));
    let status = match (req.status, req.paid_date) {
        (Some(status), _) => status,
        (None, Some(_)) => PaymentStatus::Paid,
        (None, None) => billing::derive_status(today, due_date, student.subscription_end_date),
    };
    let paid_date = match status {
        PaymentStatus::Paid => req.paid_date.or(Some(today)),
        _ => req.paid_date,
    };

    Ok(NewPayment {
        student_id: student.id,
        student_name: student.name.clone(),
        amount,
        currency: req.currency.unwrap_or(student.currency),
        due_date,
        paid_date,
        status,
        plan_type: student.plan_type,
        day_type: student.day_type,
        notes: req.notes.filter(|n| !n.trim().is_empty()),
    })
}

impl PaymentService {
    pub async fn list(pool: &PgPool) -> Result<Vec<Payment>, ServiceError> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments ORDER BY due_date DESC, student_name",
        )
        .fetch_all(pool)
        .await?;
        Ok(payments)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> Result<Payment, ServiceError> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(ServiceError::NotFound("Payment"))
    }

    /// Brings the current month's payment rows in line with the student list.
    /// Safe to run concurrently: inserts skip rows another request already
    /// created and status updates never overwrite a paid row.
    pub async fn sync(
        pool: &PgPool,
        today: NaiveDate,
        fees: &FeeDefaults,
    ) -> Result<SyncReport, ServiceError> {
        let students = StudentService::list(pool).await?;
        let due_date = billing::due_date_for(today);
        let existing = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE due_date = $1")
            .bind(due_date)
            .fetch_all(pool)
            .await?;

        let mut report = SyncReport::default();
        for action in billing::plan_sync(&students, &existing, today, fees) {
            match action {
                SyncAction::Create(new) => {
                    report.created += Self::insert(pool, &new, true).await?.map_or(0, |_| 1);
                }
                SyncAction::UpdateStatus { id, from, to } => {
                    let result = sqlx::query(
                        "UPDATE payments SET status = $1 WHERE id = $2 AND status <> 'paid'",
                    )
                    .bind(to)
                    .bind(id)
                    .execute(pool)
                    .await?;
                    tracing::debug!(payment = %id, %from, %to, "payment status re-derived");
                    report.updated += result.rows_affected();
                }
            }
        }

        if report.created > 0 || report.updated > 0 {
            tracing::info!(
                created = report.created,
                updated = report.updated,
                "payments synced for {due_date}"
            );
        }
        Ok(report)
    }

    /// Sync, then list everything.
    pub async fn list_synced(
        pool: &PgPool,
        today: NaiveDate,
        fees: &FeeDefaults,
    ) -> Result<Vec<Payment>, ServiceError> {
        Self::sync(pool, today, fees).await?;
        Self::list(pool).await
    }

    async fn insert(
        pool: &PgPool,
        new: &NewPayment,
        skip_existing: bool,
    ) -> Result<Option<Payment>, ServiceError> {
        let conflict = if skip_existing {
            "ON CONFLICT (student_id, due_date) DO NOTHING"
        } else {
            ""
        };
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "INSERT INTO payments (student_id, student_name, amount, currency, due_date,
                                   paid_date, status, plan_type, day_type, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             {conflict}
             RETURNING *"
        ))
        .bind(new.student_id)
        .bind(&new.student_name)
        .bind(new.amount)
        .bind(new.currency)
        .bind(new.due_date)
        .bind(new.paid_date)
        .bind(new.status)
        .bind(new.plan_type)
        .bind(new.day_type)
        .bind(&new.notes)
        .fetch_optional(pool)
        .await?;
        Ok(payment)
    }

    pub async fn create(
        pool: &PgPool,
        req: CreatePaymentRequest,
        today: NaiveDate,
        fees: &FeeDefaults,
    ) -> Result<Payment, ServiceError> {
        let student = match StudentService::get(pool, req.student_id).await {
            Err(ServiceError::NotFound(_)) => {
                return Err(ServiceError::Validation(format!(
                    "Student {} does not exist",
                    req.student_id
                )))
            }
            other => other?,
        };
        let new = new_payment_for(&student, req, today, fees)?;

        match Self::insert(pool, &new, false).await {
            Ok(Some(payment)) => Ok(payment),
            Ok(None) => Err(ServiceError::NotFound("Payment")),
            Err(e) => Err(duplicate_due_date(e, &student.name, new.due_date)),
        }
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: UpdatePaymentRequest,
        today: NaiveDate,
    ) -> Result<Payment, ServiceError> {
        let mut payment = Self::get(pool, id).await?;
        payment.apply(patch, today);
        if payment.amount < 0.0 || !payment.amount.is_finite() {
            return Err(ServiceError::Validation("Amount cannot be negative".into()));
        }

        sqlx::query_as::<_, Payment>(
            "UPDATE payments
             SET amount = $1, currency = $2, due_date = $3, paid_date = $4,
                 status = $5, notes = $6
             WHERE id = $7
             RETURNING *",
        )
        .bind(payment.amount)
        .bind(payment.currency)
        .bind(payment.due_date)
        .bind(payment.paid_date)
        .bind(payment.status)
        .bind(&payment.notes)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| duplicate_due_date(e.into(), &payment.student_name, payment.due_date))?
        .ok_or(ServiceError::NotFound("Payment"))
    }
}

/// A second row for the same student and due date is the client's mistake,
/// not a storage failure.
fn duplicate_due_date(e: ServiceError, student_name: &str, due_date: NaiveDate) -> ServiceError {
    match e {
        ServiceError::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            ServiceError::Validation(format!(
                "A payment for {student_name} due {due_date} already exists"
            ))
        }
        e => e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student() -> Student {
        let mut s = Student::from_request(
            serde_json::from_value(serde_json::json!({
                "name": "Farah", "mobile": "9123456780", "dayType": "half",
                "halfDaySlot": "morning", "halfDayAmount": 800.0, "currency": "EUR"
            }))
            .unwrap(),
        );
        s.subscription_end_date = NaiveDate::from_ymd_opt(2024, 12, 31);
        s
    }

    fn request(body: serde_json::Value) -> CreatePaymentRequest {
        let mut body = body;
        body["studentId"] = serde_json::json!(Uuid::nil());
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn create_defaults_from_the_student() {
        let today = NaiveDate::from_ymd_opt(2024, 4, 20).unwrap();
        let new = new_payment_for(&student(), request(serde_json::json!({})), today, &FeeDefaults::default())
            .unwrap();
        assert_eq!(new.amount, 800.0);
        assert_eq!(new.due_date, NaiveDate::from_ymd_opt(2024, 4, 15).unwrap());
        assert_eq!(new.status, PaymentStatus::Overdue);
        assert_eq!(new.currency.as_str(), "EUR");
        assert_eq!(new.paid_date, None);
    }

    #[test]
    fn paid_date_implies_paid() {
        let today = NaiveDate::from_ymd_opt(2024, 4, 20).unwrap();
        let new = new_payment_for(
            &student(),
            request(serde_json::json!({ "paidDate": "2024-04-18", "amount": 750.0 })),
            today,
            &FeeDefaults::default(),
        )
        .unwrap();
        assert_eq!(new.status, PaymentStatus::Paid);
        assert_eq!(new.amount, 750.0);
        assert_eq!(new.paid_date, NaiveDate::from_ymd_opt(2024, 4, 18));
    }

    #[test]
    fn negative_amount_is_rejected() {
        let today = NaiveDate::from_ymd_opt(2024, 4, 20).unwrap();
        let result = new_payment_for(
            &student(),
            request(serde_json::json!({ "amount": -1.0 })),
            today,
            &FeeDefaults::default(),
        );
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[derive(Debug, thiserror::Error)]
    #[error("duplicate key value violates unique constraint \"payments_student_id_due_date_key\"")]
    struct UniqueViolation;

    impl sqlx::error::DatabaseError for UniqueViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn duplicate_due_date_is_a_validation_error() {
        let due = NaiveDate::from_ymd_opt(2024, 4, 15).unwrap();
        let err = duplicate_due_date(
            ServiceError::Database(sqlx::Error::Database(Box::new(UniqueViolation))),
            "Farah",
            due,
        );
        match err {
            ServiceError::Validation(msg) => {
                assert_eq!(msg, "A payment for Farah due 2024-04-15 already exists")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!duplicate_due_date(
            ServiceError::Database(sqlx::Error::Database(Box::new(UniqueViolation))),
            "Farah",
            due,
        )
        .is_storage());
    }

    #[test]
    fn other_database_errors_stay_storage_errors() {
        let due = NaiveDate::from_ymd_opt(2024, 4, 15).unwrap();
        let err = duplicate_due_date(ServiceError::Database(sqlx::Error::RowNotFound), "Farah", due);
        assert!(err.is_storage());
    }
}
