use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::student::{CreateStudentRequest, DayType, Student, UpdateStudentRequest},
    services::{seats, ServiceError},
};

pub struct StudentService;

/// Normalises a student about to be written and rejects invalid records.
/// Full-day students never carry a half-day slot.
pub fn prepare(student: &mut Student) -> Result<(), ServiceError> {
    if student.name.is_empty() {
        return Err(ServiceError::Validation("Name is required".into()));
    }
    if student.mobile.is_empty() {
        return Err(ServiceError::Validation("Mobile number is required".into()));
    }
    match student.day_type {
        DayType::Full => student.half_day_slot = None,
        DayType::Half if student.half_day_slot.is_none() => {
            return Err(ServiceError::Validation(
                "halfDaySlot (morning or evening) is required for half-day plans".into(),
            ))
        }
        DayType::Half => {}
    }
    if [student.monthly_amount, student.half_day_amount, student.full_day_amount]
        .iter()
        .any(|amount| *amount < 0.0 || !amount.is_finite())
    {
        return Err(ServiceError::Validation("Amounts cannot be negative".into()));
    }
    if let (Some(start), Some(end)) = (student.subscription_start_date, student.subscription_end_date) {
        if end < start {
            return Err(ServiceError::Validation(
                "subscriptionEndDate cannot be before subscriptionStartDate".into(),
            ));
        }
    }
    Ok(())
}

impl StudentService {
    pub async fn list(pool: &PgPool) -> Result<Vec<Student>, ServiceError> {
        let students = sqlx::query_as::<_, Student>(
            "SELECT * FROM students ORDER BY name, created_at",
        )
        .fetch_all(pool)
        .await?;
        Ok(students)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> Result<Student, ServiceError> {
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(ServiceError::NotFound("Student"))
    }

    /// Students currently recorded on `seat`, whatever their status.
    pub async fn on_seat(pool: &PgPool, seat: i32) -> Result<Vec<Student>, ServiceError> {
        let students = sqlx::query_as::<_, Student>(
            "SELECT * FROM students WHERE seat_number = $1 ORDER BY created_at",
        )
        .bind(seat)
        .fetch_all(pool)
        .await?;
        Ok(students)
    }

    async fn ensure_seat_free(pool: &PgPool, candidate: &Student) -> Result<(), ServiceError> {
        let Some(seat) = candidate.seat_number else {
            return Ok(());
        };
        let occupants = Self::on_seat(pool, seat).await?;
        seats::check_assignment(&occupants, candidate)?;
        Ok(())
    }

    pub async fn create(pool: &PgPool, req: CreateStudentRequest) -> Result<Student, ServiceError> {
        let mut draft = Student::from_request(req);
        prepare(&mut draft)?;
        // Range is checked before touching the database.
        seats::check_assignment(&[], &draft)?;
        Self::ensure_seat_free(pool, &draft).await?;

        let student = sqlx::query_as::<_, Student>(
            "INSERT INTO students (id, name, email, mobile, plan_type, day_type, half_day_slot,
                                   seat_number, status, subscription_start_date,
                                   subscription_end_date, currency, monthly_amount,
                                   half_day_amount, full_day_amount)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING *",
        )
        .bind(draft.id)
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(&draft.mobile)
        .bind(draft.plan_type)
        .bind(draft.day_type)
        .bind(draft.half_day_slot)
        .bind(draft.seat_number)
        .bind(draft.status)
        .bind(draft.subscription_start_date)
        .bind(draft.subscription_end_date)
        .bind(draft.currency)
        .bind(draft.monthly_amount)
        .bind(draft.half_day_amount)
        .bind(draft.full_day_amount)
        .fetch_one(pool)
        .await?;

        tracing::info!(student = %student.id, seat = ?student.seat_number, "student created");
        Ok(student)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: UpdateStudentRequest,
    ) -> Result<Student, ServiceError> {
        let mut student = Self::get(pool, id).await?;
        student.apply(patch);
        prepare(&mut student)?;
        seats::check_assignment(&[], &student)?;
        Self::ensure_seat_free(pool, &student).await?;

        let student = sqlx::query_as::<_, Student>(
            "UPDATE students
             SET name = $1, email = $2, mobile = $3, plan_type = $4, day_type = $5,
                 half_day_slot = $6, seat_number = $7, status = $8,
                 subscription_start_date = $9, subscription_end_date = $10,
                 currency = $11, monthly_amount = $12, half_day_amount = $13,
                 full_day_amount = $14
             WHERE id = $15
             RETURNING *",
        )
        .bind(&student.name)
        .bind(&student.email)
        .bind(&student.mobile)
        .bind(student.plan_type)
        .bind(student.day_type)
        .bind(student.half_day_slot)
        .bind(student.seat_number)
        .bind(student.status)
        .bind(student.subscription_start_date)
        .bind(student.subscription_end_date)
        .bind(student.currency)
        .bind(student.monthly_amount)
        .bind(student.half_day_amount)
        .bind(student.full_day_amount)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(ServiceError::NotFound("Student"))?;

        Ok(student)
    }

    /// Hard-deletes the student; their payments go with them (FK cascade).
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("Student"));
        }
        tracing::info!(student = %id, "student deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::student::HalfDaySlot;

    fn draft(body: serde_json::Value) -> Student {
        Student::from_request(serde_json::from_value(body).unwrap())
    }

    #[test]
    fn half_day_needs_a_slot() {
        let mut s = draft(serde_json::json!({ "name": "A", "mobile": "1", "dayType": "half" }));
        assert!(matches!(prepare(&mut s), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn full_day_drops_the_slot() {
        let mut s = draft(serde_json::json!({
            "name": "A", "mobile": "1", "dayType": "full", "halfDaySlot": "evening"
        }));
        prepare(&mut s).unwrap();
        assert_eq!(s.half_day_slot, None);

        let mut s = draft(serde_json::json!({
            "name": "B", "mobile": "1", "dayType": "half", "halfDaySlot": "evening"
        }));
        prepare(&mut s).unwrap();
        assert_eq!(s.half_day_slot, Some(HalfDaySlot::Evening));
    }

    #[test]
    fn blank_names_and_negative_amounts_are_rejected() {
        let mut s = draft(serde_json::json!({ "name": "   ", "mobile": "1" }));
        assert!(prepare(&mut s).is_err());

        let mut s = draft(serde_json::json!({ "name": "C", "mobile": "1", "monthlyAmount": -5.0 }));
        assert!(prepare(&mut s).is_err());
    }

    #[test]
    fn end_before_start_is_rejected() {
        let mut s = draft(serde_json::json!({
            "name": "D", "mobile": "1",
            "subscriptionStartDate": "2024-05-01",
            "subscriptionEndDate": "2024-04-01"
        }));
        assert!(prepare(&mut s).is_err());
    }
}
