//! Sample data served when the database is missing or failing.
//!
//! Every payload here goes through the same derivations as the live path so
//! the response shapes are identical. Writes are validated and echoed back
//! without being stored.

use chrono::{Duration, NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::{
    models::{
        payment::{CreatePaymentRequest, Payment, UpdatePaymentRequest},
        settings::FeeDefaults,
        student::{
            CreateStudentRequest, Currency, DayType, HalfDaySlot, PlanType, Student,
            StudentStatus, UpdateStudentRequest,
        },
    },
    services::{billing, payments::new_payment_for, seats, students::prepare, ServiceError},
};

const SAMPLE_IDS: [u128; 3] = [
    0x5a3f_0000_0000_4000_8000_0000_0000_0001,
    0x5a3f_0000_0000_4000_8000_0000_0000_0002,
    0x5a3f_0000_0000_4000_8000_0000_0000_0003,
];

struct Sample {
    name: &'static str,
    mobile: &'static str,
    seat: i32,
    day_type: DayType,
    slot: Option<HalfDaySlot>,
    status: StudentStatus,
    ends_in_days: i64,
}

const SAMPLES: [Sample; 3] = [
    Sample {
        name: "Aarav Sharma",
        mobile: "9876543210",
        seat: 1,
        day_type: DayType::Full,
        slot: None,
        status: StudentStatus::Active,
        ends_in_days: 20,
    },
    Sample {
        name: "Priya Patel",
        mobile: "9123456780",
        seat: 2,
        day_type: DayType::Half,
        slot: Some(HalfDaySlot::Morning),
        status: StudentStatus::Active,
        ends_in_days: 45,
    },
    Sample {
        name: "Rahul Verma",
        mobile: "9988776655",
        seat: 2,
        day_type: DayType::Half,
        slot: Some(HalfDaySlot::Evening),
        status: StudentStatus::Expired,
        ends_in_days: -5,
    },
];

pub fn sample_students(today: NaiveDate) -> Vec<Student> {
    SAMPLES
        .iter()
        .zip(SAMPLE_IDS)
        .enumerate()
        .map(|(i, (sample, id))| {
            let created_at = (today - Duration::days(90 - i as i64))
                .and_time(NaiveTime::MIN)
                .and_utc();
            let end = today + Duration::days(sample.ends_in_days);
            Student {
                id: Uuid::from_u128(id),
                name: sample.name.into(),
                email: None,
                mobile: sample.mobile.into(),
                plan_type: PlanType::Monthly,
                day_type: sample.day_type,
                half_day_slot: sample.slot,
                seat_number: Some(sample.seat),
                status: sample.status,
                subscription_start_date: Some(end - Duration::days(30)),
                subscription_end_date: Some(end),
                currency: Currency::Inr,
                monthly_amount: 0.0,
                half_day_amount: 900.0,
                full_day_amount: 1500.0,
                created_at,
                updated_at: created_at,
            }
        })
        .collect()
}

pub fn sample_student(today: NaiveDate, id: Uuid) -> Result<Student, ServiceError> {
    sample_students(today)
        .into_iter()
        .find(|s| s.id == id)
        .ok_or(ServiceError::NotFound("Student"))
}

pub fn sample_payments(today: NaiveDate, fees: &FeeDefaults) -> Vec<Payment> {
    let students = sample_students(today);
    let mut payments = Vec::new();
    billing::apply_sync(&mut payments, billing::plan_sync(&students, &[], today, fees));
    payments
}

/// Validates a create against the sample hall and echoes it back unsaved.
pub fn echo_created_student(
    today: NaiveDate,
    req: CreateStudentRequest,
) -> Result<Student, ServiceError> {
    let mut student = Student::from_request(req);
    prepare(&mut student)?;
    seats::check_assignment(&sample_students(today), &student)?;
    Ok(student)
}

pub fn echo_updated_student(
    today: NaiveDate,
    id: Uuid,
    patch: UpdateStudentRequest,
) -> Result<Student, ServiceError> {
    let mut student = sample_student(today, id)?;
    student.apply(patch);
    prepare(&mut student)?;
    seats::check_assignment(&sample_students(today), &student)?;
    Ok(student)
}

pub fn echo_created_payment(
    today: NaiveDate,
    req: CreatePaymentRequest,
    fees: &FeeDefaults,
) -> Result<Payment, ServiceError> {
    let student = sample_student(today, req.student_id).map_err(|_| {
        ServiceError::Validation(format!("Student {} does not exist", req.student_id))
    })?;
    let new = new_payment_for(&student, req, today, fees)?;
    Ok(Payment::from_new(Uuid::new_v4(), new))
}

pub fn echo_updated_payment(
    today: NaiveDate,
    id: Uuid,
    patch: UpdatePaymentRequest,
    fees: &FeeDefaults,
) -> Result<Payment, ServiceError> {
    let mut payment = sample_payments(today, fees)
        .into_iter()
        .find(|p| p.id == id)
        .ok_or(ServiceError::NotFound("Payment"))?;
    payment.apply(patch, today);
    Ok(payment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{payment::PaymentStatus, seat::SeatStatus};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 20).unwrap()
    }

    #[test]
    fn samples_are_stable_across_calls() {
        let a: Vec<Uuid> = sample_payments(today(), &FeeDefaults::default())
            .iter()
            .map(|p| p.id)
            .collect();
        let b: Vec<Uuid> = sample_payments(today(), &FeeDefaults::default())
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn sample_seats_cover_each_shape() {
        let seats = seats::derive_seats(&sample_students(today()));
        assert_eq!(seats[0].status, SeatStatus::Full);
        assert_eq!(seats[1].status, SeatStatus::HalfShared);
        assert_eq!(seats[2].status, SeatStatus::Vacant);
    }

    #[test]
    fn sample_payments_reflect_the_calendar() {
        let payments = sample_payments(today(), &FeeDefaults::default());
        let status_of = |name: &str| {
            payments
                .iter()
                .find(|p| p.student_name == name)
                .map(|p| p.status)
                .unwrap()
        };
        assert_eq!(status_of("Aarav Sharma"), PaymentStatus::Overdue);
        assert_eq!(status_of("Rahul Verma"), PaymentStatus::Expired);
    }

    #[test]
    fn echoed_writes_are_still_validated() {
        let req: CreateStudentRequest = serde_json::from_value(serde_json::json!({
            "name": "Zoya", "mobile": "9000000001", "seatNumber": 250
        }))
        .unwrap();
        assert!(matches!(
            echo_created_student(today(), req),
            Err(ServiceError::SeatConflict(_))
        ));
    }

    #[test]
    fn echoed_creates_respect_sample_occupancy() {
        let on_seat = |seat: i32, extra: serde_json::Value| {
            let mut body = serde_json::json!({
                "name": "Zoya", "mobile": "9000000001", "seatNumber": seat
            });
            body.as_object_mut().unwrap().extend(extra.as_object().unwrap().clone());
            echo_created_student(today(), serde_json::from_value(body).unwrap())
        };

        // Seat 1 is Aarav's full-day seat, seat 2 is shared by two half-day students.
        assert!(matches!(
            on_seat(1, serde_json::json!({})),
            Err(ServiceError::SeatConflict(_))
        ));
        assert!(matches!(
            on_seat(2, serde_json::json!({ "dayType": "half", "halfDaySlot": "morning" })),
            Err(ServiceError::SeatConflict(_))
        ));
        assert!(on_seat(3, serde_json::json!({})).is_ok());
    }

    #[test]
    fn echoed_updates_do_not_conflict_with_themselves() {
        let priya = Uuid::from_u128(SAMPLE_IDS[1]);
        let patch: UpdateStudentRequest =
            serde_json::from_value(serde_json::json!({ "name": "Priya P." })).unwrap();
        let updated = echo_updated_student(today(), priya, patch).unwrap();
        assert_eq!(updated.seat_number, Some(2));
        assert_eq!(updated.name, "Priya P.");
    }
}
