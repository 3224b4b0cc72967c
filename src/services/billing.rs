//! Monthly dues: due dates, status derivation, fee lookup and the sync plan
//! that keeps one payment row per student per month.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use crate::models::{
    payment::{NewPayment, Payment, PaymentStatus},
    settings::FeeDefaults,
    student::{DayType, Student, StudentStatus},
};

pub const DUE_DAY: u32 = 15;

/// The 15th of `today`'s month.
pub fn due_date_for(today: NaiveDate) -> NaiveDate {
    today.with_day(DUE_DAY).unwrap_or(today)
}

/// `due` until the due date has passed, then `overdue` while the subscription
/// runs and `expired` once it has ended. A student without an end date never
/// expires.
pub fn derive_status(
    today: NaiveDate,
    due_date: NaiveDate,
    subscription_end: Option<NaiveDate>,
) -> PaymentStatus {
    if today <= due_date {
        PaymentStatus::Due
    } else if subscription_end.is_some_and(|end| end < today) {
        PaymentStatus::Expired
    } else {
        PaymentStatus::Overdue
    }
}

/// The monthly fee for a student: the amount for their day type, then their
/// monthly amount, then the library-wide default.
pub fn fee_for(student: &Student, defaults: &FeeDefaults) -> f64 {
    let by_day_type = match student.day_type {
        DayType::Full => student.full_day_amount,
        DayType::Half => student.half_day_amount,
    };
    if by_day_type > 0.0 {
        by_day_type
    } else if student.monthly_amount > 0.0 {
        student.monthly_amount
    } else {
        defaults.for_day_type(student.day_type)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    Create(NewPayment),
    UpdateStatus {
        id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
    },
}

/// Works out which payment rows must be created or re-statused so that every
/// billable student has exactly one row for the current due month. Paid rows
/// are never touched.
pub fn plan_sync(
    students: &[Student],
    existing: &[Payment],
    today: NaiveDate,
    fees: &FeeDefaults,
) -> Vec<SyncAction> {
    let due_date = due_date_for(today);
    let current: HashMap<Uuid, &Payment> = existing
        .iter()
        .filter(|p| p.due_date == due_date)
        .map(|p| (p.student_id, p))
        .collect();

    students
        .iter()
        .filter(|s| s.status != StudentStatus::Inactive)
        .filter_map(|student| {
            let status = derive_status(today, due_date, student.subscription_end_date);
            match current.get(&student.id) {
                None => Some(SyncAction::Create(NewPayment {
                    student_id: student.id,
                    student_name: student.name.clone(),
                    amount: fee_for(student, fees),
                    currency: student.currency,
                    due_date,
                    paid_date: None,
                    status,
                    plan_type: student.plan_type,
                    day_type: student.day_type,
                    notes: None,
                })),
                Some(payment) if payment.status != PaymentStatus::Paid && payment.status != status => {
                    Some(SyncAction::UpdateStatus {
                        id: payment.id,
                        from: payment.status,
                        to: status,
                    })
                }
                Some(_) => None,
            }
        })
        .collect()
}

/// Applies a plan to an in-memory payment list. Mirrors what the database
/// sync does and backs the fallback payload.
pub fn apply_sync(payments: &mut Vec<Payment>, actions: Vec<SyncAction>) {
    for action in actions {
        match action {
            SyncAction::Create(new) => {
                let id = payment_id_for(new.student_id, new.due_date);
                payments.push(Payment::from_new(id, new));
            }
            SyncAction::UpdateStatus { id, to, .. } => {
                if let Some(payment) = payments.iter_mut().find(|p| p.id == id) {
                    payment.status = to;
                }
            }
        }
    }
}

/// Deterministic id for a generated in-memory payment, stable across calls
/// for the same student and month.
pub fn payment_id_for(student_id: Uuid, due_date: NaiveDate) -> Uuid {
    let month_key = (due_date.year() as u128) * 100 + due_date.month() as u128;
    Uuid::from_u128(student_id.as_u128() ^ month_key)
}
