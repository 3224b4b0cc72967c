//! Reminder sweep: one reminder per student whose subscription ends within
//! the configured window, sent one at a time.

use std::time::Duration;

use chrono::NaiveDate;

use crate::{
    models::{
        settings::Settings,
        student::{Student, StudentStatus},
        whatsapp::{
            MessageKind, Notification, ReminderFailure, ReminderSweepReport,
        },
    },
    services::{
        billing,
        metrics::WHATSAPP_COUNTER,
        whatsapp::{ensure_enabled, WhatsAppError, WhatsAppService},
    },
};

/// Pause between consecutive gateway calls.
pub const SEND_SPACING: Duration = Duration::from_millis(100);

/// Active students whose subscription ends between `today` and
/// `today + days_before`, inclusive.
pub fn expiring_students(students: &[Student], today: NaiveDate, days_before: u32) -> Vec<&Student> {
    let horizon = today + chrono::Duration::days(i64::from(days_before));
    students
        .iter()
        .filter(|s| s.status == StudentStatus::Active)
        .filter(|s| {
            s.subscription_end_date
                .is_some_and(|end| end >= today && end <= horizon)
        })
        .collect()
}

pub fn reminder_for(student: &Student, settings: &Settings, today: NaiveDate) -> Notification {
    Notification::Reminder {
        name: student.name.clone(),
        amount: billing::fee_for(student, &settings.fees),
        currency: student.currency,
        due_date: student
            .subscription_end_date
            .unwrap_or_else(|| billing::due_date_for(today)),
    }
}

/// Runs one sweep. Fails fast when reminders are switched off or the gateway
/// has no credentials; individual send failures are collected in the report
/// and the sweep carries on.
pub async fn run_sweep(
    whatsapp: &WhatsAppService,
    settings: &Settings,
    students: &[Student],
    today: NaiveDate,
    days_before: Option<u32>,
    dry_run: bool,
) -> Result<ReminderSweepReport, WhatsAppError> {
    ensure_enabled(settings, MessageKind::Reminder)?;
    if !dry_run {
        whatsapp.credentials()?;
    }

    let days = days_before.unwrap_or(settings.notifications.reminder_days_before);
    let candidates = expiring_students(students, today, days);
    let mut report = ReminderSweepReport {
        candidates: candidates.len(),
        dry_run,
        ..Default::default()
    };
    if dry_run {
        return Ok(report);
    }

    for (i, student) in candidates.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(SEND_SPACING).await;
        }
        let notification = reminder_for(student, settings, today);
        match whatsapp.send(settings, &notification, &student.mobile).await {
            Ok(_) => {
                WHATSAPP_COUNTER.with_label_values(&["reminder", "sent"]).inc();
                report.sent += 1;
            }
            Err(e) => {
                let outcome = if e.is_rejection() { "rejected" } else { "failed" };
                WHATSAPP_COUNTER.with_label_values(&["reminder", outcome]).inc();
                tracing::warn!(student = %student.id, "reminder not sent: {e}");
                report.failed += 1;
                report.failures.push(ReminderFailure {
                    student_id: student.id,
                    name: student.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        candidates = report.candidates,
        sent = report.sent,
        failed = report.failed,
        "reminder sweep finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::student::CreateStudentRequest;

    fn student(name: &str, end: Option<NaiveDate>, status: StudentStatus) -> Student {
        let req: CreateStudentRequest =
            serde_json::from_value(serde_json::json!({ "name": name, "mobile": "9000000000" }))
                .unwrap();
        let mut s = Student::from_request(req);
        s.subscription_end_date = end;
        s.status = status;
        s
    }

    #[test]
    fn window_is_inclusive_and_active_only() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let d = |day| NaiveDate::from_ymd_opt(2024, 3, day);
        let students = vec![
            student("today", d(10), StudentStatus::Active),
            student("edge", d(13), StudentStatus::Active),
            student("later", d(14), StudentStatus::Active),
            student("past", d(9), StudentStatus::Active),
            student("inactive", d(11), StudentStatus::Inactive),
            student("open-ended", None, StudentStatus::Active),
        ];
        let names: Vec<&str> = expiring_students(&students, today, 3)
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["today", "edge"]);
    }

    #[test]
    fn reminder_is_due_on_the_end_date() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
        let s = student("Ira", Some(end), StudentStatus::Active);
        match reminder_for(&s, &Settings::default(), today) {
            Notification::Reminder { due_date, amount, .. } => {
                assert_eq!(due_date, end);
                assert_eq!(amount, 1500.0);
            }
            other => panic!("unexpected notification {other:?}"),
        }
    }
}
