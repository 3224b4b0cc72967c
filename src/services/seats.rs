//! Seat occupancy, derived from the student list on every read.
//!
//! Seats are never stored. A seat is held by one full-day student, or shared
//! by up to two half-day students (one per slot). The write path enforces this
//! through [`check_assignment`]; [`derive_seats`] still copes with rows that
//! violate it, keeping whichever student was created first.

use std::collections::BTreeMap;

use tracing::warn;

use crate::models::{
    seat::{Seat, SeatAvailability, SeatOccupant, SeatSlots, SeatStatus, TOTAL_SEATS},
    student::{DayType, HalfDaySlot, Student},
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeatConflict {
    #[error("Seat number {0} is out of range (1-100)")]
    OutOfRange(i32),
    #[error("Seat {0} is already taken for the full day by {1}")]
    FullDayTaken(i32, String),
    #[error("Seat {0} is shared by half-day students; a full-day plan needs a vacant seat")]
    NotVacant(i32),
    #[error("The {1} slot of seat {0} is already taken by {2}")]
    SlotTaken(i32, HalfDaySlot, String),
    #[error("Both half-day slots of seat {0} are taken")]
    BothSlotsTaken(i32),
}

fn in_range(seat: i32) -> bool {
    (1..=TOTAL_SEATS).contains(&seat)
}

/// Builds the full seat map, one entry per seat number in ascending order.
pub fn derive_seats(students: &[Student]) -> Vec<Seat> {
    let mut holders: Vec<&Student> = students
        .iter()
        .filter(|s| s.status.holds_seat() && s.seat_number.is_some_and(in_range))
        .collect();
    holders.sort_by_key(|s| s.created_at);

    let mut by_seat: BTreeMap<i32, Vec<&Student>> = BTreeMap::new();
    for student in holders {
        if let Some(seat) = student.seat_number {
            by_seat.entry(seat).or_default().push(student);
        }
    }

    (1..=TOTAL_SEATS)
        .map(|n| build_seat(n, by_seat.get(&n).map(Vec::as_slice).unwrap_or(&[])))
        .collect()
}

fn build_seat(seat_number: i32, occupants: &[&Student]) -> Seat {
    if let Some(full) = occupants.iter().find(|s| s.day_type == DayType::Full) {
        for ignored in occupants.iter().filter(|s| s.id != full.id) {
            warn!(
                seat = seat_number,
                holder = %full.id,
                ignored = %ignored.id,
                "seat already held for the full day, ignoring conflicting student"
            );
        }
        return Seat {
            seat_number,
            status: SeatStatus::Full,
            is_occupied: true,
            student: Some(SeatOccupant::from(*full)),
            morning_student: None,
            evening_student: None,
            available_slot: None,
        };
    }

    let mut morning: Option<SeatOccupant> = None;
    let mut evening: Option<SeatOccupant> = None;
    for student in occupants {
        let slot = student.half_day_slot.unwrap_or(if morning.is_none() {
            HalfDaySlot::Morning
        } else {
            HalfDaySlot::Evening
        });
        let target = match slot {
            HalfDaySlot::Morning => &mut morning,
            HalfDaySlot::Evening => &mut evening,
        };
        if target.is_none() {
            *target = Some(SeatOccupant::from(*student));
        } else {
            warn!(
                seat = seat_number,
                slot = %slot,
                ignored = %student.id,
                "half-day slot already taken, ignoring conflicting student"
            );
        }
    }

    let (status, available_slot) = match (&morning, &evening) {
        (None, None) => (SeatStatus::Vacant, None),
        (Some(_), None) => (SeatStatus::HalfAvailable, Some(HalfDaySlot::Evening)),
        (None, Some(_)) => (SeatStatus::HalfAvailable, Some(HalfDaySlot::Morning)),
        (Some(_), Some(_)) => (SeatStatus::HalfShared, None),
    };

    Seat {
        seat_number,
        status,
        is_occupied: status == SeatStatus::HalfShared,
        student: None,
        morning_student: morning,
        evening_student: evening,
        available_slot,
    }
}

/// Counts and per-seat slot availability for the booking view.
pub fn summarize(seats: &[Seat]) -> SeatAvailability {
    let count = |status: SeatStatus| seats.iter().filter(|s| s.status == status).count();

    let slots: Vec<SeatSlots> = seats
        .iter()
        .map(|seat| {
            let (morning, evening) = match seat.status {
                SeatStatus::Vacant => (true, true),
                SeatStatus::Full | SeatStatus::HalfShared => (false, false),
                SeatStatus::HalfAvailable => (
                    seat.available_slot == Some(HalfDaySlot::Morning),
                    seat.available_slot == Some(HalfDaySlot::Evening),
                ),
            };
            SeatSlots {
                seat_number: seat.seat_number,
                full_day_available: seat.status == SeatStatus::Vacant,
                morning_available: morning,
                evening_available: evening,
            }
        })
        .collect();

    let vacant = count(SeatStatus::Vacant);
    let full = count(SeatStatus::Full);
    let half_shared = count(SeatStatus::HalfShared);

    SeatAvailability {
        total: seats.len(),
        vacant,
        full,
        half_shared,
        half_available: count(SeatStatus::HalfAvailable),
        occupied: full + half_shared,
        available_full_day: vacant,
        available_morning: slots.iter().filter(|s| s.morning_available).count(),
        available_evening: slots.iter().filter(|s| s.evening_available).count(),
        seats: slots,
    }
}

/// Checks that `candidate` can hold its seat next to the students already on
/// it. `occupants` may include the candidate itself and students that no
/// longer hold a seat; both are skipped.
pub fn check_assignment(occupants: &[Student], candidate: &Student) -> Result<(), SeatConflict> {
    let Some(seat) = candidate.seat_number else {
        return Ok(());
    };
    if !in_range(seat) {
        return Err(SeatConflict::OutOfRange(seat));
    }
    if !candidate.status.holds_seat() {
        return Ok(());
    }

    let others: Vec<&Student> = occupants
        .iter()
        .filter(|s| s.id != candidate.id && s.status.holds_seat() && s.seat_number == Some(seat))
        .collect();

    if let Some(full) = others.iter().find(|s| s.day_type == DayType::Full) {
        return Err(SeatConflict::FullDayTaken(seat, full.name.clone()));
    }

    match candidate.day_type {
        DayType::Full if others.is_empty() => Ok(()),
        DayType::Full => Err(SeatConflict::NotVacant(seat)),
        DayType::Half => match candidate.half_day_slot {
            Some(slot) => match others.iter().find(|s| s.half_day_slot == Some(slot)) {
                Some(taken) => Err(SeatConflict::SlotTaken(seat, slot, taken.name.clone())),
                None if others.len() >= 2 => Err(SeatConflict::BothSlotsTaken(seat)),
                None => Ok(()),
            },
            None if others.len() >= 2 => Err(SeatConflict::BothSlotsTaken(seat)),
            None => Ok(()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::student::{CreateStudentRequest, StudentStatus};
    use chrono::{Duration, Utc};

    fn student(name: &str, seat: i32, day_type: DayType, slot: Option<HalfDaySlot>) -> Student {
        let req: CreateStudentRequest =
            serde_json::from_value(serde_json::json!({ "name": name, "mobile": "9999999999" }))
                .unwrap();
        let mut s = Student::from_request(req);
        s.seat_number = Some(seat);
        s.day_type = day_type;
        s.half_day_slot = slot;
        s
    }

    fn half(name: &str, seat: i32, slot: HalfDaySlot) -> Student {
        student(name, seat, DayType::Half, Some(slot))
    }

    #[test]
    fn every_seat_appears_once_in_order() {
        let students = vec![
            student("A", 3, DayType::Full, None),
            half("B", 3, HalfDaySlot::Morning),
            half("C", 100, HalfDaySlot::Evening),
        ];
        let seats = derive_seats(&students);
        assert_eq!(seats.len(), 100);
        for (i, seat) in seats.iter().enumerate() {
            assert_eq!(seat.seat_number, i as i32 + 1);
        }
    }

    #[test]
    fn full_day_seat_offers_no_half_slot() {
        let mut early = student("Early", 7, DayType::Full, None);
        early.created_at = Utc::now() - Duration::days(2);
        let students = vec![
            half("Late", 7, HalfDaySlot::Evening),
            early,
            student("Second", 7, DayType::Full, None),
        ];
        let seat = &derive_seats(&students)[6];
        assert_eq!(seat.status, SeatStatus::Full);
        assert!(seat.is_occupied);
        assert_eq!(seat.available_slot, None);
        assert_eq!(seat.student.as_ref().unwrap().name, "Early");
        assert!(seat.morning_student.is_none() && seat.evening_student.is_none());
    }

    #[test]
    fn two_half_day_students_share_a_seat() {
        let students = vec![
            half("Morning", 10, HalfDaySlot::Morning),
            half("Evening", 10, HalfDaySlot::Evening),
        ];
        let seat = &derive_seats(&students)[9];
        assert_eq!(seat.status, SeatStatus::HalfShared);
        assert!(seat.is_occupied);
        assert_eq!(seat.morning_student.as_ref().unwrap().name, "Morning");
        assert_eq!(seat.evening_student.as_ref().unwrap().name, "Evening");
    }

    #[test]
    fn one_half_day_student_names_the_free_slot() {
        let seat = &derive_seats(&[half("Only", 1, HalfDaySlot::Morning)])[0];
        assert_eq!(seat.status, SeatStatus::HalfAvailable);
        assert!(!seat.is_occupied);
        assert_eq!(seat.available_slot, Some(HalfDaySlot::Evening));
    }

    #[test]
    fn inactive_students_free_their_seat() {
        let mut gone = student("Gone", 5, DayType::Full, None);
        gone.status = StudentStatus::Inactive;
        let mut lapsed = student("Lapsed", 6, DayType::Full, None);
        lapsed.status = StudentStatus::Expired;

        let seats = derive_seats(&[gone, lapsed]);
        assert_eq!(seats[4].status, SeatStatus::Vacant);
        assert_eq!(seats[5].status, SeatStatus::Full);
    }

    #[test]
    fn half_day_student_without_slot_takes_the_free_one() {
        let students = vec![
            half("Set", 2, HalfDaySlot::Morning),
            student("Unset", 2, DayType::Half, None),
        ];
        let seat = &derive_seats(&students)[1];
        assert_eq!(seat.status, SeatStatus::HalfShared);
        assert_eq!(seat.evening_student.as_ref().unwrap().name, "Unset");
    }

    #[test]
    fn summary_counts_slots() {
        let students = vec![
            student("F", 1, DayType::Full, None),
            half("M", 2, HalfDaySlot::Morning),
            half("E", 3, HalfDaySlot::Evening),
            half("M2", 4, HalfDaySlot::Morning),
            half("E2", 4, HalfDaySlot::Evening),
        ];
        let summary = summarize(&derive_seats(&students));
        assert_eq!(summary.total, 100);
        assert_eq!(summary.full, 1);
        assert_eq!(summary.half_available, 2);
        assert_eq!(summary.half_shared, 1);
        assert_eq!(summary.vacant, 96);
        assert_eq!(summary.occupied, 2);
        assert_eq!(summary.available_full_day, 96);
        // 96 vacant seats plus seat 2's evening and seat 3's morning
        assert_eq!(summary.available_morning, 97);
        assert_eq!(summary.available_evening, 97);
        assert!(!summary.seats[0].morning_available);
        assert!(summary.seats[1].evening_available);
    }

    #[test]
    fn assignment_rejects_conflicts() {
        let occupant = half("Morning", 8, HalfDaySlot::Morning);
        let others = vec![occupant.clone()];

        let same_slot = half("Intruder", 8, HalfDaySlot::Morning);
        assert!(matches!(
            check_assignment(&others, &same_slot),
            Err(SeatConflict::SlotTaken(8, HalfDaySlot::Morning, _))
        ));

        let full = student("Full", 8, DayType::Full, None);
        assert_eq!(check_assignment(&others, &full), Err(SeatConflict::NotVacant(8)));

        let evening = half("Evening", 8, HalfDaySlot::Evening);
        assert_eq!(check_assignment(&others, &evening), Ok(()));

        let out_of_range = student("Far", 101, DayType::Full, None);
        assert_eq!(
            check_assignment(&[], &out_of_range),
            Err(SeatConflict::OutOfRange(101))
        );
    }

    #[test]
    fn assignment_ignores_the_candidate_itself() {
        let me = student("Me", 9, DayType::Full, None);
        assert_eq!(check_assignment(&[me.clone()], &me), Ok(()));
    }

    #[test]
    fn full_day_occupant_blocks_half_day_candidates() {
        let others = vec![student("Owner", 11, DayType::Full, None)];
        let candidate = half("Hopeful", 11, HalfDaySlot::Evening);
        assert!(matches!(
            check_assignment(&others, &candidate),
            Err(SeatConflict::FullDayTaken(11, name)) if name == "Owner"
        ));
    }
}
