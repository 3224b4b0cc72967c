use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use super::student::{DayType, HalfDaySlot, Student, StudentStatus};

pub const TOTAL_SEATS: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeatStatus {
    Vacant,
    Full,
    HalfAvailable,
    HalfShared,
}

/// The slice of a student exposed on a seat.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatOccupant {
    pub id: Uuid,
    pub name: String,
    pub mobile: String,
    pub day_type: DayType,
    pub half_day_slot: Option<HalfDaySlot>,
    pub status: StudentStatus,
    pub subscription_end_date: Option<NaiveDate>,
}

impl From<&Student> for SeatOccupant {
    fn from(s: &Student) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            mobile: s.mobile.clone(),
            day_type: s.day_type,
            half_day_slot: s.half_day_slot,
            status: s.status,
            subscription_end_date: s.subscription_end_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    pub seat_number: i32,
    pub status: SeatStatus,
    pub is_occupied: bool,
    pub student: Option<SeatOccupant>,
    pub morning_student: Option<SeatOccupant>,
    pub evening_student: Option<SeatOccupant>,
    pub available_slot: Option<HalfDaySlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatSlots {
    pub seat_number: i32,
    pub full_day_available: bool,
    pub morning_available: bool,
    pub evening_available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatAvailability {
    pub total: usize,
    pub vacant: usize,
    pub full: usize,
    pub half_shared: usize,
    pub half_available: usize,
    pub occupied: usize,
    pub available_full_day: usize,
    pub available_morning: usize,
    pub available_evening: usize,
    pub seats: Vec<SeatSlots>,
}
