// Copyright (c) 2025 studio-booking
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::{NaiveTime, Timelike};
use common::{Appointment, AppointmentStatus, BusinessHours, Service};

/// Duration assumed for an appointment whose service can no longer be
/// resolved. Under-estimating availability is safer than failing the
/// whole computation over one malformed reference.
pub const FALLBACK_SERVICE_DURATION_MIN: i64 = 60;

/// An occupied time range on a given day, expressed in minutes since
/// midnight. All slot arithmetic happens in this representation so that
/// a stored "12:00:00" and a requested "12:00" compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookedInterval {
    pub start_min: i64,
    pub duration_min: i64,
}

impl BookedInterval {
    pub fn end_min(&self) -> i64 {
        self.start_min + self.duration_min
    }
}

/// Converts a wall-clock time to minutes since midnight, truncating any
/// seconds component.
pub fn minutes_since_midnight(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

/// Half-open interval overlap: `[start_a, end_a)` and `[start_b, end_b)`
/// share at least one instant. Touching endpoints (one interval ending
/// exactly when the other starts) are NOT a conflict.
pub fn intervals_overlap(start_a: i64, end_a: i64, start_b: i64, end_b: i64) -> bool {
    start_a < end_b && end_a > start_b
}

/// Resolves a day's appointments into occupied intervals.
///
/// Cancelled appointments are skipped entirely. An appointment whose
/// service id is missing from the catalog gets the fixed fallback
/// duration instead of aborting the computation.
pub fn booked_intervals(appointments: &[Appointment], services: &[Service]) -> Vec<BookedInterval> {
    appointments
        .iter()
        .filter(|apt| apt.status != AppointmentStatus::Cancelled)
        .map(|apt| {
            let duration_min = services
                .iter()
                .find(|svc| svc.id == apt.service_id)
                .map(|svc| svc.duration_minutes)
                .unwrap_or(FALLBACK_SERVICE_DURATION_MIN);
            BookedInterval {
                start_min: minutes_since_midnight(apt.time),
                duration_min,
            }
        })
        .collect()
}

/// Computes the bookable start times for one day.
///
/// Candidates start at `hours.start` and step by `granularity_min`,
/// strictly before `hours.end`. A candidate is kept when its occupied
/// interval `[c, c + duration_min)` fits entirely before closing and
/// does not overlap any booked interval. The result is in ascending
/// time order.
///
/// Invalid inputs (non-positive duration or granularity, start >= end)
/// yield an empty list rather than an error, to keep the calling UI
/// simple; callers are expected to validate admin-entered settings at
/// the boundary.
pub fn available_slots(
    hours: &BusinessHours,
    granularity_min: i64,
    duration_min: i64,
    booked: &[BookedInterval],
) -> Vec<NaiveTime> {
    let open_min = minutes_since_midnight(hours.start);
    let close_min = minutes_since_midnight(hours.end);

    if granularity_min <= 0 || duration_min <= 0 || open_min >= close_min {
        return Vec::new();
    }

    let mut slots = Vec::new();
    let mut candidate = open_min;

    while candidate < close_min {
        let candidate_end = candidate + duration_min;

        // The whole session must fit before closing time.
        let fits = candidate_end <= close_min;

        let conflicts = fits
            && booked.iter().any(|interval| {
                intervals_overlap(candidate, candidate_end, interval.start_min, interval.end_min())
            });

        if fits && !conflicts {
            if let Some(time) = NaiveTime::from_hms_opt(
                (candidate / 60) as u32,
                (candidate % 60) as u32,
                0,
            ) {
                slots.push(time);
            }
        }

        candidate += granularity_min;
    }

    slots
}
