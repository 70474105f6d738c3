// libs/appointment-cell/src/services/schedule.rs
//
// Pure time-of-day arithmetic for the salon schedule: the 12-hour clock
// representation used on the wire, the business-hours policy and the
// candidate slot generator. No I/O lives here.
use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("Formato de hora inválido: '{0}' (se espera HH:MM AM/PM, ejemplo: 10:00 AM)")]
    InvalidTimeFormat(String),

    #[error("La hora {hora} está fuera del horario laboral ({apertura} - {cierre})")]
    OutsideHours {
        hora: ClockTime,
        apertura: ClockTime,
        cierre: ClockTime,
    },

    #[error("La cita terminaría a las {fin}, fuera del horario laboral ({cierre})")]
    InsufficientTime { fin: ClockTime, cierre: ClockTime },
}

/// A point on the day's timeline: minutes since local midnight, in [0, 1440).
///
/// Parses from and prints as the salon's 12-hour clock form (`H:MM AM/PM`,
/// no leading zero on the hour) and round-trips through it losslessly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

pub const MINUTES_PER_DAY: u16 = 24 * 60;

impl ClockTime {
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn minutes(self) -> i32 {
        self.0 as i32
    }

    /// End of an interval starting here, wrapped for display purposes only.
    /// Accepted appointments never actually cross midnight. The sum is taken
    /// in i64 so arbitrary caller-supplied durations cannot overflow.
    pub fn wrapping_add(self, duration_minutes: i32) -> Self {
        let total = (self.0 as i64 + duration_minutes as i64).rem_euclid(MINUTES_PER_DAY as i64);
        Self(total as u16)
    }
}

impl FromStr for ClockTime {
    type Err = ScheduleError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let err = || ScheduleError::InvalidTimeFormat(input.to_string());

        let s = input.trim();
        if s.len() < 2 || !s.is_char_boundary(s.len() - 2) {
            return Err(err());
        }

        // Meridiem is the last two characters, optionally preceded by a space.
        let (time_part, meridiem) = s.split_at(s.len() - 2);
        let meridiem = meridiem.to_ascii_uppercase();
        if meridiem != "AM" && meridiem != "PM" {
            return Err(err());
        }
        let time_part = time_part.strip_suffix(' ').unwrap_or(time_part);

        let (hour_str, minute_str) = time_part.split_once(':').ok_or_else(err)?;
        if hour_str.is_empty()
            || hour_str.len() > 2
            || minute_str.len() != 2
            || !hour_str.bytes().all(|b| b.is_ascii_digit())
            || !minute_str.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(err());
        }

        let hour: u16 = hour_str.parse().map_err(|_| err())?;
        let minute: u16 = minute_str.parse().map_err(|_| err())?;
        if !(1..=12).contains(&hour) || minute > 59 {
            return Err(err());
        }

        // 12 AM is midnight, 12 PM is noon, any other PM hour shifts by 12.
        let hour24 = match (hour, meridiem.as_str()) {
            (12, "AM") => 0,
            (12, "PM") => 12,
            (h, "AM") => h,
            (h, _) => h + 12,
        };

        Ok(Self(hour24 * 60 + minute))
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hour24 = self.0 / 60;
        let minute = self.0 % 60;
        let meridiem = if hour24 >= 12 { "PM" } else { "AM" };
        let hour12 = match hour24 {
            0 => 12,
            1..=12 => hour24,
            _ => hour24 - 12,
        };
        write!(f, "{}:{:02} {}", hour12, minute, meridiem)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// The salon's operating window. An explicit value passed into the services
/// rather than ambient global state, so alternate schedules are testable.
#[derive(Debug, Clone)]
pub struct BusinessHours {
    pub open: ClockTime,
    pub close: ClockTime,
    pub slot_interval_minutes: u16,
    /// Start times that are always offered regardless of whether the service
    /// duration fits before closing. The salon keeps its historical "5:30 PM
    /// always bookable" rule through this list.
    pub duration_exempt_slots: Vec<ClockTime>,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            open: ClockTime(9 * 60),    // 9:00 AM
            close: ClockTime(18 * 60),  // 6:00 PM
            slot_interval_minutes: 30,
            duration_exempt_slots: vec![ClockTime(17 * 60 + 30)], // 5:30 PM
        }
    }
}

impl BusinessHours {
    /// Whether a point in time falls inside the operating window, both
    /// endpoints inclusive.
    pub fn contains(&self, time: ClockTime) -> bool {
        self.open <= time && time <= self.close
    }

    /// Whether an appointment starting at `start` runs entirely before close.
    /// Widened arithmetic: `duration_minutes` comes straight from the request
    /// and may be anything positive an i32 can hold.
    pub fn fits(&self, start: ClockTime, duration_minutes: i32) -> bool {
        start >= self.open
            && start.minutes() as i64 + duration_minutes as i64 <= self.close.minutes() as i64
    }

    pub fn is_duration_exempt(&self, start: ClockTime) -> bool {
        self.duration_exempt_slots.contains(&start)
    }

    /// Validates a proposed start time plus service duration against the
    /// operating window. Exempt slots skip the duration check entirely.
    pub fn validate_booking_window(
        &self,
        start: ClockTime,
        duration_minutes: i32,
    ) -> Result<(), ScheduleError> {
        if !self.contains(start) {
            return Err(ScheduleError::OutsideHours {
                hora: start,
                apertura: self.open,
                cierre: self.close,
            });
        }

        if self.is_duration_exempt(start) {
            return Ok(());
        }

        if !self.fits(start, duration_minutes) {
            return Err(ScheduleError::InsufficientTime {
                fin: start.wrapping_add(duration_minutes),
                cierre: self.close,
            });
        }

        Ok(())
    }

    /// Every candidate start time for a day, in chronological order: each
    /// multiple of the slot interval from opening through one interval before
    /// close (9:00 AM .. 5:30 PM for the defaults). Pure function of the
    /// policy; restartable.
    pub fn candidate_slots(&self) -> Vec<ClockTime> {
        let interval = self.slot_interval_minutes.max(1);
        let last = self.close.minutes() - interval as i32;

        let mut slots = Vec::new();
        let mut minute = self.open.minutes();
        while minute <= last {
            slots.push(ClockTime(minute as u16));
            minute += interval as i32;
        }
        slots
    }
}
