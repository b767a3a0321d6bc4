use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Timelike, Utc};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Simply converts the ``SystemTime`` to a ``DateTime<Local>``, it is a private
/// method used internally by Ease, as such why it lives in utils module. Instants
/// chrono cannot represent collapse onto the UNIX Epoch
pub fn system_time_to_date_time(t: SystemTime) -> DateTime<Local> {
    let (sec, nsec) = match t.duration_since(UNIX_EPOCH) {
        Ok(dur) => (dur.as_secs() as i64, dur.subsec_nanos()),
        Err(e) => {
            let dur = e.duration();
            let (sec, nsec) = (dur.as_secs() as i64, dur.subsec_nanos());
            if nsec == 0 {
                (-sec, 0)
            } else {
                (-sec - 1, 1_000_000_000 - nsec)
            }
        }
    };

    DateTime::<Utc>::from_timestamp(sec, nsec)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        .with_timezone(&Local)
}

/// Simply converts a ``DateTime`` of any timezone to a ``SystemTime``, it is a private
/// method used internally by Ease, as such why it lives in utils module
pub fn date_time_to_system_time(dt: DateTime<impl TimeZone>) -> SystemTime {
    let secs = dt.timestamp();
    let nanos = dt.timestamp_subsec_nanos();
    if secs >= 0 {
        UNIX_EPOCH + Duration::new(secs as u64, nanos)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs()) + Duration::from_nanos(nanos as u64)
    }
}

/// The local wall-clock reading of ``t`` truncated to the whole second, this is the value
/// recurrences are matched against
pub fn local_second(t: SystemTime) -> NaiveDateTime {
    let local = system_time_to_date_time(t).naive_local();
    local.with_nanosecond(0).unwrap_or(local)
}

/// The first whole-second boundary strictly after ``t``
pub fn next_second(t: SystemTime) -> SystemTime {
    match t.duration_since(UNIX_EPOCH) {
        Ok(dur) => UNIX_EPOCH + Duration::from_secs(dur.as_secs() + 1),
        Err(_) => t + Duration::from_secs(1),
    }
}

/// English ordinal suffix for a day of the month (``1st``, ``2nd``, ``11th``, ``23rd``)
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
