//! Alarm query construction.

use chrono::{DateTime, Utc};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Builds the alarm-view query for one poll window.
///
/// Pure function of `[begin, end)`; the poll loop treats the returned
/// string as opaque and passes it to the source verbatim. The lower bound
/// is inclusive and the upper bound exclusive, so consecutive windows
/// never report the same event twice.
pub fn build_alarm_query(begin: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!(
        "ALARMVIEW: SELECT * FROM ALGVIEWEX WHERE DATETIME >= '{}' AND DATETIME < '{}'",
        begin.format(TIME_FORMAT),
        end.format(TIME_FORMAT)
    )
}
