//! Fuzz target: schedule document parsing
//!
//! Feeds arbitrary bytes to `WeeklySchedule::parse` and `TimeOfDay`'s
//! `FromStr`, verifying:
//! - No panics under arbitrary input
//! - Every accepted time is in range
//! - An accepted schedule re-serialises to a document that parses to the
//!   same value
//!
//! cargo fuzz run fuzz_schedule_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use kiosk::schedule::{TimeOfDay, WeeklySchedule};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    if let Ok(t) = text.parse::<TimeOfDay>() {
        assert!(t.hour() < 24 && t.minute() < 60);
        assert!(t.minutes() < 1440);
    }

    if let Ok(schedule) = WeeklySchedule::parse(text) {
        let again = WeeklySchedule::parse(&schedule.to_json())
            .expect("serialised schedule must parse");
        assert_eq!(again, schedule);
    }
});
