//! Playback seam for ringing alarms.

use tracing::info;

use crate::models::{AlarmKey, ScheduleEntry};

/// Something that makes an alarm audible or visible.
///
/// `start` is called once when a dose is armed; `stop` when it is
/// acknowledged or dropped at the day boundary.
pub trait AlarmPlayer: Send {
    fn start(&self, entry: &ScheduleEntry);
    fn stop(&self, key: &AlarmKey);
}

/// Player that only logs. The presentation layer renders notifications itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentPlayer;

impl AlarmPlayer for SilentPlayer {
    fn start(&self, entry: &ScheduleEntry) {
        info!(time = %entry.time, medicine = %entry.medicine, "Alarm due");
    }

    fn stop(&self, key: &AlarmKey) {
        info!(alarm = %key, "Alarm stopped");
    }
}
