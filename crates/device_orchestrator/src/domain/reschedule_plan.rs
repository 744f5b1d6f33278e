use common::domain::{DeviceChanges, DeviceStatus, DeviceType};

/// What an update does to the device's health-check job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReschedulePlan {
    /// Remove the current job and arm one with the device's schedule
    Reschedule,
    /// Remove the current job and leave the device unscheduled
    UnscheduleOnly,
    Noop,
}

impl ReschedulePlan {
    /// Decide from (device type, new status, schedule changed).
    ///
    /// Gates: a schedule change always re-arms, even alongside a
    /// deactivation; a bare transition to Inactive only unschedules.
    /// Temperature sensors are passive, so any Active/Inactive transition
    /// re-arms like a schedule change does.
    pub fn from_changes(device_type: DeviceType, changes: &DeviceChanges) -> Self {
        let schedule_changed = changes.schedule.is_some();
        match (device_type, changes.status) {
            (_, _) if schedule_changed => ReschedulePlan::Reschedule,
            (DeviceType::Gates, Some(DeviceStatus::Inactive)) => ReschedulePlan::UnscheduleOnly,
            (_, Some(DeviceStatus::Active | DeviceStatus::Inactive)) => ReschedulePlan::Reschedule,
            _ => ReschedulePlan::Noop,
        }
    }
}
