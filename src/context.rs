//! Optional user/work/sleep profile supplied per session.
//!
//! Every field is optional; consumers treat an absent field (or an absent
//! context) as neutral.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftType {
    Day,
    Night,
    Rotating,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressHistory {
    None,
    Mild,
    Moderate,
    Severe,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionContext {
    pub hours_worked: Option<f32>,
    pub sleep_hours: Option<f32>,
    /// Hours per day in front of screens
    #[serde(alias = "electronicsUsage", alias = "electronics_usage")]
    pub screen_time: Option<f32>,
    pub job_role: Option<String>,
    pub shift_type: Option<ShiftType>,
    pub stress_history: Option<StressHistory>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hours_worked(mut self, hours: f32) -> Self {
        self.hours_worked = Some(hours);
        self
    }

    pub fn with_sleep_hours(mut self, hours: f32) -> Self {
        self.sleep_hours = Some(hours);
        self
    }

    pub fn with_screen_time(mut self, hours: f32) -> Self {
        self.screen_time = Some(hours);
        self
    }

    pub fn with_shift(mut self, shift: ShiftType) -> Self {
        self.shift_type = Some(shift);
        self
    }

    pub fn with_history(mut self, history: StressHistory) -> Self {
        self.stress_history = Some(history);
        self
    }

    /// True when no field carries information.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
