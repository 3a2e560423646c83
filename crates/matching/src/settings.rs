//! Tunables for the services.  The CLI loads these from the layered
//! configuration; tests use the defaults.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub booking: BookingSettings,
    #[serde(default)]
    pub demo: DemoSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Lifetime of an emailed verification code.
    #[serde(default = "default_verification_ttl_minutes")]
    pub verification_ttl_minutes: i64,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    #[serde(default)]
    pub service_area: ServiceArea,
}

const fn default_verification_ttl_minutes() -> i64 {
    15
}

const fn default_session_ttl_hours() -> i64 {
    24 * 7
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            verification_ttl_minutes: default_verification_ttl_minutes(),
            session_ttl_hours: default_session_ttl_hours(),
            service_area: ServiceArea::default(),
        }
    }
}

/// Postal codes the service currently operates in.  Sign-ups from outside
/// are kept on a waitlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceArea {
    pub city: String,
    pub postal_min: u32,
    pub postal_max: u32,
}

impl Default for ServiceArea {
    fn default() -> Self {
        Self { city: "Leuven".into(), postal_min: 3000, postal_max: 3012 }
    }
}

impl ServiceArea {
    pub fn contains(&self, postal_code: &str) -> bool {
        postal_code
            .trim()
            .parse::<u32>()
            .map_or(false, |code| (self.postal_min..=self.postal_max).contains(&code))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSettings {
    /// Most timeslots one repair request may hold at once.
    #[serde(default = "default_max_selection")]
    pub max_selection: usize,
    /// Capacity of generated timeslots.
    #[serde(default = "default_capacity")]
    pub default_capacity: i32,
    /// How far ahead generated timeslots reach.
    #[serde(default = "default_days_ahead")]
    pub days_ahead: u32,
}

const fn default_max_selection() -> usize {
    5
}

const fn default_capacity() -> i32 {
    5
}

const fn default_days_ahead() -> u32 {
    14
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            max_selection: default_max_selection(),
            default_capacity: default_capacity(),
            days_ahead: default_days_ahead(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoSettings {
    #[serde(default = "default_demo_enabled")]
    pub enabled: bool,
}

const fn default_demo_enabled() -> bool {
    true
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self { enabled: default_demo_enabled() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leuven_postal_codes_are_served() {
        let area = ServiceArea::default();
        assert!(area.contains("3000"));
        assert!(area.contains(" 3012 "));
        assert!(!area.contains("3013"));
        assert!(!area.contains("1000"));
        assert!(!area.contains("B-3000"));
    }
}
