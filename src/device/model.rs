//! Device models and their page resolutions.

use std::fmt;

use serde::Serialize;

/// Where the firmware reports the machine name.
pub const MACHINE_PATH: &str = "/sys/devices/soc0/machine";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Rm1,
    #[default]
    Rm2,
    PaperPro,
    PaperProMove,
}

impl DeviceType {
    /// Map the firmware machine string to a model.
    #[must_use]
    pub fn from_machine(machine: &str) -> Option<Self> {
        match machine.trim() {
            "reMarkable 1.0" | "reMarkable Prototype 1" => Some(Self::Rm1),
            "reMarkable 2.0" => Some(Self::Rm2),
            "reMarkable Ferrari" => Some(Self::PaperPro),
            "reMarkable Chiappa" => Some(Self::PaperProMove),
            _ => None,
        }
    }

    /// Page coordinate space in device pixels (width, height).
    #[must_use]
    pub const fn resolution(self) -> (u32, u32) {
        match self {
            Self::Rm1 | Self::Rm2 => (1404, 1872),
            Self::PaperPro => (1620, 2160),
            Self::PaperProMove => (954, 1696),
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Rm1 => "reMarkable 1",
            Self::Rm2 => "reMarkable 2",
            Self::PaperPro => "reMarkable Paper Pro",
            Self::PaperProMove => "reMarkable Paper Pro Move",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_lookup() {
        assert_eq!(DeviceType::from_machine("reMarkable 1.0\n"), Some(DeviceType::Rm1));
        assert_eq!(
            DeviceType::from_machine("reMarkable Prototype 1"),
            Some(DeviceType::Rm1)
        );
        assert_eq!(DeviceType::from_machine("reMarkable 2.0"), Some(DeviceType::Rm2));
        assert_eq!(
            DeviceType::from_machine("reMarkable Ferrari"),
            Some(DeviceType::PaperPro)
        );
        assert_eq!(
            DeviceType::from_machine("reMarkable Chiappa"),
            Some(DeviceType::PaperProMove)
        );
        assert_eq!(DeviceType::from_machine("Kindle"), None);
    }

    #[test]
    fn test_resolutions() {
        assert_eq!(DeviceType::Rm1.resolution(), (1404, 1872));
        assert_eq!(DeviceType::PaperPro.resolution(), (1620, 2160));
        assert_eq!(DeviceType::PaperProMove.resolution(), (954, 1696));
    }
}
