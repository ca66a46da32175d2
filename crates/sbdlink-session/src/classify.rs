use std::fmt;

/// MO status codes that mean no signal or a transient gateway condition.
pub const NO_SIGNAL_CODES: [u8; 13] = [10, 11, 12, 13, 14, 17, 18, 19, 32, 35, 36, 37, 38];

/// Highest MO status in the normal range (none, success, generic error).
const LAST_NORMAL_CODE: u8 = 4;

/// Modem failures that no amount of retrying will clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HardwareFault {
    GatewayAccessDenied,
    IsuLocked,
    AntennaFault,
    RadioDisabled,
    PllLockFailure,
}

impl HardwareFault {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            15 => Some(HardwareFault::GatewayAccessDenied),
            16 => Some(HardwareFault::IsuLocked),
            33 => Some(HardwareFault::AntennaFault),
            34 => Some(HardwareFault::RadioDisabled),
            65 => Some(HardwareFault::PllLockFailure),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            HardwareFault::GatewayAccessDenied => 15,
            HardwareFault::IsuLocked => 16,
            HardwareFault::AntennaFault => 33,
            HardwareFault::RadioDisabled => 34,
            HardwareFault::PllLockFailure => 65,
        }
    }
}

impl fmt::Display for HardwareFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            HardwareFault::GatewayAccessDenied => "gateway access denied",
            HardwareFault::IsuLocked => "ISU locked",
            HardwareFault::AntennaFault => "antenna fault",
            HardwareFault::RadioDisabled => "radio disabled",
            HardwareFault::PllLockFailure => "PLL lock failure",
        };
        f.write_str(text)
    }
}

/// What the contact loop does with a session's MO status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoDisposition {
    /// 0-4: keep looping.
    Continue,
    /// End the contact without error.
    NoSignal,
    /// Abort the contact with a hardware fault.
    Fault(HardwareFault),
    /// Abort the contact with a generic transmit error.
    Unclassified,
}

/// Classify an `+SBDIX` MO status.
pub fn classify(mo_status: u8) -> MoDisposition {
    if mo_status <= LAST_NORMAL_CODE {
        MoDisposition::Continue
    } else if NO_SIGNAL_CODES.contains(&mo_status) {
        MoDisposition::NoSignal
    } else if let Some(fault) = HardwareFault::from_code(mo_status) {
        MoDisposition::Fault(fault)
    } else {
        MoDisposition::Unclassified
    }
}
