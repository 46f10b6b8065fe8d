/// Outcome of one non-blocking pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pump {
    /// Nothing could be moved this tick.
    Idle,
    /// Bytes were moved; `frames` complete frames were dispatched.
    Progress { bytes: usize, frames: usize },
}

impl Pump {
    /// Combine the outcomes of two pumps within the same tick.
    pub fn merge(self, other: Pump) -> Pump {
        match (self, other) {
            (Pump::Idle, other) => other,
            (this, Pump::Idle) => this,
            (
                Pump::Progress { bytes, frames },
                Pump::Progress {
                    bytes: more_bytes,
                    frames: more_frames,
                },
            ) => Pump::Progress {
                bytes: bytes + more_bytes,
                frames: frames + more_frames,
            },
        }
    }

    pub fn frames(self) -> usize {
        match self {
            Pump::Idle => 0,
            Pump::Progress { frames, .. } => frames,
        }
    }

    pub fn status(self) -> Status {
        match self {
            Pump::Idle => Status::Idle,
            Pump::Progress { .. } => Status::Ok,
        }
    }
}

/// Flat status set shared with non-Rust callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Idle,
    Overflow,
    HelperClosed,
    ProtocolError,
    InvalidOpcode,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Idle => "idle",
            Status::Overflow => "overflow",
            Status::HelperClosed => "helper-closed",
            Status::ProtocolError => "protocol-error",
            Status::InvalidOpcode => "invalid-opcode",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
