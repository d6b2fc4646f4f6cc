/// Shape of one simulated edit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditScenario {
    pub name: &'static str,
    pub servers: u16,
    pub edits: usize,
    /// Edits produced before the first server is registered.
    pub discovery_after: usize,
    pub max_packet_size: usize,
    pub max_pending_messages: usize,
    /// Flush cadence in edits; zero flushes only at the end.
    pub flush_every: usize,
    /// Give server `k` ownership of octant `k - 1` instead of broadcasting.
    pub octant_jurisdictions: bool,
}

pub const SMOKE: EditScenario = EditScenario {
    name: "smoke",
    servers: 2,
    edits: 400,
    discovery_after: 0,
    max_packet_size: 1500,
    max_pending_messages: 100,
    flush_every: 64,
    octant_jurisdictions: false,
};

pub const BOOTSTRAP_PRESSURE: EditScenario = EditScenario {
    name: "bootstrap_pressure",
    servers: 3,
    edits: 600,
    discovery_after: 250,
    max_packet_size: 256,
    max_pending_messages: 100,
    flush_every: 0,
    octant_jurisdictions: false,
};

pub const SPLIT_OCTANTS: EditScenario = EditScenario {
    name: "split_octants",
    servers: 8,
    edits: 2_000,
    discovery_after: 40,
    max_packet_size: 512,
    max_pending_messages: 500,
    flush_every: 200,
    octant_jurisdictions: true,
};

pub fn all() -> [EditScenario; 3] {
    [SMOKE, BOOTSTRAP_PRESSURE, SPLIT_OCTANTS]
}

impl EditScenario {
    /// Same scenario scaled down for quick local runs.
    pub fn quick(mut self) -> Self {
        self.edits /= 4;
        self.discovery_after /= 4;
        self.flush_every /= 4;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{all, BOOTSTRAP_PRESSURE};

    #[test]
    fn bootstrap_pressure_overflows_its_pending_bound() {
        assert!(BOOTSTRAP_PRESSURE.discovery_after > BOOTSTRAP_PRESSURE.max_pending_messages);
    }

    #[test]
    fn scenarios_have_unique_names_and_servers() {
        let scenarios = all();
        for (i, a) in scenarios.iter().enumerate() {
            assert!(a.servers > 0 && a.servers <= 8);
            assert!(scenarios[i + 1..].iter().all(|b| b.name != a.name));
        }
    }

    #[test]
    fn quick_scales_down_edit_counts() {
        let quick = BOOTSTRAP_PRESSURE.quick();
        assert_eq!(quick.edits, 150);
        assert_eq!(quick.discovery_after, 62);
        assert_eq!(quick.max_pending_messages, 100);
    }
}
