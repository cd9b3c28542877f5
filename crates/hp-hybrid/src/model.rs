//! CPU model definitions for the HP hybrid family.
//!
//! The family is a closed set: the 5061-3001 (binary processor + I/O
//! controller + extended math chip + memory address extension) and the
//! 5061-3011 (binary processor + I/O controller only). Model metadata
//! gates the extended-instruction decoder and the address extension
//! strategy.

/// Selected HP hybrid CPU model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuModel {
    /// HP 5061-3001: BPC + IOC + EMC, with memory address extension.
    Hp3001,
    /// HP 5061-3011: BPC + IOC only, 16-bit flat address space.
    Hp3011,
}

/// Capability flags for a specific CPU model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Memory address extension (R32-R37 block-select registers).
    pub mae: bool,
    /// Extended math chip instruction set (BCD arithmetic, MPY, CIM/SIM).
    pub emc: bool,
}

impl CpuModel {
    /// Static capability set for this CPU model.
    #[must_use]
    pub const fn capabilities(self) -> Capabilities {
        match self {
            Self::Hp3001 => Capabilities {
                mae: true,
                emc: true,
            },
            Self::Hp3011 => Capabilities {
                mae: false,
                emc: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Capabilities, CpuModel};

    #[test]
    fn capabilities_match_chip_sets() {
        assert_eq!(
            CpuModel::Hp3001.capabilities(),
            Capabilities {
                mae: true,
                emc: true
            }
        );
        assert_eq!(
            CpuModel::Hp3011.capabilities(),
            Capabilities {
                mae: false,
                emc: false
            }
        );
    }
}
