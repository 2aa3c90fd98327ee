//! System status and fault taxonomy.

use ft_config::Subcomponent;
use ft_controls::FlowPath;
use ft_core::{PointId, Real};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A blocking condition raised by a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FaultKind {
    /// Flow stayed below minimum after retry and path switch.
    LowFlow { path: FlowPath },
    /// Generator at a point failed its voltage or power health check.
    GeneratorFailure { point: PointId },
    /// Magnet at a point could not hold minimum strength.
    MagnetFailure { point: PointId },
    /// A load subcomponent exceeded its temperature limit.
    Overheat { component: Subcomponent },
    /// Storage could not cover the deficit.
    ///
    /// `available_wh` is what storage held above its floor before the draw;
    /// `idle_need_wh` is what the Idle mode needs for one cycle.
    LowStorage { available_wh: Real, idle_need_wh: Real },
}

impl FaultKind {
    /// Recovery attempts allowed within one cycle.
    ///
    /// Flow and generator faults are retried once; exhausting more than one
    /// attempt escalates to Critical.
    pub fn recovery_attempts(&self) -> u32 {
        match self {
            Self::LowFlow { .. } | Self::GeneratorFailure { .. } => 2,
            Self::MagnetFailure { .. } | Self::Overheat { .. } | Self::LowStorage { .. } => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::LowFlow { .. } => "LowFlow",
            Self::GeneratorFailure { .. } => "GeneratorFailure",
            Self::MagnetFailure { .. } => "MagnetFailure",
            Self::Overheat { .. } => "Overheat",
            Self::LowStorage { .. } => "LowStorage",
        }
    }

    /// Same kind of fault, ignoring its payload.
    pub fn same_kind(&self, other: &FaultKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowFlow { path } => write!(f, "LowFlow({path})"),
            Self::GeneratorFailure { point } => write!(f, "GeneratorFailure({point})"),
            Self::MagnetFailure { point } => write!(f, "MagnetFailure({point})"),
            Self::Overheat { component } => write!(f, "Overheat({component})"),
            Self::LowStorage { available_wh, .. } => {
                write!(f, "LowStorage({available_wh:.3} Wh available)")
            }
        }
    }
}

/// Overall state of the apparatus. Exactly one is active at a time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum SystemStatus {
    #[default]
    Operational,
    Warning(String),
    Fault(FaultKind),
    /// Terminal: the scheduler stops.
    Critical(String),
}

impl SystemStatus {
    pub fn is_operational(&self) -> bool {
        matches!(self, Self::Operational)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning(_))
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Critical(_))
    }

    /// Whether the load must fall back to Idle.
    pub fn blocks_load(&self) -> bool {
        matches!(self, Self::Fault(_) | Self::Critical(_))
    }

    /// Whether the scheduler should use the longer fault cycle.
    pub fn is_degraded(&self) -> bool {
        !self.is_operational()
    }

    pub fn fault(&self) -> Option<&FaultKind> {
        match self {
            Self::Fault(kind) => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operational => f.write_str("Operational"),
            Self::Warning(reason) => write!(f, "Warning: {reason}"),
            Self::Fault(kind) => write!(f, "Fault: {kind}"),
            Self::Critical(reason) => write!(f, "Critical: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_budget_per_kind() {
        let p = PointId::from_index(0);
        assert_eq!(
            FaultKind::LowFlow {
                path: FlowPath::Primary
            }
            .recovery_attempts(),
            2
        );
        assert_eq!(
            FaultKind::GeneratorFailure { point: p }.recovery_attempts(),
            2
        );
        assert_eq!(FaultKind::MagnetFailure { point: p }.recovery_attempts(), 1);
        assert_eq!(
            FaultKind::Overheat {
                component: Subcomponent::Cpu
            }
            .recovery_attempts(),
            1
        );
    }

    #[test]
    fn status_predicates() {
        let fault = SystemStatus::Fault(FaultKind::Overheat {
            component: Subcomponent::Gpu,
        });
        assert!(fault.blocks_load());
        assert!(fault.is_degraded());
        assert!(!SystemStatus::Warning("x".into()).blocks_load());
        assert!(SystemStatus::Warning("x".into()).is_degraded());
        assert!(!SystemStatus::Operational.is_degraded());
        assert!(SystemStatus::Critical("x".into()).blocks_load());
    }

    #[test]
    fn display_strings() {
        let fault = SystemStatus::Fault(FaultKind::GeneratorFailure {
            point: PointId::from_index(1),
        });
        assert_eq!(fault.to_string(), "Fault: GeneratorFailure(point 2)");
        assert_eq!(SystemStatus::Operational.to_string(), "Operational");
    }

    #[test]
    fn same_kind_ignores_payload() {
        let a = FaultKind::GeneratorFailure {
            point: PointId::from_index(0),
        };
        let b = FaultKind::GeneratorFailure {
            point: PointId::from_index(3),
        };
        assert!(a.same_kind(&b));
        assert!(!a.same_kind(&FaultKind::LowFlow {
            path: FlowPath::Primary
        }));
    }
}
