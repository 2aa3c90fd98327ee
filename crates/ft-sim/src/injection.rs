//! Scheduled fault injection for the simulated plant.
//!
//! An injection is written `KIND[:ARG]@START[+DURATION]`, with cycles counted
//! from zero and a default duration of one cycle:
//!
//! | spec | effect |
//! |---|---|
//! | `stall-flow@10+5` | primary path delivers no flow |
//! | `stall-flow:all@10` | both paths deliver no flow and flushing fails |
//! | `generator:2@20` | generator modules at point 2 read zero volts |
//! | `magnet-overheat:1@5+3` | magnet at point 1 runs 50 °C hot |
//! | `overheat:cpu@5+3` | CPU runs 40 °C hot |
//! | `battery-fade:0.2@30` | battery loses 20% of its capacity for good |

use crate::error::{SimError, SimResult};
use ft_config::Subcomponent;
use ft_controls::FlowPath;
use ft_core::{PointId, Real};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which paths a flow stall blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StallScope {
    Path(FlowPath),
    All,
}

impl StallScope {
    pub fn blocks(self, path: FlowPath) -> bool {
        match self {
            Self::Path(p) => p == path,
            Self::All => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InjectionKind {
    StallFlow { scope: StallScope },
    GeneratorFault { point: PointId },
    MagnetOverheat { point: PointId },
    ComponentOverheat { component: Subcomponent },
    BatteryFade { fraction: Real },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Injection {
    pub kind: InjectionKind,
    pub start_cycle: u64,
    pub duration: u64,
}

impl Injection {
    pub fn active(&self, cycle: u64) -> bool {
        cycle >= self.start_cycle && cycle - self.start_cycle < self.duration
    }
}

impl fmt::Display for Injection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            InjectionKind::StallFlow { scope } => match scope {
                StallScope::Path(FlowPath::Primary) => f.write_str("stall-flow")?,
                StallScope::Path(path) => write!(f, "stall-flow:{path}")?,
                StallScope::All => f.write_str("stall-flow:all")?,
            },
            InjectionKind::GeneratorFault { point } => write!(f, "generator:{}", point.number())?,
            InjectionKind::MagnetOverheat { point } => {
                write!(f, "magnet-overheat:{}", point.number())?
            }
            InjectionKind::ComponentOverheat { component } => write!(f, "overheat:{component}")?,
            InjectionKind::BatteryFade { fraction } => write!(f, "battery-fade:{fraction}")?,
        }
        write!(f, "@{}+{}", self.start_cycle, self.duration)
    }
}

fn bad(spec: &str, reason: impl Into<String>) -> SimError {
    SimError::Injection {
        spec: spec.to_string(),
        reason: reason.into(),
    }
}

fn parse_point(spec: &str, arg: Option<&str>) -> SimResult<PointId> {
    let arg = arg.ok_or_else(|| bad(spec, "missing point number"))?;
    let n: u32 = arg
        .parse()
        .map_err(|_| bad(spec, format!("'{arg}' is not a point number")))?;
    if n == 0 {
        return Err(bad(spec, "points are numbered from 1"));
    }
    Ok(PointId::from_index(n - 1))
}

impl FromStr for Injection {
    type Err = SimError;

    fn from_str(spec: &str) -> SimResult<Self> {
        let spec = spec.trim();
        let (what, when) = spec
            .split_once('@')
            .ok_or_else(|| bad(spec, "expected KIND@START"))?;
        let (start, duration) = match when.split_once('+') {
            Some((s, d)) => (s, Some(d)),
            None => (when, None),
        };
        let start_cycle: u64 = start
            .parse()
            .map_err(|_| bad(spec, format!("'{start}' is not a cycle number")))?;
        let duration: u64 = match duration {
            Some(d) => d
                .parse()
                .map_err(|_| bad(spec, format!("'{d}' is not a cycle count")))?,
            None => 1,
        };
        if duration == 0 {
            return Err(bad(spec, "duration must be at least one cycle"));
        }

        let (name, arg) = match what.split_once(':') {
            Some((n, a)) => (n, Some(a)),
            None => (what, None),
        };
        let kind = match name {
            "stall-flow" => {
                let scope = match arg {
                    None | Some("primary") => StallScope::Path(FlowPath::Primary),
                    Some("secondary") => StallScope::Path(FlowPath::Secondary),
                    Some("all") => StallScope::All,
                    Some(other) => return Err(bad(spec, format!("unknown flow path '{other}'"))),
                };
                InjectionKind::StallFlow { scope }
            }
            "generator" => InjectionKind::GeneratorFault {
                point: parse_point(spec, arg)?,
            },
            "magnet-overheat" => InjectionKind::MagnetOverheat {
                point: parse_point(spec, arg)?,
            },
            "overheat" => {
                let component = match arg {
                    Some("cpu") => Subcomponent::Cpu,
                    Some("gpu") => Subcomponent::Gpu,
                    _ => return Err(bad(spec, "overheat takes cpu or gpu")),
                };
                InjectionKind::ComponentOverheat { component }
            }
            "battery-fade" => {
                let arg = arg.ok_or_else(|| bad(spec, "missing fade fraction"))?;
                let fraction: Real = arg
                    .parse()
                    .map_err(|_| bad(spec, format!("'{arg}' is not a number")))?;
                if !(fraction > 0.0 && fraction < 1.0) {
                    return Err(bad(spec, "fade fraction must be in (0, 1)"));
                }
                InjectionKind::BatteryFade { fraction }
            }
            other => return Err(bad(spec, format!("unknown injection '{other}'"))),
        };

        Ok(Injection {
            kind,
            start_cycle,
            duration,
        })
    }
}
