//! Scripted collaborators for component tests.

use crate::context::CycleContext;
use crate::fault::FaultManager;
use ft_config::Subcomponent;
use ft_controls::{ActuatorPort, FlowPath, MemorySink, SensorKind, SensorPort};
use ft_core::{PointId, Real};
use std::collections::{HashMap, VecDeque};

/// Sensor double: fixed values per kind, optional queued sequences, and
/// benign defaults for everything else.
#[derive(Debug, Default)]
pub struct ScriptedSensors {
    fixed: HashMap<SensorKind, Real>,
    queued: HashMap<SensorKind, VecDeque<Real>>,
    pub reads: Vec<SensorKind>,
}

impl ScriptedSensors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, kind: SensorKind, value: Real) -> &mut Self {
        self.fixed.insert(kind, value);
        self
    }

    /// Values returned by successive reads, before falling back to `set`.
    pub fn queue(&mut self, kind: SensorKind, values: impl IntoIterator<Item = Real>) -> &mut Self {
        self.queued.entry(kind).or_default().extend(values);
        self
    }

    fn default_for(kind: SensorKind) -> Real {
        match kind {
            SensorKind::ComponentTemperature { .. } => 50.0,
            SensorKind::FlowRate { .. } => 1.0,
            SensorKind::MagnetStrength { .. } => 0.5,
            SensorKind::MagnetTemperature { .. } => 40.0,
            SensorKind::GeneratorVoltage { .. } => 5.0,
            SensorKind::BatteryCapacity => Real::MAX,
            SensorKind::AmbientWasteHeat => 0.0,
        }
    }
}

impl SensorPort for ScriptedSensors {
    fn read(&mut self, kind: SensorKind) -> Real {
        self.reads.push(kind);
        if let Some(v) = self.queued.get_mut(&kind).and_then(VecDeque::pop_front) {
            return v;
        }
        self.fixed
            .get(&kind)
            .copied()
            .unwrap_or_else(|| Self::default_for(kind))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCall {
    AdjustValve(PointId, Real),
    SwitchFlowPath(FlowPath),
    ChargeMagnet(PointId, Real),
    DischargeMagnet(PointId),
    Dissipate(Real),
    Redirect(Real),
    DrawAc(Real),
    ResetGenerator(PointId),
    FlushFlow(FlowPath),
    ResetMagnetCharger(PointId),
    ForceCooling(Subcomponent),
}

impl ActuatorCall {
    pub fn is_recovery(&self) -> bool {
        matches!(
            self,
            Self::ResetGenerator(_)
                | Self::FlushFlow(_)
                | Self::ResetMagnetCharger(_)
                | Self::ForceCooling(_)
        )
    }
}

/// Actuator double that records every call.
///
/// Recovery actions consume `script` first, then return `default_recovery`.
#[derive(Debug)]
pub struct RecordingActuators {
    pub calls: Vec<ActuatorCall>,
    script: VecDeque<bool>,
    default_recovery: bool,
    pub ac_power_w: Real,
}

impl Default for RecordingActuators {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            script: VecDeque::new(),
            default_recovery: true,
            ac_power_w: 60.0,
        }
    }
}

impl RecordingActuators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recovery(mut self, succeeds: bool) -> Self {
        self.default_recovery = succeeds;
        self
    }

    pub fn with_recovery_script(mut self, results: impl IntoIterator<Item = bool>) -> Self {
        self.script.extend(results);
        self
    }

    pub fn recoveries(&self) -> usize {
        self.calls.iter().filter(|c| c.is_recovery()).count()
    }

    fn recovery(&mut self) -> bool {
        self.script.pop_front().unwrap_or(self.default_recovery)
    }
}

impl ActuatorPort for RecordingActuators {
    fn adjust_valve(&mut self, point: PointId, target: Real) {
        self.calls.push(ActuatorCall::AdjustValve(point, target));
    }

    fn switch_flow_path(&mut self, path: FlowPath) {
        self.calls.push(ActuatorCall::SwitchFlowPath(path));
    }

    fn charge_magnet(&mut self, point: PointId, strength_t: Real) {
        self.calls.push(ActuatorCall::ChargeMagnet(point, strength_t));
    }

    fn discharge_magnet(&mut self, point: PointId) {
        self.calls.push(ActuatorCall::DischargeMagnet(point));
    }

    fn dissipate_excess(&mut self, power_w: Real) {
        self.calls.push(ActuatorCall::Dissipate(power_w));
    }

    fn redirect_power(&mut self, power_w: Real) {
        self.calls.push(ActuatorCall::Redirect(power_w));
    }

    fn draw_ac_power(&mut self, efficiency: Real) -> Real {
        self.calls.push(ActuatorCall::DrawAc(efficiency));
        self.ac_power_w * efficiency
    }

    fn reset_generator(&mut self, point: PointId) -> bool {
        self.calls.push(ActuatorCall::ResetGenerator(point));
        self.recovery()
    }

    fn flush_flow(&mut self, path: FlowPath) -> bool {
        self.calls.push(ActuatorCall::FlushFlow(path));
        self.recovery()
    }

    fn reset_magnet_charger(&mut self, point: PointId) -> bool {
        self.calls.push(ActuatorCall::ResetMagnetCharger(point));
        self.recovery()
    }

    fn force_cooling(&mut self, component: Subcomponent) -> bool {
        self.calls.push(ActuatorCall::ForceCooling(component));
        self.recovery()
    }
}

/// Owns one of each collaborator and lends them out as a [`CycleContext`].
#[derive(Debug, Default)]
pub struct Harness {
    pub sensors: ScriptedSensors,
    pub actuators: RecordingActuators,
    pub log: MemorySink,
    pub faults: FaultManager,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actuators(actuators: RecordingActuators) -> Self {
        Self {
            actuators,
            ..Self::default()
        }
    }

    pub fn ctx(&mut self) -> CycleContext<'_> {
        CycleContext::new(
            &mut self.sensors,
            &mut self.actuators,
            &mut self.log,
            &mut self.faults,
        )
    }
}
