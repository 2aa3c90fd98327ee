//! Simulated apparatus behind the sensor and actuator ports.
//!
//! One [`PlantModel`] holds the physical state. [`SimSensors`] and
//! [`SimActuators`] are cheap handles onto it, so the scheduler can own them
//! separately while they observe the same apparatus. The model advances once
//! per cycle when it is fed the scheduler's [`CycleEvent`]s.

use crate::actuator::{FirstOrderActuator, ValveState};
use crate::error::SimResult;
use crate::injection::{Injection, InjectionKind};
use crate::record::{CycleEvent, CycleReport};
use ft_config::{PlantProfile, Subcomponent};
use ft_controls::{ActuatorPort, FlowPath, SensorKind, SensorPort};
use ft_core::{PointId, Real, non_negative, unit_ratio};
use ft_plant::split_heat;
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use tracing::{debug, info};

/// Physical constants of the simulated apparatus.
#[derive(Debug, Clone)]
pub struct SimTuning {
    pub ambient_c: Real,
    pub valve_tau_s: Real,
    pub valve_rate_limit: Real,
    pub primary_gain: Real,
    pub secondary_gain: Real,
    /// Magnet heating per tesla of field while charging.
    pub magnet_c_per_tesla: Real,
    pub magnet_overheat_c: Real,
    /// How far below its limit a processor runs at its hardware maximum.
    pub component_margin_c: Real,
    pub component_overheat_c: Real,
    pub forced_cooling_c: Real,
    pub forced_cooling_cycles: u64,
    pub volts_per_module: Real,
    /// Share of last cycle's unconverted heat that returns as waste heat.
    pub waste_recirculation: Real,
    pub capacity_fade_per_cycle: Real,
    pub ac_supply_w: Real,
}

impl Default for SimTuning {
    fn default() -> Self {
        Self {
            ambient_c: 25.0,
            valve_tau_s: 2.0,
            valve_rate_limit: 0.25,
            primary_gain: 1.0,
            secondary_gain: 0.9,
            magnet_c_per_tesla: 40.0,
            magnet_overheat_c: 50.0,
            component_margin_c: 15.0,
            component_overheat_c: 40.0,
            forced_cooling_c: 20.0,
            forced_cooling_cycles: 3,
            volts_per_module: 0.45,
            waste_recirculation: 0.1,
            capacity_fade_per_cycle: 1e-6,
            ac_supply_w: 65.0,
        }
    }
}

/// Heating model of one processor.
#[derive(Debug, Clone)]
struct Processor {
    c_per_w: Real,
    draw_w: Real,
    cooling_until: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct PlantModel {
    tuning: SimTuning,
    valve: FirstOrderActuator,
    max_flow_target: Real,
    cycle: u64,
    interval_s: Real,
    valves: Vec<ValveState>,
    valve_commands: Vec<Real>,
    path: FlowPath,
    magnet_strength_t: Vec<Real>,
    magnet_charging: Vec<bool>,
    module_counts: Vec<u32>,
    cpu: Processor,
    gpu: Processor,
    capacity_wh: Real,
    waste_heat_w: Real,
    injections: Vec<Injection>,
    fades_applied: Vec<bool>,
    ac_draws: u64,
    exported_wh: Real,
    dissipated_wh: Real,
}

impl PlantModel {
    pub fn new(profile: &PlantProfile, tuning: SimTuning, injections: Vec<Injection>) -> SimResult<Self> {
        let points = profile.point_count();
        let max_flow_target = profile.flow.max_flow_target;
        let opening = unit_ratio(profile.flow.initial_flow, max_flow_target);
        let processor = |limit_c: Real, max_w: Real| Processor {
            c_per_w: non_negative(limit_c - tuning.component_margin_c - tuning.ambient_c) / max_w,
            draw_w: 0.0,
            cooling_until: None,
        };
        let cpu = processor(profile.thermal_limits.cpu_overheat_c, profile.load.cpu_max_w);
        let gpu = processor(profile.thermal_limits.gpu_overheat_c, profile.load.gpu_max_w);

        Ok(Self {
            valve: FirstOrderActuator::new(tuning.valve_tau_s, tuning.valve_rate_limit)?,
            max_flow_target,
            cycle: 0,
            interval_s: profile.schedule.cycle_time_s,
            valves: vec![ValveState { position: opening }; points],
            valve_commands: vec![opening; points],
            path: FlowPath::Primary,
            magnet_strength_t: vec![profile.magnet.min_strength_t; points],
            magnet_charging: vec![false; points],
            module_counts: profile.thermal.points.iter().map(|p| p.module_count).collect(),
            cpu,
            gpu,
            capacity_wh: profile.storage.capacity_wh,
            waste_heat_w: 0.0,
            fades_applied: vec![false; injections.len()],
            injections,
            ac_draws: 0,
            exported_wh: 0.0,
            dissipated_wh: 0.0,
            tuning,
        })
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn capacity_wh(&self) -> Real {
        self.capacity_wh
    }

    pub fn valve_positions(&self) -> Vec<Real> {
        self.valves.iter().map(|v| v.position).collect()
    }

    pub fn active_path(&self) -> FlowPath {
        self.path
    }

    pub fn ac_draws(&self) -> u64 {
        self.ac_draws
    }

    pub fn exported_wh(&self) -> Real {
        self.exported_wh
    }

    pub fn dissipated_wh(&self) -> Real {
        self.dissipated_wh
    }

    fn active(&self) -> impl Iterator<Item = &InjectionKind> + '_ {
        let cycle = self.cycle;
        self.injections
            .iter()
            .filter(move |i| i.active(cycle))
            .map(|i| &i.kind)
    }

    fn stalled(&self, path: FlowPath) -> bool {
        self.active().any(|k| matches!(k, InjectionKind::StallFlow { scope } if scope.blocks(path)))
    }

    fn generator_faulted(&self, point: PointId) -> bool {
        self.active()
            .any(|k| matches!(k, InjectionKind::GeneratorFault { point: p } if *p == point))
    }

    fn magnet_overheated(&self, point: PointId) -> bool {
        self.active()
            .any(|k| matches!(k, InjectionKind::MagnetOverheat { point: p } if *p == point))
    }

    fn component_overheated(&self, component: Subcomponent) -> bool {
        self.active().any(
            |k| matches!(k, InjectionKind::ComponentOverheat { component: c } if *c == component),
        )
    }

    /// Advance the apparatus to the start of `cycle`.
    pub fn begin_cycle(&mut self, cycle: u64) {
        self.cycle = cycle;
        let dt = self.interval_s;
        for (valve, command) in self.valves.iter_mut().zip(&self.valve_commands) {
            *valve = self.valve.step(valve, dt, *command);
        }

        self.capacity_wh *= 1.0 - self.tuning.capacity_fade_per_cycle;
        for (i, injection) in self.injections.iter().enumerate() {
            if injection.start_cycle == cycle {
                info!(cycle, injection = %injection, "fault injection active");
            }
            if let InjectionKind::BatteryFade { fraction } = injection.kind {
                if !self.fades_applied[i] && cycle >= injection.start_cycle {
                    self.capacity_wh *= 1.0 - fraction;
                    self.fades_applied[i] = true;
                }
            }
        }
    }

    /// Take in what the controller did this cycle.
    pub fn end_cycle(&mut self, report: &CycleReport) {
        self.cpu.draw_w = report.cpu_w;
        self.gpu.draw_w = report.gpu_w;
        self.interval_s = report.interval_s;

        let heat: Real = report.point_heat_w.iter().sum();
        let conversion = unit_ratio(report.generated_w, heat);
        self.waste_heat_w = split_heat(heat, conversion).waste_heat_w * self.tuning.waste_recirculation;

        self.exported_wh += ft_core::energy_wh(report.exported_w, report.interval_s);
        self.dissipated_wh += ft_core::energy_wh(report.dissipated_w, report.interval_s);
        debug!(
            cycle = report.cycle,
            waste_heat_w = self.waste_heat_w,
            capacity_wh = self.capacity_wh,
            "plant advanced"
        );
    }

    pub fn flow(&self, path: FlowPath) -> Real {
        if self.stalled(path) || self.valves.is_empty() {
            return 0.0;
        }
        let gain = match path {
            FlowPath::Primary => self.tuning.primary_gain,
            FlowPath::Secondary => self.tuning.secondary_gain,
        };
        let opening = self.valves.iter().map(|v| v.position).sum::<Real>() / self.valves.len() as Real;
        gain * opening * self.max_flow_target
    }

    fn processor(&self, component: Subcomponent) -> Option<&Processor> {
        match component {
            Subcomponent::Cpu => Some(&self.cpu),
            Subcomponent::Gpu => Some(&self.gpu),
            _ => None,
        }
    }

    fn processor_mut(&mut self, component: Subcomponent) -> Option<&mut Processor> {
        match component {
            Subcomponent::Cpu => Some(&mut self.cpu),
            Subcomponent::Gpu => Some(&mut self.gpu),
            _ => None,
        }
    }

    pub fn component_temperature(&self, component: Subcomponent) -> Real {
        let t = &self.tuning;
        let Some(p) = self.processor(component) else {
            return t.ambient_c + 10.0;
        };
        let mut temperature = t.ambient_c + p.c_per_w * p.draw_w;
        if self.component_overheated(component) {
            temperature += t.component_overheat_c;
        }
        if p.cooling_until.is_some_and(|until| self.cycle < until) {
            temperature -= t.forced_cooling_c;
        }
        temperature.max(t.ambient_c)
    }

    pub fn magnet_temperature(&self, point: PointId) -> Real {
        let slot = point.slot();
        let strength = self.magnet_strength_t.get(slot).copied().unwrap_or(0.0);
        let charging = self.magnet_charging.get(slot).copied().unwrap_or(false);
        let field_heat = if charging { 1.0 } else { 0.5 };
        let mut temperature = self.tuning.ambient_c + self.tuning.magnet_c_per_tesla * strength * field_heat;
        if self.magnet_overheated(point) {
            temperature += self.tuning.magnet_overheat_c;
        }
        temperature
    }

    pub fn read(&self, kind: SensorKind) -> Real {
        match kind {
            SensorKind::ComponentTemperature { component } => self.component_temperature(component),
            SensorKind::FlowRate { path } => self.flow(path),
            SensorKind::MagnetStrength { point } => {
                self.magnet_strength_t.get(point.slot()).copied().unwrap_or(0.0)
            }
            SensorKind::MagnetTemperature { point } => self.magnet_temperature(point),
            SensorKind::GeneratorVoltage { point } => {
                if self.generator_faulted(point) {
                    0.0
                } else {
                    let modules = self.module_counts.get(point.slot()).copied().unwrap_or(0);
                    self.tuning.volts_per_module * modules as Real
                }
            }
            SensorKind::BatteryCapacity => self.capacity_wh,
            SensorKind::AmbientWasteHeat => self.waste_heat_w,
        }
    }
}

/// Shared simulated apparatus.
#[derive(Debug, Clone)]
pub struct SimPlant {
    model: Rc<RefCell<PlantModel>>,
}

impl SimPlant {
    pub fn new(profile: &PlantProfile, tuning: SimTuning, injections: Vec<Injection>) -> SimResult<Self> {
        Ok(Self {
            model: Rc::new(RefCell::new(PlantModel::new(profile, tuning, injections)?)),
        })
    }

    pub fn sensors(&self) -> SimSensors {
        SimSensors {
            model: Rc::clone(&self.model),
        }
    }

    pub fn actuators(&self) -> SimActuators {
        SimActuators {
            model: Rc::clone(&self.model),
        }
    }

    pub fn model(&self) -> Ref<'_, PlantModel> {
        self.model.borrow()
    }

    /// Feed a scheduler event to the apparatus.
    pub fn observe(&self, event: CycleEvent<'_>) {
        let mut model = self.model.borrow_mut();
        match event {
            CycleEvent::Started { cycle } => model.begin_cycle(cycle),
            CycleEvent::Finished { report } => model.end_cycle(report),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimSensors {
    model: Rc<RefCell<PlantModel>>,
}

impl SensorPort for SimSensors {
    fn read(&mut self, kind: SensorKind) -> Real {
        self.model.borrow().read(kind)
    }
}

#[derive(Debug, Clone)]
pub struct SimActuators {
    model: Rc<RefCell<PlantModel>>,
}

impl ActuatorPort for SimActuators {
    fn adjust_valve(&mut self, point: PointId, target: Real) {
        let mut m = self.model.borrow_mut();
        let command = unit_ratio(target, m.max_flow_target);
        if let Some(slot) = m.valve_commands.get_mut(point.slot()) {
            *slot = command;
        }
    }

    fn switch_flow_path(&mut self, path: FlowPath) {
        self.model.borrow_mut().path = path;
    }

    fn charge_magnet(&mut self, point: PointId, strength_t: Real) {
        let mut m = self.model.borrow_mut();
        let slot = point.slot();
        if slot < m.magnet_strength_t.len() {
            m.magnet_strength_t[slot] = non_negative(strength_t);
            m.magnet_charging[slot] = true;
        }
    }

    fn discharge_magnet(&mut self, point: PointId) {
        if let Some(charging) = self.model.borrow_mut().magnet_charging.get_mut(point.slot()) {
            *charging = false;
        }
    }

    fn dissipate_excess(&mut self, power_w: Real) {
        debug!(power_w, "dissipating surplus");
    }

    fn redirect_power(&mut self, power_w: Real) {
        debug!(power_w, "exporting surplus");
    }

    fn draw_ac_power(&mut self, efficiency: Real) -> Real {
        let mut m = self.model.borrow_mut();
        m.ac_draws += 1;
        m.tuning.ac_supply_w * efficiency
    }

    fn reset_generator(&mut self, point: PointId) -> bool {
        debug!(%point, "generator reset");
        true
    }

    fn flush_flow(&mut self, path: FlowPath) -> bool {
        !self.model.borrow().stalled(path)
    }

    fn reset_magnet_charger(&mut self, point: PointId) -> bool {
        !self.model.borrow().magnet_overheated(point)
    }

    fn force_cooling(&mut self, component: Subcomponent) -> bool {
        let mut m = self.model.borrow_mut();
        let until = m.cycle + m.tuning.forced_cooling_cycles;
        match m.processor_mut(component) {
            Some(p) => {
                p.cooling_until = Some(until);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ft_config::presets;

    fn plant(injections: &[&str]) -> SimPlant {
        let injections = injections.iter().map(|s| s.parse().unwrap()).collect();
        SimPlant::new(&presets::compact(), SimTuning::default(), injections).unwrap()
    }

    #[test]
    fn initial_flow_matches_profile() {
        let p = plant(&[]);
        let mut sensors = p.sensors();
        assert!((sensors.read(SensorKind::flow(FlowPath::Primary)) - 1.0).abs() < 1e-9);
        assert!((sensors.read(SensorKind::flow(FlowPath::Secondary)) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn valves_move_toward_command_with_lag() {
        let p = plant(&[]);
        let mut act = p.actuators();
        for i in 0..2 {
            act.adjust_valve(PointId::from_index(i), 1.3);
        }
        p.observe(CycleEvent::Started { cycle: 1 });
        let positions = p.model().valve_positions();
        assert!(positions.iter().all(|&x| x > 1.0 / 1.3 && x < 1.0));
    }

    #[test]
    fn stall_blocks_flow_and_flush() {
        let p = plant(&["stall-flow@2+2"]);
        let mut sensors = p.sensors();
        let mut act = p.actuators();
        p.observe(CycleEvent::Started { cycle: 2 });
        assert_eq!(sensors.read(SensorKind::flow(FlowPath::Primary)), 0.0);
        assert!(sensors.read(SensorKind::flow(FlowPath::Secondary)) > 0.0);
        assert!(!act.flush_flow(FlowPath::Primary));
        assert!(act.flush_flow(FlowPath::Secondary));

        p.observe(CycleEvent::Started { cycle: 4 });
        assert!(sensors.read(SensorKind::flow(FlowPath::Primary)) > 0.0);
    }

    #[test]
    fn generator_fault_drops_voltage() {
        let p = plant(&["generator:2@0"]);
        let mut sensors = p.sensors();
        p.observe(CycleEvent::Started { cycle: 0 });
        let point = PointId::from_index(1);
        assert_eq!(sensors.read(SensorKind::GeneratorVoltage { point }), 0.0);
        let healthy = sensors.read(SensorKind::GeneratorVoltage {
            point: PointId::from_index(0),
        });
        assert!((healthy - 6.0 * 0.45).abs() < 1e-9);
    }

    #[test]
    fn forced_cooling_relieves_overheat() {
        let p = plant(&["overheat:cpu@0+10"]);
        let mut sensors = p.sensors();
        let mut act = p.actuators();
        p.observe(CycleEvent::Started { cycle: 0 });
        p.model.borrow_mut().cpu.draw_w = 35.0;

        let hot = sensors.read(SensorKind::temperature(Subcomponent::Cpu));
        assert!(hot > 95.0);
        assert!(act.force_cooling(Subcomponent::Cpu));
        let cooled = sensors.read(SensorKind::temperature(Subcomponent::Cpu));
        assert!((hot - cooled - 20.0).abs() < 1e-9);
    }

    #[test]
    fn battery_fade_is_permanent() {
        let p = plant(&["battery-fade:0.5@1"]);
        let mut sensors = p.sensors();
        p.observe(CycleEvent::Started { cycle: 1 });
        let faded = sensors.read(SensorKind::BatteryCapacity);
        assert!(faded < 30.01 && faded > 29.9);
        p.observe(CycleEvent::Started { cycle: 5 });
        assert!(sensors.read(SensorKind::BatteryCapacity) <= faded);
    }

    #[test]
    fn ac_draw_scales_with_efficiency() {
        let p = plant(&[]);
        let mut act = p.actuators();
        assert!((act.draw_ac_power(0.88) - 65.0 * 0.88).abs() < 1e-9);
        assert_eq!(p.model().ac_draws(), 1);
    }
}
