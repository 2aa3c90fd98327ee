use crate::error::PlantResult;
use crate::fault::FaultManager;
use crate::flow::FlowRegulator;
use crate::generator::GeneratorBank;
use crate::load::LoadController;
use crate::status::SystemStatus;
use crate::storage::StorageArbiter;
use crate::thermal::ThermalChain;
use ft_config::{PlantProfile, ScheduleDef, validate_profile};
use ft_core::Real;

/// All operational state of one apparatus, built once from a profile.
///
/// Fields are public so a scheduler can lend disjoint components to a
/// [`crate::CycleContext`] while it holds the fault manager.
#[derive(Debug, Clone)]
pub struct PlantController {
    pub name: String,
    pub chain: ThermalChain,
    pub generators: GeneratorBank,
    pub flow: FlowRegulator,
    pub storage: StorageArbiter,
    pub load: LoadController,
    pub faults: FaultManager,
    pub schedule: ScheduleDef,
}

impl PlantController {
    pub fn from_profile(profile: &PlantProfile) -> PlantResult<Self> {
        validate_profile(profile)?;
        Ok(Self {
            name: profile.name.clone(),
            chain: ThermalChain::from_def(&profile.thermal)?,
            generators: GeneratorBank::from_profile(profile)?,
            flow: FlowRegulator::from_profile(profile)?,
            storage: StorageArbiter::from_def(&profile.storage)?,
            load: LoadController::from_profile(profile)?,
            faults: FaultManager::new(),
            schedule: profile.schedule.clone(),
        })
    }

    pub fn status(&self) -> &SystemStatus {
        self.faults.status()
    }

    /// Seconds to wait before the next cycle given the current status.
    pub fn cycle_interval_s(&self) -> Real {
        if self.faults.status().is_degraded() {
            self.schedule.fault_cycle_time_s
        } else {
            self.schedule.cycle_time_s
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::FaultKind;
    use crate::test_support::RecordingActuators;
    use ft_config::presets;
    use ft_controls::MemorySink;
    use ft_core::PointId;

    #[test]
    fn builds_every_preset() {
        for name in ft_config::PRESET_NAMES {
            let profile = presets::preset(name).unwrap();
            let plant = PlantController::from_profile(&profile).unwrap();
            assert_eq!(plant.chain.point_count(), profile.point_count());
            assert_eq!(plant.generators.generators().len(), profile.point_count());
            assert_eq!(plant.flow.magnets().len(), profile.point_count());
            assert!(plant.status().is_operational());
        }
    }

    #[test]
    fn rejects_invalid_profile() {
        let mut profile = presets::compact();
        profile.thermal.points.clear();
        assert!(PlantController::from_profile(&profile).is_err());
    }

    #[test]
    fn fault_lengthens_cycle() {
        let mut plant = PlantController::from_profile(&presets::compact()).unwrap();
        assert_eq!(plant.cycle_interval_s(), 1.0);

        let mut act = RecordingActuators::new().with_recovery(false);
        let mut log = MemorySink::new();
        plant.faults.raise(
            FaultKind::MagnetFailure {
                point: PointId::from_index(0),
            },
            &mut act,
            &mut log,
        );
        assert_eq!(plant.cycle_interval_s(), 5.0);
    }
}
