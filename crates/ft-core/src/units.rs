// ft-core/src/units.rs

use uom::si::f64::{Energy as UomEnergy, Power as UomPower, Time as UomTime};

use crate::Real;

// Public canonical unit types (SI, f64)
pub type Energy = UomEnergy;
pub type Power = UomPower;
pub type Time = UomTime;

#[inline]
pub fn w(v: f64) -> Power {
    use uom::si::power::watt;
    Power::new::<watt>(v)
}

#[inline]
pub fn wh(v: f64) -> Energy {
    use uom::si::energy::watt_hour;
    Energy::new::<watt_hour>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

/// Energy in watt-hours delivered by `power_w` sustained for `interval_s` seconds.
#[inline]
pub fn energy_wh(power_w: Real, interval_s: Real) -> Real {
    use uom::si::energy::watt_hour;
    let e: Energy = (w(power_w) * s(interval_s)).into();
    e.get::<watt_hour>()
}

/// Average power in watts that moves `energy` watt-hours over `interval_s` seconds.
///
/// Zero interval yields zero power.
#[inline]
pub fn power_w(energy: Real, interval_s: Real) -> Real {
    use uom::si::power::watt;
    if interval_s <= 0.0 {
        return 0.0;
    }
    let p: Power = (wh(energy) / s(interval_s)).into();
    p.get::<watt>()
}
