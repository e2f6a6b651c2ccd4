//! Temperature drift model driving the simulated room.
//!
//! Heating moves the temperature up toward the heating threshold and cooling
//! moves it down toward the cooling threshold, one `active_drift_c` step per
//! cycle. A heater never cools and a cooler never heats, so when the
//! temperature is already past the threshold it holds. Idle and inactive rooms
//! relax toward ambient by `ambient_drift_c` per cycle. Steps never overshoot
//! their goal and the result stays inside the simulation band.

use crate::{config::SimulationConfig, types::CurrentHeaterCoolerState};

pub fn advance_temperature(
    current_c: f32,
    state: CurrentHeaterCoolerState,
    heating_threshold_c: f32,
    cooling_threshold_c: f32,
    sim: &SimulationConfig,
) -> f32 {
    let next = match state {
        CurrentHeaterCoolerState::Heating => {
            if current_c < heating_threshold_c {
                step_toward(current_c, heating_threshold_c, sim.active_drift_c)
            } else {
                current_c
            }
        }
        CurrentHeaterCoolerState::Cooling => {
            if current_c > cooling_threshold_c {
                step_toward(current_c, cooling_threshold_c, sim.active_drift_c)
            } else {
                current_c
            }
        }
        CurrentHeaterCoolerState::Idle | CurrentHeaterCoolerState::Inactive => {
            step_toward(current_c, sim.ambient_temp_c, sim.ambient_drift_c)
        }
    };

    next.clamp(sim.temperature_range.min_c, sim.temperature_range.max_c)
}

fn step_toward(current: f32, goal: f32, step: f32) -> f32 {
    let step = step.abs();
    if (goal - current).abs() <= step {
        goal
    } else if goal > current {
        current + step
    } else {
        current - step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEAT: f32 = 20.0;
    const COOL: f32 = 26.0;

    #[test]
    fn heating_rises_until_threshold() {
        let sim = SimulationConfig::default();
        let state = CurrentHeaterCoolerState::Heating;

        assert_eq!(advance_temperature(18.0, state, HEAT, COOL, &sim), 18.5);
        assert_eq!(advance_temperature(19.8, state, HEAT, COOL, &sim), 20.0);
        assert_eq!(advance_temperature(23.0, state, HEAT, COOL, &sim), 23.0);
    }

    #[test]
    fn cooling_falls_until_threshold() {
        let sim = SimulationConfig::default();
        let state = CurrentHeaterCoolerState::Cooling;

        assert_eq!(advance_temperature(30.0, state, HEAT, COOL, &sim), 29.5);
        assert_eq!(advance_temperature(26.2, state, HEAT, COOL, &sim), 26.0);
        assert_eq!(advance_temperature(21.0, state, HEAT, COOL, &sim), 21.0);
    }

    #[test]
    fn idle_relaxes_toward_ambient() {
        let sim = SimulationConfig::default();

        let warmer = advance_temperature(25.0, CurrentHeaterCoolerState::Idle, HEAT, COOL, &sim);
        assert!(warmer < 25.0 && warmer > 24.8);

        let colder =
            advance_temperature(15.0, CurrentHeaterCoolerState::Inactive, HEAT, COOL, &sim);
        assert!(colder > 15.0 && colder < 15.2);

        assert_eq!(
            advance_temperature(22.05, CurrentHeaterCoolerState::Idle, HEAT, COOL, &sim),
            22.0
        );
    }

    #[test]
    fn result_stays_inside_simulation_band() {
        let sim = SimulationConfig::default();
        assert_eq!(
            advance_temperature(75.0, CurrentHeaterCoolerState::Heating, 80.0, 90.0, &sim),
            60.0
        );
        assert_eq!(
            advance_temperature(-30.0, CurrentHeaterCoolerState::Idle, HEAT, COOL, &sim),
            -20.0
        );
    }
}
