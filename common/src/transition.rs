use crate::{
    config::Capabilities,
    types::{CurrentHeaterCoolerState, TargetHeaterCoolerState},
};

/// Everything the operating state depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingInputs {
    pub active: bool,
    pub target: TargetHeaterCoolerState,
    pub current_temp_c: f32,
    pub heating_threshold_c: f32,
    pub cooling_threshold_c: f32,
    pub capabilities: Capabilities,
}

/// Maps target mode and live conditions to the operating state.
///
/// A mode whose capability is missing degrades to `Idle` instead of reporting
/// a state the hardware cannot be in. In automatic mode a temperature exactly
/// on a threshold is inside the comfort band and yields `Idle`.
pub fn derive_operating_state(inputs: &OperatingInputs) -> CurrentHeaterCoolerState {
    if !inputs.active {
        return CurrentHeaterCoolerState::Inactive;
    }

    let caps = inputs.capabilities;
    match inputs.target {
        TargetHeaterCoolerState::Heat if caps.heating_supported => {
            CurrentHeaterCoolerState::Heating
        }
        TargetHeaterCoolerState::Cool if caps.cooling_supported => {
            CurrentHeaterCoolerState::Cooling
        }
        TargetHeaterCoolerState::Automatic => {
            if caps.heating_supported && inputs.current_temp_c < inputs.heating_threshold_c {
                CurrentHeaterCoolerState::Heating
            } else if caps.cooling_supported && inputs.current_temp_c > inputs.cooling_threshold_c
            {
                CurrentHeaterCoolerState::Cooling
            } else {
                CurrentHeaterCoolerState::Idle
            }
        }
        _ => CurrentHeaterCoolerState::Idle,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn inputs(target: TargetHeaterCoolerState, current_temp_c: f32) -> OperatingInputs {
        OperatingInputs {
            active: true,
            target,
            current_temp_c,
            heating_threshold_c: 20.0,
            cooling_threshold_c: 26.0,
            capabilities: Capabilities::default(),
        }
    }

    #[test]
    fn explicit_modes_follow_target() {
        assert_eq!(
            derive_operating_state(&inputs(TargetHeaterCoolerState::Heat, 30.0)),
            CurrentHeaterCoolerState::Heating
        );
        assert_eq!(
            derive_operating_state(&inputs(TargetHeaterCoolerState::Cool, 10.0)),
            CurrentHeaterCoolerState::Cooling
        );
    }

    #[test]
    fn automatic_mode_uses_thresholds() {
        let auto = TargetHeaterCoolerState::Automatic;
        assert_eq!(
            derive_operating_state(&inputs(auto, 18.0)),
            CurrentHeaterCoolerState::Heating
        );
        assert_eq!(
            derive_operating_state(&inputs(auto, 27.5)),
            CurrentHeaterCoolerState::Cooling
        );
        assert_eq!(
            derive_operating_state(&inputs(auto, 23.0)),
            CurrentHeaterCoolerState::Idle
        );
    }

    #[test]
    fn temperature_on_threshold_is_idle() {
        let auto = TargetHeaterCoolerState::Automatic;
        assert_eq!(
            derive_operating_state(&inputs(auto, 20.0)),
            CurrentHeaterCoolerState::Idle
        );
        assert_eq!(
            derive_operating_state(&inputs(auto, 26.0)),
            CurrentHeaterCoolerState::Idle
        );
    }

    #[test]
    fn unsupported_modes_fall_back_to_idle() {
        let heat_only = Capabilities {
            cooling_supported: false,
            heating_supported: true,
        };

        let mut cool = inputs(TargetHeaterCoolerState::Cool, 30.0);
        cool.capabilities = heat_only;
        assert_eq!(derive_operating_state(&cool), CurrentHeaterCoolerState::Idle);

        let mut auto = inputs(TargetHeaterCoolerState::Automatic, 30.0);
        auto.capabilities = heat_only;
        assert_eq!(derive_operating_state(&auto), CurrentHeaterCoolerState::Idle);

        let mut heat = inputs(TargetHeaterCoolerState::Heat, 10.0);
        heat.capabilities = Capabilities {
            cooling_supported: true,
            heating_supported: false,
        };
        assert_eq!(derive_operating_state(&heat), CurrentHeaterCoolerState::Idle);
    }

    fn target_strategy() -> impl Strategy<Value = TargetHeaterCoolerState> {
        prop_oneof![
            Just(TargetHeaterCoolerState::Automatic),
            Just(TargetHeaterCoolerState::Heat),
            Just(TargetHeaterCoolerState::Cool),
        ]
    }

    fn inputs_strategy() -> impl Strategy<Value = OperatingInputs> {
        (
            any::<bool>(),
            target_strategy(),
            -20.0f32..60.0,
            0.0f32..25.0,
            10.0f32..35.0,
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(
                |(active, target, temp, heating, cooling, cool_ok, heat_ok)| OperatingInputs {
                    active,
                    target,
                    current_temp_c: temp,
                    heating_threshold_c: heating,
                    cooling_threshold_c: cooling,
                    capabilities: Capabilities {
                        cooling_supported: cool_ok,
                        heating_supported: heat_ok,
                    },
                },
            )
    }

    proptest! {
        #[test]
        fn derivation_is_deterministic(inputs in inputs_strategy()) {
            prop_assert_eq!(derive_operating_state(&inputs), derive_operating_state(&inputs));
        }

        #[test]
        fn derivation_respects_power_and_capabilities(inputs in inputs_strategy()) {
            let state = derive_operating_state(&inputs);

            if !inputs.active {
                prop_assert_eq!(state, CurrentHeaterCoolerState::Inactive);
            } else {
                prop_assert_ne!(state, CurrentHeaterCoolerState::Inactive);
            }

            if state == CurrentHeaterCoolerState::Heating {
                prop_assert!(inputs.capabilities.heating_supported);
                prop_assert!(
                    inputs.target == TargetHeaterCoolerState::Heat
                        || (inputs.target == TargetHeaterCoolerState::Automatic
                            && inputs.current_temp_c < inputs.heating_threshold_c)
                );
            }

            if state == CurrentHeaterCoolerState::Cooling {
                prop_assert!(inputs.capabilities.cooling_supported);
                prop_assert!(
                    inputs.target == TargetHeaterCoolerState::Cool
                        || (inputs.target == TargetHeaterCoolerState::Automatic
                            && inputs.current_temp_c > inputs.cooling_threshold_c)
                );
            }
        }
    }
}
