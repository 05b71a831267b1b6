//! Property tests: model outputs stay within physical limits

use proptest::prelude::*;
use vmu_common::command::{CommandType, EngineCommand, EngineKind};
use vmu_common::config::VehicleConfig;
use vmu_common::consts::{AMBIENT_TEMP, EV_MAX_TEMP, IEC_MAX_TEMP, MAX_SPEED};
use vmu_common::state::SystemState;
use vmu_engines::ModelRegistry;

fn command_type() -> impl Strategy<Value = CommandType> {
    prop_oneof![
        Just(CommandType::Start),
        Just(CommandType::Stop),
        Just(CommandType::SetPower),
    ]
}

proptest! {
    #[test]
    fn reserves_and_temperatures_stay_bounded(
        steps in prop::collection::vec(
            (command_type(), 0.0f64..=1.0, 0.0f64..=MAX_SPEED, any::<bool>()),
            1..400,
        ),
        battery in 0.0f64..=100.0,
        fuel in 0.0f64..=100.0,
    ) {
        let registry = ModelRegistry::with_builtin();
        let mut ev = registry.create("electric").unwrap();
        let mut iec = registry.create("combustion").unwrap();
        let mut state = SystemState::initial(&VehicleConfig { initial_battery: battery, initial_fuel: fuel });

        for (seq, (command, level, speed, braking)) in steps.into_iter().enumerate() {
            state.speed = speed;
            let seq = seq as u32;
            ev.apply(&EngineCommand::request(EngineKind::Electric, command, seq, speed, level, braking), &mut state);
            iec.apply(&EngineCommand::request(EngineKind::Combustion, command, seq, speed, level, braking), &mut state);

            prop_assert!(state.check_limits().is_ok(), "{:?}", state.check_limits());
            prop_assert!((AMBIENT_TEMP..=EV_MAX_TEMP).contains(&state.temp_ev));
            prop_assert!((AMBIENT_TEMP..=IEC_MAX_TEMP).contains(&state.temp_iec));
            if !command.demands_power() {
                prop_assert!(!state.ev_on && !state.iec_on);
                prop_assert!(state.rpm_iec == 0.0);
            }
        }
    }
}
