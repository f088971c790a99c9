//! One-tick rigid-body stepper.
//!
//! Bodies: two wheels, the frame ("bike") and a head point mass. Wheels hang
//! off the frame on stiff springs, the head on a softer one. Only wheels and
//! the head touch the ground.
//!
//! Every operation on state wraps explicitly. Forces and torques accumulate
//! in i64; positions, velocities and angles are i32 on the torus.

use crate::constants::{
    ACCELERATION, BIKE_ANGULAR_MASS_DIV_DT, BIKE_MASS_DIV_DT, BIKE_POS0, BIKE_POS1,
    CONTACT_FORCE_DIV, FRICTION, GRAVITY_BIKE, GRAVITY_HEAD, GRAVITY_WHEEL, HEAD_CAPTURE_R,
    HEAD_MASS_DIV_DT, HEAD_POS, HEAD_POS_THRESHOLD, HEAD_R_65536, INV_65536_POS_K, INV_ANG_POS_K,
    INV_K, INV_K0, INV_MAX_BRAKING_DELTA_V, INV_MAX_DELTA_ROT_V, LEVEL, MAX_FRAMES, MAX_SPEED,
    MIN_CLOSING_SPEED, ROTATION_IMPULSE_FAST, ROTATION_IMPULSE_SLOW, ROTATION_PERIOD,
    WHEEL_ANGULAR_MASS_DIV_DT, WHEEL_CAPTURE_R, WHEEL_K, WHEEL_K0, WHEEL_MASS_DIV_DT,
    WHEEL_R_65536, WHEEL_R_DIV_POS_K, WHEEL_R_TORQUE_ARM, WHEEL_SPIN_DIV,
};
use crate::field::{ground_distance_of, magnitude_sq};
use crate::fixed_point::{mul_ss32, mul_su32, sign, MathTables};
use crate::types::{Accel, Body, Failure, MotoState, Rotation, StepResult};
use crate::world::World;

/// Steps states against one world.
#[derive(Clone, Copy)]
pub struct Simulator<'a> {
    tables: &'a MathTables,
    world: &'a World,
}

impl<'a> Simulator<'a> {
    pub fn new(tables: &'a MathTables, world: &'a World) -> Self {
        Self { tables, world }
    }

    pub fn world(&self) -> &'a World {
        self.world
    }

    pub fn tables(&self) -> &'a MathTables {
        self.tables
    }

    /// Advance `state` by one tick under the given control.
    pub fn step(&self, state: &mut MotoState, accel: Accel, rotation: Rotation) -> StepResult {
        if state.dead {
            return StepResult::Failure(Failure::AlreadyDead);
        }
        state.frame += 1;
        if state.frame == MAX_FRAMES {
            state.dead = true;
            return StepResult::Failure(Failure::FrameCap);
        }

        if rotation != Rotation::None {
            if state.frame - state.last_rotate < ROTATION_PERIOD {
                return StepResult::Failure(Failure::RotationCooldown);
            }
            state.last_rotate = state.frame;
            state.rotation = rotation;
        }
        state.accel = accel;

        let mut wheel_force = [[0, GRAVITY_WHEEL]; 2];
        let mut wheel_torque = [0i64; 2];
        let mut bike_force = [0, GRAVITY_BIKE];
        let mut bike_torque = self.rotation_torque(state);
        let mut head_force = [0, GRAVITY_HEAD];

        match state.accel {
            Accel::Idle => {}
            Accel::GasLeft => {
                if state.wheels[0].ang_vel > -MAX_SPEED {
                    wheel_torque[0] = -ACCELERATION;
                }
            }
            Accel::GasRight => {
                if state.wheels[1].ang_vel < MAX_SPEED {
                    wheel_torque[1] = ACCELERATION;
                }
            }
            Accel::Brake => {
                for (torque, wheel) in wheel_torque.iter_mut().zip(&state.wheels) {
                    let rel = wheel.ang_vel.wrapping_sub(state.bike.ang_vel) as i64;
                    let k = (INV_ANG_POS_K as i64)
                        .min(((rel.abs() * INV_MAX_BRAKING_DELTA_V) as i32) as i64);
                    *torque -= sign(rel) * k * FRICTION;
                }
            }
        }

        let angle = (state.bike.ang >> 16) as i16;
        let axis = [self.tables.cos16(angle), self.tables.sin16(angle)];
        let anchor = [
            [
                mul_su32(axis[1], BIKE_POS1 as u32).wrapping_sub(mul_su32(axis[0], BIKE_POS0 as u32)),
                mul_su32(axis[1], BIKE_POS0 as u32)
                    .wrapping_neg()
                    .wrapping_sub(mul_su32(axis[0], BIKE_POS1 as u32)),
            ],
            [
                mul_su32(axis[0], BIKE_POS0 as u32).wrapping_add(mul_su32(axis[1], BIKE_POS1 as u32)),
                mul_su32(axis[1], BIKE_POS0 as u32).wrapping_sub(mul_su32(axis[0], BIKE_POS1 as u32)),
            ],
        ];
        let head_anchor = [
            mul_su32(axis[1], HEAD_POS as u32).wrapping_neg(),
            mul_su32(axis[0], HEAD_POS as u32),
        ];

        for i in 0..2 {
            couple_wheel(
                &state.bike,
                &state.wheels[i],
                anchor[i],
                &mut wheel_force[i],
                &mut bike_force,
                &mut bike_torque,
            );
        }
        couple_head(state, head_anchor, &mut head_force);

        for i in 0..2 {
            if !self.advance_wheel(&mut state.wheels[i], wheel_force[i], wheel_torque[i]) {
                state.dead = true;
                return StepResult::Failure(Failure::WheelInGround);
            }
        }

        let bike = &mut state.bike;
        bike.ang = bike.ang.wrapping_add(bike.ang_vel);
        bike.ang_vel = bike.ang_vel.wrapping_add((bike_torque / BIKE_ANGULAR_MASS_DIV_DT) as i32);
        for k in 0..2 {
            bike.pos[k] = bike.pos[k].wrapping_add(bike.vel[k]);
            bike.vel[k] = bike.vel[k].wrapping_add((bike_force[k] / BIKE_MASS_DIV_DT) as i32);
            state.head_pos[k] = state.head_pos[k].wrapping_add(state.head_vel[k]);
            state.head_vel[k] = state.head_vel[k].wrapping_add((head_force[k] / HEAD_MASS_DIV_DT) as i32);
        }

        let finish = self.world.finish;
        if within(state.wheels[0].pos, finish, WHEEL_CAPTURE_R)
            || within(state.wheels[1].pos, finish, WHEEL_CAPTURE_R)
            || within(state.head_pos, finish, HEAD_CAPTURE_R)
        {
            return StepResult::Success;
        }

        if self.world.field.ground_distance(self.tables, state.head_pos) < HEAD_R_65536 {
            state.dead = true;
            return StepResult::Failure(Failure::HeadCrash);
        }

        StepResult::Continue
    }

    /// Fast impulse on the request tick, slow counter-impulse a quarter
    /// period later.
    fn rotation_torque(&self, state: &MotoState) -> i64 {
        let since = state.frame - state.last_rotate;
        let ang_vel = state.bike.ang_vel as i64;
        if since == 0 {
            match state.rotation {
                Rotation::Cw => -ROTATION_IMPULSE_FAST,
                _ => ROTATION_IMPULSE_FAST,
            }
        } else if since == ROTATION_PERIOD / 4 {
            match state.rotation {
                Rotation::Cw => {
                    let k = (INV_ANG_POS_K as i64).min(((-ang_vel * INV_MAX_DELTA_ROT_V) as i32) as i64);
                    ROTATION_IMPULSE_SLOW * k
                }
                _ => {
                    let k = (INV_ANG_POS_K as i64).min(((ang_vel * INV_MAX_DELTA_ROT_V) as i32) as i64);
                    -ROTATION_IMPULSE_SLOW * k
                }
            }
        } else {
            0
        }
    }

    /// Ground contact and integration for one wheel. Returns false when the
    /// wheel is inside the ground.
    fn advance_wheel(&self, wheel: &mut Body, mut force: [i64; 2], mut torque: i64) -> bool {
        let sample = self.world.field.sample(self.tables, wheel.pos);
        if sample.height as i32 > LEVEL {
            return false;
        }
        let inv = self.tables.inv_length(magnitude_sq(sample.gradient));
        let dist = ground_distance_of(self.tables, &sample);

        if dist < WHEEL_R_65536 {
            let normal = [
                (sample.gradient[0] as i64 * inv) as i32,
                (sample.gradient[1] as i64 * inv) as i32,
            ];
            let push = WHEEL_R_DIV_POS_K.wrapping_sub(dist.wrapping_mul(INV_65536_POS_K));
            for k in 0..2 {
                wheel.pos[k] = wheel.pos[k].wrapping_sub(mul_ss32(normal[k], push).wrapping_mul(2));
            }

            let closing = (-(mul_ss32(normal[0], wheel.vel[0]) as i64) * 2
                - mul_ss32(normal[1], wheel.vel[1]) as i64 * 2) as i32;
            if closing < -MIN_CLOSING_SPEED {
                for k in 0..2 {
                    wheel.vel[k] = wheel.vel[k].wrapping_add(mul_ss32(closing, normal[k]).wrapping_mul(2));
                }
                let load = (mul_ss32(normal[0], (force[0] / CONTACT_FORCE_DIV) as i32) as i64 * 2
                    + mul_ss32(normal[1], (force[1] / CONTACT_FORCE_DIV) as i32) as i64 * 2)
                    as i32;
                if load > 0 {
                    let slip = (mul_ss32(wheel.vel[0], normal[1]) as i64 * 2
                        - mul_ss32(wheel.vel[1], normal[0]) as i64 * 2
                        - (wheel.ang_vel / WHEEL_SPIN_DIV) as i64) as i32;
                    let limit = (load as i64 * 10) as i32 as i64;
                    let grip = (sign(slip as i64) * limit.min((slip as i64).abs())) as i32;
                    torque = torque.wrapping_add(grip as i64 * WHEEL_R_TORQUE_ARM);
                    force[0] = force[0]
                        .wrapping_sub(mul_ss32(normal[1], grip) as i64 * CONTACT_FORCE_DIV * 2);
                    force[1] = force[1]
                        .wrapping_add(mul_ss32(normal[0], grip) as i64 * CONTACT_FORCE_DIV * 2);
                }
            }
        }

        wheel.ang = wheel.ang.wrapping_add(wheel.ang_vel);
        wheel.ang_vel = wheel.ang_vel.wrapping_add((torque / WHEEL_ANGULAR_MASS_DIV_DT) as i32);
        for k in 0..2 {
            wheel.pos[k] = wheel.pos[k].wrapping_add(wheel.vel[k]);
            wheel.vel[k] = wheel.vel[k].wrapping_add((force[k] / WHEEL_MASS_DIV_DT) as i32);
        }
        true
    }
}

/// Velocity of the frame at offset `arm`, minus the velocity of the attached
/// point.
fn relative_velocity(bike: &Body, arm: [i32; 2], vel: [i32; 2]) -> [i32; 2] {
    let spin = bike.ang_vel as i64;
    [
        (((-(arm[1] as i64 * spin / INV_ANG_POS_K as i64)) as i32) as i64 + bike.vel[0] as i64
            - vel[0] as i64) as i32,
        ((((arm[0] as i64 * spin / INV_ANG_POS_K as i64) as i32) as i64) + bike.vel[1] as i64
            - vel[1] as i64) as i32,
    ]
}

fn couple_wheel(
    bike: &Body,
    wheel: &Body,
    anchor: [i32; 2],
    wheel_force: &mut [i64; 2],
    bike_force: &mut [i64; 2],
    bike_torque: &mut i64,
) {
    let arm = [
        wheel.pos[0].wrapping_sub(bike.pos[0]),
        wheel.pos[1].wrapping_sub(bike.pos[1]),
    ];
    let stretch = [anchor[0].wrapping_sub(arm[0]), anchor[1].wrapping_sub(arm[1])];
    let v = relative_velocity(bike, arm, wheel.vel);

    for k in 0..2 {
        wheel_force[k] = wheel_force[k]
            .wrapping_add(stretch[k] as i64 * WHEEL_K)
            .wrapping_add(v[k] as i64 * WHEEL_K0);
    }
    let spring = (anchor[0] as i64 * stretch[1] as i64)
        .wrapping_sub(anchor[1] as i64 * stretch[0] as i64);
    let damper = (-(v[0] as i64) * arm[1] as i64).wrapping_add(v[1] as i64 * arm[0] as i64);
    *bike_torque = bike_torque.wrapping_sub((spring / INV_K).wrapping_add(damper / INV_K0));
    for k in 0..2 {
        bike_force[k] = bike_force[k].wrapping_sub(wheel_force[k]);
    }
}

fn couple_head(state: &MotoState, anchor: [i32; 2], head_force: &mut [i64; 2]) {
    let bike = &state.bike;
    let arm = [
        state.head_pos[0].wrapping_sub(bike.pos[0]),
        state.head_pos[1].wrapping_sub(bike.pos[1]),
    ];
    let stretch = [anchor[0].wrapping_sub(arm[0]), anchor[1].wrapping_sub(arm[1])];
    let stretch_sq = (stretch[0] as i64 * stretch[0] as i64)
        .wrapping_add(stretch[1] as i64 * stretch[1] as i64);
    let stiffness = if stretch_sq >= HEAD_POS_THRESHOLD {
        2 * WHEEL_K
    } else {
        WHEEL_K / 5
    };
    let v = relative_velocity(bike, arm, state.head_vel);
    for k in 0..2 {
        head_force[k] = head_force[k]
            .wrapping_add(stretch[k] as i64 * stiffness)
            .wrapping_add(v[k] as i64 * WHEEL_K0 / 5);
    }
}

/// Squared-distance test with each square pre-shifted by 32 bits.
fn within(a: [i32; 2], b: [i32; 2], radius: i32) -> bool {
    let dx = a[0].wrapping_sub(b[0]) as i64;
    let dy = a[1].wrapping_sub(b[1]) as i64;
    let r = radius as i64;
    ((dx * dx) >> 32) + ((dy * dy) >> 32) < (r * r) >> 32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TEST_FINISH;
    use crate::field::Field;
    use crate::constants::WORK_SIZE;
    use crate::world::{initial_state, WorldGenerator};

    fn flat_world() -> World {
        let mut field = Field::default();
        field.flatten_first_row();
        World {
            field,
            finish: TEST_FINISH,
        }
    }

    /// Standard course for zero work and nonce 2. The start sits just above
    /// a ground ridge.
    fn standard_world() -> World {
        let generator = WorldGenerator::new(MathTables::shared());
        generator.generate(&[0u8; WORK_SIZE], 2).unwrap().0
    }

    fn run_until_terminal(
        sim: &Simulator<'_>,
        state: &mut MotoState,
        accel: Accel,
    ) -> StepResult {
        loop {
            let result = sim.step(state, accel, Rotation::None);
            if result.is_terminal() {
                return result;
            }
        }
    }

    #[test]
    fn test_gas_left_on_ground_golden() {
        let t = MathTables::shared();
        let world = standard_world();
        let sim = Simulator::new(t, &world);
        let mut state = initial_state();
        for _ in 0..300 {
            assert_eq!(sim.step(&mut state, Accel::GasLeft, Rotation::None), StepResult::Continue);
        }
        assert_eq!(state.frame, 300);
        assert_eq!(state.wheels[0].pos, [96_700_648, -415_186_006]);
        assert_eq!(state.wheels[0].ang, -609_024_965);
        assert_eq!(state.wheels[0].ang_vel, -155_147_394);
        assert_eq!(state.wheels[1].pos, [130_652_297, -329_997_957]);
        assert_eq!(state.wheels[1].ang, 0);
        assert_eq!(state.bike.pos, [83_573_168, -360_608_187]);
        assert_eq!(state.bike.ang, 814_604_164);
        assert_eq!(state.head_pos, [32_988_730, -340_586_224]);
    }

    #[test]
    fn test_brake_on_ground_golden() {
        let t = MathTables::shared();
        let world = standard_world();
        let sim = Simulator::new(t, &world);
        let mut state = initial_state();
        for _ in 0..300 {
            assert_eq!(sim.step(&mut state, Accel::Brake, Rotation::None), StepResult::Continue);
        }
        assert_eq!(state.frame, 300);
        assert_eq!(state.wheels[0].pos, [30_522_323, -328_751_612]);
        assert_eq!(state.wheels[0].ang, -446_410_730);
        assert_eq!(state.wheels[1].pos, [113_307_758, -367_007_049]);
        assert_eq!(state.wheels[1].ang, -287_466_693);
        // Both wheels locked to the frame.
        assert_eq!(state.wheels[0].ang_vel, -1_859_441);
        assert_eq!(state.wheels[1].ang_vel, -1_859_441);
        assert_eq!(state.bike.pos, [84_845_438, -318_782_361]);
        assert_eq!(state.bike.ang, -289_314_602);
        assert_eq!(state.head_pos, [106_803_969, -269_728_450]);
    }

    #[test]
    fn test_gas_right_spins_airborne_wheel() {
        let t = MathTables::shared();
        let world = standard_world();
        let sim = Simulator::new(t, &world);
        let mut idle = initial_state();
        let mut gas = initial_state();
        for _ in 0..300 {
            sim.step(&mut idle, Accel::Idle, Rotation::None);
            sim.step(&mut gas, Accel::GasRight, Rotation::None);
        }
        // The front wheel never touches down, so its motor moves nothing.
        assert_eq!(idle.wheels[1].ang, 0);
        assert_eq!(gas.wheels[1].ang, 1_082_246_945);
        assert_eq!(gas.wheels[1].ang_vel, 154_769_490);
        assert_eq!(gas.wheels[0], idle.wheels[0]);
        assert_eq!(gas.wheels[1].pos, idle.wheels[1].pos);
        assert_eq!(gas.bike, idle.bike);
        assert_eq!(gas.wheels[0].ang, -1_882_847_760);
    }

    #[test]
    fn test_head_crashes_on_standard_course() {
        let t = MathTables::shared();
        let world = standard_world();
        let sim = Simulator::new(t, &world);

        let mut state = initial_state();
        assert_eq!(
            run_until_terminal(&sim, &mut state, Accel::Idle),
            StepResult::Failure(Failure::HeadCrash)
        );
        assert_eq!(state.frame, 1602);
        assert!(state.dead);
        assert_eq!(state.head_pos, [744_641_090, -548_534_336]);
        assert_eq!(state.bike.ang, -806_559_338);

        let mut state = initial_state();
        assert_eq!(
            run_until_terminal(&sim, &mut state, Accel::GasLeft),
            StepResult::Failure(Failure::HeadCrash)
        );
        assert_eq!(state.frame, 328);
        assert_eq!(state.head_pos, [35_049_853, -364_933_188]);

        let mut state = initial_state();
        assert_eq!(sim.step(&mut state, Accel::Idle, Rotation::Ccw), StepResult::Continue);
        assert_eq!(
            run_until_terminal(&sim, &mut state, Accel::Idle),
            StepResult::Failure(Failure::HeadCrash)
        );
        assert_eq!(state.frame, 121);
        assert_eq!(state.bike.ang, 857_681_679);
        assert_eq!(state.head_pos, [-10_874_588, -266_660_642]);
        assert_eq!(
            sim.step(&mut state, Accel::Idle, Rotation::None),
            StepResult::Failure(Failure::AlreadyDead)
        );
    }

    #[test]
    fn test_wheel_inside_ground_fails() {
        let t = MathTables::shared();
        let world = standard_world();
        let sim = Simulator::new(t, &world);
        let mut state = initial_state();
        // Below the ridge under the start.
        state.wheels[0].pos = [0, -380_000_000];
        assert_eq!(
            sim.step(&mut state, Accel::Idle, Rotation::None),
            StepResult::Failure(Failure::WheelInGround)
        );
        assert_eq!(state.frame, 1);
        assert!(state.dead);
        assert_eq!(state.wheels[0].pos, [0, -380_000_000]);
        assert_eq!(state.wheels[1].pos, [91_268_056, -300_000_000]);
    }

    #[test]
    fn test_idle_fall_reaches_finish() {
        let t = MathTables::shared();
        let world = flat_world();
        let sim = Simulator::new(t, &world);
        let mut state = initial_state();
        let mut result = StepResult::Continue;
        while result == StepResult::Continue {
            result = sim.step(&mut state, Accel::Idle, Rotation::None);
        }
        assert_eq!(result, StepResult::Success);
        assert_eq!(state.frame, 1956);
        assert_eq!(state.wheels[0].pos, [0, 337_365_637]);
        assert_eq!(state.head_pos, [45_634_028, 423_193_158]);
    }

    #[test]
    fn test_idle_ticks_golden() {
        let t = MathTables::shared();
        let world = flat_world();
        let sim = Simulator::new(t, &world);
        let mut state = initial_state();
        for _ in 0..300 {
            assert_eq!(sim.step(&mut state, Accel::Idle, Rotation::None), StepResult::Continue);
        }
        assert_eq!(state.frame, 300);
        assert_eq!(state.wheels[0].pos, [0, -385_832_333]);
        assert_eq!(state.bike.ang, 0);
    }

    #[test]
    fn test_rotation_cooldown() {
        let t = MathTables::shared();
        let world = flat_world();
        let sim = Simulator::new(t, &world);
        let mut state = initial_state();
        assert_eq!(sim.step(&mut state, Accel::Idle, Rotation::Cw), StepResult::Continue);
        assert_eq!(state.last_rotate, 1);
        assert_eq!(
            sim.step(&mut state, Accel::Idle, Rotation::Cw),
            StepResult::Failure(Failure::RotationCooldown)
        );
        assert_eq!(state.frame, 2);
        assert!(!state.dead);
    }

    #[test]
    fn test_dead_state_does_not_advance() {
        let t = MathTables::shared();
        let world = flat_world();
        let sim = Simulator::new(t, &world);
        let mut state = initial_state();
        state.dead = true;
        assert_eq!(
            sim.step(&mut state, Accel::GasRight, Rotation::None),
            StepResult::Failure(Failure::AlreadyDead)
        );
        assert_eq!(state.frame, 0);
    }

    #[test]
    fn test_frame_cap() {
        let t = MathTables::shared();
        let world = flat_world();
        let sim = Simulator::new(t, &world);
        let mut state = initial_state();
        state.frame = MAX_FRAMES - 1;
        assert_eq!(
            sim.step(&mut state, Accel::Idle, Rotation::None),
            StepResult::Failure(Failure::FrameCap)
        );
        assert!(state.dead);
    }

    #[test]
    fn test_capture_radius() {
        assert!(within([0, 0], [0, WHEEL_CAPTURE_R - 1000], WHEEL_CAPTURE_R));
        assert!(!within([0, 0], [0, WHEEL_CAPTURE_R + 1000], WHEEL_CAPTURE_R));
        assert!(within([i32::MAX, 0], [i32::MIN, 0], WHEEL_CAPTURE_R));
    }
}
