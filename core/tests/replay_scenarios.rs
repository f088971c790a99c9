use motoplay_core::constants::{MAP_SIZE, WORK_SIZE};
use motoplay_core::field::FLAT_GRADIENT;
use motoplay_core::{
    decode_line, encode_line, initial_state, Accel, Failure, MathTables, Message, ProofOfPlay,
    ReplayError, Rotation, Rules, Session, Simulator, StepResult, Verifier, VerifyError, WorkUnit,
    WorldGenerator, WorldRejection,
};

fn tables() -> &'static MathTables {
    MathTables::shared()
}

fn test_generator() -> WorldGenerator<'static> {
    WorldGenerator::new(tables()).with_rules(Rules::TEST)
}

fn test_verifier() -> Verifier<'static> {
    Verifier::new(tables()).with_rules(Rules::TEST)
}

fn played_proof(work: &WorkUnit) -> ProofOfPlay {
    let mut session = Session::start(&test_generator(), work, 0).expect("test world");
    assert_eq!(
        session.advance(Accel::GasRight, Rotation::None, 100),
        StepResult::Continue
    );
    assert_eq!(
        session.advance(Accel::Idle, Rotation::None, 5000),
        StepResult::Success
    );
    session.into_proof()
}

#[test]
fn tables_build_deterministically() {
    let built = MathTables::build();
    assert_eq!(&built, tables());
}

#[test]
fn idle_replay_matches_manual_stepping() {
    let (world, start) = test_generator()
        .generate(&[0; WORK_SIZE], 0)
        .expect("test world");
    let sim = Simulator::new(tables(), &world);

    let mut manual = start;
    for _ in 0..1000 {
        assert_eq!(
            sim.step(&mut manual, Accel::Idle, Rotation::None),
            StepResult::Continue
        );
    }

    let mut replayed = start;
    let proof = ProofOfPlay::from_parts(0, 1000, Vec::new());
    assert_eq!(
        motoplay_core::replay(&sim, &mut replayed, &proof, 15_000),
        Err(ReplayError::NoSuccess { frame: 1000 })
    );
    assert_eq!(replayed, manual);
}

#[test]
fn second_rotation_inside_cooldown_fails_step() {
    let (world, mut state) = test_generator()
        .generate(&[0; WORK_SIZE], 0)
        .expect("test world");
    let sim = Simulator::new(tables(), &world);
    assert_eq!(
        sim.step(&mut state, Accel::Idle, Rotation::Cw),
        StepResult::Continue
    );
    assert_eq!(
        sim.step(&mut state, Accel::Idle, Rotation::Cw),
        StepResult::Failure(Failure::RotationCooldown)
    );
    assert_eq!(state.frame, 2);
    assert!(!state.dead);
}

#[test]
fn test_world_first_row_is_flat() {
    let (world, state) = test_generator()
        .generate(&[0xAB; WORK_SIZE], 99)
        .expect("test world");
    for col in 0..MAP_SIZE {
        assert_eq!(world.field.cell(col, 0), FLAT_GRADIENT);
    }
    assert_eq!(state, initial_state());
}

#[test]
fn zero_work_nonce_filter() {
    let generator = WorldGenerator::new(tables());
    let block = [0u8; WORK_SIZE];
    for nonce in [0, 2, 5] {
        assert!(
            generator.generate(&block, nonce).is_ok(),
            "nonce {nonce} should yield a playable world"
        );
    }
    for nonce in [1, 3, 4, 7] {
        assert_eq!(
            generator.generate(&block, nonce),
            Err(WorldRejection::PathFilter { best_cost: None }),
            "nonce {nonce} should be filtered"
        );
    }
    // Reachable, but the finish sits on the ground.
    assert_eq!(
        generator.generate(&block, 6),
        Err(WorldRejection::FinishInGround { distance: 0 })
    );
}

#[test]
fn standard_worlds_are_reproducible() {
    let generator = WorldGenerator::new(tables());
    let block = [0u8; WORK_SIZE];
    let first = generator.generate(&block, 2).expect("nonce 2 world");
    let second = generator.generate(&block, 2).expect("nonce 2 world");
    assert_eq!(first, second);
    let other = generator.generate(&block, 5).expect("nonce 5 world");
    assert_ne!(first.0.field, other.0.field);
}

#[test]
fn recorded_positions_strictly_increase() {
    let work = WorkUnit::default();
    let mut session = Session::start(&test_generator(), &work, 0).expect("test world");
    let controls = [
        (Accel::GasRight, Rotation::None, 30),
        (Accel::GasRight, Rotation::Ccw, 5),
        (Accel::Brake, Rotation::None, 20),
        (Accel::Idle, Rotation::Cw, 200),
        (Accel::GasLeft, Rotation::None, 10),
    ];
    for (accel, rotation, frames) in controls {
        session.advance(accel, rotation, frames);
    }
    let positions: Vec<i32> = session.proof().records().map(|r| r.position).collect();
    assert!(!positions.is_empty());
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(positions
        .iter()
        .all(|&p| p < session.proof().num_frames as i32));
}

#[test]
fn played_proof_survives_the_wire() {
    let work = WorkUnit {
        height: 4242,
        ..WorkUnit::default()
    };
    let proof = played_proof(&work);
    let line = encode_line(&Message::WorkAndProof(work.clone(), proof.clone()));

    let Message::WorkAndProof(decoded_work, decoded_proof) =
        decode_line(&line).expect("line should decode")
    else {
        panic!("expected a work-and-proof message");
    };
    assert_eq!(decoded_work, work);
    assert_eq!(decoded_proof, proof);

    let journal = test_verifier()
        .verify(&decoded_work, &decoded_proof)
        .expect("proof should verify");
    assert_eq!(journal.frames, 1956);
    assert_eq!(journal.height, 4242);
    assert_eq!(journal.updates, 2);
}

#[test]
fn tampered_proofs_reject() {
    let work = WorkUnit::default();
    let proof = played_proof(&work);

    let shorter = ProofOfPlay::from_parts(proof.nonce, proof.num_frames - 1, proof.updates().to_vec());
    assert_eq!(
        test_verifier().verify(&work, &shorter),
        Err(VerifyError::Replay(ReplayError::NoSuccess { frame: 1955 }))
    );

    let longer = ProofOfPlay::from_parts(proof.nonce, proof.num_frames + 1, proof.updates().to_vec());
    assert_eq!(
        test_verifier().verify(&work, &longer),
        Err(VerifyError::Replay(ReplayError::UnexpectedSuccess { frame: 1956 }))
    );

    let mut tight = work.clone();
    tight.time_target = proof.num_frames as i16;
    assert!(matches!(
        test_verifier().verify(&tight, &proof),
        Err(VerifyError::TimeTargetExceeded { .. })
    ));
}
