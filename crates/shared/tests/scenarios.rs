mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::*;
use shared::*;

fn core(world: MockWorld) -> Core<MockWorld> {
    Core::new(world, &Config::default()).unwrap()
}

fn secs(s: f32) -> Duration {
    Duration::from_secs_f32(s)
}

fn classify(world: &MockWorld, index: usize) -> Classification {
    Classifier::from_config(&Config::default())
        .unwrap()
        .classify(&world.candidate(index))
}

#[test]
fn unowned_inkling_is_found_by_name() {
    let mut core = core(MockWorld::new([Entity::new("InklingPet07", OWNER_SENTINEL)]));
    assert_eq!(classify(core.world(), 0).reason, Reason::NameHeuristic);

    let summary = core.update(secs(0.)).unwrap();
    assert_eq!(summary.added, 1);

    let entity = core.world().entity(0);
    assert_eq!(entity.interactions.len(), 1);
    let interaction = &entity.interactions[0];
    assert_eq!(interaction.settings.label.as_str(), "Pet Inkling");
    assert_eq!(interaction.settings.interact_distance, 5.);
    assert_eq!(interaction.settings.cooldown(), Duration::from_secs(3));
    assert_eq!(interaction.settings.interactivity, RepeatType::OwnerCooldown);
    assert!(interaction.settings.owner_only);
    assert_eq!(interaction.owner, Some(PLAYER));
}

#[test]
fn owned_creature_is_found_by_owner() {
    let mut core = core(MockWorld::new([Entity::new("Guard12", 42)]));
    assert_eq!(
        classify(core.world(), 0),
        Classification {
            is_member: true,
            owner_id: Some(42),
            reason: Reason::PrimaryAttribute,
        }
    );

    assert_eq!(core.update(secs(0.)).unwrap().added, 1);
    assert_eq!(core.world().entity(0).interactions[0].owner, Some(42));
}

#[test]
fn tagged_creature_is_found_by_tag() {
    let mut core = core(MockWorld::new([
        Entity::new("Guard13", OWNER_SENTINEL).tagged("Pet")
    ]));
    assert_eq!(classify(core.world(), 0).reason, Reason::TagHeuristic);
    assert_eq!(core.update(secs(0.)).unwrap().added, 1);
}

#[test]
fn no_player_means_no_scan() {
    let world = MockWorld::new([Entity::new("InklingPet07", OWNER_SENTINEL)]);
    world.actor.set(None);
    let mut core = core(world);

    assert_eq!(core.update(secs(0.)), Some(Summary::default()));
    assert_eq!(core.records().len(), 0);
    assert!(core.world().entity(0).interactions.is_empty());
}

#[test]
fn unavailable_world_means_no_scan() {
    let mut world = MockWorld::new([Entity::new("InklingPet07", OWNER_SENTINEL)]);
    world.enumerate_error = Some(ProbeError::ProviderUnavailable);
    let mut core = core(world);

    assert_eq!(core.update(secs(0.)), Some(Summary::default()));
    assert!(core.world().entity(0).interactions.is_empty());
}

#[test]
fn rescan_adds_nothing_new() {
    let mut core = core(MockWorld::new([
        Entity::new("InklingPet07", OWNER_SENTINEL),
        Entity::new("Guard12", 42),
        Entity::new("Guard14", OWNER_SENTINEL),
    ]));
    assert_eq!(core.update(secs(0.)).unwrap().added, 2);

    let summary = core.update(secs(2.)).unwrap();
    assert_eq!(
        summary,
        Summary {
            added: 0,
            already_present: 2,
            failed: 0,
        }
    );
    assert_eq!(core.world().entity(0).interactions.len(), 1);
    assert_eq!(core.world().entity(1).interactions.len(), 1);
    assert!(core.world().entity(2).interactions.is_empty());
}

#[test]
fn augmenting_twice_is_idempotent() {
    let world = MockWorld::new([Entity::new("Guard12", 42)]);
    let augmenter = Augmenter::new(InteractionSettings::default());
    let candidate = world.candidate(0);
    let classification = classify(&world, 0);
    let actor = player();

    let first = augmenter
        .augment(&world, &candidate, &classification, &actor, secs(0.))
        .unwrap();
    assert_eq!(first.outcome, Outcome::Added);
    let attached = format!("{:?}", world.entity(0).interactions);

    let second = augmenter
        .augment(&world, &candidate, &classification, &actor, secs(1.))
        .unwrap();
    assert_eq!(second.outcome, Outcome::AlreadyPresent);
    assert_eq!(second.candidate_id, first.candidate_id);
    assert_eq!(format!("{:?}", world.entity(0).interactions), attached);
}

#[test]
fn non_members_are_not_augmented() {
    let world = MockWorld::new([Entity::new("Guard14", OWNER_SENTINEL)]);
    let augmenter = Augmenter::new(InteractionSettings::default());
    assert_eq!(
        augmenter.augment(
            &world,
            &world.candidate(0),
            &Classification::NONE,
            &player(),
            secs(0.)
        ),
        None
    );
}

#[test]
fn broken_candidate_doesnt_stop_the_batch() {
    let mut core = core(MockWorld::new([
        Entity::new("Inkling1", OWNER_SENTINEL),
        Entity::new("Guard2", 2),
        Entity::new("Inkling3", 3).broken(),
        Entity::new("Guard4", OWNER_SENTINEL).tagged("Inkling"),
        Entity::new("Inkling5", OWNER_SENTINEL),
    ]));
    assert_eq!(classify(core.world(), 2), Classification::NONE);

    let summary = core.update(secs(0.)).unwrap();
    assert_eq!(summary.added, 4);
    assert_eq!(summary.failed, 0);
    for i in [0, 1, 3, 4] {
        assert_eq!(core.world().entity(i).interactions.len(), 1, "entity {i}");
    }
    assert!(core.world().entity(2).interactions.is_empty());
    assert_eq!(classify(core.world(), 1).owner_id, Some(2));
    assert_eq!(classify(core.world(), 3).reason, Reason::TagHeuristic);
}

#[test]
fn failed_attach_doesnt_stop_the_batch() {
    let world = MockWorld::new([
        Entity::new("Inkling1", OWNER_SENTINEL),
        Entity::new("Inkling2", OWNER_SENTINEL),
        Entity::new("Inkling3", OWNER_SENTINEL),
        Entity::new("Inkling4", OWNER_SENTINEL),
        Entity::new("Inkling5", OWNER_SENTINEL),
    ]);
    world.entities[2].borrow_mut().reject_attach = true;
    let mut core = core(world);

    let summary = core.update(secs(0.)).unwrap();
    assert_eq!(summary.added, 4);
    assert_eq!(summary.failed, 1);
    let failed = core
        .records()
        .filter(|r| r.outcome == Outcome::Failed)
        .map(|r| r.candidate_id)
        .collect::<Vec<_>>();
    assert_eq!(failed, vec![CandidateId(3)]);

    // The host may accept the attach on a later check.
    core.world().entities[2].borrow_mut().reject_attach = false;
    let summary = core.update(secs(2.)).unwrap();
    assert_eq!(summary.added, 1);
    assert_eq!(summary.already_present, 4);
}

#[test]
fn only_the_summary_is_logged_at_info() {
    let mut core = core(MockWorld::new([
        Entity::new("Inkling1", OWNER_SENTINEL),
        Entity::new("Inkling2", OWNER_SENTINEL).broken(),
        Entity::new("Guard3", 3),
    ]));
    let logs = capture_logs(|| {
        core.update(secs(0.)).unwrap();
    });

    let loud = logs
        .iter()
        .filter(|(level, _)| *level <= log::Level::Info)
        .map(|(_, message)| message.as_str())
        .collect::<Vec<_>>();
    assert_eq!(loud, vec!["Added 2 new pet interactions this check."]);
    // The unreadable candidate and each added pet still show up in detail.
    assert!(logs.iter().any(|(level, message)| {
        *level == log::Level::Debug && message.contains("entity is broken")
    }));
    assert!(logs.iter().any(|(level, message)| {
        *level == log::Level::Debug && message.starts_with("Added pet interaction to")
    }));
}

#[test]
fn checks_run_on_the_interval() {
    let mut core = core(MockWorld::new([]));
    assert!(core.update(secs(0.)).is_some());
    assert!(core.update(secs(1.)).is_none());
    assert!(core.update(secs(1.99)).is_none());
    assert!(core.update(secs(2.)).is_some());
    assert!(core.update(secs(3.)).is_none());
    assert_eq!(core.phase(), Phase::Idle);
}

#[test]
fn scene_change_forces_a_check() {
    let mut core = core(MockWorld::new([]));
    assert!(core.update(secs(10.)).is_some());
    assert!(core.update(secs(10.5)).is_none());
    core.reset_interval();
    assert!(core.update(secs(10.6)).is_some());
    assert!(core.update(secs(11.)).is_none());
}

#[test]
fn clock_going_backwards_forces_a_check() {
    let mut core = core(MockWorld::new([]));
    assert!(core.update(secs(100.)).is_some());
    assert!(core.update(secs(1.)).is_some());
    assert!(core.update(secs(2.)).is_none());
}

#[test]
fn new_pets_are_picked_up_later() {
    let world = MockWorld::new([Entity::new("Inkling1", OWNER_SENTINEL)]);
    world.actor.set(None);
    let mut core = core(world);
    assert_eq!(core.update(secs(0.)).unwrap().added, 0);

    // Once the player spawns, the next check finds the pet.
    core.world().actor.set(Some(player()));
    assert_eq!(core.update(secs(2.)).unwrap().added, 1);
}

#[test]
fn scan_errors_abandon_the_check() {
    let mut world = MockWorld::new([Entity::new("Inkling1", OWNER_SENTINEL)]);
    world.enumerate_error = Some(ProbeError::unavailable("FindObjectsOfType", "host threw"));
    let mut core = core(world);

    assert_eq!(core.update(secs(0.)), None);
    assert_eq!(core.phase(), Phase::Idle);
    assert!(core.world().entity(0).interactions.is_empty());
    // The next check still waits for the interval.
    assert_eq!(core.update(secs(1.)), None);
}

#[test]
fn record_history_is_bounded() {
    let mut core = core(MockWorld::new(
        (0..RECORD_BUFFER_LIMIT + 50).map(|i| Entity::new(&format!("Inkling{i}"), OWNER_SENTINEL)),
    ));
    assert_eq!(core.update(secs(0.)).unwrap().added, RECORD_BUFFER_LIMIT + 50);
    assert_eq!(core.records().len(), RECORD_BUFFER_LIMIT);
    // The oldest records are the ones dropped.
    assert_eq!(
        core.records().next().unwrap().candidate_id,
        CandidateId(51)
    );
}

#[test]
fn attached_interaction_fires_callback_for_owner() {
    let pets = Arc::new(AtomicUsize::new(0));
    let counter = pets.clone();
    let mut core = core(MockWorld::new([Entity::new("Guard12", 42).at(1., 0., 0.)]))
        .with_callback(Arc::new(move |event: &Interacted| {
            assert_eq!(event.target_name, "Guard12");
            counter.fetch_add(1, Ordering::SeqCst);
        }));
    core.update(secs(0.)).unwrap();

    let interaction = core.world().entity(0).interactions[0].clone();
    let mut behavior = Behavior::new(interaction);
    assert_eq!(
        behavior.select(PLAYER, 1., secs(5.)),
        Err(Refusal::NotOwner { owner: 42 })
    );
    assert_eq!(behavior.select(42, 1., secs(5.)), Ok(()));
    assert!(matches!(
        behavior.select(42, 1., secs(6.)),
        Err(Refusal::CoolingDown { .. })
    ));
    assert_eq!(behavior.select(42, 1., secs(8.)), Ok(()));
    assert_eq!(pets.load(Ordering::SeqCst), 2);
}
