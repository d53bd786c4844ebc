//! Journey: a card through several days of reviews, then into sessions
//!
//! Walks the scheduling state across a realistic sequence of evaluations and
//! checks the due-set resolver and session composer on top of real storage.

use chrono::{DateTime, Duration, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use retell_core::{
    Card, EvaluationOrchestrator, MasteryLevel, ReviewState, ReviewStore, ScheduleOutcome,
    SessionComposer, SessionConfig, resolve_due_sets, resolve_mastery_bucket,
};
use retell_e2e_tests::harness::TestDatabaseManager;
use retell_e2e_tests::mocks::ScriptedJudge;

fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

fn evaluate(db: &TestDatabaseManager, card: &Card, score: f64, now: DateTime<Utc>) {
    let judge = ScriptedJudge::always(score);
    let outcome = EvaluationOrchestrator::new(&db.store, &judge)
        .evaluate("user-1", card, "attempt", now)
        .unwrap();
    assert!(matches!(outcome.schedule, ScheduleOutcome::Applied { .. }));
}

#[test]
fn interval_grows_across_passes_and_resets_on_fail() {
    let db = TestDatabaseManager::new_temp();
    let (_deck, cards) = db.seed_deck("cycle", "user-1", 1);
    let card = &cards[0];

    let day0 = at("2026-03-01T09:00:00Z");
    evaluate(&db, card, 9.0, day0);
    let r = db.store.get("user-1", &card.id).unwrap().unwrap();
    assert_eq!((r.ease_factor, r.interval_days), (2.6, 1));

    // day 1: pass again, interval = round(1 * 2.7)
    evaluate(&db, card, 9.0, day0 + Duration::days(1));
    let r = db.store.get("user-1", &card.id).unwrap().unwrap();
    assert!((r.ease_factor - 2.7).abs() < 1e-9);
    assert_eq!(r.interval_days, 3);

    // day 4: pass, interval = round(3 * 2.8)
    evaluate(&db, card, 9.0, day0 + Duration::days(4));
    let r = db.store.get("user-1", &card.id).unwrap().unwrap();
    assert!((r.ease_factor - 2.8).abs() < 1e-9);
    assert_eq!(r.interval_days, 8);
    assert_eq!(r.state, ReviewState::Review);

    // a fail resets the interval and drops back to learning
    evaluate(&db, card, 3.0, day0 + Duration::days(12));
    let r = db.store.get("user-1", &card.id).unwrap().unwrap();
    assert_eq!(r.interval_days, 0);
    assert_eq!(r.state, ReviewState::Learning);
    assert!((r.ease_factor - 2.5).abs() < 1e-9);
    assert_eq!(r.next_review_at, day0 + Duration::days(13));
}

#[test]
fn due_sets_partition_against_real_records() {
    let db = TestDatabaseManager::new_temp();
    let (deck, cards) = db.seed_deck("partition", "user-1", 6);
    let day0 = at("2026-03-01T09:00:00Z");

    // three cards evaluated at day 0 come due at day 1
    for card in &cards[..3] {
        evaluate(&db, card, 9.0, day0);
    }

    // an hour later nothing is due yet
    let sets = resolve_due_sets(
        &db.store,
        "user-1",
        db.store.deck_cards(&deck.id).unwrap(),
        day0 + Duration::hours(1),
    )
    .unwrap();
    assert_eq!(sets.due.len(), 0);
    assert_eq!(sets.new.len(), 3);
    assert_eq!(sets.not_due.len(), 3);

    // two days later the evaluated cards are all due
    let sets = resolve_due_sets(
        &db.store,
        "user-1",
        db.store.deck_cards(&deck.id).unwrap(),
        day0 + Duration::days(2),
    )
    .unwrap();
    assert_eq!(sets.due.len(), 3);
    assert_eq!(sets.new.len(), 3);
    assert!(sets.not_due.is_empty());
}

#[test]
fn composed_session_respects_limit_and_has_no_duplicates() {
    let db = TestDatabaseManager::new_temp();
    let (deck, cards) = db.seed_deck("compose", "user-1", 12);
    let day0 = at("2026-03-01T09:00:00Z");
    for card in &cards[..8] {
        evaluate(&db, card, 9.0, day0);
    }

    let later = day0 + Duration::days(3);
    let sets = resolve_due_sets(
        &db.store,
        "user-1",
        db.store.deck_cards(&deck.id).unwrap(),
        later,
    )
    .unwrap();
    let due: Vec<Card> = sets.due.into_iter().map(|(card, _)| card).collect();

    let composer = SessionComposer::new(SessionConfig::default().with_limit(10));
    let mut rng = StdRng::seed_from_u64(7);
    let session = composer.compose(due, sets.new, &mut rng);

    assert_eq!(session.len(), 10);
    let mut ids: Vec<_> = session.iter().map(|c| c.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 10);
    // with the default period, the fourth slot is a new card while supply lasts
    let new_ids: Vec<_> = cards[8..].iter().map(|c| c.id.clone()).collect();
    assert!(new_ids.contains(&session[3].id));
}

#[test]
fn whole_deck_mode_covers_every_card_with_stats() {
    let db = TestDatabaseManager::new_temp();
    let (deck, cards) = db.seed_deck("whole", "user-1", 5);
    let day0 = at("2026-03-01T09:00:00Z");
    evaluate(&db, &cards[0], 9.0, day0);
    evaluate(&db, &cards[1], 3.0, day0);

    use retell_core::CardSource;
    let population = db.store.deck_cards(&deck.id).unwrap();
    let ids: Vec<String> = population.iter().map(|c| c.id.clone()).collect();
    let records = db.store.list_review_records("user-1", &ids).unwrap();

    let composer = SessionComposer::new(SessionConfig::whole_deck());
    let mut rng = StdRng::seed_from_u64(7);
    let (graded, stats) =
        composer.compose_whole_deck(population, &records, day0 + Duration::days(2), &mut rng);

    assert_eq!(graded.len(), 5);
    assert_eq!(stats.total, 5);
    assert_eq!(stats.new, 3);
    assert_eq!(stats.due, 2);
    assert_eq!(stats.returned, 5);
    // graded cards serialize with camelCase keys for the API layer
    let wire = serde_json::to_value(&graded[0]).unwrap();
    assert!(wire.get("mastery").is_some());
    assert!(wire.get("lastScore").is_some());
    // every mastery annotation matches its source score
    for g in &graded {
        if g.card.id == cards[0].id {
            assert_eq!(g.mastery, MasteryLevel::Green);
        } else if g.card.id == cards[1].id {
            assert_eq!(g.mastery, MasteryLevel::Red);
        } else {
            assert_eq!(g.mastery, MasteryLevel::New);
        }
    }
}

#[test]
fn mastery_bucket_practice_selects_struggling_cards() {
    let db = TestDatabaseManager::new_temp();
    let (deck, cards) = db.seed_deck("buckets", "user-1", 4);
    let day0 = at("2026-03-01T09:00:00Z");
    evaluate(&db, &cards[0], 2.0, day0);
    evaluate(&db, &cards[1], 4.5, day0 + Duration::hours(1));
    evaluate(&db, &cards[2], 9.0, day0);

    let red = resolve_mastery_bucket(
        &db.store,
        "user-1",
        db.store.deck_cards(&deck.id).unwrap(),
        MasteryLevel::Red,
    )
    .unwrap();
    // both failing cards, least recently practiced first
    assert_eq!(red.len(), 2);
    assert_eq!(red[0].card.id, cards[0].id);
    assert_eq!(red[1].card.id, cards[1].id);

    let new = resolve_mastery_bucket(
        &db.store,
        "user-1",
        db.store.deck_cards(&deck.id).unwrap(),
        MasteryLevel::New,
    )
    .unwrap();
    assert_eq!(new.len(), 1);
    assert_eq!(new[0].card.id, cards[3].id);
}
