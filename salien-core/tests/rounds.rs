use std::time::Duration;

use chrono::Utc;
use salien_core::api::Operation;
use salien_core::{CycleState, RestartReason, RetryPolicy, RoundOutcome, SelectedTarget, SessionStats};
use salien_devkit::fixtures::{
    boss_game_over, boss_status, boss_waiting, boss_zone, idle_player, join_failed, joined_zone,
    empty, player_in_boss_game, player_in_zone, player_on_planet, score_report, zone,
};
use salien_devkit::TestHarness;
use serde_json::json;
use tokio::time::Instant;

async fn first_target(harness: &TestHarness, cycle: &mut CycleState) -> SelectedTarget {
    match harness.controller().setup(cycle).await.unwrap() {
        RoundOutcome::Continue(target) => target,
        other => panic!("expected a target, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_normal_round_reports_score_and_continues() {
    let harness = TestHarness::new();
    harness.script_planets(&[("1", vec![zone(5, 2, 0.3)])]);
    harness.script_player_info(vec![idle_player(), player_on_planet("1"), player_in_zone("1", "10005")]);
    harness.transport.respond(Operation::JoinPlanet, json!({}));
    harness.transport.respond(Operation::JoinZone, joined_zone(5, 2, 3));
    harness.transport.respond(Operation::ReportScore, score_report(100, 220, 1000, 2));
    harness.transport.respond(Operation::LeaveGame, json!({}));

    let controller = harness.controller();
    let mut cycle = CycleState::default();
    let mut stats = SessionStats::new(Utc::now());
    let target = first_target(&harness, &mut cycle).await;

    let started = Instant::now();
    let outcome = controller.play_round(&mut cycle, target, &mut stats).await.unwrap();

    let RoundOutcome::Continue(next) = outcome else {
        panic!("expected to continue, got {:?}", outcome);
    };
    assert_eq!(next.planet_id, "1");
    assert!(started.elapsed() >= Duration::from_secs(2));

    harness.assert_called(Operation::JoinPlanet, 1).unwrap();
    harness.assert_param(Operation::JoinZone, "zone_position", "5").unwrap();
    harness.assert_param(Operation::ReportScore, "score", "1200").unwrap();
    harness.assert_param(Operation::LeaveGame, "gameid", "10005").unwrap();
    harness.assert_order(Operation::JoinZone, Operation::ReportScore).unwrap();
    // initial scan plus the prefetch for the next round
    harness.assert_called(Operation::GetPlanets, 2).unwrap();

    assert_eq!(stats.rounds, 1);
    assert_eq!(stats.xp_earned, 120);
    assert_eq!(stats.level, Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_round_window_starts_after_join_retries() {
    let harness = TestHarness::new().with_config(|config| {
        config.retry = RetryPolicy {
            max_retries: 3,
            retry_delay: Duration::from_secs(3),
        };
    });
    harness.script_planets(&[("1", vec![zone(5, 3, 0.3)])]);
    harness.script_player_info(vec![player_on_planet("1")]);
    harness.transport.fail_once(Operation::JoinZone, "timed out");
    harness.transport.fail_once(Operation::JoinZone, "timed out");
    harness.transport.respond(Operation::JoinZone, joined_zone(5, 3, 3));
    harness.transport.respond(Operation::ReportScore, score_report(0, 2400, 4800, 2));

    let controller = harness.controller();
    let mut cycle = CycleState::default();
    let mut stats = SessionStats::new(Utc::now());
    let target = first_target(&harness, &mut cycle).await;
    let round_window = harness.config.timings.round_window;

    let started = Instant::now();
    controller.play_round(&mut cycle, target, &mut stats).await.unwrap();

    // two retry delays before the join landed, then the full window
    harness.assert_called(Operation::JoinZone, 3).unwrap();
    assert!(started.elapsed() >= Duration::from_secs(6) + round_window);
    assert_eq!(stats.rounds, 1);
}

#[tokio::test(start_paused = true)]
async fn test_score_report_without_scores_is_retried() {
    let harness = TestHarness::new();
    harness.script_planets(&[("1", vec![zone(5, 2, 0.3)])]);
    harness.script_player_info(vec![player_on_planet("1")]);
    harness.transport.respond(Operation::JoinZone, joined_zone(5, 2, 3));
    harness.transport.respond_once(Operation::ReportScore, empty());
    harness.transport.respond(Operation::ReportScore, score_report(100, 1300, 2400, 2));

    let controller = harness.controller();
    let mut cycle = CycleState::default();
    let mut stats = SessionStats::new(Utc::now());
    let target = first_target(&harness, &mut cycle).await;

    controller.play_round(&mut cycle, target, &mut stats).await.unwrap();

    harness.assert_called(Operation::ReportScore, 2).unwrap();
    assert_eq!(stats.rounds, 1);
    assert_eq!(stats.xp_earned, 1200);
}

#[tokio::test(start_paused = true)]
async fn test_score_follows_joined_difficulty() {
    let harness = TestHarness::new();
    harness.script_planets(&[("1", vec![zone(5, 1, 0.3)])]);
    harness.script_player_info(vec![player_on_planet("1")]);
    // the zone was upgraded between the scan and the join
    harness.transport.respond(Operation::JoinZone, joined_zone(5, 3, 3));
    harness.transport.respond(Operation::ReportScore, score_report(0, 2400, 4800, 2));

    let controller = harness.controller();
    let mut cycle = CycleState::default();
    let mut stats = SessionStats::new(Utc::now());
    let target = first_target(&harness, &mut cycle).await;
    assert_eq!(target.zone.position, 5);

    controller.play_round(&mut cycle, target, &mut stats).await.unwrap();

    harness.assert_param(Operation::ReportScore, "score", "2400").unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_join_failure_restarts_without_report() {
    let harness = TestHarness::new();
    harness.script_planets(&[("1", vec![zone(5, 3, 0.3)])]);
    harness.script_player_info(vec![player_on_planet("1")]);
    harness.transport.respond(Operation::JoinZone, join_failed());

    let controller = harness.controller();
    let mut cycle = CycleState::default();
    let mut stats = SessionStats::new(Utc::now());
    let target = first_target(&harness, &mut cycle).await;

    let outcome = controller.play_round(&mut cycle, target, &mut stats).await.unwrap();

    assert_eq!(outcome, RoundOutcome::Restart(RestartReason::JoinFailed { position: 5 }));
    harness.assert_not_called(Operation::ReportScore).unwrap();
    assert_eq!(stats.rounds, 0);
}

#[tokio::test(start_paused = true)]
async fn test_wrong_planet_after_round_restarts() {
    let harness = TestHarness::new();
    harness.script_planets(&[("1", vec![zone(5, 1, 0.3)])]);
    harness.script_player_info(vec![player_on_planet("1"), player_on_planet("2")]);
    harness.transport.respond(Operation::JoinZone, joined_zone(5, 1, 3));
    harness.transport.respond(Operation::ReportScore, score_report(0, 600, 1200, 1));
    harness.transport.respond(Operation::LeaveGame, json!({}));

    let controller = harness.controller();
    let mut cycle = CycleState::default();
    let mut stats = SessionStats::new(Utc::now());
    let target = first_target(&harness, &mut cycle).await;

    let outcome = controller.play_round(&mut cycle, target, &mut stats).await.unwrap();

    assert_eq!(
        outcome,
        RoundOutcome::Restart(RestartReason::WrongPlanet {
            expected: "1".into(),
            observed: Some("2".into()),
        })
    );
    harness.assert_param(Operation::ReportScore, "score", "600").unwrap();
    assert_eq!(stats.rounds, 1);
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_failure_restarts_before_joining_zone() {
    let harness = TestHarness::new().with_config(|config| config.reconcile_max_iterations = 2);
    harness.script_planets(&[("1", vec![zone(5, 3, 0.3)])]);
    harness.script_player_info(vec![idle_player()]);
    harness.transport.respond(Operation::JoinPlanet, json!({}));

    let controller = harness.controller();
    let mut cycle = CycleState::default();
    let mut stats = SessionStats::new(Utc::now());
    let target = first_target(&harness, &mut cycle).await;

    let outcome = controller.play_round(&mut cycle, target, &mut stats).await.unwrap();

    assert_eq!(
        outcome,
        RoundOutcome::Restart(RestartReason::NotConverged {
            desired: "1".into(),
            observed: None,
        })
    );
    harness.assert_called(Operation::JoinPlanet, 2).unwrap();
    harness.assert_not_called(Operation::JoinZone).unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_boss_round_until_game_over() {
    let harness = TestHarness::new();
    harness.script_planets(&[("2", vec![boss_zone(9, 0.0)])]);
    harness.script_player_info(vec![
        idle_player(),
        player_on_planet("2"),
        player_in_boss_game("2", "20009"),
    ]);
    harness.transport.respond(Operation::JoinPlanet, json!({}));
    harness.transport.respond(Operation::JoinBossZone, joined_zone(9, 3, 4));
    harness.transport.respond_once(Operation::ReportBossDamage, boss_waiting());
    harness.transport.respond_once(Operation::ReportBossDamage, boss_status(90_000, 100_000));
    harness.transport.respond_once(Operation::ReportBossDamage, boss_game_over());
    harness.transport.respond(Operation::LeaveGame, json!({}));

    let controller = harness.controller();
    let mut cycle = CycleState::default();
    let mut stats = SessionStats::new(Utc::now());
    let target = first_target(&harness, &mut cycle).await;
    assert!(target.zone.is_boss());

    let outcome = controller.play_round(&mut cycle, target, &mut stats).await.unwrap();
    assert!(matches!(outcome, RoundOutcome::Continue(ref next) if next.planet_id == "2"));

    let damage: Vec<Option<String>> = harness
        .transport
        .requests_for(Operation::ReportBossDamage)
        .iter()
        .map(|request| request.param("damage_to_boss").map(str::to_string))
        .collect();
    assert_eq!(
        damage,
        vec![Some("0".to_string()), Some("0".to_string()), Some("1".to_string())]
    );

    harness.assert_param(Operation::LeaveGame, "gameid", "20009").unwrap();
    harness.assert_param(Operation::LeaveGame, "gameid", "2").unwrap();
    harness.assert_not_called(Operation::ReportScore).unwrap();
    assert_eq!(stats.boss_fights, 1);
}

#[tokio::test(start_paused = true)]
async fn test_boss_round_gives_up_after_failure_budget() {
    let harness = TestHarness::new().with_config(|config| config.boss.failure_budget = 3);
    harness.script_planets(&[("2", vec![boss_zone(9, 0.0)])]);
    harness.script_player_info(vec![player_on_planet("2"), idle_player()]);
    harness.transport.respond(Operation::JoinBossZone, joined_zone(9, 3, 4));
    harness.transport.fail(Operation::ReportBossDamage, "connection reset");

    let controller = harness.controller();
    let mut cycle = CycleState::default();
    let mut stats = SessionStats::new(Utc::now());
    let target = first_target(&harness, &mut cycle).await;

    controller.play_round(&mut cycle, target, &mut stats).await.unwrap();

    // single attempt per tick, no retries
    harness.assert_called(Operation::ReportBossDamage, 3).unwrap();
    assert_eq!(stats.boss_fights, 1);
}

#[tokio::test(start_paused = true)]
async fn test_boss_round_heals_on_schedule() {
    let harness = TestHarness::new().with_config(|config| config.boss.heal_every_ticks = 3);
    harness.script_planets(&[("2", vec![boss_zone(9, 0.0)])]);
    harness.script_player_info(vec![player_on_planet("2"), player_in_boss_game("2", "20009")]);
    harness.transport.respond(Operation::JoinBossZone, joined_zone(9, 3, 4));
    harness.transport.respond_once(Operation::ReportBossDamage, boss_status(90_000, 100_000));
    harness.transport.respond_once(Operation::ReportBossDamage, boss_status(80_000, 100_000));
    harness.transport.respond_once(Operation::ReportBossDamage, boss_status(70_000, 100_000));
    harness.transport.respond(Operation::ReportBossDamage, boss_game_over());
    harness.transport.respond(Operation::LeaveGame, json!({}));

    let controller = harness.controller();
    let mut cycle = CycleState::default();
    let mut stats = SessionStats::new(Utc::now());
    let target = first_target(&harness, &mut cycle).await;

    controller.play_round(&mut cycle, target, &mut stats).await.unwrap();

    let heals: Vec<Option<String>> = harness
        .transport
        .requests_for(Operation::ReportBossDamage)
        .iter()
        .map(|request| request.param("use_heal_ability").map(str::to_string))
        .collect();
    let expected: Vec<Option<String>> = ["0", "0", "1", "0"]
        .iter()
        .map(|value| Some(value.to_string()))
        .collect();
    assert_eq!(heals, expected);
    assert_eq!(stats.boss_fights, 1);
}
