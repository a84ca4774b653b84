mod common;

use assert_matches::assert_matches;
use trek_authoring::{AuthoringError, WizardController};
use trek_core::activity::ActivityDraft;
use trek_core::catalog::{CatalogKind, Service, ServiceFields};
use trek_core::duration::TrekDuration;
use trek_core::validation::StepDraft;
use trek_core::wizard::{WizardStatus, WizardStep};
use trek_gateway::memory::{Failure, Operation};

// ---------------------------------------------------------------------------
// Step 1
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_basic_info_blocks_advance() {
    let gw = common::gateway();
    let mut wizard = WizardController::new(gw.clone());
    wizard.basic_info_mut().title = String::new();
    wizard.basic_info_mut().price = "-5".into();

    let err = wizard.next().await.unwrap_err();
    assert_matches!(err, AuthoringError::Validation(_));
    assert_eq!(wizard.current_step(), WizardStep::BasicInfo);
    assert!(wizard.errors().contains("title"));
    assert!(wizard.errors().contains("price"));
    assert_eq!(gw.call_count(), 0);
}

#[tokio::test]
async fn first_save_creates_and_later_saves_update() {
    let gw = common::gateway();
    let mut wizard = WizardController::new(gw.clone());
    *wizard.basic_info_mut() = common::basic_info();

    let created = wizard.save_basic_info().await.unwrap();
    assert_eq!(wizard.trek_id(), Some(created.id));
    assert_eq!(created.duration, TrekDuration::from_parts(5, 0));

    wizard.basic_info_mut().duration_minutes = 30;
    wizard.save_basic_info().await.unwrap();

    assert_eq!(gw.calls_of(Operation::CreateTrek).len(), 1);
    assert_eq!(gw.calls_of(Operation::UpdateTrek).len(), 1);
    assert_eq!(
        gw.trek(created.id).unwrap().duration.to_string(),
        "PT5H30M"
    );
}

#[tokio::test]
async fn steps_past_the_first_need_a_trek() {
    let gw = common::gateway();
    let mut wizard = WizardController::new(gw.clone());

    assert_matches!(
        wizard.advance(Ok(())).await,
        Err(AuthoringError::StepLocked { step: WizardStep::Services, .. })
    );
    assert_eq!(wizard.current_step(), WizardStep::BasicInfo);
    assert!(matches!(
        wizard.services(),
        Err(AuthoringError::StepLocked { .. })
    ));
}

#[tokio::test]
async fn failed_create_keeps_wizard_on_step_one() {
    let gw = common::gateway();
    let mut wizard = WizardController::new(gw.clone());
    *wizard.basic_info_mut() = common::basic_info();
    gw.fail_next(Operation::CreateTrek, Failure::Rejected("Title already exists".into()));

    assert!(wizard.next().await.is_err());
    assert_eq!(wizard.current_step(), WizardStep::BasicInfo);
    assert_eq!(wizard.message(), Some("Title already exists"));
    assert!(wizard.trek_id().is_none());

    wizard.next().await.unwrap();
    assert_eq!(wizard.current_step(), WizardStep::Services);
    assert!(wizard.message().is_none());
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn advancing_loads_the_next_steps_data() {
    let gw = common::gateway();
    gw.seed_entry::<Service>(ServiceFields::new("Porter"));
    let mut wizard = WizardController::new(gw.clone());
    *wizard.basic_info_mut() = common::basic_info();

    wizard.next().await.unwrap();
    assert_eq!(
        gw.calls_of(Operation::ListCatalog(CatalogKind::Service)).len(),
        1
    );
    assert_eq!(wizard.services().unwrap().catalog().len(), 1);
}

#[tokio::test]
async fn retreat_does_not_reissue_calls_or_clear_services() {
    let gw = common::gateway();
    let porter: Service = gw.seed_entry(ServiceFields::new("Porter"));
    let mut wizard = WizardController::new(gw.clone());
    *wizard.basic_info_mut() = common::basic_info();

    wizard.next().await.unwrap();
    wizard.services().unwrap().toggle(porter.id).await.unwrap();
    wizard.next().await.unwrap();
    assert_eq!(wizard.current_step(), WizardStep::Highlights);
    let calls_before = gw.call_count();

    assert_eq!(wizard.retreat(), WizardStep::Services);
    assert_eq!(gw.call_count(), calls_before);
    assert!(wizard.services().unwrap().is_selected(porter.id));
    assert_matches!(
        wizard.current_draft(),
        StepDraft::Services(d) if d.selected == vec![porter.id]
    );

    wizard.next().await.unwrap();
    assert_eq!(gw.call_count(), calls_before);
    assert_eq!(wizard.current_step(), WizardStep::Highlights);
}

#[tokio::test]
async fn retreat_is_floored_at_the_first_step() {
    let gw = common::gateway();
    let mut wizard = WizardController::new(gw);
    assert_eq!(wizard.retreat(), WizardStep::BasicInfo);
}

#[tokio::test]
async fn failed_step_result_is_surfaced_without_moving() {
    let (gw, trek) = common::gateway_with_trek();
    let mut wizard = WizardController::resume(gw.clone(), trek.id).await.unwrap();
    wizard.next().await.unwrap();

    let result = wizard
        .advance(Err(AuthoringError::Rejected("Service catalog is locked".into())))
        .await;
    assert!(result.is_err());
    assert_eq!(wizard.current_step(), WizardStep::Services);
    assert_eq!(wizard.message(), Some("Service catalog is locked"));
}

#[tokio::test]
async fn stale_itinerary_blocks_leaving_activities() {
    let (gw, trek) = common::gateway_with_trek();
    let ids = common::seed_itinerary(&gw, trek.id, 3);
    let mut wizard = WizardController::resume(gw.clone(), trek.id).await.unwrap();
    for _ in 0..3 {
        wizard.next().await.unwrap();
    }
    assert_eq!(wizard.current_step(), WizardStep::Activities);

    gw.fail_next(Operation::UpdateActivityOrder, Failure::Transport);
    let outcome = wizard.activities().unwrap().remove(ids[0]).await;
    assert!(wizard.record(outcome).is_err());

    let err = wizard.next().await.unwrap_err();
    assert!(err.field_errors().unwrap().contains("activities"));
    assert_eq!(wizard.current_step(), WizardStep::Activities);

    wizard.activities().unwrap().reconcile_order().await.unwrap();
    wizard.next().await.unwrap();
    assert_eq!(wizard.current_step(), WizardStep::Images);
}

#[tokio::test]
async fn failed_itinerary_load_does_not_duplicate_orders() {
    let (gw, trek) = common::gateway_with_trek();
    common::seed_itinerary(&gw, trek.id, 2);
    let mut wizard = WizardController::resume(gw.clone(), trek.id).await.unwrap();
    wizard.next().await.unwrap();
    wizard.next().await.unwrap();

    gw.fail_next(Operation::ListActivities, Failure::Transport);
    assert!(wizard.next().await.is_err());
    assert_eq!(wizard.current_step(), WizardStep::Activities);
    assert!(!wizard.activities().unwrap().is_loaded());

    let created = wizard
        .activities()
        .unwrap()
        .append(ActivityDraft::activity("Day 3", "Siding to Lumre"))
        .await
        .unwrap();
    assert_eq!(created.activity_order, 3);
    let remote: Vec<u32> = gw.activities(trek.id).iter().map(|a| a.activity_order).collect();
    assert_eq!(remote, vec![1, 2, 3]);

    wizard.next().await.unwrap();
    assert_eq!(wizard.current_step(), WizardStep::Images);
}

#[tokio::test]
async fn unloaded_step_is_not_left_until_it_loads() {
    let (gw, trek) = common::gateway_with_trek();
    common::seed_itinerary(&gw, trek.id, 2);
    let mut wizard = WizardController::resume(gw.clone(), trek.id).await.unwrap();
    wizard.next().await.unwrap();
    wizard.next().await.unwrap();

    gw.fail_next(Operation::ListActivities, Failure::Transport);
    assert!(wizard.next().await.is_err());
    gw.fail_next(Operation::ListActivities, Failure::Transport);

    assert_matches!(wizard.next().await, Err(AuthoringError::Transport(_)));
    assert_eq!(wizard.current_step(), WizardStep::Activities);
    assert!(wizard.message().is_some());

    wizard.next().await.unwrap();
    assert_eq!(wizard.current_step(), WizardStep::Images);
    assert_eq!(wizard.activities().unwrap().orders(), vec![1, 2]);
}

// ---------------------------------------------------------------------------
// Resume and completion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resume_prefills_the_draft() {
    let (gw, trek) = common::gateway_with_trek();
    let wizard = WizardController::resume(gw, trek.id).await.unwrap();

    assert_eq!(wizard.current_step(), WizardStep::BasicInfo);
    assert_eq!(wizard.trek_id(), Some(trek.id));
    let draft = wizard.basic_info();
    assert_eq!(draft.title, "Annapurna Base Camp");
    assert_eq!((draft.duration_hours, draft.duration_minutes), (10, 30));
    assert_eq!(draft.price, "1250");
}

#[tokio::test]
async fn resume_of_unknown_trek_fails() {
    let gw = common::gateway();
    let result = WizardController::resume(gw, 77).await;
    assert!(matches!(result, Err(AuthoringError::Rejected(_))));
}

#[tokio::test]
async fn complete_requires_last_step_and_full_gallery() {
    let gw = common::gateway();
    let mut wizard = WizardController::new(gw.clone());
    *wizard.basic_info_mut() = common::basic_info();
    assert_matches!(wizard.complete(), Err(AuthoringError::StepLocked { .. }));

    wizard.next().await.unwrap();
    wizard.next().await.unwrap();
    wizard.next().await.unwrap();
    wizard
        .activities()
        .unwrap()
        .append(ActivityDraft::activity("Day 1", "Kande to Forest Camp"))
        .await
        .unwrap();
    wizard.next().await.unwrap();
    assert_eq!(wizard.current_step(), WizardStep::Images);

    let err = wizard.complete().unwrap_err();
    assert!(err.field_errors().unwrap().contains("images"));

    let gallery = wizard.gallery().unwrap();
    gallery.stage_files(common::jpegs(4));
    gallery.commit_upload().await.unwrap();

    wizard.complete().unwrap();
    assert_eq!(wizard.status(), WizardStatus::Completed);
    assert_matches!(wizard.next().await, Err(AuthoringError::StepLocked { .. }));
}

#[tokio::test]
async fn abandoned_session_keeps_persisted_work() {
    let gw = common::gateway();
    let mut wizard = WizardController::new(gw.clone());
    *wizard.basic_info_mut() = common::basic_info();
    wizard.next().await.unwrap();
    let trek_id = wizard.trek_id().unwrap();

    wizard.abandon();
    assert_eq!(wizard.status(), WizardStatus::Abandoned);
    assert!(gw.trek(trek_id).is_some());
    assert_matches!(wizard.save_basic_info().await, Err(AuthoringError::StepLocked { .. }));
}
