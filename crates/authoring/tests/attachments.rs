mod common;

use assert_matches::assert_matches;
use trek_authoring::{AttachmentSet, AuthoringError};
use trek_core::catalog::{CatalogKind, Highlight, HighlightFields, Service, ServiceFields};
use trek_gateway::memory::{Failure, Operation};

// ---------------------------------------------------------------------------
// Toggle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn toggle_twice_restores_selection_with_two_calls() {
    let (gw, trek) = common::gateway_with_trek();
    let porter: Service = gw.seed_entry(ServiceFields::new("Porter"));
    let mut set: AttachmentSet<Service, _> = AttachmentSet::new(gw.clone(), trek.id, []);
    set.load_catalog().await.unwrap();
    gw.clear_calls();

    assert!(set.toggle(porter.id).await.unwrap());
    assert!(set.is_selected(porter.id));
    assert_eq!(gw.trek(trek.id).unwrap().service_ids, vec![porter.id]);

    assert!(!set.toggle(porter.id).await.unwrap());
    assert!(set.selected().is_empty());
    assert!(gw.trek(trek.id).unwrap().service_ids.is_empty());

    let ops: Vec<_> = gw.calls().iter().map(|c| c.operation).collect();
    assert_eq!(
        ops,
        vec![
            Operation::Attach(CatalogKind::Service),
            Operation::Detach(CatalogKind::Service)
        ]
    );
}

#[tokio::test]
async fn failed_toggle_leaves_selection_unchanged() {
    let (gw, trek) = common::gateway_with_trek();
    let guide: Service = gw.seed_entry(ServiceFields::new("Guide"));
    let mut set: AttachmentSet<Service, _> = AttachmentSet::new(gw.clone(), trek.id, []);
    gw.fail_next(Operation::Attach(CatalogKind::Service), Failure::Transport);

    assert_matches!(set.toggle(guide.id).await, Err(AuthoringError::Transport(_)));
    assert!(!set.is_selected(guide.id));
}

#[tokio::test]
async fn existing_membership_is_detached_on_toggle() {
    let (gw, trek) = common::gateway_with_trek();
    let view: Highlight = gw.seed_entry(HighlightFields::new("Machapuchare at dawn"));
    let mut set: AttachmentSet<Highlight, _> = AttachmentSet::new(gw.clone(), trek.id, [view.id]);

    assert!(!set.toggle(view.id).await.unwrap());
    assert_eq!(
        gw.calls_of(Operation::Detach(CatalogKind::Highlight)).len(),
        1
    );
}

// ---------------------------------------------------------------------------
// Create and attach
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_and_attach_adds_to_catalog_and_selection() {
    let (gw, trek) = common::gateway_with_trek();
    let mut set: AttachmentSet<Service, _> = AttachmentSet::new(gw.clone(), trek.id, []);
    set.load_catalog().await.unwrap();
    assert!(set.catalog().is_empty());

    let lunch = set
        .create_and_attach(ServiceFields::new("Lunch"))
        .await
        .unwrap();

    assert_eq!(set.catalog().len(), 1);
    assert_eq!(set.catalog()[0].name, "Lunch");
    assert_eq!(set.selected().iter().copied().collect::<Vec<_>>(), vec![lunch.id]);
    assert_eq!(gw.trek(trek.id).unwrap().service_ids, vec![lunch.id]);
}

#[tokio::test]
async fn create_and_attach_rejects_blank_fields_locally() {
    let (gw, trek) = common::gateway_with_trek();
    let mut set: AttachmentSet<Highlight, _> = AttachmentSet::new(gw.clone(), trek.id, []);

    let err = set
        .create_and_attach(HighlightFields::new("   "))
        .await
        .unwrap_err();
    assert!(err.field_errors().unwrap().contains("content"));
    assert_eq!(gw.call_count(), 0);
}

#[tokio::test]
async fn failed_create_attaches_nothing() {
    let (gw, trek) = common::gateway_with_trek();
    let mut set: AttachmentSet<Service, _> = AttachmentSet::new(gw.clone(), trek.id, []);
    gw.fail_next(
        Operation::CreateEntry(CatalogKind::Service),
        Failure::Rejected("Name taken".into()),
    );

    assert_matches!(
        set.create_and_attach(ServiceFields::new("Lunch")).await,
        Err(AuthoringError::Rejected(m)) if m == "Name taken"
    );
    assert!(set.catalog().is_empty());
    assert!(gw.calls_of(Operation::Attach(CatalogKind::Service)).is_empty());
}

#[tokio::test]
async fn failed_attach_reports_partial_completion() {
    let (gw, trek) = common::gateway_with_trek();
    let mut set: AttachmentSet<Service, _> = AttachmentSet::new(gw.clone(), trek.id, []);
    gw.fail_next(Operation::Attach(CatalogKind::Service), Failure::Transport);

    let err = set
        .create_and_attach(ServiceFields::new("Lunch"))
        .await
        .unwrap_err();
    assert!(err.is_partial());
    assert!(err.message().contains("created but not attached"));

    // The entry exists globally and locally but is not selected.
    let created = set.find("lunch").unwrap().clone();
    assert!(!set.is_selected(created.id));
    assert_eq!(gw.catalog::<Service>().len(), 1);

    // Retrying is a plain toggle.
    assert!(set.toggle(created.id).await.unwrap());
    assert_eq!(gw.trek(trek.id).unwrap().service_ids, vec![created.id]);
}

// ---------------------------------------------------------------------------
// Catalog maintenance and search
// ---------------------------------------------------------------------------

#[tokio::test]
async fn filter_is_local_and_case_insensitive() {
    let (gw, trek) = common::gateway_with_trek();
    gw.seed_entry::<Service>(ServiceFields::new("Airport pickup"));
    gw.seed_entry::<Service>(ServiceFields::new("Porter"));
    gw.seed_entry::<Service>(ServiceFields::new("Permit PICKUP"));
    let mut set: AttachmentSet<Service, _> = AttachmentSet::new(gw.clone(), trek.id, []);
    set.load_catalog().await.unwrap();
    gw.clear_calls();

    let names: Vec<_> = set.filter("pickup").iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Airport pickup", "Permit PICKUP"]);
    assert_eq!(set.filter("").len(), 3);
    assert_eq!(gw.call_count(), 0);
}

#[tokio::test]
async fn update_and_delete_entry_keep_local_state_in_step() {
    let (gw, trek) = common::gateway_with_trek();
    let tea: Service = gw.seed_entry(ServiceFields::new("Tea"));
    let mut set: AttachmentSet<Service, _> = AttachmentSet::new(gw.clone(), trek.id, []);
    set.load_catalog().await.unwrap();
    set.toggle(tea.id).await.unwrap();

    let renamed = set
        .update_entry(tea.id, ServiceFields::new("Masala tea"))
        .await
        .unwrap();
    assert_eq!(renamed.name, "Masala tea");
    assert_eq!(set.catalog()[0].name, "Masala tea");

    set.delete_entry(tea.id).await.unwrap();
    assert!(set.catalog().is_empty());
    assert!(!set.is_selected(tea.id));
    assert!(gw.trek(trek.id).unwrap().service_ids.is_empty());
}

#[tokio::test]
async fn ensure_loaded_fetches_once() {
    let (gw, trek) = common::gateway_with_trek();
    let mut set: AttachmentSet<Highlight, _> = AttachmentSet::new(gw.clone(), trek.id, []);

    set.ensure_loaded().await.unwrap();
    set.ensure_loaded().await.unwrap();
    assert_eq!(
        gw.calls_of(Operation::ListCatalog(CatalogKind::Highlight)).len(),
        1
    );
}
