#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use trek_core::activity::{ActivityDraft, CreateActivity};
use trek_core::duration::TrekDuration;
use trek_core::trek::{CreateTrek, Trek};
use trek_core::types::DbId;
use trek_core::validation::BasicInfoDraft;
use trek_gateway::{MemoryGateway, UploadFile};

/// Fresh in-memory backend.
pub fn gateway() -> Arc<MemoryGateway> {
    Arc::new(MemoryGateway::new())
}

pub fn create_trek() -> CreateTrek {
    CreateTrek {
        title: "Annapurna Base Camp".into(),
        description: "Into the sanctuary".into(),
        full_description: "Ten days from Nayapul to ABC and back".into(),
        duration: TrekDuration::from_parts(10, 30),
        price: Decimal::new(125_000, 2),
        start_location: "Pokhara".into(),
        end_location: "Nayapul".into(),
        category_id: 2,
    }
}

/// Backend with one trek already stored.
pub fn gateway_with_trek() -> (Arc<MemoryGateway>, Trek) {
    let gw = gateway();
    let trek = gw.seed_trek(create_trek());
    (gw, trek)
}

/// A valid step-1 draft.
pub fn basic_info() -> BasicInfoDraft {
    BasicInfoDraft {
        title: "Mardi Himal".into(),
        description: "Ridge walk".into(),
        full_description: "Five days along the Mardi ridge".into(),
        duration_hours: 5,
        duration_minutes: 0,
        price: "650".into(),
        start_location: "Kande".into(),
        end_location: "Siding".into(),
        category_id: Some(1),
    }
}

/// Seed `count` plain activities with orders `1..=count`; returns their ids.
pub fn seed_itinerary(gw: &MemoryGateway, trek_id: DbId, count: u32) -> Vec<DbId> {
    (1..=count)
        .map(|order| {
            gw.seed_activity(
                trek_id,
                CreateActivity {
                    fields: ActivityDraft::activity(format!("Day {order}"), "Walk"),
                    activity_order: order,
                },
            )
            .id
        })
        .collect()
}

pub fn jpeg(name: &str) -> UploadFile {
    UploadFile::new(name, "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0])
}

pub fn jpegs(count: usize) -> Vec<UploadFile> {
    (1..=count).map(|n| jpeg(&format!("photo-{n}.jpg"))).collect()
}
