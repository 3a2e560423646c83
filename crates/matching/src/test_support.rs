//! Shared fixtures for the service tests: every service wired to a
//! `MemoryStore` and a recording notifier.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use db::models::{LocationRow, NewLocation, NewTimeslot, TimeslotRow};
use db::{MemoryStore, Store};
use realtime::{AuthEvents, ChangeFeed};

use crate::requests::{ProfileInput, RepairRequestInput};
use crate::views::RepairRequestView;
use crate::{Registration, RecordingNotifier, Services, Session, Settings};

pub(crate) struct Harness {
    pub services: Services,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let services = Services::new(
            store.clone(),
            ChangeFeed::new(64),
            AuthEvents::new(16),
            notifier.clone(),
            settings,
        );
        Self { services, store, notifier }
    }

    pub fn registration(first_name: &str, email: &str, postal_code: &str) -> Registration {
        Registration {
            first_name: first_name.into(),
            last_name: "Peeters".into(),
            email: email.into(),
            password: "hunter22".into(),
            postal_code: postal_code.into(),
        }
    }

    /// A verified user in Leuven with an open session.
    pub async fn user(&self, first_name: &str, email: &str) -> Session {
        let auth = &self.services.auth;
        auth.sign_up(Self::registration(first_name, email, "3000")).await.unwrap();
        let code = self.notifier.last_code(email).unwrap();
        auth.verify(email, &code).await.unwrap()
    }

    /// A verified user who opted in to receive requests.
    pub async fn repairer(&self, first_name: &str, email: &str) -> Session {
        let session = self.user(first_name, email).await;
        self.services
            .requests
            .update_profile(
                session.user_id,
                ProfileInput {
                    first_name: first_name.into(),
                    last_name: "Peeters".into(),
                    street: "Naamsestraat".into(),
                    number: "22".into(),
                    postal_code: "3000".into(),
                    city: "Leuven".into(),
                    phone_number: None,
                    receive_requests: true,
                },
            )
            .await
            .unwrap();
        session
    }

    pub async fn request(&self, session: &Session, device_type: &str) -> RepairRequestView {
        self.services
            .requests
            .create_repair_request(
                session.user_id,
                RepairRequestInput {
                    device_type: device_type.into(),
                    brand: Some("Philips".into()),
                    model: Some("HD7462".into()),
                    description: "It powers on but never gets hot enough to brew.".into(),
                },
            )
            .await
            .unwrap()
    }

    pub async fn location(&self, name: &str) -> LocationRow {
        self.store
            .create_location(NewLocation {
                name: name.into(),
                address: format!("{name} 1, 3000 Leuven"),
                description: None,
                google_maps_link: None,
            })
            .await
            .unwrap()
    }

    pub async fn slot_at(
        &self,
        location: &LocationRow,
        at: DateTime<Utc>,
        capacity: i32,
    ) -> TimeslotRow {
        self.store
            .create_timeslot(NewTimeslot {
                location_id: location.location_id,
                date_time: at,
                capacity,
            })
            .await
            .unwrap()
    }

    pub async fn slot(
        &self,
        location: &LocationRow,
        hours_ahead: i64,
        capacity: i32,
    ) -> TimeslotRow {
        self.slot_at(location, Utc::now() + Duration::hours(hours_ahead), capacity).await
    }
}
