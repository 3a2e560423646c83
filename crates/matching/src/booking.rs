//! Locations, timeslots and the hold/confirm flow between a requester and
//! a repairer.
//!
//! A requester holds up to five timeslots for a repair request.  Each hold
//! takes one spot of the slot's capacity.  A repairer then confirms one of
//! them; the other holds are released and the request becomes `scheduled`.
//! Both steps are atomic in the store, so concurrent bookings can never
//! push a slot past its capacity.

use std::sync::Arc;

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc, Weekday,
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use db::models::{
    AvailableTimeslotRow, LocationRow, NewLocation, NewTimeslot, RepairRequestRow, RepairStatus,
    RepairTimeslotRow, TimeslotFilter, TimeslotRow,
};
use db::Store;
use realtime::{ChangeFeed, ChangeOp};

use crate::error::or_missing;
use crate::requests::is_repairer;
use crate::settings::BookingSettings;
use crate::views::RepairRequestView;
use crate::{publish, validation, MatchingError};

/// Sites created by [`BookingService::seed_locations`].
pub const DEFAULT_LOCATIONS: [(&str, &str); 2] = [
    ("Community Center", "Naamsestraat 96, 3000 Leuven"),
    ("Repair Café", "Diestsestraat 63, 3000 Leuven"),
];

/// Hours at which generated timeslots start.
pub const SLOT_HOURS: [u32; 5] = [10, 12, 14, 16, 18];
/// Slots starting before this hour go to the first location.
pub const AFTERNOON_FROM_HOUR: u32 = 14;

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// A timeslot with its location, as the picker shows it.
#[derive(Debug, Clone, Serialize)]
pub struct TimeslotView {
    #[serde(flatten)]
    pub timeslot: TimeslotRow,
    pub spots_available: i32,
    pub location_name: String,
}

/// What a repairer sees before confirming.
#[derive(Debug, Clone, Serialize)]
pub struct RepairerTimeslots {
    pub request: RepairRequestView,
    pub timeslots: Vec<AvailableTimeslotRow>,
    /// Location of the earliest held slot.
    pub location: Option<LocationRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Confirmation {
    pub confirmed: RepairTimeslotRow,
    pub request: RepairRequestRow,
    pub timeslot: TimeslotRow,
    pub location: LocationRow,
    pub released: usize,
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// The picker's working set: timeslots chosen for one date and location.
///
/// Toggling an id adds it once or removes it.  Changing the date or the
/// location starts over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeslotSelection {
    date: Option<NaiveDate>,
    location_id: Option<Uuid>,
    ids: Vec<Uuid>,
    max: usize,
}

impl TimeslotSelection {
    pub fn new(max: usize) -> Self {
        Self { date: None, location_id: None, ids: Vec::new(), max }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn location_id(&self) -> Option<Uuid> {
        self.location_id
    }

    pub fn ids(&self) -> &[Uuid] {
        &self.ids
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        if self.date != Some(date) {
            self.date = Some(date);
            self.ids.clear();
        }
    }

    pub fn set_location(&mut self, location_id: Option<Uuid>) {
        if self.location_id != location_id {
            self.location_id = location_id;
            self.ids.clear();
        }
    }

    /// Returns whether `id` is selected afterwards.
    pub fn toggle(&mut self, id: Uuid) -> Result<bool, MatchingError> {
        if let Some(pos) = self.ids.iter().position(|x| *x == id) {
            self.ids.remove(pos);
            return Ok(false);
        }
        if self.ids.len() >= self.max {
            return Err(MatchingError::validation(
                "timeslot_ids",
                format!("you can select at most {} timeslots", self.max),
            ));
        }
        self.ids.push(id);
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Parameters for [`BookingService::generate_timeslots`].
#[derive(Debug, Clone)]
pub struct TimeslotPlan {
    /// Day zero; its calendar date is the first one considered.
    pub start: DateTime<Utc>,
    pub days: u32,
    pub capacity: i32,
}

/// Start instants of the plan: weekdays only, [`SLOT_HOURS`] each day,
/// nothing before `start`.
pub fn plan_instants(plan: &TimeslotPlan) -> Vec<DateTime<Utc>> {
    let first_day = plan.start.date_naive();
    (0..plan.days)
        .filter_map(|offset| first_day.checked_add_signed(Duration::days(i64::from(offset))))
        .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
        .flat_map(|day| {
            SLOT_HOURS
                .iter()
                .filter_map(move |hour| day.and_hms_opt(*hour, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
        .filter(|at| *at >= plan.start)
        .collect()
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn Store>,
    changes: ChangeFeed,
    settings: BookingSettings,
}

impl BookingService {
    pub fn new(store: Arc<dyn Store>, changes: ChangeFeed, settings: BookingSettings) -> Self {
        Self { store, changes, settings }
    }

    pub fn settings(&self) -> &BookingSettings {
        &self.settings
    }

    /// An empty selection sized by the configured maximum.
    pub fn new_selection(&self) -> TimeslotSelection {
        TimeslotSelection::new(self.settings.max_selection)
    }

    pub async fn locations(&self) -> Result<Vec<LocationRow>, MatchingError> {
        Ok(self.store.list_locations().await?)
    }

    /// Create the default repair sites unless some location already exists.
    /// Returns the locations afterwards.
    #[instrument(skip(self))]
    pub async fn seed_locations(&self) -> Result<Vec<LocationRow>, MatchingError> {
        let existing = self.store.list_locations().await?;
        if !existing.is_empty() {
            return Ok(existing);
        }
        for (name, address) in DEFAULT_LOCATIONS {
            let location = self
                .store
                .create_location(NewLocation {
                    name: name.to_string(),
                    address: address.to_string(),
                    description: None,
                    google_maps_link: Some(format!(
                        "https://maps.google.com/?q={}",
                        address.replace(", ", " ").replace(' ', "+")
                    )),
                })
                .await?;
            publish(&self.changes, "locations", ChangeOp::Insert, &location);
        }
        info!(count = DEFAULT_LOCATIONS.len(), "default locations created");
        Ok(self.store.list_locations().await?)
    }

    /// Calendar days (UTC) from now on that still have room, ascending.
    pub async fn available_dates(
        &self,
        location_id: Option<Uuid>,
    ) -> Result<Vec<NaiveDate>, MatchingError> {
        let slots = self
            .store
            .list_timeslots(&TimeslotFilter {
                from: Some(Utc::now()),
                to: None,
                location_id,
                available_only: true,
            })
            .await?;
        let mut dates: Vec<NaiveDate> = slots.iter().map(|s| s.date_time.date_naive()).collect();
        dates.dedup();
        Ok(dates)
    }

    /// Open, future timeslots on `date`, by start time.
    pub async fn timeslots_for_day(
        &self,
        date: NaiveDate,
        location_id: Option<Uuid>,
    ) -> Result<Vec<TimeslotView>, MatchingError> {
        let day_start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
        let day_end = day_start + Duration::days(1) - Duration::nanoseconds(1);
        let slots = self
            .store
            .list_timeslots(&TimeslotFilter {
                from: Some(day_start.max(Utc::now())),
                to: Some(day_end),
                location_id,
                available_only: true,
            })
            .await?;
        let locations = self.store.list_locations().await?;
        Ok(slots
            .into_iter()
            .map(|timeslot| {
                let location_name = locations
                    .iter()
                    .find(|l| l.location_id == timeslot.location_id)
                    .map(|l| l.name.clone())
                    .unwrap_or_default();
                TimeslotView { spots_available: timeslot.spots_available(), timeslot, location_name }
            })
            .collect())
    }

    /// Hold the chosen timeslots for the owner's request, all or nothing.
    #[instrument(skip(self, timeslot_ids), fields(count = timeslot_ids.len()))]
    pub async fn submit_selection(
        &self,
        user_id: Uuid,
        repair_id: Uuid,
        timeslot_ids: &[Uuid],
    ) -> Result<Vec<RepairTimeslotRow>, MatchingError> {
        validation::timeslot_selection(timeslot_ids, self.settings.max_selection)?;
        let request = self.load_request(repair_id).await?;
        if request.user_id != user_id {
            return Err(MatchingError::forbidden("only the requester can pick timeslots"));
        }
        match request.status.parse::<RepairStatus>() {
            Ok(RepairStatus::Pending | RepairStatus::Accepted) => {}
            _ => {
                return Err(MatchingError::Conflict(format!(
                    "timeslots cannot be picked for a {} request",
                    request.status
                )))
            }
        }

        let outcome = self
            .store
            .book_timeslots(repair_id, timeslot_ids)
            .await
            .map_err(or_missing("timeslot"))?;
        for hold in &outcome.holds {
            publish(&self.changes, "repair_timeslots", ChangeOp::Insert, hold);
        }
        for slot in &outcome.timeslots {
            publish(&self.changes, "timeslots", ChangeOp::Update, slot);
        }
        info!(holds = outcome.holds.len(), "timeslots held");
        Ok(outcome.holds)
    }

    /// Give back one unconfirmed hold.
    #[instrument(skip(self))]
    pub async fn withdraw(
        &self,
        user_id: Uuid,
        repair_id: Uuid,
        timeslot_id: Uuid,
    ) -> Result<TimeslotRow, MatchingError> {
        let request = self.load_request(repair_id).await?;
        if request.user_id != user_id {
            return Err(MatchingError::forbidden("only the requester can withdraw a timeslot"));
        }
        let slot = self
            .store
            .release_timeslot(repair_id, timeslot_id)
            .await
            .map_err(or_missing("timeslot hold"))?;
        publish(
            &self.changes,
            "repair_timeslots",
            ChangeOp::Delete,
            &json!({ "repair_id": repair_id, "timeslot_id": timeslot_id }),
        );
        publish(&self.changes, "timeslots", ChangeOp::Update, &slot);
        Ok(slot)
    }

    /// The held timeslots of someone else's request.
    pub async fn repair_timeslots_for_repairer(
        &self,
        repairer_id: Uuid,
        repair_id: Uuid,
    ) -> Result<RepairerTimeslots, MatchingError> {
        let request = self.load_request(repair_id).await?;
        self.require_other_repairer(repairer_id, &request).await?;
        if !request.status.parse::<RepairStatus>().is_ok_and(RepairStatus::is_open) {
            return Err(MatchingError::Conflict(format!(
                "a {} request has no timeslots to pick from",
                request.status
            )));
        }
        let product = self
            .store
            .get_product(request.product_id)
            .await
            .map_err(or_missing("product"))?;
        let timeslots = self.store.available_repair_timeslots(repair_id).await?;
        let location = match timeslots.first() {
            Some(first) => Some(
                self.store
                    .get_location(first.location_id)
                    .await
                    .map_err(or_missing("location"))?,
            ),
            None => None,
        };
        Ok(RepairerTimeslots {
            request: RepairRequestView::new(request, product, Utc::now()),
            timeslots,
            location,
        })
    }

    /// Pick one of the held timeslots; the rest are released.
    #[instrument(skip(self))]
    pub async fn confirm(
        &self,
        repairer_id: Uuid,
        repair_id: Uuid,
        timeslot_id: Uuid,
    ) -> Result<Confirmation, MatchingError> {
        let request = self.load_request(repair_id).await?;
        self.require_other_repairer(repairer_id, &request).await?;

        let outcome = self
            .store
            .confirm_timeslot(repair_id, timeslot_id)
            .await
            .map_err(or_missing("timeslot hold"))?;
        let location = self
            .store
            .get_location(outcome.timeslot.location_id)
            .await
            .map_err(or_missing("location"))?;

        publish(&self.changes, "repair_timeslots", ChangeOp::Update, &outcome.confirmed);
        for slot in &outcome.released {
            publish(&self.changes, "timeslots", ChangeOp::Update, slot);
        }
        publish(&self.changes, "repair_requests", ChangeOp::Update, &outcome.request);
        info!(released = outcome.released.len(), "timeslot confirmed");

        Ok(Confirmation {
            released: outcome.released.len(),
            confirmed: outcome.confirmed,
            request: outcome.request,
            timeslot: outcome.timeslot,
            location,
        })
    }

    /// Create the timeslots of `plan`.  Morning slots go to the first
    /// location by name, afternoon slots to the second (or the first again
    /// when there is only one).
    #[instrument(skip(self))]
    pub async fn generate_timeslots(
        &self,
        plan: TimeslotPlan,
    ) -> Result<Vec<TimeslotRow>, MatchingError> {
        if plan.capacity <= 0 {
            return Err(MatchingError::validation("capacity", "must be at least 1"));
        }
        let locations = self.store.list_locations().await?;
        let morning = locations.first().ok_or(MatchingError::NotFound("location"))?;
        let afternoon = locations.get(1).unwrap_or(morning);

        let mut created = Vec::new();
        for at in plan_instants(&plan) {
            let location = if at.hour() < AFTERNOON_FROM_HOUR { morning } else { afternoon };
            let slot = self
                .store
                .create_timeslot(NewTimeslot {
                    location_id: location.location_id,
                    date_time: at,
                    capacity: plan.capacity,
                })
                .await?;
            publish(&self.changes, "timeslots", ChangeOp::Insert, &slot);
            created.push(slot);
        }
        info!(count = created.len(), "timeslots generated");
        Ok(created)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn load_request(&self, repair_id: Uuid) -> Result<RepairRequestRow, MatchingError> {
        self.store
            .get_repair_request(repair_id)
            .await
            .map_err(or_missing("repair request"))
    }

    async fn require_other_repairer(
        &self,
        repairer_id: Uuid,
        request: &RepairRequestRow,
    ) -> Result<(), MatchingError> {
        if request.user_id == repairer_id {
            return Err(MatchingError::forbidden("you cannot repair your own request"));
        }
        is_repairer(self.store.as_ref(), repairer_id).await
    }
}
