//! In-process [`Store`] for tests and `serve --in-memory`.
//!
//! All tables sit behind one `RwLock`, so every multi-row operation
//! (booking, confirmation) is atomic with respect to every other.
//! Rows are kept in insertion order; ties on `created_at` keep that order.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    AccountRow, AvailableTimeslotRow, BookingOutcome, CancellationOutcome, ConfirmationOutcome,
    LocationRow, MessageRow, NewAccount, NewLocation, NewMessage, NewProduct, NewRepairRequest,
    NewTimeslot, ProductRow, ProfileRow, ProfileUpdate, RepairRequestRow, RepairStatus,
    RepairTimeslotRow, SessionRow, ThreadFilter, TimeslotFilter, TimeslotRow,
};
use crate::{DbError, Store};

#[derive(Default)]
struct Tables {
    accounts: HashMap<Uuid, AccountRow>,
    sessions: HashMap<String, SessionRow>,
    profiles: HashMap<Uuid, ProfileRow>,
    products: Vec<ProductRow>,
    repair_requests: Vec<RepairRequestRow>,
    locations: Vec<LocationRow>,
    timeslots: Vec<TimeslotRow>,
    holds: Vec<RepairTimeslotRow>,
    messages: Vec<MessageRow>,
}

impl Tables {
    fn timeslot_mut(&mut self, id: Uuid) -> Result<&mut TimeslotRow, DbError> {
        self.timeslots
            .iter_mut()
            .find(|t| t.timeslot_id == id)
            .ok_or(DbError::NotFound)
    }

    fn request_mut(&mut self, id: Uuid) -> Result<&mut RepairRequestRow, DbError> {
        self.repair_requests
            .iter_mut()
            .find(|r| r.repair_id == id)
            .ok_or(DbError::NotFound)
    }

    fn request_status(&self, id: Uuid) -> Result<RepairStatus, DbError> {
        self.repair_requests
            .iter()
            .find(|r| r.repair_id == id)
            .ok_or(DbError::NotFound)?
            .status
            .parse()
            .map_err(DbError::Conflict)
    }

    fn set_request_status(
        &mut self,
        id: Uuid,
        status: RepairStatus,
    ) -> Result<RepairRequestRow, DbError> {
        let request = self.request_mut(id)?;
        request.status = status.to_string();
        request.updated_at = Utc::now();
        Ok(request.clone())
    }

    fn hold_index(&self, repair_id: Uuid, timeslot_id: Uuid) -> Option<usize> {
        self.holds
            .iter()
            .position(|h| h.repair_id == repair_id && h.timeslot_id == timeslot_id)
    }

    /// Same rule as the Postgres `set_spots_taken`.
    fn set_spots_taken(&mut self, id: Uuid, spots_taken: i32) -> Result<TimeslotRow, DbError> {
        let slot = self.timeslot_mut(id)?;
        slot.spots_taken = spots_taken.clamp(0, slot.capacity);
        slot.available = slot.spots_taken < slot.capacity;
        slot.updated_at = Utc::now();
        Ok(slot.clone())
    }

    fn free_hold(&mut self, index: usize) -> Result<TimeslotRow, DbError> {
        let hold = self.holds.remove(index);
        let taken = self.timeslot_mut(hold.timeslot_id)?.spots_taken;
        self.set_spots_taken(hold.timeslot_id, taken - 1)
    }
}

/// Newest first; among equal timestamps the later insert wins.
fn newest_first<T: Clone>(rows: impl DoubleEndedIterator<Item = T>, key: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut out: Vec<T> = rows.rev().collect();
    out.sort_by(|a, b| key(b).cmp(&key(a)));
    out
}

/// In-memory store; share it behind an `Arc`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }

    // ------ accounts & sessions ------

    async fn create_account(&self, account: NewAccount) -> Result<AccountRow, DbError> {
        let mut t = self.tables.write().await;
        if t.accounts.values().any(|a| a.email == account.email) {
            return Err(DbError::Conflict("account already exists".into()));
        }
        let now = Utc::now();
        let row = AccountRow {
            id: Uuid::new_v4(),
            email: account.email,
            password_hash: account.password_hash,
            password_salt: account.password_salt,
            verification_code: account.verification_code,
            verification_expires_at: account.verification_expires_at,
            verified_at: None,
            waitlisted: account.waitlisted,
            created_at: now,
        };
        t.profiles.insert(
            row.id,
            ProfileRow {
                id: row.id,
                first_name: Some(account.first_name),
                last_name: Some(account.last_name),
                street: None,
                number: None,
                postal_code: Some(account.postal_code),
                city: None,
                phone_number: None,
                receive_requests: false,
                created_at: now,
                updated_at: now,
            },
        );
        t.accounts.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_account(&self, id: Uuid) -> Result<AccountRow, DbError> {
        self.tables.read().await.accounts.get(&id).cloned().ok_or(DbError::NotFound)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<AccountRow>, DbError> {
        let t = self.tables.read().await;
        Ok(t.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn set_verification_code(
        &self,
        id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let mut t = self.tables.write().await;
        let account = t.accounts.get_mut(&id).ok_or(DbError::NotFound)?;
        account.verification_code = Some(code.to_owned());
        account.verification_expires_at = Some(expires_at);
        Ok(())
    }

    async fn mark_verified(&self, id: Uuid, at: DateTime<Utc>) -> Result<AccountRow, DbError> {
        let mut t = self.tables.write().await;
        let account = t.accounts.get_mut(&id).ok_or(DbError::NotFound)?;
        account.verified_at = Some(at);
        account.verification_code = None;
        account.verification_expires_at = None;
        Ok(account.clone())
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<SessionRow, DbError> {
        let mut t = self.tables.write().await;
        if t.sessions.contains_key(token) {
            return Err(DbError::Conflict("session already exists".into()));
        }
        let row = SessionRow {
            token: token.to_owned(),
            user_id,
            created_at: Utc::now(),
            expires_at,
        };
        t.sessions.insert(row.token.clone(), row.clone());
        Ok(row)
    }

    async fn find_session(&self, token: &str) -> Result<Option<SessionRow>, DbError> {
        Ok(self.tables.read().await.sessions.get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> Result<(), DbError> {
        self.tables
            .write()
            .await
            .sessions
            .remove(token)
            .map(|_| ())
            .ok_or(DbError::NotFound)
    }

    // ------ profiles ------

    async fn get_profile(&self, id: Uuid) -> Result<ProfileRow, DbError> {
        self.tables.read().await.profiles.get(&id).cloned().ok_or(DbError::NotFound)
    }

    async fn list_profiles(&self, ids: &[Uuid]) -> Result<Vec<ProfileRow>, DbError> {
        let t = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| t.profiles.get(id).cloned()).collect())
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<ProfileRow, DbError> {
        let mut t = self.tables.write().await;
        let profile = t.profiles.get_mut(&id).ok_or(DbError::NotFound)?;
        profile.first_name = Some(update.first_name);
        profile.last_name = Some(update.last_name);
        profile.street = Some(update.street);
        profile.number = Some(update.number);
        profile.postal_code = Some(update.postal_code);
        profile.city = Some(update.city);
        profile.phone_number = update.phone_number;
        profile.receive_requests = update.receive_requests;
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    // ------ products ------

    async fn create_product(&self, product: NewProduct) -> Result<ProductRow, DbError> {
        let now = Utc::now();
        let row = ProductRow {
            product_id: Uuid::new_v4(),
            user_id: product.user_id,
            product_type: product.product_type.to_string(),
            brand: product.brand,
            model: product.model,
            serial_number: product.serial_number,
            doc_id: None,
            status: product.status.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.products.push(row.clone());
        Ok(row)
    }

    async fn get_product(&self, id: Uuid) -> Result<ProductRow, DbError> {
        let t = self.tables.read().await;
        t.products
            .iter()
            .find(|p| p.product_id == id)
            .cloned()
            .ok_or(DbError::NotFound)
    }

    async fn list_products_for_user(&self, user_id: Uuid) -> Result<Vec<ProductRow>, DbError> {
        let t = self.tables.read().await;
        Ok(newest_first(
            t.products.iter().filter(|p| p.user_id == user_id).cloned(),
            |p| p.created_at,
        ))
    }

    // ------ repair requests ------

    async fn create_repair_request(
        &self,
        request: NewRepairRequest,
    ) -> Result<RepairRequestRow, DbError> {
        let mut t = self.tables.write().await;
        if !t.products.iter().any(|p| p.product_id == request.product_id) {
            return Err(DbError::NotFound);
        }
        let created_at = request.created_at.unwrap_or_else(Utc::now);
        let row = RepairRequestRow {
            repair_id: Uuid::new_v4(),
            user_id: request.user_id,
            product_id: request.product_id,
            description: request.description,
            status: request.status.to_string(),
            created_at,
            updated_at: created_at,
        };
        t.repair_requests.push(row.clone());
        Ok(row)
    }

    async fn get_repair_request(&self, id: Uuid) -> Result<RepairRequestRow, DbError> {
        let t = self.tables.read().await;
        t.repair_requests
            .iter()
            .find(|r| r.repair_id == id)
            .cloned()
            .ok_or(DbError::NotFound)
    }

    async fn list_repair_requests_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RepairRequestRow>, DbError> {
        let t = self.tables.read().await;
        Ok(newest_first(
            t.repair_requests.iter().filter(|r| r.user_id == user_id).cloned(),
            |r| r.created_at,
        ))
    }

    async fn list_repair_requests_by_status(
        &self,
        statuses: &[RepairStatus],
    ) -> Result<Vec<RepairRequestRow>, DbError> {
        let wanted: Vec<String> = statuses.iter().map(ToString::to_string).collect();
        let t = self.tables.read().await;
        Ok(newest_first(
            t.repair_requests
                .iter()
                .filter(|r| wanted.contains(&r.status))
                .cloned(),
            |r| r.created_at,
        ))
    }

    async fn list_repair_requests_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<RepairRequestRow>, DbError> {
        let t = self.tables.read().await;
        Ok(newest_first(
            t.repair_requests
                .iter()
                .filter(|r| ids.contains(&r.repair_id))
                .cloned(),
            |r| r.created_at,
        ))
    }

    async fn update_repair_status(
        &self,
        id: Uuid,
        status: RepairStatus,
    ) -> Result<RepairRequestRow, DbError> {
        self.tables.write().await.set_request_status(id, status)
    }

    async fn cancel_repair_request(&self, id: Uuid) -> Result<CancellationOutcome, DbError> {
        let mut t = self.tables.write().await;
        let status = t.request_status(id)?;
        if status.is_closed() {
            return Err(DbError::Conflict(format!("a {status} request cannot be cancelled")));
        }
        let mut released = Vec::new();
        while let Some(index) = t.holds.iter().position(|h| h.repair_id == id) {
            released.push(t.free_hold(index)?);
        }
        let request = t.set_request_status(id, RepairStatus::Cancelled)?;
        Ok(CancellationOutcome { request, released })
    }

    // ------ locations ------

    async fn create_location(&self, location: NewLocation) -> Result<LocationRow, DbError> {
        let now = Utc::now();
        let row = LocationRow {
            location_id: Uuid::new_v4(),
            name: location.name,
            address: location.address,
            description: location.description,
            google_maps_link: location.google_maps_link,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.locations.push(row.clone());
        Ok(row)
    }

    async fn get_location(&self, id: Uuid) -> Result<LocationRow, DbError> {
        let t = self.tables.read().await;
        t.locations
            .iter()
            .find(|l| l.location_id == id)
            .cloned()
            .ok_or(DbError::NotFound)
    }

    async fn list_locations(&self) -> Result<Vec<LocationRow>, DbError> {
        let mut rows = self.tables.read().await.locations.clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    // ------ timeslots ------

    async fn create_timeslot(&self, slot: NewTimeslot) -> Result<TimeslotRow, DbError> {
        let mut t = self.tables.write().await;
        if !t.locations.iter().any(|l| l.location_id == slot.location_id) {
            return Err(DbError::NotFound);
        }
        let now = Utc::now();
        let row = TimeslotRow {
            timeslot_id: Uuid::new_v4(),
            location_id: slot.location_id,
            date_time: slot.date_time,
            capacity: slot.capacity,
            spots_taken: 0,
            available: true,
            created_at: now,
            updated_at: now,
        };
        t.timeslots.push(row.clone());
        Ok(row)
    }

    async fn get_timeslot(&self, id: Uuid) -> Result<TimeslotRow, DbError> {
        let t = self.tables.read().await;
        t.timeslots
            .iter()
            .find(|s| s.timeslot_id == id)
            .cloned()
            .ok_or(DbError::NotFound)
    }

    async fn list_timeslots(&self, filter: &TimeslotFilter) -> Result<Vec<TimeslotRow>, DbError> {
        let t = self.tables.read().await;
        let mut rows: Vec<TimeslotRow> =
            t.timeslots.iter().filter(|s| filter.matches(s)).cloned().collect();
        rows.sort_by_key(|s| s.date_time);
        Ok(rows)
    }

    // ------ repair_timeslots ------

    async fn list_repair_timeslots(
        &self,
        repair_id: Uuid,
    ) -> Result<Vec<RepairTimeslotRow>, DbError> {
        let t = self.tables.read().await;
        Ok(t.holds.iter().filter(|h| h.repair_id == repair_id).cloned().collect())
    }

    async fn book_timeslots(
        &self,
        repair_id: Uuid,
        timeslot_ids: &[Uuid],
    ) -> Result<BookingOutcome, DbError> {
        let mut t = self.tables.write().await;

        // Check everything first so a failure leaves no partial writes.
        let status = t.request_status(repair_id)?;
        if !status.is_open() {
            return Err(DbError::Conflict(format!(
                "timeslots cannot be held for a {status} request"
            )));
        }
        for (i, &timeslot_id) in timeslot_ids.iter().enumerate() {
            let slot = t
                .timeslots
                .iter()
                .find(|s| s.timeslot_id == timeslot_id)
                .ok_or(DbError::NotFound)?;
            if t.hold_index(repair_id, timeslot_id).is_some()
                || timeslot_ids[..i].contains(&timeslot_id)
            {
                return Err(DbError::Conflict(format!(
                    "timeslot {timeslot_id} is already held for this repair"
                )));
            }
            if !slot.available || slot.is_full() {
                return Err(DbError::CapacityExhausted { timeslot_id });
            }
        }

        let mut holds = Vec::with_capacity(timeslot_ids.len());
        let mut timeslots = Vec::with_capacity(timeslot_ids.len());
        for &timeslot_id in timeslot_ids {
            let now = Utc::now();
            let hold = RepairTimeslotRow {
                id: Uuid::new_v4(),
                repair_id,
                timeslot_id,
                is_confirmed: false,
                created_at: now,
                updated_at: now,
            };
            t.holds.push(hold.clone());
            let taken = t.timeslot_mut(timeslot_id)?.spots_taken;
            timeslots.push(t.set_spots_taken(timeslot_id, taken + 1)?);
            holds.push(hold);
        }
        Ok(BookingOutcome { holds, timeslots })
    }

    async fn release_timeslot(
        &self,
        repair_id: Uuid,
        timeslot_id: Uuid,
    ) -> Result<TimeslotRow, DbError> {
        let mut t = self.tables.write().await;
        let index = t.hold_index(repair_id, timeslot_id).ok_or(DbError::NotFound)?;
        if t.holds[index].is_confirmed {
            return Err(DbError::Conflict("a confirmed timeslot cannot be released".into()));
        }
        t.free_hold(index)
    }

    async fn confirm_timeslot(
        &self,
        repair_id: Uuid,
        timeslot_id: Uuid,
    ) -> Result<ConfirmationOutcome, DbError> {
        let mut t = self.tables.write().await;
        let status = t.request_status(repair_id)?;
        if !status.is_open() {
            return Err(DbError::Conflict(format!("a {status} request cannot be scheduled")));
        }
        if t.holds.iter().any(|h| h.repair_id == repair_id && h.is_confirmed) {
            return Err(DbError::Conflict("this repair already has a confirmed timeslot".into()));
        }
        let index = t.hold_index(repair_id, timeslot_id).ok_or(DbError::NotFound)?;

        let now = Utc::now();
        let confirmed = {
            let hold = &mut t.holds[index];
            hold.is_confirmed = true;
            hold.updated_at = now;
            hold.clone()
        };

        let mut released = Vec::new();
        while let Some(other) = t
            .holds
            .iter()
            .position(|h| h.repair_id == repair_id && h.timeslot_id != timeslot_id)
        {
            released.push(t.free_hold(other)?);
        }

        let timeslot = t.timeslot_mut(timeslot_id)?.clone();
        let request = t.set_request_status(repair_id, RepairStatus::Scheduled)?;

        Ok(ConfirmationOutcome { confirmed, request, timeslot, released })
    }

    async fn available_repair_timeslots(
        &self,
        repair_id: Uuid,
    ) -> Result<Vec<AvailableTimeslotRow>, DbError> {
        let t = self.tables.read().await;
        let mut rows = Vec::new();
        for hold in t.holds.iter().filter(|h| h.repair_id == repair_id && !h.is_confirmed) {
            let Some(slot) = t.timeslots.iter().find(|s| s.timeslot_id == hold.timeslot_id) else {
                continue;
            };
            let Some(location) = t.locations.iter().find(|l| l.location_id == slot.location_id)
            else {
                continue;
            };
            rows.push(AvailableTimeslotRow {
                timeslot_id: slot.timeslot_id,
                date_time: slot.date_time,
                location_id: slot.location_id,
                location_name: location.name.clone(),
                is_available: slot.available,
                capacity: slot.capacity,
                spots_taken: slot.spots_taken,
                spots_available: slot.capacity - slot.spots_taken,
            });
        }
        rows.sort_by_key(|r| r.date_time);
        Ok(rows)
    }

    // ------ messages ------

    async fn create_message(&self, message: NewMessage) -> Result<MessageRow, DbError> {
        let mut t = self.tables.write().await;
        if !t.repair_requests.iter().any(|r| r.repair_id == message.repair_id) {
            return Err(DbError::NotFound);
        }
        let row = MessageRow {
            message_id: Uuid::new_v4(),
            repair_id: message.repair_id,
            sender_id: message.sender_id,
            recipient_id: message.recipient_id,
            is_public: message.is_public,
            content: message.content,
            created_at: Utc::now(),
        };
        t.messages.push(row.clone());
        Ok(row)
    }

    async fn list_messages(
        &self,
        repair_id: Uuid,
        thread: ThreadFilter,
    ) -> Result<Vec<MessageRow>, DbError> {
        let t = self.tables.read().await;
        let mut rows: Vec<MessageRow> = t
            .messages
            .iter()
            .filter(|m| m.repair_id == repair_id && thread.matches(m))
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.created_at);
        Ok(rows)
    }

    async fn latest_private_message(
        &self,
        repair_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MessageRow>, DbError> {
        let thread = ThreadFilter::PrivateFor(user_id);
        let t = self.tables.read().await;
        Ok(newest_first(
            t.messages
                .iter()
                .filter(|m| m.repair_id == repair_id && thread.matches(m))
                .cloned(),
            |m| m.created_at,
        )
        .into_iter()
        .next())
    }

    async fn repairs_with_private_messages(&self, user_id: Uuid) -> Result<Vec<Uuid>, DbError> {
        let thread = ThreadFilter::PrivateFor(user_id);
        let t = self.tables.read().await;
        let mut ids: Vec<Uuid> = Vec::new();
        for message in t.messages.iter().filter(|m| thread.matches(m)) {
            if !ids.contains(&message.repair_id) {
                ids.push(message.repair_id);
            }
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::{ProductStatus, ProductType};

    async fn seeded() -> (MemoryStore, Uuid, Uuid) {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let product = store
            .create_product(NewProduct {
                user_id: user,
                product_type: ProductType::Radio,
                brand: Some("Sony".into()),
                model: None,
                serial_number: None,
                status: ProductStatus::Broken,
            })
            .await
            .unwrap();
        let request = store
            .create_repair_request(NewRepairRequest {
                user_id: user,
                product_id: product.product_id,
                description: "Static noise on every station".into(),
                status: RepairStatus::Pending,
                created_at: None,
            })
            .await
            .unwrap();
        let location = store
            .create_location(NewLocation {
                name: "Repair Café".into(),
                address: "Diestsestraat 63, 3000 Leuven".into(),
                description: None,
                google_maps_link: None,
            })
            .await
            .unwrap();
        (store, request.repair_id, location.location_id)
    }

    async fn slot(store: &MemoryStore, location_id: Uuid, hours: i64, capacity: i32) -> Uuid {
        store
            .create_timeslot(NewTimeslot {
                location_id,
                date_time: Utc::now() + Duration::hours(hours),
                capacity,
            })
            .await
            .unwrap()
            .timeslot_id
    }

    #[tokio::test]
    async fn booking_fills_capacity_and_closes_slot() {
        let (store, repair, location) = seeded().await;
        let id = slot(&store, location, 24, 1).await;

        let outcome = store.book_timeslots(repair, &[id]).await.unwrap();
        assert_eq!(outcome.holds.len(), 1);
        assert_eq!(outcome.timeslots[0].spots_taken, 1);
        assert!(!outcome.timeslots[0].available);
    }

    #[tokio::test]
    async fn failed_booking_leaves_no_partial_holds() {
        let (store, repair, location) = seeded().await;
        let open = slot(&store, location, 24, 2).await;
        let full = slot(&store, location, 26, 1).await;

        let product_id = store.get_repair_request(repair).await.unwrap().product_id;
        let second = store
            .create_repair_request(NewRepairRequest {
                user_id: Uuid::new_v4(),
                product_id,
                description: "Another request for the same radio".into(),
                status: RepairStatus::Pending,
                created_at: None,
            })
            .await
            .unwrap();
        store.book_timeslots(second.repair_id, &[full]).await.unwrap();

        let err = store.book_timeslots(repair, &[open, full]).await.unwrap_err();
        assert!(matches!(err, DbError::CapacityExhausted { timeslot_id } if timeslot_id == full));
        assert!(store.list_repair_timeslots(repair).await.unwrap().is_empty());
        assert_eq!(store.get_timeslot(open).await.unwrap().spots_taken, 0);
    }

    #[tokio::test]
    async fn confirming_releases_other_holds() {
        let (store, repair, location) = seeded().await;
        let a = slot(&store, location, 24, 3).await;
        let b = slot(&store, location, 48, 3).await;
        store.book_timeslots(repair, &[a, b]).await.unwrap();

        let outcome = store.confirm_timeslot(repair, b).await.unwrap();
        assert!(outcome.confirmed.is_confirmed);
        assert_eq!(outcome.request.status, "scheduled");
        assert_eq!(outcome.released.len(), 1);
        assert_eq!(store.get_timeslot(a).await.unwrap().spots_taken, 0);
        assert_eq!(store.get_timeslot(b).await.unwrap().spots_taken, 1);

        let again = store.confirm_timeslot(repair, b).await.unwrap_err();
        assert!(matches!(again, DbError::Conflict(_)));
        assert!(store.available_repair_timeslots(repair).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancelling_gives_back_every_hold_and_closes_the_request() {
        let (store, repair, location) = seeded().await;
        let a = slot(&store, location, 24, 1).await;
        let b = slot(&store, location, 26, 1).await;
        store.book_timeslots(repair, &[a, b]).await.unwrap();
        store.confirm_timeslot(repair, a).await.unwrap();

        let outcome = store.cancel_repair_request(repair).await.unwrap();
        assert_eq!(outcome.request.status, "cancelled");
        assert_eq!(outcome.released.len(), 1);
        assert!(store.list_repair_timeslots(repair).await.unwrap().is_empty());
        let freed = store.get_timeslot(a).await.unwrap();
        assert_eq!(freed.spots_taken, 0);
        assert!(freed.available);

        let again = store.cancel_repair_request(repair).await.unwrap_err();
        assert!(matches!(again, DbError::Conflict(_)));
        let book = store.book_timeslots(repair, &[b]).await.unwrap_err();
        assert!(matches!(book, DbError::Conflict(_)));
        assert_eq!(store.get_timeslot(b).await.unwrap().spots_taken, 0);
    }

    #[tokio::test]
    async fn private_thread_only_shows_participants() {
        let (store, repair, _) = seeded().await;
        let (alice, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        store
            .create_message(NewMessage {
                repair_id: repair,
                sender_id: alice,
                recipient_id: Some(bob),
                is_public: false,
                content: "Can you bring the charger?".into(),
            })
            .await
            .unwrap();

        let for_bob = store.list_messages(repair, ThreadFilter::PrivateFor(bob)).await.unwrap();
        let for_carol = store.list_messages(repair, ThreadFilter::PrivateFor(carol)).await.unwrap();
        assert_eq!(for_bob.len(), 1);
        assert!(for_carol.is_empty());
        assert_eq!(store.repairs_with_private_messages(alice).await.unwrap(), vec![repair]);
    }
}
