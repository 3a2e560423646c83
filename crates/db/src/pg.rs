//! [`Store`] backed by Postgres through the repository functions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    AccountRow, AvailableTimeslotRow, BookingOutcome, CancellationOutcome, ConfirmationOutcome,
    LocationRow, MessageRow, NewAccount, NewLocation, NewMessage, NewProduct, NewRepairRequest,
    NewTimeslot, ProductRow, ProfileRow, ProfileUpdate, RepairRequestRow, RepairStatus,
    RepairTimeslotRow, SessionRow, ThreadFilter, TimeslotFilter, TimeslotRow,
};
use crate::repository::{
    accounts, locations, messages, products, profiles, repair_requests, repair_timeslots,
    sessions, timeslots,
};
use crate::{pool, DbError, DbPool, Store};

/// Production store.  Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), DbError> {
        pool::ping(&self.pool).await
    }

    async fn create_account(&self, account: NewAccount) -> Result<AccountRow, DbError> {
        accounts::create_account(&self.pool, account).await
    }

    async fn get_account(&self, id: Uuid) -> Result<AccountRow, DbError> {
        accounts::get_account(&self.pool, id).await
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<AccountRow>, DbError> {
        accounts::find_account_by_email(&self.pool, email).await
    }

    async fn set_verification_code(
        &self,
        id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        accounts::set_verification_code(&self.pool, id, code, expires_at).await
    }

    async fn mark_verified(&self, id: Uuid, at: DateTime<Utc>) -> Result<AccountRow, DbError> {
        accounts::mark_verified(&self.pool, id, at).await
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<SessionRow, DbError> {
        sessions::create_session(&self.pool, user_id, token, expires_at).await
    }

    async fn find_session(&self, token: &str) -> Result<Option<SessionRow>, DbError> {
        sessions::find_session(&self.pool, token).await
    }

    async fn delete_session(&self, token: &str) -> Result<(), DbError> {
        sessions::delete_session(&self.pool, token).await
    }

    async fn get_profile(&self, id: Uuid) -> Result<ProfileRow, DbError> {
        profiles::get_profile(&self.pool, id).await
    }

    async fn list_profiles(&self, ids: &[Uuid]) -> Result<Vec<ProfileRow>, DbError> {
        profiles::list_profiles(&self.pool, ids).await
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<ProfileRow, DbError> {
        profiles::update_profile(&self.pool, id, update).await
    }

    async fn create_product(&self, product: NewProduct) -> Result<ProductRow, DbError> {
        products::create_product(&self.pool, product).await
    }

    async fn get_product(&self, id: Uuid) -> Result<ProductRow, DbError> {
        products::get_product(&self.pool, id).await
    }

    async fn list_products_for_user(&self, user_id: Uuid) -> Result<Vec<ProductRow>, DbError> {
        products::list_products_for_user(&self.pool, user_id).await
    }

    async fn create_repair_request(
        &self,
        request: NewRepairRequest,
    ) -> Result<RepairRequestRow, DbError> {
        repair_requests::create_repair_request(&self.pool, request).await
    }

    async fn get_repair_request(&self, id: Uuid) -> Result<RepairRequestRow, DbError> {
        repair_requests::get_repair_request(&self.pool, id).await
    }

    async fn list_repair_requests_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RepairRequestRow>, DbError> {
        repair_requests::list_repair_requests_for_user(&self.pool, user_id).await
    }

    async fn list_repair_requests_by_status(
        &self,
        statuses: &[RepairStatus],
    ) -> Result<Vec<RepairRequestRow>, DbError> {
        repair_requests::list_repair_requests_by_status(&self.pool, statuses).await
    }

    async fn list_repair_requests_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<RepairRequestRow>, DbError> {
        repair_requests::list_repair_requests_by_ids(&self.pool, ids).await
    }

    async fn update_repair_status(
        &self,
        id: Uuid,
        status: RepairStatus,
    ) -> Result<RepairRequestRow, DbError> {
        repair_requests::update_repair_status(&self.pool, id, status).await
    }

    async fn cancel_repair_request(&self, id: Uuid) -> Result<CancellationOutcome, DbError> {
        repair_timeslots::cancel_repair_request(&self.pool, id).await
    }

    async fn create_location(&self, location: NewLocation) -> Result<LocationRow, DbError> {
        locations::create_location(&self.pool, location).await
    }

    async fn get_location(&self, id: Uuid) -> Result<LocationRow, DbError> {
        locations::get_location(&self.pool, id).await
    }

    async fn list_locations(&self) -> Result<Vec<LocationRow>, DbError> {
        locations::list_locations(&self.pool).await
    }

    async fn create_timeslot(&self, slot: NewTimeslot) -> Result<TimeslotRow, DbError> {
        timeslots::create_timeslot(&self.pool, slot).await
    }

    async fn get_timeslot(&self, id: Uuid) -> Result<TimeslotRow, DbError> {
        timeslots::get_timeslot(&self.pool, id).await
    }

    async fn list_timeslots(&self, filter: &TimeslotFilter) -> Result<Vec<TimeslotRow>, DbError> {
        timeslots::list_timeslots(&self.pool, filter).await
    }

    async fn list_repair_timeslots(
        &self,
        repair_id: Uuid,
    ) -> Result<Vec<RepairTimeslotRow>, DbError> {
        repair_timeslots::list_repair_timeslots(&self.pool, repair_id).await
    }

    async fn book_timeslots(
        &self,
        repair_id: Uuid,
        timeslot_ids: &[Uuid],
    ) -> Result<BookingOutcome, DbError> {
        repair_timeslots::book_timeslots(&self.pool, repair_id, timeslot_ids).await
    }

    async fn release_timeslot(
        &self,
        repair_id: Uuid,
        timeslot_id: Uuid,
    ) -> Result<TimeslotRow, DbError> {
        repair_timeslots::release_timeslot(&self.pool, repair_id, timeslot_id).await
    }

    async fn confirm_timeslot(
        &self,
        repair_id: Uuid,
        timeslot_id: Uuid,
    ) -> Result<ConfirmationOutcome, DbError> {
        repair_timeslots::confirm_timeslot(&self.pool, repair_id, timeslot_id).await
    }

    async fn available_repair_timeslots(
        &self,
        repair_id: Uuid,
    ) -> Result<Vec<AvailableTimeslotRow>, DbError> {
        repair_timeslots::available_repair_timeslots(&self.pool, repair_id).await
    }

    async fn create_message(&self, message: NewMessage) -> Result<MessageRow, DbError> {
        messages::create_message(&self.pool, message).await
    }

    async fn list_messages(
        &self,
        repair_id: Uuid,
        thread: ThreadFilter,
    ) -> Result<Vec<MessageRow>, DbError> {
        messages::list_messages(&self.pool, repair_id, thread).await
    }

    async fn latest_private_message(
        &self,
        repair_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MessageRow>, DbError> {
        messages::latest_private_message(&self.pool, repair_id, user_id).await
    }

    async fn repairs_with_private_messages(&self, user_id: Uuid) -> Result<Vec<Uuid>, DbError> {
        messages::repairs_with_private_messages(&self.pool, user_id).await
    }
}
