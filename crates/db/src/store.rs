//! The `Store` trait, the persistence contract the service layer uses.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    AccountRow, AvailableTimeslotRow, BookingOutcome, CancellationOutcome, ConfirmationOutcome,
    LocationRow, MessageRow, NewAccount, NewLocation, NewMessage, NewProduct, NewRepairRequest,
    NewTimeslot, ProductRow, ProfileRow, ProfileUpdate, RepairRequestRow, RepairStatus,
    RepairTimeslotRow, SessionRow, ThreadFilter, TimeslotFilter, TimeslotRow,
};
use crate::DbError;

/// Every read and write the application performs.
///
/// Single-row lookups return [`DbError::NotFound`] when the row is missing;
/// `find_*` methods return `Ok(None)` instead.
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap liveness probe.
    async fn ping(&self) -> Result<(), DbError>;

    // ------ accounts & sessions ------

    /// Insert the account and its profile (names and postal code filled in).
    /// Fails with [`DbError::Conflict`] if the email is taken.
    async fn create_account(&self, account: NewAccount) -> Result<AccountRow, DbError>;
    async fn get_account(&self, id: Uuid) -> Result<AccountRow, DbError>;
    async fn find_account_by_email(&self, email: &str) -> Result<Option<AccountRow>, DbError>;
    async fn set_verification_code(
        &self,
        id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DbError>;
    /// Stamp `verified_at` and clear the pending code.
    async fn mark_verified(&self, id: Uuid, at: DateTime<Utc>) -> Result<AccountRow, DbError>;

    async fn create_session(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<SessionRow, DbError>;
    async fn find_session(&self, token: &str) -> Result<Option<SessionRow>, DbError>;
    async fn delete_session(&self, token: &str) -> Result<(), DbError>;

    // ------ profiles ------

    async fn get_profile(&self, id: Uuid) -> Result<ProfileRow, DbError>;
    /// Profiles for the given ids; unknown ids are skipped.
    async fn list_profiles(&self, ids: &[Uuid]) -> Result<Vec<ProfileRow>, DbError>;
    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<ProfileRow, DbError>;

    // ------ products ------

    async fn create_product(&self, product: NewProduct) -> Result<ProductRow, DbError>;
    async fn get_product(&self, id: Uuid) -> Result<ProductRow, DbError>;
    /// Newest first.
    async fn list_products_for_user(&self, user_id: Uuid) -> Result<Vec<ProductRow>, DbError>;

    // ------ repair requests ------

    async fn create_repair_request(
        &self,
        request: NewRepairRequest,
    ) -> Result<RepairRequestRow, DbError>;
    async fn get_repair_request(&self, id: Uuid) -> Result<RepairRequestRow, DbError>;
    /// Newest first.
    async fn list_repair_requests_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RepairRequestRow>, DbError>;
    /// Newest first.
    async fn list_repair_requests_by_status(
        &self,
        statuses: &[RepairStatus],
    ) -> Result<Vec<RepairRequestRow>, DbError>;
    /// Newest first; unknown ids are skipped.
    async fn list_repair_requests_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<RepairRequestRow>, DbError>;
    async fn update_repair_status(
        &self,
        id: Uuid,
        status: RepairStatus,
    ) -> Result<RepairRequestRow, DbError>;

    /// Mark the request `cancelled` and give back every hold, the confirmed
    /// one included, all or nothing.
    ///
    /// # Errors
    /// - [`DbError::NotFound`] if the request does not exist.
    /// - [`DbError::Conflict`] if it is already completed or cancelled.
    async fn cancel_repair_request(&self, id: Uuid) -> Result<CancellationOutcome, DbError>;

    // ------ locations ------

    async fn create_location(&self, location: NewLocation) -> Result<LocationRow, DbError>;
    async fn get_location(&self, id: Uuid) -> Result<LocationRow, DbError>;
    /// Ordered by name.
    async fn list_locations(&self) -> Result<Vec<LocationRow>, DbError>;

    // ------ timeslots ------

    async fn create_timeslot(&self, slot: NewTimeslot) -> Result<TimeslotRow, DbError>;
    async fn get_timeslot(&self, id: Uuid) -> Result<TimeslotRow, DbError>;
    async fn list_timeslots(&self, filter: &TimeslotFilter) -> Result<Vec<TimeslotRow>, DbError>;

    // ------ repair_timeslots ------

    async fn list_repair_timeslots(
        &self,
        repair_id: Uuid,
    ) -> Result<Vec<RepairTimeslotRow>, DbError>;

    /// Hold every listed timeslot for the repair, all or nothing.
    ///
    /// # Errors
    /// - [`DbError::NotFound`] if the repair or a timeslot does not exist.
    /// - [`DbError::Conflict`] if the repair is no longer pending or
    ///   accepted, or already holds one of them.
    /// - [`DbError::CapacityExhausted`] if one is full or closed.
    async fn book_timeslots(
        &self,
        repair_id: Uuid,
        timeslot_ids: &[Uuid],
    ) -> Result<BookingOutcome, DbError>;

    /// Give back an unconfirmed hold.  Returns the timeslot after release.
    async fn release_timeslot(
        &self,
        repair_id: Uuid,
        timeslot_id: Uuid,
    ) -> Result<TimeslotRow, DbError>;

    /// Confirm one held timeslot, release the repair's other holds and mark
    /// the request `scheduled`, all or nothing.
    ///
    /// # Errors
    /// - [`DbError::NotFound`] if the repair does not hold the timeslot.
    /// - [`DbError::Conflict`] if the repair is no longer pending or
    ///   accepted, or already has a confirmed slot.
    async fn confirm_timeslot(
        &self,
        repair_id: Uuid,
        timeslot_id: Uuid,
    ) -> Result<ConfirmationOutcome, DbError>;

    /// Unconfirmed holds of the repair joined with their location, by time.
    async fn available_repair_timeslots(
        &self,
        repair_id: Uuid,
    ) -> Result<Vec<AvailableTimeslotRow>, DbError>;

    // ------ messages ------

    async fn create_message(&self, message: NewMessage) -> Result<MessageRow, DbError>;
    /// Oldest first.
    async fn list_messages(
        &self,
        repair_id: Uuid,
        thread: ThreadFilter,
    ) -> Result<Vec<MessageRow>, DbError>;
    async fn latest_private_message(
        &self,
        repair_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MessageRow>, DbError>;
    /// Repairs on which the user sent or received a private message.
    async fn repairs_with_private_messages(&self, user_id: Uuid) -> Result<Vec<Uuid>, DbError>;
}
