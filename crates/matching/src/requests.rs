//! Repair requests, the products they are about, and user profiles.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use db::models::{
    NewProduct, NewRepairRequest, ProductRow, ProductStatus, ProductType, ProfileRow,
    ProfileUpdate, RepairRequestRow, RepairStatus,
};
use db::Store;
use realtime::{AuthEventKind, AuthEvents, ChangeFeed, ChangeOp};

use crate::error::or_missing;
use crate::views::RepairRequestView;
use crate::{publish, validation, MatchingError};

/// "Request a repair" form.
#[derive(Debug, Clone, Deserialize)]
pub struct RepairRequestInput {
    pub device_type: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub description: String,
}

/// Filters for the requester's own list.  `tab` is `all` or a status.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestQuery {
    #[serde(default)]
    pub tab: Option<String>,
    #[serde(default, alias = "q")]
    pub search: Option<String>,
}

/// Which open requests a repairer sees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowseStatus {
    #[default]
    All,
    /// Still pending.
    New,
    /// Accepted or scheduled.
    InProgress,
}

impl BrowseStatus {
    fn statuses(self) -> &'static [RepairStatus] {
        match self {
            Self::All => &[RepairStatus::Pending, RepairStatus::Accepted, RepairStatus::Scheduled],
            Self::New => &[RepairStatus::Pending],
            Self::InProgress => &[RepairStatus::Accepted, RepairStatus::Scheduled],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrowseQuery {
    #[serde(default, alias = "q")]
    pub search: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub status: BrowseStatus,
}

/// Profile form.  `number` arrives as text and must hold an integer.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileInput {
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub number: String,
    pub postal_code: String,
    pub city: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub receive_requests: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: ProfileRow,
    pub email: String,
}

#[derive(Clone)]
pub struct RequestService {
    store: Arc<dyn Store>,
    changes: ChangeFeed,
    auth_events: AuthEvents,
}

impl RequestService {
    pub fn new(store: Arc<dyn Store>, changes: ChangeFeed, auth_events: AuthEvents) -> Self {
        Self { store, changes, auth_events }
    }

    /// Register the broken product and open a pending request for it.
    #[instrument(skip(self, input), fields(device_type = %input.device_type))]
    pub async fn create_repair_request(
        &self,
        user_id: Uuid,
        input: RepairRequestInput,
    ) -> Result<RepairRequestView, MatchingError> {
        let product_type: ProductType = input
            .device_type
            .parse()
            .map_err(|_| MatchingError::validation("device_type", "please select a device type"))?;
        let description = validation::description(&input.description)?;

        let product = self
            .store
            .create_product(NewProduct {
                user_id,
                product_type,
                brand: validation::optional(input.brand),
                model: validation::optional(input.model),
                serial_number: None,
                status: ProductStatus::Broken,
            })
            .await?;
        let request = self
            .store
            .create_repair_request(NewRepairRequest {
                user_id,
                product_id: product.product_id,
                description,
                status: RepairStatus::Pending,
                created_at: None,
            })
            .await?;

        publish(&self.changes, "products", ChangeOp::Insert, &product);
        publish(&self.changes, "repair_requests", ChangeOp::Insert, &request);
        info!(repair_id = %request.repair_id, "repair request created");
        Ok(RepairRequestView::new(request, product, Utc::now()))
    }

    /// The caller's requests, newest first.
    #[instrument(skip(self))]
    pub async fn list_own_requests(
        &self,
        user_id: Uuid,
        query: RequestQuery,
    ) -> Result<Vec<RepairRequestView>, MatchingError> {
        let tab = match query.tab.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(tab) => Some(
                tab.parse::<RepairStatus>()
                    .map_err(|_| MatchingError::validation("tab", format!("unknown tab: {tab}")))?,
            ),
        };
        let needle = search_needle(query.search.as_deref());

        let requests = self.store.list_repair_requests_for_user(user_id).await?;
        let views = self.with_products(requests).await?;
        Ok(views
            .into_iter()
            .filter(|v| tab.map_or(true, |status| v.status() == Some(status)))
            .filter(|v| v.matches_search(&needle))
            .collect())
    }

    /// Open requests from other people, for volunteer repairers.
    #[instrument(skip(self))]
    pub async fn browse_requests(
        &self,
        repairer_id: Uuid,
        query: BrowseQuery,
    ) -> Result<Vec<RepairRequestView>, MatchingError> {
        self.require_repairer(repairer_id).await?;
        let device_type = match query.device_type.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(kind) => Some(kind.parse::<ProductType>().map_err(|_| {
                MatchingError::validation("device_type", format!("unknown device type: {kind}"))
            })?),
        };
        let needle = search_needle(query.search.as_deref());

        let requests = self
            .store
            .list_repair_requests_by_status(query.status.statuses())
            .await?
            .into_iter()
            .filter(|r| r.user_id != repairer_id)
            .collect();
        let views = self.with_products(requests).await?;
        Ok(views
            .into_iter()
            .filter(|v| device_type.map_or(true, |t| v.product.product_type == t.as_str()))
            .filter(|v| v.matches_search(&needle))
            .collect())
    }

    /// Visible to the owner and to repairers.
    pub async fn get_request_details(
        &self,
        user_id: Uuid,
        repair_id: Uuid,
    ) -> Result<RepairRequestView, MatchingError> {
        let request = self.load_request(repair_id).await?;
        if request.user_id != user_id {
            self.require_repairer(user_id).await?;
        }
        let product = self
            .store
            .get_product(request.product_id)
            .await
            .map_err(or_missing("product"))?;
        Ok(RepairRequestView::new(request, product, Utc::now()))
    }

    /// Owners may cancel, which gives back every timeslot the request held.
    /// Repairers accept pending requests and complete accepted or scheduled
    /// ones.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        user_id: Uuid,
        repair_id: Uuid,
        status: RepairStatus,
    ) -> Result<RepairRequestRow, MatchingError> {
        let request = self.load_request(repair_id).await?;
        let current: RepairStatus = request
            .status
            .parse()
            .map_err(|_| MatchingError::Conflict(format!("unknown status {}", request.status)))?;

        let allowed_from: &[RepairStatus] = if request.user_id == user_id {
            match status {
                RepairStatus::Cancelled => {
                    &[RepairStatus::Pending, RepairStatus::Accepted, RepairStatus::Scheduled]
                }
                _ => return Err(MatchingError::forbidden("owners can only cancel a request")),
            }
        } else {
            self.require_repairer(user_id).await?;
            match status {
                RepairStatus::Accepted => &[RepairStatus::Pending],
                RepairStatus::Completed => &[RepairStatus::Accepted, RepairStatus::Scheduled],
                _ => {
                    return Err(MatchingError::forbidden(
                        "repairers can only accept or complete a request",
                    ))
                }
            }
        };
        if !allowed_from.contains(&current) {
            return Err(MatchingError::Conflict(format!(
                "cannot move a {current} request to {status}"
            )));
        }

        let updated = if status == RepairStatus::Cancelled {
            let outcome = self
                .store
                .cancel_repair_request(repair_id)
                .await
                .map_err(or_missing("repair request"))?;
            for slot in &outcome.released {
                publish(&self.changes, "timeslots", ChangeOp::Update, slot);
            }
            info!(released = outcome.released.len(), "holds given back on cancel");
            outcome.request
        } else {
            self.store.update_repair_status(repair_id, status).await?
        };
        publish(&self.changes, "repair_requests", ChangeOp::Update, &updated);
        info!(from = %current, to = %status, "repair status changed");
        Ok(updated)
    }

    pub async fn list_products(&self, user_id: Uuid) -> Result<Vec<ProductRow>, MatchingError> {
        Ok(self.store.list_products_for_user(user_id).await?)
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<ProfileView, MatchingError> {
        let profile = self.store.get_profile(user_id).await.map_err(or_missing("profile"))?;
        let account = self.store.get_account(user_id).await.map_err(or_missing("account"))?;
        Ok(ProfileView { profile, email: account.email })
    }

    #[instrument(skip(self, input))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        input: ProfileInput,
    ) -> Result<ProfileView, MatchingError> {
        let update = ProfileUpdate {
            first_name: validation::required("first_name", &input.first_name)?,
            last_name: validation::required("last_name", &input.last_name)?,
            street: validation::required("street", &input.street)?,
            number: validation::house_number(&input.number)?,
            postal_code: validation::required("postal_code", &input.postal_code)?,
            city: validation::required("city", &input.city)?,
            phone_number: validation::optional(input.phone_number),
            receive_requests: input.receive_requests,
        };
        let profile = self
            .store
            .update_profile(user_id, update)
            .await
            .map_err(or_missing("profile"))?;
        publish(&self.changes, "profiles", ChangeOp::Update, &profile);
        self.auth_events.publish(user_id, AuthEventKind::UserUpdated);
        let account = self.store.get_account(user_id).await.map_err(or_missing("account"))?;
        Ok(ProfileView { profile, email: account.email })
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

    async fn require_repairer(&self, user_id: Uuid) -> Result<(), MatchingError> {
        is_repairer(self.store.as_ref(), user_id).await
    }

    async fn with_products(
        &self,
        requests: Vec<RepairRequestRow>,
    ) -> Result<Vec<RepairRequestView>, MatchingError> {
        let now = Utc::now();
        let mut views = Vec::with_capacity(requests.len());
        for request in requests {
            let product = self
                .store
                .get_product(request.product_id)
                .await
                .map_err(or_missing("product"))?;
            views.push(RepairRequestView::new(request, product, now));
        }
        Ok(views)
    }
}

/// Forbidden unless the user opted in to receive requests.
pub(crate) async fn is_repairer(store: &dyn Store, user_id: Uuid) -> Result<(), MatchingError> {
    let profile = store.get_profile(user_id).await.map_err(or_missing("profile"))?;
    if !profile.receive_requests {
        return Err(MatchingError::forbidden("only repairers can do this"));
    }
    Ok(())
}

fn search_needle(search: Option<&str>) -> String {
    search.map(|s| s.trim().to_lowercase()).unwrap_or_default()
}
