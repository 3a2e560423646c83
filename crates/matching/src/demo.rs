//! Sample data so a fresh account has something on its dashboard.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use db::models::{NewProduct, NewRepairRequest, ProductStatus, ProductType, RepairStatus};
use db::Store;
use realtime::{ChangeFeed, ChangeOp};

use crate::settings::DemoSettings;
use crate::views::RepairRequestView;
use crate::{publish, MatchingError};

struct DemoItem {
    product_type: ProductType,
    brand: &'static str,
    model: &'static str,
    description: &'static str,
    status: RepairStatus,
}

const DEMO_ITEMS: [DemoItem; 3] = [
    DemoItem {
        product_type: ProductType::CoffeeMachine,
        brand: "Philips",
        model: "HD7462",
        description: "My coffee machine is not heating up. It powers on but doesn't get hot \
                      enough to brew coffee.",
        status: RepairStatus::Pending,
    },
    DemoItem {
        product_type: ProductType::Laptop,
        brand: "Dell",
        model: "XPS 13",
        description: "The keyboard on my laptop has several keys that aren't working. Some keys \
                      require too much pressure.",
        status: RepairStatus::Accepted,
    },
    DemoItem {
        product_type: ProductType::Radio,
        brand: "Sony",
        model: "ICF-P26",
        description: "My vintage radio turns on but produces a loud static noise. The tuning \
                      knob doesn't seem to work properly.",
        status: RepairStatus::Pending,
    },
];

#[derive(Clone)]
pub struct DemoService {
    store: Arc<dyn Store>,
    changes: ChangeFeed,
    settings: DemoSettings,
}

impl DemoService {
    pub fn new(store: Arc<dyn Store>, changes: ChangeFeed, settings: DemoSettings) -> Self {
        Self { store, changes, settings }
    }

    /// Add three broken products with requests, created a day apart.
    #[instrument(skip(self))]
    pub async fn populate(&self, user_id: Uuid) -> Result<Vec<RepairRequestView>, MatchingError> {
        if !self.settings.enabled {
            return Err(MatchingError::forbidden("demo data is disabled"));
        }
        let now = Utc::now();
        let mut views = Vec::with_capacity(DEMO_ITEMS.len());
        for (days_ago, item) in (0i64..).zip(DEMO_ITEMS.iter()) {
            let product = self
                .store
                .create_product(NewProduct {
                    user_id,
                    product_type: item.product_type,
                    brand: Some(item.brand.into()),
                    model: Some(item.model.into()),
                    serial_number: None,
                    status: ProductStatus::Broken,
                })
                .await?;
            let request = self
                .store
                .create_repair_request(NewRepairRequest {
                    user_id,
                    product_id: product.product_id,
                    description: item.description.into(),
                    status: item.status,
                    created_at: Some(now - Duration::days(days_ago)),
                })
                .await?;
            publish(&self.changes, "products", ChangeOp::Insert, &product);
            publish(&self.changes, "repair_requests", ChangeOp::Insert, &request);
            views.push(RepairRequestView::new(request, product, now));
        }
        info!(count = views.len(), "demo data added");
        Ok(views)
    }
}
