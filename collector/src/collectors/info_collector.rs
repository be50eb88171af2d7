use crate::{
    collectors::Collector,
    inventory::InventoryProvider,
    metrics::MetricFamily,
};
use aliyun_exporter_config::ResourceKind;
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
};

/// Emits one info family per configured resource and region.
///
/// Regions are not de-duplicated against each other: an instance visible from two configured regions is reported
/// twice.
pub struct InfoCollector {
    inventory: Arc<InventoryProvider>,
    resources: Vec<ResourceKind>,
    regions: Vec<String>,
}

impl InfoCollector {
    pub fn new(inventory: Arc<InventoryProvider>, resources: Vec<ResourceKind>, regions: Vec<String>) -> Self {
        Self {
            inventory,
            resources,
            regions,
        }
    }
}

impl Collector for InfoCollector {
    fn collect(&self) -> Pin<Box<dyn Future<Output = Vec<MetricFamily>> + Send + '_>> {
        Box::pin(async move {
            let mut families = Vec::new();
            for &resource in &self.resources {
                for region_id in &self.regions {
                    match self.inventory.describe(resource, region_id).await {
                        Ok(Some(family)) => families.push(family),
                        Ok(None) => {}
                        Err(err) => error!(error = %err, %resource, %region_id, "Error listing resources"),
                    }
                }
            }
            families
        })
    }

    fn name(&self) -> &'static str {
        "InfoCollector"
    }
}
