//! In-memory plan store using DashMap.

use dashmap::DashMap;
use dpo_weather::WeatherClient;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::{prune_expiring, Expiring};
use crate::config::Config;
use crate::planning::{PlanListItem, PlanResponse};

struct StoredPlan {
    stored_at: Instant,
    plan: Arc<PlanResponse>,
}

impl Expiring for StoredPlan {
    fn stored_at(&self) -> Instant {
        self.stored_at
    }
}

/// Application state - server config, weather client and recent plans.
pub struct AppState {
    config: Config,
    weather: Option<WeatherClient>,
    plans: DashMap<String, StoredPlan>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let weather = match WeatherClient::new(
            config.weather_url.clone(),
            config.weather_api_key.clone(),
            Duration::from_secs(config.weather_timeout_s),
        ) {
            Ok(client) if client.is_enabled() => Some(client),
            Ok(_) => {
                tracing::info!("Weather lookup disabled; plans assume calm wind unless given one");
                None
            }
            Err(err) => {
                tracing::warn!("Weather client unavailable: {:#}", err);
                None
            }
        };
        Self {
            config,
            weather,
            plans: DashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn weather(&self) -> Option<&WeatherClient> {
        self.weather.as_ref()
    }

    /// Store a finished plan and prune old ones.
    pub fn insert_plan(&self, plan: PlanResponse) {
        self.plans.insert(
            plan.id.clone(),
            StoredPlan {
                stored_at: Instant::now(),
                plan: Arc::new(plan),
            },
        );
        let removed = prune_expiring(
            &self.plans,
            self.config.plan_cache_max,
            Duration::from_secs(self.config.plan_cache_ttl_s),
        );
        if removed > 0 {
            tracing::debug!("Pruned {} stored plans", removed);
        }
    }

    pub fn get_plan(&self, id: &str) -> Option<Arc<PlanResponse>> {
        self.plans.get(id).map(|entry| entry.plan.clone())
    }

    /// Stored plans, newest first.
    pub fn list_plans(&self) -> Vec<PlanListItem> {
        let mut items: Vec<PlanListItem> = self
            .plans
            .iter()
            .map(|entry| PlanListItem::from(entry.plan.as_ref()))
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }

    pub fn remove_plan(&self, id: &str) -> bool {
        self.plans.remove(id).is_some()
    }

    pub fn plan_count(&self) -> usize {
        self.plans.len()
    }
}
