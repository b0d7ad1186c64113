// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock subscription store for deterministic testing.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use wheelhouse_core::types::Subscription;
use wheelhouse_core::{SubscriptionStore, WheelhouseError};

/// An in-memory subscription store. Instructors without an entry have no
/// plan (free tier).
#[derive(Default)]
pub struct MockSubscriptionStore {
    plans: Mutex<HashMap<String, Subscription>>,
}

impl MockSubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant_plan(&self, instructor_id: &str, expires_at: DateTime<Utc>) -> &Self {
        self.plans.lock().unwrap().insert(
            instructor_id.to_string(),
            Subscription {
                active: true,
                expires_at,
            },
        );
        self
    }

    pub fn revoke_plan(&self, instructor_id: &str) -> &Self {
        self.plans.lock().unwrap().remove(instructor_id);
        self
    }
}

#[async_trait]
impl SubscriptionStore for MockSubscriptionStore {
    async fn get_active_subscription(
        &self,
        instructor_id: &str,
    ) -> Result<Option<Subscription>, WheelhouseError> {
        Ok(self.plans.lock().unwrap().get(instructor_id).cloned())
    }
}
