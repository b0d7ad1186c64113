// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock role oracle for deterministic testing.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use wheelhouse_core::types::{BanStatus, Role};
use wheelhouse_core::{RoleOracle, WheelhouseError};

#[derive(Clone)]
struct Profile {
    role: Role,
    verified: bool,
    ban: BanStatus,
}

/// An in-memory role oracle seeded per test.
///
/// Unknown users resolve as unverified, unbanned students; register users
/// explicitly to give them other roles.
#[derive(Default)]
pub struct MockRoleOracle {
    profiles: Mutex<HashMap<String, Profile>>,
}

impl MockRoleOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_student(&self, user_id: &str) -> &Self {
        self.insert(user_id, Role::Student, false, BanStatus::not_banned())
    }

    pub fn add_instructor(&self, user_id: &str, verified: bool) -> &Self {
        self.insert(user_id, Role::Instructor, verified, BanStatus::not_banned())
    }

    pub fn add_admin(&self, user_id: &str) -> &Self {
        self.insert(user_id, Role::Admin, false, BanStatus::not_banned())
    }

    /// Ban a user, optionally until a given instant.
    pub fn ban(&self, user_id: &str, until: Option<DateTime<Utc>>) -> &Self {
        let mut profiles = self.profiles.lock().unwrap();
        if let Some(profile) = profiles.get_mut(user_id) {
            profile.ban = BanStatus {
                banned: true,
                expires_at: until,
            };
        }
        drop(profiles);
        self
    }

    /// Flip an instructor's verification flag mid-test.
    pub fn set_verified(&self, user_id: &str, verified: bool) -> &Self {
        let mut profiles = self.profiles.lock().unwrap();
        if let Some(profile) = profiles.get_mut(user_id) {
            profile.verified = verified;
        }
        drop(profiles);
        self
    }

    fn insert(&self, user_id: &str, role: Role, verified: bool, ban: BanStatus) -> &Self {
        self.profiles.lock().unwrap().insert(
            user_id.to_string(),
            Profile {
                role,
                verified,
                ban,
            },
        );
        self
    }

    fn get(&self, user_id: &str) -> Profile {
        self.profiles
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or(Profile {
                role: Role::Student,
                verified: false,
                ban: BanStatus::not_banned(),
            })
    }
}

#[async_trait]
impl RoleOracle for MockRoleOracle {
    async fn get_role(&self, user_id: &str) -> Result<Role, WheelhouseError> {
        Ok(self.get(user_id).role)
    }

    async fn is_verified_instructor(&self, user_id: &str) -> Result<bool, WheelhouseError> {
        Ok(self.get(user_id).verified)
    }

    async fn is_banned(&self, user_id: &str) -> Result<BanStatus, WheelhouseError> {
        Ok(self.get(user_id).ban)
    }
}
