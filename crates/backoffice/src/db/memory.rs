//! In-memory [`AccessStore`] for tests and local runs without a database.
//!
//! Mirrors the constraints of the Postgres schema: unique profile emails, at most
//! one pending request per user, and all-or-nothing approval. Failure switches
//! let tests simulate an unavailable backend.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use agency_core::{
    AdminRequest, AdminRequestId, Email, NewAdminRequest, PrincipalId, Profile, ProfileUpsert,
    RequestStatus,
};

use super::{AccessStore, RepositoryError};

#[derive(Debug, Default)]
struct MemoryState {
    profiles: BTreeMap<PrincipalId, Profile>,
    requests: BTreeMap<AdminRequestId, AdminRequest>,
    last_request_id: i32,
}

impl MemoryState {
    /// Validate an upsert and compute the resulting profile without storing it.
    fn prepare_profile(&self, upsert: &ProfileUpsert) -> Result<Profile, RepositoryError> {
        let email_taken = self
            .profiles
            .values()
            .any(|p| p.id != upsert.id && p.email == upsert.email);
        if email_taken {
            return Err(RepositoryError::Conflict(
                "email already belongs to another profile".to_owned(),
            ));
        }
        Ok(upsert.apply(self.profiles.get(&upsert.id), Utc::now()))
    }

    fn pending_request(&self, id: AdminRequestId) -> Result<&AdminRequest, RepositoryError> {
        let request = self.requests.get(&id).ok_or(RepositoryError::NotFound)?;
        if !request.is_pending() {
            return Err(RepositoryError::Conflict(format!(
                "request {id} is already {}",
                request.status
            )));
        }
        Ok(request)
    }

    fn sorted_requests(&self) -> Vec<AdminRequest> {
        let mut requests: Vec<_> = self.requests.values().cloned().collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        requests
    }
}

/// [`AccessStore`] backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_reads: AtomicBool,
    fail_profile_writes: AtomicBool,
    profile_write_attempts: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read fail with `Unavailable` while set.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every profile write fail with `Unavailable` while set.
    ///
    /// Approvals fail as a whole, leaving the request pending.
    pub fn set_fail_profile_writes(&self, fail: bool) {
        self.fail_profile_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of profile writes attempted so far, failed ones included.
    #[must_use]
    pub fn profile_write_attempts(&self) -> usize {
        self.profile_write_attempts.load(Ordering::SeqCst)
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("memory store lock poisoned".to_owned()))
    }

    fn check_reads(&self) -> Result<(), RepositoryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("reads disabled".to_owned()));
        }
        Ok(())
    }

    fn check_profile_writes(&self) -> Result<(), RepositoryError> {
        self.profile_write_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_profile_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "profile writes disabled".to_owned(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl AccessStore for MemoryStore {
    async fn health_check(&self) -> Result<(), RepositoryError> {
        self.check_reads()?;
        self.state().map(drop)
    }

    async fn profile_by_id(&self, id: PrincipalId) -> Result<Option<Profile>, RepositoryError> {
        self.check_reads()?;
        Ok(self.state()?.profiles.get(&id).cloned())
    }

    async fn profile_by_email(&self, email: &Email) -> Result<Option<Profile>, RepositoryError> {
        self.check_reads()?;
        Ok(self
            .state()?
            .profiles
            .values()
            .find(|p| &p.email == email)
            .cloned())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, RepositoryError> {
        self.check_reads()?;
        let mut profiles: Vec<_> = self.state()?.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(profiles)
    }

    async fn upsert_profile(&self, upsert: &ProfileUpsert) -> Result<Profile, RepositoryError> {
        self.check_profile_writes()?;
        let mut state = self.state()?;
        let profile = state.prepare_profile(upsert)?;
        state.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn create_request(&self, new: &NewAdminRequest) -> Result<AdminRequest, RepositoryError> {
        let mut state = self.state()?;
        let has_pending = state
            .requests
            .values()
            .any(|r| r.user_id == new.user_id && r.is_pending());
        if has_pending {
            return Err(RepositoryError::Conflict(
                "a pending request already exists for this user".to_owned(),
            ));
        }

        state.last_request_id += 1;
        let request = AdminRequest {
            id: AdminRequestId::new(state.last_request_id),
            user_id: new.user_id,
            email: new.email.clone(),
            full_name: new.full_name.clone(),
            message: new.message.clone(),
            requested_role: new.requested_role,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
        };
        state.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn request_by_id(
        &self,
        id: AdminRequestId,
    ) -> Result<Option<AdminRequest>, RepositoryError> {
        self.check_reads()?;
        Ok(self.state()?.requests.get(&id).cloned())
    }

    async fn latest_request_for_user(
        &self,
        user_id: PrincipalId,
    ) -> Result<Option<AdminRequest>, RepositoryError> {
        self.check_reads()?;
        Ok(self
            .state()?
            .sorted_requests()
            .into_iter()
            .find(|r| r.user_id == user_id))
    }

    async fn list_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<AdminRequest>, RepositoryError> {
        self.check_reads()?;
        Ok(self
            .state()?
            .sorted_requests()
            .into_iter()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .collect())
    }

    async fn approve_request(
        &self,
        id: AdminRequestId,
        reviewer: PrincipalId,
        grant: &ProfileUpsert,
    ) -> Result<(AdminRequest, Profile), RepositoryError> {
        let mut state = self.state()?;

        // Validate both writes before applying either.
        let mut request = state.pending_request(id)?.clone();
        self.check_profile_writes()?;
        let profile = state.prepare_profile(grant)?;

        request.status = RequestStatus::Approved;
        request.reviewed_at = Some(Utc::now());
        request.reviewed_by = Some(reviewer);

        state.requests.insert(id, request.clone());
        state.profiles.insert(profile.id, profile.clone());
        Ok((request, profile))
    }

    async fn reject_request(
        &self,
        id: AdminRequestId,
        reviewer: PrincipalId,
    ) -> Result<AdminRequest, RepositoryError> {
        let mut state = self.state()?;

        let mut request = state.pending_request(id)?.clone();
        request.status = RequestStatus::Rejected;
        request.reviewed_at = Some(Utc::now());
        request.reviewed_by = Some(reviewer);

        state.requests.insert(id, request.clone());
        Ok(request)
    }
}
