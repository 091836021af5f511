//! In-memory provider double. Backs the test suite and local development
//! without a hosted project; mirrors the hosted provider's observable
//! behavior, including unique-constraint conflicts and token-pair sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::models::auth_model::{AuthSession, AuthUser};
use crate::provider::{
    Filter, Provider, ProviderError, ProviderFactory, SessionTokens, DRIVERS_TABLE,
    LOCATIONS_TABLE,
};

#[derive(Debug, Clone)]
struct Account {
    id: Uuid,
    email: String,
    password: String,
    name: String,
}

#[derive(Default)]
struct MemoryState {
    accounts: Vec<Account>,
    access_tokens: HashMap<String, Uuid>,
    refresh_tokens: HashMap<String, Uuid>,
    drivers: Vec<Value>,
    locations: Vec<Value>,
    objects: HashMap<String, Vec<u8>>,
    fail_uploads: bool,
}

#[derive(Clone, Default)]
pub struct MemoryFactory {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent upload fail, for exercising the best-effort
    /// upload semantics.
    pub fn fail_uploads(&self, fail: bool) {
        self.state.lock().expect("state lock poisoned").fail_uploads = fail;
    }

    /// Number of objects stored across all buckets.
    pub fn stored_objects(&self) -> usize {
        self.state.lock().expect("state lock poisoned").objects.len()
    }

    /// Provider client with no session context, for test setup.
    pub fn anonymous(&self) -> MemoryProvider {
        MemoryProvider {
            state: self.state.clone(),
            session: Mutex::new(None),
        }
    }
}

impl ProviderFactory for MemoryFactory {
    fn client(&self, session: Option<SessionTokens>) -> Arc<dyn Provider> {
        Arc::new(MemoryProvider {
            state: self.state.clone(),
            session: Mutex::new(session),
        })
    }
}

pub struct MemoryProvider {
    state: Arc<Mutex<MemoryState>>,
    session: Mutex<Option<SessionTokens>>,
}

impl MemoryProvider {
    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("state lock poisoned")
    }

    fn user_for_account(account: &Account) -> AuthUser {
        AuthUser {
            id: account.id,
            email: Some(account.email.clone()),
            user_metadata: json!({ "name": account.name }),
        }
    }

    fn session_for(state: &mut MemoryState, account: &Account) -> AuthSession {
        let access_token = Uuid::new_v4().to_string();
        let refresh_token = Uuid::new_v4().to_string();
        state.access_tokens.insert(access_token.clone(), account.id);
        state
            .refresh_tokens
            .insert(refresh_token.clone(), account.id);
        let now = Utc::now().timestamp();
        AuthSession {
            access_token,
            refresh_token,
            expires_in: Some(3600),
            expires_at: Some(now + 3600),
            token_type: "bearer".to_string(),
            user: Self::user_for_account(account),
        }
    }
}

fn matches_filters(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| {
        row.get(filter.column)
            .map(|value| value_text(value) == filter.value)
            .unwrap_or(false)
    })
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn project(row: &Value, columns: &str) -> Value {
    if columns.trim() == "*" {
        return row.clone();
    }
    let mut out = Map::new();
    for column in columns.split(',').map(str::trim) {
        out.insert(
            column.to_string(),
            row.get(column).cloned().unwrap_or(Value::Null),
        );
    }
    Value::Object(out)
}

fn table_mut<'a>(
    state: &'a mut MemoryState,
    table: &str,
) -> Result<&'a mut Vec<Value>, ProviderError> {
    match table {
        DRIVERS_TABLE => Ok(&mut state.drivers),
        LOCATIONS_TABLE => Ok(&mut state.locations),
        other => Err(ProviderError::Unexpected(format!(
            "unknown relation {other}"
        ))),
    }
}

fn unique_violation(constraint: &str) -> ProviderError {
    ProviderError::Conflict(format!(
        "duplicate key value violates unique constraint \"{constraint}\""
    ))
}

#[async_trait]
impl Provider for MemoryProvider {
    async fn admin_create_user(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthUser, ProviderError> {
        let mut state = self.state();
        if state.accounts.iter().any(|a| a.email == email) {
            return Err(ProviderError::Conflict(
                "A user with this email address has already been registered".to_string(),
            ));
        }
        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        };
        let user = Self::user_for_account(&account);
        state.accounts.push(account);
        Ok(user)
    }

    async fn admin_delete_user(&self, user_id: Uuid) -> Result<(), ProviderError> {
        let mut state = self.state();
        state.accounts.retain(|a| a.id != user_id);
        state.access_tokens.retain(|_, id| *id != user_id);
        state.refresh_tokens.retain(|_, id| *id != user_id);
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ProviderError> {
        let mut state = self.state();
        let account = state
            .accounts
            .iter()
            .find(|a| a.email == email && a.password == password)
            .cloned()
            .ok_or_else(|| {
                ProviderError::Unauthorized("Invalid login credentials".to_string())
            })?;
        let session = Self::session_for(&mut state, &account);
        *self.session.lock().expect("session lock poisoned") = Some(SessionTokens {
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
        });
        Ok(session)
    }

    async fn current_user(&self) -> Result<Option<AuthUser>, ProviderError> {
        let tokens = self.session.lock().expect("session lock poisoned").clone();
        let Some(tokens) = tokens else {
            return Ok(None);
        };
        let state = self.state();
        let Some(user_id) = state.access_tokens.get(&tokens.access_token).copied() else {
            return Ok(None);
        };
        Ok(state
            .accounts
            .iter()
            .find(|a| a.id == user_id)
            .map(Self::user_for_account))
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<AuthSession, ProviderError> {
        let mut state = self.state();
        let user_id = state
            .access_tokens
            .get(access_token)
            .or_else(|| state.refresh_tokens.get(refresh_token))
            .copied()
            .ok_or_else(|| ProviderError::Unauthorized("Invalid session tokens".to_string()))?;
        let account = state
            .accounts
            .iter()
            .find(|a| a.id == user_id)
            .cloned()
            .ok_or_else(|| ProviderError::Unauthorized("Invalid session tokens".to_string()))?;
        let session = Self::session_for(&mut state, &account);
        *self.session.lock().expect("session lock poisoned") = Some(SessionTokens {
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
        });
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let tokens = self.session.lock().expect("session lock poisoned").take();
        if let Some(tokens) = tokens {
            let mut state = self.state();
            state.access_tokens.remove(&tokens.access_token);
            state.refresh_tokens.remove(&tokens.refresh_token);
        }
        Ok(())
    }

    async fn db_select(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
        order: Option<&'static str>,
    ) -> Result<Vec<Value>, ProviderError> {
        let mut state = self.state();
        let rows = table_mut(&mut state, table)?;
        let mut matched: Vec<Value> = rows
            .iter()
            .filter(|row| matches_filters(row, filters))
            .cloned()
            .collect();
        if let Some(column) = order {
            matched.sort_by_key(|row| row.get(column).map(value_text).unwrap_or_default());
        }
        Ok(matched.iter().map(|row| project(row, columns)).collect())
    }

    async fn db_insert(&self, table: &str, row: Value) -> Result<Value, ProviderError> {
        let mut state = self.state();
        match table {
            DRIVERS_TABLE => {
                if state
                    .drivers
                    .iter()
                    .any(|d| d.get("user_id") == row.get("user_id"))
                {
                    return Err(unique_violation("drivers_user_id_key"));
                }
                if state
                    .drivers
                    .iter()
                    .any(|d| d.get("phone") == row.get("phone"))
                {
                    return Err(unique_violation("drivers_phone_key"));
                }
            }
            LOCATIONS_TABLE => {
                if state.locations.iter().any(|l| {
                    l.get("state") == row.get("state")
                        && l.get("district") == row.get("district")
                        && l.get("sub_location") == row.get("sub_location")
                }) {
                    return Err(unique_violation("locations_state_district_sub_location_key"));
                }
            }
            other => {
                return Err(ProviderError::Unexpected(format!(
                    "unknown relation {other}"
                )))
            }
        }
        let mut stored = row;
        if let Some(fields) = stored.as_object_mut() {
            fields.insert("id".to_string(), json!(Uuid::new_v4()));
            fields.insert("created_at".to_string(), json!(Utc::now()));
        }
        table_mut(&mut state, table)?.push(stored.clone());
        Ok(stored)
    }

    async fn db_update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let mut state = self.state();
        let rows = table_mut(&mut state, table)?;
        let changes = patch
            .as_object()
            .cloned()
            .ok_or_else(|| ProviderError::Unexpected("patch must be an object".to_string()))?;
        let mut first_updated = None;
        for row in rows.iter_mut() {
            if !matches_filters(row, filters) {
                continue;
            }
            if let Some(fields) = row.as_object_mut() {
                for (key, value) in &changes {
                    fields.insert(key.clone(), value.clone());
                }
            }
            if first_updated.is_none() {
                first_updated = Some(row.clone());
            }
        }
        Ok(first_updated)
    }

    async fn storage_upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), ProviderError> {
        let mut state = self.state();
        if state.fail_uploads {
            return Err(ProviderError::Unexpected("storage offline".to_string()));
        }
        state.objects.insert(format!("{bucket}/{path}"), bytes);
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://public/{bucket}/{path}")
    }

    async fn create_signed_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in_secs: u64,
    ) -> Result<String, ProviderError> {
        let state = self.state();
        if !state.objects.contains_key(&format!("{bucket}/{path}")) {
            return Err(ProviderError::NotFound("Object not found".to_string()));
        }
        Ok(format!(
            "memory://signed/{bucket}/{path}?expires_in={expires_in_secs}"
        ))
    }
}
