use crate::error::MastodonError;
use crate::mastodon::{Account, MastodonApi, Relationship, Status, TimelineScope};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub fn account(id: &str, acct: &str) -> Account {
    Account {
        id: id.to_string(),
        acct: acct.to_string(),
        display_name: String::new(),
    }
}

pub fn status(id: &str, url: &str) -> Status {
    Status {
        id: id.to_string(),
        url: Some(url.to_string()),
    }
}

#[derive(Default)]
struct FakeState {
    me: Option<Account>,
    following: Option<Vec<Account>>,
    timelines: HashMap<TimelineScope, Option<Vec<Status>>>,
    searches: HashMap<String, Option<Vec<Account>>>,
    failing_follows: HashSet<String>,
    timeline_calls: Vec<TimelineScope>,
    search_calls: Vec<String>,
    follow_calls: Vec<String>,
}

fn failure(what: &str) -> MastodonError {
    MastodonError::ApiRequestFailed(format!("{what} failed with status 502 Bad Gateway"))
}

/// In-memory `MastodonApi` for the sync and scheduler tests
#[derive(Clone, Default)]
pub struct FakeMastodon {
    state: Arc<Mutex<FakeState>>,
    gate: Option<Arc<Semaphore>>,
    panic_on_fetch: Arc<AtomicBool>,
}

impl FakeMastodon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_me(self, me: Account) -> Self {
        self.state.lock().unwrap().me = Some(me);
        self
    }

    pub fn with_following(self, following: Vec<Account>) -> Self {
        self.state.lock().unwrap().following = Some(following);
        self
    }

    pub fn with_timeline(self, scope: TimelineScope, statuses: Vec<Status>) -> Self {
        self.state
            .lock()
            .unwrap()
            .timelines
            .insert(scope, Some(statuses));
        self
    }

    pub fn with_timeline_failure(self, scope: TimelineScope) -> Self {
        self.state.lock().unwrap().timelines.insert(scope, None);
        self
    }

    pub fn with_search_result(self, query: &str, ids: &[&str]) -> Self {
        self.set_search_result(query, ids);
        self
    }

    pub fn with_search_failure(self, query: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .searches
            .insert(query.to_string(), None);
        self
    }

    pub fn with_follow_failure(self, account_id: &str) -> Self {
        self.set_follow_failure(account_id, true);
        self
    }

    /// Block every timeline fetch until `gate` has a permit
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Make the next timeline fetches panic instead of returning
    pub fn set_panic_on_fetch(&self, panic: bool) {
        self.panic_on_fetch.store(panic, Ordering::SeqCst);
    }

    pub fn set_search_result(&self, query: &str, ids: &[&str]) {
        let accounts = ids.iter().map(|id| account(id, "match")).collect();
        self.state
            .lock()
            .unwrap()
            .searches
            .insert(query.to_string(), Some(accounts));
    }

    pub fn set_follow_failure(&self, account_id: &str, failing: bool) {
        let mut state = self.state.lock().unwrap();
        if failing {
            state.failing_follows.insert(account_id.to_string());
        } else {
            state.failing_follows.remove(account_id);
        }
    }

    pub fn timeline_calls(&self) -> Vec<TimelineScope> {
        self.state.lock().unwrap().timeline_calls.clone()
    }

    pub fn search_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().search_calls.clone()
    }

    pub fn follow_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().follow_calls.clone()
    }
}

#[async_trait]
impl MastodonApi for FakeMastodon {
    async fn verify_credentials(&self) -> Result<Account, MastodonError> {
        self.state
            .lock()
            .unwrap()
            .me
            .clone()
            .ok_or_else(|| MastodonError::AuthenticationFailed("no account".to_string()))
    }

    async fn get_following(&self, _account_id: &str) -> Result<Vec<Account>, MastodonError> {
        self.state
            .lock()
            .unwrap()
            .following
            .clone()
            .ok_or_else(|| failure("fetch following"))
    }

    async fn public_timeline(&self, scope: TimelineScope) -> Result<Vec<Status>, MastodonError> {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await;
        }
        if self.panic_on_fetch.load(Ordering::SeqCst) {
            panic!("timeline fetch blew up");
        }

        let mut state = self.state.lock().unwrap();
        state.timeline_calls.push(scope);
        match state.timelines.get(&scope) {
            Some(Some(statuses)) => Ok(statuses.clone()),
            Some(None) => Err(failure("fetch timeline")),
            None => Ok(Vec::new()),
        }
    }

    async fn search_accounts(&self, query: &str) -> Result<Vec<Account>, MastodonError> {
        let mut state = self.state.lock().unwrap();
        state.search_calls.push(query.to_string());
        match state.searches.get(query) {
            Some(Some(accounts)) => Ok(accounts.clone()),
            Some(None) => Err(failure("search accounts")),
            None => Ok(Vec::new()),
        }
    }

    async fn follow_account(&self, account_id: &str) -> Result<Relationship, MastodonError> {
        let mut state = self.state.lock().unwrap();
        state.follow_calls.push(account_id.to_string());
        if state.failing_follows.contains(account_id) {
            return Err(failure("follow account"));
        }

        Ok(Relationship {
            id: account_id.to_string(),
            following: true,
            requested: false,
        })
    }
}
