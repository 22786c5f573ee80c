use {
    crate::traits::Storage,
    async_trait::async_trait,
    lighthouse_common::{
        types::{ProposalRow, RealmRow, VoteRecordRow},
        utils::current_timestamp,
        Result,
    },
    std::collections::{BTreeMap, HashMap, HashSet},
    tokio::sync::RwLock,
};

#[derive(Default)]
struct Inner {
    proposals: BTreeMap<String, ProposalRow>,
    vote_records: Vec<VoteRecordRow>,
    vote_keys: HashSet<(String, String)>,
    latest_timestamps: HashMap<String, i64>,
    realms: BTreeMap<String, RealmRow>,
}

/// In-process store with the same semantics as the PostgreSQL one
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn in_range(value: i64, start: Option<i64>, end: Option<i64>) -> bool {
    start.map_or(true, |start| value >= start) && end.map_or(true, |end| value <= end)
}

fn new_realm(realm: &str, subscribed: bool) -> RealmRow {
    let now = current_timestamp();
    RealmRow {
        pubkey: realm.to_string(),
        subscribed,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn get_latest_timestamp(&self, realm: &str) -> Result<Option<i64>> {
        Ok(self.inner.read().await.latest_timestamps.get(realm).copied())
    }

    async fn commit_sync(
        &self,
        realm: &str,
        proposals: Vec<ProposalRow>,
        vote_records: Vec<VoteRecordRow>,
        latest_timestamp: i64,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;

        for proposal in proposals {
            inner
                .proposals
                .entry(proposal.pubkey.clone())
                .or_insert(proposal);
        }
        for record in vote_records {
            let key = (record.proposal_pubkey.clone(), record.member_pub_key.clone());
            if inner.vote_keys.insert(key) {
                inner.vote_records.push(record);
            }
        }

        let mark = inner
            .latest_timestamps
            .entry(realm.to_string())
            .or_insert(latest_timestamp);
        *mark = (*mark).max(latest_timestamp);

        inner
            .realms
            .entry(realm.to_string())
            .or_insert_with(|| new_realm(realm, false));
        Ok(())
    }

    async fn get_proposals(
        &self,
        realm: &str,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Vec<ProposalRow>> {
        let inner = self.inner.read().await;
        let mut proposals: Vec<_> = inner
            .proposals
            .values()
            .filter(|p| p.realm_pub_key == realm && in_range(p.created_at, start, end))
            .cloned()
            .collect();
        proposals.sort_by_key(|p| p.created_at);
        Ok(proposals)
    }

    async fn get_vote_records(
        &self,
        realm: &str,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Vec<VoteRecordRow>> {
        let inner = self.inner.read().await;
        let mut records: Vec<_> = inner
            .vote_records
            .iter()
            .filter(|r| r.realm_pub_key == realm && in_range(r.proposal_created_at, start, end))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.proposal_created_at);
        Ok(records)
    }

    async fn get_latest_vote_record_created_at(&self) -> Result<Option<i64>> {
        let inner = self.inner.read().await;
        Ok(inner
            .vote_records
            .iter()
            .map(|r| r.proposal_created_at)
            .max())
    }

    async fn set_subscription(
        &self,
        realm: &str,
        subscribed: bool,
        create_if_missing: bool,
    ) -> Result<Option<RealmRow>> {
        let mut inner = self.inner.write().await;

        match inner.realms.get_mut(realm) {
            Some(row) => {
                row.subscribed = subscribed;
                row.updated_at = current_timestamp();
                Ok(Some(row.clone()))
            }
            None if create_if_missing => {
                let row = new_realm(realm, subscribed);
                inner.realms.insert(realm.to_string(), row.clone());
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }

    async fn get_realm(&self, realm: &str) -> Result<Option<RealmRow>> {
        Ok(self.inner.read().await.realms.get(realm).cloned())
    }

    async fn get_subscribed_realms(&self) -> Result<Vec<RealmRow>> {
        let inner = self.inner.read().await;
        Ok(inner
            .realms
            .values()
            .filter(|r| r.subscribed)
            .cloned()
            .collect())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
