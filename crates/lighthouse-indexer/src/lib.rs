//! High-water-mark mirror of finished proposals and their vote records.
//!
//! Each sync lists every proposal of a realm, keeps the ones in a terminal
//! state that were drafted after the realm's stored mark, fetches their vote
//! records and commits everything together with the new mark.

use {
    futures::{stream, StreamExt, TryStreamExt},
    lighthouse_common::{
        types::{ProposalRow, Vote, VoteRecordRow},
        Result,
    },
    lighthouse_governance::{
        spl_governance::state::enums::ProposalState, GovernanceRpc, ProposalAccount,
        VoteRecordAccount,
    },
    lighthouse_store::Storage,
    serde::Serialize,
    solana_sdk::pubkey::Pubkey,
    std::sync::Arc,
    tracing::{debug, info},
};

/// Outcome of one realm sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub realm: String,
    pub governances: usize,
    pub proposals_scanned: usize,
    pub new_proposals: usize,
    pub vote_records: usize,
    pub previous_timestamp: i64,
    pub latest_timestamp: i64,
    pub up_to_date: bool,
}

/// Whether a proposal can no longer change its votes.
pub fn is_terminal(state: &ProposalState) -> bool {
    !matches!(
        state,
        ProposalState::Draft
            | ProposalState::SigningOff
            | ProposalState::Voting
            | ProposalState::Cancelled
    )
}

pub fn proposal_row(realm: &Pubkey, proposal: &ProposalAccount) -> ProposalRow {
    ProposalRow {
        pubkey: proposal.pubkey.to_string(),
        realm_pub_key: realm.to_string(),
        governance: proposal.governance.to_string(),
        governing_token_mint: proposal.governing_token_mint.to_string(),
        name: proposal.name.clone(),
        description_link: proposal.description_link.clone(),
        state: format!("{:?}", proposal.state),
        created_at: proposal.draft_at,
        voting_completed_at: proposal.voting_completed_at,
        yes_vote_weight: proposal.yes_vote_weight,
        no_vote_weight: proposal.no_vote_weight,
    }
}

pub fn vote_record_row(
    realm: &Pubkey,
    proposal: &ProposalAccount,
    record: &VoteRecordAccount,
) -> VoteRecordRow {
    VoteRecordRow {
        realm_pub_key: realm.to_string(),
        member_pub_key: record.governing_token_owner.to_string(),
        proposal_pubkey: proposal.pubkey.to_string(),
        vote: if record.approve { Vote::Yes } else { Vote::No },
        vote_weight: record.voter_weight,
        version: record.version,
        proposal_created_at: proposal.draft_at,
    }
}

pub struct RealmSyncer {
    rpc: Arc<dyn GovernanceRpc>,
    store: Arc<dyn Storage>,
    max_concurrent_requests: usize,
}

impl RealmSyncer {
    pub fn new(
        rpc: Arc<dyn GovernanceRpc>,
        store: Arc<dyn Storage>,
        max_concurrent_requests: usize,
    ) -> Self {
        Self {
            rpc,
            store,
            max_concurrent_requests: max_concurrent_requests.max(1),
        }
    }

    pub fn store(&self) -> &Arc<dyn Storage> {
        &self.store
    }

    pub async fn sync(&self, realm: &Pubkey) -> Result<SyncReport> {
        let realm_key = realm.to_string();
        let rpc = self.rpc.as_ref();

        let governances = rpc.get_governances_by_realm(realm).await?;
        info!("Realm {}: {} governances", realm, governances.len());

        let proposals: Vec<ProposalAccount> = stream::iter(governances.iter())
            .map(|governance| rpc.get_proposals_by_governance(&governance.pubkey))
            .buffer_unordered(self.max_concurrent_requests)
            .boxed()
            .try_concat()
            .await?;
        let proposals_scanned = proposals.len();

        let previous_timestamp = self.store.get_latest_timestamp(&realm_key).await?.unwrap_or(0);
        let mut new_proposals: Vec<ProposalAccount> = proposals
            .into_iter()
            .filter(|p| is_terminal(&p.state) && p.draft_at > previous_timestamp)
            .collect();
        new_proposals.sort_by_key(|p| p.draft_at);

        let Some(latest_timestamp) = new_proposals.iter().map(|p| p.draft_at).max() else {
            info!(
                "Realm {} is up to date ({} proposals scanned, mark {})",
                realm, proposals_scanned, previous_timestamp
            );
            return Ok(SyncReport {
                realm: realm_key,
                governances: governances.len(),
                proposals_scanned,
                new_proposals: 0,
                vote_records: 0,
                previous_timestamp,
                latest_timestamp: previous_timestamp,
                up_to_date: true,
            });
        };

        let vote_records: Vec<VoteRecordRow> = stream::iter(new_proposals.iter())
            .map(|proposal| async move {
                let records = rpc.get_vote_records_by_proposal(&proposal.pubkey).await?;
                debug!("Proposal {}: {} vote records", proposal.pubkey, records.len());
                Ok::<_, lighthouse_common::Error>(
                    records
                        .iter()
                        .map(|record| vote_record_row(realm, proposal, record))
                        .collect::<Vec<_>>(),
                )
            })
            .buffer_unordered(self.max_concurrent_requests)
            .boxed()
            .try_concat()
            .await?;

        let proposal_rows: Vec<ProposalRow> =
            new_proposals.iter().map(|p| proposal_row(realm, p)).collect();
        let report = SyncReport {
            realm: realm_key.clone(),
            governances: governances.len(),
            proposals_scanned,
            new_proposals: proposal_rows.len(),
            vote_records: vote_records.len(),
            previous_timestamp,
            latest_timestamp,
            up_to_date: false,
        };

        self.store
            .commit_sync(&realm_key, proposal_rows, vote_records, latest_timestamp)
            .await?;

        info!(
            "Realm {}: stored {} proposals and {} vote records, mark {} -> {}",
            realm,
            report.new_proposals,
            report.vote_records,
            previous_timestamp,
            latest_timestamp
        );
        Ok(report)
    }
}

/// The configured default realm followed by every subscribed realm, without
/// duplicates.
pub async fn tracked_realms(
    store: &dyn Storage,
    default_realm: Option<Pubkey>,
) -> Result<Vec<Pubkey>> {
    let mut realms: Vec<Pubkey> = default_realm.into_iter().collect();

    for row in store.get_subscribed_realms().await? {
        let realm = lighthouse_common::utils::string_to_pubkey(&row.pubkey)?;
        if !realms.contains(&realm) {
            realms.push(realm);
        }
    }
    Ok(realms)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        lighthouse_common::{Error, VoteRecordVersion},
        lighthouse_governance::{GovernanceAccount, RealmAccount, TokenOwnerRecordAccount},
        lighthouse_store::MemoryStore,
        solana_sdk::{hash::Hash, signature::Signature, transaction::Transaction},
        std::{
            collections::HashMap,
            sync::atomic::{AtomicUsize, Ordering},
        },
    };

    struct FakeRpc {
        program_id: Pubkey,
        governances: Vec<GovernanceAccount>,
        proposals: HashMap<Pubkey, Vec<ProposalAccount>>,
        votes: HashMap<Pubkey, Vec<VoteRecordAccount>>,
        vote_fetches: AtomicUsize,
    }

    #[async_trait]
    impl GovernanceRpc for FakeRpc {
        fn program_id(&self) -> Pubkey {
            self.program_id
        }

        async fn get_realm(&self, realm: &Pubkey) -> Result<RealmAccount> {
            Err(Error::NotFound(realm.to_string()))
        }

        async fn get_governance(&self, governance: &Pubkey) -> Result<GovernanceAccount> {
            Err(Error::NotFound(governance.to_string()))
        }

        async fn get_governances_by_realm(&self, _realm: &Pubkey) -> Result<Vec<GovernanceAccount>> {
            Ok(self.governances.clone())
        }

        async fn get_governances_by_governed_account(
            &self,
            _governed: &Pubkey,
        ) -> Result<Vec<GovernanceAccount>> {
            Ok(Vec::new())
        }

        async fn get_token_owner_records(
            &self,
            _realm: &Pubkey,
            _mint: Option<Pubkey>,
            _owner: Option<Pubkey>,
        ) -> Result<Vec<TokenOwnerRecordAccount>> {
            Ok(Vec::new())
        }

        async fn get_proposals_by_governance(
            &self,
            governance: &Pubkey,
        ) -> Result<Vec<ProposalAccount>> {
            Ok(self.proposals.get(governance).cloned().unwrap_or_default())
        }

        async fn get_vote_records_by_proposal(
            &self,
            proposal: &Pubkey,
        ) -> Result<Vec<VoteRecordAccount>> {
            self.vote_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.votes.get(proposal).cloned().unwrap_or_default())
        }

        async fn get_latest_blockhash(&self) -> Result<Hash> {
            Ok(Hash::default())
        }

        async fn get_minimum_balance_for_rent_exemption(&self, _len: usize) -> Result<u64> {
            Ok(0)
        }

        async fn send_and_confirm_transaction(&self, _tx: &Transaction) -> Result<Signature> {
            Err(Error::Rpc("not supported".to_string()))
        }
    }

    fn governance(realm: Pubkey) -> GovernanceAccount {
        GovernanceAccount {
            pubkey: Pubkey::new_unique(),
            realm,
            config: lighthouse_governance::realm::realm_governance_config(60).unwrap(),
            active_proposal_count: 0,
        }
    }

    fn proposal(governance: Pubkey, state: ProposalState, draft_at: i64) -> ProposalAccount {
        ProposalAccount {
            pubkey: Pubkey::new_unique(),
            governance,
            governing_token_mint: Pubkey::new_unique(),
            state,
            name: format!("proposal at {}", draft_at),
            description_link: String::new(),
            draft_at,
            voting_completed_at: Some(draft_at + 100),
            yes_vote_weight: 1,
            no_vote_weight: 0,
        }
    }

    fn vote(proposal: &ProposalAccount, approve: bool, version: VoteRecordVersion) -> VoteRecordAccount {
        VoteRecordAccount {
            pubkey: Pubkey::new_unique(),
            proposal: proposal.pubkey,
            governing_token_owner: Pubkey::new_unique(),
            version,
            approve,
            voter_weight: 1,
        }
    }

    fn fake(realm: Pubkey) -> (FakeRpc, Vec<ProposalAccount>) {
        let gov_a = governance(realm);
        let gov_b = governance(realm);

        let succeeded = proposal(gov_a.pubkey, ProposalState::Succeeded, 100);
        let defeated = proposal(gov_b.pubkey, ProposalState::Defeated, 200);
        let voting = proposal(gov_a.pubkey, ProposalState::Voting, 300);
        let cancelled = proposal(gov_b.pubkey, ProposalState::Cancelled, 400);

        let mut votes = HashMap::new();
        votes.insert(
            succeeded.pubkey,
            vec![
                vote(&succeeded, true, VoteRecordVersion::V2),
                vote(&succeeded, false, VoteRecordVersion::V1),
            ],
        );
        votes.insert(defeated.pubkey, vec![vote(&defeated, false, VoteRecordVersion::V2)]);
        votes.insert(voting.pubkey, vec![vote(&voting, true, VoteRecordVersion::V2)]);

        let mut proposals = HashMap::new();
        proposals.insert(gov_a.pubkey, vec![succeeded.clone(), voting.clone()]);
        proposals.insert(gov_b.pubkey, vec![defeated.clone(), cancelled.clone()]);

        let rpc = FakeRpc {
            program_id: Pubkey::new_unique(),
            governances: vec![gov_a, gov_b],
            proposals,
            votes,
            vote_fetches: AtomicUsize::new(0),
        };
        (rpc, vec![succeeded, defeated, voting, cancelled])
    }

    #[tokio::test]
    async fn test_first_sync_stores_terminal_proposals() {
        let realm = Pubkey::new_unique();
        let (rpc, proposals) = fake(realm);
        let store = Arc::new(MemoryStore::new());
        let syncer = RealmSyncer::new(Arc::new(rpc), store.clone(), 4);

        let report = syncer.sync(&realm).await.unwrap();

        assert_eq!(report.governances, 2);
        assert_eq!(report.proposals_scanned, 4);
        assert_eq!(report.new_proposals, 2);
        assert_eq!(report.vote_records, 3);
        assert_eq!(report.previous_timestamp, 0);
        assert_eq!(report.latest_timestamp, 200);
        assert!(!report.up_to_date);

        let realm_key = realm.to_string();
        assert_eq!(store.get_latest_timestamp(&realm_key).await.unwrap(), Some(200));

        let rows = store.get_vote_records(&realm_key, None, None).await.unwrap();
        assert_eq!(rows.len(), 3);
        let succeeded_key = proposals[0].pubkey.to_string();
        let mut succeeded_votes: Vec<_> = rows
            .iter()
            .filter(|r| r.proposal_pubkey == succeeded_key)
            .map(|r| (r.vote, r.version, r.proposal_created_at))
            .collect();
        succeeded_votes.sort_by_key(|(vote, _, _)| vote.to_string());
        assert_eq!(
            succeeded_votes,
            vec![
                (Vote::No, VoteRecordVersion::V1, 100),
                (Vote::Yes, VoteRecordVersion::V2, 100)
            ]
        );

        let stored = store.get_proposals(&realm_key, None, None).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].state, "Succeeded");
        assert_eq!(stored[1].state, "Defeated");
    }

    #[tokio::test]
    async fn test_second_sync_is_up_to_date() {
        let realm = Pubkey::new_unique();
        let (rpc, _) = fake(realm);
        let rpc = Arc::new(rpc);
        let store = Arc::new(MemoryStore::new());
        let syncer = RealmSyncer::new(rpc.clone(), store.clone(), 2);

        syncer.sync(&realm).await.unwrap();
        let fetches = rpc.vote_fetches.load(Ordering::SeqCst);
        assert_eq!(fetches, 2);

        let report = syncer.sync(&realm).await.unwrap();
        assert!(report.up_to_date);
        assert_eq!(report.new_proposals, 0);
        assert_eq!(report.previous_timestamp, 200);
        assert_eq!(report.latest_timestamp, 200);
        assert_eq!(rpc.vote_fetches.load(Ordering::SeqCst), fetches);
        assert_eq!(
            store
                .get_vote_records(&realm.to_string(), None, None)
                .await
                .unwrap()
                .len(),
            3
        );
    }

    #[tokio::test]
    async fn test_only_proposals_after_mark_are_fetched() {
        let realm = Pubkey::new_unique();
        let (rpc, _) = fake(realm);
        let rpc = Arc::new(rpc);
        let store = Arc::new(MemoryStore::new());
        store
            .commit_sync(&realm.to_string(), Vec::new(), Vec::new(), 150)
            .await
            .unwrap();

        let report = RealmSyncer::new(rpc.clone(), store, 1)
            .sync(&realm)
            .await
            .unwrap();

        assert_eq!(report.previous_timestamp, 150);
        assert_eq!(report.new_proposals, 1);
        assert_eq!(report.vote_records, 1);
        assert_eq!(rpc.vote_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tracked_realms() {
        let store = MemoryStore::new();
        let default_realm = Pubkey::new_unique();
        let other = Pubkey::new_unique();
        store
            .set_subscription(&default_realm.to_string(), true, true)
            .await
            .unwrap();
        store.set_subscription(&other.to_string(), true, true).await.unwrap();

        let realms = tracked_realms(&store, Some(default_realm)).await.unwrap();
        assert_eq!(realms.len(), 2);
        assert_eq!(realms[0], default_realm);
        assert!(realms.contains(&other));

        assert!(tracked_realms(&MemoryStore::new(), None).await.unwrap().is_empty());
    }

    #[test]
    fn test_terminal_states() {
        assert!(is_terminal(&ProposalState::Completed));
        assert!(is_terminal(&ProposalState::Vetoed));
        assert!(!is_terminal(&ProposalState::SigningOff));
        assert!(!is_terminal(&ProposalState::Cancelled));
    }
}
