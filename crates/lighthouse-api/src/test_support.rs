//! In-process chain and action API for router tests.

use {
    crate::{
        action_client::{Action, ActionApi},
        gas_tank::StaticGasTank,
        health::HealthService,
        metrics::MetricsService,
        rest::AppState,
        types::ApiError,
    },
    async_trait::async_trait,
    axum::{
        body::Body,
        http::{header, Request},
        response::Response,
    },
    lighthouse_common::{Error, Result, VoteRecordVersion},
    lighthouse_governance::{
        realm::realm_governance_config, spl_governance::state::enums::ProposalState,
        GovernanceAccount, GovernanceRpc, ProposalAccount, RealmAccount, TokenOwnerRecordAccount,
        VoteRecordAccount,
    },
    lighthouse_indexer::RealmSyncer,
    lighthouse_store::{MemoryStore, Storage},
    solana_sdk::{
        hash::Hash,
        instruction::{AccountMeta, Instruction},
        pubkey::Pubkey,
        signature::{Keypair, Signature, Signer},
        transaction::Transaction,
    },
    std::{
        sync::{Arc, Mutex},
        time::Instant,
    },
};

#[derive(Default)]
struct ChainState {
    proposals: Vec<ProposalAccount>,
    vote_records: Vec<VoteRecordAccount>,
    action_calls: usize,
    sent_transactions: usize,
}

/// A realm whose council mint governance has a single member, `proposer`.
#[derive(Clone)]
pub struct FakeChain {
    pub program_id: Pubkey,
    pub realm: Pubkey,
    pub community_mint: Pubkey,
    pub council_mint: Pubkey,
    pub proposer: Pubkey,
    pub token_owner_record: Pubkey,
    /// Program the action API's instructions call into
    pub action_program: Pubkey,
    governance: GovernanceAccount,
    state: Arc<Mutex<ChainState>>,
}

impl FakeChain {
    pub fn new() -> Self {
        let realm = Pubkey::new_unique();
        Self {
            program_id: Pubkey::new_unique(),
            realm,
            community_mint: Pubkey::new_unique(),
            council_mint: Pubkey::new_unique(),
            proposer: Pubkey::new_unique(),
            token_owner_record: Pubkey::new_unique(),
            action_program: Pubkey::new_unique(),
            governance: GovernanceAccount {
                pubkey: Pubkey::new_unique(),
                realm,
                config: realm_governance_config(60).unwrap(),
                active_proposal_count: 0,
            },
            state: Arc::new(Mutex::new(ChainState::default())),
        }
    }

    pub fn governance(&self) -> GovernanceAccount {
        self.governance.clone()
    }

    /// Add a proposal under the council governance with `votes` approving
    /// vote records.
    pub fn add_proposal(&self, state: ProposalState, draft_at: i64, votes: usize) -> Pubkey {
        let proposal = ProposalAccount {
            pubkey: Pubkey::new_unique(),
            governance: self.governance.pubkey,
            governing_token_mint: self.council_mint,
            state,
            name: format!("proposal at {}", draft_at),
            description_link: String::new(),
            draft_at,
            voting_completed_at: Some(draft_at + 60),
            yes_vote_weight: votes as u64,
            no_vote_weight: 0,
        };
        let key = proposal.pubkey;

        let mut chain = self.state.lock().unwrap();
        for _ in 0..votes {
            chain.vote_records.push(VoteRecordAccount {
                pubkey: Pubkey::new_unique(),
                proposal: key,
                governing_token_owner: Pubkey::new_unique(),
                version: VoteRecordVersion::V2,
                approve: true,
                voter_weight: 1,
            });
        }
        chain.proposals.push(proposal);
        key
    }

    pub fn action_calls(&self) -> usize {
        self.state.lock().unwrap().action_calls
    }

    pub fn sent_transactions(&self) -> usize {
        self.state.lock().unwrap().sent_transactions
    }

    /// The transaction the action API answers `action` with for `dao_wallet`.
    pub fn action_transaction(&self, action: Action, dao_wallet: &Pubkey) -> Transaction {
        let instruction = Instruction::new_with_bytes(
            self.action_program,
            action.path().as_bytes(),
            vec![
                AccountMeta::new(*dao_wallet, true),
                AccountMeta::new_readonly(self.realm, false),
            ],
        );
        Transaction::new_with_payer(&[instruction], Some(dao_wallet))
    }
}

#[async_trait]
impl GovernanceRpc for FakeChain {
    fn program_id(&self) -> Pubkey {
        self.program_id
    }

    async fn get_realm(&self, realm: &Pubkey) -> Result<RealmAccount> {
        if *realm != self.realm {
            return Err(Error::NotFound(format!("realm {}", realm)));
        }
        Ok(RealmAccount {
            pubkey: self.realm,
            name: "lighthouse-multisig".to_string(),
            community_mint: self.community_mint,
            council_mint: Some(self.council_mint),
            authority: Some(self.governance.pubkey),
        })
    }

    async fn get_governance(&self, governance: &Pubkey) -> Result<GovernanceAccount> {
        if *governance != self.governance.pubkey {
            return Err(Error::NotFound(format!("governance {}", governance)));
        }
        Ok(self.governance.clone())
    }

    async fn get_governances_by_realm(&self, realm: &Pubkey) -> Result<Vec<GovernanceAccount>> {
        Ok(if *realm == self.realm {
            vec![self.governance.clone()]
        } else {
            Vec::new()
        })
    }

    async fn get_governances_by_governed_account(
        &self,
        governed: &Pubkey,
    ) -> Result<Vec<GovernanceAccount>> {
        Ok(if *governed == self.council_mint {
            vec![self.governance.clone()]
        } else {
            Vec::new()
        })
    }

    async fn get_token_owner_records(
        &self,
        realm: &Pubkey,
        mint: Option<Pubkey>,
        owner: Option<Pubkey>,
    ) -> Result<Vec<TokenOwnerRecordAccount>> {
        let record = TokenOwnerRecordAccount {
            pubkey: self.token_owner_record,
            realm: self.realm,
            governing_token_mint: self.council_mint,
            governing_token_owner: self.proposer,
            governing_token_deposit_amount: 1,
        };
        let matches = *realm == self.realm
            && mint.map_or(true, |m| m == self.council_mint)
            && owner.map_or(true, |o| o == self.proposer);
        Ok(if matches { vec![record] } else { Vec::new() })
    }

    async fn get_proposals_by_governance(&self, governance: &Pubkey) -> Result<Vec<ProposalAccount>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .proposals
            .iter()
            .filter(|p| p.governance == *governance)
            .cloned()
            .collect())
    }

    async fn get_vote_records_by_proposal(&self, proposal: &Pubkey) -> Result<Vec<VoteRecordAccount>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .vote_records
            .iter()
            .filter(|r| r.proposal == *proposal)
            .cloned()
            .collect())
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        Ok(Hash::new_unique())
    }

    async fn get_minimum_balance_for_rent_exemption(&self, _len: usize) -> Result<u64> {
        Ok(1_461_600)
    }

    async fn send_and_confirm_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        transaction
            .verify()
            .map_err(|e| Error::Transaction(e.to_string()))?;
        self.state.lock().unwrap().sent_transactions += 1;
        Ok(transaction.signatures[0])
    }
}

#[async_trait]
impl ActionApi for FakeChain {
    async fn request(
        &self,
        _community: &str,
        action: Action,
        body: serde_json::Value,
    ) -> std::result::Result<Vec<u8>, ApiError> {
        let dao_wallet = body["daoWallet"]
            .as_str()
            .ok_or_else(|| ApiError::BadRequest("daoWallet missing".to_string()))?;
        let dao_wallet: Pubkey = dao_wallet.parse().unwrap();
        self.state.lock().unwrap().action_calls += 1;

        let transaction = self.action_transaction(action, &dao_wallet);
        Ok(bincode::serialize(&transaction).unwrap())
    }
}

/// App state over `chain` with an in-memory store, plus the gas tank pubkey.
pub fn test_state(chain: FakeChain) -> (AppState, Pubkey) {
    let gas_tank = Keypair::new();
    let gas_tank_pubkey = gas_tank.pubkey();

    let rpc: Arc<dyn GovernanceRpc> = Arc::new(chain.clone());
    let store: Arc<dyn Storage> = Arc::new(MemoryStore::new());
    let syncer = Arc::new(RealmSyncer::new(rpc.clone(), store.clone(), 4));

    let state = AppState {
        health: Arc::new(HealthService::new()),
        metrics: Arc::new(MetricsService::new()),
        start_time: Instant::now(),
        service_name: "lighthouse-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        rpc,
        store,
        syncer,
        gas_tank: Arc::new(StaticGasTank::new(gas_tank)),
        actions: Arc::new(chain),
        default_realm: None,
    };
    (state, gas_tank_pubkey)
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
