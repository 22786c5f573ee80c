use {
    async_trait::async_trait,
    lighthouse_common::{
        types::{ProposalRow, RealmRow, VoteRecordRow},
        Result,
    },
};

/// Storage for the governance mirror. Realms are keyed by their base58 pubkey.
///
/// Time ranges are inclusive unix timestamps on the proposal's creation time;
/// `None` leaves that side open.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// The high-water mark of `realm`, `None` before its first sync
    async fn get_latest_timestamp(&self, realm: &str) -> Result<Option<i64>>;

    /// Write one sync atomically: insert proposals and vote records (duplicates
    /// are ignored), raise the realm's high-water mark to `latest_timestamp`
    /// and make sure the realm row exists.
    async fn commit_sync(
        &self,
        realm: &str,
        proposals: Vec<ProposalRow>,
        vote_records: Vec<VoteRecordRow>,
        latest_timestamp: i64,
    ) -> Result<()>;

    async fn get_proposals(
        &self,
        realm: &str,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Vec<ProposalRow>>;

    async fn get_vote_records(
        &self,
        realm: &str,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Vec<VoteRecordRow>>;

    /// Newest `proposal_created_at` over all vote records
    async fn get_latest_vote_record_created_at(&self) -> Result<Option<i64>>;

    /// Flag a realm for periodic indexing. Returns `None` when the realm is
    /// unknown and `create_if_missing` is false.
    async fn set_subscription(
        &self,
        realm: &str,
        subscribed: bool,
        create_if_missing: bool,
    ) -> Result<Option<RealmRow>>;

    async fn get_realm(&self, realm: &str) -> Result<Option<RealmRow>>;

    async fn get_subscribed_realms(&self) -> Result<Vec<RealmRow>>;

    /// Close the storage (close connections, etc.)
    async fn close(&self) -> Result<()>;
}
