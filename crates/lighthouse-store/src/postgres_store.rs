use {
    crate::traits::Storage,
    async_trait::async_trait,
    lighthouse_common::{
        types::{ProposalRow, RealmRow, VoteRecordRow},
        DatabaseConfig, Error, Result,
    },
    sqlx::{
        postgres::{PgPool, PgPoolOptions, PgRow},
        Row,
    },
    tracing::{debug, info},
};

const SCHEMA: [&str; 7] = [
    r#"
    CREATE TABLE IF NOT EXISTS realms (
        pubkey TEXT PRIMARY KEY,
        subscribed BOOLEAN NOT NULL DEFAULT FALSE,
        created_at BIGINT NOT NULL,
        updated_at BIGINT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS realm_latest_timestamps (
        realm_pub_key TEXT PRIMARY KEY,
        latest_timestamp BIGINT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS proposals (
        pubkey TEXT PRIMARY KEY,
        realm_pub_key TEXT NOT NULL,
        governance TEXT NOT NULL,
        governing_token_mint TEXT NOT NULL,
        name TEXT NOT NULL,
        description_link TEXT NOT NULL,
        state TEXT NOT NULL,
        created_at BIGINT NOT NULL,
        voting_completed_at BIGINT,
        yes_vote_weight NUMERIC(20, 0) NOT NULL,
        no_vote_weight NUMERIC(20, 0) NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS proposals_realm_created_idx ON proposals(realm_pub_key, created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS vote_records (
        id BIGSERIAL PRIMARY KEY,
        realm_pub_key TEXT NOT NULL,
        member_pub_key TEXT NOT NULL,
        proposal_pubkey TEXT NOT NULL,
        vote TEXT NOT NULL,
        vote_weight NUMERIC(20, 0) NOT NULL,
        version TEXT NOT NULL,
        proposal_created_at BIGINT NOT NULL,
        UNIQUE (proposal_pubkey, member_pub_key)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS vote_records_realm_created_idx ON vote_records(realm_pub_key, proposal_created_at)",
    "CREATE INDEX IF NOT EXISTS vote_records_created_idx ON vote_records(proposal_created_at)",
];

const PROPOSAL_COLUMNS: &str = "pubkey, realm_pub_key, governance, governing_token_mint, name, \
     description_link, state, created_at, voting_completed_at, \
     yes_vote_weight::TEXT AS yes_vote_weight, no_vote_weight::TEXT AS no_vote_weight";

const VOTE_RECORD_COLUMNS: &str = "realm_pub_key, member_pub_key, proposal_pubkey, vote, \
     vote_weight::TEXT AS vote_weight, version, proposal_created_at";

fn db_error(e: sqlx::Error) -> Error {
    Error::Storage(e.to_string())
}

fn parse_weight(row: &PgRow, column: &str) -> Result<u64> {
    let text: String = row.try_get(column).map_err(db_error)?;
    text.parse()
        .map_err(|e| Error::Storage(format!("invalid {} {}: {}", column, text, e)))
}

/// PostgreSQL storage implementation
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.connection_string)
            .await
            .map_err(db_error)?;

        let store = Self { pool };

        if config.create_tables {
            store.initialize_schema().await?;
        }

        info!("Connected to PostgreSQL store");
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_error)?;
        }
        debug!("Database schema ready");
        Ok(())
    }

    fn proposal_from_row(row: &PgRow) -> Result<ProposalRow> {
        Ok(ProposalRow {
            pubkey: row.try_get("pubkey").map_err(db_error)?,
            realm_pub_key: row.try_get("realm_pub_key").map_err(db_error)?,
            governance: row.try_get("governance").map_err(db_error)?,
            governing_token_mint: row.try_get("governing_token_mint").map_err(db_error)?,
            name: row.try_get("name").map_err(db_error)?,
            description_link: row.try_get("description_link").map_err(db_error)?,
            state: row.try_get("state").map_err(db_error)?,
            created_at: row.try_get("created_at").map_err(db_error)?,
            voting_completed_at: row.try_get("voting_completed_at").map_err(db_error)?,
            yes_vote_weight: parse_weight(row, "yes_vote_weight")?,
            no_vote_weight: parse_weight(row, "no_vote_weight")?,
        })
    }

    fn vote_record_from_row(row: &PgRow) -> Result<VoteRecordRow> {
        let vote: String = row.try_get("vote").map_err(db_error)?;
        let version: String = row.try_get("version").map_err(db_error)?;

        Ok(VoteRecordRow {
            realm_pub_key: row.try_get("realm_pub_key").map_err(db_error)?,
            member_pub_key: row.try_get("member_pub_key").map_err(db_error)?,
            proposal_pubkey: row.try_get("proposal_pubkey").map_err(db_error)?,
            vote: vote.parse()?,
            vote_weight: parse_weight(row, "vote_weight")?,
            version: version.parse()?,
            proposal_created_at: row.try_get("proposal_created_at").map_err(db_error)?,
        })
    }

    fn realm_from_row(row: &PgRow) -> Result<RealmRow> {
        Ok(RealmRow {
            pubkey: row.try_get("pubkey").map_err(db_error)?,
            subscribed: row.try_get("subscribed").map_err(db_error)?,
            created_at: row.try_get("created_at").map_err(db_error)?,
            updated_at: row.try_get("updated_at").map_err(db_error)?,
        })
    }
}

#[async_trait]
impl Storage for PostgresStore {
    async fn get_latest_timestamp(&self, realm: &str) -> Result<Option<i64>> {
        let row = sqlx::query(
            "SELECT latest_timestamp FROM realm_latest_timestamps WHERE realm_pub_key = $1",
        )
        .bind(realm)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(|row| row.try_get("latest_timestamp").map_err(db_error))
            .transpose()
    }

    async fn commit_sync(
        &self,
        realm: &str,
        proposals: Vec<ProposalRow>,
        vote_records: Vec<VoteRecordRow>,
        latest_timestamp: i64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        for proposal in &proposals {
            sqlx::query(
                r#"
                INSERT INTO proposals (pubkey, realm_pub_key, governance, governing_token_mint, name,
                    description_link, state, created_at, voting_completed_at, yes_vote_weight, no_vote_weight)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10::NUMERIC, $11::NUMERIC)
                ON CONFLICT (pubkey) DO NOTHING
                "#,
            )
            .bind(&proposal.pubkey)
            .bind(&proposal.realm_pub_key)
            .bind(&proposal.governance)
            .bind(&proposal.governing_token_mint)
            .bind(&proposal.name)
            .bind(&proposal.description_link)
            .bind(&proposal.state)
            .bind(proposal.created_at)
            .bind(proposal.voting_completed_at)
            .bind(proposal.yes_vote_weight.to_string())
            .bind(proposal.no_vote_weight.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        for record in &vote_records {
            sqlx::query(
                r#"
                INSERT INTO vote_records (realm_pub_key, member_pub_key, proposal_pubkey, vote,
                    vote_weight, version, proposal_created_at)
                VALUES ($1, $2, $3, $4, $5::NUMERIC, $6, $7)
                ON CONFLICT (proposal_pubkey, member_pub_key) DO NOTHING
                "#,
            )
            .bind(&record.realm_pub_key)
            .bind(&record.member_pub_key)
            .bind(&record.proposal_pubkey)
            .bind(record.vote.to_string())
            .bind(record.vote_weight.to_string())
            .bind(record.version.to_string())
            .bind(record.proposal_created_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        sqlx::query(
            r#"
            INSERT INTO realm_latest_timestamps (realm_pub_key, latest_timestamp)
            VALUES ($1, $2)
            ON CONFLICT (realm_pub_key)
            DO UPDATE SET latest_timestamp = GREATEST(realm_latest_timestamps.latest_timestamp, EXCLUDED.latest_timestamp)
            "#,
        )
        .bind(realm)
        .bind(latest_timestamp)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        sqlx::query(
            r#"
            INSERT INTO realms (pubkey, subscribed, created_at, updated_at)
            VALUES ($1, FALSE, EXTRACT(EPOCH FROM NOW())::BIGINT, EXTRACT(EPOCH FROM NOW())::BIGINT)
            ON CONFLICT (pubkey) DO NOTHING
            "#,
        )
        .bind(realm)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        debug!(
            "Committed {} proposals and {} vote records for realm {}",
            proposals.len(),
            vote_records.len(),
            realm
        );
        Ok(())
    }

    async fn get_proposals(
        &self,
        realm: &str,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Vec<ProposalRow>> {
        let query = format!(
            "SELECT {} FROM proposals WHERE realm_pub_key = $1 \
             AND ($2::BIGINT IS NULL OR created_at >= $2) \
             AND ($3::BIGINT IS NULL OR created_at <= $3) \
             ORDER BY created_at",
            PROPOSAL_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(realm)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.iter().map(Self::proposal_from_row).collect()
    }

    async fn get_vote_records(
        &self,
        realm: &str,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Vec<VoteRecordRow>> {
        let query = format!(
            "SELECT {} FROM vote_records WHERE realm_pub_key = $1 \
             AND ($2::BIGINT IS NULL OR proposal_created_at >= $2) \
             AND ($3::BIGINT IS NULL OR proposal_created_at <= $3) \
             ORDER BY proposal_created_at, id",
            VOTE_RECORD_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(realm)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.iter().map(Self::vote_record_from_row).collect()
    }

    async fn get_latest_vote_record_created_at(&self) -> Result<Option<i64>> {
        let row = sqlx::query("SELECT MAX(proposal_created_at) AS latest FROM vote_records")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        row.try_get("latest").map_err(db_error)
    }

    async fn set_subscription(
        &self,
        realm: &str,
        subscribed: bool,
        create_if_missing: bool,
    ) -> Result<Option<RealmRow>> {
        let row = if create_if_missing {
            sqlx::query(
                r#"
                INSERT INTO realms (pubkey, subscribed, created_at, updated_at)
                VALUES ($1, $2, EXTRACT(EPOCH FROM NOW())::BIGINT, EXTRACT(EPOCH FROM NOW())::BIGINT)
                ON CONFLICT (pubkey)
                DO UPDATE SET subscribed = EXCLUDED.subscribed, updated_at = EXCLUDED.updated_at
                RETURNING pubkey, subscribed, created_at, updated_at
                "#,
            )
            .bind(realm)
            .bind(subscribed)
            .fetch_optional(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
                UPDATE realms SET subscribed = $2, updated_at = EXTRACT(EPOCH FROM NOW())::BIGINT
                WHERE pubkey = $1
                RETURNING pubkey, subscribed, created_at, updated_at
                "#,
            )
            .bind(realm)
            .bind(subscribed)
            .fetch_optional(&self.pool)
            .await
        }
        .map_err(db_error)?;

        row.as_ref().map(Self::realm_from_row).transpose()
    }

    async fn get_realm(&self, realm: &str) -> Result<Option<RealmRow>> {
        let row = sqlx::query(
            "SELECT pubkey, subscribed, created_at, updated_at FROM realms WHERE pubkey = $1",
        )
        .bind(realm)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(Self::realm_from_row).transpose()
    }

    async fn get_subscribed_realms(&self) -> Result<Vec<RealmRow>> {
        let rows = sqlx::query(
            "SELECT pubkey, subscribed, created_at, updated_at FROM realms WHERE subscribed ORDER BY pubkey",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(Self::realm_from_row).collect()
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}
