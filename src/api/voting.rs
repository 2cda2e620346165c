use chrono::Utc;
use mongodb::bson::doc;
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    ledger::LedgerClient,
    model::{
        api::{ConfirmVoteRequest, VoteReceipt, VoteSpec},
        common::election::{ElectionId, ElectionState},
        db::{Election, LedgerState, NewVote, Vote, VoteCore, Voter},
        mongodb::{is_duplicate_key_error, Coll},
    },
};

use super::common::election_by_id;

pub fn routes() -> Vec<Route> {
    routes![cast_vote, confirm_vote]
}

/// Cast a vote in an active election.
///
/// Admission is local and atomic; the ledger mirror write happens afterwards,
/// and its failure leaves the vote admitted but pending confirmation rather
/// than losing it.
#[post("/elections/<election_id>/votes", data = "<spec>", format = "json")]
pub async fn cast_vote(
    election_id: ElectionId,
    spec: Json<VoteSpec>,
    elections: Coll<Election>,
    voters: Coll<Voter>,
    new_votes: Coll<NewVote>,
    votes: Coll<Vote>,
    ledger: &State<LedgerClient>,
) -> Result<Json<VoteReceipt>> {
    let election = election_by_id(election_id, &elections).await?;

    let state = election.metadata.state_at(Utc::now());
    if state != ElectionState::Active {
        return Err(Error::State(format!(
            "Election {election_id} is not accepting votes (state: {state:?})"
        )));
    }
    if election.candidate(spec.candidate_id).is_none() {
        return Err(Error::not_found(format!(
            "Candidate with ID '{}' in election '{election_id}'",
            spec.candidate_id
        )));
    }

    // Only registered wallets may vote.
    let registered = voters
        .find_one(doc! {"wallet_address": spec.voter_wallet.as_str()}, None)
        .await?;
    if registered.is_none() {
        return Err(Error::Forbidden(format!(
            "Wallet {} has not completed identity verification",
            spec.voter_wallet
        )));
    }

    // The unique index is the one-vote-per-wallet check; just try the insert.
    let VoteSpec {
        candidate_id,
        voter_wallet,
    } = spec.0;
    let vote = NewVote::new(election_id, candidate_id, voter_wallet);
    if let Err(err) = new_votes.insert_one(&vote, None).await {
        return Err(if is_duplicate_key_error(&err) {
            Error::Conflict(format!(
                "Wallet {} has already voted in election {election_id}",
                vote.voter_wallet
            ))
        } else {
            err.into()
        });
    }

    info!(
        "Admitted vote in election {} for candidate {} from wallet {}",
        election_id, vote.candidate_id, vote.voter_wallet
    );

    // Mirror to the ledger. The vote is already admitted, so a mirror failure
    // only downgrades the receipt to pending.
    match ledger
        .cast_vote(election_id, vote.candidate_id, &vote.voter_wallet)
        .await
    {
        Ok(txid) => {
            let confirmed = mark_confirmed(&votes, &vote, txid).await?;
            Ok(Json(confirmed.into()))
        }
        Err(err) => {
            warn!(
                "Ledger mirror failed for election {}, wallet {}: {err}",
                election_id, vote.voter_wallet
            );
            Ok(Json(vote.into()))
        }
    }
}

/// Retry the ledger mirror write for an already-admitted vote.
///
/// Idempotent: confirming an already-confirmed vote returns its receipt
/// unchanged.
#[post(
    "/elections/<election_id>/votes/confirm",
    data = "<request>",
    format = "json"
)]
pub async fn confirm_vote(
    election_id: ElectionId,
    request: Json<ConfirmVoteRequest>,
    votes: Coll<Vote>,
    ledger: &State<LedgerClient>,
) -> Result<Json<VoteReceipt>> {
    let filter = doc! {
        "election_id": election_id,
        "voter_wallet": request.voter_wallet.as_str(),
    };
    let vote = votes.find_one(filter, None).await?.ok_or_else(|| {
        Error::not_found(format!(
            "Vote in election '{election_id}' from wallet '{}'",
            request.voter_wallet
        ))
    })?;

    if vote.ledger_state == LedgerState::Confirmed {
        return Ok(Json(vote.into()));
    }

    // The gateway deduplicates by election and wallet, so retrying cannot
    // double-count on chain.
    let txid = ledger
        .cast_vote(election_id, vote.candidate_id, &vote.voter_wallet)
        .await
        .map_err(|err| Error::External(format!("Ledger write failed; try again later ({err})")))?;
    let confirmed = mark_confirmed(&votes, &vote, txid).await?;
    Ok(Json(confirmed.into()))
}

/// Record a successful mirror write against the stored vote.
async fn mark_confirmed(
    votes: &Coll<Vote>,
    vote: &VoteCore,
    ledger_txid: Option<String>,
) -> Result<VoteCore> {
    let filter = doc! {
        "election_id": vote.election_id,
        "voter_wallet": vote.voter_wallet.as_str(),
    };
    let update = doc! {
        "$set": {
            "ledger_state": LedgerState::Confirmed,
            "ledger_txid": ledger_txid.clone(),
        },
    };
    votes.update_one(filter, update, None).await?;

    let mut confirmed = vote.clone();
    confirmed.ledger_state = LedgerState::Confirmed;
    confirmed.ledger_txid = ledger_txid;
    Ok(confirmed)
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json,
    };

    use crate::model::{common::wallet::WalletAddress, db::VoterCore};
    use crate::Config;

    use super::*;

    #[backend_test]
    async fn cast_votes(client: Client, db: Database) {
        setup(&client, &db).await;

        let receipt = cast(&client, 1, 2, WalletAddress::example()).await;
        assert_eq!(receipt.election_id, 1);
        assert_eq!(receipt.candidate_id, 2);
        assert_eq!(receipt.voter_wallet, WalletAddress::example());
        // No ledger configured, so the mirror write succeeds trivially.
        assert!(!receipt.pending_ledger_confirmation);
        assert_eq!(receipt.ledger_txid, None);

        let vote = get_vote(&db, 1, &WalletAddress::example()).await;
        assert_eq!(vote.candidate_id, 2);
        assert_eq!(vote.ledger_state, LedgerState::Confirmed);
    }

    #[backend_test]
    async fn one_vote_per_wallet(client: Client, db: Database) {
        setup(&client, &db).await;
        cast(&client, 1, 1, WalletAddress::example()).await;

        // A second vote is refused even for a different candidate.
        let (status, body) = cast_expect_error(&client, 1, 2, WalletAddress::example()).await;
        assert_eq!(Status::Conflict, status);
        assert!(body.contains("already voted"));

        // The original vote is untouched.
        let count = Coll::<Vote>::from_db(&db)
            .count_documents(None, None)
            .await
            .unwrap();
        assert_eq!(count, 1);
        let vote = get_vote(&db, 1, &WalletAddress::example()).await;
        assert_eq!(vote.candidate_id, 1);
    }

    #[backend_test]
    async fn concurrent_duplicates_admit_exactly_one(client: Client, db: Database) {
        setup(&client, &db).await;

        let body = serde_json::to_string(&VoteSpec {
            candidate_id: 1,
            voter_wallet: WalletAddress::example(),
        })
        .unwrap();
        let dispatches = (0..3).map(|_| {
            client
                .post(uri!(cast_vote(1)))
                .header(ContentType::JSON)
                .body(body.clone())
                .dispatch()
        });
        let responses = rocket::futures::future::join_all(dispatches).await;

        let admitted = responses
            .iter()
            .filter(|response| response.status() == Status::Ok)
            .count();
        assert_eq!(admitted, 1);
        for response in &responses {
            let status = response.status();
            assert!(status == Status::Ok || status == Status::Conflict);
        }
        let count = Coll::<Vote>::from_db(&db)
            .count_documents(None, None)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[backend_test]
    async fn unverified_wallets_may_not_vote(client: Client, db: Database) {
        setup(&client, &db).await;

        let (status, body) = cast_expect_error(&client, 1, 1, wallet(77)).await;
        assert_eq!(Status::Forbidden, status);
        assert!(body.contains("verification"));
        assert_no_votes(&db).await;
    }

    #[backend_test]
    async fn votes_only_land_in_the_window(client: Client, db: Database) {
        setup(&client, &db).await;
        let elections = Coll::<Election>::from_db(&db);
        elections
            .insert_one(Election::draft_example(2), None)
            .await
            .unwrap();
        elections
            .insert_one(Election::closed_example(3), None)
            .await
            .unwrap();

        let (status, body) = cast_expect_error(&client, 2, 1, WalletAddress::example()).await;
        assert_eq!(Status::BadRequest, status);
        assert!(body.contains("not accepting votes"));

        let (status, _) = cast_expect_error(&client, 3, 1, WalletAddress::example()).await;
        assert_eq!(Status::BadRequest, status);
        assert_no_votes(&db).await;
    }

    #[backend_test]
    async fn unknown_elections_and_candidates(client: Client, db: Database) {
        setup(&client, &db).await;

        let (status, _) = cast_expect_error(&client, 99, 1, WalletAddress::example()).await;
        assert_eq!(Status::NotFound, status);

        let (status, body) = cast_expect_error(&client, 1, 99, WalletAddress::example()).await;
        assert_eq!(Status::NotFound, status);
        assert!(body.contains("Candidate"));
        assert_no_votes(&db).await;
    }

    #[backend_test]
    async fn confirming_is_idempotent(client: Client, db: Database) {
        setup(&client, &db).await;
        let receipt = cast(&client, 1, 1, WalletAddress::example()).await;
        assert!(!receipt.pending_ledger_confirmation);

        let confirmed = confirm(&client, 1, WalletAddress::example()).await;
        assert_eq!(confirmed.candidate_id, receipt.candidate_id);
        assert!(!confirmed.pending_ledger_confirmation);
        assert_eq!(confirmed.ledger_txid, receipt.ledger_txid);
    }

    #[backend_test]
    async fn pending_votes_confirm_later(client: Client, db: Database) {
        setup(&client, &db).await;
        // A vote whose mirror write never happened.
        Coll::<NewVote>::from_db(&db)
            .insert_one(NewVote::new(1, 2, WalletAddress::example()), None)
            .await
            .unwrap();

        let receipt = confirm(&client, 1, WalletAddress::example()).await;
        assert!(!receipt.pending_ledger_confirmation);

        let vote = get_vote(&db, 1, &WalletAddress::example()).await;
        assert_eq!(vote.ledger_state, LedgerState::Confirmed);
    }

    #[backend_test]
    async fn confirming_nothing_fails(client: Client, db: Database) {
        setup(&client, &db).await;

        let response = client
            .post(uri!(confirm_vote(1)))
            .header(ContentType::JSON)
            .body(
                serde_json::to_string(&ConfirmVoteRequest {
                    voter_wallet: WalletAddress::example(),
                })
                .unwrap(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn tallies_reflect_cast_votes(client: Client, db: Database) {
        setup(&client, &db).await;
        // A third registered wallet, seeded directly.
        Coll::<VoterCore>::from_db(&db)
            .insert_one(VoterCore::new("test-digest-3".to_string(), wallet(3)), None)
            .await
            .unwrap();

        cast(&client, 1, 1, WalletAddress::example()).await;
        cast(&client, 1, 1, WalletAddress::example2()).await;
        cast(&client, 1, 2, wallet(3)).await;

        let response = client
            .get(uri!(crate::api::public::election_results(1)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let results: crate::model::api::ElectionResults =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(results.winner_id, Some(1));
        assert_eq!(results.total, 3);
    }

    async fn setup(client: &Client, db: &Database) {
        let config = client.rocket().state::<Config>().unwrap();
        Coll::<Election>::from_db(db)
            .insert_one(Election::active_example(1), None)
            .await
            .unwrap();
        let voters = Coll::<VoterCore>::from_db(db);
        voters
            .insert_one(VoterCore::example(config), None)
            .await
            .unwrap();
        voters
            .insert_one(VoterCore::example2(config), None)
            .await
            .unwrap();
    }

    async fn cast(
        client: &Client,
        election_id: ElectionId,
        candidate_id: u32,
        voter_wallet: WalletAddress,
    ) -> VoteReceipt {
        let response = client
            .post(uri!(cast_vote(election_id)))
            .header(ContentType::JSON)
            .body(
                serde_json::to_string(&VoteSpec {
                    candidate_id,
                    voter_wallet,
                })
                .unwrap(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    async fn cast_expect_error(
        client: &Client,
        election_id: ElectionId,
        candidate_id: u32,
        voter_wallet: WalletAddress,
    ) -> (Status, String) {
        let response = client
            .post(uri!(cast_vote(election_id)))
            .header(ContentType::JSON)
            .body(
                serde_json::to_string(&VoteSpec {
                    candidate_id,
                    voter_wallet,
                })
                .unwrap(),
            )
            .dispatch()
            .await;
        let status = response.status();
        (status, response.into_string().await.unwrap_or_default())
    }

    async fn confirm(
        client: &Client,
        election_id: ElectionId,
        voter_wallet: WalletAddress,
    ) -> VoteReceipt {
        let response = client
            .post(uri!(confirm_vote(election_id)))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&ConfirmVoteRequest { voter_wallet }).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    async fn get_vote(db: &Database, election_id: ElectionId, wallet: &WalletAddress) -> Vote {
        Coll::<Vote>::from_db(db)
            .find_one(
                doc! {"election_id": election_id, "voter_wallet": wallet.as_str()},
                None,
            )
            .await
            .unwrap()
            .unwrap()
    }

    async fn assert_no_votes(db: &Database) {
        let count = Coll::<Vote>::from_db(db)
            .count_documents(None, None)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    fn wallet(n: u8) -> WalletAddress {
        format!("0x{n:040x}").parse().unwrap()
    }
}
