use aws_sdk_sns::Client as SnsClient;
use chrono::Utc;
use mongodb::{bson::doc, options::ReplaceOptions, Client};
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    ledger::LedgerClient,
    model::{
        api::{Code, CompleteVerificationRequest, StartVerificationRequest, VoterDescription},
        db::{Credential, Election, NewCredential, NewVoter, Voter},
        mongodb::{is_duplicate_key_error, is_duplicate_key_on, u32_id_filter, Coll},
    },
    roster::IdentityRoster,
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![start_verification, complete_verification]
}

/// Start identity verification: check the identity is on the roster, issue a
/// challenge credential, and text the code to the phone number on file.
///
/// Requesting a new challenge invalidates any outstanding one for the same
/// identity.
#[cfg_attr(test, allow(unused_variables))]
#[post("/verify/start", data = "<request>", format = "json")]
pub async fn start_verification(
    request: Json<StartVerificationRequest>,
    roster: &State<IdentityRoster>,
    credentials: Coll<NewCredential>,
    config: &State<Config>,
    sender: &State<SnsClient>,
) -> Result<()> {
    let phone = roster
        .phone_number(&request.national_id)
        .ok_or_else(|| Error::not_found(format!("Identity {}", request.national_id.redacted())))?;

    let code = Code::random();
    let credential = NewCredential::new(request.national_id.hmac(config), code, config);
    let filter = doc! {
        "identity_hmac": &credential.identity_hmac,
    };
    let options = ReplaceOptions::builder().upsert(true).build();
    credentials
        .replace_one(filter, &credential, options)
        .await?;

    info!(
        "Issued verification challenge for identity {}",
        request.national_id.redacted()
    );

    // Delivery failure leaves the credential in place, so the caller can
    // retry the send without restarting.
    #[cfg(not(test))]
    sender
        .publish()
        .phone_number(phone.to_string())
        .message(format!("Your voter verification code: {code}"))
        .send()
        .await
        .map_err(|_| Error::External("Failed to send verification SMS".to_string()))?;

    Ok(())
}

/// Complete identity verification: check the challenge code and register the
/// identity-wallet binding.
///
/// All checks and writes happen in one transaction, so a failure anywhere
/// (including the ledger mirror) leaves no partial registration behind.
#[allow(clippy::too_many_arguments)]
#[post("/verify/complete", data = "<request>", format = "json")]
pub async fn complete_verification(
    request: Json<CompleteVerificationRequest>,
    credentials: Coll<Credential>,
    voters: Coll<Voter>,
    new_voters: Coll<NewVoter>,
    elections: Coll<Election>,
    ledger: &State<LedgerClient>,
    config: &State<Config>,
    db_client: &State<Client>,
) -> Result<Json<VoterDescription>> {
    let request = request.0;
    let identity_hmac = request.national_id.hmac(config);

    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    // Check the challenge. A missing credential and a wrong code get the
    // same response, so this endpoint cannot be used to probe which
    // identities have verification in progress.
    let credential_filter = doc! {
        "identity_hmac": &identity_hmac,
    };
    let credential = credentials
        .find_one_with_session(credential_filter, None, &mut session)
        .await?
        .ok_or_else(|| Error::Validation("Invalid verification code".to_string()))?;

    if credential.is_expired(Utc::now()) {
        // Reclaim it now rather than waiting for the TTL sweep; this delete
        // must survive the failure, so commit before returning.
        credentials
            .delete_one_with_session(credential.id.as_doc(), None, &mut session)
            .await?;
        session.commit_transaction().await?;
        return Err(Error::Validation(
            "Verification code expired. Please request a new one".to_string(),
        ));
    }

    if credential.code != request.code {
        return Err(Error::Validation("Invalid verification code".to_string()));
    }

    // Check the bijection, identity before wallet.
    let with_identity = doc! {
        "identity_hmac": &identity_hmac,
    };
    if voters
        .find_one_with_session(with_identity, None, &mut session)
        .await?
        .is_some()
    {
        return Err(Error::Conflict(
            "This identity is already registered".to_string(),
        ));
    }
    let with_wallet = doc! {
        "wallet_address": request.wallet_address.as_str(),
    };
    if voters
        .find_one_with_session(with_wallet, None, &mut session)
        .await?
        .is_some()
    {
        return Err(Error::Conflict(
            "This wallet is already registered".to_string(),
        ));
    }

    // The ledger mirror registers per election, so the election must exist.
    elections
        .find_one_with_session(u32_id_filter(request.election_id), None, &mut session)
        .await?
        .ok_or_else(|| {
            Error::not_found(format!("Election with ID '{}'", request.election_id))
        })?;

    // Register. A duplicate key here means we lost a race with a concurrent
    // registration; report it as the equivalent pre-check conflict.
    let voter = NewVoter::new(identity_hmac, request.wallet_address);
    if let Err(err) = new_voters
        .insert_one_with_session(&voter, None, &mut session)
        .await
    {
        return Err(if is_duplicate_key_on(&err, "identity_hmac") {
            Error::Conflict("This identity is already registered".to_string())
        } else if is_duplicate_key_error(&err) {
            Error::Conflict("This wallet is already registered".to_string())
        } else {
            err.into()
        });
    }

    // The challenge is consumed.
    credentials
        .delete_one_with_session(credential.id.as_doc(), None, &mut session)
        .await?;

    // Mirror the registration. Failure abandons the transaction: the local
    // registration rolls back and the credential remains usable for another
    // attempt.
    let ledger_txid = ledger
        .register_voter(request.election_id, &voter.wallet_address)
        .await
        .map_err(|err| Error::External(format!("Ledger write failed: {err}")))?;

    session.commit_transaction().await?;

    info!(
        "Registered identity {} with wallet {}",
        request.national_id.redacted(),
        voter.wallet_address
    );

    Ok(Json(VoterDescription::describe(&voter, ledger_txid)))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use mongodb::{bson::DateTime as BsonDateTime, Database};
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json,
    };

    use crate::model::{api::NationalId, common::wallet::WalletAddress};

    use super::*;

    #[backend_test]
    async fn start_issues_credential(client: Client, credentials: Coll<Credential>) {
        start(&client, &NationalId::example()).await;

        let credential = credentials
            .find_one(doc! {"identity_hmac": NationalId::example_hmac(&client)}, None)
            .await
            .unwrap()
            .unwrap();
        assert!(!credential.is_expired(Utc::now()));
        assert_eq!(credential.code.to_string().len(), 6);
    }

    #[backend_test]
    async fn start_rejects_unknown_identities(client: Client, credentials: Coll<Credential>) {
        let response = client
            .post(uri!(start_verification))
            .header(ContentType::JSON)
            .body(
                serde_json::to_string(&StartVerificationRequest {
                    national_id: NationalId::unlisted_example(),
                })
                .unwrap(),
            )
            .dispatch()
            .await;

        assert_eq!(Status::NotFound, response.status());
        let count = credentials.count_documents(None, None).await.unwrap();
        assert_eq!(count, 0);
    }

    #[backend_test]
    async fn restart_replaces_the_challenge(client: Client, credentials: Coll<Credential>) {
        start(&client, &NationalId::example()).await;
        let first = issued_credential(&client, &credentials).await;

        start(&client, &NationalId::example()).await;
        let second = issued_credential(&client, &credentials).await;

        // Still exactly one credential for the identity, and it's the newer one.
        let count = credentials.count_documents(None, None).await.unwrap();
        assert_eq!(count, 1);
        assert!(second.issued_at >= first.issued_at);
    }

    #[backend_test]
    async fn complete_registers_voter(client: Client, db: Database) {
        insert_election(&db).await;
        start(&client, &NationalId::example()).await;
        let credential =
            issued_credential(&client, &Coll::<Credential>::from_db(&db)).await;

        let response = complete(
            &client,
            &NationalId::example(),
            credential.code,
            WalletAddress::example(),
            1,
        )
        .await;
        assert_eq!(Status::Ok, response.0);

        let description: VoterDescription = serde_json::from_str(&response.1).unwrap();
        assert_eq!(description.identity_digest, NationalId::example_hmac(&client));
        assert_eq!(description.wallet_address, WalletAddress::example());
        // No ledger configured in tests, so no transaction ID.
        assert_eq!(description.ledger_txid, None);

        // The voter is stored and the credential is consumed.
        let voter = Coll::<Voter>::from_db(&db)
            .find_one(doc! {"wallet_address": WalletAddress::example().as_str()}, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(voter.identity_hmac, NationalId::example_hmac(&client));
        let remaining = Coll::<Credential>::from_db(&db)
            .count_documents(None, None)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[backend_test]
    async fn complete_rejects_wrong_codes(client: Client, db: Database) {
        insert_election(&db).await;
        start(&client, &NationalId::example()).await;
        let credential =
            issued_credential(&client, &Coll::<Credential>::from_db(&db)).await;

        let response = complete(
            &client,
            &NationalId::example(),
            Code::mismatch_of(&credential.code),
            WalletAddress::example(),
            1,
        )
        .await;
        assert_eq!(Status::BadRequest, response.0);

        // Nothing was consumed and nobody was registered.
        let voters = Coll::<Voter>::from_db(&db)
            .count_documents(None, None)
            .await
            .unwrap();
        assert_eq!(voters, 0);
        let credentials = Coll::<Credential>::from_db(&db)
            .count_documents(None, None)
            .await
            .unwrap();
        assert_eq!(credentials, 1);
    }

    #[backend_test]
    async fn complete_without_start_fails(client: Client, db: Database) {
        insert_election(&db).await;

        let response = complete(
            &client,
            &NationalId::example(),
            "123456".parse().unwrap(),
            WalletAddress::example(),
            1,
        )
        .await;
        assert_eq!(Status::BadRequest, response.0);
    }

    #[backend_test]
    async fn expired_codes_are_rejected_and_reclaimed(client: Client, db: Database) {
        insert_election(&db).await;
        start(&client, &NationalId::example()).await;
        let credential =
            issued_credential(&client, &Coll::<Credential>::from_db(&db)).await;

        // Age the credential past its deadline.
        let expired = BsonDateTime::from_chrono(Utc::now() - Duration::minutes(10));
        Coll::<Credential>::from_db(&db)
            .update_one(
                credential.id.as_doc(),
                doc! {"$set": {"expires_at": expired}},
                None,
            )
            .await
            .unwrap();

        let response = complete(
            &client,
            &NationalId::example(),
            credential.code,
            WalletAddress::example(),
            1,
        )
        .await;
        assert_eq!(Status::BadRequest, response.0);
        assert!(response.1.contains("expired"));

        // The dead credential was deleted, not just refused.
        let remaining = Coll::<Credential>::from_db(&db)
            .count_documents(None, None)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[backend_test]
    async fn unknown_election_keeps_the_credential(client: Client, db: Database) {
        insert_election(&db).await;
        start(&client, &NationalId::example()).await;
        let credential =
            issued_credential(&client, &Coll::<Credential>::from_db(&db)).await;

        let response = complete(
            &client,
            &NationalId::example(),
            credential.code,
            WalletAddress::example(),
            99,
        )
        .await;
        assert_eq!(Status::NotFound, response.0);

        // The same credential still works against a real election.
        let response = complete(
            &client,
            &NationalId::example(),
            credential.code,
            WalletAddress::example(),
            1,
        )
        .await;
        assert_eq!(Status::Ok, response.0);
    }

    #[backend_test]
    async fn identity_and_wallet_bind_once(client: Client, db: Database) {
        insert_election(&db).await;

        // Register the first identity and wallet.
        start(&client, &NationalId::example()).await;
        let credential =
            issued_credential(&client, &Coll::<Credential>::from_db(&db)).await;
        let response = complete(
            &client,
            &NationalId::example(),
            credential.code,
            WalletAddress::example(),
            1,
        )
        .await;
        assert_eq!(Status::Ok, response.0);

        // The same identity cannot bind a second wallet.
        start(&client, &NationalId::example()).await;
        let credential =
            issued_credential(&client, &Coll::<Credential>::from_db(&db)).await;
        let response = complete(
            &client,
            &NationalId::example(),
            credential.code,
            WalletAddress::example2(),
            1,
        )
        .await;
        assert_eq!(Status::Conflict, response.0);
        assert!(response.1.contains("identity"));

        // A second identity cannot claim the taken wallet.
        start(&client, &NationalId::example2()).await;
        let config = client.rocket().state::<Config>().unwrap();
        let credential = Coll::<Credential>::from_db(&db)
            .find_one(
                doc! {"identity_hmac": NationalId::example2().hmac(config)},
                None,
            )
            .await
            .unwrap()
            .unwrap();
        let response = complete(
            &client,
            &NationalId::example2(),
            credential.code,
            WalletAddress::example(),
            1,
        )
        .await;
        assert_eq!(Status::Conflict, response.0);
        assert!(response.1.contains("wallet"));

        // Exactly one registration went through.
        let voters = Coll::<Voter>::from_db(&db)
            .count_documents(None, None)
            .await
            .unwrap();
        assert_eq!(voters, 1);
    }

    async fn insert_election(db: &Database) {
        Coll::<Election>::from_db(db)
            .insert_one(Election::active_example(1), None)
            .await
            .unwrap();
    }

    async fn start(client: &Client, national_id: &NationalId) {
        let response = client
            .post(uri!(start_verification))
            .header(ContentType::JSON)
            .body(
                serde_json::to_string(&StartVerificationRequest {
                    national_id: national_id.clone(),
                })
                .unwrap(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
    }

    async fn complete(
        client: &Client,
        national_id: &NationalId,
        code: Code,
        wallet_address: WalletAddress,
        election_id: u32,
    ) -> (Status, String) {
        let response = client
            .post(uri!(complete_verification))
            .header(ContentType::JSON)
            .body(
                serde_json::to_string(&CompleteVerificationRequest {
                    national_id: national_id.clone(),
                    code,
                    wallet_address,
                    election_id,
                })
                .unwrap(),
            )
            .dispatch()
            .await;
        let status = response.status();
        let body = response.into_string().await.unwrap_or_default();
        (status, body)
    }

    async fn issued_credential(client: &Client, credentials: &Coll<Credential>) -> Credential {
        credentials
            .find_one(doc! {"identity_hmac": NationalId::example_hmac(client)}, None)
            .await
            .unwrap()
            .unwrap()
    }
}
