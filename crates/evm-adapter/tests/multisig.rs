mod common;

use common::*;
use evm_adapter::{AdapterError, TransferRequest, TxStatus};

async fn build(h: &Harness, account_id: &str) -> evm_adapter::RawTransaction {
    h.client.set_balance(&addr(1), eth("1"));
    h.adapter
        .create_transaction(
            APP,
            WALLET,
            account_id,
            &TransferRequest {
                to: addr(9),
                amount: "0.25".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn threshold_not_met_until_required_signatures() {
    let h = Harness::new();
    h.multisig_account("treasury", 1, &[2, 3], 2);
    let mut tx = build(&h, "treasury").await;

    h.adapter.sign_transaction(APP, WALLET, "treasury", &mut tx, &password()).unwrap();
    assert_eq!(tx.signatures[0].signer, addr(1));

    let err = h.adapter.verify_transaction(APP, WALLET, "treasury", &mut tx).unwrap_err();
    assert_eq!(err, AdapterError::ThresholdNotMet { required: 2, present: 1 });
    assert_eq!(tx.status(), TxStatus::Signed);
    assert_eq!(tx.signatures.len(), 1);

    h.adapter.sign_transaction(APP, WALLET, "treasury", &mut tx, &password()).unwrap();
    assert_eq!(tx.signatures[1].signer, addr(2));

    // Exactly `required` valid signatures verify.
    h.adapter.verify_transaction(APP, WALLET, "treasury", &mut tx).unwrap();
    assert_eq!(tx.status(), TxStatus::Verified);

    h.adapter.submit_transaction(APP, WALLET, "treasury", &mut tx).await.unwrap();
    assert_eq!(h.client.broadcasts().len(), 1);
}

#[tokio::test]
async fn signing_runs_out_of_eligible_signers() {
    let h = Harness::new();
    h.single_account("alice", &[1]);
    let mut tx = build(&h, "alice").await;

    h.adapter.sign_transaction(APP, WALLET, "alice", &mut tx, &password()).unwrap();
    let err = h
        .adapter
        .sign_transaction(APP, WALLET, "alice", &mut tx, &password())
        .unwrap_err();
    assert!(matches!(err, AdapterError::InvalidState { operation: "sign", .. }));
    assert_eq!(tx.signatures.len(), 1);
}

#[tokio::test]
async fn forged_signer_claim_is_invalid() {
    let h = Harness::new();
    h.multisig_account("treasury", 1, &[2], 2);
    let mut tx = build(&h, "treasury").await;
    h.adapter.sign_transaction(APP, WALLET, "treasury", &mut tx, &password()).unwrap();
    h.adapter.sign_transaction(APP, WALLET, "treasury", &mut tx, &password()).unwrap();

    // Relabel the owner's signature as coming from someone else.
    tx.signatures[1].signer = addr(3);
    let err = h.adapter.verify_transaction(APP, WALLET, "treasury", &mut tx).unwrap_err();
    assert!(matches!(err, AdapterError::SignatureInvalid(_)));
    assert_eq!(tx.status(), TxStatus::Signed);
    assert_eq!(tx.signatures.len(), 2);
}

#[tokio::test]
async fn duplicate_signatures_do_not_count_twice() {
    let h = Harness::new();
    h.multisig_account("treasury", 1, &[2], 2);
    let mut tx = build(&h, "treasury").await;
    h.adapter.sign_transaction(APP, WALLET, "treasury", &mut tx, &password()).unwrap();

    let copy = tx.signatures[0].clone();
    tx.signatures.push(copy);
    let err = h.adapter.verify_transaction(APP, WALLET, "treasury", &mut tx).unwrap_err();
    assert!(matches!(err, AdapterError::SignatureInvalid(msg) if msg.contains("duplicate")));
}

#[tokio::test]
async fn tampered_payload_fails_verification() {
    let h = Harness::new();
    h.single_account("alice", &[1]);
    let mut tx = build(&h, "alice").await;
    h.adapter.sign_transaction(APP, WALLET, "alice", &mut tx, &password()).unwrap();

    tx.tx.value = eth("0.9");
    let err = h.adapter.verify_transaction(APP, WALLET, "alice", &mut tx).unwrap_err();
    assert!(matches!(err, AdapterError::SignatureInvalid(_)));
}

#[tokio::test]
async fn corrupted_signature_fails_verification() {
    let h = Harness::new();
    h.single_account("alice", &[1]);
    let mut tx = build(&h, "alice").await;
    h.adapter.sign_transaction(APP, WALLET, "alice", &mut tx, &password()).unwrap();

    tx.signatures[0].signature[10] ^= 0xff;
    let err = h.adapter.verify_transaction(APP, WALLET, "alice", &mut tx).unwrap_err();
    assert!(matches!(err, AdapterError::SignatureInvalid(_)));
}

#[tokio::test]
async fn threshold_comes_from_the_stored_account() {
    let h = Harness::new();
    let mut account = h.multisig_account("treasury", 1, &[2, 3], 2);
    let mut tx = build(&h, "treasury").await;
    h.adapter.sign_transaction(APP, WALLET, "treasury", &mut tx, &password()).unwrap();
    h.adapter.sign_transaction(APP, WALLET, "treasury", &mut tx, &password()).unwrap();

    // The account now needs all three co-signers; the transaction's
    // snapshot still says two.
    account.required = 3;
    h.wallets.insert(APP, account).unwrap();
    assert_eq!(tx.account().required, 2);

    let err = h.adapter.verify_transaction(APP, WALLET, "treasury", &mut tx).unwrap_err();
    assert_eq!(err, AdapterError::ThresholdNotMet { required: 3, present: 2 });
    let err = h.adapter.submit_transaction(APP, WALLET, "treasury", &mut tx).await.unwrap_err();
    assert!(matches!(err, AdapterError::InvalidState { operation: "submit", .. }));
    assert!(h.client.broadcasts().is_empty());

    h.adapter.sign_transaction(APP, WALLET, "treasury", &mut tx, &password()).unwrap();
    h.adapter.verify_transaction(APP, WALLET, "treasury", &mut tx).unwrap();
    assert_eq!(tx.status(), TxStatus::Verified);
}

#[tokio::test]
async fn removed_owner_no_longer_counts() {
    let h = Harness::new();
    let mut account = h.multisig_account("treasury", 1, &[2, 3], 2);
    let mut tx = build(&h, "treasury").await;
    h.adapter.sign_transaction(APP, WALLET, "treasury", &mut tx, &password()).unwrap();
    h.adapter.sign_transaction(APP, WALLET, "treasury", &mut tx, &password()).unwrap();
    assert_eq!(tx.signatures[1].signer, addr(2));

    account.owners = vec![addr(3)];
    h.wallets.insert(APP, account).unwrap();

    let err = h.adapter.verify_transaction(APP, WALLET, "treasury", &mut tx).unwrap_err();
    assert!(matches!(err, AdapterError::SignatureInvalid(msg) if msg.contains("may not sign")));
    assert_eq!(tx.status(), TxStatus::Signed);
}

#[tokio::test]
async fn sender_must_remain_an_account_address() {
    let h = Harness::new();
    let mut account = h.single_account("alice", &[1]);
    let mut tx = build(&h, "alice").await;
    h.adapter.sign_transaction(APP, WALLET, "alice", &mut tx, &password()).unwrap();
    h.adapter.verify_transaction(APP, WALLET, "alice", &mut tx).unwrap();

    account.addresses = vec![addr(4)];
    h.wallets.insert(APP, account).unwrap();

    let err = h.adapter.submit_transaction(APP, WALLET, "alice", &mut tx).await.unwrap_err();
    assert!(matches!(err, AdapterError::AccountNotFound(msg) if msg.contains("not an address")));
    assert_eq!(tx.status(), TxStatus::Verified);
    assert!(h.client.broadcasts().is_empty());
}
