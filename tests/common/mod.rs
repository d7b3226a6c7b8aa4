//! Shared helpers for integration tests
#![allow(dead_code)]

use std::time::Duration;

use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::{X509NameBuilder, X509};

use control_relay::{CancelScope, ConnectionStatus, PipeReader, RelayService};

/// Generate an ephemeral self-signed server identity.
pub fn self_signed_identity() -> (X509, PKey<Private>) {
    let rsa = Rsa::generate(2048).unwrap();
    let key = PKey::from_rsa(rsa).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, "relay-test").unwrap();
    let name = name.build();

    let serial = {
        let mut bn = BigNum::new().unwrap();
        bn.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();
        bn.to_asn1_integer().unwrap()
    };

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(1).unwrap())
        .unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();

    (builder.build(), key)
}

/// Poll until the service reaches `want`, panicking after five seconds.
pub async fn wait_for_status(service: &RelayService, want: ConnectionStatus) {
    let reached = tokio::time::timeout(Duration::from_secs(5), async {
        while service.status() != want {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(
        reached.is_ok(),
        "service never reached {want}, still {}",
        service.status()
    );
}

/// Read from `reader` until exactly `n` bytes have been collected.
pub async fn read_exactly(reader: &PipeReader, n: usize) -> Vec<u8> {
    let never = CancelScope::never();
    let collected = tokio::time::timeout(Duration::from_secs(5), async {
        let mut collected = Vec::with_capacity(n);
        while collected.len() < n {
            let read = reader.read(&never).await;
            let take = read.data.len().min(n - collected.len());
            collected.extend_from_slice(&read.data[..take]);
            reader.advance(take);
            if read.is_completed && take == 0 {
                break;
            }
        }
        collected
    })
    .await
    .expect("timed out collecting bytes");
    assert_eq!(collected.len(), n, "pipe completed short of expected bytes");
    collected
}
