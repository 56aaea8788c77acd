mod common;

use std::fs;

use regex::Regex;
use tempfile::tempdir;

use common::{assert_success, zonesigner};

const ZONE: &str = include_str!("../test-data/example.com.abcd.zone");

/// Signs the test zone with the given options and verifies the result.
#[track_caller]
fn sign_and_verify(options: &[&str]) {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("example.com.zone"), ZONE).unwrap();

    let mut args = vec![
        "sign",
        "file",
        "-c",
        "-Z",
        "zsk.pem",
        "-K",
        "ksk.pem",
        "-f",
        "example.com.zone",
        "-o",
        "signed.zone",
    ];
    args.extend_from_slice(options);
    let stdout = assert_success(&zonesigner(dir.path(), &args));

    let ds = Regex::new(r"^example\.com\.\t3600\tIN\tDS\t\d+ (RSASHA256|ECDSAP256SHA256) 2 [0-9a-f]{64}\n$").unwrap();
    assert!(ds.is_match(&stdout), "unexpected DS output: {stdout}");

    let signed = fs::read_to_string(dir.path().join("signed.zone")).unwrap();
    assert!(signed.starts_with("example.com.\t3600\tIN\tSOA\t"));

    let stdout = assert_success(&zonesigner(dir.path(), &["verify", "-f", "signed.zone"]));
    assert!(stdout.starts_with("Zone example.com. verified"));
}

#[test]
fn nsec_rsa() {
    sign_and_verify(&[]);
}

#[test]
fn nsec_ecdsa_with_digest() {
    sign_and_verify(&["-a", "ecdsa", "-d", "-Q", "2", "-i"]);
}

#[test]
fn nsec3_ecdsa() {
    sign_and_verify(&["-a", "ecdsa", "-3", "--nsec3-iterations", "5"]);
}

#[test]
fn nsec3_opt_out_rsa_with_digest() {
    sign_and_verify(&["-3", "-x", "--nsec3-salt-value", "-", "-d"]);
}

#[test]
fn usage_errors() {
    let dir = tempdir().unwrap();
    let output = zonesigner(dir.path(), &["sign", "file", "-a", "dsa"]);
    assert_eq!(output.status.code(), Some(2));

    let output = zonesigner(dir.path(), &["verify", "-f", "missing.zone"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR"), "{stderr}");
}
