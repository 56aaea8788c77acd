//! Cryptographic primitives.
//!
//! Signatures are created by the key providers. Everything else, i.e.,
//! checking signatures and computing digests, happens here using *ring*.

use std::fmt;

use bytes::Bytes;
use domain::base::iana::{DigestAlg, SecAlg};
use domain::base::name::ToName;
use domain::base::rdata::{ComposeRecordData, LongRecordData};
use domain::dep::octseq::builder::infallible;
use domain::rdata::{Dnskey, Ds};
use ring::{digest, signature};

use crate::keys::{decode_rsa_public_key, SignAlgorithm, P256_PUBLIC_KEY_LEN};
use crate::zone::StoredName;

//------------ Signatures ----------------------------------------------------

/// Checks a signature made by the key of a DNSKEY record.
///
/// The signature must be in the format of the RRSIG record.
pub fn verify_signature(
    dnskey: &Dnskey<Bytes>,
    message: &[u8],
    sig: &[u8],
) -> Result<(), VerifyError> {
    let public_key = dnskey.public_key().as_ref();
    match SignAlgorithm::from_sec_alg(dnskey.algorithm()) {
        Some(SignAlgorithm::RsaSha256) => {
            let (e, n) = decode_rsa_public_key(public_key)
                .map_err(|err| VerifyError::InvalidKey(err.to_string()))?;
            let key = signature::RsaPublicKeyComponents {
                n: strip_leading_zeros(n),
                e: strip_leading_zeros(e),
            };
            key.verify(
                &signature::RSA_PKCS1_1024_8192_SHA256_FOR_LEGACY_USE_ONLY,
                message,
                sig,
            )
            .map_err(|_| VerifyError::BadSignature)
        }
        Some(SignAlgorithm::EcdsaP256Sha256) => {
            if public_key.len() != P256_PUBLIC_KEY_LEN {
                return Err(VerifyError::InvalidKey(format!(
                    "P-256 key of {} octets",
                    public_key.len()
                )));
            }
            // ring wants the uncompressed point with its SEC1 prefix.
            let mut point = Vec::with_capacity(P256_PUBLIC_KEY_LEN + 1);
            point.push(0x04);
            point.extend_from_slice(public_key);
            signature::UnparsedPublicKey::new(&signature::ECDSA_P256_SHA256_FIXED, point)
                .verify(message, sig)
                .map_err(|_| VerifyError::BadSignature)
        }
        None => Err(VerifyError::UnsupportedAlgorithm(dnskey.algorithm())),
    }
}

fn strip_leading_zeros(mut data: &[u8]) -> &[u8] {
    while let [0, rest @ ..] = data {
        data = rest;
    }
    data
}

//------------ Digests -------------------------------------------------------

/// Returns the SHA-256 DS record data for a DNSKEY.
///
/// The digest is taken over the owner name in canonical wire format
/// followed by the DNSKEY RDATA, see [RFC 4034, section 5.1.4].
///
/// [RFC 4034, section 5.1.4]: https://www.rfc-editor.org/rfc/rfc4034#section-5.1.4
pub fn ds_for(owner: &StoredName, dnskey: &Dnskey<Bytes>) -> Result<Ds<Bytes>, LongRecordData> {
    let mut data = Vec::new();
    infallible(owner.compose_canonical(&mut data));
    infallible(dnskey.compose_canonical_rdata(&mut data));
    let digest = digest::digest(&digest::SHA256, &data);
    Ds::new(
        dnskey.key_tag(),
        dnskey.algorithm(),
        DigestAlg::SHA256,
        Bytes::copy_from_slice(digest.as_ref()),
    )
}

//------------ VerifyError ---------------------------------------------------

/// A signature could not be verified.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VerifyError {
    UnsupportedAlgorithm(SecAlg),
    InvalidKey(String),
    BadSignature,
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::UnsupportedAlgorithm(alg) => {
                write!(f, "unsupported algorithm {alg}")
            }
            VerifyError::InvalidKey(msg) => write!(f, "invalid public key: {msg}"),
            VerifyError::BadSignature => f.write_str("signature does not verify"),
        }
    }
}

impl std::error::Error for VerifyError {}

//============ Tests =========================================================
