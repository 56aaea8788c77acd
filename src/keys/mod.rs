//! Providers of signing keys.
//!
//! A signing run needs two keys: the zone signing key (ZSK) for the data
//! of the zone and the key signing key (KSK) for the DNSKEY RRset. Where
//! these keys live is hidden behind [`KeyProvider`]. The keys themselves
//! only offer what the signer needs through [`SigningKey`]: their algorithm,
//! their public key in DNSKEY format, and a way to sign data.
//!
//! There are two providers: [`pkcs11::Pkcs11Provider`] keeps the keys in a
//! PKCS#11 token, [`file::FileProvider`] in PEM files.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use domain::base::iana::SecAlg;
use domain::rdata::Dnskey;

pub mod file;
pub mod pkcs11;

//------------ SignAlgorithm -------------------------------------------------

/// The supported DNSSEC signing algorithms.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignAlgorithm {
    /// RSA/SHA-256, algorithm 8.
    RsaSha256,

    /// ECDSA with curve P-256 and SHA-256, algorithm 13.
    EcdsaP256Sha256,
}

impl SignAlgorithm {
    /// Returns the algorithm used in DNSKEY and RRSIG records.
    pub fn sec_alg(self) -> SecAlg {
        match self {
            SignAlgorithm::RsaSha256 => SecAlg::RSASHA256,
            SignAlgorithm::EcdsaP256Sha256 => SecAlg::ECDSAP256SHA256,
        }
    }

    pub fn from_sec_alg(alg: SecAlg) -> Option<Self> {
        match alg {
            SecAlg::RSASHA256 => Some(SignAlgorithm::RsaSha256),
            SecAlg::ECDSAP256SHA256 => Some(SignAlgorithm::EcdsaP256Sha256),
            _ => None,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            SignAlgorithm::RsaSha256 => "RSASHA256",
            SignAlgorithm::EcdsaP256Sha256 => "ECDSAP256SHA256",
        }
    }
}

impl FromStr for SignAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rsa" | "rsa_sha256" => Ok(SignAlgorithm::RsaSha256),
            "ecdsa" | "ecdsa_p256" | "ecdsa_p256_sha256" => Ok(SignAlgorithm::EcdsaP256Sha256),
            _ => Err(format!(
                "unknown signing algorithm '{s}', expected one of rsa, rsa_sha256, \
                 ecdsa, ecdsa_p256, ecdsa_p256_sha256"
            )),
        }
    }
}

impl fmt::Display for SignAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

//------------ KeyRole -------------------------------------------------------

/// The DNSKEY flags of a zone signing key: only the Zone Key bit.
pub const ZSK_FLAGS: u16 = 256;

/// The DNSKEY flags of a key signing key: Zone Key and Secure Entry Point.
pub const KSK_FLAGS: u16 = 257;

/// Whether a key signs the zone or the keys.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyRole {
    Zsk,
    Ksk,
}

impl KeyRole {
    /// Returns the role of a DNSKEY record.
    ///
    /// Only the exact flag values of [`ZSK_FLAGS`] and [`KSK_FLAGS`] count.
    /// Revoked keys or keys with other flags set have no role.
    pub fn of(dnskey: &Dnskey<Bytes>) -> Option<Self> {
        match dnskey.flags() {
            ZSK_FLAGS => Some(KeyRole::Zsk),
            KSK_FLAGS => Some(KeyRole::Ksk),
            _ => None,
        }
    }

    /// The flags of a DNSKEY record for a key of this role.
    pub fn flags(self) -> u16 {
        match self {
            KeyRole::Zsk => ZSK_FLAGS,
            KeyRole::Ksk => KSK_FLAGS,
        }
    }

    /// The RSA modulus length in bits for new keys.
    pub fn rsa_bits(self) -> u32 {
        match self {
            KeyRole::Zsk => 1024,
            KeyRole::Ksk => 2048,
        }
    }

    /// The identifier used to tell keys of this role apart.
    pub fn id(self) -> &'static str {
        match self {
            KeyRole::Zsk => "zsk",
            KeyRole::Ksk => "ksk",
        }
    }
}

//------------ SigningKey ----------------------------------------------------

/// A key that can sign.
pub trait SigningKey {
    fn algorithm(&self) -> SignAlgorithm;

    /// Returns the public key in the format of the DNSKEY record.
    ///
    /// This is the format of [RFC 3110] for RSA and of [RFC 6605] for
    /// ECDSA.
    ///
    /// [RFC 3110]: https://www.rfc-editor.org/rfc/rfc3110#section-2
    /// [RFC 6605]: https://www.rfc-editor.org/rfc/rfc6605#section-4
    fn public_key(&self) -> Result<Vec<u8>, KeyError>;

    /// Signs the data.
    ///
    /// The data is hashed by the key. The signature is returned in the
    /// format of the RRSIG record.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, KeyError>;

    /// Returns the DNSKEY record data for this key.
    fn dnskey(&self, role: KeyRole) -> Result<Dnskey<Bytes>, KeyError> {
        Dnskey::new(
            role.flags(),
            3,
            self.algorithm().sec_alg(),
            Bytes::from(self.public_key()?),
        )
        .map_err(|err| KeyError::InvalidPublicKey(err.to_string()))
    }
}

//------------ KeyPair -------------------------------------------------------

/// The two keys of a signing run.
pub struct KeyPair<K> {
    pub zsk: K,
    pub ksk: K,
}

//------------ KeyProvider ---------------------------------------------------

/// A source of signing keys.
///
/// Providers hold on to native resources such as token sessions. These
/// are given back by [`KeyProvider::end`], which implementations also
/// call when dropped.
pub trait KeyProvider {
    type Key: SigningKey;

    /// A short name of the provider for informational output.
    fn kind(&self) -> &'static str;

    /// Returns the key pair, creating new keys if so configured.
    fn get_keys(&mut self) -> Result<KeyPair<Self::Key>, KeyError>;

    /// Removes all keys of the provider.
    fn destroy_all_keys(&mut self) -> Result<(), KeyError>;

    /// Releases all resources.
    ///
    /// Calling this more than once is harmless.
    fn end(&mut self) -> Result<(), KeyError>;
}

//------------ RSA public keys -----------------------------------------------

/// The maximum length of an RSA exponent we accept.
const MAX_EXPONENT_LEN: usize = 8;

/// Encodes an RSA public key as described in RFC 3110.
///
/// From [RFC 3110, section 2]:
///
/// > The public key exponent is a variable length unsigned integer. Its
/// > length in octets is represented as one octet if it is in the range of
/// > 1 to 255 and by a zero octet followed by a two octet unsigned length
/// > if it is longer than 255 bytes. [...] Leading zero octets are
/// > prohibited in the exponent and modulus.
///
/// [RFC 3110, section 2]: https://www.rfc-editor.org/rfc/rfc3110#section-2
pub fn encode_rsa_public_key(exponent: &[u8], modulus: &[u8]) -> Result<Vec<u8>, KeyError> {
    let exponent = strip_leading_zeros(exponent);
    let modulus = strip_leading_zeros(modulus);
    if exponent.is_empty() || modulus.is_empty() {
        return Err(KeyError::InvalidPublicKey("empty RSA exponent or modulus".into()));
    }
    if exponent.len() > MAX_EXPONENT_LEN {
        return Err(KeyError::ExponentTooLong(exponent.len()));
    }
    let mut res = Vec::with_capacity(1 + exponent.len() + modulus.len());
    // The exponent is at most eight octets, so one length octet will do.
    res.push(exponent.len() as u8);
    res.extend_from_slice(exponent);
    res.extend_from_slice(modulus);
    Ok(res)
}

/// Decodes an RSA public key in RFC 3110 format into exponent and modulus.
pub fn decode_rsa_public_key(data: &[u8]) -> Result<(&[u8], &[u8]), KeyError> {
    let (len, rest) = match data {
        [0, hi, lo, rest @ ..] => (usize::from(u16::from_be_bytes([*hi, *lo])), rest),
        [len, rest @ ..] => (usize::from(*len), rest),
        [] => return Err(KeyError::InvalidPublicKey("empty RSA public key".into())),
    };
    if len > MAX_EXPONENT_LEN {
        return Err(KeyError::ExponentTooLong(len));
    }
    if len == 0 || rest.len() <= len {
        return Err(KeyError::InvalidPublicKey("truncated RSA public key".into()));
    }
    Ok(rest.split_at(len))
}

fn strip_leading_zeros(mut data: &[u8]) -> &[u8] {
    while let [0, rest @ ..] = data {
        data = rest;
    }
    data
}

//------------ ECDSA public keys ---------------------------------------------

/// The length of the DNSKEY encoding of a P-256 public key.
pub const P256_PUBLIC_KEY_LEN: usize = 64;

/// Converts an uncompressed P-256 point into the DNSKEY format.
///
/// The point is either given as is, i.e., `04 || X || Y`, or wrapped in a
/// DER OCTET STRING as PKCS#11 tokens report `CKA_EC_POINT`.
pub fn encode_ecdsa_public_key(point: &[u8]) -> Result<Vec<u8>, KeyError> {
    let point = match point {
        [0x04, 0x41, rest @ ..] if rest.len() == P256_PUBLIC_KEY_LEN + 1 => rest,
        _ => point,
    };
    match point {
        [0x04, xy @ ..] if xy.len() == P256_PUBLIC_KEY_LEN => Ok(xy.to_vec()),
        _ => Err(KeyError::InvalidPublicKey(format!(
            "invalid P-256 public point of {} octets",
            point.len()
        ))),
    }
}

//------------ KeyError ------------------------------------------------------

/// An error happened while dealing with keys.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KeyError {
    /// The PKCS#11 library reported an error.
    Pkcs11 { operation: &'static str, message: String },

    /// The token holds an unexpected number of key objects.
    WrongKeyCount { label: String, count: usize },

    /// There are no keys and none are to be created.
    NoKeys { label: String },

    /// A key object lacks a required attribute.
    MissingAttribute(&'static str),

    /// The key uses an algorithm other than the configured one.
    AlgorithmMismatch {
        expected: SignAlgorithm,
        found: String,
    },

    /// A public key is malformed.
    InvalidPublicKey(String),

    /// An RSA exponent is longer than we support.
    ExponentTooLong(usize),

    /// A PEM file could not be used.
    Pem(String),

    /// The crypto library failed.
    Crypto(String),
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::Pkcs11 { operation, message } => {
                write!(f, "PKCS#11 {operation} failed: {message}")
            }
            KeyError::WrongKeyCount { label, count } => write!(
                f,
                "found {count} key objects with label '{label}' where 4 were expected; \
                 the keys are inconsistent, remove them with reset-pkcs11-keys \
                 or recreate them with --create-keys"
            ),
            KeyError::NoKeys { label } => write!(
                f,
                "no keys with label '{label}' found, use --create-keys to create them"
            ),
            KeyError::MissingAttribute(attr) => {
                write!(f, "key object is missing the {attr} attribute")
            }
            KeyError::AlgorithmMismatch { expected, found } => {
                write!(f, "key is of type {found} but {expected} was requested")
            }
            KeyError::InvalidPublicKey(msg) => write!(f, "invalid public key: {msg}"),
            KeyError::ExponentTooLong(len) => write!(
                f,
                "RSA exponent of {len} octets is longer than the supported {MAX_EXPONENT_LEN} octets"
            ),
            KeyError::Pem(msg) => write!(f, "invalid key file: {msg}"),
            KeyError::Crypto(msg) => write!(f, "crypto error: {msg}"),
        }
    }
}

impl std::error::Error for KeyError {}

impl From<openssl::error::ErrorStack> for KeyError {
    fn from(err: openssl::error::ErrorStack) -> Self {
        KeyError::Crypto(err.to_string())
    }
}

//============ Tests =========================================================
