//! Keys kept in a PKCS#11 token.
//!
//! The keys of a zone are found by their label. Each of the two keys
//! consists of a public and a private key object, marked by the ID `zsk`
//! or `ksk`. A complete set thus consists of exactly four objects.
//!
//! Signing hashes the data locally and only hands the digest to the token,
//! using the raw `CKM_RSA_PKCS` and `CKM_ECDSA` mechanisms.

use std::path::Path;
use std::rc::Rc;

use cryptoki::context::{CInitializeArgs, Pkcs11};
use cryptoki::mechanism::Mechanism;
use cryptoki::object::{Attribute, AttributeType, KeyType, ObjectClass, ObjectHandle};
use cryptoki::session::{Session, UserType};
use cryptoki::types::AuthPin;
use ring::digest;
use tracing::{debug, info, warn};

use crate::env::Env;

use super::{
    encode_ecdsa_public_key, encode_rsa_public_key, KeyError, KeyPair, KeyProvider, KeyRole,
    SignAlgorithm, SigningKey,
};

/// The DER prefix of a PKCS#1 v1.5 DigestInfo for SHA-256.
///
/// See [RFC 8017, section 9.2], note 1.
///
/// [RFC 8017, section 9.2]: https://www.rfc-editor.org/rfc/rfc8017#section-9.2
const SHA256_DIGEST_INFO: [u8; 19] = [
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01,
    0x05, 0x00, 0x04, 0x20,
];

/// The DER encoded OID of curve P-256, used as `CKA_EC_PARAMS`.
const P256_EC_PARAMS: [u8; 10] = [0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07];

/// The length of one of the two integers in a P-256 signature.
const P256_INT_LEN: usize = 32;

//------------ Pkcs11Provider ------------------------------------------------

/// A key provider using a PKCS#11 token.
pub struct Pkcs11Provider {
    session: Option<Rc<Session>>,
    label: String,
    algorithm: SignAlgorithm,
    create_keys: bool,
}

impl Pkcs11Provider {
    /// Opens a session with the token in the first slot and logs in.
    ///
    /// The first slot is used even if it holds no token, in which case
    /// opening the session fails.
    pub fn open(
        env: &impl Env,
        lib: &Path,
        pin: &str,
        label: &str,
        algorithm: SignAlgorithm,
        create_keys: bool,
    ) -> Result<Self, KeyError> {
        let lib = env.in_cwd(&lib);
        let mut ctx = Pkcs11::new(lib.as_ref()).map_err(p11_err("loading library"))?;
        ctx.initialize(CInitializeArgs::OsThreads)
            .map_err(p11_err("C_Initialize"))?;
        let slot = first_slot(ctx.get_all_slots().map_err(p11_err("C_GetSlotList"))?)?;
        let session = ctx
            .open_rw_session(slot)
            .map_err(p11_err("C_OpenSession"))?;
        session
            .login(UserType::User, Some(&AuthPin::new(pin.into())))
            .map_err(p11_err("C_Login"))?;
        debug!("Logged into PKCS#11 token");
        Ok(Pkcs11Provider {
            session: Some(Rc::new(session)),
            label: label.into(),
            algorithm,
            create_keys,
        })
    }

    fn session(&self) -> Result<&Rc<Session>, KeyError> {
        self.session.as_ref().ok_or_else(|| KeyError::Pkcs11 {
            operation: "session",
            message: "session already closed".into(),
        })
    }

    /// Returns the handles of all objects of the label matching the template.
    fn find(&self, template: &[Attribute]) -> Result<Vec<ObjectHandle>, KeyError> {
        let mut template = template.to_vec();
        template.push(Attribute::Label(self.label.as_bytes().to_vec()));
        self.session()?
            .find_objects(&template)
            .map_err(p11_err("C_FindObjects"))
    }

    /// Looks for the four key objects.
    ///
    /// Returns `None` if there are no objects at all.
    fn find_keys(&self) -> Result<Option<KeyPair<Pkcs11Key>>, KeyError> {
        let mut found = Vec::new();
        let mut count = 0;
        for role in [KeyRole::Zsk, KeyRole::Ksk] {
            for class in [ObjectClass::PUBLIC_KEY, ObjectClass::PRIVATE_KEY] {
                let handles = self.find(&[
                    Attribute::Class(class),
                    Attribute::Id(role.id().as_bytes().to_vec()),
                ])?;
                count += handles.len();
                found.push(handles);
            }
        }
        if count == 0 {
            return Ok(None);
        }
        if count != 4 || found.iter().any(|handles| handles.len() != 1) {
            return Err(KeyError::WrongKeyCount {
                label: self.label.clone(),
                count,
            });
        }
        let zsk = self.key(found[0][0], found[1][0])?;
        let ksk = self.key(found[2][0], found[3][0])?;
        Ok(Some(KeyPair { zsk, ksk }))
    }

    fn key(&self, public: ObjectHandle, private: ObjectHandle) -> Result<Pkcs11Key, KeyError> {
        let key = Pkcs11Key {
            session: self.session()?.clone(),
            algorithm: self.algorithm,
            public,
            private,
        };
        let key_type = key.attribute(AttributeType::KeyType)?;
        let expected = match self.algorithm {
            SignAlgorithm::RsaSha256 => KeyType::RSA,
            SignAlgorithm::EcdsaP256Sha256 => KeyType::EC,
        };
        match key_type {
            Attribute::KeyType(found) if found == expected => Ok(key),
            Attribute::KeyType(found) => Err(KeyError::AlgorithmMismatch {
                expected: self.algorithm,
                found: found.to_string(),
            }),
            _ => Err(KeyError::MissingAttribute("CKA_KEY_TYPE")),
        }
    }

    fn generate(&self, role: KeyRole) -> Result<Pkcs11Key, KeyError> {
        let label = Attribute::Label(self.label.as_bytes().to_vec());
        let id = Attribute::Id(role.id().as_bytes().to_vec());
        let mut public_template = vec![
            Attribute::Token(true),
            Attribute::Verify(true),
            label.clone(),
            id.clone(),
        ];
        let private_template = vec![
            Attribute::Token(true),
            Attribute::Sign(true),
            Attribute::Sensitive(true),
            Attribute::Private(true),
            label,
            id,
        ];
        let mechanism = match self.algorithm {
            SignAlgorithm::RsaSha256 => {
                public_template.push(Attribute::ModulusBits(u64::from(role.rsa_bits()).into()));
                public_template.push(Attribute::PublicExponent(vec![0x01, 0x00, 0x01]));
                Mechanism::RsaPkcsKeyPairGen
            }
            SignAlgorithm::EcdsaP256Sha256 => {
                public_template.push(Attribute::EcParams(P256_EC_PARAMS.to_vec()));
                Mechanism::EccKeyPairGen
            }
        };
        let (public, private) = self
            .session()?
            .generate_key_pair(&mechanism, &public_template, &private_template)
            .map_err(p11_err("C_GenerateKeyPair"))?;
        Ok(Pkcs11Key {
            session: self.session()?.clone(),
            algorithm: self.algorithm,
            public,
            private,
        })
    }
}

impl KeyProvider for Pkcs11Provider {
    type Key = Pkcs11Key;

    fn kind(&self) -> &'static str {
        "pkcs11"
    }

    fn get_keys(&mut self) -> Result<KeyPair<Pkcs11Key>, KeyError> {
        if self.create_keys {
            self.destroy_all_keys()?;
            let zsk = self.generate(KeyRole::Zsk)?;
            let ksk = self.generate(KeyRole::Ksk)?;
            info!(
                "Created new {} keys with label '{}'",
                self.algorithm, self.label
            );
            return Ok(KeyPair { zsk, ksk });
        }
        self.find_keys()?.ok_or_else(|| KeyError::NoKeys {
            label: self.label.clone(),
        })
    }

    fn destroy_all_keys(&mut self) -> Result<(), KeyError> {
        let handles = self.find(&[])?;
        for handle in &handles {
            self.session()?
                .destroy_object(*handle)
                .map_err(p11_err("C_DestroyObject"))?;
        }
        debug!(
            "Destroyed {} objects with label '{}'",
            handles.len(),
            self.label
        );
        Ok(())
    }

    fn end(&mut self) -> Result<(), KeyError> {
        // Closing the session and finalizing happens when the last
        // reference is dropped.
        if let Some(session) = self.session.take() {
            session.logout().map_err(p11_err("C_Logout"))?;
        }
        Ok(())
    }
}

impl Drop for Pkcs11Provider {
    fn drop(&mut self) {
        if let Err(err) = self.end() {
            warn!("{err}");
        }
    }
}

//------------ Pkcs11Key -----------------------------------------------------

/// A key pair held by the token.
pub struct Pkcs11Key {
    session: Rc<Session>,
    algorithm: SignAlgorithm,
    public: ObjectHandle,
    private: ObjectHandle,
}

impl Pkcs11Key {
    fn attribute(&self, attr: AttributeType) -> Result<Attribute, KeyError> {
        self.session
            .get_attributes(self.public, &[attr])
            .map_err(p11_err("C_GetAttributeValue"))?
            .into_iter()
            .next()
            .ok_or(KeyError::MissingAttribute(attribute_name(attr)))
    }
}

impl SigningKey for Pkcs11Key {
    fn algorithm(&self) -> SignAlgorithm {
        self.algorithm
    }

    fn public_key(&self) -> Result<Vec<u8>, KeyError> {
        match self.algorithm {
            SignAlgorithm::RsaSha256 => {
                let Attribute::PublicExponent(exponent) =
                    self.attribute(AttributeType::PublicExponent)?
                else {
                    return Err(KeyError::MissingAttribute("CKA_PUBLIC_EXPONENT"));
                };
                let Attribute::Modulus(modulus) = self.attribute(AttributeType::Modulus)? else {
                    return Err(KeyError::MissingAttribute("CKA_MODULUS"));
                };
                encode_rsa_public_key(&exponent, &modulus)
            }
            SignAlgorithm::EcdsaP256Sha256 => {
                let Attribute::EcPoint(point) = self.attribute(AttributeType::EcPoint)? else {
                    return Err(KeyError::MissingAttribute("CKA_EC_POINT"));
                };
                encode_ecdsa_public_key(&point)
            }
        }
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, KeyError> {
        let hash = digest::digest(&digest::SHA256, data);
        match self.algorithm {
            SignAlgorithm::RsaSha256 => self
                .session
                .sign(&Mechanism::RsaPkcs, self.private, &rsa_digest_info(hash.as_ref()))
                .map_err(p11_err("C_Sign")),
            SignAlgorithm::EcdsaP256Sha256 => {
                let raw = self
                    .session
                    .sign(&Mechanism::Ecdsa, self.private, hash.as_ref())
                    .map_err(p11_err("C_Sign"))?;
                fixed_ecdsa_signature(&raw)
            }
        }
    }
}

//------------ Helpers -------------------------------------------------------

/// Wraps a SHA-256 digest into a DigestInfo structure.
/// Returns slot 0 of the slot list.
fn first_slot<T>(slots: Vec<T>) -> Result<T, KeyError> {
    slots.into_iter().next().ok_or_else(|| KeyError::Pkcs11 {
        operation: "C_GetSlotList",
        message: "no slots available".into(),
    })
}

fn rsa_digest_info(hash: &[u8]) -> Vec<u8> {
    let mut res = Vec::with_capacity(SHA256_DIGEST_INFO.len() + hash.len());
    res.extend_from_slice(&SHA256_DIGEST_INFO);
    res.extend_from_slice(hash);
    res
}

/// Converts a raw `r || s` signature from the token into the DNSSEC format.
///
/// Tokens may drop leading zeros, so both halves are padded to 32 octets.
fn fixed_ecdsa_signature(raw: &[u8]) -> Result<Vec<u8>, KeyError> {
    if raw.is_empty() || raw.len() % 2 != 0 || raw.len() > 2 * P256_INT_LEN {
        return Err(KeyError::Crypto(format!(
            "unexpected ECDSA signature length {}",
            raw.len()
        )));
    }
    let (r, s) = raw.split_at(raw.len() / 2);
    let mut res = vec![0; 2 * P256_INT_LEN];
    res[P256_INT_LEN - r.len()..P256_INT_LEN].copy_from_slice(r);
    res[2 * P256_INT_LEN - s.len()..].copy_from_slice(s);
    Ok(res)
}

fn attribute_name(attr: AttributeType) -> &'static str {
    match attr {
        AttributeType::KeyType => "CKA_KEY_TYPE",
        AttributeType::Modulus => "CKA_MODULUS",
        AttributeType::PublicExponent => "CKA_PUBLIC_EXPONENT",
        AttributeType::EcPoint => "CKA_EC_POINT",
        _ => "requested",
    }
}

fn p11_err(operation: &'static str) -> impl Fn(cryptoki::error::Error) -> KeyError {
    move |err| KeyError::Pkcs11 {
        operation,
        message: err.to_string(),
    }
}

//============ Tests =========================================================
