//! The state of a signing or verification run.
//!
//! The command line options are resolved into a [`SignConfig`] or a
//! [`VerifyConfig`]. Everything a run needs from the outside world, i.e.,
//! the current time and a source of randomness, is part of these values
//! so the engine itself doesn't need to reach out.

use rand::{CryptoRng, RngCore};

use crate::dnssec::nsec3::Nsec3Config;
use crate::dnssec::zonemd::ZonemdHash;
use crate::keys::SignAlgorithm;
use crate::zone::Zone;

//------------ Denial --------------------------------------------------------

/// How to provide authenticated denial of existence.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Denial {
    Nsec,
    Nsec3 {
        iterations: u16,
        salt: Nsec3Salt,
        opt_out: bool,
    },
}

impl Denial {
    /// Returns a short description for informational output.
    pub fn mode(&self) -> &'static str {
        match self {
            Denial::Nsec => "NSEC",
            Denial::Nsec3 { opt_out: false, .. } => "NSEC3",
            Denial::Nsec3 { opt_out: true, .. } => "NSEC3 opt-out",
        }
    }
}

/// Where the NSEC3 salt comes from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Nsec3Salt {
    /// A fresh random salt of the given length for every attempt.
    Random(u8),

    /// The given salt.
    Fixed(Vec<u8>),
}

impl Nsec3Salt {
    /// Returns the NSEC3 parameters for one attempt at building a chain.
    pub fn config(
        &self,
        iterations: u16,
        opt_out: bool,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Nsec3Config {
        let salt = match self {
            Nsec3Salt::Random(len) => {
                let mut salt = vec![0; usize::from(*len)];
                rng.fill_bytes(&mut salt);
                salt
            }
            Nsec3Salt::Fixed(salt) => salt.clone(),
        };
        Nsec3Config {
            iterations,
            salt,
            opt_out,
        }
    }
}

//------------ SignConfig ----------------------------------------------------

/// The resolved options of a signing run.
#[derive(Clone, Debug)]
pub struct SignConfig {
    pub algorithm: SignAlgorithm,
    pub denial: Denial,

    /// The hash of a ZONEMD record to add, if any.
    pub digest: Option<ZonemdHash>,

    /// Whether to add a TXT record describing the signing run.
    pub info: bool,

    /// The inception time of signatures, which is also "now".
    pub inception: u32,

    /// The expiration time of signatures.
    pub expiration: u32,
}

//------------ VerifyConfig --------------------------------------------------

/// The resolved options of a verification run.
#[derive(Clone, Debug)]
pub struct VerifyConfig {
    /// Signatures expiring before this time are rejected.
    pub threshold: u32,

    /// The hash of a ZONEMD record that must be present.
    pub digest: Option<ZonemdHash>,
}

//------------ SigningContext ------------------------------------------------

/// Everything a signing run operates on.
pub struct SigningContext<R> {
    pub config: SignConfig,
    pub zone: Zone,
    pub rng: R,
}

impl<R: RngCore + CryptoRng> SigningContext<R> {
    pub fn new(config: SignConfig, zone: Zone, rng: R) -> Self {
        SigningContext { config, zone, rng }
    }
}
