use std::path::PathBuf;
use std::time::Duration;

use clap::builder::ValueParser;
use rand::rngs::OsRng;
use tracing::{info, warn};

use crate::context::{Denial, Nsec3Salt, SignConfig, SigningContext, VerifyConfig};
use crate::dnssec::signer::sign_zone;
use crate::dnssec::verifier::verify_zone;
use crate::dnssec::zonemd::ZonemdHash;
use crate::env::Env;
use crate::error::{Context, Error, Result};
use crate::keys::file::FileProvider;
use crate::keys::pkcs11::Pkcs11Provider;
use crate::keys::{KeyProvider, SignAlgorithm};
use crate::parse::{parse_date, parse_duration, parse_hash_digest, parse_salt};
use crate::util::{format_timestamp, is_stdio};
use crate::zone::writer::RecordLine;

use super::{add_duration, write, Threshold, ZoneInput};

/// The validity of signatures if no expiration is given.
const DEFAULT_DURATION: Duration = Duration::from_secs(90 * 86400);

#[derive(Clone, Debug, clap::Subcommand)]
pub enum Sign {
    /// Sign with keys held in a PKCS#11 token
    #[command(name = "pkcs11")]
    Pkcs11(SignPkcs11),

    /// Sign with keys stored in PEM files
    #[command(name = "file")]
    File(SignFile),
}

impl Sign {
    pub fn execute(self, env: impl Env) -> Result<()> {
        match self {
            Self::Pkcs11(cmd) => cmd.execute(env),
            Self::File(cmd) => cmd.execute(env),
        }
    }
}

//------------ SignPkcs11 ----------------------------------------------------

#[derive(Clone, Debug, clap::Args)]
pub struct SignPkcs11 {
    #[command(flatten)]
    token: Pkcs11Token,

    #[command(flatten)]
    options: SignOptions,
}

/// How to reach the keys in a PKCS#11 token.
#[derive(Clone, Debug, clap::Args)]
pub struct Pkcs11Token {
    /// The PKCS#11 library to load
    #[arg(short = 'p', long = "p11lib", value_name = "PATH")]
    pub p11lib: PathBuf,

    /// The PIN of the token user
    #[arg(short = 'k', long = "user-key", value_name = "PIN")]
    pub user_key: String,

    /// The label of the key objects
    #[arg(
        short = 'l',
        long = "key-label",
        value_name = "LABEL",
        default_value = "zonesigner"
    )]
    pub key_label: String,
}

impl SignPkcs11 {
    pub fn execute(self, env: impl Env) -> Result<()> {
        let token = &self.token;
        self.options.run(&env, |algorithm, create_keys| {
            Pkcs11Provider::open(
                &env,
                &token.p11lib,
                &token.user_key,
                &token.key_label,
                algorithm,
                create_keys,
            )
            .map_err(Error::from)
            .context("opening the PKCS#11 token")
        })
    }
}

//------------ SignFile ------------------------------------------------------

#[derive(Clone, Debug, clap::Args)]
pub struct SignFile {
    /// The PEM file with the zone signing key
    #[arg(short = 'Z', long = "zsk-keyfile", value_name = "PATH")]
    zsk_keyfile: PathBuf,

    /// The PEM file with the key signing key
    #[arg(short = 'K', long = "ksk-keyfile", value_name = "PATH")]
    ksk_keyfile: PathBuf,

    #[command(flatten)]
    options: SignOptions,
}

impl SignFile {
    pub fn execute(self, env: impl Env) -> Result<()> {
        let (zsk, ksk) = (&self.zsk_keyfile, &self.ksk_keyfile);
        self.options.run(&env, |algorithm, create_keys| {
            FileProvider::open(&env, zsk, ksk, algorithm, create_keys)
        })
    }
}

//------------ SignOptions ---------------------------------------------------

/// The options shared by all ways of signing.
#[derive(Clone, Debug, clap::Args)]
pub struct SignOptions {
    #[command(flatten)]
    input: ZoneInput,

    /// Where to write the signed zone, stdout if missing or '-'
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Replace the keys with newly created ones
    #[arg(short = 'c', long = "create-keys")]
    create_keys: bool,

    /// The signing algorithm: rsa or ecdsa
    #[arg(
        short = 'a',
        long = "sign-algorithm",
        value_name = "ALGORITHM",
        default_value = "rsa"
    )]
    sign_algorithm: SignAlgorithm,

    /// Use NSEC3 instead of NSEC
    #[arg(short = '3', long = "nsec3")]
    nsec3: bool,

    /// Leave insecure delegations out of the NSEC3 chain
    #[arg(short = 'x', long = "opt-out", requires = "nsec3")]
    opt_out: bool,

    /// Add a ZONEMD record
    #[arg(short = 'd', long = "digest")]
    digest: bool,

    /// The ZONEMD hash algorithm: 1 for SHA-384, 2 for SHA-512
    #[arg(
        short = 'Q',
        long = "hash-digest",
        value_name = "NUMBER",
        default_value = "1",
        value_parser = ValueParser::new(parse_hash_digest),
    )]
    hash_digest: ZonemdHash,

    /// Add a TXT record describing the signing run
    #[arg(short = 'i', long = "info")]
    info: bool,

    /// Only sign if the signatures of the zone are invalid or expire
    /// before the verify threshold
    #[arg(short = 'L', long = "lazy")]
    lazy: bool,

    /// The expiration date of the signatures (YYYYMMDD)
    #[arg(
        long = "rrsig-expiration-date",
        value_name = "YYYYMMDD",
        value_parser = ValueParser::new(parse_date),
        conflicts_with = "rrsig_duration",
    )]
    rrsig_expiration_date: Option<u32>,

    /// How long the signatures are valid, e.g. '3 months' [default: 3 months]
    #[arg(
        long = "rrsig-duration",
        value_name = "DURATION",
        value_parser = ValueParser::new(parse_duration),
    )]
    rrsig_duration: Option<Duration>,

    #[command(flatten)]
    threshold: Threshold,

    /// The number of additional NSEC3 hash iterations
    #[arg(long = "nsec3-iterations", value_name = "NUMBER", default_value_t = 0)]
    nsec3_iterations: u16,

    /// The length of a random NSEC3 salt in octets
    #[arg(
        long = "nsec3-salt-length",
        value_name = "NUMBER",
        default_value_t = 8,
        conflicts_with = "nsec3_salt_value"
    )]
    nsec3_salt_length: u8,

    /// The NSEC3 salt in hex, '-' for none
    #[arg(
        long = "nsec3-salt-value",
        value_name = "HEX",
        value_parser = ValueParser::new(parse_salt),
    )]
    nsec3_salt_value: Option<::std::vec::Vec<u8>>,
}

impl SignOptions {
    /// Resolves the options into the configuration of a signing run.
    fn config(&self, now: u32) -> Result<SignConfig> {
        let expiration = match (self.rrsig_expiration_date, self.rrsig_duration) {
            (Some(date), _) => date,
            (None, Some(duration)) => add_duration(now, duration)?,
            (None, None) => add_duration(now, DEFAULT_DURATION)?,
        };
        if expiration <= now {
            warn!(
                "Signatures expire at {}, which is not in the future",
                format_timestamp(expiration)
            );
        }
        let denial = if self.nsec3 {
            Denial::Nsec3 {
                iterations: self.nsec3_iterations,
                salt: match &self.nsec3_salt_value {
                    Some(salt) => Nsec3Salt::Fixed(salt.clone()),
                    None => Nsec3Salt::Random(self.nsec3_salt_length),
                },
                opt_out: self.opt_out,
            }
        } else {
            Denial::Nsec
        };
        Ok(SignConfig {
            algorithm: self.sign_algorithm,
            denial,
            digest: self.digest.then_some(self.hash_digest),
            info: self.info,
            inception: now,
            expiration,
        })
    }

    /// Signs the zone with keys from the provider made by `open`.
    ///
    /// The provider is only opened if the zone actually gets signed.
    fn run<P: KeyProvider>(
        &self,
        env: &impl Env,
        open: impl FnOnce(SignAlgorithm, bool) -> Result<P>,
    ) -> Result<()> {
        let now = env.seconds_since_epoch();
        let zone = self.input.read(env)?;
        let output = self.output.as_deref();

        if self.lazy {
            let verify = VerifyConfig {
                threshold: self.threshold.resolve(now)?,
                digest: self.digest.then_some(self.hash_digest),
            };
            match verify_zone(&zone, &verify) {
                Ok(_) => {
                    info!("Zone {} is signed and valid, not signing", zone.apex());
                    return write(env, output, &zone);
                }
                Err(err) if err.is_expired() => {
                    info!("Signatures expire too early, signing again: {err}")
                }
                Err(err) => info!("Zone does not verify, signing again: {err}"),
            }
        }

        let config = self.config(now)?;
        let mut provider = open(config.algorithm, self.create_keys)?;
        let mut ctx = SigningContext::new(config, zone, OsRng);
        let ds = sign_zone(&mut ctx, &mut provider)
            .with_context(|| format!("signing zone {}", ctx.zone.apex()))?;
        provider.end()?;

        write(env, output, &ctx.zone)?;
        info!("DS record: {}", RecordLine(&ds));
        if output.is_some_and(|path| !is_stdio(path)) {
            writeln!(env.stdout(), "{}", RecordLine(&ds));
        }
        Ok(())
    }
}

//============ Tests =========================================================
