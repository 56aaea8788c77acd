use clap::builder::ValueParser;
use tracing::info;

use crate::context::VerifyConfig;
use crate::dnssec::verifier::verify_zone;
use crate::dnssec::zonemd::ZonemdHash;
use crate::env::Env;
use crate::error::{Context, Result};
use crate::parse::parse_hash_digest;
use crate::util::format_timestamp;

use super::{Threshold, ZoneInput};

#[derive(Clone, Debug, clap::Args)]
pub struct Verify {
    #[command(flatten)]
    input: ZoneInput,

    /// Require a ZONEMD record with this hash: 1 for SHA-384, 2 for SHA-512
    #[arg(
        short = 'Q',
        long = "hash-digest",
        value_name = "NUMBER",
        value_parser = ValueParser::new(parse_hash_digest),
    )]
    hash_digest: Option<ZonemdHash>,

    #[command(flatten)]
    threshold: Threshold,
}

impl Verify {
    pub fn execute(self, env: impl Env) -> Result<()> {
        let zone = self.input.read(&env)?;
        let config = VerifyConfig {
            threshold: self.threshold.resolve(env.seconds_since_epoch())?,
            digest: self.hash_digest,
        };
        info!(
            "Verifying zone {} with signatures valid until at least {}",
            zone.apex(),
            format_timestamp(config.threshold)
        );
        let stats = verify_zone(&zone, &config)
            .with_context(|| format!("verifying zone {}", zone.apex()))?;
        writeln!(
            env.stdout(),
            "Zone {} verified: {} RRsets, {} signatures, {} digests",
            zone.apex(),
            stats.rrsets,
            stats.signatures,
            stats.digests
        );
        Ok(())
    }
}

//============ Tests =========================================================
