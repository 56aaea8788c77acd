use std::path::PathBuf;

use clap::builder::ValueParser;
use domain::base::iana::Rtype;
use tracing::{info, warn};

use crate::dnssec::zonemd::{add_placeholder, update_digests, verify_digests, ZonemdHash};
use crate::env::Env;
use crate::error::{Context, Error, Result};
use crate::parse::parse_hash_digest;
use crate::zone::covered_type;

use super::{write, ZoneInput};

#[derive(Clone, Debug, clap::Args)]
pub struct Digest {
    #[command(flatten)]
    input: ZoneInput,

    /// Where to write the zone, stdout if missing or '-'
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    output: Option<PathBuf>,

    /// The ZONEMD hash algorithm: 1 for SHA-384, 2 for SHA-512
    ///
    /// When adding digests, this defaults to 1. When checking them, a
    /// record with this hash algorithm is required.
    #[arg(
        short = 'Q',
        long = "hash-digest",
        value_name = "NUMBER",
        value_parser = ValueParser::new(parse_hash_digest),
    )]
    hash_digest: Option<ZonemdHash>,

    /// Only check the existing digests
    #[arg(long = "verify-only", conflicts_with = "output")]
    verify_only: bool,
}

impl Digest {
    pub fn execute(self, env: impl Env) -> Result<()> {
        let mut zone = self.input.read(&env)?;

        if self.verify_only {
            let count = verify_digests(&zone, self.hash_digest)
                .map_err(Error::from)
                .with_context(|| format!("checking the digests of zone {}", zone.apex()))?;
            writeln!(env.stdout(), "Zone {} has {count} valid digests", zone.apex());
            return Ok(());
        }

        let hash = self.hash_digest.unwrap_or(ZonemdHash::Sha384);
        if zone
            .records()
            .iter()
            .any(|record| covered_type(record) == Some(Rtype::ZONEMD))
        {
            warn!("The signatures of the ZONEMD records will not match the new digests");
        }
        add_placeholder(&mut zone, hash);
        zone.sort();
        let count = update_digests(&mut zone);
        info!("Computed {count} digests for zone {}", zone.apex());
        write(&env, self.output.as_deref(), &zone)
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use crate::env::fake::FakeCmd;

    const UNDIGESTED: &str = "$ORIGIN example.\n\
                              @ 86400 IN SOA ns1 admin 2018031900 1800 900 604800 86400\n\
                              @ 86400 IN NS ns1\n\
                              ns1 3600 IN A 203.0.113.63\n";
    const ROOT_SERVERS: &str = include_str!("../../test-data/root-servers.net.zone");

    #[test]
    fn parse() {
        let cmd = FakeCmd::new(["zonesigner", "digest"]);
        cmd.parse().unwrap();
        cmd.args(["--verify-only", "-Q", "2"]).parse().unwrap();
        assert!(cmd.args(["--verify-only", "-o", "out"]).parse().is_err());
        assert!(cmd.args(["-Q", "sha384"]).parse().is_err());
    }

    #[test]
    fn verify_only() {
        let res = FakeCmd::new(["zonesigner", "digest", "--verify-only", "-Q", "1"])
            .stdin(ROOT_SERVERS)
            .run();
        assert_eq!(res.exit_code, 0, "{}", res.stderr);
        assert_eq!(res.stdout, "Zone root-servers.net. has 1 valid digests\n");

        let broken = ROOT_SERVERS.replace(
            "5b3e86ae3d973d6b5349ba7f04340f79",
            "5b3e86ae3d973d6b5349ba7f04340f78",
        );
        let res = FakeCmd::new(["zonesigner", "digest", "--verify-only"])
            .stdin(broken)
            .run();
        assert_eq!(res.exit_code, 1);
        assert!(res.stderr.contains("SHA384 ZONEMD digest mismatch"));
    }

    #[test]
    fn add_digest() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("example.zone"), UNDIGESTED).unwrap();

        let res = FakeCmd::new([
            "zonesigner",
            "digest",
            "-f",
            "example.zone",
            "-Q",
            "2",
            "-o",
            "digested.zone",
        ])
        .cwd(dir.path())
        .run();
        assert_eq!(res.exit_code, 0, "{}", res.stderr);

        let digested = fs::read_to_string(dir.path().join("digested.zone")).unwrap();
        assert_eq!(
            digested
                .lines()
                .filter(|line| line.contains("\tZONEMD\t2018031900 1 2 "))
                .count(),
            1
        );

        let res = FakeCmd::new([
            "zonesigner",
            "digest",
            "-f",
            "digested.zone",
            "--verify-only",
            "-Q",
            "2",
        ])
        .cwd(dir.path())
        .run();
        assert_eq!(res.exit_code, 0, "{}", res.stderr);
    }
}
