use tracing::info;

use crate::env::Env;
use crate::error::{Context, Error, Result};
use crate::keys::pkcs11::Pkcs11Provider;
use crate::keys::{KeyProvider, SignAlgorithm};

use super::sign::Pkcs11Token;

#[derive(Clone, Debug, clap::Args)]
pub struct ResetPkcs11Keys {
    #[command(flatten)]
    token: Pkcs11Token,
}

impl ResetPkcs11Keys {
    pub fn execute(self, env: impl Env) -> Result<()> {
        let token = &self.token;
        // The algorithm only matters for creating keys.
        let mut provider = Pkcs11Provider::open(
            &env,
            &token.p11lib,
            &token.user_key,
            &token.key_label,
            SignAlgorithm::RsaSha256,
            false,
        )
        .map_err(Error::from)
        .context("opening the PKCS#11 token")?;
        provider
            .destroy_all_keys()
            .map_err(Error::from)
            .with_context(|| format!("destroying keys labelled '{}'", token.key_label))?;
        provider.end()?;
        info!("Destroyed all keys labelled '{}'", token.key_label);
        Ok(())
    }
}
