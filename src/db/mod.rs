//! Database related things.

use deadpool_postgres::{Config as PoolConfig, Pool, Runtime};
use secrecy::{ExposeSecret, SecretString};
use std::{
    fs,
    path::{PathBuf, Path},
    sync::Arc,
};
use tokio_postgres::NoTls;

use crate::prelude::*;


pub(crate) mod cmd;
mod migrations;
mod query;
pub(crate) mod util;

#[cfg(test)]
mod tests;

pub(crate) use self::migrations::{migrate, MigrationPlan};


#[derive(Debug, confique::Config, Clone)]
pub(crate) struct DbConfig {
    /// The username of the database user.
    #[config(default = "libris")]
    pub(crate) user: String,

    /// The password of the database user.
    pub(crate) password: Option<SecretString>,

    /// The host the database server is running on.
    #[config(default = "127.0.0.1")]
    pub(crate) host: String,

    /// The port the database server is listening on. (Just useful if your
    /// database server is not running on the default PostgreSQL port).
    #[config(default = 5432)]
    pub(crate) port: u16,

    /// The name of the database to use.
    #[config(default = "libris")]
    pub(crate) database: String,

    /// The TLS mode for the database connection.
    ///
    /// - "on": encryption is required and the server certificate is validated
    ///    against trusted certificates which are loaded from the system's
    ///    native certificate store. If `server_cert` is set, that's also
    ///    loaded and trusted.
    /// - "off": no encryption.
    #[config(default = "on")]
    pub(crate) tls_mode: TlsMode,

    /// Path to the server certificate. This makes sense if you don't want to
    /// install the certificate globally on the system. Has to be a PEM encoded
    /// file containing one or more X509 certificates.
    pub(crate) server_cert: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum TlsMode {
    Off,
    On,
}

impl DbConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.server_cert.is_some() && self.tls_mode != TlsMode::On {
            bail!(r#"`db.server_cert` is set, but TLS mode is NOT "on", which makes no sense"#);
        }

        Ok(())
    }

    /// Checks that the server certificate file, if given, exists and is valid.
    /// Basically only for the `check` subcommand.
    pub(crate) fn check_server_cert(&self) -> Result<()> {
        if let Some(path) = &self.server_cert {
            let mut root_certs = rustls::RootCertStore::empty();
            load_pem_file(path, &mut root_certs)
                .with_context(|| format!("failed to load '{}'", path.display()))?;
        }
        Ok(())
    }
}

/// Convenience type alias. Every function that needs to operate on the database
/// can just accept a `db: &Db` parameter.
pub(crate) type Db = deadpool_postgres::ClientWrapper;


/// Creates a new database connection pool.
pub(crate) async fn create_pool(config: &DbConfig) -> Result<Pool> {
    let pool_config = PoolConfig {
        user: Some(config.user.clone()),
        password: config.password.as_ref().map(|p| p.expose_secret().to_owned()),
        host: Some(config.host.clone()),
        port: Some(config.port),
        dbname: Some(config.database.clone()),
        ssl_mode: Some(if config.tls_mode == TlsMode::Off {
            deadpool_postgres::SslMode::Disable
        } else {
            deadpool_postgres::SslMode::Require
        }),
        application_name: Some("Libris".into()),
        .. PoolConfig::default()
    };

    debug!(
        "Connecting to 'postgresql://{}:*****@{}:{}/{}' (TLS: {:?})",
        config.user,
        config.host,
        config.port,
        config.database,
        config.tls_mode,
    );

    let pool = match config.tls_mode {
        TlsMode::Off => pool_config.create_pool(Some(Runtime::Tokio1), NoTls)?,
        TlsMode::On => {
            let mut root_certs = rustls::RootCertStore::empty();
            let system_certs = rustls_native_certs::load_native_certs();
            for e in &system_certs.errors {
                warn!("Failed to load a system-wide certificate: {e}");
            }
            let (added, ignored) = root_certs.add_parsable_certificates(system_certs.certs);
            debug!("Loaded {added} system-wide certificates ({ignored} ignored)");

            if let Some(cert_path) = &config.server_cert {
                let custom_count = load_pem_file(cert_path, &mut root_certs)
                    .with_context(|| format!("failed to load '{}'", cert_path.display()))?;
                debug!("Loaded {} certificates from '{}'", custom_count, cert_path.display());
            }

            let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
            let tls_config = rustls::ClientConfig::builder_with_provider(provider)
                .with_safe_default_protocol_versions()
                .context("failed to configure TLS")?
                .with_root_certificates(root_certs)
                .with_no_client_auth();

            let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);
            pool_config.create_pool(Some(Runtime::Tokio1), tls)?
        }
    };
    info!("Created database pool");


    // Test the connection by executing a simple query.
    let client = pool.get().await
        .context("failed to get DB connection")?;
    client.execute("select 1", &[]).await
        .context("failed to execute DB test query")?;
    debug!("Successfully tested database connection with test query");

    // Titles and names are arbitrary Unicode text.
    let encoding = client.query_one("show server_encoding;", &[]).await
        .context("failed to check server encoding")?
        .get::<_, String>(0);

    if encoding != "UTF8" {
        bail!("Database encoding is not UTF8, but Libris requires UTF8!");
    }

    Ok(pool)
}


/// Loads the PEM file at `path` and adds all X509 certificates in it to
/// `root_certs`. Returns the number of certs added to `root_certs`.
fn load_pem_file(path: &Path, root_certs: &mut rustls::RootCertStore) -> Result<usize> {
    let file = fs::read(path).context("could not read file")?;

    let mut count = 0;
    for cert in rustls_pemfile::certs(&mut &*file) {
        let cert = cert.context("could not parse file as PEM")?;
        root_certs.add(cert).context("failed to load X509 certificate")?;
        count += 1;
    }

    if count == 0 {
        bail!("file does not contain any X509 certificates");
    }

    Ok(count)
}
