//! The typed configuration surface assembled from the raw [`crate::ini::Ini`]
//! file, split per `[section]` the way the protocol design groups them.

use net::VerificationPolicy;

use crate::error::ConfigError;
use crate::ini::Ini;

/// `[lobby]` — where the one TCP acceptor binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbySection {
    pub bindaddr: String,
    pub extaddr: String,
    pub port: u16,
}

/// Rotating log file verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Error,
}

impl std::str::FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "error" => Ok(Self::Error),
            _ => Err(()),
        }
    }
}

/// `[log]` — rotating per-day log file destination and verbosity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSection {
    pub directory: String,
    pub level: LogLevel,
}

/// `[client]` — the build/branch identity this daemon expects from
/// connecting clients, and how strictly it is enforced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSection {
    pub build_id: u32,
    pub branch_id: u32,
    pub build_type: String,
    pub product: String,
    pub verification: VerificationPolicy,
}

/// `[admin]`/`[db]` — an outbound peer address this daemon connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSection {
    pub addr: String,
    pub port: u16,
}

/// `[db]` storage backend selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbSection {
    pub engine: String,
    pub path: String,
}

/// The base-64 DH key material for one role, read from
/// `[crypt] <role>_k, <role>_n, <role>_x, <role>_g`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptRoleKeys {
    pub k_base64: String,
    pub n_base64: String,
    pub x_base64: String,
    pub generator: u32,
}

/// The whole parsed, typed configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardConfig {
    pub lobby: LobbySection,
    pub log: LogSection,
    pub client: ClientSection,
    pub admin: Option<PeerSection>,
    pub db: Option<PeerSection>,
    pub db_engine: DbSection,
    ini: Ini,
}

impl ShardConfig {
    /// Parses `text` and validates every section this core needs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] or
    /// [`ConfigError::InvalidValue`] if a required key is absent or
    /// malformed.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::parse(text)?;

        let lobby = LobbySection {
            bindaddr: ini.get("lobby", "bindaddr")?.to_string(),
            extaddr: ini.get("lobby", "extaddr")?.to_string(),
            port: ini.get_parsed("lobby", "port")?,
        };

        let log = LogSection {
            directory: ini.get("log", "directory")?.to_string(),
            level: ini.get_parsed("log", "level")?,
        };

        let verification = match ini.get("client", "verification")? {
            "none" => VerificationPolicy::None,
            "default" => VerificationPolicy::Default,
            "strict" => VerificationPolicy::Strict,
            other => {
                return Err(ConfigError::InvalidValue {
                    section: "client".to_string(),
                    key: "verification".to_string(),
                    value: other.to_string(),
                })
            }
        };
        let client = ClientSection {
            build_id: ini.get_parsed("client", "buildId")?,
            branch_id: ini.get_parsed("client", "branchId")?,
            build_type: ini.get("client", "buildType")?.to_string(),
            product: ini.get("client", "product")?.to_string(),
            verification,
        };

        let admin = Self::peer_section(&ini, "admin")?;
        let db = Self::peer_section(&ini, "db")?;

        let db_engine = DbSection {
            engine: ini.get("db", "engine")?.to_string(),
            path: ini.get("db", "path")?.to_string(),
        };

        tracing::info!(bindaddr = %lobby.bindaddr, port = lobby.port, "configuration loaded");

        Ok(Self {
            lobby,
            log,
            client,
            admin,
            db,
            db_engine,
            ini,
        })
    }

    fn peer_section(ini: &Ini, section: &str) -> Result<Option<PeerSection>, ConfigError> {
        match (ini.get_opt(section, "addr"), ini.get_opt(section, "port")) {
            (Some(addr), Some(port)) => Ok(Some(PeerSection {
                addr: addr.to_string(),
                port: port.parse().map_err(|_| ConfigError::InvalidValue {
                    section: section.to_string(),
                    key: "port".to_string(),
                    value: port.to_string(),
                })?,
            })),
            _ => Ok(None),
        }
    }

    /// Reads this daemon role's DH key material from `[crypt]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] if any of the four
    /// `<role>_k/n/x/g` keys is absent, or [`ConfigError::InvalidValue`]
    /// if `<role>_g` does not parse as an integer.
    pub fn crypt_keys(&self, role: &str) -> Result<CryptRoleKeys, ConfigError> {
        Ok(CryptRoleKeys {
            k_base64: self.ini.get("crypt", &format!("{role}_k"))?.to_string(),
            n_base64: self.ini.get("crypt", &format!("{role}_n"))?.to_string(),
            x_base64: self.ini.get("crypt", &format!("{role}_x"))?.to_string(),
            generator: self.ini.get_parsed("crypt", &format!("{role}_g"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "
        [lobby]
        bindaddr = 0.0.0.0
        extaddr = shard.example.invalid
        port = 14617

        [log]
        directory = /var/log/shard
        level = info

        [client]
        buildId = 918
        branchId = 0
        buildType = 50
        product = ea489821-6c35-4bd0-9dae-bb17c585e680
        verification = default

        [admin]
        addr = 127.0.0.1
        port = 14618

        [db]
        addr = 127.0.0.1
        port = 14619
        engine = sqlite
        path = /var/lib/shard/accounts.sqlite3

        [crypt]
        admin_k = AQ==
        admin_n = Fw==
        admin_x = Ag==
        admin_g = 19
    ";

    #[test]
    fn parses_every_required_section() {
        let config = ShardConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.lobby.port, 14617);
        assert_eq!(config.log.level, LogLevel::Info);
        assert_eq!(config.client.verification, VerificationPolicy::Default);
        assert_eq!(config.admin.as_ref().unwrap().port, 14618);
        assert_eq!(config.db_engine.engine, "sqlite");
        assert_eq!(config.db_engine.path, "/var/lib/shard/accounts.sqlite3");
    }

    #[test]
    fn reads_role_scoped_crypt_keys() {
        let config = ShardConfig::parse(SAMPLE).unwrap();
        let keys = config.crypt_keys("admin").unwrap();
        assert_eq!(keys.generator, 19);
        assert_eq!(keys.k_base64, "AQ==");
    }

    #[test]
    fn missing_section_reports_its_key() {
        let minimal = "[lobby]\nbindaddr = 0.0.0.0\nextaddr = x\nport = 1\n";
        let err = ShardConfig::parse(minimal).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { .. }));
    }
}
