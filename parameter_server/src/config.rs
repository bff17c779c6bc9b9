use std::{env, fmt, fs, str::FromStr};

use crate::{KvErr, Result};

const ROLE: &str = "DMLC_ROLE";
const ROOT_URI: &str = "DMLC_PS_ROOT_URI";
const ROOT_PORT: &str = "DMLC_PS_ROOT_PORT";
const NUM_WORKER: &str = "DMLC_NUM_WORKER";
const KVSTORE_TYPE: &str = "KVSTORE_TYPE";

/// The file read when the root address isn't in the environment, it holds `<ip> <port>`.
pub const MACHINE_LIST: &str = "scheduler_machine_list";

/// How pushed gradients are combined into the stored values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvStoreKind {
    /// Single process store.
    Local,
    /// Pushes of a key are summed across workers and applied once per step.
    DistSync,
    /// Every push is applied as soon as it arrives.
    DistAsync,
}

impl KvStoreKind {
    pub fn is_distributed(self) -> bool {
        !matches!(self, KvStoreKind::Local)
    }
}

impl FromStr for KvStoreKind {
    type Err = KvErr;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(KvStoreKind::Local),
            "dist_sync" => Ok(KvStoreKind::DistSync),
            "dist_async" => Ok(KvStoreKind::DistAsync),
            other => Err(KvErr::Config(format!("unknown key-value store kind {other:?}"))),
        }
    }
}

impl fmt::Display for KvStoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KvStoreKind::Local => "local",
            KvStoreKind::DistSync => "dist_sync",
            KvStoreKind::DistAsync => "dist_async",
        })
    }
}

/// The part a process plays in a distributed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// No distributed job, the process trains on its own.
    Local,
    Worker,
    Server,
}

impl FromStr for Role {
    type Err = KvErr;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "worker" => Ok(Role::Worker),
            "server" => Ok(Role::Server),
            other => Err(KvErr::Config(format!("unsupported role {other:?}"))),
        }
    }
}

/// Coordination settings of the key-value store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvConfig {
    pub kind: KvStoreKind,
    pub role: Role,
    pub root_uri: String,
    pub root_port: u16,
    pub num_workers: usize,
}

impl KvConfig {
    /// A single process configuration.
    pub fn local() -> Self {
        Self {
            kind: KvStoreKind::Local,
            role: Role::Local,
            root_uri: String::new(),
            root_port: 0,
            num_workers: 1,
        }
    }

    /// Reads the configuration from the `DMLC_*` environment, falling back to the
    /// `scheduler_machine_list` file for the root address.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(
            |name| env::var(name).ok(),
            || fs::read_to_string(MACHINE_LIST).map_err(KvErr::from),
        )
    }

    /// Builds the configuration from arbitrary variable and machine list sources.
    ///
    /// # Arguments
    /// * `var` - Looks up a variable by name.
    /// * `machine_list` - Reads the machine list, only called when the root address is missing.
    pub fn from_vars<V, M>(var: V, machine_list: M) -> Result<Self>
    where
        V: Fn(&str) -> Option<String>,
        M: FnOnce() -> Result<String>,
    {
        let role = var(ROLE).map(|r| r.parse::<Role>()).transpose()?;

        let kind = match var(KVSTORE_TYPE) {
            Some(kind) => kind.parse::<KvStoreKind>()?,
            None if role.is_some() => KvStoreKind::DistAsync,
            None => KvStoreKind::Local,
        };

        let role = match (role, kind.is_distributed()) {
            (Some(role), true) => role,
            (None, false) => return Ok(Self::local()),
            (None, true) => {
                return Err(KvErr::Config(format!("{kind} needs {ROLE} to be set")));
            }
            (Some(role), false) => {
                return Err(KvErr::Config(format!(
                    "{ROLE}={role:?} needs a distributed {KVSTORE_TYPE}, got {kind}"
                )));
            }
        };

        let (root_uri, root_port) = match (var(ROOT_URI), var(ROOT_PORT)) {
            (Some(uri), Some(port)) => (uri, port),
            (Some(uri), None) => {
                return Err(KvErr::Config(format!("{ROOT_URI}={uri} without {ROOT_PORT}")));
            }
            (None, _) => parse_machine_list(&machine_list()?)?,
        };

        let root_port = root_port
            .parse::<u16>()
            .map_err(|e| KvErr::Config(format!("invalid root port {root_port:?}: {e}")))?;

        let num_workers = match var(NUM_WORKER) {
            Some(n) => n
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| KvErr::Config(format!("invalid {NUM_WORKER} {n:?}")))?,
            None => 1,
        };

        Ok(Self {
            kind,
            role,
            root_uri,
            root_port,
            num_workers,
        })
    }

    /// The address the server listens on and workers connect to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.root_uri, self.root_port)
    }
}

/// Parses the first `<ip> <port>` pair of a machine list.
fn parse_machine_list(list: &str) -> Result<(String, String)> {
    let mut fields = list.split_whitespace();

    match (fields.next(), fields.next()) {
        (Some(ip), Some(port)) => Ok((ip.to_string(), port.to_string())),
        _ => Err(KvErr::Config(format!(
            "{MACHINE_LIST} must contain an ip and a port, got {list:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|&(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn no_machine_list() -> Result<String> {
        Err(KvErr::Config("no machine list".into()))
    }

    #[test]
    fn no_role_means_local() {
        let config = KvConfig::from_vars(vars(&[]), no_machine_list).unwrap();
        assert_eq!(config, KvConfig::local());
    }

    #[test]
    fn role_defaults_to_async() {
        let config = KvConfig::from_vars(
            vars(&[
                (ROLE, "worker"),
                (ROOT_URI, "10.0.0.1"),
                (ROOT_PORT, "9091"),
                (NUM_WORKER, "4"),
            ]),
            no_machine_list,
        )
        .unwrap();

        assert_eq!(config.kind, KvStoreKind::DistAsync);
        assert_eq!(config.role, Role::Worker);
        assert_eq!(config.num_workers, 4);
        assert_eq!(config.addr(), "10.0.0.1:9091");
    }

    #[test]
    fn falls_back_to_machine_list() {
        let config = KvConfig::from_vars(
            vars(&[(ROLE, "server"), (KVSTORE_TYPE, "dist_sync")]),
            || Ok("192.168.1.7 8000\n".to_string()),
        )
        .unwrap();

        assert_eq!(config.kind, KvStoreKind::DistSync);
        assert_eq!(config.role, Role::Server);
        assert_eq!(config.addr(), "192.168.1.7:8000");
        assert_eq!(config.num_workers, 1);
    }

    #[test]
    fn rejects_bad_settings() {
        let bad = [
            vec![(ROLE, "scheduler")],
            vec![(KVSTORE_TYPE, "dist_sync")],
            vec![(ROLE, "server"), (KVSTORE_TYPE, "local")],
            vec![(ROLE, "worker"), (KVSTORE_TYPE, "local"), (ROOT_URI, "h"), (ROOT_PORT, "1")],
            vec![(KVSTORE_TYPE, "device")],
            vec![(ROLE, "worker"), (ROOT_URI, "h"), (ROOT_PORT, "port")],
            vec![(ROLE, "worker"), (ROOT_URI, "h"), (ROOT_PORT, "1"), (NUM_WORKER, "0")],
            vec![(ROLE, "worker")],
        ];

        for pairs in bad {
            assert!(KvConfig::from_vars(vars(&pairs), no_machine_list).is_err(), "{pairs:?}");
        }
    }

    #[test]
    fn kinds_round_trip_through_strings() {
        for kind in [KvStoreKind::Local, KvStoreKind::DistSync, KvStoreKind::DistAsync] {
            assert_eq!(kind.to_string().parse::<KvStoreKind>().unwrap(), kind);
        }
    }
}
