//! # Target/Port Map Model
//!
//! The typed form of the intermediate artifact handed over by the upstream
//! port-discovery stage: for every live host, the set of open ports grouped
//! by transport protocol.
//!
//! The upstream stage serializes this as a JSON document shaped like
//!
//! ```json
//! { "10.10.10.155": { "tcp": [22, 80], "udp": [161] } }
//! ```
//!
//! Protocol keys are kept as strings rather than an enum: the map is
//! produced by an external collaborator and dispatch has a defined fallback
//! for unrecognized values, so rejecting them at parse time would change
//! pipeline behavior.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::PipelineError;

/// Mapping of host -> protocol -> open ports.
///
/// BTree containers give deduplication plus deterministic iteration order,
/// so a dispatch pass visits (host, protocol) pairs and joins port lists the
/// same way every run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TargetPortMap(pub BTreeMap<String, BTreeMap<String, BTreeSet<u16>>>);

/// Upstream serializers emit ports as either numbers or numeric strings
/// (the discovery tool reports them as strings); both are accepted.
#[derive(Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u16),
    Text(String),
}

impl<'de> Deserialize<'de> for TargetPortMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: BTreeMap<String, BTreeMap<String, Vec<PortValue>>> =
            Deserialize::deserialize(deserializer)?;

        let mut map = TargetPortMap::new();
        for (host, protocols) in raw {
            for (protocol, ports) in protocols {
                let mut parsed = BTreeSet::new();
                for value in ports {
                    let port = match value {
                        PortValue::Number(n) => n,
                        PortValue::Text(s) => s
                            .parse()
                            .map_err(|_| D::Error::custom(format!("invalid port {s:?}")))?,
                    };
                    parsed.insert(port);
                }
                map.0.entry(host.clone()).or_default().insert(protocol, parsed);
            }
        }
        Ok(map)
    }
}

impl TargetPortMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and validates the serialized map. Read once at the start of
    /// dispatch and never mutated afterwards.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let raw = std::fs::read(path).map_err(|source| PipelineError::PortMapRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&raw).map_err(|source| PipelineError::PortMapParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Iterates over every (host, protocol, ports) entry.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &BTreeSet<u16>)> {
        self.0.iter().flat_map(|(host, protocols)| {
            protocols
                .iter()
                .map(move |(proto, ports)| (host.as_str(), proto.as_str(), ports))
        })
    }

    pub fn insert(&mut self, host: &str, protocol: &str, ports: impl IntoIterator<Item = u16>) {
        self.0
            .entry(host.to_string())
            .or_default()
            .entry(protocol.to_string())
            .or_default()
            .extend(ports);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Set difference against the configured web ports, in ascending order.
pub fn non_web_ports(ports: &BTreeSet<u16>, web_ports: &BTreeSet<u16>) -> Vec<u16> {
    ports.difference(web_ports).copied().collect()
}
