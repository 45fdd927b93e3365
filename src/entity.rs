//! Entity model and liveliness key codec (spec §3, §4.1).
//!
//! Every node and endpoint in ZRM is represented on the wire as a single
//! liveliness key under the admin namespace [`LIVELINESS_PREFIX`]. Discovery
//! works by watching that namespace: a key's *presence* means its entity is
//! alive, its *absence* means it is not.

use crate::error::{Error, Result};

/// Admin-space prefix under which all ZRM liveliness keys live.
pub const LIVELINESS_PREFIX: &str = "@zrm_lv";

/// The closed set of entity kinds ZRM discovers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Node,
    Publisher,
    Subscriber,
    Service,
    Client,
}

impl EntityKind {
    /// Two-character wire code used in liveliness keys.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Node => "NN",
            EntityKind::Publisher => "MP",
            EntityKind::Subscriber => "MS",
            EntityKind::Service => "SS",
            EntityKind::Client => "SC",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "NN" => Some(EntityKind::Node),
            "MP" => Some(EntityKind::Publisher),
            "MS" => Some(EntityKind::Subscriber),
            "SS" => Some(EntityKind::Service),
            "SC" => Some(EntityKind::Client),
            _ => None,
        }
    }
}

/// A node's discoverable identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEntity {
    pub domain_id: u32,
    pub z_id: String,
    pub name: String,
}

/// An endpoint's discoverable identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointEntity {
    pub domain_id: u32,
    pub z_id: String,
    pub kind: EntityKind,
    pub node_name: String,
    pub topic: String,
    pub type_name: Option<String>,
}

/// A discovered entity, either a node or one of its endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Node(NodeEntity),
    Endpoint(EndpointEntity),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Node(_) => EntityKind::Node,
            Entity::Endpoint(e) => e.kind,
        }
    }

    pub fn domain_id(&self) -> u32 {
        match self {
            Entity::Node(n) => n.domain_id,
            Entity::Endpoint(e) => e.domain_id,
        }
    }
}

/// Escapes `/` as `%` so the key's `/`-separated segments stay unambiguous.
pub fn mangle_name(name: &str) -> String {
    name.replace('/', "%")
}

/// Inverse of [`mangle_name`].
pub fn unmangle_name(mangled: &str) -> String {
    mangled.replace('%', "/")
}

/// Builds the liveliness key for `entity`.
pub fn to_key(entity: &Entity) -> String {
    match entity {
        Entity::Node(n) => format!(
            "{LIVELINESS_PREFIX}/{}/{}/{}/{}",
            n.domain_id,
            n.z_id,
            EntityKind::Node.as_str(),
            mangle_name(&n.name)
        ),
        Entity::Endpoint(e) => {
            let type_seg = e
                .type_name
                .as_deref()
                .map(mangle_name)
                .unwrap_or_else(|| "EMPTY".to_string());
            format!(
                "{LIVELINESS_PREFIX}/{}/{}/{}/{}/{}/{}",
                e.domain_id,
                e.z_id,
                e.kind.as_str(),
                mangle_name(&e.node_name),
                mangle_name(&e.topic),
                type_seg
            )
        }
    }
}

/// Parses a liveliness key. Returns `Ok(None)` for keys outside the admin
/// namespace or with an unrecognized trailer shape (treated as ignorable
/// per spec §3); returns `Err` for a key too short to even carry a kind
/// code, or for a malformed node key.
pub fn from_key(key: &str) -> Result<Option<Entity>> {
    let parts: Vec<&str> = key.split('/').collect();
    if parts.is_empty() || parts[0] != LIVELINESS_PREFIX {
        return Ok(None);
    }
    if parts.len() < 4 {
        return Err(Error::InvalidKey(format!("liveliness key too short: {key}")));
    }
    let domain_id: u32 = match parts[1].parse() {
        Ok(d) => d,
        Err(_) => return Ok(None),
    };
    let z_id = parts[2].to_string();
    let kind = match EntityKind::from_code(parts[3]) {
        Some(k) => k,
        None => return Ok(None),
    };

    match kind {
        EntityKind::Node => {
            if parts.len() != 5 {
                return Err(Error::InvalidKey(format!(
                    "malformed node key: {key}"
                )));
            }
            Ok(Some(Entity::Node(NodeEntity {
                domain_id,
                z_id,
                name: unmangle_name(parts[4]),
            })))
        }
        _ => {
            if parts.len() != 7 {
                // Malformed endpoint keys are ignorable, not fatal.
                return Ok(None);
            }
            let type_name = if parts[6] == "EMPTY" {
                None
            } else {
                Some(unmangle_name(parts[6]))
            };
            Ok(Some(Entity::Endpoint(EndpointEntity {
                domain_id,
                z_id,
                kind,
                node_name: unmangle_name(parts[4]),
                topic: unmangle_name(parts[5]),
                type_name,
            })))
        }
    }
}
