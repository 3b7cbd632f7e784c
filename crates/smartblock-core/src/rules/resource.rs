//! Resource type sets

use bitflags::bitflags;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Request kinds a rule applies to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceTypes: u16 {
        /// JavaScript
        const SCRIPT = 1 << 0;
        /// Images
        const IMAGE = 1 << 1;
        /// CSS
        const STYLESHEET = 1 << 2;
        /// XHR and fetch
        const XMLHTTPREQUEST = 1 << 3;
        /// Anything the host cannot classify
        const OTHER = 1 << 4;
        /// Top-level documents
        const MAIN_FRAME = 1 << 5;
        /// Iframes
        const SUB_FRAME = 1 << 6;
        /// Web fonts
        const FONT = 1 << 7;
        /// Plugin objects
        const OBJECT = 1 << 8;
        /// Beacons and hyperlink auditing
        const PING = 1 << 9;
        /// Audio and video
        const MEDIA = 1 << 10;
        /// WebSocket handshakes
        const WEBSOCKET = 1 << 11;
    }
}

/// Host names, in serialization order
const NAMES: &[(ResourceTypes, &str)] = &[
    (ResourceTypes::SCRIPT, "script"),
    (ResourceTypes::IMAGE, "image"),
    (ResourceTypes::STYLESHEET, "stylesheet"),
    (ResourceTypes::XMLHTTPREQUEST, "xmlhttprequest"),
    (ResourceTypes::OTHER, "other"),
    (ResourceTypes::MAIN_FRAME, "main_frame"),
    (ResourceTypes::SUB_FRAME, "sub_frame"),
    (ResourceTypes::FONT, "font"),
    (ResourceTypes::OBJECT, "object"),
    (ResourceTypes::PING, "ping"),
    (ResourceTypes::MEDIA, "media"),
    (ResourceTypes::WEBSOCKET, "websocket"),
];

impl Default for ResourceTypes {
    /// Subresources that carry ads and trackers; documents are never blocked
    fn default() -> Self {
        Self::SCRIPT | Self::IMAGE | Self::STYLESHEET | Self::XMLHTTPREQUEST | Self::OTHER
    }
}

impl ResourceTypes {
    /// Look up a single type by its host name
    pub fn from_host_name(name: &str) -> Option<Self> {
        NAMES
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name.trim()))
            .map(|(flag, _)| *flag)
    }

    /// Host names of the contained types
    pub fn names(self) -> Vec<&'static str> {
        NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, n)| *n)
            .collect()
    }
}

impl fmt::Display for ResourceTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(","))
    }
}

impl Serialize for ResourceTypes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let names = self.names();
        let mut seq = serializer.serialize_seq(Some(names.len()))?;
        for name in names {
            seq.serialize_element(name)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for ResourceTypes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        names.iter().try_fold(Self::empty(), |acc, name| {
            Self::from_host_name(name)
                .map(|flag| acc | flag)
                .ok_or_else(|| de::Error::custom(format!("unknown resource type '{name}'")))
        })
    }
}
