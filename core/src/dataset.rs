use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;
use std::fmt;

/// Where a [`Dataset`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceTag {
    #[serde(alias = "firebase-rtdb", alias = "local-storage")]
    RemoteDb,
    #[serde(alias = "firebase-rtdb-subscription")]
    RemoteDbSubscription,
    #[serde(alias = "local-json")]
    LocalFile,
    Backup,
    GlobalVariable,
    SampleData,
}

impl SourceTag {
    /// Pull sources in the order the orchestrator tries them.
    pub const PRIORITY: [SourceTag; 5] = [
        SourceTag::RemoteDb,
        SourceTag::LocalFile,
        SourceTag::Backup,
        SourceTag::GlobalVariable,
        SourceTag::SampleData,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceTag::RemoteDb => "remote-db",
            SourceTag::RemoteDbSubscription => "remote-db-subscription",
            SourceTag::LocalFile => "local-file",
            SourceTag::Backup => "backup",
            SourceTag::GlobalVariable => "global-variable",
            SourceTag::SampleData => "sample-data",
        }
    }

    /// Rank within [`SourceTag::PRIORITY`]; pushed deliveries rank with the
    /// remote database they come from.
    #[must_use]
    pub fn priority(self) -> usize {
        match self {
            SourceTag::RemoteDb | SourceTag::RemoteDbSubscription => 0,
            SourceTag::LocalFile => 1,
            SourceTag::Backup => 2,
            SourceTag::GlobalVariable => 3,
            SourceTag::SampleData => 4,
        }
    }

    #[must_use]
    pub fn is_remote(self) -> bool {
        matches!(self, SourceTag::RemoteDb | SourceTag::RemoteDbSubscription)
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One auction listing.
///
/// Only `uid`, an address and a property type are required; everything the
/// collector emits beyond the known fields is carried in `extra` so a stored
/// copy matches what was fetched. A known field holding a value of the wrong
/// type decodes as `None` and keeps its raw value in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    #[serde(rename = "uid", serialize_with = "serialize_uid")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Road-name address, used when `address` is blank.
    #[serde(rename = "naddress", default, skip_serializing_if = "Option::is_none")]
    pub road_address: Option<String>,
    #[serde(rename = "maemulinfo", default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    /// Older collectors wrote the property type under `type`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub legacy_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subregion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(rename = "estimatedprice", default, skip_serializing_if = "Option::is_none")]
    pub appraised_value: Option<i64>,
    #[serde(rename = "minprice", default, skip_serializing_if = "Option::is_none")]
    pub minimum_bid: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub court: Option<String>,
    #[serde(rename = "auctiondate", default, skip_serializing_if = "Option::is_none")]
    pub auction_date: Option<String>,
    #[serde(rename = "auctioncount", default, skip_serializing_if = "Option::is_none")]
    pub auction_count: Option<u32>,
    #[serde(rename = "auctionmsg_url", default, skip_serializing_if = "Option::is_none")]
    pub detail_url: Option<String>,
    #[serde(
        rename = "auctionmsg_display",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub detail_label: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    /// Display address, preferring the lot address over the road address.
    pub fn resolved_address(&self) -> Option<&str> {
        first_filled(self.address.as_deref(), self.road_address.as_deref())
    }

    pub fn resolved_property_type(&self) -> Option<&str> {
        first_filled(self.property_type.as_deref(), self.legacy_type.as_deref())
    }
}

fn first_filled<'a>(primary: Option<&'a str>, fallback: Option<&'a str>) -> Option<&'a str> {
    primary
        .filter(|value| !value.trim().is_empty())
        .or_else(|| fallback.filter(|value| !value.trim().is_empty()))
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;
        let id = match fields.remove("uid") {
            Some(Value::String(text)) => text,
            Some(Value::Number(number)) => number.to_string(),
            _ => String::new(),
        };
        Ok(Record {
            id,
            address: take(&mut fields, "address"),
            road_address: take(&mut fields, "naddress"),
            property_type: take(&mut fields, "maemulinfo"),
            legacy_type: take(&mut fields, "type"),
            region: take(&mut fields, "region"),
            subregion: take(&mut fields, "subregion"),
            lat: take(&mut fields, "lat"),
            lng: take(&mut fields, "lng"),
            appraised_value: take(&mut fields, "estimatedprice"),
            minimum_bid: take(&mut fields, "minprice"),
            percent: take(&mut fields, "percent"),
            court: take(&mut fields, "court"),
            auction_date: take(&mut fields, "auctiondate"),
            auction_count: take(&mut fields, "auctioncount"),
            detail_url: take(&mut fields, "auctionmsg_url"),
            detail_label: take(&mut fields, "auctionmsg_display"),
            extra: fields,
        })
    }
}

/// Pull `key` out of `fields` as a `T`; a value of another type stays behind.
fn take<T: DeserializeOwned>(fields: &mut Map<String, Value>, key: &str) -> Option<T> {
    match fields.remove(key)? {
        Value::Null => None,
        raw => match T::deserialize(&raw) {
            Ok(value) => Some(value),
            Err(_) => {
                fields.insert(key.to_string(), raw);
                None
            }
        },
    }
}

fn serialize_uid<S>(id: &str, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    // Collectors emit numeric ids; keep them numeric on the way back out.
    match id.parse::<u64>() {
        Ok(number) if number.to_string() == id => serializer.serialize_u64(number),
        _ => serializer.serialize_str(id),
    }
}

/// The unit every source produces and every consumer receives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub search_conditions: Value,
    #[serde(rename = "data", default)]
    pub records: Vec<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceTag>,
    #[serde(
        rename = "loadedAt",
        alias = "loaded_at",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub loaded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_sample: bool,
}

impl Dataset {
    /// Stamp the producing source. Only the sample source yields sample data.
    #[must_use]
    pub fn tagged(mut self, source: SourceTag) -> Self {
        self.source = Some(source);
        self.is_sample = source == SourceTag::SampleData;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn provenance(&self) -> Provenance {
        Provenance {
            source: self.source,
            loaded_at: self.loaded_at,
            is_sample: self.is_sample,
        }
    }
}

/// Summary shown by the status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub source: Option<SourceTag>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub is_sample: bool,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = self.source.map_or("unknown", SourceTag::as_str);
        match self.loaded_at {
            Some(loaded_at) => write!(f, "{source} @ {}", loaded_at.to_rfc3339())?,
            None => write!(f, "{source}")?,
        }
        if self.is_sample {
            f.write_str(" (sample)")?;
        }
        Ok(())
    }
}
