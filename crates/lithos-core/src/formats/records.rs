//! # Versioned Records
//!
//! Every entry of a subsystem file is a [`TaggedRecord`]: a registered type
//! tag, the schema version the writer used, and the postcard body.
//!
//! Bodies only ever grow by appending fields. Decoding reads the prefix a
//! version is known to contain and ignores trailing bytes, so an older
//! reader skips fields it does not know, and a newer reader fills fields
//! missing from older data with their default.
//!
//! Polymorphic entries (components and coordinate systems) are decoded
//! through a process-wide type table keyed by tag.

use crate::components::{
    Component, ContactKind, Fault, FaultBlock, FaultKind, Horizon, HorizonKind,
    StratigraphicUnit,
};
use crate::crs::{ATTRIBUTE_TAG, CoordinateSystem, GEOGRAPHIC_TAG, GeographicInfo};
use crate::types::{ComponentId, ComponentType, Edge, Identity, LithosError};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use uuid::Uuid;

pub(crate) const IDENTITY_TAG: &str = "Identity";
pub(crate) const COMPONENT_TAG: &str = "Component";
pub(crate) const EDGE_TAG: &str = "Edge";

// =============================================================================
// TAGGED RECORD
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedRecord {
    pub type_tag: String,
    pub version: u16,
    pub payload: Vec<u8>,
}

impl TaggedRecord {
    pub fn encode<T: Serialize>(
        type_tag: &str,
        version: u16,
        body: &T,
    ) -> Result<Self, LithosError> {
        let payload = postcard::to_stdvec(body)
            .map_err(|e| LithosError::SerializationError(e.to_string()))?;
        Ok(Self {
            type_tag: type_tag.to_string(),
            version,
            payload,
        })
    }

    /// Decode the leading fields as `T`, ignoring any trailing ones.
    pub fn body<T: DeserializeOwned>(&self) -> Result<T, LithosError> {
        if self.version == 0 {
            return Err(LithosError::SerializationError(format!(
                "{} record has no schema version",
                self.type_tag
            )));
        }
        postcard::take_from_bytes::<T>(&self.payload)
            .map(|(body, _trailing)| body)
            .map_err(|e| {
                LithosError::SerializationError(format!(
                    "{} record v{}: {e}",
                    self.type_tag, self.version
                ))
            })
    }

    fn expect_tag(&self, tag: &str) -> Result<(), LithosError> {
        if self.type_tag != tag {
            return Err(LithosError::SerializationError(format!(
                "expected a {tag} record, found {}",
                self.type_tag
            )));
        }
        Ok(())
    }
}

// =============================================================================
// RECORD BODIES
// =============================================================================

const FAULT_VERSION: u16 = 1;
/// v2 appended `contact`.
const HORIZON_VERSION: u16 = 2;
const NAMED_VERSION: u16 = 1;
const CRS_VERSION: u16 = 1;
const GRAPH_VERSION: u16 = 1;

#[derive(Serialize, Deserialize)]
struct FaultBody {
    id: Uuid,
    name: String,
    kind: Option<FaultKind>,
}

#[derive(Serialize, Deserialize)]
struct HorizonBodyV1 {
    id: Uuid,
    name: String,
    kind: Option<HorizonKind>,
}

#[derive(Serialize, Deserialize)]
struct HorizonBody {
    id: Uuid,
    name: String,
    kind: Option<HorizonKind>,
    contact: ContactKind,
}

#[derive(Serialize, Deserialize)]
struct NamedBody {
    id: Uuid,
    name: String,
}

#[derive(Serialize, Deserialize)]
struct GeographicBody {
    system: String,
    active: bool,
    info: GeographicInfo,
}

#[derive(Serialize, Deserialize)]
struct AttributeBody {
    system: String,
    active: bool,
    attribute_name: String,
}

// =============================================================================
// ENCODING
// =============================================================================

/// Components that can be written as a tagged record.
pub(crate) trait Persisted: Component {
    fn to_record(&self) -> Result<TaggedRecord, LithosError>;
}

impl Persisted for Fault {
    fn to_record(&self) -> Result<TaggedRecord, LithosError> {
        let body = FaultBody {
            id: self.id(),
            name: self.name().to_string(),
            kind: self.kind(),
        };
        TaggedRecord::encode(Self::TYPE.as_str(), FAULT_VERSION, &body)
    }
}

impl Persisted for Horizon {
    fn to_record(&self) -> Result<TaggedRecord, LithosError> {
        let body = HorizonBody {
            id: self.id(),
            name: self.name().to_string(),
            kind: self.kind(),
            contact: self.contact(),
        };
        TaggedRecord::encode(Self::TYPE.as_str(), HORIZON_VERSION, &body)
    }
}

impl Persisted for FaultBlock {
    fn to_record(&self) -> Result<TaggedRecord, LithosError> {
        named_record(self)
    }
}

impl Persisted for StratigraphicUnit {
    fn to_record(&self) -> Result<TaggedRecord, LithosError> {
        named_record(self)
    }
}

fn named_record<T: Component>(component: &T) -> Result<TaggedRecord, LithosError> {
    let body = NamedBody {
        id: component.id(),
        name: component.name().to_string(),
    };
    TaggedRecord::encode(T::TYPE.as_str(), NAMED_VERSION, &body)
}

pub(crate) fn coordinate_system_record(
    name: &str,
    system: &CoordinateSystem,
    active: bool,
) -> Result<TaggedRecord, LithosError> {
    let system_name = name.to_string();
    match system {
        CoordinateSystem::Geographic(info) => TaggedRecord::encode(
            system.type_tag(),
            CRS_VERSION,
            &GeographicBody {
                system: system_name,
                active,
                info: info.clone(),
            },
        ),
        CoordinateSystem::Attribute { attribute_name } => TaggedRecord::encode(
            system.type_tag(),
            CRS_VERSION,
            &AttributeBody {
                system: system_name,
                active,
                attribute_name: attribute_name.clone(),
            },
        ),
    }
}

pub(crate) fn identity_record(identity: &Identity) -> Result<TaggedRecord, LithosError> {
    TaggedRecord::encode(IDENTITY_TAG, GRAPH_VERSION, identity)
}

pub(crate) fn component_record(id: &ComponentId) -> Result<TaggedRecord, LithosError> {
    TaggedRecord::encode(COMPONENT_TAG, GRAPH_VERSION, id)
}

pub(crate) fn edge_record(edge: &Edge) -> Result<TaggedRecord, LithosError> {
    TaggedRecord::encode(EDGE_TAG, GRAPH_VERSION, edge)
}

pub(crate) fn decode_identity(record: &TaggedRecord) -> Result<Identity, LithosError> {
    record.expect_tag(IDENTITY_TAG)?;
    record.body()
}

pub(crate) fn decode_component_id(record: &TaggedRecord) -> Result<ComponentId, LithosError> {
    record.expect_tag(COMPONENT_TAG)?;
    record.body()
}

pub(crate) fn decode_edge(record: &TaggedRecord) -> Result<Edge, LithosError> {
    record.expect_tag(EDGE_TAG)?;
    record.body()
}

// =============================================================================
// TYPE TABLE
// =============================================================================

/// Result of decoding a polymorphic record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedRecord {
    Fault(Fault),
    Horizon(Horizon),
    FaultBlock(FaultBlock),
    StratigraphicUnit(StratigraphicUnit),
    CoordinateSystem {
        name: String,
        system: CoordinateSystem,
        active: bool,
    },
}

impl DecodedRecord {
    /// Component type of a decoded component, `None` for coordinate systems.
    #[must_use]
    pub fn component_type(&self) -> Option<ComponentType> {
        match self {
            Self::Fault(_) => Some(ComponentType::Fault),
            Self::Horizon(_) => Some(ComponentType::Horizon),
            Self::FaultBlock(_) => Some(ComponentType::FaultBlock),
            Self::StratigraphicUnit(_) => Some(ComponentType::StratigraphicUnit),
            Self::CoordinateSystem { .. } => None,
        }
    }
}

pub type RecordDecoder = fn(&TaggedRecord) -> Result<DecodedRecord, LithosError>;

static TYPE_TABLE: LazyLock<RwLock<BTreeMap<String, RecordDecoder>>> =
    LazyLock::new(|| RwLock::new(builtin_types()));

fn builtin_types() -> BTreeMap<String, RecordDecoder> {
    let entries: [(&str, RecordDecoder); 6] = [
        (ComponentType::Fault.as_str(), decode_fault),
        (ComponentType::Horizon.as_str(), decode_horizon),
        (ComponentType::FaultBlock.as_str(), decode_fault_block),
        (ComponentType::StratigraphicUnit.as_str(), decode_stratigraphic_unit),
        (GEOGRAPHIC_TAG, decode_geographic),
        (ATTRIBUTE_TAG, decode_attribute),
    ];
    entries
        .into_iter()
        .map(|(tag, decoder)| (tag.to_string(), decoder))
        .collect()
}

/// Add a decoder for a new tag. Existing tags cannot be replaced.
pub fn register_type(tag: impl Into<String>, decoder: RecordDecoder) -> Result<(), LithosError> {
    let tag = tag.into();
    let mut table = TYPE_TABLE.write();
    if table.contains_key(&tag) {
        return Err(LithosError::invariant(format!(
            "type tag '{tag}' is already registered"
        )));
    }
    table.insert(tag, decoder);
    Ok(())
}

/// Every registered tag, sorted.
pub fn registered_types() -> Vec<String> {
    TYPE_TABLE.read().keys().cloned().collect()
}

pub(crate) fn force_type_table() -> usize {
    TYPE_TABLE.read().len()
}

/// Decode through the type table.
pub fn decode_record(record: &TaggedRecord) -> Result<DecodedRecord, LithosError> {
    let decoder = TYPE_TABLE.read().get(&record.type_tag).copied();
    let decoder = decoder.ok_or_else(|| {
        LithosError::SerializationError(format!("unknown type tag '{}'", record.type_tag))
    })?;
    decoder(record)
}

fn decode_fault(record: &TaggedRecord) -> Result<DecodedRecord, LithosError> {
    let body: FaultBody = record.body()?;
    Ok(DecodedRecord::Fault(Fault::from_parts(body.id, body.name, body.kind)))
}

fn decode_horizon(record: &TaggedRecord) -> Result<DecodedRecord, LithosError> {
    let horizon = if record.version < HORIZON_VERSION {
        let body: HorizonBodyV1 = record.body()?;
        Horizon::from_parts(body.id, body.name, body.kind, ContactKind::default())
    } else {
        let body: HorizonBody = record.body()?;
        Horizon::from_parts(body.id, body.name, body.kind, body.contact)
    };
    Ok(DecodedRecord::Horizon(horizon))
}

fn decode_fault_block(record: &TaggedRecord) -> Result<DecodedRecord, LithosError> {
    let body: NamedBody = record.body()?;
    let mut block = FaultBlock::new(body.id);
    block.set_name(body.name);
    Ok(DecodedRecord::FaultBlock(block))
}

fn decode_stratigraphic_unit(record: &TaggedRecord) -> Result<DecodedRecord, LithosError> {
    let body: NamedBody = record.body()?;
    let mut unit = StratigraphicUnit::new(body.id);
    unit.set_name(body.name);
    Ok(DecodedRecord::StratigraphicUnit(unit))
}

fn decode_geographic(record: &TaggedRecord) -> Result<DecodedRecord, LithosError> {
    let body: GeographicBody = record.body()?;
    Ok(DecodedRecord::CoordinateSystem {
        name: body.system,
        system: CoordinateSystem::Geographic(body.info),
        active: body.active,
    })
}

fn decode_attribute(record: &TaggedRecord) -> Result<DecodedRecord, LithosError> {
    let body: AttributeBody = record.body()?;
    Ok(DecodedRecord::CoordinateSystem {
        name: body.system,
        system: CoordinateSystem::Attribute {
            attribute_name: body.attribute_name,
        },
        active: body.active,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn horizon_v1_loads_with_default_contact() {
        let id = Uuid::new_v4();
        let v1 = HorizonBodyV1 {
            id,
            name: "top".to_string(),
            kind: Some(HorizonKind::Topography),
        };
        let record = TaggedRecord::encode("Horizon", 1, &v1).expect("encode");

        let DecodedRecord::Horizon(horizon) = decode_record(&record).expect("decode") else {
            panic!("expected a horizon");
        };
        assert_eq!(horizon.id(), id);
        assert_eq!(horizon.name(), "top");
        assert_eq!(horizon.kind(), Some(HorizonKind::Topography));
        assert_eq!(horizon.contact(), ContactKind::Conformal);
    }

    #[test]
    fn trailing_fields_of_newer_writers_are_ignored() {
        #[derive(Serialize)]
        struct FutureNamed {
            id: Uuid,
            name: String,
            thickness_hint: u32,
            comment: String,
        }
        let id = Uuid::new_v4();
        let future = FutureNamed {
            id,
            name: "U1".to_string(),
            thickness_hint: 40,
            comment: "appended later".to_string(),
        };
        let record = TaggedRecord::encode("StratigraphicUnit", 7, &future).expect("encode");

        let decoded = decode_record(&record).expect("decode");
        assert_eq!(decoded.component_type(), Some(ComponentType::StratigraphicUnit));
        let DecodedRecord::StratigraphicUnit(unit) = decoded else {
            panic!("expected a unit");
        };
        assert_eq!(unit.id(), id);
        assert_eq!(unit.name(), "U1");
    }

    #[test]
    fn horizon_roundtrip_keeps_contact() {
        let mut horizon = Horizon::new(Uuid::new_v4());
        horizon.set_contact(ContactKind::Erosion);
        let record = horizon.to_record().expect("encode");
        assert_eq!(record.version, HORIZON_VERSION);
        assert_eq!(decode_record(&record).expect("decode"), DecodedRecord::Horizon(horizon));
    }

    #[test]
    fn coordinate_systems_use_their_tag() {
        let system = CoordinateSystem::Attribute {
            attribute_name: "geo_xyz".to_string(),
        };
        let record = coordinate_system_record("local", &system, true).expect("encode");
        assert_eq!(record.type_tag, ATTRIBUTE_TAG);
        assert_eq!(
            decode_record(&record).expect("decode"),
            DecodedRecord::CoordinateSystem {
                name: "local".to_string(),
                system,
                active: true,
            }
        );
    }

    #[test]
    fn unknown_tag_and_version_zero_are_rejected() {
        let record = TaggedRecord {
            type_tag: "Volcano".to_string(),
            version: 1,
            payload: Vec::new(),
        };
        assert!(decode_record(&record).is_err());

        let mut record = Fault::new(Uuid::new_v4()).to_record().expect("encode");
        record.version = 0;
        assert!(decode_record(&record).is_err());
    }

    #[test]
    fn registered_alias_decodes() {
        fn legacy_block(record: &TaggedRecord) -> Result<DecodedRecord, LithosError> {
            decode_fault_block(record)
        }
        register_type("LegacyFaultBlock", legacy_block).expect("register");
        assert!(register_type("LegacyFaultBlock", legacy_block).is_err());
        assert!(register_type("Fault", legacy_block).is_err());
        assert!(registered_types().contains(&"LegacyFaultBlock".to_string()));

        let mut record = FaultBlock::new(Uuid::new_v4()).to_record().expect("encode");
        record.type_tag = "LegacyFaultBlock".to_string();
        assert_eq!(
            decode_record(&record).expect("decode").component_type(),
            Some(ComponentType::FaultBlock)
        );
    }

    #[test]
    fn graph_records_check_their_tag() {
        let edge_like = identity_record(&Identity::named("m")).expect("encode");
        assert!(decode_edge(&edge_like).is_err());
        assert_eq!(decode_identity(&edge_like).expect("identity").name, "m");
    }
}
