//! Index records.
//!
//! A record pairs a spatial object (plus an optional payload) with one of
//! the object's z-values. Adding an object writes one record per z-value;
//! they differ only in `z`.
//!
//! Two flavours are provided:
//!
//! - [`StableRecord`] allocates the object once behind an `Arc`, so every
//!   z-value entry and every join output shares it. Cursors over stable
//!   records hand out references to the stored records.
//! - [`MutableRecord`] owns its fields. Cursors may decode or copy entries
//!   into a reusable buffer, so callers copy a record out (`clone` or
//!   [`Record::copy_to`]) before advancing.

use crate::index::IndexKey;
use crate::space::ZValue;
use crate::spatial_object::{SoId, SpatialObject};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// An entry of a spatial index.
pub trait Record: Clone + fmt::Debug {
    type Object: SpatialObject;

    /// The z-value this record is stored under.
    fn z(&self) -> ZValue;

    fn set_z(&mut self, z: ZValue);

    /// Id of the spatial object, the secondary key.
    fn soid(&self) -> SoId;

    fn spatial_object(&self) -> &Self::Object;

    /// The index key, `(z, soid)`.
    fn key(&self) -> IndexKey {
        IndexKey::new(self.z(), self.soid())
    }

    /// Overwrite `target` with this record, reusing its allocations where
    /// possible.
    fn copy_to(&self, target: &mut Self) {
        target.clone_from(self);
    }
}

/// Builds the record stored for a newly added object.
///
/// The object's id is already assigned when the factory runs.
pub trait RecordFactory<R: Record> {
    fn new_record(&mut self, object: &R::Object) -> R;
}

impl<R, F> RecordFactory<R> for F
where
    R: Record,
    F: FnMut(&R::Object) -> R,
{
    fn new_record(&mut self, object: &R::Object) -> R {
        self(object)
    }
}

struct Shared<O, T> {
    soid: SoId,
    object: O,
    payload: T,
}

/// A record whose object and payload are shared by all its copies.
pub struct StableRecord<O, T = ()> {
    z: ZValue,
    shared: Arc<Shared<O, T>>,
}

impl<O: SpatialObject> StableRecord<O> {
    /// A record without payload. The soid is taken from the object's id.
    pub fn new(object: O) -> Self {
        Self::with_payload(object, ())
    }

    /// A factory cloning each added object into a new record.
    pub fn factory() -> impl FnMut(&O) -> Self
    where
        O: Clone,
    {
        |object: &O| StableRecord::new(object.clone())
    }
}

impl<O: SpatialObject, T> StableRecord<O, T> {
    pub fn with_payload(object: O, payload: T) -> Self {
        Self {
            z: ZValue::ROOT,
            shared: Arc::new(Shared {
                soid: object.id().unwrap_or_default(),
                object,
                payload,
            }),
        }
    }

    /// A factory attaching a payload computed from each added object.
    pub fn factory_with<F>(mut payload: F) -> impl FnMut(&O) -> Self
    where
        O: Clone,
        F: FnMut(&O) -> T,
    {
        move |object: &O| StableRecord::with_payload(object.clone(), payload(object))
    }

    pub fn payload(&self) -> &T {
        &self.shared.payload
    }

    /// True if both records share the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<O, T> Clone for StableRecord<O, T> {
    fn clone(&self) -> Self {
        Self {
            z: self.z,
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<O: fmt::Debug, T: fmt::Debug> fmt::Debug for StableRecord<O, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StableRecord")
            .field("z", &self.z)
            .field("soid", &self.shared.soid)
            .field("object", &self.shared.object)
            .field("payload", &self.shared.payload)
            .finish()
    }
}

impl<O: SpatialObject, T: fmt::Debug> Record for StableRecord<O, T> {
    type Object = O;

    fn z(&self) -> ZValue {
        self.z
    }

    fn set_z(&mut self, z: ZValue) {
        self.z = z;
    }

    fn soid(&self) -> SoId {
        self.shared.soid
    }

    fn spatial_object(&self) -> &O {
        &self.shared.object
    }

    fn copy_to(&self, target: &mut Self) {
        target.z = self.z;
        if !self.ptr_eq(target) {
            target.shared = Arc::clone(&self.shared);
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RecordRepr<O, T> {
    z: ZValue,
    soid: SoId,
    object: O,
    payload: T,
}

impl<O: Serialize, T: Serialize> Serialize for StableRecord<O, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        RecordRepr {
            z: self.z,
            soid: self.shared.soid,
            object: &self.shared.object,
            payload: &self.shared.payload,
        }
        .serialize(serializer)
    }
}

impl<'de, O: DeserializeOwned, T: DeserializeOwned> Deserialize<'de> for StableRecord<O, T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let repr = RecordRepr::<O, T>::deserialize(deserializer)?;
        Ok(Self {
            z: repr.z,
            shared: Arc::new(Shared {
                soid: repr.soid,
                object: repr.object,
                payload: repr.payload,
            }),
        })
    }
}

/// A record that owns its object and payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutableRecord<O, T = ()> {
    z: ZValue,
    soid: SoId,
    object: O,
    payload: T,
}

impl<O: SpatialObject> MutableRecord<O> {
    /// A record without payload. The soid is taken from the object's id.
    pub fn new(object: O) -> Self {
        Self::with_payload(object, ())
    }

    /// A factory cloning each added object into a new record.
    pub fn factory() -> impl FnMut(&O) -> Self
    where
        O: Clone,
    {
        |object: &O| MutableRecord::new(object.clone())
    }
}

impl<O: SpatialObject, T> MutableRecord<O, T> {
    pub fn with_payload(object: O, payload: T) -> Self {
        Self {
            z: ZValue::ROOT,
            soid: object.id().unwrap_or_default(),
            object,
            payload,
        }
    }

    /// A factory attaching a payload computed from each added object.
    pub fn factory_with<F>(mut payload: F) -> impl FnMut(&O) -> Self
    where
        O: Clone,
        F: FnMut(&O) -> T,
    {
        move |object: &O| MutableRecord::with_payload(object.clone(), payload(object))
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut T {
        &mut self.payload
    }

    /// Take the object and payload apart.
    pub fn into_parts(self) -> (O, T) {
        (self.object, self.payload)
    }
}

impl<O, T> Record for MutableRecord<O, T>
where
    O: SpatialObject + Clone,
    T: Clone + fmt::Debug,
{
    type Object = O;

    fn z(&self) -> ZValue {
        self.z
    }

    fn set_z(&mut self, z: ZValue) {
        self.z = z;
    }

    fn soid(&self) -> SoId {
        self.soid
    }

    fn spatial_object(&self) -> &O {
        &self.object
    }

    fn copy_to(&self, target: &mut Self) {
        target.z = self.z;
        target.soid = self.soid;
        target.object.clone_from(&self.object);
        target.payload.clone_from(&self.payload);
    }
}
