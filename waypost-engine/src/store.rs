//! Typed record access over fjall partitions
//!
//! Users and places live in one partition each, with two derived indexes:
//! a normalized-email index for uniqueness lookups, and an owner index
//! whose keys are `{owner}/{place}` composites. The owner index IS the
//! user's place set; writing it together with the place record in one
//! batch is what keeps the back-references consistent.

use fjall::{Partition, PartitionCreateOptions};
use std::sync::Arc;
use waypost_core::*;

use crate::StorageEngine;

/// Collection and index partitions for the two record types.
#[derive(Clone)]
pub struct Store {
    engine: StorageEngine,
    users: Arc<Partition>,
    users_by_email: Arc<Partition>,
    places: Arc<Partition>,
    places_by_owner: Arc<Partition>,
}

impl Store {
    /// Open (or create) all partitions.
    pub fn open(engine: StorageEngine) -> Result<Self> {
        let users = open_partition(&engine, "users")?;
        let users_by_email = open_partition(&engine, "users_by_email")?;
        let places = open_partition(&engine, "places")?;
        let places_by_owner = open_partition(&engine, "places_by_owner")?;

        Ok(Store {
            engine,
            users,
            users_by_email,
            places,
            places_by_owner,
        })
    }

    pub fn engine(&self) -> &StorageEngine {
        &self.engine
    }

    // ---- users ----

    /// Insert a user together with its email-index entry in one atomic batch.
    pub fn insert_user(&self, user: &UserRecord) -> Result<()> {
        let encoded = serde_json::to_vec(user)?;

        let mut batch = self.engine.keyspace().batch();
        batch.insert(&self.users, user.id.to_string(), encoded);
        batch.insert(
            &self.users_by_email,
            normalize_email(&user.email),
            user.id.to_string(),
        );
        batch
            .commit()
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        self.engine.persist()
    }

    pub fn get_user(&self, id: &UserId) -> Result<Option<UserRecord>> {
        match self.users.get(id.to_string()) {
            Ok(Some(raw)) => Ok(Some(serde_json::from_slice(&raw)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(ApiError::Storage(e.to_string())),
        }
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let raw = match self.users_by_email.get(normalize_email(email)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(e) => return Err(ApiError::Storage(e.to_string())),
        };
        let id = UserId::parse(
            std::str::from_utf8(&raw).map_err(|e| ApiError::Storage(e.to_string()))?,
        )?;
        self.get_user(&id)
    }

    pub fn email_taken(&self, email: &str) -> Result<bool> {
        match self.users_by_email.get(normalize_email(email)) {
            Ok(entry) => Ok(entry.is_some()),
            Err(e) => Err(ApiError::Storage(e.to_string())),
        }
    }

    /// All user records, in id order.
    pub fn users(&self) -> Result<Vec<UserRecord>> {
        let mut out = Vec::new();
        for item in self.users.iter() {
            let (_key, raw) = item.map_err(|e| ApiError::Storage(e.to_string()))?;
            out.push(serde_json::from_slice(&raw)?);
        }
        Ok(out)
    }

    // ---- places ----

    pub fn get_place(&self, id: &PlaceId) -> Result<Option<PlaceRecord>> {
        match self.places.get(id.to_string()) {
            Ok(Some(raw)) => Ok(Some(serde_json::from_slice(&raw)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(ApiError::Storage(e.to_string())),
        }
    }

    /// Rewrite a place record in place. The owner link is keyed by ids,
    /// which never change on update, so no index write is needed.
    pub fn put_place(&self, place: &PlaceRecord) -> Result<()> {
        let encoded = serde_json::to_vec(place)?;
        self.places
            .insert(place.id.to_string(), encoded)
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        self.engine.persist()
    }

    /// Insert a place and its owner-index entry in one atomic batch, so no
    /// reader ever observes a place whose owner does not list it.
    pub fn insert_place_linked(&self, place: &PlaceRecord) -> Result<()> {
        let encoded = serde_json::to_vec(place)?;

        let mut batch = self.engine.keyspace().batch();
        batch.insert(&self.places, place.id.to_string(), encoded);
        batch.insert(
            &self.places_by_owner,
            owner_link_key(&place.creator, &place.id),
            place.id.to_string(),
        );
        batch
            .commit()
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        self.engine.persist()
    }

    /// Remove a place and its owner-index entry in one atomic batch.
    pub fn remove_place_linked(&self, place: &PlaceRecord) -> Result<()> {
        let mut batch = self.engine.keyspace().batch();
        batch.remove(&self.places, place.id.to_string());
        batch.remove(
            &self.places_by_owner,
            owner_link_key(&place.creator, &place.id),
        );
        batch
            .commit()
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        self.engine.persist()
    }

    /// Owned place ids for a user, oldest first.
    pub fn place_ids_by_owner(&self, owner: &UserId) -> Result<Vec<PlaceId>> {
        let prefix = format!("{}/", owner).into_bytes();
        let mut ids = Vec::new();

        for item in self.places_by_owner.range(prefix.clone()..) {
            match item {
                Ok((key, value)) => {
                    if !key.starts_with(&prefix) {
                        break;
                    }
                    let raw = std::str::from_utf8(&value)
                        .map_err(|e| ApiError::Storage(e.to_string()))?;
                    ids.push(PlaceId::parse(raw)?);
                }
                Err(e) => return Err(ApiError::Storage(format!("scan error: {}", e))),
            }
        }
        Ok(ids)
    }

    /// All place records, in id order.
    pub fn place_records(&self) -> Result<Vec<PlaceRecord>> {
        let mut out = Vec::new();
        for item in self.places.iter() {
            let (_key, raw) = item.map_err(|e| ApiError::Storage(e.to_string()))?;
            out.push(serde_json::from_slice(&raw)?);
        }
        Ok(out)
    }
}

fn open_partition(engine: &StorageEngine, name: &str) -> Result<Arc<Partition>> {
    Ok(Arc::new(
        engine
            .keyspace()
            .open_partition(name, PartitionCreateOptions::default())
            .map_err(|e| ApiError::Storage(e.to_string()))?,
    ))
}

fn owner_link_key(owner: &UserId, place: &PlaceId) -> String {
    format!("{}/{}", owner, place)
}
