//! Cross-collection consistency engine for places
//!
//! Creation and deletion touch two collections: the place record and the
//! owner's reference set. Both sides commit in a single batch, so the
//! bidirectional link invariant holds after every completed operation and
//! is never observable mid-operation. Operations hold no locks across
//! requests and are never retried here.

use waypost_core::*;

use crate::Store;

#[derive(Clone)]
pub struct PlaceService {
    store: Store,
}

impl PlaceService {
    pub fn new(store: Store) -> Self {
        PlaceService { store }
    }

    /// Create a place for `creator`, linking both directions atomically.
    /// The creator must resolve to an existing user.
    pub fn create(&self, draft: NewPlace, creator: &UserId) -> Result<PlaceRecord> {
        draft.validate()?;

        if self.store.get_user(creator)?.is_none() {
            return Err(ApiError::NotFound(
                "could not find a user for the provided id".to_string(),
            ));
        }

        let place = PlaceRecord {
            id: PlaceId::generate(),
            title: draft.title,
            description: draft.description,
            image_url: draft.image_url,
            address: draft.address,
            location: draft.location.unwrap_or_default(),
            creator: *creator,
        };

        self.store.insert_place_linked(&place)?;
        Ok(place)
    }

    /// Update title and description. Only the creator may update; the
    /// creator reference itself is immutable.
    pub fn update(
        &self,
        id: &PlaceId,
        patch: PlacePatch,
        requester: &UserId,
    ) -> Result<PlaceRecord> {
        patch.validate()?;

        let mut place = self.get(id)?;
        if place.creator != *requester {
            return Err(ApiError::Forbidden(
                "you are not allowed to edit this place".to_string(),
            ));
        }

        place.title = patch.title;
        place.description = patch.description;
        self.store.put_place(&place)?;
        Ok(place)
    }

    /// Delete a place and unlink it from its owner atomically. Returns the
    /// removed record so the caller can release the stored image.
    pub fn delete(&self, id: &PlaceId, requester: &UserId) -> Result<PlaceRecord> {
        let place = self.get(id)?;
        if place.creator != *requester {
            return Err(ApiError::Forbidden(
                "you are not allowed to delete this place".to_string(),
            ));
        }

        self.store.remove_place_linked(&place)?;
        Ok(place)
    }

    pub fn get(&self, id: &PlaceId) -> Result<PlaceRecord> {
        self.store.get_place(id)?.ok_or_else(|| {
            ApiError::NotFound("could not find a place for the provided id".to_string())
        })
    }

    /// Places owned by `owner`, oldest first. An owner with no places is a
    /// valid empty result, not a failure.
    pub fn list_by_owner(&self, owner: &UserId) -> Result<Vec<PlaceRecord>> {
        let mut out = Vec::new();
        for id in self.store.place_ids_by_owner(owner)? {
            // Links and records commit together; a dangling link means the
            // invariant is broken and must surface as an internal failure.
            let place = self.store.get_place(&id)?.ok_or_else(|| {
                ApiError::Internal(format!("owner index points at missing place {}", id))
            })?;
            out.push(place);
        }
        Ok(out)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}
