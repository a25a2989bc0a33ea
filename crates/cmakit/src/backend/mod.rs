//! Client abstractions for the remote content management API.
//!
//! Each resource kind gets its own narrow trait so callers only depend on
//! the operations they actually issue. Implementations may talk to the real
//! service or, like [`memory::MemoryBackend`], keep state in process.

pub mod memory;

use crate::error::Result;
use crate::types::{
    ApiKey, Asset, ContentType, Entry, Environment, Locale, Space, Versioned,
};

/// Content type operations within an environment.
pub trait ContentTypeClient: Send + Sync {
    /// Fetch a content type.
    fn get(&self, env: &Environment, content_type_id: &str) -> Result<ContentType>;

    /// Create or update a content type. The field list is applied as given.
    fn upsert(&self, env: &Environment, content_type: &ContentType) -> Result<ContentType>;

    /// Publish the current draft of a content type.
    fn activate(&self, env: &Environment, content_type: &ContentType) -> Result<ContentType>;

    /// Unpublish a content type.
    fn deactivate(&self, env: &Environment, content_type: &ContentType) -> Result<ContentType>;

    /// Delete a deactivated content type.
    fn delete(&self, env: &Environment, content_type: &ContentType) -> Result<()>;
}

/// Entry operations within an environment.
pub trait EntryClient: Send + Sync {
    fn get(&self, env: &Environment, entry_id: &str) -> Result<Entry>;

    fn upsert(&self, env: &Environment, content_type_id: &str, entry: &Entry) -> Result<Entry>;

    fn delete(&self, env: &Environment, entry_id: &str) -> Result<()>;

    fn publish(&self, env: &Environment, entry: &Entry) -> Result<Entry>;

    fn unpublish(&self, env: &Environment, entry: &Entry) -> Result<Entry>;

    fn archive(&self, env: &Environment, entry: &Entry) -> Result<Entry>;

    fn unarchive(&self, env: &Environment, entry: &Entry) -> Result<Entry>;
}

/// Asset operations within a space.
pub trait AssetClient: Send + Sync {
    fn get(&self, space_id: &str, asset_id: &str) -> Result<Asset>;

    fn upsert(&self, space_id: &str, asset: &Asset) -> Result<Asset>;

    /// Fetch and process the uploaded file of every locale.
    fn process(&self, space_id: &str, asset: &Asset) -> Result<Asset>;

    fn delete(&self, space_id: &str, asset: &Asset) -> Result<()>;

    fn publish(&self, space_id: &str, asset: &Asset) -> Result<Asset>;

    fn unpublish(&self, space_id: &str, asset: &Asset) -> Result<Asset>;

    fn archive(&self, space_id: &str, asset: &Asset) -> Result<Asset>;

    fn unarchive(&self, space_id: &str, asset: &Asset) -> Result<Asset>;
}

/// Environment operations within a space.
pub trait EnvironmentClient: Send + Sync {
    fn get(&self, space_id: &str, environment_id: &str) -> Result<Environment>;

    fn upsert(&self, space_id: &str, environment: &Environment) -> Result<Environment>;

    fn delete(&self, space_id: &str, environment: &Environment) -> Result<()>;
}

/// Space operations.
pub trait SpaceClient: Send + Sync {
    fn get(&self, space_id: &str) -> Result<Space>;

    fn upsert(&self, space: &Space) -> Result<Space>;

    fn delete(&self, space: &Space) -> Result<()>;
}

/// Locale operations within a space.
pub trait LocaleClient: Send + Sync {
    fn get(&self, space_id: &str, locale_id: &str) -> Result<Locale>;

    fn upsert(&self, space_id: &str, locale: &Locale) -> Result<Locale>;

    fn delete(&self, space_id: &str, locale: &Locale) -> Result<()>;
}

/// API key operations within a space.
pub trait ApiKeyClient: Send + Sync {
    fn get(&self, space_id: &str, api_key_id: &str) -> Result<ApiKey>;

    fn upsert(&self, space_id: &str, api_key: &ApiKey) -> Result<ApiKey>;

    fn delete(&self, space_id: &str, api_key: &ApiKey) -> Result<()>;
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Lifecycle transitions of one versioned object kind, bound to its scope.
///
/// Every transition returns the object as the remote left it, so the next
/// transition carries a fresh version.
pub trait LifecycleOps {
    /// Object kind the transitions apply to
    type Object: Versioned + Clone;

    fn publish(&self, object: &Self::Object) -> Result<Self::Object>;

    fn unpublish(&self, object: &Self::Object) -> Result<Self::Object>;

    fn archive(&self, object: &Self::Object) -> Result<Self::Object>;

    fn unarchive(&self, object: &Self::Object) -> Result<Self::Object>;
}

/// Entry lifecycle within one environment.
pub struct EntryLifecycle<'a> {
    client: &'a dyn EntryClient,
    env: &'a Environment,
}

impl<'a> EntryLifecycle<'a> {
    pub fn new(client: &'a dyn EntryClient, env: &'a Environment) -> Self {
        Self { client, env }
    }
}

impl LifecycleOps for EntryLifecycle<'_> {
    type Object = Entry;

    fn publish(&self, entry: &Entry) -> Result<Entry> {
        self.client.publish(self.env, entry)
    }

    fn unpublish(&self, entry: &Entry) -> Result<Entry> {
        self.client.unpublish(self.env, entry)
    }

    fn archive(&self, entry: &Entry) -> Result<Entry> {
        self.client.archive(self.env, entry)
    }

    fn unarchive(&self, entry: &Entry) -> Result<Entry> {
        self.client.unarchive(self.env, entry)
    }
}

/// Asset lifecycle within one space.
pub struct AssetLifecycle<'a> {
    client: &'a dyn AssetClient,
    space_id: &'a str,
}

impl<'a> AssetLifecycle<'a> {
    pub fn new(client: &'a dyn AssetClient, space_id: &'a str) -> Self {
        Self { client, space_id }
    }
}

impl LifecycleOps for AssetLifecycle<'_> {
    type Object = Asset;

    fn publish(&self, asset: &Asset) -> Result<Asset> {
        self.client.publish(self.space_id, asset)
    }

    fn unpublish(&self, asset: &Asset) -> Result<Asset> {
        self.client.unpublish(self.space_id, asset)
    }

    fn archive(&self, asset: &Asset) -> Result<Asset> {
        self.client.archive(self.space_id, asset)
    }

    fn unarchive(&self, asset: &Asset) -> Result<Asset> {
        self.client.unarchive(self.space_id, asset)
    }
}
