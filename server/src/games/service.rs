use docstore::{
    to_document, Collection, Document, DocumentId, Filter, FindOptions, Projection, SortOrder,
    ID_FIELD,
};
use std::sync::Arc;

use super::{Game, COLLECTION, TOP3_FIELDS};
use crate::error::ServiceError;
use crate::persistence::PersistenceHandle;

/// Game queries. Reads hand back documents exactly as stored.
pub struct GameService {
    persistence: Arc<PersistenceHandle>,
}

impl GameService {
    pub fn new(persistence: Arc<PersistenceHandle>) -> Self {
        Self { persistence }
    }

    async fn games(&self) -> Result<Collection, ServiceError> {
        Ok(self.persistence.database().await?.collection(COLLECTION))
    }

    /// The `limit` most recently inserted games, newest first.
    pub async fn get_all(&self, limit: u64) -> Result<Vec<Document>, ServiceError> {
        let options = FindOptions::new()
            .sort(ID_FIELD, SortOrder::Descending)
            .limit(limit);
        Ok(self.games().await?.find(&Filter::new(), &options).await?)
    }

    pub async fn get_by_platform(&self, platform: &str) -> Result<Vec<Document>, ServiceError> {
        let filter = Filter::new().eq("Platform", platform);
        Ok(self.games().await?.find(&filter, &FindOptions::new()).await?)
    }

    pub async fn get_by_platform_and_year(
        &self,
        platform: &str,
        year: &str,
    ) -> Result<Vec<Document>, ServiceError> {
        let filter = Filter::new().eq("Platform", platform).eq("Year", year);
        Ok(self.games().await?.find(&filter, &FindOptions::new()).await?)
    }

    /// Best three sellers for the platform and year, by global sales.
    pub async fn get_top3_by_platform_and_year(
        &self,
        platform: &str,
        year: &str,
    ) -> Result<Vec<Document>, ServiceError> {
        let filter = Filter::new().eq("Platform", platform).eq("Year", year);
        let options = FindOptions::new()
            .sort("Global_Sales", SortOrder::Descending)
            .limit(3)
            .projection(Projection::include(TOP3_FIELDS));
        Ok(self.games().await?.find(&filter, &options).await?)
    }

    pub async fn create(&self, game: &Game) -> Result<DocumentId, ServiceError> {
        let id = self.games().await?.insert_one(to_document(game)?).await?;
        tracing::debug!(%id, "game created");
        Ok(id)
    }

    /// Overwrite the game's fields. Returns the number of documents modified.
    pub async fn update(&self, id: &str, game: &Game) -> Result<u64, ServiceError> {
        let id: DocumentId = id.parse()?;
        let result = self
            .games()
            .await?
            .update_one(&Filter::by_id(id), to_document(game)?)
            .await?;
        Ok(result.modified_count)
    }

    pub async fn delete(&self, id: &str) -> Result<u64, ServiceError> {
        let id: DocumentId = id.parse()?;
        Ok(self.games().await?.delete_one(&Filter::by_id(id)).await?)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Document>, ServiceError> {
        let id: DocumentId = id.parse()?;
        Ok(self.games().await?.find_one(&Filter::by_id(id)).await?)
    }
}
