use crate::application::error::AgendaError;
use crate::domain::models::{NewService, Service};
use crate::infrastructure::store::ServiceStore;
use std::sync::Arc;

pub struct CatalogService<C>
where
    C: ServiceStore,
{
    services: Arc<C>,
}

impl<C> CatalogService<C>
where
    C: ServiceStore,
{
    pub fn new(services: Arc<C>) -> Self {
        Self { services }
    }

    pub async fn list(&self, professional_id: &str) -> Result<Vec<Service>, AgendaError> {
        Ok(self.services.list_services(professional_id).await?)
    }

    /// Services a client may pick when reserving.
    pub async fn bookable(&self, professional_id: &str) -> Result<Vec<Service>, AgendaError> {
        Ok(self
            .list(professional_id)
            .await?
            .into_iter()
            .filter(|service| service.available)
            .collect())
    }

    pub async fn create(&self, professional_id: &str, service: &NewService) -> Result<Service, AgendaError> {
        service.validate().map_err(AgendaError::Validation)?;
        let created = self.services.create_service(professional_id, service).await?;
        tracing::info!(professional_id, service_id = %created.id, "service created");
        Ok(created)
    }

    pub async fn update(&self, professional_id: &str, service: &Service) -> Result<Service, AgendaError> {
        service.validate().map_err(AgendaError::Validation)?;
        Ok(self.services.update_service(professional_id, service).await?)
    }

    pub async fn delete(&self, professional_id: &str, service_id: &str) -> Result<(), AgendaError> {
        self.services
            .delete_service(professional_id, service_id)
            .await?;
        Ok(())
    }
}
