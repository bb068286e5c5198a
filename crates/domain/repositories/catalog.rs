use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::{courses::CourseEntity, plans::PlanEntity};

/// Read-only view over course prices and plan definitions.
#[automock]
#[async_trait]
pub trait CatalogRepository {
    async fn find_course(&self, course_id: Uuid) -> Result<Option<CourseEntity>>;
    async fn find_plan(&self, plan_id: Uuid) -> Result<Option<PlanEntity>>;
}
