use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::enrollments::InsertEnrollmentEntity;

#[automock]
#[async_trait]
pub trait EnrollmentRepository {
    /// Returns `false` when the student is already enrolled in the course.
    async fn insert_if_absent(&self, enrollment: InsertEnrollmentEntity) -> Result<bool>;
}
