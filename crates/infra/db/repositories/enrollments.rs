use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into};
use std::sync::Arc;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::enrollments},
};
use domain::{
    entities::enrollments::InsertEnrollmentEntity,
    repositories::enrollments::EnrollmentRepository,
};

pub struct EnrollmentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl EnrollmentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl EnrollmentRepository for EnrollmentPostgres {
    async fn insert_if_absent(&self, enrollment: InsertEnrollmentEntity) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let inserted = insert_into(enrollments::table)
            .values(&enrollment)
            .on_conflict((enrollments::student_id, enrollments::course_id))
            .do_nothing()
            .execute(&mut conn)?;

        Ok(inserted == 1)
    }
}
