use crate::store::{CourseStore, PersonStore};
use crate::DbError;
use async_trait::async_trait;
use core_types::{Course, Person, PersonFields, PersonFilter};
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{FromRow, Transaction};

/// The `DbRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

/// Represents a row from the `course` table.
#[derive(Debug, Clone, FromRow)]
struct CourseRow {
    id: i32,
    name: String,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Course {
            id: row.id,
            name: row.name,
        }
    }
}

/// Represents a row from the `person` table, before its courses are attached.
#[derive(Debug, Clone, FromRow)]
struct PersonRow {
    id: i32,
    first_name: String,
    last_name: String,
    #[sqlx(rename = "type")]
    kind: String,
    age: i32,
}

impl PersonRow {
    fn into_person(self, courses: Vec<i32>) -> Person {
        Person {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            kind: self.kind,
            age: self.age,
            courses,
        }
    }
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_courses(&self, row: PersonRow) -> Result<Person, DbError> {
        let courses = self.course_ids_for_person(row.id).await?;
        Ok(row.into_person(courses))
    }
}

#[async_trait]
impl CourseStore for DbRepository {
    async fn list_courses(&self) -> Result<Vec<Course>, DbError> {
        let rows = sqlx::query_as::<_, CourseRow>("SELECT id, name FROM course ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Course::from).collect())
    }

    async fn find_course(&self, id: i32) -> Result<Option<Course>, DbError> {
        let row = sqlx::query_as::<_, CourseRow>("SELECT id, name FROM course WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Course::from))
    }

    async fn course_exists(&self, id: i32) -> Result<bool, DbError> {
        let found: Option<i32> = sqlx::query_scalar("SELECT id FROM course WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn create_course(&self, name: &str) -> Result<Course, DbError> {
        let id: i32 = sqlx::query_scalar("INSERT INTO course (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from_write)?;
        Ok(Course {
            id,
            name: name.to_string(),
        })
    }

    async fn update_course(&self, id: i32, name: &str) -> Result<Option<Course>, DbError> {
        let row = sqlx::query_as::<_, CourseRow>(
            "UPDATE course SET name = $1 WHERE id = $2 RETURNING id, name",
        )
        .bind(name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from_write)?;
        Ok(row.map(Course::from))
    }

    async fn delete_course(&self, id: i32) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM course WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from_write)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PersonStore for DbRepository {
    async fn find_all_people(&self, filter: &PersonFilter) -> Result<Vec<Person>, DbError> {
        let rows = sqlx::query_as::<_, PersonRow>(
            r#"
            SELECT id, first_name, last_name, type, age
            FROM person
            WHERE ($1::TEXT IS NULL OR first_name = $1)
              AND ($2::INTEGER IS NULL OR age = $2)
            ORDER BY id
            "#,
        )
        .bind(filter.first_name.as_deref())
        .bind(filter.age)
        .fetch_all(&self.pool)
        .await?;

        let mut people = Vec::with_capacity(rows.len());
        for row in rows {
            people.push(self.attach_courses(row).await?);
        }
        Ok(people)
    }

    async fn find_person(&self, id: i32) -> Result<Option<Person>, DbError> {
        let row = sqlx::query_as::<_, PersonRow>(
            "SELECT id, first_name, last_name, type, age FROM person WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Ok(None),
            Some(row) => Ok(Some(self.attach_courses(row).await?)),
        }
    }

    async fn find_person_by_name(&self, name: &str) -> Result<Option<Person>, DbError> {
        // First names are not unique; the lowest id wins.
        let row = sqlx::query_as::<_, PersonRow>(
            r#"
            SELECT id, first_name, last_name, type, age
            FROM person
            WHERE first_name = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Ok(None),
            Some(row) => Ok(Some(self.attach_courses(row).await?)),
        }
    }

    async fn find_person_id_by_name(&self, name: &str) -> Result<Option<i32>, DbError> {
        let id: Option<i32> = sqlx::query_scalar(
            "SELECT id FROM person WHERE first_name = $1 ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn person_exists(&self, id: i32) -> Result<bool, DbError> {
        let found: Option<i32> = sqlx::query_scalar("SELECT id FROM person WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn course_ids_for_person(&self, person_id: i32) -> Result<Vec<i32>, DbError> {
        let ids: Vec<i32> = sqlx::query_scalar(
            r#"
            SELECT c.id
            FROM course c
            JOIN person_course pc ON c.id = pc.course_id
            WHERE pc.person_id = $1
            ORDER BY c.id
            "#,
        )
        .bind(person_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Runs the person insert and every association insert on one transaction.
    /// Dropping `tx` on an early return rolls it back.
    async fn insert_person_with_enrollments(
        &self,
        fields: &PersonFields,
        course_ids: &[i32],
    ) -> Result<i32, DbError> {
        let mut tx: Transaction<Postgres> = self.pool.begin().await?;

        let person_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO person (first_name, last_name, type, age)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.kind)
        .bind(fields.age)
        .fetch_one(&mut *tx)
        .await
        .map_err(DbError::from_write)?;

        for course_id in course_ids {
            sqlx::query(
                r#"
                INSERT INTO person_course (person_id, course_id)
                VALUES ($1, $2)
                ON CONFLICT (person_id, course_id) DO NOTHING
                "#,
            )
            .bind(person_id)
            .bind(*course_id)
            .execute(&mut *tx) // Note: must use the transaction object `tx` here
            .await
            .map_err(DbError::from_write)?;
        }

        tx.commit().await?;
        Ok(person_id)
    }

    async fn update_person(&self, id: i32, fields: &PersonFields) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE person
            SET first_name = $1, last_name = $2, type = $3, age = $4
            WHERE id = $5
            "#,
        )
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.kind)
        .bind(fields.age)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(DbError::from_write)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_enrollment(&self, person_id: i32, course_id: i32) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO person_course (person_id, course_id)
            VALUES ($1, $2)
            ON CONFLICT (person_id, course_id) DO NOTHING
            "#,
        )
        .bind(person_id)
        .bind(course_id)
        .execute(&self.pool)
        .await
        .map_err(DbError::from_write)?;
        Ok(())
    }

    async fn delete_enrollments_for_person(&self, person_id: i32) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM person_course WHERE person_id = $1")
            .bind(person_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_person(&self, id: i32) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM person WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from_write)?;
        Ok(result.rows_affected() > 0)
    }
}
