//! Person CRUD operations.
//!
//! Writes go through [`PeopleQueries`], a set of templates compiled on first
//! use and shared for the life of the process. Input structs are restricted
//! to [`PERSON_WRITABLE`] before binding, so system columns (`id`,
//! timestamps) can only be set here.

use chrono::Utc;
use querykit_common::{Error, PersonId, Result};
use rusqlite::Connection;
use serde::Serialize;

use crate::cached::{ParameterizedCountQuery, ParameterizedExistsQuery, ParameterizedQuery};
use crate::executor::Executor;
use crate::models::{NewPerson, Person, PersonChanges, PERSON_COLUMNS, PERSON_WRITABLE};
use crate::restrict::{restrict, Record};
use crate::sql::{col, nullable_param, param, Query};
use crate::value::{ParamDecl, ParamType, Params};

const TABLE: &str = "people";

/// Prepared templates for the `people` table.
#[derive(Debug)]
pub struct PeopleQueries {
    insert: ParameterizedCountQuery,
    update: ParameterizedCountQuery,
    delete: ParameterizedExistsQuery,
    count_older_than: ParameterizedCountQuery,
    email_taken: ParameterizedExistsQuery,
    delete_younger_than: ParameterizedCountQuery,
}

impl Default for PeopleQueries {
    fn default() -> Self {
        Self::new()
    }
}

impl PeopleQueries {
    /// Build the templates. Nothing is compiled until first use.
    pub fn new() -> Self {
        let by_id = || col("id").eq(param("id", ParamType::Text));

        Self {
            insert: ParameterizedQuery::count(Query::insert_into(TABLE).set_params([
                ("id", ParamDecl::new("id", ParamType::Text)),
                ("name", ParamDecl::new("name", ParamType::Text)),
                ("email", ParamDecl::new("email", ParamType::Text).nullable()),
                ("age", ParamDecl::new("age", ParamType::Integer)),
                ("created_at", ParamDecl::new("created_at", ParamType::Text)),
                ("updated_at", ParamDecl::new("updated_at", ParamType::Text)),
            ])),
            update: ParameterizedQuery::count(
                Query::update(TABLE)
                    .set("name", param("name", ParamType::Text))
                    .set("email", nullable_param("email", ParamType::Text))
                    .set("age", param("age", ParamType::Integer))
                    .set("updated_at", param("updated_at", ParamType::Text))
                    .filter(by_id()),
            ),
            delete: ParameterizedQuery::exists(Query::delete_from(TABLE).filter(by_id())),
            count_older_than: ParameterizedQuery::count(
                Query::count(TABLE).filter(col("age").gt(param("min_age", ParamType::Integer))),
            ),
            email_taken: ParameterizedQuery::exists(
                Query::exists(TABLE).filter(col("email").eq(param("email", ParamType::Text))),
            ),
            delete_younger_than: ParameterizedQuery::count(
                Query::delete_from(TABLE).filter(col("age").lt(param("max_age", ParamType::Integer))),
            ),
        }
    }

    /// Create a new person and return it.
    pub fn create(&self, conn: &Connection, input: &NewPerson) -> Result<Person> {
        let id = PersonId::new();
        let now = Utc::now().to_rfc3339();

        let mut params = writable_params(input)?;
        params.insert("id", id.to_string());
        params.insert("created_at", now.clone());
        params.insert("updated_at", now.clone());

        self.insert
            .execute_on(conn, &params)
            .map_err(|e| unique_conflict(e, input.email.as_deref()))?;

        Ok(Person {
            id,
            name: input.name.clone(),
            email: input.email.clone(),
            age: input.age,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Replace a person's writable columns and return the stored row.
    ///
    /// The caller's value is left untouched.
    pub fn update(&self, conn: &Connection, id: PersonId, changes: &PersonChanges) -> Result<Person> {
        let mut params = writable_params(changes)?;
        params.insert("id", id.to_string());
        params.insert("updated_at", Utc::now().to_rfc3339());

        let n = self
            .update
            .execute_on(conn, &params)
            .map_err(|e| unique_conflict(e, changes.email.as_deref()))?;
        if n == 0 {
            return Err(Error::not_found("person", id));
        }

        get_person(conn, id)?.ok_or_else(|| Error::not_found("person", id))
    }

    /// Delete a person by ID. Returns true if a row was deleted.
    pub fn delete(&self, conn: &Connection, id: PersonId) -> Result<bool> {
        self.delete
            .execute_on(conn, &Params::new().with("id", id.to_string()))
    }

    /// Number of people strictly older than `min_age`.
    pub async fn count_older_than<E>(&self, executor: &E, min_age: i64) -> Result<i64>
    where
        E: Executor + ?Sized,
    {
        self.count_older_than
            .execute(executor, &Params::new().with("min_age", min_age))
            .await
    }

    /// Whether any person already uses `email`.
    pub async fn email_taken<E>(&self, executor: &E, email: &str) -> Result<bool>
    where
        E: Executor + ?Sized,
    {
        self.email_taken
            .execute(executor, &Params::new().with("email", email))
            .await
    }

    /// Delete everyone younger than `max_age`; returns the number removed.
    pub async fn delete_younger_than<E>(&self, executor: &E, max_age: i64) -> Result<i64>
    where
        E: Executor + ?Sized,
    {
        self.delete_younger_than
            .execute(executor, &Params::new().with("max_age", max_age))
            .await
    }
}

/// Get a person by primary key.
pub fn get_person(conn: &Connection, id: PersonId) -> Result<Option<Person>> {
    let result = conn.query_row(
        &format!("SELECT {PERSON_COLUMNS} FROM people WHERE id = ?1"),
        [id.to_string()],
        Person::from_row,
    );
    match result {
        Ok(p) => Ok(Some(p)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e)),
    }
}

/// List everyone, ordered by name.
pub fn list_people(conn: &Connection) -> Result<Vec<Person>> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {PERSON_COLUMNS} FROM people ORDER BY name ASC, created_at ASC"
        ))
        .map_err(Error::database)?;
    let rows = stmt
        .query_map([], Person::from_row)
        .map_err(Error::database)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::database)?;
    Ok(rows)
}

fn writable_params<T: Serialize>(input: &T) -> Result<Params> {
    let record = Record::from_serialize(input)?;
    Ok(restrict(&record, PERSON_WRITABLE)?.into())
}

fn unique_conflict(err: Error, email: Option<&str>) -> Error {
    match err {
        Error::Database { ref source } if source.to_string().contains("UNIQUE constraint failed") => {
            Error::Conflict(format!("Email '{}' already exists", email.unwrap_or_default()))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{get_conn, init_memory_pool};
    use assert_matches::assert_matches;

    fn person(name: &str, email: Option<&str>, age: i64) -> NewPerson {
        NewPerson {
            name: name.into(),
            email: email.map(Into::into),
            age,
        }
    }

    #[test]
    fn create_and_get() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let queries = PeopleQueries::new();

        let p = queries
            .create(&conn, &person("Ada", Some("ada@example.org"), 36))
            .unwrap();
        assert_eq!(p.name, "Ada");

        let found = get_person(&conn, p.id).unwrap().unwrap();
        assert_eq!(found, p);
    }

    #[test]
    fn create_without_email() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let queries = PeopleQueries::new();

        let p = queries.create(&conn, &person("Bob", None, 20)).unwrap();
        let found = get_person(&conn, p.id).unwrap().unwrap();
        assert!(found.email.is_none());
    }

    #[test]
    fn duplicate_email_conflicts() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let queries = PeopleQueries::new();

        queries.create(&conn, &person("A", Some("dup@x.org"), 1)).unwrap();
        let err = queries
            .create(&conn, &person("B", Some("dup@x.org"), 2))
            .unwrap_err();
        assert_matches!(err, Error::Conflict(msg) if msg.contains("dup@x.org"));
    }

    #[test]
    fn templates_compile_once_across_writes() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let queries = PeopleQueries::new();

        for i in 0..5 {
            queries.create(&conn, &person(&format!("p{i}"), None, i)).unwrap();
        }
        assert_eq!(queries.insert.compile_count(), 1);
        assert_eq!(list_people(&conn).unwrap().len(), 5);
    }

    #[test]
    fn update_returns_fresh_row() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let queries = PeopleQueries::new();

        let original = queries.create(&conn, &person("Ada", None, 36)).unwrap();
        let mut changes = PersonChanges::from(&original);
        changes.age = 37;
        changes.email = Some("ada@example.org".into());

        let updated = queries.update(&conn, original.id, &changes).unwrap();
        assert_eq!(updated.age, 37);
        assert_eq!(updated.email.as_deref(), Some("ada@example.org"));
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(original.age, 36);
    }

    #[test]
    fn update_missing_is_not_found() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let queries = PeopleQueries::new();

        let changes = PersonChanges {
            name: "Ghost".into(),
            email: None,
            age: 1,
        };
        let err = queries.update(&conn, PersonId::new(), &changes).unwrap_err();
        assert_matches!(err, Error::NotFound { .. });
    }

    #[test]
    fn delete() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let queries = PeopleQueries::new();

        let p = queries.create(&conn, &person("Del", None, 9)).unwrap();
        assert!(queries.delete(&conn, p.id).unwrap());
        assert!(!queries.delete(&conn, p.id).unwrap());
        assert!(get_person(&conn, p.id).unwrap().is_none());
    }

    #[test]
    fn list_orders_by_name() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let queries = PeopleQueries::new();

        queries.create(&conn, &person("Zed", None, 1)).unwrap();
        queries.create(&conn, &person("Amy", None, 2)).unwrap();
        let names: Vec<_> = list_people(&conn)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["Amy", "Zed"]);
    }

    #[tokio::test]
    async fn narrow_queries_through_pool() {
        let pool = init_memory_pool().unwrap();
        let queries = PeopleQueries::new();
        {
            let conn = get_conn(&pool).unwrap();
            for (name, age) in [("a", 20), ("b", 30), ("c", 40), ("d", 10)] {
                queries
                    .create(&conn, &person(name, Some(format!("{name}@x.org").as_str()), age))
                    .unwrap();
            }
        }

        assert_eq!(queries.count_older_than(&pool, 18).await.unwrap(), 3);
        assert_eq!(queries.count_older_than(&pool, 65).await.unwrap(), 0);
        assert_eq!(queries.count_older_than.compile_count(), 1);

        assert!(queries.email_taken(&pool, "b@x.org").await.unwrap());
        assert!(!queries.email_taken(&pool, "z@x.org").await.unwrap());

        assert_eq!(queries.delete_younger_than(&pool, 25).await.unwrap(), 2);
        assert_eq!(queries.count_older_than(&pool, 0).await.unwrap(), 2);
    }
}
